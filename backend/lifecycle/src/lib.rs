pub mod coordinator;
pub mod runner;
pub mod status;
pub mod trailpack;

pub use coordinator::{
    bind_method_listeners, bind_phase_listeners, trailpack_mapping, userland_trailpacks,
    SYSTEM_PACK,
};
pub use runner::LifecycleRunner;
pub use status::{PackState, PackStatusBoard};
pub use trailpack::{LifecycleConfig, PhaseConfig, Trailpack, TrailpackConfig};
