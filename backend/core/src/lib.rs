pub mod error;
pub mod event_bus;
pub mod events;
pub mod logging;

pub use error::TrailsError;
pub use event_bus::{EventBus, LifecycleBus};
pub use events::{
    all_event, pack_event, Phase, ALL_CONFIGURED, ALL_INITIALIZED, ALL_VALIDATED, TRAILS_READY,
    TRAILS_START,
};
pub use logging::init_logger;
