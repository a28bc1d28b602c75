//! Lifecycle coordination.
//!
//! Rolls per-pack phase completion events up into aggregate
//! `trailpack:all:<phase>` gates, and drives each pack's phase methods off
//! those gates. The full chain: `trails:start` → validate →
//! `trailpack:all:validated` → configure → `trailpack:all:configured` →
//! initialize → `trailpack:all:initialized` → `trails:ready`.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use trails_core::events::{self, Phase};
use trails_core::{LifecycleBus, TrailsError};

use crate::trailpack::Trailpack;

/// The sole reserved pack name. As of this version, `core` is the only
/// system pack; everything else is userland.
pub const SYSTEM_PACK: &str = "core";

/// Index packs by name. Duplicate names keep the last occurrence.
pub fn trailpack_mapping(packs: &[Arc<dyn Trailpack>]) -> HashMap<String, Arc<dyn Trailpack>> {
    packs
        .iter()
        .map(|pack| (pack.name().to_string(), Arc::clone(pack)))
        .collect()
}

/// All non-system packs, relative order preserved.
pub fn userland_trailpacks(packs: &[Arc<dyn Trailpack>]) -> Vec<Arc<dyn Trailpack>> {
    packs
        .iter()
        .filter(|pack| pack.name() != SYSTEM_PACK)
        .cloned()
        .collect()
}

/// Register the three phase-boundary waits: once every pack has completed
/// a phase, the matching aggregate event fires. The initialize aggregate
/// additionally fires `trails:ready`.
///
/// Each aggregate fires at most once; a failed constituent wait halts the
/// bus instead. The three waits are independent and complete in whatever
/// order their prerequisites allow.
pub fn bind_phase_listeners(bus: &Arc<dyn LifecycleBus>, packs: &[Arc<dyn Trailpack>]) {
    debug!(packs = packs.len(), "binding phase boundary listeners");
    let validated = phase_events(packs, Phase::Validate);
    let configured = phase_events(packs, Phase::Configure);
    let initialized = phase_events(packs, Phase::Initialize);

    spawn_aggregate(bus, configured, &[events::ALL_CONFIGURED]);
    spawn_aggregate(bus, validated, &[events::ALL_VALIDATED]);
    spawn_aggregate(
        bus,
        initialized,
        &[events::ALL_INITIALIZED, events::TRAILS_READY],
    );
}

/// Register each pack's three phase triggers: validate fires on
/// `trails:start`; configure and initialize wait on the pack's declared
/// `listen` events plus the previous phase's aggregate gate.
///
/// Prerequisite names are taken as-is — nothing checks that they belong to
/// real packs or that the graph is acyclic. An unsatisfiable prerequisite
/// stalls its phase (and every phase gated behind it) indefinitely.
pub fn bind_method_listeners(bus: &Arc<dyn LifecycleBus>, packs: &[Arc<dyn Trailpack>]) {
    debug!(packs = packs.len(), "binding per-pack method listeners");
    for pack in packs {
        let lifecycle = &pack.config().lifecycle;

        let mut initialize_waits = lifecycle.initialize.listen.clone();
        initialize_waits.push(events::ALL_CONFIGURED.to_string());
        spawn_phase(bus, pack, Phase::Initialize, initialize_waits);

        let mut configure_waits = lifecycle.configure.listen.clone();
        configure_waits.push(events::ALL_VALIDATED.to_string());
        spawn_phase(bus, pack, Phase::Configure, configure_waits);

        spawn_phase(
            bus,
            pack,
            Phase::Validate,
            vec![events::TRAILS_START.to_string()],
        );
    }
}

fn phase_events(packs: &[Arc<dyn Trailpack>], phase: Phase) -> Vec<String> {
    packs
        .iter()
        .map(|pack| events::pack_event(pack.name(), phase))
        .collect()
}

fn spawn_aggregate(
    bus: &Arc<dyn LifecycleBus>,
    waits: Vec<String>,
    then_emit: &'static [&'static str],
) {
    let bus = Arc::clone(bus);
    tokio::spawn(async move {
        match bus.after(waits).await {
            Ok(()) => {
                for event in then_emit {
                    bus.emit(event);
                }
            }
            Err(err) => bus.stop(err),
        }
    });
}

fn spawn_phase(
    bus: &Arc<dyn LifecycleBus>,
    pack: &Arc<dyn Trailpack>,
    phase: Phase,
    waits: Vec<String>,
) {
    let bus = Arc::clone(bus);
    let pack = Arc::clone(pack);
    tokio::spawn(async move {
        if let Err(err) = bus.after(waits).await {
            bus.stop(err);
            return;
        }
        debug!(pack = pack.name(), %phase, "prerequisites met, running phase");
        let outcome = match phase {
            Phase::Validate => pack.validate().await,
            Phase::Configure => pack.configure().await,
            Phase::Initialize => pack.initialize().await,
        };
        match outcome {
            Ok(()) => bus.emit(&events::pack_event(pack.name(), phase)),
            Err(source) => bus.stop(TrailsError::PhaseFailed {
                pack: pack.name().to_string(),
                phase,
                source,
            }),
        }
    });
}
