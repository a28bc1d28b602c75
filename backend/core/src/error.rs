use thiserror::Error;

use crate::events::Phase;

/// Top-level error type for the Trails lifecycle runtime.
///
/// There is no retry or local recovery anywhere in the runtime: every
/// failure is forwarded verbatim to the bus halt sink.
#[derive(Debug, Error)]
pub enum TrailsError {
    /// A trailpack lifecycle operation rejected. Carries the underlying
    /// cause from whichever validate/configure/initialize call failed.
    #[error("trailpack '{pack}' failed during {phase}: {source}")]
    PhaseFailed {
        pack: String,
        phase: Phase,
        #[source]
        source: anyhow::Error,
    },

    /// A wait was abandoned because the bus halted first.
    #[error("event bus halted while a wait was pending")]
    Halted,

    /// A descriptor was rejected at construction time.
    #[error("invalid trailpack: {0}")]
    InvalidPack(String),
}
