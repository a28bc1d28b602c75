//! Trailpack descriptor: a named unit of startup logic with three
//! asynchronous lifecycle operations.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Settings for a single lifecycle phase of one pack.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseConfig {
    /// Event names this phase waits on before running — typically other
    /// packs' completion events, e.g. `trailpack:db:configured`. The
    /// coordinator appends the previous phase's aggregate gate on top of
    /// these. Names are not checked against registered packs; an event
    /// nobody ever emits stalls the phase indefinitely.
    #[serde(default)]
    pub listen: Vec<String>,
}

/// Per-phase lifecycle settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Validate waits only on `trails:start`; its `listen` list is carried
    /// for shape compatibility but not consulted by the coordinator.
    #[serde(default)]
    pub validate: PhaseConfig,
    #[serde(default)]
    pub configure: PhaseConfig,
    #[serde(default)]
    pub initialize: PhaseConfig,
}

/// Configuration attached to a trailpack.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrailpackConfig {
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

/// A self-contained unit of startup logic. Each pack passes through
/// validate → configure → initialize in that order; packs are otherwise
/// concurrent with one another, gated only by their declared `listen`
/// events and the aggregate phase gates.
#[async_trait]
pub trait Trailpack: Send + Sync {
    /// Unique key for this pack. The name `"core"` is reserved for the
    /// system pack.
    fn name(&self) -> &str;

    fn config(&self) -> &TrailpackConfig;

    /// Check preconditions. Runs once `trails:start` fires.
    async fn validate(&self) -> Result<()>;

    /// Apply configuration. Runs once every pack has validated and this
    /// pack's configure prerequisites have fired.
    async fn configure(&self) -> Result<()>;

    /// Bring the pack up. Runs once every pack has configured and this
    /// pack's initialize prerequisites have fired.
    async fn initialize(&self) -> Result<()>;
}
