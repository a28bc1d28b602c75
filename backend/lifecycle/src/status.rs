//! Event-derived view of each pack's lifecycle progress.
//!
//! Purely observational: the board consumes the bus observer stream and
//! never gates anything. A failed pack simply stops advancing — failures
//! travel through the halt sink, not through events.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::warn;

use trails_core::events::{parse_pack_event, Phase};

/// Progress of a single pack, derived from its completion events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackState {
    Pending,
    Validated,
    Configured,
    Initialized,
}

impl PackState {
    fn after(phase: Phase) -> Self {
        match phase {
            Phase::Validate => Self::Validated,
            Phase::Configure => Self::Configured,
            Phase::Initialize => Self::Initialized,
        }
    }
}

type StateMap = Arc<RwLock<HashMap<String, PackState>>>;

/// Tracks `name -> PackState` from observed bus events.
pub struct PackStatusBoard {
    states: StateMap,
}

impl PackStatusBoard {
    /// Seed the board with the known pack names, all `Pending`.
    pub fn new(names: impl IntoIterator<Item = String>) -> Self {
        let states = names
            .into_iter()
            .map(|name| (name, PackState::Pending))
            .collect();
        Self {
            states: Arc::new(RwLock::new(states)),
        }
    }

    /// Consume an observer stream, advancing pack states as completion
    /// events arrive. Runs until the bus is dropped.
    pub fn watch(&self, mut events: broadcast::Receiver<String>) -> JoinHandle<()> {
        let states = Arc::clone(&self.states);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if let Some((name, phase)) = parse_pack_event(&event) {
                            let mut map =
                                states.write().unwrap_or_else(|e| e.into_inner());
                            map.insert(name.to_string(), PackState::after(phase));
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        // States may be stale until the next event for each
                        // lagged pack arrives.
                        warn!(missed, "status board lagged behind the event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    pub fn get(&self, name: &str) -> Option<PackState> {
        self.states
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .copied()
    }

    /// Point-in-time copy of every pack's state.
    pub fn snapshot(&self) -> HashMap<String, PackState> {
        self.states.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
