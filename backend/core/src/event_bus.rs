//! Event Bus
//!
//! In-process pub/sub with wait-for-all-of semantics: a caller registers
//! interest in a set of named events and is woken once every one of them
//! has fired at least once. Fired events are sticky, so a wait registered
//! after the fact still resolves — listener binding and the host's
//! `trails:start` emit must not be able to race each other.
//!
//! Failures never resolve a wait: `stop` marks the bus halted, fails every
//! pending wait, and hands the causing error to the halt sink drained by
//! the host.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error};

use crate::error::TrailsError;

/// Buffer size for the observer broadcast channel.
const OBSERVER_CAPACITY: usize = 256;

/// Seam between the lifecycle coordinator and the bus, so the coordinator
/// can be driven against a fake in tests.
#[async_trait]
pub trait LifecycleBus: Send + Sync {
    /// Resolves once every named event has fired at least once, counting
    /// events that fired before the call. Fails with [`TrailsError::Halted`]
    /// if the bus stops first (or already has).
    async fn after(&self, events: Vec<String>) -> Result<(), TrailsError>;

    /// Broadcast a named event to all waits, past and future.
    fn emit(&self, event: &str);

    /// Unrecoverable halt: forward the error to the halt sink and fail
    /// every pending wait. May be invoked more than once; every invocation
    /// reaches the sink.
    fn stop(&self, error: TrailsError);
}

struct Waiter {
    remaining: HashSet<String>,
    done: oneshot::Sender<Result<(), TrailsError>>,
}

struct BusState {
    fired: HashSet<String>,
    waiters: Vec<Waiter>,
    halted: bool,
}

/// The process-wide lifecycle event bus.
///
/// Shared behind `Arc`; all methods take `&self`. The internal mutex is
/// never held across an await point.
pub struct EventBus {
    state: Mutex<BusState>,
    observer: broadcast::Sender<String>,
    halt_tx: mpsc::UnboundedSender<TrailsError>,
}

impl EventBus {
    /// Create a bus plus the receiving end of its halt sink. The host owns
    /// the receiver and treats the first error as fatal to startup.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TrailsError>) {
        let (observer, _) = broadcast::channel(OBSERVER_CAPACITY);
        let (halt_tx, halt_rx) = mpsc::unbounded_channel();
        let bus = Self {
            state: Mutex::new(BusState {
                fired: HashSet::new(),
                waiters: Vec::new(),
                halted: false,
            }),
            observer,
            halt_tx,
        };
        (bus, halt_rx)
    }

    /// Observer stream of emitted event names, in emit order.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.observer.subscribe()
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        // A poisoning panic holds no invariant we care about; take the data.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl LifecycleBus for EventBus {
    async fn after(&self, events: Vec<String>) -> Result<(), TrailsError> {
        let rx = {
            let mut state = self.state();
            if state.halted {
                return Err(TrailsError::Halted);
            }
            let remaining: HashSet<String> = events
                .into_iter()
                .filter(|e| !state.fired.contains(e))
                .collect();
            if remaining.is_empty() {
                return Ok(());
            }
            let (tx, rx) = oneshot::channel();
            state.waiters.push(Waiter { remaining, done: tx });
            rx
        };
        // Sender dropped without a verdict only if the bus itself is gone.
        rx.await.unwrap_or(Err(TrailsError::Halted))
    }

    fn emit(&self, event: &str) {
        let satisfied = {
            let mut state = self.state();
            state.fired.insert(event.to_string());
            let mut satisfied = Vec::new();
            let mut i = 0;
            while i < state.waiters.len() {
                state.waiters[i].remaining.remove(event);
                if state.waiters[i].remaining.is_empty() {
                    satisfied.push(state.waiters.swap_remove(i));
                } else {
                    i += 1;
                }
            }
            satisfied
        };
        debug!(event, satisfied = satisfied.len(), "event emitted");
        for waiter in satisfied {
            let _ = waiter.done.send(Ok(()));
        }
        let _ = self.observer.send(event.to_string());
    }

    fn stop(&self, err: TrailsError) {
        error!(error = %err, "halting lifecycle");
        let pending = {
            let mut state = self.state();
            state.halted = true;
            std::mem::take(&mut state.waiters)
        };
        // Sink first, so the host sees the root cause before any of the
        // knock-on Halted rejections.
        let _ = self.halt_tx.send(err);
        for waiter in pending {
            let _ = waiter.done.send(Err(TrailsError::Halted));
        }
    }
}
