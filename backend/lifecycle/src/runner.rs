//! Host-facing startup assembly.
//!
//! Wires a set of trailpacks to a fresh event bus, drives them through
//! validate → configure → initialize, and resolves once `trails:ready`
//! fires — or with the first halt error.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use trails_core::{events, EventBus, LifecycleBus, TrailsError};

use crate::coordinator::{self, trailpack_mapping, userland_trailpacks};
use crate::status::{PackState, PackStatusBoard};
use crate::trailpack::Trailpack;

pub struct LifecycleRunner {
    bus: Arc<EventBus>,
    halt_rx: mpsc::UnboundedReceiver<TrailsError>,
    packs: Vec<Arc<dyn Trailpack>>,
    mapping: HashMap<String, Arc<dyn Trailpack>>,
    status: PackStatusBoard,
}

impl LifecycleRunner {
    /// Build a runner over the given packs. Spawns the status watcher, so
    /// this must run inside a tokio runtime.
    ///
    /// Rejects packs with an empty name. Duplicate names are tolerated and
    /// keep the last occurrence, matching the mapping contract.
    pub fn new(packs: Vec<Arc<dyn Trailpack>>) -> Result<Self, TrailsError> {
        for pack in &packs {
            if pack.name().is_empty() {
                return Err(TrailsError::InvalidPack(
                    "pack name must not be empty".into(),
                ));
            }
        }

        let (bus, halt_rx) = EventBus::new();
        let bus = Arc::new(bus);
        let status = PackStatusBoard::new(packs.iter().map(|p| p.name().to_string()));
        status.watch(bus.subscribe());
        let mapping = trailpack_mapping(&packs);

        Ok(Self {
            bus,
            halt_rx,
            packs,
            mapping,
            status,
        })
    }

    /// Look up a pack by name.
    pub fn pack(&self, name: &str) -> Option<&Arc<dyn Trailpack>> {
        self.mapping.get(name)
    }

    /// All non-system packs, in input order.
    pub fn userland(&self) -> Vec<Arc<dyn Trailpack>> {
        userland_trailpacks(&self.packs)
    }

    /// Event-derived state of one pack.
    pub fn state(&self, name: &str) -> Option<PackState> {
        self.status.get(name)
    }

    /// Shared bus handle, for hosts that emit extra events packs listen on.
    pub fn bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    /// Bind all lifecycle listeners, emit `trails:start`, and wait for
    /// `trails:ready` or the first failure. Call once.
    pub async fn start(&mut self) -> Result<(), TrailsError> {
        info!(packs = self.packs.len(), "starting trailpack lifecycle");
        let bus: Arc<dyn LifecycleBus> = self.bus.clone();
        coordinator::bind_phase_listeners(&bus, &self.packs);
        coordinator::bind_method_listeners(&bus, &self.packs);
        self.bus.emit(events::TRAILS_START);

        match bus.after(vec![events::TRAILS_READY.to_string()]).await {
            Ok(()) => {
                info!("all trailpacks initialized");
                Ok(())
            }
            Err(_) => {
                // The wait only ever sees Halted; the sink holds the root
                // cause, pushed there before any waiter was failed.
                Err(self.halt_rx.recv().await.unwrap_or(TrailsError::Halted))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::time::{sleep, timeout, Duration};
    use trails_core::events::{pack_event, Phase, ALL_VALIDATED, TRAILS_READY};

    use crate::trailpack::TrailpackConfig;

    struct ScriptedPack {
        name: String,
        config: TrailpackConfig,
        order: Arc<Mutex<Vec<String>>>,
        fail_validate: bool,
    }

    impl ScriptedPack {
        fn new(
            name: &str,
            configure_listen: &[&str],
            order: &Arc<Mutex<Vec<String>>>,
        ) -> Arc<dyn Trailpack> {
            let mut config = TrailpackConfig::default();
            config.lifecycle.configure.listen =
                configure_listen.iter().map(|s| s.to_string()).collect();
            Arc::new(Self {
                name: name.to_string(),
                config,
                order: Arc::clone(order),
                fail_validate: false,
            })
        }

        fn broken(name: &str, order: &Arc<Mutex<Vec<String>>>) -> Arc<dyn Trailpack> {
            Arc::new(Self {
                name: name.to_string(),
                config: TrailpackConfig::default(),
                order: Arc::clone(order),
                fail_validate: true,
            })
        }

        fn record(&self, phase: &str) {
            self.order.lock().unwrap().push(format!("{}:{phase}", self.name));
        }
    }

    #[async_trait]
    impl Trailpack for ScriptedPack {
        fn name(&self) -> &str {
            &self.name
        }

        fn config(&self) -> &TrailpackConfig {
            &self.config
        }

        async fn validate(&self) -> anyhow::Result<()> {
            self.record("validate");
            if self.fail_validate {
                bail!("{} has a broken precondition", self.name);
            }
            Ok(())
        }

        async fn configure(&self) -> anyhow::Result<()> {
            self.record("configure");
            Ok(())
        }

        async fn initialize(&self) -> anyhow::Result<()> {
            self.record("initialize");
            Ok(())
        }
    }

    #[tokio::test]
    async fn three_pack_startup_reaches_ready_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let packs = vec![
            ScriptedPack::new("core", &[], &order),
            ScriptedPack::new("a", &[], &order),
            ScriptedPack::new("b", &["trailpack:a:configured"], &order),
        ];
        let mut runner = LifecycleRunner::new(packs).unwrap();
        let mut observed = runner.bus().subscribe();

        runner.start().await.unwrap();

        let mut seen = Vec::new();
        loop {
            let event = observed.recv().await.unwrap();
            let done = event == TRAILS_READY;
            seen.push(event);
            if done {
                break;
            }
        }

        let at = |name: &str| {
            seen.iter()
                .position(|e| e == name)
                .unwrap_or_else(|| panic!("{name} never fired"))
        };

        // B configures only after both A's configured event and the
        // validate gate.
        let b_configured = at(&pack_event("b", Phase::Configure));
        assert!(at(&pack_event("a", Phase::Configure)) < b_configured);
        assert!(at(ALL_VALIDATED) < b_configured);

        // Ready fires exactly once, after every pack initialized.
        assert_eq!(seen.iter().filter(|e| *e == TRAILS_READY).count(), 1);
        assert_eq!(seen.last().map(String::as_str), Some(TRAILS_READY));
        for name in ["core", "a", "b"] {
            assert!(at(&pack_event(name, Phase::Initialize)) < at(TRAILS_READY));
        }

        // No stray events queued after ready.
        assert!(timeout(Duration::from_millis(50), observed.recv())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn status_board_converges_to_initialized() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let packs = vec![
            ScriptedPack::new("core", &[], &order),
            ScriptedPack::new("web", &[], &order),
        ];
        let mut runner = LifecycleRunner::new(packs).unwrap();
        runner.start().await.unwrap();

        for _ in 0..50 {
            let done = ["core", "web"]
                .iter()
                .all(|n| runner.state(n) == Some(PackState::Initialized));
            if done {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("status board never converged: {:?}", runner.status.snapshot());
    }

    #[tokio::test]
    async fn start_surfaces_the_first_phase_failure() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let packs = vec![
            ScriptedPack::new("ok", &[], &order),
            ScriptedPack::broken("bad", &order),
        ];
        let mut runner = LifecycleRunner::new(packs).unwrap();

        let err = runner.start().await.unwrap_err();
        match err {
            TrailsError::PhaseFailed { pack, phase, .. } => {
                assert_eq!(pack, "bad");
                assert_eq!(phase, Phase::Validate);
            }
            other => panic!("expected PhaseFailed, got {other}"),
        }

        // The broken pack never progressed past validate.
        let order = order.lock().unwrap();
        assert!(!order.iter().any(|c| c == "bad:configure"));
        assert!(!order.iter().any(|c| c == "bad:initialize"));
    }

    #[tokio::test]
    async fn rejects_unnamed_packs() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let packs = vec![ScriptedPack::new("", &[], &order)];
        assert!(matches!(
            LifecycleRunner::new(packs),
            Err(TrailsError::InvalidPack(_))
        ));
    }

    #[tokio::test]
    async fn accessors_expose_mapping_and_userland() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let packs = vec![
            ScriptedPack::new("core", &[], &order),
            ScriptedPack::new("auth", &[], &order),
        ];
        let runner = LifecycleRunner::new(packs).unwrap();

        assert_eq!(runner.pack("auth").map(|p| p.name().to_string()), Some("auth".into()));
        assert!(runner.pack("nope").is_none());

        let userland: Vec<String> =
            runner.userland().iter().map(|p| p.name().to_string()).collect();
        assert_eq!(userland, vec!["auth".to_string()]);
        assert_eq!(runner.state("core"), Some(PackState::Pending));
    }
}
