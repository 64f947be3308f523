//! The engine facade and its run handle.

use chrono::Utc;
use deliberate_config::{AppConfig, MAX_EVENT_CAPACITY};
use deliberate_core::{
    EngineEvent, EventBus, Fact, FactError, FactKey, LoopError, Production, ProductionError,
    ProductionId, Reflex, RuleMatcher, StopReason, WorkingMemory,
};
use deliberate_matcher::ScanMatcher;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::deliberation::{self, CycleOutcome, EngineState};
use crate::reactive::{self, ReactiveRegistry};
use crate::registry::ProductionRegistry;
use crate::settings::EngineSettings;
use crate::stats::{LoopStats, StatsSnapshot};

/// State shared between the facade, the deliberation task and the poller.
pub(crate) struct Shared {
    /// The coordination lock.
    pub(crate) state: Mutex<EngineState>,
    pub(crate) reflexes: Mutex<ReactiveRegistry>,
    pub(crate) settings: EngineSettings,
    pub(crate) events: EventBus,
    pub(crate) stats: LoopStats,
}

/// A reactive-deliberative agent.
///
/// Cloning is cheap and every clone drives the same engine.
#[derive(Clone)]
pub struct ReactiveDeliberative {
    shared: Arc<Shared>,
}

impl ReactiveDeliberative {
    /// Create an engine over `matcher`.
    pub fn new(settings: EngineSettings, matcher: Box<dyn RuleMatcher>) -> Self {
        let memory = WorkingMemory::new(matcher);
        debug!(matcher = %memory.matcher_name(), "Engine created");
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(EngineState {
                    memory,
                    registry: ProductionRegistry::new(),
                }),
                reflexes: Mutex::new(ReactiveRegistry::default()),
                events: EventBus::new(settings.event_capacity.clamp(1, MAX_EVENT_CAPACITY)),
                stats: LoopStats::default(),
                settings,
            }),
        }
    }

    /// Create an engine over the built-in re-scan matcher.
    pub fn with_settings(settings: EngineSettings) -> Self {
        Self::new(settings, Box::new(ScanMatcher::new()))
    }

    /// Create an engine from loaded configuration. Seeds `[facts]`; rules and
    /// reflexes are registered by the caller.
    pub async fn from_config(config: &AppConfig) -> Self {
        let engine = Self::with_settings(EngineSettings::from_config(config));
        for (name, value) in &config.facts {
            engine.set_fact(FactKey::from(name.as_str()), value.clone()).await;
        }
        engine
    }

    pub fn settings(&self) -> EngineSettings {
        self.shared.settings
    }

    /// Assign `value` under `key`, or under a fresh positional index when
    /// `key` is `None`. Returns the key used.
    pub async fn add_fact(&self, value: impl Into<Value>, key: Option<FactKey>) -> FactKey {
        let mut state = self.shared.state.lock().await;
        state.memory.set(key, value)
    }

    pub async fn set_fact(&self, key: impl Into<FactKey>, value: impl Into<Value>) {
        let mut state = self.shared.state.lock().await;
        state.memory.assign(key, value);
    }

    pub async fn remove_fact(&self, key: &FactKey) -> Result<Value, FactError> {
        let mut state = self.shared.state.lock().await;
        state.memory.unset(key)
    }

    /// Snapshot of the fact.
    pub async fn fact(&self) -> Fact {
        self.shared.state.lock().await.memory.fact().clone()
    }

    /// Matcher notifications sent since construction.
    pub async fn notifications(&self) -> u64 {
        self.shared.state.lock().await.memory.notifications()
    }

    pub async fn add_production(&self, production: Production) -> ProductionId {
        let mut state = self.shared.state.lock().await;
        let condition = production.condition();
        let name = production.name().to_string();
        let priority = production.priority();
        let id = state.registry.insert(production);
        state.memory.register_condition(id, condition);
        info!(production = %name, id = %id, priority, "Production registered");
        id
    }

    pub async fn remove_production(&self, id: ProductionId) -> Result<(), ProductionError> {
        let mut state = self.shared.state.lock().await;
        let production = state.registry.remove(id)?;
        state.memory.unregister_condition(id);
        info!(production = %production.name(), id = %id, "Production removed");
        Ok(())
    }

    /// Names and priorities of registered productions, in registration order.
    pub async fn productions(&self) -> Vec<(ProductionId, String, i32)> {
        let state = self.shared.state.lock().await;
        state
            .registry
            .iter()
            .map(|(id, p)| (id, p.name().to_string(), p.priority()))
            .collect()
    }

    /// Register a reflex. Only allowed before [`start`](Self::start).
    pub async fn add_reactive_action(
        &self,
        reflex: impl Reflex + 'static,
        force: bool,
    ) -> Result<(), LoopError> {
        self.add_boxed_reactive_action(Box::new(reflex), force).await
    }

    pub async fn add_boxed_reactive_action(
        &self,
        reflex: Box<dyn Reflex>,
        force: bool,
    ) -> Result<(), LoopError> {
        self.shared.reflexes.lock().await.register(reflex, force)
    }

    /// Run exactly one deliberation cycle, without the idle delay.
    pub async fn step(&self) -> Result<CycleOutcome, LoopError> {
        deliberation::cycle(&self.shared).await
    }

    /// Spawn the deliberation loop, plus the reflex poller if any reflexes
    /// are registered. Fails if the loop was already started.
    pub async fn start(&self) -> Result<LoopHandle, LoopError> {
        let entries = {
            let mut reflexes = self.shared.reflexes.lock().await;
            if reflexes.is_sealed() {
                return Err(LoopError::AlreadyRunning);
            }
            reflexes.seal()
        };

        let (cancel, cancel_rx) = watch::channel(false);
        let shared = Arc::clone(&self.shared);
        info!(reflexes = entries.len(), "Starting reactive-deliberative loop");

        let task = tokio::spawn(async move {
            let poller = (!entries.is_empty()).then(|| {
                tokio::spawn(reactive::poll_loop(
                    Arc::clone(&shared),
                    entries,
                    cancel_rx.clone(),
                ))
            });
            let mut deliberation =
                tokio::spawn(deliberation::run_loop(Arc::clone(&shared), cancel_rx));

            let result = match poller {
                None => flatten(deliberation.await),
                Some(mut poller) => tokio::select! {
                    res = &mut deliberation => {
                        let result = flatten(res);
                        if result.is_err() {
                            poller.abort();
                        }
                        match poller.await {
                            Err(e) if e.is_panic() && result.is_ok() => {
                                Err(LoopError::Crashed(format!("reactive poller: {e}")))
                            }
                            _ => result,
                        }
                    }
                    res = &mut poller => match res {
                        Err(e) if e.is_panic() => {
                            deliberation.abort();
                            Err(LoopError::Crashed(format!("reactive poller: {e}")))
                        }
                        // The poller only returns on cancellation.
                        _ => flatten((&mut deliberation).await),
                    },
                },
            };

            let reason = match &result {
                Ok(()) => StopReason::Cancelled,
                Err(e) => StopReason::Fatal {
                    message: e.to_string(),
                },
            };
            shared.events.publish(EngineEvent::LoopStopped {
                reason,
                cycles: shared.stats.cycles(),
                timestamp: Utc::now(),
            });
            result
        });

        Ok(LoopHandle { cancel, task })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<EngineEvent>> {
        self.shared.events.subscribe()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }
}

impl Default for ReactiveDeliberative {
    fn default() -> Self {
        Self::with_settings(EngineSettings::default())
    }
}

fn flatten(
    res: Result<Result<(), LoopError>, tokio::task::JoinError>,
) -> Result<(), LoopError> {
    match res {
        Ok(result) => result,
        Err(e) => Err(LoopError::Crashed(e.to_string())),
    }
}

/// Handle to a running loop. Dropping it cancels the loop.
#[derive(Debug)]
pub struct LoopHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<Result<(), LoopError>>,
}

impl LoopHandle {
    /// Ask the loop to stop after the current cycle.
    pub fn cancel(&self) {
        // No receivers means the loop already ended
        let _ = self.cancel.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the loop to end. `Ok` means it was cancelled; `Err` carries
    /// the fatal error that stopped it.
    pub async fn join(self) -> Result<(), LoopError> {
        // Keep the sender alive until the loop ends on its own.
        let LoopHandle { cancel, task } = self;
        let result = flatten(task.await);
        drop(cancel);
        result
    }

    pub async fn shutdown(self) -> Result<(), LoopError> {
        self.cancel();
        self.join().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use deliberate_core::{
        Action, ActionError, Condition, Pattern, action_fn, reflex_fn,
    };
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn fast() -> EngineSettings {
        EngineSettings::default()
            .with_idle_delay(ms(1))
            .with_poll_interval(ms(1))
    }

    fn setter(key: &'static str, value: &'static str) -> impl Action + 'static {
        action_fn(move |m| {
            m.assign(key, value);
            Ok(())
        })
    }

    struct Hang;

    #[async_trait]
    impl Action for Hang {
        async fn fire(&self, _memory: &mut WorkingMemory) -> Result<(), ActionError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn add_and_remove_facts_notify_once_each() {
        let engine = ReactiveDeliberative::default();
        assert_eq!(engine.add_fact("a", None).await, FactKey::Index(0));
        assert_eq!(engine.add_fact("b", None).await, FactKey::Index(1));
        engine.set_fact("state", "not loaded").await;
        assert_eq!(engine.remove_fact(&FactKey::Index(0)).await.unwrap(), json!("a"));

        let fact = engine.fact().await;
        assert_eq!(fact.len(), 2);
        assert_eq!(fact.get(&FactKey::Index(1)), Some(&json!("b")));
        assert_eq!(engine.notifications().await, 4);
    }

    #[tokio::test]
    async fn removing_missing_fact_fails() {
        let engine = ReactiveDeliberative::default();
        let err = engine.remove_fact(&FactKey::name("ghost")).await.unwrap_err();
        assert_eq!(err, FactError::NotFound(FactKey::name("ghost")));
        assert_eq!(engine.notifications().await, 0);
    }

    #[tokio::test]
    async fn loads_in_one_cycle() {
        let engine = ReactiveDeliberative::default();
        engine.set_fact("state", "not loaded").await;
        engine
            .add_production(Production::new(
                "load",
                Pattern::new().require("state", "not loaded"),
                setter("state", "loaded"),
            ))
            .await;

        let outcome = engine.step().await.unwrap();
        assert_eq!(outcome.production(), Some("load"));
        assert_eq!(engine.fact().await.get_named("state"), Some(&json!("loaded")));
        assert_eq!(engine.step().await.unwrap(), CycleOutcome::NoMatch);

        let stats = engine.stats();
        assert_eq!(stats.cycles, 2);
        assert_eq!(stats.fired, 1);
        assert_eq!(stats.idle, 1);
    }

    #[tokio::test]
    async fn higher_priority_effect_is_observed() {
        let engine = ReactiveDeliberative::default();
        engine
            .add_production(Production::new("one", Pattern::new(), setter("by", "one")).with_priority(1))
            .await;
        engine
            .add_production(Production::new("two", Pattern::new(), setter("by", "two")).with_priority(2))
            .await;

        engine.step().await.unwrap();
        assert_eq!(engine.fact().await.get_named("by"), Some(&json!("two")));
    }

    #[tokio::test]
    async fn firing_order_is_deterministic() {
        async fn trace() -> Vec<Option<String>> {
            let engine = ReactiveDeliberative::default();
            engine.set_fact("n", 0).await;
            for (name, priority) in [("a", 0), ("b", 3), ("c", 3), ("d", 1)] {
                let cond = move |f: &Fact| f.get_named("last") != Some(&json!(name));
                engine
                    .add_production(
                        Production::new(name, cond, setter("last", name)).with_priority(priority),
                    )
                    .await;
            }
            let mut fired = vec![];
            for _ in 0..6 {
                fired.push(engine.step().await.unwrap().production().map(str::to_string));
            }
            fired
        }

        let first = trace().await;
        assert_eq!(first[0].as_deref(), Some("b"));
        assert_eq!(first[1].as_deref(), Some("c"));
        assert_eq!(first, trace().await);
    }

    #[tokio::test]
    async fn removed_production_stops_firing() {
        let engine = ReactiveDeliberative::default();
        let id = engine
            .add_production(Production::new("always", Pattern::new(), setter("x", "y")))
            .await;
        assert_eq!(engine.productions().await.len(), 1);
        engine.remove_production(id).await.unwrap();
        assert_eq!(engine.step().await.unwrap(), CycleOutcome::NoMatch);
        assert_eq!(
            engine.remove_production(id).await.unwrap_err(),
            ProductionError::NotFound(id)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn hung_action_costs_at_most_one_timeout_per_cycle() {
        let engine =
            ReactiveDeliberative::with_settings(EngineSettings::default().with_idle_delay(ms(100)));
        engine
            .add_production(Production::new("hang", Pattern::new(), Hang).with_timeout(ms(50)))
            .await;

        let mut events = engine.subscribe();
        let started = tokio::time::Instant::now();
        let handle = engine.start().await.unwrap();

        let mut timeouts = 0;
        while timeouts < 3 {
            if let EngineEvent::ActionTimedOut { timeout_ms, .. } = events.recv().await.unwrap().as_ref() {
                assert_eq!(*timeout_ms, 50);
                timeouts += 1;
            }
        }
        assert!(started.elapsed() <= ms(3 * (100 + 50)));

        handle.shutdown().await.unwrap();
        assert_eq!(engine.stats().timeouts, 3);
    }

    /// Flags `busy` for the duration of its run, yielding in between.
    struct Critical;

    #[async_trait]
    impl Action for Critical {
        async fn fire(&self, memory: &mut WorkingMemory) -> Result<(), ActionError> {
            memory.assign("busy", true);
            for _ in 0..5 {
                tokio::task::yield_now().await;
            }
            memory.assign("busy", false);
            Ok(())
        }
    }

    /// Forced reflex that records any time it sees a fire step mid-flight.
    struct Auditor {
        violations: Arc<AtomicUsize>,
        runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Reflex for Auditor {
        fn name(&self) -> &str {
            "auditor"
        }

        async fn check(&mut self) -> bool {
            true
        }

        async fn act(&mut self, memory: Option<&mut WorkingMemory>) -> Result<(), ActionError> {
            let memory = memory.ok_or_else(|| ActionError::failed("no working memory"))?;
            if memory.get_named("busy") == Some(&json!(true)) {
                self.violations.fetch_add(1, Ordering::SeqCst);
            }
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn forced_reflexes_never_interleave_with_fire_steps() {
        let engine = ReactiveDeliberative::with_settings(fast());
        engine
            .add_production(Production::new("critical", Pattern::new(), Critical))
            .await;

        let violations = Arc::new(AtomicUsize::new(0));
        let runs = Arc::new(AtomicUsize::new(0));
        engine
            .add_reactive_action(
                Auditor {
                    violations: Arc::clone(&violations),
                    runs: Arc::clone(&runs),
                },
                true,
            )
            .await
            .unwrap();

        let handle = engine.start().await.unwrap();
        tokio::time::sleep(ms(200)).await;
        handle.shutdown().await.unwrap();

        assert!(runs.load(Ordering::SeqCst) > 0);
        assert!(engine.stats().fired > 0);
        assert_eq!(violations.load(Ordering::SeqCst), 0);
        assert_eq!(engine.fact().await.get_named("busy"), Some(&json!(false)));
    }

    /// Sleeps while holding working memory, flagging itself in flight.
    struct Slow {
        in_flight: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Action for Slow {
        async fn fire(&self, memory: &mut WorkingMemory) -> Result<(), ActionError> {
            self.in_flight.store(true, Ordering::SeqCst);
            tokio::time::sleep(ms(200)).await;
            self.in_flight.store(false, Ordering::SeqCst);
            memory.assign("state", "done");
            Ok(())
        }
    }

    #[tokio::test]
    async fn unforced_reflex_runs_during_long_action() {
        let engine = ReactiveDeliberative::with_settings(fast());
        let in_flight = Arc::new(AtomicBool::new(false));
        let overlapped = Arc::new(AtomicBool::new(false));

        let pending = |f: &Fact| f.get_named("state").is_none();
        engine
            .add_production(
                Production::new(
                    "slow",
                    pending,
                    Slow {
                        in_flight: Arc::clone(&in_flight),
                    },
                )
                .with_timeout(ms(1000)),
            )
            .await;

        let watching = Arc::clone(&in_flight);
        let seen = Arc::clone(&overlapped);
        engine
            .add_reactive_action(
                reflex_fn(
                    "observer",
                    move || watching.load(Ordering::SeqCst),
                    move |memory| {
                        if memory.is_none() {
                            seen.store(true, Ordering::SeqCst);
                        }
                        Ok(())
                    },
                ),
                false,
            )
            .await
            .unwrap();

        let handle = engine.start().await.unwrap();
        let observed = tokio::time::timeout(ms(2000), async {
            while !overlapped.load(Ordering::SeqCst) {
                tokio::time::sleep(ms(5)).await;
            }
        })
        .await;
        handle.shutdown().await.unwrap();

        assert!(observed.is_ok());
        assert!(engine.stats().reflex_runs > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_waits_for_in_flight_action() {
        let engine = ReactiveDeliberative::with_settings(fast());
        let in_flight = Arc::new(AtomicBool::new(false));
        let pending = |f: &Fact| f.get_named("state").is_none();
        engine
            .add_production(
                Production::new(
                    "slow",
                    pending,
                    Slow {
                        in_flight: Arc::clone(&in_flight),
                    },
                )
                .with_timeout(ms(1000)),
            )
            .await;

        let handle = engine.start().await.unwrap();
        while !in_flight.load(Ordering::SeqCst) {
            tokio::time::sleep(ms(1)).await;
        }
        // 50ms into a 200ms action.
        tokio::time::sleep(ms(50)).await;
        handle.shutdown().await.unwrap();

        assert!(!in_flight.load(Ordering::SeqCst));
        assert_eq!(engine.fact().await.get_named("state"), Some(&json!("done")));
        let stats = engine.stats();
        assert_eq!(stats.fired, 1);
        assert_eq!(stats.timeouts, 0);
    }

    /// Blocks its first check until released, then panics.
    struct Tripwire {
        entered: Arc<AtomicBool>,
        release: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Reflex for Tripwire {
        fn name(&self) -> &str {
            "tripwire"
        }

        async fn check(&mut self) -> bool {
            self.entered.store(true, Ordering::SeqCst);
            while !self.release.load(Ordering::SeqCst) {
                tokio::time::sleep(ms(1)).await;
            }
            panic!("tripwire");
        }

        async fn act(&mut self, _memory: Option<&mut WorkingMemory>) -> Result<(), ActionError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn poller_panic_after_clean_stop_is_reported() {
        let engine = ReactiveDeliberative::with_settings(fast());
        let entered = Arc::new(AtomicBool::new(false));
        let release = Arc::new(AtomicBool::new(false));
        engine
            .add_reactive_action(
                Tripwire {
                    entered: Arc::clone(&entered),
                    release: Arc::clone(&release),
                },
                false,
            )
            .await
            .unwrap();

        let mut events = engine.subscribe();
        let handle = engine.start().await.unwrap();
        while !entered.load(Ordering::SeqCst) {
            tokio::time::sleep(ms(1)).await;
        }
        handle.cancel();
        // Deliberation stops on its own while the poller is still inside check.
        tokio::time::sleep(ms(50)).await;
        release.store(true, Ordering::SeqCst);

        let err = handle.join().await.unwrap_err();
        assert!(matches!(err, LoopError::Crashed(ref msg) if msg.contains("reactive poller")));

        loop {
            if let EngineEvent::LoopStopped { reason, .. } = events.recv().await.unwrap().as_ref() {
                assert!(matches!(reason, StopReason::Fatal { .. }));
                break;
            }
        }
    }

    #[tokio::test]
    async fn oversized_event_capacity_is_clamped() {
        let settings = EngineSettings {
            event_capacity: usize::MAX,
            ..fast()
        };
        let engine = ReactiveDeliberative::with_settings(settings);
        let mut events = engine.subscribe();
        engine.step().await.unwrap();
        assert!(matches!(
            events.recv().await.unwrap().as_ref(),
            EngineEvent::CycleCompleted { .. }
        ));
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let engine = ReactiveDeliberative::with_settings(fast());
        let handle = engine.start().await.unwrap();
        assert_eq!(engine.start().await.unwrap_err(), LoopError::AlreadyRunning);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn reflexes_are_sealed_after_start() {
        let engine = ReactiveDeliberative::with_settings(fast());
        let handle = engine.start().await.unwrap();
        let err = engine
            .add_reactive_action(reflex_fn("late", || false, |_| Ok(())), false)
            .await
            .unwrap_err();
        assert_eq!(err, LoopError::ReflexesSealed);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_idle_sleep() {
        let engine = ReactiveDeliberative::with_settings(
            EngineSettings::default().with_idle_delay(Duration::from_secs(3600)),
        );
        let mut events = engine.subscribe();
        let handle = engine.start().await.unwrap();

        // Wait for the first cycle, then cancel during the hour-long sleep.
        loop {
            if matches!(events.recv().await.unwrap().as_ref(), EngineEvent::CycleCompleted { .. }) {
                break;
            }
        }
        let started = tokio::time::Instant::now();
        handle.shutdown().await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));

        loop {
            if let EngineEvent::LoopStopped { reason, cycles, .. } = events.recv().await.unwrap().as_ref() {
                assert_eq!(*reason, StopReason::Cancelled);
                assert_eq!(*cycles, 1);
                break;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_cancels() {
        let engine = ReactiveDeliberative::default();
        let mut events = engine.subscribe();
        let handle = engine.start().await.unwrap();
        drop(handle);

        loop {
            if let EngineEvent::LoopStopped { reason, .. } = events.recv().await.unwrap().as_ref() {
                assert_eq!(*reason, StopReason::Cancelled);
                break;
            }
        }
    }

    /// Reports a production the registry never heard of.
    struct LyingMatcher;

    impl RuleMatcher for LyingMatcher {
        fn name(&self) -> &str {
            "lying"
        }
        fn add_fact(&mut self, _fact: &Fact) {}
        fn update_fact(&mut self, _fact: &Fact) {}
        fn add_production(&mut self, _id: ProductionId, _condition: Arc<dyn Condition>) {}
        fn remove_production(&mut self, _id: ProductionId) -> bool {
            true
        }
        fn run_step(&mut self) -> Vec<ProductionId> {
            vec![ProductionId(9)]
        }
    }

    #[tokio::test]
    async fn desynchronised_matcher_stops_the_loop() {
        let engine = ReactiveDeliberative::new(fast(), Box::new(LyingMatcher));
        let mut events = engine.subscribe();
        let handle = engine.start().await.unwrap();

        let err = handle.join().await.unwrap_err();
        assert_eq!(err, LoopError::UnknownProduction(ProductionId(9)));
        assert!(err.is_fatal());

        loop {
            if let EngineEvent::LoopStopped { reason, .. } = events.recv().await.unwrap().as_ref() {
                assert!(matches!(reason, StopReason::Fatal { .. }));
                break;
            }
        }
    }

    #[tokio::test]
    async fn from_config_seeds_facts() {
        let mut config = AppConfig::default();
        config.facts.insert("light_color".into(), json!("red"));
        config.deliberation.idle_delay_ms = 5;

        let engine = ReactiveDeliberative::from_config(&config).await;
        assert_eq!(engine.settings().idle_delay, ms(5));
        assert_eq!(
            engine.fact().await.get_named("light_color"),
            Some(&json!("red"))
        );
    }

    #[tokio::test]
    async fn seeded_hash_keys_are_positional() {
        let mut config = AppConfig::default();
        config.facts.insert("#0".into(), json!("seed"));
        let engine = ReactiveDeliberative::from_config(&config).await;

        let fact = engine.fact().await;
        assert_eq!(fact.get(&FactKey::Index(0)), Some(&json!("seed")));
        assert_eq!(engine.add_fact("next", None).await, FactKey::Index(1));

        engine
            .add_production(Production::new(
                "consume",
                Pattern::new().require("#0", "seed"),
                action_fn(|m| {
                    m.unset(&FactKey::Index(0))?;
                    Ok(())
                }),
            ))
            .await;
        assert_eq!(engine.step().await.unwrap().production(), Some("consume"));
        assert!(!engine.fact().await.contains(&FactKey::Index(0)));
    }
}
