//! Shared harness for the lifecycle behaviour suites.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tokio::runtime::Runtime;

use crate::component::ComponentData;
use crate::error::LifecycleError;
use crate::lifecycle::{BootHandle, Lifecycle, StartPayload};
use crate::namespace::{Container, ModuleContext};
use crate::orchestrator::{BootPhase, BootReport, ExclusionReason, HookOutcome};
use crate::reporter::BootReporter;
use crate::settings::LifecycleSettings;

/// Evaluation budget used by scenarios so stalls are detected quickly.
pub const SCENARIO_BUDGET: Duration = Duration::from_millis(25);

/// Time a stalling module definition blocks for.
pub const STALL: Duration = Duration::from_millis(250);

/// Boot events captured for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootEvent {
    /// Boot started with the given module count.
    Starting(usize),
    /// A phase was entered.
    Phase(BootPhase),
    /// A module was admitted.
    Admitted(String),
    /// A module was excluded.
    Excluded(String, ExclusionReason),
    /// An awake unit finished.
    AwakeFinished(String, HookOutcome),
    /// A start unit was dispatched.
    StartDispatched(String),
    /// Phantom components were found.
    Missing(Vec<String>),
    /// Boot finished.
    Completed,
}

/// Reporter that keeps every event in order.
#[derive(Debug, Default)]
pub struct RecordingBootReporter {
    events: Mutex<Vec<BootEvent>>,
}

impl RecordingBootReporter {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<BootEvent> {
        self.events
            .lock()
            .expect("boot reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: BootEvent) {
        self.events
            .lock()
            .expect("boot reporter mutex poisoned")
            .push(event);
    }
}

impl BootReporter for RecordingBootReporter {
    fn boot_starting(&self, modules: usize) {
        self.record(BootEvent::Starting(modules));
    }

    fn phase_entered(&self, phase: BootPhase) {
        self.record(BootEvent::Phase(phase));
    }

    fn module_admitted(&self, name: &str) {
        self.record(BootEvent::Admitted(name.to_owned()));
    }

    fn module_excluded(&self, name: &str, reason: &ExclusionReason) {
        self.record(BootEvent::Excluded(name.to_owned(), reason.clone()));
    }

    fn awake_finished(&self, name: &str, outcome: &HookOutcome) {
        self.record(BootEvent::AwakeFinished(name.to_owned(), outcome.clone()));
    }

    fn start_dispatched(&self, name: &str) {
        self.record(BootEvent::StartDispatched(name.to_owned()));
    }

    fn missing_components(&self, names: &[String]) {
        self.record(BootEvent::Missing(names.to_vec()));
    }

    fn boot_completed(&self, _report: &BootReport) {
        self.record(BootEvent::Completed);
    }
}

/// Counters shared by every hook a scenario installs.
#[derive(Debug, Default)]
pub struct HookRecorder {
    awake_finished: AtomicUsize,
    starts: AtomicUsize,
    awake_seen_by_start: Mutex<Vec<usize>>,
}

impl HookRecorder {
    /// Number of `awake` hooks that have finished.
    pub fn awake_finished(&self) -> usize {
        self.awake_finished.load(Ordering::SeqCst)
    }

    /// Number of `start` hooks that have run.
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// The awake count each `start` hook observed when it ran.
    pub fn awake_seen_by_start(&self) -> Vec<usize> {
        self.awake_seen_by_start
            .lock()
            .expect("hook log mutex poisoned")
            .clone()
    }
}

/// Scenario world shared across steps.
pub struct TestWorld {
    runtime: Runtime,
    pub reporter: Arc<RecordingBootReporter>,
    pub hooks: Arc<HookRecorder>,
    pub lifecycle: Arc<Lifecycle>,
    coordinators: Vec<Container>,
    boot: Option<BootHandle>,
    pub report: Option<Result<BootReport, LifecycleError>>,
    pub start_errors: Vec<LifecycleError>,
    pub subscriptions: Arc<Mutex<Vec<String>>>,
    waiters: Vec<tokio::task::JoinHandle<Result<StartPayload, LifecycleError>>>,
    pub waited: Vec<StartPayload>,
}

impl TestWorld {
    /// Builds a world with an empty lifecycle.
    pub fn new() -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .build()
            .expect("failed to build scenario runtime");
        let reporter = Arc::new(RecordingBootReporter::default());
        let settings = LifecycleSettings::default().with_evaluation_budget(SCENARIO_BUDGET);
        let lifecycle = Arc::new(Lifecycle::with_reporter(settings, reporter.clone()));
        Self {
            runtime,
            reporter,
            hooks: Arc::new(HookRecorder::default()),
            lifecycle,
            coordinators: Vec::new(),
            boot: None,
            report: None,
            start_errors: Vec::new(),
            subscriptions: Arc::new(Mutex::new(Vec::new())),
            waiters: Vec::new(),
            waited: Vec::new(),
        }
    }

    /// Queues a coordinator with an `awake` hook that yields before finishing
    /// and a `start` hook that records how many awakes had finished.
    pub fn add_awake_and_start(&mut self, name: &str) {
        let owned = name.to_owned();
        let hooks = Arc::clone(&self.hooks);
        self.coordinators.push(Container::module(name, move |context: &ModuleContext| {
            let for_awake = Arc::clone(&hooks);
            let for_start = Arc::clone(&hooks);
            context.component(
                &owned,
                ComponentData::new()
                    .on_awake(move |_| {
                        let tally = Arc::clone(&for_awake);
                        async move {
                            tokio::time::sleep(Duration::from_millis(5)).await;
                            tally.awake_finished.fetch_add(1, Ordering::SeqCst);
                            Ok(())
                        }
                    })
                    .on_start(move |_| {
                        let tally = Arc::clone(&for_start);
                        async move {
                            let seen = tally.awake_finished.load(Ordering::SeqCst);
                            tally
                                .awake_seen_by_start
                                .lock()
                                .expect("hook log mutex poisoned")
                                .push(seen);
                            tally.starts.fetch_add(1, Ordering::SeqCst);
                            Ok(())
                        }
                    }),
            )
        }));
    }

    /// Queues a coordinator with only a `start` hook.
    pub fn add_start_only(&mut self, name: &str) {
        let owned = name.to_owned();
        let hooks = Arc::clone(&self.hooks);
        self.coordinators.push(Container::module(name, move |context: &ModuleContext| {
            let for_start = Arc::clone(&hooks);
            context.component(
                &owned,
                ComponentData::new().on_start(move |_| {
                    let tally = Arc::clone(&for_start);
                    async move {
                        tally.starts.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }),
            )
        }));
    }

    /// Queues a coordinator whose definition blocks past the budget.
    pub fn add_stalling(&mut self, name: &str) {
        let owned = name.to_owned();
        self.coordinators.push(Container::module(name, move |context: &ModuleContext| {
            std::thread::sleep(STALL);
            context.component(&owned, ComponentData::new())
        }));
    }

    /// Queues a coordinator that takes a forward reference to `other`.
    pub fn add_referencing(&mut self, name: &str, other: &str) {
        let owned = name.to_owned();
        let target = other.to_owned();
        self.coordinators.push(Container::module(name, move |context: &ModuleContext| {
            let _reference = context.registry().get(&target);
            context.component(&owned, ComponentData::new())
        }));
    }

    /// Subscribes a recorder labelled `label`.
    pub fn subscribe(&self, label: &str) {
        let tag = label.to_owned();
        let sink = Arc::clone(&self.subscriptions);
        self.lifecycle.on_start(move |payload| {
            let text = payload.as_str().unwrap_or_default().to_owned();
            sink.lock()
                .expect("subscription mutex poisoned")
                .push(format!("{tag}:{text}"));
        });
    }

    /// Spawns `count` tasks awaiting the start signal.
    pub fn spawn_waiters(&mut self, count: usize) {
        for _ in 0..count {
            let lifecycle = Arc::clone(&self.lifecycle);
            self.waiters
                .push(self.runtime.spawn(async move { lifecycle.await_start().await }));
        }
    }

    /// Adds queued coordinators, then calls `start` with a string payload.
    pub fn start(&mut self, payload: &str) {
        if !self.coordinators.is_empty() {
            let root = Container::folder("Coordinators").with_children(self.coordinators.drain(..));
            self.lifecycle
                .add_coordinators(&root)
                .expect("coordinators are added before start");
        }
        let _guard = self.runtime.enter();
        match self.lifecycle.start(json!(payload)) {
            Ok(handle) => {
                if self.boot.is_none() {
                    self.boot = Some(handle);
                }
            }
            Err(error) => self.start_errors.push(error),
        }
    }

    /// Waits for the boot task, the dispatched start hooks, and any waiters.
    pub fn settle(&mut self) {
        if let Some(handle) = self.boot.take() {
            self.report = Some(self.runtime.block_on(handle.wait()));
        }
        let expected = self
            .report
            .as_ref()
            .and_then(|report| report.as_ref().ok())
            .map_or(0, |report| report.started.len());
        let hooks = Arc::clone(&self.hooks);
        self.runtime.block_on(async move {
            while hooks.starts() < expected {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        });
        for waiter in self.waiters.drain(..) {
            let payload = self
                .runtime
                .block_on(waiter)
                .expect("waiter task joins")
                .expect("start signal fires");
            self.waited.push(payload);
        }
    }

    /// Successful boot report.
    pub fn boot_report(&self) -> &BootReport {
        self.report
            .as_ref()
            .expect("boot has not settled")
            .as_ref()
            .expect("boot failed")
    }

    /// Runs a future on the scenario runtime.
    pub fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}
