//! Triggers: propagation of a firing through listener steps and downstream triggers.
//!
//! Firing a trigger computes its listener steps in registration order, then
//! fires every trigger in its cached *wave*: the downstream triggers reachable
//! from it, in depth-first insertion order, arranged so a trigger shared by
//! two branches fires once, after both. The wave is rebuilt by the network on
//! every structural edit.
//!
//! A firing that arrives while the previous one is still running is dropped
//! and reported as a skipped cycle; firings are never queued.

use crate::graph::fault::{Fault, FaultSink};
use crate::graph::id::TriggerId;
use crate::graph::loop_mode::LoopMode;
use crate::graph::stats::TriggerStats;
use crate::graph::step::{CycleInfo, StepCell, StepOutcome};
use crate::graph::sync::{lock, read, write};
use crate::graph::worker::{LoopTask, StopToken};
use crossbeam_channel::{select, Receiver};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

/// Result of one `trigger()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Completed(WaveSummary),
    /// The previous firing had not finished; nothing ran.
    Skipped,
}

/// Per-wave step outcome counts, summed over the trigger and its wave.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaveSummary {
    pub computed: usize,
    pub not_ready: usize,
    pub faulted: usize,
    pub skipped_faulted: usize,
    /// Downstream triggers that were busy and dropped this wave.
    pub skipped_triggers: usize,
}

impl WaveSummary {
    fn add(&mut self, outcome: StepOutcome) {
        match outcome {
            StepOutcome::Computed => self.computed += 1,
            StepOutcome::NotReady => self.not_ready += 1,
            StepOutcome::Faulted => self.faulted += 1,
            StepOutcome::SkippedFaulted => self.skipped_faulted += 1,
        }
    }

    fn merge(&mut self, other: WaveSummary) {
        self.computed += other.computed;
        self.not_ready += other.not_ready;
        self.faulted += other.faulted;
        self.skipped_faulted += other.skipped_faulted;
        self.skipped_triggers += other.skipped_triggers;
    }
}

/// Clears the busy flag even if a listener unwinds.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Trigger {
    id: TriggerId,
    name: String,
    listeners: RwLock<Vec<Arc<StepCell>>>,
    downstream: RwLock<Vec<Arc<Trigger>>>,
    wave: RwLock<Vec<Arc<Trigger>>>,
    busy: AtomicBool,
    cycle: AtomicU64,
    sim_time_ns: AtomicU64,
    last_fire: Mutex<Option<Instant>>,
    stats: TriggerStats,
    sink: Arc<dyn FaultSink>,
}

impl Trigger {
    pub fn new(id: TriggerId, name: impl Into<String>, sink: Arc<dyn FaultSink>) -> Self {
        Self {
            id,
            name: name.into(),
            listeners: RwLock::new(Vec::new()),
            downstream: RwLock::new(Vec::new()),
            wave: RwLock::new(Vec::new()),
            busy: AtomicBool::new(false),
            cycle: AtomicU64::new(0),
            sim_time_ns: AtomicU64::new(0),
            last_fire: Mutex::new(None),
            stats: TriggerStats::new(),
            sink,
        }
    }

    pub fn id(&self) -> TriggerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stats(&self) -> &TriggerStats {
        &self.stats
    }

    /// Simulated time accumulated over all completed firings.
    pub fn sim_time(&self) -> Duration {
        Duration::from_nanos(self.sim_time_ns.load(Ordering::Relaxed))
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    // ── Structure (network only, workers stopped) ──

    pub(crate) fn add_listener(&self, step: Arc<StepCell>) {
        let mut listeners = write(&self.listeners);
        if !listeners.iter().any(|s| s.id() == step.id()) {
            listeners.push(step);
        }
    }

    pub(crate) fn remove_listener(&self, step: crate::graph::id::StepId) {
        write(&self.listeners).retain(|s| s.id() != step);
    }

    pub fn listeners(&self) -> Vec<Arc<StepCell>> {
        read(&self.listeners).clone()
    }

    pub(crate) fn set_downstream(&self, downstream: Vec<Arc<Trigger>>) {
        *write(&self.downstream) = downstream;
    }

    pub fn downstream(&self) -> Vec<TriggerId> {
        read(&self.downstream).iter().map(|t| t.id).collect()
    }

    pub(crate) fn set_wave(&self, wave: Vec<Arc<Trigger>>) {
        *write(&self.wave) = wave;
    }

    /// Downstream triggers in the order a firing of this trigger visits them.
    pub fn wave(&self) -> Vec<TriggerId> {
        read(&self.wave).iter().map(|t| t.id).collect()
    }

    // ── Firing ──

    /// Fire this trigger and its wave on the calling thread.
    pub fn trigger(&self, delta: Duration) -> TriggerOutcome {
        let Some(_guard) = self.try_acquire() else {
            return TriggerOutcome::Skipped;
        };

        let started = Instant::now();
        let mut summary = self.run_listeners(delta);
        let wave = read(&self.wave).clone();
        for downstream in &wave {
            match downstream.try_acquire() {
                Some(_downstream_guard) => {
                    let downstream_started = Instant::now();
                    summary.merge(downstream.run_listeners(delta));
                    downstream
                        .stats
                        .record_cycle(downstream_started.elapsed(), delta);
                }
                None => summary.skipped_triggers += 1,
            }
        }
        self.stats.record_cycle(started.elapsed(), delta);
        tracing::trace!("{:?} '{}' wave done: {:?}", self.id, self.name, summary);
        TriggerOutcome::Completed(summary)
    }

    fn try_acquire(&self) -> Option<BusyGuard<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.stats.record_skipped();
            self.sink.report(Fault::SkippedCycle { trigger: self.id });
            return None;
        }
        Some(BusyGuard(&self.busy))
    }

    fn run_listeners(&self, delta: Duration) -> WaveSummary {
        let now = Instant::now();
        if let Some(previous) = lock(&self.last_fire).replace(now) {
            self.stats.record_interval(now.duration_since(previous));
        }

        let time = self.sim_time();
        let cycle = CycleInfo {
            trigger: self.id,
            delta,
            time,
            cycle: self.cycle.fetch_add(1, Ordering::Relaxed),
        };

        let mut summary = WaveSummary::default();
        for step in read(&self.listeners).iter() {
            summary.add(step.on_trigger(&cycle, self.sink.as_ref()));
        }
        self.sim_time_ns.store(
            u64::try_from((time + delta).as_nanos()).unwrap_or(u64::MAX),
            Ordering::Relaxed,
        );
        summary
    }

    pub(crate) fn record_overrun(&self, duration: Duration, interval: Duration) {
        self.stats.record_overrun();
        self.sink.report(Fault::Overrun {
            trigger: self.id,
            duration,
            interval,
        });
    }

    /// Run `on_start` hooks of every step this trigger's firing reaches.
    pub(crate) fn activate(&self) {
        for step in self.reachable_steps() {
            step.activate(self.id, self.sink.as_ref());
        }
    }

    pub(crate) fn deactivate(&self) {
        for step in self.reachable_steps() {
            step.deactivate(self.id, self.sink.as_ref());
        }
    }

    /// Listeners of this trigger and of every trigger in its wave.
    fn reachable_steps(&self) -> Vec<Arc<StepCell>> {
        let mut steps = read(&self.listeners).clone();
        for downstream in read(&self.wave).iter() {
            steps.extend(read(&downstream.listeners).iter().cloned());
        }
        steps
    }

    pub(crate) fn reset_timing(&self) {
        *lock(&self.last_fire) = None;
    }
}

impl std::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trigger")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("listeners", &read(&self.listeners).len())
            .field("wave", &self.wave())
            .finish()
    }
}

/// Out-of-band requests to a running root trigger loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopSignal {
    /// Fire once (single-step mode only).
    Step,
    /// The loop mode changed; re-read it.
    ModeChanged,
}

/// The task a root trigger's worker runs: pace by loop mode, fire, repeat.
pub struct TriggerLoop {
    trigger: Arc<Trigger>,
    mode: Arc<RwLock<LoopMode>>,
    signals: Receiver<LoopSignal>,
    active_mode: Option<LoopMode>,
    last_start: Option<Instant>,
}

impl TriggerLoop {
    pub fn new(
        trigger: Arc<Trigger>,
        mode: Arc<RwLock<LoopMode>>,
        signals: Receiver<LoopSignal>,
    ) -> Self {
        Self {
            trigger,
            mode,
            signals,
            active_mode: None,
            last_start: None,
        }
    }

    fn fixed_rate(&mut self, mode: LoopMode, interval: Duration, stop: &StopToken) {
        self.drain_signals();
        let started = Instant::now();
        self.last_start = Some(started);
        self.trigger.trigger(interval);
        let elapsed = started.elapsed();

        let plan = mode.plan(Some(elapsed));
        if plan.overrun {
            self.trigger.record_overrun(elapsed, interval);
        }
        stop.sleep_until(started + elapsed + plan.sleep);
    }

    fn fastest(&mut self, mode: LoopMode) {
        self.drain_signals();
        let plan = mode.plan(self.last_start.map(|s| s.elapsed()));
        self.last_start = Some(Instant::now());
        self.trigger.trigger(plan.delta);
        std::thread::yield_now();
    }

    fn single_step(&mut self, mode: LoopMode, stop: &StopToken) {
        select! {
            recv(stop.stop_receiver()) -> _ => {}
            recv(self.signals) -> signal => match signal {
                Ok(LoopSignal::Step) => {
                    let plan = mode.plan(None);
                    self.last_start = Some(Instant::now());
                    self.trigger.trigger(plan.delta);
                }
                Ok(LoopSignal::ModeChanged) => {}
                // Network dropped its sender: nothing can ever wake us but stop.
                Err(_) => {
                    let _ = stop.stop_receiver().recv();
                }
            },
        }
    }

    fn drain_signals(&self) {
        while self.signals.try_recv().is_ok() {}
    }
}

impl LoopTask for TriggerLoop {
    fn on_start(&mut self) {
        self.active_mode = None;
        self.last_start = None;
        self.trigger.reset_timing();
        // Requests made while stopped are not replayed.
        self.drain_signals();
        self.trigger.activate();
        tracing::info!("Trigger '{}' loop started", self.trigger.name());
    }

    fn iterate(&mut self, stop: &StopToken) {
        let mode = *read(&self.mode);
        if self.active_mode != Some(mode) {
            tracing::info!("Trigger '{}' loop mode: {}", self.trigger.name(), mode);
            self.active_mode = Some(mode);
            self.last_start = None;
        }

        match mode {
            LoopMode::FixedRate { interval } => self.fixed_rate(mode, interval, stop),
            LoopMode::FastestPossible => self.fastest(mode),
            LoopMode::SingleStep { .. } => self.single_step(mode, stop),
        }
    }

    fn on_stop(&mut self) {
        self.trigger.deactivate();
        let stats = self.trigger.stats().snapshot();
        tracing::info!(
            "Trigger '{}' loop stopped after {} cycles ({} skipped, {} overruns)",
            self.trigger.name(),
            stats.cycles,
            stats.skipped_cycles,
            stats.overruns
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fault::{ChannelFaultSink, NullFaultSink};
    use crate::graph::id::StepId;
    use crate::graph::steps::{CounterStep, FnStep};
    use std::sync::atomic::AtomicUsize;

    fn trigger(id: u32) -> Arc<Trigger> {
        Arc::new(Trigger::new(TriggerId(id), format!("t{}", id), Arc::new(NullFaultSink)))
    }

    fn recording_step(id: u32, log: Arc<Mutex<Vec<u32>>>) -> Arc<StepCell> {
        let step = FnStep::source("rec", move |_| {
            lock(&log).push(id);
            Ok(0.0.into())
        });
        Arc::new(StepCell::new(StepId(id), Box::new(step)).unwrap())
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let t = trigger(0);
        for id in [3, 1, 2] {
            t.add_listener(recording_step(id, log.clone()));
        }
        let outcome = t.trigger(Duration::from_millis(1));
        assert!(matches!(outcome, TriggerOutcome::Completed(s) if s.computed == 3));
        assert_eq!(*lock(&log), vec![3, 1, 2]);
    }

    #[test]
    fn test_wave_runs_after_listeners() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let root = trigger(0);
        let a = trigger(1);
        let b = trigger(2);
        root.add_listener(recording_step(0, log.clone()));
        a.add_listener(recording_step(1, log.clone()));
        b.add_listener(recording_step(2, log.clone()));
        root.set_wave(vec![a.clone(), b.clone()]);

        root.trigger(Duration::from_millis(1));
        assert_eq!(*lock(&log), vec![0, 1, 2]);
        assert_eq!(a.stats().cycles(), 1);
        assert_eq!(root.stats().cycles(), 1);
    }

    #[test]
    fn test_reentrant_trigger_is_dropped() {
        let (sink, faults) = ChannelFaultSink::new(8);
        let t = Arc::new(Trigger::new(TriggerId(0), "slow", Arc::new(sink)));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let step = FnStep::source("slow", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(100));
            Ok(0.0.into())
        });
        t.add_listener(Arc::new(StepCell::new(StepId(0), Box::new(step)).unwrap()));

        let first = {
            let t = t.clone();
            std::thread::spawn(move || t.trigger(Duration::from_millis(1)))
        };
        while !t.is_busy() {
            std::thread::yield_now();
        }
        assert_eq!(t.trigger(Duration::from_millis(1)), TriggerOutcome::Skipped);
        assert!(matches!(first.join().unwrap(), TriggerOutcome::Completed(_)));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(t.stats().skipped(), 1);
        assert_eq!(
            faults.try_recv().unwrap(),
            Fault::SkippedCycle {
                trigger: TriggerId(0)
            }
        );
    }

    #[test]
    fn test_sim_time_accumulates() {
        let t = trigger(0);
        t.add_listener(Arc::new(
            StepCell::new(StepId(0), Box::new(CounterStep::new())).unwrap(),
        ));
        for _ in 0..4 {
            t.trigger(Duration::from_millis(5));
        }
        assert_eq!(t.sim_time(), Duration::from_millis(20));
        assert_eq!(t.stats().snapshot().last_delta, Duration::from_millis(5));
    }
}
