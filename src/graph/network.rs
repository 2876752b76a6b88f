//! The network: sole owner of steps, connections and triggers.
//!
//! All structural edits go through here and are rejected while any root
//! trigger's worker is running. Every edit either fully applies or leaves the
//! graph as it was. After each edit the trigger propagation plan (direct
//! downstream triggers and per-trigger waves) is rebuilt; an edit that would
//! make a trigger reachable from itself is undone.

use crate::graph::connection::Connection;
use crate::graph::data::DataValue;
use crate::graph::error::{GraphError, GraphResult};
use crate::graph::fault::{FaultSink, LogFaultSink};
use crate::graph::id::{ConnectionId, StepId, TriggerId};
use crate::graph::loop_mode::LoopMode;
use crate::graph::stats::{StepStatsSnapshot, TriggerStatsSnapshot};
use crate::graph::step::{Step, StepCell, StepState};
use crate::graph::sync::{read, write};
use crate::graph::trigger::{LoopSignal, Trigger, TriggerLoop, TriggerOutcome};
use crate::graph::worker::{LoopedWorker, WorkerState};
use crossbeam_channel::{unbounded, Sender};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Default prefix for root trigger thread names.
pub const DEFAULT_THREAD_PREFIX: &str = "simflow";

/// A root trigger's loop: its mode, worker and signal channel.
struct RootLoop {
    mode: Arc<RwLock<LoopMode>>,
    worker: LoopedWorker<TriggerLoop>,
    signals: Sender<LoopSignal>,
}

struct TriggerEntry {
    trigger: Arc<Trigger>,
    root: Option<RootLoop>,
}

impl TriggerEntry {
    fn is_running(&self) -> bool {
        self.root
            .as_ref()
            .is_some_and(|r| r.worker.state() != WorkerState::Stopped)
    }
}

pub struct Network {
    steps: Vec<Option<Arc<StepCell>>>,
    /// Trigger each step listens to, parallel to `steps`.
    listening: Vec<Option<TriggerId>>,
    connections: Vec<Option<Connection>>,
    triggers: Vec<TriggerEntry>,
    sink: Arc<dyn FaultSink>,
    thread_prefix: String,
}

impl Default for Network {
    fn default() -> Self {
        Self::new(Arc::new(LogFaultSink))
    }
}

impl Network {
    pub fn new(sink: Arc<dyn FaultSink>) -> Self {
        Self {
            steps: Vec::new(),
            listening: Vec::new(),
            connections: Vec::new(),
            triggers: Vec::new(),
            sink,
            thread_prefix: DEFAULT_THREAD_PREFIX.to_string(),
        }
    }

    /// Prefix used to name root trigger threads (`<prefix>-<trigger name>`).
    pub fn with_thread_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_prefix = prefix.into();
        self
    }

    // ── Steps ──

    pub fn add_step(&mut self, step: impl Step + 'static) -> GraphResult<StepId> {
        self.add_boxed_step(Box::new(step))
    }

    pub fn add_boxed_step(&mut self, step: Box<dyn Step>) -> GraphResult<StepId> {
        self.ensure_stopped()?;
        let id = StepId(self.steps.len() as u32);
        let cell = StepCell::new(id, step)?;
        tracing::info!("Added step {:?} ('{}')", id, cell.type_name());
        self.steps.push(Some(Arc::new(cell)));
        self.listening.push(None);
        Ok(id)
    }

    /// Remove a step together with its connections and trigger membership.
    pub fn remove_step(&mut self, id: StepId) -> GraphResult<()> {
        self.ensure_stopped()?;
        self.step(id)?;

        for slot in self.connections.iter_mut() {
            if slot
                .as_ref()
                .is_some_and(|c| c.source() == id || c.target() == id)
            {
                slot.take();
            }
        }
        if let Some(trigger) = self.listening[id.index()].take() {
            self.triggers[trigger.index()].trigger.remove_listener(id);
        }
        self.steps[id.index()] = None;
        self.rebuild_propagation()?;
        tracing::info!("Removed step {:?}", id);
        Ok(())
    }

    /// Make `step` listen to `trigger`, leaving any previous trigger.
    pub fn attach(&mut self, step: StepId, trigger: TriggerId) -> GraphResult<()> {
        self.ensure_stopped()?;
        let cell = self.step(step)?.clone();
        self.trigger_entry(trigger)?;

        let previous = self.listening[step.index()];
        if previous == Some(trigger) {
            return Ok(());
        }
        self.move_listener(&cell, previous, Some(trigger));

        if let Err(e) = self.rebuild_propagation() {
            self.move_listener(&cell, Some(trigger), previous);
            self.rebuild_propagation()?;
            return Err(e);
        }
        tracing::info!("Step {:?} now listens to {:?}", step, trigger);
        Ok(())
    }

    /// Stop `step` listening to any trigger.
    pub fn detach(&mut self, step: StepId) -> GraphResult<()> {
        self.ensure_stopped()?;
        let cell = self.step(step)?.clone();
        let previous = self.listening[step.index()];
        self.move_listener(&cell, previous, None);
        self.rebuild_propagation()
    }

    fn move_listener(&mut self, cell: &Arc<StepCell>, from: Option<TriggerId>, to: Option<TriggerId>) {
        if let Some(from) = from {
            self.triggers[from.index()].trigger.remove_listener(cell.id());
        }
        if let Some(to) = to {
            self.triggers[to.index()].trigger.add_listener(cell.clone());
        }
        self.listening[cell.id().index()] = to;
    }

    /// Return a Faulted step to Idle. Returns whether it was Faulted.
    pub fn reset_step(&self, id: StepId) -> GraphResult<bool> {
        Ok(self.step(id)?.reset(self.sink.as_ref()))
    }

    // ── Connections ──

    pub fn add_connection(
        &mut self,
        source: StepId,
        source_slot: &str,
        target: StepId,
        target_slot: &str,
    ) -> GraphResult<ConnectionId> {
        self.ensure_stopped()?;
        let source_cell = self.step(source)?.clone();
        let target_cell = self.step(target)?.clone();
        let id = ConnectionId(self.connections.len() as u32);

        let connection = Connection::new(id, &source_cell, source_slot, &target_cell, target_slot)?;
        self.connections.push(Some(connection));

        if let Err(e) = self.rebuild_propagation() {
            // Dropping the connection deregisters it from both steps.
            self.connections.pop();
            self.rebuild_propagation()?;
            return Err(e);
        }
        tracing::info!(
            "Added connection {:?}: {:?}.{} -> {:?}.{}",
            id,
            source,
            source_slot,
            target,
            target_slot
        );
        Ok(id)
    }

    pub fn remove_connection(&mut self, id: ConnectionId) -> GraphResult<()> {
        self.ensure_stopped()?;
        let slot = self
            .connections
            .get_mut(id.index())
            .ok_or(GraphError::UnknownConnection(id))?;
        if slot.take().is_none() {
            return Err(GraphError::UnknownConnection(id));
        }
        self.rebuild_propagation()?;
        tracing::info!("Removed connection {:?}", id);
        Ok(())
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(id.index()).and_then(Option::as_ref)
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter().flatten()
    }

    // ── Triggers ──

    /// Create a trigger. It fires only through propagation or [`fire`](Self::fire)
    /// until it is given a loop mode.
    pub fn create_trigger(&mut self, name: impl Into<String>) -> TriggerId {
        let id = TriggerId(self.triggers.len() as u32);
        let trigger = Arc::new(Trigger::new(id, name, self.sink.clone()));
        tracing::info!("Created trigger {:?} ('{}')", id, trigger.name());
        self.triggers.push(TriggerEntry {
            trigger,
            root: None,
        });
        id
    }

    /// Give a trigger a loop mode, making it a root with its own worker.
    ///
    /// On a running root this only swaps the policy; the loop picks it up at
    /// the start of its next cycle.
    pub fn set_loop_mode(&mut self, trigger: TriggerId, mode: LoopMode) -> GraphResult<()> {
        let entry = self.trigger_entry(trigger)?;
        if let Some(root) = &entry.root {
            *write(&root.mode) = mode;
            let _ = root.signals.send(LoopSignal::ModeChanged);
            tracing::info!("Trigger {:?} loop mode set to {}", trigger, mode);
            return Ok(());
        }

        self.ensure_stopped()?;
        let entry = &mut self.triggers[trigger.index()];
        let shared_mode = Arc::new(RwLock::new(mode));
        let (signals, signal_rx) = unbounded();
        let task = TriggerLoop::new(entry.trigger.clone(), shared_mode.clone(), signal_rx);
        let worker = LoopedWorker::new(
            format!("{}-{}", self.thread_prefix, entry.trigger.name()),
            task,
        );
        entry.root = Some(RootLoop {
            mode: shared_mode,
            worker,
            signals,
        });
        tracing::info!("Trigger {:?} is now a root ({})", trigger, mode);
        self.rebuild_propagation()
    }

    /// Turn a root trigger back into a propagation-only trigger.
    pub fn clear_loop_mode(&mut self, trigger: TriggerId) -> GraphResult<()> {
        self.ensure_stopped()?;
        let entry = self
            .triggers
            .get_mut(trigger.index())
            .ok_or(GraphError::UnknownTrigger(trigger))?;
        let previous = entry.root.take();
        if let Err(e) = self.rebuild_propagation() {
            self.triggers[trigger.index()].root = previous;
            self.rebuild_propagation()?;
            return Err(e);
        }
        Ok(())
    }

    pub fn loop_mode(&self, trigger: TriggerId) -> GraphResult<Option<LoopMode>> {
        Ok(self
            .trigger_entry(trigger)?
            .root
            .as_ref()
            .map(|r| *read(&r.mode)))
    }

    /// Fire a trigger's wave once on the calling thread.
    pub fn fire(&self, trigger: TriggerId, delta: Duration) -> GraphResult<TriggerOutcome> {
        Ok(self.trigger_entry(trigger)?.trigger.trigger(delta))
    }

    /// Ask a single-step root trigger to fire once. Ignored in other modes.
    pub fn request_step(&self, trigger: TriggerId) -> GraphResult<()> {
        let root = self
            .trigger_entry(trigger)?
            .root
            .as_ref()
            .ok_or(GraphError::NotLooped(trigger))?;
        let _ = root.signals.send(LoopSignal::Step);
        Ok(())
    }

    pub fn trigger_of(&self, step: StepId) -> GraphResult<Option<TriggerId>> {
        self.step(step)?;
        Ok(self.listening[step.index()])
    }

    pub fn trigger_wave(&self, trigger: TriggerId) -> GraphResult<Vec<TriggerId>> {
        Ok(self.trigger_entry(trigger)?.trigger.wave())
    }

    pub fn trigger_downstream(&self, trigger: TriggerId) -> GraphResult<Vec<TriggerId>> {
        Ok(self.trigger_entry(trigger)?.trigger.downstream())
    }

    // ── Workers ──

    /// Start every root trigger's worker. Already-running workers are left alone.
    ///
    /// If a thread cannot be spawned, every worker is stopped again and the
    /// error is returned.
    pub fn start_all(&mut self) -> GraphResult<()> {
        let mut failure = None;
        for entry in self.triggers.iter_mut() {
            let Some(root) = entry.root.as_mut() else {
                continue;
            };
            if root.worker.is_running() {
                tracing::warn!("Trigger '{}' already running", entry.trigger.name());
                continue;
            }
            if let Err(e) = root.worker.start() {
                failure = Some(e);
                break;
            }
        }
        if let Some(e) = failure {
            self.stop_all(true);
            return Err(e.into());
        }
        tracing::info!("Started {} root triggers", self.running_workers());
        Ok(())
    }

    /// Request every root trigger to stop after its current cycle.
    pub fn stop_all(&mut self, blocking: bool) {
        for entry in self.triggers.iter_mut() {
            if let Some(root) = entry.root.as_mut() {
                if root.worker.state() != WorkerState::Stopped {
                    root.worker.stop(blocking);
                }
            }
        }
    }

    pub fn start_trigger(&mut self, trigger: TriggerId) -> GraphResult<()> {
        self.trigger_entry(trigger)?;
        let root = self.triggers[trigger.index()]
            .root
            .as_mut()
            .ok_or(GraphError::NotLooped(trigger))?;
        root.worker.start()?;
        Ok(())
    }

    pub fn stop_trigger(&mut self, trigger: TriggerId, blocking: bool) -> GraphResult<()> {
        self.trigger_entry(trigger)?;
        let root = self.triggers[trigger.index()]
            .root
            .as_mut()
            .ok_or(GraphError::NotLooped(trigger))?;
        root.worker.stop(blocking);
        Ok(())
    }

    /// Wait for every worker thread to exit, e.g. after `stop_all(false)`.
    /// Returns `false` on timeout.
    pub fn wait_all(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.triggers
            .iter()
            .filter_map(|e| e.root.as_ref())
            .all(|root| {
                let remaining = deadline.saturating_duration_since(Instant::now());
                root.worker.wait_timeout(remaining)
            })
    }

    /// Number of root trigger threads not yet fully stopped.
    pub fn running_workers(&self) -> usize {
        self.triggers.iter().filter(|e| e.is_running()).count()
    }

    pub fn is_running(&self) -> bool {
        self.running_workers() > 0
    }

    fn ensure_stopped(&self) -> GraphResult<()> {
        match self.triggers.iter().find(|e| e.is_running()) {
            Some(entry) => Err(GraphError::Running(entry.trigger.id())),
            None => Ok(()),
        }
    }

    // ── Snapshots ──

    pub fn step_ids(&self) -> Vec<StepId> {
        self.steps.iter().flatten().map(|c| c.id()).collect()
    }

    pub fn trigger_ids(&self) -> Vec<TriggerId> {
        self.triggers.iter().map(|e| e.trigger.id()).collect()
    }

    pub fn step_state(&self, id: StepId) -> GraphResult<StepState> {
        Ok(self.step(id)?.state())
    }

    /// Current output values of a step, in declaration order.
    pub fn step_outputs(&self, id: StepId) -> GraphResult<Vec<(String, DataValue)>> {
        Ok(self.step(id)?.output_snapshot())
    }

    pub fn step_output(&self, id: StepId, slot: &str) -> GraphResult<DataValue> {
        self.step_outputs(id)?
            .into_iter()
            .find_map(|(name, value)| (name == slot).then_some(value))
            .ok_or_else(|| GraphError::UnknownSlot {
                step: id,
                slot: slot.to_string(),
                direction: "output",
            })
    }

    pub fn step_stats(&self, id: StepId) -> GraphResult<StepStatsSnapshot> {
        Ok(self.step(id)?.stats().snapshot())
    }

    pub fn trigger_stats(&self, id: TriggerId) -> GraphResult<TriggerStatsSnapshot> {
        Ok(self.trigger_entry(id)?.trigger.stats().snapshot())
    }

    pub fn trigger_name(&self, id: TriggerId) -> GraphResult<&str> {
        Ok(self.trigger_entry(id)?.trigger.name())
    }

    // ── Lookup ──

    fn step(&self, id: StepId) -> GraphResult<&Arc<StepCell>> {
        self.steps
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(GraphError::UnknownStep(id))
    }

    fn trigger_entry(&self, id: TriggerId) -> GraphResult<&TriggerEntry> {
        self.triggers
            .get(id.index())
            .ok_or(GraphError::UnknownTrigger(id))
    }

    // ── Propagation plan ──

    /// Derive downstream triggers from connections, reject trigger cycles,
    /// and install each trigger's wave. Nothing is installed on error.
    fn rebuild_propagation(&self) -> GraphResult<()> {
        let n = self.triggers.len();
        let mut downstream: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (from, entry) in self.triggers.iter().enumerate() {
            for step in entry.trigger.listeners() {
                for connection_id in step.outgoing() {
                    let Some(connection) = self.connection(connection_id) else {
                        continue;
                    };
                    let Some(to) = self.listening[connection.target().index()] else {
                        continue;
                    };
                    let to = to.index();
                    // Same-trigger listeners are independent; roots run on their own clock.
                    if to == from || self.triggers[to].root.is_some() {
                        continue;
                    }
                    if !downstream[from].contains(&to) {
                        downstream[from].push(to);
                    }
                }
            }
        }

        if let Some(on_cycle) = find_cycle(&downstream) {
            let id = TriggerId(on_cycle as u32);
            tracing::warn!("Rejected edit: {:?} would be reachable from itself", id);
            return Err(GraphError::TriggerCycle(id));
        }

        for (index, entry) in self.triggers.iter().enumerate() {
            let arcs = |indices: &[usize]| -> Vec<Arc<Trigger>> {
                indices
                    .iter()
                    .map(|&i| self.triggers[i].trigger.clone())
                    .collect()
            };
            entry.trigger.set_downstream(arcs(&downstream[index]));
            entry.trigger.set_wave(arcs(&wave_order(index, &downstream)));
        }
        Ok(())
    }
}

impl Drop for Network {
    fn drop(&mut self) {
        if self.is_running() {
            tracing::debug!("Network dropped with running triggers; stopping them");
        }
        self.stop_all(true);
    }
}

/// A node on a cycle of `edges`, if any.
fn find_cycle(edges: &[Vec<usize>]) -> Option<usize> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Open,
        Done,
    }

    fn visit(node: usize, edges: &[Vec<usize>], marks: &mut [Mark]) -> Option<usize> {
        marks[node] = Mark::Open;
        for &next in &edges[node] {
            match marks[next] {
                Mark::Open => return Some(next),
                Mark::New => {
                    if let Some(found) = visit(next, edges, marks) {
                        return Some(found);
                    }
                }
                Mark::Done => {}
            }
        }
        marks[node] = Mark::Done;
        None
    }

    let mut marks = vec![Mark::New; edges.len()];
    (0..edges.len()).find_map(|node| {
        if marks[node] == Mark::New {
            visit(node, edges, &mut marks)
        } else {
            None
        }
    })
}

/// Triggers reachable from `root` (excluding it) in firing order.
///
/// Reverse postorder of a DFS that visits children last-to-first: on a tree
/// this is depth-first insertion order, and a trigger reached along several
/// paths lands after all of its reachable upstreams.
fn wave_order(root: usize, edges: &[Vec<usize>]) -> Vec<usize> {
    fn visit(node: usize, edges: &[Vec<usize>], seen: &mut [bool], post: &mut Vec<usize>) {
        seen[node] = true;
        for &next in edges[node].iter().rev() {
            if !seen[next] {
                visit(next, edges, seen, post);
            }
        }
        post.push(node);
    }

    let mut seen = vec![false; edges.len()];
    let mut post = Vec::new();
    visit(root, edges, &mut seen, &mut post);
    post.pop();
    post.reverse();
    post
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::data::DataType;
    use crate::graph::fault::NullFaultSink;
    use crate::graph::steps::{ConstantStep, CounterStep, GainStep, SumStep};

    fn network() -> Network {
        Network::new(Arc::new(NullFaultSink))
    }

    #[test]
    fn test_wave_order_tree_is_depth_first() {
        // 0 -> 1 -> 3, 0 -> 2
        let edges = vec![vec![1, 2], vec![3], vec![], vec![]];
        assert_eq!(wave_order(0, &edges), vec![1, 3, 2]);
    }

    #[test]
    fn test_wave_order_diamond_fires_join_last() {
        // 0 -> 1 -> 3, 0 -> 2 -> 3
        let edges = vec![vec![1, 2], vec![3], vec![3], vec![]];
        assert_eq!(wave_order(0, &edges), vec![1, 2, 3]);
    }

    #[test]
    fn test_find_cycle() {
        assert_eq!(find_cycle(&[vec![1], vec![2], vec![]]), None);
        assert!(find_cycle(&[vec![1], vec![2], vec![0]]).is_some());
    }

    #[test]
    fn test_incompatible_connection_leaves_graph_unchanged() {
        let mut net = network();
        let flag = net
            .add_step(ConstantStep::new(DataType::Flag, true.into()))
            .unwrap();
        let gain = net.add_step(GainStep::new(2.0)).unwrap();
        let err = net.add_connection(flag, "value", gain, "input").unwrap_err();
        assert!(matches!(err, GraphError::TypeMismatch { .. }));
        assert_eq!(net.connections().count(), 0);
    }

    #[test]
    fn test_downstream_derived_from_connections() {
        let mut net = network();
        let root = net.create_trigger("root");
        let after = net.create_trigger("after");
        let a = net.add_step(CounterStep::new()).unwrap();
        let b = net.add_step(GainStep::new(2.0)).unwrap();
        net.attach(a, root).unwrap();
        net.attach(b, after).unwrap();
        net.add_connection(a, "count", b, "input").unwrap();

        assert_eq!(net.trigger_downstream(root).unwrap(), vec![after]);
        assert_eq!(net.trigger_wave(root).unwrap(), vec![after]);

        net.fire(root, Duration::from_millis(1)).unwrap();
        assert_eq!(net.step_output(b, "output").unwrap(), DataValue::Scalar(2.0));
    }

    #[test]
    fn test_trigger_cycle_rejected_and_reverted() {
        let mut net = network();
        let t1 = net.create_trigger("t1");
        let t2 = net.create_trigger("t2");
        let a = net.add_step(SumStep::new()).unwrap();
        let b = net.add_step(SumStep::new()).unwrap();
        net.attach(a, t1).unwrap();
        net.attach(b, t2).unwrap();
        net.add_connection(a, "sum", b, "a").unwrap();

        let err = net.add_connection(b, "sum", a, "a").unwrap_err();
        assert!(matches!(err, GraphError::TriggerCycle(_)));
        assert_eq!(net.connections().count(), 1);
        assert_eq!(net.trigger_wave(t1).unwrap(), vec![t2]);
        assert!(net.trigger_wave(t2).unwrap().is_empty());
    }

    #[test]
    fn test_data_cycle_across_roots_allowed() {
        let mut net = network();
        let t1 = net.create_trigger("t1");
        let t2 = net.create_trigger("t2");
        net.set_loop_mode(t1, LoopMode::FastestPossible).unwrap();
        net.set_loop_mode(t2, LoopMode::FastestPossible).unwrap();
        let a = net.add_step(SumStep::new()).unwrap();
        let b = net.add_step(SumStep::new()).unwrap();
        net.attach(a, t1).unwrap();
        net.attach(b, t2).unwrap();
        net.add_connection(a, "sum", b, "a").unwrap();
        net.add_connection(b, "sum", a, "a").unwrap();
        assert!(net.trigger_wave(t1).unwrap().is_empty());
    }

    #[test]
    fn test_remove_step_drops_its_connections() {
        let mut net = network();
        let a = net.add_step(CounterStep::new()).unwrap();
        let b = net.add_step(GainStep::new(1.0)).unwrap();
        let c = net.add_connection(a, "count", b, "input").unwrap();
        net.remove_step(a).unwrap();
        assert!(net.connection(c).is_none());
        assert!(matches!(net.step_state(a), Err(GraphError::UnknownStep(_))));
        assert_eq!(net.step_ids(), vec![b]);
    }

    #[test]
    fn test_edit_while_running_rejected() {
        let mut net = network();
        let t = net.create_trigger("loop");
        net.set_loop_mode(t, LoopMode::fixed_rate(Duration::from_millis(5)))
            .unwrap();
        net.start_all().unwrap();
        assert!(matches!(
            net.add_step(CounterStep::new()),
            Err(GraphError::Running(_))
        ));
        assert!(net.step_ids().is_empty());
        net.stop_all(true);
        assert!(net.add_step(CounterStep::new()).is_ok());
    }

    #[test]
    fn test_attach_moves_step_between_triggers() {
        let mut net = network();
        let t1 = net.create_trigger("t1");
        let t2 = net.create_trigger("t2");
        let a = net.add_step(CounterStep::new()).unwrap();
        net.attach(a, t1).unwrap();
        net.attach(a, t2).unwrap();
        assert_eq!(net.trigger_of(a).unwrap(), Some(t2));

        net.fire(t1, Duration::from_millis(1)).unwrap();
        assert_eq!(net.step_output(a, "count").unwrap(), DataValue::Scalar(0.0));
        net.fire(t2, Duration::from_millis(1)).unwrap();
        assert_eq!(net.step_output(a, "count").unwrap(), DataValue::Scalar(1.0));
    }

    #[test]
    fn test_request_step_requires_root() {
        let mut net = network();
        let t = net.create_trigger("manual");
        assert!(matches!(net.request_step(t), Err(GraphError::NotLooped(_))));
        assert!(matches!(
            net.request_step(TriggerId(9)),
            Err(GraphError::UnknownTrigger(_))
        ));
    }
}
