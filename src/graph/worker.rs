//! Thread workers: a dedicated OS thread per task with start/stop/wait.
//!
//! Two specializations share one lifecycle:
//!
//! - [`LoopedWorker`] calls [`LoopTask::iterate`] until asked to stop,
//!   checking the stop flag between iterations.
//! - [`CallFunctionWorker`] runs a callable once to completion.
//!
//! Stopping is cooperative. `stop()` raises a flag and disconnects the stop
//! channel so any [`StopToken::sleep`] in progress returns at once; an
//! iteration already running is allowed to finish.

use crate::graph::error::WorkerError;
use crate::graph::sync::lock;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Below this, [`StopToken::sleep_until`] spins instead of sleeping.
const SPIN_THRESHOLD: Duration = Duration::from_millis(2);

/// Lifecycle state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Stopped = 0,
    Running = 1,
    /// Stop requested, thread not yet exited.
    Stopping = 2,
}

impl WorkerState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => WorkerState::Running,
            2 => WorkerState::Stopping,
            _ => WorkerState::Stopped,
        }
    }
}

struct Shared {
    state: AtomicU8,
    stop_requested: AtomicBool,
    exit_lock: Mutex<()>,
    exited: Condvar,
}

impl Shared {
    fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Marks the worker stopped when the thread body returns or unwinds.
struct ExitGuard(Arc<Shared>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        let _guard = lock(&self.0.exit_lock);
        self.0.set_state(WorkerState::Stopped);
        self.0.exited.notify_all();
    }
}

/// Handed to the task so it can observe stop requests and sleep interruptibly.
pub struct StopToken {
    shared: Arc<Shared>,
    stop_rx: Receiver<()>,
}

impl StopToken {
    pub fn is_stop_requested(&self) -> bool {
        self.shared.stop_requested.load(Ordering::Acquire)
    }

    /// Sleep for `duration`. Returns `false` if a stop was requested meanwhile.
    pub fn sleep(&self, duration: Duration) -> bool {
        self.sleep_until(Instant::now() + duration)
    }

    /// Sleep until `deadline`, spinning for the last couple of milliseconds
    /// for sub-millisecond accuracy. Returns `false` on stop.
    pub fn sleep_until(&self, deadline: Instant) -> bool {
        loop {
            if self.is_stop_requested() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            let remaining = deadline - now;
            if remaining > SPIN_THRESHOLD {
                match self
                    .stop_rx
                    .recv_timeout(remaining - Duration::from_millis(1))
                {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => return false,
                }
            }
            while Instant::now() < deadline {
                if self.is_stop_requested() {
                    return false;
                }
                std::hint::spin_loop();
            }
            return true;
        }
    }

    /// Becomes ready (disconnected) once a stop is requested. For `select!`.
    pub fn stop_receiver(&self) -> &Receiver<()> {
        &self.stop_rx
    }
}

/// Lifecycle shared by both worker kinds.
struct WorkerCore {
    name: String,
    shared: Arc<Shared>,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl WorkerCore {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shared: Arc::new(Shared {
                state: AtomicU8::new(WorkerState::Stopped as u8),
                stop_requested: AtomicBool::new(false),
                exit_lock: Mutex::new(()),
                exited: Condvar::new(),
            }),
            stop_tx: None,
            handle: None,
        }
    }

    fn spawn(&mut self, body: impl FnOnce(StopToken) + Send + 'static) -> Result<(), WorkerError> {
        match self.shared.state() {
            WorkerState::Running => {
                tracing::warn!("Worker '{}' start ignored: already running", self.name);
                return Err(WorkerError::AlreadyRunning(self.name.clone()));
            }
            WorkerState::Stopping => self.join(),
            WorkerState::Stopped => {}
        }
        // Reap a thread that exited on its own.
        self.join();

        let (stop_tx, stop_rx) = bounded(1);
        let token = StopToken {
            shared: self.shared.clone(),
            stop_rx,
        };
        self.shared.stop_requested.store(false, Ordering::Release);
        self.shared.set_state(WorkerState::Running);

        let guard_shared = self.shared.clone();
        let spawned = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                let _guard = ExitGuard(guard_shared);
                body(token);
            });

        match spawned {
            Ok(handle) => {
                self.stop_tx = Some(stop_tx);
                self.handle = Some(handle);
                tracing::info!("Worker '{}' started", self.name);
                Ok(())
            }
            Err(source) => {
                self.shared.set_state(WorkerState::Stopped);
                tracing::error!("Failed to spawn worker '{}': {}", self.name, source);
                Err(WorkerError::Spawn {
                    name: self.name.clone(),
                    source,
                })
            }
        }
    }

    fn stop(&mut self, blocking: bool) {
        if self.shared.state() == WorkerState::Stopped && self.handle.is_none() {
            tracing::warn!("Worker '{}' stop ignored: not running", self.name);
            return;
        }
        self.shared.stop_requested.store(true, Ordering::Release);
        let _ = self.shared.state.compare_exchange(
            WorkerState::Running as u8,
            WorkerState::Stopping as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        // Disconnecting wakes every pending and future recv on the token.
        self.stop_tx.take();

        if blocking {
            self.join();
            tracing::info!("Worker '{}' stopped", self.name);
        } else {
            tracing::debug!("Worker '{}' stop requested", self.name);
        }
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Worker '{}' thread panicked", self.name);
            }
        }
    }

    fn wait(&self) {
        let mut guard = lock(&self.shared.exit_lock);
        while self.shared.state() != WorkerState::Stopped {
            guard = self
                .shared
                .exited
                .wait(guard)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }

    fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = lock(&self.shared.exit_lock);
        while self.shared.state() != WorkerState::Stopped {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return false;
            };
            let (next, _) = self
                .shared
                .exited
                .wait_timeout(guard, remaining)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            guard = next;
        }
        true
    }
}

impl Drop for WorkerCore {
    fn drop(&mut self) {
        match self.shared.state() {
            WorkerState::Running => {
                tracing::error!(
                    "Worker '{}' dropped while running; stopping it first",
                    self.name
                );
                self.stop(true);
            }
            // A non-blocking stop already went out; only reap the thread.
            WorkerState::Stopping | WorkerState::Stopped => self.join(),
        }
    }
}

/// A task run repeatedly by a [`LoopedWorker`].
pub trait LoopTask: Send + 'static {
    /// Called on the worker thread before the first iteration.
    fn on_start(&mut self) {}

    /// One iteration. Long waits should go through `stop` so they end on stop.
    fn iterate(&mut self, stop: &StopToken);

    /// Called on the worker thread after the last iteration.
    fn on_stop(&mut self) {}
}

/// Worker that runs a [`LoopTask`] until stopped. Restartable.
pub struct LoopedWorker<T: LoopTask> {
    core: WorkerCore,
    task: Arc<Mutex<T>>,
}

impl<T: LoopTask> LoopedWorker<T> {
    pub fn new(name: impl Into<String>, task: T) -> Self {
        Self {
            core: WorkerCore::new(name),
            task: Arc::new(Mutex::new(task)),
        }
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn start(&mut self) -> Result<(), WorkerError> {
        let task = self.task.clone();
        self.core.spawn(move |token| {
            let mut task = lock(&task);
            task.on_start();
            while !token.is_stop_requested() {
                task.iterate(&token);
            }
            task.on_stop();
        })
    }

    /// Request a stop; with `blocking`, return only after the thread exited.
    pub fn stop(&mut self, blocking: bool) {
        self.core.stop(blocking);
    }

    pub fn state(&self) -> WorkerState {
        self.core.shared.state()
    }

    pub fn is_running(&self) -> bool {
        self.state() == WorkerState::Running
    }

    /// Block until the thread has exited.
    pub fn wait(&self) {
        self.core.wait();
    }

    /// Like [`wait`](Self::wait) with a timeout. Returns whether the thread exited.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.core.wait_timeout(timeout)
    }

    /// Access the task. Blocks while the worker is running.
    pub fn with_task<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut lock(&self.task))
    }
}

type CallFn<R> = dyn Fn(&StopToken) -> R + Send + Sync;

/// Worker that runs a callable once per `start()`, then stops by itself.
pub struct CallFunctionWorker<R: Send + 'static> {
    core: WorkerCore,
    func: Arc<CallFn<R>>,
    result: Arc<Mutex<Option<R>>>,
}

impl<R: Send + 'static> CallFunctionWorker<R> {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&StopToken) -> R + Send + Sync + 'static,
    ) -> Self {
        Self {
            core: WorkerCore::new(name),
            func: Arc::new(func),
            result: Arc::new(Mutex::new(None)),
        }
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn start(&mut self) -> Result<(), WorkerError> {
        let func = self.func.clone();
        let result = self.result.clone();
        self.core.spawn(move |token| {
            let value = func(&token);
            *lock(&result) = Some(value);
        })
    }

    pub fn stop(&mut self, blocking: bool) {
        self.core.stop(blocking);
    }

    pub fn state(&self) -> WorkerState {
        self.core.shared.state()
    }

    pub fn is_running(&self) -> bool {
        self.state() == WorkerState::Running
    }

    pub fn wait(&self) {
        self.core.wait();
    }

    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.core.wait_timeout(timeout)
    }

    /// Result of the last completed run, if not yet taken.
    pub fn take_result(&self) -> Option<R> {
        lock(&self.result).take()
    }
}
