// src/runtime/gated_executor.rs
// ============================================================================
// Module: Actiongate Gated Executor (C4)
// Description: FIFO admission queue with per-task timeouts and sub-gates.
// Purpose: Serialize startup, bound how long a call can occupy a gate, and
//          give `gate$` messages an isolated sequence of their own.
// Dependencies: std::thread, std::sync::mpsc
// ============================================================================

//! ## Overview
//! A [`Gate`] is one worker thread draining an `mpsc` queue in submission
//! order (spec §5: "within one gate, task bodies begin in submission
//! order"). Each task is handed a `done` callback; the worker waits up to
//! the task's timeout for `done` to fire before moving on, so one gate
//! never runs two task bodies concurrently with each other, but two gates
//! (root + sub-gates from [`Gate::sub_gate`]) run independently.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

// ============================================================================
// SECTION: Task
// ============================================================================

/// A callback invoked exactly once to signal a task finished.
pub type Done = Box<dyn FnOnce() + Send>;

/// One unit of work submitted to a [`Gate`].
pub struct GateTask {
    /// Human-readable description, used in trace logs.
    pub description: String,
    /// Per-task timeout. Falls back to the instance default when the call
    /// carried no `timeout$`.
    pub timeout: Duration,
    /// Starts the task body, handing it the `done` callback to call on
    /// completion (possibly from another thread, or not at all).
    pub run: Box<dyn FnOnce(Done) + Send>,
    /// Invoked if `timeout` elapses before `done` is called.
    pub on_timeout: Box<dyn FnOnce() + Send>,
}

// ============================================================================
// SECTION: Gate
// ============================================================================

struct GateInner {
    /// Task queue to the worker thread. `None` once the gate has shut down.
    sender: Mutex<Option<mpsc::Sender<GateTask>>>,
    /// Number of tasks queued or currently running.
    pending: AtomicUsize,
    /// Hooks waiting for the gate to next become idle.
    idle_hooks: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
}

/// A FIFO admission queue. Cloning a `Gate` shares the same underlying
/// worker thread and queue.
#[derive(Clone)]
pub struct Gate {
    inner: Arc<GateInner>,
}

impl Gate {
    /// Spawns a new gate with its own dedicated worker thread.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel::<GateTask>();
        let inner = Arc::new(GateInner {
            sender: Mutex::new(Some(sender)),
            pending: AtomicUsize::new(0),
            idle_hooks: Mutex::new(Vec::new()),
        });
        let worker_inner = Arc::clone(&inner);
        thread::spawn(move || Self::run_worker(&worker_inner, &receiver));
        Self { inner }
    }

    fn run_worker(inner: &Arc<GateInner>, receiver: &mpsc::Receiver<GateTask>) {
        for task in receiver {
            let (done_tx, done_rx) = mpsc::channel::<()>();
            let description = task.description.clone();
            (task.run)(Box::new(move || {
                let _ = done_tx.send(());
            }));
            match done_rx.recv_timeout(task.timeout) {
                Ok(()) => {}
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    (task.on_timeout)();
                    tracing::trace!(task = %description, "gate task timed out; a late completion, if it arrives, is ignored");
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    (task.on_timeout)();
                }
            }
            let remaining = inner.pending.fetch_sub(1, Ordering::SeqCst) - 1;
            if remaining == 0 {
                Self::fire_idle_hooks(inner);
            }
        }
    }

    #[allow(clippy::missing_panics_doc, reason = "Mutex poisoning aborts the process elsewhere; this lock is never held across a panic.")]
    fn fire_idle_hooks(inner: &Arc<GateInner>) {
        let hooks = std::mem::take(&mut *inner.idle_hooks.lock().unwrap_or_else(std::sync::PoisonError::into_inner));
        for hook in hooks {
            hook();
        }
    }

    /// Submits `task` for FIFO execution. No-op (the task's `on_timeout` is
    /// invoked immediately instead) if the gate's worker has already shut down.
    #[allow(clippy::missing_panics_doc, reason = "Mutex poisoning aborts the process elsewhere; this lock is never held across a panic.")]
    pub fn submit(&self, task: GateTask) {
        self.inner.pending.fetch_add(1, Ordering::SeqCst);
        let sender = self.inner.sender.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(sender) = sender.as_ref() {
            if sender.send(task).is_ok() {
                return;
            }
        }
        drop(sender);
        self.inner.pending.fetch_sub(1, Ordering::SeqCst);
        (task.on_timeout)();
    }

    /// Returns `true` when no task is queued or running on this gate.
    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.inner.pending.load(Ordering::SeqCst) == 0
    }

    /// Runs `hook` once the gate next becomes idle; fires immediately if it
    /// already is.
    #[allow(clippy::missing_panics_doc, reason = "Mutex poisoning aborts the process elsewhere; this lock is never held across a panic.")]
    pub fn ready(&self, hook: Box<dyn FnOnce() + Send>) {
        if self.is_clear() {
            hook();
            return;
        }
        self.inner.idle_hooks.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(hook);
    }

    /// Returns an independent sub-gate: its own worker thread and queue, so
    /// its tasks never block (or are blocked by) this gate's queue.
    #[must_use]
    pub fn sub_gate(&self) -> Self {
        Self::new()
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::mpsc;
    use std::time::Duration;

    use super::Gate;
    use super::GateTask;

    #[test]
    fn tasks_run_in_submission_order() {
        let gate = Gate::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = mpsc::channel::<()>();

        for i in 0..3 {
            let order = Arc::clone(&order);
            let done_tx = done_tx.clone();
            gate.submit(GateTask {
                description: format!("task-{i}"),
                timeout: Duration::from_millis(500),
                run: Box::new(move |done| {
                    order.lock().unwrap().push(i);
                    done();
                    let _ = done_tx.send(());
                }),
                on_timeout: Box::new(|| {}),
            });
        }

        for _ in 0..3 {
            done_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn timeout_fires_when_done_never_called() {
        let gate = Gate::new();
        let (timed_out_tx, timed_out_rx) = mpsc::channel::<()>();

        gate.submit(GateTask {
            description: "hangs".to_string(),
            timeout: Duration::from_millis(20),
            run: Box::new(|_done| {
                // Intentionally never calls `done`.
            }),
            on_timeout: Box::new(move || {
                let _ = timed_out_tx.send(());
            }),
        });

        timed_out_rx.recv_timeout(Duration::from_secs(1)).unwrap();
    }

    #[test]
    fn ready_fires_immediately_when_already_idle() {
        let gate = Gate::new();
        let (tx, rx) = mpsc::channel::<()>();
        gate.ready(Box::new(move || {
            let _ = tx.send(());
        }));
        rx.recv_timeout(Duration::from_millis(200)).unwrap();
    }
}
