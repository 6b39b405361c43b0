//! Debounced sweep trigger.
//!
//! Change notifications arm a single timer. Further notifications within the
//! delay window re-arm it, so a burst of changes launches one sweep after the
//! burst has settled.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::print_error;
use crate::subtitle::scan::ScanReport;

/// Runs one sweep when the trigger fires.
pub trait SweepRunner: Send + Sync + 'static {
    /// Run a full sweep.
    ///
    /// # Errors
    /// Returns an error if the sweep could not be started.
    fn run_sweep(&self) -> Result<ScanReport>;
}

impl<F> SweepRunner for F
where
    F: Fn() -> Result<ScanReport> + Send + Sync + 'static,
{
    fn run_sweep(&self) -> Result<ScanReport> {
        self()
    }
}

/// Trigger state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    /// No notification is waiting
    Idle,
    /// A timer is running for pending notifications
    Armed,
    /// The timer fired and a sweep is running
    Firing,
    /// Shut down, notifications are ignored
    Stopped,
}

/// Coalesces change notifications into single delayed sweeps.
pub struct DebounceTrigger {
    inner: Arc<TriggerInner>,
}

struct TriggerInner {
    delay: Duration,
    runner: Box<dyn SweepRunner>,
    runtime: Handle,
    slot: Mutex<TimerSlot>,
    sweep_lock: tokio::sync::Mutex<()>,
}

/// Pending flag and timer handle, always accessed under the lock.
struct TimerSlot {
    state: TriggerState,
    pending: bool,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl DebounceTrigger {
    /// Create a trigger bound to the current Tokio runtime.
    ///
    /// # Errors
    /// Returns an error if called outside a Tokio runtime.
    pub fn new(delay: Duration, runner: impl SweepRunner) -> Result<Self> {
        let runtime = Handle::try_current().context("Debounce trigger requires a Tokio runtime")?;
        Ok(Self {
            inner: Arc::new(TriggerInner {
                delay,
                runner: Box::new(runner),
                runtime,
                slot: Mutex::new(TimerSlot {
                    state: TriggerState::Idle,
                    pending: false,
                    generation: 0,
                    timer: None,
                }),
                sweep_lock: tokio::sync::Mutex::new(()),
            }),
        })
    }

    /// Record a change and (re)arm the timer.
    ///
    /// Safe to call from any thread.
    pub fn notify(&self) {
        let mut slot = self.inner.lock_slot();
        if slot.state == TriggerState::Stopped {
            return;
        }

        slot.pending = true;
        slot.generation = slot.generation.wrapping_add(1);
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }

        let generation = slot.generation;
        let inner = Arc::clone(&self.inner);
        slot.timer = Some(self.inner.runtime.spawn(async move {
            tokio::time::sleep(inner.delay).await;
            inner.fire(generation).await;
        }));
        slot.state = TriggerState::Armed;
    }

    /// Check if a notification is waiting for the timer.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.lock_slot().pending
    }

    #[must_use]
    pub fn state(&self) -> TriggerState {
        self.inner.lock_slot().state
    }

    /// Cancel any armed timer. No sweep is launched and later notifications are ignored.
    pub fn shutdown(&self) {
        let mut slot = self.inner.lock_slot();
        slot.state = TriggerState::Stopped;
        slot.pending = false;
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }
    }
}

impl TriggerInner {
    fn lock_slot(&self) -> MutexGuard<'_, TimerSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Launch a sweep if this timer is still current and a notification is pending.
    async fn fire(self: Arc<Self>, generation: u64) {
        {
            let mut slot = self.lock_slot();
            if slot.generation != generation || !slot.pending || slot.state == TriggerState::Stopped {
                return;
            }
            slot.pending = false;
            slot.timer = None;
            slot.state = TriggerState::Firing;
        }

        let _guard = self.sweep_lock.lock().await;
        // Shutdown may have happened while waiting behind a running sweep.
        if self.lock_slot().state == TriggerState::Stopped {
            return;
        }

        let inner = Arc::clone(&self);
        match tokio::task::spawn_blocking(move || inner.runner.run_sweep()).await {
            Ok(Ok(_)) => {}
            Ok(Err(error)) => print_error!("Triggered sweep failed: {error:#}"),
            Err(error) => print_error!("Triggered sweep panicked: {error}"),
        }

        let mut slot = self.lock_slot();
        if slot.state == TriggerState::Firing && slot.generation == generation {
            slot.state = if slot.pending {
                TriggerState::Armed
            } else {
                TriggerState::Idle
            };
        }
    }
}

impl Drop for DebounceTrigger {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for DebounceTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("DebounceTrigger");
        debug.field("delay", &self.inner.delay);
        match self.inner.slot.try_lock() {
            Ok(slot) => {
                debug.field("state", &slot.state).field("pending", &slot.pending);
            }
            Err(_) => {
                debug.field("state", &"<locked>");
            }
        }
        debug.finish()
    }
}

#[cfg(test)]
mod trigger_tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    const DELAY: Duration = Duration::from_millis(300);

    /// Runner that records when each sweep was launched.
    fn recording_runner() -> (Arc<Mutex<Vec<Instant>>>, impl SweepRunner) {
        let launches = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&launches);
        let runner = move || -> Result<ScanReport> {
            recorded.lock().expect("lock").push(Instant::now());
            Ok(ScanReport::default())
        };
        (launches, runner)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn burst_launches_single_sweep_after_delay() {
        let (launches, runner) = recording_runner();
        let trigger = DebounceTrigger::new(DELAY, runner).expect("trigger");

        trigger.notify();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let last_notification = Instant::now();
        trigger.notify();
        assert!(trigger.is_pending());
        assert_eq!(trigger.state(), TriggerState::Armed);

        tokio::time::sleep(DELAY * 3).await;

        let launches = launches.lock().expect("lock");
        assert_eq!(launches.len(), 1);
        assert!(launches[0] >= last_notification + DELAY);
        assert!(!trigger.is_pending());
        assert_eq!(trigger.state(), TriggerState::Idle);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn separate_bursts_launch_separate_sweeps() {
        let (launches, runner) = recording_runner();
        let trigger = DebounceTrigger::new(DELAY, runner).expect("trigger");

        trigger.notify();
        tokio::time::sleep(DELAY * 3).await;
        trigger.notify();
        tokio::time::sleep(DELAY * 3).await;

        assert_eq!(launches.lock().expect("lock").len(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn shutdown_cancels_armed_timer() {
        let (launches, runner) = recording_runner();
        let trigger = DebounceTrigger::new(DELAY, runner).expect("trigger");

        trigger.notify();
        trigger.shutdown();
        trigger.notify();
        tokio::time::sleep(DELAY * 3).await;

        assert!(launches.lock().expect("lock").is_empty());
        assert_eq!(trigger.state(), TriggerState::Stopped);
        assert!(!trigger.is_pending());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_sweep_does_not_stop_trigger() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let runner = move || -> Result<ScanReport> {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!("catalog unavailable"))
        };
        let trigger = DebounceTrigger::new(DELAY, runner).expect("trigger");

        trigger.notify();
        tokio::time::sleep(DELAY * 3).await;
        trigger.notify();
        tokio::time::sleep(DELAY * 3).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn shutdown_cancels_sweep_queued_behind_running_sweep() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let runner = move || -> Result<ScanReport> {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(600));
            Ok(ScanReport::default())
        };
        let trigger = DebounceTrigger::new(Duration::from_millis(100), runner).expect("trigger");

        trigger.notify();
        tokio::time::sleep(Duration::from_millis(200)).await;
        // First sweep is running, this one fires and waits for it.
        trigger.notify();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        trigger.shutdown();
        tokio::time::sleep(Duration::from_millis(1200)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(trigger.state(), TriggerState::Stopped);
    }

    #[test]
    fn new_requires_runtime() {
        let runner = || -> Result<ScanReport> { Ok(ScanReport::default()) };
        assert!(DebounceTrigger::new(DELAY, runner).is_err());
    }
}
