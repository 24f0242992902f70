//! Countdown scheduling
//!
//! The flow never sleeps on its own. It hands a repeating task to a
//! [`CountdownScheduler`] and keeps the returned [`TimerHandle`]; dropping the handle
//! cancels the task. [`TokioScheduler`] runs on the tokio timer, [`ManualScheduler`]
//! only fires when a test advances it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::{interval_at, Instant};

/// Whether a repeating task wants to be called again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Stop,
}

/// Body of a repeating timer
pub type TickTask = Box<dyn FnMut() -> TickControl + Send>;

/// Schedules repeating tasks
pub trait CountdownScheduler: Send + Sync {
    /// Call `task` every `period`, first after one full period
    ///
    /// The task is called until it returns [`TickControl::Stop`] or the returned handle
    /// is dropped, whichever comes first.
    fn schedule_repeating(&self, period: Duration, task: TickTask) -> TimerHandle;
}

/// Cancels its timer when dropped
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl TimerHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Cancel now instead of on drop
    pub fn cancel(mut self) {
        self.fire();
    }

    fn fire(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.fire();
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

/// Scheduler backed by `tokio::time::interval`
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    runtime: Handle,
}

impl TokioScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Scheduler on the runtime of the calling task, if any
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl CountdownScheduler for TokioScheduler {
    fn schedule_repeating(&self, period: Duration, mut task: TickTask) -> TimerHandle {
        let period = period.max(Duration::from_millis(1));
        let join = self.runtime.spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                if task() == TickControl::Stop {
                    break;
                }
            }
        });

        TimerHandle::new(move || join.abort())
    }
}

struct ManualTimer {
    period: Duration,
    elapsed: Duration,
    task: TickTask,
    cancelled: Arc<AtomicBool>,
    stopped: bool,
}

impl ManualTimer {
    fn is_live(&self) -> bool {
        !self.stopped && !self.cancelled.load(Ordering::SeqCst)
    }
}

/// Deterministic scheduler for tests; time only moves through [`ManualScheduler::advance`]
#[derive(Clone, Default)]
pub struct ManualScheduler {
    timers: Arc<Mutex<Vec<ManualTimer>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn timers(&self) -> MutexGuard<'_, Vec<ManualTimer>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move time forward by `by`, firing every due tick in order
    ///
    /// Returns the number of task invocations. Tasks run without the scheduler lock
    /// held, so they may schedule or cancel timers themselves.
    pub fn advance(&self, by: Duration) -> usize {
        let mut running = std::mem::take(&mut *self.timers());
        let mut fired = 0;

        for timer in running.iter_mut() {
            if !timer.is_live() {
                continue;
            }
            timer.elapsed += by;
            while timer.elapsed >= timer.period && timer.is_live() {
                timer.elapsed -= timer.period;
                fired += 1;
                if (timer.task)() == TickControl::Stop {
                    timer.stopped = true;
                }
            }
        }

        running.retain(ManualTimer::is_live);
        let mut timers = self.timers();
        running.append(&mut *timers);
        *timers = running;
        fired
    }

    /// Advance one period of `period` at a time, `ticks` times
    pub fn advance_ticks(&self, period: Duration, ticks: u32) -> usize {
        (0..ticks).map(|_| self.advance(period)).sum()
    }

    /// Timers that are neither stopped nor cancelled
    pub fn active_timers(&self) -> usize {
        self.timers().iter().filter(|timer| timer.is_live()).count()
    }
}

impl CountdownScheduler for ManualScheduler {
    fn schedule_repeating(&self, period: Duration, task: TickTask) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.timers().push(ManualTimer {
            period: period.max(Duration::from_millis(1)),
            elapsed: Duration::ZERO,
            task,
            cancelled: Arc::clone(&cancelled),
            stopped: false,
        });

        TimerHandle::new(move || cancelled.store(true, Ordering::SeqCst))
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("active_timers", &self.active_timers())
            .finish()
    }
}
