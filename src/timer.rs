//! One-shot delayed callbacks
//!
//! Two schedulers:
//! - `ThreadTimer`: wall-clock, one worker thread runs every callback
//! - `ManualTimer`: driven by the host's own clock (fixed-step loops, tests)

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

/// Callback run when a scheduled delay elapses
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Cancels a scheduled callback. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Schedules one-shot callbacks.
///
/// Implementations must never run `callback` on the calling thread before
/// `schedule` returns: callers may hold locks the callback needs.
pub trait TimerScheduler: Send + Sync {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> CancelHandle;
}

struct TimedEntry {
    due: Instant,
    seq: u64,
    handle: CancelHandle,
    callback: TimerCallback,
}

#[derive(Default)]
struct TimedQueue {
    next_seq: u64,
    entries: Vec<TimedEntry>,
    shutdown: bool,
}

#[derive(Default)]
struct WorkerShared {
    queue: Mutex<TimedQueue>,
    wakeup: Condvar,
}

impl WorkerShared {
    fn run(&self) {
        let mut queue = self.queue.lock();
        loop {
            if queue.shutdown {
                break;
            }
            queue.entries.retain(|e| !e.handle.is_cancelled());

            let next = queue
                .entries
                .iter()
                .enumerate()
                .min_by_key(|(_, e)| (e.due, e.seq))
                .map(|(i, e)| (i, e.due));

            match next {
                None => self.wakeup.wait(&mut queue),
                Some((idx, due)) if due <= Instant::now() => {
                    let entry = queue.entries.swap_remove(idx);
                    // Callbacks run unlocked so they may schedule again
                    MutexGuard::unlocked(&mut queue, || (entry.callback)());
                }
                Some((_, due)) => {
                    self.wakeup.wait_until(&mut queue, due);
                }
            }
        }
        log::debug!("Timer worker stopped");
    }
}

/// Wall-clock scheduler with one long-lived worker thread.
///
/// Dropping the timer stops the worker; callbacks still queued never run.
pub struct ThreadTimer {
    shared: Arc<WorkerShared>,
}

impl ThreadTimer {
    pub fn new() -> Self {
        let shared = Arc::new(WorkerShared::default());
        let worker = Arc::clone(&shared);
        let spawned = thread::Builder::new()
            .name("drill-timer".into())
            .spawn(move || worker.run());
        if let Err(e) = spawned {
            log::error!("Failed to spawn timer thread: {}", e);
            shared.queue.lock().shutdown = true;
        }
        Self { shared }
    }
}

impl Default for ThreadTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        self.shared.queue.lock().shutdown = true;
        self.shared.wakeup.notify_all();
    }
}

impl TimerScheduler for ThreadTimer {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> CancelHandle {
        let handle = CancelHandle::new();
        let mut queue = self.shared.queue.lock();
        if queue.shutdown {
            log::warn!("Timer worker not running, dropping callback");
            handle.cancel();
            return handle;
        }
        let seq = queue.next_seq;
        queue.next_seq += 1;
        queue.entries.push(TimedEntry {
            due: Instant::now() + delay,
            seq,
            handle: handle.clone(),
            callback,
        });
        drop(queue);
        self.shared.wakeup.notify_one();
        handle
    }
}

struct ManualEntry {
    due: Duration,
    seq: u64,
    handle: CancelHandle,
    callback: TimerCallback,
}

#[derive(Default)]
struct ManualQueue {
    now: Duration,
    next_seq: u64,
    entries: Vec<ManualEntry>,
}

/// Scheduler advanced explicitly by the host
#[derive(Default)]
pub struct ManualTimer {
    queue: Mutex<ManualQueue>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed on this timer's clock
    pub fn now(&self) -> Duration {
        self.queue.lock().now
    }

    /// Number of scheduled callbacks that are neither fired nor cancelled
    pub fn pending(&self) -> usize {
        self.queue
            .lock()
            .entries
            .iter()
            .filter(|e| !e.handle.is_cancelled())
            .count()
    }

    /// Delay of the earliest live callback, relative to now
    pub fn next_due(&self) -> Option<Duration> {
        let queue = self.queue.lock();
        queue
            .entries
            .iter()
            .filter(|e| !e.handle.is_cancelled())
            .map(|e| e.due.saturating_sub(queue.now))
            .min()
    }

    /// Move the clock forward and fire everything now due, in due order.
    ///
    /// Returns how many callbacks ran.
    pub fn advance(&self, dt: Duration) -> usize {
        let due = {
            let mut queue = self.queue.lock();
            queue.now += dt;
            let now = queue.now;
            let (ready, waiting): (Vec<_>, Vec<_>) =
                queue.entries.drain(..).partition(|e| e.due <= now);
            queue.entries = waiting;
            ready
        };
        Self::run(due)
    }

    /// Fire every pending callback regardless of its delay
    pub fn fire_all(&self) -> usize {
        let due = {
            let mut queue = self.queue.lock();
            if let Some(latest) = queue.entries.iter().map(|e| e.due).max() {
                queue.now = queue.now.max(latest);
            }
            std::mem::take(&mut queue.entries)
        };
        Self::run(due)
    }

    // Callbacks run with the queue unlocked so they may schedule again
    fn run(mut due: Vec<ManualEntry>) -> usize {
        due.sort_by_key(|e| (e.due, e.seq));
        let mut fired = 0;
        for entry in due {
            if entry.handle.is_cancelled() {
                continue;
            }
            (entry.callback)();
            fired += 1;
        }
        fired
    }
}

impl TimerScheduler for ManualTimer {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> CancelHandle {
        let handle = CancelHandle::new();
        let mut queue = self.queue.lock();
        let seq = queue.next_seq;
        queue.next_seq += 1;
        let due = queue.now + delay;
        queue.entries.push(ManualEntry {
            due,
            seq,
            handle: handle.clone(),
            callback,
        });
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::mpsc;

    fn counter_callback(counter: &Arc<AtomicU32>, value: u32) -> TimerCallback {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.store(value, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_manual_timer_fires_when_due() {
        let timer = ManualTimer::new();
        let hit = Arc::new(AtomicU32::new(0));
        timer.schedule(Duration::from_secs(4), counter_callback(&hit, 1));

        assert_eq!(timer.next_due(), Some(Duration::from_secs(4)));
        assert_eq!(timer.advance(Duration::from_secs(3)), 0);
        assert_eq!(hit.load(Ordering::SeqCst), 0);
        assert_eq!(timer.advance(Duration::from_secs(1)), 1);
        assert_eq!(hit.load(Ordering::SeqCst), 1);
        assert_eq!(timer.pending(), 0);
    }

    #[test]
    fn test_manual_timer_fires_in_due_order() {
        let timer = ManualTimer::new();
        let last = Arc::new(AtomicU32::new(0));
        timer.schedule(Duration::from_secs(8), counter_callback(&last, 8));
        timer.schedule(Duration::from_secs(5), counter_callback(&last, 5));

        assert_eq!(timer.fire_all(), 2);
        // The later deadline ran last
        assert_eq!(last.load(Ordering::SeqCst), 8);
        assert_eq!(timer.now(), Duration::from_secs(8));
    }

    #[test]
    fn test_cancelled_callback_skipped() {
        let timer = ManualTimer::new();
        let hit = Arc::new(AtomicU32::new(0));
        let handle = timer.schedule(Duration::from_secs(1), counter_callback(&hit, 1));
        handle.cancel();

        assert_eq!(timer.pending(), 0);
        assert_eq!(timer.fire_all(), 0);
        assert_eq!(hit.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_callback_may_reschedule() {
        let timer = Arc::new(ManualTimer::new());
        let inner = Arc::clone(&timer);
        timer.schedule(
            Duration::from_secs(1),
            Box::new(move || {
                inner.schedule(Duration::from_secs(1), Box::new(|| {}));
            }),
        );
        assert_eq!(timer.advance(Duration::from_secs(1)), 1);
        assert_eq!(timer.pending(), 1);
    }

    #[test]
    fn test_thread_timer_fires() {
        let timer = ThreadTimer::new();
        let (tx, rx) = mpsc::channel();
        timer.schedule(
            Duration::from_millis(10),
            Box::new(move || {
                let _ = tx.send(());
            }),
        );
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_thread_timer_cancel() {
        let timer = ThreadTimer::new();
        let (tx, rx) = mpsc::channel::<()>();
        let handle = timer.schedule(
            Duration::from_millis(50),
            Box::new(move || {
                let _ = tx.send(());
            }),
        );
        handle.cancel();
        assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    }

    #[test]
    fn test_thread_timer_single_worker_in_due_order() {
        let timer = Arc::new(ThreadTimer::new());
        let (tx, rx) = mpsc::channel();
        for (delay_ms, tag) in [(60u64, "late"), (20, "early")] {
            let tx = tx.clone();
            timer.schedule(
                Duration::from_millis(delay_ms),
                Box::new(move || {
                    let _ = tx.send((tag, thread::current().id()));
                }),
            );
        }

        let (first, first_thread) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let (second, second_thread) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!((first, second), ("early", "late"));
        assert_eq!(first_thread, second_thread);
    }

    #[test]
    fn test_thread_timer_callback_may_reschedule() {
        let timer = Arc::new(ThreadTimer::new());
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&timer);
        timer.schedule(
            Duration::from_millis(5),
            Box::new(move || {
                inner.schedule(
                    Duration::from_millis(5),
                    Box::new(move || {
                        let _ = tx.send(());
                    }),
                );
            }),
        );
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }
}
