//! # Bounded Task Queue
//!
//! A general-purpose concurrency limiter: it accepts any number of asynchronous
//! units of work and runs at most `capacity` of them at once, admitting the rest
//! in arrival order.
//!
//! ## State machine:
//! - `pending`: FIFO of work items not yet started
//! - `running`: number of admitted items whose future has not settled
//! - `capacity`: upper bound for `running`
//!
//! `try_admit()` is the only transition that moves items from `pending` to
//! `running`. It runs after every `enqueue` (idle-queue case) and every time a
//! running item settles, via the drop of its [`SlotGuard`]. Because the guard is
//! released on drop, a unit that panics or is cancelled still frees its slot.
//!
//! The queue knows nothing about what the work does. A unit that resolves to an
//! `Err` is just a value handed back to its own caller; siblings keep running.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Why a queued unit produced no result
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("work unit was dropped before it settled")]
    Dropped,
}

type WorkItem = Box<dyn FnOnce(SlotGuard) -> BoxFuture<'static, ()> + Send>;

struct QueueState {
    pending: VecDeque<WorkItem>,
    running: usize,
    capacity: usize,
}

struct Shared {
    state: Mutex<QueueState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // A panicking work unit never holds this lock, the state stays consistent
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Admit pending items while there is room
    fn try_admit(self: &Arc<Self>) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            if !self.lock().pending.is_empty() {
                warn!("No async runtime available, work units left pending");
            }
            return;
        };

        loop {
            let item = {
                let mut state = self.lock();
                if state.running >= state.capacity {
                    return;
                }
                let Some(item) = state.pending.pop_front() else {
                    return;
                };
                state.running += 1;
                debug!(
                    "Admitted work unit ({} running, {} pending)",
                    state.running,
                    state.pending.len()
                );
                item
            };

            let slot = SlotGuard {
                shared: Arc::clone(self),
            };
            handle.spawn(item(slot));
        }
    }
}

/// Occupancy of one running slot; releasing it admits the next pending unit
struct SlotGuard {
    shared: Arc<Shared>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        {
            let mut state = self.shared.lock();
            state.running = state.running.saturating_sub(1);
        }
        self.shared.try_admit();
    }
}

/// Concurrency-limiting scheduler with FIFO admission
#[derive(Clone)]
pub struct TaskQueue {
    shared: Arc<Shared>,
}

impl TaskQueue {
    /// Create a queue admitting at most `capacity` concurrent units (at least one)
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    pending: VecDeque::new(),
                    running: 0,
                    capacity: capacity.max(1),
                }),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.shared.lock().capacity
    }

    pub fn running(&self) -> usize {
        self.shared.lock().running
    }

    pub fn pending(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// Submit a unit of work.
    ///
    /// The unit is queued immediately, whether or not the returned future is
    /// polled. The returned future settles with exactly the value the unit's own
    /// future produced, or `QueueError::Dropped` if the unit never got to hand
    /// one back (it panicked, or the runtime shut down underneath it).
    pub fn enqueue<F, Fut, T>(&self, work: F) -> impl Future<Output = Result<T, QueueError>> + Send
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();

        let item: WorkItem = Box::new(move |slot: SlotGuard| {
            async move {
                let _slot = slot;
                let output = work().await;
                // The caller may have stopped waiting; the work still counts as done
                let _ = tx.send(output);
            }
            .boxed()
        });

        self.shared.lock().pending.push_back(item);
        self.shared.try_admit();

        async move { rx.await.map_err(|_| QueueError::Dropped) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Tracks how many instrumented units are in flight and the highest value seen
    #[derive(Default)]
    struct Gauge {
        current: AtomicUsize,
        peak: AtomicUsize,
        finished: AtomicUsize,
    }

    impl Gauge {
        fn enter(&self) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn leave(&self) {
            self.current.fetch_sub(1, Ordering::SeqCst);
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn run_instrumented(capacity: usize, units: usize, hold: Duration) -> Arc<Gauge> {
        let queue = TaskQueue::new(capacity);
        let gauge = Arc::new(Gauge::default());

        let completions: Vec<_> = (0..units)
            .map(|_| {
                let gauge = Arc::clone(&gauge);
                queue.enqueue(move || async move {
                    gauge.enter();
                    tokio::time::sleep(hold).await;
                    gauge.leave();
                })
            })
            .collect();

        for completion in completions {
            completion.await.unwrap();
        }
        gauge
    }

    #[tokio::test]
    async fn test_never_exceeds_capacity() {
        let gauge = run_instrumented(3, 12, Duration::from_millis(20)).await;

        assert_eq!(gauge.peak.load(Ordering::SeqCst), 3);
        assert_eq!(gauge.finished.load(Ordering::SeqCst), 12);
        assert_eq!(gauge.current.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fifo_with_single_slot() {
        let queue = TaskQueue::new(1);
        let events = Arc::new(Mutex::new(Vec::new()));

        let completions: Vec<_> = ["A", "B", "C"]
            .into_iter()
            .map(|name| {
                let events = Arc::clone(&events);
                queue.enqueue(move || async move {
                    events.lock().unwrap().push(format!("start {name}"));
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    events.lock().unwrap().push(format!("end {name}"));
                })
            })
            .collect();

        for completion in completions {
            completion.await.unwrap();
        }

        let events = events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec!["start A", "end A", "start B", "end B", "start C", "end C"]
        );
    }

    #[tokio::test]
    async fn test_failure_does_not_block_later_units() {
        let queue = TaskQueue::new(1);

        let failing = queue.enqueue(|| async { Err::<u32, String>("boom".to_string()) });
        let passing = queue.enqueue(|| async { Ok::<u32, String>(7) });

        assert_eq!(failing.await.unwrap(), Err("boom".to_string()));
        assert_eq!(passing.await.unwrap(), Ok(7));
    }

    #[tokio::test]
    async fn test_result_is_passed_through() {
        let queue = TaskQueue::new(2);
        let value = queue.enqueue(|| async { vec![1, 2, 3] }).await.unwrap();
        assert_eq!(value, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_panicking_unit_frees_its_slot() {
        let queue = TaskQueue::new(1);

        let panicking = queue.enqueue(|| async {
            panic!("engine exploded");
        });
        let next = queue.enqueue(|| async { "still running" });

        assert_eq!(panicking.await, Err::<(), _>(QueueError::Dropped));
        assert_eq!(next.await.unwrap(), "still running");
    }

    #[tokio::test]
    async fn test_counters_return_to_idle() {
        let queue = TaskQueue::new(2);
        assert_eq!(queue.capacity(), 2);

        let completions: Vec<_> = (0..5)
            .map(|i| queue.enqueue(move || async move { i * 2 }))
            .collect();
        assert!(queue.running() <= 2);
        assert_eq!(queue.running() + queue.pending(), 5);

        let mut total = 0;
        for completion in completions {
            total += completion.await.unwrap();
        }
        tokio::task::yield_now().await;

        assert_eq!(total, 20);
        assert_eq!(queue.running(), 0);
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn test_unawaited_units_still_run() {
        let queue = TaskQueue::new(1);
        let gauge = Arc::new(Gauge::default());

        let g = Arc::clone(&gauge);
        drop(queue.enqueue(move || async move {
            g.enter();
            g.leave();
        }));

        queue.enqueue(|| async {}).await.unwrap();
        assert_eq!(gauge.finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        assert_eq!(TaskQueue::new(0).capacity(), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_running_never_exceeds_capacity(capacity in 1usize..5, units in 0usize..16) {
            let gauge = tokio_test::block_on(
                run_instrumented(capacity, units, Duration::from_millis(2)),
            );

            prop_assert!(gauge.peak.load(Ordering::SeqCst) <= capacity);
            prop_assert_eq!(gauge.finished.load(Ordering::SeqCst), units);
        }
    }
}
