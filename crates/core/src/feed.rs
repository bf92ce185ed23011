//! Live snapshot feeds
//!
//! A feed holds the latest full snapshot of a collection and pushes it to
//! every subscriber whenever it is replaced. There are no deltas: each
//! notification carries the whole collection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::error::Error;

type SnapshotFn<T> = Arc<dyn Fn(&[T]) + Send + Sync>;
type ErrorFn = Arc<dyn Fn(&Error) + Send + Sync>;

struct Subscriber<T> {
    on_snapshot: SnapshotFn<T>,
    on_error: ErrorFn,
}

struct FeedState<T> {
    next_id: u64,
    subscribers: HashMap<u64, Subscriber<T>>,
    latest: Option<Arc<Vec<T>>>,
    /// Revision of `latest`; older snapshots are dropped on publish
    revision: u64,
}

fn lock<'a, S>(mutex: &'a Mutex<S>, what: &str) -> MutexGuard<'a, S> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!(lock = what, "Feed mutex poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Publisher side of a snapshot subscription.
///
/// Deliveries are serialized: a subscriber never sees a snapshot older than
/// one it already received. Callbacks must not subscribe to the feed that
/// is calling them.
pub struct SnapshotFeed<T> {
    state: Arc<Mutex<FeedState<T>>>,
    delivery: Mutex<()>,
}

impl<T> Default for SnapshotFeed<T> {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(FeedState {
                next_id: 0,
                subscribers: HashMap::new(),
                latest: None,
                revision: 0,
            })),
            delivery: Mutex::new(()),
        }
    }
}

impl<T: Send + Sync + 'static> SnapshotFeed<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register callbacks. The current snapshot, if any, is delivered
    /// immediately; the returned handle detaches them when dropped.
    pub fn subscribe<S, E>(&self, on_snapshot: S, on_error: E) -> Subscription
    where
        S: Fn(&[T]) + Send + Sync + 'static,
        E: Fn(&Error) + Send + Sync + 'static,
    {
        let on_snapshot: SnapshotFn<T> = Arc::new(on_snapshot);
        let _delivery = lock(&self.delivery, "feed delivery");
        let (id, latest) = {
            let mut state = lock(&self.state, "feed state");
            let id = state.next_id;
            state.next_id += 1;
            state.subscribers.insert(
                id,
                Subscriber {
                    on_snapshot: on_snapshot.clone(),
                    on_error: Arc::new(on_error),
                },
            );
            (id, state.latest.clone())
        };

        if let Some(snapshot) = latest {
            on_snapshot(&snapshot);
        }

        let weak: Weak<Mutex<FeedState<T>>> = Arc::downgrade(&self.state);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(state) = weak.upgrade() {
                    lock(&state, "feed state").subscribers.remove(&id);
                }
            })),
        }
    }

    /// Replace the snapshot and notify every subscriber
    pub fn publish(&self, snapshot: Vec<T>) {
        self.deliver(None, snapshot);
    }

    /// Publish a snapshot read at `revision`. Returns false, without
    /// notifying anyone, when a snapshot of the same or a later revision
    /// was already published.
    pub fn publish_revision(&self, revision: u64, snapshot: Vec<T>) -> bool {
        self.deliver(Some(revision), snapshot)
    }

    fn deliver(&self, revision: Option<u64>, snapshot: Vec<T>) -> bool {
        let _delivery = lock(&self.delivery, "feed delivery");
        let snapshot = Arc::new(snapshot);
        let callbacks: Vec<SnapshotFn<T>> = {
            let mut state = lock(&self.state, "feed state");
            let revision = revision.unwrap_or(state.revision + 1);
            if state.latest.is_some() && revision <= state.revision {
                return false;
            }
            state.revision = revision;
            state.latest = Some(snapshot.clone());
            state
                .subscribers
                .values()
                .map(|s| s.on_snapshot.clone())
                .collect()
        };
        // The state lock is released so callbacks may unsubscribe
        for callback in callbacks {
            callback(&snapshot);
        }
        true
    }

    /// Report a failure to every subscriber; the last snapshot is kept
    pub fn fail(&self, error: &Error) {
        let _delivery = lock(&self.delivery, "feed delivery");
        let callbacks: Vec<ErrorFn> = lock(&self.state, "feed state")
            .subscribers
            .values()
            .map(|s| s.on_error.clone())
            .collect();
        for callback in callbacks {
            callback(error);
        }
    }

    pub fn latest(&self) -> Option<Arc<Vec<T>>> {
        lock(&self.state, "feed state").latest.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.state, "feed state").subscribers.len()
    }
}

/// Handle returned by [`SnapshotFeed::subscribe`]
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.detach_now();
    }

    fn detach_now(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_subscribers_receive_whole_snapshots() {
        let feed: SnapshotFeed<u32> = SnapshotFeed::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = feed.subscribe(move |items: &[u32]| sink.lock().unwrap().push(items.to_vec()), |_| {});

        feed.publish(vec![1, 2]);
        feed.publish(vec![3]);
        assert_eq!(*seen.lock().unwrap(), vec![vec![1, 2], vec![3]]);
    }

    #[test]
    fn test_late_subscriber_gets_current_snapshot() {
        let feed: SnapshotFeed<u32> = SnapshotFeed::new();
        feed.publish(vec![7]);

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let _sub = feed.subscribe(
            move |items: &[u32]| {
                counter.fetch_add(items.len(), Ordering::SeqCst);
            },
            |_| {},
        );
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_and_unsubscribe_detach() {
        let feed: SnapshotFeed<u32> = SnapshotFeed::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let c = calls.clone();
        let first = feed.subscribe(move |_: &[u32]| { c.fetch_add(1, Ordering::SeqCst); }, |_| {});
        let c = calls.clone();
        let second = feed.subscribe(move |_: &[u32]| { c.fetch_add(1, Ordering::SeqCst); }, |_| {});
        assert_eq!(feed.subscriber_count(), 2);

        drop(first);
        second.unsubscribe();
        feed.publish(vec![1]);
        assert_eq!(feed.subscriber_count(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_errors_reach_subscribers() {
        let feed: SnapshotFeed<u32> = SnapshotFeed::new();
        let errors = Arc::new(AtomicUsize::new(0));
        let e = errors.clone();
        let _sub = feed.subscribe(|_: &[u32]| {}, move |_| { e.fetch_add(1, Ordering::SeqCst); });

        feed.fail(&Error::NotFound("event".into()));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_older_revision_is_ignored() {
        let feed: SnapshotFeed<u32> = SnapshotFeed::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = feed.subscribe(move |items: &[u32]| sink.lock().unwrap().push(items.to_vec()), |_| {});

        assert!(feed.publish_revision(5, vec![5]));
        assert!(!feed.publish_revision(3, vec![3]));
        assert!(!feed.publish_revision(5, vec![55]));
        assert!(feed.publish_revision(6, vec![6]));
        feed.publish(vec![7]);

        assert_eq!(*seen.lock().unwrap(), vec![vec![5], vec![6], vec![7]]);
        assert_eq!(*feed.latest().unwrap(), vec![7]);
    }

    #[test]
    fn test_concurrent_publishers_leave_newest_snapshot() {
        let feed: Arc<SnapshotFeed<u64>> = Arc::new(SnapshotFeed::new());
        let last = Arc::new(Mutex::new(0u64));
        let sink = last.clone();
        let _sub = feed.subscribe(
            move |items: &[u64]| {
                let mut last = sink.lock().unwrap();
                // Deliveries never go backwards
                assert!(items[0] > *last);
                *last = items[0];
            },
            |_| {},
        );

        let handles: Vec<_> = (0..8u64)
            .map(|thread| {
                let feed = feed.clone();
                std::thread::spawn(move || {
                    for i in 0..50u64 {
                        let revision = i * 8 + thread + 1;
                        feed.publish_revision(revision, vec![revision]);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*last.lock().unwrap(), 400);
        assert_eq!(*feed.latest().unwrap(), vec![400]);
    }

    #[test]
    fn test_subscription_outlives_feed() {
        let feed: SnapshotFeed<u32> = SnapshotFeed::new();
        let sub = feed.subscribe(|_: &[u32]| {}, |_| {});
        drop(feed);
        drop(sub);
    }
}
