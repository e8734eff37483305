//! Tracking Context
//!
//! The tracking context records which computation is currently running so
//! that reads can be attributed to it. This is what makes dependency
//! tracking automatic: a signal read inside a running computation links
//! the signal to that computation without any explicit wiring.
//!
//! # Implementation
//!
//! A thread-local stack holds the currently executing computations. A
//! computation pushes itself before running and pops on drop, so nested
//! computations (a rule whose condition reads another derived value, for
//! example) resolve to the innermost scope.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a subscriber.
///
/// Every computation that can depend on reactive values gets a unique ID
/// at creation. The ID is how the runtime's dependency tables refer to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

thread_local! {
    static SCOPE_STACK: RefCell<Vec<ScopeEntry>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the tracking stack: the running computation plus the
/// signal IDs it has read so far.
struct ScopeEntry {
    subscriber_id: SubscriberId,
    reads: Vec<u64>,
}

/// Guard representing an active tracking scope.
///
/// Dropping the guard pops the scope, so the stack stays balanced even if
/// the computation panics.
pub struct TrackingScope {
    subscriber_id: SubscriberId,
}

impl TrackingScope {
    /// Enter a new tracking scope for the given subscriber.
    ///
    /// While the returned guard is alive, signal reads are attributed to
    /// `subscriber_id`.
    pub fn enter(subscriber_id: SubscriberId) -> Self {
        SCOPE_STACK.with(|stack| {
            stack.borrow_mut().push(ScopeEntry {
                subscriber_id,
                reads: Vec::new(),
            });
        });

        Self { subscriber_id }
    }

    /// Whether any tracking scope is active on this thread.
    pub fn is_active() -> bool {
        SCOPE_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// The subscriber of the innermost active scope, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        SCOPE_STACK.with(|stack| stack.borrow().last().map(|entry| entry.subscriber_id))
    }

    /// Record that the innermost scope read the given signal.
    pub fn record_read(signal_id: u64) {
        SCOPE_STACK.with(|stack| {
            if let Some(entry) = stack.borrow_mut().last_mut() {
                entry.reads.push(signal_id);
            }
        });
    }

    /// The signal IDs read so far by the innermost scope.
    pub fn reads() -> Vec<u64> {
        SCOPE_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|entry| entry.reads.clone())
                .unwrap_or_default()
        })
    }
}

impl Drop for TrackingScope {
    fn drop(&mut self) {
        SCOPE_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.subscriber_id, self.subscriber_id,
                    "tracking scope mismatch: expected {:?}, got {:?}",
                    self.subscriber_id, entry.subscriber_id
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn scope_tracks_subscriber() {
        let id = SubscriberId::new();

        assert!(!TrackingScope::is_active());
        assert!(TrackingScope::current_subscriber().is_none());

        {
            let _scope = TrackingScope::enter(id);

            assert!(TrackingScope::is_active());
            assert_eq!(TrackingScope::current_subscriber(), Some(id));
        }

        assert!(!TrackingScope::is_active());
        assert!(TrackingScope::current_subscriber().is_none());
    }

    #[test]
    fn scope_records_reads() {
        let id = SubscriberId::new();
        let _scope = TrackingScope::enter(id);

        TrackingScope::record_read(1);
        TrackingScope::record_read(2);
        TrackingScope::record_read(3);

        assert_eq!(TrackingScope::reads(), vec![1, 2, 3]);
    }

    #[test]
    fn nested_scopes() {
        let outer = SubscriberId::new();
        let inner = SubscriberId::new();

        {
            let _outer_scope = TrackingScope::enter(outer);
            TrackingScope::record_read(1);

            {
                let _inner_scope = TrackingScope::enter(inner);
                TrackingScope::record_read(2);

                assert_eq!(TrackingScope::current_subscriber(), Some(inner));
                assert_eq!(TrackingScope::reads(), vec![2]);
            }

            assert_eq!(TrackingScope::current_subscriber(), Some(outer));
            assert_eq!(TrackingScope::reads(), vec![1]);
        }

        assert!(TrackingScope::current_subscriber().is_none());
    }
}
