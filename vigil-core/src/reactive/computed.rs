//! Computed Implementation
//!
//! A Computed is an eager dependency-tracked computation. It evaluates
//! once at construction, caches its result, and re-evaluates whenever any
//! signal it read during its last run changes.
//!
//! # How Computeds Work
//!
//! 1. Construction runs the computation inside a tracking scope, which
//!    records the set of signals it reads.
//!
//! 2. When one of those signals changes, the runtime schedules the
//!    computed, which clears its stale dependency edges, re-runs, and
//!    caches the new result.
//!
//! 3. After every re-evaluation the computed notifies its subscribers,
//!    whether or not the value changed. Consumers that aggregate results
//!    from several computations count evaluations, so suppressing
//!    same-value notifications would under-report.
//!
//! # Differences from a lazy memo
//!
//! A memo recomputes on next read; a computed recomputes at change time.
//! Validation needs the eager form: a field's published validity must be
//! current the moment a mutation's propagation pass finishes, without
//! anyone polling.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::{SubscriberId, TrackingScope};
use super::runtime::{Reactive, Runtime, RuntimeHandle};

type Callback = Box<dyn Fn() + Send + Sync>;

struct ComputedInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// The subscriber ID used for dependency tracking.
    subscriber_id: SubscriberId,

    /// The computation function.
    compute: Box<dyn Fn() -> T + Send + Sync>,

    /// The cached result of the last evaluation.
    value: RwLock<Option<T>>,

    /// Callbacks invoked after every evaluation.
    subscribers: RwLock<Vec<(SubscriberId, Callback)>>,
}

impl<T> ComputedInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Run the computation inside a tracking scope and cache the result.
    fn execute(&self) -> T {
        Runtime::clear_dependencies(self.subscriber_id);

        let new_value = {
            let _scope = TrackingScope::enter(self.subscriber_id);
            (self.compute)()
        };

        *self.value.write() = Some(new_value.clone());
        new_value
    }

    fn notify(&self) {
        for (_, callback) in self.subscribers.read().iter() {
            callback();
        }
    }
}

impl<T> Reactive for ComputedInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    fn schedule(&self) {
        self.execute();
        self.notify();
    }
}

/// An eager dependency-tracked computation with a cached result.
///
/// # Example
///
/// ```rust,ignore
/// let name = Signal::new(String::new());
///
/// let name_clone = name.clone();
/// let non_empty = Computed::new(move || !name_clone.get().is_empty());
/// assert!(!non_empty.get());
///
/// name.set("Ada".into());   // non_empty re-evaluates here
/// assert!(non_empty.get());
/// ```
pub struct Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<ComputedInner<T>>,

    /// Keeps the computation registered with the runtime.
    _registration: Arc<RuntimeHandle>,
}

impl<T> Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new computed and evaluate it immediately.
    ///
    /// The initial evaluation establishes the dependency set, so the
    /// computed starts re-running from the very first change.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let inner = Arc::new(ComputedInner {
            subscriber_id: SubscriberId::new(),
            compute: Box::new(compute),
            value: RwLock::new(None),
            subscribers: RwLock::new(Vec::new()),
        });

        let registration = Runtime::register(inner.clone() as Arc<dyn Reactive>);
        inner.execute();

        Self {
            inner,
            _registration: Arc::new(registration),
        }
    }

    /// The subscriber ID for this computed.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.subscriber_id
    }

    /// Get the cached value of the last evaluation.
    pub fn get(&self) -> T {
        if let Some(value) = self.inner.value.read().clone() {
            return value;
        }
        self.inner.execute()
    }

    /// Register a callback invoked after every evaluation.
    ///
    /// Returns the subscription's ID for use with
    /// [`Computed::unsubscribe`].
    pub fn subscribe<F>(&self, callback: F) -> SubscriberId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = SubscriberId::new();
        self.inner.subscribers.write().push((id, Box::new(callback)));
        id
    }

    /// Remove a previously registered callback.
    pub fn unsubscribe(&self, subscription: SubscriberId) {
        self.inner
            .subscribers
            .write()
            .retain(|(id, _)| *id != subscription);
    }
}

impl<T> Clone for Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _registration: Arc::clone(&self._registration),
        }
    }
}

impl<T> Debug for Computed<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("subscriber_id", &self.inner.subscriber_id)
            .field("value", &self.inner.value.read())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
