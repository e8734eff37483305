//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! participates in automatic dependency tracking.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a tracking scope (see `Computed`), the
//!    read is recorded and the runtime links the signal to the running
//!    computation.
//!
//! 2. When a signal's value changes, the runtime synchronously re-runs
//!    every computation that read it during its last evaluation.
//!
//! 3. Before the new value is written, the signal fires its before-change
//!    hooks. Aggregators use this to observe that a propagation pass is
//!    about to start while the old value is still in place.
//!
//! # Thread Safety
//!
//! The value sits behind a `parking_lot::RwLock` and callback lists behind
//! their own locks, so signals are `Send + Sync`. Propagation itself is
//! synchronous and expected to run on one thread at a time.

use std::any::Any;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::context::{SubscriberId, TrackingScope};
use super::runtime::Runtime;

/// Counter for generating unique signal IDs.
static SIGNAL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique signal ID.
fn next_signal_id() -> u64 {
    SIGNAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

type Callback = Box<dyn Fn() + Send + Sync>;

/// A reactive signal holding a value of type T.
///
/// # Example
///
/// ```rust,ignore
/// let age = Signal::new(27);
///
/// // Read the value
/// let value = age.get();
///
/// // Update the value (re-runs dependent computations)
/// age.set(28);
/// ```
pub struct Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Unique identifier for this signal.
    id: u64,

    /// The current value.
    value: Arc<RwLock<T>>,

    /// Callbacks fired synchronously before a new value is written.
    before_change: Arc<RwLock<Vec<Callback>>>,

    /// Callbacks fired after a new value was written, keyed by subscriber
    /// ID so individual subscriptions can be removed.
    subscribers: Arc<RwLock<Vec<(SubscriberId, Callback)>>>,
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            id: next_signal_id(),
            value: Arc::new(RwLock::new(value)),
            before_change: Arc::new(RwLock::new(Vec::new())),
            subscribers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the current value.
    ///
    /// If called within a tracking scope, the running computation is
    /// registered as a dependent of this signal.
    pub fn get(&self) -> T {
        if TrackingScope::is_active() {
            TrackingScope::record_read(self.id);
            if let Some(subscriber_id) = TrackingScope::current_subscriber() {
                Runtime::add_dependency(self.id, subscriber_id);
            }
        }

        self.value.read().clone()
    }

    /// Get the current value without registering a dependency.
    pub fn get_untracked(&self) -> T {
        self.value.read().clone()
    }

    /// Set a new value and propagate the change.
    ///
    /// Order of operations: before-change hooks fire while the old value
    /// is still readable, then the value is written, then after-change
    /// subscribers fire, then the runtime re-runs dependent computations.
    pub fn set(&self, value: T) {
        for hook in self.before_change.read().iter() {
            hook();
        }

        {
            let mut guard = self.value.write();
            *guard = value;
        }

        for (_, notify) in self.subscribers.read().iter() {
            notify();
        }

        Runtime::notify_signal_change(self.id);
    }

    /// Update the value using a function of the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let new_value = {
            let guard = self.value.read();
            f(&guard)
        };
        self.set(new_value);
    }

    /// Register a callback fired after every value change.
    ///
    /// Returns the subscription's ID for use with [`Signal::unsubscribe`].
    pub fn subscribe<F>(&self, notify: F) -> SubscriberId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = SubscriberId::new();
        self.subscribers.write().push((id, Box::new(notify)));
        id
    }

    /// Remove a previously registered after-change callback.
    pub fn unsubscribe(&self, subscriber_id: SubscriberId) {
        self.subscribers
            .write()
            .retain(|(id, _)| *id != subscriber_id);
    }

    /// Register a hook fired synchronously before each value change.
    pub fn on_before_change<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.before_change.write().push(Box::new(hook));
    }

    /// Create a type-erased handle to this signal.
    ///
    /// The handle holds only weak references; it does not keep the
    /// signal's storage alive.
    pub fn field_ref(&self) -> FieldRef {
        let value: Arc<dyn Any + Send + Sync> = Arc::clone(&self.value) as _;
        FieldRef {
            id: self.id,
            value: Arc::downgrade(&value),
            before_change: Arc::downgrade(&self.before_change),
        }
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Arc::clone(&self.value),
            before_change: Arc::clone(&self.before_change),
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("value", &self.get_untracked())
            .finish()
    }
}

/// A type-erased, non-owning handle to a [`Signal`].
///
/// Field references identify the reactive fields a validation declaration
/// targets. They support identity comparison, liveness checks, typed
/// dependency-tracked reads, and before-change subscription, without tying
/// the handle to the signal's value type.
pub struct FieldRef {
    id: u64,
    value: Weak<dyn Any + Send + Sync>,
    before_change: Weak<RwLock<Vec<Callback>>>,
}

impl FieldRef {
    /// The ID of the underlying signal.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the underlying signal's storage is still alive.
    pub fn is_live(&self) -> bool {
        self.value.strong_count() > 0
    }

    /// Read the current value as type `T`.
    ///
    /// Returns `None` if the signal was dropped or `T` is not its value
    /// type. Like [`Signal::get`], the read registers a dependency when a
    /// tracking scope is active.
    pub fn get<T>(&self) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let value = self.value.upgrade()?;

        if TrackingScope::is_active() {
            TrackingScope::record_read(self.id);
            if let Some(subscriber_id) = TrackingScope::current_subscriber() {
                Runtime::add_dependency(self.id, subscriber_id);
            }
        }

        value.downcast_ref::<RwLock<T>>().map(|lock| lock.read().clone())
    }

    /// Register a hook fired synchronously before each value change.
    ///
    /// Returns false if the underlying signal is gone.
    pub fn on_before_change<F>(&self, hook: F) -> bool
    where
        F: Fn() + Send + Sync + 'static,
    {
        match self.before_change.upgrade() {
            Some(hooks) => {
                hooks.write().push(Box::new(hook));
                true
            }
            None => false,
        }
    }
}

impl Clone for FieldRef {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Weak::clone(&self.value),
            before_change: Weak::clone(&self.before_change),
        }
    }
}

impl PartialEq for FieldRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for FieldRef {}

impl std::hash::Hash for FieldRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Debug for FieldRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldRef")
            .field("id", &self.id)
            .field("live", &self.is_live())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
