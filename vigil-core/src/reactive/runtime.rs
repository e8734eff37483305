//! Reactive Runtime
//!
//! The runtime is the central coordinator between signals and the
//! computations that depend on them. It owns the dependency tables and
//! drives change propagation.
//!
//! # How It Works
//!
//! 1. When a computation is created, it registers with the runtime and
//!    receives a handle that unregisters it on drop.
//!
//! 2. When a signal is read inside a tracking scope, the runtime records
//!    an edge from the signal to the running computation. Edges are
//!    deduplicated: a computation that reads the same signal several
//!    times in one evaluation is still re-run once per change.
//!
//! 3. When a signal's value changes, the runtime snapshots the signal's
//!    dependent list, releases its table guards, and re-runs each live
//!    dependent synchronously in registration order.
//!
//! 4. Before a computation re-runs, its stale edges are cleared so that
//!    each evaluation's dependency set reflects only what it actually
//!    read that time.

use std::sync::{Arc, OnceLock, Weak};

use dashmap::DashMap;

use super::context::{SubscriberId, TrackingScope};

/// A computation that can be re-run when one of its dependencies changes.
pub trait Reactive: Send + Sync {
    /// The subscriber ID used in the runtime's dependency tables.
    fn subscriber_id(&self) -> SubscriberId;

    /// Re-run the computation and notify whoever listens to its result.
    fn schedule(&self);
}

/// Handle to a registered computation.
///
/// Dropping the handle unregisters the computation from the runtime.
pub struct RuntimeHandle {
    subscriber_id: SubscriberId,
}

impl Drop for RuntimeHandle {
    fn drop(&mut self) {
        Runtime::unregister(self.subscriber_id);
    }
}

/// The global reactive runtime.
pub struct Runtime;

static REGISTRY: OnceLock<DashMap<SubscriberId, Weak<dyn Reactive>>> = OnceLock::new();
static DEPENDENTS: OnceLock<DashMap<u64, Vec<SubscriberId>>> = OnceLock::new();

fn registry() -> &'static DashMap<SubscriberId, Weak<dyn Reactive>> {
    REGISTRY.get_or_init(DashMap::new)
}

fn dependents() -> &'static DashMap<u64, Vec<SubscriberId>> {
    DEPENDENTS.get_or_init(DashMap::new)
}

impl Runtime {
    /// Register a computation with the runtime.
    ///
    /// Returns a handle that unregisters it when dropped.
    pub fn register(reactive: Arc<dyn Reactive>) -> RuntimeHandle {
        let id = reactive.subscriber_id();
        registry().insert(id, Arc::downgrade(&reactive));
        RuntimeHandle { subscriber_id: id }
    }

    fn unregister(subscriber_id: SubscriberId) {
        registry().remove(&subscriber_id);

        for mut entry in dependents().iter_mut() {
            entry.value_mut().retain(|s| *s != subscriber_id);
        }
    }

    /// Record that `subscriber_id` depends on `signal_id`.
    ///
    /// Called automatically when a signal is read inside a tracking scope.
    pub fn add_dependency(signal_id: u64, subscriber_id: SubscriberId) {
        let mut subs = dependents().entry(signal_id).or_default();
        if !subs.contains(&subscriber_id) {
            subs.push(subscriber_id);
        }
    }

    /// Remove every edge pointing at `subscriber_id`.
    ///
    /// Called before a computation re-runs, so stale reads from the
    /// previous evaluation do not keep triggering it.
    pub fn clear_dependencies(subscriber_id: SubscriberId) {
        for mut entry in dependents().iter_mut() {
            entry.value_mut().retain(|s| *s != subscriber_id);
        }
    }

    /// Re-run every live computation that depends on `signal_id`.
    ///
    /// This is the propagation step behind [`Signal::set`]. All table
    /// guards are released before any computation runs, because a re-run
    /// re-reads signals and mutates the same tables.
    ///
    /// [`Signal::set`]: super::Signal::set
    pub fn notify_signal_change(signal_id: u64) {
        let subscriber_ids: Vec<SubscriberId> = dependents()
            .get(&signal_id)
            .map(|subs| subs.value().clone())
            .unwrap_or_default();

        if subscriber_ids.is_empty() {
            return;
        }

        tracing::trace!(signal_id, dependents = subscriber_ids.len(), "propagating change");

        let mut to_run: Vec<Arc<dyn Reactive>> = Vec::with_capacity(subscriber_ids.len());
        for id in subscriber_ids {
            if let Some(weak) = registry().get(&id) {
                if let Some(reactive) = weak.upgrade() {
                    to_run.push(reactive);
                }
            }
        }

        for reactive in to_run {
            reactive.schedule();
        }
    }

    /// The subscriber currently being tracked, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        TrackingScope::current_subscriber()
    }

    /// Whether a tracking scope is active on this thread.
    pub fn is_tracking() -> bool {
        TrackingScope::is_active()
    }
}
