//! Reactive Primitives
//!
//! This module implements the reactive substrate the validation engine is
//! built on: signals, eager computed values, and automatic dependency
//! tracking.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A [`Signal`] is a container for mutable state. When a signal is read
//! inside a tracking scope, the signal registers the running computation
//! as a dependent. When the signal's value changes, every dependent is
//! re-run synchronously. Signals additionally expose before-change hooks,
//! fired prior to the write, which is what lets a per-field aggregator
//! see a propagation pass coming before any rule has re-evaluated.
//!
//! ## Computeds
//!
//! A [`Computed`] is an eager derived value: it evaluates at construction
//! and re-evaluates the moment a dependency changes, notifying its
//! subscribers after every evaluation. Rule verdicts are computeds.
//!
//! ## Field references
//!
//! A [`FieldRef`] is a type-erased, non-owning handle to a signal. The
//! validation engine works with field references so that one declaration
//! can span fields of different value types.
//!
//! # Implementation Notes
//!
//! Dependency detection uses a thread-local tracking stack: reading a
//! signal while a computation runs links the two through the global
//! [`Runtime`]. This "transparent reactivity" approach is the one used by
//! SolidJS, Vue 3, and Leptos.

mod computed;
mod context;
mod runtime;
mod signal;

pub use computed::Computed;
pub use context::{SubscriberId, TrackingScope};
pub use runtime::{Reactive, Runtime, RuntimeHandle};
pub use signal::{FieldRef, Signal};
