//! Vigil Core
//!
//! This crate provides the core engine for Vigil, a declarative
//! validation layer over reactive state. It implements:
//!
//! - Reactive primitives (signals, eager computed values, automatic
//!   dependency tracking)
//! - A rule engine that re-evaluates validation rules whenever anything
//!   they read changes
//! - Per-field aggregation that publishes one combined validity result
//!   per propagation pass, however many rules share the field
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `reactive`: signals, computeds, and the dependency-tracking runtime
//! - `validation`: view-model contexts, field groups, rules, and the
//!   per-field aggregation bindings
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vigil_core::{for_view_model, is_valid, Signal};
//!
//! struct Profile {
//!     name: Signal<String>,
//!     age: Signal<i64>,
//! }
//!
//! let vm = Arc::new(Profile {
//!     name: Signal::new(String::new()),
//!     age: Signal::new(0),
//! });
//!
//! let ctx = for_view_model(&vm);
//! ctx.validate(&vm.name)?
//!     .add_rule(|vm: &Profile| !vm.name.get().is_empty())
//!     .with_error_message("Name is required");
//!
//! vm.name.set("Ada".into());
//! assert!(is_valid(&vm.name.field_ref()));
//! ```

pub mod reactive;
pub mod validation;

pub use reactive::{Computed, FieldRef, Signal};
pub use validation::{
    add_named_rule, clear_named_rules, clear_view_model_contexts, detach_all, error_messages,
    for_view_model, is_valid, messages_signal, named_rule, reset_settings, settings, sub_value,
    update_settings, validity_signal, FieldGroup, FieldSet, IntoFieldSet, NamedRule, Rule,
    RuleArg, Settings, SubValue, ValidationError, ViewModelContext,
};
