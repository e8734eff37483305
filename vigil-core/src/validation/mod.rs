//! Validation Engine
//!
//! A declarative validation layer over the reactive primitives: attach
//! rules to fields, and the engine keeps each field's aggregated validity
//! and error messages current as the view model changes.
//!
//! # Declaring rules
//!
//! ```rust,ignore
//! let vm = Arc::new(SignupForm::default());
//!
//! for_view_model(&vm)
//!     .validate(&vm.email)?
//!     .add_rule(|vm: &SignupForm| vm.email.get().contains('@'))
//!     .with_error_message("Enter a valid email address");
//!
//! vm.email.set("ada@lovelace.dev".into());
//! assert!(is_valid(&vm.email.field_ref()));
//! ```
//!
//! # How updates flow
//!
//! A field mutation arms the field's binding through the signal's
//! before-change hook, the runtime re-runs every rule verdict that read
//! the field, each re-evaluation reports back to the binding, and the
//! report completing the pass publishes the combined result exactly once.

mod attach;
mod binding;
mod context;
mod error;
mod group;
mod registry;
mod rule;

pub use attach::{
    detach_all, error_messages, is_valid, messages_signal, sub_value, validity_signal, SubValue,
};
pub use binding::FieldBinding;
pub use context::{clear_view_model_contexts, for_view_model, ViewModelContext};
pub use error::ValidationError;
pub use group::{FieldGroup, FieldSet, IntoFieldSet};
pub use registry::{
    add_named_rule, clear_named_rules, named_rule, reset_settings, settings, update_settings,
    NamedRule, RuleArg, Settings,
};
pub use rule::Rule;
