//! Named-Rule Registry and Settings
//!
//! Process-wide, mutable state shared by every view-model context: the
//! registry of named rule predicates and the engine settings. Both have
//! explicit lifecycle operations (`clear_named_rules`, `reset_settings`)
//! so tests and embedders can restore a pristine state; neither is
//! populated implicitly.
//!
//! Registration is expected at setup time, before active validation.
//! Mutating the registry while a propagation pass is running is not
//! supported.

use std::any::Any;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::reactive::FieldRef;

/// An argument passed to a named rule, e.g. the bound in a `min` rule.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleArg {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl RuleArg {
    /// The argument as an integer, if it is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The argument as a float; integers coerce.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// The argument as a string slice, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    /// The argument as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<i64> for RuleArg {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for RuleArg {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for RuleArg {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for RuleArg {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for RuleArg {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<bool> for RuleArg {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// A named rule predicate.
///
/// Invoked once per field in the declaring group with the (type-erased)
/// view model, the field under validation, and the declaration arguments.
pub type NamedRule = Arc<dyn Fn(&dyn Any, &FieldRef, &[RuleArg]) -> bool + Send + Sync>;

static NAMED_RULES: OnceLock<DashMap<String, NamedRule>> = OnceLock::new();

fn named_rules() -> &'static DashMap<String, NamedRule> {
    NAMED_RULES.get_or_init(DashMap::new)
}

/// Register a rule predicate under a name.
///
/// Re-registering a name replaces the previous predicate.
pub fn add_named_rule<F>(name: impl Into<String>, rule: F)
where
    F: Fn(&dyn Any, &FieldRef, &[RuleArg]) -> bool + Send + Sync + 'static,
{
    let name = name.into();
    tracing::debug!(rule = %name, "registering named rule");
    named_rules().insert(name, Arc::new(rule));
}

/// Look up a named rule predicate.
pub fn named_rule(name: &str) -> Option<NamedRule> {
    named_rules().get(name).map(|entry| Arc::clone(entry.value()))
}

/// Remove every registered named rule.
pub fn clear_named_rules() {
    tracing::debug!("clearing named rules");
    named_rules().clear();
}

/// Engine settings.
///
/// The sub-field names decide the keys under which the derived validity
/// flag and message list are attached to a field; they are consulted at
/// publication time, so renaming them mid-flight attaches new sub-values
/// under the new names and leaves the old ones behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Name under which the derived validity flag is attached.
    pub valid_sub_field_name: String,

    /// Name under which the derived message list is attached.
    pub error_sub_field_name: String,

    /// Message used for a failing rule with no custom message.
    pub default_error_message: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            valid_sub_field_name: "isValid".to_string(),
            error_sub_field_name: "errorMessages".to_string(),
            default_error_message: "This field is invalid".to_string(),
        }
    }
}

impl Settings {
    /// Parse settings from a JSON document.
    ///
    /// Unspecified options keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

static SETTINGS: OnceLock<RwLock<Settings>> = OnceLock::new();

fn settings_cell() -> &'static RwLock<Settings> {
    SETTINGS.get_or_init(|| RwLock::new(Settings::default()))
}

/// A snapshot of the current settings.
pub fn settings() -> Settings {
    settings_cell().read().clone()
}

/// Mutate the global settings in place.
pub fn update_settings<F>(f: F)
where
    F: FnOnce(&mut Settings),
{
    let mut guard = settings_cell().write();
    f(&mut guard);
    tracing::debug!(settings = ?*guard, "settings updated");
}

/// Restore the default settings.
pub fn reset_settings() {
    *settings_cell().write() = Settings::default();
}
