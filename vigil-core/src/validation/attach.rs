//! Derived Sub-Value Side Table
//!
//! Fields are owned by the view model, not by this engine, so the derived
//! `isValid` / `errorMessages` values live in a side table keyed by field
//! identity rather than on the field itself. Entries are keyed by the
//! settings' sub-field names as they were at publication time and are
//! created at most once per (field, name), shared by every rule that
//! targets the field.

use std::sync::OnceLock;

use dashmap::DashMap;
use indexmap::IndexMap;

use super::registry::settings;
use crate::reactive::{FieldRef, Signal};

/// A derived value attached to a field.
#[derive(Debug, Clone)]
pub enum SubValue {
    /// The aggregated validity flag.
    Flag(Signal<bool>),
    /// The aggregated error message list.
    Messages(Signal<Vec<String>>),
}

static ATTACHMENTS: OnceLock<DashMap<u64, IndexMap<String, SubValue>>> = OnceLock::new();

fn attachments() -> &'static DashMap<u64, IndexMap<String, SubValue>> {
    ATTACHMENTS.get_or_init(DashMap::new)
}

/// Get or create the validity flag attached to `field_id` under `name`.
pub(crate) fn flag_entry(field_id: u64, name: &str) -> Signal<bool> {
    let mut entry = attachments().entry(field_id).or_default();
    if let Some(SubValue::Flag(signal)) = entry.get(name) {
        return signal.clone();
    }
    let signal = Signal::new(true);
    entry.insert(name.to_string(), SubValue::Flag(signal.clone()));
    signal
}

/// Get or create the message list attached to `field_id` under `name`.
pub(crate) fn messages_entry(field_id: u64, name: &str) -> Signal<Vec<String>> {
    let mut entry = attachments().entry(field_id).or_default();
    if let Some(SubValue::Messages(signal)) = entry.get(name) {
        return signal.clone();
    }
    let signal = Signal::new(Vec::new());
    entry.insert(name.to_string(), SubValue::Messages(signal.clone()));
    signal
}

/// The sub-value attached to `field` under `name`, if any.
pub fn sub_value(field: &FieldRef, name: &str) -> Option<SubValue> {
    attachments()
        .get(&field.id())
        .and_then(|entry| entry.get(name).cloned())
}

/// The validity flag attached to `field` under the current settings name.
pub fn validity_signal(field: &FieldRef) -> Option<Signal<bool>> {
    match sub_value(field, &settings().valid_sub_field_name) {
        Some(SubValue::Flag(signal)) => Some(signal),
        _ => None,
    }
}

/// The message list attached to `field` under the current settings name.
pub fn messages_signal(field: &FieldRef) -> Option<Signal<Vec<String>>> {
    match sub_value(field, &settings().error_sub_field_name) {
        Some(SubValue::Messages(signal)) => Some(signal),
        _ => None,
    }
}

/// The field's published validity. A field nothing was ever published
/// for is valid.
///
/// Reads through the underlying signal, so calling this inside a
/// computed makes the computed track the field's validity.
pub fn is_valid(field: &FieldRef) -> bool {
    validity_signal(field).map(|signal| signal.get()).unwrap_or(true)
}

/// The field's published error messages, in rule-registration order.
pub fn error_messages(field: &FieldRef) -> Vec<String> {
    messages_signal(field)
        .map(|signal| signal.get())
        .unwrap_or_default()
}

/// Drop every attached sub-value. Intended for test teardown.
pub fn detach_all() {
    attachments().clear();
}
