//! Field Group
//!
//! A group binds one or more reactive fields that share an identical set
//! of rules. Groups are created per declaration and are not cached; only
//! the per-field bindings behind them are shared.

use std::any::Any;
use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;

use super::context::ViewModelContext;
use super::error::ValidationError;
use super::registry::{self, RuleArg};
use super::rule::{GroupFields, Rule};
use crate::reactive::{FieldRef, Signal};

/// A resolved, ordered set of fields for one declaration.
pub struct FieldSet(pub(crate) GroupFields);

/// Anything that resolves to the fields of a validation declaration: a
/// single field, a signal, or an ordered collection of fields.
pub trait IntoFieldSet {
    fn into_field_set(self) -> FieldSet;
}

impl IntoFieldSet for FieldSet {
    fn into_field_set(self) -> FieldSet {
        self
    }
}

impl IntoFieldSet for FieldRef {
    fn into_field_set(self) -> FieldSet {
        FieldSet(SmallVec::from_elem(self, 1))
    }
}

impl IntoFieldSet for &FieldRef {
    fn into_field_set(self) -> FieldSet {
        self.clone().into_field_set()
    }
}

impl<T> IntoFieldSet for &Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn into_field_set(self) -> FieldSet {
        self.field_ref().into_field_set()
    }
}

impl IntoFieldSet for Vec<FieldRef> {
    fn into_field_set(self) -> FieldSet {
        FieldSet(self.into_iter().collect())
    }
}

impl IntoFieldSet for &[FieldRef] {
    fn into_field_set(self) -> FieldSet {
        FieldSet(self.iter().cloned().collect())
    }
}

impl<const N: usize> IntoFieldSet for [FieldRef; N] {
    fn into_field_set(self) -> FieldSet {
        FieldSet(self.into_iter().collect())
    }
}

/// One or more fields sharing a set of rules.
///
/// Obtained from [`ViewModelContext::validate`]; rules declared here run
/// against every field in the group.
pub struct FieldGroup<VM>
where
    VM: Send + Sync + 'static,
{
    context: Arc<ViewModelContext<VM>>,
    fields: GroupFields,

    /// Rules declared against this group, in declaration order.
    rules: RwLock<Vec<Rule<VM>>>,
}

impl<VM> FieldGroup<VM>
where
    VM: Send + Sync + 'static,
{
    /// Build a group over the resolved fields.
    ///
    /// Fails with [`ValidationError::InvalidField`] when the selection is
    /// empty or names a field whose signal no longer exists; the failure
    /// is raised here, at declaration time, never deferred to evaluation.
    pub(crate) fn new(
        context: Arc<ViewModelContext<VM>>,
        fields: FieldSet,
    ) -> Result<Self, ValidationError> {
        let mut resolved: GroupFields = SmallVec::new();
        for field in fields.0 {
            if !field.is_live() {
                return Err(ValidationError::InvalidField(format!(
                    "field {} does not refer to a live signal",
                    field.id()
                )));
            }
            if !resolved.contains(&field) {
                resolved.push(field);
            }
        }

        if resolved.is_empty() {
            return Err(ValidationError::InvalidField(
                "selection resolved to no fields".to_string(),
            ));
        }

        // Materialize a binding per field up front, so a group with no
        // rules yet still publishes the trivially valid aggregate.
        for field in resolved.iter() {
            context.binding_for(field);
        }

        Ok(Self {
            context,
            fields: resolved,
            rules: RwLock::new(Vec::new()),
        })
    }

    /// The group's fields, in declaration order.
    pub fn fields(&self) -> &[FieldRef] {
        &self.fields
    }

    /// Attach a predicate rule to every field in the group.
    pub fn add_rule<F>(&self, predicate: F) -> Rule<VM>
    where
        F: Fn(&VM) -> bool + Send + Sync + 'static,
    {
        let rule = Rule::attach(&self.context, self.fields.clone(), Arc::new(predicate));
        self.rules.write().push(rule.clone());
        rule
    }

    /// Attach a named rule from the registry.
    ///
    /// The lookup happens now: an unknown name fails with
    /// [`ValidationError::UnknownRule`] before any rule state is built.
    /// The registry predicate is invoked once per field in the group, in
    /// group order, as `(view model, field, args)`; the rule holds only
    /// if every field passes, and evaluation stops at the first field
    /// that does not.
    pub fn add_named_rule(
        &self,
        name: &str,
        args: Vec<RuleArg>,
    ) -> Result<Rule<VM>, ValidationError> {
        let named = registry::named_rule(name)
            .ok_or_else(|| ValidationError::UnknownRule(name.to_string()))?;

        let fields = self.fields.clone();
        let predicate = move |view_model: &VM| {
            for field in fields.iter() {
                if !named(view_model as &dyn Any, field, &args) {
                    return false;
                }
            }
            true
        };

        let rule = Rule::attach(&self.context, self.fields.clone(), Arc::new(predicate));
        self.rules.write().push(rule.clone());
        Ok(rule)
    }

    /// The rules declared against this group so far.
    pub fn rules(&self) -> Vec<Rule<VM>> {
        self.rules.read().clone()
    }
}
