//! Rule Context
//!
//! One rule attached to a field group. The rule owns its predicate, its
//! optional activation condition, its optional custom message, and the
//! dependency-tracked verdict wrapping the predicate.
//!
//! The verdict is a [`Computed`]: evaluating it records every signal the
//! condition and predicate read, so any later change to one of those
//! signals re-evaluates the rule and reports the fresh verdict to the
//! binding of every field in the rule's group.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use smallvec::SmallVec;

use super::context::ViewModelContext;
use crate::reactive::{Computed, Signal, SubscriberId};

pub(crate) type Predicate<VM> = Arc<dyn Fn(&VM) -> bool + Send + Sync>;
type Condition<VM> = Arc<dyn Fn(&VM) -> bool + Send + Sync>;

pub(crate) type GroupFields = SmallVec<[crate::reactive::FieldRef; 2]>;

struct RuleState<VM>
where
    VM: Send + Sync + 'static,
{
    context: Weak<ViewModelContext<VM>>,

    /// The fields of the declaring group, in group order.
    fields: GroupFields,

    /// Activation condition. Held in a signal so that replacing it, or a
    /// change to anything it reads, re-evaluates the verdict through
    /// ordinary propagation.
    condition: Signal<Option<Condition<VM>>>,

    /// Message published when this rule fails. Falls back to the global
    /// default when unset.
    custom_message: RwLock<Option<String>>,

    /// The dependency-tracked verdict.
    verdict: Computed<bool>,
}

impl<VM> RuleState<VM>
where
    VM: Send + Sync + 'static,
{
    /// Report the current verdict to the binding of every targeted field.
    fn report_to_bindings(self: &Arc<Self>) {
        let Some(context) = self.context.upgrade() else {
            return;
        };
        for field in self.fields.iter() {
            context.binding_for(field).report_rule_result();
        }
    }
}

/// A rule declared against a field group.
///
/// Cloneable handle; clones refer to the same rule. The configuration
/// methods return `self` so declarations chain:
///
/// ```rust,ignore
/// ctx.validate(&vm.age)?
///     .add_rule(|vm: &Profile| vm.age.get() >= 18)
///     .when(|vm| vm.registered.get())
///     .with_error_message("Members must be adults");
/// ```
pub struct Rule<VM>
where
    VM: Send + Sync + 'static,
{
    state: Arc<RuleState<VM>>,
}

impl<VM> Rule<VM>
where
    VM: Send + Sync + 'static,
{
    /// Build a rule over `fields`, wire it into each field's binding, and
    /// run the initial report cascade that establishes published
    /// validity.
    pub(crate) fn attach(
        context: &Arc<ViewModelContext<VM>>,
        fields: GroupFields,
        predicate: Predicate<VM>,
    ) -> Self {
        let condition: Signal<Option<Condition<VM>>> = Signal::new(None);

        // The verdict evaluates the condition first: a deactivated rule
        // is vacuously satisfied, so a field can never be invalid because
        // of a rule that is switched off.
        let view_model = Arc::clone(context.view_model());
        let condition_probe = condition.clone();
        let verdict = Computed::new(move || {
            if let Some(active_when) = condition_probe.get() {
                if !active_when(&view_model) {
                    return true;
                }
            }
            let holds = predicate(&view_model);
            tracing::trace!(holds, "rule predicate evaluated");
            holds
        });

        let state = Arc::new(RuleState {
            context: Arc::downgrade(context),
            fields,
            condition,
            custom_message: RwLock::new(None),
            verdict,
        });

        let rule = Self {
            state: Arc::clone(&state),
        };

        for field in state.fields.iter() {
            context.binding_for(field).register(&rule);
        }

        // Every re-evaluation of the verdict reports to all target
        // bindings, which is what drives the pending-count protocol.
        let weak = Arc::downgrade(&state);
        state.verdict.subscribe(move || {
            if let Some(state) = weak.upgrade() {
                state.report_to_bindings();
            }
        });

        state.report_to_bindings();

        rule
    }

    /// Identity of this rule within bindings.
    pub(crate) fn id(&self) -> SubscriberId {
        self.state.verdict.subscriber_id()
    }

    /// The rule's current verdict.
    pub fn verdict(&self) -> bool {
        self.state.verdict.get()
    }

    /// The custom message, if one was set.
    pub fn message(&self) -> Option<String> {
        self.state.custom_message.read().clone()
    }

    /// Set or replace the activation condition.
    ///
    /// While the condition evaluates to false the rule reports valid
    /// regardless of its predicate. Replacing the condition re-evaluates
    /// and republishes immediately; the last condition set wins.
    pub fn when<F>(self, condition: F) -> Self
    where
        F: Fn(&VM) -> bool + Send + Sync + 'static,
    {
        self.state.condition.set(Some(Arc::new(condition)));
        self.state.report_to_bindings();
        self
    }

    /// Set or replace the message published when this rule fails.
    ///
    /// Republishes immediately; the last message set wins.
    pub fn with_error_message(self, message: impl Into<String>) -> Self {
        *self.state.custom_message.write() = Some(message.into());
        self.state.report_to_bindings();
        self
    }
}

impl<VM> Clone for Rule<VM>
where
    VM: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<VM> std::fmt::Debug for Rule<VM>
where
    VM: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id())
            .field("verdict", &self.state.verdict.get())
            .field("fields", &self.state.fields.len())
            .finish()
    }
}
