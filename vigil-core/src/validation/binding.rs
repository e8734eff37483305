//! Field Binding
//!
//! The per-field aggregator. A binding tracks every rule registered
//! against one field and reconciles their verdicts into the field's
//! single published validity state.
//!
//! # The aggregation protocol
//!
//! Several rules can share a field, and one upstream change can re-run
//! several of them in the same synchronous propagation pass. The field's
//! observers must never see a half-updated state where only some of the
//! scheduled rules have spoken, so publication is deferred until the pass
//! completes:
//!
//! 1. The field's before-change hook arms the binding: the pending count
//!    is set to the number of registered rules, before any of them has
//!    re-evaluated.
//!
//! 2. Each rule reports to the binding as its verdict finishes
//!    re-evaluating. A report decrements the pending count; while it is
//!    still positive nothing is published.
//!
//! 3. The report that brings the count to zero triggers publication. A
//!    report arriving with no armed pass (construction cascades,
//!    `when` / `with_error_message` re-reports) publishes immediately.
//!
//! 4. Publication rescans every registered rule rather than trusting only
//!    the rules that fired: a rule whose dependencies exclude the changed
//!    signal did not re-run this pass, and its standing verdict must not
//!    be erased by fresher neighbors. The field is valid only if every
//!    rule's verdict holds; each failing rule contributes its own message
//!    (custom if set, else the current default), in registration order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::attach;
use super::registry::settings;
use super::rule::Rule;
use crate::reactive::FieldRef;

pub struct FieldBinding<VM>
where
    VM: Send + Sync + 'static,
{
    /// The field this binding aggregates for.
    field: FieldRef,

    /// Registered rules, in registration order.
    rules: RwLock<Vec<Rule<VM>>>,

    /// Rules expected to report before the current pass's aggregate may
    /// be published.
    pending: AtomicUsize,
}

impl<VM> FieldBinding<VM>
where
    VM: Send + Sync + 'static,
{
    /// Create a binding for `field` and hook it into the field's
    /// before-change notification.
    ///
    /// The caller publishes the initial zero-rule aggregate via
    /// [`FieldBinding::publish_initial`] once the binding is stored,
    /// because publication can cascade into further rule evaluation.
    pub(crate) fn create(field: FieldRef) -> Arc<Self> {
        let binding = Arc::new(Self {
            field: field.clone(),
            rules: RwLock::new(Vec::new()),
            pending: AtomicUsize::new(0),
        });

        let weak = Arc::downgrade(&binding);
        field.on_before_change(move || {
            if let Some(binding) = weak.upgrade() {
                binding.arm();
            }
        });

        binding
    }

    /// Publish the aggregate for a freshly created binding. With no rules
    /// registered yet the field is trivially valid.
    pub(crate) fn publish_initial(&self) {
        self.publish();
    }

    /// The field this binding belongs to.
    pub fn field(&self) -> &FieldRef {
        &self.field
    }

    /// Append a rule, unless it is already registered here.
    ///
    /// A rule whose group spans several fields registers with each
    /// field's binding, but never twice with the same one.
    pub(crate) fn register(&self, rule: &Rule<VM>) {
        let mut rules = self.rules.write();
        if !rules.iter().any(|existing| existing.id() == rule.id()) {
            rules.push(rule.clone());
        }
    }

    /// Capture how many rules are about to re-evaluate.
    ///
    /// Runs synchronously before the field's value changes, so the count
    /// is taken while no rule of this pass has reported yet.
    fn arm(&self) {
        let expected = self.rules.read().len();
        self.pending.store(expected, Ordering::SeqCst);
    }

    /// Record that one rule finished re-evaluating.
    ///
    /// Publication happens exactly when the last expected rule of an
    /// armed pass reports. An unsolicited report, with nothing pending,
    /// publishes immediately.
    pub(crate) fn report_rule_result(&self) {
        let previous = self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |p| {
                Some(p.saturating_sub(1))
            })
            .unwrap_or(0);

        if previous.saturating_sub(1) == 0 {
            self.publish();
        }
    }

    /// Recompute the aggregate from every registered rule and write it to
    /// the field's derived sub-values.
    fn publish(&self) {
        let rules: Vec<Rule<VM>> = self.rules.read().clone();
        let settings = settings();

        let mut is_valid = true;
        let mut messages = Vec::new();
        for rule in &rules {
            if !rule.verdict() {
                is_valid = false;
                messages.push(
                    rule.message()
                        .unwrap_or_else(|| settings.default_error_message.clone()),
                );
            }
        }

        tracing::trace!(
            field = self.field.id(),
            is_valid,
            failing = messages.len(),
            "publishing aggregate validity"
        );

        let flag = attach::flag_entry(self.field.id(), &settings.valid_sub_field_name);
        let message_list = attach::messages_entry(self.field.id(), &settings.error_sub_field_name);
        flag.set(is_valid);
        message_list.set(messages);
    }
}
