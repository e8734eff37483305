//! View-Model Context
//!
//! Per-view-model registry of field bindings, cached process-wide by
//! view-model identity. Repeated validation declarations against the same
//! view model share bindings instead of duplicating them.

use std::any::Any;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::RwLock;

use super::binding::FieldBinding;
use super::error::ValidationError;
use super::group::{FieldGroup, IntoFieldSet};
use crate::reactive::FieldRef;

static CONTEXTS: OnceLock<DashMap<usize, Arc<dyn Any + Send + Sync>>> = OnceLock::new();

fn contexts() -> &'static DashMap<usize, Arc<dyn Any + Send + Sync>> {
    CONTEXTS.get_or_init(DashMap::new)
}

/// The validation context for a view model.
///
/// Obtained through [`for_view_model`]; holds the view model and the
/// field bindings created for it.
pub struct ViewModelContext<VM>
where
    VM: Send + Sync + 'static,
{
    view_model: Arc<VM>,
    bindings: RwLock<IndexMap<u64, Arc<FieldBinding<VM>>>>,
}

/// The context for `view_model`, created on first call and cached by
/// identity thereafter.
///
/// Identity means the `Arc` allocation: two structurally identical view
/// models held in distinct `Arc`s get distinct contexts. The cache lives
/// for the process, or until [`clear_view_model_contexts`].
pub fn for_view_model<VM>(view_model: &Arc<VM>) -> Arc<ViewModelContext<VM>>
where
    VM: Send + Sync + 'static,
{
    let key = Arc::as_ptr(view_model) as usize;

    if let Some(existing) = contexts().get(&key) {
        if let Ok(context) = Arc::clone(existing.value()).downcast::<ViewModelContext<VM>>() {
            return context;
        }
    }

    tracing::debug!(key, "creating view-model context");
    let context = Arc::new(ViewModelContext {
        view_model: Arc::clone(view_model),
        bindings: RwLock::new(IndexMap::new()),
    });
    contexts().insert(key, Arc::clone(&context) as Arc<dyn Any + Send + Sync>);
    context
}

/// Drop every cached view-model context. Intended for test teardown.
pub fn clear_view_model_contexts() {
    contexts().clear();
}

impl<VM> ViewModelContext<VM>
where
    VM: Send + Sync + 'static,
{
    /// The view model this context validates.
    pub fn view_model(&self) -> &Arc<VM> {
        &self.view_model
    }

    /// Begin a validation declaration over the given field or fields.
    pub fn validate(
        self: &Arc<Self>,
        fields: impl IntoFieldSet,
    ) -> Result<FieldGroup<VM>, ValidationError> {
        FieldGroup::new(Arc::clone(self), fields.into_field_set())
    }

    /// Begin a validation declaration with a selector function, evaluated
    /// immediately against the view model.
    pub fn validate_with<F, S>(self: &Arc<Self>, selector: F) -> Result<FieldGroup<VM>, ValidationError>
    where
        F: FnOnce(&VM) -> S,
        S: IntoFieldSet,
    {
        let fields = selector(&self.view_model).into_field_set();
        FieldGroup::new(Arc::clone(self), fields)
    }

    /// The binding for `field`, created empty on first request.
    ///
    /// The initial publication happens after the bindings map guard is
    /// released: publishing can cascade into rules that call back into
    /// this registry.
    pub(crate) fn binding_for(&self, field: &FieldRef) -> Arc<FieldBinding<VM>> {
        if let Some(binding) = self.bindings.read().get(&field.id()) {
            return Arc::clone(binding);
        }

        let binding = FieldBinding::create(field.clone());
        let stored = {
            let mut bindings = self.bindings.write();
            Arc::clone(
                bindings
                    .entry(field.id())
                    .or_insert_with(|| Arc::clone(&binding)),
            )
        };

        if Arc::ptr_eq(&stored, &binding) {
            stored.publish_initial();
        }
        stored
    }
}
