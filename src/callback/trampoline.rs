use super::{Callback, CallbackRef, CallbackResult, DispatchGuard, Inquiry, Reply};
use crate::binding::{Binding, BindingMetadata, Constraint};
use crate::error::Result;
use crate::handler::HandlerRef;
use crate::policy::CallbackPolicy;
use crate::types::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Transparent wrapper that forwards every operation to the wrapped callback.
///
/// Used where a layer needs to intercept one operation (by wrapping the
/// trampoline again) without re-implementing the rest.
#[derive(Clone)]
pub struct Trampoline {
    inner: CallbackRef,
}

impl Trampoline {
    pub fn new(inner: CallbackRef) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &CallbackRef {
        &self.inner
    }
}

impl Callback for Trampoline {
    fn id(&self) -> Uuid {
        self.inner.id()
    }

    fn policy(&self) -> &'static CallbackPolicy {
        self.inner.policy()
    }

    fn source(&self) -> Option<Value> {
        self.inner.source()
    }

    fn constraint(&self) -> Constraint {
        self.inner.constraint()
    }

    fn strict(&self) -> bool {
        self.inner.strict()
    }

    fn instant(&self) -> bool {
        self.inner.instant()
    }

    fn can_batch(&self) -> bool {
        self.inner.can_batch()
    }

    fn can_filter(&self) -> bool {
        self.inner.can_filter()
    }

    fn can_infer(&self) -> bool {
        self.inner.can_infer()
    }

    fn invariant(&self) -> bool {
        self.inner.invariant()
    }

    fn metadata(&self) -> Option<&BindingMetadata> {
        self.inner.metadata()
    }

    fn result_count(&self) -> usize {
        self.inner.result_count()
    }

    fn get_result(&self, many: bool) -> CallbackResult {
        self.inner.get_result(many)
    }

    fn set_result(&self, result: CallbackResult) {
        self.inner.set_result(result);
    }

    fn receive_result(&self, reply: Reply, strict: bool, composer: &HandlerRef) -> Result<bool> {
        self.inner.receive_result(reply, strict, composer)
    }

    fn guard_dispatch(&self, handler: &HandlerRef, binding: &Binding) -> Option<DispatchGuard> {
        self.inner.guard_dispatch(handler, binding)
    }

    fn dispatch(&self, handler: &HandlerRef, greedy: bool, composer: &HandlerRef) -> Result<bool> {
        self.inner.dispatch(handler, greedy, composer)
    }

    fn clone_ref(&self) -> CallbackRef {
        Arc::new(self.clone())
    }

    fn as_inquiry(&self) -> Option<&Inquiry> {
        self.inner.as_inquiry()
    }

    fn describe(&self) -> String {
        format!("Trampoline({})", self.inner.describe())
    }
}
