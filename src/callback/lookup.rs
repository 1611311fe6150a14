use super::{Callback, CallbackRef, CallbackResult, Reply, ResultSet};
use crate::binding::Constraint;
use crate::error::{DispatchError, Result};
use crate::handler::HandlerRef;
use crate::policy::{looksup, CallbackPolicy};
use std::sync::Arc;
use uuid::Uuid;

/// Exact-key retrieval under the `looksup` policy.
///
/// Unlike an [`Inquiry`](super::Inquiry), a lookup never matches by type
/// compatibility and does not take part in dependency resolution.
#[derive(Clone)]
pub struct Lookup {
    id: Uuid,
    key: Constraint,
    many: bool,
    results: ResultSet,
}

impl Lookup {
    pub fn new(key: impl Into<Constraint>) -> Result<Self> {
        let key = key.into();
        if key.is_unconstrained() {
            return Err(DispatchError::configuration("a lookup requires a key"));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            key,
            many: false,
            results: ResultSet::new().swallow_pending_errors(),
        })
    }

    pub fn many(mut self) -> Self {
        self.many = true;
        self
    }

    pub fn key(&self) -> &Constraint {
        &self.key
    }

    pub fn result(&self) -> CallbackResult {
        self.results.get(self.many)
    }
}

impl Callback for Lookup {
    fn id(&self) -> Uuid {
        self.id
    }

    fn policy(&self) -> &'static CallbackPolicy {
        looksup()
    }

    fn constraint(&self) -> Constraint {
        self.key.clone()
    }

    fn invariant(&self) -> bool {
        true
    }

    fn can_infer(&self) -> bool {
        false
    }

    fn result_count(&self) -> usize {
        self.results.count()
    }

    fn get_result(&self, many: bool) -> CallbackResult {
        self.results.get(many)
    }

    fn set_result(&self, result: CallbackResult) {
        self.results.set(result);
    }

    fn receive_result(&self, reply: Reply, strict: bool, composer: &HandlerRef) -> Result<bool> {
        self.results.receive(reply, strict, false, composer)
    }

    fn dispatch(&self, handler: &HandlerRef, greedy: bool, composer: &HandlerRef) -> Result<bool> {
        let count = self.result_count();
        let handled =
            looksup().dispatch(handler, &self.clone_ref(), Some(&self.key), composer, greedy)?;
        Ok(handled || self.result_count() > count)
    }

    fn clone_ref(&self) -> CallbackRef {
        Arc::new(self.clone())
    }

    fn describe(&self) -> String {
        format!("Lookup | {}", self.key)
    }
}
