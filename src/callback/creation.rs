use super::{Callback, CallbackRef, CallbackResult, Reply, ResultSet};
use crate::binding::Constraint;
use crate::error::Result;
use crate::handler::HandlerRef;
use crate::policy::{creates, CallbackPolicy};
use crate::types::TypeKey;
use std::sync::Arc;
use uuid::Uuid;

/// Request for a new instance of a type under the `creates` policy
#[derive(Clone)]
pub struct Creation {
    id: Uuid,
    ty: TypeKey,
    many: bool,
    results: ResultSet,
}

impl Creation {
    pub fn new(ty: TypeKey) -> Self {
        Self {
            id: Uuid::new_v4(),
            ty,
            many: false,
            results: ResultSet::new(),
        }
    }

    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeKey::of::<T>())
    }

    pub fn many(mut self) -> Self {
        self.many = true;
        self
    }

    pub fn created_type(&self) -> TypeKey {
        self.ty
    }

    pub fn result(&self) -> CallbackResult {
        self.results.get(self.many)
    }
}

impl Callback for Creation {
    fn id(&self) -> Uuid {
        self.id
    }

    fn policy(&self) -> &'static CallbackPolicy {
        creates()
    }

    fn constraint(&self) -> Constraint {
        Constraint::Type(self.ty)
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
        let constraint = self.constraint();
        let handled =
            creates().dispatch(handler, &self.clone_ref(), Some(&constraint), composer, greedy)?;
        Ok(handled || self.result_count() > count)
    }

    fn clone_ref(&self) -> CallbackRef {
        Arc::new(self.clone())
    }

    fn describe(&self) -> String {
        format!("Creation | {}", self.ty)
    }
}
