use super::{Callback, CallbackRef, CallbackResult, Reply, ResultSet};
use crate::binding::Constraint;
use crate::error::Result;
use crate::handler::HandlerRef;
use crate::policy::{handles, CallbackPolicy};
use crate::types::Value;
use std::any::Any;
use uuid::Uuid;

/// Dispatch of an arbitrary request value under the `handles` policy
#[derive(Clone)]
pub struct Command {
    id: Uuid,
    request: Value,
    constraint: Option<Constraint>,
    many: bool,
    strict: bool,
    exact: bool,
    can_filter: bool,
    can_infer: bool,
    can_batch: bool,
    results: ResultSet,
}

impl Command {
    pub fn new(request: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            constraint: None,
            many: false,
            strict: true,
            exact: false,
            can_filter: true,
            can_infer: true,
            can_batch: true,
            results: ResultSet::new(),
        }
    }

    pub fn of<T: Any + Send + Sync>(request: T) -> Self {
        Self::new(Value::new(request))
    }

    /// Collect every result rather than the first
    pub fn many(mut self) -> Self {
        self.many = true;
        self
    }

    /// Match handlers declared for exactly the request type
    pub fn exact(mut self) -> Self {
        self.exact = true;
        self
    }

    /// Flatten list results
    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }

    pub fn with_constraint(mut self, constraint: impl Into<Constraint>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }

    pub fn without_filters(mut self) -> Self {
        self.can_filter = false;
        self
    }

    pub fn without_inference(mut self) -> Self {
        self.can_infer = false;
        self
    }

    pub fn without_batching(mut self) -> Self {
        self.can_batch = false;
        self
    }

    pub fn request(&self) -> &Value {
        &self.request
    }

    pub fn is_many(&self) -> bool {
        self.many
    }

    /// The result in the shape this command was created for
    pub fn result(&self) -> CallbackResult {
        self.results.get(self.many)
    }
}

impl Callback for Command {
    fn id(&self) -> Uuid {
        self.id
    }

    fn policy(&self) -> &'static CallbackPolicy {
        handles()
    }

    fn source(&self) -> Option<Value> {
        Some(self.request.clone())
    }

    fn constraint(&self) -> Constraint {
        self.constraint
            .clone()
            .unwrap_or_else(|| Constraint::Type(self.request.type_key()))
    }

    fn strict(&self) -> bool {
        self.strict
    }

    fn can_batch(&self) -> bool {
        self.can_batch
    }

    fn can_filter(&self) -> bool {
        self.can_filter
    }

    fn can_infer(&self) -> bool {
        self.can_infer
    }

    fn invariant(&self) -> bool {
        self.exact
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
        self.results.receive(reply, strict || self.strict, false, composer)
    }

    fn dispatch(&self, handler: &HandlerRef, greedy: bool, composer: &HandlerRef) -> Result<bool> {
        let count = self.result_count();
        let handled = handles().dispatch(handler, &self.clone_ref(), None, composer, greedy)?;
        Ok(handled || self.result_count() > count)
    }

    fn clone_ref(&self) -> CallbackRef {
        std::sync::Arc::new(self.clone())
    }

    fn describe(&self) -> String {
        format!("Command | {}", self.request.type_key())
    }
}
