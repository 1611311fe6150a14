use crate::binding::{Binding, Constraint};
use crate::callback::CallbackRef;
use crate::handler::HandlerRef;
use crate::types::Value;
use std::sync::Arc;

/// What a binding body (or filter stage) can see about the dispatch that
/// reached it
#[derive(Clone)]
pub struct InvocationContext {
    constraint: Constraint,
    binding: Arc<Binding>,
    callback: CallbackRef,
    handler: HandlerRef,
    composer: HandlerRef,
    greedy: bool,
}

impl InvocationContext {
    pub fn new(
        constraint: Constraint,
        binding: Arc<Binding>,
        callback: CallbackRef,
        handler: HandlerRef,
        composer: HandlerRef,
        greedy: bool,
    ) -> Self {
        Self {
            constraint,
            binding,
            callback,
            handler,
            composer,
            greedy,
        }
    }

    /// The constraint the binding was matched against
    pub fn constraint(&self) -> &Constraint {
        &self.constraint
    }

    pub fn binding(&self) -> &Arc<Binding> {
        &self.binding
    }

    pub fn callback(&self) -> &CallbackRef {
        &self.callback
    }

    /// The handler the binding was found on
    pub fn handler(&self) -> &HandlerRef {
        &self.handler
    }

    /// Root of the handler chain, used for nested dispatch
    pub fn composer(&self) -> &HandlerRef {
        &self.composer
    }

    pub fn greedy(&self) -> bool {
        self.greedy
    }

    pub fn source(&self) -> Option<Value> {
        self.callback.source()
    }

    pub fn with_composer(&self, composer: HandlerRef) -> Self {
        Self {
            composer,
            ..self.clone()
        }
    }
}

impl std::fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationContext")
            .field("constraint", &self.constraint)
            .field("binding", &self.binding.to_string())
            .field("callback", &self.callback.describe())
            .field("greedy", &self.greedy)
            .finish()
    }
}
