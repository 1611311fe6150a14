use super::{Handler, HandlerRef};
use crate::callback::{handler_address, Callback, CallbackRef};
use crate::error::Result;
use parking_lot::RwLock;
use std::sync::Arc;

/// Ordered chain of handlers acting as one.
///
/// Its own bindings are tried first, then each child in order. Dispatch
/// stops at the first child that handles the callback unless greedy.
#[derive(Default)]
pub struct CompositeHandler {
    handlers: RwLock<Vec<HandlerRef>>,
}

impl CompositeHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handlers(handlers: Vec<HandlerRef>) -> Self {
        Self {
            handlers: RwLock::new(handlers),
        }
    }

    pub fn add_handler(&self, handler: HandlerRef) -> &Self {
        self.handlers.write().push(handler);
        self
    }

    /// Add a handler value, returning the shared reference it is held by
    pub fn add<H: Handler>(&self, handler: H) -> HandlerRef {
        let handler: HandlerRef = Arc::new(handler);
        self.add_handler(handler.clone());
        handler
    }

    pub fn remove_handler(&self, handler: &HandlerRef) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        let target = handler_address(handler);
        handlers.retain(|present| handler_address(present) != target);
        handlers.len() != before
    }

    /// Snapshot of the children
    pub fn handlers(&self) -> Vec<HandlerRef> {
        self.handlers.read().clone()
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}

impl Handler for CompositeHandler {
    fn handle_callback(
        &self,
        this: &HandlerRef,
        callback: &CallbackRef,
        greedy: bool,
        composer: &HandlerRef,
    ) -> Result<bool> {
        let mut handled = callback.dispatch(this, greedy, composer)?;
        if handled && !greedy {
            return Ok(true);
        }
        for handler in self.handlers() {
            if handler.handle_callback(&handler, callback, greedy, composer)? {
                handled = true;
                if !greedy {
                    break;
                }
            }
        }
        Ok(handled)
    }
}

impl std::fmt::Debug for CompositeHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeHandler")
            .field("handlers", &self.handlers())
            .finish()
    }
}
