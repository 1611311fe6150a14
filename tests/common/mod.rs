#![allow(dead_code)]

pub mod handlers;
pub mod strategies;

pub use handlers::*;

use mediator_core::callback::{CallbackResult, Settled};
use mediator_core::handler::{CompositeHandler, HandlerRef};
use mediator_core::types::Value;
use std::sync::Arc;

/// A composite over `handlers`, used as the composer of a test
pub fn compose(handlers: Vec<HandlerRef>) -> HandlerRef {
    Arc::new(CompositeHandler::with_handlers(handlers))
}

/// Settle a result and collect its values
pub async fn values(result: CallbackResult) -> Vec<Value> {
    result.settle().await.expect("result should settle").into_values()
}

/// Values of a result that must already be available
pub fn ready_values(result: &CallbackResult) -> Vec<Value> {
    result
        .ready()
        .cloned()
        .map(Settled::into_values)
        .expect("result should be ready")
}

/// Downcast every value to `T`, cloning it
pub fn downcast_all<T: Clone + 'static>(values: &[Value]) -> Vec<T> {
    values
        .iter()
        .filter_map(|value| value.downcast_ref::<T>().cloned())
        .collect()
}
