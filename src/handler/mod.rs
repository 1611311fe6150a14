//! # Handlers
//!
//! Objects callbacks are dispatched to.
//!
//! A handler's bindings come from the descriptors of its type and that
//! type's declared ancestors. Handlers compose: a [`CompositeHandler`] tries
//! its own bindings and then each child, and an [`InferenceHandler`]
//! stands in for handler types that have no live instance.

pub mod api;
pub mod composite;
pub mod inference;

pub use api::HandlerExt;
pub use composite::CompositeHandler;
pub use inference::InferenceHandler;

use crate::binding::{Constraint, HandlerDescriptor, Owner};
use crate::callback::{Callback, CallbackRef};
use crate::dispatch::dispatch_chain;
use crate::error::Result;
use crate::filter::Filter;
use crate::policy::CallbackPolicy;
use crate::types::{AsAny, TypeKey};
use std::any::Any;
use std::sync::Arc;

pub type HandlerRef = Arc<dyn Handler>;

pub trait Handler: AsAny {
    /// Entry point for a callback arriving at this handler. `this` is the
    /// shared reference `self` was reached through.
    fn handle_callback(
        &self,
        this: &HandlerRef,
        callback: &CallbackRef,
        greedy: bool,
        composer: &HandlerRef,
    ) -> Result<bool> {
        callback.dispatch(this, greedy, composer)
    }

    /// Match `callback` against this handler's bindings for `policy`
    fn dispatch_policy(
        &self,
        policy: &'static CallbackPolicy,
        this: &HandlerRef,
        callback: &CallbackRef,
        constraint: Option<&Constraint>,
        composer: &HandlerRef,
        greedy: bool,
    ) -> Result<bool> {
        let chain = HandlerDescriptor::chain(Owner::Instance(AsAny::type_key(self)));
        dispatch_chain(policy, chain, this, callback, constraint, composer, greedy)
    }

    /// View of this handler as a declared ancestor type, for bindings
    /// inherited from that ancestor
    fn ancestor(&self, _ty: &TypeKey) -> Option<&dyn Any> {
        None
    }

    /// This handler as a filter stage around its own bindings
    fn as_filter(self: Arc<Self>) -> Option<Arc<dyn Filter>> {
        None
    }
}

impl dyn Handler {
    pub fn handler_type(&self) -> TypeKey {
        AsAny::type_key(self)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

impl std::fmt::Debug for dyn Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handler({})", self.handler_type())
    }
}
