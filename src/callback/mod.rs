//! # Callbacks
//!
//! Units of work flowing through dispatch.
//!
//! ## Overview
//!
//! | Kind         | Policy     | Source / key         | Notes                                 |
//! |--------------|------------|----------------------|---------------------------------------|
//! | `Command`    | `handles`  | a request value      | strict by default                     |
//! | `Inquiry`    | `provides` | a key                | parent chain, reentrancy guard        |
//! | `Lookup`     | `looksup`  | a key (exact)        | not used for dependency injection     |
//! | `Creation`   | `creates`  | a type               |                                       |
//! | `Resolving`  | `provides` | a key + a callback   | dispatches the callback to the result |
//! | `Trampoline` | inner's    | wraps a callback     | pure delegation                       |
//!
//! Every callback is a cheap-to-clone handle over shared state, so the
//! dispatcher can hand out `Arc<dyn Callback>` views while the caller keeps
//! its own typed handle for reading the result.

pub mod command;
pub mod creation;
pub mod guard;
pub mod inquiry;
pub mod lookup;
pub mod reply;
pub mod resolving;
pub mod results;
pub mod trampoline;

pub use command::Command;
pub use creation::Creation;
pub use guard::DispatchGuard;
pub use inquiry::{Inquiry, InquiryBuilder};
pub use lookup::Lookup;
pub use reply::Reply;
pub use resolving::Resolving;
pub use results::{Acceptance, CallbackResult, PendingResult, ResultAcceptor, ResultSet, Settled};
pub use trampoline::Trampoline;

use crate::binding::{Binding, BindingMetadata, Constraint};
use crate::error::Result;
use crate::handler::HandlerRef;
use crate::policy::CallbackPolicy;
use crate::types::{AsAny, TypeKey, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

pub type CallbackRef = Arc<dyn Callback>;

pub trait Callback: AsAny {
    /// Correlation id used in log records
    fn id(&self) -> Uuid;

    fn policy(&self) -> &'static CallbackPolicy;

    /// Subject of the callback, if it wraps one
    fn source(&self) -> Option<Value> {
        None
    }

    /// Constraint bindings are matched against
    fn constraint(&self) -> Constraint {
        match self.source() {
            Some(source) => Constraint::Type(source.type_key()),
            None => Constraint::Type(AsAny::type_key(self)),
        }
    }

    /// Keep list results as single opaque results
    fn strict(&self) -> bool {
        false
    }

    /// Refuse pending results
    fn instant(&self) -> bool {
        false
    }

    fn can_batch(&self) -> bool {
        true
    }

    fn can_filter(&self) -> bool {
        true
    }

    fn can_infer(&self) -> bool {
        true
    }

    /// Match exactly, regardless of the policy's variance
    fn invariant(&self) -> bool {
        false
    }

    /// Metadata a binding must satisfy to qualify
    fn metadata(&self) -> Option<&BindingMetadata> {
        None
    }

    /// Stored plus reserved results
    fn result_count(&self) -> usize;

    fn get_result(&self, many: bool) -> CallbackResult;

    fn set_result(&self, result: CallbackResult);

    fn receive_result(&self, reply: Reply, strict: bool, composer: &HandlerRef) -> Result<bool>;

    /// Ask permission to invoke `binding` on `handler`. `None` refuses.
    fn guard_dispatch(&self, _handler: &HandlerRef, _binding: &Binding) -> Option<DispatchGuard> {
        Some(DispatchGuard::permit())
    }

    /// Dispatch this callback to one handler
    fn dispatch(&self, handler: &HandlerRef, greedy: bool, composer: &HandlerRef) -> Result<bool>;

    /// A shared view over the same callback state
    fn clone_ref(&self) -> CallbackRef;

    fn as_inquiry(&self) -> Option<&Inquiry> {
        None
    }

    fn describe(&self) -> String;
}

impl dyn Callback {
    pub fn callback_type(&self) -> TypeKey {
        AsAny::type_key(self)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for dyn Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Address-based identity of a handler, used for reentrancy markers
pub(crate) fn handler_address(handler: &HandlerRef) -> usize {
    Arc::as_ptr(handler) as *const () as usize
}
