#![allow(clippy::doc_markdown)] // Allow technical terms in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Mediator Core
//!
//! Policy-driven callback dispatch: handlers declare bindings, callbacks are
//! routed to the bindings that match them.
//!
//! ## Overview
//!
//! A handler type declares **bindings** under a **policy**. A binding pairs a
//! constraint (a type, a literal key, a predicate, or nothing) with the body
//! that services it. Callbacks are dispatched through a chain of handlers;
//! the policy decides how constraints match (covariant, contravariant,
//! invariant), how bindings rank, and which replies count as handled.
//!
//! | Policy     | Callback   | Variance      |
//! |------------|------------|---------------|
//! | `handles`  | `Command`  | covariant     |
//! | `provides` | `Inquiry`  | contravariant |
//! | `creates`  | `Creation` | contravariant |
//! | `looksup`  | `Lookup`   | invariant     |
//!
//! Binding parameters beyond the request are resolved as nested inquiries
//! through the composing handler, guarded against circular resolution.
//! Filters wrap invocations as an explicit continuation.
//!
//! ## Module Organization
//!
//! - [`types`] - Type identity, declared ancestry, type-erased values
//! - [`binding`] - Bindings, ranked indexes, per-owner descriptors
//! - [`policy`] - The four dispatch policies
//! - [`callback`] - Callback kinds and result accumulation
//! - [`dispatch`] - Chain traversal and argument resolution
//! - [`filter`] - Filter providers and the invocation pipeline
//! - [`handler`] - Handler trait, composition, inference, entry points
//! - [`config`] - Runtime configuration
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup and helpers
//!
//! ## Quick Start
//!
//! ```rust
//! use mediator_core::binding::{Binding, HandlerDescriptor};
//! use mediator_core::callback::Reply;
//! use mediator_core::handler::{CompositeHandler, Handler, HandlerExt, HandlerRef};
//! use mediator_core::policy::handles;
//! use mediator_core::types::TypeKey;
//! use std::sync::Arc;
//!
//! struct Ping;
//! struct Pong;
//! struct PingHandler;
//! impl Handler for PingHandler {}
//!
//! HandlerDescriptor::for_type::<PingHandler>()
//!     .add_binding(
//!         handles(),
//!         Binding::builder(TypeKey::of::<Ping>())
//!             .function(|_, _| Ok(Reply::value(Pong)))
//!             .build()?,
//!     )?;
//!
//! let composite = CompositeHandler::new();
//! composite.add(PingHandler);
//! let root: HandlerRef = Arc::new(composite);
//!
//! let result = root.send(Ping)?;
//! assert!(result.ready().and_then(|r| r.value()).is_some_and(|v| v.is::<Pong>()));
//! # Ok::<(), mediator_core::DispatchError>(())
//! ```

pub mod binding;
pub mod callback;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod handler;
pub mod logging;
pub mod policy;
pub mod types;

pub use binding::{Binding, BindingMetadata, Constraint, HandlerDescriptor, Owner, Parameter, Variance};
pub use callback::{Callback, CallbackRef, CallbackResult, Command, Creation, Inquiry, Lookup, Reply, Settled};
pub use config::DispatchConfig;
pub use error::{DispatchError, Result};
pub use handler::{CompositeHandler, Handler, HandlerExt, HandlerRef, InferenceHandler};
pub use logging::init_structured_logging;
pub use types::{declare, TypeKey, Value};
