//! # Dispatch
//!
//! The matching and invocation engine: descriptor-chain traversal, argument
//! resolution, and the invocation context handed to binding bodies.

pub mod arguments;
pub mod context;
pub mod dispatcher;
pub mod resolver;

pub use arguments::{Argument, Arguments};
pub use context::InvocationContext;
pub use dispatcher::dispatch_chain;
pub(crate) use dispatcher::invoke_direct;
pub use resolver::{
    default_resolver, resolve_arguments, resolve_signature, DefaultKeyResolver, KeyResolver,
    Resolution, ResolvedArguments,
};
