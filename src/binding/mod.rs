//! # Bindings
//!
//! The binding registry: what each handler declares it can service, and the
//! indexed, ranked storage dispatch searches.
//!
//! ## Architecture
//!
//! ```text
//! HandlerDescriptor (one per owner)
//!   └── policy name → BindingIndex (ranked, indexed)
//!                        └── Arc<Binding> (constraint + handler fn + signature)
//! ```
//!
//! Constraints are a tagged union matched per variance; see
//! [`Constraint::matches`].

#[allow(clippy::module_inception)]
pub mod binding;
pub mod constraint;
pub mod descriptor;
pub mod index;
pub mod metadata;
pub mod signature;

pub use binding::{Binding, BindingBuilder, BindingId, HandlerFn, RemovedHook};
pub use constraint::{Constraint, ConstraintPredicate, IndexKey, Variance};
pub use descriptor::{BindingRegistration, DescriptorChain, HandlerDescriptor, Owner};
pub use index::BindingIndex;
pub use metadata::BindingMetadata;
pub use signature::{Parameter, ParameterValidator, Signature};
