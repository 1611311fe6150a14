//! # Type Model
//!
//! Runtime type identity for dispatch.
//!
//! ## Overview
//!
//! Rust has no subtyping between concrete types, so variance-aware matching
//! works over an explicit, declared ancestry instead of reflection:
//!
//! ```text
//! TypeKey        (TypeId + readable name)
//! TypeHierarchy  (declared parent lists, walked breadth-first)
//! Value          (type-erased shared payload tagged with its TypeKey)
//! Literal        (hashable literal keys: strings, integers, flags, enum values)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use mediator_core::types::{declare, TypeHierarchy, TypeKey};
//!
//! struct Request;
//! struct GetStockQuote;
//!
//! declare::<GetStockQuote>().extends::<Request>();
//! assert!(TypeHierarchy::global()
//!     .is_assignable(&TypeKey::of::<GetStockQuote>(), &TypeKey::of::<Request>()));
//! ```

pub mod hierarchy;
pub mod literal;
pub mod type_key;
pub mod value;

pub use hierarchy::{declare, TypeDeclaration, TypeHierarchy};
pub use literal::Literal;
pub use type_key::{AsAny, TypeKey};
pub use value::Value;
