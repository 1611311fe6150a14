//! Constraint matching.

use crate::types::{Literal, TypeHierarchy, TypeKey};
use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// How a binding constraint must relate to a candidate to match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variance {
    /// The binding constraint is a supertype of (or equal to) the candidate
    Covariant,
    /// The binding constraint is a subtype of (or equal to) the candidate
    Contravariant,
    /// The candidate equals the binding constraint
    Invariant,
}

pub type ConstraintPredicate = Arc<dyn Fn(&Constraint) -> bool + Send + Sync>;

/// What a binding declares it can service, or what a callback asks for
#[derive(Clone, Default)]
pub enum Constraint {
    #[default]
    Unconstrained,
    Type(TypeKey),
    Literal(Literal),
    Predicate(ConstraintPredicate),
}

/// O(1) lookup key derived from a constraint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    Type(TypeId),
    Literal(Literal),
}

impl Constraint {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Constraint::Type(TypeKey::of::<T>())
    }

    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&Constraint) -> bool + Send + Sync + 'static,
    {
        Constraint::Predicate(Arc::new(predicate))
    }

    pub fn is_unconstrained(&self) -> bool {
        matches!(self, Constraint::Unconstrained)
    }

    pub fn type_key(&self) -> Option<TypeKey> {
        match self {
            Constraint::Type(key) => Some(*key),
            _ => None,
        }
    }

    /// Test `candidate` against this (binding) constraint.
    ///
    /// An unconstrained binding matches every candidate. Predicates decide
    /// for themselves. Literals match by equality regardless of variance.
    pub fn matches(&self, candidate: &Constraint, variance: Variance) -> bool {
        match self {
            Constraint::Unconstrained => true,
            Constraint::Predicate(predicate) => predicate(candidate),
            Constraint::Literal(literal) => {
                matches!(candidate, Constraint::Literal(other) if other == literal)
            }
            Constraint::Type(declared) => {
                let Constraint::Type(requested) = candidate else {
                    return false;
                };
                let hierarchy = TypeHierarchy::global();
                match variance {
                    Variance::Invariant => requested == declared,
                    Variance::Covariant => hierarchy.is_assignable(requested, declared),
                    Variance::Contravariant => hierarchy.is_assignable(declared, requested),
                }
            }
        }
    }

    /// Index key, absent for unconstrained and predicate constraints
    pub fn index_key(&self) -> Option<IndexKey> {
        match self {
            Constraint::Type(key) => Some(IndexKey::Type(key.id())),
            Constraint::Literal(literal) => Some(IndexKey::Literal(literal.clone())),
            Constraint::Unconstrained | Constraint::Predicate(_) => None,
        }
    }

    /// Structural equality; predicates are equal only to themselves
    pub fn same_as(&self, other: &Constraint) -> bool {
        match (self, other) {
            (Constraint::Unconstrained, Constraint::Unconstrained) => true,
            (Constraint::Type(a), Constraint::Type(b)) => a == b,
            (Constraint::Literal(a), Constraint::Literal(b)) => a == b,
            (Constraint::Predicate(a), Constraint::Predicate(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Unconstrained => f.write_str("Unconstrained"),
            Constraint::Type(key) => write!(f, "Type({key})"),
            Constraint::Literal(literal) => write!(f, "Literal({literal})"),
            Constraint::Predicate(_) => f.write_str("Predicate"),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Unconstrained => f.write_str("*"),
            Constraint::Type(key) => write!(f, "{key}"),
            Constraint::Literal(literal) => write!(f, "{literal}"),
            Constraint::Predicate(_) => f.write_str("<predicate>"),
        }
    }
}

impl From<TypeKey> for Constraint {
    fn from(key: TypeKey) -> Self {
        Constraint::Type(key)
    }
}

impl From<Literal> for Constraint {
    fn from(literal: Literal) -> Self {
        Constraint::Literal(literal)
    }
}

impl From<&str> for Constraint {
    fn from(value: &str) -> Self {
        Constraint::Literal(value.into())
    }
}

impl From<String> for Constraint {
    fn from(value: String) -> Self {
        Constraint::Literal(value.into())
    }
}

impl From<i64> for Constraint {
    fn from(value: i64) -> Self {
        Constraint::Literal(value.into())
    }
}

impl From<bool> for Constraint {
    fn from(value: bool) -> Self {
        Constraint::Literal(value.into())
    }
}
