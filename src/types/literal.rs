use super::TypeKey;
use std::fmt;
use std::sync::Arc;

/// Literal constraint values, matched by equality under every variance
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    Str(Arc<str>),
    Int(i64),
    Bool(bool),
    /// An enum member identified by its type and discriminant
    Enum { ty: TypeKey, ordinal: i64 },
}

impl Literal {
    pub fn enumeration<E: 'static>(ordinal: i64) -> Self {
        Literal::Enum {
            ty: TypeKey::of::<E>(),
            ordinal,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(value) => write!(f, "\"{value}\""),
            Literal::Int(value) => write!(f, "{value}"),
            Literal::Bool(value) => write!(f, "{value}"),
            Literal::Enum { ty, ordinal } => write!(f, "{ty}#{ordinal}"),
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Str(Arc::from(value))
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Str(Arc::from(value))
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}
