use crate::callback::CallbackRef;
use crate::error::{DispatchError, Result};
use crate::types::Value;
use std::any::Any;

/// One resolved argument of a handler method or filter stage
#[derive(Clone, Debug)]
pub enum Argument {
    Value(Value),
    /// A `many` parameter; possibly empty
    Many(Vec<Value>),
    /// The callback being dispatched, bound by position 0
    Callback(CallbackRef),
    /// An optional parameter that resolved to nothing
    Absent,
}

impl Argument {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Argument::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Argument::Absent)
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Argument::Value(value)
    }
}

/// Ordered argument list handed to a binding body
#[derive(Clone, Debug, Default)]
pub struct Arguments {
    arguments: Vec<Argument>,
}

impl Arguments {
    pub fn new(arguments: Vec<Argument>) -> Self {
        Self { arguments }
    }

    pub fn get_arg(&self, index: usize) -> Option<&Argument> {
        self.arguments.get(index)
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.get_arg(index).and_then(Argument::value)
    }

    /// Typed view of argument `index`, `None` when absent or of another type
    pub fn get<T: Any>(&self, index: usize) -> Option<&T> {
        self.value(index).and_then(|value| value.downcast_ref::<T>())
    }

    /// Typed view of argument `index`; a mismatch is a configuration error
    pub fn require<T: Any>(&self, index: usize) -> Result<&T> {
        self.get::<T>(index).ok_or_else(|| {
            DispatchError::configuration(format!(
                "argument {index} is not a {}",
                std::any::type_name::<T>()
            ))
        })
    }

    /// Values of a `many` argument; a single value is treated as a list of one
    pub fn many(&self, index: usize) -> Vec<Value> {
        match self.get_arg(index) {
            Some(Argument::Many(values)) => values.clone(),
            Some(Argument::Value(value)) => vec![value.clone()],
            _ => Vec::new(),
        }
    }

    pub fn callback(&self, index: usize) -> Option<&CallbackRef> {
        match self.get_arg(index) {
            Some(Argument::Callback(callback)) => Some(callback),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Argument> {
        self.arguments.iter()
    }
}

impl FromIterator<Argument> for Arguments {
    fn from_iter<I: IntoIterator<Item = Argument>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
