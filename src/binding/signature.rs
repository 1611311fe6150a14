//! Method signatures: the ordered parameter descriptors the argument
//! resolver works from.

use super::{BindingMetadata, Constraint};
use crate::dispatch::{Argument, KeyResolver};
use crate::types::TypeHierarchy;
use std::fmt;
use std::sync::Arc;

pub type ParameterValidator = Arc<dyn Fn(&Argument) -> bool + Send + Sync>;

/// One declared parameter of a handler method or filter stage
#[derive(Clone, Default)]
pub struct Parameter {
    key: Constraint,
    resolver: Option<Arc<dyn KeyResolver>>,
    validator: Option<ParameterValidator>,
    metadata: BindingMetadata,
    optional: bool,
    many: bool,
    instant: bool,
}

impl Parameter {
    pub fn new(key: impl Into<Constraint>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(Constraint::of::<T>())
    }

    /// A parameter without a key; only meaningful in first position, where
    /// it receives the callback source
    pub fn unconstrained() -> Self {
        Self::default()
    }

    /// Resolve to absence instead of skipping the binding
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Resolve every matching value
    pub fn many(mut self) -> Self {
        self.many = true;
        self
    }

    /// Only accept synchronously available values
    pub fn instant(mut self) -> Self {
        self.instant = true;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn KeyResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Argument) -> bool + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn with_metadata(mut self, metadata: BindingMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn key(&self) -> &Constraint {
        &self.key
    }

    pub fn resolver(&self) -> Option<&Arc<dyn KeyResolver>> {
        self.resolver.as_ref()
    }

    pub fn metadata(&self) -> &BindingMetadata {
        &self.metadata
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_many(&self) -> bool {
        self.many
    }

    pub fn is_instant(&self) -> bool {
        self.instant
    }

    /// Whether `argument` can be bound to this parameter without resolution
    pub fn accepts(&self, argument: &Argument) -> bool {
        if let Some(validator) = &self.validator {
            return validator(argument);
        }
        let hierarchy = TypeHierarchy::global();
        match (&self.key, argument) {
            (Constraint::Unconstrained, _) => true,
            (Constraint::Type(key), Argument::Value(value)) => {
                hierarchy.is_assignable(&value.type_key(), key)
            }
            (Constraint::Type(key), Argument::Callback(callback)) => {
                hierarchy.is_assignable(&callback.callback_type(), key)
            }
            (Constraint::Predicate(predicate), Argument::Value(value)) => {
                predicate(&Constraint::Type(value.type_key()))
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("key", &self.key)
            .field("custom_resolver", &self.resolver.is_some())
            .field("optional", &self.optional)
            .field("many", &self.many)
            .field("instant", &self.instant)
            .finish()
    }
}

/// Ordered parameter list of a handler method
#[derive(Debug, Clone, Default)]
pub struct Signature {
    parameters: Vec<Parameter>,
}

impl Signature {
    pub fn new(parameters: Vec<Parameter>) -> Self {
        Self { parameters }
    }

    pub fn push(&mut self, parameter: Parameter) {
        self.parameters.push(parameter);
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

impl FromIterator<Parameter> for Signature {
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{declare, Value};

    struct Order;
    struct PriorityOrder;

    #[test]
    fn test_accepts_assignable_values() {
        declare::<PriorityOrder>().extends::<Order>();
        let parameter = Parameter::of::<Order>();
        assert!(parameter.accepts(&Argument::Value(Value::new(PriorityOrder))));
        assert!(parameter.accepts(&Argument::Value(Value::new(Order))));
        assert!(!parameter.accepts(&Argument::Value(Value::new(1_u8))));
        assert!(!parameter.accepts(&Argument::Absent));
    }

    #[test]
    fn test_validator_overrides_key() {
        let parameter = Parameter::of::<Order>().with_validator(|arg| matches!(arg, Argument::Absent));
        assert!(parameter.accepts(&Argument::Absent));
        assert!(!parameter.accepts(&Argument::Value(Value::new(Order))));
    }

    #[test]
    fn test_modifiers() {
        let parameter = Parameter::of::<Order>().optional().many().instant();
        assert!(parameter.is_optional() && parameter.is_many() && parameter.is_instant());
        let signature: Signature = vec![Parameter::unconstrained(), parameter].into_iter().collect();
        assert_eq!(signature.len(), 2);
        assert!(signature.parameters()[0].key().is_unconstrained());
    }
}
