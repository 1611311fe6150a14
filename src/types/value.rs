//! Type-erased payloads flowing through dispatch.

use super::TypeKey;
use crate::handler::{Handler, HandlerRef};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A shared, type-erased value tagged with its [`TypeKey`].
///
/// Values produced by providers may also be handlers. Those carry a handler
/// view so the dispatcher can route further callbacks to them.
#[derive(Clone)]
pub struct Value {
    inner: Arc<dyn Any + Send + Sync>,
    type_key: TypeKey,
    handler: Option<HandlerRef>,
}

impl Value {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            inner: value,
            type_key: TypeKey::of::<T>(),
            handler: None,
        }
    }

    /// Wrap a handler so it can be both returned as a value and dispatched to
    pub fn handler<H: Handler>(handler: H) -> Self {
        let shared = Arc::new(handler);
        let handler_ref: HandlerRef = shared.clone();
        Self {
            inner: shared,
            type_key: TypeKey::of::<H>(),
            handler: Some(handler_ref),
        }
    }

    pub fn from_handler(handler: HandlerRef) -> Self {
        let type_key = handler.handler_type();
        let inner = Arc::clone(&handler).into_any();
        Self {
            inner,
            type_key,
            handler: Some(handler),
        }
    }

    /// An opaque list result, as produced by strict callbacks
    pub fn list(values: Vec<Value>) -> Self {
        Self::new(values)
    }

    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    pub fn is<T: Any>(&self) -> bool {
        (*self.inner).is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.inner).downcast_ref::<T>()
    }

    pub fn downcast_arc<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast::<T>().ok()
    }

    pub fn as_list(&self) -> Option<&Vec<Value>> {
        self.downcast_ref::<Vec<Value>>()
    }

    pub fn as_handler(&self) -> Option<&HandlerRef> {
        self.handler.as_ref()
    }

    /// Identity comparison on the shared payload
    pub fn ptr_eq(&self, other: &Value) -> bool {
        Arc::as_ptr(&self.inner) as *const u8 == Arc::as_ptr(&other.inner) as *const u8
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(list) = self.as_list() {
            return f.debug_list().entries(list.iter()).finish();
        }
        write!(f, "Value({})", self.type_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct StockQuote {
        symbol: String,
    }

    #[test]
    fn test_downcast() {
        let value = Value::new(StockQuote {
            symbol: "ABC".to_string(),
        });
        assert_eq!(value.type_key(), TypeKey::of::<StockQuote>());
        assert_eq!(value.downcast_ref::<StockQuote>().map(|q| q.symbol.as_str()), Some("ABC"));
        assert!(value.downcast_ref::<String>().is_none());
        assert!(value.downcast_arc::<StockQuote>().is_some());
        assert!(value.as_handler().is_none());
    }

    #[test]
    fn test_identity() {
        let value = Value::new(7_i32);
        let same = value.clone();
        let other = Value::new(7_i32);
        assert!(value.ptr_eq(&same));
        assert!(!value.ptr_eq(&other));
    }

    #[test]
    fn test_list_values() {
        let list = Value::list(vec![Value::new(1_i32), Value::new(2_i32)]);
        assert_eq!(list.as_list().map(Vec::len), Some(2));
        assert_eq!(format!("{list:?}"), "[Value(i32), Value(i32)]");
    }
}
