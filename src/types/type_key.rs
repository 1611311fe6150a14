use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of a Rust type as seen by the dispatcher
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last path segment of the type name, generics included
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        match base.rfind("::") {
            Some(position) => &self.name[position + 2..],
            None => self.name,
        }
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.short_name())
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Object-safe access to the concrete type behind a trait object.
///
/// Implemented for every sized `Any + Send + Sync` type, so handler and
/// callback implementors never write it by hand.
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    fn type_key(&self) -> TypeKey;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn type_key(&self) -> TypeKey {
        TypeKey::of::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Quote;

    #[test]
    fn test_type_key_identity() {
        assert_eq!(TypeKey::of::<Quote>(), TypeKey::of::<Quote>());
        assert_ne!(TypeKey::of::<Quote>(), TypeKey::of::<String>());
    }

    #[test]
    fn test_short_name() {
        assert_eq!(TypeKey::of::<Quote>().short_name(), "Quote");
        assert_eq!(TypeKey::of::<u32>().short_name(), "u32");
    }

    #[test]
    fn test_as_any_reports_concrete_type() {
        let quote: Arc<dyn AsAny> = Arc::new(Quote);
        // go through the trait object, not the Arc
        let erased: &dyn AsAny = &*quote;
        assert_eq!(erased.type_key(), TypeKey::of::<Quote>());
        assert!(erased.as_any().is::<Quote>());
    }
}
