use super::FilterProvider;
use parking_lot::RwLock;
use std::sync::Arc;

/// Mutable set of filter providers attached to a descriptor or a policy
#[derive(Default)]
pub struct FilteredScope {
    providers: RwLock<Vec<Arc<dyn FilterProvider>>>,
}

impl FilteredScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider; adding the same provider twice is a no-op
    pub fn add_filters(&self, provider: Arc<dyn FilterProvider>) {
        let mut providers = self.providers.write();
        if !providers.iter().any(|present| same_provider(present, &provider)) {
            providers.push(provider);
        }
    }

    /// Returns whether the provider was present
    pub fn remove_filters(&self, provider: &Arc<dyn FilterProvider>) -> bool {
        let mut providers = self.providers.write();
        let before = providers.len();
        providers.retain(|present| !same_provider(present, provider));
        providers.len() != before
    }

    pub fn providers(&self) -> Vec<Arc<dyn FilterProvider>> {
        self.providers.read().clone()
    }

    pub fn clear(&self) {
        self.providers.write().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }
}

fn same_provider(a: &Arc<dyn FilterProvider>, b: &Arc<dyn FilterProvider>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

impl std::fmt::Debug for FilteredScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilteredScope")
            .field("providers", &self.providers.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterInstanceProvider;

    #[test]
    fn test_add_and_remove_by_identity() {
        let scope = FilteredScope::new();
        let provider: Arc<dyn FilterProvider> = Arc::new(FilterInstanceProvider::new(Vec::new()));
        let other: Arc<dyn FilterProvider> = Arc::new(FilterInstanceProvider::new(Vec::new()));

        scope.add_filters(provider.clone());
        scope.add_filters(provider.clone());
        scope.add_filters(other.clone());
        assert_eq!(scope.providers().len(), 2);

        assert!(scope.remove_filters(&provider));
        assert!(!scope.remove_filters(&provider));
        assert_eq!(scope.providers().len(), 1);

        scope.clear();
        assert!(scope.is_empty());
    }
}
