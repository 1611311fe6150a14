use super::{filter_address, Filter, FilterProvider};
use crate::binding::{Binding, Constraint, HandlerDescriptor};
use crate::callback::{Callback, CallbackRef, CallbackResult, Inquiry};
use crate::error::Result;
use crate::handler::{Handler, HandlerRef};
use crate::policy::CallbackPolicy;
use crate::types::{TypeKey, Value};
use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Supplies a fixed list of filter instances
pub struct FilterInstanceProvider {
    filters: Vec<Arc<dyn Filter>>,
    required: bool,
}

impl FilterInstanceProvider {
    pub fn new(filters: Vec<Arc<dyn Filter>>) -> Self {
        Self {
            filters,
            required: false,
        }
    }

    pub fn of<F: Filter + 'static>(filter: F) -> Self {
        Self::new(vec![Arc::new(filter)])
    }

    /// Mark the provider as required
    pub fn require(mut self) -> Self {
        self.required = true;
        self
    }
}

impl FilterProvider for FilterInstanceProvider {
    fn required(&self) -> bool {
        self.required
    }

    fn filters(
        &self,
        _binding: &Binding,
        _callback: &CallbackRef,
        _composer: &HandlerRef,
    ) -> Result<Option<Vec<Arc<dyn Filter>>>> {
        Ok(Some(self.filters.clone()))
    }
}

type FilterCast = fn(&Value) -> Option<Arc<dyn Filter>>;

/// Resolves filter instances by key through the composer at dispatch time
pub struct FilterSpecProvider {
    key: Constraint,
    cast: FilterCast,
    required: bool,
}

impl FilterSpecProvider {
    /// Resolve every provided `F`
    pub fn of<F: Filter + Any + 'static>() -> Self {
        Self {
            key: Constraint::Type(TypeKey::of::<F>()),
            cast: cast_filter::<F>,
            required: false,
        }
    }

    pub fn require(mut self) -> Self {
        self.required = true;
        self
    }
}

fn cast_filter<F: Filter + Any + 'static>(value: &Value) -> Option<Arc<dyn Filter>> {
    if let Some(filter) = value.downcast_arc::<F>() {
        return Some(filter as Arc<dyn Filter>);
    }
    value
        .as_handler()
        .and_then(|handler| Arc::clone(handler).as_filter())
}

impl FilterProvider for FilterSpecProvider {
    fn required(&self) -> bool {
        self.required
    }

    fn filters(
        &self,
        _binding: &Binding,
        callback: &CallbackRef,
        composer: &HandlerRef,
    ) -> Result<Option<Vec<Arc<dyn Filter>>>> {
        let mut builder = Inquiry::builder(self.key.clone()).many(true);
        if let Some(parent) = callback.as_inquiry() {
            builder = builder.parent(parent.clone());
        }
        let inquiry = builder.build()?;
        if !composer.handle_callback(composer, &inquiry.clone_ref(), true, composer)? {
            return Ok(None);
        }
        match inquiry.get_result(true) {
            CallbackResult::Ready(settled) => {
                let filters: Vec<_> = settled.into_values().iter().filter_map(self.cast).collect();
                Ok((!filters.is_empty()).then_some(filters))
            }
            CallbackResult::Pending(_) => {
                debug!(key = %self.key, "Ignoring asynchronously provided filters");
                Ok(None)
            }
        }
    }
}

/// Collect the filter stages that wrap `binding` on `handler`.
///
/// Returns `None` when a required provider supplies nothing, which makes the
/// binding ineligible.
pub fn resolve_filters(
    policy: &'static CallbackPolicy,
    descriptor: &HandlerDescriptor,
    binding: &Binding,
    callback: &CallbackRef,
    handler: &HandlerRef,
    composer: &HandlerRef,
) -> Result<Option<Vec<Arc<dyn Filter>>>> {
    let skip = binding.skip_filters();
    let providers = binding
        .filters()
        .iter()
        .cloned()
        .chain(descriptor.filters().providers())
        .chain(policy.filters().providers());

    let mut filters: Vec<Arc<dyn Filter>> = Vec::new();
    for provider in providers {
        let required = provider.required();
        if skip && !required {
            continue;
        }
        match provider.filters(binding, callback, composer)? {
            Some(found) if !found.is_empty() => filters.extend(found),
            _ if required => return Ok(None),
            _ => {}
        }
    }
    if !skip {
        if let Some(filter) = Arc::clone(handler).as_filter() {
            filters.push(filter);
        }
    }

    let mut seen = HashSet::new();
    filters.retain(|filter| seen.insert(filter_address(filter)));
    filters.sort_by_key(|filter| match filter.order() {
        Some(order) => (0, order),
        None => (1, 0),
    });
    Ok(Some(filters))
}
