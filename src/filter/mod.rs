//! # Filters
//!
//! Interceptors wrapped around binding invocations.
//!
//! Providers are gathered from the binding, its descriptor, and the policy,
//! in that order, and the target handler joins as a stage when it is a
//! filter itself. Stages run as an explicit continuation: each receives its
//! own resolved arguments and a [`FilterContext`] from which it proceeds,
//! substitutes the composer, or aborts.

pub mod pipeline;
pub mod provider;
pub mod scope;

pub use pipeline::{FilterContext, Pipeline};
pub use provider::{resolve_filters, FilterInstanceProvider, FilterSpecProvider};
pub use scope::FilteredScope;

use crate::binding::{Binding, Signature};
use crate::callback::{CallbackRef, Reply};
use crate::dispatch::Arguments;
use crate::error::Result;
use crate::handler::HandlerRef;
use std::sync::Arc;

/// One stage of a filter pipeline
pub trait Filter: Send + Sync {
    /// Position in the pipeline, lower first; unordered stages run last
    fn order(&self) -> Option<i32> {
        None
    }

    /// Arguments this stage needs. Without a signature the stage receives
    /// the callback's source.
    fn signature(&self) -> Option<&Signature> {
        None
    }

    fn next(&self, arguments: &Arguments, context: FilterContext) -> Result<Reply>;
}

/// Source of filter stages for a binding
pub trait FilterProvider: Send + Sync {
    /// A required provider applies even to bindings that skip filters, and
    /// makes the binding ineligible when it supplies no stage
    fn required(&self) -> bool {
        false
    }

    fn filters(
        &self,
        binding: &Binding,
        callback: &CallbackRef,
        composer: &HandlerRef,
    ) -> Result<Option<Vec<Arc<dyn Filter>>>>;
}

pub(crate) fn filter_address(filter: &Arc<dyn Filter>) -> usize {
    Arc::as_ptr(filter) as *const () as usize
}
