//! # Inquiry
//!
//! Resolution of a key under the `provides` policy. Nested inquiries created
//! during dependency resolution link to their parent, which is how
//! `guard_dispatch` recognises a binding that would re-enter its own
//! in-progress resolution.

use super::{
    handler_address, Callback, CallbackRef, CallbackResult, DispatchGuard, Reply, ResultAcceptor,
    ResultSet,
};
use crate::binding::{Binding, BindingId, BindingMetadata, Constraint};
use crate::config::DispatchConfig;
use crate::error::{DispatchError, Result};
use crate::handler::HandlerRef;
use crate::policy::{provides, CallbackPolicy};
use crate::types::{TypeHierarchy, Value};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

type InProgress = Option<(usize, BindingId)>;

#[derive(Clone, Debug)]
pub struct Inquiry {
    id: Uuid,
    key: Constraint,
    many: bool,
    instant: bool,
    can_infer: bool,
    parent: Option<Arc<Inquiry>>,
    depth: usize,
    metadata: BindingMetadata,
    results: ResultSet,
    in_progress: Arc<Mutex<InProgress>>,
    circular: Arc<AtomicBool>,
}

impl Inquiry {
    /// An inquiry for `key` with default options
    pub fn new(key: impl Into<Constraint>) -> Result<Self> {
        Self::builder(key).build()
    }

    pub fn builder(key: impl Into<Constraint>) -> InquiryBuilder {
        InquiryBuilder {
            key: key.into(),
            many: false,
            instant: false,
            can_infer: true,
            parent: None,
            metadata: BindingMetadata::default(),
            acceptor: None,
        }
    }

    pub fn key(&self) -> &Constraint {
        &self.key
    }

    pub fn parent(&self) -> Option<&Inquiry> {
        self.parent.as_deref()
    }

    /// Number of ancestors in the parent chain
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_many(&self) -> bool {
        self.many
    }

    /// Whether a dispatch was refused because it would re-enter an
    /// in-progress resolution
    pub fn is_circular(&self) -> bool {
        self.circular.load(Ordering::SeqCst)
    }

    pub fn result(&self) -> CallbackResult {
        self.results.get(self.many)
    }

    /// Whether `(handler, binding)` is being invoked for this inquiry or any
    /// of its parents
    pub fn in_progress(&self, handler: usize, binding: BindingId) -> bool {
        let marker = Some((handler, binding));
        let mut current = Some(self);
        while let Some(inquiry) = current {
            if *inquiry.in_progress.lock() == marker {
                return true;
            }
            current = inquiry.parent();
        }
        false
    }

    /// Dispatch on behalf of `callback`, which is this inquiry or a
    /// callback wrapping it
    pub(crate) fn dispatch_as(
        &self,
        callback: &CallbackRef,
        handler: &HandlerRef,
        greedy: bool,
        composer: &HandlerRef,
    ) -> Result<bool> {
        let mut resolved = false;
        if self.metadata.is_empty() {
            if let Some(key) = self.key.type_key() {
                // the handler itself may satisfy the key
                if TypeHierarchy::global().is_assignable(&handler.handler_type(), &key) {
                    let implied = Reply::Value(Value::from_handler(handler.clone()));
                    resolved = callback.receive_result(implied, false, composer)?;
                    if resolved && !greedy {
                        return Ok(true);
                    }
                }
            }
        }
        let count = self.result_count();
        let handled = provides().dispatch(handler, callback, Some(&self.key), composer, greedy)?;
        Ok(handled || resolved || self.result_count() > count)
    }

    pub(crate) fn guard(&self, handler: &HandlerRef, binding: &Binding) -> Option<DispatchGuard> {
        let address = handler_address(handler);
        if self.in_progress(address, binding.id()) {
            self.circular.store(true, Ordering::SeqCst);
            warn!(
                inquiry = %self.key,
                binding = %binding,
                depth = self.depth,
                "Refused re-entrant dispatch"
            );
            return None;
        }
        let previous = self.in_progress.lock().replace((address, binding.id()));
        let state = Arc::clone(&self.in_progress);
        Some(DispatchGuard::restoring(move || {
            *state.lock() = previous;
        }))
    }
}

impl Callback for Inquiry {
    fn id(&self) -> Uuid {
        self.id
    }

    fn policy(&self) -> &'static CallbackPolicy {
        provides()
    }

    fn constraint(&self) -> Constraint {
        self.key.clone()
    }

    fn instant(&self) -> bool {
        self.instant
    }

    fn can_infer(&self) -> bool {
        self.can_infer
    }

    fn metadata(&self) -> Option<&BindingMetadata> {
        Some(&self.metadata)
    }

    fn result_count(&self) -> usize {
        self.results.count()
    }

    fn get_result(&self, many: bool) -> CallbackResult {
        self.results.get(many)
    }

    fn set_result(&self, result: CallbackResult) {
        self.results.set(result);
    }

    fn receive_result(&self, reply: Reply, strict: bool, composer: &HandlerRef) -> Result<bool> {
        self.results.receive(reply, strict, self.instant, composer)
    }

    fn guard_dispatch(&self, handler: &HandlerRef, binding: &Binding) -> Option<DispatchGuard> {
        self.guard(handler, binding)
    }

    fn dispatch(&self, handler: &HandlerRef, greedy: bool, composer: &HandlerRef) -> Result<bool> {
        self.dispatch_as(&self.clone_ref(), handler, greedy, composer)
    }

    fn clone_ref(&self) -> CallbackRef {
        Arc::new(self.clone())
    }

    fn as_inquiry(&self) -> Option<&Inquiry> {
        Some(self)
    }

    fn describe(&self) -> String {
        format!("Inquiry | {}", self.key)
    }
}

/// Options for a new [`Inquiry`]
pub struct InquiryBuilder {
    key: Constraint,
    many: bool,
    instant: bool,
    can_infer: bool,
    parent: Option<Inquiry>,
    metadata: BindingMetadata,
    acceptor: Option<Arc<dyn ResultAcceptor>>,
}

impl InquiryBuilder {
    pub fn many(mut self, many: bool) -> Self {
        self.many = many;
        self
    }

    pub fn instant(mut self) -> Self {
        self.instant = true;
        self
    }

    pub fn without_inference(mut self) -> Self {
        self.can_infer = false;
        self
    }

    pub fn parent(mut self, parent: Inquiry) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn metadata(mut self, metadata: BindingMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn acceptor(mut self, acceptor: Arc<dyn ResultAcceptor>) -> Self {
        self.acceptor = Some(acceptor);
        self
    }

    /// Fails for an unconstrained key, or when the parent chain is already
    /// as deep as the configured resolution limit
    pub fn build(self) -> Result<Inquiry> {
        if self.key.is_unconstrained() {
            return Err(DispatchError::configuration("an inquiry requires a key"));
        }
        let depth = self.parent.as_ref().map_or(0, |parent| parent.depth + 1);
        let limit = DispatchConfig::global().max_resolution_depth;
        if depth > limit {
            return Err(DispatchError::CircularResolution {
                key: self.key.to_string(),
                depth,
            });
        }

        let mut results = ResultSet::new().swallow_pending_errors();
        if let Some(acceptor) = self.acceptor {
            results = results.with_acceptor(acceptor);
        }
        Ok(Inquiry {
            id: Uuid::new_v4(),
            key: self.key,
            many: self.many,
            instant: self.instant,
            can_infer: self.can_infer,
            parent: self.parent.map(Arc::new),
            depth,
            metadata: self.metadata,
            results,
            in_progress: Arc::new(Mutex::new(None)),
            circular: Arc::new(AtomicBool::new(false)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::CompositeHandler;

    struct Repository;

    #[test]
    fn test_unconstrained_key_is_rejected() {
        let error = Inquiry::new(Constraint::Unconstrained).unwrap_err();
        assert!(matches!(error, DispatchError::Configuration(_)));
    }

    #[test]
    fn test_parent_chain_depth() {
        let root = Inquiry::new(Constraint::of::<Repository>()).unwrap();
        let child = Inquiry::builder("connection").parent(root.clone()).build().unwrap();
        let grandchild = Inquiry::builder("pool").parent(child.clone()).build().unwrap();
        assert_eq!(root.depth(), 0);
        assert_eq!(grandchild.depth(), 2);
        assert!(grandchild.parent().and_then(Inquiry::parent).is_some());
    }

    #[test]
    fn test_depth_limit() {
        let limit = DispatchConfig::global().max_resolution_depth;
        let mut inquiry = Inquiry::new("root").unwrap();
        for _ in 0..limit {
            inquiry = Inquiry::builder("nested").parent(inquiry).build().unwrap();
        }
        let error = Inquiry::builder("nested").parent(inquiry).build().unwrap_err();
        assert!(error.is_circular());
    }

    #[test]
    fn test_guard_refuses_reentry_through_parents() {
        let handler: HandlerRef = Arc::new(CompositeHandler::new());
        let binding = Binding::builder(Constraint::of::<Repository>())
            .function(|_, _| Ok(Reply::Nothing))
            .build()
            .unwrap();
        let root = Inquiry::new(Constraint::of::<Repository>()).unwrap();

        let guard = root.guard_dispatch(&handler, &binding);
        assert!(guard.is_some());
        let nested = Inquiry::builder(Constraint::of::<Repository>())
            .parent(root.clone())
            .build()
            .unwrap();
        assert!(nested.guard_dispatch(&handler, &binding).is_none());
        assert!(nested.is_circular());

        drop(guard);
        assert!(!root.in_progress(handler_address(&handler), binding.id()));
        assert!(nested.guard_dispatch(&handler, &binding).is_some());
    }
}
