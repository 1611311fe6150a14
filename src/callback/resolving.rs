//! # Resolving
//!
//! Two-stage dispatch used by handler inference: first resolve handlers
//! that provide a key, then dispatch the wrapped callback to each of them.
//! Resolved handlers are consumed by the inquiry's result acceptor and are
//! never stored as results themselves.
//!
//! Handlers that arrive after the synchronous dispatch has returned are
//! dispatched to a capturing view of the callback once deferral is on. Their
//! replies are collected here and handed back through
//! [`Resolving::take_deferred_replies`], so they can be delivered inside a
//! result slot the callback already reserved.

use super::{
    Acceptance, Callback, CallbackRef, CallbackResult, DispatchGuard, Inquiry, Reply,
    ResultAcceptor,
};
use crate::binding::{Binding, BindingMetadata, Constraint};
use crate::error::Result;
use crate::handler::HandlerRef;
use crate::policy::{provides, CallbackPolicy};
use crate::types::Value;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;
use uuid::Uuid;

#[derive(Default)]
struct DeferredReplies {
    active: AtomicBool,
    replies: Mutex<Vec<Reply>>,
}

struct ResolvingAcceptor {
    callback: CallbackRef,
    greedy: bool,
    succeeded: Arc<AtomicBool>,
    deferred: Arc<DeferredReplies>,
}

impl ResultAcceptor for ResolvingAcceptor {
    fn accept(&self, value: Value, composer: &HandlerRef) -> Result<Acceptance> {
        if !self.greedy && self.succeeded.load(Ordering::SeqCst) {
            return Ok(Acceptance::Absorbed);
        }
        let Some(handler) = value.as_handler() else {
            trace!(value = ?value, "Resolved value is not a handler");
            return Ok(Acceptance::Rejected);
        };
        let handled = if self.deferred.active.load(Ordering::SeqCst) {
            let capture = Capture {
                inner: self.callback.clone(),
                deferred: self.deferred.clone(),
            };
            capture.dispatch(handler, self.greedy, composer)?
        } else {
            self.callback.dispatch(handler, self.greedy, composer)?
        };
        if handled {
            self.succeeded.store(true, Ordering::SeqCst);
            Ok(Acceptance::Absorbed)
        } else {
            Ok(Acceptance::Rejected)
        }
    }
}

#[derive(Clone)]
pub struct Resolving {
    inquiry: Inquiry,
    callback: CallbackRef,
    succeeded: Arc<AtomicBool>,
    deferred: Arc<DeferredReplies>,
}

impl Resolving {
    /// Resolve `key`, then dispatch `callback` to every resolved handler.
    /// When `callback` is itself an inquiry it becomes the parent, so the
    /// circularity guard spans both stages.
    pub fn new(key: impl Into<Constraint>, callback: CallbackRef, greedy: bool) -> Result<Self> {
        let succeeded = Arc::new(AtomicBool::new(false));
        let deferred = Arc::new(DeferredReplies::default());
        let acceptor = Arc::new(ResolvingAcceptor {
            callback: callback.clone(),
            greedy,
            succeeded: succeeded.clone(),
            deferred: deferred.clone(),
        });
        let mut builder = Inquiry::builder(key).many(greedy).acceptor(acceptor);
        if let Some(parent) = callback.as_inquiry() {
            builder = builder.parent(parent.clone());
        }
        Ok(Self {
            inquiry: builder.build()?,
            callback,
            succeeded,
            deferred,
        })
    }

    /// From now on, replies produced for handlers resolved later are kept
    /// here instead of being added to the wrapped callback
    pub fn defer_results(&self) {
        self.deferred.active.store(true, Ordering::SeqCst);
    }

    /// Replies collected since [`Resolving::defer_results`], in receipt order
    pub fn take_deferred_replies(&self) -> Vec<Reply> {
        std::mem::take(&mut *self.deferred.replies.lock())
    }

    /// Whether the wrapped callback was handled by a resolved handler
    pub fn succeeded(&self) -> bool {
        self.succeeded.load(Ordering::SeqCst)
    }

    pub fn callback(&self) -> &CallbackRef {
        &self.callback
    }

    pub fn inquiry(&self) -> &Inquiry {
        &self.inquiry
    }
}

impl Callback for Resolving {
    fn id(&self) -> Uuid {
        self.inquiry.id()
    }

    fn policy(&self) -> &'static CallbackPolicy {
        provides()
    }

    fn constraint(&self) -> Constraint {
        self.inquiry.constraint()
    }

    fn can_infer(&self) -> bool {
        false
    }

    fn metadata(&self) -> Option<&BindingMetadata> {
        self.inquiry.metadata()
    }

    fn result_count(&self) -> usize {
        self.inquiry.result_count()
    }

    fn get_result(&self, many: bool) -> CallbackResult {
        self.inquiry.get_result(many)
    }

    fn set_result(&self, result: CallbackResult) {
        self.inquiry.set_result(result);
    }

    fn receive_result(&self, reply: Reply, strict: bool, composer: &HandlerRef) -> Result<bool> {
        self.inquiry.receive_result(reply, strict, composer)
    }

    fn guard_dispatch(&self, handler: &HandlerRef, binding: &Binding) -> Option<DispatchGuard> {
        self.inquiry.guard_dispatch(handler, binding)
    }

    fn dispatch(&self, handler: &HandlerRef, greedy: bool, composer: &HandlerRef) -> Result<bool> {
        let handled = self
            .inquiry
            .dispatch_as(&self.clone_ref(), handler, greedy, composer)?;
        Ok(handled || self.succeeded())
    }

    fn clone_ref(&self) -> CallbackRef {
        Arc::new(self.clone())
    }

    fn as_inquiry(&self) -> Option<&Inquiry> {
        Some(&self.inquiry)
    }

    fn describe(&self) -> String {
        format!("Resolving {} | {}", self.inquiry.key(), self.callback.describe())
    }
}

/// View of a callback that keeps its replies instead of storing them
#[derive(Clone)]
struct Capture {
    inner: CallbackRef,
    deferred: Arc<DeferredReplies>,
}

impl Callback for Capture {
    fn id(&self) -> Uuid {
        self.inner.id()
    }

    fn policy(&self) -> &'static CallbackPolicy {
        self.inner.policy()
    }

    fn source(&self) -> Option<Value> {
        self.inner.source()
    }

    fn constraint(&self) -> Constraint {
        self.inner.constraint()
    }

    fn strict(&self) -> bool {
        self.inner.strict()
    }

    fn instant(&self) -> bool {
        self.inner.instant()
    }

    fn can_batch(&self) -> bool {
        self.inner.can_batch()
    }

    fn can_filter(&self) -> bool {
        self.inner.can_filter()
    }

    fn can_infer(&self) -> bool {
        self.inner.can_infer()
    }

    fn invariant(&self) -> bool {
        self.inner.invariant()
    }

    fn metadata(&self) -> Option<&BindingMetadata> {
        self.inner.metadata()
    }

    fn result_count(&self) -> usize {
        self.deferred.replies.lock().len()
    }

    fn get_result(&self, many: bool) -> CallbackResult {
        self.inner.get_result(many)
    }

    fn set_result(&self, result: CallbackResult) {
        self.inner.set_result(result);
    }

    fn receive_result(&self, reply: Reply, _strict: bool, _composer: &HandlerRef) -> Result<bool> {
        if reply.is_nothing() || reply.is_unhandled() || (self.instant() && reply.is_pending()) {
            return Ok(false);
        }
        self.deferred.replies.lock().push(reply);
        Ok(true)
    }

    fn guard_dispatch(&self, handler: &HandlerRef, binding: &Binding) -> Option<DispatchGuard> {
        self.inner.guard_dispatch(handler, binding)
    }

    fn dispatch(&self, handler: &HandlerRef, greedy: bool, composer: &HandlerRef) -> Result<bool> {
        let this = self.clone_ref();
        let count = self.result_count();
        let handled = match self.inner.as_inquiry() {
            Some(inquiry) => inquiry.dispatch_as(&this, handler, greedy, composer)?,
            None => {
                let constraint = self.constraint();
                self.policy()
                    .dispatch(handler, &this, Some(&constraint), composer, greedy)?
            }
        };
        Ok(handled || self.result_count() > count)
    }

    fn clone_ref(&self) -> CallbackRef {
        Arc::new(self.clone())
    }

    fn as_inquiry(&self) -> Option<&Inquiry> {
        self.inner.as_inquiry()
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}
