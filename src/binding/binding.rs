//! # Binding
//!
//! One declared handler method: a constraint paired with the function that
//! services it.
//!
//! Bindings are immutable once built. The only mutable part is the owner
//! back-reference, set when a binding is added to (or migrated between)
//! descriptors.

use super::{BindingMetadata, Constraint, IndexKey, Owner, Parameter, Signature, Variance};
use crate::callback::Reply;
use crate::dispatch::{Arguments, InvocationContext};
use crate::error::{DispatchError, Result};
use crate::filter::FilterProvider;
use crate::handler::{Handler, HandlerRef};
use crate::types::TypeKey;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Invocable body of a binding. Receives the handler the binding was
/// matched on, the resolved arguments, and the invocation context.
pub type HandlerFn =
    Arc<dyn Fn(&HandlerRef, &Arguments, &InvocationContext) -> Result<Reply> + Send + Sync>;

/// Cleanup hook run when a binding is removed from its descriptor
pub type RemovedHook = Arc<dyn Fn(&Binding) + Send + Sync>;

static NEXT_BINDING_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

impl BindingId {
    fn next() -> Self {
        BindingId(NEXT_BINDING_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub struct Binding {
    id: BindingId,
    constraint: Constraint,
    handler: HandlerFn,
    key: Option<String>,
    on_removed: Option<RemovedHook>,
    signature: Option<Signature>,
    skip_filters: bool,
    strict: bool,
    filters: Vec<Arc<dyn FilterProvider>>,
    qualifiers: BindingMetadata,
    owner: RwLock<Option<Owner>>,
}

impl Binding {
    pub fn builder(constraint: impl Into<Constraint>) -> BindingBuilder {
        BindingBuilder::new(constraint.into())
    }

    /// Build a binding from raw parts. A missing handler is a configuration error.
    pub fn create(
        constraint: impl Into<Constraint>,
        handler: Option<HandlerFn>,
        key: Option<String>,
        on_removed: Option<RemovedHook>,
    ) -> Result<Binding> {
        let mut builder = BindingBuilder::new(constraint.into());
        builder.handler = handler;
        builder.key = key;
        builder.on_removed = on_removed;
        builder.build()
    }

    pub fn id(&self) -> BindingId {
        self.id
    }

    pub fn constraint(&self) -> &Constraint {
        &self.constraint
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    pub fn skip_filters(&self) -> bool {
        self.skip_filters
    }

    /// Whether list results of this method are kept as one opaque result
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn filters(&self) -> &[Arc<dyn FilterProvider>] {
        &self.filters
    }

    pub fn qualifiers(&self) -> &BindingMetadata {
        &self.qualifiers
    }

    pub fn owner(&self) -> Option<Owner> {
        *self.owner.read()
    }

    pub(crate) fn set_owner(&self, owner: Owner) {
        *self.owner.write() = Some(owner);
    }

    pub fn matches(&self, candidate: &Constraint, variance: Variance) -> bool {
        self.constraint.matches(candidate, variance)
    }

    /// Lookup key for the binding index. Stable for the binding's lifetime.
    pub fn create_index(&self, _variance: Variance) -> Option<IndexKey> {
        self.constraint.index_key()
    }

    /// Whether the callback's required metadata is met by this binding
    pub fn qualifies(&self, required: Option<&BindingMetadata>) -> bool {
        required.map_or(true, |required| self.qualifiers.satisfies(required))
    }

    pub fn invoke(
        &self,
        target: &HandlerRef,
        arguments: &Arguments,
        context: &InvocationContext,
    ) -> Result<Reply> {
        (self.handler)(target, arguments, context)
    }

    pub fn notify_removed(&self) {
        if let Some(hook) = &self.on_removed {
            hook(self);
        }
    }

    /// Builder pre-populated with everything but identity and owner
    pub fn derive(&self) -> BindingBuilder {
        BindingBuilder {
            constraint: self.constraint.clone(),
            handler: Some(self.handler.clone()),
            key: self.key.clone(),
            on_removed: self.on_removed.clone(),
            signature: self.signature.clone(),
            skip_filters: self.skip_filters,
            strict: self.strict,
            filters: self.filters.clone(),
            qualifiers: self.qualifiers.clone(),
        }
    }

    /// A fresh binding with the same declaration, owned by `owner`
    pub fn copy_for(&self, owner: Owner) -> Binding {
        let copy = self.derive().assemble(self.handler.clone());
        copy.set_owner(owner);
        copy
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("id", &self.id)
            .field("constraint", &self.constraint)
            .field("key", &self.key)
            .field("owner", &self.owner())
            .field("skip_filters", &self.skip_filters)
            .finish()
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{key}({})", self.constraint),
            None => write!(f, "{}{}", self.constraint, self.id),
        }
    }
}

/// Fluent construction of a [`Binding`]
pub struct BindingBuilder {
    constraint: Constraint,
    handler: Option<HandlerFn>,
    key: Option<String>,
    on_removed: Option<RemovedHook>,
    signature: Option<Signature>,
    skip_filters: bool,
    strict: bool,
    filters: Vec<Arc<dyn FilterProvider>>,
    qualifiers: BindingMetadata,
}

impl BindingBuilder {
    fn new(constraint: Constraint) -> Self {
        Self {
            constraint,
            handler: None,
            key: None,
            on_removed: None,
            signature: None,
            skip_filters: false,
            strict: false,
            filters: Vec::new(),
            qualifiers: BindingMetadata::default(),
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn handler(mut self, handler: HandlerFn) -> Self {
        self.handler = Some(handler);
        self
    }

    /// A body that does not care which handler it was matched on
    pub fn function<F>(self, body: F) -> Self
    where
        F: Fn(&Arguments, &InvocationContext) -> Result<Reply> + Send + Sync + 'static,
    {
        self.handler(Arc::new(
            move |_target: &HandlerRef, arguments: &Arguments, context: &InvocationContext| {
                body(arguments, context)
            },
        ))
    }

    /// A method of handler type `H`. The matched handler is downcast to `H`,
    /// falling back to its declared ancestor view.
    pub fn method<H, F>(self, body: F) -> Self
    where
        H: Handler,
        F: Fn(&H, &Arguments, &InvocationContext) -> Result<Reply> + Send + Sync + 'static,
    {
        self.handler(Arc::new(
            move |target: &HandlerRef, arguments: &Arguments, context: &InvocationContext| {
                let handler: &dyn Handler = &**target;
                let receiver = handler.downcast_ref::<H>().or_else(|| {
                    handler
                        .ancestor(&TypeKey::of::<H>())
                        .and_then(|ancestor| ancestor.downcast_ref::<H>())
                });
                match receiver {
                    Some(receiver) => body(receiver, arguments, context),
                    None => Err(DispatchError::configuration(format!(
                        "{} cannot act as {}",
                        handler.handler_type(),
                        TypeKey::of::<H>()
                    ))),
                }
            },
        ))
    }

    pub fn on_removed<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Binding) + Send + Sync + 'static,
    {
        self.on_removed = Some(Arc::new(hook));
        self
    }

    pub fn signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }

    /// Append a parameter, starting a signature if there is none
    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.signature.get_or_insert_with(Signature::default).push(parameter);
        self
    }

    pub fn without_signature(mut self) -> Self {
        self.signature = None;
        self
    }

    pub fn skip_filters(mut self) -> Self {
        self.skip_filters = true;
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn filter(mut self, provider: Arc<dyn FilterProvider>) -> Self {
        self.filters.push(provider);
        self
    }

    pub fn without_filters(mut self) -> Self {
        self.filters.clear();
        self
    }

    pub fn qualifier(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.qualifiers.set(key, value);
        self
    }

    pub fn build(self) -> Result<Binding> {
        let handler = self.handler.clone().ok_or_else(|| {
            DispatchError::configuration(format!(
                "binding for {} requires a handler",
                self.constraint
            ))
        })?;
        Ok(self.assemble(handler))
    }

    fn assemble(self, handler: HandlerFn) -> Binding {
        Binding {
            id: BindingId::next(),
            constraint: self.constraint,
            handler,
            key: self.key,
            on_removed: self.on_removed,
            signature: self.signature,
            skip_filters: self.skip_filters,
            strict: self.strict,
            filters: self.filters,
            qualifiers: self.qualifiers,
            owner: RwLock::new(None),
        }
    }
}
