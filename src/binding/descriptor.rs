//! # Handler Descriptors
//!
//! All bindings declared by one owner, grouped per policy.
//!
//! ## Overview
//!
//! Descriptors live in a process-wide store keyed by [`Owner`]. Instance
//! bindings (methods dispatched on a handler value) are registered under
//! `Owner::Instance`, static bindings (type-level providers and factories)
//! under `Owner::Class`. The descriptor chain of an owner walks the declared
//! ancestry of its type, most specific first, skipping ancestors that have
//! declared nothing.
//!
//! ## Usage
//!
//! ```rust
//! use mediator_core::binding::{Binding, HandlerDescriptor, Owner};
//! use mediator_core::callback::Reply;
//! use mediator_core::policy::handles;
//! use mediator_core::types::TypeKey;
//!
//! struct Ping;
//! struct PingHandler;
//!
//! let descriptor = HandlerDescriptor::get_or_create(Owner::Instance(TypeKey::of::<PingHandler>()));
//! let registration = descriptor
//!     .add_binding(
//!         handles(),
//!         Binding::builder(TypeKey::of::<Ping>())
//!             .function(|_, _| Ok(Reply::value("pong")))
//!             .build()
//!             .unwrap(),
//!     )
//!     .unwrap();
//! registration.unsubscribe(true).unwrap();
//! ```

use super::{Binding, BindingId, BindingIndex, Constraint, HandlerFn, RemovedHook};
use crate::callback::CallbackRef;
use crate::error::{DispatchError, Result};
use crate::filter::FilteredScope;
use crate::handler::HandlerRef;
use crate::logging::log_binding_operation;
use crate::policy::CallbackPolicy;
use crate::types::{TypeHierarchy, TypeKey};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};
use tracing::debug;

static DESCRIPTORS: OnceLock<DashMap<Owner, Arc<HandlerDescriptor>>> = OnceLock::new();

fn store() -> &'static DashMap<Owner, Arc<HandlerDescriptor>> {
    DESCRIPTORS.get_or_init(DashMap::new)
}

/// Who declared a set of bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    /// Methods dispatched on values of the type
    Instance(TypeKey),
    /// Type-level bindings that need no instance
    Class(TypeKey),
}

impl Owner {
    pub fn type_key(&self) -> TypeKey {
        match self {
            Owner::Instance(key) | Owner::Class(key) => *key,
        }
    }

    /// The same kind of owner for another type
    pub fn with_type(&self, key: TypeKey) -> Owner {
        match self {
            Owner::Instance(_) => Owner::Instance(key),
            Owner::Class(_) => Owner::Class(key),
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Instance(key) => write!(f, "{key}"),
            Owner::Class(key) => write!(f, "class {key}"),
        }
    }
}

pub struct HandlerDescriptor {
    owner: Owner,
    bindings: RwLock<HashMap<&'static str, BindingIndex>>,
    filters: FilteredScope,
}

impl HandlerDescriptor {
    fn new(owner: Owner) -> Self {
        Self {
            owner,
            bindings: RwLock::new(HashMap::new()),
            filters: FilteredScope::new(),
        }
    }

    /// Look up the descriptor of `owner`, optionally creating it
    pub fn get(owner: Owner, create: bool) -> Option<Arc<HandlerDescriptor>> {
        if create {
            return Some(Self::get_or_create(owner));
        }
        store().get(&owner).map(|entry| entry.value().clone())
    }

    pub fn get_or_create(owner: Owner) -> Arc<HandlerDescriptor> {
        store()
            .entry(owner)
            .or_insert_with(|| {
                debug!(owner = %owner, "Created handler descriptor");
                Arc::new(HandlerDescriptor::new(owner))
            })
            .value()
            .clone()
    }

    /// Instance descriptor of handler type `H`
    pub fn for_type<H: ?Sized + 'static>() -> Arc<HandlerDescriptor> {
        Self::get_or_create(Owner::Instance(TypeKey::of::<H>()))
    }

    /// Static descriptor of type `T`
    pub fn for_class<T: ?Sized + 'static>() -> Arc<HandlerDescriptor> {
        Self::get_or_create(Owner::Class(TypeKey::of::<T>()))
    }

    /// A descriptor outside the global store, private to its creator
    pub fn detached(owner: Owner) -> Arc<HandlerDescriptor> {
        Arc::new(HandlerDescriptor::new(owner))
    }

    /// Drop the stored descriptor of `owner`
    pub fn remove(owner: &Owner) -> Option<Arc<HandlerDescriptor>> {
        store().remove(owner).map(|(_, descriptor)| descriptor)
    }

    /// Existing descriptors along the ancestry of `owner`, most specific first
    pub fn chain(owner: Owner) -> DescriptorChain {
        let owners = TypeHierarchy::global()
            .lineage(&owner.type_key())
            .into_iter()
            .map(|key| owner.with_type(key))
            .collect::<Vec<_>>();
        DescriptorChain {
            first: None,
            owners: owners.into_iter(),
        }
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    /// Descriptor-level filter providers
    pub fn filters(&self) -> &FilteredScope {
        &self.filters
    }

    pub fn add_binding(
        self: &Arc<Self>,
        policy: &'static CallbackPolicy,
        binding: Binding,
    ) -> Result<BindingRegistration> {
        binding.set_owner(self.owner);
        let binding = Arc::new(binding);
        self.bindings
            .write()
            .entry(policy.name())
            .or_insert_with(|| BindingIndex::new(policy))
            .insert(binding.clone());

        log_binding_operation(
            "add_binding",
            policy.name(),
            &self.owner.to_string(),
            &binding.to_string(),
            "registered",
        );

        Ok(BindingRegistration {
            descriptor: Arc::downgrade(self),
            policy,
            binding,
        })
    }

    /// Build and add a binding from raw parts
    pub fn add_handler(
        self: &Arc<Self>,
        policy: &'static CallbackPolicy,
        constraint: impl Into<Constraint>,
        handler: Option<HandlerFn>,
        key: Option<String>,
        on_removed: Option<RemovedHook>,
    ) -> Result<BindingRegistration> {
        let binding = Binding::create(constraint, handler, key, on_removed)?;
        self.add_binding(policy, binding)
    }

    /// Remove one binding, evicting the policy entry once it is empty
    pub fn remove_binding(
        &self,
        policy: &'static CallbackPolicy,
        id: BindingId,
        notify: bool,
    ) -> Result<Arc<Binding>> {
        let removed = {
            let mut bindings = self.bindings.write();
            match bindings.get_mut(policy.name()) {
                Some(index) => {
                    let removed = index.remove(id);
                    if index.is_empty() {
                        bindings.remove(policy.name());
                    }
                    removed?
                }
                None => {
                    return Err(DispatchError::BindingNotIndexed {
                        binding: id.to_string(),
                        policy: policy.name().to_string(),
                    })
                }
            }
        };

        log_binding_operation(
            "remove_binding",
            policy.name(),
            &self.owner.to_string(),
            &removed.to_string(),
            "removed",
        );
        if notify {
            removed.notify_removed();
        }
        Ok(removed)
    }

    /// Remove every binding under `policy`, running each removal hook
    pub fn remove_bindings(&self, policy: &'static CallbackPolicy) -> usize {
        let removed = self.bindings.write().remove(policy.name());
        let Some(index) = removed else {
            return 0;
        };
        let bindings = index.snapshot();
        for binding in &bindings {
            binding.notify_removed();
        }
        debug!(
            owner = %self.owner,
            policy = policy.name(),
            count = bindings.len(),
            "Removed policy bindings"
        );
        bindings.len()
    }

    /// Ranked bindings under `policy`
    pub fn bindings(&self, policy: &'static CallbackPolicy) -> Vec<Arc<Binding>> {
        self.bindings
            .read()
            .get(policy.name())
            .map(BindingIndex::snapshot)
            .unwrap_or_default()
    }

    /// Policies that currently have bindings
    pub fn policies(&self) -> Vec<&'static CallbackPolicy> {
        self.bindings.read().values().map(BindingIndex::policy).collect()
    }

    pub fn has_bindings(&self) -> bool {
        !self.bindings.read().is_empty()
    }

    /// Run `f` against the index of `policy`, if any
    pub(crate) fn with_index<R>(
        &self,
        policy: &'static CallbackPolicy,
        f: impl FnOnce(&BindingIndex) -> R,
    ) -> Option<R> {
        self.bindings.read().get(policy.name()).map(f)
    }

    /// This descriptor (optionally) followed by the stored descriptors of
    /// its owner's ancestors
    pub fn descriptor_chain(self: &Arc<Self>, include_self: bool) -> DescriptorChain {
        let owners = TypeHierarchy::global()
            .ancestors(&self.owner.type_key())
            .into_iter()
            .map(|key| self.owner.with_type(key))
            .collect::<Vec<_>>();
        DescriptorChain {
            first: include_self.then(|| self.clone()),
            owners: owners.into_iter(),
        }
    }

    /// Dispatch `callback` against this descriptor's chain
    pub fn dispatch(
        self: &Arc<Self>,
        policy: &'static CallbackPolicy,
        handler: &HandlerRef,
        callback: &CallbackRef,
        constraint: Option<&Constraint>,
        composer: &HandlerRef,
        greedy: bool,
    ) -> Result<bool> {
        crate::dispatch::dispatch_chain(
            policy,
            self.descriptor_chain(true),
            handler,
            callback,
            constraint,
            composer,
            greedy,
        )
    }

    /// Copy every binding into `target`, re-owned by the target
    pub fn copy_to(&self, target: &Arc<HandlerDescriptor>) -> Result<usize> {
        let mut copied = 0;
        for policy in self.policies() {
            for binding in self.bindings(policy) {
                target.add_binding(policy, binding.copy_for(target.owner))?;
                copied += 1;
            }
        }
        Ok(copied)
    }

    /// Adopt bindings from `other` whose declaration is not already present
    pub fn merge(self: &Arc<Self>, other: &HandlerDescriptor) -> Result<usize> {
        let mut merged = 0;
        for policy in other.policies() {
            let existing = self.bindings(policy);
            for binding in other.bindings(policy) {
                let duplicate = existing.iter().any(|present| {
                    present.key() == binding.key()
                        && present.constraint().same_as(binding.constraint())
                });
                if !duplicate {
                    self.add_binding(policy, binding.copy_for(self.owner))?;
                    merged += 1;
                }
            }
        }
        for provider in other.filters.providers() {
            self.filters.add_filters(provider);
        }
        Ok(merged)
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bindings = self.bindings.read();
        let mut policies: Vec<_> = bindings.iter().map(|(name, index)| (*name, index.len())).collect();
        policies.sort();
        f.debug_struct("HandlerDescriptor")
            .field("owner", &self.owner)
            .field("bindings", &policies)
            .finish()
    }
}

/// Lazy, restartable walk over descriptors
#[derive(Clone)]
pub struct DescriptorChain {
    first: Option<Arc<HandlerDescriptor>>,
    owners: std::vec::IntoIter<Owner>,
}

impl Iterator for DescriptorChain {
    type Item = Arc<HandlerDescriptor>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(first) = self.first.take() {
            return Some(first);
        }
        self.owners
            .by_ref()
            .find_map(|owner| HandlerDescriptor::get(owner, false))
    }
}

/// Handle returned by [`HandlerDescriptor::add_binding`]
pub struct BindingRegistration {
    descriptor: Weak<HandlerDescriptor>,
    policy: &'static CallbackPolicy,
    binding: Arc<Binding>,
}

impl BindingRegistration {
    pub fn binding(&self) -> &Arc<Binding> {
        &self.binding
    }

    pub fn policy(&self) -> &'static CallbackPolicy {
        self.policy
    }

    /// Remove exactly this binding, running its removal hook when `notify`
    pub fn unsubscribe(self, notify: bool) -> Result<()> {
        match self.descriptor.upgrade() {
            Some(descriptor) => descriptor
                .remove_binding(self.policy, self.binding.id(), notify)
                .map(|_| ()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::Reply;
    use crate::policy::{handles, provides};
    use crate::types::declare;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn noop(constraint: impl Into<Constraint>) -> Binding {
        Binding::builder(constraint)
            .function(|_, _| Ok(Reply::Nothing))
            .build()
            .unwrap()
    }

    #[test]
    fn test_get_or_create_is_unique_per_owner() {
        struct Unique;
        let owner = Owner::Instance(TypeKey::of::<Unique>());
        assert!(HandlerDescriptor::get(owner, false).is_none());
        let created = HandlerDescriptor::get(owner, true).unwrap();
        let fetched = HandlerDescriptor::get(owner, false).unwrap();
        assert!(Arc::ptr_eq(&created, &fetched));
        assert!(HandlerDescriptor::remove(&owner).is_some());
        assert!(HandlerDescriptor::get(owner, false).is_none());
    }

    #[test]
    fn test_unsubscribe_removes_exactly_one_binding() {
        struct Subscriber;
        struct Event;
        let descriptor = HandlerDescriptor::detached(Owner::Instance(TypeKey::of::<Subscriber>()));
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let first = descriptor
            .add_binding(
                handles(),
                Binding::builder(TypeKey::of::<Event>())
                    .function(|_, _| Ok(Reply::Nothing))
                    .on_removed(move |_| {
                        counter.fetch_add(1, Ordering::SeqCst);
                    })
                    .build()
                    .unwrap(),
            )
            .unwrap();
        descriptor.add_binding(handles(), noop(TypeKey::of::<Event>())).unwrap();

        let first_id = first.binding().id();
        first.unsubscribe(true).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        let remaining = descriptor.bindings(handles());
        assert_eq!(remaining.len(), 1);
        assert_ne!(remaining[0].id(), first_id);
    }

    #[test]
    fn test_empty_index_evicts_policy() {
        struct Evicting;
        let descriptor = HandlerDescriptor::detached(Owner::Instance(TypeKey::of::<Evicting>()));
        let registration = descriptor.add_binding(provides(), noop("token")).unwrap();
        assert_eq!(descriptor.policies().len(), 1);
        registration.unsubscribe(false).unwrap();
        assert!(!descriptor.has_bindings());

        let stray = noop("stray");
        let error = descriptor
            .remove_binding(provides(), stray.id(), false)
            .unwrap_err();
        assert!(matches!(error, DispatchError::BindingNotIndexed { .. }));
        assert!(!descriptor.has_bindings());
    }

    #[test]
    fn test_remove_bindings_runs_every_hook() {
        struct Cleared;
        let descriptor = HandlerDescriptor::detached(Owner::Instance(TypeKey::of::<Cleared>()));
        let hits = Arc::new(AtomicUsize::new(0));
        for name in ["a", "b", "c"] {
            let counter = hits.clone();
            let binding = Binding::builder(name)
                .function(|_, _| Ok(Reply::Nothing))
                .on_removed(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .build()
                .unwrap();
            descriptor.add_binding(handles(), binding).unwrap();
        }
        assert_eq!(descriptor.remove_bindings(handles()), 3);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(descriptor.remove_bindings(handles()), 0);
    }

    #[test]
    fn test_descriptor_chain_skips_undeclared_ancestors() {
        struct Base;
        struct Middle;
        struct Leaf;
        declare::<Leaf>().extends::<Middle>();
        declare::<Middle>().extends::<Base>();
        let base = HandlerDescriptor::for_type::<Base>();
        base.add_binding(handles(), noop("base")).unwrap();
        let leaf = HandlerDescriptor::for_type::<Leaf>();

        let owners: Vec<Owner> = leaf.descriptor_chain(true).map(|d| d.owner()).collect();
        assert_eq!(
            owners,
            vec![Owner::Instance(TypeKey::of::<Leaf>()), Owner::Instance(TypeKey::of::<Base>())]
        );

        let chain = HandlerDescriptor::chain(Owner::Instance(TypeKey::of::<Leaf>()));
        assert_eq!(chain.clone().count(), 2);
        assert_eq!(chain.count(), 2);
        assert_eq!(leaf.descriptor_chain(false).count(), 1);
    }

    #[test]
    fn test_copy_and_merge() {
        struct Source;
        struct Target;
        let source = HandlerDescriptor::detached(Owner::Class(TypeKey::of::<Source>()));
        source.add_binding(provides(), noop("alpha")).unwrap();
        source.add_binding(handles(), noop("beta")).unwrap();
        let target = HandlerDescriptor::detached(Owner::Instance(TypeKey::of::<Target>()));

        assert_eq!(source.copy_to(&target).unwrap(), 2);
        for binding in target.bindings(provides()) {
            assert_eq!(binding.owner(), Some(target.owner()));
        }
        assert_eq!(target.merge(&source).unwrap(), 0);
        source.add_binding(provides(), noop("gamma")).unwrap();
        assert_eq!(target.merge(&source).unwrap(), 1);
        assert_eq!(target.bindings(provides()).len(), 2);
    }
}
