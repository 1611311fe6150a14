//! # Handler Inference
//!
//! Dispatch to handler types that have no live instance.
//!
//! An [`InferenceHandler`] owns a private descriptor holding
//!
//! - copies of the static (`Owner::Class`) bindings of each inferred type,
//!   typically the providers that construct instances, and
//! - one shim per instance binding. When a shim matches, it resolves an
//!   instance of the declaring type through the composer with a
//!   [`Resolving`] callback, which re-dispatches the original callback to
//!   the resolved instance.
//!
//! Within one dispatch of a callback each type is resolved at most once.

use super::{Handler, HandlerRef};
use crate::binding::{Binding, Constraint, HandlerDescriptor, HandlerFn, IndexKey, Owner};
use crate::callback::{Callback, CallbackRef, CallbackResult, DispatchGuard, Reply, Resolving};
use crate::dispatch::{Arguments, InvocationContext};
use crate::error::{DispatchError, Result};
use crate::policy::CallbackPolicy;
use crate::types::TypeKey;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, trace};
use uuid::Uuid;

type ResolvedTypes = Arc<Mutex<HashMap<Uuid, HashSet<TypeKey>>>>;

pub struct InferenceHandler {
    types: Vec<TypeKey>,
    descriptor: Arc<HandlerDescriptor>,
    resolved: ResolvedTypes,
}

impl InferenceHandler {
    /// Infer every type in `types` from the bindings registered so far
    pub fn new(types: impl IntoIterator<Item = TypeKey>) -> Result<Self> {
        let types: Vec<TypeKey> = types.into_iter().collect();
        if types.is_empty() {
            return Err(DispatchError::configuration(
                "inference requires at least one handler type",
            ));
        }

        let descriptor =
            HandlerDescriptor::detached(Owner::Instance(TypeKey::of::<InferenceHandler>()));
        let mut shims = 0;
        for ty in &types {
            for statics in HandlerDescriptor::chain(Owner::Class(*ty)) {
                statics.copy_to(&descriptor)?;
            }
            shims += add_shims(&descriptor, *ty)?;
        }
        debug!(types = types.len(), shims, "Built inference descriptor");

        Ok(Self {
            types,
            descriptor,
            resolved: Arc::default(),
        })
    }

    pub fn of<T: ?Sized + 'static>() -> Result<Self> {
        Self::new([TypeKey::of::<T>()])
    }

    pub fn types(&self) -> &[TypeKey] {
        &self.types
    }

    pub fn descriptor(&self) -> &Arc<HandlerDescriptor> {
        &self.descriptor
    }

    /// Open the per-dispatch scope of `callback`, unless one is already open
    fn enter(&self, callback: Uuid) -> DispatchGuard {
        let mut resolved = self.resolved.lock();
        if resolved.contains_key(&callback) {
            return DispatchGuard::permit();
        }
        resolved.insert(callback, HashSet::new());
        let scopes = Arc::clone(&self.resolved);
        DispatchGuard::restoring(move || {
            scopes.lock().remove(&callback);
        })
    }

    /// Record that `ty` is being resolved for `callback`; false if it already was
    fn claim(&self, callback: Uuid, ty: TypeKey) -> bool {
        self.resolved
            .lock()
            .get_mut(&callback)
            .map_or(true, |types| types.insert(ty))
    }
}

/// One shim per distinct instance constraint of `ty` (and its ancestors)
fn add_shims(descriptor: &Arc<HandlerDescriptor>, ty: TypeKey) -> Result<usize> {
    let mut seen: HashSet<(&'static str, IndexKey)> = HashSet::new();
    let mut added = 0;
    for instance in HandlerDescriptor::chain(Owner::Instance(ty)) {
        for policy in instance.policies() {
            for binding in instance.bindings(policy) {
                if let Some(key) = binding.create_index(policy.variance()) {
                    if !seen.insert((policy.name(), key)) {
                        continue;
                    }
                }
                descriptor.add_binding(policy, shim_for(&binding, ty)?)?;
                added += 1;
            }
        }
    }
    Ok(added)
}

fn shim_for(binding: &Binding, ty: TypeKey) -> Result<Binding> {
    binding
        .derive()
        .handler(shim(ty))
        .without_signature()
        .without_filters()
        .skip_filters()
        .build()
}

fn shim(ty: TypeKey) -> HandlerFn {
    Arc::new(
        move |target: &HandlerRef, _arguments: &Arguments, context: &InvocationContext| {
            let callback = context.callback();
            if !callback.can_infer() {
                return Ok(Reply::Unhandled);
            }
            let handler: &dyn Handler = &**target;
            let Some(inference) = handler.downcast_ref::<InferenceHandler>() else {
                return Ok(Reply::Unhandled);
            };
            if !inference.claim(callback.id(), ty) {
                trace!(handler_type = %ty, "Already resolved for this callback");
                return Ok(Reply::Unhandled);
            }
            resolve_and_dispatch(ty, callback, context)
        },
    )
}

fn resolve_and_dispatch(
    ty: TypeKey,
    callback: &CallbackRef,
    context: &InvocationContext,
) -> Result<Reply> {
    let greedy = context.greedy();
    let composer = context.composer();
    let resolving = Resolving::new(Constraint::Type(ty), callback.clone(), greedy)?;
    if !composer.handle_callback(composer, &resolving.clone_ref(), greedy, composer)? {
        trace!(handler_type = %ty, "No instance available");
        return Ok(Reply::Unhandled);
    }
    match resolving.get_result(greedy) {
        CallbackResult::Ready(_) if resolving.succeeded() => Ok(Reply::Nothing),
        CallbackResult::Ready(_) => Ok(Reply::Unhandled),
        CallbackResult::Pending(pending) => {
            // nothing has polled the instances yet, so every late dispatch is captured
            resolving.defer_results();
            let description = callback.describe();
            Ok(Reply::pending(async move {
                pending.await?;
                if !resolving.succeeded() {
                    return Err(DispatchError::not_handled(description, None));
                }
                let mut replies = resolving.take_deferred_replies();
                Ok(match replies.len() {
                    0 => Reply::Nothing,
                    1 => replies.remove(0),
                    _ => Reply::Many(replies),
                })
            }))
        }
    }
}

impl Handler for InferenceHandler {
    fn dispatch_policy(
        &self,
        policy: &'static CallbackPolicy,
        this: &HandlerRef,
        callback: &CallbackRef,
        constraint: Option<&Constraint>,
        composer: &HandlerRef,
        greedy: bool,
    ) -> Result<bool> {
        let _scope = self.enter(callback.id());
        self.descriptor
            .dispatch(policy, this, callback, constraint, composer, greedy)
    }
}

impl std::fmt::Debug for InferenceHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceHandler")
            .field("types", &self.types)
            .field("descriptor", &self.descriptor)
            .finish()
    }
}
