//! # Dispatcher
//!
//! Walks a descriptor chain and invokes the bindings that match a callback.
//!
//! Each descriptor's index is snapshotted before its bindings are tried, so
//! a handler that adds or removes bindings while being invoked never
//! disturbs the traversal in flight. Matching stops at the first handled
//! binding unless the dispatch is greedy.

use super::{resolve_arguments, InvocationContext, ResolvedArguments};
use crate::binding::{Binding, Constraint, HandlerDescriptor, Variance};
use crate::callback::{Callback, CallbackRef, Reply};
use crate::config::DispatchConfig;
use crate::error::Result;
use crate::filter::{resolve_filters, Pipeline};
use crate::handler::HandlerRef;
use crate::policy::CallbackPolicy;
use std::sync::Arc;
use tracing::{debug, trace};

/// Dispatch `callback` to `handler` across every descriptor of `chain`.
///
/// `constraint` overrides the callback's own constraint. Returns whether any
/// binding handled the callback.
pub fn dispatch_chain(
    policy: &'static CallbackPolicy,
    chain: impl IntoIterator<Item = Arc<HandlerDescriptor>>,
    handler: &HandlerRef,
    callback: &CallbackRef,
    constraint: Option<&Constraint>,
    composer: &HandlerRef,
    greedy: bool,
) -> Result<bool> {
    let variance = if callback.invariant() {
        Variance::Invariant
    } else {
        policy.variance()
    };
    let constraint = constraint.cloned().unwrap_or_else(|| callback.constraint());
    let pass = DispatchPass {
        policy,
        variance,
        constraint: &constraint,
        handler,
        callback,
        composer,
        greedy,
        trace_candidates: DispatchConfig::global().trace_candidates,
    };

    let mut dispatched = false;
    for descriptor in chain {
        dispatched |= pass.dispatch_descriptor(&descriptor)?;
        if dispatched && !greedy {
            break;
        }
    }

    debug!(
        callback_id = %callback.id(),
        callback = %callback.describe(),
        policy = %policy,
        greedy = greedy,
        dispatched = dispatched,
        "Dispatched callback"
    );
    Ok(dispatched)
}

struct DispatchPass<'a> {
    policy: &'static CallbackPolicy,
    variance: Variance,
    constraint: &'a Constraint,
    handler: &'a HandlerRef,
    callback: &'a CallbackRef,
    composer: &'a HandlerRef,
    greedy: bool,
    trace_candidates: bool,
}

impl DispatchPass<'_> {
    fn dispatch_descriptor(&self, descriptor: &HandlerDescriptor) -> Result<bool> {
        let invariant = self.variance == Variance::Invariant;
        let candidates = descriptor.with_index(self.policy, |index| {
            if invariant {
                // no indexed entry point means nothing can match exactly
                self.constraint
                    .index_key()
                    .and_then(|key| index.snapshot_from(&key))
                    .unwrap_or_default()
            } else {
                index.snapshot()
            }
        });
        let Some(candidates) = candidates else {
            return Ok(false);
        };

        let mut dispatched = false;
        for binding in candidates {
            if !binding.matches(self.constraint, self.variance) {
                if invariant {
                    break;
                }
                continue;
            }
            if !binding.qualifies(self.callback.metadata()) {
                continue;
            }
            if self.trace_candidates {
                trace!(
                    owner = %descriptor.owner(),
                    binding = %binding,
                    callback = %self.callback.describe(),
                    "Trying candidate binding"
                );
            }
            if self.invoke(descriptor, &binding)? {
                dispatched = true;
                if !self.greedy {
                    break;
                }
            }
        }
        Ok(dispatched)
    }

    fn invoke(&self, descriptor: &HandlerDescriptor, binding: &Arc<Binding>) -> Result<bool> {
        let Some(_guard) = self.callback.guard_dispatch(self.handler, binding) else {
            trace!(binding = %binding, "Dispatch refused by callback guard");
            return Ok(false);
        };

        let filters = if self.callback.can_filter() {
            match resolve_filters(
                self.policy,
                descriptor,
                binding,
                self.callback,
                self.handler,
                self.composer,
            )? {
                Some(filters) => filters,
                None => {
                    trace!(binding = %binding, "Required filter unavailable");
                    return Ok(false);
                }
            }
        } else {
            Vec::new()
        };

        let context = InvocationContext::new(
            self.constraint.clone(),
            binding.clone(),
            self.callback.clone(),
            self.handler.clone(),
            self.composer.clone(),
            self.greedy,
        );

        let (completed, reply) = if filters.is_empty() {
            invoke_direct(binding, self.handler, &context)?
        } else {
            Pipeline::new(filters, context).run()?
        };

        if !completed || !self.policy.accept_result(&reply) {
            return Ok(false);
        }
        if reply.is_nothing() {
            return Ok(true);
        }
        self.callback
            .receive_result(reply, binding.is_strict(), self.composer)
    }
}

/// Resolve arguments and call the binding body. The flag is false when the
/// binding could not be invoked for lack of arguments.
pub(crate) fn invoke_direct(
    binding: &Arc<Binding>,
    handler: &HandlerRef,
    context: &InvocationContext,
) -> Result<(bool, Reply)> {
    match resolve_arguments(binding, context.callback(), context.composer())? {
        ResolvedArguments::Missing => Ok((false, Reply::Unhandled)),
        ResolvedArguments::Ready(arguments) => {
            Ok((true, binding.invoke(handler, &arguments, context)?))
        }
        ResolvedArguments::Pending(arguments) => {
            let binding = binding.clone();
            let handler = handler.clone();
            let context = context.clone();
            let reply = Reply::pending(async move {
                let arguments = arguments.await?;
                binding.invoke(&handler, &arguments, &context)
            });
            Ok((true, reply))
        }
    }
}
