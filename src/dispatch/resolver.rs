//! # Argument Resolution
//!
//! Produces the argument list of a matched binding (or filter stage) from
//! its declared signature.
//!
//! Parameter 0 is bound directly to the callback's source when it accepts
//! it. Every other parameter is resolved by a [`KeyResolver`], by default a
//! nested [`Inquiry`] parented to the current one so that self-referential
//! dependency chains are refused by the circularity guard.
//!
//! An unavailable required dependency is not an error: the binding is
//! reported as [`ResolvedArguments::Missing`] and the dispatcher moves on.

use super::{Argument, Arguments};
use crate::binding::{Binding, Parameter, Signature};
use crate::callback::{Callback, CallbackRef, CallbackResult, Inquiry, Settled};
use crate::error::{DispatchError, Result};
use crate::handler::{Handler, HandlerRef};
use futures::future::{self, BoxFuture, FutureExt};
use tracing::trace;

/// Outcome of resolving one parameter
pub enum Resolution {
    Ready(Argument),
    /// Required and unavailable
    Missing,
    /// Settles to the argument, or `None` when it turned out unavailable
    Pending(BoxFuture<'static, Result<Option<Argument>>>),
}

/// Strategy for supplying a parameter's value
pub trait KeyResolver: Send + Sync {
    /// Check the parameter declaration itself
    fn validate(&self, _parameter: &Parameter) -> Result<()> {
        Ok(())
    }

    fn resolve(
        &self,
        parameter: &Parameter,
        composer: &HandlerRef,
        parent: Option<&Inquiry>,
    ) -> Result<Resolution>;
}

/// Resolves a parameter through a nested inquiry on the composer
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultKeyResolver;

static DEFAULT_RESOLVER: DefaultKeyResolver = DefaultKeyResolver;

pub fn default_resolver() -> &'static DefaultKeyResolver {
    &DEFAULT_RESOLVER
}

impl KeyResolver for DefaultKeyResolver {
    fn validate(&self, parameter: &Parameter) -> Result<()> {
        if parameter.key().is_unconstrained() {
            return Err(DispatchError::configuration(format!(
                "parameter {parameter:?} has no key to resolve"
            )));
        }
        Ok(())
    }

    fn resolve(
        &self,
        parameter: &Parameter,
        composer: &HandlerRef,
        parent: Option<&Inquiry>,
    ) -> Result<Resolution> {
        let many = parameter.is_many();
        let mut builder = Inquiry::builder(parameter.key().clone())
            .many(many)
            .metadata(parameter.metadata().clone());
        if parameter.is_instant() {
            builder = builder.instant();
        }
        if let Some(parent) = parent {
            builder = builder.parent(parent.clone());
        }
        let inquiry = builder.build()?;

        let handled = composer.handle_callback(composer, &inquiry.clone_ref(), many, composer)?;
        if !handled {
            if inquiry.is_circular() {
                return Err(DispatchError::CircularResolution {
                    key: parameter.key().to_string(),
                    depth: inquiry.depth(),
                });
            }
            trace!(key = %parameter.key(), "Dependency unavailable");
            return Ok(unresolved(parameter));
        }

        let optional = parameter.is_optional();
        Ok(match inquiry.get_result(many) {
            CallbackResult::Ready(settled) => match settled_argument(settled, optional) {
                Some(argument) => Resolution::Ready(argument),
                None => Resolution::Missing,
            },
            CallbackResult::Pending(pending) => Resolution::Pending(
                async move { Ok(settled_argument(pending.await?, optional)) }.boxed(),
            ),
        })
    }
}

fn unresolved(parameter: &Parameter) -> Resolution {
    if parameter.is_many() {
        Resolution::Ready(Argument::Many(Vec::new()))
    } else if parameter.is_optional() {
        Resolution::Ready(Argument::Absent)
    } else {
        Resolution::Missing
    }
}

fn settled_argument(settled: Settled, optional: bool) -> Option<Argument> {
    match settled {
        Settled::Many(values) => Some(Argument::Many(values)),
        Settled::One(Some(value)) => Some(Argument::Value(value)),
        Settled::One(None) if optional => Some(Argument::Absent),
        Settled::One(None) => None,
    }
}

/// Arguments for one invocation
pub enum ResolvedArguments {
    Ready(Arguments),
    /// A required dependency is unavailable; try the next binding
    Missing,
    Pending(BoxFuture<'static, Result<Arguments>>),
}

impl ResolvedArguments {
    pub fn is_missing(&self) -> bool {
        matches!(self, ResolvedArguments::Missing)
    }
}

enum ArgumentSlot {
    Ready(Argument),
    Pending {
        key: String,
        future: BoxFuture<'static, Result<Option<Argument>>>,
    },
}

/// Resolve the arguments of `binding` for `callback`
pub fn resolve_arguments(
    binding: &Binding,
    callback: &CallbackRef,
    composer: &HandlerRef,
) -> Result<ResolvedArguments> {
    resolve_signature(binding.signature(), callback, composer)
}

/// Resolve any signature, shared by bindings and filter stages
pub fn resolve_signature(
    signature: Option<&Signature>,
    callback: &CallbackRef,
    composer: &HandlerRef,
) -> Result<ResolvedArguments> {
    let source = match callback.source() {
        Some(source) => Argument::Value(source),
        None => Argument::Callback(callback.clone()),
    };
    let Some(signature) = signature else {
        return Ok(ResolvedArguments::Ready(Arguments::new(vec![source])));
    };

    let parent = callback.as_inquiry();
    let mut slots = Vec::with_capacity(signature.len());
    for (position, parameter) in signature.parameters().iter().enumerate() {
        if position == 0 {
            if parameter.key().is_unconstrained() {
                slots.push(ArgumentSlot::Ready(source.clone()));
                continue;
            }
            if parameter.resolver().is_none() {
                if parameter.accepts(&source) {
                    slots.push(ArgumentSlot::Ready(source.clone()));
                    continue;
                }
                let itself = Argument::Callback(callback.clone());
                if parameter.accepts(&itself) {
                    slots.push(ArgumentSlot::Ready(itself));
                    continue;
                }
            }
        }

        let resolver: &dyn KeyResolver = match parameter.resolver() {
            Some(resolver) => resolver.as_ref(),
            None => default_resolver(),
        };
        resolver.validate(parameter)?;
        match resolver.resolve(parameter, composer, parent)? {
            Resolution::Ready(argument) => slots.push(ArgumentSlot::Ready(argument)),
            Resolution::Missing => {
                trace!(position, key = %parameter.key(), "Skipping binding, argument unavailable");
                return Ok(ResolvedArguments::Missing);
            }
            Resolution::Pending(future) => slots.push(ArgumentSlot::Pending {
                key: parameter.key().to_string(),
                future,
            }),
        }
    }

    if slots.iter().all(|slot| matches!(slot, ArgumentSlot::Ready(_))) {
        let arguments = slots
            .into_iter()
            .filter_map(|slot| match slot {
                ArgumentSlot::Ready(argument) => Some(argument),
                ArgumentSlot::Pending { .. } => None,
            })
            .collect();
        return Ok(ResolvedArguments::Ready(arguments));
    }

    let parts: Vec<BoxFuture<'static, Result<Argument>>> = slots
        .into_iter()
        .map(|slot| match slot {
            ArgumentSlot::Ready(argument) => future::ready(Ok(argument)).boxed(),
            ArgumentSlot::Pending { key, future } => async move {
                future
                    .await?
                    .ok_or(DispatchError::DependencyUnavailable { key })
            }
            .boxed(),
        })
        .collect();
    Ok(ResolvedArguments::Pending(
        async move { future::try_join_all(parts).await.map(Arguments::new) }.boxed(),
    ))
}
