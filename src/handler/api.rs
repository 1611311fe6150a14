//! Convenience entry points over a composed handler.
//!
//! These are the only places `NotHandled` is raised: inside the dispatcher
//! an unhandled callback is just `false`.

use super::{Handler, HandlerRef};
use crate::binding::Constraint;
use crate::callback::{Callback, CallbackRef, CallbackResult, Command, Creation, Inquiry, Lookup};
use crate::error::{DispatchError, Result};
use crate::logging::{log_dispatch_operation, log_error};
use crate::types::TypeKey;
use std::any::Any;

pub trait HandlerExt {
    /// Dispatch with this handler as its own composer
    fn handle(&self, callback: &CallbackRef, greedy: bool) -> Result<bool>;

    /// Send a request to the first handler that accepts it
    fn send<T: Any + Send + Sync>(&self, request: T) -> Result<CallbackResult>;

    fn send_command(&self, command: Command) -> Result<CallbackResult>;

    /// Deliver a notification to every handler that accepts it
    fn publish<T: Any + Send + Sync>(&self, notification: T) -> Result<CallbackResult>;

    /// First value provided for `key`, `None` when nothing provides it
    fn resolve<K: Into<Constraint>>(&self, key: K) -> Result<Option<CallbackResult>>;

    /// Every value provided for `key`
    fn resolve_all<K: Into<Constraint>>(&self, key: K) -> Result<CallbackResult>;

    fn create<T: ?Sized + 'static>(&self) -> Result<CallbackResult>;

    /// Value registered under exactly `key`
    fn lookup<K: Into<Constraint>>(&self, key: K) -> Result<Option<CallbackResult>>;
}

impl HandlerExt for HandlerRef {
    fn handle(&self, callback: &CallbackRef, greedy: bool) -> Result<bool> {
        (**self).handle_callback(self, callback, greedy, self)
    }

    fn send<T: Any + Send + Sync>(&self, request: T) -> Result<CallbackResult> {
        self.send_command(Command::of(request))
    }

    fn send_command(&self, command: Command) -> Result<CallbackResult> {
        let greedy = command.is_many();
        let handled = dispatch_logged(self, "send", &command, greedy)?;
        if !handled {
            return Err(DispatchError::not_handled(
                command.describe(),
                Some(command.request().clone()),
            ));
        }
        Ok(command.result())
    }

    fn publish<T: Any + Send + Sync>(&self, notification: T) -> Result<CallbackResult> {
        self.send_command(Command::of(notification).many())
    }

    fn resolve<K: Into<Constraint>>(&self, key: K) -> Result<Option<CallbackResult>> {
        let inquiry = Inquiry::new(key)?;
        let handled = dispatch_logged(self, "resolve", &inquiry, false)?;
        Ok(handled.then(|| inquiry.result()))
    }

    fn resolve_all<K: Into<Constraint>>(&self, key: K) -> Result<CallbackResult> {
        let inquiry = Inquiry::builder(key).many(true).build()?;
        dispatch_logged(self, "resolve_all", &inquiry, true)?;
        Ok(inquiry.result())
    }

    fn create<T: ?Sized + 'static>(&self) -> Result<CallbackResult> {
        let creation = Creation::new(TypeKey::of::<T>());
        let handled = dispatch_logged(self, "create", &creation, false)?;
        if !handled {
            return Err(DispatchError::not_handled(creation.describe(), None));
        }
        Ok(creation.result())
    }

    fn lookup<K: Into<Constraint>>(&self, key: K) -> Result<Option<CallbackResult>> {
        let lookup = Lookup::new(key)?;
        let handled = dispatch_logged(self, "lookup", &lookup, false)?;
        Ok(handled.then(|| lookup.result()))
    }
}

fn dispatch_logged(
    handler: &HandlerRef,
    operation: &str,
    callback: &dyn Callback,
    greedy: bool,
) -> Result<bool> {
    let description = callback.describe();
    let handled = handler
        .handle(&callback.clone_ref(), greedy)
        .inspect_err(|error| {
            log_error("dispatch", operation, &error.to_string(), Some(description.as_str()));
        })?;
    let callback_id = callback.id().to_string();
    log_dispatch_operation(
        operation,
        callback.policy().name(),
        &description,
        handled,
        Some(callback_id.as_str()),
    );
    Ok(handled)
}
