use crate::error::Result;
use crate::handler::Handler;
use crate::types::Value;
use futures::future::{BoxFuture, FutureExt};
use std::any::Any;
use std::fmt;
use std::future::Future;

/// What a handler method (or filter stage) returns
pub enum Reply {
    /// Ran, produced no value
    Nothing,
    /// Declined; the dispatcher moves on to the next candidate
    Unhandled,
    Value(Value),
    /// Several results; flattened unless the callback or binding is strict
    Many(Vec<Reply>),
    /// A result that settles later
    Pending(BoxFuture<'static, Result<Reply>>),
}

impl Reply {
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Reply::Value(Value::new(value))
    }

    /// Return a handler so it can be dispatched to as well as used as a value
    pub fn handler<H: Handler>(handler: H) -> Self {
        Reply::Value(Value::handler(handler))
    }

    pub fn many<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Reply>,
    {
        Reply::Many(replies.into_iter().collect())
    }

    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<Reply>> + Send + 'static,
    {
        Reply::Pending(future.boxed())
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Reply::Nothing)
    }

    pub fn is_unhandled(&self) -> bool {
        matches!(self, Reply::Unhandled)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Reply::Pending(_))
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Value(value)
    }
}

impl From<Option<Value>> for Reply {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Reply::Nothing, Reply::Value)
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Nothing => f.write_str("Nothing"),
            Reply::Unhandled => f.write_str("Unhandled"),
            Reply::Value(value) => write!(f, "{value:?}"),
            Reply::Many(replies) => f.debug_list().entries(replies).finish(),
            Reply::Pending(_) => f.write_str("Pending"),
        }
    }
}
