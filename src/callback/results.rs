//! # Result Accumulation
//!
//! Ordered collection of the values produced while dispatching one callback.
//!
//! ## Overview
//!
//! Synchronous values are stored directly. A pending reply reserves its slot
//! at the moment it is received, so the final ordering follows dispatch
//! order rather than completion order. Reading the result unifies the slots:
//! ready when every slot is ready, otherwise a shared future that joins the
//! pending slots. The unified result is memoized per `many` flag and the
//! memo is dropped on every addition.

use super::Reply;
use crate::error::Result;
use crate::handler::HandlerRef;
use crate::types::Value;
use futures::future::{self, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// The unified value of a callback once every pending slot settled
#[derive(Debug, Clone)]
pub enum Settled {
    One(Option<Value>),
    Many(Vec<Value>),
}

impl Settled {
    /// First value, for either shape
    pub fn value(&self) -> Option<&Value> {
        match self {
            Settled::One(value) => value.as_ref(),
            Settled::Many(values) => values.first(),
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Settled::One(value) => value,
            Settled::Many(values) => values.into_iter().next(),
        }
    }

    pub fn into_values(self) -> Vec<Value> {
        match self {
            Settled::One(value) => value.into_iter().collect(),
            Settled::Many(values) => values,
        }
    }
}

pub type PendingResult = Shared<BoxFuture<'static, Result<Settled>>>;

/// A callback result, available now or later
#[derive(Clone)]
pub enum CallbackResult {
    Ready(Settled),
    Pending(PendingResult),
}

impl CallbackResult {
    pub fn empty() -> Self {
        CallbackResult::Ready(Settled::One(None))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, CallbackResult::Pending(_))
    }

    pub fn ready(&self) -> Option<&Settled> {
        match self {
            CallbackResult::Ready(settled) => Some(settled),
            CallbackResult::Pending(_) => None,
        }
    }

    /// Wait for the result
    pub async fn settle(self) -> Result<Settled> {
        match self {
            CallbackResult::Ready(settled) => Ok(settled),
            CallbackResult::Pending(pending) => pending.await,
        }
    }

    /// Identity comparison, used to observe memoization
    pub fn ptr_eq(&self, other: &CallbackResult) -> bool {
        match (self, other) {
            (CallbackResult::Pending(a), CallbackResult::Pending(b)) => a.ptr_eq(b),
            (CallbackResult::Ready(Settled::One(a)), CallbackResult::Ready(Settled::One(b))) => {
                match (a, b) {
                    (Some(a), Some(b)) => a.ptr_eq(b),
                    (None, None) => true,
                    _ => false,
                }
            }
            (CallbackResult::Ready(Settled::Many(a)), CallbackResult::Ready(Settled::Many(b))) => {
                a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.ptr_eq(b))
            }
            _ => false,
        }
    }
}

impl fmt::Debug for CallbackResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackResult::Ready(settled) => write!(f, "Ready({settled:?})"),
            CallbackResult::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// Outcome of offering a value to a [`ResultAcceptor`]
pub enum Acceptance {
    /// Keep this value as a result
    Store(Value),
    /// Counts as handled, nothing is stored
    Absorbed,
    Rejected,
}

/// Hook deciding what happens to each produced value before it is stored
pub trait ResultAcceptor: Send + Sync {
    fn accept(&self, value: Value, composer: &HandlerRef) -> Result<Acceptance>;
}

type SlotFuture = Shared<BoxFuture<'static, Result<Vec<Value>>>>;

#[derive(Clone)]
enum Slot {
    Ready(Value),
    Pending(SlotFuture),
}

#[derive(Default)]
struct ResultState {
    slots: Vec<Slot>,
    memo: [Option<CallbackResult>; 2],
}

/// Shared result storage of one callback
#[derive(Clone, Default)]
pub struct ResultSet {
    state: Arc<Mutex<ResultState>>,
    acceptor: Option<Arc<dyn ResultAcceptor>>,
    swallow_pending_errors: bool,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_acceptor(mut self, acceptor: Arc<dyn ResultAcceptor>) -> Self {
        self.acceptor = Some(acceptor);
        self
    }

    /// Failed pending results settle to nothing instead of failing the callback
    pub fn swallow_pending_errors(mut self) -> Self {
        self.swallow_pending_errors = true;
        self
    }

    /// Stored plus reserved results
    pub fn count(&self) -> usize {
        self.state.lock().slots.len()
    }

    pub fn has_pending(&self) -> bool {
        self.state
            .lock()
            .slots
            .iter()
            .any(|slot| matches!(slot, Slot::Pending(_)))
    }

    /// Take in one reply. Returns whether anything was added (or absorbed).
    ///
    /// Non-strict lists are flattened, strict lists are stored as one
    /// result. Pending replies are refused outright when `instant`.
    pub fn receive(
        &self,
        reply: Reply,
        strict: bool,
        instant: bool,
        composer: &HandlerRef,
    ) -> Result<bool> {
        match reply {
            Reply::Nothing | Reply::Unhandled => Ok(false),
            Reply::Value(value) => self.add_value(value, composer),
            Reply::Many(replies) if !strict => {
                let mut added = false;
                for reply in replies {
                    if self.receive(reply, strict, instant, composer)? {
                        added = true;
                    }
                }
                Ok(added)
            }
            Reply::Many(replies) => match ready_values(&replies) {
                Some(values) => self.add_value(Value::list(values), composer),
                None if instant => Ok(false),
                None => self.add_pending(Reply::Many(replies), strict, composer),
            },
            Reply::Pending(_) if instant => {
                debug!("Refused pending result for an instant callback");
                Ok(false)
            }
            pending @ Reply::Pending(_) => self.add_pending(pending, strict, composer),
        }
    }

    pub fn add_value(&self, value: Value, composer: &HandlerRef) -> Result<bool> {
        let acceptance = match &self.acceptor {
            Some(acceptor) => acceptor.accept(value, composer)?,
            None => Acceptance::Store(value),
        };
        match acceptance {
            Acceptance::Store(value) => {
                let mut state = self.state.lock();
                state.slots.push(Slot::Ready(value));
                state.memo = Default::default();
                Ok(true)
            }
            Acceptance::Absorbed => Ok(true),
            Acceptance::Rejected => Ok(false),
        }
    }

    fn add_pending(&self, reply: Reply, strict: bool, composer: &HandlerRef) -> Result<bool> {
        let settling = settle_reply(reply, strict, self.acceptor.clone(), composer.clone());
        let settling = if self.swallow_pending_errors {
            async move {
                match settling.await {
                    Ok(values) => Ok(values),
                    Err(error) => {
                        debug!(error = %error, "Discarding failed pending result");
                        Ok(Vec::new())
                    }
                }
            }
            .boxed()
        } else {
            settling
        };

        let mut state = self.state.lock();
        state.slots.push(Slot::Pending(settling.shared()));
        state.memo = Default::default();
        Ok(true)
    }

    /// Unified result, memoized until the next addition
    pub fn get(&self, many: bool) -> CallbackResult {
        let mut state = self.state.lock();
        if let Some(memo) = &state.memo[usize::from(many)] {
            return memo.clone();
        }

        let ready: Option<Vec<Value>> = state
            .slots
            .iter()
            .map(|slot| match slot {
                Slot::Ready(value) => Some(value.clone()),
                Slot::Pending(_) => None,
            })
            .collect();

        let result = match ready {
            Some(values) => CallbackResult::Ready(unify(values, many)),
            None => {
                let slots: Vec<BoxFuture<'static, Result<Vec<Value>>>> = state
                    .slots
                    .iter()
                    .map(|slot| match slot {
                        Slot::Ready(value) => future::ready(Ok(vec![value.clone()])).boxed(),
                        Slot::Pending(pending) => pending.clone().boxed(),
                    })
                    .collect();
                let joined = async move {
                    let mut values = Vec::new();
                    for part in future::join_all(slots).await {
                        values.extend(part?);
                    }
                    Ok(unify(values, many))
                };
                CallbackResult::Pending(joined.boxed().shared())
            }
        };

        state.memo[usize::from(many)] = Some(result.clone());
        result
    }

    /// Override the unified result for both shapes
    pub fn set(&self, result: CallbackResult) {
        let mut state = self.state.lock();
        state.memo = [Some(result.clone()), Some(result)];
    }
}

fn unify(values: Vec<Value>, many: bool) -> Settled {
    if many {
        Settled::Many(values)
    } else {
        Settled::One(values.into_iter().next())
    }
}

/// Values of a list whose members are all immediately available
fn ready_values(replies: &[Reply]) -> Option<Vec<Value>> {
    let mut values = Vec::with_capacity(replies.len());
    for reply in replies {
        match reply {
            Reply::Value(value) => values.push(value.clone()),
            Reply::Nothing | Reply::Unhandled => {}
            Reply::Many(_) | Reply::Pending(_) => return None,
        }
    }
    Some(values)
}

fn accept_settled(
    value: Value,
    acceptor: Option<&dyn ResultAcceptor>,
    composer: &HandlerRef,
) -> Result<Vec<Value>> {
    match acceptor {
        None => Ok(vec![value]),
        Some(acceptor) => match acceptor.accept(value, composer)? {
            Acceptance::Store(value) => Ok(vec![value]),
            Acceptance::Absorbed | Acceptance::Rejected => Ok(Vec::new()),
        },
    }
}

/// Resolve a reply to the values it contributes, applying the same rules
/// as synchronous receipt
fn settle_reply(
    reply: Reply,
    strict: bool,
    acceptor: Option<Arc<dyn ResultAcceptor>>,
    composer: HandlerRef,
) -> BoxFuture<'static, Result<Vec<Value>>> {
    async move {
        match reply {
            Reply::Nothing | Reply::Unhandled => Ok(Vec::new()),
            Reply::Value(value) => accept_settled(value, acceptor.as_deref(), &composer),
            Reply::Pending(pending) => {
                let next = pending.await?;
                settle_reply(next, strict, acceptor, composer).await
            }
            Reply::Many(replies) if strict => {
                let mut values = Vec::new();
                for reply in replies {
                    values.extend(settle_reply(reply, false, None, composer.clone()).await?);
                }
                accept_settled(Value::list(values), acceptor.as_deref(), &composer)
            }
            Reply::Many(replies) => {
                let parts = future::join_all(
                    replies
                        .into_iter()
                        .map(|reply| settle_reply(reply, strict, acceptor.clone(), composer.clone())),
                )
                .await;
                let mut values = Vec::new();
                for part in parts {
                    values.extend(part?);
                }
                Ok(values)
            }
        }
    }
    .boxed()
}

impl fmt::Debug for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSet")
            .field("count", &self.count())
            .field("pending", &self.has_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DispatchError;
    use crate::handler::CompositeHandler;

    fn composer() -> HandlerRef {
        Arc::new(CompositeHandler::new())
    }

    #[test]
    fn test_memoized_until_next_addition() {
        let results = ResultSet::new();
        let composer = composer();
        results.add_value(Value::new("first"), &composer).unwrap();

        let once = results.get(true);
        let twice = results.get(true);
        assert!(once.ptr_eq(&twice));

        results.add_value(Value::new("second"), &composer).unwrap();
        let after = results.get(true);
        assert!(!after.ptr_eq(&once));
        assert_eq!(after.ready().map(|s| s.clone().into_values().len()), Some(2));
    }

    #[test]
    fn test_nothing_is_ignored_and_lists_flatten() {
        let results = ResultSet::new();
        let composer = composer();
        assert!(!results.receive(Reply::Nothing, false, false, &composer).unwrap());
        let list = Reply::many([Reply::value(1_i32), Reply::Nothing, Reply::value(2_i32)]);
        assert!(results.receive(list, false, false, &composer).unwrap());
        assert_eq!(results.count(), 2);

        let strict = Reply::many([Reply::value(3_i32), Reply::value(4_i32)]);
        assert!(results.receive(strict, true, false, &composer).unwrap());
        assert_eq!(results.count(), 3);
    }

    #[test]
    fn test_instant_refuses_pending() {
        let results = ResultSet::new();
        let pending = Reply::pending(async { Ok(Reply::value(1_i32)) });
        assert!(!results.receive(pending, false, true, &composer()).unwrap());
        assert_eq!(results.count(), 0);
    }

    #[tokio::test]
    async fn test_pending_slots_keep_dispatch_order() {
        let results = ResultSet::new();
        let composer = composer();
        let slow = Reply::pending(async {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            Ok(Reply::value("a"))
        });
        results.receive(slow, false, false, &composer).unwrap();
        results.receive(Reply::value("b"), false, false, &composer).unwrap();

        let result = results.get(true);
        assert!(result.is_pending());
        let values = result.settle().await.unwrap().into_values();
        let letters: Vec<&str> = values.iter().filter_map(|v| v.downcast_ref::<&str>().copied()).collect();
        assert_eq!(letters, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_swallowed_pending_errors() {
        let results = ResultSet::new().swallow_pending_errors();
        let failing = Reply::pending(async { Err(DispatchError::handler(anyhow::anyhow!("boom"))) });
        results.receive(failing, false, false, &composer()).unwrap();
        let settled = results.get(false).settle().await.unwrap();
        assert!(settled.value().is_none());
    }

    #[tokio::test]
    async fn test_pending_errors_propagate_by_default() {
        let results = ResultSet::new();
        let failing = Reply::pending(async { Err(DispatchError::handler(anyhow::anyhow!("boom"))) });
        results.receive(failing, false, false, &composer()).unwrap();
        let error = results.get(false).settle().await.unwrap_err();
        assert!(error.to_string().contains("boom"));
    }
}
