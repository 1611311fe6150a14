//! Filter pipeline as an explicit continuation.
//!
//! A [`FilterContext`] holds the remaining stages (by position) and the
//! invocation they apply to. Proceeding advances the position; the
//! terminal position invokes the binding itself. Abort, or a stage whose
//! arguments cannot be resolved, marks the whole invocation not completed.

use super::Filter;
use crate::binding::Binding;
use crate::callback::{CallbackRef, Reply};
use crate::dispatch::{invoke_direct, resolve_signature, InvocationContext, ResolvedArguments};
use crate::error::Result;
use crate::handler::HandlerRef;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

struct PipelineState {
    stages: Vec<Arc<dyn Filter>>,
    completed: AtomicBool,
}

pub struct Pipeline {
    state: Arc<PipelineState>,
    invocation: InvocationContext,
}

impl Pipeline {
    pub fn new(stages: Vec<Arc<dyn Filter>>, invocation: InvocationContext) -> Self {
        Self {
            state: Arc::new(PipelineState {
                stages,
                completed: AtomicBool::new(true),
            }),
            invocation,
        }
    }

    /// Run every stage and the binding. The flag is false when a stage
    /// aborted or the pipeline could not be completed.
    pub fn run(self) -> Result<(bool, Reply)> {
        let start = FilterContext {
            state: self.state.clone(),
            position: 0,
            invocation: self.invocation,
        };
        let reply = start.invoke()?;
        Ok((self.state.completed.load(Ordering::SeqCst), reply))
    }
}

/// Continuation handed to each filter stage
#[derive(Clone)]
pub struct FilterContext {
    state: Arc<PipelineState>,
    position: usize,
    invocation: InvocationContext,
}

impl FilterContext {
    /// Continue with the next stage
    pub fn proceed(&self) -> Result<Reply> {
        self.next(None, true)
    }

    /// Continue with `composer` as the composing handler for the rest of
    /// the pipeline
    pub fn proceed_with(&self, composer: HandlerRef) -> Result<Reply> {
        self.next(Some(composer), true)
    }

    pub fn next(&self, composer: Option<HandlerRef>, proceed: bool) -> Result<Reply> {
        if !proceed {
            return Ok(self.abort());
        }
        let invocation = match composer {
            Some(composer) => self.invocation.with_composer(composer),
            None => self.invocation.clone(),
        };
        FilterContext {
            state: self.state.clone(),
            position: self.position + 1,
            invocation,
        }
        .invoke()
    }

    /// Short-circuit the pipeline; the binding counts as not invoked
    pub fn abort(&self) -> Reply {
        self.state.completed.store(false, Ordering::SeqCst);
        Reply::Unhandled
    }

    pub fn invocation(&self) -> &InvocationContext {
        &self.invocation
    }

    pub fn binding(&self) -> &Arc<Binding> {
        self.invocation.binding()
    }

    pub fn callback(&self) -> &CallbackRef {
        self.invocation.callback()
    }

    pub fn composer(&self) -> &HandlerRef {
        self.invocation.composer()
    }

    pub fn greedy(&self) -> bool {
        self.invocation.greedy()
    }

    fn invoke(self) -> Result<Reply> {
        let Some(stage) = self.state.stages.get(self.position).cloned() else {
            return self.invoke_binding();
        };
        let resolved = resolve_signature(
            stage.signature(),
            self.invocation.callback(),
            self.invocation.composer(),
        )?;
        match resolved {
            ResolvedArguments::Missing => {
                trace!(position = self.position, "Filter arguments unavailable");
                Ok(self.abort())
            }
            ResolvedArguments::Ready(arguments) => stage.next(&arguments, self),
            ResolvedArguments::Pending(arguments) => Ok(Reply::pending(async move {
                let arguments = arguments.await?;
                stage.next(&arguments, self)
            })),
        }
    }

    fn invoke_binding(self) -> Result<Reply> {
        let binding = self.invocation.binding().clone();
        let handler = self.invocation.handler().clone();
        let (completed, reply) = invoke_direct(&binding, &handler, &self.invocation)?;
        if !completed {
            self.state.completed.store(false, Ordering::SeqCst);
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Constraint;
    use crate::callback::{Callback, Command};
    use crate::dispatch::Arguments;
    use crate::handler::CompositeHandler;
    use parking_lot::Mutex;

    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        abort: bool,
    }

    impl Filter for Recording {
        fn next(&self, _arguments: &Arguments, context: FilterContext) -> Result<Reply> {
            self.log.lock().push(self.name);
            if self.abort {
                return Ok(context.abort());
            }
            context.proceed()
        }
    }

    fn invocation(log: Arc<Mutex<Vec<&'static str>>>) -> InvocationContext {
        let binding = Binding::builder(Constraint::of::<u32>())
            .function(move |_, _| {
                log.lock().push("binding");
                Ok(Reply::value("done"))
            })
            .build()
            .unwrap();
        let handler: HandlerRef = Arc::new(CompositeHandler::new());
        InvocationContext::new(
            Constraint::of::<u32>(),
            Arc::new(binding),
            Command::of(1_u32).clone_ref(),
            handler.clone(),
            handler,
            false,
        )
    }

    fn stage(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>, abort: bool) -> Arc<dyn Filter> {
        Arc::new(Recording {
            name,
            log: log.clone(),
            abort,
        })
    }

    #[test]
    fn test_stages_wrap_binding_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(
            vec![stage("outer", &log, false), stage("inner", &log, false)],
            invocation(log.clone()),
        );
        let (completed, reply) = pipeline.run().unwrap();
        assert!(completed);
        assert!(matches!(reply, Reply::Value(_)));
        assert_eq!(*log.lock(), vec!["outer", "inner", "binding"]);
    }

    #[test]
    fn test_abort_marks_not_completed() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(
            vec![stage("guard", &log, true), stage("inner", &log, false)],
            invocation(log.clone()),
        );
        let (completed, reply) = pipeline.run().unwrap();
        assert!(!completed);
        assert!(reply.is_unhandled());
        assert_eq!(*log.lock(), vec!["guard"]);
    }
}
