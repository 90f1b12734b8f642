//! Runner: drives Flow programs to completion
//!
//! The runner pulls one operation at a time from a program's cursor and hands
//! it to the dispatcher, looping until the program finishes or fails. Fork and
//! Race branches run as separate tokio tasks that share the caller's state
//! container. Nothing launched here is ever cancelled: forked tasks and race
//! losers keep running after their result stops mattering.

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, debug_span, info, info_span, warn, Instrument};

use super::collaborators::Collaborators;
use super::dispatcher::Dispatcher;
use crate::config::RunnerConfig;
use crate::domain::control::{control_channel, Control};
use crate::domain::program::{Advance, Cursor, Flow};
use crate::domain::shared_state::SharedState;
use crate::types::{Outcome, RunId};
use crate::FlowError;

/// Interpreter for Flow programs
#[derive(Clone)]
pub struct Runner {
    collaborators: Collaborators,
    config: Arc<RunnerConfig>,
}

impl Runner {
    /// Create a runner over the given collaborators
    pub fn new(collaborators: Collaborators, config: RunnerConfig) -> Self {
        Self {
            collaborators,
            config: Arc::new(config),
        }
    }

    /// Collaborators effects are delegated to
    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Runner configuration
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run a program with a fresh state container
    pub async fn run<T: Send + 'static>(&self, flow: Flow<T>) -> Result<T, FlowError> {
        self.run_with_state(flow, SharedState::new()).await
    }

    /// Run a program against a host-supplied state container
    pub async fn run_with_state<T: Send + 'static>(
        &self,
        flow: Flow<T>,
        state: SharedState,
    ) -> Result<T, FlowError> {
        let run_id = RunId::new();
        let span = info_span!("flow_run", run_id = %run_id, runner = %self.config.name);

        async move {
            debug!("Flow run started");
            let result = self.drive(flow, state).await;
            match &result {
                Ok(_) => info!("Flow run completed"),
                Err(err) => warn!(error = %err, "Flow run failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Step a program until it finishes or fails
    pub(crate) fn drive<T: Send + 'static>(
        &self,
        flow: Flow<T>,
        state: SharedState,
    ) -> BoxFuture<'_, Result<T, FlowError>> {
        Box::pin(async move {
            let dispatcher = Dispatcher::new(self, &state);
            let mut cursor = Cursor::new(flow);
            loop {
                match cursor.advance() {
                    Advance::Finished(result) => return result,
                    Advance::Execute(operation) => {
                        let result = dispatcher.dispatch(operation).await?;
                        cursor.resume(result);
                    }
                }
            }
        })
    }

    /// Launch `program` as its own task; the handle is returned immediately
    pub(crate) fn fork(&self, program: Flow<Value>, state: &SharedState) -> Control {
        let (slot, control) = control_channel();
        let runner = self.clone();
        let state = state.clone();
        let span = debug_span!("fork", control_id = %slot.id());

        tokio::spawn(
            async move {
                let result = runner.drive(program, state).await;
                if let Err(err) = &result {
                    debug!(error = %err, "Forked program failed");
                }
                slot.fill(result);
            }
            .instrument(span),
        );

        control
    }

    /// Run every branch concurrently and return the first success
    ///
    /// Failed branches do not end the race while others are still running;
    /// when all of them fail the last failure is returned. Losing branches are
    /// detached, not cancelled.
    pub(crate) async fn race(
        &self,
        programs: Vec<Flow<Value>>,
        state: &SharedState,
    ) -> Result<Value, FlowError> {
        if programs.is_empty() {
            return Err(FlowError::EmptyRace);
        }

        let mut branches: FuturesUnordered<_> = programs
            .into_iter()
            .enumerate()
            .map(|(index, program)| {
                let runner = self.clone();
                let state = state.clone();
                let span = debug_span!("race_branch", branch = index);
                tokio::spawn(
                    async move { (index, runner.drive(program, state).await) }.instrument(span),
                )
            })
            .collect();

        let mut last_error = FlowError::EmptyRace;
        while let Some(joined) = branches.next().await {
            match joined {
                Ok((index, Ok(value))) => {
                    debug!(branch = index, still_running = branches.len(), "Race won");
                    return Ok(value);
                }
                Ok((index, Err(err))) => {
                    debug!(branch = index, error = %err, "Race branch failed");
                    last_error = err;
                }
                Err(join_error) => last_error = FlowError::TaskFailed(join_error.to_string()),
            }
        }

        Err(last_error)
    }

    /// Run `program` behind a recovery boundary
    ///
    /// The outer `Result` aborts the enclosing run (explicit `Fail`); the
    /// inner one is handed to the continuation.
    pub(crate) async fn recover(
        &self,
        program: Flow<Outcome>,
        state: &SharedState,
    ) -> Result<Result<Value, FlowError>, FlowError> {
        match self.drive(program, state.clone()).await {
            Ok(Outcome::Succeed(value)) => Ok(Ok(value)),
            Ok(Outcome::Fail(message)) => Err(FlowError::Explicit(message)),
            Err(err) => {
                debug!(error = %err, "Failure absorbed at recovery boundary");
                Ok(Err(err))
            }
        }
    }
}
