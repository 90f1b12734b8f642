//! Operation dispatcher
//!
//! Executes exactly one operation against the shared state and the runtime
//! collaborators and returns its result for the waiting continuation. Fork,
//! Race and Recover hand their sub-programs back to the runner.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, trace};

use super::collaborators::UiRunner;
use super::runner::Runner;
use crate::domain::program::{erase, Erased, Operation};
use crate::domain::shared_state::SharedState;
use crate::types::Store;
use crate::FlowError;

/// Dispatches operations for one task of a run
pub(crate) struct Dispatcher<'a> {
    runner: &'a Runner,
    state: &'a SharedState,
}

impl<'a> Dispatcher<'a> {
    /// Create a dispatcher bound to a runner and a state container
    pub(crate) fn new(runner: &'a Runner, state: &'a SharedState) -> Self {
        Self { runner, state }
    }

    /// Execute one operation and produce the result its continuation expects
    pub(crate) async fn dispatch(&self, operation: Operation) -> Result<Erased, FlowError> {
        trace!(operation = operation.kind(), "Dispatching operation");

        let collaborators = self.runner.collaborators();

        match operation {
            Operation::CallApi { request } => Ok(erase(collaborators.api.call(request).await?)),

            Operation::RunUi { interaction } => {
                let request = encode_interaction(&interaction)?;
                let response = collaborators.ui.run(request).await?;
                Ok(erase(decode_ui_response(&response)?))
            }

            Operation::ForkUi { interaction } => {
                let request = encode_interaction(&interaction)?;
                spawn_background_ui(collaborators.ui.clone(), request);
                Ok(erase(()))
            }

            Operation::Read { store, key } => {
                let value = match store {
                    Store::Persistent => {
                        let sentinel = &self.runner.config().absent_sentinel;
                        collaborators
                            .storage
                            .get(&key)
                            .await?
                            .filter(|value| value != sentinel)
                    }
                    Store::Ephemeral => self.state.get_named(&key).await,
                };
                Ok(erase(value))
            }

            Operation::Write { store, key, value } => {
                match store {
                    Store::Persistent => collaborators.storage.set(&key, &value).await?,
                    Store::Ephemeral => self.state.update_named(key, value).await,
                }
                Ok(erase(()))
            }

            Operation::Delete { store, key } => {
                match store {
                    Store::Persistent => collaborators.storage.delete(&key).await?,
                    Store::Ephemeral => {
                        self.state.delete_named(&key).await;
                    }
                }
                Ok(erase(()))
            }

            Operation::ReadForeignAll => Ok(erase(self.state.read_foreign_all().await)),

            Operation::WriteForeign { key, value } => {
                self.state.write_foreign(key, value).await;
                Ok(erase(()))
            }

            Operation::Fork { program } => Ok(erase(self.runner.fork(*program, self.state))),

            Operation::RunExternalAsync { action } => Ok(erase(action.await?)),

            Operation::Await { handle } => {
                debug!(control_id = %handle.id(), "Awaiting forked program");
                Ok(erase(handle.wait().await?))
            }

            Operation::Delay { duration } => {
                tokio::time::sleep(duration).await;
                Ok(erase(()))
            }

            Operation::Race { programs } => {
                Ok(erase(self.runner.race(programs, self.state).await?))
            }

            Operation::Recover { program } => {
                Ok(erase(self.runner.recover(*program, self.state).await?))
            }

            Operation::CheckPermissions { permissions } => {
                Ok(erase(collaborators.permissions.check(&permissions).await?))
            }

            Operation::RequestPermissions { permissions } => {
                Ok(erase(collaborators.permissions.request(&permissions).await?))
            }

            Operation::Log { tag, message } => {
                info!(target: "flow", tag = %tag, "{}", message);
                Ok(erase(()))
            }
        }
    }
}

/// Serialize an interaction into the transport string the UI expects
pub fn encode_interaction(interaction: &Value) -> Result<String, FlowError> {
    Ok(serde_json::to_string(interaction)?)
}

/// Parse a UI response; malformed payloads become a decode error
pub fn decode_ui_response(response: &str) -> Result<Value, FlowError> {
    serde_json::from_str(response).map_err(|err| FlowError::decode(response, err))
}

fn spawn_background_ui(ui: Arc<dyn UiRunner>, request: String) {
    tokio::spawn(async move {
        // The launching program never observes this result.
        match ui.run(request).await {
            Ok(response) => {
                if let Err(err) = decode_ui_response(&response) {
                    debug!(error = %err, "Background UI interaction returned an undecodable response");
                }
            }
            Err(err) => debug!(error = %err, "Background UI interaction failed"),
        }
    });
}
