//! UI collaborator that replays scripted responses.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

use flow_core::{CollaboratorKind, FlowError, UiRunner};

struct Script {
    responses: VecDeque<Result<String, FlowError>>,
    fallback: Option<String>,
}

/// Fake UI that answers each request with the next scripted response
///
/// Once the script is exhausted the fallback answers; with no fallback the
/// call fails with a UI collaborator error.
pub struct ScriptedUi {
    script: Mutex<Script>,
    requests: Mutex<Vec<String>>,
    latency: Option<Duration>,
    received: Notify,
}

impl ScriptedUi {
    /// Fake with the given responses in order
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(Script {
                responses: responses.into_iter().map(|r| Ok(r.into())).collect(),
                fallback: None,
            }),
            requests: Mutex::new(Vec::new()),
            latency: None,
            received: Notify::new(),
        }
    }

    /// Fake that answers every request with `response`
    pub fn always(response: impl Into<String>) -> Self {
        Self::new(Vec::<String>::new()).with_fallback(response)
    }

    /// Answer with `response` once the script runs out
    pub fn with_fallback(self, response: impl Into<String>) -> Self {
        self.script.lock().fallback = Some(response.into());
        self
    }

    /// Queue a failure as the next scripted answer
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.script
            .lock()
            .responses
            .push_back(Err(FlowError::collaborator(CollaboratorKind::Ui, message)));
        self
    }

    /// Sleep this long before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    /// Wait until at least `count` requests have been received
    pub async fn wait_for_requests(&self, count: usize) {
        loop {
            let notified = self.received.notified();
            if self.requests.lock().len() >= count {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl UiRunner for ScriptedUi {
    async fn run(&self, request: String) -> Result<String, FlowError> {
        debug!(request = %request, "Scripted UI received request");
        self.requests.lock().push(request);
        self.received.notify_waiters();

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut script = self.script.lock();
        match script.responses.pop_front() {
            Some(response) => response,
            None => script.fallback.clone().ok_or_else(|| {
                FlowError::collaborator(CollaboratorKind::Ui, "ui script exhausted")
            }),
        }
    }
}
