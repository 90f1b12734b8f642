//! Write-once control handles delivering the result of a forked program.

use serde_json::Value;
use std::fmt;
use tokio::sync::watch;
use uuid::Uuid;

use crate::FlowError;

type Slot = Option<Result<Value, FlowError>>;

/// Read side of a fork's result cell
///
/// Clones observe the same cell. Awaiting before the fork completes suspends
/// until the result lands; there is no timeout.
#[derive(Clone)]
pub struct Control {
    id: Uuid,
    receiver: watch::Receiver<Slot>,
}

/// Write side of a fork's result cell, consumed by the single fill
pub struct ControlSlot {
    id: Uuid,
    sender: watch::Sender<Slot>,
}

/// Create an unpopulated handle pair
pub fn control_channel() -> (ControlSlot, Control) {
    let id = Uuid::new_v4();
    let (sender, receiver) = watch::channel(None);
    (ControlSlot { id, sender }, Control { id, receiver })
}

impl ControlSlot {
    /// Id shared with the read side
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Populate the cell. Taking `self` makes a second fill impossible.
    pub fn fill(self, result: Result<Value, FlowError>) {
        // Stored even when every reader is gone.
        self.sender.send_replace(Some(result));
    }
}

impl Control {
    /// Id used to correlate the fork in logs
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether the forked program has completed
    pub fn is_filled(&self) -> bool {
        self.receiver.borrow().is_some()
    }

    /// Current result without waiting
    pub fn try_get(&self) -> Option<Result<Value, FlowError>> {
        self.receiver.borrow().clone()
    }

    /// Wait for the forked program's result
    pub async fn wait(&self) -> Result<Value, FlowError> {
        let mut receiver = self.receiver.clone();
        let filled = receiver
            .wait_for(Option::is_some)
            .await
            .map_err(|_| FlowError::ForkAbandoned(self.id.to_string()))?;
        filled
            .clone()
            .unwrap_or_else(|| Err(FlowError::ForkAbandoned(self.id.to_string())))
    }
}

impl fmt::Debug for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Control")
            .field("id", &self.id)
            .field("filled", &self.is_filled())
            .finish()
    }
}
