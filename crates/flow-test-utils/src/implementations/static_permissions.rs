//! Permission collaborator with a fixed grant set.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;

use flow_core::{
    FlowError, Permission, PermissionProvider, PermissionResponse, PermissionStatus,
};

/// Fake permission provider
///
/// `check` reports `Granted` only when every asked permission is in the
/// grant set. `request` grants what was asked when `grant_on_request` is set
/// and otherwise answers from the grant set.
#[derive(Default)]
pub struct StaticPermissions {
    granted: Mutex<HashSet<Permission>>,
    grant_on_request: bool,
    requested: Mutex<Vec<Permission>>,
}

impl StaticPermissions {
    /// Provider with the given permissions already granted
    pub fn granting<I: IntoIterator<Item = Permission>>(permissions: I) -> Self {
        Self {
            granted: Mutex::new(permissions.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Provider that grants anything requested
    pub fn grant_on_request(mut self) -> Self {
        self.grant_on_request = true;
        self
    }

    /// Permissions passed to `request` so far
    pub fn requested(&self) -> Vec<Permission> {
        self.requested.lock().clone()
    }
}

#[async_trait]
impl PermissionProvider for StaticPermissions {
    async fn check(&self, permissions: &[Permission]) -> Result<PermissionStatus, FlowError> {
        let granted = self.granted.lock();
        if permissions.iter().all(|p| granted.contains(p)) {
            Ok(PermissionStatus::Granted)
        } else {
            Ok(PermissionStatus::Declined)
        }
    }

    async fn request(
        &self,
        permissions: &[Permission],
    ) -> Result<Vec<PermissionResponse>, FlowError> {
        self.requested.lock().extend_from_slice(permissions);

        let mut granted = self.granted.lock();
        Ok(permissions
            .iter()
            .map(|permission| {
                if self.grant_on_request {
                    granted.insert(*permission);
                }
                let status = if granted.contains(permission) {
                    PermissionStatus::Granted
                } else {
                    PermissionStatus::Declined
                };
                PermissionResponse {
                    permission: *permission,
                    status,
                }
            })
            .collect())
    }
}
