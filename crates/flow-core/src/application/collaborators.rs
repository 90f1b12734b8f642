//! Host-supplied runtime collaborators
//!
//! The core never performs UI, network, permission or durable storage work
//! itself. Each of those effects is delegated to a provider handed to the
//! runner at startup.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::CollaboratorKind;
use crate::types::{ApiRequest, ApiResponse, Permission, PermissionResponse, PermissionStatus};
use crate::FlowError;

/// Executes serialized UI interactions
#[async_trait]
pub trait UiRunner: Send + Sync {
    /// Run one interaction and return the host's raw response
    async fn run(&self, request: String) -> Result<String, FlowError>;
}

/// Executes API requests
#[async_trait]
pub trait ApiRunner: Send + Sync {
    /// Execute a request
    async fn call(&self, request: ApiRequest) -> Result<ApiResponse, FlowError>;
}

/// Checks and requests platform permissions
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Whether all the given permissions are granted
    async fn check(&self, permissions: &[Permission]) -> Result<PermissionStatus, FlowError>;

    /// Ask the host to grant the given permissions
    async fn request(
        &self,
        permissions: &[Permission],
    ) -> Result<Vec<PermissionResponse>, FlowError>;
}

/// Durable key-value storage
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Get a value
    async fn get(&self, key: &str) -> Result<Option<String>, FlowError>;

    /// Set a value
    async fn set(&self, key: &str, value: &str) -> Result<(), FlowError>;

    /// Delete a value
    async fn delete(&self, key: &str) -> Result<(), FlowError>;
}

/// The set of providers a runner delegates effects to
#[derive(Clone)]
pub struct Collaborators {
    /// UI provider
    pub ui: Arc<dyn UiRunner>,
    /// API provider
    pub api: Arc<dyn ApiRunner>,
    /// Permission provider
    pub permissions: Arc<dyn PermissionProvider>,
    /// Persistent storage provider
    pub storage: Arc<dyn PersistentStore>,
}

impl Collaborators {
    /// Bundle the four providers
    pub fn new(
        ui: Arc<dyn UiRunner>,
        api: Arc<dyn ApiRunner>,
        permissions: Arc<dyn PermissionProvider>,
        storage: Arc<dyn PersistentStore>,
    ) -> Self {
        Self {
            ui,
            api,
            permissions,
            storage,
        }
    }

    /// Start a builder where every provider defaults to `Unconfigured`
    pub fn builder() -> CollaboratorsBuilder {
        CollaboratorsBuilder::default()
    }
}

/// Builder for [`Collaborators`]
#[derive(Default)]
pub struct CollaboratorsBuilder {
    ui: Option<Arc<dyn UiRunner>>,
    api: Option<Arc<dyn ApiRunner>>,
    permissions: Option<Arc<dyn PermissionProvider>>,
    storage: Option<Arc<dyn PersistentStore>>,
}

impl CollaboratorsBuilder {
    /// Set the UI provider
    pub fn ui(mut self, ui: Arc<dyn UiRunner>) -> Self {
        self.ui = Some(ui);
        self
    }

    /// Set the API provider
    pub fn api(mut self, api: Arc<dyn ApiRunner>) -> Self {
        self.api = Some(api);
        self
    }

    /// Set the permission provider
    pub fn permissions(mut self, permissions: Arc<dyn PermissionProvider>) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// Set the persistent storage provider
    pub fn storage(mut self, storage: Arc<dyn PersistentStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Build, filling gaps with [`Unconfigured`]
    pub fn build(self) -> Collaborators {
        let missing = Arc::new(Unconfigured);
        Collaborators {
            ui: self.ui.unwrap_or_else(|| missing.clone() as Arc<dyn UiRunner>),
            api: self.api.unwrap_or_else(|| missing.clone() as Arc<dyn ApiRunner>),
            permissions: self
                .permissions
                .unwrap_or_else(|| missing.clone() as Arc<dyn PermissionProvider>),
            storage: self.storage.unwrap_or(missing),
        }
    }
}

/// Stand-in for a provider the host did not supply; every call fails
#[derive(Debug, Default, Clone, Copy)]
pub struct Unconfigured;

fn not_configured(kind: CollaboratorKind) -> FlowError {
    FlowError::collaborator(kind, format!("no {} collaborator configured", kind))
}

#[async_trait]
impl UiRunner for Unconfigured {
    async fn run(&self, _request: String) -> Result<String, FlowError> {
        Err(not_configured(CollaboratorKind::Ui))
    }
}

#[async_trait]
impl ApiRunner for Unconfigured {
    async fn call(&self, _request: ApiRequest) -> Result<ApiResponse, FlowError> {
        Err(not_configured(CollaboratorKind::Api))
    }
}

#[async_trait]
impl PermissionProvider for Unconfigured {
    async fn check(&self, _permissions: &[Permission]) -> Result<PermissionStatus, FlowError> {
        Err(not_configured(CollaboratorKind::Permissions))
    }

    async fn request(
        &self,
        _permissions: &[Permission],
    ) -> Result<Vec<PermissionResponse>, FlowError> {
        Err(not_configured(CollaboratorKind::Permissions))
    }
}

#[async_trait]
impl PersistentStore for Unconfigured {
    async fn get(&self, _key: &str) -> Result<Option<String>, FlowError> {
        Err(not_configured(CollaboratorKind::Storage))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), FlowError> {
        Err(not_configured(CollaboratorKind::Storage))
    }

    async fn delete(&self, _key: &str) -> Result<(), FlowError> {
        Err(not_configured(CollaboratorKind::Storage))
    }
}
