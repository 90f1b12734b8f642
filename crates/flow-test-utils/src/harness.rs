//! Runner harness wired with in-process fakes.

use std::sync::Arc;

use flow_core::{Collaborators, Runner, RunnerConfig};
use flow_state_inmemory::InMemoryPersistentStore;

use crate::implementations::{RecordingApi, ScriptedUi, StaticPermissions};

/// Fakes for every collaborator plus the config used to build a runner
///
/// The fakes stay reachable after the runner is built so tests can inspect
/// what the program asked of them.
pub struct TestHarness {
    /// UI fake
    pub ui: Arc<ScriptedUi>,
    /// API fake
    pub api: Arc<RecordingApi>,
    /// Permission fake
    pub permissions: Arc<StaticPermissions>,
    /// Persistent storage
    pub storage: InMemoryPersistentStore,
    /// Runner configuration
    pub config: RunnerConfig,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    /// Harness whose UI answers `null`, whose API answers `200 {}` and which
    /// grants no permissions
    pub fn new() -> Self {
        Self {
            ui: Arc::new(ScriptedUi::always("null")),
            api: Arc::new(RecordingApi::responding(200, "{}")),
            permissions: Arc::new(StaticPermissions::default()),
            storage: InMemoryPersistentStore::new(),
            config: RunnerConfig::default().with_name("test"),
        }
    }

    /// Replace the UI fake
    pub fn with_ui(mut self, ui: ScriptedUi) -> Self {
        self.ui = Arc::new(ui);
        self
    }

    /// Replace the API fake
    pub fn with_api(mut self, api: RecordingApi) -> Self {
        self.api = Arc::new(api);
        self
    }

    /// Replace the permission fake
    pub fn with_permissions(mut self, permissions: StaticPermissions) -> Self {
        self.permissions = Arc::new(permissions);
        self
    }

    /// Seed persistent storage
    pub fn with_storage_entries<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.storage = InMemoryPersistentStore::with_entries(entries);
        self
    }

    /// Replace the runner configuration
    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Collaborators backed by this harness's fakes
    pub fn collaborators(&self) -> Collaborators {
        Collaborators::builder()
            .ui(self.ui.clone())
            .api(self.api.clone())
            .permissions(self.permissions.clone())
            .storage(Arc::new(self.storage.clone()))
            .build()
    }

    /// Runner backed by this harness's fakes
    pub fn runner(&self) -> Runner {
        Runner::new(self.collaborators(), self.config.clone())
    }
}
