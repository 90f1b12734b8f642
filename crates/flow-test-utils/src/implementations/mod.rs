//! Test implementations (fakes) of the runtime collaborators.

pub mod recording_api;
pub mod scripted_ui;
pub mod static_permissions;

pub use recording_api::RecordingApi;
pub use scripted_ui::ScriptedUi;
pub use static_permissions::StaticPermissions;
