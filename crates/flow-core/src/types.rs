//! Value types shared by Flow programs, the runner and the collaborators.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// HTTP-style headers attached to API requests and responses
pub type Headers = HashMap<String, String>;

/// Snapshot of the foreign state mapping
pub type ForeignState = HashMap<String, Value>;

/// Key-value space selected by Read/Write/Delete operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Store {
    /// Durable, host-backed storage
    Persistent,
    /// In-memory storage that lives as long as the run
    Ephemeral,
}

/// Platform permissions a program can check or request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    /// Read phone state
    ReadPhoneState,
    /// Send SMS
    SendSms,
    /// Read shared storage
    ReadStorage,
    /// Write shared storage
    WriteStorage,
    /// Use the camera
    Camera,
    /// Access device location
    Location,
    /// Read contacts
    Contacts,
}

/// Result of a permission check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    /// Permission is granted
    Granted,
    /// Permission is declined
    Declined,
}

/// Host answer for a single requested permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionResponse {
    /// The requested permission
    pub permission: Permission,
    /// What the host decided
    pub status: PermissionStatus,
}

/// HTTP method of an API request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
    /// PATCH
    Patch,
}

/// Request handed to the API collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Target URL
    pub url: String,
    /// Request headers
    #[serde(default)]
    pub headers: Headers,
    /// Serialized request body
    #[serde(default)]
    pub payload: String,
}

impl ApiRequest {
    /// Create a request without headers or body
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Headers::new(),
            payload: String::new(),
        }
    }

    /// Attach a JSON body
    pub fn with_json<B: Serialize>(mut self, body: &B) -> Result<Self, serde_json::Error> {
        self.payload = serde_json::to_string(body)?;
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    /// Merge the given headers into the request
    pub fn with_headers(mut self, headers: &Headers) -> Self {
        self.headers
            .extend(headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }
}

/// Response returned by the API collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Status code
    pub code: u16,
    /// Status text
    #[serde(default)]
    pub status: String,
    /// Raw response body
    #[serde(default)]
    pub body: String,
    /// Response headers
    #[serde(default)]
    pub headers: Headers,
}

impl ApiResponse {
    /// Whether the status code is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

/// Non-2xx response surfaced to programs by `Flow::call_endpoint`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status code
    pub code: u16,
    /// Status text
    pub status: String,
    /// Raw response body
    pub body: String,
}

impl From<ApiResponse> for ErrorResponse {
    fn from(response: ApiResponse) -> Self {
        Self {
            code: response.code,
            status: response.status,
            body: response.body,
        }
    }
}

/// A typed REST endpoint that knows how to build its request
pub trait RestEndpoint {
    /// Body type of a successful response
    type Response: DeserializeOwned + Send + 'static;

    /// Build the request, merging in the caller's headers
    fn make_request(&self, headers: &Headers) -> ApiRequest;
}

/// Terminal value of a Recover-guarded sub-program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum Outcome {
    /// Abort the enclosing run with this message
    Fail(String),
    /// Complete with this value
    Succeed(Value),
}

impl Outcome {
    /// Successful outcome
    pub fn succeed(value: impl Into<Value>) -> Self {
        Outcome::Succeed(value.into())
    }

    /// Failed outcome
    pub fn fail(message: impl Into<String>) -> Self {
        Outcome::Fail(message.into())
    }
}

/// Identifier of a top-level run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Fresh random run id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
