//! API collaborator that records requests and answers from a handler.

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use flow_core::{ApiRequest, ApiResponse, ApiRunner, FlowError, Headers};

type Handler = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse, FlowError> + Send + Sync>;

/// Fake API that records every request
pub struct RecordingApi {
    handler: Handler,
    requests: Mutex<Vec<ApiRequest>>,
}

impl RecordingApi {
    /// Answer each request with the handler's result
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&ApiRequest) -> Result<ApiResponse, FlowError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request with the same status code and body
    pub fn responding(code: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        Self::with_handler(move |_| Ok(response(code, body.clone())))
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }
}

/// Build a response with the given code and body
pub fn response(code: u16, body: impl Into<String>) -> ApiResponse {
    ApiResponse {
        code,
        status: String::new(),
        body: body.into(),
        headers: Headers::new(),
    }
}

#[async_trait]
impl ApiRunner for RecordingApi {
    async fn call(&self, request: ApiRequest) -> Result<ApiResponse, FlowError> {
        debug!(method = ?request.method, url = %request.url, "Recording API request");
        let result = (self.handler)(&request);
        self.requests.lock().push(request);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_core::{CollaboratorKind, HttpMethod};

    #[tokio::test]
    async fn test_records_requests() {
        let api = RecordingApi::responding(200, "{}");
        api.call(ApiRequest::new(HttpMethod::Get, "https://example.test/a"))
            .await
            .unwrap();

        let requests = api.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://example.test/a");
    }

    #[tokio::test]
    async fn test_handler_routes_by_url() {
        let api = RecordingApi::with_handler(|request| {
            if request.url.ends_with("/down") {
                Err(FlowError::collaborator(CollaboratorKind::Api, "unreachable"))
            } else {
                Ok(response(204, ""))
            }
        });

        assert!(api
            .call(ApiRequest::new(HttpMethod::Get, "https://example.test/down"))
            .await
            .is_err());
        assert_eq!(
            api.call(ApiRequest::new(HttpMethod::Get, "https://example.test/up"))
                .await
                .unwrap()
                .code,
            204
        );
    }
}
