//! Mocks for the UI, API, permission and storage collaborators.

use async_trait::async_trait;
use mockall::mock;

use flow_core::{
    ApiRequest, ApiResponse, ApiRunner, FlowError, Permission, PermissionProvider,
    PermissionResponse, PermissionStatus, PersistentStore, UiRunner,
};

mock! {
    pub UiRunner {}

    #[async_trait]
    impl UiRunner for UiRunner {
        async fn run(&self, request: String) -> Result<String, FlowError>;
    }
}

mock! {
    pub ApiRunner {}

    #[async_trait]
    impl ApiRunner for ApiRunner {
        async fn call(&self, request: ApiRequest) -> Result<ApiResponse, FlowError>;
    }
}

mock! {
    pub PermissionProvider {}

    #[async_trait]
    impl PermissionProvider for PermissionProvider {
        async fn check(&self, permissions: &[Permission]) -> Result<PermissionStatus, FlowError>;
        async fn request(&self, permissions: &[Permission]) -> Result<Vec<PermissionResponse>, FlowError>;
    }
}

mock! {
    pub PersistentStore {}

    #[async_trait]
    impl PersistentStore for PersistentStore {
        async fn get(&self, key: &str) -> Result<Option<String>, FlowError>;
        async fn set(&self, key: &str, value: &str) -> Result<(), FlowError>;
        async fn delete(&self, key: &str) -> Result<(), FlowError>;
    }
}

/// Creates a mock API that answers every request with `code` and `body`.
pub fn create_mock_api_runner(code: u16, body: &str) -> MockApiRunner {
    let body = body.to_string();
    let mut mock = MockApiRunner::new();
    mock.expect_call().returning(move |_| {
        Ok(ApiResponse {
            code,
            status: String::new(),
            body: body.clone(),
            headers: Default::default(),
        })
    });
    mock
}

/// Creates a mock permission provider that grants everything.
pub fn create_granting_permission_provider() -> MockPermissionProvider {
    let mut mock = MockPermissionProvider::new();
    mock.expect_check()
        .returning(|_| Ok(PermissionStatus::Granted));
    mock.expect_request().returning(|permissions| {
        Ok(permissions
            .iter()
            .map(|permission| PermissionResponse {
                permission: *permission,
                status: PermissionStatus::Granted,
            })
            .collect())
    });
    mock
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_core::HttpMethod;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_mock_ui_runner_expectations() {
        let mut ui = MockUiRunner::new();
        ui.expect_run()
            .with(eq("{\"screen\":\"pin\"}".to_string()))
            .times(1)
            .returning(|_| Ok("\"1234\"".to_string()));

        let response = ui.run("{\"screen\":\"pin\"}".to_string()).await.unwrap();
        assert_eq!(response, "\"1234\"");
    }

    #[tokio::test]
    async fn test_mock_api_runner_default_behavior() {
        let api = create_mock_api_runner(201, "{\"id\":7}");
        let response = api
            .call(ApiRequest::new(HttpMethod::Post, "https://example.test/orders"))
            .await
            .unwrap();
        assert_eq!(response.code, 201);
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn test_granting_permission_provider() {
        let provider = create_granting_permission_provider();
        let wanted = [Permission::Camera, Permission::Location];

        assert_eq!(provider.check(&wanted).await.unwrap(), PermissionStatus::Granted);
        let responses = provider.request(&wanted).await.unwrap();
        assert_eq!(responses.len(), 2);
        assert!(responses
            .iter()
            .all(|r| r.status == PermissionStatus::Granted));
    }
}
