//! Client Session Manager
//!
//! Browser-side companion to the auth service. Holds the access token in
//! memory only, attaches it to outgoing requests, and on a 401 performs a
//! single-flight refresh: however many requests fail at once, exactly one
//! `/auth/refresh` call goes out and the rest wait for its outcome. Each
//! original request is retried at most once; requests to the auth endpoints
//! themselves are never auto-refreshed.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Request as seen by the transport. Cookies (the refresh token) are the
/// transport's concern, the way a browser carries them implicitly.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: String,
    pub path: String,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("not authenticated")]
    Unauthenticated,
}

/// HTTP transport seam; tests drive the session manager with a mock
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, req: ApiRequest) -> Result<ApiResponse, ClientError>;
}

/// Session state and refresh coordination
pub struct SessionManager<T: Transport> {
    transport: T,
    /// Access token, in process memory only
    token: Mutex<Option<String>>,
    /// Bumped on every token change; lets waiters detect a refresh that
    /// happened while they were queued on the gate
    generation: AtomicU64,
    /// At most one refresh in flight; contenders queue here
    refresh_gate: Mutex<()>,
}

impl<T: Transport> SessionManager<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            token: Mutex::new(None),
            generation: AtomicU64::new(0),
            refresh_gate: Mutex::new(()),
        }
    }

    pub async fn access_token(&self) -> Option<String> {
        self.token.lock().await.clone()
    }

    async fn set_token(&self, token: Option<String>) {
        *self.token.lock().await = token;
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    fn is_auth_path(path: &str) -> bool {
        path.starts_with("/auth/")
    }

    /// Send a request with the current token, refreshing and retrying once
    /// on 401 for non-auth endpoints.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
    ) -> Result<ApiResponse, ClientError> {
        let observed = self.generation.load(Ordering::Acquire);
        let bearer = self.access_token().await;

        let response = self
            .transport
            .send(ApiRequest {
                method: method.to_string(),
                path: path.to_string(),
                body: body.clone(),
                bearer,
            })
            .await?;

        if response.status != 401 || Self::is_auth_path(path) {
            return Ok(response);
        }

        let token = self.refresh_access_token(observed).await?;

        // One retry; a second 401 is a real failure and propagates as-is
        self.transport
            .send(ApiRequest {
                method: method.to_string(),
                path: path.to_string(),
                body,
                bearer: Some(token),
            })
            .await
    }

    /// Single-flight refresh. The first caller through the gate performs the
    /// refresh; queued callers observe the generation bump and reuse its
    /// outcome instead of refreshing again.
    async fn refresh_access_token(&self, observed: u64) -> Result<String, ClientError> {
        let _gate = self.refresh_gate.lock().await;

        if self.generation.load(Ordering::Acquire) != observed {
            return self
                .access_token()
                .await
                .ok_or(ClientError::Unauthenticated);
        }

        let response = self
            .transport
            .send(ApiRequest {
                method: "POST".to_string(),
                path: "/auth/refresh".to_string(),
                body: None,
                bearer: None,
            })
            .await;

        match response {
            Ok(res) if res.status == 200 => {
                let token = res
                    .body
                    .get("accessToken")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        ClientError::Transport("malformed refresh response".to_string())
                    })?;
                self.set_token(Some(token.clone())).await;
                Ok(token)
            }
            _ => {
                self.set_token(None).await;
                Err(ClientError::Unauthenticated)
            }
        }
    }

    /// Silent session restore at startup: cookie-only refresh
    pub async fn try_restore(&self) -> bool {
        let observed = self.generation.load(Ordering::Acquire);
        self.refresh_access_token(observed).await.is_ok()
    }

    async fn establish(
        &self,
        path: &str,
        body: Value,
    ) -> Result<ApiResponse, ClientError> {
        let response = self
            .transport
            .send(ApiRequest {
                method: "POST".to_string(),
                path: path.to_string(),
                body: Some(body),
                bearer: None,
            })
            .await?;

        if response.status == 200 {
            let token = response
                .body
                .get("accessToken")
                .and_then(Value::as_str)
                .map(str::to_string);
            self.set_token(token).await;
        }
        Ok(response)
    }

    pub async fn signup(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<ApiResponse, ClientError> {
        self.establish(
            "/auth/signup",
            serde_json::json!({ "email": email, "name": name, "password": password }),
        )
        .await
    }

    pub async fn signin(&self, email: &str, password: &str) -> Result<ApiResponse, ClientError> {
        self.establish(
            "/auth/signin",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    pub async fn logout(&self) -> Result<ApiResponse, ClientError> {
        let response = self
            .transport
            .send(ApiRequest {
                method: "POST".to_string(),
                path: "/auth/logout".to_string(),
                body: None,
                bearer: None,
            })
            .await?;
        self.set_token(None).await;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Mock server: protected routes answer 200 only for the latest issued
    /// token; /auth/refresh mints "tok-N" unless told to fail.
    struct MockServer {
        valid_token: Mutex<Option<String>>,
        refresh_calls: AtomicUsize,
        protected_calls: AtomicUsize,
        refresh_fails: bool,
        always_unauthorized: bool,
    }

    impl MockServer {
        fn new() -> Self {
            Self {
                valid_token: Mutex::new(None),
                refresh_calls: AtomicUsize::new(0),
                protected_calls: AtomicUsize::new(0),
                refresh_fails: false,
                always_unauthorized: false,
            }
        }
    }

    #[async_trait]
    impl Transport for MockServer {
        async fn send(&self, req: ApiRequest) -> Result<ApiResponse, ClientError> {
            if req.path == "/auth/refresh" {
                let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
                // Hold the refresh open long enough for other callers to
                // fail their original request and queue up
                tokio::time::sleep(Duration::from_millis(10)).await;
                if self.refresh_fails {
                    return Ok(ApiResponse {
                        status: 401,
                        body: serde_json::json!({ "error": "unauthenticated" }),
                    });
                }
                let token = format!("tok-{n}");
                *self.valid_token.lock().await = Some(token.clone());
                return Ok(ApiResponse {
                    status: 200,
                    body: serde_json::json!({ "accessToken": token }),
                });
            }

            if req.path.starts_with("/auth/") {
                return Ok(ApiResponse {
                    status: 401,
                    body: serde_json::json!({ "error": "invalid_credentials" }),
                });
            }

            self.protected_calls.fetch_add(1, Ordering::SeqCst);
            let valid = self.valid_token.lock().await.clone();
            if !self.always_unauthorized && req.bearer.is_some() && req.bearer == valid {
                Ok(ApiResponse {
                    status: 200,
                    body: serde_json::json!({ "ok": true }),
                })
            } else {
                Ok(ApiResponse {
                    status: 401,
                    body: serde_json::json!({ "error": "unauthenticated" }),
                })
            }
        }
    }

    #[tokio::test]
    async fn test_concurrent_401s_trigger_one_refresh() {
        let manager = SessionManager::new(MockServer::new());

        let (a, b) = tokio::join!(
            manager.request("GET", "/things", None),
            manager.request("GET", "/things", None),
        );

        assert_eq!(a.unwrap().status, 200);
        assert_eq!(b.unwrap().status, 200);
        assert_eq!(manager.transport.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_at_most_once() {
        let mut server = MockServer::new();
        server.always_unauthorized = true;
        let manager = SessionManager::new(server);

        let res = manager.request("GET", "/things", None).await.unwrap();

        // Second 401 propagates instead of looping
        assert_eq!(res.status, 401);
        assert_eq!(manager.transport.protected_calls.load(Ordering::SeqCst), 2);
        assert_eq!(manager.transport.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_auth_endpoints_are_never_refreshed() {
        let manager = SessionManager::new(MockServer::new());

        let res = manager.signin("a@x.com", "wrong").await.unwrap();

        assert_eq!(res.status, 401);
        assert_eq!(manager.transport.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refresh_failure_clears_token_for_all_waiters() {
        let mut server = MockServer::new();
        server.refresh_fails = true;
        let manager = SessionManager::new(server);
        manager.set_token(Some("stale".to_string())).await;

        let (a, b) = tokio::join!(
            manager.request("GET", "/things", None),
            manager.request("GET", "/things", None),
        );

        assert!(matches!(a, Err(ClientError::Unauthenticated)));
        assert!(matches!(b, Err(ClientError::Unauthenticated)));
        assert_eq!(manager.transport.refresh_calls.load(Ordering::SeqCst), 1);
        assert!(manager.access_token().await.is_none());
    }

    #[tokio::test]
    async fn test_try_restore_sets_token() {
        let manager = SessionManager::new(MockServer::new());

        assert!(manager.try_restore().await);
        assert_eq!(manager.access_token().await.as_deref(), Some("tok-1"));

        let res = manager.request("GET", "/things", None).await.unwrap();
        assert_eq!(res.status, 200);
        // Token was already fresh; no extra refresh
        assert_eq!(manager.transport.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_logout_clears_token() {
        let manager = SessionManager::new(MockServer::new());
        manager.try_restore().await;

        manager.logout().await.unwrap();
        assert!(manager.access_token().await.is_none());
    }
}
