//! HTTP Method Handlers

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::Json;
use pixi_kernel_core::application::{EnvironmentCatalog, EnvironmentEntry, PixiClient};
use pixi_kernel_core::domain::EnvMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::types::EnvsRequest;

/// Name used in Pixi availability messages returned by the API
pub const API_KERNEL_NAME: &str = "Pixi";

/// Shared handler state
#[derive(Clone)]
pub struct ApiState {
    client: Arc<PixiClient>,
    catalog: Arc<EnvironmentCatalog>,
    /// Environment handed to Pixi (process environment captured at startup)
    env: Arc<EnvMap>,
    /// Token every request must present; `None` leaves the route open
    token: Option<Arc<str>>,
}

impl ApiState {
    pub fn new(client: Arc<PixiClient>, env: EnvMap) -> Self {
        Self {
            catalog: Arc::new(EnvironmentCatalog::new(client.clone())),
            client,
            env: Arc::new(env),
            token: None,
        }
    }

    /// Require `Authorization: token <token>` (or `Bearer <token>`) on every request
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty()).map(Arc::from);
        self
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        let Some(expected) = self.token.as_deref() else {
            return Ok(());
        };

        let presented = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| {
                v.strip_prefix("token ")
                    .or_else(|| v.strip_prefix("Bearer "))
            })
            .map(str::trim);

        match presented {
            Some(token) if constant_time_eq(token.as_bytes(), expected.as_bytes()) => Ok(()),
            _ => Err(ApiError::Unauthorized),
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// POST {base_url}/pixi-kernel/envs
///
/// The token, when configured, is checked first. Pixi is checked before the body is
/// looked at, so a missing Pixi is reported even for malformed requests.
pub async fn list_envs(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Vec<EnvironmentEntry>>, ApiError> {
    state.authorize(&headers)?;
    state
        .client
        .ensure_compatible(API_KERNEL_NAME, &state.env)
        .await?;

    let request = parse_envs_request(&body)?;
    let dir = notebook_dir(&request);
    debug!(dir = %dir.display(), "Listing environments");

    let entries = state.catalog.list(&dir, &state.env).await;
    info!(dir = %dir.display(), count = entries.len(), "Listed environments");
    Ok(Json(entries))
}

fn parse_envs_request(body: &[u8]) -> Result<EnvsRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::bad_request("Missing request body"));
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))
}

/// Directory Pixi should be run in for a notebook
///
/// `serverRoot` is tilde-expanded and joined with `localPath`; a file resolves to its
/// parent directory.
pub fn notebook_dir(request: &EnvsRequest) -> PathBuf {
    let root = shellexpand::tilde(&request.server_root).into_owned();
    let joined = Path::new(&root).join(&request.local_path);
    let resolved = std::fs::canonicalize(&joined).unwrap_or(joined);

    if resolved.is_file() {
        if let Some(parent) = resolved.parent() {
            return parent.to_path_buf();
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(root: &str, local: &str) -> EnvsRequest {
        EnvsRequest {
            server_root: root.to_string(),
            local_path: local.to_string(),
        }
    }

    #[test]
    fn test_parse_envs_request() {
        let parsed = parse_envs_request(br#"{"serverRoot": "/srv", "localPath": "a.ipynb"}"#)
            .unwrap();
        assert_eq!(parsed, request("/srv", "a.ipynb"));

        assert!(matches!(
            parse_envs_request(b""),
            Err(ApiError::BadRequest(msg)) if msg == "Missing request body"
        ));
        assert!(matches!(
            parse_envs_request(br#"{"serverRoot": "/srv"}"#),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_notebook_dir_uses_parent_of_file() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("project")).unwrap();
        std::fs::write(root.path().join("project/notebook.ipynb"), "{}").unwrap();

        let dir = notebook_dir(&request(
            &root.path().display().to_string(),
            "project/notebook.ipynb",
        ));

        assert_eq!(
            dir,
            std::fs::canonicalize(root.path().join("project")).unwrap()
        );
    }

    #[test]
    fn test_notebook_dir_keeps_directory_and_missing_paths() {
        let root = tempfile::tempdir().unwrap();

        let dir = notebook_dir(&request(&root.path().display().to_string(), ""));
        assert_eq!(dir, std::fs::canonicalize(root.path()).unwrap());

        let missing = notebook_dir(&request("/does/not/exist", "nb.ipynb"));
        assert_eq!(missing, PathBuf::from("/does/not/exist/nb.ipynb"));
    }

    #[test]
    fn test_authorize_with_token() {
        use pixi_kernel_core::port::binary_probe::mocks::MockBinaryProbe;
        use pixi_kernel_core::port::command_runner::mocks::ScriptedCommandRunner;

        let client = Arc::new(PixiClient::new(
            Arc::new(MockBinaryProbe::new()),
            Arc::new(ScriptedCommandRunner::new()),
        ));
        let open = ApiState::new(client.clone(), EnvMap::new());
        let guarded = ApiState::new(client, EnvMap::new()).with_token(Some("s3cret".into()));

        let headers = |value: &str| {
            let mut headers = HeaderMap::new();
            headers.insert(AUTHORIZATION, value.parse().unwrap());
            headers
        };

        assert!(open.authorize(&HeaderMap::new()).is_ok());
        assert!(guarded.authorize(&headers("token s3cret")).is_ok());
        assert!(guarded.authorize(&headers("Bearer s3cret")).is_ok());
        assert!(matches!(
            guarded.authorize(&headers("token wrong")),
            Err(ApiError::Unauthorized)
        ));
        assert!(matches!(
            guarded.authorize(&HeaderMap::new()),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn test_notebook_dir_expands_tilde() {
        let dir = notebook_dir(&request("~", "no-such-notebook.ipynb"));
        assert!(!dir.starts_with("~"));
    }
}
