//! HTTP Server
//!
//! Serves the management routes under a configurable base URL (localhost by default).
//!
//! Without `PIXI_KERNEL_HTTP_TOKEN` the route is open to anyone who can reach the
//! address, and each request runs Pixi in a directory chosen by the caller.

use crate::handler::{list_envs, ApiState};
use axum::routing::post;
use axum::Router;
use pixi_kernel_core::application::PixiClient;
use pixi_kernel_core::domain::EnvMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
const DEFAULT_HTTP_PORT: u16 = 8765;
const DEFAULT_BASE_URL: &str = "/";

const HOST_VAR: &str = "PIXI_KERNEL_HTTP_HOST";
const PORT_VAR: &str = "PIXI_KERNEL_HTTP_PORT";
const BASE_URL_VAR: &str = "PIXI_KERNEL_BASE_URL";
const TOKEN_VAR: &str = "PIXI_KERNEL_HTTP_TOKEN";

/// HTTP Server Configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
    /// Prefix of every route, as a Jupyter server `base_url`
    pub base_url: String,
    /// Token required in the `Authorization` header
    pub token: Option<String>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HTTP_HOST.to_string(),
            port: DEFAULT_HTTP_PORT,
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
        }
    }
}

impl HttpServerConfig {
    /// Defaults overridden by `PIXI_KERNEL_HTTP_*` and `PIXI_KERNEL_BASE_URL`
    pub fn from_env(env: &EnvMap) -> Self {
        let defaults = Self::default();
        Self {
            host: env.get(HOST_VAR).cloned().unwrap_or(defaults.host),
            port: env
                .get(PORT_VAR)
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            base_url: env.get(BASE_URL_VAR).cloned().unwrap_or(defaults.base_url),
            token: env.get(TOKEN_VAR).filter(|t| !t.is_empty()).cloned(),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Route of the environment catalog under `base_url`
pub fn envs_route(base_url: &str) -> String {
    let base = base_url.trim_matches('/');
    if base.is_empty() {
        "/pixi-kernel/envs".to_string()
    } else {
        format!("/{}/pixi-kernel/envs", base)
    }
}

/// Build the API router
pub fn router(state: ApiState, base_url: &str) -> Router {
    Router::new()
        .route(&envs_route(base_url), post(list_envs))
        .with_state(state)
}

/// HTTP Server
pub struct HttpServer {
    config: HttpServerConfig,
    state: ApiState,
}

impl HttpServer {
    pub fn new(config: HttpServerConfig, client: Arc<PixiClient>, env: EnvMap) -> Self {
        let state = ApiState::new(client, env).with_token(config.token.clone());
        Self { config, state }
    }

    /// Bind and serve until `shutdown` resolves
    pub async fn serve<F>(self, shutdown: F) -> Result<(), String>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| format!("Failed to bind {}: {}", addr, e))?;
        let local: SocketAddr = listener
            .local_addr()
            .map_err(|e| format!("Failed to read local address: {}", e))?;

        info!(
            addr = %local,
            route = %envs_route(&self.config.base_url),
            token_required = self.config.token.is_some(),
            "HTTP server listening"
        );
        if self.config.token.is_none() && !local.ip().is_loopback() {
            warn!(addr = %local, "HTTP server is reachable beyond localhost without a token");
        }

        let app = router(self.state, &self.config.base_url);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| format!("HTTP server failed on {}: {}", addr, e))
    }
}
