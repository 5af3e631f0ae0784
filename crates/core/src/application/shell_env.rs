// Environment-variable workarounds applied before delegating to Pixi

use tracing::debug;

use super::constants::{DEFAULT_ENVIRONMENT_NAME, DEFAULT_ENVIRONMENT_VAR, SHELL_MARKER_VAR};
use crate::domain::EnvMap;

/// Remove the `pixi shell` marker in place
///
/// JupyterLab started from inside `pixi shell` passes the marker on to every kernel,
/// which makes Pixi ignore the kernel's working directory.
///
/// Returns true if the marker was present.
pub fn strip_shell_marker(env: &mut EnvMap) -> bool {
    let removed = env.remove(SHELL_MARKER_VAR).is_some();
    if removed {
        debug!(var = SHELL_MARKER_VAR, "Stripped shell marker from environment");
    }
    removed
}

/// Copy of `env` without the `pixi shell` marker
pub fn without_shell_marker(env: &EnvMap) -> EnvMap {
    let mut env = env.clone();
    strip_shell_marker(&mut env);
    env
}

/// Default environment name: the override variable if set and non-empty, else `default`
pub fn default_environment_name(env: &EnvMap) -> String {
    env.get(DEFAULT_ENVIRONMENT_VAR)
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_ENVIRONMENT_NAME)
        .to_string()
}
