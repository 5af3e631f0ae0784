// Environment Catalog
// Lists the environments of the project around a notebook, for the environment picker

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use super::constants::DEFAULT_ENVIRONMENT_NAME;
use super::introspect::ProjectIntrospector;
use super::pixi::PixiClient;
use super::shell_env::default_environment_name;
use crate::domain::EnvMap;

/// One selectable environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentEntry {
    pub name: String,
    pub default: bool,
}

impl EnvironmentEntry {
    pub fn new(name: impl Into<String>, default: bool) -> Self {
        Self {
            name: name.into(),
            default,
        }
    }

    /// Entry returned whenever the project cannot be described
    pub fn fallback() -> Self {
        Self::new(DEFAULT_ENVIRONMENT_NAME, true)
    }
}

pub struct EnvironmentCatalog {
    introspector: ProjectIntrospector,
}

impl EnvironmentCatalog {
    pub fn new(client: Arc<PixiClient>) -> Self {
        Self {
            introspector: ProjectIntrospector::new(client),
        }
    }

    /// Environments of the project containing `dir`
    ///
    /// Never fails: an unusable `pixi info` result yields the single fallback entry.
    /// The default marker follows `PIXI_KERNEL_DEFAULT_ENVIRONMENT` from `env`.
    pub async fn list(&self, dir: &Path, env: &EnvMap) -> Vec<EnvironmentEntry> {
        let info = match self.introspector.info(dir, env, None).await {
            Ok(info) => info,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Cannot list environments, using default");
                return vec![EnvironmentEntry::fallback()];
            }
        };

        if info.environments.is_empty() {
            debug!(dir = %dir.display(), "Project has no environments");
            return vec![EnvironmentEntry::fallback()];
        }

        let names = info.environments.into_iter().map(|e| e.name);
        mark_default(names, &default_environment_name(env))
    }
}

/// Build entries, marking `preferred` as default
///
/// If no name equals `preferred`, the environment literally named `default` is marked.
/// If that is absent too, no entry is marked.
pub fn mark_default(
    names: impl IntoIterator<Item = String>,
    preferred: &str,
) -> Vec<EnvironmentEntry> {
    let mut entries: Vec<EnvironmentEntry> = names
        .into_iter()
        .map(|name| {
            let default = name == preferred;
            EnvironmentEntry { name, default }
        })
        .collect();

    if !entries.iter().any(|e| e.default) {
        if let Some(entry) = entries
            .iter_mut()
            .find(|e| e.name == DEFAULT_ENVIRONMENT_NAME)
        {
            entry.default = true;
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::binary_probe::mocks::MockBinaryProbe;
    use crate::port::command_runner::mocks::ScriptedCommandRunner;

    fn catalog(runner: ScriptedCommandRunner) -> EnvironmentCatalog {
        let probe = Arc::new(MockBinaryProbe::new().with_path_entry("/usr/bin/pixi"));
        EnvironmentCatalog::new(Arc::new(PixiClient::new(probe, Arc::new(runner))))
    }

    fn info_with(names: &[&str]) -> String {
        let environments: Vec<_> = names
            .iter()
            .map(|name| {
                serde_json::json!({
                    "name": name,
                    "dependencies": [],
                    "pypi_dependencies": [],
                    "prefix": format!("/work/.pixi/envs/{name}")
                })
            })
            .collect();
        serde_json::json!({
            "project_info": {"manifest_path": "/work/pixi.toml"},
            "environments_info": environments
        })
        .to_string()
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_mark_default_prefers_override() {
        let entries = mark_default(names(&["default", "cuda"]), "cuda");
        assert_eq!(
            entries,
            vec![
                EnvironmentEntry::new("default", false),
                EnvironmentEntry::new("cuda", true)
            ]
        );
    }

    #[test]
    fn test_mark_default_falls_back_to_literal_default() {
        let entries = mark_default(names(&["cpu", "default"]), "missing");
        assert_eq!(
            entries,
            vec![
                EnvironmentEntry::new("cpu", false),
                EnvironmentEntry::new("default", true)
            ]
        );
    }

    #[test]
    fn test_mark_default_marks_nothing_without_literal_default() {
        let entries = mark_default(names(&["cpu", "gpu"]), "default");
        assert!(entries.iter().all(|e| !e.default));
    }

    #[tokio::test]
    async fn test_list_uses_default_override_from_env() {
        let runner = ScriptedCommandRunner::new().on(
            &["info", "--json"],
            0,
            &info_with(&["default", "test"]),
            "",
        );
        let env: EnvMap = [(
            "PIXI_KERNEL_DEFAULT_ENVIRONMENT".to_string(),
            "test".to_string(),
        )]
        .into();

        let entries = catalog(runner).list(Path::new("/work"), &env).await;

        assert_eq!(
            entries,
            vec![
                EnvironmentEntry::new("default", false),
                EnvironmentEntry::new("test", true)
            ]
        );
    }

    #[tokio::test]
    async fn test_list_falls_back_on_failure() {
        let cases = [
            ScriptedCommandRunner::new().on(&["info", "--json"], 1, "", "boom"),
            ScriptedCommandRunner::new().on(&["info", "--json"], 0, "not JSON", ""),
            ScriptedCommandRunner::new().on(&["info", "--json"], 0, &info_with(&[]), ""),
        ];

        for runner in cases {
            let entries = catalog(runner).list(Path::new("/work"), &EnvMap::new()).await;
            assert_eq!(entries, vec![EnvironmentEntry::fallback()]);
        }
    }

    #[test]
    fn test_entry_serialization() {
        let json = serde_json::to_string(&EnvironmentEntry::fallback()).unwrap();
        assert_eq!(json, r#"{"name":"default","default":true}"#);
    }
}
