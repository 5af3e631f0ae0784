//! Test fixtures: a scripted fake `pixi` binary and the probe that finds it
//!
//! The fake is a POSIX shell script, so every test using it is Unix only.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pixi_kernel_core::application::PixiClient;
use pixi_kernel_core::domain::EnvMap;
use pixi_kernel_core::port::BinaryProbe;
use pixi_kernel_infra_system::{SubprocessExecutor, SystemBinaryProbe};

const SCRIPT: &str = r#"#!/bin/sh
here="${0%/*}"
echo "$*" >> "$here/calls.log"
if [ -n "$PIXI_IN_SHELL" ]; then
    echo "PIXI_IN_SHELL leaked into pixi" >&2
    exit 3
fi
case "$1" in
    --version) echo "pixi 0.40.0" ;;
    info) cat "$here/info.json" ;;
    project) cat "$here/project.err" >&2; exit 1 ;;
    list) cat "$here/list.json" ;;
    install)
        if [ -f "$here/install.err" ]; then
            cat "$here/install.err" >&2
            exit 1
        fi
        ;;
    run)
        shift
        if [ "$1" = "--environment" ]; then shift 2; fi
        exec "$@"
        ;;
    *) echo "unexpected arguments: $*" >&2; exit 2 ;;
esac
"#;

/// A fake `pixi` executable in its own temporary directory
///
/// Behaviour is driven by files next to the script: `info.json`, `list.json`,
/// `project.err` and `install.err`. Every invocation is appended to `calls.log`.
pub struct FakePixi {
    dir: tempfile::TempDir,
}

impl FakePixi {
    pub fn new() -> std::io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let script = dir.path().join("pixi");
        std::fs::write(&script, SCRIPT)?;
        make_executable(&script)?;
        std::fs::write(dir.path().join("info.json"), "{}")?;
        std::fs::write(dir.path().join("list.json"), "[]")?;
        std::fs::write(dir.path().join("project.err"), "")?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join("pixi")
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn with_info(self, info: &serde_json::Value) -> Self {
        self.with_file("info.json", &info.to_string())
    }

    pub fn with_raw_info(self, raw: &str) -> Self {
        self.with_file("info.json", raw)
    }

    pub fn with_list(self, list: &serde_json::Value) -> Self {
        self.with_file("list.json", &list.to_string())
    }

    pub fn with_project_error(self, stderr: &str) -> Self {
        self.with_file("project.err", stderr)
    }

    pub fn with_install_error(self, stderr: &str) -> Self {
        self.with_file("install.err", stderr)
    }

    fn with_file(self, name: &str, content: &str) -> Self {
        if let Err(e) = std::fs::write(self.dir.path().join(name), content) {
            panic!("cannot write fixture {name}: {e}");
        }
        self
    }

    /// Every recorded invocation, one argument string per call
    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Write a user config file pointing at this script
    pub fn config_file(&self) -> std::io::Result<PathBuf> {
        let config = self.dir.path().join("config.toml");
        std::fs::write(
            &config,
            format!("pixi-path = \"{}\"\n", self.path().display()),
        )?;
        Ok(config)
    }

    /// Client wired to the real executor, locating this script via the config file
    pub fn client(&self) -> std::io::Result<Arc<PixiClient>> {
        let probe = ConfigOnlyProbe {
            inner: SystemBinaryProbe::with_locations(Some(self.config_file()?), None),
        };
        Ok(Arc::new(PixiClient::new(
            Arc::new(probe),
            Arc::new(SubprocessExecutor::new()),
        )))
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// System probe that ignores the search path, so a real Pixi install never wins
pub struct ConfigOnlyProbe {
    inner: SystemBinaryProbe,
}

impl BinaryProbe for ConfigOnlyProbe {
    fn search_path(&self, _name: &str) -> Option<PathBuf> {
        None
    }

    fn configured_path(&self) -> Option<PathBuf> {
        self.inner.configured_path()
    }

    fn default_install_path(&self) -> Option<PathBuf> {
        None
    }

    fn is_file(&self, path: &Path) -> bool {
        self.inner.is_file(path)
    }
}

/// Minimal environment for the fake: just enough `PATH` for `cat`
pub fn base_env() -> EnvMap {
    std::env::var("PATH")
        .map(|path| EnvMap::from([("PATH".to_string(), path)]))
        .unwrap_or_default()
}

/// `pixi info --json` output for a project with the given environments
pub fn project_info(root: &Path, environments: &[(&str, &[&str])]) -> serde_json::Value {
    let environments: Vec<serde_json::Value> = environments
        .iter()
        .map(|(name, dependencies)| {
            serde_json::json!({
                "name": name,
                "features": [name],
                "dependencies": dependencies,
                "pypi_dependencies": [],
                "prefix": root.join(".pixi").join("envs").join(name),
            })
        })
        .collect();

    serde_json::json!({
        "platform": "linux-64",
        "project_info": {"manifest_path": root.join("pixi.toml"), "name": "project"},
        "environments_info": environments,
    })
}
