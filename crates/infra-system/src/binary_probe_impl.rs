// Binary probe implementation
// reason: which for PATH lookup, config + directories for the user config file
use config::{Config, File, FileFormat};
use directories::{BaseDirs, ProjectDirs};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use pixi_kernel_core::application::constants::CONFIG_PIXI_PATH_KEY;
use pixi_kernel_core::port::BinaryProbe;

const CONFIG_ORGANIZATION: &str = "renan-r-santos";
const CONFIG_APPLICATION: &str = "pixi-kernel";
const CONFIG_FILE_NAME: &str = "config.toml";

#[cfg(windows)]
const DEFAULT_BINARY: &str = "pixi.exe";
#[cfg(not(windows))]
const DEFAULT_BINARY: &str = "pixi";

/// User configuration file (`<config dir>/pixi-kernel/config.toml`)
pub fn user_config_file() -> Option<PathBuf> {
    ProjectDirs::from("", CONFIG_ORGANIZATION, CONFIG_APPLICATION)
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Probe backed by the real filesystem and search path
pub struct SystemBinaryProbe {
    config_file: Option<PathBuf>,
    home: Option<PathBuf>,
}

impl SystemBinaryProbe {
    /// Probe using the platform config directory and the user's home
    pub fn new() -> Self {
        Self {
            config_file: user_config_file(),
            home: BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf()),
        }
    }

    /// Probe with explicit locations
    ///
    /// # Arguments
    /// * `config_file` - Path of the TOML file holding `pixi-path`
    /// * `home` - Directory containing `.pixi/bin`
    pub fn with_locations(config_file: Option<PathBuf>, home: Option<PathBuf>) -> Self {
        Self { config_file, home }
    }
}

impl Default for SystemBinaryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl BinaryProbe for SystemBinaryProbe {
    fn search_path(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }

    fn configured_path(&self) -> Option<PathBuf> {
        let file = self.config_file.as_ref()?;
        if !file.is_file() {
            return None;
        }

        let settings = Config::builder()
            .add_source(File::from(file.as_path()).format(FileFormat::Toml))
            .build()
            .map_err(|e| warn!(file = %file.display(), error = %e, "Ignoring unreadable config file"))
            .ok()?;

        let path = settings.get_string(CONFIG_PIXI_PATH_KEY).ok()?;
        debug!(file = %file.display(), path = %path, "Configured Pixi path");
        Some(PathBuf::from(path))
    }

    fn default_install_path(&self) -> Option<PathBuf> {
        self.home
            .as_ref()
            .map(|home| home.join(".pixi").join("bin").join(DEFAULT_BINARY))
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}
