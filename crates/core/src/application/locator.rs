// Binary Locator
// Finds the Pixi executable and caches it for the lifetime of the locator

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, info};

use super::constants::PIXI_EXECUTABLE;
use crate::port::BinaryProbe;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocatorError {
    #[error("Pixi binary not found on PATH, in the user config file, or at the default location")]
    NotFound,
}

/// Where a located binary came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinarySource {
    SearchPath,
    ConfigFile,
    DefaultInstall,
}

/// Binary locator
///
/// Lookup order:
/// 1. `pixi` on the process search path
/// 2. `pixi-path` in the user configuration file, if that file exists
/// 3. The default install location under the home directory
///
/// The first success is cached; the composition root keeps one locator for the whole
/// process so repeated readiness checks skip the filesystem probes.
pub struct BinaryLocator {
    probe: Arc<dyn BinaryProbe>,
    cache: RwLock<Option<PathBuf>>,
}

impl BinaryLocator {
    pub fn new(probe: Arc<dyn BinaryProbe>) -> Self {
        Self {
            probe,
            cache: RwLock::new(None),
        }
    }

    /// Locate the binary, probing only on a cache miss
    ///
    /// Two concurrent misses may both probe; both store the same answer.
    pub fn locate(&self) -> Result<PathBuf, LocatorError> {
        if let Some(path) = self.cached() {
            return Ok(path);
        }

        let (path, source) = self.probe_all()?;
        info!(path = %path.display(), source = ?source, "Located Pixi binary");

        *self.cache.write().unwrap_or_else(|e| e.into_inner()) = Some(path.clone());
        Ok(path)
    }

    /// Cached location, if any
    pub fn cached(&self) -> Option<PathBuf> {
        self.cache.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Forget the cached location
    pub fn reset(&self) {
        *self.cache.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn probe_all(&self) -> Result<(PathBuf, BinarySource), LocatorError> {
        if let Some(path) = self.probe.search_path(PIXI_EXECUTABLE) {
            return Ok((path, BinarySource::SearchPath));
        }

        match self.probe.configured_path() {
            Some(path) if self.probe.is_file(&path) => {
                return Ok((path, BinarySource::ConfigFile));
            }
            Some(path) => {
                debug!(path = %path.display(), "Configured Pixi path does not exist");
            }
            None => {}
        }

        match self.probe.default_install_path() {
            Some(path) if self.probe.is_file(&path) => Ok((path, BinarySource::DefaultInstall)),
            _ => Err(LocatorError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::binary_probe::mocks::MockBinaryProbe;

    #[test]
    fn test_search_path_wins() {
        let probe = MockBinaryProbe::new()
            .with_path_entry("/usr/bin/pixi")
            .with_configured("/opt/pixi", true)
            .with_default_install("/home/u/.pixi/bin/pixi", true);
        let locator = BinaryLocator::new(Arc::new(probe));

        assert_eq!(locator.locate(), Ok(PathBuf::from("/usr/bin/pixi")));
    }

    #[test]
    fn test_config_file_used_when_not_on_path() {
        let probe = MockBinaryProbe::new()
            .with_configured("/opt/pixi", true)
            .with_default_install("/home/u/.pixi/bin/pixi", true);
        let locator = BinaryLocator::new(Arc::new(probe));

        assert_eq!(locator.locate(), Ok(PathBuf::from("/opt/pixi")));
    }

    #[test]
    fn test_missing_configured_file_falls_through_to_default() {
        let probe = MockBinaryProbe::new()
            .with_configured("/invalid/path/to/pixi", false)
            .with_default_install("/home/u/.pixi/bin/pixi", true);
        let locator = BinaryLocator::new(Arc::new(probe));

        assert_eq!(locator.locate(), Ok(PathBuf::from("/home/u/.pixi/bin/pixi")));
    }

    #[test]
    fn test_not_found_anywhere() {
        let probe = MockBinaryProbe::new().with_default_install("/does/not/exist/pixi", false);
        let locator = BinaryLocator::new(Arc::new(probe));

        assert_eq!(locator.locate(), Err(LocatorError::NotFound));
        assert_eq!(locator.cached(), None);
    }

    #[test]
    fn test_locate_is_idempotent_and_probes_once() {
        let probe = Arc::new(MockBinaryProbe::new().with_configured("/opt/pixi", true));
        let locator = BinaryLocator::new(probe.clone());

        let first = locator.locate().unwrap();
        let second = locator.locate().unwrap();

        assert_eq!(first, second);
        assert_eq!(probe.search_calls(), 1);
        assert_eq!(probe.config_calls(), 1);
    }

    #[test]
    fn test_reset_forces_new_probe() {
        let probe = Arc::new(MockBinaryProbe::new().with_path_entry("/usr/bin/pixi"));
        let locator = BinaryLocator::new(probe.clone());

        locator.locate().unwrap();
        locator.reset();
        assert_eq!(locator.cached(), None);

        locator.locate().unwrap();
        assert_eq!(probe.search_calls(), 2);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let probe = Arc::new(MockBinaryProbe::new());
        let locator = BinaryLocator::new(probe.clone());

        assert!(locator.locate().is_err());
        assert!(locator.locate().is_err());
        assert_eq!(probe.search_calls(), 2);
    }
}
