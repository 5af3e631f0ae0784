// Binary Probe Port
// Filesystem and search-path lookups used to locate the package manager binary

use std::path::{Path, PathBuf};

/// Probe port for the binary locator
///
/// Each method is one independent lookup; the locator decides the order.
pub trait BinaryProbe: Send + Sync {
    /// Resolve an executable name through the process search path
    fn search_path(&self, name: &str) -> Option<PathBuf>;

    /// Path recorded under `pixi-path` in the user configuration file
    ///
    /// Returns `None` if the file is missing, unreadable, malformed, or has no such key.
    fn configured_path(&self) -> Option<PathBuf>;

    /// Default install location under the user's home directory
    fn default_install_path(&self) -> Option<PathBuf>;

    /// Check that `path` exists and is a regular file
    fn is_file(&self, path: &Path) -> bool;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock probe with fixed answers and call counters
    #[derive(Default)]
    pub struct MockBinaryProbe {
        pub on_path: Option<PathBuf>,
        pub configured: Option<PathBuf>,
        pub default_install: Option<PathBuf>,
        pub existing_files: HashSet<PathBuf>,
        search_calls: AtomicUsize,
        config_calls: AtomicUsize,
    }

    impl MockBinaryProbe {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_path_entry(mut self, path: impl Into<PathBuf>) -> Self {
            self.on_path = Some(path.into());
            self
        }

        /// Configured path; `exists` controls whether `is_file` reports it
        pub fn with_configured(mut self, path: impl Into<PathBuf>, exists: bool) -> Self {
            let path = path.into();
            if exists {
                self.existing_files.insert(path.clone());
            }
            self.configured = Some(path);
            self
        }

        /// Default install path; `exists` controls whether `is_file` reports it
        pub fn with_default_install(mut self, path: impl Into<PathBuf>, exists: bool) -> Self {
            let path = path.into();
            if exists {
                self.existing_files.insert(path.clone());
            }
            self.default_install = Some(path);
            self
        }

        pub fn search_calls(&self) -> usize {
            self.search_calls.load(Ordering::SeqCst)
        }

        pub fn config_calls(&self) -> usize {
            self.config_calls.load(Ordering::SeqCst)
        }
    }

    impl BinaryProbe for MockBinaryProbe {
        fn search_path(&self, _name: &str) -> Option<PathBuf> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            self.on_path.clone()
        }

        fn configured_path(&self) -> Option<PathBuf> {
            self.config_calls.fetch_add(1, Ordering::SeqCst);
            self.configured.clone()
        }

        fn default_install_path(&self) -> Option<PathBuf> {
            self.default_install.clone()
        }

        fn is_file(&self, path: &Path) -> bool {
            self.existing_files.contains(path)
        }
    }
}
