// Readiness constants (no magic values in the services)

use crate::domain::VersionTuple;

/// Executable name looked up on the search path
pub const PIXI_EXECUTABLE: &str = "pixi";

/// Oldest Pixi release whose `info --json` contract is supported
pub const MINIMUM_PIXI_VERSION: VersionTuple = VersionTuple::new(0, 30, 0);

/// Expected prefix of `pixi --version` stdout
pub const VERSION_OUTPUT_PREFIX: &str = "pixi ";

/// Set by `pixi shell`; makes Pixi resolve the outer project instead of the working directory
pub const SHELL_MARKER_VAR: &str = "PIXI_IN_SHELL";

/// Overrides the name of the environment picked when nothing else selects one
pub const DEFAULT_ENVIRONMENT_VAR: &str = "PIXI_KERNEL_DEFAULT_ENVIRONMENT";

/// Literal environment name used when no override is set
pub const DEFAULT_ENVIRONMENT_NAME: &str = "default";

/// Set by JupyterLab to the notebook path of the kernel session
pub const SESSION_NAME_VAR: &str = "JPY_SESSION_NAME";

/// IRkernel package; gets its R library paths pinned to the environment
pub const R_KERNEL_PACKAGE: &str = "r-irkernel";

/// R library variables pinned for the R kernel
pub const R_LIBRARY_VARS: [&str; 3] = ["R_LIBS", "R_LIBS_SITE", "R_LIBS_USER"];

/// Key of the Pixi binary path in the user configuration file
pub const CONFIG_PIXI_PATH_KEY: &str = "pixi-path";
