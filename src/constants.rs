//! # Constants
//!
//! Shared names and defaults used across the dispatch core.

/// Policy names, also used as log field values
pub mod policies {
    pub const HANDLES: &str = "handles";
    pub const PROVIDES: &str = "provides";
    pub const CREATES: &str = "creates";
    pub const LOOKSUP: &str = "looksup";
}

/// System defaults
pub mod system {
    /// Maximum number of nested inquiries in one resolution chain
    pub const DEFAULT_MAX_RESOLUTION_DEPTH: usize = 32;

    /// Environment variable prefix for configuration overrides
    pub const ENV_PREFIX: &str = "MEDIATOR";

    /// Default configuration directory
    pub const CONFIG_DIRECTORY: &str = "config";

    /// Base configuration file stem inside the configuration directory
    pub const CONFIG_FILE_STEM: &str = "mediator";

    /// Default log level when neither configuration nor environment set one
    pub const DEFAULT_LOG_LEVEL: &str = "info";
}
