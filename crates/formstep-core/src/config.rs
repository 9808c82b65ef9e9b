// Workflow configuration
//
// Settings supplied by the surrounding environment rather than by the
// workflow definition itself.

use std::env;

/// Environment variable holding the builder asset version tag
pub const VERSION_TAG_ENV: &str = "FORMSTEP_VERSION_TAG";

/// Configuration shared by workflows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Asset version tag passed to builder steps (cache busting for the editor bundle)
    pub version_tag: Option<String>,
}

impl WorkflowConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `FORMSTEP_VERSION_TAG`: builder asset version tag (unset or empty means none)
    pub fn from_env() -> Self {
        let version_tag = env::var(VERSION_TAG_ENV).ok().filter(|v| !v.is_empty());
        Self { version_tag }
    }

    /// Set the version tag
    pub fn with_version_tag(mut self, version_tag: impl Into<String>) -> Self {
        self.version_tag = Some(version_tag.into());
        self
    }
}
