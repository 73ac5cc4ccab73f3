//! Settings schema structs

use featfs_utils::LogOutput;
use serde::{Deserialize, Serialize};

/// Root settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub namespace: NamespaceSettings,
    pub boot: BootSettings,
    pub logging: LoggingSettings,
}

/// What to do with parameter directories of internal features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternalParamDirs {
    /// Expose them like any other feature's
    #[default]
    Show,
    /// Expose them with read-only parameter files
    ReadOnly,
    /// Do not create them
    Hide,
}

/// Namespace shape and limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceSettings {
    /// Bytes handled per step when parsing a parameter write (default: 1024)
    pub chunk_size: usize,
    /// Maximum number of nodes in the tree (default: 65536)
    pub max_nodes: usize,
    /// Parameter directories of internal features (default: show)
    pub internal_param_dirs: InternalParamDirs,
}

impl Default for NamespaceSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            max_nodes: 65536,
            internal_param_dirs: InternalParamDirs::Show,
        }
    }
}

/// Features the root config activates at mount
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BootSettings {
    /// Written to the root config's `set_features`
    pub features: Vec<String>,
    /// Fail the mount when a boot feature cannot be enabled (default: false)
    pub strict: bool,
}

/// Log output of the binary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directives, overridden by `FEATFS_LOG` (default: "info")
    pub filter: String,
    pub output: LogOutput,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".into(),
            output: LogOutput::Stderr,
        }
    }
}
