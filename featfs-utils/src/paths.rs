//! XDG locations used by featfs
//!
//! Settings live under the config base, logs under the state base. When the
//! platform gives no answer, `$HOME` (or the temp dir) is used instead.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

const APP_NAME: &str = "featfs";
const SETTINGS_FILE: &str = "config.toml";
const LOG_SUBDIR: &str = "log";

#[derive(Clone, Copy)]
enum Base {
    Config,
    State,
}

fn xdg_dir(base: Base) -> PathBuf {
    let dirs = ProjectDirs::from("", "", APP_NAME);
    let found = dirs.as_ref().and_then(|d| match base {
        Base::Config => Some(d.config_dir().to_path_buf()),
        Base::State => d.state_dir().map(Path::to_path_buf),
    });
    found.unwrap_or_else(|| fallback_dir(base))
}

fn fallback_dir(base: Base) -> PathBuf {
    let home = std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    let parent = match base {
        Base::Config => home.join(".config"),
        Base::State => home.join(".local").join("state"),
    };
    parent.join(APP_NAME)
}

/// `$XDG_CONFIG_HOME/featfs`
pub fn config_dir() -> PathBuf {
    xdg_dir(Base::Config)
}

/// Settings file read when none is given on the command line
pub fn config_file() -> PathBuf {
    config_dir().join(SETTINGS_FILE)
}

/// `$XDG_STATE_HOME/featfs`
pub fn state_dir() -> PathBuf {
    xdg_dir(Base::State)
}

/// Where `LogOutput::File` writes
pub fn log_dir() -> PathBuf {
    state_dir().join(LOG_SUBDIR)
}
