//! Default settings
//!
//! Printed by `featfs --print-default-config` and used when no settings file
//! exists.

pub const DEFAULT_SETTINGS_TOML: &str = r##"
# featfs settings

[namespace]
chunk_size = 1024
max_nodes = 65536
# show | read_only | hide
internal_param_dirs = "show"

[boot]
# Activated through the root config at startup
features = []
strict = false

[logging]
filter = "info"
# stderr | file | both
output = "stderr"
"##;
