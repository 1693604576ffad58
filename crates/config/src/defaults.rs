//! Built-in configuration defaults

use common::constants::{
    DEFAULT_FRAMEWORK_MASTER, DEFAULT_FRAMEWORK_NAME, DEFAULT_FRAMEWORK_ROLE,
    DEFAULT_FRAMEWORK_STORAGE,
};

/// Prefix of environment variables read into the configuration (`GM_API`, ...)
pub const ENV_PREFIX: &str = "GM";

/// Default value for every known key
pub const DEFAULTS: &[(&str, &str)] = &[
    ("api", ""),
    ("master", DEFAULT_FRAMEWORK_MASTER),
    ("framework_name", DEFAULT_FRAMEWORK_NAME),
    ("framework_role", DEFAULT_FRAMEWORK_ROLE),
    ("framework_timeout", "365days"),
    ("storage", DEFAULT_FRAMEWORK_STORAGE),
    ("storage_timeout", "30s"),
    ("user", ""),
    ("bind_ip", ""),
    ("reconcile_delay", "30s"),
    ("reconcile_max_tries", "3"),
    ("resubscribe_delay", "5s"),
    ("log_level", "info"),
    ("log_format", "text"),
];
