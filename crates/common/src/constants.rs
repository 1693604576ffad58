//! Constants shared by the daemon, the control API and the CLI

/// Default resource manager address
pub const DEFAULT_FRAMEWORK_MASTER: &str = "127.0.0.1:5050";

/// Default framework name announced at registration
pub const DEFAULT_FRAMEWORK_NAME: &str = "gonsumer";

/// Default framework role
pub const DEFAULT_FRAMEWORK_ROLE: &str = "*";

/// Default durable storage connection string
pub const DEFAULT_FRAMEWORK_STORAGE: &str = "file:/tmp/gonsumer.json";

/// Query parameter carrying the group identifier
pub const PARAM_GROUP_ID: &str = "group-id";

/// Query parameter carrying the comma-separated subscriptions
pub const PARAM_SUBSCRIPTION: &str = "subscription";

/// Query parameter carrying the comma-separated bootstrap brokers
pub const PARAM_BOOTSTRAP_BROKERS: &str = "bootstrap-brokers";

/// Control API route for adding a group
pub const GROUP_ADD_PATH: &str = "/api/group/add";

/// Control API route for listing groups
pub const GROUP_LIST_PATH: &str = "/api/group/list";
