use std::time::Duration;

// Cluster defaults
pub const DEFAULT_TIMEOUT_MINUTES: i64 = 60;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60 * 60);
pub const MAX_CLUSTER_NAME_LENGTH: usize = 15;
pub const MIN_SUPPORTED_VERSION: &str = "4.10.0";
pub const MIN_HTTP_TOKENS_REQUIRED_VERSION: &str = "4.11.0";
pub const HTTP_TOKENS_OPTIONAL: &str = "optional";
pub const HTTP_TOKENS_REQUIRED: &str = "required";
pub const DEFAULT_MACHINE_POOL: &str = "worker";
pub const DEFAULT_MAPPING_METHOD: &str = "claim";
pub const DEFAULT_GROUP: &str = "dedicated-admins";

// Polling
pub const CREATE_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const WAITER_POLL_INTERVAL: Duration = Duration::from_secs(2 * 60);
pub const DELETE_POLL_INTERVAL: Duration = Duration::from_secs(2 * 60);
pub const RETRY_ATTEMPTS: u32 = 3;
pub const READY_RETRY_DELAY: Duration = Duration::from_secs(30);
pub const DELETE_RETRY_DELAY: Duration = Duration::from_secs(60);

// Upgrades
/// Upgrade policies are scheduled this far in the future, and a pending policy that runs sooner
/// than this is kept.
pub const UPGRADE_LEAD_TIME: Duration = Duration::from_secs(10 * 60);

// Properties
pub const PROPERTY_ROSA_TF_VERSION: &str = "rosa_tf_version";
pub const PROPERTY_ROSA_TF_COMMIT: &str = "rosa_tf_commit";
pub const PROPERTY_ROSA_CREATOR_ARN: &str = "rosa_creator_arn";
