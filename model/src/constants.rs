/// Helper macro to avoid retyping the base path of the cluster management API when creating
/// endpoint constants. When given no parameters, this returns the base path. When given a string
/// literal parameter it adds `/parameter` to the end.
macro_rules! clusters_mgmt {
    () => {
        "/api/clusters_mgmt/v1"
    };
    ($s:literal) => {
        concat!(clusters_mgmt!(), "/", $s)
    };
}

// Endpoints
pub const API_BASE: &str = clusters_mgmt!();
pub const CLUSTERS: &str = clusters_mgmt!("clusters");
pub const VERSIONS: &str = clusters_mgmt!("versions");
pub const MACHINE_TYPES: &str = clusters_mgmt!("machine_types");
pub const CLOUD_PROVIDERS: &str = clusters_mgmt!("cloud_providers");
pub const DNS_DOMAINS: &str = clusters_mgmt!("dns_domains");
pub const OIDC_CONFIGS: &str = clusters_mgmt!("oidc_configs");
pub const STS_POLICIES: &str = clusters_mgmt!("aws_inquiries/sts_policies");
pub const STS_CREDENTIAL_REQUESTS: &str = clusters_mgmt!("aws_inquiries/sts_credential_requests");

// Connection defaults
pub const DEFAULT_URL: &str = "https://api.openshift.com";
pub const DEFAULT_TOKEN_URL: &str =
    "https://sso.redhat.com/auth/realms/redhat-external/protocol/openid-connect/token";
pub const DEFAULT_CLIENT_ID: &str = "cloud-services";

// Environment variables
pub const ENV_OCM_URL: &str = "OCM_URL";
pub const ENV_OCM_TOKEN: &str = "OCM_TOKEN";

// Versions
pub const VERSION_PREFIX: &str = "openshift-v";
pub const DEFAULT_CHANNEL_GROUP: &str = "stable";
/// Channel groups that are appended to version ids, e.g. `openshift-v4.12.1-candidate`.
pub const CHANNEL_GROUPS: &[&str] = &["stable", "fast", "candidate", "nightly", "eus"];

// Upgrade policies
pub const SCHEDULE_TYPE_MANUAL: &str = "manual";
pub const UPGRADE_TYPE_OSD: &str = "OSD";

// Cluster products
pub const PRODUCT_ROSA: &str = "rosa";
pub const CLOUD_PROVIDER_AWS: &str = "aws";
