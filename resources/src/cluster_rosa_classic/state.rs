use crate::common::non_empty;
use rhcs_model::constants::{CLOUD_PROVIDER_AWS, DEFAULT_CHANNEL_GROUP, PRODUCT_ROSA};
use rhcs_model::{
    Api, Ccs, Cluster, ClusterAws, ClusterNodes, ComputeAutoscaling, Configuration, HtpasswdUser,
    HtpasswdUsers, IdRef, InstanceIamRoles, List, Network, Proxy, RootVolume, RootVolumeAws, Sts,
    VersionRef,
};
use rhcs_provider::constants::{
    HTTP_TOKENS_OPTIONAL, PROPERTY_ROSA_CREATOR_ARN, PROPERTY_ROSA_TF_COMMIT,
    PROPERTY_ROSA_TF_VERSION,
};
use rhcs_provider::version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const LISTENING_INTERNAL: &str = "internal";
const LISTENING_EXTERNAL: &str = "external";
const HTTPS_PREFIX: &str = "https://";

/// The `rhcs_cluster_rosa_classic` schema.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterRosaClassicState {
    pub id: Option<String>,
    pub external_id: Option<String>,
    pub infra_id: Option<String>,
    pub name: String,
    pub cloud_region: String,
    pub aws_account_id: Option<String>,
    pub aws_subnet_ids: Option<Vec<String>>,
    pub aws_private_link: Option<bool>,
    pub private: Option<bool>,
    pub availability_zones: Option<Vec<String>>,
    pub multi_az: Option<bool>,
    /// User defined properties. The provider's own properties are not listed here.
    pub properties: Option<BTreeMap<String, String>>,
    /// Every property of the cluster, including those set by the provider.
    pub ocm_properties: Option<BTreeMap<String, String>>,
    pub tags: Option<BTreeMap<String, String>>,
    pub ccs_enabled: Option<bool>,
    pub etcd_encryption: Option<bool>,
    pub fips: Option<bool>,
    pub kms_key_arn: Option<String>,
    pub disable_workload_monitoring: Option<bool>,
    pub disable_scp_checks: Option<bool>,
    pub ec2_metadata_http_tokens: Option<String>,
    pub autoscaling_enabled: Option<bool>,
    pub min_replicas: Option<i64>,
    pub max_replicas: Option<i64>,
    pub replicas: Option<i64>,
    pub compute_machine_type: Option<String>,
    pub worker_disk_size: Option<i64>,
    pub default_mp_labels: Option<BTreeMap<String, String>>,
    pub machine_cidr: Option<String>,
    pub service_cidr: Option<String>,
    pub pod_cidr: Option<String>,
    pub host_prefix: Option<i64>,
    pub proxy: Option<ProxyState>,
    pub sts: Option<StsState>,
    pub private_hosted_zone: Option<PrivateHostedZoneState>,
    pub channel_group: Option<String>,
    /// The version requested by the user, without the `openshift-v` prefix.
    pub version: Option<String>,
    /// The version the cluster runs.
    pub current_version: Option<String>,
    pub state: Option<String>,
    pub api_url: Option<String>,
    pub console_url: Option<String>,
    pub domain: Option<String>,
    pub base_dns_domain: Option<String>,
    pub upgrade_acknowledgements_for: Option<String>,
    pub disable_waiting_in_destroy: Option<bool>,
    /// Minutes to wait for the cluster to be deleted.
    pub destroy_timeout: Option<i64>,
    pub wait_for_create_complete: Option<bool>,
    pub admin_credentials: Option<AdminCredentialsState>,
}

impl Configuration for ClusterRosaClassicState {}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyState {
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
    pub no_proxy: Option<String>,
    pub additional_trust_bundle: Option<String>,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StsState {
    /// The issuer of the cluster's service account tokens, without `https://`.
    pub oidc_endpoint_url: Option<String>,
    pub oidc_config_id: Option<String>,
    pub thumbprint: Option<String>,
    pub role_arn: String,
    pub support_role_arn: String,
    pub instance_iam_roles: InstanceIamRolesState,
    pub operator_role_prefix: Option<String>,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceIamRolesState {
    pub master_role_arn: String,
    pub worker_role_arn: String,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivateHostedZoneState {
    pub id: String,
    pub role_arn: String,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminCredentialsState {
    pub username: String,
    pub password: String,
}

impl ClusterRosaClassicState {
    pub(crate) fn channel_group(&self) -> &str {
        non_empty(&self.channel_group).unwrap_or(DEFAULT_CHANNEL_GROUP)
    }

    pub(crate) fn is_autoscaling(&self) -> bool {
        self.autoscaling_enabled.unwrap_or_default()
    }

    pub(crate) fn is_private(&self) -> bool {
        self.private.unwrap_or_default() || self.aws_private_link.unwrap_or_default()
    }
}

/// The properties the provider sets on every cluster it creates.
pub(crate) fn default_properties(version: &str, commit: &str) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();
    properties.insert(PROPERTY_ROSA_TF_VERSION.to_string(), version.to_string());
    properties.insert(PROPERTY_ROSA_TF_COMMIT.to_string(), commit.to_string());
    properties
}

pub(crate) fn is_reserved_property(key: &str) -> bool {
    key == PROPERTY_ROSA_TF_VERSION || key == PROPERTY_ROSA_TF_COMMIT
}

/// The provider's properties overlaid with the user's.
pub(crate) fn merge_properties(
    defaults: BTreeMap<String, String>,
    user: &Option<BTreeMap<String, String>>,
) -> BTreeMap<String, String> {
    let mut merged = defaults;
    if let Some(user) = user {
        merged.extend(user.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    merged
}

/// Build the cluster creation request. `version` is the raw version that was resolved for the
/// plan and `properties` the merged properties.
pub(crate) fn expand(
    plan: &ClusterRosaClassicState,
    version: &str,
    properties: BTreeMap<String, String>,
) -> Cluster {
    let autoscaling = plan.is_autoscaling();
    let nodes = ClusterNodes {
        compute: if autoscaling { None } else { plan.replicas },
        compute_machine_type: plan.compute_machine_type.clone().map(IdRef::new),
        autoscale_compute: if autoscaling {
            Some(ComputeAutoscaling {
                min_replicas: plan.min_replicas.unwrap_or_default(),
                max_replicas: plan.max_replicas.unwrap_or_default(),
            })
        } else {
            None
        },
        availability_zones: plan.availability_zones.clone(),
        compute_labels: plan.default_mp_labels.clone(),
        compute_root_volume: plan.worker_disk_size.map(|size| RootVolume {
            aws: Some(RootVolumeAws { size }),
        }),
    };

    let aws = ClusterAws {
        account_id: plan.aws_account_id.clone(),
        subnet_ids: plan.aws_subnet_ids.clone(),
        private_link: Some(plan.aws_private_link.unwrap_or_default()),
        kms_key_arn: plan.kms_key_arn.clone(),
        ec2_metadata_http_tokens: plan.ec2_metadata_http_tokens.clone(),
        tags: plan.tags.clone(),
        sts: plan.sts.as_ref().map(expand_sts),
        private_hosted_zone_id: plan.private_hosted_zone.as_ref().map(|z| z.id.clone()),
        private_hosted_zone_role_arn: plan
            .private_hosted_zone
            .as_ref()
            .map(|z| z.role_arn.clone()),
        ..ClusterAws::default()
    };

    let network = Network {
        machine_cidr: plan.machine_cidr.clone(),
        service_cidr: plan.service_cidr.clone(),
        pod_cidr: plan.pod_cidr.clone(),
        host_prefix: plan.host_prefix,
    };

    Cluster {
        name: Some(plan.name.clone()),
        product: Some(IdRef::new(PRODUCT_ROSA)),
        cloud_provider: Some(IdRef::new(CLOUD_PROVIDER_AWS)),
        region: Some(IdRef::new(plan.cloud_region.clone())),
        multi_az: Some(plan.multi_az.unwrap_or_default()),
        ccs: Some(Ccs {
            enabled: Some(true),
            disable_scp_checks: plan.disable_scp_checks,
        }),
        properties: Some(properties),
        api: Some(Api {
            url: None,
            listening: Some(
                if plan.is_private() {
                    LISTENING_INTERNAL
                } else {
                    LISTENING_EXTERNAL
                }
                .to_string(),
            ),
        }),
        nodes: Some(nodes).filter(|nodes| nodes != &ClusterNodes::default()),
        aws: Some(aws),
        network: Some(network).filter(|network| network != &Network::default()),
        etcd_encryption: plan.etcd_encryption,
        fips: plan.fips,
        disable_user_workload_monitoring: plan.disable_workload_monitoring,
        version: Some(VersionRef {
            id: Some(version::version_id(version, plan.channel_group())),
            raw_id: None,
            channel_group: Some(plan.channel_group().to_string()),
        }),
        proxy: plan.proxy.as_ref().and_then(expand_proxy),
        additional_trust_bundle: plan
            .proxy
            .as_ref()
            .and_then(|proxy| proxy.additional_trust_bundle.clone()),
        htpasswd: plan.admin_credentials.as_ref().map(|credentials| HtpasswdUsers {
            users: List::of(vec![HtpasswdUser {
                id: None,
                username: credentials.username.clone(),
                password: Some(credentials.password.clone()),
            }]),
        }),
        ..Cluster::default()
    }
}

fn expand_sts(sts: &StsState) -> Sts {
    Sts {
        role_arn: Some(sts.role_arn.clone()),
        support_role_arn: Some(sts.support_role_arn.clone()),
        instance_iam_roles: Some(InstanceIamRoles {
            master_role_arn: Some(sts.instance_iam_roles.master_role_arn.clone()),
            worker_role_arn: Some(sts.instance_iam_roles.worker_role_arn.clone()),
        }),
        operator_role_prefix: sts.operator_role_prefix.clone(),
        oidc_endpoint_url: None,
        oidc_config: non_empty(&sts.oidc_config_id).map(IdRef::new),
        operator_iam_roles: None,
    }
}

/// The proxy part of a request, `None` when no proxy is configured.
pub(crate) fn expand_proxy(proxy: &ProxyState) -> Option<Proxy> {
    let expanded = Proxy {
        http_proxy: proxy.http_proxy.clone(),
        https_proxy: proxy.https_proxy.clone(),
        no_proxy: proxy.no_proxy.clone(),
    };
    Some(expanded).filter(|expanded| expanded != &Proxy::default())
}

/// Copy the attributes of `cluster` into `state`. Attributes the API never returns, such as the
/// requested version and the admin password, are left as they are. The thumbprint is computed
/// separately.
pub(crate) fn flatten(cluster: &Cluster, state: &mut ClusterRosaClassicState) {
    state.id = cluster.id.clone();
    state.external_id = cluster.external_id.clone();
    state.infra_id = cluster.infra_id.clone();
    if let Some(name) = &cluster.name {
        state.name = name.clone();
    }
    if let Some(region) = &cluster.region {
        state.cloud_region = region.id.clone();
    }
    state.multi_az = Some(cluster.multi_az.unwrap_or_default());
    state.state = cluster.state.map(|s| s.to_string());

    flatten_properties(cluster, state);

    let ccs = cluster.ccs.clone().unwrap_or_default();
    state.ccs_enabled = Some(ccs.enabled.unwrap_or_default());
    state.disable_scp_checks = Some(ccs.disable_scp_checks.unwrap_or_default());
    state.etcd_encryption = Some(cluster.etcd_encryption.unwrap_or_default());
    state.fips = Some(cluster.fips.unwrap_or_default());
    state.disable_workload_monitoring =
        Some(cluster.disable_user_workload_monitoring.unwrap_or_default());

    let api = cluster.api.clone().unwrap_or_default();
    state.api_url = api.url;
    state.private = Some(api.listening.as_deref() == Some(LISTENING_INTERNAL));
    state.console_url = cluster.console.as_ref().and_then(|c| c.url.clone());
    let base_domain = cluster.dns.as_ref().and_then(|dns| dns.base_domain.clone());
    state.domain = base_domain
        .as_ref()
        .map(|base_domain| format!("{}.{}", state.name, base_domain));
    state.base_dns_domain = base_domain;

    flatten_nodes(cluster.nodes.as_ref(), state);
    flatten_aws(cluster.aws.as_ref(), state);

    let network = cluster.network.clone().unwrap_or_default();
    state.machine_cidr = network.machine_cidr;
    state.service_cidr = network.service_cidr;
    state.pod_cidr = network.pod_cidr;
    state.host_prefix = network.host_prefix;

    let proxy = cluster.proxy.clone().unwrap_or_default();
    let proxy = ProxyState {
        http_proxy: proxy.http_proxy,
        https_proxy: proxy.https_proxy,
        no_proxy: proxy.no_proxy,
        additional_trust_bundle: cluster.additional_trust_bundle.clone(),
    };
    state.proxy = Some(proxy).filter(|proxy| proxy != &ProxyState::default());

    if let Some(version) = &cluster.version {
        state.current_version = version
            .raw_id
            .clone()
            .filter(|raw_id| !raw_id.is_empty())
            .or_else(|| version.id.as_deref().map(|id| version::normalize(id).to_string()));
        if let Some(channel_group) = non_empty(&version.channel_group) {
            state.channel_group = Some(channel_group.to_string());
        }
    }
    if state.channel_group.is_none() {
        state.channel_group = Some(DEFAULT_CHANNEL_GROUP.to_string());
    }
}

fn flatten_properties(cluster: &Cluster, state: &mut ClusterRosaClassicState) {
    let all = cluster.properties.clone().unwrap_or_default();
    let user: BTreeMap<String, String> = all
        .iter()
        .filter(|(key, _)| !is_reserved_property(key))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    state.properties = if user.is_empty() && state.properties.is_none() {
        None
    } else {
        Some(user)
    };
    state.ocm_properties = Some(all);
}

fn flatten_nodes(nodes: Option<&ClusterNodes>, state: &mut ClusterRosaClassicState) {
    let nodes = nodes.cloned().unwrap_or_default();
    match nodes.autoscale_compute {
        Some(autoscaling) => {
            state.autoscaling_enabled = Some(true);
            state.min_replicas = Some(autoscaling.min_replicas);
            state.max_replicas = Some(autoscaling.max_replicas);
            state.replicas = None;
        }
        None => {
            state.autoscaling_enabled = Some(false);
            state.min_replicas = None;
            state.max_replicas = None;
            state.replicas = nodes.compute;
        }
    }
    state.compute_machine_type = nodes.compute_machine_type.map(|t| t.id);
    state.availability_zones = nodes.availability_zones;
    state.default_mp_labels = nodes.compute_labels;
    state.worker_disk_size = nodes
        .compute_root_volume
        .and_then(|volume| volume.aws)
        .map(|aws| aws.size);
}

fn flatten_aws(aws: Option<&ClusterAws>, state: &mut ClusterRosaClassicState) {
    let aws = aws.cloned().unwrap_or_default();
    state.aws_account_id = aws.account_id.filter(|id| !id.is_empty()).or_else(|| {
        state
            .ocm_properties
            .as_ref()
            .and_then(|p| p.get(PROPERTY_ROSA_CREATOR_ARN))
            .and_then(|arn| arn_account(arn))
            .map(str::to_string)
    });
    state.aws_subnet_ids = aws.subnet_ids;
    state.aws_private_link = Some(aws.private_link.unwrap_or_default());
    state.kms_key_arn = aws.kms_key_arn;
    state.tags = aws.tags;
    state.ec2_metadata_http_tokens = Some(
        aws.ec2_metadata_http_tokens
            .filter(|tokens| !tokens.is_empty())
            .unwrap_or_else(|| HTTP_TOKENS_OPTIONAL.to_string()),
    );
    state.private_hosted_zone = aws.private_hosted_zone_id.map(|id| PrivateHostedZoneState {
        id,
        role_arn: aws.private_hosted_zone_role_arn.unwrap_or_default(),
    });

    state.sts = aws.sts.map(|sts| {
        let previous = state.sts.take().unwrap_or_default();
        let roles = sts.instance_iam_roles.unwrap_or_default();
        StsState {
            oidc_endpoint_url: sts.oidc_endpoint_url.map(|url| {
                url.strip_prefix(HTTPS_PREFIX)
                    .map(str::to_string)
                    .unwrap_or(url)
            }),
            oidc_config_id: sts.oidc_config.map(|config| config.id),
            thumbprint: previous.thumbprint,
            role_arn: sts.role_arn.unwrap_or_default(),
            support_role_arn: sts.support_role_arn.unwrap_or_default(),
            instance_iam_roles: InstanceIamRolesState {
                master_role_arn: roles.master_role_arn.unwrap_or_default(),
                worker_role_arn: roles.worker_role_arn.unwrap_or_default(),
            },
            operator_role_prefix: previous
                .operator_role_prefix
                .filter(|prefix| !prefix.is_empty())
                .or(sts.operator_role_prefix),
        }
    });
}

/// The account id of an ARN, e.g. `123456789012` for `arn:aws:iam::123456789012:user/dummy`.
pub(crate) fn arn_account(arn: &str) -> Option<&str> {
    arn.split(':').nth(4).filter(|account| !account.is_empty())
}
