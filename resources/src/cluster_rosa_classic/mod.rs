/*!

The `rhcs_cluster_rosa_classic` resource manages a ROSA classic cluster: an OpenShift cluster that
runs in the user's AWS account and is operated by Red Hat.

Creating a cluster resolves the requested version against the enabled ROSA versions of the
channel group, sends the cluster and optionally waits for it to become ready. Updating a cluster
patches the few attributes that can change in place and schedules upgrades through
[`UpgradeReconciler`]. Deleting a cluster waits until the API no longer knows it, unless waiting
was disabled.

!*/

mod state;
mod validation;

pub use state::{
    AdminCredentialsState, ClusterRosaClassicState, InstanceIamRolesState, PrivateHostedZoneState,
    ProxyState, StsState,
};

use crate::common::{ensure_unchanged_if_set, non_empty, removed_from_state};
use async_trait::async_trait;
use log::{debug, error, info};
use rhcs_model::clients::{list_all, AllApis, DEFAULT_PAGE_SIZE};
use rhcs_model::{Cluster, ClusterNodes, ComputeAutoscaling, Proxy, Version, VersionRef};
use rhcs_provider::constants::{DEFAULT_TIMEOUT, PROPERTY_ROSA_CREATOR_ARN};
use rhcs_provider::poll::{timeout_minutes, Deletion, Poller};
use rhcs_provider::provider::{
    ensure_unchanged, ErrorKind, IntoProviderError, ProviderError, ProviderResult, Resource,
};
use rhcs_provider::thumbprint::ThumbprintFetcher;
use rhcs_provider::upgrade::{UpgradeReconciler, VersionPlan};
use rhcs_provider::{version, BuildInfo, Diagnostics};
use state::{default_properties, expand, flatten, merge_properties};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use validation::CANT_BUILD;

const TYPE_NAME: &str = "rhcs_cluster_rosa_classic";
const READY: &str = "ready";

pub struct ClusterRosaClassicResource<C> {
    client: Arc<C>,
    fetcher: Arc<dyn ThumbprintFetcher>,
    build_info: BuildInfo,
    create_poller: Poller,
    delete_poller: Poller,
}

impl<C> ClusterRosaClassicResource<C>
where
    C: AllApis + 'static,
{
    pub fn new(client: Arc<C>, build_info: BuildInfo, fetcher: Arc<dyn ThumbprintFetcher>) -> Self {
        Self {
            client,
            fetcher,
            build_info,
            create_poller: Poller::create(),
            delete_poller: Poller::delete(),
        }
    }

    /// The properties this build of the provider sets on every cluster.
    fn default_properties(&self) -> BTreeMap<String, String> {
        default_properties(&self.build_info.version, &self.build_info.commit)
    }

    /// The raw ids of the enabled ROSA versions in `channel_group`, newest first, and the one
    /// flagged as default.
    async fn versions(&self, channel_group: &str) -> ProviderResult<(Vec<String>, Option<String>)> {
        let search = format!(
            "enabled = 'true' AND rosa_enabled = 'true' AND channel_group = '{}'",
            channel_group
        );
        let client = &self.client;
        let mut versions: Vec<Version> = list_all(DEFAULT_PAGE_SIZE, |page| {
            client.list_versions(&search, page, DEFAULT_PAGE_SIZE)
        })
        .await
        .context(ErrorKind::Remote, "Failed to retrieve versions")?;

        versions.sort_by(|a, b| {
            version::compare(&b.raw_id, &a.raw_id).unwrap_or(Ordering::Equal)
        });
        let default = versions.iter().find(|v| v.default).map(|v| v.raw_id.clone());
        Ok((versions.into_iter().map(|v| v.raw_id).collect(), default))
    }

    /// The version the cluster will be created with. Without a version in the plan this is the
    /// default version of the channel group, or the newest one when none is flagged as default.
    async fn resolve_version(&self, plan: &ClusterRosaClassicState) -> ProviderResult<String> {
        let (versions, default) = self.versions(plan.channel_group()).await?;
        let first = match versions.first() {
            Some(first) => first.clone(),
            None => {
                return Err(ProviderError::validation(
                    CANT_BUILD,
                    format!(
                        "Can't build cluster with name '{}': Could not find versions",
                        plan.name
                    ),
                ))
            }
        };
        let requested = non_empty(&plan.version)
            .map(str::to_string)
            .unwrap_or_else(|| default.unwrap_or(first));
        debug!(
            "Validating if cluster version {} is in the list of supported versions: {:?}",
            requested, versions
        );
        if versions.contains(&requested) {
            return Ok(requested);
        }
        Err(ProviderError::validation(
            CANT_BUILD,
            format!(
                "Can't build cluster with name '{}': version {} is not in the list of supported \
                versions: [{}]",
                plan.name,
                requested,
                versions.join(" ")
            ),
        ))
    }

    /// Copy `cluster` into `state` including the thumbprint of its OIDC endpoint. Failing to get
    /// the thumbprint leaves it empty.
    async fn populate(&self, cluster: &Cluster, state: &mut ClusterRosaClassicState) {
        flatten(cluster, state);
        let endpoint = cluster
            .aws
            .as_ref()
            .and_then(|aws| aws.sts.as_ref())
            .and_then(|sts| sts.oidc_endpoint_url.clone())
            .filter(|url| !url.is_empty());
        if let (Some(endpoint), Some(sts)) = (endpoint, state.sts.as_mut()) {
            sts.thumbprint = Some(match self.fetcher.thumbprint(&endpoint).await {
                Ok(thumbprint) => thumbprint,
                Err(e) => {
                    error!("cannot get thumbprint {}", e);
                    String::new()
                }
            });
        }
    }

    fn ensure_immutable(
        &self,
        state: &ClusterRosaClassicState,
        plan: &ClusterRosaClassicState,
    ) -> ProviderResult<()> {
        ensure_unchanged("name", &state.name, &plan.name)?;
        ensure_unchanged("cloud_region", &state.cloud_region, &plan.cloud_region)?;
        ensure_unchanged_if_set("aws_account_id", &state.aws_account_id, &plan.aws_account_id)?;
        ensure_unchanged_if_set("aws_subnet_ids", &state.aws_subnet_ids, &plan.aws_subnet_ids)?;
        ensure_unchanged_if_set(
            "aws_private_link",
            &state.aws_private_link,
            &plan.aws_private_link,
        )?;
        ensure_unchanged_if_set("private", &state.private, &plan.private)?;
        ensure_unchanged_if_set(
            "availability_zones",
            &state.availability_zones,
            &plan.availability_zones,
        )?;
        ensure_unchanged_if_set("multi_az", &state.multi_az, &plan.multi_az)?;
        ensure_unchanged_if_set("tags", &state.tags, &plan.tags)?;
        ensure_unchanged_if_set("etcd_encryption", &state.etcd_encryption, &plan.etcd_encryption)?;
        ensure_unchanged_if_set("fips", &state.fips, &plan.fips)?;
        ensure_unchanged_if_set("kms_key_arn", &state.kms_key_arn, &plan.kms_key_arn)?;
        ensure_unchanged_if_set(
            "disable_scp_checks",
            &state.disable_scp_checks,
            &plan.disable_scp_checks,
        )?;
        ensure_unchanged_if_set(
            "ec2_metadata_http_tokens",
            &state.ec2_metadata_http_tokens,
            &plan.ec2_metadata_http_tokens,
        )?;
        ensure_unchanged_if_set(
            "compute_machine_type",
            &state.compute_machine_type,
            &plan.compute_machine_type,
        )?;
        ensure_unchanged_if_set(
            "worker_disk_size",
            &state.worker_disk_size,
            &plan.worker_disk_size,
        )?;
        ensure_unchanged_if_set("machine_cidr", &state.machine_cidr, &plan.machine_cidr)?;
        ensure_unchanged_if_set("service_cidr", &state.service_cidr, &plan.service_cidr)?;
        ensure_unchanged_if_set("pod_cidr", &state.pod_cidr, &plan.pod_cidr)?;
        ensure_unchanged_if_set("host_prefix", &state.host_prefix, &plan.host_prefix)?;
        ensure_unchanged_if_set(
            "private_hosted_zone",
            &state.private_hosted_zone,
            &plan.private_hosted_zone,
        )?;
        ensure_unchanged_if_set(
            "admin_credentials",
            &state.admin_credentials,
            &plan.admin_credentials,
        )?;
        if let (Some(state_sts), Some(plan_sts)) = (&state.sts, &plan.sts) {
            ensure_unchanged("sts.role_arn", &state_sts.role_arn, &plan_sts.role_arn)?;
            ensure_unchanged(
                "sts.support_role_arn",
                &state_sts.support_role_arn,
                &plan_sts.support_role_arn,
            )?;
            ensure_unchanged(
                "sts.instance_iam_roles",
                &state_sts.instance_iam_roles,
                &plan_sts.instance_iam_roles,
            )?;
            ensure_unchanged_if_set(
                "sts.oidc_config_id",
                &state_sts.oidc_config_id,
                &plan_sts.oidc_config_id,
            )?;
            ensure_unchanged_if_set(
                "sts.operator_role_prefix",
                &state_sts.operator_role_prefix,
                &plan_sts.operator_role_prefix,
            )?;
        } else {
            ensure_unchanged("sts", &state.sts.is_some(), &plan.sts.is_some())?;
        }
        Ok(())
    }

    /// The version and channel group related part of an update.
    async fn upgrade_if_needed(
        &self,
        cluster_id: &str,
        state: &ClusterRosaClassicState,
        plan: &ClusterRosaClassicState,
    ) -> ProviderResult<()> {
        let channel_group_changed = plan.channel_group() != state.channel_group();
        let version_changed = non_empty(&plan.version).is_some()
            && non_empty(&plan.version) != non_empty(&state.version);
        if channel_group_changed && version_changed {
            return Err(ProviderError::validation(
                "Can't update cluster",
                "Can't update the version and the channel group of a cluster at the same time",
            ));
        }
        if channel_group_changed {
            return Ok(());
        }

        let version_plan = VersionPlan {
            desired: plan.version.clone(),
            previous: state.version.clone(),
            current: state.current_version.clone(),
            channel_group: state.channel_group().to_string(),
            acknowledged_for: plan.upgrade_acknowledgements_for.clone(),
        };
        let outcome = UpgradeReconciler::new(&*self.client, cluster_id)
            .reconcile(&version_plan)
            .await?;
        if let Some(policy) = outcome.scheduled {
            info!(
                "Scheduled upgrade of cluster '{}' to version {}",
                cluster_id,
                policy.version.as_deref().unwrap_or_default()
            );
        }
        Ok(())
    }

    /// Build the cluster patch. Returns `None` when nothing needs to change.
    fn patch(
        &self,
        state: &ClusterRosaClassicState,
        plan: &ClusterRosaClassicState,
        diags: &mut Diagnostics,
    ) -> ProviderResult<Option<Cluster>> {
        let mut patch = Cluster::default();

        let mut nodes = ClusterNodes::default();
        if plan.replicas.is_some() && plan.replicas != state.replicas {
            nodes.compute = plan.replicas;
        }
        if plan.is_autoscaling() {
            nodes.autoscale_compute = Some(ComputeAutoscaling {
                min_replicas: plan.min_replicas.unwrap_or_default(),
                max_replicas: plan.max_replicas.unwrap_or_default(),
            });
        } else if plan.min_replicas.is_some() || plan.max_replicas.is_some() {
            return Err(ProviderError::validation(
                "Can't update cluster",
                "Can't update MaxReplica and/or MinReplica of cluster when autoscaling is not \
                enabled",
            ));
        }
        if plan.default_mp_labels.is_some() && plan.default_mp_labels != state.default_mp_labels
        {
            nodes.compute_labels = plan.default_mp_labels.clone();
        }
        if nodes != ClusterNodes::default() {
            patch.nodes = Some(nodes);
        }

        // Removed proxy settings are sent as empty strings.
        if plan.proxy != state.proxy {
            let proxy = plan.proxy.clone().unwrap_or_default();
            patch.proxy = Some(Proxy {
                http_proxy: Some(proxy.http_proxy.unwrap_or_default()),
                https_proxy: Some(proxy.https_proxy.unwrap_or_default()),
                no_proxy: Some(proxy.no_proxy.unwrap_or_default()),
            });
            patch.additional_trust_bundle = Some(proxy.additional_trust_bundle.unwrap_or_default());
        }

        if plan.disable_workload_monitoring.is_some()
            && plan.disable_workload_monitoring != state.disable_workload_monitoring
        {
            patch.disable_user_workload_monitoring = plan.disable_workload_monitoring;
        }

        if self.should_patch_properties(state, plan) {
            let creator_arn = |s: &ClusterRosaClassicState| {
                s.properties
                    .as_ref()
                    .and_then(|p| p.get(PROPERTY_ROSA_CREATOR_ARN).cloned())
            };
            if creator_arn(state) != creator_arn(plan) {
                diags.add_warning(
                    format!("Shouldn't patch property '{}'", PROPERTY_ROSA_CREATOR_ARN),
                    format!(
                        "The property '{}' records who created the cluster and is not expected \
                        to change",
                        PROPERTY_ROSA_CREATOR_ARN
                    ),
                );
            }
            patch.properties = Some(merge_properties(self.default_properties(), &plan.properties));
        }

        if patch == Cluster::default() {
            Ok(None)
        } else {
            Ok(Some(patch))
        }
    }

    /// The user's properties changed, or the cluster carries the properties of another build.
    fn should_patch_properties(
        &self,
        state: &ClusterRosaClassicState,
        plan: &ClusterRosaClassicState,
    ) -> bool {
        if plan.properties.is_some() && plan.properties != state.properties {
            return true;
        }
        let user = state.properties.clone().unwrap_or_default();
        let provider_properties: BTreeMap<String, String> = state
            .ocm_properties
            .clone()
            .unwrap_or_default()
            .into_iter()
            .filter(|(key, _)| !user.contains_key(key))
            .collect();
        provider_properties != self.default_properties()
    }
}

#[async_trait]
impl<C> Resource for ClusterRosaClassicResource<C>
where
    C: AllApis + 'static,
{
    type State = ClusterRosaClassicState;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    async fn create(
        &self,
        mut plan: ClusterRosaClassicState,
        diags: &mut Diagnostics,
    ) -> ProviderResult<ClusterRosaClassicState> {
        validation::validate_plan(&plan)?;
        let version = self.resolve_version(&plan).await?;
        validation::validate_minimum_version(&version)?;
        validation::validate_http_tokens_version(&plan, &version)?;

        let properties = merge_properties(self.default_properties(), &plan.properties);
        let request = expand(&plan, &version, properties);
        info!("Creating cluster '{}' with version {}", plan.name, version);
        let mut cluster = self
            .client
            .create_cluster(&request)
            .await
            .context(ErrorKind::Remote, "Can't create cluster")?;
        let cluster_id = cluster.id.clone().unwrap_or_default();

        if plan.wait_for_create_complete.unwrap_or_default() {
            match self
                .create_poller
                .wait_until_ready(&*self.client, &cluster_id, DEFAULT_TIMEOUT)
                .await
            {
                Ok(()) => match self.client.get_cluster(&cluster_id).await {
                    Ok(ready) => cluster = ready,
                    Err(e) => diags.push_error(&ProviderError::new_with_source_and_context(
                        ErrorKind::Remote,
                        "Can't find cluster",
                        e,
                    )),
                },
                Err(e) => diags.add_error(
                    "Waiting for cluster creation finished with error",
                    format!("Waiting for cluster creation finished with the error {}", e),
                ),
            }
        }

        self.populate(&cluster, &mut plan).await;
        Ok(plan)
    }

    async fn read(
        &self,
        mut state: ClusterRosaClassicState,
        diags: &mut Diagnostics,
    ) -> ProviderResult<Option<ClusterRosaClassicState>> {
        let cluster_id = state.id.clone().unwrap_or_default();
        let cluster = match self
            .client
            .get_cluster(&cluster_id)
            .await
            .context(ErrorKind::Remote, "Can't find cluster")
        {
            Ok(cluster) => cluster,
            Err(e) if e.is_not_found() => {
                removed_from_state(diags, "Cluster", format!("cluster ({})", cluster_id));
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        self.populate(&cluster, &mut state).await;
        Ok(Some(state))
    }

    async fn update(
        &self,
        state: ClusterRosaClassicState,
        mut plan: ClusterRosaClassicState,
        diags: &mut Diagnostics,
    ) -> ProviderResult<ClusterRosaClassicState> {
        let cluster_id = state.id.clone().unwrap_or_default();
        let cluster_state = non_empty(&state.state).unwrap_or("unknown");
        if cluster_state != READY {
            return Err(ProviderError::validation(
                "Update cluster operation is only supported while cluster is ready",
                format!(
                    "Update cluster operation is only supported while cluster is ready, cluster \
                    state is {}",
                    cluster_state
                ),
            ));
        }
        validation::validate_plan(&plan)?;
        self.ensure_immutable(&state, &plan)?;
        self.upgrade_if_needed(&cluster_id, &state, &plan)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::Validation => e,
                kind => ProviderError::new_with_source_and_context(kind, "Can't upgrade cluster", e),
            })?;

        let mut patch = self.patch(&state, &plan, diags)?;
        if plan.channel_group() != state.channel_group() {
            let patch = patch.get_or_insert_with(Cluster::default);
            patch.version = Some(VersionRef {
                channel_group: Some(plan.channel_group().to_string()),
                ..VersionRef::default()
            });
        }

        let cluster = match patch {
            Some(patch) => self
                .client
                .update_cluster(&cluster_id, &patch)
                .await
                .context(ErrorKind::Remote, "Can't update cluster")?,
            None => self
                .client
                .get_cluster(&cluster_id)
                .await
                .context(ErrorKind::Remote, "Can't find cluster")?,
        };

        plan.id = state.id.clone();
        plan.ocm_properties = state.ocm_properties.clone();
        if let (Some(plan_sts), Some(state_sts)) = (plan.sts.as_mut(), state.sts.as_ref()) {
            if plan_sts.operator_role_prefix.is_none() {
                plan_sts.operator_role_prefix = state_sts.operator_role_prefix.clone();
            }
        }
        self.populate(&cluster, &mut plan).await;
        Ok(plan)
    }

    async fn delete(
        &self,
        state: ClusterRosaClassicState,
        diags: &mut Diagnostics,
    ) -> ProviderResult<()> {
        let cluster_id = state.id.clone().unwrap_or_default();
        match self
            .client
            .delete_cluster(&cluster_id)
            .await
            .context(ErrorKind::Remote, "Can't delete cluster")
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                info!("Cluster '{}' was already deleted", cluster_id);
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        if state.disable_waiting_in_destroy.unwrap_or_default() {
            info!("Waiting for destroy to be completed, is disabled");
            return Ok(());
        }
        let timeout = timeout_minutes(state.destroy_timeout, &cluster_id, diags);
        let deletion = self
            .delete_poller
            .wait_until_deleted(&*self.client, &cluster_id, timeout)
            .await
            .map_err(|e| {
                ProviderError::new_with_source_and_context(
                    e.kind(),
                    "Can't poll cluster state",
                    format!(
                        "Can't poll state of cluster with identifier '{}': {}",
                        cluster_id, e
                    ),
                )
            })?;
        if deletion == Deletion::TimedOut {
            diags.add_warning(
                "Cluster wasn't deleted yet",
                format!(
                    "The cluster with identifier '{}' is not deleted yet, but the polling \
                    finished due to a timeout",
                    cluster_id
                ),
            );
        }
        Ok(())
    }

    async fn import(
        &self,
        id: &str,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<ClusterRosaClassicState> {
        Ok(ClusterRosaClassicState {
            id: Some(id.to_string()),
            ..ClusterRosaClassicState::default()
        })
    }
}
