/*!

The `rhcs_machine_pool` resource manages an additional group of worker nodes of a cluster.

The default pool, `worker`, is created together with the cluster. Declaring a pool with that name
adopts the existing pool and applies the configuration to it instead of creating a new one. A
cluster must keep at least one pool, so destroying the last one only drops it from the state.

!*/

use crate::common::{
    ensure_unchanged_if_set, non_empty, removed_from_state, required, wait_for_cluster,
};
use async_trait::async_trait;
use lazy_static::lazy_static;
use log::{info, warn};
use regex::Regex;
use rhcs_model::clients::{ClusterApi, HttpStatusCode, MachinePoolApi};
use rhcs_model::{
    AwsMachinePool, Cluster, Configuration, MachinePool, MachinePoolAutoscaling, RootVolume,
    RootVolumeAws, SpotMarketOptions, Taint,
};
use rhcs_provider::constants::DEFAULT_MACHINE_POOL;
use rhcs_provider::import::parse_composite_id;
use rhcs_provider::poll::Poller;
use rhcs_provider::provider::{
    ensure_unchanged, ErrorKind, IntoProviderError, ProviderError, ProviderResult, Resource,
};
use rhcs_provider::Diagnostics;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

const CANT_BUILD: &str = "Can't build machine pool";
const CANT_UPDATE: &str = "Can't update machine pool";

lazy_static! {
    #[allow(clippy::unwrap_used)]
    static ref NAME: Regex = Regex::new(r"^[a-z]([-a-z0-9]*[a-z0-9])?$").unwrap();
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachinePoolState {
    pub cluster: String,
    pub id: Option<String>,
    pub name: String,
    pub machine_type: Option<String>,
    pub replicas: Option<i64>,
    pub use_spot_instances: Option<bool>,
    pub max_spot_price: Option<f64>,
    pub autoscaling_enabled: Option<bool>,
    pub min_replicas: Option<i64>,
    pub max_replicas: Option<i64>,
    pub taints: Option<Vec<TaintState>>,
    pub labels: Option<BTreeMap<String, String>>,
    pub multi_availability_zone: Option<bool>,
    pub availability_zone: Option<String>,
    /// Computed, set for pools spanning several zones.
    pub availability_zones: Option<Vec<String>>,
    pub subnet_id: Option<String>,
    /// Computed, set for pools spanning several subnets.
    pub subnet_ids: Option<Vec<String>>,
    /// Root disk size in GiB.
    pub disk_size: Option<i64>,
    pub aws_additional_security_group_ids: Option<Vec<String>>,
}

impl Configuration for MachinePoolState {}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaintState {
    pub key: String,
    pub value: String,
    /// The taint effect, e.g. `NoSchedule`.
    pub schedule_type: String,
}

impl MachinePoolState {
    fn is_autoscaling(&self) -> bool {
        self.autoscaling_enabled.unwrap_or_default()
    }
}

fn validate_name(plan: &MachinePoolState) -> ProviderResult<()> {
    if !NAME.is_match(&plan.name) {
        return Err(ProviderError::validation(
            "Can't create machine pool",
            format!(
                "Can't create machine pool for cluster '{}' with name '{}'. Expected a valid \
                value for 'name' matching {}",
                plan.cluster,
                plan.name,
                NAME.as_str()
            ),
        ));
    }
    Ok(())
}

fn validate_spot(plan: &MachinePoolState) -> ProviderResult<()> {
    let spot = plan.use_spot_instances.unwrap_or_default();
    match plan.max_spot_price {
        Some(_) if !spot => Err(ProviderError::validation(
            CANT_BUILD,
            format!(
                "Can't build machine pool for cluster '{}': Can't set max price when not using \
                spot instances (set \"use_spot_instances\" to true)",
                plan.cluster
            ),
        )),
        Some(price) if price <= 0.0 => Err(ProviderError::validation(
            CANT_BUILD,
            format!(
                "Can't build machine pool for cluster '{}': To use Spot instances, you must set \
                \"max_spot_price\" with positive value",
                plan.cluster
            ),
        )),
        _ => Ok(()),
    }
}

/// Exactly one of `replicas` and autoscaling must be chosen.
fn validate_nodes(plan: &MachinePoolState, summary: &str) -> ProviderResult<()> {
    let fail = |detail: String| {
        Err(ProviderError::validation(
            summary,
            format!("{} for cluster '{}': {}", summary, plan.cluster, detail),
        ))
    };
    if plan.is_autoscaling() {
        match (plan.min_replicas, plan.max_replicas) {
            (_, None) => {
                return fail("when enabling autoscaling, should set value for max_replicas".into())
            }
            (None, _) => {
                return fail("when enabling autoscaling, should set value for min_replicas".into())
            }
            (Some(min), Some(max)) if min > max => {
                return fail(format!(
                    "min_replicas ({}) must not be greater than max_replicas ({})",
                    min, max
                ))
            }
            _ => {}
        }
    } else if plan.min_replicas.is_some() || plan.max_replicas.is_some() {
        return fail("when disabling autoscaling, can't set min_replicas and/or max_replicas".into());
    }
    if plan.is_autoscaling() == plan.replicas.is_some() {
        return fail(
            "please provide a value for either the 'replicas' or 'autoscaling_enabled' parameter"
                .into(),
        );
    }
    Ok(())
}

/// Check the zone and subnet of the pool against the cluster and fill in the computed placement
/// attributes. Returns true when the pool spans several zones.
fn validate_placement(plan: &mut MachinePoolState, cluster: &Cluster) -> ProviderResult<bool> {
    let cluster_id = plan.cluster.clone();
    let fail = |detail: String| {
        Err(ProviderError::validation(
            CANT_BUILD,
            format!("Can't build machine pool for cluster '{}': {}", cluster_id, detail),
        ))
    };
    let multi_az_cluster = cluster.multi_az.unwrap_or_default();
    let cluster_zones = cluster
        .nodes
        .as_ref()
        .and_then(|nodes| nodes.availability_zones.clone())
        .unwrap_or_default();
    let zone = non_empty(&plan.availability_zone).map(str::to_string);
    let subnet = non_empty(&plan.subnet_id).map(str::to_string);

    if multi_az_cluster {
        if zone.is_some() && subnet.is_some() {
            return fail("availability_zone and subnet_id are mutually exclusive".into());
        }
        let single = zone.is_some() || subnet.is_some();
        match plan.multi_availability_zone {
            Some(true) if single => {
                return fail(
                    "multi_availability_zone must be False when availability_zone or subnet_id \
                    is set"
                        .into(),
                )
            }
            Some(_) => {}
            None => plan.multi_availability_zone = Some(!single),
        }
    } else {
        if zone.is_some() {
            return fail("availability_zone can only be set for multi-AZ clusters".into());
        }
        if plan.multi_availability_zone == Some(true) {
            return fail("multi_availability_zone can only be set for multi-AZ clusters".into());
        }
        plan.multi_availability_zone = Some(false);
    }

    let multi_az_pool = plan.multi_availability_zone.unwrap_or_default();
    match zone {
        Some(zone) if !cluster_zones.contains(&zone) => {
            return fail(format!(
                "availability_zone {} is not valid for cluster {}",
                zone, cluster_id
            ))
        }
        Some(_) => {}
        None if multi_az_cluster && !multi_az_pool && subnet.is_none() => {
            plan.availability_zone = cluster_zones.first().cloned();
        }
        None => plan.availability_zone = None,
    }
    Ok(multi_az_pool)
}

fn expand_taints(taints: &Option<Vec<TaintState>>) -> Option<Vec<Taint>> {
    taints.as_ref().map(|taints| {
        taints
            .iter()
            .map(|taint| Taint {
                key: taint.key.clone(),
                value: taint.value.clone(),
                effect: taint.schedule_type.clone(),
            })
            .collect()
    })
}

fn expand_autoscaling(plan: &MachinePoolState) -> Option<MachinePoolAutoscaling> {
    if !plan.is_autoscaling() {
        return None;
    }
    Some(MachinePoolAutoscaling {
        min_replicas: plan.min_replicas.unwrap_or_default(),
        max_replicas: plan.max_replicas.unwrap_or_default(),
    })
}

/// Build the creation request.
fn expand(plan: &MachinePoolState) -> MachinePool {
    let spot = plan
        .use_spot_instances
        .unwrap_or_default()
        .then(|| SpotMarketOptions {
            max_price: plan.max_spot_price,
        });
    let security_groups = plan
        .aws_additional_security_group_ids
        .clone()
        .filter(|ids| !ids.is_empty());
    let aws = (spot.is_some() || security_groups.is_some()).then(|| AwsMachinePool {
        spot_market_options: spot,
        additional_security_group_ids: security_groups,
    });

    MachinePool {
        id: Some(plan.name.clone()),
        instance_type: plan.machine_type.clone(),
        replicas: if plan.is_autoscaling() {
            None
        } else {
            plan.replicas
        },
        autoscaling: expand_autoscaling(plan),
        labels: plan.labels.clone().filter(|labels| !labels.is_empty()),
        taints: expand_taints(&plan.taints).filter(|taints| !taints.is_empty()),
        availability_zones: non_empty(&plan.availability_zone).map(|zone| vec![zone.to_string()]),
        subnets: non_empty(&plan.subnet_id).map(|subnet| vec![subnet.to_string()]),
        aws,
        root_volume: plan.disk_size.map(|size| RootVolume {
            aws: Some(RootVolumeAws { size }),
        }),
    }
}

/// The mutable attributes. Labels and taints are only sent when they changed; an empty collection
/// clears them.
fn patch(state: &MachinePoolState, plan: &MachinePoolState) -> MachinePool {
    let autoscaling = plan.is_autoscaling();
    MachinePool {
        id: state.id.clone(),
        replicas: if autoscaling { None } else { plan.replicas },
        autoscaling: expand_autoscaling(plan),
        labels: (state.labels != plan.labels)
            .then(|| plan.labels.clone().unwrap_or_default()),
        taints: (state.taints != plan.taints)
            .then(|| expand_taints(&plan.taints).unwrap_or_default()),
        ..MachinePool::default()
    }
}

/// Copy the API object into `state`.
fn flatten(pool: &MachinePool, state: &mut MachinePoolState) {
    state.id = pool.id.clone();
    if let Some(id) = &pool.id {
        state.name = id.clone();
    }
    if pool.instance_type.is_some() {
        state.machine_type = pool.instance_type.clone();
    }

    let aws = pool.aws.clone().unwrap_or_default();
    match &aws.spot_market_options {
        Some(spot) => {
            state.use_spot_instances = Some(true);
            if let Some(price) = spot.max_price.filter(|price| *price != 0.0) {
                state.max_spot_price = Some(price);
            }
        }
        None => state.use_spot_instances = None,
    }
    state.aws_additional_security_group_ids = aws
        .additional_security_group_ids
        .filter(|ids| !ids.is_empty());

    match &pool.autoscaling {
        Some(autoscaling) => {
            state.autoscaling_enabled = Some(true);
            state.min_replicas = Some(autoscaling.min_replicas);
            state.max_replicas = Some(autoscaling.max_replicas);
        }
        None => {
            state.min_replicas = None;
            state.max_replicas = None;
        }
    }
    if pool.replicas.is_some() {
        state.replicas = pool.replicas;
    }

    state.taints = pool
        .taints
        .as_ref()
        .filter(|taints| !taints.is_empty())
        .map(|taints| {
            taints
                .iter()
                .map(|taint| TaintState {
                    key: taint.key.clone(),
                    value: taint.value.clone(),
                    schedule_type: taint.effect.clone(),
                })
                .collect()
        });
    state.labels = pool.labels.clone().filter(|labels| !labels.is_empty());

    state.multi_availability_zone = Some(true);
    let zones = pool.availability_zones.clone().unwrap_or_default();
    if let [zone] = zones.as_slice() {
        state.availability_zone = Some(zone.clone());
        state.availability_zones = None;
        state.multi_availability_zone = Some(false);
    } else {
        state.availability_zone = None;
        state.availability_zones = Some(zones).filter(|zones| !zones.is_empty());
    }
    let subnets = pool.subnets.clone().unwrap_or_default();
    if let [subnet] = subnets.as_slice() {
        state.subnet_id = Some(subnet.clone());
        state.subnet_ids = None;
        state.multi_availability_zone = Some(false);
    } else {
        state.subnet_id = None;
        state.subnet_ids = Some(subnets).filter(|subnets| !subnets.is_empty());
    }

    state.disk_size = pool
        .root_volume
        .as_ref()
        .and_then(|volume| volume.aws.as_ref())
        .map(|aws| aws.size);
}

/// Attributes that require replacing the pool. Unset plan values keep the prior value.
fn ensure_immutable(state: &MachinePoolState, plan: &MachinePoolState) -> ProviderResult<()> {
    ensure_unchanged("cluster", &state.cluster, &plan.cluster)?;
    ensure_unchanged("name", &state.name, &plan.name)?;
    ensure_unchanged_if_set("machine_type", &state.machine_type, &plan.machine_type)?;
    ensure_unchanged_if_set(
        "use_spot_instances",
        &state.use_spot_instances,
        &plan.use_spot_instances,
    )?;
    ensure_unchanged_if_set("max_spot_price", &state.max_spot_price, &plan.max_spot_price)?;
    ensure_unchanged_if_set(
        "multi_availability_zone",
        &state.multi_availability_zone,
        &plan.multi_availability_zone,
    )?;
    ensure_unchanged_if_set(
        "availability_zone",
        &state.availability_zone,
        &plan.availability_zone,
    )?;
    ensure_unchanged_if_set("subnet_id", &state.subnet_id, &plan.subnet_id)?;
    ensure_unchanged_if_set("disk_size", &state.disk_size, &plan.disk_size)?;
    ensure_unchanged_if_set(
        "aws_additional_security_group_ids",
        &state.aws_additional_security_group_ids,
        &plan.aws_additional_security_group_ids,
    )
}

pub struct MachinePoolResource<C> {
    client: Arc<C>,
    poller: Poller,
}

impl<C> MachinePoolResource<C>
where
    C: ClusterApi + MachinePoolApi + 'static,
{
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            poller: Poller::create(),
        }
    }

    async fn get_pool(&self, cluster_id: &str, pool_id: &str) -> ProviderResult<MachinePool> {
        self.client
            .get_machine_pool(cluster_id, pool_id)
            .await
            .context(
                ErrorKind::Remote,
                format!(
                    "Failed to fetch machine pool with identifier {} for cluster {}",
                    pool_id, cluster_id
                ),
            )
    }

    /// Apply the mutable attributes of `plan` to the existing pool described by `state`.
    async fn apply(
        &self,
        mut state: MachinePoolState,
        plan: &MachinePoolState,
    ) -> ProviderResult<MachinePoolState> {
        ensure_immutable(&state, plan)?;
        validate_nodes(plan, CANT_UPDATE)?;
        let pool_id = state.id.clone().unwrap_or_default();
        let updated = self
            .client
            .update_machine_pool(&state.cluster, &pool_id, &patch(&state, plan))
            .await
            .map_err(|e| {
                ProviderError::new_with_source_and_context(
                    ErrorKind::Remote,
                    "Failed to update machine pool",
                    format!(
                        "Failed to update machine pool '{}' on cluster '{}': {}",
                        pool_id, state.cluster, e
                    ),
                )
            })?;
        state.autoscaling_enabled = plan.autoscaling_enabled;
        state.replicas = plan.replicas;
        state.labels = plan.labels.clone();
        state.taints = plan.taints.clone();
        flatten(&updated, &mut state);
        Ok(state)
    }

    /// The default pool exists as soon as the cluster does, so it is adopted rather than created.
    async fn adopt_default_pool(
        &self,
        plan: MachinePoolState,
    ) -> ProviderResult<MachinePoolState> {
        let pool = match self.client.get_machine_pool(&plan.cluster, &plan.name).await {
            Ok(pool) => pool,
            Err(e) if e.is_not_found() => {
                return Err(ProviderError::new_with_source_and_context(
                    ErrorKind::Validation,
                    "Can't create machine pool",
                    format!(
                        "Can't create machine pool for cluster '{}': the default machine pool \
                        '{}' was deleted and a new machine pool with that name may not be \
                        created. Please use a different name.",
                        plan.cluster, plan.name
                    ),
                ))
            }
            Err(e) => {
                return Err(ProviderError::new_with_source_and_context(
                    ErrorKind::Remote,
                    "Failed to fetch machine pool",
                    e,
                ))
            }
        };
        info!(
            "Adopting the default machine pool of cluster '{}'",
            plan.cluster
        );
        let mut state = MachinePoolState {
            cluster: plan.cluster.clone(),
            id: Some(plan.name.clone()),
            name: plan.name.clone(),
            ..MachinePoolState::default()
        };
        flatten(&pool, &mut state);
        self.apply(state, &plan).await
    }
}

#[async_trait]
impl<C> Resource for MachinePoolResource<C>
where
    C: ClusterApi + MachinePoolApi + 'static,
{
    type State = MachinePoolState;

    fn type_name(&self) -> &'static str {
        "rhcs_machine_pool"
    }

    async fn create(
        &self,
        mut plan: MachinePoolState,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<MachinePoolState> {
        required("cluster", &plan.cluster)?;
        validate_name(&plan)?;
        wait_for_cluster(&*self.client, &self.poller, &plan.cluster).await?;

        if plan.name == DEFAULT_MACHINE_POOL {
            return self.adopt_default_pool(plan).await;
        }

        validate_spot(&plan)?;
        let cluster = self.client.get_cluster(&plan.cluster).await.map_err(|e| {
            ProviderError::new_with_source_and_context(
                ErrorKind::Remote,
                CANT_BUILD,
                format!(
                    "failed to get information for cluster {}: {}",
                    plan.cluster, e
                ),
            )
        })?;
        let multi_az_pool = validate_placement(&mut plan, &cluster)?;
        validate_nodes(&plan, CANT_BUILD)?;
        if let Some(replicas) = plan.replicas.filter(|r| multi_az_pool && r % 3 != 0) {
            return Err(ProviderError::validation(
                CANT_BUILD,
                format!(
                    "Can't build machine pool for cluster '{}', replicas must be a multiple of 3, \
                    got {}",
                    plan.cluster, replicas
                ),
            ));
        }

        info!(
            "Creating machine pool '{}' for cluster '{}'",
            plan.name, plan.cluster
        );
        let created = self
            .client
            .create_machine_pool(&plan.cluster, &expand(&plan))
            .await
            .map_err(|e| {
                ProviderError::new_with_source_and_context(
                    ErrorKind::Remote,
                    "Can't create machine pool",
                    format!(
                        "Can't create machine pool for cluster '{}': {}",
                        plan.cluster, e
                    ),
                )
            })?;
        flatten(&created, &mut plan);
        Ok(plan)
    }

    async fn read(
        &self,
        mut state: MachinePoolState,
        diags: &mut Diagnostics,
    ) -> ProviderResult<Option<MachinePoolState>> {
        let pool_id = state.id.clone().unwrap_or_default();
        match self.get_pool(&state.cluster, &pool_id).await {
            Ok(pool) => {
                flatten(&pool, &mut state);
                Ok(Some(state))
            }
            Err(e) if e.is_not_found() => {
                removed_from_state(
                    diags,
                    "Machine pool",
                    format!("machine pool ({}) of cluster ({})", pool_id, state.cluster),
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn update(
        &self,
        state: MachinePoolState,
        plan: MachinePoolState,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<MachinePoolState> {
        let pool_id = state.id.clone().unwrap_or_default();
        self.get_pool(&state.cluster, &pool_id).await.map_err(|e| {
            ProviderError::new_with_source_and_context(e.kind(), "Can't find machine pool", e)
        })?;
        self.apply(state, &plan).await
    }

    async fn delete(&self, state: MachinePoolState, diags: &mut Diagnostics) -> ProviderResult<()> {
        let pool_id = state.id.clone().unwrap_or_default();
        let e = match self
            .client
            .delete_machine_pool(&state.cluster, &pool_id)
            .await
        {
            Ok(()) => return Ok(()),
            Err(e) if e.is_not_found() => {
                info!(
                    "Machine pool '{}' of cluster '{}' was already deleted",
                    pool_id, state.cluster
                );
                return Ok(());
            }
            Err(e) => e,
        };

        match self.client.all_machine_pools(&state.cluster).await {
            Ok(pools) if pools.len() == 1 => {
                warn!(
                    "Leaving the last machine pool '{}' of cluster '{}' in place",
                    pool_id, state.cluster
                );
                diags.add_warning(
                    "Can't delete machine pool",
                    format!(
                        "Can't delete the last machine pool for cluster '{}'. ROSA Classic \
                        clusters must have at least one machine pool. It is being removed from \
                        the state only. To resume managing this machine pool, import it again. It \
                        will be automatically deleted when the cluster is deleted.",
                        state.cluster
                    ),
                );
                Ok(())
            }
            _ => Err(ProviderError::new_with_source_and_context(
                ErrorKind::Remote,
                "Can't delete machine pool",
                format!(
                    "Can't delete machine pool with identifier '{}' for cluster '{}': {}",
                    pool_id, state.cluster, e
                ),
            )),
        }
    }

    async fn import(&self, id: &str, _diags: &mut Diagnostics) -> ProviderResult<MachinePoolState> {
        let (cluster, pool_id) =
            parse_composite_id(id, "Machine pool", "<cluster_id>,<machine_pool_id>")?;
        Ok(MachinePoolState {
            cluster,
            id: Some(pool_id.clone()),
            name: pool_id,
            ..MachinePoolState::default()
        })
    }
}
