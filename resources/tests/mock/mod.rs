//! A stateful in-memory stand-in for the OpenShift Cluster Manager API. Objects created through it
//! can be read back, every call is recorded, and single operations can be made to fail.

#![allow(dead_code)]

use async_trait::async_trait;
use rhcs_model::clients::{
    ApiError, CatalogApi, ClusterApi, DnsDomainApi, Error, GroupApi, IdentityProviderApi,
    MachinePoolApi, OidcConfigApi, Result, StatusCode, UpgradeApi,
};
use rhcs_model::{
    CloudProvider, Cluster, ClusterState, DnsDomain, Group, IdentityProvider, List, MachinePool,
    MachineType, OidcConfig, StsCredentialRequest, StsPolicy, UpgradePolicy, UpgradePolicyState,
    UpgradePolicyStateValue, User, Version, VersionGateAgreement, VersionRef,
};
use rhcs_provider::thumbprint::{self, ThumbprintFetcher};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

pub const THUMBPRINT: &str = "9e99a48a9960b14926bb7f3b02e22da2b0ab7280";

#[derive(Default)]
struct Store {
    clusters: BTreeMap<String, Cluster>,
    machine_pools: BTreeMap<String, Vec<MachinePool>>,
    identity_providers: BTreeMap<String, Vec<IdentityProvider>>,
    /// Users by cluster and group.
    groups: BTreeMap<(String, String), Vec<User>>,
    dns_domains: Vec<DnsDomain>,
    oidc_configs: Vec<OidcConfig>,
    next_id: usize,
}

#[derive(Default)]
pub struct MockOcm {
    store: Mutex<Store>,
    versions: Vec<Version>,
    machine_types: Vec<MachineType>,
    cloud_providers: Vec<CloudProvider>,
    sts_policies: Vec<StsPolicy>,
    sts_credential_requests: Vec<StsCredentialRequest>,
    /// Operations answering 500, by method name.
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl MockOcm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an enabled ROSA version in the stable channel.
    pub fn with_version(mut self, raw_id: &str, default: bool) -> Self {
        self.versions.push(Version {
            id: format!("openshift-v{}", raw_id),
            raw_id: raw_id.to_string(),
            channel_group: "stable".to_string(),
            enabled: true,
            rosa_enabled: true,
            default,
            ..Version::default()
        });
        self
    }

    /// Set the versions a registered version can be upgraded to.
    pub fn with_upgrades(mut self, raw_id: &str, upgrades: &[&str]) -> Self {
        for version in self.versions.iter_mut().filter(|v| v.raw_id == raw_id) {
            version.available_upgrades = upgrades.iter().map(|u| u.to_string()).collect();
        }
        self
    }

    pub fn with_cluster(self, cluster_id: &str, state: ClusterState) -> Self {
        self.insert_cluster(Cluster {
            id: Some(cluster_id.to_string()),
            name: Some(cluster_id.to_string()),
            state: Some(state),
            ..Cluster::default()
        });
        self
    }

    pub fn with_machine_pool(self, cluster_id: &str, pool: MachinePool) -> Self {
        self.store
            .lock()
            .unwrap()
            .machine_pools
            .entry(cluster_id.to_string())
            .or_default()
            .push(pool);
        self
    }

    pub fn with_group(self, cluster_id: &str, group_id: &str) -> Self {
        self.store
            .lock()
            .unwrap()
            .groups
            .entry((cluster_id.to_string(), group_id.to_string()))
            .or_default();
        self
    }

    pub fn with_machine_types(mut self, machine_types: Vec<MachineType>) -> Self {
        self.machine_types = machine_types;
        self
    }

    pub fn with_cloud_providers(mut self, cloud_providers: Vec<CloudProvider>) -> Self {
        self.cloud_providers = cloud_providers;
        self
    }

    pub fn with_sts_policies(mut self, sts_policies: Vec<StsPolicy>) -> Self {
        self.sts_policies = sts_policies;
        self
    }

    pub fn with_sts_credential_requests(mut self, requests: Vec<StsCredentialRequest>) -> Self {
        self.sts_credential_requests = requests;
        self
    }

    /// Make every later call of `method` answer with a server error.
    pub fn fail(&self, method: &str) {
        self.failing.lock().unwrap().insert(method.to_string());
    }

    pub fn insert_cluster(&self, cluster: Cluster) {
        let id = cluster.id.clone().unwrap_or_default();
        self.store.lock().unwrap().clusters.insert(id, cluster);
    }

    pub fn set_cluster_state(&self, cluster_id: &str, state: ClusterState) {
        if let Some(cluster) = self.store.lock().unwrap().clusters.get_mut(cluster_id) {
            cluster.state = Some(state);
        }
    }

    pub fn cluster(&self, cluster_id: &str) -> Option<Cluster> {
        self.store.lock().unwrap().clusters.get(cluster_id).cloned()
    }

    pub fn machine_pools(&self, cluster_id: &str) -> Vec<MachinePool> {
        self.store
            .lock()
            .unwrap()
            .machine_pools
            .get(cluster_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn identity_providers(&self, cluster_id: &str) -> Vec<IdentityProvider> {
        self.store
            .lock()
            .unwrap()
            .identity_providers
            .get(cluster_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn group_users(&self, cluster_id: &str, group_id: &str) -> Vec<User> {
        self.store
            .lock()
            .unwrap()
            .groups
            .get(&(cluster_id.to_string(), group_id.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn dns_domains(&self) -> Vec<DnsDomain> {
        self.store.lock().unwrap().dns_domains.clone()
    }

    pub fn oidc_configs(&self) -> Vec<OidcConfig> {
        self.store.lock().unwrap().oidc_configs.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    fn record(&self, method: &str, args: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {}", method, args).trim_end().to_string());
        if self.failing.lock().unwrap().contains(method) {
            return Err(Error::api(
                method,
                args,
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::with_reason("Internal server error"),
            ));
        }
        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut store = self.store.lock().unwrap();
        store.next_id += 1;
        format!("{}-{}", prefix, store.next_id)
    }
}

pub fn not_found(what: &str) -> Error {
    Error::api(
        "get",
        what,
        StatusCode::NOT_FOUND,
        ApiError::with_reason(format!("{} not found", what)),
    )
}

/// A page holding all of `items`, with the total filled in like the API does.
fn page<T>(items: Vec<T>) -> List<T> {
    let total = items.len() as i64;
    List {
        page: Some(1),
        size: Some(total),
        total: Some(total),
        items,
    }
}

/// Slice `items` into the requested page.
fn paged<T: Clone>(items: &[T], page: i64, size: i64) -> List<T> {
    let start = ((page - 1) * size) as usize;
    let items: Vec<T> = items.iter().skip(start).take(size as usize).cloned().collect();
    List {
        page: Some(page),
        size: Some(items.len() as i64),
        total: None,
        items,
    }
}

#[async_trait]
impl ClusterApi for MockOcm {
    async fn get_cluster(&self, cluster_id: &str) -> Result<Cluster> {
        self.record("get_cluster", cluster_id)?;
        self.cluster(cluster_id)
            .ok_or_else(|| not_found(&format!("cluster '{}'", cluster_id)))
    }

    async fn create_cluster(&self, cluster: &Cluster) -> Result<Cluster> {
        self.record("create_cluster", cluster.name.as_deref().unwrap_or_default())?;
        let id = self.next_id("cluster");
        let mut created = cluster.clone();
        created.id = Some(id.clone());
        created.state = Some(ClusterState::Ready);
        if let Some(version) = created.version.as_mut() {
            version.raw_id = version
                .id
                .as_deref()
                .map(|id| id.trim_start_matches("openshift-v").to_string());
        }
        if let Some(sts) = created.aws.as_mut().and_then(|aws| aws.sts.as_mut()) {
            sts.oidc_endpoint_url = Some(format!("https://oidc.example.com/{}", id));
        }
        self.insert_cluster(created.clone());
        Ok(created)
    }

    async fn update_cluster(&self, cluster_id: &str, patch: &Cluster) -> Result<Cluster> {
        self.record("update_cluster", cluster_id)?;
        let mut store = self.store.lock().unwrap();
        let cluster = store
            .clusters
            .get_mut(cluster_id)
            .ok_or_else(|| not_found(&format!("cluster '{}'", cluster_id)))?;
        if let Some(nodes) = &patch.nodes {
            cluster.nodes = Some(nodes.clone());
        }
        if patch.proxy.is_some() {
            cluster.proxy = patch.proxy.clone();
        }
        if patch.additional_trust_bundle.is_some() {
            cluster.additional_trust_bundle = patch.additional_trust_bundle.clone();
        }
        if patch.properties.is_some() {
            cluster.properties = patch.properties.clone();
        }
        if patch.disable_user_workload_monitoring.is_some() {
            cluster.disable_user_workload_monitoring = patch.disable_user_workload_monitoring;
        }
        if let Some(version) = &patch.version {
            let current = cluster.version.get_or_insert_with(VersionRef::default);
            if version.channel_group.is_some() {
                current.channel_group = version.channel_group.clone();
            }
        }
        Ok(cluster.clone())
    }

    async fn delete_cluster(&self, cluster_id: &str) -> Result<()> {
        self.record("delete_cluster", cluster_id)?;
        self.store
            .lock()
            .unwrap()
            .clusters
            .remove(cluster_id)
            .map(|_| ())
            .ok_or_else(|| not_found(&format!("cluster '{}'", cluster_id)))
    }

    async fn search_clusters(&self, search: &str, _page: i64, _size: i64) -> Result<List<Cluster>> {
        self.record("search_clusters", search)?;
        let clusters = self
            .store
            .lock()
            .unwrap()
            .clusters
            .values()
            .filter(|cluster| {
                let endpoint = cluster
                    .aws
                    .as_ref()
                    .and_then(|aws| aws.sts.as_ref())
                    .and_then(|sts| sts.oidc_endpoint_url.as_deref())
                    .unwrap_or_default();
                !endpoint.is_empty() && search.contains(&format!("'{}'", endpoint))
            })
            .cloned()
            .collect();
        Ok(page(clusters))
    }
}

#[async_trait]
impl MachinePoolApi for MockOcm {
    async fn list_machine_pools(
        &self,
        cluster_id: &str,
        page_number: i64,
        size: i64,
    ) -> Result<List<MachinePool>> {
        self.record("list_machine_pools", cluster_id)?;
        Ok(paged(&self.machine_pools(cluster_id), page_number, size))
    }

    async fn get_machine_pool(&self, cluster_id: &str, pool_id: &str) -> Result<MachinePool> {
        self.record("get_machine_pool", pool_id)?;
        self.machine_pools(cluster_id)
            .into_iter()
            .find(|pool| pool.id.as_deref() == Some(pool_id))
            .ok_or_else(|| not_found(&format!("machine pool '{}'", pool_id)))
    }

    async fn create_machine_pool(
        &self,
        cluster_id: &str,
        pool: &MachinePool,
    ) -> Result<MachinePool> {
        self.record(
            "create_machine_pool",
            pool.id.as_deref().unwrap_or_default(),
        )?;
        let mut created = pool.clone();
        // Like the API, place pools without an explicit zone or subnet in the cluster's zones.
        if created.availability_zones.is_none() && created.subnets.is_none() {
            let cluster = self.cluster(cluster_id).unwrap_or_default();
            let zones = cluster
                .nodes
                .and_then(|nodes| nodes.availability_zones)
                .unwrap_or_else(|| vec!["us-east-1a".to_string()]);
            created.availability_zones = if cluster.multi_az.unwrap_or_default() {
                Some(zones)
            } else {
                Some(zones.into_iter().take(1).collect())
            };
        }
        self.store
            .lock()
            .unwrap()
            .machine_pools
            .entry(cluster_id.to_string())
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn update_machine_pool(
        &self,
        cluster_id: &str,
        pool_id: &str,
        patch: &MachinePool,
    ) -> Result<MachinePool> {
        self.record("update_machine_pool", pool_id)?;
        let mut store = self.store.lock().unwrap();
        let pool = store
            .machine_pools
            .get_mut(cluster_id)
            .and_then(|pools| pools.iter_mut().find(|p| p.id.as_deref() == Some(pool_id)))
            .ok_or_else(|| not_found(&format!("machine pool '{}'", pool_id)))?;
        if patch.replicas.is_some() {
            pool.replicas = patch.replicas;
            pool.autoscaling = None;
        }
        if patch.autoscaling.is_some() {
            pool.autoscaling = patch.autoscaling.clone();
            pool.replicas = None;
        }
        if let Some(labels) = &patch.labels {
            pool.labels = Some(labels.clone()).filter(|labels| !labels.is_empty());
        }
        if let Some(taints) = &patch.taints {
            pool.taints = Some(taints.clone()).filter(|taints| !taints.is_empty());
        }
        Ok(pool.clone())
    }

    async fn delete_machine_pool(&self, cluster_id: &str, pool_id: &str) -> Result<()> {
        self.record("delete_machine_pool", pool_id)?;
        let mut store = self.store.lock().unwrap();
        let pools = store.machine_pools.entry(cluster_id.to_string()).or_default();
        let before = pools.len();
        pools.retain(|pool| pool.id.as_deref() != Some(pool_id));
        if pools.len() == before {
            return Err(not_found(&format!("machine pool '{}'", pool_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityProviderApi for MockOcm {
    async fn list_identity_providers(
        &self,
        cluster_id: &str,
        page_number: i64,
        size: i64,
    ) -> Result<List<IdentityProvider>> {
        self.record("list_identity_providers", cluster_id)?;
        Ok(paged(&self.identity_providers(cluster_id), page_number, size))
    }

    async fn get_identity_provider(
        &self,
        cluster_id: &str,
        idp_id: &str,
    ) -> Result<IdentityProvider> {
        self.record("get_identity_provider", idp_id)?;
        self.identity_providers(cluster_id)
            .into_iter()
            .find(|idp| idp.id.as_deref() == Some(idp_id))
            .ok_or_else(|| not_found(&format!("identity provider '{}'", idp_id)))
    }

    async fn create_identity_provider(
        &self,
        cluster_id: &str,
        idp: &IdentityProvider,
    ) -> Result<IdentityProvider> {
        self.record(
            "create_identity_provider",
            idp.name.as_deref().unwrap_or_default(),
        )?;
        let mut created = idp.clone();
        created.id = Some(self.next_id("idp"));
        // Passwords and secrets are never returned.
        if let Some(htpasswd) = created.htpasswd.as_mut() {
            for user in htpasswd.users.items.iter_mut() {
                user.password = None;
            }
        }
        self.store
            .lock()
            .unwrap()
            .identity_providers
            .entry(cluster_id.to_string())
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn delete_identity_provider(&self, cluster_id: &str, idp_id: &str) -> Result<()> {
        self.record("delete_identity_provider", idp_id)?;
        let mut store = self.store.lock().unwrap();
        let idps = store
            .identity_providers
            .entry(cluster_id.to_string())
            .or_default();
        let before = idps.len();
        idps.retain(|idp| idp.id.as_deref() != Some(idp_id));
        if idps.len() == before {
            return Err(not_found(&format!("identity provider '{}'", idp_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl GroupApi for MockOcm {
    async fn list_groups(&self, cluster_id: &str, page_number: i64, size: i64) -> Result<List<Group>> {
        self.record("list_groups", cluster_id)?;
        let groups: Vec<Group> = self
            .store
            .lock()
            .unwrap()
            .groups
            .iter()
            .filter(|((cluster, _), _)| cluster == cluster_id)
            .map(|((_, group), users)| Group {
                id: group.clone(),
                users: Some(List::of(users.clone())),
            })
            .collect();
        Ok(paged(&groups, page_number, size))
    }

    async fn add_group_user(&self, cluster_id: &str, group_id: &str, user: &User) -> Result<User> {
        self.record("add_group_user", &user.id)?;
        let mut store = self.store.lock().unwrap();
        let users = store
            .groups
            .get_mut(&(cluster_id.to_string(), group_id.to_string()))
            .ok_or_else(|| not_found(&format!("group '{}'", group_id)))?;
        users.push(user.clone());
        Ok(user.clone())
    }

    async fn get_group_user(&self, cluster_id: &str, group_id: &str, user_id: &str) -> Result<User> {
        self.record("get_group_user", user_id)?;
        self.group_users(cluster_id, group_id)
            .into_iter()
            .find(|user| user.id == user_id)
            .ok_or_else(|| not_found(&format!("user '{}'", user_id)))
    }

    async fn delete_group_user(&self, cluster_id: &str, group_id: &str, user_id: &str) -> Result<()> {
        self.record("delete_group_user", user_id)?;
        let mut store = self.store.lock().unwrap();
        let users = store
            .groups
            .get_mut(&(cluster_id.to_string(), group_id.to_string()))
            .ok_or_else(|| not_found(&format!("group '{}'", group_id)))?;
        let before = users.len();
        users.retain(|user| user.id != user_id);
        if users.len() == before {
            return Err(not_found(&format!("user '{}'", user_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl DnsDomainApi for MockOcm {
    async fn create_dns_domain(&self, _domain: &DnsDomain) -> Result<DnsDomain> {
        self.record("create_dns_domain", "")?;
        let domain = DnsDomain {
            id: Some(format!("{}.s1.devshift.org", self.next_id("dns"))),
        };
        self.store.lock().unwrap().dns_domains.push(domain.clone());
        Ok(domain)
    }

    async fn get_dns_domain(&self, domain_id: &str) -> Result<DnsDomain> {
        self.record("get_dns_domain", domain_id)?;
        self.dns_domains()
            .into_iter()
            .find(|domain| domain.id.as_deref() == Some(domain_id))
            .ok_or_else(|| not_found(&format!("DNS domain '{}'", domain_id)))
    }

    async fn delete_dns_domain(&self, domain_id: &str) -> Result<()> {
        self.record("delete_dns_domain", domain_id)?;
        let mut store = self.store.lock().unwrap();
        let before = store.dns_domains.len();
        store
            .dns_domains
            .retain(|domain| domain.id.as_deref() != Some(domain_id));
        if store.dns_domains.len() == before {
            return Err(not_found(&format!("DNS domain '{}'", domain_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl OidcConfigApi for MockOcm {
    async fn create_oidc_config(&self, config: &OidcConfig) -> Result<OidcConfig> {
        self.record("create_oidc_config", "")?;
        let id = self.next_id("oidc");
        let mut created = config.clone();
        created.id = Some(id.clone());
        if created.managed {
            created.issuer_url = Some(format!("https://oidc.example.com/{}", id));
        }
        self.store.lock().unwrap().oidc_configs.push(created.clone());
        Ok(created)
    }

    async fn get_oidc_config(&self, config_id: &str) -> Result<OidcConfig> {
        self.record("get_oidc_config", config_id)?;
        self.oidc_configs()
            .into_iter()
            .find(|config| config.id.as_deref() == Some(config_id))
            .ok_or_else(|| not_found(&format!("OIDC config '{}'", config_id)))
    }

    async fn delete_oidc_config(&self, config_id: &str) -> Result<()> {
        self.record("delete_oidc_config", config_id)?;
        self.store
            .lock()
            .unwrap()
            .oidc_configs
            .retain(|config| config.id.as_deref() != Some(config_id));
        Ok(())
    }
}

#[async_trait]
impl CatalogApi for MockOcm {
    async fn list_versions(&self, search: &str, page_number: i64, size: i64) -> Result<List<Version>> {
        self.record("list_versions", search)?;
        Ok(paged(&self.versions, page_number, size))
    }

    async fn list_machine_types(&self, page_number: i64, size: i64) -> Result<List<MachineType>> {
        self.record("list_machine_types", "")?;
        Ok(paged(&self.machine_types, page_number, size))
    }

    async fn list_cloud_providers(
        &self,
        search: Option<&str>,
        _order: Option<&str>,
        page_number: i64,
        size: i64,
    ) -> Result<List<CloudProvider>> {
        self.record("list_cloud_providers", search.unwrap_or_default())?;
        // Only `id = '...'` searches are understood.
        let providers: Vec<CloudProvider> = match search {
            Some(search) => self
                .cloud_providers
                .iter()
                .filter(|provider| search.contains(&format!("'{}'", provider.id)))
                .cloned()
                .collect(),
            None => self.cloud_providers.clone(),
        };
        Ok(paged(&providers, page_number, size))
    }

    async fn list_sts_policies(&self, page_number: i64, size: i64) -> Result<List<StsPolicy>> {
        self.record("list_sts_policies", "")?;
        Ok(paged(&self.sts_policies, page_number, size))
    }

    async fn list_sts_credential_requests(
        &self,
        page_number: i64,
        size: i64,
    ) -> Result<List<StsCredentialRequest>> {
        self.record("list_sts_credential_requests", "")?;
        Ok(paged(&self.sts_credential_requests, page_number, size))
    }
}

#[async_trait]
impl UpgradeApi for MockOcm {
    async fn get_version(&self, version_id: &str) -> Result<Version> {
        self.record("get_version", version_id)?;
        self.versions
            .iter()
            .find(|version| version.id == version_id)
            .cloned()
            .ok_or_else(|| not_found(&format!("version '{}'", version_id)))
    }

    async fn list_upgrade_policies(
        &self,
        cluster_id: &str,
        _page: i64,
        _size: i64,
    ) -> Result<List<UpgradePolicy>> {
        self.record("list_upgrade_policies", cluster_id)?;
        Ok(List::default())
    }

    async fn get_upgrade_policy_state(
        &self,
        _cluster_id: &str,
        policy_id: &str,
    ) -> Result<UpgradePolicyState> {
        self.record("get_upgrade_policy_state", policy_id)?;
        Ok(UpgradePolicyState {
            value: UpgradePolicyStateValue::Scheduled,
            description: None,
        })
    }

    async fn create_upgrade_policy(
        &self,
        _cluster_id: &str,
        policy: &UpgradePolicy,
        dry_run: bool,
    ) -> Result<UpgradePolicy> {
        let method = if dry_run {
            "create_upgrade_policy_dry_run"
        } else {
            "create_upgrade_policy"
        };
        self.record(method, policy.version.as_deref().unwrap_or_default())?;
        Ok(policy.clone())
    }

    async fn delete_upgrade_policy(&self, _cluster_id: &str, policy_id: &str) -> Result<()> {
        self.record("delete_upgrade_policy", policy_id)?;
        Ok(())
    }

    async fn create_gate_agreement(
        &self,
        _cluster_id: &str,
        agreement: &VersionGateAgreement,
    ) -> Result<VersionGateAgreement> {
        self.record("create_gate_agreement", &agreement.version_gate.id)?;
        Ok(agreement.clone())
    }
}

/// Answers the same thumbprint for every URL and remembers the URLs it was asked about.
#[derive(Default)]
pub struct MockThumbprints {
    urls: Mutex<Vec<String>>,
}

impl MockThumbprints {
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ThumbprintFetcher for MockThumbprints {
    async fn thumbprint(&self, oidc_endpoint_url: &str) -> thumbprint::Result<String> {
        self.urls.lock().unwrap().push(oidc_endpoint_url.to_string());
        Ok(THUMBPRINT.to_string())
    }
}
