use crate::clients::Result;
use crate::{
    CloudProvider, Cluster, DnsDomain, Group, IdentityProvider, List, MachinePool, MachineType,
    OidcConfig, StsCredentialRequest, StsPolicy, UpgradePolicy, UpgradePolicyState, User, Version,
    VersionGateAgreement,
};
use async_trait::async_trait;
use log::trace;
use std::future::Future;

/// The page size used when walking every page of a collection.
pub const DEFAULT_PAGE_SIZE: i64 = 100;

/// Requests pages `1, 2, 3, ...` of size `size` until a page with fewer than `size` items comes
/// back, and returns the items of every page.
pub async fn list_all<T, F, Fut>(size: i64, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(i64) -> Fut + Send,
    Fut: Future<Output = Result<List<T>>> + Send,
    T: Send,
{
    let mut items = Vec::new();
    let mut page = 1;
    loop {
        let list = fetch(page).await?;
        let len = list.len();
        trace!("Page {} returned {} items", page, len);
        items.extend(list.items);
        if i64::try_from(len).unwrap_or(i64::MAX) < size {
            return Ok(items);
        }
        page += 1;
    }
}

/// Cluster life cycle.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn get_cluster(&self, cluster_id: &str) -> Result<Cluster>;

    async fn create_cluster(&self, cluster: &Cluster) -> Result<Cluster>;

    async fn update_cluster(&self, cluster_id: &str, patch: &Cluster) -> Result<Cluster>;

    async fn delete_cluster(&self, cluster_id: &str) -> Result<()>;

    /// Search clusters with the API's SQL-like `search` syntax, e.g.
    /// `aws.sts.oidc_endpoint_url = 'https://example.com'`.
    async fn search_clusters(&self, search: &str, page: i64, size: i64) -> Result<List<Cluster>>;
}

/// Upgrade policies, the versions they target, and version gate agreements.
#[async_trait]
pub trait UpgradeApi: Send + Sync {
    /// Get a version by id, e.g. `openshift-v4.12.5` or `openshift-v4.13.0-candidate`.
    async fn get_version(&self, version_id: &str) -> Result<Version>;

    async fn list_upgrade_policies(
        &self,
        cluster_id: &str,
        page: i64,
        size: i64,
    ) -> Result<List<UpgradePolicy>>;

    async fn get_upgrade_policy_state(
        &self,
        cluster_id: &str,
        policy_id: &str,
    ) -> Result<UpgradePolicyState>;

    /// Create an upgrade policy. With `dry_run` the server only validates the policy, which is how
    /// missing version gate agreements are discovered.
    async fn create_upgrade_policy(
        &self,
        cluster_id: &str,
        policy: &UpgradePolicy,
        dry_run: bool,
    ) -> Result<UpgradePolicy>;

    async fn delete_upgrade_policy(&self, cluster_id: &str, policy_id: &str) -> Result<()>;

    async fn create_gate_agreement(
        &self,
        cluster_id: &str,
        agreement: &VersionGateAgreement,
    ) -> Result<VersionGateAgreement>;

    /// Every upgrade policy of the cluster.
    async fn all_upgrade_policies(&self, cluster_id: &str) -> Result<Vec<UpgradePolicy>> {
        list_all(DEFAULT_PAGE_SIZE, |page| {
            self.list_upgrade_policies(cluster_id, page, DEFAULT_PAGE_SIZE)
        })
        .await
    }
}

#[async_trait]
pub trait MachinePoolApi: Send + Sync {
    async fn list_machine_pools(
        &self,
        cluster_id: &str,
        page: i64,
        size: i64,
    ) -> Result<List<MachinePool>>;

    async fn get_machine_pool(&self, cluster_id: &str, pool_id: &str) -> Result<MachinePool>;

    async fn create_machine_pool(&self, cluster_id: &str, pool: &MachinePool)
        -> Result<MachinePool>;

    async fn update_machine_pool(
        &self,
        cluster_id: &str,
        pool_id: &str,
        patch: &MachinePool,
    ) -> Result<MachinePool>;

    async fn delete_machine_pool(&self, cluster_id: &str, pool_id: &str) -> Result<()>;

    async fn all_machine_pools(&self, cluster_id: &str) -> Result<Vec<MachinePool>> {
        list_all(DEFAULT_PAGE_SIZE, |page| {
            self.list_machine_pools(cluster_id, page, DEFAULT_PAGE_SIZE)
        })
        .await
    }
}

#[async_trait]
pub trait IdentityProviderApi: Send + Sync {
    async fn list_identity_providers(
        &self,
        cluster_id: &str,
        page: i64,
        size: i64,
    ) -> Result<List<IdentityProvider>>;

    async fn get_identity_provider(
        &self,
        cluster_id: &str,
        idp_id: &str,
    ) -> Result<IdentityProvider>;

    async fn create_identity_provider(
        &self,
        cluster_id: &str,
        idp: &IdentityProvider,
    ) -> Result<IdentityProvider>;

    async fn delete_identity_provider(&self, cluster_id: &str, idp_id: &str) -> Result<()>;

    async fn all_identity_providers(&self, cluster_id: &str) -> Result<Vec<IdentityProvider>> {
        list_all(DEFAULT_PAGE_SIZE, |page| {
            self.list_identity_providers(cluster_id, page, DEFAULT_PAGE_SIZE)
        })
        .await
    }
}

#[async_trait]
pub trait GroupApi: Send + Sync {
    async fn list_groups(&self, cluster_id: &str, page: i64, size: i64) -> Result<List<Group>>;

    async fn add_group_user(&self, cluster_id: &str, group_id: &str, user: &User) -> Result<User>;

    async fn get_group_user(&self, cluster_id: &str, group_id: &str, user_id: &str)
        -> Result<User>;

    async fn delete_group_user(&self, cluster_id: &str, group_id: &str, user_id: &str)
        -> Result<()>;

    async fn all_groups(&self, cluster_id: &str) -> Result<Vec<Group>> {
        list_all(10, |page| self.list_groups(cluster_id, page, 10)).await
    }
}

#[async_trait]
pub trait DnsDomainApi: Send + Sync {
    async fn create_dns_domain(&self, domain: &DnsDomain) -> Result<DnsDomain>;

    async fn get_dns_domain(&self, domain_id: &str) -> Result<DnsDomain>;

    async fn delete_dns_domain(&self, domain_id: &str) -> Result<()>;
}

#[async_trait]
pub trait OidcConfigApi: Send + Sync {
    async fn create_oidc_config(&self, config: &OidcConfig) -> Result<OidcConfig>;

    async fn get_oidc_config(&self, config_id: &str) -> Result<OidcConfig>;

    async fn delete_oidc_config(&self, config_id: &str) -> Result<()>;
}

/// Read-only collections describing what the service offers.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn list_versions(&self, search: &str, page: i64, size: i64) -> Result<List<Version>>;

    async fn list_machine_types(&self, page: i64, size: i64) -> Result<List<MachineType>>;

    async fn list_cloud_providers(
        &self,
        search: Option<&str>,
        order: Option<&str>,
        page: i64,
        size: i64,
    ) -> Result<List<CloudProvider>>;

    async fn list_sts_policies(&self, page: i64, size: i64) -> Result<List<StsPolicy>>;

    async fn list_sts_credential_requests(
        &self,
        page: i64,
        size: i64,
    ) -> Result<List<StsCredentialRequest>>;

    /// Every enabled version.
    async fn all_enabled_versions(&self) -> Result<Vec<Version>> {
        list_all(DEFAULT_PAGE_SIZE, |page| {
            self.list_versions("enabled = 't'", page, DEFAULT_PAGE_SIZE)
        })
        .await
    }

    async fn all_machine_types(&self) -> Result<Vec<MachineType>> {
        list_all(10, |page| self.list_machine_types(page, 10)).await
    }

    async fn all_sts_policies(&self) -> Result<Vec<StsPolicy>> {
        list_all(DEFAULT_PAGE_SIZE, |page| {
            self.list_sts_policies(page, DEFAULT_PAGE_SIZE)
        })
        .await
    }

    /// Every operator that needs an IAM role on an STS cluster.
    async fn all_sts_credential_requests(&self) -> Result<Vec<StsCredentialRequest>> {
        list_all(DEFAULT_PAGE_SIZE, |page| {
            self.list_sts_credential_requests(page, DEFAULT_PAGE_SIZE)
        })
        .await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    #[tokio::test]
    async fn list_all_stops_on_short_page() {
        let calls = AtomicI64::new(0);
        let items = list_all(2, |page| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                let items = match page {
                    1 => vec![1, 2],
                    2 => vec![3, 4],
                    _ => vec![5],
                };
                Ok(List {
                    page: Some(page),
                    size: Some(items.len() as i64),
                    total: Some(5),
                    items,
                })
            }
        })
        .await
        .unwrap();
        assert_eq!(items, vec![1, 2, 3, 4, 5]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn list_all_empty_first_page() {
        let items: Vec<i32> = list_all(100, |_| async { Ok(List::default()) })
            .await
            .unwrap();
        assert!(items.is_empty());
    }
}
