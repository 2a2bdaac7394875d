use crate::clients::api::{
    CatalogApi, ClusterApi, DnsDomainApi, GroupApi, IdentityProviderApi, MachinePoolApi,
    OidcConfigApi, UpgradeApi,
};
use crate::clients::error::{self, Result};
use crate::clients::{ApiError, Authenticator};
use crate::constants::{
    CLOUD_PROVIDERS, CLUSTERS, DNS_DOMAINS, MACHINE_TYPES, OIDC_CONFIGS, STS_CREDENTIAL_REQUESTS,
    STS_POLICIES, VERSIONS,
};
use crate::{
    CloudProvider, Cluster, DnsDomain, Group, IdentityProvider, List, MachinePool, MachineType,
    OidcConfig, StsCredentialRequest, StsPolicy, UpgradePolicy, UpgradePolicyState, User, Version,
    VersionGateAgreement,
};
use async_trait::async_trait;
use log::{debug, trace};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use snafu::{OptionExt, ResultExt};
use std::sync::Arc;
use url::Url;

/// Settings for the HTTP connection of an [`OcmClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// PEM encoded certificate authority trusted in addition to the system roots.
    pub trusted_cas: Option<String>,
    /// Accept any server certificate. Only meant for development environments.
    pub insecure: bool,
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            trusted_cas: None,
            insecure: false,
            user_agent: concat!("rhcs/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// A client for the `clusters_mgmt` API backed by `reqwest`. Cloning is cheap; clones share the
/// connection pool and the cached access token.
#[derive(Debug, Clone)]
pub struct OcmClient {
    http: reqwest::Client,
    url: Url,
    auth: Arc<Authenticator>,
}

impl OcmClient {
    /// Create a client for the API served at `url`, e.g. `https://api.openshift.com`.
    pub fn new(http: reqwest::Client, url: &str, auth: Authenticator) -> Result<Self> {
        let url = Url::parse(url).context(error::UrlParseSnafu { url })?;
        Ok(Self {
            http,
            url,
            auth: Arc::new(auth),
        })
    }

    /// Create a client whose HTTP connection is configured by `options`.
    pub fn with_options(url: &str, auth: Authenticator, options: &ClientOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(options.user_agent.as_str())
            .danger_accept_invalid_certs(options.insecure);
        if let Some(pem) = &options.trusted_cas {
            let certificate = reqwest::Certificate::from_pem(pem.as_bytes())
                .context(error::CertificateSnafu { what: "trusted_cas" })?;
            builder = builder.add_root_certificate(certificate);
        }
        let http = builder.build().context(error::ClientBuildSnafu)?;
        Self::new(http, url, auth)
    }

    /// The base URL of the API.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Build the URL of `path` followed by the percent-encoded `segments`.
    fn endpoint(&self, path: &str, segments: &[&str]) -> Result<Url> {
        let mut url = self
            .url
            .join(path)
            .context(error::UrlParseSnafu { url: path })?;
        url.path_segments_mut()
            .ok()
            .context(error::UrlBaseSnafu {
                url: self.url.as_str(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn request(&self, method: Method, url: Url) -> Result<RequestBuilder> {
        let token = self.auth.bearer(&self.http).await?;
        debug!("{} {}", method, url);
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    async fn send(&self, request: RequestBuilder, method: &str, what: &str) -> Result<Response> {
        let response = request
            .send()
            .await
            .context(error::RequestSnafu { method, what })?;
        let status = response.status();
        trace!("{} {} returned {}", method, what, status);
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str::<ApiError>(&text).unwrap_or_else(|_| {
            ApiError {
                reason: Some(text.trim().to_string()),
                ..Default::default()
            }
        });
        Err(error::ApiSnafu {
            method,
            what,
            status,
            body,
        }
        .build()
        .into())
    }

    async fn get<T>(&self, url: Url, query: &[(&str, String)], what: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let request = self.request(Method::GET, url).await?.query(query);
        Ok(self
            .send(request, "get", what)
            .await?
            .json()
            .await
            .context(error::ResponseBodySnafu { what })?)
    }

    async fn post<B, T>(&self, url: Url, query: &[(&str, String)], body: &B, what: &str) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, url).await?.query(query).json(body);
        Ok(self
            .send(request, "create", what)
            .await?
            .json()
            .await
            .context(error::ResponseBodySnafu { what })?)
    }

    async fn patch<B, T>(&self, url: Url, body: &B, what: &str) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let request = self.request(Method::PATCH, url).await?.json(body);
        Ok(self
            .send(request, "update", what)
            .await?
            .json()
            .await
            .context(error::ResponseBodySnafu { what })?)
    }

    async fn delete(&self, url: Url, what: &str) -> Result<()> {
        let request = self.request(Method::DELETE, url).await?;
        self.send(request, "delete", what).await?;
        Ok(())
    }
}

fn page_query(page: i64, size: i64) -> Vec<(&'static str, String)> {
    vec![("page", page.to_string()), ("size", size.to_string())]
}

#[async_trait]
impl ClusterApi for OcmClient {
    async fn get_cluster(&self, cluster_id: &str) -> Result<Cluster> {
        let url = self.endpoint(CLUSTERS, &[cluster_id])?;
        self.get(url, &[], &format!("cluster '{}'", cluster_id))
            .await
    }

    async fn create_cluster(&self, cluster: &Cluster) -> Result<Cluster> {
        let url = self.endpoint(CLUSTERS, &[])?;
        let what = format!("cluster '{}'", cluster.name.as_deref().unwrap_or_default());
        self.post(url, &[], cluster, &what).await
    }

    async fn update_cluster(&self, cluster_id: &str, patch: &Cluster) -> Result<Cluster> {
        let url = self.endpoint(CLUSTERS, &[cluster_id])?;
        self.patch(url, patch, &format!("cluster '{}'", cluster_id))
            .await
    }

    async fn delete_cluster(&self, cluster_id: &str) -> Result<()> {
        let url = self.endpoint(CLUSTERS, &[cluster_id])?;
        self.delete(url, &format!("cluster '{}'", cluster_id)).await
    }

    async fn search_clusters(&self, search: &str, page: i64, size: i64) -> Result<List<Cluster>> {
        let url = self.endpoint(CLUSTERS, &[])?;
        let mut query = page_query(page, size);
        query.push(("search", search.to_string()));
        self.get(url, &query, "clusters").await
    }
}

#[async_trait]
impl UpgradeApi for OcmClient {
    async fn get_version(&self, version_id: &str) -> Result<Version> {
        let url = self.endpoint(VERSIONS, &[version_id])?;
        self.get(url, &[], &format!("version '{}'", version_id))
            .await
    }

    async fn list_upgrade_policies(
        &self,
        cluster_id: &str,
        page: i64,
        size: i64,
    ) -> Result<List<UpgradePolicy>> {
        let url = self.endpoint(CLUSTERS, &[cluster_id, "upgrade_policies"])?;
        self.get(
            url,
            &page_query(page, size),
            &format!("upgrade policies of cluster '{}'", cluster_id),
        )
        .await
    }

    async fn get_upgrade_policy_state(
        &self,
        cluster_id: &str,
        policy_id: &str,
    ) -> Result<UpgradePolicyState> {
        let url = self.endpoint(
            CLUSTERS,
            &[cluster_id, "upgrade_policies", policy_id, "state"],
        )?;
        self.get(
            url,
            &[],
            &format!("state of upgrade policy '{}'", policy_id),
        )
        .await
    }

    async fn create_upgrade_policy(
        &self,
        cluster_id: &str,
        policy: &UpgradePolicy,
        dry_run: bool,
    ) -> Result<UpgradePolicy> {
        let url = self.endpoint(CLUSTERS, &[cluster_id, "upgrade_policies"])?;
        let query = if dry_run {
            vec![("dryRun", "true".to_string())]
        } else {
            Vec::new()
        };
        self.post(
            url,
            &query,
            policy,
            &format!("upgrade policy for cluster '{}'", cluster_id),
        )
        .await
    }

    async fn delete_upgrade_policy(&self, cluster_id: &str, policy_id: &str) -> Result<()> {
        let url = self.endpoint(CLUSTERS, &[cluster_id, "upgrade_policies", policy_id])?;
        self.delete(url, &format!("upgrade policy '{}'", policy_id))
            .await
    }

    async fn create_gate_agreement(
        &self,
        cluster_id: &str,
        agreement: &VersionGateAgreement,
    ) -> Result<VersionGateAgreement> {
        let url = self.endpoint(CLUSTERS, &[cluster_id, "gate_agreements"])?;
        self.post(
            url,
            &[],
            agreement,
            &format!(
                "agreement to version gate '{}'",
                agreement.version_gate.id
            ),
        )
        .await
    }
}

#[async_trait]
impl MachinePoolApi for OcmClient {
    async fn list_machine_pools(
        &self,
        cluster_id: &str,
        page: i64,
        size: i64,
    ) -> Result<List<MachinePool>> {
        let url = self.endpoint(CLUSTERS, &[cluster_id, "machine_pools"])?;
        self.get(
            url,
            &page_query(page, size),
            &format!("machine pools of cluster '{}'", cluster_id),
        )
        .await
    }

    async fn get_machine_pool(&self, cluster_id: &str, pool_id: &str) -> Result<MachinePool> {
        let url = self.endpoint(CLUSTERS, &[cluster_id, "machine_pools", pool_id])?;
        self.get(url, &[], &format!("machine pool '{}'", pool_id))
            .await
    }

    async fn create_machine_pool(
        &self,
        cluster_id: &str,
        pool: &MachinePool,
    ) -> Result<MachinePool> {
        let url = self.endpoint(CLUSTERS, &[cluster_id, "machine_pools"])?;
        let what = format!("machine pool '{}'", pool.id.as_deref().unwrap_or_default());
        self.post(url, &[], pool, &what).await
    }

    async fn update_machine_pool(
        &self,
        cluster_id: &str,
        pool_id: &str,
        patch: &MachinePool,
    ) -> Result<MachinePool> {
        let url = self.endpoint(CLUSTERS, &[cluster_id, "machine_pools", pool_id])?;
        self.patch(url, patch, &format!("machine pool '{}'", pool_id))
            .await
    }

    async fn delete_machine_pool(&self, cluster_id: &str, pool_id: &str) -> Result<()> {
        let url = self.endpoint(CLUSTERS, &[cluster_id, "machine_pools", pool_id])?;
        self.delete(url, &format!("machine pool '{}'", pool_id))
            .await
    }
}

#[async_trait]
impl IdentityProviderApi for OcmClient {
    async fn list_identity_providers(
        &self,
        cluster_id: &str,
        page: i64,
        size: i64,
    ) -> Result<List<IdentityProvider>> {
        let url = self.endpoint(CLUSTERS, &[cluster_id, "identity_providers"])?;
        self.get(
            url,
            &page_query(page, size),
            &format!("identity providers of cluster '{}'", cluster_id),
        )
        .await
    }

    async fn get_identity_provider(
        &self,
        cluster_id: &str,
        idp_id: &str,
    ) -> Result<IdentityProvider> {
        let url = self.endpoint(CLUSTERS, &[cluster_id, "identity_providers", idp_id])?;
        self.get(url, &[], &format!("identity provider '{}'", idp_id))
            .await
    }

    async fn create_identity_provider(
        &self,
        cluster_id: &str,
        idp: &IdentityProvider,
    ) -> Result<IdentityProvider> {
        let url = self.endpoint(CLUSTERS, &[cluster_id, "identity_providers"])?;
        let what = format!("identity provider '{}'", idp.name.as_deref().unwrap_or_default());
        self.post(url, &[], idp, &what).await
    }

    async fn delete_identity_provider(&self, cluster_id: &str, idp_id: &str) -> Result<()> {
        let url = self.endpoint(CLUSTERS, &[cluster_id, "identity_providers", idp_id])?;
        self.delete(url, &format!("identity provider '{}'", idp_id))
            .await
    }
}

#[async_trait]
impl GroupApi for OcmClient {
    async fn list_groups(&self, cluster_id: &str, page: i64, size: i64) -> Result<List<Group>> {
        let url = self.endpoint(CLUSTERS, &[cluster_id, "groups"])?;
        self.get(
            url,
            &page_query(page, size),
            &format!("groups of cluster '{}'", cluster_id),
        )
        .await
    }

    async fn add_group_user(&self, cluster_id: &str, group_id: &str, user: &User) -> Result<User> {
        let url = self.endpoint(CLUSTERS, &[cluster_id, "groups", group_id, "users"])?;
        self.post(
            url,
            &[],
            user,
            &format!("user '{}' in group '{}'", user.id, group_id),
        )
        .await
    }

    async fn get_group_user(
        &self,
        cluster_id: &str,
        group_id: &str,
        user_id: &str,
    ) -> Result<User> {
        let url = self.endpoint(
            CLUSTERS,
            &[cluster_id, "groups", group_id, "users", user_id],
        )?;
        self.get(
            url,
            &[],
            &format!("user '{}' in group '{}'", user_id, group_id),
        )
        .await
    }

    async fn delete_group_user(
        &self,
        cluster_id: &str,
        group_id: &str,
        user_id: &str,
    ) -> Result<()> {
        let url = self.endpoint(
            CLUSTERS,
            &[cluster_id, "groups", group_id, "users", user_id],
        )?;
        self.delete(url, &format!("user '{}' in group '{}'", user_id, group_id))
            .await
    }
}

#[async_trait]
impl DnsDomainApi for OcmClient {
    async fn create_dns_domain(&self, domain: &DnsDomain) -> Result<DnsDomain> {
        let url = self.endpoint(DNS_DOMAINS, &[])?;
        self.post(url, &[], domain, "DNS domain").await
    }

    async fn get_dns_domain(&self, domain_id: &str) -> Result<DnsDomain> {
        let url = self.endpoint(DNS_DOMAINS, &[domain_id])?;
        self.get(url, &[], &format!("DNS domain '{}'", domain_id))
            .await
    }

    async fn delete_dns_domain(&self, domain_id: &str) -> Result<()> {
        let url = self.endpoint(DNS_DOMAINS, &[domain_id])?;
        self.delete(url, &format!("DNS domain '{}'", domain_id))
            .await
    }
}

#[async_trait]
impl OidcConfigApi for OcmClient {
    async fn create_oidc_config(&self, config: &OidcConfig) -> Result<OidcConfig> {
        let url = self.endpoint(OIDC_CONFIGS, &[])?;
        self.post(url, &[], config, "OIDC config").await
    }

    async fn get_oidc_config(&self, config_id: &str) -> Result<OidcConfig> {
        let url = self.endpoint(OIDC_CONFIGS, &[config_id])?;
        self.get(url, &[], &format!("OIDC config '{}'", config_id))
            .await
    }

    async fn delete_oidc_config(&self, config_id: &str) -> Result<()> {
        let url = self.endpoint(OIDC_CONFIGS, &[config_id])?;
        self.delete(url, &format!("OIDC config '{}'", config_id))
            .await
    }
}

#[async_trait]
impl CatalogApi for OcmClient {
    async fn list_versions(&self, search: &str, page: i64, size: i64) -> Result<List<Version>> {
        let url = self.endpoint(VERSIONS, &[])?;
        let mut query = page_query(page, size);
        query.push(("search", search.to_string()));
        query.push(("order", "id".to_string()));
        self.get(url, &query, "versions").await
    }

    async fn list_machine_types(&self, page: i64, size: i64) -> Result<List<MachineType>> {
        let url = self.endpoint(MACHINE_TYPES, &[])?;
        self.get(url, &page_query(page, size), "machine types")
            .await
    }

    async fn list_cloud_providers(
        &self,
        search: Option<&str>,
        order: Option<&str>,
        page: i64,
        size: i64,
    ) -> Result<List<CloudProvider>> {
        let url = self.endpoint(CLOUD_PROVIDERS, &[])?;
        let mut query = page_query(page, size);
        if let Some(search) = search {
            query.push(("search", search.to_string()));
        }
        if let Some(order) = order {
            query.push(("order", order.to_string()));
        }
        self.get(url, &query, "cloud providers").await
    }

    async fn list_sts_policies(&self, page: i64, size: i64) -> Result<List<StsPolicy>> {
        let url = self.endpoint(STS_POLICIES, &[])?;
        self.get(url, &page_query(page, size), "STS policies")
            .await
    }

    async fn list_sts_credential_requests(
        &self,
        page: i64,
        size: i64,
    ) -> Result<List<StsCredentialRequest>> {
        let url = self.endpoint(STS_CREDENTIAL_REQUESTS, &[])?;
        self.get(url, &page_query(page, size), "STS credential requests")
            .await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn endpoint_encodes_segments() {
        let client = OcmClient::new(
            reqwest::Client::new(),
            "https://api.example.com",
            Authenticator::access_token("t"),
        )
        .unwrap();
        let url = client
            .endpoint(CLUSTERS, &["abc", "upgrade_policies", "a b"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/api/clusters_mgmt/v1/clusters/abc/upgrade_policies/a%20b"
        );
        let url = client.endpoint(CLUSTERS, &[]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/api/clusters_mgmt/v1/clusters"
        );
    }

    #[test]
    fn invalid_url() {
        assert!(OcmClient::new(
            reqwest::Client::new(),
            "not a url",
            Authenticator::access_token("t")
        )
        .is_err());
    }
}
