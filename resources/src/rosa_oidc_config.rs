/*!

The `rhcs_rosa_oidc_config` resource registers the OIDC configuration that STS clusters use to
issue service account tokens. A managed configuration is hosted by the service; an unmanaged one
points at an issuer, a secret and an installer role owned by the user.

!*/

use crate::common::{non_empty, removed_from_state};
use async_trait::async_trait;
use log::{error, info};
use rhcs_model::clients::{ClusterApi, OidcConfigApi};
use rhcs_model::{Configuration, OidcConfig};
use rhcs_provider::provider::{
    ErrorKind, IntoProviderError, ProviderError, ProviderResult, Resource,
};
use rhcs_provider::thumbprint::ThumbprintFetcher;
use rhcs_provider::Diagnostics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosaOidcConfigState {
    pub managed: bool,
    pub secret_arn: Option<String>,
    pub issuer_url: Option<String>,
    pub installer_role_arn: Option<String>,
    pub id: Option<String>,
    pub thumbprint: Option<String>,
    /// The issuer without its scheme, as clusters reference it.
    pub oidc_endpoint_url: Option<String>,
}

impl Configuration for RosaOidcConfigState {}

fn validate_plan(plan: &RosaOidcConfigState) -> ProviderResult<()> {
    let unmanaged = [
        non_empty(&plan.secret_arn),
        non_empty(&plan.issuer_url),
        non_empty(&plan.installer_role_arn),
    ];
    if plan.managed && unmanaged.iter().any(Option::is_some) {
        return Err(ProviderError::validation(
            "Attribute's values are not supported for managed OIDC Configuration",
            "In order to create managed OIDC Configuration, the attributes' values of \
            `secret_arn`, `issuer_url` and `installer_role_arn` should be empty",
        ));
    }
    if !plan.managed && unmanaged.iter().any(Option::is_none) {
        return Err(ProviderError::validation(
            "There is a missing parameter for unmanaged OIDC Configuration",
            "There is a missing parameter for unmanaged OIDC Configuration. Please provide \
            values for all those attributes `secret_arn`, `issuer_url` and `installer_role_arn`",
        ));
    }
    Ok(())
}

fn expand(plan: &RosaOidcConfigState) -> OidcConfig {
    if plan.managed {
        return OidcConfig {
            managed: true,
            ..OidcConfig::default()
        };
    }
    OidcConfig {
        id: None,
        managed: false,
        secret_arn: plan.secret_arn.clone(),
        issuer_url: plan.issuer_url.clone(),
        installer_role_arn: plan.installer_role_arn.clone(),
    }
}

/// The endpoint clusters are configured with, the issuer URL without `https://`.
pub(crate) fn oidc_endpoint_url(issuer_url: &str) -> String {
    issuer_url
        .strip_prefix("https://")
        .unwrap_or(issuer_url)
        .to_string()
}

fn flatten(config: &OidcConfig, state: &mut RosaOidcConfigState) {
    state.id = config.id.clone();
    state.managed = config.managed;
    let issuer_url = non_empty(&config.issuer_url).unwrap_or_default();
    if !issuer_url.is_empty() {
        state.issuer_url = Some(issuer_url.to_string());
    }
    if let Some(arn) = non_empty(&config.installer_role_arn) {
        state.installer_role_arn = Some(arn.to_string());
    }
    if let Some(arn) = non_empty(&config.secret_arn) {
        state.secret_arn = Some(arn.to_string());
    }
    state.oidc_endpoint_url = Some(oidc_endpoint_url(issuer_url));
}

pub struct RosaOidcConfigResource<C> {
    client: Arc<C>,
    fetcher: Arc<dyn ThumbprintFetcher>,
}

impl<C> RosaOidcConfigResource<C>
where
    C: ClusterApi + OidcConfigApi + 'static,
{
    pub fn new(client: Arc<C>, fetcher: Arc<dyn ThumbprintFetcher>) -> Self {
        Self { client, fetcher }
    }

    /// Copy `config` into `state` including the thumbprint of its issuer. Failing to get the
    /// thumbprint leaves it empty.
    async fn populate(&self, config: &OidcConfig, state: &mut RosaOidcConfigState) {
        flatten(config, state);
        let issuer_url = non_empty(&config.issuer_url).unwrap_or_default();
        state.thumbprint = Some(match self.fetcher.thumbprint(issuer_url).await {
            Ok(thumbprint) => thumbprint,
            Err(e) => {
                error!("cannot get thumbprint, with error: {}", e);
                String::new()
            }
        });
    }

    async fn get_config(&self, id: &str) -> ProviderResult<OidcConfig> {
        self.client
            .get_oidc_config(id)
            .await
            .context(ErrorKind::Remote, "Can't find OIDC config")
    }

    /// True when a cluster still refers to the issuer.
    async fn in_use(&self, issuer_url: &str) -> ProviderResult<bool> {
        let search = format!("aws.sts.oidc_endpoint_url = '{}'", issuer_url);
        let clusters = self
            .client
            .search_clusters(&search, 1, 1)
            .await
            .map_err(|e| {
                ProviderError::new_with_source_and_context(
                    ErrorKind::Remote,
                    "There was a problem checking if any clusters are using OIDC config",
                    format!(
                        "There was a problem checking if any clusters are using OIDC config \
                        '{}': {}",
                        issuer_url, e
                    ),
                )
            })?;
        Ok(clusters.total.unwrap_or_default() > 0)
    }
}

#[async_trait]
impl<C> Resource for RosaOidcConfigResource<C>
where
    C: ClusterApi + OidcConfigApi + 'static,
{
    type State = RosaOidcConfigState;

    fn type_name(&self) -> &'static str {
        "rhcs_rosa_oidc_config"
    }

    async fn create(
        &self,
        mut plan: RosaOidcConfigState,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<RosaOidcConfigState> {
        validate_plan(&plan)?;
        let created = self
            .client
            .create_oidc_config(&expand(&plan))
            .await
            .map_err(|e| {
                ProviderError::new_with_source_and_context(
                    ErrorKind::Remote,
                    "There was a problem registering the OIDC Configuration",
                    format!(
                        "There was a problem registering the OIDC Configuration: {}",
                        e
                    ),
                )
            })?;
        info!(
            "Registered OIDC config '{}'",
            created.id.as_deref().unwrap_or_default()
        );
        self.populate(&created, &mut plan).await;
        Ok(plan)
    }

    async fn read(
        &self,
        mut state: RosaOidcConfigState,
        diags: &mut Diagnostics,
    ) -> ProviderResult<Option<RosaOidcConfigState>> {
        let id = state.id.clone().unwrap_or_default();
        match self.get_config(&id).await {
            Ok(config) => {
                self.populate(&config, &mut state).await;
                Ok(Some(state))
            }
            Err(e) if e.is_not_found() => {
                removed_from_state(diags, "OIDC config", format!("OIDC config ({})", id));
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn update(
        &self,
        _state: RosaOidcConfigState,
        _plan: RosaOidcConfigState,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<RosaOidcConfigState> {
        Err(ProviderError::validation(
            "Update methode is not supported for that resource",
            "Update methode is not supported for that resource",
        ))
    }

    async fn delete(
        &self,
        state: RosaOidcConfigState,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<()> {
        let id = state.id.clone().unwrap_or_default();
        let config = match self.get_config(&id).await {
            Ok(config) => config,
            Err(e) if e.is_not_found() => {
                info!("OIDC config '{}' was already deleted", id);
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let issuer_url = config.issuer_url.clone().unwrap_or_default();
        if self.in_use(&issuer_url).await? {
            return Err(ProviderError::validation(
                "There are clusters using OIDC config, can't delete the configuration",
                format!(
                    "There are clusters using OIDC config '{}', can't delete the configuration",
                    issuer_url
                ),
            ));
        }
        self.client.delete_oidc_config(&id).await.map_err(|e| {
            ProviderError::new_with_source_and_context(
                ErrorKind::Remote,
                "There was a problem deleting the OIDC config",
                format!(
                    "There was a problem deleting the OIDC config '{}': {}",
                    issuer_url, e
                ),
            )
        })
    }

    async fn import(
        &self,
        id: &str,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<RosaOidcConfigState> {
        Ok(RosaOidcConfigState {
            id: Some(id.to_string()),
            ..RosaOidcConfigState::default()
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn unmanaged() -> RosaOidcConfigState {
        RosaOidcConfigState {
            managed: false,
            secret_arn: Some(
                "arn:aws:secretsmanager:us-east-1:123456789012:secret:oidc-abc".to_string(),
            ),
            issuer_url: Some("https://oidc.example.com/abc".to_string()),
            installer_role_arn: Some(
                "arn:aws:iam::123456789012:role/ManagedOpenShift-Installer-Role".to_string(),
            ),
            ..RosaOidcConfigState::default()
        }
    }

    #[test]
    fn managed_or_unmanaged() {
        assert!(validate_plan(&unmanaged()).is_ok());
        assert!(validate_plan(&RosaOidcConfigState {
            managed: true,
            ..RosaOidcConfigState::default()
        })
        .is_ok());

        let managed_with_issuer = RosaOidcConfigState {
            managed: true,
            ..unmanaged()
        };
        assert!(validate_plan(&managed_with_issuer).is_err());

        let missing_secret = RosaOidcConfigState {
            secret_arn: None,
            ..unmanaged()
        };
        assert_eq!(
            validate_plan(&missing_secret).unwrap_err().context(),
            Some("There is a missing parameter for unmanaged OIDC Configuration")
        );
    }

    #[test]
    fn endpoint_without_scheme() {
        assert_eq!(
            oidc_endpoint_url("https://oidc.example.com/abc"),
            "oidc.example.com/abc"
        );
        assert_eq!(oidc_endpoint_url("oidc.example.com"), "oidc.example.com");

        let mut state = RosaOidcConfigState::default();
        let mut response = expand(&unmanaged());
        response.id = Some("cfg-1".to_string());
        flatten(&response, &mut state);
        assert_eq!(state.id.as_deref(), Some("cfg-1"));
        assert_eq!(state.oidc_endpoint_url.as_deref(), Some("oidc.example.com/abc"));
        assert_eq!(state.secret_arn, unmanaged().secret_arn);
    }

    #[test]
    fn managed_request_is_bare() {
        let request = expand(&RosaOidcConfigState {
            managed: true,
            ..RosaOidcConfigState::default()
        });
        assert_eq!(
            request,
            OidcConfig {
                managed: true,
                ..OidcConfig::default()
            }
        );
    }
}
