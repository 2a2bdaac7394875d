/*!

The `rhcs_identity_provider` resource configures how users log in to a cluster. Exactly one kind
of provider is configured per resource: htpasswd, GitHub, GitLab, Google, OpenID or LDAP.

The API never returns secrets, so client secrets and passwords in the state always come from the
configuration. Identity providers cannot be changed in place.

!*/

mod state;
mod validation;

pub use state::{
    GithubState, GitlabState, GoogleState, HtpasswdState, HtpasswdUserState,
    IdentityProviderState, LdapAttributesState, LdapState, OpenIdClaimsState, OpenIdState,
};
pub(crate) use validation::{validate_htpasswd_password, validate_htpasswd_username};

use crate::common::{removed_from_state, required, wait_for_cluster};
use async_trait::async_trait;
use log::info;
use rhcs_model::clients::{ClusterApi, HttpStatusCode, IdentityProviderApi};
use rhcs_provider::import::parse_composite_id;
use rhcs_provider::poll::Poller;
use rhcs_provider::provider::{
    ErrorKind, IntoProviderError, ProviderError, ProviderResult, Resource,
};
use rhcs_provider::Diagnostics;
use std::sync::Arc;

pub struct IdentityProviderResource<C> {
    client: Arc<C>,
    poller: Poller,
}

impl<C> IdentityProviderResource<C>
where
    C: ClusterApi + IdentityProviderApi + 'static,
{
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            poller: Poller::waiter(),
        }
    }
}

#[async_trait]
impl<C> Resource for IdentityProviderResource<C>
where
    C: ClusterApi + IdentityProviderApi + 'static,
{
    type State = IdentityProviderState;

    fn type_name(&self) -> &'static str {
        "rhcs_identity_provider"
    }

    async fn create(
        &self,
        mut plan: IdentityProviderState,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<IdentityProviderState> {
        required("cluster", &plan.cluster)?;
        required("name", &plan.name)?;
        validation::validate_plan(&plan)?;
        wait_for_cluster(&*self.client, &self.poller, &plan.cluster).await?;

        let request = state::expand(&plan);
        info!(
            "Creating identity provider '{}' for cluster '{}'",
            plan.name, plan.cluster
        );
        let created = self
            .client
            .create_identity_provider(&plan.cluster, &request)
            .await
            .map_err(|e| {
                ProviderError::new_with_source_and_context(
                    ErrorKind::Remote,
                    "Can't create identity provider",
                    format!(
                        "Can't create identity provider with name '{}' for cluster '{}': {}",
                        plan.name, plan.cluster, e
                    ),
                )
            })?;
        state::flatten(&created, &mut plan);
        Ok(plan)
    }

    async fn read(
        &self,
        mut state: IdentityProviderState,
        diags: &mut Diagnostics,
    ) -> ProviderResult<Option<IdentityProviderState>> {
        let idp_id = state.id.clone().unwrap_or_default();
        let idp = match self
            .client
            .get_identity_provider(&state.cluster, &idp_id)
            .await
            .context(ErrorKind::Remote, "Can't find identity provider")
        {
            Ok(idp) => idp,
            Err(e) if e.is_not_found() => {
                removed_from_state(
                    diags,
                    "Identity provider",
                    format!(
                        "identity provider ({}) of cluster ({})",
                        idp_id, state.cluster
                    ),
                );
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        state::flatten(&idp, &mut state);
        Ok(Some(state))
    }

    async fn update(
        &self,
        _state: IdentityProviderState,
        _plan: IdentityProviderState,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<IdentityProviderState> {
        Err(ProviderError::validation(
            "IDP Update not supported.",
            "This RHCS provider version does not support updating an existing IDP",
        ))
    }

    async fn delete(
        &self,
        state: IdentityProviderState,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<()> {
        let idp_id = state.id.clone().unwrap_or_default();
        match self
            .client
            .delete_identity_provider(&state.cluster, &idp_id)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                info!(
                    "Identity provider '{}' of cluster '{}' was already deleted",
                    idp_id, state.cluster
                );
                Ok(())
            }
            Err(e) => Err(ProviderError::new_with_source_and_context(
                ErrorKind::Remote,
                "Can't delete identity provider",
                format!(
                    "Can't delete identity provider with identifier '{}' for cluster '{}': {}",
                    idp_id, state.cluster, e
                ),
            )),
        }
    }

    async fn import(
        &self,
        id: &str,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<IdentityProviderState> {
        let (cluster, name) = parse_composite_id(
            id,
            "Identity provider",
            "<cluster_id>,<identity_provider_name>",
        )?;
        let idp = self
            .client
            .all_identity_providers(&cluster)
            .await
            .context(ErrorKind::Remote, "Can't import identity provider")?
            .into_iter()
            .find(|idp| idp.name.as_deref() == Some(name.as_str()))
            .ok_or_else(|| {
                ProviderError::new_with_source_and_context(
                    ErrorKind::Remote,
                    "Can't import identity provider",
                    format!("identity provider '{}' not found", name),
                )
            })?;
        Ok(IdentityProviderState {
            cluster,
            id: idp.id,
            name,
            ..IdentityProviderState::default()
        })
    }
}
