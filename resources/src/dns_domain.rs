/*!

The `rhcs_dns_domain` resource reserves a base DNS domain for clusters of the organization. The
domain name is chosen by the service.

!*/

use crate::common::removed_from_state;
use async_trait::async_trait;
use log::info;
use rhcs_model::clients::{DnsDomainApi, HttpStatusCode};
use rhcs_model::{Configuration, DnsDomain};
use rhcs_provider::provider::{
    ErrorKind, IntoProviderError, ProviderError, ProviderResult, Resource,
};
use rhcs_provider::Diagnostics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsDomainState {
    pub id: Option<String>,
}

impl Configuration for DnsDomainState {}

pub struct DnsDomainResource<C> {
    client: Arc<C>,
}

impl<C> DnsDomainResource<C>
where
    C: DnsDomainApi + 'static,
{
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C> Resource for DnsDomainResource<C>
where
    C: DnsDomainApi + 'static,
{
    type State = DnsDomainState;

    fn type_name(&self) -> &'static str {
        "rhcs_dns_domain"
    }

    async fn create(
        &self,
        _plan: DnsDomainState,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<DnsDomainState> {
        let domain = self
            .client
            .create_dns_domain(&DnsDomain::default())
            .await
            .context(ErrorKind::Remote, "Failed to create DNS Domain.")?;
        let id = domain
            .id
            .filter(|id| !id.is_empty())
            .context(ErrorKind::Remote, "Failed to create DNS Domain.")?;
        info!("Reserved DNS domain '{}'", id);
        Ok(DnsDomainState { id: Some(id) })
    }

    async fn read(
        &self,
        state: DnsDomainState,
        diags: &mut Diagnostics,
    ) -> ProviderResult<Option<DnsDomainState>> {
        let id = state.id.clone().unwrap_or_default();
        match self.client.get_dns_domain(&id).await {
            Ok(domain) => Ok(Some(DnsDomainState {
                id: domain.id.or(state.id),
            })),
            Err(e) if e.is_not_found() => {
                removed_from_state(diags, "DNS domain", format!("DNS domain ({})", id));
                Ok(None)
            }
            Err(e) => Err(ProviderError::new_with_source_and_context(
                ErrorKind::Remote,
                format!("Can't find DNS domain with identifier '{}'", id),
                e,
            )),
        }
    }

    async fn update(
        &self,
        _state: DnsDomainState,
        _plan: DnsDomainState,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<DnsDomainState> {
        Err(ProviderError::validation(
            "Can't update DNS domain",
            "Update is currently not supported.",
        ))
    }

    async fn delete(&self, state: DnsDomainState, _diags: &mut Diagnostics) -> ProviderResult<()> {
        let id = state.id.clone().unwrap_or_default();
        match self.client.delete_dns_domain(&id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(ProviderError::new_with_source_and_context(
                ErrorKind::Remote,
                format!("Can't delete DNS domain with identifier '{}'", id),
                e,
            )),
        }
    }

    async fn import(&self, id: &str, _diags: &mut Diagnostics) -> ProviderResult<DnsDomainState> {
        Ok(DnsDomainState {
            id: Some(id.to_string()),
        })
    }
}
