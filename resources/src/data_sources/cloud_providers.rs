use crate::common::non_empty;
use async_trait::async_trait;
use rhcs_model::clients::{list_all, CatalogApi, DEFAULT_PAGE_SIZE};
use rhcs_model::{CloudProvider, Configuration};
use rhcs_provider::provider::{DataSource, ErrorKind, IntoProviderError, ProviderResult};
use rhcs_provider::Diagnostics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The `rhcs_cloud_providers` schema. `search` and `order` use the API query syntax, e.g.
/// `display_name like 'A%'` and `display_name asc`.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudProvidersState {
    pub search: Option<String>,
    pub order: Option<String>,
    /// Set when exactly one cloud provider matches.
    pub item: Option<CloudProviderState>,
    pub items: Vec<CloudProviderState>,
}

impl Configuration for CloudProvidersState {}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudProviderState {
    pub id: String,
    pub name: String,
    pub display_name: String,
}

impl From<CloudProvider> for CloudProviderState {
    fn from(provider: CloudProvider) -> Self {
        Self {
            id: provider.id,
            name: provider.name,
            display_name: provider.display_name,
        }
    }
}

pub struct CloudProvidersDataSource<C> {
    client: Arc<C>,
}

impl<C> CloudProvidersDataSource<C>
where
    C: CatalogApi + 'static,
{
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C> DataSource for CloudProvidersDataSource<C>
where
    C: CatalogApi + 'static,
{
    type State = CloudProvidersState;

    fn type_name(&self) -> &'static str {
        "rhcs_cloud_providers"
    }

    async fn read(
        &self,
        mut config: CloudProvidersState,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<CloudProvidersState> {
        let search = non_empty(&config.search);
        let order = non_empty(&config.order);
        let providers = list_all(DEFAULT_PAGE_SIZE, |page| {
            self.client
                .list_cloud_providers(search, order, page, DEFAULT_PAGE_SIZE)
        })
        .await
        .context(ErrorKind::Remote, "Can't list cloud providers")?;

        config.items = providers.into_iter().map(CloudProviderState::from).collect();
        config.item = match config.items.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        };
        Ok(config)
    }
}
