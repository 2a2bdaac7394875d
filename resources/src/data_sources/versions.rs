use async_trait::async_trait;
use rhcs_model::clients::CatalogApi;
use rhcs_model::{Configuration, Version};
use rhcs_provider::provider::{DataSource, ErrorKind, IntoProviderError, ProviderResult};
use rhcs_provider::Diagnostics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The `rhcs_versions` schema.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionsState {
    pub items: Vec<VersionState>,
}

impl Configuration for VersionsState {}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionState {
    /// E.g. `openshift-v4.12.5`.
    pub id: String,
    /// E.g. `4.12.5`.
    pub name: String,
}

impl From<&Version> for VersionState {
    fn from(version: &Version) -> Self {
        Self {
            id: version.id.clone(),
            name: version.raw_id.clone(),
        }
    }
}

/// Every enabled version.
pub struct VersionsDataSource<C> {
    client: Arc<C>,
}

impl<C> VersionsDataSource<C>
where
    C: CatalogApi + 'static,
{
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C> DataSource for VersionsDataSource<C>
where
    C: CatalogApi + 'static,
{
    type State = VersionsState;

    fn type_name(&self) -> &'static str {
        "rhcs_versions"
    }

    async fn read(
        &self,
        _config: VersionsState,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<VersionsState> {
        let versions = self
            .client
            .all_enabled_versions()
            .await
            .context(ErrorKind::Remote, "Can't list versions")?;
        Ok(VersionsState {
            items: versions.iter().map(VersionState::from).collect(),
        })
    }
}
