use crate::common::required;
use async_trait::async_trait;
use rhcs_model::clients::ClusterApi;
use rhcs_model::Configuration;
use rhcs_provider::provider::{DataSource, ErrorKind, ProviderError, ProviderResult};
use rhcs_provider::Diagnostics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The `rhcs_cluster` schema.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterDataState {
    pub cluster: String,
    pub id: Option<String>,
    pub name: Option<String>,
    pub api_url: Option<String>,
    pub console_url: Option<String>,
}

impl Configuration for ClusterDataState {}

/// Looks up an existing cluster by identifier.
pub struct ClusterDataSource<C> {
    client: Arc<C>,
}

impl<C> ClusterDataSource<C>
where
    C: ClusterApi + 'static,
{
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C> DataSource for ClusterDataSource<C>
where
    C: ClusterApi + 'static,
{
    type State = ClusterDataState;

    fn type_name(&self) -> &'static str {
        "rhcs_cluster"
    }

    async fn read(
        &self,
        mut config: ClusterDataState,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<ClusterDataState> {
        required("cluster", &config.cluster)?;
        let cluster = self
            .client
            .get_cluster(&config.cluster)
            .await
            .map_err(|e| {
                ProviderError::new_with_source_and_context(
                    ErrorKind::Remote,
                    "Can't find cluster",
                    format!(
                        "Can't find cluster with identifier '{}': {}",
                        config.cluster, e
                    ),
                )
            })?;
        config.id = cluster.id;
        config.name = cluster.name;
        config.api_url = cluster.api.and_then(|api| api.url);
        config.console_url = cluster.console.and_then(|console| console.url);
        Ok(config)
    }
}
