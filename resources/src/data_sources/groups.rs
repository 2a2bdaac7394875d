use crate::common::required;
use async_trait::async_trait;
use rhcs_model::clients::GroupApi;
use rhcs_model::Configuration;
use rhcs_provider::provider::{DataSource, ErrorKind, IntoProviderError, ProviderResult};
use rhcs_provider::Diagnostics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The `rhcs_groups` schema.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupsState {
    pub cluster: String,
    pub items: Vec<GroupState>,
}

impl Configuration for GroupsState {}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupState {
    pub id: String,
    pub name: String,
}

/// The groups of a cluster.
pub struct GroupsDataSource<C> {
    client: Arc<C>,
}

impl<C> GroupsDataSource<C>
where
    C: GroupApi + 'static,
{
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C> DataSource for GroupsDataSource<C>
where
    C: GroupApi + 'static,
{
    type State = GroupsState;

    fn type_name(&self) -> &'static str {
        "rhcs_groups"
    }

    async fn read(
        &self,
        mut config: GroupsState,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<GroupsState> {
        required("cluster", &config.cluster)?;
        let groups = self
            .client
            .all_groups(&config.cluster)
            .await
            .context(
                ErrorKind::Remote,
                format!("Can't list groups of cluster '{}'", config.cluster),
            )?;
        config.items = groups
            .into_iter()
            .map(|group| GroupState {
                name: group.id.clone(),
                id: group.id,
            })
            .collect();
        Ok(config)
    }
}
