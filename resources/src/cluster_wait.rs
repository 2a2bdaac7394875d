/*!

The `rhcs_cluster_wait` resource blocks until a cluster created elsewhere in the configuration is
ready, so that resources depending on it are created against a working cluster.

!*/

use crate::common::removed_from_state;
use async_trait::async_trait;
use log::{info, warn};
use rhcs_model::clients::ClusterApi;
use rhcs_model::{ClusterState, Configuration};
use rhcs_provider::poll::{timeout_minutes, Poller};
use rhcs_provider::provider::{ErrorKind, ProviderError, ProviderResult, Resource};
use rhcs_provider::Diagnostics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterWaitState {
    pub cluster: String,
    /// Minutes to wait, 60 when unset.
    pub timeout: Option<i64>,
    pub ready: Option<bool>,
}

impl Configuration for ClusterWaitState {}

pub struct ClusterWaitResource<C> {
    client: Arc<C>,
    poller: Poller,
}

impl<C> ClusterWaitResource<C>
where
    C: ClusterApi + 'static,
{
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            poller: Poller::waiter(),
        }
    }

    async fn wait(
        &self,
        mut state: ClusterWaitState,
        diags: &mut Diagnostics,
    ) -> ProviderResult<ClusterWaitState> {
        let timeout = timeout_minutes(state.timeout, &state.cluster, diags);
        match self
            .poller
            .wait_for_terminal_state(&*self.client, &state.cluster, timeout)
            .await
        {
            Ok(ClusterState::Ready) => {
                info!("Cluster '{}' is ready", state.cluster);
                state.ready = Some(true);
                Ok(state)
            }
            Ok(other) => Err(ProviderError::new_with_source_and_context(
                ErrorKind::Remote,
                "Can't poll cluster state",
                format!(
                    "Can't poll state of cluster with identifier '{}', cluster state is {}",
                    state.cluster, other
                ),
            )),
            Err(e) if e.kind() == ErrorKind::Timeout => {
                warn!("{}", e);
                diags.add_warning(
                    "Cluster is not ready",
                    format!(
                        "The cluster with identifier '{}' is not ready yet, but the polling \
                        finished due to a timeout",
                        state.cluster
                    ),
                );
                state.ready = Some(false);
                Ok(state)
            }
            Err(e) => Err(ProviderError::new_with_source_and_context(
                e.kind(),
                "Can't poll cluster state",
                format!(
                    "Can't poll state of cluster with identifier '{}': {}",
                    state.cluster, e
                ),
            )),
        }
    }
}

#[async_trait]
impl<C> Resource for ClusterWaitResource<C>
where
    C: ClusterApi + 'static,
{
    type State = ClusterWaitState;

    fn type_name(&self) -> &'static str {
        "rhcs_cluster_wait"
    }

    async fn create(
        &self,
        plan: ClusterWaitState,
        diags: &mut Diagnostics,
    ) -> ProviderResult<ClusterWaitState> {
        self.wait(plan, diags).await
    }

    async fn read(
        &self,
        mut state: ClusterWaitState,
        diags: &mut Diagnostics,
    ) -> ProviderResult<Option<ClusterWaitState>> {
        match self.poller.cluster_state(&*self.client, &state.cluster).await {
            Ok(cluster_state) => {
                state.ready = Some(cluster_state == ClusterState::Ready);
                Ok(Some(state))
            }
            Err(e) if e.is_not_found() => {
                removed_from_state(diags, "Cluster", format!("cluster ({})", state.cluster));
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn update(
        &self,
        _state: ClusterWaitState,
        plan: ClusterWaitState,
        diags: &mut Diagnostics,
    ) -> ProviderResult<ClusterWaitState> {
        self.wait(plan, diags).await
    }

    async fn delete(&self, _state: ClusterWaitState, _diags: &mut Diagnostics) -> ProviderResult<()> {
        Ok(())
    }
}
