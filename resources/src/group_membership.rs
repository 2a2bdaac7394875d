/*!

The `rhcs_group_membership` resource adds a user to a group of a cluster, e.g. `dedicated-admins`.
The membership is identified by the user name.

!*/

use crate::common::{removed_from_state, required, wait_for_cluster};
use async_trait::async_trait;
use log::info;
use rhcs_model::clients::{ClusterApi, GroupApi, HttpStatusCode};
use rhcs_model::{Configuration, User};
use rhcs_provider::poll::Poller;
use rhcs_provider::provider::{
    update_not_supported, ErrorKind, ProviderError, ProviderResult, Resource,
};
use rhcs_provider::Diagnostics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const TYPE_NAME: &str = "rhcs_group_membership";

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupMembershipState {
    pub cluster: String,
    pub group: String,
    pub user: String,
    pub id: Option<String>,
}

impl Configuration for GroupMembershipState {}

fn flatten(user: &User, state: &mut GroupMembershipState) {
    state.id = Some(user.id.clone());
    state.user = user.id.clone();
}

pub struct GroupMembershipResource<C> {
    client: Arc<C>,
    poller: Poller,
}

impl<C> GroupMembershipResource<C>
where
    C: ClusterApi + GroupApi + 'static,
{
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            poller: Poller::create(),
        }
    }
}

#[async_trait]
impl<C> Resource for GroupMembershipResource<C>
where
    C: ClusterApi + GroupApi + 'static,
{
    type State = GroupMembershipState;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    async fn create(
        &self,
        mut plan: GroupMembershipState,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<GroupMembershipState> {
        required("cluster", &plan.cluster)?;
        required("group", &plan.group)?;
        required("user", &plan.user)?;
        wait_for_cluster(&*self.client, &self.poller, &plan.cluster).await?;

        info!(
            "Adding user '{}' to group '{}' of cluster '{}'",
            plan.user, plan.group, plan.cluster
        );
        let user = self
            .client
            .add_group_user(
                &plan.cluster,
                &plan.group,
                &User {
                    id: plan.user.clone(),
                },
            )
            .await
            .map_err(|e| {
                ProviderError::new_with_source_and_context(
                    ErrorKind::Remote,
                    "Can't create group membership",
                    format!(
                        "Can't create group membership for cluster '{}' and group '{}': {}",
                        plan.cluster, plan.group, e
                    ),
                )
            })?;
        flatten(&user, &mut plan);
        Ok(plan)
    }

    async fn read(
        &self,
        mut state: GroupMembershipState,
        diags: &mut Diagnostics,
    ) -> ProviderResult<Option<GroupMembershipState>> {
        let user_id = state.id.clone().unwrap_or_else(|| state.user.clone());
        match self
            .client
            .get_group_user(&state.cluster, &state.group, &user_id)
            .await
        {
            Ok(user) => {
                flatten(&user, &mut state);
                Ok(Some(state))
            }
            Err(e) if e.is_not_found() => {
                removed_from_state(
                    diags,
                    "Group membership",
                    format!(
                        "user ({}) of group ({}) of cluster ({})",
                        user_id, state.group, state.cluster
                    ),
                );
                Ok(None)
            }
            Err(e) => Err(ProviderError::new_with_source_and_context(
                ErrorKind::Remote,
                "Can't find group membership",
                format!(
                    "Can't find user group membership identifier '{}' for cluster '{}' and \
                    group '{}': {}",
                    user_id, state.cluster, state.group, e
                ),
            )),
        }
    }

    async fn update(
        &self,
        _state: GroupMembershipState,
        _plan: GroupMembershipState,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<GroupMembershipState> {
        update_not_supported(TYPE_NAME)
    }

    async fn delete(
        &self,
        state: GroupMembershipState,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<()> {
        let user_id = state.id.clone().unwrap_or_else(|| state.user.clone());
        match self
            .client
            .delete_group_user(&state.cluster, &state.group, &user_id)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(ProviderError::new_with_source_and_context(
                ErrorKind::Remote,
                "Can't delete group membership",
                format!(
                    "Can't delete group membership with identifier '{}' for cluster '{}' and \
                    group '{}': {}",
                    user_id, state.cluster, state.group, e
                ),
            )),
        }
    }
}
