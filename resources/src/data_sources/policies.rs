use async_trait::async_trait;
use log::debug;
use rhcs_model::clients::CatalogApi;
use rhcs_model::{Configuration, StsPolicy};
use rhcs_provider::provider::{DataSource, ErrorKind, IntoProviderError, ProviderResult};
use rhcs_provider::Diagnostics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The `rhcs_policies` schema. Each attribute holds the JSON policy document of the role.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoliciesState {
    pub operator_role_policies: OperatorRolePolicies,
    pub account_role_policies: AccountRolePolicies,
}

impl Configuration for PoliciesState {}

/// Policies of the roles assumed by cluster operators. The attribute names are the policy ids.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorRolePolicies {
    pub openshift_cloud_credential_operator_cloud_credential_operator_iam_ro_creds_policy:
        Option<String>,
    pub openshift_cloud_network_config_controller_cloud_credentials_policy: Option<String>,
    pub openshift_cluster_csi_drivers_ebs_cloud_credentials_policy: Option<String>,
    pub openshift_image_registry_installer_cloud_credentials_policy: Option<String>,
    pub openshift_ingress_operator_cloud_credentials_policy: Option<String>,
    pub openshift_machine_api_aws_cloud_credentials_policy: Option<String>,
}

/// Policies of the account wide roles. The attribute names are the policy ids.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountRolePolicies {
    pub sts_installer_permission_policy: Option<String>,
    pub sts_support_permission_policy: Option<String>,
    pub sts_instance_worker_permission_policy: Option<String>,
    pub sts_instance_controlplane_permission_policy: Option<String>,
}

fn sort_policies(policies: &[StsPolicy]) -> PoliciesState {
    let mut state = PoliciesState::default();
    let operator = &mut state.operator_role_policies;
    let account = &mut state.account_role_policies;
    for policy in policies {
        let details = Some(policy.details.clone());
        match policy.id.as_str() {
            "openshift_cloud_credential_operator_cloud_credential_operator_iam_ro_creds_policy" => {
                operator.openshift_cloud_credential_operator_cloud_credential_operator_iam_ro_creds_policy = details
            }
            "openshift_cloud_network_config_controller_cloud_credentials_policy" => {
                operator.openshift_cloud_network_config_controller_cloud_credentials_policy = details
            }
            "openshift_cluster_csi_drivers_ebs_cloud_credentials_policy" => {
                operator.openshift_cluster_csi_drivers_ebs_cloud_credentials_policy = details
            }
            "openshift_image_registry_installer_cloud_credentials_policy" => {
                operator.openshift_image_registry_installer_cloud_credentials_policy = details
            }
            "openshift_ingress_operator_cloud_credentials_policy" => {
                operator.openshift_ingress_operator_cloud_credentials_policy = details
            }
            "openshift_machine_api_aws_cloud_credentials_policy" => {
                operator.openshift_machine_api_aws_cloud_credentials_policy = details
            }
            "sts_installer_permission_policy" => account.sts_installer_permission_policy = details,
            "sts_support_permission_policy" => account.sts_support_permission_policy = details,
            "sts_instance_worker_permission_policy" => {
                account.sts_instance_worker_permission_policy = details
            }
            "sts_instance_controlplane_permission_policy" => {
                account.sts_instance_controlplane_permission_policy = details
            }
            other => debug!(
                "Policy '{}' is neither an operator role policy nor an account role policy",
                other
            ),
        }
    }
    state
}

pub struct PoliciesDataSource<C> {
    client: Arc<C>,
}

impl<C> PoliciesDataSource<C>
where
    C: CatalogApi + 'static,
{
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C> DataSource for PoliciesDataSource<C>
where
    C: CatalogApi + 'static,
{
    type State = PoliciesState;

    fn type_name(&self) -> &'static str {
        "rhcs_policies"
    }

    async fn read(
        &self,
        _config: PoliciesState,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<PoliciesState> {
        let policies = self
            .client
            .all_sts_policies()
            .await
            .context(ErrorKind::Remote, "Failed to get policies")?;
        Ok(sort_policies(&policies))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn policy(id: &str) -> StsPolicy {
        StsPolicy {
            id: id.to_string(),
            details: format!("{{\"Sid\": \"{}\"}}", id),
            ..StsPolicy::default()
        }
    }

    #[test]
    fn split_by_id() {
        let state = sort_policies(&[
            policy("sts_installer_permission_policy"),
            policy("openshift_ingress_operator_cloud_credentials_policy"),
            policy("sts_hcp_installer_permission_policy"),
        ]);
        assert_eq!(
            state.account_role_policies.sts_installer_permission_policy.as_deref(),
            Some("{\"Sid\": \"sts_installer_permission_policy\"}")
        );
        assert!(state
            .operator_role_policies
            .openshift_ingress_operator_cloud_credentials_policy
            .is_some());
        assert!(state
            .account_role_policies
            .sts_support_permission_policy
            .is_none());
    }
}
