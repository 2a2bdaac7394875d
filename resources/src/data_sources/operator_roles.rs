use crate::common::required;
use async_trait::async_trait;
use log::debug;
use rhcs_model::clients::{CatalogApi, ClusterApi};
use rhcs_model::{Configuration, OperatorIamRole, StsOperator};
use rhcs_provider::provider::{
    DataSource, ErrorKind, IntoProviderError, ProviderError, ProviderResult,
};
use rhcs_provider::Diagnostics;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Used when the configuration names no account role prefix.
pub const DEFAULT_ACCOUNT_ROLE_PREFIX: &str = "ManagedOpenShift";

/// IAM limits role and policy names to this many characters.
const MAX_NAME_LENGTH: usize = 64;

/// The `rhcs_rosa_operator_roles` schema.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosaOperatorRolesState {
    pub cluster_id: String,
    pub operator_role_prefix: String,
    pub account_role_prefix: Option<String>,
    pub operator_iam_roles: Vec<OperatorIamRoleState>,
}

impl Configuration for RosaOperatorRolesState {}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorIamRoleState {
    pub operator_name: String,
    pub operator_namespace: String,
    pub role_arn: String,
    pub role_name: String,
    pub policy_name: String,
    pub service_accounts: Vec<String>,
}

/// The operator roles an STS cluster expects, with the names the roles and their policies get
/// when created with the given prefixes.
pub struct RosaOperatorRolesDataSource<C> {
    client: Arc<C>,
}

impl<C> RosaOperatorRolesDataSource<C>
where
    C: CatalogApi + ClusterApi + 'static,
{
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C> DataSource for RosaOperatorRolesDataSource<C>
where
    C: CatalogApi + ClusterApi + 'static,
{
    type State = RosaOperatorRolesState;

    fn type_name(&self) -> &'static str {
        "rhcs_rosa_operator_roles"
    }

    async fn read(
        &self,
        mut config: RosaOperatorRolesState,
        _diags: &mut Diagnostics,
    ) -> ProviderResult<RosaOperatorRolesState> {
        required("cluster_id", &config.cluster_id)?;
        required("operator_role_prefix", &config.operator_role_prefix)?;

        let requests = self
            .client
            .all_sts_credential_requests()
            .await
            .context(ErrorKind::Remote, "Failed to get operator list")?;
        let mut operators = HashMap::new();
        for operator in requests.into_iter().filter_map(|request| request.operator) {
            debug!(
                "Operator name: {}, namespace {}, service accounts {:?}",
                operator.name, operator.namespace, operator.service_accounts
            );
            operators.insert(operator.namespace.clone(), operator);
        }

        let cluster = self
            .client
            .get_cluster(&config.cluster_id)
            .await
            .map_err(|e| {
                ProviderError::new_with_source_and_context(
                    ErrorKind::Remote,
                    "Can't find cluster",
                    format!(
                        "Can't find cluster with identifier '{}': {}",
                        config.cluster_id, e
                    ),
                )
            })?;

        let account_role_prefix = config
            .account_role_prefix
            .as_deref()
            .filter(|prefix| !prefix.is_empty())
            .unwrap_or(DEFAULT_ACCOUNT_ROLE_PREFIX)
            .to_string();
        config.operator_iam_roles = cluster
            .aws
            .and_then(|aws| aws.sts)
            .and_then(|sts| sts.operator_iam_roles)
            .unwrap_or_default()
            .iter()
            .map(|role| {
                operator_role(
                    role,
                    &config.operator_role_prefix,
                    &account_role_prefix,
                    &operators,
                )
            })
            .collect();
        Ok(config)
    }
}

fn operator_role(
    role: &OperatorIamRole,
    operator_role_prefix: &str,
    account_role_prefix: &str,
    operators: &HashMap<String, StsOperator>,
) -> OperatorIamRoleState {
    let name = role.name.clone().unwrap_or_default();
    let namespace = role.namespace.clone().unwrap_or_default();
    let service_accounts = operators
        .get(&namespace)
        .map(|operator| {
            operator
                .service_accounts
                .iter()
                .map(|account| format!("system:serviceaccount:{}:{}", namespace, account))
                .collect()
        })
        .unwrap_or_default();
    OperatorIamRoleState {
        role_name: iam_name(operator_role_prefix, &namespace, &name),
        policy_name: iam_name(account_role_prefix, &namespace, &name),
        role_arn: role.role_arn.clone().unwrap_or_default(),
        service_accounts,
        operator_name: name,
        operator_namespace: namespace,
    }
}

fn iam_name(prefix: &str, namespace: &str, name: &str) -> String {
    format!("{}-{}-{}", prefix, namespace, name)
        .chars()
        .take(MAX_NAME_LENGTH)
        .collect()
}
