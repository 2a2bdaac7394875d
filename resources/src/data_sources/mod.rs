/*!

Read-only lookups. Most data sources list one collection of the API, following every page, and
return the items in their `items` attribute. `rhcs_cluster` and `rhcs_rosa_operator_roles` look at a
single existing cluster instead.

!*/

mod cloud_providers;
mod cluster;
mod groups;
mod machine_types;
mod operator_roles;
mod policies;
mod versions;

pub use cloud_providers::{CloudProviderState, CloudProvidersDataSource, CloudProvidersState};
pub use cluster::{ClusterDataSource, ClusterDataState};
pub use groups::{GroupState, GroupsDataSource, GroupsState};
pub use machine_types::{MachineTypeState, MachineTypesDataSource, MachineTypesState};
pub use operator_roles::{
    OperatorIamRoleState, RosaOperatorRolesDataSource, RosaOperatorRolesState,
    DEFAULT_ACCOUNT_ROLE_PREFIX,
};
pub use policies::{AccountRolePolicies, OperatorRolePolicies, PoliciesDataSource, PoliciesState};
pub use versions::{VersionState, VersionsDataSource, VersionsState};
