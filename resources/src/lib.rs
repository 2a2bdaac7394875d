/*!

The resources and data sources of the RHCS provider. Each module holds the typed state of one
resource, the functions that map it to and from the OpenShift Cluster Manager API objects, and its
[`Resource`](rhcs_provider::provider::Resource) or [`DataSource`](rhcs_provider::provider::DataSource)
implementation. [`registry`] registers all of them under their type names.

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

pub mod cluster_rosa_classic;
pub mod cluster_wait;
mod common;
pub mod data_sources;
pub mod dns_domain;
pub mod group_membership;
pub mod identity_provider;
pub mod machine_pool;
pub mod rosa_oidc_config;

use rhcs_model::clients::AllApis;
use rhcs_provider::registry::Registry;
use rhcs_provider::thumbprint::ThumbprintFetcher;
use rhcs_provider::BuildInfo;
use std::sync::Arc;

/// Every resource and data source of the provider, talking to the API through `client`.
pub fn registry<C>(
    client: Arc<C>,
    build_info: BuildInfo,
    fetcher: Arc<dyn ThumbprintFetcher>,
) -> Registry
where
    C: AllApis + 'static,
{
    Registry::new()
        .with_resource(cluster_rosa_classic::ClusterRosaClassicResource::new(
            Arc::clone(&client),
            build_info,
            Arc::clone(&fetcher),
        ))
        .with_resource(cluster_wait::ClusterWaitResource::new(Arc::clone(&client)))
        .with_resource(machine_pool::MachinePoolResource::new(Arc::clone(&client)))
        .with_resource(identity_provider::IdentityProviderResource::new(
            Arc::clone(&client),
        ))
        .with_resource(group_membership::GroupMembershipResource::new(Arc::clone(
            &client,
        )))
        .with_resource(dns_domain::DnsDomainResource::new(Arc::clone(&client)))
        .with_resource(rosa_oidc_config::RosaOidcConfigResource::new(
            Arc::clone(&client),
            fetcher,
        ))
        .with_data_source(data_sources::VersionsDataSource::new(Arc::clone(&client)))
        .with_data_source(data_sources::MachineTypesDataSource::new(Arc::clone(
            &client,
        )))
        .with_data_source(data_sources::GroupsDataSource::new(Arc::clone(&client)))
        .with_data_source(data_sources::CloudProvidersDataSource::new(Arc::clone(
            &client,
        )))
        .with_data_source(data_sources::PoliciesDataSource::new(Arc::clone(&client)))
        .with_data_source(data_sources::RosaOperatorRolesDataSource::new(Arc::clone(
            &client,
        )))
        .with_data_source(data_sources::ClusterDataSource::new(client))
}
