/*!

The `clients` module provides the traits that describe each collection of the `clusters_mgmt`
API and `OcmClient`, which implements all of them over HTTP. Provider code is written against
the traits so that tests can substitute in-memory fakes.

!*/

mod api;
mod api_error;
mod auth;
mod error;
mod http_status_code;
mod ocm_client;

pub use api::{
    list_all, CatalogApi, ClusterApi, DnsDomainApi, GroupApi, IdentityProviderApi,
    MachinePoolApi, OidcConfigApi, UpgradeApi, DEFAULT_PAGE_SIZE,
};
pub use api_error::ApiError;
pub use auth::{Authenticator, TokenExchange};
pub use error::{Error, Result};
pub use http_status_code::{HttpStatusCode, StatusCode};
pub use ocm_client::{ClientOptions, OcmClient};

/// Every API collection. Resources that span collections take a `&dyn AllApis`.
pub trait AllApis:
    CatalogApi
    + ClusterApi
    + DnsDomainApi
    + GroupApi
    + IdentityProviderApi
    + MachinePoolApi
    + OidcConfigApi
    + UpgradeApi
{
}

impl<T> AllApis for T where
    T: CatalogApi
        + ClusterApi
        + DnsDomainApi
        + GroupApi
        + IdentityProviderApi
        + MachinePoolApi
        + OidcConfigApi
        + UpgradeApi
{
}
