/*!

This library provides the OpenShift Cluster Manager (OCM) API objects used by the RHCS provider
and the clients that talk to the `clusters_mgmt` API.

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

pub use catalog::{
    CloudProvider, MachineType, Quantity, StsCredentialRequest, StsOperator, StsPolicy, Version,
    VersionRef,
};
pub use cluster::{
    Api, Ccs, Cluster, ClusterAws, ClusterNodes, ClusterState, ComputeAutoscaling, Console, Dns,
    HtpasswdUsers, IdRef, InstanceIamRoles, Network, OperatorIamRole, Proxy, RootVolume,
    RootVolumeAws, Sts,
};
pub use configuration::Configuration;
pub use dns_domain::DnsDomain;
pub use error::{Error, Result};
pub use group::{Group, User};
pub use identity_provider::{
    GithubIdentityProvider, GitlabIdentityProvider, GoogleIdentityProvider, HtpasswdIdentityProvider,
    HtpasswdUser, IdentityProvider, IdentityProviderType, LdapAttributes, LdapIdentityProvider,
    OpenIdClaims, OpenIdIdentityProvider,
};
pub use list::List;
pub use machine_pool::{AwsMachinePool, MachinePool, MachinePoolAutoscaling, SpotMarketOptions, Taint};
pub use oidc_config::OidcConfig;
pub use upgrade::{
    UpgradePolicy, UpgradePolicyState, UpgradePolicyStateValue, VersionGate,
    VersionGateAgreement,
};

mod catalog;
pub mod clients;
mod cluster;
mod configuration;
pub mod constants;
mod dns_domain;
mod error;
mod group;
mod identity_provider;
mod list;
mod machine_pool;
mod oidc_config;
mod upgrade;
