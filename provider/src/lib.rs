/*!

`rhcs-provider` holds the building blocks shared by the RHCS resources and data sources: the
[`provider::Resource`] and [`provider::DataSource`] traits, [`Diagnostics`], the provider
configuration, and the cluster life cycle helpers that talk to the OpenShift Cluster Manager API:
the readiness poller, the upgrade reconciler, version comparison and OIDC thumbprints.

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

pub mod config;
pub mod constants;
mod diagnostics;
pub mod import;
pub mod poll;
pub mod provider;
pub mod registry;
pub mod retry;
pub mod thumbprint;
pub mod upgrade;
pub mod version;

pub use config::{BuildInfo, ProviderConfig};
pub use diagnostics::{error_detail, Diagnostic, Diagnostics, Severity};
use env_logger::Builder;
use log::LevelFilter;
pub use rhcs_model::Configuration;
use serde::Serialize;

/// Extract the value of `RUST_LOG` if it exists, otherwise log our own crates at `log_level` and
/// everything else at `Error`.
pub fn init_logger(bin_crate: &str, log_level: LevelFilter) {
    match std::env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
        Some(_) => {
            // RUST_LOG exists; env_logger will use it.
            Builder::from_default_env().init();
        }
        None => {
            Builder::new()
                .filter_level(LevelFilter::Error)
                .filter(Some(bin_crate), log_level)
                .filter(Some("rhcs_model"), log_level)
                .filter(Some("rhcs_provider"), log_level)
                .filter(Some("rhcs_resources"), log_level)
                .init();
        }
    }
}

/// Print a value using `serde_json` `to_string_pretty` for types that implement Serialize.
pub fn json_display<T: Serialize>(object: T) -> String {
    serde_json::to_string_pretty(&object).unwrap_or_else(|e| format!("Serialization failed: {}", e))
}
