use log::warn;
use rhcs_model::clients::ClusterApi;
use rhcs_provider::constants::DEFAULT_TIMEOUT;
use rhcs_provider::poll::Poller;
use rhcs_provider::provider::{ensure_unchanged, ProviderError, ProviderResult};
use rhcs_provider::Diagnostics;
use std::fmt::Debug;

/// Sub-resources of a cluster can only be changed once the cluster is ready.
pub(crate) async fn wait_for_cluster<C>(
    client: &C,
    poller: &Poller,
    cluster_id: &str,
) -> ProviderResult<()>
where
    C: ClusterApi + ?Sized,
{
    poller
        .wait_until_ready(client, cluster_id, DEFAULT_TIMEOUT)
        .await
        .map_err(|e| {
            ProviderError::new_with_source_and_context(
                e.kind(),
                "Can't poll cluster state",
                format!(
                    "Can't poll state of cluster with identifier '{}': {}",
                    cluster_id, e
                ),
            )
        })
}

/// Record that a remote object disappeared and is being dropped from the state.
pub(crate) fn removed_from_state(diags: &mut Diagnostics, kind: &str, what: String) {
    warn!("{} not found, removing from state", what);
    diags.add_warning(
        format!("{} not found", kind),
        format!("{} not found, removing from state", what),
    );
}

/// Reject a change of an optional attribute. A plan without a value keeps the prior value.
pub(crate) fn ensure_unchanged_if_set<T>(
    attribute: &str,
    state: &Option<T>,
    plan: &Option<T>,
) -> ProviderResult<()>
where
    T: PartialEq + Debug,
{
    match plan {
        None => Ok(()),
        Some(_) => ensure_unchanged(attribute, state, plan),
    }
}

/// The value of an optional string attribute, treating the empty string as unset.
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

/// A required string attribute.
pub(crate) fn required<'a>(attribute: &str, value: &'a str) -> ProviderResult<&'a str> {
    if value.is_empty() {
        return Err(ProviderError::validation(
            "Missing required attribute",
            format!("The attribute '{}' is required", attribute),
        ));
    }
    Ok(value)
}
