use crate::provider::{ProviderError, ProviderResult};

/// Split an import identifier of the form `<cluster_id>,<sub_id>`. `expected` describes the form
/// to the user, e.g. `<cluster_id>,<machine_pool_id>`, and `what` names the imported object.
pub fn parse_composite_id(id: &str, what: &str, expected: &str) -> ProviderResult<(String, String)> {
    let parts: Vec<&str> = id.split(',').collect();
    match parts.as_slice() {
        [cluster_id, sub_id] if !cluster_id.is_empty() && !sub_id.is_empty() => {
            Ok((cluster_id.to_string(), sub_id.to_string()))
        }
        _ => Err(ProviderError::validation(
            "Invalid import identifier",
            format!(
                "{} to import should be specified as {}, got '{}'",
                what, expected, id
            ),
        )),
    }
}
