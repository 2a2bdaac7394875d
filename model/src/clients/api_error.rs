use crate::VersionGate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The body returned by the API along with a non-success status code, e.g.
///
/// ```json
/// {
///   "kind": "Error",
///   "id": "404",
///   "href": "/api/clusters_mgmt/v1/errors/404",
///   "code": "CLUSTERS-MGMT-404",
///   "reason": "Cluster '1234' not found",
///   "operation_id": "a0c3b2b7-2d5e-4d5a-9b0e-1c2d3e4f5a6b"
/// }
/// ```
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiError {
    pub fn with_reason<S: Into<String>>(reason: S) -> Self {
        Self {
            kind: Some("Error".to_string()),
            reason: Some(reason.into()),
            ..Default::default()
        }
    }

    /// The server provided reason, if it is present and not blank.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref().filter(|reason| !reason.trim().is_empty())
    }

    /// A dry run of an upgrade policy fails with the version gates that still need an agreement
    /// listed in `details`. `None` when `details` is absent or is not a list of gates.
    pub fn version_gates(&self) -> Option<Vec<VersionGate>> {
        self.details
            .clone()
            .and_then(|details| serde_json::from_value::<Vec<VersionGate>>(details).ok())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn gates_from_details() {
        let api_error: ApiError = serde_json::from_value(json!({
            "kind": "Error",
            "id": "400",
            "reason": "There are missing version gate agreements for this cluster",
            "details": [
                {
                    "kind": "VersionGate",
                    "id": "abc",
                    "description": "OpenShift 4.12 removes several APIs",
                    "documentation_url": "https://access.redhat.com/articles/6955381",
                    "sts_only": false
                },
                { "kind": "VersionGate", "id": "def", "description": "STS change", "sts_only": true }
            ]
        }))
        .unwrap();
        let gates = api_error.version_gates().unwrap();
        assert_eq!(gates.len(), 2);
        assert_eq!(gates[0].id, "abc");
        assert!(!gates[0].sts_only);
        assert!(gates[1].sts_only);
    }

    #[test]
    fn unrelated_details() {
        let api_error = ApiError {
            details: Some(json!({ "unexpected": true })),
            ..ApiError::with_reason("bad")
        };
        assert_eq!(api_error.version_gates(), None);
        assert_eq!(ApiError::with_reason("bad").version_gates(), None);
        let empty = ApiError {
            details: Some(json!([])),
            ..ApiError::with_reason("bad")
        };
        assert_eq!(empty.version_gates(), Some(Vec::new()));
        assert_eq!(api_error.reason(), Some("bad"));
        assert_eq!(ApiError::with_reason("  ").reason(), None);
    }
}
