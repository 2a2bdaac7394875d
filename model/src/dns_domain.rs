use serde::{Deserialize, Serialize};

/// A base DNS domain reserved for the organization.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct DnsDomain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}
