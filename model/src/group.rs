use crate::list::List;
use serde::{Deserialize, Serialize};

/// A group of users with cluster privileges, e.g. `dedicated-admins`.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<List<User>>,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
}
