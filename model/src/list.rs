use serde::{Deserialize, Serialize};

/// A page of API objects. The same shape is used for embedded collections such as the users of an
/// htpasswd identity provider, in which case only `items` is present.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct List<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self {
            page: None,
            size: None,
            total: None,
            items: Vec::new(),
        }
    }
}

impl<T> List<T> {
    /// An embedded collection holding `items`.
    pub fn of(items: Vec<T>) -> Self {
        Self {
            items,
            ..Default::default()
        }
    }

    /// The number of items on this page. The API reports it as `size`; when absent the item count
    /// is used.
    pub fn len(&self) -> usize {
        self.size
            .and_then(|size| usize::try_from(size).ok())
            .unwrap_or(self.items.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
