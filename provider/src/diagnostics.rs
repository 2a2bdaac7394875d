use crate::provider::ProviderError;
use log::{error, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// A message for the user about the outcome of an operation.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
}

/// The diagnostics collected while running one operation. Operations return errors through
/// `ProviderResult`; warnings, and errors that must not discard the state that was already
/// produced, are pushed here.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error<S1, S2>(&mut self, summary: S1, detail: S2)
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        let diagnostic = Diagnostic {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
        };
        error!("{}: {}", diagnostic.summary, diagnostic.detail);
        self.0.push(diagnostic);
    }

    pub fn add_warning<S1, S2>(&mut self, summary: S1, detail: S2)
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        let diagnostic = Diagnostic {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
        };
        warn!("{}: {}", diagnostic.summary, diagnostic.detail);
        self.0.push(diagnostic);
    }

    pub fn push_error(&mut self, e: &ProviderError) {
        self.add_error(summary(e), detail(e));
    }

    pub fn has_error(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Warning)
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(e: ProviderError) -> Self {
        Diagnostic {
            severity: Severity::Error,
            summary: summary(&e),
            detail: detail(&e),
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

fn summary(e: &ProviderError) -> String {
    e.context()
        .map(str::to_string)
        .unwrap_or_else(|| e.kind().to_string())
}

fn detail(e: &ProviderError) -> String {
    e.inner().map(error_detail).unwrap_or_default()
}

/// The text shown to the user for an error: the reason given by the API when the error came from
/// the API and the server provided one, the error's own message otherwise.
pub fn error_detail(e: &(dyn std::error::Error + Send + Sync + 'static)) -> String {
    if let Some(client_error) = e.downcast_ref::<rhcs_model::clients::Error>() {
        if let Some(reason) = client_error.reason() {
            return reason.to_string();
        }
    }
    if let Some(provider_error) = e.downcast_ref::<ProviderError>() {
        return detail(provider_error);
    }
    e.to_string()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::provider::{ErrorKind, IntoProviderError};
    use rhcs_model::clients::{ApiError, Error as ClientError, StatusCode};

    fn api_error(reason: Option<&str>) -> ClientError {
        ClientError::api(
            "create",
            "cluster 'my-cluster'",
            StatusCode::BAD_REQUEST,
            reason.map(ApiError::with_reason).unwrap_or_default(),
        )
    }

    #[test]
    fn reason_becomes_the_detail() {
        let e = Err::<(), _>(api_error(Some("Cluster name 'my-cluster' is already taken")))
            .context(ErrorKind::Remote, "Can't create cluster")
            .unwrap_err();
        let diagnostic = Diagnostic::from(e);
        assert_eq!(diagnostic.severity, Severity::Error);
        assert_eq!(diagnostic.summary, "Can't create cluster");
        assert_eq!(diagnostic.detail, "Cluster name 'my-cluster' is already taken");
    }

    #[test]
    fn raw_error_without_reason() {
        let e = Err::<(), _>(api_error(None))
            .context(ErrorKind::Remote, "Can't create cluster")
            .unwrap_err();
        let diagnostic = Diagnostic::from(e);
        assert_eq!(
            diagnostic.detail,
            "Unable to create cluster 'my-cluster': 400 Bad Request (no reason provided)"
        );
    }

    #[test]
    fn warnings_are_not_errors() {
        let mut diags = Diagnostics::new();
        diags.add_warning("Cluster wasn't deleted yet", "still uninstalling");
        assert!(!diags.has_error());
        diags.push_error(&ProviderError::validation("Invalid import identifier", "bad"));
        assert!(diags.has_error());
        assert_eq!(diags.errors().count(), 1);
        assert_eq!(diags.warnings().count(), 1);
        assert_eq!(diags.len(), 2);
    }
}
