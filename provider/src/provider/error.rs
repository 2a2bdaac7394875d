use rhcs_model::clients::HttpStatusCode;
use std::fmt::{Display, Formatter};

/// The broad category of a [`ProviderError`]. It decides how the host should react.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The configuration is invalid. Nothing was sent to the API and the user must change the
    /// configuration before trying again.
    Validation,

    /// The API returned an error or could not be reached. The message carries the reason given by
    /// the server when there is one.
    Remote,

    /// A wait did not finish within its timeout.
    Timeout,

    /// Something unexpected happened inside the provider.
    Internal,
}

impl ErrorKind {
    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "Invalid configuration",
            ErrorKind::Remote => "The OpenShift Cluster Manager API returned an error",
            ErrorKind::Timeout => "Timed out",
            ErrorKind::Internal => "Internal provider error",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self.message(), f)
    }
}

/// The error type returned by resource and data source operations.
#[derive(Debug)]
pub struct ProviderError {
    kind: ErrorKind,

    /// A short description of what failed. It becomes the summary of the diagnostic.
    context: Option<String>,

    /// The error that caused this error. It becomes the detail of the diagnostic.
    inner: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

/// The result type returned by resource and data source operations.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

impl ProviderError {
    pub fn new_with_source_and_context<S, E>(kind: ErrorKind, context: S, source: E) -> Self
    where
        S: Into<String>,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self {
            kind,
            context: Some(context.into()),
            inner: Some(source.into()),
        }
    }

    pub fn new_with_source<E>(kind: ErrorKind, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self {
            kind,
            context: None,
            inner: Some(source.into()),
        }
    }

    pub fn new_with_context<S>(kind: ErrorKind, context: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            kind,
            context: Some(context.into()),
            inner: None,
        }
    }

    /// A configuration error with a one line `summary` and an explanation in `detail`.
    pub fn validation<S1, S2>(summary: S1, detail: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        let detail: String = detail.into();
        Self::new_with_source_and_context(ErrorKind::Validation, summary, detail)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn inner(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.inner.as_ref().map(|some| some.as_ref())
    }

    /// True when the error was caused by the API answering 404.
    pub fn is_not_found(&self) -> bool {
        self.inner()
            .and_then(|inner| inner.downcast_ref::<rhcs_model::clients::Error>())
            .map(|e| e.is_not_found())
            .unwrap_or_default()
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.context() {
            Some(context) => write!(f, "{}", context)?,
            None => write!(f, "{}", self.kind)?,
        }
        if let Some(inner) = self.inner() {
            write!(f, ": {}", inner)?;
        }
        Ok(())
    }
}

// Make `ProviderError` function as a standard error.
impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// A trait that makes it possible to convert error types to `ProviderError` using a familiar
/// `context` function.
pub trait IntoProviderError<T> {
    /// Convert `self` into a `ProviderError`.
    fn context<S>(self, kind: ErrorKind, message: S) -> ProviderResult<T>
    where
        S: Into<String>;
}

// Implement `IntoProviderError` for all standard `Error + Send + Sync + 'static` types.
impl<T, E> IntoProviderError<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<S>(self, kind: ErrorKind, message: S) -> ProviderResult<T>
    where
        S: Into<String>,
    {
        self.map_err(|e| ProviderError::new_with_source_and_context(kind, message, e))
    }
}

// Implement `IntoProviderError` for options where `None` is converted into an error.
impl<T> IntoProviderError<T> for std::option::Option<T> {
    fn context<S>(self, kind: ErrorKind, m: S) -> Result<T, ProviderError>
    where
        S: Into<String>,
    {
        self.ok_or_else(|| ProviderError::new_with_context(kind, m))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rhcs_model::clients::{ApiError, Error as ClientError, StatusCode};

    #[test]
    fn not_found_is_detected_through_the_source() {
        let result: Result<(), ClientError> = Err(ClientError::api(
            "get",
            "cluster 'abc'",
            StatusCode::NOT_FOUND,
            ApiError::with_reason("not found"),
        ));
        let e = result
            .context(ErrorKind::Remote, "Can't find cluster")
            .unwrap_err();
        assert!(e.is_not_found());
        assert_eq!(e.kind(), ErrorKind::Remote);
        assert!(e.to_string().starts_with("Can't find cluster: "));
    }

    #[test]
    fn option_context() {
        let e = None::<u8>
            .context(ErrorKind::Internal, "missing id")
            .unwrap_err();
        assert!(!e.is_not_found());
        assert_eq!(e.to_string(), "missing id");
        assert!(e.inner().is_none());
    }
}
