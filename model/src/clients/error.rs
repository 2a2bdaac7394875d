use crate::clients::{ApiError, HttpStatusCode, StatusCode};
use snafu::Snafu;

/// The `Result` type returned by `clients`.
pub type Result<T> = std::result::Result<T, Error>;

/// The public error type returned by `clients`.
#[derive(Debug, Snafu)]
pub struct Error(InnerError);

/// The private error type returned by `clients`.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub(crate) enum InnerError {
    #[snafu(display("Unable to build the HTTP client: {}", source))]
    ClientBuild { source: reqwest::Error },

    #[snafu(display("Unable to parse certificate authority '{}': {}", what, source))]
    Certificate { what: String, source: reqwest::Error },

    #[snafu(display("Invalid URL '{}': {}", url, source))]
    UrlParse {
        url: String,
        source: url::ParseError,
    },

    #[snafu(display("URL '{}' cannot be used as a base for API endpoints", url))]
    UrlBase { url: String },

    #[snafu(display("Unable to {} {}: {}", method, what, source))]
    Request {
        /// The HTTP method, e.g. 'get'.
        method: String,
        /// The object we were working with, e.g. 'cluster '1234''.
        what: String,
        source: reqwest::Error,
    },

    #[snafu(display(
        "Unable to {} {}: {} {}",
        method,
        what,
        status,
        body.reason().unwrap_or("(no reason provided)")
    ))]
    Api {
        method: String,
        what: String,
        status: StatusCode,
        body: ApiError,
    },

    #[snafu(display("Unable to read the response for {}: {}", what, source))]
    ResponseBody { what: String, source: reqwest::Error },

    #[snafu(display("Unable to obtain an access token from '{}': {}", url, source))]
    TokenRequest { url: String, source: reqwest::Error },

    #[snafu(display("The token endpoint '{}' returned {}", url, status))]
    TokenStatus { url: String, status: StatusCode },
}

impl Error {
    /// Create the error that results from an API call the server rejected.
    pub fn api<S1, S2>(method: S1, what: S2, status: StatusCode, body: ApiError) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Error(InnerError::Api {
            method: method.into(),
            what: what.into(),
            status,
            body,
        })
    }

    /// The error body returned by the server, if the server answered with one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match &self.0 {
            InnerError::Api { body, .. } => Some(body),
            _ => None,
        }
    }

    /// The server provided reason, if any.
    pub fn reason(&self) -> Option<&str> {
        self.api_error().and_then(|body| body.reason())
    }
}

impl HttpStatusCode for InnerError {
    fn status_code(&self) -> Option<StatusCode> {
        match self {
            InnerError::ClientBuild { .. }
            | InnerError::Certificate { .. }
            | InnerError::UrlParse { .. }
            | InnerError::UrlBase { .. }
            | InnerError::TokenRequest { .. } => None,
            InnerError::Request { source, .. } | InnerError::ResponseBody { source, .. } => {
                source.status_code()
            }
            InnerError::Api { status, .. } | InnerError::TokenStatus { status, .. } => {
                Some(*status)
            }
        }
    }
}

impl HttpStatusCode for Error {
    fn status_code(&self) -> Option<StatusCode> {
        self.0.status_code()
    }
}
