use crate::provider::{ErrorKind, IntoProviderError, ProviderError, ProviderResult};
use log::debug;
use rhcs_model::clients::{Authenticator, ClientOptions, OcmClient};
use rhcs_model::constants::{
    DEFAULT_CLIENT_ID, DEFAULT_TOKEN_URL, DEFAULT_URL, ENV_OCM_TOKEN, ENV_OCM_URL,
};
use rhcs_model::Configuration;
use serde::{Deserialize, Serialize};
use url::Url;

/// The provider block of the user's configuration.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProviderConfig {
    /// Base URL of the OpenShift Cluster Manager API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Access or refresh token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// OpenID token URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// PEM encoded certificate authorities trusted in addition to the system roots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trusted_cas: Option<String>,
    /// Accept any TLS certificate presented by the API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,
    /// Overrides the provider version recorded in cluster properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rosa_tf_version: Option<String>,
    /// Overrides the provider commit recorded in cluster properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rosa_tf_commit: Option<String>,
}

impl Configuration for ProviderConfig {}

impl ProviderConfig {
    /// Fill `url` and `token` from `OCM_URL` and `OCM_TOKEN` when they are not configured.
    pub fn with_env(self) -> Self {
        self.with_env_from(|name| std::env::var(name).ok())
    }

    pub fn with_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if is_blank(&self.url) {
            self.url = lookup(ENV_OCM_URL).filter(|url| !url.is_empty());
        }
        if is_blank(&self.token) {
            self.token = lookup(ENV_OCM_TOKEN).filter(|token| !token.is_empty());
        }
        self
    }

    pub fn url(&self) -> &str {
        self.url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_URL)
    }

    /// Decide how requests are authorized: client credentials when both `client_id` and
    /// `client_secret` are set, the token otherwise.
    pub fn authenticator(&self) -> ProviderResult<Authenticator> {
        let token_url = self
            .token_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_TOKEN_URL);
        let token_url = Url::parse(token_url).context(
            ErrorKind::Validation,
            format!("Invalid token URL '{}'", token_url),
        )?;
        let client_id = self
            .client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_CLIENT_ID);

        if let (Some(_), Some(secret)) = (
            self.client_id.as_deref().filter(|id| !id.is_empty()),
            self.client_secret.as_deref().filter(|s| !s.is_empty()),
        ) {
            debug!("Authenticating with the client credentials of '{}'", client_id);
            return Ok(Authenticator::client_credentials(
                token_url, client_id, secret,
            ));
        }
        match self.token.as_deref().filter(|token| !token.is_empty()) {
            Some(token) => Ok(Authenticator::from_token(token_url, client_id, token)),
            None => Err(ProviderError::validation(
                "Missing credentials",
                format!(
                    "Set the 'token' attribute or the {} environment variable, or set both \
                    'client_id' and 'client_secret'",
                    ENV_OCM_TOKEN
                ),
            )),
        }
    }

    /// Build the API client described by this configuration.
    pub fn client(&self) -> ProviderResult<OcmClient> {
        let options = ClientOptions {
            trusted_cas: self.trusted_cas.clone().filter(|pem| !pem.is_empty()),
            insecure: self.insecure.unwrap_or_default(),
            ..ClientOptions::default()
        };
        let url = self.url();
        OcmClient::with_options(url, self.authenticator()?, &options).context(
            ErrorKind::Validation,
            format!("Unable to create a client for '{}'", url),
        )
    }

    /// The provider build recorded in cluster properties, with the configured overrides applied.
    pub fn build_info(&self) -> BuildInfo {
        let current = BuildInfo::current();
        BuildInfo {
            version: self.rosa_tf_version.clone().unwrap_or(current.version),
            commit: self.rosa_tf_commit.clone().unwrap_or(current.commit),
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::is_empty).unwrap_or(true)
}

/// The version and commit of the provider. Clusters created by the provider carry them as
/// properties so that support can tell which provider build created a cluster.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BuildInfo {
    pub version: String,
    pub commit: String,
}

impl BuildInfo {
    pub fn new<S1, S2>(version: S1, commit: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            version: version.into(),
            commit: commit.into(),
        }
    }

    /// The build of this crate. The commit is taken from `RHCS_BUILD_COMMIT` at compile time.
    pub fn current() -> Self {
        Self::new(
            env!("CARGO_PKG_VERSION"),
            option_env!("RHCS_BUILD_COMMIT").unwrap_or("unknown"),
        )
    }
}
