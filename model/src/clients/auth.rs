use crate::clients::error::{self, Result};
use log::debug;
use serde::Deserialize;
use snafu::{ensure, ResultExt};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use url::Url;

/// Access tokens are refreshed this long before they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// How requests made by [`crate::clients::OcmClient`] are authorized.
#[derive(Debug)]
pub enum Authenticator {
    /// Send the token as is.
    AccessToken(String),
    /// Exchange credentials for short lived access tokens at an OpenID Connect token endpoint.
    TokenExchange(TokenExchange),
}

#[derive(Debug)]
pub struct TokenExchange {
    token_url: Url,
    client_id: String,
    grant: Grant,
    cached: Mutex<Option<CachedToken>>,
}

#[derive(Debug, Clone)]
enum Grant {
    /// An offline token obtained from the OpenShift Cluster Manager console.
    RefreshToken(String),
    /// A service account secret.
    ClientCredentials(String),
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Option<Instant>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl Authenticator {
    pub fn access_token<S: Into<String>>(token: S) -> Self {
        Authenticator::AccessToken(token.into())
    }

    pub fn refresh_token<S1, S2>(token_url: Url, client_id: S1, refresh_token: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Authenticator::TokenExchange(TokenExchange::new(
            token_url,
            client_id.into(),
            Grant::RefreshToken(refresh_token.into()),
        ))
    }

    pub fn client_credentials<S1, S2>(token_url: Url, client_id: S1, client_secret: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Authenticator::TokenExchange(TokenExchange::new(
            token_url,
            client_id.into(),
            Grant::ClientCredentials(client_secret.into()),
        ))
    }

    /// Build an authenticator from a token of unknown type. OpenID access tokens are JWTs whose
    /// `typ` claim is `Bearer`; anything else is treated as an offline refresh token.
    pub fn from_token<S1, S2>(token_url: Url, client_id: S1, token: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        let token = token.into();
        if token_type(&token).as_deref() == Some("Bearer") {
            Self::access_token(token)
        } else {
            Self::refresh_token(token_url, client_id, token)
        }
    }

    /// The bearer token to send with the next request.
    pub(crate) async fn bearer(&self, http: &reqwest::Client) -> Result<String> {
        match self {
            Authenticator::AccessToken(token) => Ok(token.clone()),
            Authenticator::TokenExchange(exchange) => exchange.bearer(http).await,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    typ: Option<String>,
}

/// The `typ` claim of a JWT, if `token` is one.
fn token_type(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let decoded = base64::decode_config(payload, base64::URL_SAFE_NO_PAD).ok()?;
    let claims: Claims = serde_json::from_slice(&decoded).ok()?;
    claims.typ
}

impl TokenExchange {
    fn new(token_url: Url, client_id: String, grant: Grant) -> Self {
        Self {
            token_url,
            client_id,
            grant,
            cached: Mutex::new(None),
        }
    }

    async fn bearer(&self, http: &reqwest::Client) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            let fresh = token
                .expires_at
                .map(|expires_at| Instant::now() + EXPIRY_MARGIN < expires_at)
                .unwrap_or(true);
            if fresh {
                return Ok(token.access_token.clone());
            }
        }
        let token = self.request(http).await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    async fn request(&self, http: &reqwest::Client) -> Result<CachedToken> {
        let url = self.token_url.to_string();
        debug!("Requesting an access token from '{}'", url);
        let form: Vec<(&str, &str)> = match &self.grant {
            Grant::RefreshToken(refresh_token) => vec![
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("refresh_token", refresh_token.as_str()),
            ],
            Grant::ClientCredentials(client_secret) => vec![
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", client_secret.as_str()),
            ],
        };
        let response = http
            .post(self.token_url.clone())
            .form(&form)
            .send()
            .await
            .context(error::TokenRequestSnafu { url: &url })?;
        let status = response.status();
        ensure!(status.is_success(), error::TokenStatusSnafu { url: &url, status });
        let token: TokenResponse = response
            .json()
            .await
            .context(error::TokenRequestSnafu { url: &url })?;
        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: expiry(Instant::now(), token.expires_in),
        })
    }
}

/// When a token issued at `now` expires. A lifetime too long to represent never expires.
fn expiry(now: Instant, expires_in: Option<u64>) -> Option<Instant> {
    expires_in.and_then(|seconds| now.checked_add(Duration::from_secs(seconds)))
}

#[cfg(test)]
mod test {
    use super::*;

    fn jwt(claims: &str) -> String {
        format!(
            "{}.{}.signature",
            base64::encode_config(r#"{"alg":"RS256"}"#, base64::URL_SAFE_NO_PAD),
            base64::encode_config(claims, base64::URL_SAFE_NO_PAD)
        )
    }

    fn token_url() -> Url {
        Url::parse("https://sso.example.com/token").unwrap()
    }

    #[test]
    fn bearer_jwt_is_used_as_is() {
        let auth = Authenticator::from_token(token_url(), "cloud-services", jwt(r#"{"typ":"Bearer"}"#));
        assert!(matches!(auth, Authenticator::AccessToken(_)));
    }

    #[test]
    fn offline_token_is_exchanged() {
        for token in [jwt(r#"{"typ":"Offline"}"#), "opaque".to_string()] {
            let auth = Authenticator::from_token(token_url(), "cloud-services", token);
            assert!(matches!(auth, Authenticator::TokenExchange(_)));
        }
    }

    #[test]
    fn token_lifetime() {
        let now = Instant::now();
        assert_eq!(expiry(now, Some(300)), Some(now + Duration::from_secs(300)));
        assert_eq!(expiry(now, None), None);
        assert_eq!(expiry(now, Some(u64::MAX)), None);
    }
}
