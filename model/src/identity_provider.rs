use crate::list::List;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An identity provider configured for a cluster. Exactly one of the kind-specific blocks is
/// expected to be present and to agree with `idp_type`.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct IdentityProvider {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub idp_type: Option<IdentityProviderType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub htpasswd: Option<HtpasswdIdentityProvider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GithubIdentityProvider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitlab: Option<GitlabIdentityProvider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google: Option<GoogleIdentityProvider>,
    #[serde(default, rename = "open_id", skip_serializing_if = "Option::is_none")]
    pub openid: Option<OpenIdIdentityProvider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ldap: Option<LdapIdentityProvider>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum IdentityProviderType {
    #[serde(rename = "HTPasswdIdentityProvider")]
    Htpasswd,
    #[serde(rename = "GithubIdentityProvider")]
    Github,
    #[serde(rename = "GitlabIdentityProvider")]
    Gitlab,
    #[serde(rename = "GoogleIdentityProvider")]
    Google,
    #[serde(rename = "OpenIDIdentityProvider")]
    OpenId,
    #[serde(rename = "LDAPIdentityProvider")]
    Ldap,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct HtpasswdIdentityProvider {
    pub users: List<HtpasswdUser>,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct HtpasswdUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub username: String,
    /// Only sent on creation, the API never returns it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct GithubIdentityProvider {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca: Option<String>,
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizations: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct GitlabIdentityProvider {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca: Option<String>,
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    pub url: String,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct GoogleIdentityProvider {
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosted_domain: Option<String>,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct OpenIdIdentityProvider {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca: Option<String>,
    pub claims: OpenIdClaims,
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_scopes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_authorize_parameters: Option<BTreeMap<String, String>>,
    pub issuer: String,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct OpenIdClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct LdapIdentityProvider {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_dn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,
    pub url: String,
    pub attributes: LdapAttributes,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct LdapAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<Vec<String>>,
}
