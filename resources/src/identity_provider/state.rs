use rhcs_model::{
    Configuration, GithubIdentityProvider, GitlabIdentityProvider, GoogleIdentityProvider,
    HtpasswdIdentityProvider, HtpasswdUser, IdentityProvider, IdentityProviderType,
    LdapAttributes, LdapIdentityProvider, List, OpenIdClaims, OpenIdIdentityProvider,
};
use rhcs_provider::constants::DEFAULT_MAPPING_METHOD;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The `rhcs_identity_provider` schema. Exactly one of the kind blocks is set.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityProviderState {
    pub cluster: String,
    pub id: Option<String>,
    pub name: String,
    pub mapping_method: Option<String>,
    pub htpasswd: Option<HtpasswdState>,
    pub github: Option<GithubState>,
    pub gitlab: Option<GitlabState>,
    pub google: Option<GoogleState>,
    pub openid: Option<OpenIdState>,
    pub ldap: Option<LdapState>,
}

impl Configuration for IdentityProviderState {}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtpasswdState {
    pub users: Vec<HtpasswdUserState>,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtpasswdUserState {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubState {
    pub ca: Option<String>,
    pub client_id: String,
    pub client_secret: String,
    pub hostname: Option<String>,
    pub organizations: Option<Vec<String>>,
    /// Teams in the `<org>/<team>` form.
    pub teams: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitlabState {
    pub ca: Option<String>,
    pub client_id: String,
    pub client_secret: String,
    pub url: String,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleState {
    pub client_id: String,
    pub client_secret: String,
    pub hosted_domain: Option<String>,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenIdState {
    pub ca: Option<String>,
    pub claims: Option<OpenIdClaimsState>,
    pub client_id: String,
    pub client_secret: String,
    pub extra_scopes: Option<Vec<String>>,
    pub extra_authorize_parameters: Option<BTreeMap<String, String>>,
    pub issuer: String,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenIdClaimsState {
    pub email: Option<Vec<String>>,
    pub groups: Option<Vec<String>>,
    pub name: Option<Vec<String>>,
    pub preferred_username: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LdapState {
    pub bind_dn: Option<String>,
    pub bind_password: Option<String>,
    pub ca: Option<String>,
    pub insecure: Option<bool>,
    pub url: String,
    pub attributes: Option<LdapAttributesState>,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LdapAttributesState {
    pub email: Option<Vec<String>>,
    pub id: Option<Vec<String>>,
    pub name: Option<Vec<String>>,
    pub preferred_username: Option<Vec<String>>,
}

impl IdentityProviderState {
    pub(crate) fn mapping_method(&self) -> &str {
        self.mapping_method
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MAPPING_METHOD)
    }

    /// The kinds that are configured, e.g. `["htpasswd", "ldap"]`.
    pub(crate) fn kinds(&self) -> Vec<&'static str> {
        [
            ("htpasswd", self.htpasswd.is_some()),
            ("github", self.github.is_some()),
            ("gitlab", self.gitlab.is_some()),
            ("google", self.google.is_some()),
            ("openid", self.openid.is_some()),
            ("ldap", self.ldap.is_some()),
        ]
        .iter()
        .filter(|(_, set)| *set)
        .map(|(kind, _)| *kind)
        .collect()
    }
}

fn default_if_unset(values: &Option<Vec<String>>, default: &str) -> Option<Vec<String>> {
    match values {
        Some(values) if !values.is_empty() => Some(values.clone()),
        _ => Some(vec![default.to_string()]),
    }
}

fn non_empty_string(value: &str) -> Option<String> {
    Some(value.to_string()).filter(|v| !v.is_empty())
}

/// Build the creation request. LDAP attributes that are not configured get their defaults.
pub(crate) fn expand(plan: &IdentityProviderState) -> IdentityProvider {
    let mut idp = IdentityProvider {
        name: Some(plan.name.clone()),
        mapping_method: Some(plan.mapping_method().to_string()),
        ..IdentityProvider::default()
    };

    if let Some(htpasswd) = &plan.htpasswd {
        idp.idp_type = Some(IdentityProviderType::Htpasswd);
        idp.htpasswd = Some(HtpasswdIdentityProvider {
            users: List::of(
                htpasswd
                    .users
                    .iter()
                    .map(|user| HtpasswdUser {
                        id: None,
                        username: user.username.clone(),
                        password: Some(user.password.clone()),
                    })
                    .collect(),
            ),
        });
    } else if let Some(github) = &plan.github {
        idp.idp_type = Some(IdentityProviderType::Github);
        idp.github = Some(GithubIdentityProvider {
            ca: github.ca.clone(),
            client_id: github.client_id.clone(),
            client_secret: Some(github.client_secret.clone()),
            hostname: github.hostname.clone().filter(|h| !h.is_empty()),
            organizations: github.organizations.clone(),
            teams: github.teams.clone(),
        });
    } else if let Some(gitlab) = &plan.gitlab {
        idp.idp_type = Some(IdentityProviderType::Gitlab);
        idp.gitlab = Some(GitlabIdentityProvider {
            ca: gitlab.ca.clone(),
            client_id: gitlab.client_id.clone(),
            client_secret: Some(gitlab.client_secret.clone()),
            url: gitlab.url.clone(),
        });
    } else if let Some(google) = &plan.google {
        idp.idp_type = Some(IdentityProviderType::Google);
        idp.google = Some(GoogleIdentityProvider {
            client_id: google.client_id.clone(),
            client_secret: Some(google.client_secret.clone()),
            hosted_domain: google.hosted_domain.clone(),
        });
    } else if let Some(openid) = &plan.openid {
        idp.idp_type = Some(IdentityProviderType::OpenId);
        let claims = openid.claims.clone().unwrap_or_default();
        idp.openid = Some(OpenIdIdentityProvider {
            ca: openid.ca.clone(),
            claims: OpenIdClaims {
                email: claims.email,
                groups: claims.groups,
                name: claims.name,
                preferred_username: claims.preferred_username,
            },
            client_id: openid.client_id.clone(),
            client_secret: Some(openid.client_secret.clone()),
            extra_scopes: openid.extra_scopes.clone(),
            extra_authorize_parameters: openid.extra_authorize_parameters.clone(),
            issuer: openid.issuer.clone(),
        });
    } else if let Some(ldap) = &plan.ldap {
        idp.idp_type = Some(IdentityProviderType::Ldap);
        let attributes = ldap_attributes_with_defaults(ldap.attributes.as_ref());
        idp.ldap = Some(LdapIdentityProvider {
            bind_dn: ldap.bind_dn.clone(),
            bind_password: ldap.bind_password.clone(),
            ca: ldap.ca.clone(),
            insecure: ldap.insecure,
            url: ldap.url.clone(),
            attributes: LdapAttributes {
                email: attributes.email,
                id: attributes.id,
                name: attributes.name,
                preferred_username: attributes.preferred_username,
            },
        });
    }
    idp
}

pub(crate) fn ldap_attributes_with_defaults(
    attributes: Option<&LdapAttributesState>,
) -> LdapAttributesState {
    let attributes = attributes.cloned().unwrap_or_default();
    LdapAttributesState {
        id: default_if_unset(&attributes.id, "dn"),
        name: default_if_unset(&attributes.name, "cn"),
        preferred_username: default_if_unset(&attributes.preferred_username, "uid"),
        email: attributes.email,
    }
}

/// Copy `idp` into `state`. The API never returns secrets, so client secrets, bind passwords and
/// htpasswd passwords are kept from `state`.
pub(crate) fn flatten(idp: &IdentityProvider, state: &mut IdentityProviderState) {
    state.id = idp.id.clone();
    if let Some(name) = &idp.name {
        state.name = name.clone();
    }
    state.mapping_method = Some(
        idp.mapping_method
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MAPPING_METHOD.to_string()),
    );

    if let Some(htpasswd) = &idp.htpasswd {
        let previous = state.htpasswd.take().unwrap_or_default();
        state.htpasswd = Some(HtpasswdState {
            users: htpasswd
                .users
                .items
                .iter()
                .map(|user| HtpasswdUserState {
                    username: user.username.clone(),
                    password: previous
                        .users
                        .iter()
                        .find(|known| known.username == user.username)
                        .map(|known| known.password.clone())
                        .unwrap_or_default(),
                })
                .collect(),
        });
    }
    if let Some(github) = &idp.github {
        let previous = state.github.take().unwrap_or_default();
        state.github = Some(GithubState {
            ca: github.ca.clone().or(previous.ca),
            client_id: github.client_id.clone(),
            client_secret: previous.client_secret,
            hostname: github.hostname.clone().and_then(|h| non_empty_string(&h)),
            organizations: github.organizations.clone().filter(|o| !o.is_empty()),
            teams: github.teams.clone().filter(|t| !t.is_empty()),
        });
    }
    if let Some(gitlab) = &idp.gitlab {
        let previous = state.gitlab.take().unwrap_or_default();
        state.gitlab = Some(GitlabState {
            ca: gitlab.ca.clone().or(previous.ca),
            client_id: gitlab.client_id.clone(),
            client_secret: previous.client_secret,
            url: gitlab.url.clone(),
        });
    }
    if let Some(google) = &idp.google {
        let previous = state.google.take().unwrap_or_default();
        state.google = Some(GoogleState {
            client_id: google.client_id.clone(),
            client_secret: previous.client_secret,
            hosted_domain: google.hosted_domain.clone().filter(|d| !d.is_empty()),
        });
    }
    if let Some(openid) = &idp.openid {
        let previous = state.openid.take().unwrap_or_default();
        let claims = &openid.claims;
        state.openid = Some(OpenIdState {
            ca: openid.ca.clone().or(previous.ca),
            claims: Some(OpenIdClaimsState {
                email: claims.email.clone(),
                groups: claims.groups.clone(),
                name: claims.name.clone(),
                preferred_username: claims.preferred_username.clone(),
            }),
            client_id: openid.client_id.clone(),
            client_secret: previous.client_secret,
            extra_scopes: openid.extra_scopes.clone(),
            extra_authorize_parameters: openid
                .extra_authorize_parameters
                .clone()
                .or(previous.extra_authorize_parameters),
            issuer: openid.issuer.clone(),
        });
    }
    if let Some(ldap) = &idp.ldap {
        let previous = state.ldap.take().unwrap_or_default();
        let attributes = &ldap.attributes;
        state.ldap = Some(LdapState {
            bind_dn: ldap.bind_dn.clone().or(previous.bind_dn),
            bind_password: previous.bind_password,
            ca: ldap.ca.clone().or(previous.ca),
            insecure: Some(ldap.insecure.unwrap_or_default()),
            url: ldap.url.clone(),
            attributes: Some(LdapAttributesState {
                email: attributes.email.clone(),
                id: attributes.id.clone(),
                name: attributes.name.clone(),
                preferred_username: attributes.preferred_username.clone(),
            }),
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ldap_plan() -> IdentityProviderState {
        IdentityProviderState {
            cluster: "c1".to_string(),
            name: "corp-ldap".to_string(),
            ldap: Some(LdapState {
                bind_dn: Some("cn=admin,dc=example,dc=com".to_string()),
                bind_password: Some("secret".to_string()),
                url: "ldap://ldap.example.com/ou=users,dc=example,dc=com?uid".to_string(),
                attributes: Some(LdapAttributesState {
                    email: Some(vec!["mail".to_string()]),
                    ..LdapAttributesState::default()
                }),
                ..LdapState::default()
            }),
            ..IdentityProviderState::default()
        }
    }

    #[test]
    fn ldap_defaults() {
        let request = expand(&ldap_plan());
        assert_eq!(request.idp_type, Some(IdentityProviderType::Ldap));
        assert_eq!(request.mapping_method.as_deref(), Some("claim"));
        let attributes = request.ldap.unwrap().attributes;
        assert_eq!(attributes.id, Some(vec!["dn".to_string()]));
        assert_eq!(attributes.name, Some(vec!["cn".to_string()]));
        assert_eq!(attributes.preferred_username, Some(vec!["uid".to_string()]));
        assert_eq!(attributes.email, Some(vec!["mail".to_string()]));
    }

    #[test]
    fn secrets_are_kept() {
        let plan = IdentityProviderState {
            cluster: "c1".to_string(),
            name: "htpasswd".to_string(),
            htpasswd: Some(HtpasswdState {
                users: vec![HtpasswdUserState {
                    username: "alice".to_string(),
                    password: "Sup3rSecretPassw0rd".to_string(),
                }],
            }),
            ..IdentityProviderState::default()
        };
        let mut response = expand(&plan);
        response.id = Some("idp-1".to_string());
        if let Some(htpasswd) = response.htpasswd.as_mut() {
            for user in htpasswd.users.items.iter_mut() {
                user.password = None;
            }
        }
        let mut state = plan.clone();
        flatten(&response, &mut state);
        assert_eq!(state.id.as_deref(), Some("idp-1"));
        assert_eq!(state.mapping_method.as_deref(), Some("claim"));
        assert_eq!(
            state.htpasswd.unwrap().users[0].password,
            "Sup3rSecretPassw0rd"
        );
    }

    #[test]
    fn ldap_flatten() {
        let plan = ldap_plan();
        let mut response = expand(&plan);
        if let Some(ldap) = response.ldap.as_mut() {
            ldap.bind_password = None;
        }
        let mut state = plan.clone();
        flatten(&response, &mut state);
        let ldap = state.ldap.unwrap();
        assert_eq!(ldap.bind_password.as_deref(), Some("secret"));
        assert_eq!(ldap.insecure, Some(false));
        assert_eq!(
            ldap.attributes.and_then(|a| a.id),
            Some(vec!["dn".to_string()])
        );
    }

    #[test]
    fn kinds() {
        assert_eq!(ldap_plan().kinds(), vec!["ldap"]);
        assert!(IdentityProviderState::default().kinds().is_empty());
    }
}
