use super::state::{
    GithubState, GitlabState, GoogleState, HtpasswdState, IdentityProviderState, LdapState,
    OpenIdState,
};
use lazy_static::lazy_static;
use regex::Regex;
use rhcs_provider::provider::{ProviderError, ProviderResult};
use url::Url;

/// The mapping methods accepted by the API.
pub(crate) const MAPPING_METHODS: [&str; 4] = ["claim", "add", "generate", "lookup"];

const MIN_PASSWORD_LENGTH: usize = 14;

lazy_static! {
    #[allow(clippy::unwrap_used)]
    static ref HOSTED_DOMAIN: Regex = Regex::new(r"^(?i)[a-z0-9-]+(\.[a-z0-9-]+)+\.?$").unwrap();
}

/// Usernames end up in paths and identities, so separators are not allowed.
pub(crate) fn validate_htpasswd_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("username must not be empty".to_string());
    }
    if username.contains(|c| c == '/' || c == ':' || c == '%') {
        return Err(format!(
            "invalid username '{}': username must not contain /, :, or %",
            username
        ));
    }
    Ok(())
}

pub(crate) fn validate_htpasswd_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH
        || !password.is_ascii()
        || password.chars().any(char::is_whitespace)
    {
        return Err(format!(
            "password must be at least {} characters (ASCII-standard) without whitespaces",
            MIN_PASSWORD_LENGTH
        ));
    }
    let upper = password.chars().any(|c| c.is_ascii_uppercase());
    let lower = password.chars().any(|c| c.is_ascii_lowercase());
    let digit_or_symbol = password
        .chars()
        .any(|c| c.is_ascii_digit() || c.is_ascii_punctuation());
    if !(upper && lower && digit_or_symbol) {
        return Err("password must include uppercase letters, lowercase letters, and numbers or \
            symbols (ASCII-standard characters only)"
            .to_string());
    }
    Ok(())
}

/// Run every check of an identity provider plan.
pub(crate) fn validate_plan(plan: &IdentityProviderState) -> ProviderResult<()> {
    let kinds = plan.kinds();
    if kinds.len() != 1 {
        return Err(ProviderError::validation(
            "Invalid identity provider configuration",
            format!(
                "Expected exactly one of htpasswd, github, gitlab, google, openid or ldap to be \
                set, got [{}]",
                kinds.join(", ")
            ),
        ));
    }
    validate_mapping_method(plan.mapping_method())?;
    if let Some(htpasswd) = &plan.htpasswd {
        validate_htpasswd(htpasswd)?;
    }
    if let Some(github) = &plan.github {
        validate_github(github)?;
    }
    if let Some(gitlab) = &plan.gitlab {
        validate_gitlab(gitlab)?;
    }
    if let Some(google) = &plan.google {
        validate_google(google, plan.mapping_method())?;
    }
    if let Some(openid) = &plan.openid {
        validate_openid(openid)?;
    }
    if let Some(ldap) = &plan.ldap {
        validate_ldap(ldap)?;
    }
    Ok(())
}

fn validate_mapping_method(mapping_method: &str) -> ProviderResult<()> {
    if !MAPPING_METHODS.contains(&mapping_method) {
        return Err(ProviderError::validation(
            "Invalid mapping_method.",
            format!(
                "Expected a valid mapping method. Options are [{}]. Got {}",
                MAPPING_METHODS.join(" "),
                mapping_method
            ),
        ));
    }
    Ok(())
}

fn validate_htpasswd(htpasswd: &HtpasswdState) -> ProviderResult<()> {
    const SUMMARY: &str = "Invalid HTPasswd IDP resource configuration";
    if htpasswd.users.is_empty() {
        return Err(ProviderError::validation(
            SUMMARY,
            "Expected at least one user in 'htpasswd.users'",
        ));
    }
    for user in &htpasswd.users {
        validate_htpasswd_username(&user.username)
            .and_then(|_| validate_htpasswd_password(&user.password))
            .map_err(|detail| ProviderError::validation(SUMMARY, detail))?;
    }
    let mut usernames: Vec<&str> = htpasswd.users.iter().map(|u| u.username.as_str()).collect();
    usernames.sort_unstable();
    if let Some(duplicate) = usernames.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(ProviderError::validation(
            SUMMARY,
            format!("Found duplicate username '{}'", duplicate[0]),
        ));
    }
    Ok(())
}

fn validate_github(github: &GithubState) -> ProviderResult<()> {
    const SUMMARY: &str = "Invalid GitHub IDP resource configuration";
    let organizations = github.organizations.as_deref().unwrap_or_default();
    let teams = github.teams.as_deref().unwrap_or_default();
    if organizations.is_empty() == teams.is_empty() {
        return Err(ProviderError::validation(
            SUMMARY,
            "Expected exactly one of 'organizations' or 'teams' to be set",
        ));
    }
    for team in teams {
        let parts: Vec<&str> = team.split('/').collect();
        if parts.len() != 2 || parts.iter().any(|part| part.is_empty()) {
            return Err(ProviderError::validation(
                SUMMARY,
                format!(
                    "Expected a GitHub team to follow the form '<org>/<team>', Got {}",
                    team
                ),
            ));
        }
    }
    if let Some(hostname) = github.hostname.as_deref().filter(|h| !h.is_empty()) {
        if url::Host::parse(hostname).is_err() || hostname.contains(|c| c == '/' || c == ':') {
            return Err(ProviderError::validation(
                SUMMARY,
                format!("Expected a valid GitHub hostname. Got {}", hostname),
            ));
        }
    }
    Ok(())
}

/// An https URL without a query or a fragment.
fn is_https_url(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => url.scheme() == "https" && url.query().is_none() && url.fragment().is_none(),
        Err(_) => false,
    }
}

fn validate_gitlab(gitlab: &GitlabState) -> ProviderResult<()> {
    if !is_https_url(&gitlab.url) {
        return Err(ProviderError::validation(
            "Invalid Gitlab IDP resource configuration",
            "Expected a valid GitLab provider URL: to use an https:// scheme, must not have query \
            parameters and not have a fragment.",
        ));
    }
    Ok(())
}

fn validate_google(google: &GoogleState, mapping_method: &str) -> ProviderResult<()> {
    const SUMMARY: &str = "Invalid Google IDP resource configuration";
    match google.hosted_domain.as_deref().filter(|d| !d.is_empty()) {
        Some(domain) if !HOSTED_DOMAIN.is_match(domain) => Err(ProviderError::validation(
            SUMMARY,
            format!("Expected a valid Google hosted_domain. Got {}", domain),
        )),
        None if mapping_method != "lookup" => Err(ProviderError::validation(
            SUMMARY,
            format!(
                "Expected a valid hosted_domain since mapping_method is set to {}",
                mapping_method
            ),
        )),
        _ => Ok(()),
    }
}

fn validate_openid(openid: &OpenIdState) -> ProviderResult<()> {
    const SUMMARY: &str = "Invalid OpenID IDP resource configuration";
    if !is_https_url(&openid.issuer) {
        return Err(ProviderError::validation(
            SUMMARY,
            format!(
                "Expected a valid issuer URL using the https:// scheme without query parameters \
                or a fragment. Got {}",
                openid.issuer
            ),
        ));
    }
    let claims = openid.claims.clone().unwrap_or_default();
    let has_claims = [claims.email, claims.name, claims.preferred_username]
        .iter()
        .any(|claim| claim.as_ref().map(|c| !c.is_empty()).unwrap_or_default());
    if !has_claims {
        return Err(ProviderError::validation(
            SUMMARY,
            "Expected at least one of the 'email', 'name' or 'preferred_username' claims",
        ));
    }
    Ok(())
}

fn validate_ldap(ldap: &LdapState) -> ProviderResult<()> {
    const SUMMARY: &str = "Invalid LDAP IDP resource configuration";
    let bind_dn = ldap.bind_dn.as_deref().filter(|v| !v.is_empty());
    let bind_password = ldap.bind_password.as_deref().filter(|v| !v.is_empty());
    if bind_dn.is_some() != bind_password.is_some() {
        return Err(ProviderError::validation(
            SUMMARY,
            "Expected 'bind_dn' and 'bind_password' to be set together",
        ));
    }
    match Url::parse(&ldap.url) {
        Ok(url) if url.scheme() == "ldap" || url.scheme() == "ldaps" => Ok(()),
        _ => Err(ProviderError::validation(
            SUMMARY,
            format!(
                "Expected a valid LDAP URL using the ldap:// or ldaps:// scheme. Got {}",
                ldap.url
            ),
        )),
    }
}

#[cfg(test)]
mod test {
    use super::super::state::{HtpasswdUserState, OpenIdClaimsState};
    use super::*;

    fn detail(e: ProviderError) -> String {
        e.inner().map(|inner| inner.to_string()).unwrap_or_default()
    }

    fn named(name: &str) -> IdentityProviderState {
        IdentityProviderState {
            cluster: "c1".to_string(),
            name: name.to_string(),
            ..IdentityProviderState::default()
        }
    }

    fn htpasswd(users: &[(&str, &str)]) -> IdentityProviderState {
        IdentityProviderState {
            htpasswd: Some(HtpasswdState {
                users: users
                    .iter()
                    .map(|(username, password)| HtpasswdUserState {
                        username: username.to_string(),
                        password: password.to_string(),
                    })
                    .collect(),
            }),
            ..named("htpasswd")
        }
    }

    #[test]
    fn usernames() {
        assert!(validate_htpasswd_username("alice").is_ok());
        assert_eq!(
            validate_htpasswd_username("a:b").unwrap_err(),
            "invalid username 'a:b': username must not contain /, :, or %"
        );
        assert!(validate_htpasswd_username("a/b").is_err());
        assert!(validate_htpasswd_username("100%").is_err());
    }

    #[test]
    fn passwords() {
        assert!(validate_htpasswd_password("Sup3rSecretPassw0rd").is_ok());
        assert!(validate_htpasswd_password("Super-Secret-Password").is_ok());
        assert!(validate_htpasswd_password("Sh0rt").is_err());
        assert!(validate_htpasswd_password("Has A Space 1234").is_err());
        assert!(validate_htpasswd_password("Pässwörd12345678").is_err());
        assert!(validate_htpasswd_password("alllowercase1234")
            .unwrap_err()
            .contains("uppercase letters, lowercase letters"));
    }

    #[test]
    fn exactly_one_kind() {
        let e = validate_plan(&named("none")).unwrap_err();
        assert!(detail(e).contains("got []"));

        let mut both = htpasswd(&[("alice", "Sup3rSecretPassw0rd")]);
        both.gitlab = Some(GitlabState {
            url: "https://gitlab.com".to_string(),
            ..GitlabState::default()
        });
        assert!(detail(validate_plan(&both).unwrap_err()).contains("got [htpasswd, gitlab]"));
    }

    #[test]
    fn htpasswd_users() {
        assert!(validate_plan(&htpasswd(&[("alice", "Sup3rSecretPassw0rd")])).is_ok());
        assert!(validate_plan(&htpasswd(&[])).is_err());
        let duplicates = htpasswd(&[
            ("alice", "Sup3rSecretPassw0rd"),
            ("alice", "An0therSecretPassw0rd"),
        ]);
        assert!(detail(validate_plan(&duplicates).unwrap_err()).contains("duplicate username"));
    }

    #[test]
    fn mapping_method() {
        let mut plan = htpasswd(&[("alice", "Sup3rSecretPassw0rd")]);
        plan.mapping_method = Some("merge".to_string());
        let e = validate_plan(&plan).unwrap_err();
        assert_eq!(e.context(), Some("Invalid mapping_method."));
        assert_eq!(
            detail(e),
            "Expected a valid mapping method. Options are [claim add generate lookup]. Got merge"
        );
    }

    #[test]
    fn github() {
        let mut github = GithubState {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            organizations: Some(vec!["openshift".to_string()]),
            ..GithubState::default()
        };
        assert!(validate_github(&github).is_ok());

        github.teams = Some(vec!["openshift/team".to_string()]);
        assert!(validate_github(&github).is_err());

        github.organizations = None;
        assert!(validate_github(&github).is_ok());

        github.teams = Some(vec!["no-org".to_string()]);
        assert!(detail(validate_github(&github).unwrap_err()).contains("Got no-org"));

        github.teams = Some(vec!["openshift/team".to_string()]);
        github.hostname = Some("github.example.com".to_string());
        assert!(validate_github(&github).is_ok());
        github.hostname = Some("https://github.example.com/".to_string());
        assert!(validate_github(&github).is_err());
    }

    #[test]
    fn gitlab() {
        let mut gitlab = GitlabState {
            url: "https://gitlab.example.com".to_string(),
            ..GitlabState::default()
        };
        assert!(validate_gitlab(&gitlab).is_ok());
        for url in [
            "http://gitlab.example.com",
            "https://gitlab.example.com?q=1",
            "https://gitlab.example.com#top",
            "gitlab.example.com",
        ] {
            gitlab.url = url.to_string();
            assert!(validate_gitlab(&gitlab).is_err(), "{}", url);
        }
    }

    #[test]
    fn google() {
        let mut google = GoogleState {
            hosted_domain: Some("example.com".to_string()),
            ..GoogleState::default()
        };
        assert!(validate_google(&google, "claim").is_ok());
        google.hosted_domain = Some("not a domain".to_string());
        assert!(validate_google(&google, "claim").is_err());
        google.hosted_domain = None;
        assert!(validate_google(&google, "lookup").is_ok());
        assert_eq!(
            detail(validate_google(&google, "claim").unwrap_err()),
            "Expected a valid hosted_domain since mapping_method is set to claim"
        );
    }

    #[test]
    fn openid() {
        let mut openid = OpenIdState {
            issuer: "https://sso.example.com/realms/ocp".to_string(),
            claims: Some(OpenIdClaimsState {
                email: Some(vec!["email".to_string()]),
                ..OpenIdClaimsState::default()
            }),
            ..OpenIdState::default()
        };
        assert!(validate_openid(&openid).is_ok());
        openid.claims = None;
        assert!(validate_openid(&openid).is_err());
    }

    #[test]
    fn ldap() {
        let mut ldap = LdapState {
            url: "ldap://ldap.example.com/ou=users,dc=example,dc=com?uid".to_string(),
            ..LdapState::default()
        };
        assert!(validate_ldap(&ldap).is_ok());
        ldap.bind_dn = Some("cn=admin".to_string());
        assert!(validate_ldap(&ldap).is_err());
        ldap.bind_password = Some("secret".to_string());
        assert!(validate_ldap(&ldap).is_ok());
        ldap.url = "https://ldap.example.com".to_string();
        assert!(validate_ldap(&ldap).is_err());
    }
}
