/*!

OpenShift versions are written in several ways: as a raw semantic version (`4.12.5`), as a version
id (`openshift-v4.12.5`), and as a version id in a non-default channel group
(`openshift-v4.13.0-rc.1-candidate`). These functions normalize all of them before comparing.

!*/

use crate::provider::{ErrorKind, IntoProviderError, ProviderResult};
use rhcs_model::constants::{CHANNEL_GROUPS, DEFAULT_CHANNEL_GROUP, VERSION_PREFIX};
use semver::Version;
use std::cmp::Ordering;

/// Strip the `openshift-v` prefix and a channel group suffix such as `-candidate`.
pub fn normalize(version: &str) -> &str {
    let version = version.trim();
    let version = version.strip_prefix(VERSION_PREFIX).unwrap_or(version);
    CHANNEL_GROUPS
        .iter()
        .find_map(|channel| {
            version
                .strip_suffix(channel)
                .and_then(|rest| rest.strip_suffix('-'))
        })
        .unwrap_or(version)
}

/// Parse any of the supported spellings into a semantic version. A version with only a major and
/// minor component is read as patch `0`.
pub fn parse(version: &str) -> ProviderResult<Version> {
    let normalized = normalize(version);
    let parsed = match Version::parse(normalized) {
        Ok(parsed) => Ok(parsed),
        Err(e) => {
            if normalized.split('.').count() == 2 && !normalized.contains('-') {
                Version::parse(&format!("{}.0", normalized))
            } else {
                Err(e)
            }
        }
    };
    parsed.context(ErrorKind::Validation, format!("Invalid version '{}'", version))
}

pub fn compare(a: &str, b: &str) -> ProviderResult<Ordering> {
    Ok(parse(a)?.cmp_precedence(&parse(b)?))
}

/// True when `a` is the same version as `b` or a later one.
pub fn is_greater_than_or_equal(a: &str, b: &str) -> ProviderResult<bool> {
    Ok(compare(a, b)? != Ordering::Less)
}

/// The version id of `version` in `channel_group`, e.g. `openshift-v4.12.5-fast`. The default
/// channel group has no suffix.
pub fn version_id(version: &str, channel_group: &str) -> String {
    let version = normalize(version);
    if channel_group.is_empty() || channel_group == DEFAULT_CHANNEL_GROUP {
        format!("{}{}", VERSION_PREFIX, version)
    } else {
        format!("{}{}-{}", VERSION_PREFIX, version, channel_group)
    }
}

/// The `major.minor` of a version, which is the value used to acknowledge version gates.
pub fn minor(version: &str) -> ProviderResult<String> {
    let parsed = parse(version)?;
    Ok(format!("{}.{}", parsed.major, parsed.minor))
}
