/*!

Checks of a cluster plan that need no API call, and the checks that only need the resolved
version. All of them fail with [`ErrorKind::Validation`](rhcs_provider::provider::ErrorKind).

!*/

use super::state::{is_reserved_property, ClusterRosaClassicState};
use crate::common::non_empty;
use crate::identity_provider::{validate_htpasswd_password, validate_htpasswd_username};
use lazy_static::lazy_static;
use regex::Regex;
use rhcs_model::constants::VERSION_PREFIX;
use rhcs_provider::constants::{
    HTTP_TOKENS_OPTIONAL, HTTP_TOKENS_REQUIRED, MAX_CLUSTER_NAME_LENGTH,
    MIN_HTTP_TOKENS_REQUIRED_VERSION, MIN_SUPPORTED_VERSION, PROPERTY_ROSA_CREATOR_ARN,
};
use rhcs_provider::provider::{ProviderError, ProviderResult};
use rhcs_provider::version;

pub(crate) const CANT_BUILD: &str = "Can't build cluster";

lazy_static! {
    /// An IAM user or an assumed role session.
    #[allow(clippy::unwrap_used)]
    static ref USER_ARN: Regex = Regex::new(
        r"^arn:aws[\w-]*:(iam::\d{12}:user/[\w+=,.@-]+|sts::\d{12}:assumed-role/[\w+=,.@-]+(/[\w+=,.@-]+)?)$"
    )
    .unwrap();

    /// A KMS key, either single region or multi region.
    #[allow(clippy::unwrap_used)]
    static ref KMS_KEY_ARN: Regex = Regex::new(
        r"^arn:aws[\w-]*:kms:[\w-]+:\d{12}:key/(mrk-[0-9a-f]{32}|[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12})$"
    )
    .unwrap();
}

/// Run every check that does not depend on the API.
pub(crate) fn validate_plan(plan: &ClusterRosaClassicState) -> ProviderResult<()> {
    validate_name(&plan.name)?;
    validate_version_format(&plan.version)?;
    validate_properties(plan)?;
    validate_kms_key_arn(&plan.kms_key_arn)?;
    validate_nodes(plan)?;
    validate_private_hosted_zone(plan)?;
    validate_http_tokens_value(&plan.ec2_metadata_http_tokens)?;
    validate_admin_credentials(plan)
}

fn validate_name(name: &str) -> ProviderResult<()> {
    let length = name.chars().count();
    if length > MAX_CLUSTER_NAME_LENGTH {
        return Err(ProviderError::validation(
            CANT_BUILD,
            format!(
                "Expected a valid value for 'name' maximum of {} characters in length. Provided \
                Cluster name '{}' is of length '{}'",
                MAX_CLUSTER_NAME_LENGTH, name, length
            ),
        ));
    }
    Ok(())
}

fn validate_version_format(version: &Option<String>) -> ProviderResult<()> {
    if let Some(version) = non_empty(version) {
        if version.starts_with(VERSION_PREFIX) {
            return Err(ProviderError::validation(
                CANT_BUILD,
                "Openshift version must be provided without the \"openshift-v\" prefix",
            ));
        }
    }
    Ok(())
}

/// Reject versions older than the oldest supported one.
pub(crate) fn validate_minimum_version(version: &str) -> ProviderResult<()> {
    if !version::is_greater_than_or_equal(version, MIN_SUPPORTED_VERSION)? {
        return Err(ProviderError::validation(
            CANT_BUILD,
            format!(
                "Cluster version {} is not supported (minimal supported version is {})",
                version, MIN_SUPPORTED_VERSION
            ),
        ));
    }
    Ok(())
}

fn validate_properties(plan: &ClusterRosaClassicState) -> ProviderResult<()> {
    let properties = plan.properties.clone().unwrap_or_default();
    if let Some(key) = properties.keys().find(|key| is_reserved_property(key)) {
        return Err(ProviderError::validation(
            "Invalid property key.",
            format!(
                "Can not override reserved properties keys. {} is a reserved property key",
                key
            ),
        ));
    }
    if plan.sts.is_none() {
        return Ok(());
    }
    match properties.get(PROPERTY_ROSA_CREATOR_ARN) {
        None => Err(ProviderError::validation(
            CANT_BUILD,
            format!(
                "Expected property '{}' to be set for STS clusters",
                PROPERTY_ROSA_CREATOR_ARN
            ),
        )),
        Some(arn) if !USER_ARN.is_match(arn) => Err(ProviderError::validation(
            CANT_BUILD,
            format!(
                "Property '{}' does not have a valid user arn, got '{}'",
                PROPERTY_ROSA_CREATOR_ARN, arn
            ),
        )),
        Some(_) => Ok(()),
    }
}

fn validate_kms_key_arn(kms_key_arn: &Option<String>) -> ProviderResult<()> {
    match non_empty(kms_key_arn) {
        Some(arn) if !KMS_KEY_ARN.is_match(arn) => Err(ProviderError::validation(
            CANT_BUILD,
            format!(
                "Expected a valid value for 'kms_key_arn' matching {}, got '{}'",
                KMS_KEY_ARN.as_str(),
                arn
            ),
        )),
        _ => Ok(()),
    }
}

fn validate_nodes(plan: &ClusterRosaClassicState) -> ProviderResult<()> {
    if plan.is_autoscaling() {
        if plan.replicas.is_some() && plan.min_replicas.is_some() {
            return Err(ProviderError::validation(
                CANT_BUILD,
                "When autoscaling is enabled, 'replicas' cannot be set together with \
                'min_replicas' and 'max_replicas'",
            ));
        }
        if let (Some(min), Some(max)) = (plan.min_replicas, plan.max_replicas) {
            if min > max {
                return Err(ProviderError::validation(
                    CANT_BUILD,
                    format!(
                        "'min_replicas' ({}) must not be greater than 'max_replicas' ({})",
                        min, max
                    ),
                ));
            }
        }
    } else if plan.min_replicas.is_some() || plan.max_replicas.is_some() {
        return Err(ProviderError::validation(
            CANT_BUILD,
            "Autoscaling must be enabled in order to set 'min_replicas' and 'max_replicas'",
        ));
    }

    if plan.multi_az.unwrap_or_default() {
        let counts = [
            ("replicas", plan.replicas),
            ("min_replicas", plan.min_replicas),
            ("max_replicas", plan.max_replicas),
        ];
        if let Some((attribute, count)) = counts
            .iter()
            .find_map(|(attribute, count)| count.filter(|c| c % 3 != 0).map(|c| (attribute, c)))
        {
            return Err(ProviderError::validation(
                CANT_BUILD,
                format!(
                    "Multi AZ clusters require '{}' to be a multiple of 3, got {}",
                    attribute, count
                ),
            ));
        }
    }
    Ok(())
}

fn validate_private_hosted_zone(plan: &ClusterRosaClassicState) -> ProviderResult<()> {
    const SUMMARY: &str = "Invalid private_hosted_zone attribute assignment";
    let zone = match &plan.private_hosted_zone {
        Some(zone) => zone,
        None => return Ok(()),
    };
    if zone.id.is_empty() || zone.role_arn.is_empty() {
        return Err(ProviderError::validation(
            SUMMARY,
            "Invalid configuration. 'private_hosted_zone.id' and 'private_hosted_zone.arn' are \
            required",
        ));
    }
    if !plan.aws_private_link.unwrap_or_default()
        || plan.aws_subnet_ids.as_ref().map(Vec::is_empty).unwrap_or(true)
    {
        return Err(ProviderError::validation(
            SUMMARY,
            "Invalid configuration. 'private_hosted_zone' requires 'aws_private_link' to be true \
            and 'aws_subnet_ids' to be set",
        ));
    }
    Ok(())
}

fn validate_http_tokens_value(tokens: &Option<String>) -> ProviderResult<()> {
    match non_empty(tokens) {
        Some(tokens) if tokens != HTTP_TOKENS_OPTIONAL && tokens != HTTP_TOKENS_REQUIRED => {
            Err(ProviderError::validation(
                CANT_BUILD,
                format!(
                    "Expected a valid value for 'ec2_metadata_http_tokens' in [{} {}], got '{}'",
                    HTTP_TOKENS_OPTIONAL, HTTP_TOKENS_REQUIRED, tokens
                ),
            ))
        }
        _ => Ok(()),
    }
}

/// Required IMDSv2 tokens are only supported from 4.11.
pub(crate) fn validate_http_tokens_version(
    plan: &ClusterRosaClassicState,
    version: &str,
) -> ProviderResult<()> {
    if non_empty(&plan.ec2_metadata_http_tokens) != Some(HTTP_TOKENS_REQUIRED) {
        return Ok(());
    }
    if !version::is_greater_than_or_equal(version, MIN_HTTP_TOKENS_REQUIRED_VERSION)? {
        return Err(ProviderError::validation(
            CANT_BUILD,
            format!(
                "version '{}' is not supported with ec2_metadata_http_tokens, minimum supported \
                version is {}",
                version, MIN_HTTP_TOKENS_REQUIRED_VERSION
            ),
        ));
    }
    Ok(())
}

fn validate_admin_credentials(plan: &ClusterRosaClassicState) -> ProviderResult<()> {
    const SUMMARY: &str = "Invalid admin_credentials";
    let credentials = match &plan.admin_credentials {
        Some(credentials) => credentials,
        None => return Ok(()),
    };
    validate_htpasswd_username(&credentials.username)
        .and_then(|_| validate_htpasswd_password(&credentials.password))
        .map_err(|detail| ProviderError::validation(SUMMARY, detail))
}
