/*!

Moving a cluster to the version requested by the user. The API upgrades clusters through upgrade
policies: a policy names the target version and when the upgrade should start. Reconciling a
version change means

- refusing downgrades,
- making sure the requested version can be reached from the current one,
- cancelling pending policies that target another version,
- collecting the version gates that must be acknowledged for the target minor version,
- and finally acknowledging those gates and scheduling a manual policy a few minutes from now.

!*/

use crate::constants::UPGRADE_LEAD_TIME;
use crate::provider::{ErrorKind, IntoProviderError, ProviderError, ProviderResult};
use crate::version;
use chrono::{DateTime, Utc};
use log::{debug, info};
use rhcs_model::clients::UpgradeApi;
use rhcs_model::constants::{SCHEDULE_TYPE_MANUAL, UPGRADE_TYPE_OSD};
use rhcs_model::{IdRef, UpgradePolicy, UpgradePolicyStateValue, VersionGate, VersionGateAgreement};
use std::cmp::Ordering;

const CANT_UPGRADE: &str = "Can't upgrade cluster";

/// The version related attributes of a cluster's plan and prior state.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct VersionPlan {
    /// The version in the plan.
    pub desired: Option<String>,
    /// The version in the prior state, i.e. what the user asked for last time.
    pub previous: Option<String>,
    /// The version the cluster currently runs, as last read from the API.
    pub current: Option<String>,
    pub channel_group: String,
    /// The `major.minor` for which the user acknowledged the version gates.
    pub acknowledged_for: Option<String>,
}

impl VersionPlan {
    fn desired(&self) -> Option<&str> {
        self.desired.as_deref().filter(|v| !v.is_empty())
    }

    fn current(&self) -> Option<&str> {
        self.current.as_deref().filter(|v| !v.is_empty())
    }

    /// Whether the user changed the version attribute in this plan.
    fn requested_version_changed(&self) -> bool {
        self.desired() != self.previous.as_deref().filter(|v| !v.is_empty())
    }
}

/// What [`UpgradeReconciler::reconcile`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpgradeOutcome {
    /// Ids of the upgrade policies that were deleted.
    pub cancelled: Vec<String>,
    /// A policy for the requested version was already pending or running.
    pub already_pending: bool,
    /// The policy that was created.
    pub scheduled: Option<UpgradePolicy>,
}

/// Reconciles the version of one cluster.
pub struct UpgradeReconciler<'a, C: ?Sized> {
    client: &'a C,
    cluster_id: &'a str,
}

impl<'a, C> UpgradeReconciler<'a, C>
where
    C: UpgradeApi + ?Sized,
{
    pub fn new(client: &'a C, cluster_id: &'a str) -> Self {
        Self { client, cluster_id }
    }

    pub async fn reconcile(&self, plan: &VersionPlan) -> ProviderResult<UpgradeOutcome> {
        let (desired, current) = match (plan.desired(), plan.current()) {
            (Some(desired), Some(current)) => (version::normalize(desired), current),
            _ => return Ok(UpgradeOutcome::default()),
        };

        let cancel_only = match version::compare(current, desired)? {
            Ordering::Greater => {
                return if plan.requested_version_changed() {
                    Err(ProviderError::validation(
                        CANT_UPGRADE,
                        format!(
                            "cluster version is already above the requested version ({} > {})",
                            version::normalize(current),
                            desired
                        ),
                    ))
                } else {
                    Ok(UpgradeOutcome::default())
                };
            }
            Ordering::Equal => true,
            Ordering::Less => false,
        };

        if !cancel_only {
            self.ensure_reachable(current, desired, &plan.channel_group)
                .await?;
        }

        let mut outcome = self.reconcile_policies(desired).await?;
        if cancel_only || outcome.already_pending {
            return Ok(outcome);
        }

        let gates = self.required_gates(desired).await?;
        ensure_acknowledged(&gates, desired, plan.acknowledged_for.as_deref())?;
        outcome.scheduled = Some(self.schedule(desired, &gates).await?);
        Ok(outcome)
    }

    /// The raw ids of the ROSA versions that the cluster can be upgraded to from `current`.
    pub async fn available_upgrades(
        &self,
        current: &str,
        channel_group: &str,
    ) -> ProviderResult<Vec<String>> {
        let current_id = version::version_id(current, channel_group);
        let current_version = self
            .client
            .get_version(&current_id)
            .await
            .context(ErrorKind::Remote, format!("Can't get version '{}'", current_id))?;
        let mut available = Vec::new();
        for raw_id in &current_version.available_upgrades {
            let id = version::version_id(raw_id, channel_group);
            let candidate = self
                .client
                .get_version(&id)
                .await
                .context(ErrorKind::Remote, format!("Can't get version '{}'", id))?;
            if candidate.rosa_enabled {
                available.push(raw_id.clone());
            }
        }
        Ok(available)
    }

    async fn ensure_reachable(
        &self,
        current: &str,
        desired: &str,
        channel_group: &str,
    ) -> ProviderResult<()> {
        let available = self.available_upgrades(current, channel_group).await?;
        debug!(
            "Cluster '{}' can be upgraded to {:?}",
            self.cluster_id, available
        );
        let reachable = available
            .iter()
            .any(|candidate| version::normalize(candidate) == desired);
        if reachable {
            return Ok(());
        }
        Err(ProviderError::validation(
            CANT_UPGRADE,
            format!(
                "desired version ({}) is not in the list of available upgrades ([{}])",
                desired,
                available.join(", ")
            ),
        ))
    }

    /// Go through the existing upgrade policies. A policy for `desired` that is running, or that
    /// will start soon, is kept; any other pending policy is deleted. A running policy for another
    /// version blocks the upgrade.
    async fn reconcile_policies(&self, desired: &str) -> ProviderResult<UpgradeOutcome> {
        let mut outcome = UpgradeOutcome::default();
        let soon = lead_time_from(Utc::now());
        let policies = self
            .client
            .all_upgrade_policies(self.cluster_id)
            .await
            .context(
                ErrorKind::Remote,
                format!("Can't list upgrade policies of cluster '{}'", self.cluster_id),
            )?;
        for policy in policies
            .into_iter()
            .filter(|policy| policy.upgrade_type.as_deref() == Some(UPGRADE_TYPE_OSD))
        {
            let policy_id = match policy.id.as_deref() {
                Some(id) => id,
                None => continue,
            };
            let state = self
                .client
                .get_upgrade_policy_state(self.cluster_id, policy_id)
                .await
                .context(
                    ErrorKind::Remote,
                    format!("Can't get the state of upgrade policy '{}'", policy_id),
                )?;
            let target = policy.version.as_deref().unwrap_or_default();
            debug!(
                "Found existing upgrade policy '{}' to '{}' in state {:?}",
                policy_id, target, state.value
            );
            let same_version = version::compare(target, desired)
                .map(|ordering| ordering == Ordering::Equal)
                .unwrap_or(false);
            match state.value {
                UpgradePolicyStateValue::Delayed | UpgradePolicyStateValue::Started => {
                    if !same_version {
                        return Err(ProviderError::validation(
                            CANT_UPGRADE,
                            "a cluster upgrade is already in progress",
                        ));
                    }
                    outcome.already_pending = true;
                }
                UpgradePolicyStateValue::Pending | UpgradePolicyStateValue::Scheduled => {
                    let starts_soon = policy.next_run.map(|run| run < soon).unwrap_or(false);
                    if same_version && starts_soon {
                        outcome.already_pending = true;
                    } else {
                        info!(
                            "Cancelling upgrade policy '{}' to version '{}'",
                            policy_id, target
                        );
                        self.client
                            .delete_upgrade_policy(self.cluster_id, policy_id)
                            .await
                            .context(
                                ErrorKind::Remote,
                                format!("Can't cancel upgrade policy '{}'", policy_id),
                            )?;
                        outcome.cancelled.push(policy_id.to_string());
                    }
                }
                _ => {}
            }
        }
        Ok(outcome)
    }

    /// Ask the API which version gates are missing an agreement for an upgrade to `desired`, by
    /// validating an upgrade policy without creating it.
    async fn required_gates(&self, desired: &str) -> ProviderResult<Vec<VersionGate>> {
        let policy = UpgradePolicy {
            schedule_type: Some(SCHEDULE_TYPE_MANUAL.to_string()),
            version: Some(desired.to_string()),
            ..Default::default()
        };
        let e = match self
            .client
            .create_upgrade_policy(self.cluster_id, &policy, true)
            .await
        {
            Ok(_) => return Ok(Vec::new()),
            Err(e) => e,
        };
        // An empty gate list means nothing needs an agreement.
        match e.api_error().and_then(|body| body.version_gates()) {
            Some(gates) if gates.first().map_or(true, |first| !first.id.is_empty()) => Ok(gates),
            _ => Err(e).context(
                ErrorKind::Remote,
                format!(
                    "Can't check for missing gate agreements for cluster '{}'",
                    self.cluster_id
                ),
            ),
        }
    }

    async fn schedule(&self, desired: &str, gates: &[VersionGate]) -> ProviderResult<UpgradePolicy> {
        for gate in gates {
            debug!("Acknowledging version gate '{}'", gate.id);
            let agreement = VersionGateAgreement {
                id: None,
                version_gate: IdRef::new(gate.id.as_str()),
            };
            self.client
                .create_gate_agreement(self.cluster_id, &agreement)
                .await
                .context(
                    ErrorKind::Remote,
                    format!("Can't acknowledge version gate '{}'", gate.id),
                )?;
        }
        let next_run = lead_time_from(Utc::now());
        let policy = UpgradePolicy {
            schedule_type: Some(SCHEDULE_TYPE_MANUAL.to_string()),
            upgrade_type: Some(UPGRADE_TYPE_OSD.to_string()),
            version: Some(desired.to_string()),
            next_run: Some(next_run),
            ..Default::default()
        };
        let created = self
            .client
            .create_upgrade_policy(self.cluster_id, &policy, false)
            .await
            .context(
                ErrorKind::Remote,
                format!(
                    "Can't schedule upgrade of cluster '{}' to version '{}'",
                    self.cluster_id, desired
                ),
            )?;
        info!(
            "Scheduled upgrade of cluster '{}' to version '{}' at {}",
            self.cluster_id, desired, next_run
        );
        Ok(created)
    }
}

fn lead_time_from(now: DateTime<Utc>) -> DateTime<Utc> {
    now + chrono::Duration::seconds(UPGRADE_LEAD_TIME.as_secs() as i64)
}

/// Gates that are not STS-only need the user to acknowledge the target minor version. Returns a
/// validation error describing every such gate when the acknowledgement is missing.
pub fn ensure_acknowledged(
    gates: &[VersionGate],
    desired: &str,
    acknowledged_for: Option<&str>,
) -> ProviderResult<()> {
    let user_gates: Vec<&VersionGate> = gates.iter().filter(|gate| !gate.sts_only).collect();
    if user_gates.is_empty() {
        return Ok(());
    }
    let target_minor = version::minor(desired)?;
    if acknowledged_for == Some(target_minor.as_str()) {
        return Ok(());
    }
    let mut description = String::from(
        "\nMissing required acknowledgements to schedule upgrade.\
        \nRead the below description and acknowledge to proceed with upgrade.\
        \nDescription:",
    );
    for (i, gate) in user_gates.iter().enumerate() {
        description.push_str(&format!("\n{}) {}\n", i + 1, gate.description));
        if let Some(warning) = gate.warning_message.as_deref().filter(|w| !w.is_empty()) {
            description.push_str(&format!("   Warning:     {}\n", warning));
        }
        description.push_str(&format!(
            "   URL:         {}\n",
            gate.documentation_url.as_deref().unwrap_or_default()
        ));
    }
    Err(ProviderError::validation(
        CANT_UPGRADE,
        format!(
            "{}\nTo acknowledge these items, please add \"upgrade_acknowledgements_for = {}\" \
            and re-apply the changes",
            description, target_minor
        ),
    ))
}
