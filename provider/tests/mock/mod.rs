//! An in-memory stand-in for the cluster and upgrade collections of the API. Responses are
//! scripted by the test and every call is recorded.

#![allow(dead_code)]

use async_trait::async_trait;
use rhcs_model::clients::{ApiError, ClusterApi, Error, Result, StatusCode, UpgradeApi};
use rhcs_model::{
    Cluster, ClusterState, List, UpgradePolicy, UpgradePolicyState, UpgradePolicyStateValue,
    Version, VersionGate, VersionGateAgreement,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// What `get_cluster` answers.
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    State(ClusterState),
    NotFound,
    Unavailable,
}

#[derive(Default)]
pub struct MockOcm {
    /// Consumed one per `get_cluster` call; the last reply repeats.
    replies: Mutex<VecDeque<Reply>>,
    versions: HashMap<String, Version>,
    policies: Mutex<Vec<(UpgradePolicy, UpgradePolicyStateValue)>>,
    /// Returned in the error details of a dry run.
    gates: Vec<VersionGate>,
    /// Replaces the gate error of a dry run.
    dry_run_error: Option<ApiError>,
    calls: Mutex<Vec<String>>,
}

impl MockOcm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies(mut self, replies: &[Reply]) -> Self {
        self.replies = Mutex::new(replies.iter().copied().collect());
        self
    }

    /// Register `raw_id` in the stable channel with the given upgrade targets.
    pub fn with_version(mut self, raw_id: &str, rosa_enabled: bool, upgrades: &[&str]) -> Self {
        let id = format!("openshift-v{}", raw_id);
        self.versions.insert(
            id.clone(),
            Version {
                id,
                raw_id: raw_id.to_string(),
                channel_group: "stable".to_string(),
                enabled: true,
                rosa_enabled,
                available_upgrades: upgrades.iter().map(|u| u.to_string()).collect(),
                ..Default::default()
            },
        );
        self
    }

    pub fn with_policy(self, policy: UpgradePolicy, state: UpgradePolicyStateValue) -> Self {
        self.policies.lock().unwrap().push((policy, state));
        self
    }

    pub fn with_gates(mut self, gates: Vec<VersionGate>) -> Self {
        self.gates = gates;
        self
    }

    pub fn with_dry_run_error(mut self, body: ApiError) -> Self {
        self.dry_run_error = Some(body);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    /// Policies created without `dry_run`.
    pub fn scheduled(&self) -> Vec<UpgradePolicy> {
        self.policies
            .lock()
            .unwrap()
            .iter()
            .filter(|(policy, _)| policy.id.as_deref().unwrap_or_default().starts_with("new-"))
            .map(|(policy, _)| policy.clone())
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_reply(&self) -> Reply {
        let mut replies = self.replies.lock().unwrap();
        if replies.len() > 1 {
            replies.pop_front().unwrap()
        } else {
            replies.front().copied().unwrap_or(Reply::NotFound)
        }
    }
}

pub fn not_found(what: &str) -> Error {
    Error::api(
        "get",
        what,
        StatusCode::NOT_FOUND,
        ApiError::with_reason(format!("{} not found", what)),
    )
}

pub fn policy(id: &str, version: &str, next_run_minutes: i64) -> UpgradePolicy {
    UpgradePolicy {
        id: Some(id.to_string()),
        cluster_id: Some("c1".to_string()),
        schedule_type: Some("manual".to_string()),
        upgrade_type: Some("OSD".to_string()),
        version: Some(version.to_string()),
        next_run: Some(chrono::Utc::now() + chrono::Duration::minutes(next_run_minutes)),
    }
}

pub fn gate(id: &str, sts_only: bool) -> VersionGate {
    VersionGate {
        id: id.to_string(),
        label: Some(format!("api.openshift.com/gate-{}", id)),
        description: format!("Gate {} requires attention", id),
        documentation_url: Some(format!("https://access.redhat.com/solutions/{}", id)),
        sts_only,
        ..Default::default()
    }
}

#[async_trait]
impl ClusterApi for MockOcm {
    async fn get_cluster(&self, cluster_id: &str) -> Result<Cluster> {
        self.record(format!("get_cluster {}", cluster_id));
        match self.next_reply() {
            Reply::State(state) => Ok(Cluster {
                id: Some(cluster_id.to_string()),
                state: Some(state),
                ..Default::default()
            }),
            Reply::NotFound => Err(not_found(&format!("cluster '{}'", cluster_id))),
            Reply::Unavailable => Err(Error::api(
                "get",
                format!("cluster '{}'", cluster_id),
                StatusCode::SERVICE_UNAVAILABLE,
                ApiError::default(),
            )),
        }
    }

    async fn create_cluster(&self, cluster: &Cluster) -> Result<Cluster> {
        self.record("create_cluster".to_string());
        Ok(cluster.clone())
    }

    async fn update_cluster(&self, cluster_id: &str, patch: &Cluster) -> Result<Cluster> {
        self.record(format!("update_cluster {}", cluster_id));
        Ok(patch.clone())
    }

    async fn delete_cluster(&self, cluster_id: &str) -> Result<()> {
        self.record(format!("delete_cluster {}", cluster_id));
        Ok(())
    }

    async fn search_clusters(&self, search: &str, _: i64, _: i64) -> Result<List<Cluster>> {
        self.record(format!("search_clusters {}", search));
        Ok(List::default())
    }
}

#[async_trait]
impl UpgradeApi for MockOcm {
    async fn get_version(&self, version_id: &str) -> Result<Version> {
        self.record(format!("get_version {}", version_id));
        self.versions
            .get(version_id)
            .cloned()
            .ok_or_else(|| not_found(&format!("version '{}'", version_id)))
    }

    async fn list_upgrade_policies(
        &self,
        cluster_id: &str,
        _page: i64,
        _size: i64,
    ) -> Result<List<UpgradePolicy>> {
        self.record(format!("list_upgrade_policies {}", cluster_id));
        let items = self
            .policies
            .lock()
            .unwrap()
            .iter()
            .map(|(policy, _)| policy.clone())
            .collect();
        Ok(List::of(items))
    }

    async fn get_upgrade_policy_state(
        &self,
        _cluster_id: &str,
        policy_id: &str,
    ) -> Result<UpgradePolicyState> {
        self.record(format!("get_upgrade_policy_state {}", policy_id));
        self.policies
            .lock()
            .unwrap()
            .iter()
            .find(|(policy, _)| policy.id.as_deref() == Some(policy_id))
            .map(|(_, value)| UpgradePolicyState {
                value: *value,
                description: None,
            })
            .ok_or_else(|| not_found(&format!("upgrade policy '{}'", policy_id)))
    }

    async fn create_upgrade_policy(
        &self,
        _cluster_id: &str,
        policy: &UpgradePolicy,
        dry_run: bool,
    ) -> Result<UpgradePolicy> {
        if dry_run {
            self.record("create_upgrade_policy dry_run".to_string());
            let body = match &self.dry_run_error {
                Some(body) => body.clone(),
                None if self.gates.is_empty() => return Ok(policy.clone()),
                None => ApiError {
                    details: Some(serde_json::to_value(&self.gates).unwrap()),
                    ..ApiError::with_reason("Missing required version gate agreements")
                },
            };
            return Err(Error::api(
                "post",
                "upgrade policy",
                StatusCode::BAD_REQUEST,
                body,
            ));
        }
        self.record(format!(
            "create_upgrade_policy {}",
            policy.version.as_deref().unwrap_or_default()
        ));
        let mut policies = self.policies.lock().unwrap();
        let created = UpgradePolicy {
            id: Some(format!("new-{}", policies.len())),
            ..policy.clone()
        };
        policies.push((created.clone(), UpgradePolicyStateValue::Scheduled));
        Ok(created)
    }

    async fn delete_upgrade_policy(&self, _cluster_id: &str, policy_id: &str) -> Result<()> {
        self.record(format!("delete_upgrade_policy {}", policy_id));
        self.policies
            .lock()
            .unwrap()
            .retain(|(policy, _)| policy.id.as_deref() != Some(policy_id));
        Ok(())
    }

    async fn create_gate_agreement(
        &self,
        _cluster_id: &str,
        agreement: &VersionGateAgreement,
    ) -> Result<VersionGateAgreement> {
        self.record(format!(
            "create_gate_agreement {}",
            agreement.version_gate.id
        ));
        Ok(agreement.clone())
    }
}
