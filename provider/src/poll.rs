/*!

Waiting for clusters. A cluster is polled on a fixed interval until it reaches a terminal state
(`ready` or `error`), or, when waiting for a deletion, until the API answers 404. Each poll is
retried with [`Backoff`] so that a transient API failure does not end the wait, and the whole wait
is bounded by a timeout given in minutes.

!*/

use crate::constants::{
    CREATE_POLL_INTERVAL, DEFAULT_TIMEOUT_MINUTES, DELETE_POLL_INTERVAL, DELETE_RETRY_DELAY,
    READY_RETRY_DELAY, RETRY_ATTEMPTS, WAITER_POLL_INTERVAL,
};
use crate::provider::{ErrorKind, IntoProviderError, ProviderError, ProviderResult};
use crate::retry::Backoff;
use crate::Diagnostics;
use log::{debug, info};
use rhcs_model::clients::{ClusterApi, HttpStatusCode};
use rhcs_model::ClusterState;
use std::time::Duration;

/// Convert a user supplied timeout in minutes into a duration. A missing timeout means the
/// default; a timeout that is not positive is reported as a warning and replaced by the default.
pub fn timeout_minutes(minutes: Option<i64>, cluster_id: &str, diags: &mut Diagnostics) -> Duration {
    let minutes = match minutes {
        Some(minutes) if minutes <= 0 => {
            diags.add_warning(
                "Can't poll cluster state with a non-positive timeout",
                format!(
                    "Can't poll state of cluster with identifier '{}', the timeout that was set \
                    is not a positive number",
                    cluster_id
                ),
            );
            DEFAULT_TIMEOUT_MINUTES
        }
        Some(minutes) => minutes,
        None => DEFAULT_TIMEOUT_MINUTES,
    };
    Duration::from_secs(u64::try_from(minutes).unwrap_or_default().saturating_mul(60))
}

/// The outcome of waiting for a cluster to be deleted.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Deletion {
    /// The API no longer knows the cluster.
    Deleted,
    /// The cluster still existed when the timeout elapsed.
    TimedOut,
}

/// Polls a cluster until it reaches a state of interest.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Poller {
    interval: Duration,
    backoff: Backoff,
}

impl Poller {
    pub fn new(interval: Duration, backoff: Backoff) -> Self {
        Self { interval, backoff }
    }

    /// The poller used while a cluster is being created.
    pub fn create() -> Self {
        Self::new(
            CREATE_POLL_INTERVAL,
            Backoff::new(RETRY_ATTEMPTS, READY_RETRY_DELAY),
        )
    }

    /// The poller used by resources that wait for a cluster created elsewhere.
    pub fn waiter() -> Self {
        Self::new(
            WAITER_POLL_INTERVAL,
            Backoff::new(RETRY_ATTEMPTS, READY_RETRY_DELAY),
        )
    }

    /// The poller used while a cluster is being deleted.
    pub fn delete() -> Self {
        Self::new(
            DELETE_POLL_INTERVAL,
            Backoff::new(RETRY_ATTEMPTS, DELETE_RETRY_DELAY),
        )
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Fetch the state of the cluster, retrying transient failures.
    pub async fn cluster_state<C>(&self, client: &C, cluster_id: &str) -> ProviderResult<ClusterState>
    where
        C: ClusterApi + ?Sized,
    {
        let cluster = self
            .backoff
            .retry(&format!("get cluster '{}'", cluster_id), || {
                client.get_cluster(cluster_id)
            })
            .await
            .context(
                ErrorKind::Remote,
                format!("Can't poll state of cluster with identifier '{}'", cluster_id),
            )?;
        Ok(cluster.state.unwrap_or(ClusterState::Unknown))
    }

    /// Poll until the cluster is `ready` or `error`. Returns the terminal state, or a timeout
    /// error when `timeout` elapses first.
    pub async fn wait_for_terminal_state<C>(
        &self,
        client: &C,
        cluster_id: &str,
        timeout: Duration,
    ) -> ProviderResult<ClusterState>
    where
        C: ClusterApi + ?Sized,
    {
        tokio::time::timeout(timeout, self.poll_terminal_state(client, cluster_id))
            .await
            .context(
                ErrorKind::Timeout,
                format!(
                    "Cluster '{}' did not reach a final state within {} minutes",
                    cluster_id,
                    timeout.as_secs() / 60
                ),
            )?
    }

    /// Poll until the cluster is `ready`. A cluster in the `error` state fails the wait.
    pub async fn wait_until_ready<C>(
        &self,
        client: &C,
        cluster_id: &str,
        timeout: Duration,
    ) -> ProviderResult<()>
    where
        C: ClusterApi + ?Sized,
    {
        info!("Waiting for cluster '{}' to be ready", cluster_id);
        match self
            .wait_for_terminal_state(client, cluster_id, timeout)
            .await?
        {
            ClusterState::Ready => Ok(()),
            state => Err(ProviderError::new_with_context(
                ErrorKind::Remote,
                format!("cluster state is {}", state),
            )),
        }
    }

    /// Poll until the API answers 404 for the cluster.
    pub async fn wait_until_deleted<C>(
        &self,
        client: &C,
        cluster_id: &str,
        timeout: Duration,
    ) -> ProviderResult<Deletion>
    where
        C: ClusterApi + ?Sized,
    {
        info!("Waiting for cluster '{}' to be deleted", cluster_id);
        match tokio::time::timeout(timeout, self.poll_deletion(client, cluster_id)).await {
            Ok(result) => result,
            Err(_) => Ok(Deletion::TimedOut),
        }
    }

    async fn poll_terminal_state<C>(&self, client: &C, cluster_id: &str) -> ProviderResult<ClusterState>
    where
        C: ClusterApi + ?Sized,
    {
        loop {
            let state = self.cluster_state(client, cluster_id).await?;
            debug!("Cluster '{}' is in state '{}'", cluster_id, state);
            if state.is_terminal() {
                return Ok(state);
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    async fn poll_deletion<C>(&self, client: &C, cluster_id: &str) -> ProviderResult<Deletion>
    where
        C: ClusterApi + ?Sized,
    {
        loop {
            let result = self
                .backoff
                .retry(&format!("get cluster '{}'", cluster_id), || {
                    client.get_cluster(cluster_id)
                })
                .await;
            match result {
                Ok(cluster) => debug!(
                    "Cluster '{}' is still in state '{}'",
                    cluster_id,
                    cluster.state.unwrap_or(ClusterState::Unknown)
                ),
                Err(e) if e.is_not_found() => return Ok(Deletion::Deleted),
                Err(e) => {
                    return Err(e).context(
                        ErrorKind::Remote,
                        format!("Can't poll cluster deletion for cluster '{}'", cluster_id),
                    )
                }
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn timeout_defaults() {
        let mut diags = Diagnostics::new();
        assert_eq!(
            timeout_minutes(None, "abc", &mut diags),
            Duration::from_secs(3600)
        );
        assert_eq!(
            timeout_minutes(Some(5), "abc", &mut diags),
            Duration::from_secs(300)
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn non_positive_timeout_warns() {
        for minutes in [0, -10] {
            let mut diags = Diagnostics::new();
            assert_eq!(
                timeout_minutes(Some(minutes), "abc", &mut diags),
                Duration::from_secs(3600)
            );
            assert!(!diags.has_error());
            let warning = diags.warnings().next().unwrap();
            assert_eq!(
                warning.summary,
                "Can't poll cluster state with a non-positive timeout"
            );
            assert!(warning.detail.contains("'abc'"));
        }
    }

    #[test]
    fn huge_timeout_saturates() {
        let mut diags = Diagnostics::new();
        assert_eq!(
            timeout_minutes(Some(i64::MAX / 10), "abc", &mut diags),
            Duration::from_secs(u64::MAX)
        );
        assert_eq!(
            timeout_minutes(Some(i64::MAX), "abc", &mut diags),
            Duration::from_secs(u64::MAX)
        );
        assert!(diags.is_empty());
    }
}
