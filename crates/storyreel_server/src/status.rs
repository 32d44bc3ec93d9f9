//! Service status values.

use serde::{Serialize, Serializer};

/// Stage at which a provisioning attempt gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum FailureReason {
    /// Installer could not be downloaded
    #[display("download")]
    Download,
    /// Installer ran but failed
    #[display("install")]
    Install,
    /// No service binary could be located
    #[display("notfound")]
    NotFound,
    /// Service did not come up in time
    #[display("start")]
    Start,
    /// Default model could not be pulled
    #[display("pull")]
    Pull,
}

/// Process-wide state of the local inference service.
///
/// # Examples
///
/// ```
/// use storyreel_server::{FailureReason, ServiceStatus};
///
/// assert_eq!(ServiceStatus::Failed(FailureReason::Pull).to_string(), "failed:pull");
/// assert!(ServiceStatus::Pulling.is_in_flight());
/// assert!(ServiceStatus::Failed(FailureReason::Start).can_start());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ServiceStatus {
    /// Nothing attempted yet
    #[default]
    #[display("idle")]
    Idle,
    /// Probing for a running service or an installation
    #[display("checking")]
    Checking,
    /// Fetching the installer
    #[display("downloading")]
    Downloading,
    /// Running the installer
    #[display("installing")]
    Installing,
    /// Launching the service and waiting for liveness
    #[display("starting")]
    Starting,
    /// Pulling the default model
    #[display("pulling")]
    Pulling,
    /// Reachable with at least one model
    #[display("ready")]
    Ready,
    /// Last attempt failed at the given stage
    #[display("failed:{}", _0)]
    Failed(FailureReason),
}

impl ServiceStatus {
    /// A provisioning attempt is currently running.
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            ServiceStatus::Checking
                | ServiceStatus::Downloading
                | ServiceStatus::Installing
                | ServiceStatus::Starting
                | ServiceStatus::Pulling
        )
    }

    /// A fresh attempt may begin from this status.
    pub fn can_start(self) -> bool {
        matches!(self, ServiceStatus::Idle | ServiceStatus::Failed(_))
    }

    /// The failure stage, if failed.
    pub fn failure(self) -> Option<FailureReason> {
        match self {
            ServiceStatus::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

impl Serialize for ServiceStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_and_startable_are_disjoint() {
        let all = [
            ServiceStatus::Idle,
            ServiceStatus::Checking,
            ServiceStatus::Downloading,
            ServiceStatus::Installing,
            ServiceStatus::Starting,
            ServiceStatus::Pulling,
            ServiceStatus::Ready,
            ServiceStatus::Failed(FailureReason::Download),
        ];
        for status in all {
            assert!(!(status.is_in_flight() && status.can_start()), "{status}");
        }
        assert!(!ServiceStatus::Ready.is_in_flight());
        assert!(!ServiceStatus::Ready.can_start());
    }

    #[test]
    fn test_failure_labels() {
        let labels: Vec<String> = [
            FailureReason::Download,
            FailureReason::Install,
            FailureReason::NotFound,
            FailureReason::Start,
            FailureReason::Pull,
        ]
        .into_iter()
        .map(|r| ServiceStatus::Failed(r).to_string())
        .collect();
        assert_eq!(
            labels,
            [
                "failed:download",
                "failed:install",
                "failed:notfound",
                "failed:start",
                "failed:pull"
            ]
        );
    }

    #[test]
    fn test_serializes_as_label() {
        let json = serde_json::to_string(&ServiceStatus::Pulling).unwrap();
        assert_eq!(json, "\"pulling\"");
    }
}
