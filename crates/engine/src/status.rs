//! Status normalizer
//!
//! Collapses the four native status shapes (pod phase, Deployment replicas,
//! StatefulSet replicas, Job counters) into one taxonomy plus a detail
//! reason. Ordering is load-bearing: pod-level detail wins over
//! controller-level aggregates, since a controller can report "ready" while
//! an individual pod crash-loops.

use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use serde::{Deserialize, Serialize};

/// Normalized status taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizedStatus {
    Pending,
    Running,
    PartiallyRunning,
    Succeeded,
    Failed,
    Unknown,
}

impl std::fmt::Display for NormalizedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            NormalizedStatus::Pending => "Pending",
            NormalizedStatus::Running => "Running",
            NormalizedStatus::PartiallyRunning => "Partially Running",
            NormalizedStatus::Succeeded => "Succeeded",
            NormalizedStatus::Failed => "Failed",
            NormalizedStatus::Unknown => "Unknown",
        };
        f.write_str(text)
    }
}

/// Normalized status plus the detail reason operators debug against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: NormalizedStatus,
    /// Container-level reason, verbatim from the platform when present
    pub detail: Option<String>,
}

impl StatusReport {
    fn new(status: NormalizedStatus) -> Self {
        Self {
            status,
            detail: None,
        }
    }

    fn with_detail(status: NormalizedStatus, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: Some(detail.into()),
        }
    }

    /// Human-facing status string: the detail reason when present, else the
    /// normalized category.
    pub fn display(&self) -> String {
        match &self.detail {
            Some(detail) => detail.clone(),
            None => self.status.to_string(),
        }
    }
}

/// Normalize a pod-shaped status: the lifecycle phase is primary, but a
/// waiting/terminated container reason overrides it through the fixed table.
pub fn from_pod(pod: &Pod) -> StatusReport {
    let Some(status) = &pod.status else {
        return StatusReport::new(NormalizedStatus::Unknown);
    };
    let Some(phase) = status.phase.as_deref() else {
        return StatusReport::new(NormalizedStatus::Unknown);
    };
    let reason = status.container_statuses.as_deref().and_then(|statuses| {
        statuses.iter().find_map(|cs| {
            let state = cs.state.as_ref()?;
            if let Some(waiting) = &state.waiting {
                return waiting.reason.clone();
            }
            match &state.terminated {
                Some(terminated) if terminated.reason.as_deref() != Some("Completed") => {
                    terminated.reason.clone()
                }
                _ => None,
            }
        })
    });
    normalize_phase(phase, reason.as_deref())
}

/// Normalize a replica-count status (continuously-running shape)
pub fn from_deployment(deployment: &Deployment) -> StatusReport {
    match &deployment.status {
        Some(status) => normalize_replicas(
            status.ready_replicas.unwrap_or(0),
            status.replicas.unwrap_or(0),
            status.unavailable_replicas.unwrap_or(0),
        ),
        None => StatusReport::new(NormalizedStatus::Unknown),
    }
}

/// Normalize a replica-count status (stable-identity shape)
pub fn from_stateful_set(stateful_set: &StatefulSet) -> StatusReport {
    match &stateful_set.status {
        Some(status) => {
            let total = status.replicas;
            let ready = status.ready_replicas.unwrap_or(0);
            normalize_replicas(ready, total, (total - ready).max(0))
        }
        None => StatusReport::new(NormalizedStatus::Unknown),
    }
}

/// Normalize a counter status (run-to-completion shape)
pub fn from_job(job: &Job) -> StatusReport {
    match &job.status {
        Some(status) => normalize_counters(
            status.active.unwrap_or(0),
            status.succeeded.unwrap_or(0),
            status.failed.unwrap_or(0),
        ),
        None => StatusReport::new(NormalizedStatus::Unknown),
    }
}

/// Pod phase plus optional container reason → normalized status.
/// Recognized reasons carry both a category and the verbatim reason as
/// detail; unrecognized reasons keep the phase category and pass the reason
/// through verbatim.
pub fn normalize_phase(phase: &str, container_reason: Option<&str>) -> StatusReport {
    let base = match phase {
        "Pending" => NormalizedStatus::Pending,
        "Running" => NormalizedStatus::Running,
        "Succeeded" => NormalizedStatus::Succeeded,
        "Failed" => NormalizedStatus::Failed,
        _ => NormalizedStatus::Unknown,
    };
    match container_reason {
        Some(reason) => match classify_reason(reason) {
            Some(category) => StatusReport::with_detail(category, reason),
            None => StatusReport::with_detail(base, reason),
        },
        None => StatusReport::new(base),
    }
}

/// Fixed reason table. Image-pull, permission/config and runtime failures are
/// Failed; storage attachment problems are Pending (the pod has not started);
/// anything containing "BackOff" falls into the backoff class.
fn classify_reason(reason: &str) -> Option<NormalizedStatus> {
    match reason {
        "ErrImagePull" | "ImagePullBackOff" | "InvalidImageName" | "ErrImageNeverPull" => {
            Some(NormalizedStatus::Failed)
        }
        "CreateContainerConfigError" | "CreateContainerError" | "RunContainerError" => {
            Some(NormalizedStatus::Failed)
        }
        "FailedMount" | "FailedAttachVolume" => Some(NormalizedStatus::Pending),
        "CrashLoopBackOff" | "OOMKilled" | "Error" | "ContainerCannotRun" => {
            Some(NormalizedStatus::Failed)
        }
        r if r.contains("BackOff") => Some(NormalizedStatus::Failed),
        _ => None,
    }
}

/// Ready/current/unavailable replica counts → normalized status
pub fn normalize_replicas(ready: i32, total: i32, unavailable: i32) -> StatusReport {
    let status = if total == 0 {
        NormalizedStatus::Pending
    } else if ready > 0 && unavailable == 0 {
        NormalizedStatus::Running
    } else if ready > 0 {
        NormalizedStatus::PartiallyRunning
    } else {
        NormalizedStatus::Pending
    };
    StatusReport::new(status)
}

/// Active/succeeded/failed counters → normalized status
pub fn normalize_counters(active: i32, succeeded: i32, failed: i32) -> StatusReport {
    let status = if succeeded > 0 {
        NormalizedStatus::Succeeded
    } else if failed > 0 {
        NormalizedStatus::Failed
    } else if active > 0 {
        NormalizedStatus::Running
    } else {
        NormalizedStatus::Pending
    };
    StatusReport::new(status)
}
