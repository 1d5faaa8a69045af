//! Normalized in-memory job description
//!
//! The spec model is validated, compiled into native resources, and then
//! discarded; it is never persisted. Job kinds and priorities are closed
//! enums so that adding a kind is a compile-time-checked change rather than a
//! string comparison scattered across modules.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::names;

/// Workload kind, discriminating the native controller shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Run-to-completion batch workload
    Training,
    /// Continuously-running replicated service
    Inference,
    /// Stable-identity single-replica interactive session
    Notebook,
    /// Continuously-running generic compute, optionally node-reachable
    Compute,
}

impl JobKind {
    /// Label value written to `gwm.io/job-type`
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Training => "training",
            JobKind::Inference => "inference",
            JobKind::Notebook => "notebook",
            JobKind::Compute => "compute",
        }
    }

    /// Parse a `gwm.io/job-type` label value; `None` for unrecognized values
    pub fn from_label(value: &str) -> Option<JobKind> {
        match value {
            "training" => Some(JobKind::Training),
            "inference" => Some(JobKind::Inference),
            "notebook" => Some(JobKind::Notebook),
            "compute" => Some(JobKind::Compute),
            _ => None,
        }
    }

    /// Default service port assumed when neither a port label nor a declared
    /// container port is present. Training jobs expose no endpoint.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            JobKind::Training => None,
            JobKind::Inference | JobKind::Compute => Some(8000),
            JobKind::Notebook => Some(8888),
        }
    }

    /// Whether this kind gets a derived network endpoint
    pub fn has_endpoint(&self) -> bool {
        !matches!(self, JobKind::Training)
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduling priority tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    /// Parse a `gwm.io/priority` label value
    pub fn from_label(value: &str) -> Option<Priority> {
        match value {
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }
}

/// Job identity and bookkeeping fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMetadata {
    /// Logical job name; must match `[a-z0-9-]{1,63}`
    pub name: String,
    /// Target namespace; empty means "use the caller's default"
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub priority: Priority,
    /// Free-form description, stored only in annotations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epochs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,
}

/// Single environment variable entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvEntry {
    pub name: String,
    pub value: String,
}

/// Container image and process configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_secret: Option<String>,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: Vec<EnvEntry>,
}

/// Requested compute resources
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequest {
    /// Resource pool; `None` means the implicit default pool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool: Option<String>,
    /// Whole GPUs per replica; signed so a negative count can be rejected
    /// explicitly rather than mangled at parse time
    #[serde(default)]
    pub gpu_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_type: Option<String>,
    /// CPU quantity string, e.g. "4" or "500m"
    pub cpu: String,
    /// Memory quantity string, e.g. "16Gi"
    pub memory: String,
    /// Fractional GPU share in (0, 1]; mutually informative with `gpu_count`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_share: Option<f64>,
}

/// Host directories mounted into every replica
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Storage {
    #[serde(default)]
    pub workdirs: Vec<String>,
}

/// Network endpoint configuration for endpoint-bearing kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    #[serde(default = "default_replicas")]
    pub replicas: i32,
    #[serde(default)]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_path: Option<String>,
    /// Request timeout in seconds, recorded for the endpoint consumer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
}

fn default_replicas() -> i32 {
    1
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            replicas: 1,
            port: 0,
            health_check_path: None,
            timeout: None,
        }
    }
}

/// Complete normalized job description
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    pub kind: JobKind,
    pub metadata: JobMetadata,
    pub environment: Environment,
    #[serde(default)]
    pub resources: ResourceRequest,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub service: ServiceConfig,
}

impl JobSpec {
    /// Validate the description before compilation.
    ///
    /// Rejects malformed names, negative GPU counts, out-of-range shares and
    /// malformed quantity strings as `InvalidSpec`; nothing is silently
    /// coerced. A missing image is left to the compiler to report.
    pub fn validate(&self) -> Result<()> {
        if !names::is_valid_job_name(&self.metadata.name) {
            return Err(Error::InvalidSpec(format!(
                "job name '{}' must match [a-z0-9-]{{1,63}}",
                self.metadata.name
            )));
        }
        if self.resources.gpu_count < 0 {
            return Err(Error::InvalidSpec(format!(
                "gpuCount must not be negative (got {})",
                self.resources.gpu_count
            )));
        }
        if let Some(share) = self.resources.gpu_share {
            if !(share > 0.0 && share <= 1.0) {
                return Err(Error::InvalidSpec(format!(
                    "gpuShare must be in (0, 1] (got {share})"
                )));
            }
        }
        validate_quantity("cpu", &self.resources.cpu)?;
        validate_quantity("memory", &self.resources.memory)?;
        if self.service.replicas < 0 {
            return Err(Error::InvalidSpec(format!(
                "replicas must not be negative (got {})",
                self.service.replicas
            )));
        }
        Ok(())
    }
}

/// Unit suffixes accepted in quantity strings, longest first so that "Mi"
/// is not consumed as "M" plus a stray byte.
const QUANTITY_SUFFIXES: &[&str] = &["Ki", "Mi", "Gi", "Ti", "Pi", "k", "m", "M", "G", "T", "P"];

/// Validate a Kubernetes-style quantity string: a decimal number optionally
/// followed by a known unit suffix. Malformed strings are an invalid-spec
/// error, never coerced.
fn validate_quantity(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidSpec(format!("{field} quantity is empty")));
    }
    let number = QUANTITY_SUFFIXES
        .iter()
        .find_map(|s| value.strip_suffix(s))
        .unwrap_or(value);
    if number.is_empty() || number.parse::<f64>().is_err() || number.starts_with('-') {
        return Err(Error::InvalidSpec(format!(
            "{field} quantity '{value}' is not a valid quantity string"
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn minimal_spec(kind: JobKind, name: &str) -> JobSpec {
        JobSpec {
            kind,
            metadata: JobMetadata {
                name: name.to_string(),
                namespace: "default".to_string(),
                ..Default::default()
            },
            environment: Environment {
                image: "pytorch/pytorch:2.1".to_string(),
                ..Default::default()
            },
            resources: ResourceRequest {
                gpu_count: 1,
                cpu: "4".to_string(),
                memory: "16Gi".to_string(),
                ..Default::default()
            },
            storage: Storage::default(),
            service: ServiceConfig::default(),
        }
    }

    #[test]
    fn test_valid_spec_passes() {
        let spec = minimal_spec(JobKind::Training, "bert-base");
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_negative_gpu_count_rejected() {
        let mut spec = minimal_spec(JobKind::Training, "bert-base");
        spec.resources.gpu_count = -1;
        match spec.validate() {
            Err(Error::InvalidSpec(msg)) => assert!(msg.contains("gpuCount")),
            other => panic!("expected InvalidSpec, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_quantity_rejected() {
        let mut spec = minimal_spec(JobKind::Training, "bert-base");
        spec.resources.memory = "16Gigs".to_string();
        assert!(matches!(spec.validate(), Err(Error::InvalidSpec(_))));

        spec.resources.memory = "-4Gi".to_string();
        assert!(matches!(spec.validate(), Err(Error::InvalidSpec(_))));

        spec.resources.memory = "16Gi".to_string();
        spec.resources.cpu = "four".to_string();
        assert!(matches!(spec.validate(), Err(Error::InvalidSpec(_))));
    }

    #[test]
    fn test_millicpu_and_plain_quantities_accepted() {
        let mut spec = minimal_spec(JobKind::Compute, "svc1");
        spec.resources.cpu = "500m".to_string();
        assert!(spec.validate().is_ok());
        spec.resources.cpu = "2.5".to_string();
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_bad_name_rejected() {
        let spec = minimal_spec(JobKind::Notebook, "My Notebook");
        assert!(matches!(spec.validate(), Err(Error::InvalidSpec(_))));
    }

    #[test]
    fn test_gpu_share_bounds() {
        let mut spec = minimal_spec(JobKind::Inference, "svc1");
        spec.resources.gpu_share = Some(0.5);
        assert!(spec.validate().is_ok());
        spec.resources.gpu_share = Some(1.5);
        assert!(spec.validate().is_err());
        spec.resources.gpu_share = Some(0.0);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_kind_label_round_trip() {
        for kind in [
            JobKind::Training,
            JobKind::Inference,
            JobKind::Notebook,
            JobKind::Compute,
        ] {
            assert_eq!(JobKind::from_label(kind.as_str()), Some(kind));
        }
        assert_eq!(JobKind::from_label("cronjob"), None);
    }
}
