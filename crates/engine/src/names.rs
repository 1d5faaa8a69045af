//! Naming and label scheme
//!
//! Canonical name derivation, endpoint name derivation, and the fixed
//! label/annotation keys shared by every component. These keys form a
//! contract with any other tool inspecting the same cluster; changing one is
//! a breaking change. All other modules read and write through this module.

/// Label carrying the job kind (training, inference, notebook, compute)
pub const LABEL_JOB_TYPE: &str = "gwm.io/job-type";

/// Label carrying the logical job name on controllers and their pods
pub const LABEL_JOB_NAME: &str = "gwm.io/job-name";

/// Label carrying the resolved priority tier
pub const LABEL_PRIORITY: &str = "gwm.io/priority";

/// Label carrying the resource pool; also the node label defining pool
/// membership. A node without this label belongs to the implicit default pool.
pub const LABEL_POOL: &str = "gwm.io/pool";

/// Label marking namespaces that host managed jobs
pub const LABEL_MANAGED_NAMESPACE: &str = "gwm.io/managed";

/// Label carrying the requested GPU model; also the node label advertising it
pub const LABEL_GPU_TYPE: &str = "gwm.io/gpu-type";

/// Label carrying the declared service port
pub const LABEL_PORT: &str = "gwm.io/port";

/// Annotation carrying the free-form description. Annotation-only because
/// descriptions may contain spaces or unicode illegal in label values.
pub const ANNOTATION_DESCRIPTION: &str = "gwm.io/description";

/// Annotation carrying a fractional GPU share, interpreted by the device plugin
pub const ANNOTATION_GPU_FRACTION: &str = "gwm.io/gpu-fraction";

/// Extended resource name used for whole-GPU requests
pub const GPU_RESOURCE: &str = "nvidia.com/gpu";

/// Name of the implicit pool formed by nodes carrying no pool label
pub const DEFAULT_POOL: &str = "default";

/// Namespace searched even when no namespace carries the managed marker
pub const DEFAULT_NAMESPACE: &str = "default";

/// Prefix of every derived endpoint (Service) name
pub const ENDPOINT_PREFIX: &str = "svc-";

/// The name a controller-shaped resource takes: always the logical job name,
/// unprefixed. Idempotent by construction.
pub fn canonical_name(job_name: &str) -> String {
    job_name.to_string()
}

/// Derive the endpoint (Service) name for a job
pub fn endpoint_name(job_name: &str) -> String {
    format!("{ENDPOINT_PREFIX}{job_name}")
}

/// Check the job name invariant: lowercase alphanumerics and hyphens,
/// 1 to 63 characters.
pub fn is_valid_job_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 63
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_name_is_identity() {
        assert_eq!(canonical_name("bert-train"), "bert-train");
        assert_eq!(canonical_name(&canonical_name("bert-train")), "bert-train");
    }

    #[test]
    fn test_endpoint_name_prefix() {
        assert_eq!(endpoint_name("bert-train"), "svc-bert-train");
        assert_eq!(endpoint_name("n1"), "svc-n1");
    }

    #[test]
    fn test_job_name_validation() {
        assert!(is_valid_job_name("bert-base-1"));
        assert!(is_valid_job_name("a"));
        assert!(!is_valid_job_name(""));
        assert!(!is_valid_job_name("Uppercase"));
        assert!(!is_valid_job_name("has space"));
        assert!(!is_valid_job_name("under_score"));
        assert!(!is_valid_job_name(&"x".repeat(64)));
        assert!(is_valid_job_name(&"x".repeat(63)));
    }
}
