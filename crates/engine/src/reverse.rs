//! Reverse mapper: native resource → approximate job description
//!
//! The cluster is the only source of truth; no original file is stored. Every
//! extractor degrades to a documented default when a field is absent, so the
//! output is always directly re-submittable through the forward compiler.
//!
//! Documented defaults: image `registry.k8s.io/pause:3.9`, cpu `1`, memory
//! `1Gi`, priority `medium`, kind falls back per shape (run-to-completion →
//! training, stable-identity → notebook, everything else → compute).

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Pod, PodSpec};

use crate::compile::pod::{ENV_BATCH_SIZE, ENV_EPOCHS};
use crate::names::{
    ANNOTATION_DESCRIPTION, ANNOTATION_GPU_FRACTION, DEFAULT_POOL, GPU_RESOURCE, LABEL_GPU_TYPE,
    LABEL_JOB_TYPE, LABEL_POOL, LABEL_PORT, LABEL_PRIORITY,
};
use crate::spec::{
    EnvEntry, Environment, JobKind, JobMetadata, JobSpec, Priority, ResourceRequest, ServiceConfig,
    Storage,
};

/// Fallback image when the native object carries none
const DEFAULT_IMAGE: &str = "registry.k8s.io/pause:3.9";
const DEFAULT_CPU: &str = "1";
const DEFAULT_MEMORY: &str = "1Gi";

/// Approximate a job description from a continuously-running controller
pub fn from_deployment(deployment: &Deployment) -> JobSpec {
    let spec = deployment.spec.as_ref();
    approximate(View {
        name: deployment.metadata.name.as_deref().unwrap_or_default(),
        namespace: deployment.metadata.namespace.as_deref().unwrap_or_default(),
        labels: deployment.metadata.labels.as_ref(),
        annotations: deployment.metadata.annotations.as_ref(),
        pod_spec: spec.and_then(|s| s.template.spec.as_ref()),
        replicas: spec.and_then(|s| s.replicas).unwrap_or(1),
        fallback_kind: JobKind::Compute,
        stable_identity: false,
    })
}

/// Approximate a job description from a run-to-completion controller
pub fn from_job(job: &Job) -> JobSpec {
    approximate(View {
        name: job.metadata.name.as_deref().unwrap_or_default(),
        namespace: job.metadata.namespace.as_deref().unwrap_or_default(),
        labels: job.metadata.labels.as_ref(),
        annotations: job.metadata.annotations.as_ref(),
        pod_spec: job
            .spec
            .as_ref()
            .and_then(|s| s.template.spec.as_ref()),
        replicas: 1,
        fallback_kind: JobKind::Training,
        stable_identity: false,
    })
}

/// Approximate a job description from a stable-identity controller
pub fn from_stateful_set(stateful_set: &StatefulSet) -> JobSpec {
    approximate(View {
        name: stateful_set.metadata.name.as_deref().unwrap_or_default(),
        namespace: stateful_set
            .metadata
            .namespace
            .as_deref()
            .unwrap_or_default(),
        labels: stateful_set.metadata.labels.as_ref(),
        annotations: stateful_set.metadata.annotations.as_ref(),
        pod_spec: stateful_set
            .spec
            .as_ref()
            .and_then(|s| s.template.spec.as_ref()),
        replicas: 1,
        fallback_kind: JobKind::Notebook,
        stable_identity: true,
    })
}

/// Approximate a job description from a bare pod (possibly orphaned)
pub fn from_pod(pod: &Pod) -> JobSpec {
    approximate(View {
        name: pod.metadata.name.as_deref().unwrap_or_default(),
        namespace: pod.metadata.namespace.as_deref().unwrap_or_default(),
        labels: pod.metadata.labels.as_ref(),
        annotations: pod.metadata.annotations.as_ref(),
        pod_spec: pod.spec.as_ref(),
        replicas: 1,
        fallback_kind: JobKind::Compute,
        stable_identity: false,
    })
}

/// Shape-independent view of whatever nested path the resource uses:
/// pod-shaped resources store the pod spec directly, controller-shaped ones
/// a level deeper under their template.
struct View<'a> {
    name: &'a str,
    namespace: &'a str,
    labels: Option<&'a BTreeMap<String, String>>,
    annotations: Option<&'a BTreeMap<String, String>>,
    pod_spec: Option<&'a PodSpec>,
    replicas: i32,
    fallback_kind: JobKind,
    stable_identity: bool,
}

fn approximate(view: View<'_>) -> JobSpec {
    let label = |key: &str| view.labels.and_then(|l| l.get(key)).cloned();
    let annotation = |key: &str| view.annotations.and_then(|a| a.get(key)).cloned();

    let kind = label(LABEL_JOB_TYPE)
        .and_then(|v| JobKind::from_label(&v))
        .unwrap_or(view.fallback_kind);

    let logical_name = if view.stable_identity {
        strip_ordinal(view.name)
    } else {
        strip_generated_suffix(view.name)
    };

    let container = view
        .pod_spec
        .and_then(|ps| ps.containers.first());

    let mut env = Vec::new();
    let mut epochs = None;
    let mut batch_size = None;
    if let Some(vars) = container.and_then(|c| c.env.as_ref()) {
        for var in vars {
            let value = var.value.clone().unwrap_or_default();
            match var.name.as_str() {
                ENV_EPOCHS => epochs = value.parse().ok(),
                ENV_BATCH_SIZE => batch_size = value.parse().ok(),
                _ => env.push(EnvEntry {
                    name: var.name.clone(),
                    value,
                }),
            }
        }
    }

    let limits = container
        .and_then(|c| c.resources.as_ref())
        .and_then(|r| r.limits.as_ref());
    let cpu = limits
        .and_then(|l| l.get("cpu"))
        .map(|q| coerce_cpu(&q.0))
        .unwrap_or_else(|| DEFAULT_CPU.to_string());
    let memory = limits
        .and_then(|l| l.get("memory"))
        .map(|q| q.0.clone())
        .unwrap_or_else(|| DEFAULT_MEMORY.to_string());
    let gpu_count = limits
        .and_then(|l| l.get(GPU_RESOURCE))
        .and_then(|q| q.0.parse().ok())
        .unwrap_or(0);

    // Port preference: explicit port label, then the container's declared
    // port, then the kind-specific default.
    let port = label(LABEL_PORT)
        .and_then(|v| v.parse::<u16>().ok())
        .or_else(|| {
            container
                .and_then(|c| c.ports.as_ref())
                .and_then(|ports| ports.first())
                .and_then(|p| u16::try_from(p.container_port).ok())
        })
        .or_else(|| kind.default_port())
        .unwrap_or(0);

    let health_check_path = container
        .and_then(|c| c.liveness_probe.as_ref())
        .and_then(|p| p.http_get.as_ref())
        .and_then(|h| h.path.clone());

    let workdirs = view
        .pod_spec
        .and_then(|ps| ps.volumes.as_ref())
        .map(|volumes| {
            volumes
                .iter()
                .filter_map(|v| v.host_path.as_ref().map(|hp| hp.path.clone()))
                .collect()
        })
        .unwrap_or_default();

    // Pool label "default" marks the implicit pool; it maps back to absent.
    let pool = label(LABEL_POOL).filter(|p| p != DEFAULT_POOL);

    JobSpec {
        kind,
        metadata: JobMetadata {
            name: logical_name,
            namespace: view.namespace.to_string(),
            priority: label(LABEL_PRIORITY)
                .and_then(|v| Priority::from_label(&v))
                .unwrap_or_default(),
            description: annotation(ANNOTATION_DESCRIPTION),
            epochs,
            batch_size,
        },
        environment: Environment {
            image: container
                .and_then(|c| c.image.clone())
                .unwrap_or_else(|| DEFAULT_IMAGE.to_string()),
            pull_secret: view
                .pod_spec
                .and_then(|ps| ps.image_pull_secrets.as_ref())
                .and_then(|secrets| secrets.first())
                .and_then(|s| s.name.clone()),
            command: container
                .and_then(|c| c.command.clone())
                .unwrap_or_default(),
            args: container.and_then(|c| c.args.clone()).unwrap_or_default(),
            env,
        },
        resources: ResourceRequest {
            pool,
            gpu_count,
            gpu_type: label(LABEL_GPU_TYPE),
            cpu,
            memory,
            gpu_share: annotation(ANNOTATION_GPU_FRACTION).and_then(|v| v.parse().ok()),
        },
        storage: Storage { workdirs },
        service: ServiceConfig {
            replicas: view.replicas,
            port,
            health_check_path,
            timeout: None,
        },
    }
}

/// Strip generated suffixes from an observed resource name.
///
/// When the name has a third hyphen-token and the trailing tokens are
/// alphanumeric and at least 5 characters, they are treated as generated
/// (ReplicaSet hashes and pod suffixes) and removed. The heuristic can
/// misfire on legitimate names containing such a segment; that limitation is
/// deliberate and shared with every other tool reading the same names.
pub fn strip_generated_suffix(name: &str) -> String {
    let tokens: Vec<&str> = name.split('-').collect();
    if tokens.len() < 3 {
        return name.to_string();
    }
    let mut end = tokens.len();
    while end >= 2 && looks_generated(tokens[end - 1]) {
        end -= 1;
    }
    tokens[..end].join("-")
}

/// Strip a purely numeric final token (stable-identity ordinals, `name-0`)
pub fn strip_ordinal(name: &str) -> String {
    match name.rsplit_once('-') {
        Some((base, ordinal))
            if !ordinal.is_empty() && ordinal.chars().all(|c| c.is_ascii_digit()) =>
        {
            base.to_string()
        }
        _ => name.to_string(),
    }
}

fn looks_generated(token: &str) -> bool {
    token.len() >= 5 && token.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Whether an identifier looks like a pod name rather than a canonical
/// controller name: it either carries a generated suffix or ends in a
/// stable-identity ordinal.
pub fn looks_pod_shaped(identifier: &str) -> bool {
    strip_generated_suffix(identifier) != identifier || strip_ordinal(identifier) != identifier
}

/// Numeric-looking CPU strings are coerced to integers; unit-suffixed
/// strings are left untouched.
fn coerce_cpu(value: &str) -> String {
    match value.parse::<f64>() {
        Ok(parsed) => (parsed as i64).to_string(),
        Err(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{compile, ControllerResource};
    use crate::spec::tests::minimal_spec;

    #[test]
    fn test_suffix_stripping_recovers_logical_name() {
        // Deployment pod: two generated tokens
        assert_eq!(strip_generated_suffix("svc1-7d9f8c6b5-x2v4q"), "svc1");
        // Synthetic single 5+-char alphanumeric token
        assert_eq!(strip_generated_suffix("bert-base-x7k2p"), "bert-base");
        // Short final token is not generated
        assert_eq!(strip_generated_suffix("my-train-job"), "my-train-job");
        // Two tokens only: no third token, nothing stripped
        assert_eq!(strip_generated_suffix("my-notebook"), "my-notebook");
    }

    #[test]
    fn test_ordinal_stripping() {
        assert_eq!(strip_ordinal("nb1-0"), "nb1");
        assert_eq!(strip_ordinal("nb1-12"), "nb1");
        assert_eq!(strip_ordinal("nb1-abc"), "nb1-abc");
        assert_eq!(strip_ordinal("nb1"), "nb1");
    }

    #[test]
    fn test_pod_shaped_identifiers() {
        assert!(looks_pod_shaped("svc1-7d9f8c6b5-x2v4q"));
        assert!(looks_pod_shaped("nb1-0"));
        assert!(!looks_pod_shaped("svc1"));
        assert!(!looks_pod_shaped("my-train-job"));
    }

    #[test]
    fn test_cpu_coercion() {
        assert_eq!(coerce_cpu("4"), "4");
        assert_eq!(coerce_cpu("4.0"), "4");
        assert_eq!(coerce_cpu("500m"), "500m");
        assert_eq!(coerce_cpu("2Gi"), "2Gi");
    }

    #[test]
    fn test_round_trip_preserves_core_fields() {
        for kind in [
            JobKind::Training,
            JobKind::Inference,
            JobKind::Notebook,
            JobKind::Compute,
        ] {
            let mut original = minimal_spec(kind, "round-trip");
            original.environment.command = vec!["python".to_string(), "train.py".to_string()];
            original.resources.gpu_count = 2;
            original.metadata.description = Some("round trip check".to_string());
            let set = compile(&original, "team-a").unwrap();
            let recovered = match &set.controller {
                ControllerResource::Job(j) => from_job(j),
                ControllerResource::Deployment(d) => from_deployment(d),
                ControllerResource::StatefulSet(s) => from_stateful_set(s),
            };
            assert_eq!(recovered.kind, kind);
            assert_eq!(recovered.metadata.name, "round-trip");
            assert_eq!(recovered.metadata.namespace, "team-a");
            assert_eq!(recovered.environment.image, original.environment.image);
            assert_eq!(recovered.environment.command, original.environment.command);
            assert_eq!(recovered.resources.cpu, original.resources.cpu);
            assert_eq!(recovered.resources.memory, original.resources.memory);
            assert_eq!(recovered.resources.gpu_count, 2);
            assert_eq!(
                recovered.metadata.description.as_deref(),
                Some("round trip check")
            );
        }
    }

    #[test]
    fn test_round_trip_output_is_resubmittable() {
        let original = minimal_spec(JobKind::Inference, "svc1");
        let set = compile(&original, "default").unwrap();
        let recovered = match &set.controller {
            ControllerResource::Deployment(d) => from_deployment(d),
            other => panic!("expected Deployment, got {other:?}"),
        };
        // Compiling the recovered spec again must succeed without touching
        // any stored original.
        assert!(compile(&recovered, "default").is_ok());
    }

    #[test]
    fn test_foreign_pod_degrades_to_defaults() {
        let pod = Pod {
            metadata: k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
                name: Some("mystery-7d9f8c6b5-x2v4q".to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let spec = from_pod(&pod);
        assert_eq!(spec.kind, JobKind::Compute);
        assert_eq!(spec.metadata.name, "mystery");
        assert_eq!(spec.environment.image, DEFAULT_IMAGE);
        assert_eq!(spec.resources.cpu, DEFAULT_CPU);
        assert_eq!(spec.resources.memory, DEFAULT_MEMORY);
        assert!(compile(&spec, "default").is_ok());
    }

    #[test]
    fn test_default_pool_label_maps_back_to_absent() {
        let original = minimal_spec(JobKind::Compute, "svc1");
        let set = compile(&original, "default").unwrap();
        let recovered = match &set.controller {
            ControllerResource::Deployment(d) => from_deployment(d),
            other => panic!("expected Deployment, got {other:?}"),
        };
        assert!(recovered.resources.pool.is_none());
    }
}
