//! Shared pod template construction
//!
//! Labels, annotations, container, probes, volumes and placement are built
//! here once; the controller builders wrap the resulting template in their
//! own shapes.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, HTTPGetAction, HostPathVolumeSource, LocalObjectReference,
    PodSpec, PodTemplateSpec, Probe, ResourceRequirements, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use super::scheduling;
use crate::names::{
    ANNOTATION_DESCRIPTION, ANNOTATION_GPU_FRACTION, DEFAULT_POOL, GPU_RESOURCE, LABEL_GPU_TYPE,
    LABEL_JOB_NAME, LABEL_JOB_TYPE, LABEL_POOL, LABEL_PORT, LABEL_PRIORITY,
};
use crate::spec::{JobKind, JobSpec};

/// Env var names the compiler itself injects; the reverse mapper folds these
/// back into metadata instead of the environment list.
pub const ENV_EPOCHS: &str = "GWM_EPOCHS";
pub const ENV_BATCH_SIZE: &str = "GWM_BATCH_SIZE";

/// The service port a compiled job will expose, after defaulting.
/// Training exposes none; notebooks always use the fixed interactive port.
pub fn service_port(spec: &JobSpec) -> Option<u16> {
    match spec.kind {
        JobKind::Training => None,
        JobKind::Notebook => Some(super::INTERACTIVE_PORT),
        JobKind::Inference | JobKind::Compute => {
            Some(if spec.service.port != 0 {
                spec.service.port
            } else {
                spec.kind.default_port().unwrap_or(8000)
            })
        }
    }
}

/// Label set written to the controller and its pod template.
/// The pool label records "default" explicitly even though default-pool
/// membership is the absence of the node label, so inventory queries can
/// filter on it.
pub fn job_labels(spec: &JobSpec) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(LABEL_JOB_NAME.to_string(), spec.metadata.name.clone());
    labels.insert(LABEL_JOB_TYPE.to_string(), spec.kind.as_str().to_string());
    labels.insert(
        LABEL_PRIORITY.to_string(),
        spec.metadata.priority.as_str().to_string(),
    );
    labels.insert(
        LABEL_POOL.to_string(),
        spec.resources
            .pool
            .clone()
            .unwrap_or_else(|| DEFAULT_POOL.to_string()),
    );
    if let Some(gpu_type) = &spec.resources.gpu_type {
        labels.insert(LABEL_GPU_TYPE.to_string(), gpu_type.clone());
    }
    if let Some(port) = service_port(spec) {
        labels.insert(LABEL_PORT.to_string(), port.to_string());
    }
    labels
}

/// Annotation set for the controller and its pod template; `None` when empty
pub fn job_annotations(spec: &JobSpec) -> Option<BTreeMap<String, String>> {
    let mut annotations = BTreeMap::new();
    if let Some(description) = &spec.metadata.description {
        annotations.insert(ANNOTATION_DESCRIPTION.to_string(), description.clone());
    }
    if let Some(share) = spec.resources.gpu_share {
        annotations.insert(ANNOTATION_GPU_FRACTION.to_string(), share.to_string());
    }
    if annotations.is_empty() {
        None
    } else {
        Some(annotations)
    }
}

/// Build the pod template shared by all controller shapes.
///
/// `restart_policy` is `Some("Never")` for run-to-completion pods and `None`
/// (platform default) for continuously-running shapes.
pub fn pod_template(spec: &JobSpec, restart_policy: Option<&str>) -> PodTemplateSpec {
    let placement = scheduling::placement_for(&spec.resources);
    let tier = scheduling::priority_tier(spec.metadata.priority);
    let (volumes, mounts) = workdir_volumes(spec);

    let container = Container {
        name: "main".to_string(),
        image: Some(spec.environment.image.clone()),
        command: non_empty(&spec.environment.command),
        args: non_empty(&spec.environment.args),
        env: env_vars(spec),
        ports: service_port(spec).map(|port| {
            vec![ContainerPort {
                container_port: i32::from(port),
                ..Default::default()
            }]
        }),
        resources: Some(container_resources(spec)),
        volume_mounts: if mounts.is_empty() { None } else { Some(mounts) },
        liveness_probe: health_probe(spec, 30),
        readiness_probe: health_probe(spec, 5),
        ..Default::default()
    };

    PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(job_labels(spec)),
            annotations: job_annotations(spec),
            ..Default::default()
        }),
        spec: Some(PodSpec {
            containers: vec![container],
            restart_policy: restart_policy.map(String::from),
            node_selector: placement.node_selector,
            affinity: placement.affinity,
            priority_class_name: Some(tier.class_name.to_string()),
            volumes: if volumes.is_empty() { None } else { Some(volumes) },
            image_pull_secrets: spec.environment.pull_secret.as_ref().map(|secret| {
                vec![LocalObjectReference {
                    name: Some(secret.clone()),
                }]
            }),
            ..Default::default()
        }),
    }
}

fn non_empty(items: &[String]) -> Option<Vec<String>> {
    if items.is_empty() {
        None
    } else {
        Some(items.to_vec())
    }
}

fn env_vars(spec: &JobSpec) -> Option<Vec<EnvVar>> {
    let mut vars: Vec<EnvVar> = spec
        .environment
        .env
        .iter()
        .map(|entry| EnvVar {
            name: entry.name.clone(),
            value: Some(entry.value.clone()),
            ..Default::default()
        })
        .collect();
    if let Some(epochs) = spec.metadata.epochs {
        vars.push(EnvVar {
            name: ENV_EPOCHS.to_string(),
            value: Some(epochs.to_string()),
            ..Default::default()
        });
    }
    if let Some(batch_size) = spec.metadata.batch_size {
        vars.push(EnvVar {
            name: ENV_BATCH_SIZE.to_string(),
            value: Some(batch_size.to_string()),
            ..Default::default()
        });
    }
    if vars.is_empty() {
        None
    } else {
        Some(vars)
    }
}

fn container_resources(spec: &JobSpec) -> ResourceRequirements {
    let mut limits = BTreeMap::new();
    let mut requests = BTreeMap::new();
    limits.insert("cpu".to_string(), Quantity(spec.resources.cpu.clone()));
    limits.insert("memory".to_string(), Quantity(spec.resources.memory.clone()));
    requests.insert("cpu".to_string(), Quantity(spec.resources.cpu.clone()));
    requests.insert("memory".to_string(), Quantity(spec.resources.memory.clone()));
    if spec.resources.gpu_count > 0 {
        limits.insert(
            GPU_RESOURCE.to_string(),
            Quantity(spec.resources.gpu_count.to_string()),
        );
    }
    ResourceRequirements {
        limits: Some(limits),
        requests: Some(requests),
        ..Default::default()
    }
}

/// HTTP probe against the declared health-check path; absent path means no
/// probes at all. Liveness starts at 30s, readiness at 5s, both every 10s.
fn health_probe(spec: &JobSpec, initial_delay: i32) -> Option<Probe> {
    let path = spec.service.health_check_path.as_ref()?;
    let port = service_port(spec)?;
    Some(Probe {
        http_get: Some(HTTPGetAction {
            path: Some(path.clone()),
            port: IntOrString::Int(i32::from(port)),
            ..Default::default()
        }),
        initial_delay_seconds: Some(initial_delay),
        period_seconds: Some(10),
        ..Default::default()
    })
}

/// One index-named host-path volume per workdir, created on the node when
/// missing, mounted at the same path inside the container.
fn workdir_volumes(spec: &JobSpec) -> (Vec<Volume>, Vec<VolumeMount>) {
    let mut volumes = Vec::new();
    let mut mounts = Vec::new();
    for (i, dir) in spec.storage.workdirs.iter().enumerate() {
        let name = format!("workdir-{i}");
        volumes.push(Volume {
            name: name.clone(),
            host_path: Some(HostPathVolumeSource {
                path: dir.clone(),
                type_: Some("DirectoryOrCreate".to_string()),
            }),
            ..Default::default()
        });
        mounts.push(VolumeMount {
            name,
            mount_path: dir.clone(),
            ..Default::default()
        });
    }
    (volumes, mounts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::tests::minimal_spec;

    #[test]
    fn test_probes_only_with_health_check_path() {
        let mut spec = minimal_spec(JobKind::Inference, "svc1");
        let template = pod_template(&spec, None);
        let container = &template.spec.unwrap().containers[0];
        assert!(container.liveness_probe.is_none());
        assert!(container.readiness_probe.is_none());

        spec.service.health_check_path = Some("/healthz".to_string());
        let template = pod_template(&spec, None);
        let container = &template.spec.unwrap().containers[0];
        let liveness = container.liveness_probe.as_ref().unwrap();
        assert_eq!(liveness.initial_delay_seconds, Some(30));
        assert_eq!(liveness.period_seconds, Some(10));
        let readiness = container.readiness_probe.as_ref().unwrap();
        assert_eq!(readiness.initial_delay_seconds, Some(5));
        assert_eq!(readiness.period_seconds, Some(10));
    }

    #[test]
    fn test_workdirs_become_indexed_host_paths() {
        let mut spec = minimal_spec(JobKind::Training, "t1");
        spec.storage.workdirs = vec!["/data".to_string(), "/checkpoints".to_string()];
        let template = pod_template(&spec, Some("Never"));
        let pod_spec = template.spec.unwrap();
        let volumes = pod_spec.volumes.unwrap();
        assert_eq!(volumes.len(), 2);
        assert_eq!(volumes[0].name, "workdir-0");
        let host_path = volumes[1].host_path.as_ref().unwrap();
        assert_eq!(host_path.path, "/checkpoints");
        assert_eq!(host_path.type_.as_deref(), Some("DirectoryOrCreate"));
        let mounts = pod_spec.containers[0].volume_mounts.as_ref().unwrap();
        assert_eq!(mounts[1].mount_path, "/checkpoints");
    }

    #[test]
    fn test_gpu_limit_only_when_requested() {
        let mut spec = minimal_spec(JobKind::Training, "t1");
        spec.resources.gpu_count = 2;
        let template = pod_template(&spec, Some("Never"));
        let resources = template.spec.unwrap().containers[0]
            .resources
            .clone()
            .unwrap();
        let limits = resources.limits.unwrap();
        assert_eq!(limits[GPU_RESOURCE].0, "2");

        spec.resources.gpu_count = 0;
        let template = pod_template(&spec, Some("Never"));
        let resources = template.spec.unwrap().containers[0]
            .resources
            .clone()
            .unwrap();
        assert!(!resources.limits.unwrap().contains_key(GPU_RESOURCE));
    }

    #[test]
    fn test_description_lands_in_annotations_not_labels() {
        let mut spec = minimal_spec(JobKind::Training, "t1");
        spec.metadata.description = Some("Fine-tune BERT — überlang".to_string());
        let labels = job_labels(&spec);
        assert!(labels.values().all(|v| !v.contains(' ')));
        let annotations = job_annotations(&spec).unwrap();
        assert_eq!(
            annotations[ANNOTATION_DESCRIPTION],
            "Fine-tune BERT — überlang"
        );
    }

    #[test]
    fn test_epochs_and_batch_size_injected_as_env() {
        let mut spec = minimal_spec(JobKind::Training, "t1");
        spec.metadata.epochs = Some(10);
        spec.metadata.batch_size = Some(32);
        let template = pod_template(&spec, Some("Never"));
        let env = template.spec.unwrap().containers[0].env.clone().unwrap();
        assert!(env.iter().any(|v| v.name == ENV_EPOCHS && v.value.as_deref() == Some("10")));
        assert!(env.iter().any(|v| v.name == ENV_BATCH_SIZE && v.value.as_deref() == Some("32")));
    }

    #[test]
    fn test_priority_class_attached() {
        let spec = minimal_spec(JobKind::Notebook, "nb1");
        let template = pod_template(&spec, None);
        assert_eq!(
            template.spec.unwrap().priority_class_name.as_deref(),
            Some("gwm-medium")
        );
    }
}
