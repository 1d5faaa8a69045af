//! Controller, endpoint and autoscaler builders
//!
//! One builder per native controller shape, all wrapping the shared pod
//! template from [`super::pod`].

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, StatefulSet, StatefulSetSpec};
use k8s_openapi::api::autoscaling::v2::{
    CrossVersionObjectReference, HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec, MetricSpec,
    MetricTarget, ResourceMetricSource,
};
use k8s_openapi::api::batch::v1::{Job, JobSpec as BatchJobSpec};
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use super::pod;
use crate::names::{self, LABEL_JOB_NAME};
use crate::spec::{JobKind, JobSpec};

/// Bounded retry count for run-to-completion controllers
pub const RETRY_LIMIT: i32 = 3;

/// Post-completion retention window for run-to-completion controllers
pub const RETENTION_SECONDS: i32 = 86_400;

/// Fixed interactive port for notebooks
pub const INTERACTIVE_PORT: u16 = 8888;

fn controller_metadata(spec: &JobSpec, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(names::canonical_name(&spec.metadata.name)),
        namespace: Some(namespace.to_string()),
        labels: Some(pod::job_labels(spec)),
        annotations: pod::job_annotations(spec),
        ..Default::default()
    }
}

fn pod_selector(spec: &JobSpec) -> LabelSelector {
    let mut match_labels = BTreeMap::new();
    match_labels.insert(LABEL_JOB_NAME.to_string(), spec.metadata.name.clone());
    LabelSelector {
        match_labels: Some(match_labels),
        ..Default::default()
    }
}

/// Run-to-completion controller for training jobs
pub fn training_job(spec: &JobSpec, namespace: &str) -> Job {
    Job {
        metadata: controller_metadata(spec, namespace),
        spec: Some(BatchJobSpec {
            backoff_limit: Some(RETRY_LIMIT),
            ttl_seconds_after_finished: Some(RETENTION_SECONDS),
            template: pod::pod_template(spec, Some("Never")),
            ..Default::default()
        }),
        status: None,
    }
}

/// Continuously-running controller for inference and compute jobs
pub fn service_deployment(spec: &JobSpec, namespace: &str) -> Deployment {
    Deployment {
        metadata: controller_metadata(spec, namespace),
        spec: Some(DeploymentSpec {
            replicas: Some(spec.service.replicas),
            selector: pod_selector(spec),
            template: pod::pod_template(spec, None),
            ..Default::default()
        }),
        status: None,
    }
}

/// Stable-identity, single-replica controller for notebooks. The replica
/// count is fixed regardless of the declared service configuration.
pub fn notebook_stateful_set(spec: &JobSpec, namespace: &str) -> StatefulSet {
    StatefulSet {
        metadata: controller_metadata(spec, namespace),
        spec: Some(StatefulSetSpec {
            replicas: Some(1),
            service_name: names::endpoint_name(&spec.metadata.name),
            selector: pod_selector(spec),
            template: pod::pod_template(spec, None),
            ..Default::default()
        }),
        status: None,
    }
}

/// Derived network endpoint, named `svc-<job>`. Compute jobs that declare an
/// explicit port get a node-reachable (NodePort) endpoint; everything else
/// stays cluster-internal.
pub fn endpoint_service(spec: &JobSpec, namespace: &str) -> Service {
    let port = pod::service_port(spec).unwrap_or(8000);
    let node_reachable = spec.kind == JobKind::Compute && spec.service.port != 0;
    let mut selector = BTreeMap::new();
    selector.insert(LABEL_JOB_NAME.to_string(), spec.metadata.name.clone());
    Service {
        metadata: ObjectMeta {
            name: Some(names::endpoint_name(&spec.metadata.name)),
            namespace: Some(namespace.to_string()),
            labels: Some(pod::job_labels(spec)),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(selector),
            ports: Some(vec![ServicePort {
                port: i32::from(port),
                target_port: Some(IntOrString::Int(i32::from(port))),
                ..Default::default()
            }]),
            type_: node_reachable.then(|| "NodePort".to_string()),
            ..Default::default()
        }),
        status: None,
    }
}

/// Horizontal autoscaler for inference jobs declaring more than one replica:
/// scales between 1 and the declared count on 80% CPU utilization.
pub fn autoscaler(spec: &JobSpec, namespace: &str) -> Option<HorizontalPodAutoscaler> {
    if spec.kind != JobKind::Inference || spec.service.replicas <= 1 {
        return None;
    }
    Some(HorizontalPodAutoscaler {
        metadata: ObjectMeta {
            name: Some(names::canonical_name(&spec.metadata.name)),
            namespace: Some(namespace.to_string()),
            labels: Some(pod::job_labels(spec)),
            ..Default::default()
        },
        spec: Some(HorizontalPodAutoscalerSpec {
            scale_target_ref: CrossVersionObjectReference {
                api_version: Some("apps/v1".to_string()),
                kind: "Deployment".to_string(),
                name: names::canonical_name(&spec.metadata.name),
            },
            min_replicas: Some(1),
            max_replicas: spec.service.replicas,
            metrics: Some(vec![MetricSpec {
                type_: "Resource".to_string(),
                resource: Some(ResourceMetricSource {
                    name: "cpu".to_string(),
                    target: MetricTarget {
                        type_: "Utilization".to_string(),
                        average_utilization: Some(80),
                        ..Default::default()
                    },
                }),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        status: None,
    })
}
