//! Forward compiler: JobSpec → native resource set
//!
//! Each job kind maps to one controller shape:
//! - training → run-to-completion `batch/v1 Job`, no endpoint
//! - inference / compute → continuously-running `apps/v1 Deployment` plus a
//!   network endpoint (compute may expose a node-reachable port)
//! - notebook → stable-identity `apps/v1 StatefulSet`, single replica, plus
//!   an endpoint on the fixed interactive port
//!
//! Compilation is pure: it composes payloads but never talks to the cluster.

mod controllers;
pub(crate) mod pod;
mod scheduling;

pub use controllers::{INTERACTIVE_PORT, RETENTION_SECONDS, RETRY_LIMIT};
pub use scheduling::{priority_tier, PriorityTier};

use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Service;

use crate::error::{Error, Result};
use crate::names;
use crate::spec::{JobKind, JobSpec};

/// The controller descriptor of a compiled job, one variant per native shape
#[derive(Debug, Clone)]
pub enum ControllerResource {
    /// Run-to-completion (training)
    Job(Job),
    /// Continuously-running (inference, compute)
    Deployment(Deployment),
    /// Stable-identity (notebook)
    StatefulSet(StatefulSet),
}

impl ControllerResource {
    /// Canonical name of the controller (always the logical job name)
    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> &str {
        self.metadata().namespace.as_deref().unwrap_or_default()
    }

    fn metadata(&self) -> &k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
        match self {
            ControllerResource::Job(j) => &j.metadata,
            ControllerResource::Deployment(d) => &d.metadata,
            ControllerResource::StatefulSet(s) => &s.metadata,
        }
    }
}

/// Everything a submission writes to the cluster for one job
#[derive(Debug, Clone)]
pub struct CompiledResourceSet {
    pub controller: ControllerResource,
    /// Derived Service, named `svc-<job>`; absent for training
    pub endpoint: Option<Service>,
    /// Horizontal autoscaler; only inference with more than one replica
    pub autoscaler: Option<HorizontalPodAutoscaler>,
}

impl CompiledResourceSet {
    pub fn name(&self) -> &str {
        self.controller.name()
    }

    pub fn namespace(&self) -> &str {
        self.controller.namespace()
    }
}

/// Compile a validated job description into its native resource set.
///
/// The target namespace is the explicit `namespace` argument when non-empty,
/// else the spec's own namespace, else `default`. Missing image is the only
/// failure the compiler raises itself; everything else is checked by
/// [`JobSpec::validate`] beforehand.
pub fn compile(spec: &JobSpec, namespace: &str) -> Result<CompiledResourceSet> {
    spec.validate()?;
    if spec.environment.image.is_empty() {
        return Err(Error::InvalidSpec("image is required".to_string()));
    }

    let ns = if !namespace.is_empty() {
        namespace
    } else if !spec.metadata.namespace.is_empty() {
        &spec.metadata.namespace
    } else {
        names::DEFAULT_NAMESPACE
    };

    let set = match spec.kind {
        JobKind::Training => CompiledResourceSet {
            controller: ControllerResource::Job(controllers::training_job(spec, ns)),
            endpoint: None,
            autoscaler: None,
        },
        JobKind::Inference | JobKind::Compute => CompiledResourceSet {
            controller: ControllerResource::Deployment(controllers::service_deployment(spec, ns)),
            endpoint: Some(controllers::endpoint_service(spec, ns)),
            autoscaler: controllers::autoscaler(spec, ns),
        },
        JobKind::Notebook => CompiledResourceSet {
            controller: ControllerResource::StatefulSet(controllers::notebook_stateful_set(
                spec, ns,
            )),
            endpoint: Some(controllers::endpoint_service(spec, ns)),
            autoscaler: None,
        },
    };
    Ok(set)
}
