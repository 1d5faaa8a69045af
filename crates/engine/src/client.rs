//! Thin cluster access layer over the Kubernetes API
//!
//! The engine composes and interprets payloads; transport, auth and retry
//! belong to the kube client underneath. Every call re-reads the cluster —
//! there is no in-process cache, so resolutions never see staleness.

use std::time::Duration;

use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Event, Namespace, Pod, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::core::NamespaceResourceScope;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::compile::{CompiledResourceSet, ControllerResource};
use crate::error::{Error, Result};
use crate::names::{DEFAULT_NAMESPACE, LABEL_JOB_NAME, LABEL_MANAGED_NAMESPACE};

/// Interval between existence checks while waiting for a deletion
const DELETE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Upper bound on a deletion wait; expiry means "unconfirmed", not failure
const DELETE_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of an apply: whether the controller was created or replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitAction {
    Created,
    Updated,
}

impl SubmitAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitAction::Created => "created",
            SubmitAction::Updated => "updated",
        }
    }
}

/// Handle to the cluster; cheap to clone
#[derive(Clone)]
pub struct ClusterClient {
    client: kube::Client,
}

impl ClusterClient {
    /// Connect using the ambient kubeconfig or in-cluster environment
    pub async fn connect() -> Result<Self> {
        let client = kube::Client::try_default()
            .await
            .map_err(|e| Error::Transport(format!("failed to build cluster client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing kube client (used by embedding callers)
    pub fn from_client(client: kube::Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: kube::Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Namespaces known to host managed jobs: those carrying the namespace
    /// marker label, always including the default namespace.
    pub async fn search_namespaces(&self) -> Result<Vec<String>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let params = ListParams::default().labels(LABEL_MANAGED_NAMESPACE);
        let marked = api.list(&params).await?;
        let mut namespaces: Vec<String> = marked
            .items
            .into_iter()
            .filter_map(|ns| ns.metadata.name)
            .collect();
        if !namespaces.iter().any(|ns| ns == DEFAULT_NAMESPACE) {
            namespaces.push(DEFAULT_NAMESPACE.to_string());
        }
        Ok(namespaces)
    }

    pub async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>> {
        Ok(self
            .api::<Deployment>(namespace)
            .list(&ListParams::default())
            .await?
            .items)
    }

    pub async fn list_jobs(&self, namespace: &str) -> Result<Vec<Job>> {
        Ok(self
            .api::<Job>(namespace)
            .list(&ListParams::default())
            .await?
            .items)
    }

    pub async fn list_stateful_sets(&self, namespace: &str) -> Result<Vec<StatefulSet>> {
        Ok(self
            .api::<StatefulSet>(namespace)
            .list(&ListParams::default())
            .await?
            .items)
    }

    pub async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>> {
        Ok(self
            .api::<Pod>(namespace)
            .list(&ListParams::default())
            .await?
            .items)
    }

    /// Pods carrying the given logical job name label
    pub async fn pods_for_job(&self, namespace: &str, logical_name: &str) -> Result<Vec<Pod>> {
        let params = ListParams::default().labels(&format!("{LABEL_JOB_NAME}={logical_name}"));
        Ok(self.api::<Pod>(namespace).list(&params).await?.items)
    }

    /// Events concerning the named object, oldest first, as display strings
    pub async fn events_for(&self, namespace: &str, name: &str) -> Result<Vec<String>> {
        let params = ListParams::default().fields(&format!("involvedObject.name={name}"));
        let events = self.api::<Event>(namespace).list(&params).await?;
        Ok(events
            .items
            .iter()
            .map(|event| {
                format!(
                    "[{}] {}: {}",
                    event.type_.as_deref().unwrap_or("Normal"),
                    event.reason.as_deref().unwrap_or("-"),
                    event.message.as_deref().unwrap_or("-"),
                )
            })
            .collect())
    }

    /// Write a compiled resource set to the cluster.
    ///
    /// Create vs update is decided solely by whether a resource with the
    /// canonical name already exists. The returned action describes the
    /// controller; endpoint and autoscaler follow the same rule silently.
    pub async fn apply(&self, set: &CompiledResourceSet) -> Result<SubmitAction> {
        let namespace = set.namespace().to_string();
        let action = match &set.controller {
            ControllerResource::Job(job) => {
                apply_resource(&self.api::<Job>(&namespace), job).await?
            }
            ControllerResource::Deployment(deployment) => {
                apply_resource(&self.api::<Deployment>(&namespace), deployment).await?
            }
            ControllerResource::StatefulSet(stateful_set) => {
                apply_resource(&self.api::<StatefulSet>(&namespace), stateful_set).await?
            }
        };
        if let Some(service) = &set.endpoint {
            apply_resource(&self.api::<Service>(&namespace), service).await?;
        }
        if let Some(autoscaler) = &set.autoscaler {
            apply_resource(&self.api::<HorizontalPodAutoscaler>(&namespace), autoscaler).await?;
        }
        info!(
            name = set.name(),
            namespace = namespace.as_str(),
            action = action.as_str(),
            "applied resource set"
        );
        Ok(action)
    }

    /// Delete a run-to-completion controller; `Ok(false)` when already gone
    pub async fn delete_job(&self, namespace: &str, name: &str) -> Result<bool> {
        delete_resource(&self.api::<Job>(namespace), name).await
    }

    pub async fn delete_deployment(&self, namespace: &str, name: &str) -> Result<bool> {
        delete_resource(&self.api::<Deployment>(namespace), name).await
    }

    pub async fn delete_stateful_set(&self, namespace: &str, name: &str) -> Result<bool> {
        delete_resource(&self.api::<StatefulSet>(namespace), name).await
    }

    pub async fn delete_pod(&self, namespace: &str, name: &str) -> Result<bool> {
        delete_resource(&self.api::<Pod>(namespace), name).await
    }

    /// Delete the derived endpoint. A missing endpoint is tolerated; it
    /// self-heals on the next describe anyway.
    pub async fn delete_service(&self, namespace: &str, name: &str) -> Result<bool> {
        delete_resource(&self.api::<Service>(namespace), name).await
    }

    pub async fn delete_autoscaler(&self, namespace: &str, name: &str) -> Result<bool> {
        delete_resource(&self.api::<HorizontalPodAutoscaler>(namespace), name).await
    }

    /// Poll until the named pod is no longer visible, bounded by the fixed
    /// timeout. Returns whether disappearance was confirmed; expiry is not an
    /// error because the mutating request was already accepted.
    pub async fn wait_pod_deleted(&self, namespace: &str, name: &str) -> Result<bool> {
        let api = self.api::<Pod>(namespace);
        let deadline = tokio::time::Instant::now() + DELETE_WAIT_TIMEOUT;
        loop {
            match api.get_opt(name).await? {
                None => return Ok(true),
                Some(_) if tokio::time::Instant::now() >= deadline => {
                    warn!(name, namespace, "deletion not yet visible; giving up the wait");
                    return Ok(false);
                }
                Some(_) => tokio::time::sleep(DELETE_POLL_INTERVAL).await,
            }
        }
    }
}

/// Create the resource, or replace it when a same-named one already exists
async fn apply_resource<K>(api: &Api<K>, resource: &K) -> Result<SubmitAction>
where
    K: kube::Resource<DynamicType = ()>
        + Clone
        + Serialize
        + DeserializeOwned
        + std::fmt::Debug,
{
    let name = resource
        .meta()
        .name
        .clone()
        .ok_or_else(|| Error::InvalidSpec("compiled resource has no name".to_string()))?;
    match api.get_opt(&name).await? {
        Some(existing) => {
            debug!(name = name.as_str(), "resource exists; replacing");
            let mut replacement = resource.clone();
            copy_identity(existing.meta(), replacement.meta_mut());
            api.replace(&name, &PostParams::default(), &replacement)
                .await?;
            Ok(SubmitAction::Updated)
        }
        None => {
            debug!(name = name.as_str(), "resource absent; creating");
            api.create(&PostParams::default(), resource).await?;
            Ok(SubmitAction::Created)
        }
    }
}

/// Carry over the server-assigned identity fields a replace call requires
fn copy_identity(existing: &ObjectMeta, replacement: &mut ObjectMeta) {
    replacement.resource_version = existing.resource_version.clone();
    replacement.uid = existing.uid.clone();
}

/// Delete, mapping "already gone" to `Ok(false)` instead of an error
async fn delete_resource<K>(api: &Api<K>, name: &str) -> Result<bool>
where
    K: kube::Resource<DynamicType = ()> + Clone + DeserializeOwned + std::fmt::Debug,
{
    match api.delete(name, &DeleteParams::default()).await {
        Ok(_) => Ok(true),
        Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(false),
        Err(e) => Err(e.into()),
    }
}
