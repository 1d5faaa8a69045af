//! Resolver and disambiguator
//!
//! Locates a logical job among ambiguous, possibly-orphaned native objects
//! scattered across namespaces. The search runs as explicit phases, each a
//! function returning a typed outcome: controller search, pod search (only
//! for pod-shaped identifiers), then disambiguation. Ambiguity and not-found
//! are distinct, never silently resolved to one candidate.

use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use serde::Serialize;
use tracing::debug;

use crate::client::ClusterClient;
use crate::error::Result;
use crate::reverse;
use crate::spec::JobKind;
use crate::status::{self, StatusReport};

/// Native controller shape a job resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ControllerShape {
    RunToCompletion,
    ContinuouslyRunning,
    StableIdentity,
}

/// Shape of the resolved resource: a controller, or bare (orphaned) pods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResourceShape {
    Controller(ControllerShape),
    Pod,
}

impl std::fmt::Display for ResourceShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ResourceShape::Controller(ControllerShape::RunToCompletion) => "run-to-completion",
            ResourceShape::Controller(ControllerShape::ContinuouslyRunning) => {
                "continuously-running"
            }
            ResourceShape::Controller(ControllerShape::StableIdentity) => "stable-identity",
            ResourceShape::Pod => "pod",
        };
        f.write_str(text)
    }
}

/// One resolution candidate reported back for disambiguation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmbiguityCandidate {
    pub namespace: String,
    pub detected_kind: String,
}

impl AmbiguityCandidate {
    pub fn display(&self) -> String {
        format!("{}/{}", self.namespace, self.detected_kind)
    }
}

/// The native object backing a resolved job, kept for describe/delete
#[derive(Debug, Clone)]
pub enum NativeObject {
    Job(Box<Job>),
    Deployment(Box<Deployment>),
    StatefulSet(Box<StatefulSet>),
    /// Orphaned pods sharing the logical job name
    Pods(Vec<Pod>),
}

/// A fully resolved logical job, computed on demand and never cached
#[derive(Debug, Clone)]
pub struct ResolvedJob {
    pub logical_name: String,
    pub namespace: String,
    pub detected_kind: Option<JobKind>,
    pub shape: ResourceShape,
    /// Short summary of the native status payload
    pub native_status: String,
    pub normalized: StatusReport,
    /// Names of pods belonging to the job
    pub children: Vec<String>,
    /// Same-namespace candidates that lost the pick (narrow ambiguity)
    pub ambiguity_candidates: Vec<AmbiguityCandidate>,
    pub native: NativeObject,
}

/// Outcome of a resolution
#[derive(Debug)]
pub enum Resolution {
    Resolved(Box<ResolvedJob>),
    /// Matches span distinct namespaces; pass a namespace to disambiguate
    Ambiguous(Vec<AmbiguityCandidate>),
    NotFound,
}

/// An identifier matches a candidate name exactly, or after stripping the
/// generated suffix / stable-identity ordinal from the identifier.
pub fn matches_identifier(identifier: &str, candidate_name: &str) -> bool {
    if identifier == candidate_name {
        return true;
    }
    reverse::strip_generated_suffix(identifier) == candidate_name
        || reverse::strip_ordinal(identifier) == candidate_name
}

/// One candidate gathered during the search phases
#[derive(Debug, Clone)]
struct Candidate {
    namespace: String,
    detected_kind: Option<JobKind>,
    shape: ResourceShape,
    native: NativeObject,
}

impl Candidate {
    fn ambiguity(&self) -> AmbiguityCandidate {
        AmbiguityCandidate {
            namespace: self.namespace.clone(),
            detected_kind: self
                .detected_kind
                .map(|k| k.as_str().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

fn detected_kind(labels: Option<&std::collections::BTreeMap<String, String>>) -> Option<JobKind> {
    labels
        .and_then(|l| l.get(crate::names::LABEL_JOB_TYPE))
        .and_then(|v| JobKind::from_label(v))
}

/// Phase: search controller-shaped resources in one namespace
async fn controller_candidates(
    client: &ClusterClient,
    namespace: &str,
    identifier: &str,
) -> Result<Vec<Candidate>> {
    let mut found = Vec::new();
    for deployment in client.list_deployments(namespace).await? {
        let name = deployment.metadata.name.as_deref().unwrap_or_default();
        if matches_identifier(identifier, name) {
            found.push(Candidate {
                namespace: namespace.to_string(),
                detected_kind: detected_kind(deployment.metadata.labels.as_ref()),
                shape: ResourceShape::Controller(ControllerShape::ContinuouslyRunning),
                native: NativeObject::Deployment(Box::new(deployment)),
            });
        }
    }
    for job in client.list_jobs(namespace).await? {
        let name = job.metadata.name.as_deref().unwrap_or_default();
        if matches_identifier(identifier, name) {
            found.push(Candidate {
                namespace: namespace.to_string(),
                detected_kind: detected_kind(job.metadata.labels.as_ref()),
                shape: ResourceShape::Controller(ControllerShape::RunToCompletion),
                native: NativeObject::Job(Box::new(job)),
            });
        }
    }
    for stateful_set in client.list_stateful_sets(namespace).await? {
        let name = stateful_set.metadata.name.as_deref().unwrap_or_default();
        if matches_identifier(identifier, name) {
            found.push(Candidate {
                namespace: namespace.to_string(),
                detected_kind: detected_kind(stateful_set.metadata.labels.as_ref()),
                shape: ResourceShape::Controller(ControllerShape::StableIdentity),
                native: NativeObject::StatefulSet(Box::new(stateful_set)),
            });
        }
    }
    Ok(found)
}

/// Phase: search pod-shaped resources; only entered when the identifier
/// itself looks pod-shaped, to avoid false positives from substring matches.
async fn pod_candidates(
    client: &ClusterClient,
    namespace: &str,
    identifier: &str,
) -> Result<Vec<Candidate>> {
    let mut found = Vec::new();
    for pod in client.list_pods(namespace).await? {
        let name = pod.metadata.name.as_deref().unwrap_or_default();
        if name == identifier || matches_identifier(identifier, &reverse::strip_generated_suffix(name))
        {
            found.push(Candidate {
                namespace: namespace.to_string(),
                detected_kind: detected_kind(pod.metadata.labels.as_ref()),
                shape: ResourceShape::Pod,
                native: NativeObject::Pods(vec![pod]),
            });
        }
    }
    Ok(found)
}

/// Phase: collapse the match set into a typed outcome. Matches spanning
/// distinct namespaces are Ambiguous; multiple matches within one namespace
/// resolve to the best candidate (controllers beat pods) with the rest
/// reported as narrow ambiguity candidates.
fn disambiguate(identifier: &str, mut matches: Vec<Candidate>) -> DisambiguationOutcome {
    if matches.is_empty() {
        return DisambiguationOutcome::NotFound;
    }
    let mut namespaces: Vec<&str> = matches.iter().map(|c| c.namespace.as_str()).collect();
    namespaces.sort_unstable();
    namespaces.dedup();
    if namespaces.len() > 1 {
        return DisambiguationOutcome::Ambiguous(
            matches.iter().map(Candidate::ambiguity).collect(),
        );
    }
    // Controllers win over bare pods within one namespace.
    matches.sort_by_key(|c| matches!(c.shape, ResourceShape::Pod));
    let rest: Vec<AmbiguityCandidate> = matches[1..].iter().map(Candidate::ambiguity).collect();
    let chosen = matches.swap_remove(0);
    debug!(
        identifier,
        namespace = chosen.namespace.as_str(),
        shape = %chosen.shape,
        "resolved identifier"
    );
    DisambiguationOutcome::Chosen(Box::new(chosen), rest)
}

#[derive(Debug)]
enum DisambiguationOutcome {
    Chosen(Box<Candidate>, Vec<AmbiguityCandidate>),
    Ambiguous(Vec<AmbiguityCandidate>),
    NotFound,
}

/// Resolve an identifier to exactly one job, a definitive ambiguity, or
/// not-found. Every call re-reads the cluster.
pub async fn resolve(
    client: &ClusterClient,
    identifier: &str,
    namespace: Option<&str>,
) -> Result<Resolution> {
    let namespaces = match namespace {
        Some(ns) => vec![ns.to_string()],
        None => client.search_namespaces().await?,
    };

    let mut matches = Vec::new();
    for ns in &namespaces {
        matches.extend(controller_candidates(client, ns, identifier).await?);
    }

    // Pod search only makes sense for identifiers that look like pod names;
    // otherwise a bare NotFound is the definitive answer.
    if matches.is_empty() && reverse::looks_pod_shaped(identifier) {
        for ns in &namespaces {
            matches.extend(pod_candidates(client, ns, identifier).await?);
        }
    }

    match disambiguate(identifier, matches) {
        DisambiguationOutcome::NotFound => Ok(Resolution::NotFound),
        DisambiguationOutcome::Ambiguous(candidates) => Ok(Resolution::Ambiguous(candidates)),
        DisambiguationOutcome::Chosen(candidate, narrow) => {
            let job = materialize(client, *candidate, narrow).await?;
            Ok(Resolution::Resolved(Box::new(job)))
        }
    }
}

/// Fill in status, children and logical name for the chosen candidate
async fn materialize(
    client: &ClusterClient,
    candidate: Candidate,
    ambiguity_candidates: Vec<AmbiguityCandidate>,
) -> Result<ResolvedJob> {
    let (logical_name, native_status, normalized) = match &candidate.native {
        NativeObject::Job(job) => {
            let status = job.status.clone().unwrap_or_default();
            (
                reverse::strip_generated_suffix(job.metadata.name.as_deref().unwrap_or_default()),
                format!(
                    "active {} / succeeded {} / failed {}",
                    status.active.unwrap_or(0),
                    status.succeeded.unwrap_or(0),
                    status.failed.unwrap_or(0)
                ),
                status::from_job(job),
            )
        }
        NativeObject::Deployment(deployment) => {
            let status = deployment.status.clone().unwrap_or_default();
            (
                reverse::strip_generated_suffix(
                    deployment.metadata.name.as_deref().unwrap_or_default(),
                ),
                format!(
                    "ready {}/{}",
                    status.ready_replicas.unwrap_or(0),
                    status.replicas.unwrap_or(0)
                ),
                status::from_deployment(deployment),
            )
        }
        NativeObject::StatefulSet(stateful_set) => {
            let status = stateful_set.status.clone().unwrap_or_default();
            (
                reverse::strip_ordinal(
                    stateful_set.metadata.name.as_deref().unwrap_or_default(),
                ),
                format!(
                    "ready {}/{}",
                    status.ready_replicas.unwrap_or(0),
                    status.replicas
                ),
                status::from_stateful_set(stateful_set),
            )
        }
        NativeObject::Pods(pods) => {
            let pod = &pods[0];
            let phase = pod
                .status
                .as_ref()
                .and_then(|s| s.phase.clone())
                .unwrap_or_else(|| "Unknown".to_string());
            (
                reverse::strip_generated_suffix(pod.metadata.name.as_deref().unwrap_or_default()),
                phase,
                status::from_pod(pod),
            )
        }
    };

    let children = match &candidate.native {
        NativeObject::Pods(pods) => pods
            .iter()
            .filter_map(|p| p.metadata.name.clone())
            .collect(),
        _ => client
            .pods_for_job(&candidate.namespace, &logical_name)
            .await?
            .into_iter()
            .filter_map(|p| p.metadata.name)
            .collect(),
    };

    Ok(ResolvedJob {
        logical_name,
        namespace: candidate.namespace,
        detected_kind: candidate.detected_kind,
        shape: candidate.shape,
        native_status,
        normalized,
        children,
        ambiguity_candidates,
        native: candidate.native,
    })
}
