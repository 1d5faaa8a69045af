//! High-level operations exposed to CLI/HTTP collaborators
//!
//! Each operation is a single blocking request/response round against the
//! cluster; nothing is cached between calls and nothing runs in the
//! background. Concurrent mutation of the same name is a documented hazard
//! left to the platform's per-object concurrency control.

use serde::Serialize;
use tracing::{info, warn};

use crate::client::ClusterClient;
use crate::compile::CompiledResourceSet;
use crate::error::{Error, Result};
use crate::names;
use crate::resolve::{self, NativeObject, Resolution, ResolvedJob};
use crate::reverse;
use crate::spec::JobSpec;
use crate::status::StatusReport;

/// Result of a submission
#[derive(Debug, Clone, Serialize)]
pub struct SubmitReceipt {
    /// "created" or "updated"
    pub action: String,
    pub canonical_name: String,
    pub namespace: String,
}

/// Submit a compiled resource set; create vs update is decided solely by
/// whether a same-named resource already exists.
pub async fn submit(client: &ClusterClient, set: &CompiledResourceSet) -> Result<SubmitReceipt> {
    let action = client.apply(set).await?;
    Ok(SubmitReceipt {
        action: action.as_str().to_string(),
        canonical_name: set.name().to_string(),
        namespace: set.namespace().to_string(),
    })
}

/// How to reach an endpoint-bearing job from inside the cluster
#[derive(Debug, Clone, Serialize)]
pub struct AccessMethods {
    pub service_dns: String,
    pub port: u16,
}

/// Human-readable "what is this" output for one resolved job
#[derive(Debug, Clone, Serialize)]
pub struct Description {
    pub status: StatusReport,
    /// Approximate, re-submittable job description
    pub spec: JobSpec,
    pub events: Vec<String>,
    pub access: Option<AccessMethods>,
}

/// Describe a resolved job: normalized status, reverse-mapped spec, recent
/// events and access methods for endpoint-bearing kinds.
pub async fn describe(client: &ClusterClient, job: &ResolvedJob) -> Result<Description> {
    let spec = match &job.native {
        NativeObject::Job(j) => reverse::from_job(j),
        NativeObject::Deployment(d) => reverse::from_deployment(d),
        NativeObject::StatefulSet(s) => reverse::from_stateful_set(s),
        NativeObject::Pods(pods) => reverse::from_pod(&pods[0]),
    };
    let events = client.events_for(&job.namespace, &job.logical_name).await?;
    let access = spec.kind.has_endpoint().then(|| AccessMethods {
        service_dns: format!(
            "{}.{}.svc.cluster.local",
            names::endpoint_name(&job.logical_name),
            job.namespace
        ),
        port: spec.service.port,
    });
    Ok(Description {
        status: job.normalized.clone(),
        spec,
        events,
        access,
    })
}

/// Result of a deletion
#[derive(Debug, Clone, Serialize)]
pub struct DeleteReport {
    pub deleted: bool,
    /// Whether the job was removed by deleting orphaned pods directly
    pub orphan_cleanup: bool,
    /// Whether disappearance was confirmed within the bounded wait
    pub confirmed: bool,
}

/// Delete a logical job.
///
/// A resolved controller is deleted together with its derived endpoint and
/// autoscaler. When no controller exists, pods labeled with the identifier
/// as their logical job name are deleted individually plus the shared
/// endpoint, in every namespace searched (orphan cleanup after the
/// controller vanished out-of-band).
/// `force` skips the bounded wait for visibility.
pub async fn delete(
    client: &ClusterClient,
    identifier: &str,
    namespace: Option<&str>,
    force: bool,
) -> Result<DeleteReport> {
    match resolve::resolve(client, identifier, namespace).await? {
        Resolution::Resolved(job) if !matches!(job.native, NativeObject::Pods(_)) => {
            delete_controller(client, &job, force).await
        }
        Resolution::Resolved(job) => {
            let pod_names = match &job.native {
                NativeObject::Pods(pods) => pods
                    .iter()
                    .filter_map(|p| p.metadata.name.clone())
                    .collect(),
                _ => Vec::new(),
            };
            delete_pods(client, &job.logical_name, &job.namespace, pod_names, force).await
        }
        Resolution::Ambiguous(candidates) => Err(Error::Ambiguous {
            identifier: identifier.to_string(),
            candidates: candidates.iter().map(|c| c.display()).collect(),
        }),
        Resolution::NotFound => {
            // The controller may have vanished out-of-band while its pods
            // linger; scan every candidate namespace by label before giving
            // up, and clean each one that still holds pods.
            let namespaces = match namespace {
                Some(ns) => vec![ns.to_string()],
                None => client.search_namespaces().await?,
            };
            let mut report: Option<DeleteReport> = None;
            for ns in &namespaces {
                if !client.pods_for_job(ns, identifier).await?.is_empty() {
                    let cleaned = orphan_cleanup(client, identifier, ns, force).await?;
                    report = Some(match report {
                        Some(acc) => merge_delete_reports(acc, cleaned),
                        None => cleaned,
                    });
                }
            }
            report.ok_or_else(|| Error::NotFound(identifier.to_string()))
        }
    }
}

async fn delete_controller(
    client: &ClusterClient,
    job: &ResolvedJob,
    force: bool,
) -> Result<DeleteReport> {
    let ns = &job.namespace;
    let name = &job.logical_name;
    match &job.native {
        NativeObject::Job(_) => {
            client.delete_job(ns, name).await?;
        }
        NativeObject::Deployment(_) => {
            client.delete_deployment(ns, name).await?;
            // Tolerate a missing autoscaler; most jobs never had one.
            client.delete_autoscaler(ns, name).await?;
        }
        NativeObject::StatefulSet(_) => {
            client.delete_stateful_set(ns, name).await?;
        }
        NativeObject::Pods(_) => unreachable!("pod-backed jobs take the orphan path"),
    }

    // Partial deletion is reported but does not flip overall success: a
    // missing endpoint self-heals on the next describe.
    if let Err(e) = client.delete_service(ns, &names::endpoint_name(name)).await {
        warn!(name = name.as_str(), error = %e, "endpoint deletion failed; continuing");
    }

    let confirmed = if force {
        false
    } else {
        confirm_children_gone(client, job).await?
    };
    info!(name = name.as_str(), namespace = ns.as_str(), "deleted job");
    Ok(DeleteReport {
        deleted: true,
        orphan_cleanup: false,
        confirmed,
    })
}

/// Orphan cleanup entered from the not-found fallback: gather linger-on pods
/// by their logical job name label, then delete them individually.
async fn orphan_cleanup(
    client: &ClusterClient,
    identifier: &str,
    namespace: &str,
    force: bool,
) -> Result<DeleteReport> {
    let names = client
        .pods_for_job(namespace, identifier)
        .await?
        .into_iter()
        .filter_map(|p| p.metadata.name)
        .collect();
    delete_pods(client, identifier, namespace, names, force).await
}

/// Delete a set of pods plus the shared endpoint they served
async fn delete_pods(
    client: &ClusterClient,
    logical_name: &str,
    namespace: &str,
    names: Vec<String>,
    force: bool,
) -> Result<DeleteReport> {
    for name in &names {
        client.delete_pod(namespace, name).await?;
    }
    if let Err(e) = client
        .delete_service(namespace, &names::endpoint_name(logical_name))
        .await
    {
        warn!(logical_name, error = %e, "endpoint deletion failed; continuing");
    }
    let mut confirmed = true;
    if !force {
        for name in &names {
            confirmed &= client.wait_pod_deleted(namespace, name).await?;
        }
    } else {
        confirmed = false;
    }
    info!(
        logical_name,
        namespace,
        pods = names.len(),
        "orphan cleanup complete"
    );
    Ok(DeleteReport {
        deleted: !names.is_empty(),
        orphan_cleanup: true,
        confirmed,
    })
}

/// Combine per-namespace cleanup reports: any deletion counts, confirmation
/// only when every wave confirmed.
fn merge_delete_reports(acc: DeleteReport, next: DeleteReport) -> DeleteReport {
    DeleteReport {
        deleted: acc.deleted || next.deleted,
        orphan_cleanup: acc.orphan_cleanup || next.orphan_cleanup,
        confirmed: acc.confirmed && next.confirmed,
    }
}

async fn confirm_children_gone(client: &ClusterClient, job: &ResolvedJob) -> Result<bool> {
    let mut confirmed = true;
    for child in &job.children {
        confirmed &= client.wait_pod_deleted(&job.namespace, child).await?;
    }
    Ok(confirmed)
}

/// One row of a job inventory listing
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub name: String,
    pub namespace: String,
    pub kind: String,
    pub status: String,
    pub age: String,
}

/// Enumerate managed jobs in one namespace, or across all namespaces known
/// to host them.
pub async fn list(client: &ClusterClient, namespace: Option<&str>) -> Result<Vec<JobSummary>> {
    let namespaces = match namespace {
        Some(ns) => vec![ns.to_string()],
        None => client.search_namespaces().await?,
    };
    let mut rows = Vec::new();
    for ns in &namespaces {
        for deployment in client.list_deployments(ns).await? {
            if let Some(kind) = managed_kind(deployment.metadata.labels.as_ref()) {
                rows.push(JobSummary {
                    name: deployment.metadata.name.clone().unwrap_or_default(),
                    namespace: ns.clone(),
                    kind,
                    status: crate::status::from_deployment(&deployment).display(),
                    age: format_age(deployment.metadata.creation_timestamp.as_ref()),
                });
            }
        }
        for job in client.list_jobs(ns).await? {
            if let Some(kind) = managed_kind(job.metadata.labels.as_ref()) {
                rows.push(JobSummary {
                    name: job.metadata.name.clone().unwrap_or_default(),
                    namespace: ns.clone(),
                    kind,
                    status: crate::status::from_job(&job).display(),
                    age: format_age(job.metadata.creation_timestamp.as_ref()),
                });
            }
        }
        for stateful_set in client.list_stateful_sets(ns).await? {
            if let Some(kind) = managed_kind(stateful_set.metadata.labels.as_ref()) {
                rows.push(JobSummary {
                    name: stateful_set.metadata.name.clone().unwrap_or_default(),
                    namespace: ns.clone(),
                    kind,
                    status: crate::status::from_stateful_set(&stateful_set).display(),
                    age: format_age(stateful_set.metadata.creation_timestamp.as_ref()),
                });
            }
        }
    }
    rows.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
    Ok(rows)
}

fn managed_kind(
    labels: Option<&std::collections::BTreeMap<String, String>>,
) -> Option<String> {
    labels
        .and_then(|l| l.get(names::LABEL_JOB_TYPE))
        .cloned()
}

/// Compact kubectl-style age string ("42s", "12m", "3h", "5d")
fn format_age(
    created: Option<&k8s_openapi::apimachinery::pkg::apis::meta::v1::Time>,
) -> String {
    let Some(created) = created else {
        return "-".to_string();
    };
    let elapsed = chrono::Utc::now().signed_duration_since(created.0);
    let seconds = elapsed.num_seconds().max(0);
    if seconds < 60 {
        format!("{seconds}s")
    } else if seconds < 3600 {
        format!("{}m", seconds / 60)
    } else if seconds < 86_400 {
        format!("{}h", seconds / 3600)
    } else {
        format!("{}d", seconds / 86_400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

    #[test]
    fn test_format_age_buckets() {
        let age = |secs: i64| {
            format_age(Some(&Time(
                chrono::Utc::now() - chrono::Duration::seconds(secs),
            )))
        };
        assert_eq!(age(30), "30s");
        assert_eq!(age(120), "2m");
        assert_eq!(age(7200), "2h");
        assert_eq!(age(200_000), "2d");
        assert_eq!(format_age(None), "-");
    }

    #[test]
    fn test_merged_cleanup_reports_span_namespaces() {
        let confirmed = DeleteReport {
            deleted: true,
            orphan_cleanup: true,
            confirmed: true,
        };
        let unconfirmed = DeleteReport {
            deleted: true,
            orphan_cleanup: true,
            confirmed: false,
        };
        let merged = merge_delete_reports(confirmed.clone(), unconfirmed);
        assert!(merged.deleted);
        assert!(merged.orphan_cleanup);
        assert!(!merged.confirmed);

        let merged = merge_delete_reports(confirmed.clone(), confirmed);
        assert!(merged.confirmed);
    }

    #[test]
    fn test_managed_kind_requires_job_type_label() {
        let mut labels = std::collections::BTreeMap::new();
        assert!(managed_kind(Some(&labels)).is_none());
        labels.insert(names::LABEL_JOB_TYPE.to_string(), "training".to_string());
        assert_eq!(managed_kind(Some(&labels)).as_deref(), Some("training"));
        assert!(managed_kind(None).is_none());
    }
}
