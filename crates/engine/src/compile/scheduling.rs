//! Node placement and priority resolution
//!
//! Pools are expressed through one node label (`gwm.io/pool`); the default
//! pool is the absence of that label. Because the default pool has no label
//! of its own, default-pool workloads carry a hard anti-affinity rule
//! excluding any pool-labeled node. This assumes a single pool label key per
//! node; a multi-membership pool model would need a different expression.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Affinity, NodeAffinity, NodeSelector, NodeSelectorRequirement, NodeSelectorTerm,
};

use crate::names::{DEFAULT_POOL, LABEL_GPU_TYPE, LABEL_POOL};
use crate::spec::{Priority, ResourceRequest};

/// Resolved placement for a pod template
#[derive(Debug, Default)]
pub struct Placement {
    pub node_selector: Option<BTreeMap<String, String>>,
    pub affinity: Option<Affinity>,
}

/// Compute node selector and affinity for a resource request.
///
/// Explicit non-default pool: selector on the pool label, plus the GPU type
/// label when set, no anti-affinity. Default pool: selector on GPU type only
/// (when set) and a required anti-affinity rule against pool-labeled nodes.
pub fn placement_for(resources: &ResourceRequest) -> Placement {
    match resources.pool.as_deref() {
        Some(pool) if pool != DEFAULT_POOL => {
            let mut selector = BTreeMap::new();
            selector.insert(LABEL_POOL.to_string(), pool.to_string());
            if let Some(gpu_type) = &resources.gpu_type {
                selector.insert(LABEL_GPU_TYPE.to_string(), gpu_type.clone());
            }
            Placement {
                node_selector: Some(selector),
                affinity: None,
            }
        }
        _ => {
            let node_selector = resources.gpu_type.as_ref().map(|gpu_type| {
                let mut selector = BTreeMap::new();
                selector.insert(LABEL_GPU_TYPE.to_string(), gpu_type.clone());
                selector
            });
            Placement {
                node_selector,
                affinity: Some(default_pool_anti_affinity()),
            }
        }
    }
}

/// Hard rule keeping default-pool pods off any node that belongs to an
/// explicit pool.
fn default_pool_anti_affinity() -> Affinity {
    Affinity {
        node_affinity: Some(NodeAffinity {
            required_during_scheduling_ignored_during_execution: Some(NodeSelector {
                node_selector_terms: vec![NodeSelectorTerm {
                    match_expressions: Some(vec![NodeSelectorRequirement {
                        key: LABEL_POOL.to_string(),
                        operator: "DoesNotExist".to_string(),
                        values: None,
                    }]),
                    match_fields: None,
                }],
            }),
            preferred_during_scheduling_ignored_during_execution: None,
        }),
        ..Default::default()
    }
}

/// One row of the fixed priority table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityTier {
    /// Priority class name attached to every controller kind
    pub class_name: &'static str,
    /// Numeric scheduling weight carried by the class
    pub weight: i32,
    /// Preemption policy carried by the class
    pub preemption_policy: &'static str,
}

/// Resolve a priority against the fixed 3-tier table. The classes themselves
/// are bootstrapped by a collaborator; this table is the shared contract.
pub fn priority_tier(priority: Priority) -> PriorityTier {
    match priority {
        Priority::High => PriorityTier {
            class_name: "gwm-high",
            weight: 100_000,
            preemption_policy: "PreemptLowerPriority",
        },
        Priority::Medium => PriorityTier {
            class_name: "gwm-medium",
            weight: 50_000,
            preemption_policy: "PreemptLowerPriority",
        },
        Priority::Low => PriorityTier {
            class_name: "gwm-low",
            weight: 10_000,
            preemption_policy: "Never",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(pool: Option<&str>, gpu_type: Option<&str>) -> ResourceRequest {
        ResourceRequest {
            pool: pool.map(String::from),
            gpu_type: gpu_type.map(String::from),
            gpu_count: 1,
            cpu: "4".to_string(),
            memory: "16Gi".to_string(),
            gpu_share: None,
        }
    }

    #[test]
    fn test_explicit_pool_selects_no_anti_affinity() {
        let placement = placement_for(&request(Some("gpu-pool-a"), Some("a100-80g")));
        let selector = placement.node_selector.unwrap();
        assert_eq!(selector[LABEL_POOL], "gpu-pool-a");
        assert_eq!(selector[LABEL_GPU_TYPE], "a100-80g");
        assert!(placement.affinity.is_none());
    }

    #[test]
    fn test_default_pool_gets_anti_affinity() {
        let placement = placement_for(&request(None, None));
        assert!(placement.node_selector.is_none());
        assert!(placement.affinity.is_some());
    }

    #[test]
    fn test_default_pool_with_gpu_type_selects_type_only() {
        let placement = placement_for(&request(None, Some("l4")));
        let selector = placement.node_selector.unwrap();
        assert_eq!(selector.len(), 1);
        assert_eq!(selector[LABEL_GPU_TYPE], "l4");
        assert!(placement.affinity.is_some());
    }

    #[test]
    fn test_pool_named_default_is_the_implicit_pool() {
        // "default" is not an explicit partition; it behaves like no pool.
        let placement = placement_for(&request(Some("default"), None));
        assert!(placement.node_selector.is_none());
        assert!(placement.affinity.is_some());
    }

    #[test]
    fn test_priority_table() {
        let high = priority_tier(Priority::High);
        assert_eq!(high.class_name, "gwm-high");
        assert!(high.weight > priority_tier(Priority::Medium).weight);
        assert!(priority_tier(Priority::Medium).weight > priority_tier(Priority::Low).weight);
        assert_eq!(priority_tier(Priority::Low).preemption_policy, "Never");
    }
}
