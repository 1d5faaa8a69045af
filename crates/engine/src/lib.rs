//! Translation and resolution engine for GPU workloads on Kubernetes
//!
//! This crate provides the core functionality for:
//! - Compiling normalized job descriptions into native cluster objects
//! - Reverse-mapping native objects back into approximate job descriptions
//! - Normalizing four native status shapes into one status taxonomy
//! - Resolving a logical job name among ambiguous, possibly-orphaned objects
//!
//! The cluster is the only source of truth; nothing is persisted locally.

pub mod client;
pub mod compile;
pub mod error;
pub mod names;
pub mod ops;
pub mod resolve;
pub mod reverse;
pub mod spec;
pub mod status;

pub use client::{ClusterClient, SubmitAction};
pub use compile::{compile, CompiledResourceSet, ControllerResource};
pub use error::{Error, Result};
pub use ops::{
    delete, describe, list, submit, AccessMethods, DeleteReport, Description, JobSummary,
    SubmitReceipt,
};
pub use resolve::{resolve, AmbiguityCandidate, ResolvedJob, Resolution};
pub use spec::{JobKind, JobSpec, Priority};
pub use status::{NormalizedStatus, StatusReport};
