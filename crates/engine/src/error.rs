//! Engine error types
//!
//! Validation problems, resolution outcomes that need remediation, and
//! cluster transport failures are distinct kinds. Transport failures collapse
//! into three coarse categories (permission, missing resource, other) but
//! always carry the platform-provided message verbatim, since operators debug
//! against that text.

use thiserror::Error;

/// Result alias used throughout the engine
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the translation and resolution engine
#[derive(Debug, Error)]
pub enum Error {
    /// The job description failed pre-compilation validation
    #[error("invalid specification: {0}")]
    InvalidSpec(String),

    /// No job matched the given identifier
    #[error("no job found matching '{0}'")]
    NotFound(String),

    /// The identifier matched jobs in more than one namespace
    #[error(
        "'{identifier}' matches jobs in multiple namespaces ({}); \
         pass an explicit namespace to disambiguate",
        .candidates.join(", ")
    )]
    Ambiguous {
        identifier: String,
        /// Human-readable `namespace/kind` pairs for each candidate
        candidates: Vec<String>,
    },

    /// The cluster rejected the request for authorization reasons
    #[error("permission denied: {0}")]
    Permission(String),

    /// A referenced native resource does not exist
    #[error("resource not found: {0}")]
    MissingResource(String),

    /// Any other cluster transport failure
    #[error("cluster error: {0}")]
    Transport(String),
}

impl From<kube::Error> for Error {
    fn from(err: kube::Error) -> Self {
        match &err {
            kube::Error::Api(ae) if ae.code == 401 || ae.code == 403 => {
                Error::Permission(ae.message.clone())
            }
            kube::Error::Api(ae) if ae.code == 404 => Error::MissingResource(ae.message.clone()),
            _ => Error::Transport(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_mapping() {
        let forbidden = kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: "deployments is forbidden".to_string(),
            reason: "Forbidden".to_string(),
            code: 403,
        });
        match Error::from(forbidden) {
            Error::Permission(msg) => assert_eq!(msg, "deployments is forbidden"),
            other => panic!("expected Permission, got {other:?}"),
        }

        let missing = kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: "services \"svc-x\" not found".to_string(),
            reason: "NotFound".to_string(),
            code: 404,
        });
        match Error::from(missing) {
            Error::MissingResource(msg) => assert!(msg.contains("svc-x")),
            other => panic!("expected MissingResource, got {other:?}"),
        }
    }

    #[test]
    fn test_other_errors_keep_detail_text() {
        let err = kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: "etcdserver: request timed out".to_string(),
            reason: "Timeout".to_string(),
            code: 504,
        });
        match Error::from(err) {
            Error::Transport(msg) => assert!(msg.contains("etcdserver: request timed out")),
            other => panic!("expected Transport, got {other:?}"),
        }
    }

    #[test]
    fn test_ambiguous_message_lists_candidates() {
        let err = Error::Ambiguous {
            identifier: "bert".to_string(),
            candidates: vec!["team-a/training".to_string(), "team-b/inference".to_string()],
        };
        let text = err.to_string();
        assert!(text.contains("team-a/training"));
        assert!(text.contains("team-b/inference"));
        assert!(text.contains("explicit namespace"));
    }
}
