//! Error taxonomy shared by the engine and the dispatch layer
//!
//! Every submitted command resolves to exactly one outcome: a success
//! payload, one of these errors, or `Timeout`. Nothing is reported by
//! silence.

use thiserror::Error;

/// Errors produced while resolving, mutating, or querying the graph,
/// plus the dispatch-side terminal outcomes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// No registered node type matched the supplied label
    #[error("unknown node type '{0}'")]
    UnknownType(String),

    /// A referenced node or parent does not exist or is no longer valid
    #[error("invalid path '{0}'")]
    InvalidPath(String),

    /// The named property does not exist on the target node
    #[error("property '{name}' not found on {path}")]
    PropertyNotFound { path: String, name: String },

    /// A connection could not be made (bad slot, self-connection, ...)
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Refusal to delete or mutate a guarded node
    #[error("'{0}' is protected")]
    Protected(String),

    /// The caller's wait budget elapsed before the result arrived
    #[error("timed out after {0} ms")]
    Timeout(u64),

    /// The mutation thread or its work queue could not be reached
    #[error("dispatch unavailable: mutation thread is gone")]
    DispatchUnavailable,

    /// Malformed or missing command arguments
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

impl EngineError {
    /// Numeric code reported over the transport boundary
    pub fn code(&self) -> i32 {
        match self {
            EngineError::UnknownType(_) => -32001,
            EngineError::InvalidPath(_) => -32002,
            EngineError::PropertyNotFound { .. } => -32003,
            EngineError::ConnectionFailed(_) => -32004,
            EngineError::Protected(_) => -32005,
            EngineError::Timeout(_) => -32006,
            EngineError::DispatchUnavailable => -32007,
            EngineError::InvalidArguments(_) => -32000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = EngineError::UnknownType("webcan".to_string());
        assert_eq!(err.to_string(), "unknown node type 'webcan'");

        let err = EngineError::PropertyNotFound {
            path: "/project/blur1".to_string(),
            name: "radius".to_string(),
        };
        assert!(err.to_string().contains("/project/blur1"));
        assert!(err.to_string().contains("radius"));
    }

    #[test]
    fn test_error_codes_are_distinct() {
        let errors = vec![
            EngineError::UnknownType(String::new()),
            EngineError::InvalidPath(String::new()),
            EngineError::PropertyNotFound {
                path: String::new(),
                name: String::new(),
            },
            EngineError::ConnectionFailed(String::new()),
            EngineError::Protected(String::new()),
            EngineError::Timeout(0),
            EngineError::DispatchUnavailable,
            EngineError::InvalidArguments(String::new()),
        ];
        let mut codes: Vec<i32> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
