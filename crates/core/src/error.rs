//! Error types for the ArchMentor domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all ArchMentor operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Capability errors ---
    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),

    // --- Knowledge retrieval errors ---
    #[error("Knowledge error: {0}")]
    Knowledge(#[from] KnowledgeError),

    // --- Visual analysis errors ---
    #[error("Visual analysis error: {0}")]
    Visual(#[from] VisualError),

    // --- Session errors ---
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum CapabilityError {
    #[error("Capability not registered: {0}")]
    NotRegistered(String),

    #[error("Capability {capability} timed out after {timeout_ms}ms")]
    Timeout { capability: String, timeout_ms: u64 },

    #[error("Capability {capability} failed: {reason}")]
    Failed { capability: String, reason: String },
}

#[derive(Debug, Clone, Error)]
pub enum KnowledgeError {
    #[error("Knowledge source unavailable: {0}")]
    Unavailable(String),

    #[error("Corpus could not be loaded: {0}")]
    CorpusLoad(String),
}

#[derive(Debug, Clone, Error)]
pub enum VisualError {
    #[error("Image not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session already exists: {0}")]
    AlreadyExists(String),

    #[error("Turn cancelled for session {0}")]
    Cancelled(String),

    #[error("Session task for {0} has shut down")]
    Closed(String),

    #[error("Session limit of {0} reached")]
    LimitReached(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_timeout_displays_correctly() {
        let err = Error::Capability(CapabilityError::Timeout {
            capability: "domain_knowledge".into(),
            timeout_ms: 30_000,
        });
        assert!(err.to_string().contains("domain_knowledge"));
        assert!(err.to_string().contains("30000ms"));
    }

    #[test]
    fn session_error_displays_correctly() {
        let err = Error::Session(SessionError::Cancelled("s-1".into()));
        assert!(err.to_string().contains("s-1"));
        assert!(err.to_string().contains("cancelled"));
    }
}
