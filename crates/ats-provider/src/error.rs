//! Error marker returned by every adapter operation

/// Failure of a single upstream interaction.
///
/// The Display text is what callers see in `{"error": "..."}` bodies, so each
/// variant carries the upstream's own description where one exists.
#[derive(Debug, thiserror::Error)]
pub enum AtsError {
    /// Network failure, timeout, or connection refused.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// Upstream answered with a non-2xx status.
    #[error("{url} returned {status}: {body}")]
    Upstream {
        url: String,
        status: u16,
        body: String,
    },

    /// Upstream answered 2xx but the body was not the expected JSON.
    #[error("invalid response from {url}: {message}")]
    Decode { url: String, message: String },

    /// Upstream answered 2xx but reported a failure inside the payload.
    #[error("upstream rejected request: {0}")]
    Rejected(String),

    #[error("candidate creation returned no identifier")]
    MissingIdentifier,

    #[error("internal adapter error: {0}")]
    Internal(String),
}

impl AtsError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AtsError::Transport { .. } => "transport",
            AtsError::Upstream { .. } => "upstream_status",
            AtsError::Decode { .. } => "decode",
            AtsError::Rejected(_) => "rejected",
            AtsError::MissingIdentifier => "missing_identifier",
            AtsError::Internal(_) => "internal",
        }
    }
}

/// Result alias for adapter operations.
pub type Result<T> = std::result::Result<T, AtsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_includes_status_and_body() {
        let err = AtsError::Upstream {
            url: "http://127.0.0.1:8000/jobBoard.listJobs".into(),
            status: 401,
            body: r#"{"detail":"Unauthorized"}"#.into(),
        };
        let text = err.to_string();
        assert!(text.contains("401"), "got: {text}");
        assert!(text.contains("Unauthorized"), "got: {text}");
        assert_eq!(err.kind(), "upstream_status");
    }

    #[test]
    fn transport_error_names_url() {
        let err = AtsError::Transport {
            url: "http://127.0.0.1:1/candidate.create".into(),
            message: "connection refused".into(),
        };
        assert!(err.to_string().contains("/candidate.create"));
        assert_eq!(err.kind(), "transport");
    }
}
