//! Error types for ROI reconciliation
//!
//! Remote failures are per-call and never abort a run on their own:
//! the reconciler logs them and skips the affected job or project.
//! A plugin name that cannot be resolved ends the run before any job is
//! visited, but is still reported rather than returned as an error.

/// Failure of a single remote call
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request took longer than the configured timeout
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The server could not be reached
    #[error("could not connect to server: {0}")]
    Connection(String),

    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Status {
        /// Status code returned by the server
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// The response body was not the JSON we expected
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// The import endpoint answered 200 but reported failed jobs
    #[error("import rejected: {0}")]
    ImportRejected(String),

    /// Any other transport failure
    #[error("request failed: {0}")]
    Request(String),
}

/// Job definition rejected before it is sent back to the server
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefinitionError {
    /// Import matches jobs by name, so it must be present
    #[error("job definition is missing required field 'name'")]
    MissingName,

    /// `plugins` is present but not an object
    #[error("invalid plugins structure: expected object, got {0}")]
    InvalidPlugins(&'static str),

    /// `plugins.ExecutionLifecycle` is present but not an object
    #[error("invalid ExecutionLifecycle structure: expected object, got {0}")]
    InvalidExecutionLifecycle(&'static str),
}

/// Reconciliation errors
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Remote call failed
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    /// Definition failed validation
    #[error("definition error: {0}")]
    Definition(#[from] DefinitionError),

    /// No plugin name configured and none could be detected from sampled jobs
    #[error(
        "could not detect ROI plugin name; make sure at least one job has ROI metrics configured \
         or pass the plugin name explicitly"
    )]
    PluginNameUnresolved,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_errors_keep_their_message() {
        let err = ReconcileError::from(ApiError::Timeout("30s".into()));
        assert_eq!(err.to_string(), "api error: request timed out: 30s");

        let err = ReconcileError::from(DefinitionError::MissingName);
        assert_eq!(
            err.to_string(),
            "definition error: job definition is missing required field 'name'"
        );
    }

    #[test]
    fn status_error_display() {
        let err = ApiError::Status {
            status: 404,
            body: "not found".into(),
        };
        assert_eq!(err.to_string(), "HTTP 404: not found");
    }
}
