use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    Status(u16),
    Transport(String),
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::Status(status) => write!(f, "status {status}"),
            FailureCause::Transport(message) => write!(f, "network error: {message}"),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum RetrieverError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("invalid proteome id: {0}")]
    InvalidProteomeId(String),

    #[error("invalid output format: {0}")]
    InvalidFormat(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("uniprot client error: {0}")]
    Http(String),

    #[error("entry not found: {url}")]
    NotFound { url: String },

    #[error("uniprot rejected request with status {status}: {url}")]
    #[diagnostic(help("4xx responses other than 404, 408 and 429 are not retried"))]
    RequestRejected { status: u16, url: String },

    #[error("{label} failed after {attempts} attempts (last: {last})")]
    RetriesExhausted {
        label: String,
        attempts: usize,
        last: FailureCause,
    },

    #[error("ID mapping submission failed: {0}")]
    JobSubmissionFailed(String),

    #[error("ID mapping job {job_id} failed: {reason}")]
    JobFailed { job_id: String, reason: String },

    #[error("ID mapping job {job_id} still running after {polls} polls")]
    #[diagnostic(help("raise polling.max_polls in the config file for very large jobs"))]
    JobTimedOut { job_id: String, polls: usize },

    #[error("unexpected uniprot response: {0}")]
    InvalidResponse(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl RetrieverError {
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            RetrieverError::RetriesExhausted { .. }
                | RetrieverError::RequestRejected { .. }
                | RetrieverError::Http(_)
                | RetrieverError::InvalidResponse(_)
        )
    }
}
