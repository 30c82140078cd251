use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum RedmineError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Redmine request failed: {0}")]
    Http(String),

    #[error("Redmine returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected Redmine response: {0}")]
    InvalidResponse(String),

    #[error("no version named 'Build {0}' in the tracker")]
    #[diagnostic(help("check the build number; versions are matched by exact name"))]
    UnknownBuild(u32),

    #[error("cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not enough metadata, empty field(s): {}", fields.join(", "))]
    MissingMetadata { fields: Vec<&'static str> },

    #[error("more than 1 value for field '{field}' ({count} values)")]
    MultiValuedField { field: String, count: usize },

    #[error("{0}")]
    SampleLine(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to serialize dataset: {0}")]
    Serialize(String),
}

impl RedmineError {
    /// Errors that only concern one issue; the run continues past them.
    pub fn is_per_issue(&self) -> bool {
        matches!(
            self,
            RedmineError::MissingMetadata { .. }
                | RedmineError::MultiValuedField { .. }
                | RedmineError::SampleLine(_)
                | RedmineError::Filesystem(_)
                | RedmineError::Serialize(_)
        )
    }
}
