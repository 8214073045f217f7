use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Everything that can abort an indicator pipeline.
///
/// Nothing in this crate catches or retries these; they propagate to the
/// per-indicator task and from there into [`Error::Pipelines`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request failed with HTTP {status} for {url}")]
    Http {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("world bank api error: {0}")]
    Api(String),

    #[error("decode json: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unexpected response shape: {0}")]
    Shape(String),

    #[error("refusing to write {}: no rows", .path.display())]
    EmptyDataset { path: PathBuf },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("pipeline task did not complete: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("{} of {total} indicator pipelines failed: {}", .failures.len(), FailureList(.failures))]
    Pipelines {
        failures: Vec<PipelineFailure>,
        total: usize,
    },
}

/// One failed indicator inside an aggregate run.
#[derive(Debug)]
pub struct PipelineFailure {
    pub indicator: String,
    pub error: Error,
}

struct FailureList<'a>(&'a [PipelineFailure]);

impl fmt::Display for FailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "[{}] {}", failure.indicator, failure.error)?;
        }
        Ok(())
    }
}

impl Error {
    /// Failures of an aggregate run, empty for any other variant.
    pub fn failures(&self) -> &[PipelineFailure] {
        match self {
            Error::Pipelines { failures, .. } => failures,
            _ => &[],
        }
    }
}
