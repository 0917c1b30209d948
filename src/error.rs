use crate::run::Stage;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// One carrier that could not yield a chunk during restore
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CarrierFailure {
    /// Caller-supplied identity of the carrier (usually its path)
    pub carrier: String,
    pub reason: String,
}

impl fmt::Display for CarrierFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.carrier, self.reason)
    }
}

fn join_failures(failures: &[CarrierFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn describe_missing(listed: &[usize], count: usize) -> String {
    if count > listed.len() {
        format!("missing indices {:?} and {} more", listed, count - listed.len())
    } else {
        format!("missing indices {:?}", listed)
    }
}

#[derive(Error, Debug)]
pub enum TrizipError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid carrier count: {0}. At least one carrier is required")]
    InvalidCarrierCount(usize),

    #[error("Data integrity error: {0}")]
    IntegrityError(String),

    #[error("Malformed chunk: {0}")]
    MalformedChunk(String),

    #[error(
        "Incomplete carrier set: expected {expected} chunks, {}",
        describe_missing(.missing, *.missing_count)
    )]
    MissingCarrier {
        expected: usize,
        /// The first few missing indices, in order
        missing: Vec<usize>,
        missing_count: usize,
    },

    #[error("Chunk index {0} appears more than once with different payloads")]
    DuplicateIndex(usize),

    #[error("Chunk index {index} is outside a set of {expected} carriers")]
    UnexpectedIndex { index: usize, expected: usize },

    #[error("Unreadable carriers: {}", join_failures(.0))]
    UnreadableCarriers(Vec<CarrierFailure>),

    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: &'static str,
        message: String,
    },

    #[error("Carrier {carrier}: {source}")]
    CarrierFailed {
        carrier: String,
        #[source]
        source: Box<TrizipError>,
    },

    #[error("Carrier too small: need {needed} bits, image holds {available}")]
    CarrierTooSmall { needed: usize, available: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Key required")]
    KeyRequired,

    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<TrizipError>,
    },
}

impl TrizipError {
    /// Attribute this error to a pipeline stage. An error that already
    /// carries a stage keeps it.
    pub fn at_stage(self, stage: Stage) -> Self {
        match self {
            Self::Stage { .. } => self,
            other => Self::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Stage the error originated in, if it passed through the pipeline
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The underlying cause with stage and carrier context stripped
    pub fn root_cause(&self) -> &TrizipError {
        match self {
            Self::Stage { source, .. } | Self::CarrierFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, TrizipError>;
