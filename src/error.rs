use thiserror::Error;

/// Failure to open, seek or read the video resource.
///
/// Producers treat every variant as non-fatal for a single frame; only a
/// failure to open a handle at all aborts the run.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("cannot open '{path}': {reason}")]
    Open { path: String, reason: String },
    #[error("seek to frame {index}: {reason}")]
    Seek { index: u64, reason: String },
    #[error("read frame {index}: {reason}")]
    Read { index: u64, reason: String },
}

/// Why extracted scoreboard text was not accepted as a snapshot.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("score text {0:?} does not match <runs>/<wickets>")]
    Score(String),
    #[error("over text {0:?} does not match <over>.<ball>")]
    Over(String),
    #[error("team name {0:?} is not a 3-character uppercase code")]
    TeamName(String),
}

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The extraction engine cannot run on this platform or with this setup.
    /// No further progress is possible.
    #[error("extraction unsupported: {0}")]
    Unsupported(String),
    /// A single extraction call failed; the frame is dropped.
    #[error("extraction failed: {0}")]
    Engine(String),
}

impl ExtractError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExtractError::Unsupported(_))
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("producer {producer}: {source}")]
    Open {
        producer: usize,
        #[source]
        source: DecodeError,
    },
    #[error("worker {worker}: {source}")]
    Extraction {
        worker: usize,
        #[source]
        source: ExtractError,
    },
    #[error("{0} thread panicked")]
    Panicked(&'static str),
}
