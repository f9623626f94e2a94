use thiserror::Error;

use crate::pipeline::RunStats;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Source Unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Adapter Failure at frame {frame}: {reason}")]
    AdapterFailure { frame: usize, reason: String },

    #[error("Invalid Detection: degenerate box {0:?}")]
    InvalidDetection([f32; 4]),

    #[error("Sink Write Failure at frame {frame}: {reason}")]
    SinkWriteFailure { frame: usize, reason: String },

    #[error("Config Error: {0}")]
    Config(String),

    #[error("Cancelled after {frames_written} frames")]
    Cancelled {
        frames_written: usize,
        stats: Box<RunStats>,
    },

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "opencv")]
    #[error("OpenCV Error: {0}")]
    OpenCv(#[from] opencv::Error),
}

impl Error {
    #[inline]
    pub fn adapter<S: ToString>(frame: usize, reason: S) -> Self {
        Error::AdapterFailure {
            frame,
            reason: reason.to_string(),
        }
    }

    #[inline]
    pub fn sink<S: ToString>(frame: usize, reason: S) -> Self {
        Error::SinkWriteFailure {
            frame,
            reason: reason.to_string(),
        }
    }

    /// Fatal errors abort the whole run; everything else degrades per frame.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::AdapterFailure { .. } | Error::InvalidDetection(_)
        )
    }
}
