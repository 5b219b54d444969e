//! Error taxonomy shared by training, storage and inference.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the embedding engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or contradictory training options. Raised before any work starts.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The training corpus (or stop-words file) could not be read.
    #[error("unable to read corpus {}", path.display())]
    CorpusRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Minimum-frequency and stop-word pruning removed every word.
    #[error("vocabulary is empty after pruning")]
    EmptyVocabulary,

    /// A model file is malformed or does not match the expected shape.
    #[error("unable to load model: {0}")]
    ModelLoad(String),

    /// A model file could not be opened or read.
    #[error("unable to load model {}", path.display())]
    ModelIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// None of the requested tokens are in the vocabulary.
    #[error("unknown tokens: {0}")]
    UnknownWord(String),

    /// A training run failed after it started; no model was produced.
    #[error("training failed: {0}")]
    TrainingFailed(String),

    /// Write-side I/O failure (model, vocabulary or export files).
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// True for errors a bulk pipeline should skip over rather than abort on.
    ///
    /// ```
    /// use word2vec::Error;
    ///
    /// assert!(Error::UnknownWord("zzz".into()).is_recoverable());
    /// assert!(!Error::EmptyVocabulary.is_recoverable());
    /// ```
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::UnknownWord(_))
    }

    pub(crate) fn corpus(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::CorpusRead {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn model_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::ModelIo {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
