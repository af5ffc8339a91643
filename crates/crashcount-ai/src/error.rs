use std::path::PathBuf;

use thiserror::Error;

/// Errors from tokenization, encoder inference, and pooling.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("{0} not found")]
    MissingArtefact(PathBuf),

    #[error("load tokenizer from {path}: {message}")]
    LoadTokenizer { path: PathBuf, message: String },

    #[error("tokenize: {0}")]
    Tokenize(String),

    /// The attention mask has no set bits, so there is nothing to average.
    #[error("no valid tokens found in the attention mask")]
    EmptyAttention,

    #[error("encoder returned {actual} floats, expected {expected}")]
    OutputShape { expected: usize, actual: usize },

    #[error("encoder: {0}")]
    Encoder(String),

    #[cfg(feature = "onnx")]
    #[error("failed to create ONNX session: {0}")]
    CreateSession(#[source] ort::Error),

    #[cfg(feature = "onnx")]
    #[error("failed to convert input into tensor: {0}")]
    Tensor(#[source] ort::Error),

    #[cfg(feature = "onnx")]
    #[error("failed to run inference: {0}")]
    Inference(#[source] ort::Error),
}

/// Errors from building examples, splitting, training, and evaluation.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("{records} records but {embeddings} embeddings; rows must correspond 1:1")]
    LengthMismatch { records: usize, embeddings: usize },

    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("test set is empty")]
    EmptyTestSet,

    #[error("feature vector has {actual} components, expected {expected}")]
    WidthMismatch { expected: usize, actual: usize },

    #[error("test fraction must be in (0, 1), got {0}")]
    InvalidFraction(f64),

    #[error("softmax temperature must be positive and finite, got {0}")]
    InvalidTemperature(f32),

    #[error("L2 penalty must be non-negative and finite, got {0}")]
    InvalidPenalty(f64),

    #[error("training set has {0} distinct label(s), need at least 2")]
    TooFewClasses(usize),

    #[error("classifier: {0}")]
    Model(String),
}
