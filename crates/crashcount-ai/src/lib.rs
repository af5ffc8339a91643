//! AI layer: transformer sentence embeddings (ONNX Runtime) and vehicle-count classification.

pub mod classifier;
mod embedder;
mod encoder;
mod error;
mod normalize;
mod pooling;
mod tokenize;

pub use classifier::{
    ConfusionMatrix, LabeledExample, LogisticRegressionModel, LogisticRegressionTrainer,
    MulticlassMetrics, NearestCentroidModel, NearestCentroidTrainer, Prediction, Predictor,
    Trainer, build_examples, evaluate, label_for_count, train_test_split,
};
pub use embedder::{Embedder, EmbedderConfig};
pub use encoder::{ATTENTION_MASK, Encoder, INPUT_IDS, LAST_HIDDEN_STATE};
pub use error::{ClassifyError, EmbedError};
pub use normalize::{NormalizedInput, normalize};
pub use pooling::PoolingStrategy;
pub use tokenize::{Token, TokenSequence, TokenizerAdapter};

#[cfg(feature = "onnx")]
pub use encoder::OnnxEncoder;
#[cfg(feature = "onnx")]
pub use tokenize::HfTokenizer;
