//! Sentence embedding pipeline: tokenize, normalize, encode, pool.
//!
//! With the `onnx` feature, [`Embedder::load`] builds the pipeline from a model
//! directory containing `model.onnx` and `tokenizer.json`.

use std::time::Instant;

use crashcount_core::{EMBEDDING_DIM, MAX_SEQUENCE_LENGTH};
use tracing::{debug, info};

use crate::encoder::Encoder;
use crate::normalize::normalize;
use crate::pooling::PoolingStrategy;
use crate::tokenize::TokenizerAdapter;
use crate::EmbedError;

/// Shape and reduction settings for one embedding run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbedderConfig {
    /// Every sequence is truncated or padded to this many tokens.
    pub max_length: usize,
    /// Width of one token's hidden state.
    pub hidden_width: usize,
    pub strategy: PoolingStrategy,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            max_length: MAX_SEQUENCE_LENGTH,
            hidden_width: EMBEDDING_DIM,
            strategy: PoolingStrategy::default(),
        }
    }
}

pub struct Embedder<T, E> {
    tokenizer: T,
    encoder: E,
    config: EmbedderConfig,
}

impl<T: TokenizerAdapter, E: Encoder> Embedder<T, E> {
    pub fn new(tokenizer: T, encoder: E, config: EmbedderConfig) -> Self {
        Self {
            tokenizer,
            encoder,
            config,
        }
    }

    /// Embed one sentence into a `hidden_width` vector.
    pub fn extract(&mut self, sentence: &str) -> Result<Vec<f32>, EmbedError> {
        let EmbedderConfig {
            max_length,
            hidden_width,
            strategy,
        } = self.config;

        let tokens = self.tokenizer.encode(sentence)?;
        if tokens.len() > max_length {
            debug!(tokens = tokens.len(), max_length, "truncating sequence");
        }
        let input = normalize(&tokens, max_length);

        let hidden = self
            .encoder
            .infer(&input.input_ids, &input.attention_mask)?;
        let expected = max_length * hidden_width;
        if hidden.len() != expected {
            return Err(EmbedError::OutputShape {
                expected,
                actual: hidden.len(),
            });
        }

        strategy.pool(&hidden, &input.attention_mask, hidden_width)
    }

    /// Embed sentences one after another, in input order.
    ///
    /// `on_progress(done, total)` fires after each sentence. The first
    /// failure aborts the batch.
    pub fn extract_all(
        &mut self,
        sentences: &[&str],
        mut on_progress: impl FnMut(usize, usize),
    ) -> Result<Vec<Vec<f32>>, EmbedError> {
        let total = sentences.len();
        let start = Instant::now();
        let mut embeddings = Vec::with_capacity(total);

        for (i, sentence) in sentences.iter().enumerate() {
            embeddings.push(self.extract(sentence)?);
            on_progress(i + 1, total);
        }

        let elapsed = start.elapsed();
        info!(
            sentences = total,
            strategy = %self.config.strategy,
            elapsed_secs = elapsed.as_secs_f64(),
            "embedding complete"
        );
        Ok(embeddings)
    }
}

#[cfg(feature = "onnx")]
impl Embedder<crate::tokenize::HfTokenizer, crate::encoder::OnnxEncoder> {
    /// Load `model.onnx` and `tokenizer.json` from `model_dir`.
    pub fn load(model_dir: &std::path::Path, config: EmbedderConfig) -> Result<Self, EmbedError> {
        let tokenizer = crate::tokenize::HfTokenizer::from_file(&model_dir.join("tokenizer.json"))?;
        let encoder =
            crate::encoder::OnnxEncoder::from_file(&model_dir.join("model.onnx"), config.hidden_width)?;
        info!(
            model_dir = %model_dir.display(),
            max_length = config.max_length,
            strategy = %config.strategy,
            "loaded embedder"
        );
        Ok(Self::new(tokenizer, encoder, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenize::{Token, TokenSequence};

    /// One token per whitespace-separated word; a word "_" is masked out.
    struct WordTokenizer;

    impl TokenizerAdapter for WordTokenizer {
        fn encode(&self, text: &str) -> Result<TokenSequence, EmbedError> {
            Ok(TokenSequence(
                text.split_whitespace()
                    .enumerate()
                    .map(|(i, word)| Token {
                        input_id: 1000 + i as i64,
                        attention_mask: i64::from(word != "_"),
                        segment_id: 0,
                    })
                    .collect(),
            ))
        }
    }

    /// Every component of token `i` equals `i`.
    struct IndexEncoder {
        width: usize,
        calls: usize,
    }

    impl Encoder for IndexEncoder {
        fn infer(&mut self, input_ids: &[i64], attention_mask: &[i64]) -> Result<Vec<f32>, EmbedError> {
            assert_eq!(input_ids.len(), attention_mask.len());
            self.calls += 1;
            Ok((0..input_ids.len())
                .flat_map(|i| std::iter::repeat_n(i as f32, self.width))
                .collect())
        }
    }

    /// Returns one float too few.
    struct ShortEncoder;

    impl Encoder for ShortEncoder {
        fn infer(&mut self, input_ids: &[i64], _: &[i64]) -> Result<Vec<f32>, EmbedError> {
            Ok(vec![0.0; input_ids.len() * 4 - 1])
        }
    }

    fn small_config(strategy: PoolingStrategy) -> EmbedderConfig {
        EmbedderConfig {
            max_length: 8,
            hidden_width: 4,
            strategy,
        }
    }

    fn embedder(strategy: PoolingStrategy) -> Embedder<WordTokenizer, IndexEncoder> {
        Embedder::new(
            WordTokenizer,
            IndexEncoder { width: 4, calls: 0 },
            small_config(strategy),
        )
    }

    #[test]
    fn default_config() {
        let config = EmbedderConfig::default();
        assert_eq!(config.max_length, 512);
        assert_eq!(config.hidden_width, 768);
        assert_eq!(config.strategy, PoolingStrategy::Mean);
    }

    #[test]
    fn mean_over_real_tokens() {
        let mut embedder = embedder(PoolingStrategy::Mean);
        let v = embedder.extract("two cars collided head on").unwrap();
        assert_eq!(v.len(), 4);
        // tokens 0..5 attended: mean index 2
        assert_eq!(v, vec![2.0; 4]);
    }

    #[test]
    fn masked_tokens_do_not_contribute() {
        let mut embedder = embedder(PoolingStrategy::Mean);
        let v = embedder.extract("a _ _ b").unwrap();
        // tokens 0 and 3 attended
        assert_eq!(v, vec![1.5; 4]);
    }

    #[test]
    fn long_input_is_truncated_before_encoding() {
        let mut embedder = embedder(PoolingStrategy::Mean);
        let sentence = vec!["w"; 20].join(" ");
        let v = embedder.extract(&sentence).unwrap();
        // first 8 tokens kept: mean of 0..8
        assert_eq!(v, vec![3.5; 4]);
    }

    #[test]
    fn first_token_strategy() {
        let mut embedder = embedder(PoolingStrategy::First);
        let v = embedder.extract("one vehicle").unwrap();
        assert_eq!(v, vec![0.0; 4]);
    }

    #[test]
    fn empty_sentence_has_no_attention() {
        let mut embedder = embedder(PoolingStrategy::Mean);
        let err = embedder.extract("").unwrap_err();
        assert!(matches!(err, EmbedError::EmptyAttention));
    }

    #[test]
    fn wrong_encoder_output_length() {
        let mut embedder =
            Embedder::new(WordTokenizer, ShortEncoder, small_config(PoolingStrategy::Mean));
        let err = embedder.extract("a b").unwrap_err();
        assert!(matches!(
            err,
            EmbedError::OutputShape {
                expected: 32,
                actual: 31
            }
        ));
    }

    #[test]
    fn extract_all_in_order_with_progress() {
        let mut embedder = embedder(PoolingStrategy::Mean);
        let mut seen = Vec::new();
        let out = embedder
            .extract_all(&["a", "a b c", "a b c d e"], |done, total| {
                seen.push((done, total))
            })
            .unwrap();

        assert_eq!(out, vec![vec![0.0; 4], vec![1.0; 4], vec![2.0; 4]]);
        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
        assert_eq!(embedder.encoder.calls, 3);
    }

    #[test]
    fn extract_all_stops_at_first_failure() {
        let mut embedder = embedder(PoolingStrategy::Mean);
        let err = embedder.extract_all(&["a", "", "b"], |_, _| {}).unwrap_err();
        assert!(matches!(err, EmbedError::EmptyAttention));
        assert_eq!(embedder.encoder.calls, 2);
    }

    #[cfg(feature = "onnx")]
    mod onnx {
        use super::*;
        use std::path::PathBuf;

        fn model_dir() -> Option<PathBuf> {
            let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                .join("..")
                .join("..")
                .join("models")
                .join("distilbert-base-multilingual-cased");
            if dir.join("model.onnx").exists() {
                Some(dir)
            } else {
                eprintln!("skipping: no encoder under {}", dir.display());
                None
            }
        }

        #[test]
        fn real_model_embeds_to_768() {
            let Some(dir) = model_dir() else { return };
            let mut embedder = Embedder::load(&dir, EmbedderConfig::default()).unwrap();
            let v = embedder
                .extract("Vehicle one struck vehicle two in the intersection.")
                .unwrap();
            assert_eq!(v.len(), EMBEDDING_DIM);
            assert!(v.iter().all(|x| x.is_finite()));
        }

        #[test]
        fn load_missing_dir() {
            let err = Embedder::load(
                std::path::Path::new("/nonexistent/model"),
                EmbedderConfig::default(),
            )
            .err()
            .unwrap();
            assert!(matches!(err, EmbedError::MissingArtefact(_)));
        }
    }
}
