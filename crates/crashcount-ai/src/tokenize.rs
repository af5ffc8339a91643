//! Tokenizer adapter: text in, variable-length `(id, mask, segment)` triples out.

use crate::EmbedError;

/// One subword position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Token {
    pub input_id: i64,
    /// 1 for a real token, 0 for padding.
    pub attention_mask: i64,
    pub segment_id: i64,
}

/// Tokenizer output for one sentence, before truncation or padding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenSequence(pub Vec<Token>);

impl TokenSequence {
    /// Zip three parallel channels. Stops at the shortest channel.
    pub fn from_channels(ids: &[u32], attention_mask: &[u32], segment_ids: &[u32]) -> Self {
        Self(
            ids.iter()
                .zip(attention_mask)
                .zip(segment_ids)
                .map(|((&id, &mask), &segment)| Token {
                    input_id: id as i64,
                    attention_mask: mask as i64,
                    segment_id: segment as i64,
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.0
    }
}

/// Anything that can turn a sentence into tokens.
pub trait TokenizerAdapter {
    fn encode(&self, text: &str) -> Result<TokenSequence, EmbedError>;
}

#[cfg(feature = "onnx")]
mod hf {
    use std::path::Path;

    use tokenizers::Tokenizer;

    use super::{TokenSequence, TokenizerAdapter};
    use crate::EmbedError;

    /// HuggingFace `tokenizer.json` tokenizer.
    ///
    /// Truncation and padding are switched off: [`normalize`](crate::normalize) owns both.
    pub struct HfTokenizer {
        inner: Tokenizer,
    }

    impl HfTokenizer {
        pub fn from_file(path: &Path) -> Result<Self, EmbedError> {
            if !path.exists() {
                return Err(EmbedError::MissingArtefact(path.to_path_buf()));
            }
            let mut inner = Tokenizer::from_file(path).map_err(|e| EmbedError::LoadTokenizer {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            inner
                .with_truncation(None)
                .map_err(|e| EmbedError::Tokenize(format!("disable truncation: {e}")))?;
            inner.with_padding(None);
            Ok(Self { inner })
        }
    }

    impl TokenizerAdapter for HfTokenizer {
        fn encode(&self, text: &str) -> Result<TokenSequence, EmbedError> {
            let encoding = self
                .inner
                .encode(text, true)
                .map_err(|e| EmbedError::Tokenize(e.to_string()))?;
            Ok(TokenSequence::from_channels(
                encoding.get_ids(),
                encoding.get_attention_mask(),
                encoding.get_type_ids(),
            ))
        }
    }
}

#[cfg(feature = "onnx")]
pub use hf::HfTokenizer;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_channels_zips_positions() {
        let seq = TokenSequence::from_channels(&[101, 2048, 102], &[1, 1, 1], &[0, 0, 0]);
        assert_eq!(seq.len(), 3);
        assert_eq!(
            seq.tokens()[1],
            Token {
                input_id: 2048,
                attention_mask: 1,
                segment_id: 0
            }
        );
    }

    #[test]
    fn from_channels_empty() {
        let seq = TokenSequence::from_channels(&[], &[], &[]);
        assert!(seq.is_empty());
    }
}
