//! Fixed-length encoder input from a variable-length token sequence.

use crate::tokenize::{Token, TokenSequence};

/// Three parallel channels, each exactly `max_length` long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedInput {
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
    pub segment_ids: Vec<i64>,
}

impl NormalizedInput {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

/// Truncate to the first `max_length` tokens, or right-pad with zeros up to it.
///
/// Padding writes 0 into all three channels at the same positions.
pub fn normalize(seq: &TokenSequence, max_length: usize) -> NormalizedInput {
    let mut input_ids = Vec::with_capacity(max_length);
    let mut attention_mask = Vec::with_capacity(max_length);
    let mut segment_ids = Vec::with_capacity(max_length);

    let kept = seq.tokens().iter().copied().take(max_length);
    let padding = std::iter::repeat(Token::default());
    for token in kept.chain(padding).take(max_length) {
        input_ids.push(token.input_id);
        attention_mask.push(token.attention_mask);
        segment_ids.push(token.segment_id);
    }

    NormalizedInput {
        input_ids,
        attention_mask,
        segment_ids,
    }
}
