//! Reduce the encoder's per-token matrix to one sentence vector.

use std::fmt;
use std::str::FromStr;

use crate::EmbedError;

/// How to collapse `last_hidden_state` (token-major, `seq_len × width`) into one vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoolingStrategy {
    /// Representation of token position 0 (`[CLS]`).
    First,
    /// Average over positions whose attention mask is 1.
    #[default]
    Mean,
}

impl PoolingStrategy {
    pub fn pool(
        self,
        hidden: &[f32],
        attention_mask: &[i64],
        width: usize,
    ) -> Result<Vec<f32>, EmbedError> {
        match self {
            Self::First => first_token(hidden, width),
            Self::Mean => mean_pool(hidden, attention_mask, width),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Mean => "mean",
        }
    }
}

impl fmt::Display for PoolingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoolingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(Self::First),
            "mean" => Ok(Self::Mean),
            other => Err(format!("unknown pooling strategy '{other}' (expected first or mean)")),
        }
    }
}

fn first_token(hidden: &[f32], width: usize) -> Result<Vec<f32>, EmbedError> {
    hidden
        .get(..width)
        .map(<[f32]>::to_vec)
        .ok_or(EmbedError::OutputShape {
            expected: width,
            actual: hidden.len(),
        })
}

fn mean_pool(hidden: &[f32], attention_mask: &[i64], width: usize) -> Result<Vec<f32>, EmbedError> {
    let expected = attention_mask.len() * width;
    if hidden.len() < expected {
        return Err(EmbedError::OutputShape {
            expected,
            actual: hidden.len(),
        });
    }

    let mut pooled = vec![0.0f32; width];
    let mut token_count = 0usize;

    for (i, &mask) in attention_mask.iter().enumerate() {
        if mask == 1 {
            token_count += 1;
            let row = &hidden[i * width..(i + 1) * width];
            for (p, &v) in pooled.iter_mut().zip(row) {
                *p += v;
            }
        }
    }

    if token_count == 0 {
        return Err(EmbedError::EmptyAttention);
    }
    for p in &mut pooled {
        *p /= token_count as f32;
    }
    Ok(pooled)
}
