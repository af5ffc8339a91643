//! Target language models, their reply conventions, and count results.
//!
//! Every model the counting pipeline can query is one row of the table in
//! [`TargetModel::spec`]: wire id, reply family, and cache-file suffix.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Marker closing the chain-of-thought block in reasoning-model replies.
pub const THINK_END_MARKER: &str = "</think>";

/// Failure to read an integer answer out of a model reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplyParseError {
    #[error("could not parse vehicle count: '{raw}'")]
    NotAnInteger { raw: String },
    #[error("reply has no '{marker}' marker: '{raw}'")]
    MissingMarker { marker: &'static str, raw: String },
}

/// Groups models that share the same reply convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFamily {
    /// The whole reply is the number.
    DirectAnswer,
    /// Reasoning transcript followed by `</think>`, then the number.
    ReasoningTranscript,
}

impl ModelFamily {
    /// Extract the integer answer from a reply's message content.
    pub fn parse_count(self, content: &str) -> Result<i64, ReplyParseError> {
        let answer = match self {
            Self::DirectAnswer => content,
            Self::ReasoningTranscript => content
                .split_once(THINK_END_MARKER)
                .map(|(_, after)| after)
                .ok_or_else(|| ReplyParseError::MissingMarker {
                    marker: THINK_END_MARKER,
                    raw: content.to_string(),
                })?,
        };
        answer
            .trim()
            .parse::<i64>()
            .map_err(|_| ReplyParseError::NotAnInteger {
                raw: content.to_string(),
            })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectAnswer => "direct-answer",
            Self::ReasoningTranscript => "reasoning-transcript",
        }
    }
}

/// Static description of a target model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSpec {
    /// Value of the `model` field on the wire.
    pub id: &'static str,
    pub family: ModelFamily,
    /// Suffix of the result-cache file; unique per model.
    pub cache_suffix: &'static str,
}

/// LLM the vehicle-count extraction runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetModel {
    Gemma3_12b,
    Gemma3_4b,
    Llama31_8bInstruct,
    DeepSeekR1DistillQwen7b,
    Qwen3_8b,
}

impl TargetModel {
    pub const ALL: [TargetModel; 5] = [
        Self::Gemma3_12b,
        Self::Gemma3_4b,
        Self::Llama31_8bInstruct,
        Self::DeepSeekR1DistillQwen7b,
        Self::Qwen3_8b,
    ];

    pub fn spec(self) -> &'static ModelSpec {
        match self {
            Self::Gemma3_12b => &ModelSpec {
                id: "google/gemma-3-12b",
                family: ModelFamily::DirectAnswer,
                cache_suffix: "gemma-3-12b",
            },
            Self::Gemma3_4b => &ModelSpec {
                id: "google/gemma-3-4b",
                family: ModelFamily::DirectAnswer,
                cache_suffix: "gemma-3-4b",
            },
            Self::Llama31_8bInstruct => &ModelSpec {
                id: "meta-llama-3.1-8b-instruct",
                family: ModelFamily::DirectAnswer,
                cache_suffix: "llama-3.1-8b-instruct",
            },
            Self::DeepSeekR1DistillQwen7b => &ModelSpec {
                id: "deepseek-r1-distill-qwen-7b",
                family: ModelFamily::ReasoningTranscript,
                cache_suffix: "deepseek-r1-distill-qwen-7b",
            },
            Self::Qwen3_8b => &ModelSpec {
                id: "qwen/qwen3-8b",
                family: ModelFamily::ReasoningTranscript,
                cache_suffix: "qwen3-8b",
            },
        }
    }

    pub fn id(self) -> &'static str {
        self.spec().id
    }

    pub fn family(self) -> ModelFamily {
        self.spec().family
    }

    pub fn cache_suffix(self) -> &'static str {
        self.spec().cache_suffix
    }

    /// Parse a reply from this model using its family's convention.
    pub fn parse_count(self, content: &str) -> Result<i64, ReplyParseError> {
        self.family().parse_count(content)
    }
}

impl fmt::Display for TargetModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for TargetModel {
    type Err = String;

    /// Accepts the wire id (`google/gemma-3-12b`) or the cache suffix (`gemma-3-12b`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.id() == s || m.cache_suffix() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|m| m.cache_suffix()).collect();
                format!("unknown model '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

impl Serialize for TargetModel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

/// LLM answer for one record, next to the ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageModelResult {
    pub row_number: usize,
    pub true_count: i64,
    pub predicted_count: i64,
}

impl LanguageModelResult {
    pub fn is_correct(&self) -> bool {
        self.true_count == self.predicted_count
    }
}
