//! Transformer encoder capability.
//!
//! The encoder consumes one fixed-length sequence and returns its
//! `last_hidden_state`, flattened token-major to `seq_len * hidden_width` floats.
//! Tensor names are fixed by the exported model and must match exactly.

use crate::EmbedError;

/// Input tensor holding token ids.
pub const INPUT_IDS: &str = "input_ids";
/// Input tensor holding the attention mask.
pub const ATTENTION_MASK: &str = "attention_mask";
/// Output tensor holding per-token hidden states.
pub const LAST_HIDDEN_STATE: &str = "last_hidden_state";

pub trait Encoder {
    /// Run one sequence through the encoder.
    ///
    /// `input_ids` and `attention_mask` have equal length; the result has
    /// `input_ids.len() * hidden_width` elements.
    fn infer(&mut self, input_ids: &[i64], attention_mask: &[i64]) -> Result<Vec<f32>, EmbedError>;
}

#[cfg(feature = "onnx")]
mod onnx {
    use std::path::Path;

    use ort::session::Session;
    use ort::value::Tensor;
    use tracing::info;

    use super::{ATTENTION_MASK, Encoder, INPUT_IDS, LAST_HIDDEN_STATE};
    use crate::EmbedError;

    /// ONNX Runtime session over an exported BERT-style encoder.
    pub struct OnnxEncoder {
        session: Session,
        hidden_width: usize,
    }

    impl OnnxEncoder {
        pub fn from_file(model_path: &Path, hidden_width: usize) -> Result<Self, EmbedError> {
            if !model_path.exists() {
                return Err(EmbedError::MissingArtefact(model_path.to_path_buf()));
            }
            let session = Session::builder()
                .map_err(EmbedError::CreateSession)?
                .commit_from_file(model_path)
                .map_err(EmbedError::CreateSession)?;

            info!(hidden_width, model = %model_path.display(), "loaded encoder");
            Ok(Self {
                session,
                hidden_width,
            })
        }
    }

    impl Encoder for OnnxEncoder {
        fn infer(
            &mut self,
            input_ids: &[i64],
            attention_mask: &[i64],
        ) -> Result<Vec<f32>, EmbedError> {
            let seq_len = input_ids.len();
            let shape = [1_i64, seq_len as i64];

            let ids_tensor = Tensor::from_array((shape, input_ids.to_vec().into_boxed_slice()))
                .map_err(EmbedError::Tensor)?;
            let mask_tensor =
                Tensor::from_array((shape, attention_mask.to_vec().into_boxed_slice()))
                    .map_err(EmbedError::Tensor)?;

            let outputs = self
                .session
                .run(ort::inputs![
                    INPUT_IDS => ids_tensor,
                    ATTENTION_MASK => mask_tensor,
                ])
                .map_err(EmbedError::Inference)?;

            let (output_shape, output_data) = outputs[LAST_HIDDEN_STATE]
                .try_extract_tensor::<f32>()
                .map_err(EmbedError::Inference)?;
            let dims: &[i64] = output_shape;
            let well_formed = dims.len() == 3
                && dims[0] == 1
                && dims[1] as usize == seq_len
                && dims[2] as usize == self.hidden_width;
            if !well_formed {
                return Err(EmbedError::Encoder(format!(
                    "unexpected {LAST_HIDDEN_STATE} shape {dims:?}, expected [1, {seq_len}, {}]",
                    self.hidden_width
                )));
            }

            Ok(output_data.to_vec())
        }
    }
}

#[cfg(feature = "onnx")]
pub use onnx::OnnxEncoder;
