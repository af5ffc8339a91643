//! Storage layer: Parquet case input, `;`-delimited embedding and result files.
//!
//! Every writer here refuses to overwrite an existing file: presence of the
//! file means the batch that produced it already completed.

mod delimited;
mod embeddings;
mod error;
mod input;
mod results;

pub use delimited::{DELIMITER, SaveOutcome};
pub use embeddings::{embedding_header, load_embeddings, save_case_table, save_embeddings};
pub use error::StoreError;
pub use input::{cases_from_batch, read_case_records, read_parquet, to_records};
pub use results::{RESULT_HEADER, ResultCache};
