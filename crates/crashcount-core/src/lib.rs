pub mod model;
pub mod record;
pub mod schema;

pub use model::{LanguageModelResult, ModelFamily, ModelSpec, ReplyParseError, TargetModel};
pub use record::{CaseRecord, Record};
pub use schema::{EMBEDDING_DIM, MAX_SEQUENCE_LENGTH, nmvccs};
