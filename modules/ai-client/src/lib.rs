pub mod error;
pub mod openai;
pub mod util;

pub use error::{AiError, Result};
pub use openai::{OpenAi, StructuredOutput};
pub use util::{outer_json_object, strip_code_blocks, truncate_to_char_boundary};
