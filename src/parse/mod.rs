pub mod line;
pub mod outline_parser;
pub mod outline_serializer;
pub mod project_parser;
pub mod slug;
pub mod task_parser;
pub mod task_serializer;
pub mod tokens;

pub use line::{LineKind, classify, classify_all, parse_iso_date};
pub use outline_parser::parse_outline;
pub use outline_serializer::serialize_outline;
pub use project_parser::{parse, parse_document};
pub use slug::{SlugGenerator, slugify};
pub use task_serializer::{serialize_projects, serialize_task};
pub use tokens::{TaskTokens, extract_tokens, render_tokens};
