pub mod parser;
pub mod types;

pub use parser::{parse, parse_single, ParseError};
pub use types::{FileDiff, Hunk, HunkLine, LineKind, NewlineStyle, Patch};
