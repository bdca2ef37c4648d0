//! Content extraction
//!
//! Turns raw HTTP payloads of unknown charset into plain text: the payload is
//! decoded with the first encoding that accepts it, then reduced to its
//! visible text.

mod encoding;
mod html;

pub use encoding::{decode_with_priority, TextEncoding};
pub use html::TextExtractor;
