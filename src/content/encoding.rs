//! Character encoding recovery for payloads of unknown charset

use encoding_rs::WINDOWS_1252;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Encodings tried, in order, when decoding a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextEncoding {
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "latin-1")]
    Latin1,
    #[serde(rename = "iso-8859-1")]
    Iso8859_1,
    #[serde(rename = "cp1252")]
    Cp1252,
}

impl TextEncoding {
    /// Default decode order
    pub const DEFAULT_PRIORITY: [TextEncoding; 4] = [
        TextEncoding::Utf8,
        TextEncoding::Latin1,
        TextEncoding::Iso8859_1,
        TextEncoding::Cp1252,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Latin1 => "latin-1",
            Self::Iso8859_1 => "iso-8859-1",
            Self::Cp1252 => "cp1252",
        }
    }

    /// Strict decode: `None` if the bytes are not valid in this encoding
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
        match self {
            Self::Utf8 => std::str::from_utf8(bytes).ok().map(Cow::Borrowed),
            // Every byte is a Latin-1 code point
            Self::Latin1 | Self::Iso8859_1 => Some(encoding_rs::mem::decode_latin1(bytes)),
            Self::Cp1252 => WINDOWS_1252.decode_without_bom_handling_and_without_replacement(bytes),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Decode with the first encoding in `priority` that accepts the bytes.
///
/// Returns the text and the encoding that produced it, or `None` when every
/// encoding rejects the payload.
pub fn decode_with_priority<'a>(
    bytes: &'a [u8],
    priority: &[TextEncoding],
) -> Option<(Cow<'a, str>, TextEncoding)> {
    priority
        .iter()
        .find_map(|encoding| encoding.decode(bytes).map(|text| (text, *encoding)))
}
