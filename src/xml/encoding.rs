//! Input decoding and output encoding selection.
//!
//! Input is decoded from its BOM, or from the declared encoding when the
//! bytes start out ASCII-compatible. Output follows the declared encoding
//! when `encoding_rs` can write it and falls back to UTF-8 otherwise.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};
use quick_xml::encoding::detect_encoding;

pub const DEFAULT_ENCODING: &str = "utf-8";

/// How far into the input the XML declaration is looked for.
const DECL_SCAN: usize = 512;

// ============================================================================
// Input
// ============================================================================

/// Decode a whole document to text.
///
/// Returns the name of the encoding that rejected the bytes on failure.
pub fn decode(bytes: &[u8]) -> Result<String, &'static str> {
    let (detected, bom) = detect_encoding(bytes).unwrap_or((UTF_8, 0));
    let body = &bytes[bom..];

    let encoding = if detected == UTF_8 {
        let head = &body[..body.len().min(DECL_SCAN)];
        let (head, _) = UTF_8.decode_without_bom_handling(head);
        declared_label(&head)
            .and_then(input_encoding)
            .unwrap_or(UTF_8)
    } else {
        detected
    };

    quick_xml::encoding::decode(body, encoding)
        .map(Cow::into_owned)
        .map_err(|_| encoding.name())
}

/// Whether `label` names an encoding the loader knows.
pub fn is_known_label(label: &str) -> bool {
    Encoding::for_label(label.trim().as_bytes()).is_some()
}

/// Bytes read as ASCII can only be re-read with an ASCII-compatible
/// encoding; a stray `UTF-16` label keeps the UTF-8 default.
fn input_encoding(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes()).filter(|e| e.is_ascii_compatible())
}

/// `encoding` pseudo-attribute of a leading `<?xml ...?>`.
fn declared_label(head: &str) -> Option<&str> {
    let decl = head.strip_prefix("<?xml")?;
    let decl = &decl[..decl.find("?>")?];
    let at = decl.find("encoding")?;
    let rest = decl[at + "encoding".len()..]
        .trim_start()
        .strip_prefix('=')?
        .trim_start();
    let quote = rest.chars().next().filter(|c| matches!(c, '"' | '\''))?;
    let rest = &rest[1..];
    rest.find(quote).map(|end| &rest[..end])
}

// ============================================================================
// Output
// ============================================================================

/// Encodings the serializer can honor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEncoding {
    Utf8,
    /// Written with a byte order mark.
    Utf16Le,
    Utf16Be,
    /// Characters outside ASCII become character references.
    Ascii,
    /// Single or multi byte legacy encoding (`ISO-8859-1`, `Shift_JIS`, ...).
    Legacy(&'static Encoding),
}

impl OutputEncoding {
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        // encoding_rs maps these to windows-1252
        if label.eq_ignore_ascii_case("us-ascii") || label.eq_ignore_ascii_case("ascii") {
            return Some(Self::Ascii);
        }

        let encoding = Encoding::for_label(label.as_bytes())?;
        if encoding == UTF_8 {
            Some(Self::Utf8)
        } else if encoding == UTF_16LE {
            Some(Self::Utf16Le)
        } else if encoding == UTF_16BE {
            Some(Self::Utf16Be)
        } else if encoding.output_encoding() == encoding {
            Some(Self::Legacy(encoding))
        } else {
            // `replacement` and friends cannot be written
            None
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Utf16Le => "UTF-16LE",
            Self::Utf16Be => "UTF-16BE",
            Self::Ascii => "US-ASCII",
            Self::Legacy(encoding) => encoding.name(),
        }
    }

    /// Whether `ch` can be written as-is.
    pub fn can_encode(self, ch: char) -> bool {
        match self {
            Self::Utf8 | Self::Utf16Le | Self::Utf16Be => true,
            Self::Ascii => ch.is_ascii(),
            Self::Legacy(encoding) => {
                let mut buf = [0; 4];
                let (_, _, unmappable) = encoding.encode(ch.encode_utf8(&mut buf));
                !unmappable
            }
        }
    }

    /// Encode serialized markup. Unmappable characters must already have
    /// been replaced.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Self::Utf8 | Self::Ascii => text.as_bytes().to_vec(),
            Self::Utf16Le => utf16(text, [0xFF, 0xFE], u16::to_le_bytes),
            Self::Utf16Be => utf16(text, [0xFE, 0xFF], u16::to_be_bytes),
            Self::Legacy(encoding) => encoding.encode(text).0.into_owned(),
        }
    }
}

fn utf16(text: &str, bom: [u8; 2], unit: fn(u16) -> [u8; 2]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + text.len() * 2);
    out.extend_from_slice(&bom);
    for u in text.encode_utf16() {
        out.extend_from_slice(&unit(u));
    }
    out
}

/// Pick the encoding label for a save.
///
/// Returns the declared label when supported, otherwise the default along
/// with the rejected label so the caller can report it.
pub fn sniff_encoding(declared: Option<&str>) -> (String, Option<String>) {
    match declared {
        Some(label) if OutputEncoding::from_label(label).is_some() => (label.to_string(), None),
        Some(label) => (DEFAULT_ENCODING.to_string(), Some(label.to_string())),
        None => (DEFAULT_ENCODING.to_string(), None),
    }
}
