//! XML parsing and serialization.

mod encoding;
mod loader;
mod position;
mod stylesheet;
mod writer;

pub use encoding::{DEFAULT_ENCODING, OutputEncoding, sniff_encoding};
pub use loader::{LoadWarning, LoadedDocument, Loader, ParseError, XmlLoader};
pub use position::LineInfo;
pub use stylesheet::{STYLESHEET_TARGET, parse_stylesheet_href};
pub use writer::{FormatOptions, Serializer, XmlSerializer, to_string};
