//! Document loading.
//!
//! The [`Loader`] trait is the seam between the cache and the parser;
//! [`XmlLoader`] is the default implementation built on `quick-xml`.
//!
//! Loading builds the tree through the regular journaled edit methods.
//! The cache discards that journal so a fresh document never starts dirty.

use std::borrow::Cow;
use std::fmt;
use std::io::{self, Read};

use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use rustc_hash::FxHashMap;
use thiserror::Error;

use super::encoding::{decode, is_known_label};
use super::position::{LineIndex, LineInfo};
use super::stylesheet::{STYLESHEET_TARGET, parse_stylesheet_href};
use crate::document::{Document, DocumentError, NodeId, NodeKind};

/// Errors that abort a load.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read input")]
    Io(#[source] io::Error),

    #[error("input is not valid {0}")]
    Encoding(&'static str),

    #[error("{position}: {message}")]
    Syntax { position: LineInfo, message: String },

    #[error("{position}: {source}")]
    Structure {
        position: LineInfo,
        #[source]
        source: DocumentError,
    },

    #[error("document has no root element")]
    NoRootElement,
}

/// Non-fatal problem noticed while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    pub position: Option<LineInfo>,
    pub message: String,
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(position) => write!(f, "{position}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Result of a successful load.
#[derive(Debug, Default)]
pub struct LoadedDocument {
    pub document: Document,
    pub line_info: FxHashMap<NodeId, LineInfo>,
    pub warnings: Vec<LoadWarning>,
    /// `href` of the first `xml-stylesheet` instruction.
    pub stylesheet: Option<String>,
}

/// Parser collaborator.
pub trait Loader {
    fn load(&self, input: &mut dyn Read) -> Result<LoadedDocument, ParseError>;
}

/// `quick-xml` backed loader.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlLoader {
    /// Keep whitespace-only text nodes.
    pub preserve_whitespace: bool,
}

impl XmlLoader {
    pub const fn new(preserve_whitespace: bool) -> Self {
        Self {
            preserve_whitespace,
        }
    }

    /// Parse a complete document held in memory.
    pub fn parse_str(&self, text: &str) -> Result<LoadedDocument, ParseError> {
        Builder::new(text, self.preserve_whitespace).run()
    }
}

impl Loader for XmlLoader {
    fn load(&self, input: &mut dyn Read) -> Result<LoadedDocument, ParseError> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes).map_err(ParseError::Io)?;
        let text = decode(&bytes).map_err(ParseError::Encoding)?;
        self.parse_str(&text)
    }
}

/// Optional pseudo-attribute of the XML declaration.
fn decl_field<E>(value: Option<Result<Cow<'_, [u8]>, E>>) -> Option<String> {
    value
        .and_then(Result::ok)
        .map(|v| String::from_utf8_lossy(&v).into_owned())
}

/// Text collected across `Text` and entity reference events.
struct PendingText {
    text: String,
    start: usize,
}

struct Builder<'a> {
    text: &'a str,
    lines: LineIndex<'a>,
    preserve_whitespace: bool,
    out: LoadedDocument,
    stack: Vec<NodeId>,
    pending: Option<PendingText>,
}

impl<'a> Builder<'a> {
    fn new(text: &'a str, preserve_whitespace: bool) -> Self {
        let out = LoadedDocument::default();
        let root = out.document.root();
        Self {
            text,
            lines: LineIndex::new(text),
            preserve_whitespace,
            out,
            stack: vec![root],
            pending: None,
        }
    }

    fn run(mut self) -> Result<LoadedDocument, ParseError> {
        let mut reader = Reader::from_str(self.text);
        reader.config_mut().trim_text(false);
        reader.config_mut().check_end_names = true;

        loop {
            let start = reader.buffer_position() as usize;
            let event = reader
                .read_event()
                .map_err(|e| self.syntax(reader.error_position() as usize, e))?;

            match event {
                Event::Text(e) => {
                    let raw = String::from_utf8_lossy(&e);
                    let text = unescape(&raw).map_err(|e| self.syntax(start, e))?;
                    self.push_text(&text, start);
                }
                Event::GeneralRef(e) => {
                    let reference = format!("&{};", String::from_utf8_lossy(&e));
                    match unescape(&reference) {
                        Ok(resolved) => self.push_text(&resolved, start),
                        Err(_) => {
                            self.warn(start, format!("unresolved entity reference {reference}"));
                            self.push_text(&reference, start);
                        }
                    }
                }
                Event::Start(e) => {
                    self.flush_text()?;
                    let element = self.element(&e, start)?;
                    self.stack.push(element);
                }
                Event::Empty(e) => {
                    self.flush_text()?;
                    self.element(&e, start)?;
                }
                Event::End(_) => {
                    self.flush_text()?;
                    self.stack.pop();
                }
                Event::Decl(e) => {
                    self.flush_text()?;
                    let version = e
                        .version()
                        .map(|v| String::from_utf8_lossy(&v).into_owned())
                        .unwrap_or_else(|_| "1.0".to_string());
                    let encoding = decl_field(e.encoding());
                    let standalone = decl_field(e.standalone());

                    if let Some(label) = &encoding
                        && !is_known_label(label)
                    {
                        self.warn(start, format!("declared encoding '{label}' read as UTF-8"));
                    }
                    self.attach(
                        NodeKind::Declaration {
                            version,
                            encoding,
                            standalone,
                        },
                        start,
                    )?;
                }
                Event::PI(e) => {
                    self.flush_text()?;
                    let target = String::from_utf8_lossy(e.target()).into_owned();
                    let data = String::from_utf8_lossy(e.content()).trim_start().to_string();
                    if target == STYLESHEET_TARGET
                        && self.stack.len() == 1
                        && self.out.stylesheet.is_none()
                    {
                        self.out.stylesheet = parse_stylesheet_href(&data);
                    }
                    self.attach(NodeKind::ProcessingInstruction { target, data }, start)?;
                }
                Event::Comment(e) => {
                    self.flush_text()?;
                    let text = String::from_utf8_lossy(&e).into_owned();
                    self.attach(NodeKind::Comment(text), start)?;
                }
                Event::CData(e) => {
                    self.flush_text()?;
                    let text = String::from_utf8_lossy(&e).into_owned();
                    self.attach(NodeKind::CData(text), start)?;
                }
                Event::DocType(e) => {
                    self.flush_text()?;
                    let body = String::from_utf8_lossy(&e).trim().to_string();
                    self.attach(NodeKind::DocumentType(body), start)?;
                }
                Event::Eof => break,
            }
        }

        self.flush_text()?;
        if self.stack.len() > 1 {
            let position = self.lines.position(self.text.len());
            return Err(ParseError::Syntax {
                position,
                message: "unexpected end of input: unclosed element".to_string(),
            });
        }
        if self.out.document.document_element().is_none() {
            return Err(ParseError::NoRootElement);
        }

        self.check_namespace_prefixes();
        Ok(self.out)
    }

    fn syntax(&self, offset: usize, err: impl fmt::Display) -> ParseError {
        ParseError::Syntax {
            position: self.lines.position(offset),
            message: err.to_string(),
        }
    }

    fn warn(&mut self, offset: usize, message: String) {
        let position = self.lines.position(offset);
        self.out.warnings.push(LoadWarning {
            position: Some(position),
            message,
        });
    }

    /// Create a node and append it to the current parent.
    fn attach(&mut self, kind: NodeKind, offset: usize) -> Result<NodeId, ParseError> {
        let position = self.lines.position(offset);
        let doc = &mut self.out.document;
        let node = doc.create(kind).ok_or(ParseError::NoRootElement)?;
        let parent = self.stack.last().copied().unwrap_or(doc.root());
        doc.append_child(parent, node)
            .map_err(|source| ParseError::Structure { position, source })?;
        self.out.line_info.insert(node, position);
        Ok(node)
    }

    fn element(&mut self, start: &BytesStart<'_>, offset: usize) -> Result<NodeId, ParseError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let element = self.attach(NodeKind::Element { name }, offset)?;
        let position = self.lines.position(offset);

        for attr in start.attributes() {
            let attr = attr.map_err(|e| self.syntax(offset, e))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .decode_and_unescape_value(start.decoder())
                .map_err(|e| self.syntax(offset, e))?
                .into_owned();
            let node = self
                .out
                .document
                .set_attribute(element, &key, value)
                .map_err(|source| ParseError::Structure { position, source })?;
            self.out.line_info.insert(node, position);
        }

        Ok(element)
    }

    fn push_text(&mut self, text: &str, offset: usize) {
        match &mut self.pending {
            Some(pending) => pending.text.push_str(text),
            None => {
                self.pending = Some(PendingText {
                    text: text.to_string(),
                    start: offset,
                });
            }
        }
    }

    fn flush_text(&mut self) -> Result<(), ParseError> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };

        let whitespace = pending.text.chars().all(char::is_whitespace);
        if self.stack.len() == 1 {
            // Only whitespace may appear between top-level nodes.
            if whitespace {
                return Ok(());
            }
            return Err(ParseError::Syntax {
                position: self.lines.position(pending.start),
                message: "text is not allowed outside the root element".to_string(),
            });
        }
        if whitespace && !self.preserve_whitespace {
            return Ok(());
        }

        self.attach(NodeKind::Text(pending.text), pending.start)?;
        Ok(())
    }

    /// Report element prefixes with no matching `xmlns:prefix` in scope.
    fn check_namespace_prefixes(&mut self) {
        let doc = &self.out.document;
        let mut warnings = Vec::new();

        for id in doc.descendants(doc.root()) {
            let Some(NodeKind::Element { name }) = doc.kind(id) else {
                continue;
            };
            let Some((prefix, _)) = name.split_once(':') else {
                continue;
            };
            if prefix == "xml" {
                continue;
            }

            let declaration = format!("xmlns:{prefix}");
            let mut scope = Some(id);
            let mut declared = false;
            while let Some(node) = scope {
                if doc.attribute(node, &declaration).is_some() {
                    declared = true;
                    break;
                }
                scope = doc.parent(node);
            }

            if !declared {
                warnings.push(LoadWarning {
                    position: self.out.line_info.get(&id).copied(),
                    message: format!("namespace prefix '{prefix}' is not declared"),
                });
            }
        }

        self.out.warnings.extend(warnings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> LoadedDocument {
        XmlLoader::default().parse_str(text).unwrap()
    }

    #[test]
    fn test_builds_tree() {
        let loaded = parse(r#"<?xml version="1.0"?><books><book id="1">Dune</book></books>"#);
        let doc = &loaded.document;

        let root = doc.document_element().unwrap();
        assert_eq!(doc.name(root), Some("books"));
        let book = doc.children(root)[0];
        assert_eq!(doc.name(book), Some("book"));
        let id = doc.attribute(book, "id").unwrap();
        assert_eq!(doc.value(id), Some("1"));
        assert_eq!(doc.value(doc.children(book)[0]), Some("Dune"));
    }

    #[test]
    fn test_load_does_not_leave_pending_events_for_the_caller_to_miss() {
        // The journal records the construction; the cache decides what to do with it.
        let mut loaded = parse("<a><b/></a>");
        assert_eq!(loaded.document.take_journal().len(), 2);
    }

    #[test]
    fn test_whitespace_dropped_by_default() {
        let loaded = parse("<a>\n  <b/>\n</a>");
        let doc = &loaded.document;
        let root = doc.document_element().unwrap();
        assert_eq!(doc.children(root).len(), 1);
    }

    #[test]
    fn test_whitespace_preserved_on_request() {
        let loaded = XmlLoader::new(true).parse_str("<a>\n  <b/>\n</a>").unwrap();
        let doc = &loaded.document;
        let root = doc.document_element().unwrap();
        assert_eq!(doc.children(root).len(), 3);
    }

    #[test]
    fn test_entities_merge_into_one_text_node() {
        let loaded = parse("<a>fish &amp; chips &#x21;</a>");
        let doc = &loaded.document;
        let root = doc.document_element().unwrap();
        assert_eq!(doc.children(root).len(), 1);
        assert_eq!(doc.value(doc.children(root)[0]), Some("fish & chips !"));
    }

    #[test]
    fn test_attribute_values_unescaped() {
        let loaded = parse(r#"<a title="x &lt; y"/>"#);
        let doc = &loaded.document;
        let root = doc.document_element().unwrap();
        let title = doc.attribute(root, "title").unwrap();
        assert_eq!(doc.value(title), Some("x < y"));
    }

    #[test]
    fn test_line_info_recorded() {
        let loaded = parse("<a>\n  <b/>\n</a>");
        let doc = &loaded.document;
        let root = doc.document_element().unwrap();
        let b = doc.children(root)[0];
        assert_eq!(loaded.line_info[&root], LineInfo::new(1, 1));
        assert_eq!(loaded.line_info[&b], LineInfo::new(2, 3));
    }

    #[test]
    fn test_stylesheet_reference() {
        let loaded = parse(
            r#"<?xml-stylesheet type="text/xsl" href="view.xsl"?><catalog/>"#,
        );
        assert_eq!(loaded.stylesheet.as_deref(), Some("view.xsl"));
    }

    #[test]
    fn test_misc_nodes() {
        let loaded = parse("<!DOCTYPE note><!-- top --><note><![CDATA[<raw>]]></note>");
        let doc = &loaded.document;
        let kinds: Vec<_> = doc
            .children(doc.root())
            .iter()
            .map(|&id| doc.kind(id).unwrap().label())
            .collect();
        assert_eq!(kinds, ["doctype", "comment", "element"]);

        let note = doc.document_element().unwrap();
        assert_eq!(
            doc.kind(doc.children(note)[0]),
            Some(&NodeKind::CData("<raw>".to_string()))
        );
    }

    #[test]
    fn test_declared_encoding_kept() {
        let loaded = parse(r#"<?xml version="1.0" encoding="UTF-8"?><a/>"#);
        assert_eq!(loaded.document.declared_encoding(), Some("UTF-8"));
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn test_unknown_encoding_warns() {
        let loaded = parse(r#"<?xml version="1.0" encoding="x-bogus"?><a/>"#);
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].message.contains("x-bogus"));

        let loaded = parse(r#"<?xml version="1.0" encoding="ISO-8859-1"?><a/>"#);
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn test_declared_latin1_decoded() {
        let mut input: &[u8] = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><a>caf\xE9</a>";
        let loaded = XmlLoader::default().load(&mut input).unwrap();
        let doc = &loaded.document;
        let a = doc.document_element().unwrap();
        assert_eq!(doc.value(doc.children(a)[0]), Some("café"));
        assert_eq!(doc.declared_encoding(), Some("ISO-8859-1"));
    }

    #[test]
    fn test_undeclared_prefix_warns() {
        let loaded = parse("<root><x:item/></root>");
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].message.contains("'x'"));

        let loaded = parse(r#"<root xmlns:x="urn:x"><x:item/></root>"#);
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn test_mismatched_end_tag_fails() {
        let err = XmlLoader::default().parse_str("<a><b></a>").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }

    #[test]
    fn test_unclosed_element_fails() {
        let err = XmlLoader::default().parse_str("<a><b>").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }

    #[test]
    fn test_empty_input_has_no_root() {
        let err = XmlLoader::default().parse_str("  ").unwrap_err();
        assert!(matches!(err, ParseError::NoRootElement));
    }

    #[test]
    fn test_two_roots_rejected() {
        let err = XmlLoader::default().parse_str("<a/><b/>").unwrap_err();
        assert!(matches!(err, ParseError::Structure { .. }));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let mut input: &[u8] = &[b'<', b'a', 0xff, b'/', b'>'];
        let err = XmlLoader::default().load(&mut input).unwrap_err();
        assert!(matches!(err, ParseError::Encoding("UTF-8")));
    }

    #[test]
    fn test_bom_skipped() {
        let mut input: &[u8] = "\u{feff}<a/>".as_bytes();
        let loaded = XmlLoader::default().load(&mut input).unwrap();
        assert!(loaded.document.document_element().is_some());
    }
}
