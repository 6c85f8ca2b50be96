//! Document serialization.
//!
//! [`Serializer`] is the seam used by the cache on save; [`XmlSerializer`]
//! writes the tree back out with the configured formatting.
//!
//! Characters the output encoding cannot hold become character references
//! in text, attribute values and CDATA (which is split around them). Names,
//! comments and processing instructions have no escape syntax, so such
//! characters there fail the write with `InvalidData`.

use std::borrow::Cow;
use std::io::{self, Write};

use quick_xml::escape::{escape, partial_escape};

use super::encoding::{DEFAULT_ENCODING, OutputEncoding};
use crate::document::{Document, NodeId, NodeKind};

/// Formatting applied on save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    /// Indent element-only content.
    pub indent: bool,
    /// One level of indentation (`"  "`, `"\t"`, ...).
    pub indent_unit: String,
    /// Line break written between indented nodes and inside text.
    pub newline: String,
    /// Encoding label written to the declaration.
    pub encoding: String,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent: true,
            indent_unit: "  ".to_string(),
            newline: "\r\n".to_string(),
            encoding: DEFAULT_ENCODING.to_string(),
        }
    }
}

/// Serializer collaborator.
pub trait Serializer {
    fn write(
        &self,
        document: &Document,
        out: &mut dyn Write,
        options: &FormatOptions,
    ) -> io::Result<()>;
}

/// Default XML serializer.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlSerializer;

impl Serializer for XmlSerializer {
    fn write(
        &self,
        document: &Document,
        out: &mut dyn Write,
        options: &FormatOptions,
    ) -> io::Result<()> {
        let encoding = output_encoding(options);
        let text = render(document, options, encoding)?;
        out.write_all(&encoding.encode(&text))?;
        out.flush()
    }
}

/// Serialize to an in-memory string.
///
/// The markup is prepared for `options.encoding` (declaration label and
/// character references) but returned as text, not encoded bytes.
pub fn to_string(document: &Document, options: &FormatOptions) -> io::Result<String> {
    render(document, options, output_encoding(options))
}

fn output_encoding(options: &FormatOptions) -> OutputEncoding {
    OutputEncoding::from_label(&options.encoding).unwrap_or(OutputEncoding::Utf8)
}

fn render(
    document: &Document,
    options: &FormatOptions,
    encoding: OutputEncoding,
) -> io::Result<String> {
    let mut buf = Vec::new();
    let mut writer = NodeWriter {
        doc: document,
        out: &mut buf,
        options,
        encoding,
    };

    for (i, &child) in document.children(document.root()).iter().enumerate() {
        if i > 0 && options.indent {
            writer.out.write_all(options.newline.as_bytes())?;
        }
        writer.node(child, 0)?;
    }
    if options.indent && !document.is_empty() {
        writer.out.write_all(options.newline.as_bytes())?;
    }
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

struct NodeWriter<'a> {
    doc: &'a Document,
    out: &'a mut Vec<u8>,
    options: &'a FormatOptions,
    encoding: OutputEncoding,
}

impl NodeWriter<'_> {
    fn node(&mut self, id: NodeId, depth: usize) -> io::Result<()> {
        let doc = self.doc;
        let Some(kind) = doc.kind(id) else {
            return Ok(());
        };

        match kind {
            NodeKind::Document => Ok(()),
            NodeKind::Declaration {
                version,
                encoding,
                standalone,
            } => {
                write!(self.out, "<?xml version=\"{version}\"")?;
                if encoding.is_some() {
                    write!(self.out, " encoding=\"{}\"", self.options.encoding)?;
                }
                if let Some(standalone) = standalone {
                    write!(self.out, " standalone=\"{standalone}\"")?;
                }
                self.out.write_all(b"?>")
            }
            NodeKind::DocumentType(body) => {
                self.check("doctype", body)?;
                write!(self.out, "<!DOCTYPE {body}>")
            }
            NodeKind::Element { name } => self.element(id, name, depth),
            // Attributes are written by their owner element.
            NodeKind::Attribute { .. } => Ok(()),
            NodeKind::Text(text) => {
                let escaped = partial_escape(text);
                let text = self.encode(&self.normalize_newlines(&escaped));
                self.out.write_all(text.as_bytes())
            }
            NodeKind::CData(text) => self.cdata(text),
            NodeKind::Comment(text) => {
                let text = comment_text(text);
                self.check("comment", &text)?;
                write!(self.out, "<!--{text}-->")
            }
            NodeKind::ProcessingInstruction { target, data } => {
                self.check("processing instruction", target)?;
                self.check("processing instruction", data)?;
                if data.contains("?>") {
                    return Err(invalid_data(format!(
                        "processing instruction `{target}` contains `?>`"
                    )));
                }
                if data.is_empty() {
                    write!(self.out, "<?{target}?>")
                } else {
                    write!(self.out, "<?{target} {data}?>")
                }
            }
        }
    }

    fn element(&mut self, id: NodeId, name: &str, depth: usize) -> io::Result<()> {
        let doc = self.doc;
        self.check("element name", name)?;
        write!(self.out, "<{name}")?;
        for &attr in doc.attributes(id) {
            if let Some(NodeKind::Attribute { name, value }) = doc.kind(attr) {
                self.check("attribute name", name)?;
                let value = self.encode(&escape(value.as_str()));
                write!(self.out, " {name}=\"{value}\"")?;
            }
        }

        let children = doc.children(id);
        if children.is_empty() {
            return self.out.write_all(b" />");
        }
        self.out.write_all(b">")?;

        // Mixed content is written as-is so indentation never alters text.
        let mixed = children.iter().any(|&child| {
            matches!(
                doc.kind(child),
                Some(NodeKind::Text(_) | NodeKind::CData(_))
            )
        });
        let indent = self.options.indent && !mixed;

        for &child in children {
            if indent {
                self.line_break(depth + 1)?;
            }
            self.node(child, depth + 1)?;
        }
        if indent {
            self.line_break(depth)?;
        }
        write!(self.out, "</{name}>")
    }

    fn line_break(&mut self, depth: usize) -> io::Result<()> {
        self.out.write_all(self.options.newline.as_bytes())?;
        for _ in 0..depth {
            self.out.write_all(self.options.indent_unit.as_bytes())?;
        }
        Ok(())
    }

    fn normalize_newlines(&self, text: &str) -> String {
        text.replace("\r\n", "\n")
            .replace('\n', &self.options.newline)
    }

    /// Character references for what the output encoding cannot hold.
    fn encode(&self, text: &str) -> String {
        if text.is_ascii() {
            return text.to_string();
        }
        let mut out = String::with_capacity(text.len());
        for ch in text.chars() {
            if self.encoding.can_encode(ch) {
                out.push(ch);
            } else {
                push_reference(&mut out, ch);
            }
        }
        out
    }

    /// CDATA section, split around `]]>` and around characters that need a
    /// reference.
    fn cdata(&mut self, text: &str) -> io::Result<()> {
        let mut out = String::with_capacity(text.len() + 12);
        out.push_str("<![CDATA[");
        let mut open = true;
        for (i, ch) in text.char_indices() {
            if !self.encoding.can_encode(ch) {
                if open {
                    out.push_str("]]>");
                    open = false;
                }
                push_reference(&mut out, ch);
                continue;
            }
            if !open {
                out.push_str("<![CDATA[");
                open = true;
            }
            if ch == '>' && text[..i].ends_with("]]") {
                out.push_str("]]><![CDATA[");
            }
            out.push(ch);
        }
        if open {
            out.push_str("]]>");
        }
        self.out.write_all(out.as_bytes())
    }

    /// Fail on text that has no escape syntax and cannot be encoded.
    fn check(&self, what: &str, text: &str) -> io::Result<()> {
        match text.chars().find(|&ch| !self.encoding.can_encode(ch)) {
            None => Ok(()),
            Some(ch) => Err(invalid_data(format!(
                "{what} contains '{ch}', which {} cannot represent",
                self.encoding.name()
            ))),
        }
    }
}

fn push_reference(out: &mut String, ch: char) {
    out.push_str(&format!("&#x{:X};", ch as u32));
}

/// `--` may not appear in a comment, nor may it end in `-`.
fn comment_text(text: &str) -> Cow<'_, str> {
    if !text.contains("--") && !text.ends_with('-') {
        return Cow::Borrowed(text);
    }
    let mut text = text.to_string();
    while text.contains("--") {
        text = text.replace("--", "- -");
    }
    if text.ends_with('-') {
        text.push(' ');
    }
    Cow::Owned(text)
}

fn invalid_data(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}
