use std::fmt;

/// Handle to a node inside a [`Document`](super::Document) arena.
///
/// Ids stay valid after the node is detached, so events can keep
/// referring to removed nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(super) u32);

impl NodeId {
    #[inline]
    pub(super) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Node payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    /// `<?xml version="1.0" encoding="..." standalone="..."?>`
    Declaration {
        version: String,
        encoding: Option<String>,
        standalone: Option<String>,
    },
    /// Raw `<!DOCTYPE ...>` body
    DocumentType(String),
    Element {
        name: String,
    },
    Attribute {
        name: String,
        value: String,
    },
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction {
        target: String,
        data: String,
    },
}

impl NodeKind {
    /// Short lowercase label for logs and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Declaration { .. } => "declaration",
            Self::DocumentType(_) => "doctype",
            Self::Element { .. } => "element",
            Self::Attribute { .. } => "attribute",
            Self::Text(_) => "text",
            Self::CData(_) => "cdata",
            Self::Comment(_) => "comment",
            Self::ProcessingInstruction { .. } => "pi",
        }
    }

    /// Qualified name for named kinds.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Element { name } | Self::Attribute { name, .. } => Some(name),
            Self::ProcessingInstruction { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Character data carried by the node, if any.
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Attribute { value, .. } => Some(value),
            Self::Text(text) | Self::CData(text) | Self::Comment(text) => Some(text),
            Self::ProcessingInstruction { data, .. } => Some(data),
            Self::DocumentType(body) => Some(body),
            _ => None,
        }
    }

    /// `xmlns` or `xmlns:prefix` attribute.
    pub fn is_namespace_declaration(&self) -> bool {
        match self {
            Self::Attribute { name, .. } => name == "xmlns" || name.starts_with("xmlns:"),
            _ => false,
        }
    }

    /// Kinds that may own children.
    pub(super) fn is_container(&self) -> bool {
        matches!(self, Self::Document | Self::Element { .. })
    }
}

#[derive(Debug, Clone)]
pub(super) struct NodeData {
    pub(super) kind: NodeKind,
    pub(super) parent: Option<NodeId>,
    pub(super) children: Vec<NodeId>,
    pub(super) attributes: Vec<NodeId>,
}

impl NodeData {
    pub(super) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            attributes: Vec::new(),
        }
    }
}
