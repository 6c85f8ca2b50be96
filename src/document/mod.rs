//! In-memory XML document tree.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Every structural
//! edit goes through the methods below, which record a [`Mutation`] in the
//! document journal; the owning cache drains the journal after each edit and
//! turns it into change events.
//!
//! Detached nodes (created but not yet inserted, or removed) stay in the
//! arena so their ids remain resolvable.

mod mutation;
mod node;


pub use mutation::{Mutation, MutationAction, ParentLink};
pub use node::{NodeId, NodeKind};

use node::NodeData;
use thiserror::Error;

/// Structural errors raised by tree edits.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("node {0} cannot have children")]
    NotContainer(NodeId),

    #[error("node {0} is not an element")]
    NotElement(NodeId),

    #[error("node {0} is already attached")]
    AlreadyAttached(NodeId),

    #[error("node {0} is not attached")]
    Detached(NodeId),

    #[error("node {0} carries no value")]
    NoValue(NodeId),

    #[error("cannot insert {child} into {parent}: {reason}")]
    InvalidChild {
        parent: NodeId,
        child: NodeId,
        reason: &'static str,
    },

    #[error("{reference} is not a child of {parent}")]
    NotAChild { parent: NodeId, reference: NodeId },
}

pub type Result<T> = std::result::Result<T, DocumentError>;

/// Arena-backed XML document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    journal: Vec<Mutation>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document containing only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::new(NodeKind::Document)],
            journal: Vec::new(),
        }
    }

    #[inline]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    // ========================================================================
    // Read access
    // ========================================================================

    fn data(&self, id: NodeId) -> Result<&NodeData> {
        self.nodes.get(id.index()).ok_or(DocumentError::UnknownNode(id))
    }

    fn data_mut(&mut self, id: NodeId) -> Result<&mut NodeData> {
        self.nodes
            .get_mut(id.index())
            .ok_or(DocumentError::UnknownNode(id))
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.index()).map(|n| &n.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.index()).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id.index()).map_or(&[], |n| &n.children)
    }

    pub fn attributes(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id.index()).map_or(&[], |n| &n.attributes)
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.kind(id).and_then(NodeKind::name)
    }

    pub fn value(&self, id: NodeId) -> Option<&str> {
        self.kind(id).and_then(NodeKind::value)
    }

    /// Attribute node named `name` on `element`.
    pub fn attribute(&self, element: NodeId, name: &str) -> Option<NodeId> {
        self.attributes(element)
            .iter()
            .copied()
            .find(|&attr| self.name(attr) == Some(name))
    }

    /// The single top-level element.
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|&id| matches!(self.kind(id), Some(NodeKind::Element { .. })))
    }

    /// Encoding named by the leading XML declaration.
    pub fn declared_encoding(&self) -> Option<&str> {
        let first = *self.children(self.root()).first()?;
        match self.kind(first)? {
            NodeKind::Declaration { encoding, .. } => encoding.as_deref(),
            _ => None,
        }
    }

    /// First document-level processing instruction with the given target.
    pub fn find_processing_instruction(&self, target: &str) -> Option<NodeId> {
        self.children(self.root()).iter().copied().find(|&id| {
            matches!(
                self.kind(id),
                Some(NodeKind::ProcessingInstruction { target: t, .. }) if t == target
            )
        })
    }

    /// Whether `id` is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root() {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Pre-order walk over `id` and its child nodes (attributes excluded).
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: vec![id],
        }
    }

    /// Number of attached nodes, attributes included, root excluded.
    pub fn node_count(&self) -> usize {
        self.descendants(self.root())
            .map(|id| 1 + self.attributes(id).len())
            .sum::<usize>()
            - 1
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root()).is_empty()
    }

    // ========================================================================
    // Node creation (detached, not journaled)
    // ========================================================================

    /// Allocate a detached node.
    ///
    /// Attributes are created through [`Document::set_attribute`] and the
    /// root is unique, so those kinds are rejected here.
    pub fn create(&mut self, kind: NodeKind) -> Option<NodeId> {
        if matches!(kind, NodeKind::Document | NodeKind::Attribute { .. }) {
            return None;
        }
        Some(self.alloc(kind))
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData::new(kind));
        id
    }

    pub fn create_element(&mut self, name: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Element { name: name.into() })
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Comment(text.into()))
    }

    pub fn create_processing_instruction(
        &mut self,
        target: impl Into<String>,
        data: impl Into<String>,
    ) -> NodeId {
        self.alloc(NodeKind::ProcessingInstruction {
            target: target.into(),
            data: data.into(),
        })
    }

    // ========================================================================
    // Journaled edits
    // ========================================================================

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let index = self.children(parent).len();
        self.insert_at(parent, child, index)
    }

    /// Insert `child` before `reference`, which must be a child of `parent`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> Result<()> {
        let index = self
            .children(parent)
            .iter()
            .position(|&c| c == reference)
            .ok_or(DocumentError::NotAChild { parent, reference })?;
        self.insert_at(parent, child, index)
    }

    fn insert_at(&mut self, parent: NodeId, child: NodeId, index: usize) -> Result<()> {
        self.validate_child(parent, child, index)?;

        self.data_mut(parent)?.children.insert(index, child);
        self.data_mut(child)?.parent = Some(parent);
        self.journal.push(Mutation::insert(child, parent));
        Ok(())
    }

    fn validate_child(&self, parent: NodeId, child: NodeId, index: usize) -> Result<()> {
        let invalid = |reason| DocumentError::InvalidChild {
            parent,
            child,
            reason,
        };

        let parent_kind = &self.data(parent)?.kind;
        let child_data = self.data(child)?;
        if !parent_kind.is_container() {
            return Err(DocumentError::NotContainer(parent));
        }
        if child == self.root() || child_data.parent.is_some() {
            return Err(DocumentError::AlreadyAttached(child));
        }
        if matches!(child_data.kind, NodeKind::Attribute { .. }) {
            return Err(invalid("attributes are set with set_attribute"));
        }

        // Reject cycles: the child may not be an ancestor of the parent.
        let mut ancestor = Some(parent);
        while let Some(node) = ancestor {
            if node == child {
                return Err(invalid("node would become its own ancestor"));
            }
            ancestor = self.parent(node);
        }

        let at_document_level = matches!(parent_kind, NodeKind::Document);
        match &child_data.kind {
            NodeKind::Declaration { .. } if !at_document_level || index != 0 => {
                Err(invalid("the declaration must be the first node of the document"))
            }
            NodeKind::DocumentType(_) if !at_document_level => {
                Err(invalid("doctype is only allowed at document level"))
            }
            NodeKind::Text(_) | NodeKind::CData(_) if at_document_level => {
                Err(invalid("character data is not allowed at document level"))
            }
            NodeKind::Element { .. } if at_document_level && self.document_element().is_some() => {
                Err(invalid("the document already has a root element"))
            }
            _ => Ok(()),
        }
    }

    /// Detach a child node or an attribute from its parent.
    pub fn remove(&mut self, node: NodeId) -> Result<()> {
        let former = self.data(node)?.parent.ok_or(DocumentError::Detached(node))?;
        let is_attribute = matches!(self.data(node)?.kind, NodeKind::Attribute { .. });

        let parent = self.data_mut(former)?;
        if is_attribute {
            parent.attributes.retain(|&a| a != node);
        } else {
            parent.children.retain(|&c| c != node);
        }
        self.data_mut(node)?.parent = None;
        self.journal.push(Mutation::remove(node, former));
        Ok(())
    }

    /// Replace the character data of a value-carrying node.
    pub fn set_value(&mut self, node: NodeId, value: impl Into<String>) -> Result<()> {
        let data = self.data_mut(node)?;
        match &mut data.kind {
            NodeKind::Attribute { value: slot, .. }
            | NodeKind::Text(slot)
            | NodeKind::CData(slot)
            | NodeKind::Comment(slot)
            | NodeKind::DocumentType(slot)
            | NodeKind::ProcessingInstruction { data: slot, .. } => *slot = value.into(),
            _ => return Err(DocumentError::NoValue(node)),
        }
        let parent = data.parent;
        self.journal.push(Mutation::change(node, parent));
        Ok(())
    }

    /// Set or add an attribute; returns the attribute node.
    pub fn set_attribute(
        &mut self,
        element: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> Result<NodeId> {
        if !matches!(self.data(element)?.kind, NodeKind::Element { .. }) {
            return Err(DocumentError::NotElement(element));
        }
        if let Some(existing) = self.attribute(element, name) {
            self.set_value(existing, value)?;
            return Ok(existing);
        }

        let attr = self.alloc(NodeKind::Attribute {
            name: name.to_string(),
            value: value.into(),
        });
        self.data_mut(attr)?.parent = Some(element);
        self.data_mut(element)?.attributes.push(attr);
        self.journal.push(Mutation::insert(attr, element));
        Ok(attr)
    }

    /// Remove the attribute named `name`, returning the detached node.
    pub fn remove_attribute(&mut self, element: NodeId, name: &str) -> Result<Option<NodeId>> {
        if !matches!(self.data(element)?.kind, NodeKind::Element { .. }) {
            return Err(DocumentError::NotElement(element));
        }
        let Some(attr) = self.attribute(element, name) else {
            return Ok(None);
        };
        self.remove(attr)?;
        Ok(Some(attr))
    }

    /// Drain the mutation journal.
    pub fn take_journal(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.journal)
    }
}

/// Iterator returned by [`Document::descendants`].
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(id).iter().rev().copied());
        Some(id)
    }
}
