use super::NodeId;

/// Structural operation recorded by the document journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationAction {
    Insert,
    Remove,
    Change,
}

/// Parent of the mutated node as seen at the moment of the mutation.
///
/// Removal severs the back-link, so the former parent is captured in
/// the record instead of being read from the tree afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentLink {
    Attached(NodeId),
    Severed { former: NodeId },
    Root,
}

impl ParentLink {
    /// The parent node, live or former.
    pub fn node(self) -> Option<NodeId> {
        match self {
            Self::Attached(id) | Self::Severed { former: id } => Some(id),
            Self::Root => None,
        }
    }
}

/// One journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mutation {
    pub action: MutationAction,
    pub node: NodeId,
    pub parent: ParentLink,
}

impl Mutation {
    pub(super) fn insert(node: NodeId, parent: NodeId) -> Self {
        Self {
            action: MutationAction::Insert,
            node,
            parent: ParentLink::Attached(parent),
        }
    }

    pub(super) fn remove(node: NodeId, former: NodeId) -> Self {
        Self {
            action: MutationAction::Remove,
            node,
            parent: ParentLink::Severed { former },
        }
    }

    pub(super) fn change(node: NodeId, parent: Option<NodeId>) -> Self {
        Self {
            action: MutationAction::Change,
            node,
            parent: parent.map_or(ParentLink::Root, ParentLink::Attached),
        }
    }
}
