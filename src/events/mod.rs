//! Change classification and dispatch.
//!
//! Document mutations drained from the journal are classified into
//! [`ChangeEvent`]s and handed to subscribers synchronously. Lifecycle
//! events (`Reloaded`, `Saved`) and batch brackets go through the same
//! channel so observers see one ordered stream.

mod dirty;
mod listeners;


pub use dirty::DirtyTracker;
pub use listeners::{ListenerId, Listeners};

use crate::document::{Document, Mutation, MutationAction};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Reloaded,
    Saved,
    NodeChanged,
    NodeInserted,
    NodeRemoved,
    NamespaceChanged,
    BeginBatch,
    EndBatch,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Reloaded => "reloaded",
            Self::Saved => "saved",
            Self::NodeChanged => "changed",
            Self::NodeInserted => "inserted",
            Self::NodeRemoved => "removed",
            Self::NamespaceChanged => "namespace",
            Self::BeginBatch => "begin-batch",
            Self::EndBatch => "end-batch",
        }
    }

    /// Node-level kinds produced by [`classify`].
    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            Self::NodeChanged | Self::NodeInserted | Self::NodeRemoved | Self::NamespaceChanged
        )
    }
}

/// Event delivered to model observers. Not retained after dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub node: Option<crate::document::NodeId>,
}

impl ChangeEvent {
    pub const fn new(kind: ChangeKind) -> Self {
        Self { kind, node: None }
    }

    pub const fn for_node(kind: ChangeKind, node: crate::document::NodeId) -> Self {
        Self {
            kind,
            node: Some(node),
        }
    }
}

/// Whether mutations come from user edits or from building a fresh tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
    Editing,
    /// Neither dispatched nor counted as dirty.
    Loading,
}

/// Map one journal entry to its event.
///
/// Namespace declarations (and nodes whose parent is one) report
/// `NamespaceChanged`; for removals the affected node is the former parent.
pub fn classify(document: &Document, mutation: &Mutation) -> ChangeEvent {
    let parent = mutation.parent.node();
    let is_ns = |id| {
        document
            .kind(id)
            .is_some_and(crate::document::NodeKind::is_namespace_declaration)
    };

    if is_ns(mutation.node) || parent.is_some_and(is_ns) {
        let affected = match mutation.action {
            MutationAction::Remove => parent.unwrap_or(mutation.node),
            MutationAction::Insert | MutationAction::Change => mutation.node,
        };
        return ChangeEvent::for_node(ChangeKind::NamespaceChanged, affected);
    }

    let kind = match mutation.action {
        MutationAction::Change => ChangeKind::NodeChanged,
        MutationAction::Insert => ChangeKind::NodeInserted,
        MutationAction::Remove => ChangeKind::NodeRemoved,
    };
    ChangeEvent::for_node(kind, mutation.node)
}

/// Batching dispatcher for [`ChangeEvent`]s.
#[derive(Default)]
pub struct ChangeNotifier {
    listeners: Listeners<ChangeEvent>,
    depth: u32,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ChangeEvent) + Send + 'static) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn emit(&mut self, event: ChangeEvent) {
        match event.node {
            Some(node) => crate::debug!("cache"; "{} {}", event.kind.label(), node),
            None => crate::debug!("cache"; "{}", event.kind.label()),
        }
        self.listeners.emit(&event);
    }

    /// Current batch nesting depth.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Open a batch; only the outermost call emits `BeginBatch`.
    pub fn begin_update(&mut self) {
        self.depth += 1;
        if self.depth == 1 {
            self.emit(ChangeEvent::new(ChangeKind::BeginBatch));
        }
    }

    /// Close a batch; only the outermost call emits `EndBatch`.
    pub fn end_update(&mut self) {
        match self.depth {
            0 => crate::debug!("cache"; "end_update without begin_update ignored"),
            1 => {
                self.depth = 0;
                self.emit(ChangeEvent::new(ChangeKind::EndBatch));
            }
            _ => self.depth -= 1,
        }
    }

    /// Classify and dispatch drained mutations.
    ///
    /// Returns the number of mutations that count as edits.
    pub fn apply(
        &mut self,
        document: &Document,
        mutations: &[Mutation],
        phase: MutationPhase,
        dirty: &mut DirtyTracker,
    ) -> usize {
        if phase == MutationPhase::Loading {
            return 0;
        }
        for mutation in mutations {
            let event = classify(document, mutation);
            dirty.mark();
            self.emit(event);
        }
        mutations.len()
    }
}
