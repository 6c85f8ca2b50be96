use rustc_hash::FxHashMap;

use crate::document::{Document, Mutation, MutationAction, NodeId, NodeKind};
use crate::xml::{LineInfo, LoadedDocument, STYLESHEET_TARGET, parse_stylesheet_href};

/// The live document plus what the loader learned about it.
#[derive(Debug, Default)]
pub struct DocumentStore {
    document: Document,
    line_info: FxHashMap<NodeId, LineInfo>,
    stylesheet: Option<String>,
}

impl DocumentStore {
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub(super) fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Source position of a node produced by the loader.
    pub fn line_info(&self, node: NodeId) -> Option<LineInfo> {
        self.line_info.get(&node).copied()
    }

    pub fn stylesheet(&self) -> Option<&str> {
        self.stylesheet.as_deref()
    }

    pub(super) fn set_stylesheet(&mut self, href: Option<String>) {
        self.stylesheet = href;
    }

    /// Swap in a freshly loaded tree; its construction journal is discarded.
    pub(super) fn replace(&mut self, loaded: LoadedDocument) -> Vec<Mutation> {
        let LoadedDocument {
            mut document,
            line_info,
            stylesheet,
            ..
        } = loaded;
        let journal = document.take_journal();
        self.document = document;
        self.line_info = line_info;
        self.stylesheet = stylesheet;
        journal
    }

    pub(super) fn clear(&mut self) {
        *self = Self::default();
    }

    /// Follow `xml-stylesheet` instructions at document level.
    ///
    /// Removing one falls back to the next remaining instruction; with none
    /// left the reference is kept.
    pub(super) fn track_stylesheet(&mut self, mutations: &[Mutation]) {
        let root = self.document.root();
        for mutation in mutations {
            if mutation.parent.node() != Some(root) {
                continue;
            }
            let Some(NodeKind::ProcessingInstruction { target, data }) =
                self.document.kind(mutation.node)
            else {
                continue;
            };
            if target != STYLESHEET_TARGET {
                continue;
            }

            match mutation.action {
                MutationAction::Insert | MutationAction::Change => {
                    self.stylesheet = parse_stylesheet_href(data);
                }
                MutationAction::Remove => {
                    let remaining = self
                        .document
                        .find_processing_instruction(STYLESHEET_TARGET)
                        .and_then(|pi| self.document.value(pi));
                    if let Some(data) = remaining {
                        self.stylesheet = parse_stylesheet_href(data);
                    }
                }
            }
        }
    }
}
