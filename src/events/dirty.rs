/// Unsaved-edit flag.
///
/// Set by classified edits, cleared only by load, save and clear.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DirtyTracker {
    dirty: bool,
}

impl DirtyTracker {
    pub const fn new() -> Self {
        Self { dirty: false }
    }

    #[inline]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn clear(&mut self) {
        self.dirty = false;
    }
}
