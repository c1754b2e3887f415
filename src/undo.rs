//! Linear undo history shared by pixmaps and sketches.
//!
//! Block 0 is a sentinel standing for "before any edits" and is never
//! replayed. `cursor` is the index of the most recent applied block; blocks
//! after it form the redo tail, which is discarded when a new block opens.

use tracing::debug;

#[derive(Debug, Clone)]
pub struct History<B> {
    blocks: Vec<B>,
    cursor: usize,
}

impl<B: Default> History<B> {
    pub fn new() -> Self {
        Self {
            blocks: vec![B::default()],
            cursor: 0,
        }
    }

    /// Drop every block past the cursor (the redo tail)
    pub fn truncate_redo(&mut self) {
        if self.blocks.len() > self.cursor + 1 {
            debug!(
                discarded = self.blocks.len() - self.cursor - 1,
                "discarding redo history"
            );
            self.blocks.truncate(self.cursor + 1);
        }
    }

    /// Start a new block: truncate the redo tail, push an empty block and
    /// advance the cursor onto it.
    pub fn begin_block(&mut self) -> &mut B {
        self.truncate_redo();
        self.blocks.push(B::default());
        self.cursor += 1;
        &mut self.blocks[self.cursor]
    }
}

impl<B: Default> Default for History<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> History<B> {
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.len() <= 1
    }

    /// Block the next edit records into
    #[inline]
    pub fn current(&self) -> &B {
        &self.blocks[self.cursor]
    }

    #[inline]
    pub fn current_mut(&mut self) -> &mut B {
        &mut self.blocks[self.cursor]
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.blocks.len()
    }

    /// Step back: returns the block to revert, cursor already moved past it
    pub fn undo(&mut self) -> Option<&B> {
        if !self.can_undo() {
            return None;
        }
        let idx = self.cursor;
        self.cursor -= 1;
        Some(&self.blocks[idx])
    }

    /// Step forward: returns the block to re-apply
    pub fn redo(&mut self) -> Option<&B> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(&self.blocks[self.cursor])
    }

    /// Remove the current block if it recorded nothing, so empty actions
    /// (a click that changed no pixel) don't cost an undo step.
    pub fn discard_current_if(&mut self, empty: impl FnOnce(&B) -> bool) {
        if self.cursor > 0 && self.cursor + 1 == self.blocks.len() && empty(&self.blocks[self.cursor]) {
            self.blocks.pop();
            self.cursor -= 1;
        }
    }
}
