//! Viewer state: layout, viewport, visible and prefetch windows.

use std::ops::Range;

// ---------------------------------------------------------------------------
// Layout / ViewState
// ---------------------------------------------------------------------------

pub(super) struct Layout {
    pub cols: u16,
    pub list_rows: u16,  // rows available to the list (= term_rows - 1)
    pub status_row: u16, // last terminal row
}

pub(super) fn compute_layout(term_cols: u16, term_rows: u16) -> Layout {
    Layout {
        cols: term_cols,
        list_rows: term_rows.saturating_sub(1).max(1),
        status_row: term_rows.saturating_sub(1),
    }
}

pub(super) struct ViewState {
    /// Index of the row shown on the first screen line.
    pub top: usize,
    pub title: String,
}

impl ViewState {
    /// Largest `top` that still fills the screen.
    pub(super) fn max_top(layout: &Layout, item_count: usize) -> usize {
        item_count.saturating_sub(layout.list_rows as usize)
    }

    /// Re-clamp after the row count changed (refresh can shrink the list).
    pub(super) fn clamp(&mut self, layout: &Layout, item_count: usize) {
        self.top = self.top.min(Self::max_top(layout, item_count));
    }

    /// Row indices currently on screen.
    pub(super) fn visible_rows(&self, layout: &Layout, item_count: usize) -> Range<usize> {
        let end = (self.top + layout.list_rows as usize).min(item_count);
        self.top.min(end)..end
    }

    /// Visible rows plus `ahead` rows below: what the list reports as about
    /// to be needed.
    pub(super) fn prefetch_window(
        &self,
        layout: &Layout,
        item_count: usize,
        ahead: usize,
    ) -> Range<usize> {
        let visible = self.visible_rows(layout, item_count);
        visible.start..(visible.end + ahead).min(item_count)
    }

    /// Screen line of `index`, if it is on screen.
    pub(super) fn screen_line(&self, layout: &Layout, index: usize) -> Option<u16> {
        let line = index.checked_sub(self.top)?;
        (line < layout.list_rows as usize).then_some(line as u16)
    }
}

/// Why the event loop exited.
pub(super) enum ExitReason {
    Quit,
}
