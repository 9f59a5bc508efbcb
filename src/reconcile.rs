//! Load outcomes and the minimal redraw they imply for the visible window.

use std::ops::Range;

/// What changed in the item store after a successful settle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Store was replaced (initial load or refresh). Drop all cached view
    /// state and redraw everything visible.
    FullReload,
    /// Rows `range` were appended. The range counts actual insertions, so it
    /// can be shorter than the fetched page (or empty) when duplicates were
    /// dropped.
    Incremental(Range<usize>),
}

/// Rows the view has to redraw now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redraw {
    All,
    /// Sorted, possibly empty. Rows outside the visible window are redrawn
    /// naturally when they scroll in.
    Rows(Vec<usize>),
}

impl Redraw {
    pub fn is_empty(&self) -> bool {
        matches!(self, Redraw::Rows(rows) if rows.is_empty())
    }
}

pub fn plan_redraw<I>(outcome: &LoadOutcome, visible: I) -> Redraw
where
    I: IntoIterator<Item = usize>,
{
    match outcome {
        LoadOutcome::FullReload => Redraw::All,
        LoadOutcome::Incremental(range) => {
            let mut rows: Vec<usize> = visible
                .into_iter()
                .filter(|i| range.contains(i))
                .collect();
            rows.sort_unstable();
            rows.dedup();
            Redraw::Rows(rows)
        }
    }
}
