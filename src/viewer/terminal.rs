//! Terminal I/O layer: raw mode, row and status bar drawing.

use crossterm::{
    ExecutableCommand, QueueableCommand, cursor,
    style::{self, Stylize},
    terminal,
};
use std::io::{self, Write, stdout};

use super::state::{Layout, ViewState};
use crate::engine::{PaginationEngine, Row};
use crate::error::FetchError;

// ---------------------------------------------------------------------------
// RawGuard: restores raw mode and the alternate screen on drop
// ---------------------------------------------------------------------------

pub(super) struct RawGuard {
    cleaned: bool,
}

impl RawGuard {
    pub(super) fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        stdout().execute(terminal::EnterAlternateScreen)?;
        stdout().execute(cursor::Hide)?;
        Ok(Self { cleaned: false })
    }

    pub(super) fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;
        let mut out = stdout();
        let _ = out.execute(cursor::Show);
        let _ = out.execute(terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

impl Drop for RawGuard {
    fn drop(&mut self) {
        self.cleanup();
    }
}

// ---------------------------------------------------------------------------
// Row formatting (pure)
// ---------------------------------------------------------------------------

/// Truncate to `width` chars, then pad with spaces.
fn fit(text: &str, width: usize) -> String {
    let mut s: String = text.chars().take(width).collect();
    let len = s.chars().count();
    s.extend(std::iter::repeat_n(' ', width - len));
    s
}

/// One list line, exactly `width` chars: `  12 name  brewery  abv`.
pub(super) fn format_row(index: usize, row: Row<'_>, width: usize) -> String {
    let number = format!("{:>5} ", index + 1);
    let rest = width.saturating_sub(number.chars().count());
    let body = match row {
        Row::Placeholder => fit("Loading…", rest),
        Row::Loaded(beer) => {
            let abv_w = 7;
            let brewery_w = rest.saturating_sub(abv_w) * 2 / 5;
            let name_w = rest.saturating_sub(abv_w + brewery_w);
            let abv = beer.abv_label().unwrap_or_default();
            format!(
                "{}{}{:>abv_w$}",
                fit(&beer.name, name_w),
                fit(beer.brewery_label(), brewery_w),
                fit(&abv, abv_w.min(rest)).trim_end(),
            )
        }
    };
    fit(&format!("{number}{body}"), width)
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

fn queue_row(
    out: &mut impl Write,
    layout: &Layout,
    state: &ViewState,
    engine: &PaginationEngine,
    index: usize,
) -> io::Result<()> {
    let Some(line) = state.screen_line(layout, index) else {
        return Ok(());
    };
    out.queue(cursor::MoveTo(0, line))?;
    match engine.item_at(index) {
        Some(row @ Row::Loaded(_)) => {
            write!(out, "{}", format_row(index, row, layout.cols as usize))?;
        }
        Some(row @ Row::Placeholder) => {
            write!(out, "{}", format_row(index, row, layout.cols as usize).dark_grey())?;
        }
        None => {
            out.queue(terminal::Clear(terminal::ClearType::CurrentLine))?;
        }
    }
    Ok(())
}

/// Redraw only `rows` (the ones a load actually changed on screen).
pub(super) fn draw_rows(
    layout: &Layout,
    state: &ViewState,
    engine: &PaginationEngine,
    rows: &[usize],
) -> io::Result<()> {
    let mut out = stdout();
    for &index in rows {
        queue_row(&mut out, layout, state, engine, index)?;
    }
    out.flush()
}

/// Redraw every list line. Lines past the end are cleared.
pub(super) fn draw_all(
    layout: &Layout,
    state: &ViewState,
    engine: &PaginationEngine,
) -> io::Result<()> {
    let mut out = stdout();
    for line in 0..layout.list_rows as usize {
        queue_row(&mut out, layout, state, engine, state.top + line)?;
    }
    out.flush()
}

/// Clear the whole screen (after a resize).
pub(super) fn clear_screen() -> io::Result<()> {
    let mut out = stdout();
    out.queue(terminal::Clear(terminal::ClearType::All))?;
    out.flush()
}

/// Flash text for a failed fetch. Scrolling only retries once a total is
/// known; before that only a refresh does.
pub(super) fn failure_text(err: &FetchError, engine: &PaginationEngine) -> String {
    let hint = if engine.item_count() == 0 {
        "r to retry"
    } else {
        "scroll or r to retry"
    };
    format!("{} error: {err} ({hint})", err.kind())
}

const KEY_HINTS: &str = "[j/k d/u g/G r:refresh q:quit]";

/// Status line text, padded to the terminal width.
pub(super) fn status_text(
    layout: &Layout,
    state: &ViewState,
    engine: &PaginationEngine,
    acc_peek: Option<u32>,
    flash: Option<&str>,
) -> String {
    let total = engine.item_count();
    let loaded = engine.store().len();
    let position = if total == 0 { 0 } else { state.top + 1 };
    let activity = if engine.is_refreshing() {
        " | refreshing…"
    } else if engine.is_fetching() {
        " | loading…"
    } else {
        ""
    };

    let middle = if let Some(msg) = flash {
        format!(" {} | {msg}", state.title)
    } else if let Some(n) = acc_peek {
        format!(" {} | :{n}_ | row {position}/{total}", state.title)
    } else {
        format!(
            " {} | row {position}/{total} | {loaded} loaded{activity}  {KEY_HINTS}",
            state.title
        )
    };
    fit(&middle, layout.cols as usize)
}

/// Draw the status bar on the last terminal row.
pub(super) fn draw_status_bar(
    layout: &Layout,
    state: &ViewState,
    engine: &PaginationEngine,
    acc_peek: Option<u32>,
    flash: Option<&str>,
) -> io::Result<()> {
    let mut out = stdout();
    out.queue(cursor::MoveTo(0, layout.status_row))?;
    let text = status_text(layout, state, engine, acc_peek, flash);
    write!(out, "{}", text.on_dark_grey().white())?;
    out.queue(style::ResetColor)?;
    out.flush()
}

pub(super) fn check_tty() -> anyhow::Result<()> {
    use std::io::IsTerminal;
    if !io::stdout().is_terminal() {
        anyhow::bail!(
            "beerscroll viewer requires an interactive terminal.\n\
             \n\
             To print the catalog instead, use: beerscroll list --pages N"
        );
    }
    Ok(())
}
