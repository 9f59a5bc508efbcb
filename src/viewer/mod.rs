//! Terminal list viewer over the pagination engine.
//!
//! Layout:
//!   rows 0..term_rows-1 : list, one beer per line (placeholders for rows
//!                         counted in the total but not loaded yet)
//!   row term_rows-1     : status bar
//!
//! Loading:
//!   Fetches run on a `FetchWorker` thread. The event loop polls the terminal
//!   with a short timeout while a fetch is in flight, drains finished fetches
//!   and settles them on this thread. After every redraw and every successful
//!   settle the visible window plus `prefetch_ahead` rows is reported to the
//!   engine, which starts the next page when any of them is a placeholder.
//!   A failed fetch is not retried until the user scrolls or refreshes.

mod input;
mod mode_normal;
mod state;
mod terminal;

use crossterm::{
    event::{self, Event},
    terminal as crossterm_terminal,
};
use log::{debug, info};
use std::time::{Duration, Instant};

use crate::config::ViewerConfig;
use crate::engine::{FetchTicket, PaginationEngine, Settled};
use crate::fetcher::{FetchWorker, Filter, PageFetcher};
use crate::reconcile::{Redraw, plan_redraw};

use input::{InputAccumulator, map_key_event};
use mode_normal::NormalCtx;
use state::{ExitReason, Layout, ViewState};

const IDLE_POLL: Duration = Duration::from_secs(86400);
const FETCH_POLL: Duration = Duration::from_millis(20);

/// Side effects requested by mode handlers, applied by the event loop.
enum Effect {
    ScrollTo(usize),
    Refresh,
    RedrawStatusBar,
    Exit(ExitReason),
}

struct Session {
    engine: PaginationEngine,
    worker: FetchWorker,
    prefetch_ahead: usize,
}

impl Session {
    fn dispatch(&self, ticket: Option<FetchTicket>) {
        if let Some(t) = ticket {
            self.worker.dispatch(t);
        }
    }

    fn prefetch(&mut self, layout: &Layout, state: &ViewState) {
        let window =
            state.prefetch_window(layout, self.engine.item_count(), self.prefetch_ahead);
        let ticket = self.engine.prefetch(window);
        self.dispatch(ticket);
    }
}

/// Run the terminal viewer until the user quits.
///
/// `title` is shown in the status bar.
pub fn run<F>(
    fetcher: F,
    filter: Filter,
    title: String,
    config: &ViewerConfig,
) -> anyhow::Result<()>
where
    F: PageFetcher + Send + 'static,
{
    terminal::check_tty()?;

    let (term_cols, term_rows) = crossterm_terminal::size()
        .map_err(|e| anyhow::anyhow!("failed to get terminal size: {e}"))?;

    let mut guard = terminal::RawGuard::enter()?;
    let mut layout = state::compute_layout(term_cols, term_rows);
    let mut state = ViewState { top: 0, title };

    let mut session = Session {
        engine: PaginationEngine::new(),
        worker: FetchWorker::spawn(fetcher, filter),
        prefetch_ahead: config.prefetch_ahead,
    };
    info!("viewer: loading first page");
    let ticket = session.engine.load_initial();
    session.dispatch(ticket);

    let mut acc = InputAccumulator::new();
    // Flash message (e.g. a fetch error), cleared on next keypress
    let mut flash_msg: Option<String> = None;

    terminal::draw_all(&layout, &state, &session.engine)?;
    terminal::draw_status_bar(&layout, &state, &session.engine, None, None)?;

    let mut dirty = false;
    let mut last_render = Instant::now();

    loop {
        for (id, result) in session.worker.drain() {
            let Some(settle) = session.engine.settle(id, result) else {
                continue;
            };
            session.dispatch(settle.follow_up);
            match settle.settled {
                Settled::Loaded(outcome) => {
                    state.clamp(&layout, session.engine.item_count());
                    let visible = state.visible_rows(&layout, session.engine.item_count());
                    match plan_redraw(&outcome, visible) {
                        Redraw::All => dirty = true,
                        Redraw::Rows(rows) => {
                            debug!("viewer: {outcome:?} redraws {} visible rows", rows.len());
                            terminal::draw_rows(&layout, &state, &session.engine, &rows)?;
                        }
                    }
                    session.prefetch(&layout, &state);
                }
                Settled::Failed(e) => {
                    flash_msg = Some(terminal::failure_text(&e, &session.engine));
                }
            }
            terminal::draw_status_bar(
                &layout,
                &state,
                &session.engine,
                acc.peek(),
                flash_msg.as_deref(),
            )?;
        }

        let timeout = if dirty {
            config.frame_budget.saturating_sub(last_render.elapsed())
        } else if session.engine.is_fetching() {
            FETCH_POLL
        } else {
            IDLE_POLL
        };

        if event::poll(timeout)? {
            let ev = event::read()?;
            debug!("event: {ev:?}");

            let had_flash = flash_msg.take().is_some();

            match ev {
                Event::Key(key_event) => {
                    let Some(action) = map_key_event(key_event, &mut acc) else {
                        // Unknown key: reset accumulator
                        if acc.is_active() || had_flash {
                            acc.reset();
                            terminal::draw_status_bar(
                                &layout,
                                &state,
                                &session.engine,
                                None,
                                None,
                            )?;
                        }
                        continue;
                    };
                    let ctx = NormalCtx {
                        top: state.top,
                        max_top: ViewState::max_top(&layout, session.engine.item_count()),
                        scroll_step: config.scroll_step as usize,
                        page: layout.list_rows as usize,
                    };
                    for effect in mode_normal::handle(action, &ctx) {
                        match effect {
                            Effect::ScrollTo(top) => {
                                state.top = top;
                                dirty = true;
                            }
                            Effect::Refresh => {
                                info!("viewer: refresh requested");
                                let ticket = session.engine.refresh();
                                session.dispatch(ticket);
                                terminal::draw_status_bar(
                                &layout,
                                &state,
                                &session.engine,
                                None,
                                None,
                            )?;
                            }
                            Effect::RedrawStatusBar => {
                                terminal::draw_status_bar(
                                    &layout,
                                    &state,
                                    &session.engine,
                                    acc.peek(),
                                    flash_msg.as_deref(),
                                )?;
                            }
                            Effect::Exit(ExitReason::Quit) => {
                                guard.cleanup();
                                return Ok(());
                            }
                        }
                    }
                }
                Event::Resize(new_cols, new_rows) => {
                    debug!("resize: {new_cols}x{new_rows}");
                    layout = state::compute_layout(new_cols, new_rows);
                    state.clamp(&layout, session.engine.item_count());
                    terminal::clear_screen()?;
                    dirty = true;
                }
                _ => {}
            }
            continue;
        }

        // poll timeout → frame budget elapsed, execute redraw
        if dirty {
            terminal::draw_all(&layout, &state, &session.engine)?;
            terminal::draw_status_bar(
                &layout,
                &state,
                &session.engine,
                acc.peek(),
                flash_msg.as_deref(),
            )?;
            session.prefetch(&layout, &state);
            dirty = false;
        }
        last_render = Instant::now();
    }
}
