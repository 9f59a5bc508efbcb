//! Pagination engine: page cursor, in-flight gate, merge and rollback.
//!
//! The engine never performs I/O. Starting a load hands out a [`FetchTicket`];
//! whoever runs the fetch (a worker thread, or a blocking loop) brings the
//! result back through [`PaginationEngine::settle`], which is the only place
//! where the store, cursor and total change.
//!
//! At most one ticket is outstanding at a time. While it is, `load_initial`
//! and `prefetch` are no-ops and `refresh` is queued.

use log::{debug, info, warn};

use crate::error::FetchError;
use crate::model::{Beer, Page};
use crate::reconcile::LoadOutcome;
use crate::store::ItemStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// Page 1, replaces the store.
    Replace,
    /// Next page, merged into the store.
    Append,
}

/// A fetch the engine wants performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub id: u64,
    pub page: u32,
    pub kind: FetchKind,
}

/// What a single row index resolves to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Row<'a> {
    Loaded(&'a Beer),
    /// Counted in the total but not fetched yet.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Settled {
    Loaded(LoadOutcome),
    Failed(FetchError),
}

/// Result of applying a ticket's result.
#[derive(Debug, Clone, PartialEq)]
pub struct Settle {
    pub settled: Settled,
    /// This settle finished a refresh; the refresh indicator may stop.
    pub refresh_done: bool,
    /// A queued refresh that started right away and needs dispatching.
    pub follow_up: Option<FetchTicket>,
}

#[derive(Debug)]
struct InFlight {
    ticket: FetchTicket,
    /// Cursor to restore if this fetch fails.
    rollback_page: u32,
    is_refresh: bool,
}

#[derive(Debug)]
pub struct PaginationEngine {
    store: ItemStore,
    current_page: u32,
    total_count: usize,
    in_flight: Option<InFlight>,
    refreshing: bool,
    refresh_pending: bool,
    next_ticket_id: u64,
}

impl Default for PaginationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PaginationEngine {
    pub fn new() -> Self {
        Self {
            store: ItemStore::new(),
            current_page: 1,
            total_count: 0,
            in_flight: None,
            refreshing: false,
            refresh_pending: false,
            next_ticket_id: 1,
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    /// A refresh was requested and its fetch has not settled yet.
    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    /// Row count presented to the view. Rows past `store().len()` are
    /// placeholders.
    pub fn item_count(&self) -> usize {
        self.total_count
    }

    pub fn item_at(&self, index: usize) -> Option<Row<'_>> {
        match self.store.get(index) {
            Some(beer) => Some(Row::Loaded(beer)),
            None if index < self.total_count => Some(Row::Placeholder),
            None => None,
        }
    }

    /// Request page 1, unless a fetch is already in flight.
    pub fn load_initial(&mut self) -> Option<FetchTicket> {
        if self.is_fetching() {
            debug!("engine: load_initial ignored, fetch in flight");
            return None;
        }
        Some(self.start(1, FetchKind::Replace, self.current_page, false))
    }

    /// Restart from page 1. Queued if a fetch is in flight.
    pub fn refresh(&mut self) -> Option<FetchTicket> {
        self.refreshing = true;
        if self.is_fetching() {
            debug!("engine: refresh queued behind in-flight fetch");
            self.refresh_pending = true;
            return None;
        }
        Some(self.start_refresh())
    }

    /// React to the view's visible (or about to be visible) rows.
    ///
    /// Fetches the next page if any index points at a placeholder row.
    pub fn prefetch<I>(&mut self, visible: I) -> Option<FetchTicket>
    where
        I: IntoIterator<Item = usize>,
    {
        if self.is_fetching() {
            return None;
        }
        let loaded = self.store.len();
        let total = self.total_count;
        if !visible.into_iter().any(|i| i >= loaded && i < total) {
            return None;
        }
        let previous = self.current_page;
        self.current_page += 1;
        Some(self.start(self.current_page, FetchKind::Append, previous, false))
    }

    /// Apply the result of `ticket_id`.
    ///
    /// Returns `None` when the ticket is not the one in flight (a late result
    /// from before a restart); nothing is mutated in that case.
    pub fn settle(&mut self, ticket_id: u64, result: Result<Page, FetchError>) -> Option<Settle> {
        if self.in_flight.as_ref().map(|f| f.ticket.id) != Some(ticket_id) {
            debug!("engine: discarding stale result for ticket {ticket_id}");
            return None;
        }
        let in_flight = self.in_flight.take()?;
        let ticket = in_flight.ticket;

        let applied = result.and_then(|page| self.apply(ticket, page));
        let settled = match applied {
            Ok(outcome) => {
                info!(
                    "engine: page {} settled ({:?}), {} of {} loaded",
                    ticket.page,
                    outcome,
                    self.store.len(),
                    self.total_count
                );
                Settled::Loaded(outcome)
            }
            Err(e) => {
                warn!(
                    "engine: page {} failed ({e}), cursor {} -> {}",
                    ticket.page, self.current_page, in_flight.rollback_page
                );
                self.current_page = in_flight.rollback_page;
                Settled::Failed(e)
            }
        };

        let refresh_done = in_flight.is_refresh && !self.refresh_pending;
        if refresh_done {
            self.refreshing = false;
        }
        let follow_up = if self.refresh_pending {
            self.refresh_pending = false;
            Some(self.start_refresh())
        } else {
            None
        };

        Some(Settle {
            settled,
            refresh_done,
            follow_up,
        })
    }

    /// The cursor stays at 1 even if the refresh fails.
    fn start_refresh(&mut self) -> FetchTicket {
        self.current_page = 1;
        self.start(1, FetchKind::Replace, 1, true)
    }

    fn start(
        &mut self,
        page: u32,
        kind: FetchKind,
        rollback_page: u32,
        is_refresh: bool,
    ) -> FetchTicket {
        let ticket = FetchTicket {
            id: self.next_ticket_id,
            page,
            kind,
        };
        self.next_ticket_id += 1;
        info!("engine: fetching page {page} ({kind:?}, ticket {})", ticket.id);
        self.in_flight = Some(InFlight {
            ticket,
            rollback_page,
            is_refresh,
        });
        ticket
    }

    /// Validate and merge. The store is untouched on error.
    fn apply(&mut self, ticket: FetchTicket, page: Page) -> Result<LoadOutcome, FetchError> {
        match ticket.kind {
            FetchKind::Replace => {
                let unique = ItemStore::new().count_new(&page.items);
                if unique > page.total_count {
                    return Err(FetchError::InvalidPage(format!(
                        "page {} has {unique} items but total is {}",
                        ticket.page, page.total_count
                    )));
                }
                if unique == 0 && page.total_count > 0 {
                    return Err(FetchError::InvalidPage(format!(
                        "page {} is empty but total is {}",
                        ticket.page, page.total_count
                    )));
                }
                self.store.replace(page.items);
                self.total_count = page.total_count;
                self.current_page = ticket.page;
                Ok(LoadOutcome::FullReload)
            }
            FetchKind::Append => {
                let start = self.store.len();
                let added = self.store.count_new(&page.items);
                if start + added > page.total_count {
                    return Err(FetchError::InvalidPage(format!(
                        "page {} would grow the list to {} past total {}",
                        ticket.page,
                        start + added,
                        page.total_count
                    )));
                }
                // Rows still missing, so every append must make progress.
                if added == 0 && start < page.total_count {
                    return Err(FetchError::InvalidPage(format!(
                        "page {} adds no new items with {} of {} loaded",
                        ticket.page, start, page.total_count
                    )));
                }
                let inserted = self.store.append_merge(page.items);
                self.total_count = page.total_count;
                Ok(LoadOutcome::Incremental(start..start + inserted))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(range: std::ops::Range<usize>, total: usize) -> Page {
        let items = range
            .map(|i| Beer::new(format!("id{i}"), format!("Beer {i}")))
            .collect();
        Page::new(items, total)
    }

    fn loaded(engine: &mut PaginationEngine, first: Page) {
        let t = engine.load_initial().unwrap();
        engine.settle(t.id, Ok(first)).unwrap();
    }

    #[test]
    fn initial_state() {
        let engine = PaginationEngine::new();
        assert_eq!(engine.current_page(), 1);
        assert_eq!(engine.item_count(), 0);
        assert!(!engine.is_fetching());
        assert_eq!(engine.item_at(0), None);
    }

    #[test]
    fn load_initial_replaces_and_reloads() {
        let mut engine = PaginationEngine::new();
        let t = engine.load_initial().unwrap();
        assert_eq!((t.page, t.kind), (1, FetchKind::Replace));
        assert!(engine.is_fetching());

        let s = engine.settle(t.id, Ok(page(0..20, 100))).unwrap();
        assert_eq!(s.settled, Settled::Loaded(LoadOutcome::FullReload));
        assert!(!engine.is_fetching());
        assert_eq!(engine.item_count(), 100);
        assert_eq!(engine.store().len(), 20);
        assert!(matches!(engine.item_at(19), Some(Row::Loaded(_))));
        assert_eq!(engine.item_at(20), Some(Row::Placeholder));
        assert_eq!(engine.item_at(100), None);
    }

    #[test]
    fn load_initial_failure_keeps_cursor() {
        let mut engine = PaginationEngine::new();
        let t = engine.load_initial().unwrap();
        let s = engine
            .settle(t.id, Err(FetchError::Network("timeout".into())))
            .unwrap();
        assert!(matches!(s.settled, Settled::Failed(FetchError::Network(_))));
        assert!(!engine.is_fetching());
        assert_eq!(engine.current_page(), 1);
        let retry = engine.load_initial().unwrap();
        assert_eq!(retry.page, 1);
    }

    #[test]
    fn load_initial_while_fetching_is_noop() {
        let mut engine = PaginationEngine::new();
        engine.load_initial().unwrap();
        assert!(engine.load_initial().is_none());
    }

    #[test]
    fn prefetch_next_page_signals_inserted_range() {
        let mut engine = PaginationEngine::new();
        loaded(&mut engine, page(0..20, 100));

        let t = engine.prefetch([25]).unwrap();
        assert_eq!((t.page, t.kind), (2, FetchKind::Append));
        let s = engine.settle(t.id, Ok(page(20..40, 100))).unwrap();
        assert_eq!(s.settled, Settled::Loaded(LoadOutcome::Incremental(20..40)));
        assert_eq!(engine.store().len(), 40);
        assert_eq!(engine.current_page(), 2);
    }

    #[test]
    fn prefetch_range_counts_only_new_items() {
        let mut engine = PaginationEngine::new();
        loaded(&mut engine, page(0..20, 100));

        // 3 of 5 repeat ids already loaded from page 1.
        let mut second = page(17..20, 100);
        second.items.extend(page(20..22, 100).items);
        let t = engine.prefetch([20]).unwrap();
        let s = engine.settle(t.id, Ok(second)).unwrap();
        assert_eq!(s.settled, Settled::Loaded(LoadOutcome::Incremental(20..22)));
    }

    #[test]
    fn prefetch_ignores_loaded_rows() {
        let mut engine = PaginationEngine::new();
        loaded(&mut engine, page(0..20, 100));
        assert!(engine.prefetch(0..20).is_none());
        assert_eq!(engine.current_page(), 1);
    }

    #[test]
    fn prefetch_past_total_does_nothing() {
        let mut engine = PaginationEngine::new();
        loaded(&mut engine, page(0..20, 20));
        assert!(engine.prefetch([20, 21]).is_none());
    }

    #[test]
    fn prefetch_while_fetching_is_noop() {
        let mut engine = PaginationEngine::new();
        loaded(&mut engine, page(0..20, 100));
        let t = engine.prefetch([30]).unwrap();
        assert!(engine.prefetch([30, 60, 99]).is_none());
        assert_eq!(engine.current_page(), 2);
        engine.settle(t.id, Ok(page(20..40, 100))).unwrap();
    }

    #[test]
    fn prefetch_failure_rolls_cursor_back() {
        let mut engine = PaginationEngine::new();
        loaded(&mut engine, page(0..20, 100));
        let before = engine.current_page();
        let t = engine.prefetch([20]).unwrap();
        let s = engine
            .settle(t.id, Err(FetchError::Decode("eof".into())))
            .unwrap();
        assert!(matches!(s.settled, Settled::Failed(_)));
        assert_eq!(engine.current_page(), before);
        assert_eq!(engine.store().len(), 20);

        let retry = engine.prefetch([20]).unwrap();
        assert_eq!(retry.page, 2);
    }

    #[test]
    fn append_past_total_is_invalid_and_rolled_back() {
        let mut engine = PaginationEngine::new();
        loaded(&mut engine, page(0..20, 30));
        let t = engine.prefetch([25]).unwrap();
        let s = engine.settle(t.id, Ok(page(20..40, 30))).unwrap();
        assert!(matches!(s.settled, Settled::Failed(FetchError::InvalidPage(_))));
        assert_eq!(engine.store().len(), 20);
        assert_eq!(engine.current_page(), 1);
    }

    #[test]
    fn replace_larger_than_total_is_invalid() {
        let mut engine = PaginationEngine::new();
        let t = engine.load_initial().unwrap();
        let s = engine.settle(t.id, Ok(page(0..20, 10))).unwrap();
        assert!(matches!(s.settled, Settled::Failed(FetchError::InvalidPage(_))));
        assert_eq!(engine.item_count(), 0);
    }

    #[test]
    fn empty_append_with_rows_remaining_is_invalid() {
        let mut engine = PaginationEngine::new();
        loaded(&mut engine, page(0..20, 100));
        let t = engine.prefetch([20]).unwrap();
        let s = engine.settle(t.id, Ok(page(0..0, 100))).unwrap();
        assert!(matches!(s.settled, Settled::Failed(FetchError::InvalidPage(_))));
        assert_eq!(engine.current_page(), 1);
    }

    #[test]
    fn append_without_new_items_is_invalid() {
        let mut engine = PaginationEngine::new();
        loaded(&mut engine, page(0..20, 100));
        let t = engine.prefetch([20]).unwrap();
        let s = engine.settle(t.id, Ok(page(0..20, 100))).unwrap();
        assert!(matches!(s.settled, Settled::Failed(FetchError::InvalidPage(_))));
        assert_eq!(engine.current_page(), 1);
        assert_eq!(engine.store().len(), 20);

        // One new row among repeats is still progress.
        let t = engine.prefetch([20]).unwrap();
        let s = engine.settle(t.id, Ok(page(19..21, 100))).unwrap();
        assert_eq!(s.settled, Settled::Loaded(LoadOutcome::Incremental(20..21)));
        assert_eq!(engine.current_page(), 2);
    }

    #[test]
    fn refresh_resets_cursor_and_always_reloads() {
        let mut engine = PaginationEngine::new();
        loaded(&mut engine, page(0..20, 200));
        for n in 1..5 {
            let t = engine.prefetch([n * 20]).unwrap();
            engine
                .settle(t.id, Ok(page(n * 20..(n + 1) * 20, 200)))
                .unwrap();
        }
        assert_eq!(engine.current_page(), 5);

        let t = engine.refresh().unwrap();
        assert_eq!((t.page, t.kind), (1, FetchKind::Replace));
        assert!(engine.is_refreshing());
        let s = engine.settle(t.id, Ok(page(0..20, 200))).unwrap();
        assert_eq!(s.settled, Settled::Loaded(LoadOutcome::FullReload));
        assert!(s.refresh_done);
        assert!(!engine.is_refreshing());
        assert_eq!(engine.current_page(), 1);
        assert_eq!(engine.store().len(), 20);
    }

    #[test]
    fn refresh_failure_settles_indicator_and_keeps_cursor_at_one() {
        let mut engine = PaginationEngine::new();
        loaded(&mut engine, page(0..20, 100));
        let t = engine.prefetch([20]).unwrap();
        engine.settle(t.id, Ok(page(20..40, 100))).unwrap();

        let t = engine.refresh().unwrap();
        assert_eq!(engine.current_page(), 1);
        let s = engine
            .settle(t.id, Err(FetchError::Network("offline".into())))
            .unwrap();
        assert!(s.refresh_done);
        assert!(!engine.is_refreshing());
        assert_eq!(engine.current_page(), 1);
        assert_eq!(engine.store().len(), 40);
    }

    #[test]
    fn refresh_during_fetch_is_queued() {
        let mut engine = PaginationEngine::new();
        loaded(&mut engine, page(0..20, 100));
        let t = engine.prefetch([20]).unwrap();
        assert!(engine.refresh().is_none());
        assert!(engine.is_refreshing());

        let s = engine.settle(t.id, Ok(page(20..40, 100))).unwrap();
        assert_eq!(s.settled, Settled::Loaded(LoadOutcome::Incremental(20..40)));
        assert!(!s.refresh_done);
        let follow = s.follow_up.unwrap();
        assert_eq!((follow.page, follow.kind), (1, FetchKind::Replace));
        assert!(engine.is_fetching());

        let s = engine.settle(follow.id, Ok(page(0..20, 100))).unwrap();
        assert!(s.refresh_done);
        assert_eq!(engine.store().len(), 20);
    }

    #[test]
    fn stale_ticket_is_discarded() {
        let mut engine = PaginationEngine::new();
        let first = engine.load_initial().unwrap();
        assert!(engine.settle(first.id + 100, Ok(page(0..5, 5))).is_none());
        assert!(engine.is_fetching());
        engine.settle(first.id, Ok(page(0..5, 5))).unwrap();
        // Second delivery of the same ticket is stale as well.
        assert!(engine.settle(first.id, Ok(page(0..5, 5))).is_none());
    }

    #[test]
    fn total_may_change_between_pages() {
        let mut engine = PaginationEngine::new();
        loaded(&mut engine, page(0..20, 100));
        let t = engine.prefetch([20]).unwrap();
        engine.settle(t.id, Ok(page(20..40, 120))).unwrap();
        assert_eq!(engine.item_count(), 120);
    }
}
