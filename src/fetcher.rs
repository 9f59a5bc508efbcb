//! Page fetcher seam and the machinery that runs fetches for the engine.
//!
//! `FetchWorker` runs a `PageFetcher` on a background thread. Tickets go in
//! over one `mpsc` channel, `(ticket id, result)` pairs come back over
//! another; the owning thread drains them with `try_recv()` and hands them to
//! `PaginationEngine::settle`, so engine state is only touched on that thread.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use log::{debug, error};

use crate::engine::{FetchTicket, PaginationEngine, Settle};
use crate::error::FetchError;
use crate::model::Page;

/// Catalog query parameters other than the page number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub style_id: u32,
}

impl Default for Filter {
    fn default() -> Self {
        Self { style_id: 3 }
    }
}

/// Source of result pages. Blocking; called from a worker thread.
pub trait PageFetcher {
    fn fetch(&self, page: u32, filter: &Filter) -> Result<Page, FetchError>;
}

impl<T: PageFetcher + ?Sized> PageFetcher for Box<T> {
    fn fetch(&self, page: u32, filter: &Filter) -> Result<Page, FetchError> {
        (**self).fetch(page, filter)
    }
}

pub type FetchResult = (u64, Result<Page, FetchError>);

/// Background thread running fetches one ticket at a time, in order.
pub struct FetchWorker {
    req_tx: mpsc::Sender<FetchTicket>,
    res_rx: mpsc::Receiver<FetchResult>,
    // Not joined on drop: a fetch stuck in the network must not block exit.
    _handle: JoinHandle<()>,
}

impl FetchWorker {
    pub fn spawn<F>(fetcher: F, filter: Filter) -> Self
    where
        F: PageFetcher + Send + 'static,
    {
        let (req_tx, req_rx) = mpsc::channel::<FetchTicket>();
        let (res_tx, res_rx) = mpsc::channel::<FetchResult>();

        let handle = thread::spawn(move || {
            debug!("fetch worker: started");
            while let Ok(ticket) = req_rx.recv() {
                debug!("fetch worker: page {} (ticket {})", ticket.page, ticket.id);
                let start = Instant::now();
                let result = fetcher.fetch(ticket.page, &filter);
                match &result {
                    Ok(page) => debug!(
                        "fetch worker: page {} done in {:.1}ms ({} items, total {})",
                        ticket.page,
                        start.elapsed().as_secs_f64() * 1000.0,
                        page.items.len(),
                        page.total_count
                    ),
                    Err(e) => error!("fetch worker: page {} failed: {e}", ticket.page),
                }
                // Receiver gone means the viewer was torn down; drop the result.
                if res_tx.send((ticket.id, result)).is_err() {
                    break;
                }
            }
            debug!("fetch worker: channel closed, exiting");
        });

        Self {
            req_tx,
            res_rx,
            _handle: handle,
        }
    }

    pub fn dispatch(&self, ticket: FetchTicket) {
        if self.req_tx.send(ticket).is_err() {
            error!("fetch worker: gone, ticket {} not dispatched", ticket.id);
        }
    }

    /// Drain all finished fetches. Non-blocking.
    pub fn drain(&self) -> Vec<FetchResult> {
        let mut out = Vec::new();
        while let Ok(res) = self.res_rx.try_recv() {
            out.push(res);
        }
        out
    }

    /// Block until the next result arrives. `None` if the worker died.
    pub fn recv(&self) -> Option<FetchResult> {
        self.res_rx.recv().ok()
    }
}

/// Run `ticket` on the current thread and settle it, following any queued
/// refresh the settle starts.
///
/// Returns the last settle, or `None` if the engine did not recognise the
/// ticket.
pub fn fetch_and_settle<F: PageFetcher + ?Sized>(
    engine: &mut PaginationEngine,
    fetcher: &F,
    filter: &Filter,
    ticket: FetchTicket,
) -> Option<Settle> {
    let mut ticket = ticket;
    loop {
        let result = fetcher.fetch(ticket.page, filter);
        let settle = engine.settle(ticket.id, result)?;
        match settle.follow_up {
            Some(next) => ticket = next,
            None => return Some(settle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DemoCatalog;
    use crate::engine::Settled;
    use crate::reconcile::LoadOutcome;
    use std::time::Duration;

    #[test]
    fn blocking_driver_loads_and_appends() {
        let catalog = DemoCatalog::new(45, 20);
        let filter = Filter::default();
        let mut engine = PaginationEngine::new();

        let t = engine.load_initial().unwrap();
        let s = fetch_and_settle(&mut engine, &catalog, &filter, t).unwrap();
        assert_eq!(s.settled, Settled::Loaded(LoadOutcome::FullReload));

        let t = engine.prefetch([44]).unwrap();
        fetch_and_settle(&mut engine, &catalog, &filter, t).unwrap();
        let t = engine.prefetch([44]).unwrap();
        let s = fetch_and_settle(&mut engine, &catalog, &filter, t).unwrap();
        assert_eq!(s.settled, Settled::Loaded(LoadOutcome::Incremental(40..45)));
        assert!(engine.prefetch([44]).is_none());
    }

    #[test]
    fn worker_round_trip() {
        let worker = FetchWorker::spawn(DemoCatalog::new(30, 10), Filter::default());
        let mut engine = PaginationEngine::new();

        let t = engine.load_initial().unwrap();
        worker.dispatch(t);
        let (id, result) = worker.recv().unwrap();
        assert_eq!(id, t.id);
        let s = engine.settle(id, result).unwrap();
        assert_eq!(s.settled, Settled::Loaded(LoadOutcome::FullReload));
        assert_eq!(engine.store().len(), 10);
        assert_eq!(engine.item_count(), 30);
    }

    #[test]
    fn drain_is_empty_without_work() {
        let worker = FetchWorker::spawn(DemoCatalog::new(5, 5), Filter::default());
        assert!(worker.drain().is_empty());
    }

    #[test]
    fn late_result_after_restart_is_ignored() {
        let slow = DemoCatalog::new(30, 10).with_latency(Duration::from_millis(20));
        let worker = FetchWorker::spawn(slow, Filter::default());
        let mut stale_engine = PaginationEngine::new();
        let t = stale_engine.load_initial().unwrap();
        worker.dispatch(t);

        // A fresh engine (e.g. the screen was rebuilt) never issued this ticket.
        let mut engine = PaginationEngine::new();
        let (id, result) = worker.recv().unwrap();
        assert!(engine.settle(id, result).is_none());
        assert_eq!(engine.store().len(), 0);
    }
}
