//! Catalog backends: the HTTP client and an in-process demo catalog.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use log::{debug, warn};
use serde::Deserialize;

use crate::error::FetchError;
use crate::fetcher::{Filter, PageFetcher};
use crate::model::{Beer, Page};

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BeerListResponse {
    current_page: Option<u32>,
    number_of_pages: Option<u32>,
    #[serde(default)]
    total_results: usize,
    // Absent when the page is past the end.
    #[serde(default)]
    data: Vec<BeerRecord>,
}

#[derive(Deserialize)]
struct BeerRecord {
    id: String,
    name: String,
    #[serde(default)]
    abv: Option<String>,
    #[serde(default)]
    breweries: Vec<BreweryRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BreweryRecord {
    name_short_display: Option<String>,
}

impl From<BeerRecord> for Beer {
    fn from(rec: BeerRecord) -> Self {
        let abv = rec.abv.as_deref().and_then(|s| match s.trim().parse::<f64>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("catalog: beer {} has unparsable abv {s:?}", rec.id);
                None
            }
        });
        let brewery = rec
            .breweries
            .into_iter()
            .next()
            .and_then(|b| b.name_short_display);
        Beer {
            id: rec.id.into(),
            name: rec.name,
            brewery,
            abv,
        }
    }
}

/// Decode a `/beers` response body.
pub fn decode_page(body: &str) -> Result<Page, FetchError> {
    let resp: BeerListResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    Ok(Page {
        items: resp.data.into_iter().map(Beer::from).collect(),
        total_count: resp.total_results,
        page_number: resp.current_page,
        page_count: resp.number_of_pages,
    })
}

// ---------------------------------------------------------------------------
// CatalogClient: HTTP
// ---------------------------------------------------------------------------

pub struct CatalogClient {
    agent: ureq::Agent,
    base_url: String,
    api_key: Option<String>,
}

impl CatalogClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn beers_url(&self) -> String {
        format!("{}/beers", self.base_url)
    }
}

impl PageFetcher for CatalogClient {
    fn fetch(&self, page: u32, filter: &Filter) -> Result<Page, FetchError> {
        let url = self.beers_url();
        debug!("catalog: GET {url} p={page} styleId={}", filter.style_id);
        let mut req = self
            .agent
            .get(&url)
            .query("p", page.to_string())
            .query("styleId", filter.style_id.to_string());
        if let Some(key) = &self.api_key {
            req = req.query("key", key);
        }
        let mut resp = req
            .call()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let body = resp
            .body_mut()
            .read_to_string()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        decode_page(&body)
    }
}

// ---------------------------------------------------------------------------
// DemoCatalog: deterministic, in-process
// ---------------------------------------------------------------------------

const DEMO_NAMES: &[&str] = &[
    "Hop Harvest", "Copper Kettle", "Night Shift", "Golden Hour", "River Bend",
    "Old Anchor", "Pine Ridge", "Morning Fog", "Iron Gate", "Wild Clover",
];
const DEMO_BREWERIES: &[&str] = &["Northgate", "Saltmarsh", "Hollow Oak", "Red Barn"];

/// Catalog of `total` generated beers served `page_size` at a time.
///
/// Optional latency and a budget of failing calls make it usable as a stand-in
/// for the network in the viewer (`--offline`) and in tests.
pub struct DemoCatalog {
    total: usize,
    page_size: usize,
    latency: Duration,
    failures_left: AtomicU32,
    calls: Arc<AtomicUsize>,
}

impl DemoCatalog {
    pub fn new(total: usize, page_size: usize) -> Self {
        Self {
            total,
            page_size: page_size.max(1),
            latency: Duration::ZERO,
            failures_left: AtomicU32::new(0),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// The next `n` calls fail with a network error.
    pub fn with_failures(self, n: u32) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    /// Shared counter of `fetch` calls, readable after the catalog moved
    /// into a worker.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    fn beer(index: usize, style_id: u32) -> Beer {
        let name = DEMO_NAMES[index % DEMO_NAMES.len()];
        let beer = Beer::new(
            format!("demo-{style_id}-{index}"),
            format!("{name} No. {}", index + 1),
        );
        let beer = if index % 5 == 4 {
            beer
        } else {
            beer.with_brewery(DEMO_BREWERIES[index % DEMO_BREWERIES.len()])
        };
        if index % 7 == 6 {
            beer
        } else {
            beer.with_abv(4.0 + (index % 40) as f64 / 10.0)
        }
    }
}

impl PageFetcher for DemoCatalog {
    fn fetch(&self, page: u32, filter: &Filter) -> Result<Page, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(FetchError::Network(format!("demo: injected failure on page {page}")));
        }
        if page == 0 {
            return Err(FetchError::InvalidPage("page numbers start at 1".into()));
        }

        let start = ((page - 1) as usize).saturating_mul(self.page_size).min(self.total);
        let end = (start + self.page_size).min(self.total);
        let items = (start..end).map(|i| Self::beer(i, filter.style_id)).collect();
        Ok(Page {
            items,
            total_count: self.total,
            page_number: Some(page),
            page_count: Some(self.total.div_ceil(self.page_size) as u32),
        })
    }
}
