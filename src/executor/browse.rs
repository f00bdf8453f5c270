//! Interactive page browsing over a range query.
//!
//! A [`BrowseSession`] wires the count estimator, the pagination controller
//! and the paged fetcher together. Every call is one user action and
//! returns the page to render.

use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, Serializer};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{PaginationError, Result};
use crate::query::{RangeQuery, Record};
use crate::store::DocumentStore;

use super::count::CountEstimator;
use super::fetch::PagedFetcher;
use super::pagination::{PageMove, PaginationController};

/// Whether `total_records` is a real count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CountStatus {
    /// Count answered within its budget
    Exact,
    /// Count timed out; totals show zero until a retry succeeds
    Unavailable,
}

/// One rendered page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResponse {
    pub records: Vec<Record>,
    pub total_records: u64,
    pub total_pages: u64,
    /// 0-based
    pub current_page: u64,
    #[serde(rename = "fetch_latency_ms", serialize_with = "as_millis")]
    pub fetch_latency: Duration,
    pub count_status: CountStatus,
}

impl PageResponse {
    /// True when the query matched nothing (or its count is unavailable)
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn as_millis<S: Serializer>(d: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(d.as_millis() as u64)
}

/// Browse state for one user session
pub struct BrowseSession {
    estimator: CountEstimator,
    fetcher: PagedFetcher,
    controller: PaginationController,
    count_status: CountStatus,
    /// Last rendered page, keyed by its page index
    cached: Option<(u64, PageResponse)>,
}

impl BrowseSession {
    /// Create a session from its components
    pub fn new(
        estimator: CountEstimator,
        fetcher: PagedFetcher,
        controller: PaginationController,
    ) -> Self {
        Self {
            estimator,
            fetcher,
            controller,
            count_status: CountStatus::Exact,
            cached: None,
        }
    }

    /// Create a session configured from `config`
    pub fn from_config(store: Arc<dyn DocumentStore>, config: &Config) -> Self {
        let estimator = CountEstimator::new(Arc::clone(&store), config.count_budget());
        let fetcher = PagedFetcher::new(store, config.query.identity_field.clone())
            .with_index_hint(config.query.index_hint);
        let controller = PaginationController::new(config.pagination.page_size);
        Self::new(estimator, fetcher, controller)
    }

    pub fn controller(&self) -> &PaginationController {
        &self.controller
    }

    pub fn count_status(&self) -> CountStatus {
        self.count_status
    }

    /// Start browsing `query` at page 0
    ///
    /// A count timeout degrades to zero records with `CountStatus::Unavailable`.
    /// Any other failure, including one while fetching page 0, leaves the
    /// previous session state untouched.
    pub async fn submit(&mut self, query: RangeQuery) -> Result<PageResponse> {
        let (total, status) = self.count(&query).await?;

        let saved = (
            self.controller.clone(),
            self.count_status,
            self.cached.take(),
        );

        let ticket = self.controller.submit(query);
        let switched = self.controller.count_resolved(ticket, total);
        self.count_status = status;

        let rendered = match switched {
            Ok(_) => self.render().await,
            Err(e) => Err(e.into()),
        };
        match rendered {
            Ok(response) => {
                info!(
                    "Browsing {} records over {} pages",
                    total, response.total_pages
                );
                Ok(response)
            }
            Err(e) => {
                warn!("Query switch failed, keeping the previous query: {}", e);
                (self.controller, self.count_status, self.cached) = saved;
                Err(e)
            }
        }
    }

    /// Jump to `page` (clamped into range)
    pub async fn go_to(&mut self, page: u64) -> Result<PageResponse> {
        let previous = self.controller.current_page();
        let moved = self.controller.go_to(page)?;
        self.after_move(moved, previous).await
    }

    /// Next page; a no-op on the last page
    pub async fn next(&mut self) -> Result<PageResponse> {
        let previous = self.controller.current_page();
        let moved = self.controller.next()?;
        self.after_move(moved, previous).await
    }

    /// Previous page; a no-op on the first page
    pub async fn prev(&mut self) -> Result<PageResponse> {
        let previous = self.controller.current_page();
        let moved = self.controller.prev()?;
        self.after_move(moved, previous).await
    }

    /// Count the active query again, typically after a count timeout
    pub async fn retry_count(&mut self) -> Result<PageResponse> {
        let query = self
            .controller
            .query()
            .cloned()
            .ok_or(PaginationError::NotReady)?;
        let ticket = self.controller.ticket().ok_or(PaginationError::NotReady)?;

        let (total, status) = self.count(&query).await?;
        if status == CountStatus::Exact {
            self.controller.count_resolved(ticket, total)?;
            self.cached = None;
            self.count_status = status;
        }

        self.render().await
    }

    async fn count(&self, query: &RangeQuery) -> Result<(u64, CountStatus)> {
        match self.estimator.count(query).await {
            Ok(total) => Ok((total, CountStatus::Exact)),
            Err(e) if e.is_count_timeout() => {
                warn!("{}; showing zero records", e);
                Ok((0, CountStatus::Unavailable))
            }
            Err(e) => Err(e),
        }
    }

    async fn after_move(&mut self, moved: PageMove, previous: u64) -> Result<PageResponse> {
        if moved == PageMove::Unchanged {
            if let Some((page, response)) = &self.cached {
                if *page == self.controller.current_page() {
                    return Ok(response.clone());
                }
            }
        }

        match self.render().await {
            Ok(response) => Ok(response),
            Err(e) => {
                // Keep the page the user is still looking at
                self.controller.go_to(previous)?;
                Err(e)
            }
        }
    }

    async fn render(&mut self) -> Result<PageResponse> {
        let current_page = self.controller.current_page();
        if let Some((page, response)) = &self.cached {
            if *page == current_page {
                return Ok(response.clone());
            }
        }

        let (records, fetch_latency) = match (self.controller.window(), self.controller.query()) {
            (Some((skip, limit)), Some(query)) => {
                let page = self.fetcher.fetch(query, skip, limit).await?;
                (page.records, page.latency)
            }
            _ => (Vec::new(), Duration::ZERO),
        };

        let response = PageResponse {
            records,
            total_records: self.controller.total_records().unwrap_or(0),
            total_pages: self.controller.total_pages().unwrap_or(1),
            current_page,
            fetch_latency,
            count_status: self.count_status,
        };
        self.cached = Some((current_page, response.clone()));
        Ok(response)
    }
}
