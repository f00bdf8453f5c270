//! Page retrieval in stable sorted order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{ConnectionError, DashboardError, Result, ValidationError};
use crate::query::{RangeQuery, Record};
use crate::store::{DocumentStore, FindSpec, RecordCursor, StoreError};

/// One retrieved page
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    /// Records in ascending timestamp order, identities rendered as strings
    pub records: Vec<Record>,
    /// Wall time spent on the store round trips
    pub latency: Duration,
}

/// Retrieves `(skip, limit)` windows sorted by timestamp, then identity
///
/// The identity tie-break makes the order total, so consecutive windows
/// partition the result set as long as the collection is not modified.
pub struct PagedFetcher {
    store: Arc<dyn DocumentStore>,
    identity_field: String,
    use_hint: bool,
}

impl PagedFetcher {
    /// Create a new fetcher
    ///
    /// # Arguments
    /// * `store` - Store to read from
    /// * `identity_field` - Field used as tie-break and rendered as a string
    pub fn new(store: Arc<dyn DocumentStore>, identity_field: impl Into<String>) -> Self {
        Self {
            store,
            identity_field: identity_field.into(),
            use_hint: true,
        }
    }

    /// Enable or disable the timestamp index hint
    pub fn with_index_hint(mut self, use_hint: bool) -> Self {
        self.use_hint = use_hint;
        self
    }

    /// Fetch one page
    ///
    /// # Arguments
    /// * `query` - Query to run
    /// * `skip` - Number of records to skip
    /// * `limit` - Page size, must be positive
    ///
    /// # Returns
    /// * `Result<FetchedPage>` - At most `limit` records
    pub async fn fetch(&self, query: &RangeQuery, skip: u64, limit: u64) -> Result<FetchedPage> {
        if limit == 0 {
            return Err(ValidationError::InvalidLimit("page size must be positive".into()).into());
        }

        let started = Instant::now();
        let mut spec = FindSpec::page(query, &self.identity_field, skip, limit);
        if !self.use_hint {
            spec = spec.without_hint();
        }

        let mut cursor = self.store.find(query, &spec).await.map_err(fetch_error)?;
        let drained = drain(cursor.as_mut(), limit).await;
        cursor.close().await;

        let records: Vec<Record> = drained
            .map_err(fetch_error)?
            .into_iter()
            .map(|doc| Record::from_document(doc, &self.identity_field))
            .collect();

        let latency = started.elapsed();
        debug!(
            "Fetched {} records (skip={}, limit={}) in {} ms",
            records.len(),
            skip,
            limit,
            latency.as_millis()
        );

        Ok(FetchedPage { records, latency })
    }
}

async fn drain(
    cursor: &mut dyn RecordCursor,
    limit: u64,
) -> std::result::Result<Vec<mongodb::bson::Document>, StoreError> {
    let mut docs = Vec::new();
    while let Some(batch) = cursor.next_batch().await? {
        docs.extend(batch);
        if docs.len() as u64 >= limit {
            docs.truncate(limit as usize);
            break;
        }
    }
    Ok(docs)
}

fn fetch_error(err: StoreError) -> DashboardError {
    match err {
        StoreError::Unavailable(msg) => ConnectionError::Unavailable(msg).into(),
        other => DashboardError::Fetch(other.to_string()),
    }
}
