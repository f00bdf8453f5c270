//! MongoDB binding of the document store contract.

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Bson, Document};
use mongodb::options::{CountOptions, FindOptions, Hint};
use mongodb::{Collection, Cursor};
use tracing::{debug, info, warn};

use crate::error::extract_error_info;
use crate::query::RangeQuery;

use super::{DocumentStore, FindSpec, RecordCursor, StoreError, StoreResult};

/// Telemetry collection backed by a pooled MongoDB client
///
/// Cloning is cheap: the underlying collection handle shares the client's pool.
#[derive(Clone, Debug)]
pub struct MongoStore {
    collection: Collection<Document>,
}

impl MongoStore {
    /// Wrap a collection handle
    pub fn new(collection: Collection<Document>) -> Self {
        Self { collection }
    }

    /// Fully qualified collection name, `db.collection`
    pub fn namespace(&self) -> String {
        self.collection.namespace().to_string()
    }

    /// Whether some index on the collection starts with `keys`
    ///
    /// Range pages are only cheap when the compound sort can walk an index
    /// in order. The store is read-only, so a missing index is reported,
    /// never created.
    ///
    /// # Arguments
    /// * `keys` - Key prefix the index must start with, directions included
    ///
    /// # Returns
    /// * `StoreResult<bool>` - True if a matching index exists
    pub async fn has_index_on(&self, keys: &Document) -> StoreResult<bool> {
        let mut indexes = self.collection.list_indexes().await?;

        while let Some(index) = indexes.try_next().await? {
            if index_covers(&index.keys, keys) {
                debug!("Found index {:?} covering {:?}", index.keys, keys);
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Log a warning when no index starts with `keys`
    pub async fn check_range_index(&self, keys: &Document) {
        match self.has_index_on(keys).await {
            Ok(true) => {}
            Ok(false) => warn!(
                "No index on {} starts with {}; every page will sort the whole range in memory",
                self.namespace(),
                keys
            ),
            Err(e) => warn!("Could not list indexes on {}: {}", self.namespace(), e),
        }
    }
}

/// Whether `index` starts with every key of `wanted`, in order and in the
/// same direction
pub fn index_covers(index: &Document, wanted: &Document) -> bool {
    if index.len() < wanted.len() {
        return false;
    }
    index
        .iter()
        .zip(wanted.iter())
        .all(|((field, dir), (want_field, want_dir))| {
            field == want_field && direction(dir).is_some() && direction(dir) == direction(want_dir)
        })
}

fn direction(value: &Bson) -> Option<i8> {
    let n = match value {
        Bson::Int32(n) => f64::from(*n),
        Bson::Int64(n) => *n as f64,
        Bson::Double(f) => *f,
        _ => return None,
    };
    if n > 0.0 {
        Some(1)
    } else if n < 0.0 {
        Some(-1)
    } else {
        None
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn count(&self, query: &RangeQuery, budget: Duration) -> StoreResult<u64> {
        let mut options = CountOptions::default();
        options.max_time = Some(budget);

        let count = self
            .collection
            .count_documents(query.to_filter())
            .with_options(options)
            .await?;

        debug!("Counted {} documents in {}", count, self.namespace());
        Ok(count)
    }

    async fn find(
        &self,
        query: &RangeQuery,
        spec: &FindSpec,
    ) -> StoreResult<Box<dyn RecordCursor>> {
        let mut find_opts = FindOptions::default();
        if spec.is_ordered() {
            find_opts.sort = Some(spec.sort.clone());
        }
        find_opts.batch_size = Some(spec.batch_size);
        find_opts.projection = spec.projection_document();

        if spec.skip > 0 {
            find_opts.skip = Some(spec.skip);
        }
        if let Some(limit) = spec.limit {
            find_opts.limit = Some(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if let Some(ref keys) = spec.hint {
            find_opts.hint = Some(Hint::Keys(keys.clone()));
        }
        if spec.no_cursor_timeout {
            find_opts.no_cursor_timeout = Some(true);
        }
        if let Some(ref comment) = spec.comment {
            find_opts.comment = Some(Bson::String(comment.clone()));
        }

        let cursor = self
            .collection
            .find(query.to_filter())
            .with_options(find_opts)
            .await?;

        debug!(
            "Opened cursor on {} (skip={}, limit={:?}, batch={})",
            self.namespace(),
            spec.skip,
            spec.limit,
            spec.batch_size
        );

        Ok(Box::new(MongoCursor::new(cursor, spec.batch_size)))
    }
}

/// Driver cursor handed out in fixed-size batches
pub struct MongoCursor {
    cursor: Option<Cursor<Document>>,
    batch_size: u32,
    fetched: u64,
    closed: bool,
}

impl MongoCursor {
    pub fn new(cursor: Cursor<Document>, batch_size: u32) -> Self {
        Self {
            cursor: Some(cursor),
            batch_size: batch_size.max(1),
            fetched: 0,
            closed: false,
        }
    }
}

#[async_trait]
impl RecordCursor for MongoCursor {
    async fn next_batch(&mut self) -> StoreResult<Option<Vec<Document>>> {
        if self.closed {
            return Ok(None);
        }

        let cursor = match self.cursor.as_mut() {
            Some(c) => c,
            None => return Ok(None),
        };

        let mut batch = Vec::with_capacity(self.batch_size as usize);

        for _ in 0..self.batch_size {
            match cursor.try_next().await {
                Ok(Some(doc)) => batch.push(doc),
                Ok(None) => break,
                Err(e) => {
                    // Release the server-side cursor before surfacing the error
                    self.cursor = None;
                    self.closed = true;
                    let info = extract_error_info(&e);
                    return Err(StoreError::Cursor(info.summary()));
                }
            }
        }

        if batch.is_empty() {
            debug!("Cursor exhausted after {} documents", self.fetched);
            self.cursor = None;
            self.closed = true;
            Ok(None)
        } else {
            self.fetched += batch.len() as u64;
            debug!(
                "Fetched batch of {} documents (total: {})",
                batch.len(),
                self.fetched
            );
            Ok(Some(batch))
        }
    }

    async fn close(&mut self) {
        if !self.closed {
            self.cursor = None;
            self.closed = true;
            info!("Closed cursor after fetching {} documents", self.fetched);
        }
    }

    fn fetched(&self) -> u64 {
        self.fetched
    }
}

impl Drop for MongoCursor {
    fn drop(&mut self) {
        if !self.closed {
            debug!("MongoCursor dropped without explicit close");
            self.cursor = None;
        }
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        let info = extract_error_info(&err);
        if let Ok(json) = info.to_json_compact() {
            debug!("Store error: {}", json);
        }

        if info.is_time_limit() {
            StoreError::Timeout(info.summary())
        } else if info.is_unreachable() {
            StoreError::Unavailable(info.summary())
        } else {
            StoreError::Query(info.summary())
        }
    }
}
