//! In-process document store.
//!
//! Applies the same predicate, sort, skip, limit and projection the MongoDB
//! binding asks of the server, over a vector of documents. Failure injection
//! hooks let tests exercise the count-timeout and mid-stream-failure paths.

use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use tracing::debug;

use crate::query::RangeQuery;

use super::{DocumentStore, FindSpec, RecordCursor, StoreError, StoreResult};

/// Vector-backed store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: Arc<Vec<Document>>,
    count_delay: Option<Duration>,
    fail_after: Option<u64>,
    faults: Arc<Faults>,
    stats: Arc<StoreStats>,
}

/// Failure switches, shared between clones and flippable at any time
#[derive(Debug, Default)]
struct Faults {
    count_timeout: AtomicBool,
    unavailable: AtomicBool,
    find_unavailable: AtomicBool,
}

/// Call counters, shared between clones of a store
#[derive(Debug, Default)]
pub struct StoreStats {
    counts: AtomicUsize,
    finds: AtomicUsize,
    open_cursors: AtomicU64,
}

impl StoreStats {
    /// Number of `count` calls made
    pub fn counts(&self) -> usize {
        self.counts.load(Ordering::SeqCst)
    }

    /// Number of `find` calls made
    pub fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    /// Cursors opened and not yet closed or dropped
    pub fn open_cursors(&self) -> u64 {
        self.open_cursors.load(Ordering::SeqCst)
    }
}

impl MemoryStore {
    /// Create a store over `documents`, kept in insertion order
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents: Arc::new(documents),
            ..Self::default()
        }
    }

    /// Make every count fail with a time-limit error
    pub fn with_count_timeout(self) -> Self {
        self.set_count_timeout(true);
        self
    }

    /// Switch count timeouts on or off for this store and its clones
    pub fn set_count_timeout(&self, on: bool) {
        self.faults.count_timeout.store(on, Ordering::SeqCst);
    }

    /// Make `find` fail as if the server were unreachable, leaving counts alone
    pub fn set_find_unavailable(&self, on: bool) {
        self.faults.find_unavailable.store(on, Ordering::SeqCst);
    }

    /// Delay every count by `delay` before answering
    pub fn with_count_delay(mut self, delay: Duration) -> Self {
        self.count_delay = Some(delay);
        self
    }

    /// Make every cursor fail once it has handed out `records` documents
    pub fn with_failure_after(mut self, records: u64) -> Self {
        self.fail_after = Some(records);
        self
    }

    /// Make every operation fail as if the server were unreachable
    pub fn unavailable(self) -> Self {
        self.faults.unavailable.store(true, Ordering::SeqCst);
        self
    }

    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.faults.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable(
                "server selection timed out".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn count(&self, query: &RangeQuery, budget: Duration) -> StoreResult<u64> {
        self.stats.counts.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        if let Some(delay) = self.count_delay {
            tokio::time::sleep(delay).await;
        }
        if self.faults.count_timeout.load(Ordering::SeqCst) {
            return Err(StoreError::Timeout(format!(
                "operation exceeded time limit of {} ms",
                budget.as_millis()
            )));
        }

        let count = self.documents.iter().filter(|d| query.matches(d)).count();
        Ok(count as u64)
    }

    async fn find(
        &self,
        query: &RangeQuery,
        spec: &FindSpec,
    ) -> StoreResult<Box<dyn RecordCursor>> {
        self.stats.finds.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        if self.faults.find_unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }

        // Stable sort keeps insertion order for full ties
        let mut matched: Vec<&Document> =
            self.documents.iter().filter(|d| query.matches(d)).collect();
        matched.sort_by(|a, b| compare_by_sort(a, b, &spec.sort));

        let skip = usize::try_from(spec.skip).unwrap_or(usize::MAX);
        let limit = spec
            .limit
            .and_then(|l| usize::try_from(l).ok())
            .unwrap_or(usize::MAX);

        let results: Vec<Document> = matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|doc| project(doc, spec.projection.as_deref()))
            .collect();

        debug!(
            "Memory find matched {} documents (skip={}, limit={:?})",
            results.len(),
            spec.skip,
            spec.limit
        );

        self.stats.open_cursors.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryCursor {
            documents: results,
            position: 0,
            batch_size: spec.batch_size.max(1) as usize,
            fail_after: self.fail_after,
            closed: false,
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct MemoryCursor {
    documents: Vec<Document>,
    position: usize,
    batch_size: usize,
    fail_after: Option<u64>,
    closed: bool,
    stats: Arc<StoreStats>,
}

impl MemoryCursor {
    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.stats.open_cursors.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl RecordCursor for MemoryCursor {
    async fn next_batch(&mut self) -> StoreResult<Option<Vec<Document>>> {
        if self.closed {
            return Ok(None);
        }

        let mut end = (self.position + self.batch_size).min(self.documents.len());

        if let Some(limit) = self.fail_after {
            let limit = usize::try_from(limit).unwrap_or(usize::MAX);
            if self.position >= limit && self.position < self.documents.len() {
                self.release();
                return Err(StoreError::Cursor(format!(
                    "cursor killed after {} documents",
                    self.position
                )));
            }
            end = end.min(limit.max(self.position));
        }

        if self.position >= end {
            self.release();
            return Ok(None);
        }

        let batch = self.documents[self.position..end].to_vec();
        self.position = end;
        Ok(Some(batch))
    }

    async fn close(&mut self) {
        self.release();
    }

    fn fetched(&self) -> u64 {
        self.position as u64
    }
}

impl Drop for MemoryCursor {
    fn drop(&mut self) {
        self.release();
    }
}

fn compare_by_sort(a: &Document, b: &Document, sort: &Document) -> CmpOrdering {
    for (field, direction) in sort {
        let ordering = compare_values(a.get(field), b.get(field));
        let ordering = match direction {
            Bson::Int32(d) if *d < 0 => ordering.reverse(),
            Bson::Int64(d) if *d < 0 => ordering.reverse(),
            _ => ordering,
        };
        if ordering != CmpOrdering::Equal {
            return ordering;
        }
    }
    CmpOrdering::Equal
}

fn compare_values(a: Option<&Bson>, b: Option<&Bson>) -> CmpOrdering {
    match (a, b) {
        (None, None) => CmpOrdering::Equal,
        (None, Some(_)) => CmpOrdering::Less,
        (Some(_), None) => CmpOrdering::Greater,
        (Some(Bson::String(x)), Some(Bson::String(y))) => x.cmp(y),
        (Some(Bson::ObjectId(x)), Some(Bson::ObjectId(y))) => x.bytes().cmp(&y.bytes()),
        (Some(x), Some(y)) => match (as_f64(x), as_f64(y)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(CmpOrdering::Equal),
            _ => CmpOrdering::Equal,
        },
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}

fn project(doc: &Document, fields: Option<&[String]>) -> Document {
    match fields {
        None => doc.clone(),
        Some(fields) => doc
            .iter()
            .filter(|(key, _)| fields.iter().any(|f| f == *key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    }
}
