//! Export coordinator for streaming a range query into CSV
//!
//! Drains a server-side cursor in batches, hands fixed-size groups of
//! records to the CSV buffer, and reports progress. The cursor is closed on
//! every exit path.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{Config, FailurePolicy, SchemaPolicy};
use crate::error::{ConnectionError, DashboardError, ExportError, Result};
use crate::executor::count::CountEstimator;
use crate::query::{RangeQuery, Record};
use crate::store::{DocumentStore, FindSpec, RecordCursor, StoreError};

use super::csv::CsvBuffer;
use super::progress::ProgressTracker;
use super::{ExportOutcome, ExportStatus};

/// Settings for one export run
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Records per CSV writer call
    pub batch_size: usize,
    /// Documents per cursor round trip
    pub cursor_batch_size: u32,
    /// Fields to retrieve; identity is always added
    pub projection: Option<Vec<String>>,
    pub schema_policy: SchemaPolicy,
    pub failure_policy: FailurePolicy,
    pub identity_field: String,
    /// Show a progress bar
    pub progress: bool,
    /// Count before streaming to size the progress bar
    pub count_first: bool,
    pub count_budget: Duration,
    pub index_hint: bool,
}

impl ExportOptions {
    /// Options taken from configuration; `count_first` starts off
    pub fn from_config(config: &Config) -> Self {
        Self {
            batch_size: config.export.batch_size.max(1),
            cursor_batch_size: config.export.cursor_batch_size,
            projection: config.export.projection.clone(),
            schema_policy: config.export.schema_policy,
            failure_policy: config.export.failure_policy,
            identity_field: config.query.identity_field.clone(),
            progress: config.export.progress,
            count_first: false,
            count_budget: config.count_budget(),
            index_hint: config.query.index_hint,
        }
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Streams a query's full result set into a CSV payload
pub struct StreamingExporter {
    store: Arc<dyn DocumentStore>,
    options: ExportOptions,
    /// Cancellation token for aborting export
    cancel_token: Option<CancellationToken>,
}

impl StreamingExporter {
    /// Create a new exporter
    pub fn new(store: Arc<dyn DocumentStore>, options: ExportOptions) -> Self {
        Self {
            store,
            options,
            cancel_token: None,
        }
    }

    /// Set cancellation token for this export operation
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Export every record matching `query`
    ///
    /// A mid-stream store failure is either reported as an error with no
    /// payload (`FailurePolicy::Discard`) or returned as an outcome marked
    /// `Partial` (`FailurePolicy::FlagPartial`). Cancellation and schema
    /// errors always abort.
    ///
    /// # Arguments
    /// * `query` - Query to export
    ///
    /// # Returns
    /// * `Result<ExportOutcome>` - CSV payload and record count, or error
    pub async fn export(&self, query: &RangeQuery) -> Result<ExportOutcome> {
        let started = Instant::now();
        info!("Starting {} export", query.mode());

        let total = self.count_first(query).await?;
        let tracker = ProgressTracker::new(total, self.options.progress);

        let mut spec = FindSpec::export(
            query,
            &self.options.identity_field,
            self.options.cursor_batch_size,
            self.options.projection.clone(),
        );
        if !self.options.index_hint {
            // No range index to walk: stream in scan order instead of sorting
            spec = spec.unordered();
        }

        let mut cursor = match self.store.find(query, &spec).await {
            Ok(cursor) => cursor,
            Err(e) => {
                tracker.finish();
                return Err(open_error(e));
            }
        };

        let mut buffer = CsvBuffer::new(self.options.schema_policy);
        let streamed = self.stream(cursor.as_mut(), &mut buffer, &tracker).await;
        cursor.close().await;
        tracker.finish();

        let status = match streamed {
            Ok(()) => ExportStatus::Complete,
            Err(ExportError::StoreFailure {
                records_streamed,
                message,
            }) if self.options.failure_policy == FailurePolicy::FlagPartial => {
                warn!(
                    "Export failed after {} records; keeping them as partial output: {}",
                    records_streamed, message
                );
                ExportStatus::Partial { error: message }
            }
            Err(e) => {
                warn!("Export aborted: {}", e);
                return Err(e.into());
            }
        };

        let records = buffer.written();
        let payload = buffer.into_payload()?;
        let elapsed = started.elapsed();
        info!(
            "Export finished: {} records, {} bytes, {} ms",
            records,
            payload.len(),
            elapsed.as_millis()
        );

        Ok(ExportOutcome {
            payload,
            records,
            mode: query.mode(),
            status,
            elapsed,
        })
    }

    /// Pre-export count; a timeout leaves the total unknown
    async fn count_first(&self, query: &RangeQuery) -> Result<Option<u64>> {
        if !self.options.count_first {
            return Ok(None);
        }

        let estimator = CountEstimator::new(Arc::clone(&self.store), self.options.count_budget);
        match estimator.count(query).await {
            Ok(total) => Ok(Some(total)),
            Err(e) if e.is_count_timeout() => {
                debug!("Count unavailable, exporting without a total");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn stream(
        &self,
        cursor: &mut dyn RecordCursor,
        buffer: &mut CsvBuffer,
        tracker: &ProgressTracker,
    ) -> std::result::Result<(), ExportError> {
        let batch_size = self.options.batch_size;
        let mut pending: Vec<Record> = Vec::with_capacity(batch_size);
        let mut streamed = 0u64;
        let mut round_trips = 0u32;

        loop {
            let next = match &self.cancel_token {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        info!("Export cancelled after {} records", streamed);
                        return Err(ExportError::Cancelled {
                            records_streamed: streamed,
                        });
                    }
                    batch = cursor.next_batch() => batch,
                },
                None => cursor.next_batch().await,
            };

            match next {
                Ok(Some(docs)) => {
                    round_trips += 1;
                    streamed += docs.len() as u64;
                    for doc in docs {
                        pending.push(Record::from_document(doc, &self.options.identity_field));
                        if pending.len() >= batch_size {
                            buffer.write_batch(&pending)?;
                            pending.clear();
                            tracker.update(buffer.written());
                        }
                    }
                    if round_trips % 10 == 0 {
                        debug!("Progress: {} records streamed", streamed);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    // Pending rows only matter when the partial payload is kept,
                    // and the store error outranks any flush failure
                    if self.options.failure_policy == FailurePolicy::FlagPartial {
                        if let Err(flush) = buffer.write_batch(&pending) {
                            warn!("Dropping {} pending rows: {}", pending.len(), flush);
                        }
                    }
                    return Err(ExportError::StoreFailure {
                        records_streamed: streamed,
                        message: e.message().to_string(),
                    });
                }
            }
        }

        buffer.write_batch(&pending)?;
        tracker.update(buffer.written());
        Ok(())
    }
}

fn open_error(err: StoreError) -> DashboardError {
    match err {
        StoreError::Unavailable(msg) => ConnectionError::Unavailable(msg).into(),
        other => ExportError::StoreFailure {
            records_streamed: 0,
            message: other.message().to_string(),
        }
        .into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Mode, QueryBuilder, StatusBand};
    use crate::store::MemoryStore;
    use chrono::NaiveDate;
    use mongodb::bson::{Document, doc};

    fn query() -> RangeQuery {
        let day = NaiveDate::from_ymd_opt(2025, 8, 28).unwrap();
        QueryBuilder::new(StatusBand::new("Genset_Run_SS", 0, 2)).build(
            day.and_hms_opt(0, 0, 0).unwrap(),
            day.and_hms_opt(23, 59, 59).unwrap(),
            Mode::Fetch,
        )
    }

    fn docs(n: u32) -> Vec<Document> {
        (0..n)
            .map(|i| {
                doc! {
                    "_id": i as i64,
                    "timestamp": format!("2025-08-28T{:02}:{:02}:{:02}", i / 3600, i / 60 % 60, i % 60),
                    "Genset_Run_SS": (i % 3) as i32,
                }
            })
            .collect()
    }

    fn options() -> ExportOptions {
        ExportOptions {
            batch_size: 100,
            cursor_batch_size: 64,
            progress: false,
            ..ExportOptions::default()
        }
    }

    #[tokio::test]
    async fn test_export_all_records() {
        let store = Arc::new(MemoryStore::new(docs(250)));
        let exporter = StreamingExporter::new(store.clone(), options());
        let outcome = exporter.export(&query()).await.unwrap();

        assert_eq!(outcome.records, 250);
        assert_eq!(outcome.status, ExportStatus::Complete);
        let text = String::from_utf8(outcome.payload).unwrap();
        assert_eq!(text.lines().count(), 251);
        assert!(text.starts_with("_id,timestamp,Genset_Run_SS\r\n0,"));
        assert_eq!(store.stats().open_cursors(), 0);
    }

    #[tokio::test]
    async fn test_empty_range_is_not_an_error() {
        let store = Arc::new(MemoryStore::new(Vec::new()));
        let outcome = StreamingExporter::new(store, options())
            .export(&query())
            .await
            .unwrap();
        assert!(outcome.is_empty());
        assert!(outcome.payload.is_empty());
    }

    #[tokio::test]
    async fn test_mid_stream_failure_discards() {
        let store = Arc::new(MemoryStore::new(docs(1000)).with_failure_after(500));
        let err = StreamingExporter::new(store.clone(), options())
            .export(&query())
            .await
            .unwrap_err();
        match err {
            DashboardError::Export(ExportError::StoreFailure {
                records_streamed, ..
            }) => assert_eq!(records_streamed, 500),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.stats().open_cursors(), 0);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_flagged_partial() {
        let store = Arc::new(MemoryStore::new(docs(1000)).with_failure_after(500));
        let opts = ExportOptions {
            failure_policy: FailurePolicy::FlagPartial,
            ..options()
        };
        let outcome = StreamingExporter::new(store, opts)
            .export(&query())
            .await
            .unwrap();
        assert_eq!(outcome.records, 500);
        assert!(matches!(outcome.status, ExportStatus::Partial { .. }));
        assert!(!outcome.is_empty());
    }

    fn docs_with_extra_field(n: u32, odd: u32) -> Vec<Document> {
        let mut docs = docs(n);
        docs[odd as usize].insert("Oil_Pressure", 4.2);
        docs
    }

    #[tokio::test]
    async fn test_store_failure_outranks_strict_schema_in_pending_rows() {
        let store = Arc::new(MemoryStore::new(docs_with_extra_field(10, 3)).with_failure_after(5));
        let opts = ExportOptions {
            schema_policy: SchemaPolicy::Strict,
            ..options()
        };
        let err = StreamingExporter::new(store.clone(), opts)
            .export(&query())
            .await
            .unwrap_err();
        match err {
            DashboardError::Export(ExportError::StoreFailure {
                records_streamed, ..
            }) => assert_eq!(records_streamed, 5),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.stats().open_cursors(), 0);
    }

    #[tokio::test]
    async fn test_partial_export_survives_strict_flush_failure() {
        let store = Arc::new(MemoryStore::new(docs_with_extra_field(10, 3)).with_failure_after(5));
        let opts = ExportOptions {
            schema_policy: SchemaPolicy::Strict,
            failure_policy: FailurePolicy::FlagPartial,
            ..options()
        };
        let outcome = StreamingExporter::new(store, opts)
            .export(&query())
            .await
            .unwrap();
        match outcome.status {
            ExportStatus::Partial { error } => assert!(error.contains("cursor killed")),
            other => panic!("unexpected status: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_export() {
        let store = Arc::new(MemoryStore::new(docs(100)));
        let token = CancellationToken::new();
        token.cancel();
        let err = StreamingExporter::new(store.clone(), options())
            .with_cancellation(token)
            .export(&query())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DashboardError::Export(ExportError::Cancelled { records_streamed: 0 })
        ));
        assert_eq!(store.stats().open_cursors(), 0);
    }

    #[tokio::test]
    async fn test_count_first_tolerates_timeout() {
        let store = Arc::new(MemoryStore::new(docs(10)).with_count_timeout());
        let opts = ExportOptions {
            count_first: true,
            ..options()
        };
        let outcome = StreamingExporter::new(store.clone(), opts)
            .export(&query())
            .await
            .unwrap();
        assert_eq!(outcome.records, 10);
        assert_eq!(store.stats().counts(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_store_is_connection_error() {
        let store = Arc::new(MemoryStore::new(docs(10)).unavailable());
        let err = StreamingExporter::new(store, options())
            .export(&query())
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::Connection(_)));
    }

    #[tokio::test]
    async fn test_export_without_index_streams_in_scan_order() {
        let mut records = docs(5);
        records.reverse();
        let store = Arc::new(MemoryStore::new(records));
        let opts = ExportOptions {
            index_hint: false,
            ..options()
        };
        let outcome = StreamingExporter::new(store, opts)
            .export(&query())
            .await
            .unwrap();
        assert_eq!(outcome.records, 5);
        let text = String::from_utf8(outcome.payload).unwrap();
        assert!(text.starts_with("_id,timestamp,Genset_Run_SS\r\n4,"));
    }

    #[tokio::test]
    async fn test_projection_keeps_identity() {
        let store = Arc::new(MemoryStore::new(docs(5)));
        let opts = ExportOptions {
            projection: Some(vec!["timestamp".to_string()]),
            ..options()
        };
        let outcome = StreamingExporter::new(store, opts)
            .export(&query())
            .await
            .unwrap();
        let text = String::from_utf8(outcome.payload).unwrap();
        assert!(text.starts_with("_id,timestamp\r\n"));
    }
}
