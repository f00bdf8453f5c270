//! Bounded-time counting of range query matches.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{ConnectionError, DashboardError, Result};
use crate::query::RangeQuery;
use crate::store::{DocumentStore, StoreError};

/// Client-side slack on top of the server-side budget
const CLIENT_GRACE: Duration = Duration::from_millis(500);

/// Counts matching records within a time budget
///
/// The budget is sent to the server as `maxTimeMS`, and the whole call is
/// also bounded locally so a stalled connection cannot hang the caller.
pub struct CountEstimator {
    store: Arc<dyn DocumentStore>,
    budget: Duration,
}

impl CountEstimator {
    /// Create a new count estimator
    ///
    /// # Arguments
    /// * `store` - Store to count against
    /// * `budget` - Maximum time a count may take
    pub fn new(store: Arc<dyn DocumentStore>, budget: Duration) -> Self {
        Self { store, budget }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Count records matching `query`
    ///
    /// # Arguments
    /// * `query` - Query to count
    ///
    /// # Returns
    /// * `Result<u64>` - Match count, or `CountTimeout` when the budget runs out
    pub async fn count(&self, query: &RangeQuery) -> Result<u64> {
        let started = Instant::now();
        let limit = self.budget + CLIENT_GRACE;

        let result = match tokio::time::timeout(limit, self.store.count(query, self.budget)).await
        {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(format!(
                "no answer within {} ms",
                limit.as_millis()
            ))),
        };

        match result {
            Ok(count) => {
                debug!(
                    "Counted {} records in {} ms",
                    count,
                    started.elapsed().as_millis()
                );
                Ok(count)
            }
            Err(StoreError::Timeout(msg)) => {
                warn!("Count exceeded its budget: {}", msg);
                Err(DashboardError::CountTimeout {
                    budget: self.budget,
                })
            }
            Err(StoreError::Unavailable(msg)) => Err(ConnectionError::Unavailable(msg).into()),
            Err(e) => Err(DashboardError::Fetch(format!("count failed: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Mode, QueryBuilder, StatusBand};
    use crate::store::MemoryStore;
    use chrono::NaiveDate;
    use mongodb::bson::doc;

    fn query() -> RangeQuery {
        let day = NaiveDate::from_ymd_opt(2025, 8, 28).unwrap();
        QueryBuilder::new(StatusBand::new("Genset_Run_SS", 0, 2)).build(
            day.and_hms_opt(0, 0, 0).unwrap(),
            day.and_hms_opt(12, 0, 0).unwrap(),
            Mode::Fetch,
        )
    }

    fn store() -> MemoryStore {
        MemoryStore::new(vec![
            doc! { "timestamp": "2025-08-28T01:00:00" },
            doc! { "timestamp": "2025-08-28T02:00:00" },
            doc! { "timestamp": "2025-08-29T02:00:00" },
        ])
    }

    #[tokio::test]
    async fn test_count_matches() {
        let estimator = CountEstimator::new(Arc::new(store()), Duration::from_secs(1));
        assert_eq!(estimator.count(&query()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_server_time_limit_becomes_count_timeout() {
        let store = store().with_count_timeout();
        let estimator = CountEstimator::new(Arc::new(store), Duration::from_millis(50));
        let err = estimator.count(&query()).await.unwrap_err();
        assert!(err.is_count_timeout());
    }

    #[tokio::test]
    async fn test_stalled_count_is_cut_off_locally() {
        let store = store().with_count_delay(Duration::from_secs(30));
        let estimator = CountEstimator::new(Arc::new(store), Duration::from_millis(50));
        let err = estimator.count(&query()).await.unwrap_err();
        assert!(err.is_count_timeout());
    }

    #[tokio::test]
    async fn test_unavailable_store_is_connection_error() {
        let estimator =
            CountEstimator::new(Arc::new(store().unavailable()), Duration::from_secs(1));
        let err = estimator.count(&query()).await.unwrap_err();
        assert!(matches!(err, DashboardError::Connection(_)));
    }
}
