//! Connection management for MongoDB
//!
//! This module provides the process-wide connection provider:
//! - Lazy, init-once client creation shared by every session
//! - Connection pool and timeout settings taken from configuration
//! - Bounded acquisition (client creation plus a ping)
//! - A one-time check that the telemetry collection has the range index
//!
//! The raw driver client never leaves this module; callers receive a
//! [`MongoStore`] bound to the configured collection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use mongodb::bson::{Document, doc};
use mongodb::options::{ClientOptions, ReadPreference, SelectionCriteria};
use mongodb::Client;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, warn};

use crate::config::{ConnectionConfig, QueryConfig, ReadPreferenceMode};
use crate::error::{ConnectionError, Result, extract_error_info};
use crate::store::{MongoStore, range_index_keys};

static SHARED: OnceLock<Arc<ConnectionManager>> = OnceLock::new();

/// MongoDB connection manager
///
/// Creates the pooled client on first use. Concurrent first callers wait on
/// the same initialisation; a failed attempt leaves the cell empty so the
/// next call tries again.
pub struct ConnectionManager {
    /// Pooled client, created lazily
    client: OnceCell<Client>,

    /// Connection configuration
    config: ConnectionConfig,

    /// Current connection state
    state: Arc<RwLock<ConnectionState>>,

    /// Set once the index check has run
    index_checked: AtomicBool,
}

/// Connection state information
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,

    /// Currently connecting
    Connecting,

    /// Connected and ready
    Connected,

    /// Last connection attempt failed
    Failed(String),
}

impl ConnectionManager {
    /// Create a new connection manager
    ///
    /// # Arguments
    /// * `config` - Connection configuration
    ///
    /// # Returns
    /// * `Self` - New connection manager instance
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            client: OnceCell::new(),
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            index_checked: AtomicBool::new(false),
        }
    }

    /// Process-wide connection manager
    ///
    /// The first caller's configuration wins; later calls return the same
    /// instance regardless of the configuration they pass.
    ///
    /// # Arguments
    /// * `config` - Connection configuration used on first call
    ///
    /// # Returns
    /// * `Arc<ConnectionManager>` - Shared manager
    pub fn shared(config: &ConnectionConfig) -> Arc<ConnectionManager> {
        let manager = SHARED.get_or_init(|| Arc::new(ConnectionManager::new(config.clone())));
        if manager.config != *config {
            debug!("Shared connection manager already initialised; ignoring new configuration");
        }
        Arc::clone(manager)
    }

    /// Connection configuration in use
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Store bound to the configured telemetry collection
    ///
    /// Connects on first use. The first successful call also checks that an
    /// index starts with `{timestamp: 1, identity: 1}` and logs a warning
    /// otherwise.
    ///
    /// # Arguments
    /// * `query` - Query settings naming the timestamp and identity fields
    ///
    /// # Returns
    /// * `Result<MongoStore>` - Store handle or connection error
    pub async fn store(&self, query: &QueryConfig) -> Result<MongoStore> {
        let client = self.client().await?;
        let collection = client
            .database(&self.config.database)
            .collection::<Document>(&self.config.collection);
        let store = MongoStore::new(collection);

        if !self.index_checked.swap(true, Ordering::SeqCst) {
            let keys = range_index_keys(&query.timestamp_field, &query.identity_field);
            store.check_range_index(&keys).await;
        }

        Ok(store)
    }

    /// Get current connection state
    ///
    /// # Returns
    /// * `ConnectionState` - Current state
    pub async fn get_state(&self) -> ConnectionState {
        self.state.read().await.clone()
    }

    /// Check if currently connected
    ///
    /// # Returns
    /// * `bool` - True if connected
    pub async fn is_connected(&self) -> bool {
        matches!(*self.state.read().await, ConnectionState::Connected)
    }

    async fn client(&self) -> Result<&Client> {
        self.client.get_or_try_init(|| self.connect()).await
    }

    /// Create the client and confirm it, within the acquisition budget
    async fn connect(&self) -> Result<Client> {
        self.set_state(ConnectionState::Connecting).await;
        let budget = self.config.acquire_timeout();

        let outcome = match tokio::time::timeout(budget, self.establish()).await {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::Timeout(budget).into()),
        };

        match outcome {
            Ok(client) => {
                self.set_state(ConnectionState::Connected).await;
                info!(
                    "Connected to {} (pool size {})",
                    self.config.database, self.config.max_pool_size
                );
                Ok(client)
            }
            Err(e) => {
                warn!("Connection attempt failed: {}", e);
                self.set_state(ConnectionState::Failed(e.to_string())).await;
                Err(e)
            }
        }
    }

    async fn establish(&self) -> Result<Client> {
        let mut options = ClientOptions::parse(&self.config.uri)
            .await
            .map_err(|e| ConnectionError::InvalidUri(extract_error_info(&e).summary()))?;
        apply_client_options(&self.config, &mut options);

        let client = Client::with_options(options)
            .map_err(|e| ConnectionError::ConnectionFailed(extract_error_info(&e).summary()))?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| ConnectionError::ConnectionFailed(extract_error_info(&e).summary()))?;

        debug!("Ping succeeded");
        Ok(client)
    }

    /// Update connection state
    ///
    /// # Arguments
    /// * `new_state` - New connection state
    async fn set_state(&self, new_state: ConnectionState) {
        *self.state.write().await = new_state;
    }
}

/// Configure client options with pool, timeout and read preference settings
///
/// # Arguments
/// * `config` - Connection configuration
/// * `options` - Options parsed from the URI, updated in place
pub fn apply_client_options(config: &ConnectionConfig, options: &mut ClientOptions) {
    options.app_name = Some(config.app_name.clone());
    options.max_pool_size = Some(config.max_pool_size);
    options.min_pool_size = Some(config.min_pool_size);
    options.max_idle_time = Some(config.idle_timeout());
    options.connect_timeout = Some(config.connect_timeout());
    options.server_selection_timeout = Some(config.server_selection_timeout());

    if let Some(mode) = config.read_preference {
        options.selection_criteria = Some(SelectionCriteria::ReadPreference(read_preference(mode)));
    }
}

fn read_preference(mode: ReadPreferenceMode) -> ReadPreference {
    match mode {
        ReadPreferenceMode::Primary => ReadPreference::Primary,
        ReadPreferenceMode::PrimaryPreferred => ReadPreference::PrimaryPreferred { options: None },
        ReadPreferenceMode::Secondary => ReadPreference::Secondary { options: None },
        ReadPreferenceMode::SecondaryPreferred => {
            ReadPreference::SecondaryPreferred { options: None }
        }
        ReadPreferenceMode::Nearest => ReadPreference::Nearest { options: None },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_connection_state() {
        let manager = ConnectionManager::new(ConnectionConfig::default());
        let state = tokio_test::block_on(manager.get_state());
        assert_eq!(state, ConnectionState::Disconnected);
    }

    #[test]
    fn test_pool_and_timeouts_applied() {
        let config = ConnectionConfig {
            max_pool_size: 50,
            min_pool_size: 5,
            read_preference: Some(ReadPreferenceMode::SecondaryPreferred),
            ..ConnectionConfig::default()
        };
        let mut options = ClientOptions::default();
        apply_client_options(&config, &mut options);

        assert_eq!(options.max_pool_size, Some(50));
        assert_eq!(options.min_pool_size, Some(5));
        assert_eq!(options.max_idle_time, Some(Duration::from_millis(45_000)));
        assert_eq!(options.connect_timeout, Some(Duration::from_millis(5_000)));
        assert_eq!(options.app_name.as_deref(), Some("navydash"));
        assert!(matches!(
            options.selection_criteria,
            Some(SelectionCriteria::ReadPreference(
                ReadPreference::SecondaryPreferred { .. }
            ))
        ));
    }

    #[tokio::test]
    async fn test_invalid_uri_is_reported() {
        let config = ConnectionConfig {
            uri: "not-a-mongodb-uri".to_string(),
            ..ConnectionConfig::default()
        };
        let manager = ConnectionManager::new(config);
        let err = manager.store(&QueryConfig::default()).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::DashboardError::Connection(ConnectionError::InvalidUri(_))
        ));
        assert!(matches!(manager.get_state().await, ConnectionState::Failed(_)));
    }

    #[test]
    fn test_shared_returns_same_instance() {
        let a = ConnectionManager::shared(&ConnectionConfig::default());
        let b = ConnectionManager::shared(&ConnectionConfig::default());
        assert!(Arc::ptr_eq(&a, &b));
    }
}
