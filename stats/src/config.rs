//! Configuration for opening a stats store.

use common::StorageConfig;

/// Configuration for opening a [`StatsDb`](crate::StatsDb).
///
/// # Example
///
/// ```ignore
/// use stats::{Config, StatsDb};
/// use common::StorageConfig;
///
/// let config = Config {
///     storage: StorageConfig::InMemory,
/// };
/// let db = StatsDb::open(config).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Storage backend configuration.
    ///
    /// Determines where and how records are persisted. See [`StorageConfig`]
    /// for available options including in-memory and SlateDB backends.
    pub storage: StorageConfig,
}
