// src/storage/mod.rs

//! Durable key-value storage shared by the entitlement, exam history and
//! progress services.
//!
//! Values are plain strings (booleans, epoch millis, JSON documents) so the
//! layout matches what the web client keeps in its own local storage.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("could not encode value for key '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Minimal durable string store.
///
/// A successful return means the write is durable.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Writes every entry or none of them.
    async fn set_many(&self, entries: &[(String, String)]) -> Result<(), StorageError>;

    /// Removes every key or none of them.
    async fn remove_many(&self, keys: &[String]) -> Result<(), StorageError>;
}

/// Reads a JSON document, treating a missing or corrupt value as absent.
pub async fn read_json<T>(store: &dyn KeyValueStore, key: &str) -> Option<T>
where
    T: serde::de::DeserializeOwned,
{
    let raw = match store.get(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!("Failed to read '{}': {}", key, e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Ignoring corrupt value under '{}': {}", key, e);
            None
        }
    }
}

pub async fn write_json<T>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError>
where
    T: serde::Serialize,
{
    let encoded = serde_json::to_string(value).map_err(|source| StorageError::Serialization {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &encoded).await
}
