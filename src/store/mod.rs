mod memory;
mod redis;

pub use memory::MemoryRecordStore;
pub use self::redis::RedisRecordStore;

use async_trait::async_trait;
use log::info;
use std::sync::Arc;
use thiserror::Error;
use crate::cli::Args;
use crate::models::conversation::ConversationRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store connection error: {0}")]
    Connection(String),
    #[error("record store write error: {0}")]
    Write(String),
    #[error("unsupported record store type: {0}")]
    Unsupported(String),
}

impl From<::redis::RedisError> for StoreError {
    fn from(err: ::redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_timeout() {
            StoreError::Connection(err.to_string())
        } else {
            StoreError::Write(err.to_string())
        }
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn put(&self, record: &ConversationRecord) -> Result<(), StoreError>;
}

pub fn create_record_store(args: &Args) -> Result<Arc<dyn RecordStore>, StoreError> {
    match args.record_store_type.to_lowercase().as_str() {
        "redis" => {
            let store = RedisRecordStore::new(&args.record_store_host, &args.record_table)?;
            Ok(Arc::new(store))
        }
        "memory" => Ok(Arc::new(MemoryRecordStore::default())),
        other => Err(StoreError::Unsupported(other.to_string())),
    }
}

pub fn initialize_record_store(args: &Args) -> Result<Arc<dyn RecordStore>, StoreError> {
    info!(
        "Conversation records will be stored in: {} at {} (table '{}')",
        args.record_store_type,
        args.record_store_host,
        args.record_table
    );
    create_record_store(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn memory_store_is_selectable() {
        let args = Args::try_parse_from(["persona-chat-relay", "--record-store-type", "MEMORY"]).unwrap();
        assert!(create_record_store(&args).is_ok());
    }

    #[test]
    fn unknown_store_type_is_rejected() {
        let args = Args::try_parse_from(["persona-chat-relay", "--record-store-type", "dynamo"]).unwrap();
        match create_record_store(&args) {
            Err(StoreError::Unsupported(kind)) => assert_eq!(kind, "dynamo"),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("expected an error"),
        }
    }
}
