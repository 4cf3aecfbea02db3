use async_trait::async_trait;
use crate::models::conversation::ConversationRecord;
use crate::store::{ RecordStore, StoreError };
use log::debug;
use redis::Client;

/// Writes each record as a hash at `{table}:{subject_id}:{record_id}` and
/// indexes it in the list `{table}:{subject_id}`, newest first.
pub struct RedisRecordStore {
    client: Client,
    table: String,
}

impl RedisRecordStore {
    pub fn new(host: &str, table: &str) -> Result<Self, StoreError> {
        Ok(Self {
            client: Client::open(host)?,
            table: table.to_string(),
        })
    }

    pub fn record_key(&self, record: &ConversationRecord) -> String {
        format!("{}:{}:{}", self.table, record.subject_id, record.record_id)
    }

    pub fn index_key(&self, subject_id: &str) -> String {
        format!("{}:{}", self.table, subject_id)
    }

    /// HSET of the record and LPUSH onto the subject index, in one MULTI/EXEC
    /// so the index never misses a stored hash.
    pub fn write_pipeline(&self, record: &ConversationRecord) -> redis::Pipeline {
        let key = self.record_key(record);
        let mut pipe = redis::pipe();
        pipe.atomic()
            .hset_multiple(&key, &record.fields())
            .ignore()
            .lpush(self.index_key(&record.subject_id), &key)
            .ignore();
        pipe
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, redis::RedisError> {
        self.client.get_multiplexed_async_connection().await
    }
}

#[async_trait]
impl RecordStore for RedisRecordStore {
    async fn put(&self, record: &ConversationRecord) -> Result<(), StoreError> {
        let mut conn = self.get_connection().await?;
        let _: () = self.write_pipeline(record).query_async(&mut conn).await?;
        debug!("Stored conversation record {}", self.record_key(record));
        Ok(())
    }
}
