use async_trait::async_trait;
use crate::models::conversation::ConversationRecord;
use crate::store::{ RecordStore, StoreError };
use tokio::sync::Mutex;

/// Keeps records in process memory; for local runs without Redis.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<Vec<ConversationRecord>>,
}

impl MemoryRecordStore {
    pub async fn records(&self) -> Vec<ConversationRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn put(&self, record: &ConversationRecord) -> Result<(), StoreError> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_appends_in_order() {
        let store = MemoryRecordStore::default();
        for id in ["a", "b"] {
            let record = ConversationRecord {
                record_id: id.into(),
                subject_id: "s".into(),
                created_at: String::new(),
                birth_datetime: String::new(),
                display_name: String::new(),
                latest_user_text: String::new(),
                latest_assistant_text: String::new(),
                conversation: String::new(),
            };
            store.put(&record).await.unwrap();
        }
        let ids: Vec<String> = store.records().await.into_iter().map(|r| r.record_id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
