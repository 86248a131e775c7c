use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::StreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::FindOptions;
use mongodb::Database;
use serde::{Deserialize, Serialize};

use crate::{
    error::StoreError,
    models::alert_history::{self, AckOutcome, AlertHistoryEntry, AlertType, Severity},
};

/// Authoritative alert history. Entries are produced elsewhere; this core only
/// reads them and flips `acknowledged`.
#[async_trait]
pub trait AlertHistoryStore: Send + Sync {
    /// Most recent first.
    async fn list(&self, user_id: ObjectId) -> Result<Vec<AlertHistoryEntry>, StoreError>;

    async fn acknowledge(&self, user_id: ObjectId, id: &str) -> Result<AckOutcome, StoreError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct HistoryDoc {
    #[serde(rename = "_id")]
    id: ObjectId,
    user_id: ObjectId,
    #[serde(rename = "type")]
    kind: AlertType,
    title: String,
    message: String,
    timestamp: i64,
    severity: Severity,
    acknowledged: bool,
}

impl From<HistoryDoc> for AlertHistoryEntry {
    fn from(d: HistoryDoc) -> Self {
        AlertHistoryEntry {
            id: d.id.to_hex(),
            kind: d.kind,
            title: d.title,
            message: d.message,
            timestamp: d.timestamp,
            severity: d.severity,
            acknowledged: d.acknowledged,
        }
    }
}

pub struct MongoHistoryStore {
    db: Database,
}

impl MongoHistoryStore {
    pub fn new(db: Database) -> Self {
        MongoHistoryStore { db }
    }

    /// Inserts the sample feed for a user with no history (demo account only).
    pub async fn seed_sample(&self, user_id: ObjectId) -> Result<(), StoreError> {
        let history = self.db.collection::<HistoryDoc>("alert_history");

        if history
            .find_one(doc! { "user_id": user_id }, None)
            .await?
            .is_some()
        {
            return Ok(());
        }

        let docs: Vec<HistoryDoc> = alert_history::sample_history(Utc::now().timestamp())
            .into_iter()
            .map(|e| HistoryDoc {
                id: ObjectId::new(),
                user_id,
                kind: e.kind,
                title: e.title,
                message: e.message,
                timestamp: e.timestamp,
                severity: e.severity,
                acknowledged: e.acknowledged,
            })
            .collect();

        history.insert_many(docs, None).await?;
        Ok(())
    }
}

#[async_trait]
impl AlertHistoryStore for MongoHistoryStore {
    async fn list(&self, user_id: ObjectId) -> Result<Vec<AlertHistoryEntry>, StoreError> {
        let history = self.db.collection::<HistoryDoc>("alert_history");

        let find_opts = FindOptions::builder()
            .sort(doc! { "timestamp": -1 })
            .build();

        let mut cursor = history.find(doc! { "user_id": user_id }, find_opts).await?;

        let mut items: Vec<AlertHistoryEntry> = Vec::new();
        while let Some(res) = cursor.next().await {
            items.push(res?.into());
        }

        Ok(items)
    }

    async fn acknowledge(&self, user_id: ObjectId, id: &str) -> Result<AckOutcome, StoreError> {
        let Ok(oid) = ObjectId::parse_str(id) else {
            return Ok(AckOutcome::NotFound);
        };

        let history = self.db.collection::<HistoryDoc>("alert_history");

        // only matches while still unacknowledged, so the flag never flips back
        let res = history
            .update_one(
                doc! { "_id": oid, "user_id": user_id, "acknowledged": false },
                doc! { "$set": { "acknowledged": true } },
                None,
            )
            .await?;

        if res.matched_count > 0 {
            return Ok(AckOutcome::Acknowledged);
        }

        let exists = history
            .find_one(doc! { "_id": oid, "user_id": user_id }, None)
            .await?
            .is_some();

        Ok(if exists { AckOutcome::AlreadyAcknowledged } else { AckOutcome::NotFound })
    }
}

/// In-memory feed. With `with_sample_data`, every user starts with the demo alerts.
#[derive(Default)]
pub struct MemoryHistoryStore {
    entries: RwLock<HashMap<ObjectId, Vec<AlertHistoryEntry>>>,
    seed_sample: bool,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sample_data() -> Self {
        MemoryHistoryStore { entries: RwLock::default(), seed_sample: true }
    }

    pub fn push(&self, user_id: ObjectId, entry: AlertHistoryEntry) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.entry(user_id).or_default().push(entry);
        Ok(())
    }

    fn seed_if_needed(&self, user_id: ObjectId) -> Result<(), StoreError> {
        if !self.seed_sample {
            return Ok(());
        }
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries
            .entry(user_id)
            .or_insert_with(|| alert_history::sample_history(Utc::now().timestamp()));
        Ok(())
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("alert history lock poisoned".to_string())
}

#[async_trait]
impl AlertHistoryStore for MemoryHistoryStore {
    async fn list(&self, user_id: ObjectId) -> Result<Vec<AlertHistoryEntry>, StoreError> {
        self.seed_if_needed(user_id)?;

        let entries = self.entries.read().map_err(|_| poisoned())?;
        let mut items = entries.get(&user_id).cloned().unwrap_or_default();
        alert_history::sort_recent_first(&mut items);
        Ok(items)
    }

    async fn acknowledge(&self, user_id: ObjectId, id: &str) -> Result<AckOutcome, StoreError> {
        self.seed_if_needed(user_id)?;

        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        match entries.get_mut(&user_id) {
            Some(list) => Ok(alert_history::acknowledge(list, id)),
            None => Ok(AckOutcome::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_seeds_and_acknowledges_per_user() {
        let store = MemoryHistoryStore::with_sample_data();
        let alice = ObjectId::new();
        let bob = ObjectId::new();

        assert_eq!(store.acknowledge(alice, "1").await.unwrap(), AckOutcome::Acknowledged);
        assert_eq!(
            store.acknowledge(alice, "1").await.unwrap(),
            AckOutcome::AlreadyAcknowledged
        );

        let bobs = store.list(bob).await.unwrap();
        assert!(!bobs.iter().find(|e| e.id == "1").unwrap().acknowledged);

        let alices = store.list(alice).await.unwrap();
        assert!(alices.iter().find(|e| e.id == "1").unwrap().acknowledged);
    }

    #[tokio::test]
    async fn empty_store_reports_not_found() {
        let store = MemoryHistoryStore::new();
        let user = ObjectId::new();
        assert!(store.list(user).await.unwrap().is_empty());
        assert_eq!(store.acknowledge(user, "1").await.unwrap(), AckOutcome::NotFound);
    }
}
