use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::ReplaceOptions;
use mongodb::Database;
use serde::{Deserialize, Serialize};

use crate::{error::StoreError, models::AlertConfig};

/// Durable copy of each user's alert configuration. Always written wholesale.
#[async_trait]
pub trait PreferencesStore: Send + Sync {
    async fn get(&self, user_id: ObjectId) -> Result<Option<AlertConfig>, StoreError>;
    async fn upsert(&self, user_id: ObjectId, config: &AlertConfig) -> Result<(), StoreError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct ConfigDoc {
    // one document per user
    #[serde(rename = "_id")]
    user_id: ObjectId,

    #[serde(flatten)]
    config: AlertConfig,

    updated_at: i64,
}

pub struct MongoPreferencesStore {
    db: Database,
}

impl MongoPreferencesStore {
    pub fn new(db: Database) -> Self {
        MongoPreferencesStore { db }
    }
}

#[async_trait]
impl PreferencesStore for MongoPreferencesStore {
    async fn get(&self, user_id: ObjectId) -> Result<Option<AlertConfig>, StoreError> {
        let configs = self.db.collection::<ConfigDoc>("alert_configs");
        let found = configs.find_one(doc! { "_id": user_id }, None).await?;
        Ok(found.map(|d| d.config))
    }

    async fn upsert(&self, user_id: ObjectId, config: &AlertConfig) -> Result<(), StoreError> {
        let configs = self.db.collection::<ConfigDoc>("alert_configs");

        let record = ConfigDoc {
            user_id,
            config: config.clone(),
            updated_at: Utc::now().timestamp(),
        };

        configs
            .replace_one(
                doc! { "_id": user_id },
                &record,
                ReplaceOptions::builder().upsert(true).build(),
            )
            .await?;

        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryPreferencesStore {
    configs: RwLock<HashMap<ObjectId, AlertConfig>>,
}

impl MemoryPreferencesStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferencesStore for MemoryPreferencesStore {
    async fn get(&self, user_id: ObjectId) -> Result<Option<AlertConfig>, StoreError> {
        let configs = self
            .configs
            .read()
            .map_err(|_| StoreError::Unavailable("preferences lock poisoned".to_string()))?;
        Ok(configs.get(&user_id).cloned())
    }

    async fn upsert(&self, user_id: ObjectId, config: &AlertConfig) -> Result<(), StoreError> {
        let mut configs = self
            .configs
            .write()
            .map_err(|_| StoreError::Unavailable("preferences lock poisoned".to_string()))?;
        configs.insert(user_id, config.clone());
        Ok(())
    }
}
