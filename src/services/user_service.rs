use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Database;

use crate::{config::Settings, error::StoreError, models::User};

/// Identity records. Emails are stored and looked up lowercased.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: ObjectId) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn insert(&self, user: User) -> Result<(), StoreError>;
}

pub struct MongoUserStore {
    db: Database,
}

impl MongoUserStore {
    pub fn new(db: Database) -> Self {
        MongoUserStore { db }
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn find_by_id(&self, id: ObjectId) -> Result<Option<User>, StoreError> {
        let users = self.db.collection::<User>("users");
        Ok(users.find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.db.collection::<User>("users");
        Ok(users
            .find_one(doc! { "email": email.to_lowercase() }, None)
            .await?)
    }

    async fn insert(&self, mut user: User) -> Result<(), StoreError> {
        user.email = user.email.to_lowercase();
        let users = self.db.collection::<User>("users");
        users.insert_one(&user, None).await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<ObjectId, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("user store lock poisoned".to_string())
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: ObjectId) -> Result<Option<User>, StoreError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.to_lowercase();
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, mut user: User) -> Result<(), StoreError> {
        user.email = user.email.to_lowercase();
        let mut users = self.users.write().map_err(|_| poisoned())?;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Unavailable("This email is already in use.".to_string()));
        }
        users.insert(user.id, user);
        Ok(())
    }
}

/// Creates the configured demo account if it doesn't exist yet. Returns its id.
pub async fn ensure_demo_user(
    users: &dyn UserStore,
    settings: &Settings,
) -> Result<Option<ObjectId>, StoreError> {
    let Some(email) = settings.demo_user_email.as_deref() else {
        return Ok(None);
    };

    if let Some(existing) = users.find_by_email(email).await? {
        return Ok(Some(existing.id));
    }

    let password_hash = bcrypt::hash(&settings.demo_user_password, bcrypt::DEFAULT_COST)
        .map_err(|e| StoreError::Unavailable(format!("failed to hash password: {e}")))?;

    let user = User {
        id: ObjectId::new(),
        email: email.to_string(),
        display_name: Some("Demo User".to_string()),
        password_hash,
        is_premium: settings.demo_user_premium,
    };
    let id = user.id;

    users.insert(user).await?;
    tracing::info!("seeded demo user {}", email);

    Ok(Some(id))
}
