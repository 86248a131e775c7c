use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub email: String,

    #[serde(default)]
    pub display_name: Option<String>,

    pub password_hash: String,

    // missing on older documents => free plan
    #[serde(default)]
    pub is_premium: bool,
}

/// The signed-in user as seen by request handlers. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: ObjectId,
    pub email: String,
    pub display_name: String,
    pub is_premium: bool,
}

impl From<User> for CurrentUser {
    fn from(u: User) -> Self {
        let display_name = u
            .display_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| u.email.split('@').next().unwrap_or("").to_string());

        CurrentUser {
            id: u.id,
            email: u.email,
            display_name,
            is_premium: u.is_premium,
        }
    }
}
