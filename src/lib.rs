//! Library entrypoint for the portfolio tracker.
//!
//! Integration tests under `tests/` build an in-memory [`AppState`] and drive the
//! routers and controllers directly.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod models;
pub mod session;

// Kept at crate root as `crate::auth`, `crate::render`, `crate::gate` and `crate::templates`.
#[path = "middleware/auth.rs"]
pub mod auth;

pub mod services;

#[path = "views/render.rs"]
pub mod render;
#[path = "views/templates.rs"]
pub mod templates;
#[path = "views/gate.rs"]
pub mod gate;

pub mod controllers;
pub mod routes;

use services::{
    alerts_service::AlertsPages,
    history_service::{AlertHistoryStore, MemoryHistoryStore, MongoHistoryStore},
    notify_service::{HttpDispatcher, NotificationDispatch, RecordingDispatcher},
    preferences_service::{MemoryPreferencesStore, MongoPreferencesStore, PreferencesStore},
    user_service::{MemoryUserStore, MongoUserStore, UserStore},
};

#[derive(Clone)]
pub struct AppState {
    pub hbs: templates::Hbs,
    pub settings: config::Settings,
    pub users: Arc<dyn UserStore>,
    pub preferences: Arc<dyn PreferencesStore>,
    pub history: Arc<dyn AlertHistoryStore>,
    pub notifier: Arc<dyn NotificationDispatch>,
    pub pages: AlertsPages,
}

impl AppState {
    /// No database and no outbound delivery; history is seeded with the sample feed.
    pub fn in_memory(settings: config::Settings) -> Self {
        AppState {
            hbs: templates::build_handlebars(),
            settings,
            users: Arc::new(MemoryUserStore::new()),
            preferences: Arc::new(MemoryPreferencesStore::new()),
            history: Arc::new(MemoryHistoryStore::with_sample_data()),
            notifier: Arc::new(RecordingDispatcher::new()),
            pages: AlertsPages::new(),
        }
    }

    pub fn with_mongo(settings: config::Settings, db: mongodb::Database) -> Self {
        let notifier = HttpDispatcher::new(
            settings.telegram_api_base.clone(),
            settings.notify_webhook_url.clone(),
        );

        AppState {
            hbs: templates::build_handlebars(),
            users: Arc::new(MongoUserStore::new(db.clone())),
            preferences: Arc::new(MongoPreferencesStore::new(db.clone())),
            history: Arc::new(MongoHistoryStore::new(db)),
            notifier: Arc::new(notifier),
            pages: AlertsPages::new(),
            settings,
        }
    }
}
