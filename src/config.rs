use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Mongo,
    // no database: in-memory stores seeded with sample data
    Memory,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub host: String,
    pub port: u16,

    pub jwt_secret: String,
    pub jwt_cookie_name: String,
    pub cookie_secure: bool,

    pub storage: StorageBackend,

    pub telegram_api_base: String,
    pub notify_webhook_url: Option<String>,

    pub demo_user_email: Option<String>,
    pub demo_user_password: String,
    pub demo_user_premium: bool,
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let mongodb_uri = env::var("MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

    let mongodb_db = env::var("MONGODB_DB")
        .unwrap_or_else(|_| "portfolio_tracker".to_string());

    let host = env::var("HOST")
        .unwrap_or_else(|_| "127.0.0.1".to_string());

    let port = env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| "change-me-dev-secret".to_string());
    let jwt_cookie_name = env::var("JWT_COOKIE_NAME").unwrap_or_else(|_| "auth".to_string());

    let storage = match env::var("STORAGE").map(|s| s.to_lowercase()) {
        Ok(s) if s == "memory" => StorageBackend::Memory,
        _ => StorageBackend::Mongo,
    };

    let telegram_api_base = env::var("TELEGRAM_API_BASE")
        .unwrap_or_else(|_| "https://api.telegram.org".to_string());

    Settings {
        mongodb_uri,
        mongodb_db,
        host,
        port,
        jwt_secret,
        jwt_cookie_name,
        cookie_secure: env_flag("COOKIE_SECURE"),
        storage,
        telegram_api_base,
        notify_webhook_url: env_opt("NOTIFY_WEBHOOK_URL"),
        demo_user_email: env_opt("DEMO_USER_EMAIL"),
        demo_user_password: env::var("DEMO_USER_PASSWORD").unwrap_or_else(|_| "demo1234".to_string()),
        demo_user_premium: env_flag("DEMO_USER_PREMIUM"),
    }
}
