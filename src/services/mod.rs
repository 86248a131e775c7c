pub mod db_init;

pub mod auth_service;
pub mod user_service;
pub mod preferences_service;
pub mod history_service;
pub mod notify_service;
pub mod alerts_service;
