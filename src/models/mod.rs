pub mod user;
pub mod alert_config;
pub mod alert_history;
pub mod plan;

pub use user::{CurrentUser, User};
pub use alert_config::{AlertConfig, AlertFrequency, DigestFrequency, FieldChange, FieldErrors};
pub use alert_history::{AlertHistoryEntry, AlertType, Severity};
pub use plan::{Feature, PREMIUM_PRICE};
