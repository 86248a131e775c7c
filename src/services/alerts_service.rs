//! Alerts page lifecycle: mount, field edits, submit, Telegram connect/disconnect,
//! test alerts and acknowledging history entries.
//!
//! Each signed-in user owns one in-memory [`AlertsPage`]. Edits only touch that
//! page; the configuration reaches the [`PreferencesStore`] only on submit.
//!
//! [`PreferencesStore`]: super::preferences_service::PreferencesStore

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use mongodb::bson::oid::ObjectId;

use crate::{
    models::{
        alert_config::{Field, FieldChange, FieldError, FORM_ERROR_KEY},
        alert_history::{self, AckOutcome},
        AlertConfig, AlertHistoryEntry, FieldErrors,
    },
    services::notify_service::{Channel, ChannelCredentials},
    AppState,
};

#[derive(Debug, Clone, Default)]
pub struct AlertsPage {
    pub config: AlertConfig,
    pub errors: FieldErrors,
    pub saving: bool,
    pub connecting: bool,
    pub telegram_connected: bool,
    pub history: Vec<AlertHistoryEntry>,
}

impl AlertsPage {
    pub fn active_alerts(&self) -> usize {
        alert_history::unacknowledged_count(&self.history)
    }
}

/// User-facing result of an action, shown as a toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
    Info(String),
}

impl Notice {
    pub fn is_success(&self) -> bool {
        matches!(self, Notice::Success(_))
    }
}

pub const SAVE_OK: &str = "Alert settings updated successfully!";
pub const SAVE_FAILED: &str = "Failed to update alert settings";
pub const SAVE_BUSY: &str = "Settings are already being saved.";
pub const FIX_ERRORS: &str = "Please fix the highlighted fields.";
pub const CONNECT_OK: &str = "Telegram bot connected successfully!";
pub const CONNECT_FAILED: &str = "Failed to connect Telegram bot";
pub const CONNECT_BUSY: &str = "Telegram connection already in progress.";
pub const CONNECT_NEEDS_CREDENTIALS: &str = "Enter your bot token and chat ID first.";
pub const NOT_CONNECTED: &str = "Telegram bot is not connected.";
pub const ACKNOWLEDGED: &str = "Alert acknowledged";
pub const ACK_NOT_FOUND: &str = "Alert not found.";
pub const ACK_FAILED: &str = "Failed to acknowledge alert";

pub fn locked_message(feature: &str) -> String {
    format!("Upgrade to Premium to use {feature}.")
}

#[derive(Clone, Default)]
pub struct AlertsPages {
    inner: Arc<Mutex<HashMap<ObjectId, AlertsPage>>>,
}

impl AlertsPages {
    pub fn new() -> Self {
        Self::default()
    }

    // Never held across an await.
    fn lock(&self) -> MutexGuard<'_, HashMap<ObjectId, AlertsPage>> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn snapshot(&self, user_id: ObjectId) -> Option<AlertsPage> {
        self.lock().get(&user_id).cloned()
    }

    fn update<R>(&self, user_id: ObjectId, f: impl FnOnce(&mut AlertsPage) -> R) -> R {
        let mut pages = self.lock();
        f(pages.entry(user_id).or_default())
    }
}

#[derive(Debug, Clone, Copy)]
enum Busy {
    Saving,
    Connecting,
}

/// Clears a busy flag when the request finishes or is dropped mid-flight
/// (the browser navigated away).
struct InFlight {
    pages: AlertsPages,
    user_id: ObjectId,
    flag: Busy,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let flag = self.flag;
        self.pages.update(self.user_id, |p| match flag {
            Busy::Saving => p.saving = false,
            Busy::Connecting => p.connecting = false,
        });
    }
}

/// Fresh page state: stored config (or defaults) and a new history snapshot.
/// Busy flags of a request still in flight are carried over.
pub async fn mount(state: &AppState, user_id: ObjectId) -> AlertsPage {
    let mut page = AlertsPage::default();

    match state.preferences.get(user_id).await {
        Ok(Some(cfg)) if cfg.validate().is_empty() => page.config = cfg,
        Ok(Some(_)) => {
            tracing::warn!("stored alert config for {} is invalid, using defaults", user_id);
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!("loading alert config for {} failed: {}", user_id, e);
            page.errors
                .insert(FORM_ERROR_KEY.into(), "Could not load your saved settings.".into());
        }
    }

    match state.history.list(user_id).await {
        Ok(mut entries) => {
            alert_history::sort_recent_first(&mut entries);
            page.history = entries;
        }
        Err(e) => tracing::warn!("loading alert history for {} failed: {}", user_id, e),
    }

    // a save or connect still in flight owns its flag until its guard drops
    state.pages.update(user_id, |existing| {
        page.saving = existing.saving;
        page.connecting = existing.connecting;
        *existing = page.clone();
    });
    page
}

async fn current(state: &AppState, user_id: ObjectId) -> AlertsPage {
    match state.pages.snapshot(user_id) {
        Some(p) => p,
        None => mount(state, user_id).await,
    }
}

/// Applies one change, refusing to alter premium-only settings for free users.
fn apply_gated(
    config: &AlertConfig,
    change: &FieldChange,
    entitled: bool,
) -> Result<AlertConfig, FieldError> {
    let next = config.apply(change)?;

    if let Some(feature) = change.field().premium_feature() {
        if !entitled && next != *config {
            return Err(FieldError { field: change.field(), message: locked_message(feature) });
        }
    }

    Ok(next)
}

/// Verified credentials no longer apply once the token or chat id changes.
fn commit_config(page: &mut AlertsPage, next: AlertConfig) {
    if next.telegram_bot_token != page.config.telegram_bot_token
        || next.telegram_chat_id != page.config.telegram_chat_id
    {
        page.telegram_connected = false;
    }
    page.config = next;
}

fn parse_and_apply(
    config: &AlertConfig,
    field: Field,
    raw: &str,
    entitled: bool,
) -> Result<AlertConfig, FieldError> {
    let change = FieldChange::parse(field, raw)?;
    apply_gated(config, &change, entitled)
}

/// One control changed. On error the page keeps its previous value and shows
/// the message next to the control.
pub async fn change_field(
    state: &AppState,
    user_id: ObjectId,
    entitled: bool,
    field: Field,
    raw: &str,
) -> AlertsPage {
    current(state, user_id).await;

    state.pages.update(user_id, |page| {
        match parse_and_apply(&page.config, field, raw, entitled) {
            Ok(next) => {
                commit_config(page, next);
                page.errors.remove(field.name());
            }
            Err(e) => {
                page.errors.insert(e.field.name().to_string(), e.message);
            }
        }
        page.errors.remove(FORM_ERROR_KEY);
        page.clone()
    })
}

/// Last value per known field wins (checkboxes post a hidden "false" before "true").
fn collect_form(form: &[(String, String)]) -> HashMap<Field, &str> {
    let mut values = HashMap::new();
    for (name, value) in form {
        if let Some(field) = Field::from_name(name) {
            values.insert(field, value.as_str());
        }
    }
    values
}

/// Folds a full form post into the page and persists the result wholesale.
///
/// Field errors block the save. Otherwise exactly one `upsert` runs while
/// `saving` is set; a second submit during that window is refused.
pub async fn submit(
    state: &AppState,
    user_id: ObjectId,
    entitled: bool,
    form: &[(String, String)],
) -> (Notice, AlertsPage) {
    current(state, user_id).await;
    let values = collect_form(form);

    let prepared = state.pages.update(user_id, |page| {
        if page.saving {
            return Err(Notice::Info(SAVE_BUSY.to_string()));
        }

        let mut next = page.config.clone();
        let mut errors = FieldErrors::new();

        for field in Field::ALL {
            let Some(raw) = values.get(&field) else { continue };
            match parse_and_apply(&next, field, raw, entitled) {
                Ok(cfg) => next = cfg,
                Err(e) => {
                    errors.insert(e.field.name().to_string(), e.message);
                }
            }
        }
        for (k, v) in next.validate() {
            errors.entry(k).or_insert(v);
        }

        commit_config(page, next.clone());
        page.errors = errors;

        if !page.errors.is_empty() {
            return Err(Notice::Error(FIX_ERRORS.to_string()));
        }

        page.saving = true;
        Ok(next)
    });

    let config = match prepared {
        Ok(c) => c,
        Err(notice) => {
            let page = current(state, user_id).await;
            return (notice, page);
        }
    };

    let guard = InFlight { pages: state.pages.clone(), user_id, flag: Busy::Saving };
    let result = state.preferences.upsert(user_id, &config).await;
    drop(guard);

    let notice = match result {
        Ok(()) => {
            tracing::info!("saved alert settings for {}", user_id);
            Notice::Success(SAVE_OK.to_string())
        }
        Err(e) => {
            tracing::error!("saving alert settings for {} failed: {}", user_id, e);
            Notice::Error(SAVE_FAILED.to_string())
        }
    };

    (notice, current(state, user_id).await)
}

/// Verifies the bot credentials with the notification service. Bot token and
/// chat id posted along with the button are applied first.
pub async fn connect_telegram(
    state: &AppState,
    user_id: ObjectId,
    entitled: bool,
    form: &[(String, String)],
) -> (Notice, AlertsPage) {
    let page = current(state, user_id).await;

    if !entitled {
        let feature = Field::TelegramBotToken.premium_feature().unwrap_or_default();
        return (Notice::Error(locked_message(feature)), page);
    }

    let values = collect_form(form);
    let prepared = state.pages.update(user_id, |page| {
        if page.connecting {
            return Err(Notice::Info(CONNECT_BUSY.to_string()));
        }

        for field in [Field::TelegramBotToken, Field::TelegramChatId] {
            let Some(raw) = values.get(&field) else { continue };
            match parse_and_apply(&page.config, field, raw, entitled) {
                Ok(cfg) => {
                    commit_config(page, cfg);
                    page.errors.remove(field.name());
                }
                Err(e) => {
                    page.errors.insert(e.field.name().to_string(), e.message);
                }
            }
        }

        if page.telegram_connected {
            return Err(Notice::Success(CONNECT_OK.to_string()));
        }

        let Some((token, chat)) = page.config.telegram_credentials() else {
            return Err(Notice::Error(CONNECT_NEEDS_CREDENTIALS.to_string()));
        };
        let creds = ChannelCredentials { bot_token: token.to_string(), chat_id: chat.to_string() };

        page.connecting = true;
        Ok(creds)
    });

    let creds = match prepared {
        Ok(c) => c,
        Err(notice) => return (notice, current(state, user_id).await),
    };

    let guard = InFlight { pages: state.pages.clone(), user_id, flag: Busy::Connecting };
    let result = state.notifier.connect_channel(Channel::Telegram, &creds).await;

    let notice = match result {
        Ok(()) => {
            state.pages.update(user_id, |p| p.telegram_connected = true);
            tracing::info!("telegram connected for {}", user_id);
            Notice::Success(CONNECT_OK.to_string())
        }
        Err(e) => {
            tracing::warn!("telegram connect for {} failed: {}", user_id, e);
            Notice::Error(CONNECT_FAILED.to_string())
        }
    };
    drop(guard);

    (notice, current(state, user_id).await)
}

pub async fn disconnect_telegram(state: &AppState, user_id: ObjectId) -> (Notice, AlertsPage) {
    current(state, user_id).await;
    let page = state.pages.update(user_id, |p| {
        p.telegram_connected = false;
        p.clone()
    });
    (Notice::Info("Telegram bot disconnected".to_string()), page)
}

/// Fire-and-forget test notification. Never changes the configuration.
pub async fn send_test_alert(
    state: &AppState,
    user_id: ObjectId,
    entitled: bool,
    channel: Channel,
) -> Notice {
    let page = current(state, user_id).await;

    if channel == Channel::Telegram {
        if !entitled {
            let feature = Field::TelegramBotToken.premium_feature().unwrap_or_default();
            return Notice::Error(locked_message(feature));
        }
        if !page.telegram_connected {
            return Notice::Error(NOT_CONNECTED.to_string());
        }
    }

    match state.notifier.send_test_alert(channel, &page.config).await {
        Ok(()) => Notice::Success(format!("Test {} alert sent successfully!", channel.label())),
        Err(e) => {
            tracing::warn!("test {} alert for {} failed: {}", channel.label(), user_id, e);
            Notice::Error(format!("Failed to send test {} alert", channel.label()))
        }
    }
}

/// Persists the acknowledgement, then mirrors it into the page's snapshot.
/// Already-acknowledged entries are a quiet success.
pub async fn acknowledge(state: &AppState, user_id: ObjectId, id: &str) -> (Notice, AlertsPage) {
    current(state, user_id).await;

    let notice = match state.history.acknowledge(user_id, id).await {
        Ok(AckOutcome::Acknowledged | AckOutcome::AlreadyAcknowledged) => {
            state
                .pages
                .update(user_id, |p| alert_history::acknowledge(&mut p.history, id));
            Notice::Success(ACKNOWLEDGED.to_string())
        }
        Ok(AckOutcome::NotFound) => Notice::Error(ACK_NOT_FOUND.to_string()),
        Err(e) => {
            tracing::error!("acknowledging alert {} for {} failed: {}", id, user_id, e);
            Notice::Error(ACK_FAILED.to_string())
        }
    };

    (notice, current(state, user_id).await)
}
