//! Notification preferences edited on the Alerts page.
//!
//! The form is modelled as a reducer: every control produces a [`FieldChange`],
//! [`AlertConfig::apply`] turns `(config, change)` into the next config, and
//! [`AlertConfig::validate`] checks a whole config without touching rendering.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::plan;

/// Field name -> message. `_form` holds messages not tied to a single control.
pub type FieldErrors = BTreeMap<String, String>;

pub const FORM_ERROR_KEY: &str = "_form";

pub const BIG_MOVE_MIN: f64 = 1.0;
pub const BIG_MOVE_MAX: f64 = 50.0;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));

pub fn is_valid_email(s: &str) -> bool {
    EMAIL_RE.is_match(s)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestFrequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl DigestFrequency {
    pub const ALL: [DigestFrequency; 3] = [Self::Daily, Self::Weekly, Self::Monthly];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertFrequency {
    #[default]
    Immediate,
    Hourly,
    Daily,
}

impl AlertFrequency {
    pub const ALL: [AlertFrequency; 3] = [Self::Immediate, Self::Hourly, Self::Daily];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertConfig {
    pub daily_digest: bool,
    pub telegram_alerts: bool,
    pub email_summary: bool,
    pub price_alerts: bool,
    pub portfolio_alerts: bool,
    pub news_alerts: bool,

    pub digest_frequency: DigestFrequency,
    pub alert_frequency: AlertFrequency,
    /// Percent move that counts as "big". Always within [1, 50].
    pub big_move_threshold: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_bot_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_chat_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,

    pub market_hours: bool,
    pub weekend_alerts: bool,
    pub risk_alerts: bool,
    pub performance_alerts: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        AlertConfig {
            daily_digest: true,
            telegram_alerts: false,
            email_summary: true,
            price_alerts: true,
            portfolio_alerts: true,
            news_alerts: false,
            digest_frequency: DigestFrequency::Daily,
            alert_frequency: AlertFrequency::Immediate,
            big_move_threshold: 5.0,
            telegram_bot_token: None,
            telegram_chat_id: None,
            email_address: None,
            market_hours: true,
            weekend_alerts: false,
            risk_alerts: true,
            performance_alerts: true,
        }
    }
}

/// Every control on the Alerts form, named the way the form posts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    DailyDigest,
    TelegramAlerts,
    EmailSummary,
    PriceAlerts,
    PortfolioAlerts,
    NewsAlerts,
    MarketHours,
    WeekendAlerts,
    RiskAlerts,
    PerformanceAlerts,
    DigestFrequency,
    AlertFrequency,
    BigMoveThreshold,
    TelegramBotToken,
    TelegramChatId,
    EmailAddress,
}

impl Field {
    pub const ALL: [Field; 16] = [
        Field::DailyDigest,
        Field::TelegramAlerts,
        Field::EmailSummary,
        Field::PriceAlerts,
        Field::PortfolioAlerts,
        Field::NewsAlerts,
        Field::MarketHours,
        Field::WeekendAlerts,
        Field::RiskAlerts,
        Field::PerformanceAlerts,
        Field::DigestFrequency,
        Field::AlertFrequency,
        Field::BigMoveThreshold,
        Field::TelegramBotToken,
        Field::TelegramChatId,
        Field::EmailAddress,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::DailyDigest => "dailyDigest",
            Field::TelegramAlerts => "telegramAlerts",
            Field::EmailSummary => "emailSummary",
            Field::PriceAlerts => "priceAlerts",
            Field::PortfolioAlerts => "portfolioAlerts",
            Field::NewsAlerts => "newsAlerts",
            Field::MarketHours => "marketHours",
            Field::WeekendAlerts => "weekendAlerts",
            Field::RiskAlerts => "riskAlerts",
            Field::PerformanceAlerts => "performanceAlerts",
            Field::DigestFrequency => "digestFrequency",
            Field::AlertFrequency => "alertFrequency",
            Field::BigMoveThreshold => "bigMoveThreshold",
            Field::TelegramBotToken => "telegramBotToken",
            Field::TelegramChatId => "telegramChatId",
            Field::EmailAddress => "emailAddress",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Premium feature that has to be unlocked before this control can change.
    pub fn premium_feature(self) -> Option<&'static str> {
        match self {
            Field::TelegramAlerts => Some(plan::TELEGRAM_ALERTS),
            Field::RiskAlerts => Some(plan::RISK_ALERTS),
            Field::TelegramBotToken | Field::TelegramChatId => Some(plan::TELEGRAM_INTEGRATION),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

impl FieldError {
    fn new(field: Field, message: impl Into<String>) -> Self {
        FieldError { field, message: message.into() }
    }
}

/// One edit coming from one form control.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    Toggle(Field, bool),
    DigestFrequency(DigestFrequency),
    AlertFrequency(AlertFrequency),
    BigMoveThreshold(f64),
    TelegramBotToken(Option<String>),
    TelegramChatId(Option<String>),
    EmailAddress(Option<String>),
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "on" | "1" | "yes" => Some(true),
        "false" | "off" | "0" | "no" | "" => Some(false),
        _ => None,
    }
}

fn optional_text(raw: &str) -> Option<String> {
    let t = raw.trim();
    if t.is_empty() { None } else { Some(t.to_string()) }
}

fn threshold_message() -> String {
    format!(
        "Big move threshold must be between {} and {}.",
        BIG_MOVE_MIN as i64, BIG_MOVE_MAX as i64
    )
}

impl FieldChange {
    /// Parses raw form input. Only syntax is checked here; ranges are checked by
    /// [`AlertConfig::apply`].
    pub fn parse(field: Field, raw: &str) -> Result<FieldChange, FieldError> {
        let change = match field {
            Field::DigestFrequency => DigestFrequency::parse(raw.trim())
                .map(FieldChange::DigestFrequency)
                .ok_or_else(|| FieldError::new(field, "Choose daily, weekly or monthly."))?,
            Field::AlertFrequency => AlertFrequency::parse(raw.trim())
                .map(FieldChange::AlertFrequency)
                .ok_or_else(|| FieldError::new(field, "Choose immediate, hourly or daily."))?,
            Field::BigMoveThreshold => {
                let v: f64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| FieldError::new(field, threshold_message()))?;
                FieldChange::BigMoveThreshold(v)
            }
            Field::TelegramBotToken => FieldChange::TelegramBotToken(optional_text(raw)),
            Field::TelegramChatId => FieldChange::TelegramChatId(optional_text(raw)),
            Field::EmailAddress => FieldChange::EmailAddress(optional_text(raw)),
            toggle => {
                let v = parse_bool(raw)
                    .ok_or_else(|| FieldError::new(toggle, "Expected on or off."))?;
                FieldChange::Toggle(toggle, v)
            }
        };
        Ok(change)
    }

    pub fn field(&self) -> Field {
        match self {
            FieldChange::Toggle(f, _) => *f,
            FieldChange::DigestFrequency(_) => Field::DigestFrequency,
            FieldChange::AlertFrequency(_) => Field::AlertFrequency,
            FieldChange::BigMoveThreshold(_) => Field::BigMoveThreshold,
            FieldChange::TelegramBotToken(_) => Field::TelegramBotToken,
            FieldChange::TelegramChatId(_) => Field::TelegramChatId,
            FieldChange::EmailAddress(_) => Field::EmailAddress,
        }
    }
}

fn check_threshold(v: f64) -> Result<(), FieldError> {
    if v.is_finite() && (BIG_MOVE_MIN..=BIG_MOVE_MAX).contains(&v) {
        Ok(())
    } else {
        Err(FieldError::new(Field::BigMoveThreshold, threshold_message()))
    }
}

fn check_email(v: Option<&str>) -> Result<(), FieldError> {
    match v {
        Some(e) if !is_valid_email(e) => Err(FieldError::new(
            Field::EmailAddress,
            "Please enter a valid email address.",
        )),
        _ => Ok(()),
    }
}

impl AlertConfig {
    /// Pure reducer. Out-of-range input is rejected, never clamped; on error the
    /// caller keeps its current config.
    pub fn apply(&self, change: &FieldChange) -> Result<AlertConfig, FieldError> {
        let mut next = self.clone();

        match change {
            FieldChange::Toggle(field, v) => {
                let slot = match field {
                    Field::DailyDigest => &mut next.daily_digest,
                    Field::TelegramAlerts => &mut next.telegram_alerts,
                    Field::EmailSummary => &mut next.email_summary,
                    Field::PriceAlerts => &mut next.price_alerts,
                    Field::PortfolioAlerts => &mut next.portfolio_alerts,
                    Field::NewsAlerts => &mut next.news_alerts,
                    Field::MarketHours => &mut next.market_hours,
                    Field::WeekendAlerts => &mut next.weekend_alerts,
                    Field::RiskAlerts => &mut next.risk_alerts,
                    Field::PerformanceAlerts => &mut next.performance_alerts,
                    other => {
                        return Err(FieldError::new(*other, "This setting is not an on/off switch."));
                    }
                };
                *slot = *v;
            }
            FieldChange::DigestFrequency(f) => next.digest_frequency = *f,
            FieldChange::AlertFrequency(f) => next.alert_frequency = *f,
            FieldChange::BigMoveThreshold(v) => {
                check_threshold(*v)?;
                next.big_move_threshold = *v;
            }
            FieldChange::TelegramBotToken(v) => next.telegram_bot_token = v.clone(),
            FieldChange::TelegramChatId(v) => next.telegram_chat_id = v.clone(),
            FieldChange::EmailAddress(v) => {
                check_email(v.as_deref())?;
                next.email_address = v.clone();
            }
        }

        Ok(next)
    }

    /// Whole-config check, used before persisting and on configs read back from storage.
    pub fn validate(&self) -> FieldErrors {
        let mut errs = FieldErrors::new();

        if let Err(e) = check_threshold(self.big_move_threshold) {
            errs.insert(e.field.name().to_string(), e.message);
        }
        if let Err(e) = check_email(self.email_address.as_deref()) {
            errs.insert(e.field.name().to_string(), e.message);
        }

        errs
    }

    /// Bot token and chat id, only when both are filled in.
    pub fn telegram_credentials(&self) -> Option<(&str, &str)> {
        match (self.telegram_bot_token.as_deref(), self.telegram_chat_id.as_deref()) {
            (Some(token), Some(chat)) => Some((token, chat)),
            _ => None,
        }
    }
}
