use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Form,
};
use chrono::DateTime;
use serde_json::json;

use crate::{
    controllers::is_htmx,
    gate::{render_gated, FeatureRequest},
    models::{
        alert_config::{AlertFrequency, DigestFrequency, Field},
        alert_history::treatment,
        plan, AlertHistoryEntry,
    },
    render::{self, ToastKind},
    services::{
        alerts_service::{self, AlertsPage, Notice},
        notify_service::Channel,
    },
    session::{Session, SessionProvider},
    AppState,
};

fn unauthorized_snippet() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Html(r#"<div class="text-danger">Unauthorized</div>"#.to_string()),
    )
        .into_response()
}

fn toast_for(state: &AppState, notice: &Notice) -> String {
    match notice {
        Notice::Success(m) => render::toast(state, ToastKind::Success, m),
        Notice::Error(m) => render::toast(state, ToastKind::Error, m),
        Notice::Info(m) => render::toast(state, ToastKind::Info, m),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

struct ToggleSpec {
    field: Field,
    label: &'static str,
    help: &'static str,
    // (feature, description) when premium-only
    premium: Option<(&'static str, &'static str)>,
}

const TOGGLES: &[ToggleSpec] = &[
    ToggleSpec {
        field: Field::DailyDigest,
        label: "Daily Digest",
        help: "Daily portfolio summary via email",
        premium: None,
    },
    ToggleSpec {
        field: Field::TelegramAlerts,
        label: "Telegram Alerts",
        help: "Instant alerts via Telegram bot",
        premium: Some((plan::TELEGRAM_ALERTS, "Get instant alerts on Telegram")),
    },
    ToggleSpec {
        field: Field::PriceAlerts,
        label: "Price Alerts",
        help: "Stock price movement alerts",
        premium: None,
    },
    ToggleSpec {
        field: Field::RiskAlerts,
        label: "Risk Alerts",
        help: "Portfolio risk monitoring",
        premium: Some((plan::RISK_ALERTS, "Advanced risk monitoring")),
    },
    ToggleSpec {
        field: Field::EmailSummary,
        label: "Email Summary",
        help: "Periodic performance summary by email",
        premium: None,
    },
    ToggleSpec {
        field: Field::PortfolioAlerts,
        label: "Portfolio Alerts",
        help: "Portfolio value and allocation changes",
        premium: None,
    },
    ToggleSpec {
        field: Field::NewsAlerts,
        label: "News Alerts",
        help: "Market news about your holdings",
        premium: None,
    },
    ToggleSpec {
        field: Field::PerformanceAlerts,
        label: "Performance Alerts",
        help: "Gains and losses beyond your targets",
        premium: None,
    },
    ToggleSpec {
        field: Field::MarketHours,
        label: "Market Hours Only",
        help: "Only alert while the market is open",
        premium: None,
    },
    ToggleSpec {
        field: Field::WeekendAlerts,
        label: "Weekend Alerts",
        help: "Receive alerts on weekends",
        premium: None,
    },
];

fn render_form(state: &AppState, session: &Session, page: &AlertsPage) -> String {
    let values = serde_json::to_value(&page.config).unwrap_or_default();

    let toggles: Vec<String> = TOGGLES
        .iter()
        .map(|t| {
            let name = t.field.name();
            let html = render::render_page(
                state,
                "partials/toggle",
                json!({
                    "name": name,
                    "label": t.label,
                    "help": t.help,
                    "checked": values[name].as_bool().unwrap_or(false),
                    "premium": t.premium.is_some(),
                    "error": page.errors.get(name),
                }),
            );
            match t.premium {
                Some((feature, description)) => render_gated(
                    &state.hbs,
                    session,
                    FeatureRequest::new(feature).describe(description),
                    html,
                ),
                None => html,
            }
        })
        .collect();

    let digest_options: Vec<serde_json::Value> = DigestFrequency::ALL
        .iter()
        .map(|f| {
            json!({
                "value": f.as_str(),
                "label": capitalize(f.as_str()),
                "selected": *f == page.config.digest_frequency,
            })
        })
        .collect();

    let alert_options: Vec<serde_json::Value> = AlertFrequency::ALL
        .iter()
        .map(|f| {
            json!({
                "value": f.as_str(),
                "label": capitalize(f.as_str()),
                "selected": *f == page.config.alert_frequency,
            })
        })
        .collect();

    let telegram_panel = render::render_page(
        state,
        "partials/telegram_panel",
        json!({
            "connected": page.telegram_connected,
            "connecting": page.connecting,
            "token": page.config.telegram_bot_token,
            "chat_id": page.config.telegram_chat_id,
            "errors": page.errors,
        }),
    );
    let telegram_html = render_gated(
        &state.hbs,
        session,
        FeatureRequest::new(plan::TELEGRAM_INTEGRATION)
            .describe("Connect your Telegram bot for instant notifications"),
        telegram_panel,
    );

    render::render_page(
        state,
        "partials/alerts_form",
        json!({
            "toggles": toggles,
            "digest_options": digest_options,
            "alert_options": alert_options,
            "values": values,
            "errors": page.errors,
            "saving": page.saving,
            "telegram_html": telegram_html,
        }),
    )
}

fn history_json(entries: &[AlertHistoryEntry]) -> Vec<serde_json::Value> {
    entries
        .iter()
        .map(|e| {
            let time = DateTime::from_timestamp(e.timestamp, 0)
                .map(|d| d.format("%b %d, %H:%M").to_string())
                .unwrap_or_default();
            json!({
                "id": e.id,
                "kind": e.kind.as_str(),
                "title": e.title,
                "message": e.message,
                "severity": e.severity,
                "acknowledged": e.acknowledged,
                "time": time,
                "treatment": treatment(e.severity, e.acknowledged),
            })
        })
        .collect()
}

pub(crate) fn render_history(state: &AppState, page: &AlertsPage) -> String {
    render::render_page(
        state,
        "partials/alert_history",
        json!({
            "entries": history_json(&page.history),
            "active_count": page.active_alerts(),
        }),
    )
}

fn active_count_oob(page: &AlertsPage) -> String {
    format!(
        r#"<span class="text-muted small" id="active-alerts" hx-swap-oob="true">{} Active Alerts</span>"#,
        page.active_alerts()
    )
}

// ---------------- Pages ----------------

// GET /alerts
pub async fn get_alerts_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    session: Session,
) -> Response {
    let Some(user) = session.current_user() else {
        return unauthorized_snippet();
    };

    let page = alerts_service::mount(&state, user.id).await;

    let body = render::render_page(
        &state,
        "pages/alerts",
        json!({
            "form_html": render_form(&state, &session, &page),
            "history_html": render_history(&state, &page),
            "active_count": page.active_alerts(),
        }),
    );

    if is_htmx(&headers) {
        return (StatusCode::OK, Html(body)).into_response();
    }

    match render::render_full(&state, "Alerts", body, &session) {
        Ok(page) => (StatusCode::OK, Html(page)).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Html(e)).into_response(),
    }
}

// ---------------- Partials ----------------

// POST /alerts/config/field  (field=<name>&<name>=<value>)
pub async fn post_config_field(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<Vec<(String, String)>>,
) -> Response {
    let Some(user) = session.current_user() else {
        return unauthorized_snippet();
    };

    let field = form
        .iter()
        .find(|(k, _)| k == "field")
        .and_then(|(_, v)| Field::from_name(v));

    let Some(field) = field else {
        return (StatusCode::BAD_REQUEST, Html("unknown field".to_string())).into_response();
    };

    // unchecked checkboxes post nothing
    let raw = form
        .iter()
        .rev()
        .find(|(k, _)| k == field.name())
        .map(|(_, v)| v.as_str())
        .unwrap_or("");

    let page =
        alerts_service::change_field(&state, user.id, session.is_entitled(), field, raw).await;

    (StatusCode::OK, Html(render_form(&state, &session, &page))).into_response()
}

// POST /alerts/config
pub async fn post_config(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<Vec<(String, String)>>,
) -> Response {
    let Some(user) = session.current_user() else {
        return unauthorized_snippet();
    };

    let (notice, page) =
        alerts_service::submit(&state, user.id, session.is_entitled(), &form).await;

    let html = format!("{}{}", render_form(&state, &session, &page), toast_for(&state, &notice));
    (StatusCode::OK, Html(html)).into_response()
}

// POST /alerts/telegram/connect
pub async fn post_telegram_connect(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<Vec<(String, String)>>,
) -> Response {
    let Some(user) = session.current_user() else {
        return unauthorized_snippet();
    };

    let (notice, page) =
        alerts_service::connect_telegram(&state, user.id, session.is_entitled(), &form).await;

    let html = format!("{}{}", render_form(&state, &session, &page), toast_for(&state, &notice));
    (StatusCode::OK, Html(html)).into_response()
}

// POST /alerts/telegram/disconnect
pub async fn post_telegram_disconnect(State(state): State<AppState>, session: Session) -> Response {
    let Some(user) = session.current_user() else {
        return unauthorized_snippet();
    };

    let (notice, page) = alerts_service::disconnect_telegram(&state, user.id).await;

    let html = format!("{}{}", render_form(&state, &session, &page), toast_for(&state, &notice));
    (StatusCode::OK, Html(html)).into_response()
}

// POST /alerts/test/:channel
pub async fn post_test_alert(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    session: Session,
) -> Response {
    let Some(user) = session.current_user() else {
        return unauthorized_snippet();
    };

    let Some(channel) = Channel::from_slug(&channel) else {
        return (StatusCode::NOT_FOUND, Html("unknown channel".to_string())).into_response();
    };

    let notice =
        alerts_service::send_test_alert(&state, user.id, session.is_entitled(), channel).await;

    (StatusCode::OK, Html(toast_for(&state, &notice))).into_response()
}

// POST /alerts/history/:id/ack
pub async fn post_acknowledge(
    State(state): State<AppState>,
    Path(id): Path<String>,
    session: Session,
) -> Response {
    let Some(user) = session.current_user() else {
        return unauthorized_snippet();
    };

    let (notice, page) = alerts_service::acknowledge(&state, user.id, &id).await;

    let html = format!(
        "{}{}{}",
        render_history(&state, &page),
        active_count_oob(&page),
        toast_for(&state, &notice)
    );
    (StatusCode::OK, Html(html)).into_response()
}
