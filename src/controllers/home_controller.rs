use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse},
};
use serde_json::json;

use crate::{
    controllers::is_htmx,
    gate::{render_gated, FeatureRequest},
    models::{
        alert_history::{self, treatment},
        plan,
    },
    render,
    session::{Session, SessionProvider},
    AppState,
};

const RECENT_ALERTS: usize = 3;

struct Insight {
    title: &'static str,
    body: &'static str,
    confidence: u8,
}

const INSIGHTS: &[Insight] = &[
    Insight {
        title: "Consider Rebalancing IT Sector",
        body: "Your IT allocation is 35% - above optimal range. Consider reducing exposure to maintain diversification.",
        confidence: 85,
    },
    Insight {
        title: "Banking Stocks Undervalued",
        body: "HDFC Bank and ICICI show strong fundamentals with current PE below historical average.",
        confidence: 72,
    },
    Insight {
        title: "High Concentration Risk",
        body: "Top 3 holdings represent 65% of portfolio. Consider diversifying to reduce concentration risk.",
        confidence: 91,
    },
];

fn insights_panel(state: &AppState, session: &Session) -> String {
    let insights: Vec<serde_json::Value> = INSIGHTS
        .iter()
        .map(|i| json!({ "title": i.title, "body": i.body, "confidence": i.confidence }))
        .collect();

    let html = render::render_page(state, "partials/insights", json!({ "insights": insights }));

    render_gated(
        &state.hbs,
        session,
        FeatureRequest::new(plan::AI_INSIGHTS).describe(
            "Get intelligent analysis and recommendations based on your portfolio performance and market trends.",
        ),
        html,
    )
}

pub async fn home(
    State(state): State<AppState>,
    headers: HeaderMap,
    session: Session,
) -> impl IntoResponse {
    let ctx = match session.current_user() {
        Some(user) => {
            // read-only: the alerts page state is left alone
            let mut history = match state.history.list(user.id).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("loading alert history for {} failed: {}", user.id, e);
                    Vec::new()
                }
            };
            alert_history::sort_recent_first(&mut history);

            let recent: Vec<serde_json::Value> = history
                .iter()
                .take(RECENT_ALERTS)
                .map(|e| {
                    json!({
                        "title": e.title,
                        "message": e.message,
                        "severity": e.severity,
                        "treatment": treatment(e.severity, e.acknowledged),
                    })
                })
                .collect();

            json!({
                "signed_in": true,
                "display_name": user.display_name,
                "active_count": alert_history::unacknowledged_count(&history),
                "recent": recent,
                "insights_html": insights_panel(&state, &session),
            })
        }
        None => json!({ "signed_in": false }),
    };

    let body = render::render_page(&state, "pages/home", ctx);

    if is_htmx(&headers) {
        return (StatusCode::OK, Html(body)).into_response();
    }

    match render::render_full(&state, "Portfolio Tracker", body, &session) {
        Ok(page) => (StatusCode::OK, Html(page)).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Html(e)).into_response(),
    }
}

pub async fn not_found(
    State(state): State<AppState>,
    headers: HeaderMap,
    session: Session,
) -> impl IntoResponse {
    let body = render::render_page(&state, "pages/not_found", json!({}));

    if is_htmx(&headers) {
        return (StatusCode::NOT_FOUND, Html(body)).into_response();
    }

    match render::render_full(&state, "404", body, &session) {
        Ok(page) => (StatusCode::NOT_FOUND, Html(page)).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Html(e)).into_response(),
    }
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Html("ok".to_string()))
}
