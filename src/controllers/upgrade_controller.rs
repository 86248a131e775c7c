use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse},
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    controllers::is_htmx,
    models::plan,
    render,
    session::{Session, SessionProvider},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct UpgradeQuery {
    #[serde(default)]
    pub feature: Option<String>,
}

// GET /upgrade?feature=<name>
pub async fn get_upgrade(
    State(state): State<AppState>,
    headers: HeaderMap,
    session: Session,
    Query(q): Query<UpgradeQuery>,
) -> impl IntoResponse {
    // only premium features are worth calling out
    let requested = q
        .feature
        .as_deref()
        .map(str::trim)
        .filter(|f| plan::requires_premium(f));

    let features: Vec<serde_json::Value> = plan::CATALOG
        .iter()
        .map(|f| {
            let highlighted = requested.is_some_and(|r| {
                r == f.name || (r == plan::TELEGRAM_INTEGRATION && f.name == plan::TELEGRAM_ALERTS)
            });
            json!({
                "name": f.name,
                "free": f.free,
                "premium": f.premium,
                "highlighted": highlighted,
            })
        })
        .collect();

    let body = render::render_page(
        &state,
        "pages/upgrade",
        json!({
            "price": plan::PREMIUM_PRICE,
            "is_premium": session.is_entitled(),
            "requested": requested,
            "features": features,
        }),
    );

    if is_htmx(&headers) {
        return (StatusCode::OK, Html(body)).into_response();
    }

    match render::render_full(&state, "Upgrade", body, &session) {
        Ok(page) => (StatusCode::OK, Html(page)).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Html(e)).into_response(),
    }
}
