use axum::http::HeaderMap;

pub mod alerts_controller;
pub mod auth_controller;
pub mod home_controller;
pub mod upgrade_controller;

pub(crate) fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get("HX-Request")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
