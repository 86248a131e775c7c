use serde_json::json;

use crate::{session::SessionProvider, AppState};

pub fn render_full(
    state: &AppState,
    title: &str,
    body_html: String,
    session: &dyn SessionProvider,
) -> Result<String, String> {
    let (is_logged_in, user_json) = match session.current_user() {
        Some(u) => (
            true,
            json!({
                "id": u.id.to_hex(),
                "email": u.email,
                "display_name": u.display_name,
                "is_premium": u.is_premium,
            }),
        ),
        None => (false, serde_json::Value::Null),
    };

    let ctx = json!({
        "title": title,
        "body": body_html,
        "is_logged_in": is_logged_in,
        "user": user_json,
    });

    state
        .hbs
        .render("layouts/base", &ctx)
        .map_err(|e| e.to_string())
}

pub fn render_page(state: &AppState, tpl: &str, ctx: serde_json::Value) -> String {
    state
        .hbs
        .render(tpl, &ctx)
        .unwrap_or_else(|e| format!("template error: {e}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

impl ToastKind {
    fn css(self) -> &'static str {
        match self {
            ToastKind::Success => "success",
            ToastKind::Error => "danger",
            ToastKind::Info => "info",
        }
    }
}

/// Non-blocking notification, swapped out-of-band into the page's toast stack.
pub fn toast(state: &AppState, kind: ToastKind, message: &str) -> String {
    render_page(
        state,
        "partials/toast",
        json!({ "kind": kind.css(), "message": message }),
    )
}
