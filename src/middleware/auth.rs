use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use mongodb::bson::oid::ObjectId;

use crate::{
    controllers::is_htmx,
    models::CurrentUser,
    services::auth_service::Claims,
    session::Session,
    AppState,
};

fn user_id_from_token(state: &AppState, token: &str) -> Option<ObjectId> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.settings.jwt_secret.as_bytes()),
        &validation,
    )
    .ok()?;

    ObjectId::parse_str(&data.claims.sub).ok()
}

/// Resolves the auth cookie into a [`Session`] (and a [`CurrentUser`] when signed in).
/// A valid token whose user can't be looked up right now yields `Session::Loading`.
pub async fn inject_current_user(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(req.headers());
    let user_id = jar
        .get(&state.settings.jwt_cookie_name)
        .and_then(|c| user_id_from_token(&state, c.value()));

    let session = match user_id {
        None => Session::SignedOut,
        Some(id) => match state.users.find_by_id(id).await {
            Ok(Some(user)) => Session::SignedIn(CurrentUser::from(user)),
            Ok(None) => Session::SignedOut,
            Err(e) => {
                tracing::warn!("session lookup failed: {}", e);
                Session::Loading
            }
        },
    };

    if let Session::SignedIn(u) = &session {
        req.extensions_mut().insert(u.clone());
    }
    req.extensions_mut().insert(session);

    next.run(req).await
}

fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("text/html"))
        .unwrap_or(true)
}

fn is_public_path(path: &str) -> bool {
    path == "/"
        || path == "/login"
        || path == "/logout"
        || path == "/upgrade"
        || path == "/health"
        || path == "/favicon.ico"
        || path.starts_with("/static/")
}

pub async fn require_auth(
    State(_state): State<AppState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let path = req.uri().path();

    if is_public_path(path) {
        return next.run(req).await;
    }

    // inject_current_user runs first
    if req.extensions().get::<CurrentUser>().is_some() {
        return next.run(req).await;
    }

    // Not logged in:
    // - HTMX: force full redirect to /login
    // - Browser: 302 redirect to /login
    // - Anything else: 401
    if is_htmx(req.headers()) {
        let mut headers = HeaderMap::new();
        headers.insert("HX-Redirect", HeaderValue::from_static("/login"));
        return (StatusCode::OK, headers, Html("".to_string())).into_response();
    }

    if wants_html(req.headers()) {
        return Redirect::to("/login").into_response();
    }

    StatusCode::UNAUTHORIZED.into_response()
}
