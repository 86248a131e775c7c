use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::json;

use crate::{
    controllers::is_htmx,
    models::{
        alert_config::{is_valid_email, FORM_ERROR_KEY},
        FieldErrors,
    },
    render,
    services::auth_service,
    session::Session,
    AppState,
};

fn htmx_redirect(path: &'static str) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("HX-Redirect", HeaderValue::from_static(path));
    (StatusCode::OK, headers, Html(String::new())).into_response()
}

fn login_form(state: &AppState, email: &str, errors: &FieldErrors) -> Response {
    let html = render::render_page(
        state,
        "pages/login",
        json!({ "values": { "email": email }, "errors": errors }),
    );
    (StatusCode::OK, Html(html)).into_response()
}

// ---------------- LOGIN ----------------

pub async fn get_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    session: Session,
) -> Response {
    let body = render::render_page(&state, "pages/login", json!({}));

    if is_htmx(&headers) {
        return (StatusCode::OK, Html(body)).into_response();
    }

    match render::render_full(&state, "Sign in", body, &session) {
        Ok(page) => (StatusCode::OK, Html(page)).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Html(e)).into_response(),
    }
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn post_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let email = form.email.trim().to_string();
    let password = form.password.trim().to_string();

    let mut errors = FieldErrors::new();

    if email.is_empty() {
        errors.insert("email".into(), "Email is required.".into());
    } else if !is_valid_email(&email) {
        errors.insert("email".into(), "Invalid email.".into());
    }

    if password.is_empty() {
        errors.insert("password".into(), "Password is required.".into());
    }

    if !errors.is_empty() {
        return login_form(&state, &email, &errors);
    }

    let user = match auth_service::login_user(&state, &email, &password).await {
        Ok(u) => u,
        Err(errs) => return login_form(&state, &email, &errs),
    };

    let token = match auth_service::make_jwt_with_days(&state, &user.id, 7) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("issuing token for {} failed: {}", user.id, e);
            errors.insert(FORM_ERROR_KEY.into(), "Could not sign you in. Try again.".into());
            return login_form(&state, &email, &errors);
        }
    };

    tracing::info!("user {} signed in", user.id);
    let jar = jar.add(auth_service::auth_cookie(&state, token));

    if is_htmx(&headers) {
        return (jar, htmx_redirect("/")).into_response();
    }

    (
        jar,
        (StatusCode::SEE_OTHER, [("Location", "/")], Html(String::new())),
    )
        .into_response()
}

// ---------------- LOGOUT ----------------

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let jar = jar.add(auth_service::clear_auth_cookie(&state));
    (jar, (StatusCode::SEE_OTHER, [("Location", "/")]))
}
