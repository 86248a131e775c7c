use axum::middleware::from_fn_with_state;
use axum::Router;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{controllers::home_controller, AppState};

pub mod alerts_routes;
pub mod auth_routes;
pub mod home_routes;
pub mod upgrade_routes;

pub fn app(state: AppState) -> Router {
    let router = Router::<AppState>::new();

    let router = home_routes::add_routes(router);
    let router = auth_routes::add_routes(router);
    let router = upgrade_routes::add_routes(router);
    let router = alerts_routes::add_routes(router);

    router
        .nest_service("/static", ServeDir::new("static"))
        .fallback(home_controller::not_found)
        .layer(from_fn_with_state(state.clone(), crate::auth::require_auth))
        .layer(from_fn_with_state(state.clone(), crate::auth::inject_current_user))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
