use axum::{Router, routing::{get, post}};
use crate::{AppState, controllers::alerts_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/alerts", get(alerts_controller::get_alerts_page))
        .route("/alerts/config", post(alerts_controller::post_config))
        .route("/alerts/config/field", post(alerts_controller::post_config_field))
        .route("/alerts/telegram/connect", post(alerts_controller::post_telegram_connect))
        .route("/alerts/telegram/disconnect", post(alerts_controller::post_telegram_disconnect))
        .route("/alerts/test/:channel", post(alerts_controller::post_test_alert))
        .route("/alerts/history/:id/ack", post(alerts_controller::post_acknowledge))
}
