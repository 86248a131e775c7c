use axum::{Router, routing::get};
use crate::{AppState, controllers::upgrade_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router.route("/upgrade", get(upgrade_controller::get_upgrade))
}
