use handlebars::Handlebars;
use std::sync::Arc;

pub type Hbs = Arc<Handlebars<'static>>;

// Compiled into the binary so tests and the server don't depend on the working directory.
const TEMPLATES: &[(&str, &str)] = &[
    // Layout + pages
    ("layouts/base", include_str!("../../templates/layouts/base.hbs")),
    ("pages/home", include_str!("../../templates/pages/home.hbs")),
    ("pages/not_found", include_str!("../../templates/pages/not_found.hbs")),
    ("pages/login", include_str!("../../templates/pages/login.hbs")),
    ("pages/alerts", include_str!("../../templates/pages/alerts.hbs")),
    ("pages/upgrade", include_str!("../../templates/pages/upgrade.hbs")),
    // Partial endpoints
    ("partials/alerts_form", include_str!("../../templates/partials/alerts_form.hbs")),
    ("partials/alert_history", include_str!("../../templates/partials/alert_history.hbs")),
    ("partials/telegram_panel", include_str!("../../templates/partials/telegram_panel.hbs")),
    ("partials/toggle", include_str!("../../templates/partials/toggle.hbs")),
    ("partials/toast", include_str!("../../templates/partials/toast.hbs")),
    ("partials/premium_gate", include_str!("../../templates/partials/premium_gate.hbs")),
    ("partials/insights", include_str!("../../templates/partials/insights.hbs")),
];

pub fn build_handlebars() -> Hbs {
    let mut hb = Handlebars::new();

    for (name, src) in TEMPLATES {
        hb.register_template_string(name, src)
            .unwrap_or_else(|e| panic!("template {name}: {e}"));
    }

    hb.register_partial("navbar", include_str!("../../templates/partials/navbar.hbs"))
        .expect("register navbar partial");

    Arc::new(hb)
}
