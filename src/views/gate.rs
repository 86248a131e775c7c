//! Premium entitlement gate.
//!
//! [`gate`] is the whole decision: entitled sessions get their content back
//! untouched, everyone else gets it behind an inert overlay with an upgrade
//! call-to-action. The upgrade button only navigates to `/upgrade`.

use handlebars::Handlebars;
use serde_json::json;

use crate::{models::plan::PREMIUM_PRICE, session::SessionProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureRequest<'a> {
    pub feature: &'a str,
    pub description: Option<&'a str>,
    pub show_upgrade: bool,
}

impl<'a> FeatureRequest<'a> {
    /// `feature` is one of the names in [`crate::models::plan`]; it is shown
    /// as-is and sent along to `/upgrade`.
    pub fn new(feature: &'a str) -> Self {
        FeatureRequest { feature, description: None, show_upgrade: true }
    }

    pub fn describe(mut self, description: &'a str) -> Self {
        self.description = Some(description);
        self
    }

    pub fn without_upgrade(mut self) -> Self {
        self.show_upgrade = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gated<'a> {
    Open(String),
    Locked { request: FeatureRequest<'a>, children: String },
}

pub fn gate(entitled: bool, request: FeatureRequest<'_>, children: String) -> Gated<'_> {
    if entitled {
        Gated::Open(children)
    } else {
        Gated::Locked { request, children }
    }
}

impl Gated<'_> {
    pub fn is_locked(&self) -> bool {
        matches!(self, Gated::Locked { .. })
    }

    pub fn into_html(self, hbs: &Handlebars<'_>) -> String {
        match self {
            Gated::Open(children) => children,
            Gated::Locked { request, children } => {
                let ctx = json!({
                    "feature": request.feature,
                    "description": request.description,
                    "show_upgrade": request.show_upgrade,
                    "price": PREMIUM_PRICE,
                    "children": children,
                });
                hbs.render("partials/premium_gate", &ctx)
                    .unwrap_or_else(|e| format!("template error: {e}"))
            }
        }
    }
}

/// Convenience for handlers: decide from the injected session and render.
pub fn render_gated(
    hbs: &Handlebars<'_>,
    session: &dyn SessionProvider,
    request: FeatureRequest<'_>,
    children: String,
) -> String {
    gate(session.is_entitled(), request, children).into_html(hbs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{session::Session, templates::build_handlebars};

    const CHILD: &str = r#"<button id="child-btn">Do it</button>"#;

    #[test]
    fn entitled_content_is_returned_verbatim() {
        let hbs = build_handlebars();
        let req = FeatureRequest::new("Risk Alerts").describe("Advanced risk monitoring");
        let out = gate(true, req, CHILD.to_string());
        assert!(!out.is_locked());
        assert_eq!(out.into_html(&hbs), CHILD);
    }

    #[test]
    fn locked_content_is_inert_with_overlay() {
        let hbs = build_handlebars();
        let req = FeatureRequest::new("Risk Alerts").describe("Advanced risk monitoring");
        let html = gate(false, req, CHILD.to_string()).into_html(&hbs);

        let inert_at = html.find("inert").expect("inert wrapper");
        let child_at = html.find(CHILD).expect("children kept for preview");
        assert!(inert_at < child_at);
        assert!(html.contains("Premium Only"));
        assert!(html.contains("Risk Alerts"));
        assert!(html.contains("Advanced risk monitoring"));
        assert!(html.contains("Upgrade to Premium - ₹99/month"));
        assert!(html.contains(r#"action="/upgrade""#));
    }

    #[test]
    fn upgrade_button_can_be_hidden() {
        let hbs = build_handlebars();
        let req = FeatureRequest::new("AI-Powered Insights").without_upgrade();
        let html = gate(false, req, CHILD.to_string()).into_html(&hbs);
        assert!(html.contains("AI-Powered Insights"));
        assert!(!html.contains("Upgrade to Premium"));
    }

    #[test]
    fn gate_is_idempotent() {
        let hbs = build_handlebars();
        let req = FeatureRequest::new("Telegram Alerts");
        let a = gate(false, req, CHILD.to_string()).into_html(&hbs);
        let b = gate(false, req, CHILD.to_string()).into_html(&hbs);
        assert_eq!(a, b);
    }

    #[test]
    fn missing_or_loading_session_fails_closed() {
        let hbs = build_handlebars();
        let req = FeatureRequest::new("Telegram Alerts");
        for session in [Session::SignedOut, Session::Loading] {
            let html = render_gated(&hbs, &session, req, CHILD.to_string());
            assert!(html.contains("Premium Only"));
        }
    }
}
