use serde::Serialize;

pub const PREMIUM_PRICE: &str = "₹99/month";

pub const AI_INSIGHTS: &str = "AI-Powered Insights";
pub const TELEGRAM_ALERTS: &str = "Telegram Alerts";
pub const TELEGRAM_INTEGRATION: &str = "Telegram Integration";
pub const RISK_ALERTS: &str = "Risk Alerts";

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Feature {
    pub name: &'static str,
    pub free: bool,
    pub premium: bool,
}

const fn both(name: &'static str) -> Feature {
    Feature { name, free: true, premium: true }
}

const fn premium(name: &'static str) -> Feature {
    Feature { name, free: false, premium: true }
}

pub const CATALOG: &[Feature] = &[
    both("Add Stocks to Portfolio"),
    both("Basic Portfolio View"),
    both("Stock Price Updates"),
    premium(AI_INSIGHTS),
    premium(TELEGRAM_ALERTS),
    premium("Email Notifications"),
    premium("Advanced Screener Filters"),
    premium("Portfolio Health Score"),
    premium("PDF Report Downloads"),
    premium(RISK_ALERTS),
    premium("Multi-Portfolio Support"),
    premium("Sector Diversification Graph"),
    premium("Golden Crossover Alerts"),
    premium("288 EMA Analysis"),
];

/// Premium-only features listed on the upgrade page. `Telegram Integration` is the
/// alerts-page section for the same feature as `Telegram Alerts`.
pub fn requires_premium(name: &str) -> bool {
    if name == TELEGRAM_INTEGRATION {
        return true;
    }
    CATALOG.iter().any(|f| f.name == name && !f.free)
}
