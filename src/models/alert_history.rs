use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Price,
    Portfolio,
    News,
    Risk,
}

impl AlertType {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertType::Price => "price",
            AlertType::Portfolio => "portfolio",
            AlertType::News => "news",
            AlertType::Risk => "risk",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertHistoryEntry {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: AlertType,

    pub title: String,
    pub message: String,

    // unix seconds
    pub timestamp: i64,

    pub severity: Severity,
    pub acknowledged: bool,
}

/// How an entry is drawn. Depends only on `(severity, acknowledged)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Treatment {
    pub badge_class: &'static str,
    // 3 = most prominent
    pub priority: u8,
    pub muted: bool,
}

pub fn treatment(severity: Severity, acknowledged: bool) -> Treatment {
    let (badge_class, priority) = match severity {
        Severity::High => ("bg-danger", 3),
        Severity::Medium => ("bg-warning text-dark", 2),
        Severity::Low => ("bg-success", 1),
    };

    Treatment { badge_class, priority, muted: acknowledged }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    Acknowledged,
    AlreadyAcknowledged,
    NotFound,
}

/// Flips exactly one entry to acknowledged. Calling it again is a no-op.
pub fn acknowledge(entries: &mut [AlertHistoryEntry], id: &str) -> AckOutcome {
    match entries.iter_mut().find(|e| e.id == id) {
        Some(e) if e.acknowledged => AckOutcome::AlreadyAcknowledged,
        Some(e) => {
            e.acknowledged = true;
            AckOutcome::Acknowledged
        }
        None => AckOutcome::NotFound,
    }
}

/// Most recent first.
pub fn sort_recent_first(entries: &mut [AlertHistoryEntry]) {
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

pub fn unacknowledged_count(entries: &[AlertHistoryEntry]) -> usize {
    entries.iter().filter(|e| !e.acknowledged).count()
}

/// Demo feed used by the in-memory store and the seeded demo account.
pub fn sample_history(now: i64) -> Vec<AlertHistoryEntry> {
    let entry = |id: &str,
                 kind: AlertType,
                 title: &str,
                 message: &str,
                 age_secs: i64,
                 severity: Severity,
                 acknowledged: bool| {
        AlertHistoryEntry {
            id: id.to_string(),
            kind,
            title: title.to_string(),
            message: message.to_string(),
            timestamp: now - age_secs,
            severity,
            acknowledged,
        }
    };

    vec![
        entry(
            "1",
            AlertType::Price,
            "AAPL Price Alert",
            "Apple Inc. has increased by 8.2% in the last hour",
            3_600,
            Severity::Medium,
            false,
        ),
        entry(
            "2",
            AlertType::Portfolio,
            "Portfolio Performance",
            "Your portfolio has gained ₹12,450 today (+2.8%)",
            7_200,
            Severity::Low,
            true,
        ),
        entry(
            "3",
            AlertType::Risk,
            "Risk Alert",
            "High concentration detected in Technology sector (65%)",
            86_400,
            Severity::High,
            false,
        ),
        entry(
            "4",
            AlertType::News,
            "Market News",
            "Fed announces new monetary policy - Markets react positively",
            172_800,
            Severity::Medium,
            true,
        ),
    ]
}
