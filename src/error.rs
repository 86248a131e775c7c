use thiserror::Error;

/// Failures of the persistence collaborators (users, preferences, alert history).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("db error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("{0}")]
    Unavailable(String),
}

/// Failures of the notification collaborator.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("missing credentials for {0}")]
    MissingCredentials(&'static str),

    #[error("{0} delivery is not configured")]
    ChannelUnavailable(&'static str),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rejected by {channel}: {reason}")]
    Rejected { channel: &'static str, reason: String },
}
