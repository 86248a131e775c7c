//! Identity as an explicit capability.
//!
//! Handlers never reach into ambient request state to decide entitlement; they
//! extract a [`Session`] and hand it (as a [`SessionProvider`]) to whatever needs it.

use std::convert::Infallible;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::models::CurrentUser;

pub trait SessionProvider: Send + Sync {
    fn current_user(&self) -> Option<&CurrentUser>;

    /// True while the identity provider cannot resolve the user yet.
    fn is_loading(&self) -> bool {
        false
    }

    /// Fail closed: loading or signed-out sessions are never entitled.
    fn is_entitled(&self) -> bool {
        if self.is_loading() {
            return false;
        }
        self.current_user().map(|u| u.is_premium).unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub enum Session {
    Loading,
    SignedOut,
    SignedIn(CurrentUser),
}

impl SessionProvider for Session {
    fn current_user(&self) -> Option<&CurrentUser> {
        match self {
            Session::SignedIn(u) => Some(u),
            _ => None,
        }
    }

    fn is_loading(&self) -> bool {
        matches!(self, Session::Loading)
    }
}

impl From<Option<CurrentUser>> for Session {
    fn from(u: Option<CurrentUser>) -> Self {
        match u {
            Some(u) => Session::SignedIn(u),
            None => Session::SignedOut,
        }
    }
}

// Never rejects: a request without identity is simply signed out.
#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(s) = parts.extensions.get::<Session>() {
            return Ok(s.clone());
        }
        Ok(parts.extensions.get::<CurrentUser>().cloned().into())
    }
}
