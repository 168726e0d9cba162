use tracing::{debug, warn};

use crate::gateway::{ApiGateway, RequestOptions};
use crate::tprintln;

use super::principal::UserIdentity;
use super::session::SessionToken;

/// Outcome of exchanging a session token for the current user.
///
/// `FailedOpen` is the named availability policy: when the auth backend cannot be
/// reached or answers with anything other than a user, the request is served as
/// anonymous instead of failing the page render.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// No session cookie; no backend call was made.
    Anonymous,
    Resolved(UserIdentity),
    FailedOpen { reason: String },
}

impl Resolution {
    pub fn user(&self) -> Option<&UserIdentity> {
        match self {
            Resolution::Resolved(u) => Some(u),
            _ => None,
        }
    }

    pub fn into_user(self) -> Option<UserIdentity> {
        match self {
            Resolution::Resolved(u) => Some(u),
            _ => None,
        }
    }

    pub fn is_failed_open(&self) -> bool { matches!(self, Resolution::FailedOpen { .. }) }
}

#[derive(Clone)]
pub struct IdentityResolver {
    gateway: ApiGateway,
}

impl IdentityResolver {
    pub fn new(gateway: ApiGateway) -> Self { Self { gateway } }

    /// Resolve the token via `GET /api/auth/me`. Never errors: see [`Resolution::FailedOpen`].
    pub async fn resolve(&self, token: Option<&SessionToken>) -> Resolution {
        let Some(token) = token else { return Resolution::Anonymous; };
        let path = format!("/api/auth/me?session={}", urlencoding::encode(token.as_str()));
        let value = match self.gateway.request(&path, RequestOptions::get().with_session(token)).await {
            Ok(Some(v)) => v,
            Ok(None) => return fail_open("empty identity payload".to_string()),
            Err(e) => return fail_open(e.to_string()),
        };
        match UserIdentity::from_value(value) {
            Ok(user) => {
                debug!(target: "auth", email = %user.email, role = %user.role, "identity resolved");
                tprintln!("identity.resolve user={} role={}", user.email, user.role);
                Resolution::Resolved(user)
            }
            Err(e) => fail_open(e.to_string()),
        }
    }
}

fn fail_open(reason: String) -> Resolution {
    warn!(target: "auth", reason = %reason, "identity resolution failed open; serving request as anonymous");
    Resolution::FailedOpen { reason }
}
