use std::fmt::{Debug, Formatter};

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};

/// Name of the cookie the backend sets on successful login.
pub const SESSION_COOKIE: &str = "session";

const CLEAR_SESSION_COOKIE: &str = "session=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; HttpOnly; SameSite=Lax; Path=/";

/// Opaque credential issued by the backend. The front end only checks presence;
/// it never builds, signs or rewrites one.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// `None` for empty or whitespace-only values.
    pub fn new<S: Into<String>>(raw: S) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() { None } else { Some(Self(raw)) }
    }

    pub fn as_str(&self) -> &str { &self.0 }

    pub fn cookie_pair(&self) -> String { format!("{}={}", SESSION_COOKIE, self.0) }
}

// tokens are credentials; keep them out of logs
impl Debug for SessionToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str("SessionToken(***)") }
}

pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for cookie in headers.get_all(COOKIE).iter() {
        let Ok(s) = cookie.to_str() else { continue; };
        for part in s.split(';') {
            let p = part.trim();
            if let Some((k, v)) = p.split_once('=') {
                if k.trim() == name { return Some(v.trim().to_string()); }
            }
        }
    }
    None
}

/// Session token carried by the browser on this request, if any.
pub fn session_from_headers(headers: &HeaderMap) -> Option<SessionToken> {
    parse_cookie(headers, SESSION_COOKIE).and_then(SessionToken::new)
}

/// Expired `Set-Cookie` that removes the session from the browser.
pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static(CLEAR_SESSION_COOKIE)
}
