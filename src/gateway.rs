//! Backend API gateway.
//!
//! A single request path against the configured base URL. Every call carries
//! credentials (the `session` cookie, explicitly when the caller holds a token, or from
//! the cookie jar of a single-user client) and a JSON content type unless overridden.
//! Non-2xx answers are surfaced as `AppError::Upstream` with the raw body; there is no
//! caching, retrying or rate limiting here.

use std::time::Duration;

use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde_json::Value;
use tracing::debug;

use crate::config::{normalize_base, FrontendConfig};
use crate::error::{AppError, AppResult};
use crate::identity::SessionToken;

/// Per-request overrides.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Option<Method>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub session: Option<SessionToken>,
}

impl RequestOptions {
    pub fn get() -> Self { Self::default() }

    pub fn post(body: Value) -> Self {
        Self { method: Some(Method::POST), body: Some(body), ..Default::default() }
    }

    pub fn with_session(mut self, token: &SessionToken) -> Self {
        self.session = Some(token.clone());
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Raw backend answer, kept so callers can relay `Set-Cookie` to the browser.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: u16,
    pub set_cookies: Vec<String>,
    pub body: String,
}

impl GatewayResponse {
    pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }

    /// `None` for 204, parsed JSON otherwise.
    pub fn json(&self) -> AppResult<Option<Value>> {
        if self.status == 204 { return Ok(None); }
        serde_json::from_str::<Value>(&self.body)
            .map(Some)
            .map_err(|e| AppError::io("malformed_response", format!("invalid JSON from backend: {}", e)))
    }

    /// Fail with the raw body unless the status is 2xx.
    pub fn error_for_status(self) -> AppResult<Self> {
        if self.is_success() { Ok(self) } else { Err(AppError::upstream(self.status, self.body)) }
    }
}

#[derive(Clone)]
pub struct ApiGateway {
    base: String,
    client: reqwest::Client,
}

impl ApiGateway {
    /// Server-side gateway: credentials are attached per request from the caller's
    /// token only. A shared cookie jar here would hand one user's session to the next.
    pub fn new(base: &str, timeout: Duration) -> AppResult<Self> {
        Self::build(base, timeout, false)
    }

    /// Single-user client: cookies set by the backend are kept and sent back.
    pub fn with_cookie_jar(base: &str, timeout: Duration) -> AppResult<Self> {
        Self::build(base, timeout, true)
    }

    fn build(base: &str, timeout: Duration, cookie_jar: bool) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(cookie_jar)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::internal("http_client", e.to_string()))?;
        Ok(Self { base: normalize_base(base), client })
    }

    pub fn from_config(cfg: &FrontendConfig) -> AppResult<Self> {
        Self::new(&cfg.api_base, cfg.request_timeout)
    }

    pub fn base(&self) -> &str { &self.base }

    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') { format!("{}{}", self.base, path) } else { format!("{}/{}", self.base, path) }
    }

    fn build_headers(opts: &RequestOptions) -> AppResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = &opts.session {
            let cookie = HeaderValue::from_str(&token.cookie_pair())
                .map_err(|_| AppError::user("bad_session", "session token is not a valid cookie value"))?;
            headers.insert(COOKIE, cookie);
        }
        // caller overrides win, including Content-Type
        for (name, value) in &opts.headers {
            let n = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| AppError::user("bad_header", format!("invalid header name: {}", name)))?;
            let v = HeaderValue::from_str(value)
                .map_err(|_| AppError::user("bad_header", format!("invalid value for header {}", name)))?;
            headers.insert(n, v);
        }
        Ok(headers)
    }

    /// Issue the request and return status, relayable cookies and body text.
    /// Only transport failures are errors here.
    pub async fn send(&self, path: &str, opts: RequestOptions) -> AppResult<GatewayResponse> {
        let url = self.url_for(path);
        let method = opts.method.clone().unwrap_or(Method::GET);
        let headers = Self::build_headers(&opts)?;
        let mut req = self.client.request(method.clone(), &url).headers(headers);
        if let Some(body) = &opts.body {
            req = req.body(body.to_string());
        }
        let resp = req.send().await.map_err(|e| AppError::io("transport", e.to_string()))?;
        let status = resp.status().as_u16();
        let set_cookies = resp
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(|s| s.to_string()))
            .collect::<Vec<_>>();
        let body = resp.text().await.map_err(|e| AppError::io("transport", e.to_string()))?;
        debug!(target: "gateway", %method, path, status, "backend call");
        Ok(GatewayResponse { status, set_cookies, body })
    }

    /// Parsed JSON body, `None` on 204, `AppError::Upstream` on non-2xx.
    pub async fn request(&self, path: &str, opts: RequestOptions) -> AppResult<Option<Value>> {
        self.send(path, opts).await?.error_for_status()?.json()
    }
}
