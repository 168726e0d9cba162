use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::AppError;
use crate::gateway::{ApiGateway, RequestOptions};
use crate::tprintln;

use super::principal::UserIdentity;
use super::session::SessionToken;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const GOOGLE_UNAVAILABLE: &str = "Google sign-in is not available yet.";

// Client-side pre-check only; the backend validates authoritatively.
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

// Heuristic fallbacks for backends that only send free text.
static NOT_FOUND_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)不存在|未注册|not\s*found|does\s*not\s*exist").unwrap());
static PASSWORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)密码|password").unwrap());
static DISABLED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)停用|inactive|disabled").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Neutral,
    Success,
    Error,
    Warning,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Neutral => "neutral",
            Tone::Success => "success",
            Tone::Error => "error",
            Tone::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFailureKind {
    AccountNotFound,
    BadPassword,
    AccountDisabled,
    Generic,
}

impl LoginFailureKind {
    /// Stable machine-readable codes, preferred over message matching when present.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "ACCOUNT_NOT_FOUND" => Some(LoginFailureKind::AccountNotFound),
            "BAD_PASSWORD" => Some(LoginFailureKind::BadPassword),
            "ACCOUNT_DISABLED" => Some(LoginFailureKind::AccountDisabled),
            _ => None,
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            LoginFailureKind::AccountNotFound | LoginFailureKind::AccountDisabled => Tone::Warning,
            LoginFailureKind::BadPassword | LoginFailureKind::Generic => Tone::Error,
        }
    }

    fn canned_message(&self) -> Option<&'static str> {
        match self {
            LoginFailureKind::AccountNotFound => Some("Account not found. Use Create Account to register."),
            LoginFailureKind::BadPassword => Some("Incorrect password. Try again or reset your password."),
            LoginFailureKind::AccountDisabled => Some("This account has been disabled. Contact an administrator."),
            LoginFailureKind::Generic => None,
        }
    }
}

/// Credential rejection classified for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginFailure {
    pub kind: LoginFailureKind,
    pub tone: Tone,
    pub message: String,
}

impl LoginFailure {
    fn of(kind: LoginFailureKind, backend_message: &str) -> Self {
        let message = kind.canned_message().map(str::to_string).unwrap_or_else(|| backend_message.to_string());
        Self { kind, tone: kind.tone(), message }
    }

    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self { kind: LoginFailureKind::Generic, tone: Tone::Error, message: message.into() }
    }
}

/// Registration rejected by the backend (or unreachable backend when `status` is `None`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFailure {
    pub status: Option<u16>,
    pub message: String,
}

impl RegisterFailure {
    pub fn is_duplicate(&self) -> bool { self.status == Some(409) }
    pub fn is_validation(&self) -> bool { self.status == Some(422) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    /// Rejected before any request was sent (validation or a submit already in flight).
    Invalid(AppError),
    Login(LoginFailure),
    Register(RegisterFailure),
}

impl AuthFailure {
    pub fn message(&self) -> &str {
        match self {
            AuthFailure::Invalid(e) => e.message(),
            AuthFailure::Login(f) => &f.message,
            AuthFailure::Register(f) => &f.message,
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            AuthFailure::Invalid(e) if e.code_str() == "submit_in_flight" => Tone::Neutral,
            AuthFailure::Invalid(_) => Tone::Error,
            AuthFailure::Login(f) => f.tone,
            AuthFailure::Register(f) if f.is_duplicate() => Tone::Warning,
            AuthFailure::Register(_) => Tone::Error,
        }
    }

    /// Status for re-rendering the form.
    pub fn http_status(&self) -> u16 {
        match self {
            AuthFailure::Invalid(e) => e.http_status(),
            AuthFailure::Login(f) if f.kind == LoginFailureKind::Generic => 502,
            AuthFailure::Login(_) => 401,
            AuthFailure::Register(f) => f.status.filter(|s| (400..500).contains(s)).unwrap_or(502),
        }
    }
}

impl From<AuthFailure> for AppError {
    fn from(f: AuthFailure) -> Self {
        match f {
            AuthFailure::Invalid(e) => e,
            AuthFailure::Login(l) => AppError::auth("login_rejected", l.message),
            AuthFailure::Register(r) if r.is_duplicate() => AppError::conflict("account_exists", r.message),
            AuthFailure::Register(r) => AppError::user("register_rejected", r.message),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

/// Registration form as submitted; `confirm_password` never leaves the client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: Option<UserIdentity>,
    /// `Set-Cookie` values from the backend, to relay to the browser.
    pub set_cookies: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LoginReply {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    user: Option<Value>,
}

pub fn validate_email(email: &str) -> Result<String, AppError> {
    let email = email.trim();
    if !EMAIL_RE.is_match(email) {
        return Err(AppError::user("invalid_email", "Please enter a valid email address."));
    }
    Ok(email.to_string())
}

pub fn validate_login(email: &str, password: &str) -> Result<LoginRequest, AppError> {
    let email = validate_email(email)?;
    if password.is_empty() {
        return Err(AppError::user("missing_password", "Please enter your password."));
    }
    Ok(LoginRequest { email, password: password.to_string() })
}

impl RegisterForm {
    pub fn validate(&self) -> Result<RegisterRequest, AppError> {
        let email = validate_email(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::user(
                "password_too_short",
                format!("Password must be at least {} characters.", MIN_PASSWORD_LEN),
            ));
        }
        if self.password != self.confirm_password {
            return Err(AppError::user("password_mismatch", "The two passwords do not match."));
        }
        let display_name = self.display_name.as_deref().map(str::trim).unwrap_or("").to_string();
        Ok(RegisterRequest { email, password: self.password.clone(), display_name })
    }
}

/// Human-readable message from a backend error body: `detail`, then `message`, then raw text.
pub fn extract_backend_message(body: &str) -> Option<String> {
    match serde_json::from_str::<Value>(body) {
        Ok(v) => ["detail", "message"]
            .iter()
            .filter_map(|k| v.get(*k).and_then(Value::as_str))
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string),
        Err(_) => {
            let t = body.trim();
            if t.is_empty() { None } else { Some(t.to_string()) }
        }
    }
}

/// Classify a rejected login. A stable `code` in the body wins; otherwise the
/// message text is matched against known phrasings. The text matching is a
/// best-effort heuristic, not a contract with the backend.
pub fn classify_login_error(body: &str) -> LoginFailure {
    let message = extract_backend_message(body).unwrap_or_else(|| "Login failed, please try again later.".to_string());
    let code = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("code").and_then(Value::as_str).and_then(LoginFailureKind::from_code));
    if let Some(kind) = code {
        return LoginFailure::of(kind, &message);
    }
    let kind = if NOT_FOUND_RE.is_match(&message) {
        LoginFailureKind::AccountNotFound
    } else if PASSWORD_RE.is_match(&message) {
        LoginFailureKind::BadPassword
    } else if DISABLED_RE.is_match(&message) {
        LoginFailureKind::AccountDisabled
    } else {
        LoginFailureKind::Generic
    };
    LoginFailure::of(kind, &message)
}

fn register_failure(status: u16, body: &str) -> RegisterFailure {
    let message = extract_backend_message(body).unwrap_or_else(|| match status {
        409 => "An account with this email already exists.".to_string(),
        _ => format!("Registration failed ({})", status),
    });
    RegisterFailure { status: Some(status), message }
}

/// Login and registration against the backend.
#[derive(Clone)]
pub struct AuthClient {
    gateway: ApiGateway,
}

impl AuthClient {
    pub fn new(gateway: ApiGateway) -> Self { Self { gateway } }

    pub async fn login_by_email(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthFailure> {
        let req = validate_login(email, password).map_err(AuthFailure::Invalid)?;
        let body = serde_json::to_value(&req).map_err(|e| AuthFailure::Invalid(AppError::internal("encode", e.to_string())))?;
        let resp = match self.gateway.send("/api/auth/login", RequestOptions::post(body)).await {
            Ok(r) => r,
            Err(e) => {
                warn!(target: "auth", error = %e, "login request failed");
                return Err(AuthFailure::Login(LoginFailure::generic("Login failed, please try again later.")));
            }
        };
        if !resp.is_success() {
            let failure = classify_login_error(&resp.body);
            info!(target: "auth", email = %req.email, status = resp.status, kind = ?failure.kind, "login rejected");
            return Err(AuthFailure::Login(failure));
        }
        let reply: LoginReply = resp
            .json()
            .ok()
            .flatten()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or(LoginReply { ok: false, user: None });
        if !reply.ok {
            return Err(AuthFailure::Login(LoginFailure::generic("Login failed, please try again later.")));
        }
        let user = match reply.user.map(UserIdentity::from_value).transpose() {
            Ok(u) => u,
            Err(e) => {
                warn!(target: "auth", error = %e, "login reply carried an unreadable user summary");
                None
            }
        };
        info!(target: "auth", email = %req.email, "login accepted");
        tprintln!("auth.login email={} cookies={}", req.email, resp.set_cookies.len());
        Ok(LoginOutcome { user, set_cookies: resp.set_cookies })
    }

    pub async fn register_by_email(&self, form: &RegisterForm) -> Result<(), AuthFailure> {
        let req = form.validate().map_err(AuthFailure::Invalid)?;
        let body = serde_json::to_value(&req).map_err(|e| AuthFailure::Invalid(AppError::internal("encode", e.to_string())))?;
        let resp = match self.gateway.send("/api/auth/register", RequestOptions::post(body)).await {
            Ok(r) => r,
            Err(e) => {
                warn!(target: "auth", error = %e, "register request failed");
                return Err(AuthFailure::Register(RegisterFailure { status: None, message: format!("Registration failed: {}", e.message()) }));
            }
        };
        if !resp.is_success() {
            let failure = register_failure(resp.status, &resp.body);
            info!(target: "auth", email = %req.email, status = resp.status, "registration rejected");
            return Err(AuthFailure::Register(failure));
        }
        info!(target: "auth", email = %req.email, "account registered");
        Ok(())
    }

    /// Best effort; the caller clears the browser cookie regardless.
    pub async fn logout(&self, token: Option<&SessionToken>) {
        let mut opts = RequestOptions::post(serde_json::json!({}));
        if let Some(t) = token { opts = opts.with_session(t); }
        if let Err(e) = self.gateway.request("/api/auth/logout", opts).await {
            warn!(target: "auth", error = %e, "backend logout failed; clearing cookie locally");
        }
    }

    /// Google sign-in is stubbed; no request is made.
    pub fn google_sign_in(&self) -> (Tone, &'static str) { (Tone::Warning, GOOGLE_UNAVAILABLE) }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
