//!
//! xcontact front-end server
//! -------------------------
//! This module defines the Axum-based server that renders the dashboard pages.
//!
//! Responsibilities:
//! - Login/registration forms that call the backend and relay its session cookie.
//! - Per-request identity resolution from the `session` cookie, failing open to anonymous.
//! - Route guards for the dashboard and the owner/admin-only user listing.
//! - Logout that clears the browser cookie.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::FrontendConfig;
use crate::error::{AppError, AppResult};
use crate::gateway::{ApiGateway, RequestOptions};
use crate::identity::{
    clear_session_cookie, session_from_headers, AuthClient, AuthFailure, GuardDecision, IdentityResolver,
    RegisterForm, RoutePolicy, RouteTable, SessionToken, SubmitGuards, Tone, ADMIN_USERS_ROUTE,
};
pub mod pages;

const IN_FLIGHT_MESSAGE: &str = "A submission for this account is already in progress.";

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: ApiGateway,
    pub auth: AuthClient,
    pub resolver: IdentityResolver,
    pub routes: Arc<RouteTable>,
    pub submits: SubmitGuards,
}

impl AppState {
    pub fn new(cfg: &FrontendConfig) -> AppResult<Self> {
        let gateway = ApiGateway::from_config(cfg)?;
        let routes = RouteTable::new(&cfg.login_route, &cfg.landing_route)
            .with_route(&cfg.landing_route, RoutePolicy::Authenticated)
            .with_route(ADMIN_USERS_ROUTE, RoutePolicy::admin_only());
        Ok(Self {
            auth: AuthClient::new(gateway.clone()),
            resolver: IdentityResolver::new(gateway.clone()),
            gateway,
            routes: Arc::new(routes),
            submits: SubmitGuards::new(),
        })
    }
}

pub fn router(state: AppState) -> Router {
    let login = state.routes.login_route().to_string();
    let landing = state.routes.landing_route().to_string();
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(|| async { "ok" }))
        .route(&login, get(login_page).post(login_submit))
        .route("/register", get(register_page).post(register_submit))
        .route("/logout", get(logout).post(logout))
        .route("/auth/google", get(google_sign_in))
        .route(&landing, get(dashboard))
        .route(ADMIN_USERS_ROUTE, get(admin_users))
        .with_state(state)
}

/// Start the front-end server with the given configuration.
pub async fn run_with_config(cfg: FrontendConfig) -> anyhow::Result<()> {
    info!(
        target: "startup",
        "xcontact front end starting: http_port={}, api_base='{}', timeout_ms={}",
        cfg.http_port, cfg.api_base, cfg.request_timeout.as_millis()
    );
    let state = AppState::new(&cfg).map_err(anyhow::Error::from).context("While building server state")?;
    let app = router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", cfg.http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Convenience entry point using environment configuration.
pub async fn run() -> anyhow::Result<()> {
    run_with_config(FrontendConfig::from_env()).await
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

fn form_response(status: u16, html: String) -> Response {
    (StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST), Html(html)).into_response()
}

fn relay_cookies(resp: &mut Response, cookies: &[String]) {
    for c in cookies {
        match HeaderValue::from_str(c) {
            Ok(v) => { resp.headers_mut().append(SET_COOKIE, v); }
            Err(_) => warn!(target: "auth", "dropping unrelayable Set-Cookie from backend"),
        }
    }
}

fn in_flight() -> AuthFailure {
    AuthFailure::Invalid(AppError::conflict("submit_in_flight", IN_FLIGHT_MESSAGE))
}

/// Resolve the caller and run the route guard. Always a fresh resolve; nothing is
/// cached between navigations.
async fn guard(state: &AppState, path: &str, headers: &HeaderMap) -> (GuardDecision, Option<SessionToken>) {
    let token = session_from_headers(headers);
    let resolution = state.resolver.resolve(token.as_ref()).await;
    (state.routes.evaluate(path, resolution), token)
}

async fn index(State(state): State<AppState>) -> Response {
    found(state.routes.landing_route())
}

#[derive(Debug, Default, Deserialize)]
struct LoginNotice {
    #[serde(default)]
    registered: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
struct RegisterPayload {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default, rename = "confirmPassword")]
    confirm_password: String,
}

async fn login_page(State(state): State<AppState>, Query(notice): Query<LoginNotice>) -> Html<String> {
    let flash = notice.registered.map(|_| (Tone::Success, "Account created. Please sign in."));
    Html(pages::login_page(state.routes.login_route(), flash, ""))
}

async fn login_submit(State(state): State<AppState>, Form(payload): Form<LoginPayload>) -> Response {
    let login_route = state.routes.login_route();
    let Some(_ticket) = state.submits.try_begin("login", &payload.email) else {
        let f = in_flight();
        return form_response(f.http_status(), pages::login_page(login_route, Some((f.tone(), f.message())), &payload.email));
    };
    match state.auth.login_by_email(&payload.email, &payload.password).await {
        Ok(outcome) => {
            if outcome.set_cookies.is_empty() {
                warn!(target: "auth", "backend accepted login without setting a session cookie");
            }
            let mut resp = found(state.routes.landing_route());
            relay_cookies(&mut resp, &outcome.set_cookies);
            resp
        }
        Err(f) => form_response(f.http_status(), pages::login_page(login_route, Some((f.tone(), f.message())), &payload.email)),
    }
}

async fn register_page() -> Html<String> {
    Html(pages::register_page(None, "", ""))
}

async fn register_submit(State(state): State<AppState>, Form(payload): Form<RegisterPayload>) -> Response {
    let Some(_ticket) = state.submits.try_begin("register", &payload.email) else {
        let f = in_flight();
        return form_response(f.http_status(), pages::register_page(Some((f.tone(), f.message())), &payload.email, &payload.name));
    };
    let form = RegisterForm {
        email: payload.email.clone(),
        password: payload.password,
        confirm_password: payload.confirm_password,
        display_name: Some(payload.name.clone()).filter(|n| !n.trim().is_empty()),
    };
    match state.auth.register_by_email(&form).await {
        Ok(()) => found(&format!("{}?registered=1", state.routes.login_route())),
        Err(f) => form_response(f.http_status(), pages::register_page(Some((f.tone(), f.message())), &payload.email, &payload.name)),
    }
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let token = session_from_headers(&headers);
    state.auth.logout(token.as_ref()).await;
    let mut resp = found(state.routes.login_route());
    resp.headers_mut().append(SET_COOKIE, clear_session_cookie());
    resp
}

async fn google_sign_in(State(state): State<AppState>) -> Html<String> {
    let (tone, msg) = state.auth.google_sign_in();
    Html(pages::login_page(state.routes.login_route(), Some((tone, msg)), ""))
}

async fn dashboard(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let path = state.routes.landing_route().to_string();
    match guard(&state, &path, &headers).await {
        (GuardDecision::Render(user), _) => Html(pages::dashboard_page(&user)).into_response(),
        (GuardDecision::Redirect { location, .. }, _) => found(&location),
    }
}

async fn admin_users(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (decision, token) = guard(&state, ADMIN_USERS_ROUTE, &headers).await;
    let user = match decision {
        GuardDecision::Render(user) => user,
        GuardDecision::Redirect { location, .. } => return found(&location),
    };
    // privileged data is only requested once the guard has authorized
    let users = match token {
        Some(t) => fetch_users(&state, &t).await,
        None => Vec::new(),
    };
    Html(pages::admin_users_page(&user, &users)).into_response()
}

async fn fetch_users(state: &AppState, token: &SessionToken) -> Vec<Value> {
    match state.gateway.request("/api/users", RequestOptions::get().with_session(token)).await {
        Ok(Some(Value::Array(rows))) => rows,
        Ok(_) => {
            warn!(target: "auth", "user listing was not an array; rendering empty list");
            Vec::new()
        }
        Err(e) => {
            warn!(target: "auth", error = %e, "user listing unavailable; rendering empty list");
            Vec::new()
        }
    }
}
