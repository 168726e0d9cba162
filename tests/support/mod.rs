#![allow(dead_code)]
//! In-process stand-in for the X Contact backend plus a helper that starts the
//! front end against it. Both bind ephemeral localhost ports.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use xcontact::config::FrontendConfig;
use xcontact::gateway::ApiGateway;
use xcontact::identity::session_from_headers;
use xcontact::server::{router, AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeMode {
    Normal,
    ServerError,
    MalformedJson,
}

#[derive(Debug, Clone)]
struct Account {
    id: i64,
    password: String,
    role: String,
    display_name: Option<String>,
    active: bool,
}

struct Inner {
    accounts: HashMap<String, Account>,
    sessions: HashMap<String, String>,
    hits: HashMap<&'static str, usize>,
    me_mode: MeMode,
    next_id: i64,
    next_token: u64,
}

impl Inner {
    fn hit(&mut self, name: &'static str) { *self.hits.entry(name).or_insert(0) += 1; }

    fn user_json(&self, email: &str) -> Option<Value> {
        self.accounts.get(email).map(|a| {
            json!({"id": a.id, "email": email, "role": a.role, "display_name": a.display_name, "is_active": a.active})
        })
    }
}

type Shared = Arc<Mutex<Inner>>;

// Abort the server task when the last handle goes away.
struct ServerGuard(JoinHandle<()>);
impl Drop for ServerGuard {
    fn drop(&mut self) { self.0.abort(); }
}

#[derive(Clone)]
pub struct MockBackend {
    inner: Shared,
    base: String,
    _guard: Arc<ServerGuard>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let inner: Shared = Arc::new(Mutex::new(Inner {
            accounts: HashMap::new(),
            sessions: HashMap::new(),
            hits: HashMap::new(),
            me_mode: MeMode::Normal,
            next_id: 1,
            next_token: 1,
        }));
        let app = Router::new()
            .route("/api/auth/register", post(register))
            .route("/api/auth/login", post(login))
            .route("/api/auth/me", get(me))
            .route("/api/auth/logout", post(logout))
            .route("/api/users", get(users))
            .with_state(inner.clone());
        let (handle, base) = serve(app).await;
        Self { inner, base, _guard: Arc::new(ServerGuard(handle)) }
    }

    pub fn base(&self) -> &str { &self.base }

    pub fn gateway(&self) -> ApiGateway {
        ApiGateway::new(&self.base, Duration::from_secs(5)).expect("gateway")
    }

    pub fn add_account(&self, email: &str, password: &str, role: &str) {
        let mut g = self.inner.lock();
        let id = g.next_id;
        g.next_id += 1;
        g.accounts.insert(
            email.to_string(),
            Account { id, password: password.to_string(), role: role.to_string(), display_name: None, active: true },
        );
    }

    pub fn set_role(&self, email: &str, role: &str) {
        if let Some(a) = self.inner.lock().accounts.get_mut(email) { a.role = role.to_string(); }
    }

    pub fn set_active(&self, email: &str, active: bool) {
        if let Some(a) = self.inner.lock().accounts.get_mut(email) { a.active = active; }
    }

    pub fn set_me_mode(&self, mode: MeMode) { self.inner.lock().me_mode = mode; }

    pub fn hits(&self, endpoint: &str) -> usize { self.inner.lock().hits.get(endpoint).copied().unwrap_or(0) }

    pub fn live_sessions(&self) -> usize { self.inner.lock().sessions.len() }
}

async fn serve(app: Router) -> (JoinHandle<()>, String) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind 127.0.0.1:0");
    let addr = listener.local_addr().expect("local addr");
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("test server task error: {e:?}");
        }
    });
    (handle, format!("http://{}", addr))
}

fn detail(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({"detail": msg}))).into_response()
}

fn str_field<'a>(body: &'a Value, key: &str) -> &'a str {
    body.get(key).and_then(Value::as_str).unwrap_or("")
}

async fn register(State(s): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut g = s.lock();
    g.hit("register");
    let email = str_field(&body, "email").to_string();
    let password = str_field(&body, "password").to_string();
    if password.chars().count() < 6 {
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"detail": [{"loc": ["body", "password"], "msg": "too short"}]})))
            .into_response();
    }
    if g.accounts.contains_key(&email) {
        return detail(StatusCode::CONFLICT, "account already exists");
    }
    let display_name = Some(str_field(&body, "display_name").trim().to_string()).filter(|n| !n.is_empty());
    let id = g.next_id;
    g.next_id += 1;
    g.accounts.insert(email.clone(), Account { id, password, role: "member".into(), display_name, active: true });
    let user = g.user_json(&email);
    (StatusCode::CREATED, Json(json!({"ok": true, "user": user}))).into_response()
}

async fn login(State(s): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut g = s.lock();
    g.hit("login");
    let email = str_field(&body, "email").to_string();
    let password = str_field(&body, "password");
    let Some(account) = g.accounts.get(&email).cloned() else {
        return detail(StatusCode::UNAUTHORIZED, "account not found");
    };
    if !account.active {
        return detail(StatusCode::FORBIDDEN, "account disabled");
    }
    if account.password != password {
        return detail(StatusCode::UNAUTHORIZED, "wrong password");
    }
    let token = format!("tok-{}", g.next_token);
    g.next_token += 1;
    g.sessions.insert(token.clone(), email.clone());
    let user = g.user_json(&email);
    (
        StatusCode::OK,
        [(SET_COOKIE, format!("session={}; HttpOnly; SameSite=Lax; Path=/", token))],
        Json(json!({"ok": true, "user": user})),
    )
        .into_response()
}

fn session_email(g: &Inner, token: Option<String>) -> Option<String> {
    token.and_then(|t| g.sessions.get(&t).cloned())
}

async fn me(State(s): State<Shared>, Query(q): Query<HashMap<String, String>>, headers: HeaderMap) -> Response {
    let mut g = s.lock();
    g.hit("me");
    match g.me_mode {
        MeMode::ServerError => return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        MeMode::MalformedJson => return (StatusCode::OK, "{not json").into_response(),
        MeMode::Normal => {}
    }
    let token = q.get("session").cloned().or_else(|| session_from_headers(&headers).map(|t| t.as_str().to_string()));
    match session_email(&g, token).and_then(|e| g.user_json(&e)) {
        Some(user) => Json(user).into_response(),
        None => detail(StatusCode::UNAUTHORIZED, "not authenticated"),
    }
}

async fn logout(State(s): State<Shared>, headers: HeaderMap) -> Response {
    let mut g = s.lock();
    g.hit("logout");
    if let Some(t) = session_from_headers(&headers) {
        g.sessions.remove(t.as_str());
    }
    Json(json!({"ok": true})).into_response()
}

async fn users(State(s): State<Shared>, headers: HeaderMap) -> Response {
    let mut g = s.lock();
    g.hit("users");
    let token = session_from_headers(&headers).map(|t| t.as_str().to_string());
    let Some(email) = session_email(&g, token) else {
        return detail(StatusCode::UNAUTHORIZED, "not authenticated");
    };
    let role = g.accounts.get(&email).map(|a| a.role.clone()).unwrap_or_default();
    if role != "owner" && role != "admin" {
        return detail(StatusCode::FORBIDDEN, "forbidden");
    }
    let mut emails: Vec<&String> = g.accounts.keys().collect();
    emails.sort();
    let rows: Vec<Value> = emails.into_iter().filter_map(|e| g.user_json(e)).collect();
    Json(Value::Array(rows)).into_response()
}

/// Front end wired to `api_base`, served on an ephemeral port.
pub struct Frontend {
    pub base: String,
    _guard: ServerGuard,
}

pub async fn start_frontend(api_base: &str) -> Frontend {
    let cfg = FrontendConfig::default().with_api_base(api_base);
    let state = AppState::new(&cfg).expect("front-end state");
    let (handle, base) = serve(router(state)).await;
    Frontend { base, _guard: ServerGuard(handle) }
}

/// Browser stand-in: never follows redirects and keeps no cookies, so each test
/// controls the `Cookie` header explicitly.
pub fn browser() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("client")
}

/// Base URL on which nothing is listening.
pub fn dead_base() -> String {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).expect("bind 127.0.0.1:0");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

/// `session=<token>` value out of a response's `Set-Cookie` headers.
pub fn session_cookie(resp: &reqwest::Response) -> Option<String> {
    resp.headers().get_all(reqwest::header::SET_COOKIE).iter().find_map(|v| {
        let s = v.to_str().ok()?;
        let pair = s.split(';').next()?.trim();
        let (name, value) = pair.split_once('=')?;
        (name == "session" && value != "deleted").then(|| value.to_string())
    })
}

pub fn location(resp: &reqwest::Response) -> Option<String> {
    resp.headers().get(reqwest::header::LOCATION).and_then(|v| v.to_str().ok()).map(str::to_string)
}

/// Sign in through the front end and return the relayed session token.
pub async fn sign_in(client: &reqwest::Client, front: &Frontend, email: &str, password: &str) -> String {
    let resp = client
        .post(format!("{}/login", front.base))
        .form(&[("email", email), ("password", password)])
        .send()
        .await
        .expect("login request");
    assert_eq!(resp.status().as_u16(), 302, "login should redirect");
    session_cookie(&resp).expect("session cookie relayed")
}

pub async fn visit(client: &reqwest::Client, front: &Frontend, path: &str, token: Option<&str>) -> reqwest::Response {
    let mut req = client.get(format!("{}{}", front.base, path));
    if let Some(t) = token {
        req = req.header(reqwest::header::COOKIE, format!("session={}", t));
    }
    req.send().await.expect("page request")
}
