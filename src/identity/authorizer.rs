use std::collections::HashMap;

use tracing::debug;

use super::principal::{Role, UserIdentity};
use super::resolver::Resolution;

pub const LOGIN_ROUTE: &str = "/login";
pub const LANDING_ROUTE: &str = "/dashboard";
pub const ADMIN_USERS_ROUTE: &str = "/admin/users";

static DEFAULT_POLICY: RoutePolicy = RoutePolicy::Authenticated;

/// Minimal requirement for viewing a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePolicy {
    /// Any resolved identity.
    Authenticated,
    AnyOf(Vec<Role>),
}

impl RoutePolicy {
    pub fn admin_only() -> Self { RoutePolicy::AnyOf(vec![Role::Owner, Role::Admin]) }

    pub fn allows(&self, role: &Role) -> bool {
        match self {
            RoutePolicy::Authenticated => true,
            RoutePolicy::AnyOf(roles) => roles.contains(role),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Unauthenticated,
    InsufficientRole,
    Authorized,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuardDecision {
    Render(UserIdentity),
    Redirect { state: GuardState, location: String },
}

impl GuardDecision {
    pub fn state(&self) -> GuardState {
        match self {
            GuardDecision::Render(_) => GuardState::Authorized,
            GuardDecision::Redirect { state, .. } => *state,
        }
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            GuardDecision::Render(_) => None,
            GuardDecision::Redirect { location, .. } => Some(location.as_str()),
        }
    }
}

/// Classify an identity against a policy.
pub fn check_route_allowed(policy: &RoutePolicy, user: Option<&UserIdentity>) -> GuardState {
    match user {
        None => GuardState::Unauthenticated,
        Some(u) if !policy.allows(&u.role) => GuardState::InsufficientRole,
        Some(_) => GuardState::Authorized,
    }
}

/// Route → policy table. Unregistered routes require authentication only.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: HashMap<String, RoutePolicy>,
    login_route: String,
    landing_route: String,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(LOGIN_ROUTE, LANDING_ROUTE)
            .with_route(LANDING_ROUTE, RoutePolicy::Authenticated)
            .with_route(ADMIN_USERS_ROUTE, RoutePolicy::admin_only())
    }
}

impl RouteTable {
    pub fn new(login_route: &str, landing_route: &str) -> Self {
        Self { routes: HashMap::new(), login_route: login_route.to_string(), landing_route: landing_route.to_string() }
    }

    pub fn with_route(mut self, path: &str, policy: RoutePolicy) -> Self {
        self.routes.insert(path.to_string(), policy);
        self
    }

    pub fn policy_for(&self, path: &str) -> &RoutePolicy {
        self.routes.get(path).unwrap_or(&DEFAULT_POLICY)
    }

    pub fn login_route(&self) -> &str { &self.login_route }
    pub fn landing_route(&self) -> &str { &self.landing_route }

    /// Decide for one navigation. Takes the fresh [`Resolution`] by value so that
    /// decisions can only be made from a server-side resolve.
    pub fn evaluate(&self, path: &str, resolution: Resolution) -> GuardDecision {
        let policy = self.policy_for(path);
        let user = resolution.into_user();
        let state = check_route_allowed(policy, user.as_ref());
        debug!(target: "guard", path, ?state, "route guard");
        match (state, user) {
            (GuardState::Authorized, Some(u)) => GuardDecision::Render(u),
            (GuardState::InsufficientRole, _) => GuardDecision::Redirect { state, location: self.landing_route.clone() },
            _ => GuardDecision::Redirect { state: GuardState::Unauthenticated, location: self.login_route.clone() },
        }
    }
}
