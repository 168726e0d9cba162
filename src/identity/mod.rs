//! Session-based authentication and authorization boundary for the dashboard.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod session;
mod provider;
mod resolver;
mod authorizer;
mod display;
mod submit;

pub use principal::{Role, UserId, UserIdentity};
pub use session::{SessionToken, SESSION_COOKIE, parse_cookie, session_from_headers, clear_session_cookie};
pub use provider::{
    AuthClient, AuthFailure, LoginFailure, LoginFailureKind, LoginOutcome, LoginRequest, RegisterFailure,
    RegisterForm, RegisterRequest, Tone, GOOGLE_UNAVAILABLE, MIN_PASSWORD_LEN, classify_login_error,
    extract_backend_message, validate_email, validate_login,
};
pub use resolver::{IdentityResolver, Resolution};
pub use authorizer::{
    GuardDecision, GuardState, RoutePolicy, RouteTable, check_route_allowed, ADMIN_USERS_ROUTE, LANDING_ROUTE,
    LOGIN_ROUTE,
};
pub use display::{DisplayProfile, FileProfileStore, MemoryProfileStore, ProfileCache, ProfileStore, GUEST_NAME, PROFILE_KEY};
pub use submit::{SubmitGuard, SubmitGuards, SubmitState, SubmitTicket};
