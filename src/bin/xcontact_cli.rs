//!
//! xcontact CLI binary
//! -------------------
//! Command-line client for the auth endpoints of the X Contact backend. Keeps the
//! display profile and the session cookie under the profile directory between runs.

use std::env;

use anyhow::{anyhow, Result};

use xcontact::config::{has_flag, FrontendConfig};
use xcontact::gateway::ApiGateway;
use xcontact::identity::{
    AuthClient, DisplayProfile, FileProfileStore, IdentityResolver, ProfileCache, ProfileStore, RegisterForm,
    Resolution, SessionToken, SESSION_COOKIE,
};

const SESSION_KEY: &str = "xcontact:session";

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} login <email> <password>\n  {program} register <email> <password> <confirm> [display name]\n  {program} whoami [--remote]\n  {program} logout\n\nFlags:\n  --api-base <url>     Backend base URL (env: XCONTACT_API_BASE)\n  --timeout-ms <n>     Request timeout in milliseconds (env: XCONTACT_TIMEOUT_MS)\n  -h, --help           Show this help\n\nState is kept under $XCONTACT_HOME (default ~/.xcontact)."
    );
}

/// `session=<value>` out of a relayed `Set-Cookie` header.
fn session_from_set_cookie(set_cookies: &[String]) -> Option<SessionToken> {
    set_cookies.iter().find_map(|c| {
        let pair = c.split(';').next()?.trim();
        let (name, value) = pair.split_once('=')?;
        if name.trim() == SESSION_COOKIE { SessionToken::new(value.trim()) } else { None }
    })
}

fn saved_session(store: &FileProfileStore) -> Option<SessionToken> {
    store.get(SESSION_KEY).ok().flatten().and_then(SessionToken::new)
}

/// Positional arguments with `--flag value` pairs and bare flags removed.
fn positionals(args: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut i = 1;
    while i < args.len() {
        let a = &args[i];
        if a == "--api-base" || a == "--timeout-ms" || a == "--http-port" {
            i += 2;
            continue;
        }
        if !a.starts_with("--") { out.push(a.clone()); }
        i += 1;
    }
    out
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().cloned().unwrap_or_else(|| "xcontact_cli".to_string());
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        print_usage(&program);
        return Ok(());
    }

    let cfg = FrontendConfig::from_env().with_args(&args);
    let gateway = ApiGateway::with_cookie_jar(&cfg.api_base, cfg.request_timeout)?;
    let auth = AuthClient::new(gateway.clone());
    let cache = ProfileCache::new(FileProfileStore::new(&cfg.profile_dir));
    let store = FileProfileStore::new(&cfg.profile_dir);

    let pos = positionals(&args);
    match pos.first().map(String::as_str) {
        Some("login") => {
            let (email, password) = match (pos.get(1), pos.get(2)) {
                (Some(e), Some(p)) => (e, p),
                _ => {
                    print_usage(&program);
                    return Err(anyhow!("login needs <email> <password>"));
                }
            };
            let outcome = auth.login_by_email(email, password).await.map_err(|f| anyhow!("[{}] {}", f.tone().as_str(), f.message()))?;
            if let Some(token) = session_from_set_cookie(&outcome.set_cookies) {
                store.set(SESSION_KEY, token.as_str())?;
            }
            let profile = match &outcome.user {
                Some(user) => DisplayProfile::from(user),
                None => DisplayProfile { email: Some(email.trim().to_string()), ..DisplayProfile::guest() },
            };
            cache.store(Some(&profile));
            println!("Signed in as {}", profile.display_name());
        }
        Some("register") => {
            let (email, password, confirm) = match (pos.get(1), pos.get(2), pos.get(3)) {
                (Some(e), Some(p), Some(c)) => (e, p, c),
                _ => {
                    print_usage(&program);
                    return Err(anyhow!("register needs <email> <password> <confirm>"));
                }
            };
            let form = RegisterForm {
                email: email.clone(),
                password: password.clone(),
                confirm_password: confirm.clone(),
                display_name: pos.get(4).cloned(),
            };
            auth.register_by_email(&form).await.map_err(|f| anyhow!("[{}] {}", f.tone().as_str(), f.message()))?;
            println!("Account created. Sign in with `{} login {} <password>`.", program, email.trim());
        }
        Some("whoami") => {
            if has_flag(&args, "--remote") {
                let resolver = IdentityResolver::new(gateway);
                match resolver.resolve(saved_session(&store).as_ref()).await {
                    Resolution::Resolved(user) => {
                        cache.store(Some(&DisplayProfile::from(&user)));
                        println!("{} ({})", user.display_label(), user.role);
                    }
                    Resolution::Anonymous => println!("Not signed in"),
                    Resolution::FailedOpen { reason } => println!("Not signed in (backend: {})", reason),
                }
            } else {
                println!("{}", cache.load().display_name());
            }
        }
        Some("logout") => {
            auth.logout(saved_session(&store).as_ref()).await;
            store.remove(SESSION_KEY)?;
            cache.clear();
            println!("Signed out");
        }
        _ => {
            print_usage(&program);
            return Err(anyhow!("missing or unknown command"));
        }
    }
    Ok(())
}
