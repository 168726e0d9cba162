//! Minimal HTML for the server-rendered pages. Markup is intentionally plain; the
//! pages only need to show messages, the resolved identity and the user listing.

use serde_json::Value;

use crate::identity::{Role, Tone, UserIdentity, ADMIN_USERS_ROUTE};

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{} · X Contact</title></head><body>{}</body></html>",
        escape_html(title),
        body
    )
}

fn message_bar(flash: Option<(Tone, &str)>) -> String {
    match flash {
        Some((tone, text)) => format!("<p class=\"msg msg-{}\" aria-live=\"polite\">{}</p>", tone.as_str(), escape_html(text)),
        None => String::new(),
    }
}

pub fn login_page(action: &str, flash: Option<(Tone, &str)>, email: &str) -> String {
    let body = format!(
        "<h1>Welcome back</h1>{msg}\
         <form method=\"post\" action=\"{action}\">\
         <input name=\"email\" type=\"email\" placeholder=\"Enter your email address\" value=\"{email}\" required>\
         <input name=\"password\" type=\"password\" placeholder=\"Enter your password\" required>\
         <button type=\"submit\">Sign In</button></form>\
         <p><a href=\"/auth/google\">Continue with Google</a></p>\
         <p>New to our platform? <a href=\"/register\">Create Account</a></p>",
        msg = message_bar(flash),
        action = escape_html(action),
        email = escape_html(email),
    );
    layout("Sign in", &body)
}

pub fn register_page(flash: Option<(Tone, &str)>, email: &str, name: &str) -> String {
    let body = format!(
        "<h1>Create account</h1>{msg}\
         <form method=\"post\" action=\"/register\">\
         <input name=\"name\" type=\"text\" placeholder=\"Your name\" value=\"{name}\">\
         <input name=\"email\" type=\"email\" placeholder=\"Enter your email address\" value=\"{email}\" required>\
         <input name=\"password\" type=\"password\" placeholder=\"Create a password\" required>\
         <input name=\"confirmPassword\" type=\"password\" placeholder=\"Confirm your password\" required>\
         <button type=\"submit\">Create Account</button></form>\
         <p>Already have an account? <a href=\"/login\">Sign In</a></p>",
        msg = message_bar(flash),
        name = escape_html(name),
        email = escape_html(email),
    );
    layout("Register", &body)
}

fn nav(user: &UserIdentity) -> String {
    let mut links = vec!["<a href=\"/dashboard\">Dashboard</a>".to_string()];
    if user.role.at_least(&Role::Admin) {
        links.push(format!("<a href=\"{}\">Users</a>", ADMIN_USERS_ROUTE));
    }
    links.push("<form method=\"post\" action=\"/logout\"><button type=\"submit\">Logout</button></form>".to_string());
    format!("<nav>{}</nav>", links.join(""))
}

pub fn dashboard_page(user: &UserIdentity) -> String {
    let body = format!(
        "{nav}<h1>Dashboard</h1><p class=\"welcome\">Welcome, {name}</p><p class=\"role\">Role: {role}</p>",
        nav = nav(user),
        name = escape_html(user.display_label()),
        role = escape_html(user.role.as_str()),
    );
    layout("Dashboard", &body)
}

fn cell(row: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| row.get(*k))
        .find(|v| !v.is_null())
        .map(|v| match v {
            Value::String(s) => escape_html(s),
            other => escape_html(&other.to_string()),
        })
        .unwrap_or_default()
}

pub fn admin_users_page(user: &UserIdentity, users: &[Value]) -> String {
    let rows = if users.is_empty() {
        "<tr><td colspan=\"5\">No users</td></tr>".to_string()
    } else {
        users
            .iter()
            .map(|u| {
                format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    cell(u, &["id"]),
                    cell(u, &["email", "username"]),
                    cell(u, &["role"]),
                    cell(u, &["display_name"]),
                    cell(u, &["is_active"]),
                )
            })
            .collect::<Vec<_>>()
            .join("")
    };
    let body = format!(
        "{nav}<h1>Users</h1><table class=\"users\"><thead><tr><th>ID</th><th>Email</th><th>Role</th><th>Name</th><th>Active</th></tr></thead><tbody>{rows}</tbody></table>",
        nav = nav(user),
        rows = rows,
    );
    layout("Users", &body)
}
