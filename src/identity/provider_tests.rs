use super::*;

#[test]
fn email_shape_precheck() {
    assert_eq!(validate_email("  a@b.com ").unwrap(), "a@b.com");
    for bad in ["", "a@b", "ab.com", "a b@c.com", "a@@b.com", "@b.com"] {
        assert!(validate_email(bad).is_err(), "{bad:?} should be rejected");
    }
}

#[test]
fn login_requires_password() {
    let err = validate_login("a@b.com", "").unwrap_err();
    assert_eq!(err.code_str(), "missing_password");
}

fn form(password: &str, confirm: &str) -> RegisterForm {
    RegisterForm {
        email: "a@b.com".into(),
        password: password.into(),
        confirm_password: confirm.into(),
        display_name: None,
    }
}

#[test]
fn six_character_password_is_accepted() {
    let req = form("secret", "secret").validate().unwrap();
    assert_eq!(req.password, "secret");
    assert_eq!(req.display_name, "");
}

#[test]
fn five_character_password_is_rejected_with_message() {
    let err = form("short", "short").validate().unwrap_err();
    assert_eq!(err.code_str(), "password_too_short");
    assert!(err.message().contains('6'));
}

#[test]
fn mismatched_confirmation_is_rejected() {
    let err = form("secret1", "secret2").validate().unwrap_err();
    assert_eq!(err.code_str(), "password_mismatch");
}

#[test]
fn confirmation_is_not_serialized() {
    let req = form("secret1", "secret1").validate().unwrap();
    let v = serde_json::to_value(&req).unwrap();
    assert_eq!(v, serde_json::json!({"email": "a@b.com", "password": "secret1", "display_name": ""}));
}

#[test]
fn backend_message_extraction_order() {
    assert_eq!(extract_backend_message(r#"{"detail":"wrong password"}"#).as_deref(), Some("wrong password"));
    assert_eq!(extract_backend_message(r#"{"message":"nope"}"#).as_deref(), Some("nope"));
    // FastAPI validation errors put a list under detail
    assert_eq!(extract_backend_message(r#"{"detail":[{"msg":"x"}]}"#), None);
    assert_eq!(extract_backend_message("Internal Server Error").as_deref(), Some("Internal Server Error"));
    assert_eq!(extract_backend_message("   "), None);
}

#[test]
fn classification_by_message_text() {
    let cases = [
        (r#"{"detail":"account not found"}"#, LoginFailureKind::AccountNotFound, Tone::Warning),
        (r#"{"detail":"User does not exist"}"#, LoginFailureKind::AccountNotFound, Tone::Warning),
        (r#"{"detail":"用户不存在或停用"}"#, LoginFailureKind::AccountNotFound, Tone::Warning),
        (r#"{"detail":"密码错误"}"#, LoginFailureKind::BadPassword, Tone::Error),
        (r#"{"detail":"Wrong PASSWORD"}"#, LoginFailureKind::BadPassword, Tone::Error),
        (r#"{"detail":"account disabled"}"#, LoginFailureKind::AccountDisabled, Tone::Warning),
        ("user inactive", LoginFailureKind::AccountDisabled, Tone::Warning),
        (r#"{"detail":"rate limited"}"#, LoginFailureKind::Generic, Tone::Error),
    ];
    for (body, kind, tone) in cases {
        let f = classify_login_error(body);
        assert_eq!(f.kind, kind, "body {body}");
        assert_eq!(f.tone, tone, "body {body}");
    }
}

#[test]
fn generic_failure_surfaces_backend_text() {
    let f = classify_login_error(r#"{"detail":"rate limited"}"#);
    assert_eq!(f.message, "rate limited");
    let f = classify_login_error("");
    assert_eq!(f.kind, LoginFailureKind::Generic);
    assert!(f.message.starts_with("Login failed"));
}

#[test]
fn stable_code_takes_precedence_over_text() {
    // text alone would classify as a password problem
    let f = classify_login_error(r#"{"code":"ACCOUNT_DISABLED","detail":"password locked"}"#);
    assert_eq!(f.kind, LoginFailureKind::AccountDisabled);
    let f = classify_login_error(r#"{"code":"SOMETHING_NEW","detail":"password wrong"}"#);
    assert_eq!(f.kind, LoginFailureKind::BadPassword);
}

#[test]
fn register_duplicate_uses_backend_or_default_message() {
    let f = register_failure(409, r#"{"detail":"account already exists"}"#);
    assert!(f.is_duplicate());
    assert_eq!(f.message, "account already exists");
    let f = register_failure(409, "");
    assert!(f.message.contains("already exists"));
    let f = register_failure(500, "");
    assert_eq!(f.message, "Registration failed (500)");
    assert!(register_failure(422, "{}").is_validation());
}

#[test]
fn failure_tones_and_statuses() {
    let dup = AuthFailure::Register(RegisterFailure { status: Some(409), message: "exists".into() });
    assert_eq!(dup.tone(), Tone::Warning);
    assert_eq!(dup.http_status(), 409);
    assert_eq!(AppError::from(dup).code_str(), "account_exists");

    let busy = AuthFailure::Invalid(AppError::conflict("submit_in_flight", "busy"));
    assert_eq!(busy.tone(), Tone::Neutral);
    assert_eq!(busy.http_status(), 409);

    let down = AuthFailure::Register(RegisterFailure { status: None, message: "down".into() });
    assert_eq!(down.http_status(), 502);
}
