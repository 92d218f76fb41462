use super::*;
use crate::application_impl::token_codec_jwt::tests::test_config;
use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::server::Server;
use crate::settings::Environment;
use chrono::{Duration as ChronoDuration, Utc};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use warp::http::StatusCode;
use warp::http::header::SET_COOKIE;
use warp::http::response::Response;
use warp::hyper::body::Bytes;

const PASSWORD: &str = "Sup3r-Secret-Pass!";

struct TestApp {
    server: Arc<Server>,
    repo: Arc<MemoryCredentialRepo>,
    store: Arc<MemoryAuthSessionStore>,
    codec: Arc<JwtHs256Codec>,
    hasher: Arc<Argon2PasswordHasher>,
}

impl TestApp {
    fn new() -> Self {
        let repo = Arc::new(MemoryCredentialRepo::new());
        let store = Arc::new(MemoryAuthSessionStore::new());
        let codec = Arc::new(JwtHs256Codec::new(test_config()));
        let hasher = Arc::new(Argon2PasswordHasher::with_params(8 * 1024, 1, 1).unwrap());
        let auth_service = Arc::new(RealAuthService::new(
            repo.clone(),
            hasher.clone(),
            codec.clone(),
            store.clone(),
        ));
        let settings_service = Arc::new(CachedSettingsService::new(
            Arc::new(MemorySettingsStore::new()),
            Duration::from_secs(30),
        ));
        let cfg = codec.config();
        let cookie_policy = Arc::new(CookiePolicy::new(&CookieConfig {
            domain: Some("localhost"),
            environment: Environment::Development,
            access_ttl: cfg.access_ttl,
            refresh_ttl: cfg.refresh_ttl,
        }));
        let server = Arc::new(Server::new(auth_service, settings_service, cookie_policy));
        Self {
            server,
            repo,
            store,
            codec,
            hasher,
        }
    }

    async fn add_user(&self, email: &str, role: &str) -> CredentialRecord {
        let password_hash = self.hasher.hash_password(PASSWORD).await.unwrap();
        self.repo
            .create(NewCredential {
                user_id: UserId::new(),
                email: email.to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                password_hash,
                role_name: RoleName(role.to_string()),
            })
            .await
            .unwrap()
    }

    async fn send(&self, request: warp::test::RequestBuilder) -> Response<Bytes> {
        request.reply(&api(self.server.clone())).await
    }

    /// Logs in and returns `(access, refresh)` cookie values.
    async fn login(&self, email: &str) -> (String, String) {
        let resp = self
            .send(
                warp::test::request()
                    .method("POST")
                    .path("/api/v1/auth/login")
                    .json(&json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        (
            cookie_value(&resp, ACCESS_TOKEN_COOKIE).unwrap(),
            cookie_value(&resp, REFRESH_TOKEN_COOKIE).unwrap(),
        )
    }
}

fn set_cookies(resp: &Response<Bytes>) -> Vec<String> {
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

fn cookie_value(resp: &Response<Bytes>, name: &str) -> Option<String> {
    set_cookies(resp).into_iter().find_map(|c| {
        let (pair, _) = c.split_once(';')?;
        let (n, v) = pair.split_once('=')?;
        (n == name).then(|| v.to_string())
    })
}

fn body(resp: &Response<Bytes>) -> Value {
    serde_json::from_slice(resp.body()).unwrap()
}

fn error_code(resp: &Response<Bytes>) -> String {
    body(resp)["error"]["code"].as_str().unwrap().to_string()
}

fn with_cookie(name: &str, value: &str) -> (&'static str, String) {
    ("cookie", format!("{name}={value}"))
}

fn me(access: &str) -> warp::test::RequestBuilder {
    let (k, v) = with_cookie(ACCESS_TOKEN_COOKIE, access);
    warp::test::request()
        .method("GET")
        .path("/api/v1/auth/me")
        .header(k, v)
}

fn refresh(refresh: &str) -> warp::test::RequestBuilder {
    let (k, v) = with_cookie(REFRESH_TOKEN_COOKIE, refresh);
    warp::test::request()
        .method("POST")
        .path("/api/v1/auth/refresh")
        .header(k, v)
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();
    let resp = app
        .send(warp::test::request().method("GET").path("/api/v1/health"))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body(&resp)["data"]["status"], "ok");
}

#[tokio::test]
async fn login_sets_both_cookies() {
    let app = TestApp::new();
    app.add_user("reader@example.org", "reader").await;

    let resp = app
        .send(
            warp::test::request()
                .method("POST")
                .path("/api/v1/auth/login")
                .header("user-agent", "integration-test")
                .json(&json!({ "email": "Reader@Example.org ", "password": PASSWORD })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cookies = set_cookies(&resp);
    assert_eq!(cookies.len(), 2);
    for cookie in &cookies {
        assert!(cookie.contains("HttpOnly"), "{cookie}");
        assert!(cookie.contains("SameSite=Strict"), "{cookie}");
        assert!(cookie.contains("Path=/"), "{cookie}");
        assert!(!cookie.contains("Domain="), "{cookie}");
        assert!(!cookie.contains("Secure"), "{cookie}");
    }
    assert!(cookies[0].starts_with("access-token-cookie="));
    assert!(cookies[0].contains("Max-Age=900"));
    assert!(cookies[1].starts_with("refresh-token-cookie="));
    assert!(cookies[1].contains("Max-Age=604800"));

    let body = body(&resp);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["email"], "reader@example.org");
    assert!(body["data"].get("access_token").is_none());
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let app = TestApp::new();
    app.add_user("reader@example.org", "reader").await;

    let resp = app
        .send(
            warp::test::request()
                .method("POST")
                .path("/api/v1/auth/login")
                .json(&json!({ "email": "reader@example.org", "password": "Wrong-Password-1" })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&resp), "InvalidCredentials");
    assert!(set_cookies(&resp).is_empty());
}

#[tokio::test]
async fn inactive_account_is_forbidden() {
    let app = TestApp::new();
    let rec = app.add_user("gone@example.org", "reader").await;
    app.repo.set_status(rec.user_id, UserStatus::Inactive).unwrap();

    let resp = app
        .send(
            warp::test::request()
                .method("POST")
                .path("/api/v1/auth/login")
                .json(&json!({ "email": "gone@example.org", "password": PASSWORD })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(&resp), "AccountInactive");
}

#[tokio::test]
async fn me_accepts_cookie_or_bearer() {
    let app = TestApp::new();
    app.add_user("editor@example.org", "editor").await;
    let (access, _) = app.login("editor@example.org").await;

    let resp = app.send(me(&access)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body(&resp)["data"]["user"]["role_name"], "editor");

    let resp = app
        .send(
            warp::test::request()
                .method("GET")
                .path("/api/v1/auth/me")
                .header("authorization", format!("Bearer {access}")),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_or_bad_tokens_are_unauthenticated() {
    let app = TestApp::new();
    let rec = app.add_user("editor@example.org", "editor").await;

    let resp = app
        .send(warp::test::request().method("GET").path("/api/v1/auth/me"))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&resp), "Unauthenticated");

    let resp = app.send(me("not-a-jwt")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let (expired, _) = app
        .codec
        .issue_access_token_at(&rec.access_claims(), Utc::now() - ChronoDuration::hours(1))
        .unwrap();
    let resp = app.send(me(&expired.0)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&resp), "Unauthenticated");
}

#[tokio::test]
async fn refresh_token_is_not_an_access_token() {
    let app = TestApp::new();
    app.add_user("editor@example.org", "editor").await;
    let (_, refresh_token) = app.login("editor@example.org").await;

    let resp = app.send(me(&refresh_token)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_rotates_and_detects_reuse() {
    let app = TestApp::new();
    let rec = app.add_user("editor@example.org", "editor").await;
    let (_, first) = app.login("editor@example.org").await;

    let resp = app.send(refresh(&first)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let second = cookie_value(&resp, REFRESH_TOKEN_COOKIE).unwrap();
    let access = cookie_value(&resp, ACCESS_TOKEN_COOKIE).unwrap();
    assert_ne!(first, second);
    assert_eq!(app.send(me(&access)).await.status(), StatusCode::OK);

    // replaying the old token revokes the whole session
    let resp = app.send(refresh(&first)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.active_sessions(rec.user_id), 0);

    let resp = app.send(refresh(&second)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_without_cookie_is_unauthenticated() {
    let app = TestApp::new();
    let resp = app
        .send(warp::test::request().method("POST").path("/api/v1/auth/refresh"))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_clears_cookies_and_revokes() {
    let app = TestApp::new();
    let rec = app.add_user("editor@example.org", "editor").await;
    let (_, refresh_token) = app.login("editor@example.org").await;

    let (k, v) = with_cookie(REFRESH_TOKEN_COOKIE, &refresh_token);
    let resp = app
        .send(
            warp::test::request()
                .method("POST")
                .path("/api/v1/auth/logout")
                .header(k, v),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let cookies = set_cookies(&resp);
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
    assert_eq!(cookie_value(&resp, ACCESS_TOKEN_COOKIE).as_deref(), Some(""));
    assert_eq!(app.store.active_sessions(rec.user_id), 0);

    assert_eq!(
        app.send(refresh(&refresh_token)).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn logout_without_session_still_clears_cookies() {
    let app = TestApp::new();
    let resp = app
        .send(warp::test::request().method("POST").path("/api/v1/auth/logout"))
        .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(set_cookies(&resp).len(), 2);
}

#[tokio::test]
async fn change_password_revokes_every_session() {
    let app = TestApp::new();
    let rec = app.add_user("editor@example.org", "editor").await;
    let (access, refresh_a) = app.login("editor@example.org").await;
    let (_, refresh_b) = app.login("editor@example.org").await;
    assert_eq!(app.store.active_sessions(rec.user_id), 2);

    let resp = app
        .send(
            me(&access)
                .method("PATCH")
                .path("/api/v1/auth/password")
                .json(&json!({
                    "current_password": PASSWORD,
                    "new_password": "An0ther-Secret-Pass!",
                })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(set_cookies(&resp).len(), 2);
    assert_eq!(app.store.active_sessions(rec.user_id), 0);
    for token in [refresh_a, refresh_b] {
        assert_eq!(app.send(refresh(&token)).await.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn change_password_enforces_policy() {
    let app = TestApp::new();
    app.add_user("editor@example.org", "editor").await;
    let (access, _) = app.login("editor@example.org").await;

    let resp = app
        .send(
            me(&access)
                .method("PATCH")
                .path("/api/v1/auth/password")
                .json(&json!({ "current_password": PASSWORD, "new_password": "short" })),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&resp), "WeakPassword");
}

fn register_request(access: &str, email: &str) -> warp::test::RequestBuilder {
    me(access)
        .method("POST")
        .path("/api/v1/auth/register")
        .json(&json!({
            "email": email,
            "password": "N3w-User-Password!",
            "first_name": "New",
            "last_name": "User",
            "role": "editor",
        }))
}

#[tokio::test]
async fn register_requires_users_write() {
    let app = TestApp::new();
    app.add_user("reader@example.org", "reader").await;
    app.add_user("admin@example.org", "admin").await;

    let (reader, _) = app.login("reader@example.org").await;
    let resp = app.send(register_request(&reader, "new@example.org")).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(&resp), "Forbidden");

    let (admin, _) = app.login("admin@example.org").await;
    let resp = app.send(register_request(&admin, "new@example.org")).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(body(&resp)["data"]["role_name"], "editor");

    let resp = app.send(register_request(&admin, "NEW@example.org")).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

fn set_maintenance(access: &str, enabled: bool) -> warp::test::RequestBuilder {
    me(access)
        .method("PUT")
        .path("/api/v1/settings/maintenance")
        .json(&json!({
            "maintenance_enabled": enabled,
            "maintenance_message": "Back at noon",
            "maintenance_scheduled_at": null,
        }))
}

#[tokio::test]
async fn maintenance_blocks_everyone_but_admins() {
    let app = TestApp::new();
    app.add_user("reader@example.org", "reader").await;
    app.add_user("admin@example.org", "admin").await;
    let (reader, _) = app.login("reader@example.org").await;
    let (admin, _) = app.login("admin@example.org").await;

    let resp = app.send(set_maintenance(&reader, true)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app.send(set_maintenance(&admin, true)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body(&resp)["data"]["maintenance_enabled"], true);

    let resp = app.send(me(&reader)).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let blocked = body(&resp);
    assert_eq!(blocked["error"]["code"], "MaintenanceBlocked");
    assert_eq!(blocked["data"]["message"], "Back at noon");
    assert_eq!(blocked["data"]["maintenance_scheduled_at"], Value::Null);

    assert_eq!(app.send(me(&admin)).await.status(), StatusCode::OK);

    let resp = app
        .send(
            warp::test::request()
                .method("GET")
                .path("/api/v1/settings/maintenance"),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body(&resp)["data"]["maintenance_enabled"], true);

    // login is not gated so users can still get a session
    app.login("reader@example.org").await;

    let resp = app.send(set_maintenance(&admin, false)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(app.send(me(&reader)).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn unauthenticated_beats_maintenance() {
    let app = TestApp::new();
    app.add_user("admin@example.org", "admin").await;
    let (admin, _) = app.login("admin@example.org").await;
    app.send(set_maintenance(&admin, true)).await;

    let resp = app
        .send(warp::test::request().method("GET").path("/api/v1/auth/me"))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn routing_failures_map_to_statuses() {
    let app = TestApp::new();

    let resp = app
        .send(warp::test::request().method("GET").path("/api/v1/nowhere"))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_code(&resp), "NotFound");

    let resp = app
        .send(warp::test::request().method("DELETE").path("/api/v1/auth/login"))
        .await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

    let resp = app
        .send(
            warp::test::request()
                .method("POST")
                .path("/api/v1/auth/login")
                .header("content-type", "application/json")
                .body("{\"email\": 42"),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&resp), "BadRequest");
}
