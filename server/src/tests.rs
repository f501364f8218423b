use axum::body::Body;
use axum::http::{header, Request};
use common::AdminAction;
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::build_router;
use crate::handlers::AppState;
use crate::mock::{Call, MockPlatformService};

struct TestApp {
    mock: Arc<MockPlatformService>,
    router: axum::Router,
    cookie: Option<String>,
}

struct TestResponse {
    status: u16,
    location: Option<String>,
    body: String,
}

impl TestApp {
    fn new() -> Self {
        Self::with_base("/")
    }

    fn with_base(base: &str) -> Self {
        let mock = Arc::new(MockPlatformService::new());
        let session_layer = SessionManagerLayer::new(MemoryStore::default())
            .with_expiry(Expiry::OnInactivity(time::Duration::seconds(3600)));
        let state = AppState::new(mock.clone(), base.to_string());
        Self {
            mock,
            router: build_router(state).layer(session_layer),
            cookie: None,
        }
    }

    async fn send(&mut self, req: axum::http::request::Builder, body: Body) -> TestResponse {
        let req = match &self.cookie {
            Some(cookie) => req.header(header::COOKIE, cookie),
            None => req,
        };
        let resp = self
            .router
            .clone()
            .oneshot(req.body(body).unwrap())
            .await
            .unwrap();
        if let Some(set_cookie) = resp.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }
        let status = resp.status().as_u16();
        let location = resp
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        TestResponse {
            status,
            location,
            body: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }

    async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Request::builder().uri(uri), Body::empty()).await
    }

    async fn post(&mut self, uri: &str, form: &str) -> TestResponse {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded"),
            Body::from(form.to_string()),
        )
        .await
    }

    async fn login_as(&mut self, id: &str) {
        let resp = self
            .post("/login", &format!("email={}%40example.com&password=pw", id))
            .await;
        assert!(is_redirect(resp.status));
        assert_eq!(resp.location.as_deref(), Some("/dashboard"));
    }
}

fn is_redirect(status: u16) -> bool {
    status == 303 || status == 302 || status == 307
}

#[tokio::test]
async fn root_redirects_to_dashboard() {
    let mut app = TestApp::new();
    let resp = app.get("/").await;
    assert!(is_redirect(resp.status));
    assert_eq!(resp.location.as_deref(), Some("/dashboard"));
}

#[tokio::test]
async fn unauthenticated_dashboard_redirects_to_login() {
    let mut app = TestApp::new();
    let resp = app.get("/dashboard").await;
    assert!(is_redirect(resp.status));
    assert_eq!(resp.location.as_deref(), Some("/login"));
}

#[tokio::test]
async fn unauthenticated_admin_redirects_without_fetching() {
    let mut app = TestApp::new();
    let resp = app.get("/admin").await;
    assert!(is_redirect(resp.status));
    assert_eq!(resp.location.as_deref(), Some("/login"));

    let resp = app.post("/admin/api-keys", "service=openai&api_key=sk").await;
    assert_eq!(resp.location.as_deref(), Some("/login"));
    assert_eq!(app.mock.admin_calls(), 0);
}

#[tokio::test]
async fn login_page_renders_form() {
    let mut app = TestApp::new();
    let resp = app.get("/login").await;
    assert_eq!(resp.status, 200);
    assert!(resp.body.contains(r#"name="password""#));
}

#[tokio::test]
async fn bad_login_shows_error_toast() {
    let mut app = TestApp::new();
    let resp = app
        .post("/login", "email=mallory%40example.com&password=pw")
        .await;
    assert_eq!(resp.status, 200);
    assert!(resp.body.contains("toast-error"));
    assert!(resp.body.contains("Invalid login credentials"));
    assert!(resp.body.contains(r#"value="mallory@example.com""#));
}

#[tokio::test]
async fn dashboard_fetches_history_on_mount() {
    let mut app = TestApp::new();
    app.login_as("user").await;
    let resp = app.get("/dashboard?tab=image").await;
    assert_eq!(resp.status, 200);
    assert!(resp.body.contains("5 Credits"));
    assert!(resp.body.contains("Image Generation"));
    assert!(resp.body.contains("first"));
    assert!(!resp.body.contains(r#"href="/admin""#));
    assert_eq!(
        app.mock.count(|c| matches!(c, Call::RecentGenerations(10))),
        1
    );
}

#[tokio::test]
async fn blank_prompt_is_rejected_with_toast() {
    let mut app = TestApp::new();
    app.login_as("user").await;
    let resp = app.post("/dashboard/generate", "tab=text&prompt=+++").await;
    assert_eq!(resp.status, 200);
    assert!(resp.body.contains("Please enter a prompt"));
    assert_eq!(app.mock.generate_calls(), 0);
}

#[tokio::test]
async fn out_of_credits_is_rejected_with_toast() {
    let mut app = TestApp::new();
    app.login_as("broke").await;
    let resp = app.post("/dashboard/generate", "tab=audio&prompt=hi").await;
    assert!(resp
        .body
        .contains("Insufficient credits. Please purchase more."));
    assert_eq!(app.mock.generate_calls(), 0);
}

#[tokio::test]
async fn generation_updates_credits_and_feed() {
    let mut app = TestApp::new();
    app.login_as("user").await;
    let resp = app
        .post("/dashboard/generate", "tab=text&prompt=tell+a+joke")
        .await;
    assert_eq!(resp.status, 200);
    assert!(resp.body.contains("Generation completed!"));
    assert!(resp.body.contains("generated"));
    assert!(resp.body.contains("3 Credits"));
    assert!(resp.body.contains("tell a joke"));
    assert_eq!(app.mock.generate_calls(), 1);

    let resp = app.get("/dashboard").await;
    assert!(resp.body.contains("3 Credits"));
    assert!(!resp.body.contains("Generation completed!"));
}

#[tokio::test]
async fn dashboard_rereads_profile_after_top_up() {
    let mut app = TestApp::new();
    app.login_as("broke").await;
    app.mock.profiles.lock().unwrap()[2].credits = 50;

    let resp = app.get("/dashboard").await;
    assert!(resp.body.contains("50 Credits"));

    let resp = app.post("/dashboard/generate", "tab=text&prompt=hello").await;
    assert!(resp.body.contains("Generation completed!"));
    assert_eq!(app.mock.generate_calls(), 1);
}

#[tokio::test]
async fn dashboard_keeps_cached_profile_when_reread_fails() {
    let mut app = TestApp::new();
    app.login_as("user").await;
    app.mock.profiles.lock().unwrap()[1].credits = 40;
    *app.mock.fail_profile.lock().unwrap() = true;

    let resp = app.get("/dashboard").await;
    assert_eq!(resp.status, 200);
    assert!(resp.body.contains("5 Credits"));
    assert!(!resp.body.contains("40 Credits"));
}

#[tokio::test]
async fn demoted_admin_loses_access() {
    let mut app = TestApp::new();
    app.login_as("admin").await;
    app.mock.profiles.lock().unwrap()[0].role = Some("user".to_string());

    let resp = app.get("/admin").await;
    assert_eq!(resp.location.as_deref(), Some("/dashboard"));
    assert_eq!(app.mock.admin_calls(), 0);
}

#[tokio::test]
async fn non_admin_is_bounced_from_admin() {
    let mut app = TestApp::new();
    app.login_as("user").await;
    let resp = app.get("/admin?tab=users").await;
    assert!(is_redirect(resp.status));
    assert_eq!(resp.location.as_deref(), Some("/dashboard"));
    assert_eq!(app.mock.admin_calls(), 0);

    let resp = app.get("/dashboard").await;
    assert!(resp.body.contains("Access denied"));
}

#[tokio::test]
async fn admin_panel_shows_stats() {
    let mut app = TestApp::new();
    app.login_as("admin").await;
    let resp = app.get("/admin").await;
    assert_eq!(resp.status, 200);
    assert!(resp.body.contains("Admin Panel"));
    assert!(resp.body.contains("Total Users"));
    assert!(resp.body.contains("$123.45"));

    app.get("/admin?tab=stats").await;
    assert_eq!(
        app.mock
            .count(|c| matches!(c, Call::Admin(AdminAction::GetStats))),
        1
    );

    let resp = app.post("/admin/refresh", "tab=stats").await;
    assert_eq!(resp.location.as_deref(), Some("/admin?tab=stats"));
    assert_eq!(
        app.mock
            .count(|c| matches!(c, Call::Admin(AdminAction::GetStats))),
        2
    );
}

#[tokio::test]
async fn admin_credit_adjustment_flow() {
    let mut app = TestApp::new();
    app.login_as("admin").await;
    let resp = app.get("/admin?tab=users").await;
    assert!(resp.body.contains("u1..."));

    let resp = app.post("/admin/users/u1/edit", "").await;
    assert_eq!(resp.location.as_deref(), Some("/admin?tab=users"));
    let resp = app.get("/admin?tab=users").await;
    assert!(resp.body.contains("Current Credits: 10"));

    let resp = app.post("/admin/users/credits", "credits=50").await;
    assert_eq!(resp.location.as_deref(), Some("/admin?tab=users"));
    assert!(app
        .mock
        .calls()
        .contains(&Call::Admin(AdminAction::UpdateUserCredits {
            user_id: "u1".to_string(),
            credits: 50,
            reason: "Admin adjustment".to_string(),
        })));

    let resp = app.get("/admin?tab=users").await;
    assert!(resp.body.contains("Credits updated successfully"));
    assert!(!resp.body.contains("Update User Credits"));
    assert!(resp.body.contains(">50<"));
    assert_eq!(
        app.mock
            .count(|c| matches!(c, Call::Admin(AdminAction::GetUsers { .. }))),
        2
    );
}

#[tokio::test]
async fn admin_cancel_closes_editor() {
    let mut app = TestApp::new();
    app.login_as("admin").await;
    app.get("/admin?tab=users").await;
    app.post("/admin/users/u1/edit", "").await;
    app.post("/admin/users/cancel", "").await;
    let resp = app.get("/admin?tab=users").await;
    assert!(!resp.body.contains("Update User Credits"));
}

#[tokio::test]
async fn admin_empty_api_key_is_blocked() {
    let mut app = TestApp::new();
    app.login_as("admin").await;
    let resp = app.post("/admin/api-keys", "service=openai&api_key=").await;
    assert_eq!(resp.location.as_deref(), Some("/admin?tab=api-keys"));
    assert_eq!(
        app.mock.count(
            |c| matches!(c, Call::Admin(AdminAction::UpsertApiKey { .. }))
        ),
        0
    );
    let resp = app.get("/admin?tab=api-keys").await;
    assert!(resp.body.contains("Please enter an API key"));
}

#[tokio::test]
async fn admin_api_key_upsert_never_echoes_key() {
    let mut app = TestApp::new();
    app.login_as("admin").await;
    app.post("/admin/api-keys", "service=stability&api_key=sk-very-secret")
        .await;
    let resp = app.get("/admin?tab=api-keys").await;
    assert!(resp.body.contains("stability API key updated"));
    assert!(resp.body.contains("Active (Last used: 2024-02-01)"));
    assert!(!resp.body.contains("sk-very-secret"));
}

#[tokio::test]
async fn logout_clears_session() {
    let mut app = TestApp::new();
    app.login_as("user").await;
    let resp = app.get("/logout").await;
    assert_eq!(resp.location.as_deref(), Some("/login"));
    assert!(app.mock.calls().contains(&Call::SignOut));
    let resp = app.get("/dashboard").await;
    assert_eq!(resp.location.as_deref(), Some("/login"));
}

#[tokio::test]
async fn nonexistent_route_returns_404() {
    let mut app = TestApp::new();
    let resp = app.get("/nonexistent").await;
    assert_eq!(resp.status, 404);
}

#[tokio::test]
async fn nested_base_path_prefixes_redirects() {
    let mut app = TestApp::with_base("/_app");
    let resp = app.get("/_app/dashboard").await;
    assert!(is_redirect(resp.status));
    assert_eq!(resp.location.as_deref(), Some("/_app/login"));

    let resp = app.get("/dashboard").await;
    assert_eq!(resp.status, 404);
}
