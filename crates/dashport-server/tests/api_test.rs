//! Router-level tests with an in-memory store and a stub identity
//! provider.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use dashport_access::AccessConfig;
use dashport_core::error::{DashportError, DashportResult};
use dashport_core::identity::{
    AuthSession, Identity, IdentityProvider, InviteRequest, InvitedIdentity,
};
use dashport_db::SurrealStore;
use dashport_embed::{EmbedConfig, MetabaseConfig};
use dashport_server::{AppState, router};
use serde_json::{Value, json};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use tower::ServiceExt;
use uuid::Uuid;

/// Accepts tokens registered through [`StubIdentity::session`] and
/// codes registered through [`StubIdentity::code`].
#[derive(Default)]
struct StubIdentity {
    tokens: Mutex<HashMap<String, Identity>>,
    codes: Mutex<HashMap<String, Identity>>,
    magic_links: Mutex<Vec<String>>,
    invites: Mutex<Vec<InviteRequest>>,
}

impl StubIdentity {
    fn session(&self, email: &str) -> (String, Identity) {
        let identity = Identity {
            id: Uuid::new_v4(),
            email: email.into(),
        };
        let token = format!("token-{}", identity.id);
        self.tokens
            .lock()
            .unwrap()
            .insert(token.clone(), identity.clone());
        (token, identity)
    }

    fn code(&self, code: &str, email: &str) -> Identity {
        let identity = Identity {
            id: Uuid::new_v4(),
            email: email.into(),
        };
        self.codes
            .lock()
            .unwrap()
            .insert(code.into(), identity.clone());
        identity
    }
}

impl IdentityProvider for StubIdentity {
    async fn send_magic_link(
        &self,
        email: &str,
        _redirect_to: &str,
        _challenge: &str,
    ) -> DashportResult<()> {
        self.magic_links.lock().unwrap().push(email.into());
        Ok(())
    }

    async fn exchange_code(&self, code: &str, _verifier: &str) -> DashportResult<AuthSession> {
        let user = self
            .codes
            .lock()
            .unwrap()
            .get(code)
            .cloned()
            .ok_or(DashportError::Unauthenticated)?;
        let access_token = format!("token-{}", user.id);
        self.tokens
            .lock()
            .unwrap()
            .insert(access_token.clone(), user.clone());
        Ok(AuthSession {
            access_token,
            refresh_token: None,
            expires_in: Some(3600),
            user,
        })
    }

    async fn get_user(&self, access_token: &str) -> DashportResult<Identity> {
        self.tokens
            .lock()
            .unwrap()
            .get(access_token)
            .cloned()
            .ok_or(DashportError::Unauthenticated)
    }

    async fn invite_user_by_email(
        &self,
        request: InviteRequest,
    ) -> DashportResult<InvitedIdentity> {
        self.invites.lock().unwrap().push(request);
        Ok(InvitedIdentity::default())
    }

    async fn sign_out(&self, access_token: &str) -> DashportResult<()> {
        self.tokens.lock().unwrap().remove(access_token);
        Ok(())
    }
}

struct TestApp {
    app: Router,
    identity: Arc<StubIdentity>,
}

async fn app() -> TestApp {
    let db: Surreal<Db> = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    dashport_db::run_migrations(&db).await.unwrap();

    let identity = Arc::new(StubIdentity::default());
    let embed = EmbedConfig {
        powerbi: None,
        metabase: Some(MetabaseConfig {
            site_url: "https://metabase.example.com".into(),
            secret_key: "secret".into(),
        }),
    };
    let state = AppState::new(
        SurrealStore::new(db),
        Arc::clone(&identity),
        AccessConfig::default(),
        embed,
    );
    TestApp {
        app: router(state),
        identity,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.send(request).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// A signed-in user with a confirmed email.
    async fn user(&self, email: &str) -> (String, Identity) {
        let (token, identity) = self.identity.session(email);
        let (status, _) = self
            .call("POST", "/api/auth/confirm-email", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        (token, identity)
    }

    async fn super_admin(&self, email: &str) -> (String, Identity) {
        let (token, identity) = self.user(email).await;
        let (status, body) = self.call("POST", "/api/admin/bootstrap", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        (token, identity)
    }
}

fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let app = app().await;
    let (status, body) = app.call("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn api_requires_a_session() {
    let app = app().await;
    let (status, body) = app.call("GET", "/api/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    let (status, _) = app.call("GET", "/api/me", Some("forged"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn gate_redirects_pages() {
    let app = app().await;

    let response = app.send(get("/dashboard")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login"));

    let (token, _) = app.identity.session("new@example.com");
    let request = Request::builder()
        .uri("/dashboard")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(location(&response), Some("/auth/confirm-email"));

    let (token, _) = app.user("verified@example.com").await;
    let request = Request::builder()
        .uri("/login")
        .header(header::COOKIE, format!("dashport-access-token={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(location(&response), Some("/dashboard"));
}

#[tokio::test]
async fn session_cookie_authenticates_api_calls() {
    let app = app().await;
    let (token, identity) = app.user("cookie@example.com").await;
    let request = Request::builder()
        .uri("/api/me")
        .header(header::COOKIE, format!("dashport-access-token={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value =
        serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(body["profile"]["id"], identity.id.to_string());
    assert_eq!(body["role"], "user");
    assert_eq!(body["is_group_admin"], false);
}

#[tokio::test]
async fn bootstrap_succeeds_once() {
    let app = app().await;
    let (first, _) = app.super_admin("first@example.com").await;

    let (token, _) = app.user("second@example.com").await;
    let (status, body) = app.call("POST", "/api/admin/bootstrap", Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, body) = app.call("GET", "/api/admin/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "access_denied");

    let (status, body) = app.call("GET", "/api/admin/users", Some(&first), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
}

#[tokio::test]
async fn invitation_round_trip() {
    let app = app().await;
    let (admin, _) = app.super_admin("root@example.com").await;

    let (status, group) = app
        .call("POST", "/api/admin/groups", Some(&admin), Some(json!({ "name": "Finance", "description": "" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, created) = app
        .call(
            "POST",
            "/api/invitations",
            Some(&admin),
            Some(json!({ "email": "Invitee@Example.com", "role": "user", "group_id": group["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    let token = created["token"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 64);
    assert!(created["invitation"].get("token").is_none());
    assert_eq!(app.identity.invites.lock().unwrap().len(), 1);

    let (status, lookup) = app
        .call("GET", &format!("/api/invitations/lookup?token={token}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lookup["status"], "created");
    assert_eq!(lookup["group"]["name"], "Finance");

    let (invitee, _) = app.identity.session("invitee@example.com");
    let (status, report) = app
        .call("POST", "/api/invitations/accept", Some(&invitee), Some(json!({ "token": token })))
        .await;
    assert_eq!(status, StatusCode::OK, "{report}");
    assert!(report["membership_id"].is_string());

    let (status, body) = app
        .call("POST", "/api/invitations/accept", Some(&invitee), Some(json!({ "token": token })))
        .await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["error"], "invalid_invitation");

    let (status, _) = app
        .call("GET", &format!("/api/invitations/lookup?token={token}"), None, None)
        .await;
    assert_eq!(status, StatusCode::GONE);
}

#[tokio::test]
async fn callback_applies_pending_invitation() {
    let app = app().await;
    let (admin, _) = app.super_admin("root@example.com").await;
    let (_, group) = app
        .call("POST", "/api/admin/groups", Some(&admin), Some(json!({ "name": "Ops", "description": "" })))
        .await;
    let (status, _) = app
        .call(
            "POST",
            "/api/invitations",
            Some(&admin),
            Some(json!({ "email": "later@example.com", "role": "group_admin", "group_id": group["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .call("POST", "/auth/login", None, Some(json!({ "email": "later@example.com" })))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    // No verifier cookie: the callback cannot complete.
    let response = app.send(get("/auth/callback?code=abc")).await;
    assert_eq!(location(&response), Some("/login?error=session_expired"));

    let identity = app.identity.code("abc", "later@example.com");
    let request = Request::builder()
        .uri("/auth/callback?code=abc")
        .header(header::COOKIE, "dashport-code-verifier=verifier")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(location(&response), Some("/auth/confirm-email"));
    let cookies: Vec<_> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("dashport-access-token=token-")));

    let token = format!("token-{}", identity.id);
    let (status, me) = app.call("GET", "/api/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "group_admin");
    assert_eq!(me["is_group_admin"], true);
}

#[tokio::test]
async fn embed_requires_membership() {
    let app = app().await;
    let (admin, _) = app.super_admin("root@example.com").await;
    let (_, group) = app
        .call("POST", "/api/admin/groups", Some(&admin), Some(json!({ "name": "Sales", "description": "" })))
        .await;
    let (status, dashboard) = app
        .call(
            "POST",
            "/api/admin/dashboards",
            Some(&admin),
            Some(json!({
                "title": "Pipeline",
                "description": "",
                "group_id": group["id"],
                "dashboard_type": "metabase",
                "powerbi_workspace_id": null,
                "powerbi_report_id": null,
                "metabase_dashboard_id": "12"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{dashboard}");

    let (member, member_identity) = app.user("member@example.com").await;
    let request = json!({ "dashboardId": dashboard["id"] });

    let (status, body) = app
        .call("POST", "/api/metabase/embed-token", Some(&member), Some(request.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "access_denied");

    let (status, _) = app
        .call(
            "POST",
            &format!("/api/admin/groups/{}/members", group["id"].as_str().unwrap()),
            Some(&admin),
            Some(json!({ "user_id": member_identity.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .call("POST", "/api/metabase/embed-token", Some(&member), Some(request))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["token"].is_string());
    assert!(body["expiresAt"].is_i64());

    let (status, visible) = app.call("GET", "/api/dashboards", Some(&member), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(visible.as_array().map(Vec::len), Some(1));

    let (status, body) = app
        .call(
            "GET",
            &format!("/api/dashboards/{}/embed", Uuid::new_v4()),
            Some(&member),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn logout_clears_the_session() {
    let app = app().await;
    let (token, _) = app.user("bye@example.com").await;
    let request = Request::builder()
        .method("POST")
        .uri("/auth/logout")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(location(&response), Some("/login"));

    let (status, _) = app.call("GET", "/api/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
