use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use teamflow_api::app::services::{AppServices, IdentityError, IdentityProvider};
use teamflow_auth::{JwtClaims, RoleName};
use teamflow_core::{UserId, WorkspaceId};
use teamflow_infra::services::bootstrap::OAuthProfile;
use teamflow_infra::{InMemoryStore, Store, StoreTx};
use teamflow_projects::SequentialTaskCodes;
use teamflow_workspaces::{Member, Provider};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    store: InMemoryStore,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(|services| services).await
    }

    async fn spawn_with(configure: impl FnOnce(AppServices) -> AppServices) -> Self {
        // Same router as prod, in-memory store, ephemeral port.
        let store = InMemoryStore::with_default_roles();
        let services = AppServices::new(
            Arc::new(store.clone()),
            JWT_SECRET,
            ChronoDuration::minutes(30),
        )
        .with_task_codes(Arc::new(SequentialTaskCodes::starting_at(1)));
        let app = teamflow_api::app::router(Arc::new(configure(services)), "/api");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            store,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn get(&self, token: &str, path: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        read(res).await
    }

    async fn send(
        &self,
        method: reqwest::Method,
        token: &str,
        path: &str,
        body: Value,
    ) -> (StatusCode, Value) {
        let res = self
            .client
            .request(method, self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        read(res).await
    }

    async fn post(&self, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::POST, token, path, body).await
    }

    /// Register + log in; returns (token, user id, default workspace id).
    async fn sign_up(&self, email: &str) -> (String, String, String) {
        let res = self
            .client
            .post(self.url("/auth/register"))
            .json(&json!({ "name": "Test User", "email": email, "password": "correct-horse" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);

        let (status, body) = self.login(email, "correct-horse").await;
        assert_eq!(status, StatusCode::OK, "{body}");

        let token = body["accessToken"].as_str().unwrap().to_string();
        let user_id = body["user"]["id"].as_str().unwrap().to_string();
        let workspace_id = body["user"]["currentWorkspace"].as_str().unwrap().to_string();
        (token, user_id, workspace_id)
    }

    async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        read(res).await
    }

    /// Add `user_id` to `workspace_id` with `role`, bypassing the HTTP surface.
    async fn add_member(&self, user_id: &str, workspace_id: &str, role: RoleName) {
        let mut tx = self.store.begin().await.unwrap();
        let role = tx.find_role_by_name(role).await.unwrap().unwrap();
        tx.insert_member(&Member::join(
            user_id.parse().unwrap(),
            workspace_id.parse().unwrap(),
            role.id,
            Utc::now(),
        ))
        .await
        .unwrap();
        tx.commit().await.unwrap();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn read(res: reqwest::Response) -> (StatusCode, Value) {
    let status = res.status();
    let body = res.json().await.unwrap_or(Value::Null);
    (status, body)
}

fn mint_jwt(jwt_secret: &str, sub: UserId, ttl: ChronoDuration) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub,
        issued_at: now - ChronoDuration::seconds(1),
        expires_at: now + ttl,
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

struct StubGoogle {
    provider_id: &'static str,
}

#[async_trait]
impl IdentityProvider for StubGoogle {
    async fn exchange(&self, code: &str) -> Result<OAuthProfile, IdentityError> {
        if code == "bad-code" {
            return Err(IdentityError::Rejected("invalid_grant".into()));
        }
        Ok(OAuthProfile {
            provider: Provider::Google,
            provider_id: self.provider_id.to_string(),
            display_name: "Grace Hopper".into(),
            picture: Some("https://img.example.com/grace.png".into()),
            email: Some("grace@example.com".into()),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_is_public_and_protected_routes_need_a_token() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.client.get(srv.url("/user/current")).send().await.unwrap();
    let (status, body) = read(res).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errorCode"], "ACCESS_UNAUTHORIZED");

    let (status, _) = srv.get("not-a-jwt", "/user/current").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_login_and_current_user() {
    let srv = TestServer::spawn().await;
    let (token, user_id, workspace_id) = srv.sign_up("ada@example.com").await;

    let (status, body) = srv.get(&token, "/user/current").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], user_id.as_str());
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["currentWorkspace"], workspace_id.as_str());
    assert!(body["user"].get("passwordHash").is_none());

    let (status, body) = srv.get(&token, "/workspace/all").await;
    assert_eq!(status, StatusCode::OK);
    let workspaces = body["workspaces"].as_array().unwrap();
    assert_eq!(workspaces.len(), 1);
    assert_eq!(workspaces[0]["name"], "My Workspace");
}

#[tokio::test]
async fn bad_credentials_and_duplicate_email() {
    let srv = TestServer::spawn().await;
    srv.sign_up("ada@example.com").await;

    let (status, body) = srv.login("ada@example.com", "wrong-password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");

    let (status, _) = srv.login("nobody@example.com", "whatever-pass").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let res = srv
        .client
        .post(srv.url("/auth/register"))
        .json(&json!({ "name": "Ada", "email": "ADA@example.com", "password": "another-pass" }))
        .send()
        .await
        .unwrap();
    let (status, body) = read(res).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email already exists");
}

#[tokio::test]
async fn invalid_bodies_are_rejected_with_field_errors() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .post(srv.url("/auth/register"))
        .json(&json!({ "email": "not-an-email", "password": "short" }))
        .send()
        .await
        .unwrap();
    let (status, body) = read(res).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], "VALIDATION_ERROR");
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, ["name", "email", "password"]);

    let res = srv
        .client
        .post(srv.url("/auth/register"))
        .header("content-type", "application/json")
        .body("{\"name\": ")
        .send()
        .await
        .unwrap();
    let (status, body) = read(res).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid JSON payload");
}

#[tokio::test]
async fn google_callback_provisions_once() {
    let srv = TestServer::spawn_with(|s| {
        s.with_identity_provider(Arc::new(StubGoogle {
            provider_id: "google-42",
        }))
    })
    .await;

    let callback = |code: &str| {
        srv.client
            .get(srv.url("/auth/google/callback"))
            .query(&[("code", code)])
            .send()
    };

    let (status, first) = read(callback("good-code").await.unwrap()).await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert!(first["accessToken"].as_str().is_some());
    assert_eq!(first["user"]["email"], "grace@example.com");

    let (status, second) = read(callback("good-code").await.unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["user"]["id"], first["user"]["id"]);

    let token = second["accessToken"].as_str().unwrap();
    let (_, body) = srv.get(token, "/workspace/all").await;
    assert_eq!(body["workspaces"].as_array().unwrap().len(), 1);

    let (status, _) = read(callback("bad-code").await.unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let res = srv
        .client
        .get(srv.url("/auth/google/callback"))
        .send()
        .await
        .unwrap();
    let (status, body) = read(res).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "code");
}

#[tokio::test]
async fn google_callback_edge_cases() {
    let unconfigured = TestServer::spawn().await;
    let res = unconfigured
        .client
        .get(unconfigured.url("/auth/google/callback?code=abc"))
        .send()
        .await
        .unwrap();
    let (status, body) = read(res).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Google sign-in is not configured");

    let no_id = TestServer::spawn_with(|s| {
        s.with_identity_provider(Arc::new(StubGoogle { provider_id: "" }))
    })
    .await;
    let res = no_id
        .client
        .get(no_id.url("/auth/google/callback?code=abc"))
        .send()
        .await
        .unwrap();
    let (status, body) = read(res).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Google ID not found in profile");
}

#[tokio::test]
async fn minted_tokens_are_checked() {
    let srv = TestServer::spawn().await;

    // Valid signature, unknown user.
    let ghost = mint_jwt(JWT_SECRET, UserId::new(), ChronoDuration::minutes(10));
    let (status, body) = srv.get(&ghost, "/user/current").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");

    let expired = mint_jwt(JWT_SECRET, UserId::new(), ChronoDuration::seconds(-30));
    let (status, _) = srv.get(&expired, "/user/current").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let foreign = mint_jwt("some-other-secret", UserId::new(), ChronoDuration::minutes(10));
    let (status, _) = srv.get(&foreign, "/user/current").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ─────────────────────────────────────────────────────────────────────────────
// Workspaces & membership
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn workspace_create_get_and_members() {
    let srv = TestServer::spawn().await;
    let (token, _, _) = srv.sign_up("owner@example.com").await;

    let (status, body) = srv
        .post(&token, "/workspace/create", json!({ "name": "Research", "description": "R&D" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let ws_id = body["workspace"]["id"].as_str().unwrap().to_string();

    let (_, me) = srv.get(&token, "/user/current").await;
    assert_eq!(me["user"]["currentWorkspace"], ws_id.as_str());

    let (status, body) = srv.get(&token, &format!("/workspace/{ws_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["workspace"]["name"], "Research");
    assert_eq!(body["workspace"]["members"].as_array().unwrap().len(), 1);

    let (status, body) = srv.get(&token, &format!("/workspace/members/{ws_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["members"][0]["role"], "OWNER");
    assert_eq!(body["roles"].as_array().unwrap().len(), 3);

    let (status, _) = srv
        .get(&token, &format!("/workspace/{}", WorkspaceId::new()))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = srv.get(&token, "/workspace/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "workspaceId");
}

#[tokio::test]
async fn outsiders_are_unauthorized_and_members_are_limited() {
    let srv = TestServer::spawn().await;
    let (owner, _, ws) = srv.sign_up("owner@example.com").await;
    let (outsider, outsider_id, _) = srv.sign_up("outsider@example.com").await;

    let (status, body) = srv.get(&outsider, &format!("/project/workspace/{ws}/all")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "User is not a member of the workspace");

    srv.add_member(&outsider_id, &ws, RoleName::Member).await;
    let member = outsider;

    let (status, body) = srv
        .post(&member, &format!("/project/workspace/{ws}/create"), json!({ "name": "Nope" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errorCode"], "ACCESS_UNAUTHORIZED");

    let (status, body) = srv
        .post(&owner, &format!("/project/workspace/{ws}/create"), json!({ "name": "Shared" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let pid = body["project"]["id"].as_str().unwrap().to_string();

    let (status, _) = srv.get(&member, &format!("/project/workspace/{ws}/all")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = srv
        .post(
            &member,
            &format!("/task/project/{pid}/workspace/{ws}/create"),
            json!({ "title": "Member task", "assignedTo": outsider_id }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["task"]["assignedTo"], outsider_id.as_str());

    let (status, _) = srv
        .send(
            reqwest::Method::DELETE,
            &member,
            &format!("/project/{pid}/workspace/{ws}/delete"),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ─────────────────────────────────────────────────────────────────────────────
// Projects & tasks
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn project_lifecycle_create_update_analytics_delete() {
    let srv = TestServer::spawn().await;
    let (token, _, ws) = srv.sign_up("pm@example.com").await;

    let (status, body) = srv
        .post(&token, &format!("/project/workspace/{ws}/create"), json!({ "name": "Apollo" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["project"]["emoji"], "📦");
    let pid = body["project"]["id"].as_str().unwrap().to_string();

    // Blank name is ignored, description applied.
    let (status, body) = srv
        .send(
            reqwest::Method::PUT,
            &token,
            &format!("/project/{pid}/workspace/{ws}/update"),
            json!({ "name": "", "description": "Moon landing" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["project"]["name"], "Apollo");
    assert_eq!(body["project"]["description"], "Moon landing");

    let past = (Utc::now() - ChronoDuration::days(1)).to_rfc3339();
    let future = (Utc::now() + ChronoDuration::days(3)).to_rfc3339();
    let tasks = [
        json!({ "title": "done late", "status": "DONE", "dueDate": past }),
        json!({ "title": "done", "status": "DONE" }),
        json!({ "title": "overdue", "status": "IN_PROGRESS", "dueDate": past }),
        json!({ "title": "upcoming", "dueDate": future }),
        json!({ "title": "someday", "priority": "LOW" }),
    ];
    for task in tasks {
        let (status, body) = srv
            .post(&token, &format!("/task/project/{pid}/workspace/{ws}/create"), task)
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let (_, body) = srv
        .get(&token, &format!("/task/project/{pid}/workspace/{ws}/all"))
        .await;
    let codes: Vec<&str> = body["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["taskCode"].as_str().unwrap())
        .collect();
    assert_eq!(codes.len(), 5);
    assert!(codes.contains(&"task-1") && codes.contains(&"task-5"));

    let (status, body) = srv
        .get(&token, &format!("/project/{pid}/workspace/{ws}/analytics"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["analytics"],
        json!({ "totalTasks": 5, "overdueTasks": 1, "completedTasks": 2 })
    );

    let (status, body) = srv
        .send(
            reqwest::Method::DELETE,
            &token,
            &format!("/project/{pid}/workspace/{ws}/delete"),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Project deleted successfully");

    let (status, _) = srv.get(&token, &format!("/project/{pid}/workspace/{ws}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = srv
        .get(&token, &format!("/task/project/{pid}/workspace/{ws}/all"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn project_listing_is_paginated_newest_first() {
    let srv = TestServer::spawn().await;
    let (token, _, ws) = srv.sign_up("pager@example.com").await;

    for i in 0..25 {
        let (status, _) = srv
            .post(&token, &format!("/project/workspace/{ws}/create"), json!({ "name": format!("p{i}") }))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = srv
        .get(&token, &format!("/project/workspace/{ws}/all?pageSize=10&pageNumber=3"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["projects"].as_array().unwrap().len(), 5);
    assert_eq!(
        body["pagination"],
        json!({
            "totalCount": 25,
            "totalPages": 3,
            "pageSize": 10,
            "pageNumber": 3,
            "skip": 20,
            "limit": 10,
        })
    );

    // Garbage falls back to the defaults.
    let (_, body) = srv
        .get(&token, &format!("/project/workspace/{ws}/all?pageSize=abc"))
        .await;
    assert_eq!(body["pagination"]["pageSize"], 10);
    assert_eq!(body["pagination"]["pageNumber"], 1);
}

#[tokio::test]
async fn projects_do_not_leak_across_workspaces() {
    let srv = TestServer::spawn().await;
    let (alice, _, alice_ws) = srv.sign_up("alice@example.com").await;
    let (bob, _, bob_ws) = srv.sign_up("bob@example.com").await;

    let (_, body) = srv
        .post(&alice, &format!("/project/workspace/{alice_ws}/create"), json!({ "name": "Secret" }))
        .await;
    let pid = body["project"]["id"].as_str().unwrap().to_string();

    // Bob asks for Alice's project through his own workspace.
    let (status, body) = srv.get(&bob, &format!("/project/{pid}/workspace/{bob_ws}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["message"],
        "Project not found or does not belong to the specified workspace"
    );

    let (status, _) = srv
        .send(
            reqwest::Method::DELETE,
            &bob,
            &format!("/project/{pid}/workspace/{bob_ws}/delete"),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = srv
        .post(
            &bob,
            &format!("/task/project/{pid}/workspace/{bob_ws}/create"),
            json!({ "title": "sneaky" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = srv.get(&alice, &format!("/project/{pid}/workspace/{alice_ws}")).await;
    assert_eq!(status, StatusCode::OK);
}
