use bikeshare_api::app::services::AppServices;
use bikeshare_auth::{JwtClaims, PrincipalId, Role};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

const SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(jwt_secret: &str) -> Self {
        // Same router as prod, in-memory store, ephemeral port.
        let app = bikeshare_api::app::router(AppServices::in_memory(), jwt_secret.to_string());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(jwt_secret: &str, roles: Vec<Role>) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: PrincipalId::new(),
        username: "ops".to_string(),
        roles,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn admin_token() -> String {
    mint_jwt(SECRET, vec![Role::admin()])
}

async fn create_station(client: &reqwest::Client, srv: &TestServer, body: Value) -> Value {
    let res = client
        .post(srv.url("/admin/stations"))
        .bearer_auth(admin_token())
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn(SECRET).await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();

    for path in ["/whoami", "/admin/stations"] {
        let res = client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{path}");
    }

    let forged = mint_jwt("other-secret", vec![Role::admin()]);
    let res = client
        .get(srv.url("/admin/stations"))
        .bearer_auth(forged)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let srv = TestServer::spawn(SECRET).await;
    let past = Utc::now() - ChronoDuration::hours(2);
    let claims = JwtClaims {
        sub: PrincipalId::new(),
        username: "ops".to_string(),
        roles: vec![Role::admin()],
        issued_at: past,
        expires_at: past + ChronoDuration::minutes(10),
    };
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    let res = reqwest::Client::new()
        .get(srv.url("/whoami"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn whoami_echoes_the_token_principal() {
    let srv = TestServer::spawn(SECRET).await;
    let res = reqwest::Client::new()
        .get(srv.url("/whoami"))
        .bearer_auth(admin_token())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["username"], "ops");
    assert!(body["roles"].as_array().unwrap().iter().any(|r| r == "admin"));
}

#[tokio::test]
async fn non_admin_is_forbidden_on_admin_routes() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let rider = mint_jwt(SECRET, vec![Role::new("rider")]);

    let res = client
        .get(srv.url("/admin/stations"))
        .bearer_auth(&rider)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "forbidden");

    // Authorization is checked before the body is looked at.
    let res = client
        .post(srv.url("/admin/stations"))
        .bearer_auth(&rider)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn station_lifecycle_create_adjust_resize_delete() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let token = admin_token();

    let created = create_station(
        &client,
        &srv,
        json!({"name": "  Ferry Building ", "lat": "37.7955", "lng": -122.3937, "capacity": 10, "available": 5}),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["name"], "Ferry Building");
    assert_eq!(created["free_docks"], 5);

    let res = client
        .post(srv.url(&format!("/admin/stations/{id}/inventory")))
        .bearer_auth(&token)
        .json(&json!({"delta": 100}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["available"], 10);

    let res = client
        .post(srv.url(&format!("/admin/stations/{id}/inventory")))
        .bearer_auth(&token)
        .json(&json!({"delta": -100}))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["available"], 0);

    client
        .post(srv.url(&format!("/admin/stations/{id}/inventory")))
        .bearer_auth(&token)
        .json(&json!({"delta": 8}))
        .send()
        .await
        .unwrap();

    let res = client
        .post(srv.url(&format!("/admin/stations/{id}/capacity")))
        .bearer_auth(&token)
        .json(&json!({"capacity": 5}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["capacity"], 5);
    assert_eq!(body["available"], 5);

    let res = client
        .delete(srv.url(&format!("/admin/stations/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);

    let res = client
        .get(srv.url(&format!("/admin/stations/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .delete(srv.url(&format!("/admin/stations/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_applies_defaults_and_validates() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();

    let created = create_station(&client, &srv, json!({"name": "Dock", "lat": 1.0, "lng": 2.0})).await;
    assert_eq!(created["capacity"], 10);
    assert_eq!(created["available"], 0);
    assert_eq!(created["open"], true);

    for bad in [
        json!({"lat": 1.0, "lng": 2.0}),
        json!({"name": "Dock", "lat": "north", "lng": 2.0}),
        json!({"name": "Dock", "lat": 1.0, "lng": 2.0, "capacity": 3, "available": 4}),
    ] {
        let res = client
            .post(srv.url("/admin/stations"))
            .bearer_auth(admin_token())
            .json(&bad)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{bad}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "validation_error");
    }
}

#[tokio::test]
async fn direct_edit_enforces_invariant_and_allow_list() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let token = admin_token();

    let created = create_station(
        &client,
        &srv,
        json!({"name": "Dock", "lat": 1.0, "lng": 2.0, "capacity": 10, "available": 4}),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();
    let url = srv.url(&format!("/admin/stations/{id}"));

    let res = client
        .patch(&url)
        .bearer_auth(&token)
        .json(&json!({"available": 12}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invariant_violation");

    let res = client
        .patch(&url)
        .bearer_auth(&token)
        .json(&json!({"id": "00000000-0000-0000-0000-000000000000"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .put(&url)
        .bearer_auth(&token)
        .json(&json!({"name": "Renamed", "capacity": 20, "available": 15}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["name"], "Renamed");
    assert_eq!(body["available"], 15);
    assert_eq!(body["id"], id.as_str());
}

#[tokio::test]
async fn riders_only_see_open_stations() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();

    let open = create_station(&client, &srv, json!({"name": "Open", "lat": 1, "lng": 1})).await;
    let closed =
        create_station(&client, &srv, json!({"name": "Closed", "lat": 1, "lng": 1, "open": false})).await;

    let list: Vec<Value> = reqwest::get(srv.url("/stations")).await.unwrap().json().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], open["id"]);

    let res = reqwest::get(srv.url(&format!("/stations/{}", open["id"].as_str().unwrap())))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let closed_id = closed["id"].as_str().unwrap();
    let res = reqwest::get(srv.url(&format!("/stations/{closed_id}"))).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Admins still see and manage it.
    let res = client
        .get(srv.url(&format!("/admin/stations/{closed_id}")))
        .bearer_auth(admin_token())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn edit_form_may_send_numbers_as_text() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let token = admin_token();

    let created = create_station(
        &client,
        &srv,
        json!({"name": "Form", "lat": "1", "lng": "1", "capacity": "10", "available": "3"}),
    )
    .await;
    assert_eq!(created["capacity"], 10);
    assert_eq!(created["available"], 3);
    let url = srv.url(&format!("/admin/stations/{}", created["id"].as_str().unwrap()));

    let res = client
        .put(&url)
        .bearer_auth(&token)
        .json(&json!({"capacity": "12", "available": "4", "lat": "1.5", "lng": "2"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["capacity"], 12);
    assert_eq!(body["available"], 4);
    assert_eq!(body["lat"], 1.5);
    assert_eq!(body["lng"], 2.0);

    let res = client
        .put(&url)
        .bearer_auth(&token)
        .json(&json!({"available": "-1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = client
        .put(&url)
        .bearer_auth(&token)
        .json(&json!({"available": "four"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn bad_ids_and_bodies_are_rejected() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let token = admin_token();

    let res = reqwest::get(srv.url("/stations/not-a-uuid")).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_id");

    let res = reqwest::get(srv.url(&format!("/stations/{}", bikeshare_core::StationId::new())))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let created = create_station(&client, &srv, json!({"name": "Dock", "lat": 1, "lng": 1})).await;
    let id = created["id"].as_str().unwrap();

    let res = client
        .post(srv.url(&format!("/admin/stations/{id}/capacity")))
        .bearer_auth(&token)
        .json(&json!({"capacity": -1}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url(&format!("/admin/stations/{id}/capacity")))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Missing delta is a no-op.
    let res = client
        .post(srv.url(&format!("/admin/stations/{id}/inventory")))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["available"], 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adjustments_are_not_lost() {
    let srv = TestServer::spawn(SECRET).await;
    let client = reqwest::Client::new();
    let token = admin_token();

    let created = create_station(
        &client,
        &srv,
        json!({"name": "Busy", "lat": 1, "lng": 1, "capacity": 100, "available": 0}),
    )
    .await;
    let url = srv.url(&format!("/admin/stations/{}/inventory", created["id"].as_str().unwrap()));

    let requests = (0..40).map(|_| {
        let client = client.clone();
        let url = url.clone();
        let token = token.clone();
        async move {
            client
                .post(url)
                .bearer_auth(token)
                .json(&json!({"delta": 1}))
                .send()
                .await
                .unwrap()
                .status()
        }
    });
    let statuses = futures::future::join_all(requests).await;
    assert!(statuses.iter().all(|s| *s == StatusCode::OK));

    let res = client
        .get(srv.url(&format!("/admin/stations/{}", created["id"].as_str().unwrap())))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["available"], 40);
}
