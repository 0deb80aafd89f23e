use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use resource_server::auth::{Claims, TokenManager};
use resource_server::{app, builtin_resources, resolve, AppState, MemoryStore, ResourceConfig, Settings};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const SECRET: &str = "test-secret";

struct TestApp {
    router: Router,
    token: String,
}

impl TestApp {
    fn new() -> Self {
        Self::with_configs(builtin_resources(), Settings::new(SECRET))
    }

    fn with_configs(configs: Vec<ResourceConfig>, settings: Settings) -> Self {
        let registry = resolve(&configs).expect("resources resolve");
        let state = AppState::new(Arc::new(MemoryStore::new()), settings, registry);
        let (token, _) = TokenManager::new(SECRET, Duration::from_secs(3600))
            .issue(1234)
            .expect("token");
        Self {
            router: app(state),
            token,
        }
    }

    async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = authed(method, uri, body, &self.token);
        request_json(&self.router, request).await
    }
}

fn authed(method: Method, uri: &str, body: Option<Value>, token: &str) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request")
}

async fn request_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("request must be served");

    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();

    if bytes.is_empty() {
        return (status, Value::Null);
    }

    let body = serde_json::from_slice::<Value>(&bytes).expect("valid json response");
    (status, body)
}

fn not_found() -> Value {
    json!({ "message": "Not found" })
}

#[tokio::test]
async fn empty_collection_lists_as_empty_array() {
    let t = TestApp::new();
    let (status, body) = t.call(Method::GET, "/projects/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = t.call(Method::GET, "/projects", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn create_then_read_returns_rendered_payload_with_id() {
    let t = TestApp::new();
    let (status, created) = t
        .call(Method::POST, "/projects/", Some(json!({ "name": "Foo" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().expect("integer id");
    assert!(id > 0);
    assert_eq!(created, json!({ "id": id, "name": "Foo" }));

    let (status, read) = t.call(Method::GET, &format!("/projects/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read, created);
}

#[tokio::test]
async fn client_supplied_id_is_ignored() {
    let t = TestApp::new();
    let (status, created) = t
        .call(Method::POST, "/projects/", Some(json!({ "id": 500, "name": "Foo" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created, json!({ "id": 1, "name": "Foo" }));
}

#[tokio::test]
async fn delete_then_read_is_not_found() {
    let t = TestApp::new();
    let (_, created) = t
        .call(Method::POST, "/projects/", Some(json!({ "name": "Doomed" })))
        .await;
    let uri = format!("/projects/{}", created["id"]);

    let (status, body) = t.call(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = t.call(Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, not_found());

    let (status, body) = t.call(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, not_found());
}

#[tokio::test]
async fn patch_missing_id_is_not_found() {
    let t = TestApp::new();
    let (status, body) = t
        .call(Method::PATCH, "/projects/999999", Some(json!({ "name": "x" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, not_found());
}

#[tokio::test]
async fn patch_assigns_only_provided_fields() {
    let t = TestApp::new();
    let (_, created) = t
        .call(
            Method::POST,
            "/users/",
            Some(json!({ "first_name": "Ada", "last_name": "Byron", "email": "ada@example.com", "password": "pw" })),
        )
        .await;
    let uri = format!("/users/{}", created["id"]);

    let (status, updated) = t
        .call(Method::PATCH, &uri, Some(json!({ "last_name": "Lovelace" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        updated,
        json!({ "id": created["id"], "first_name": "Ada", "last_name": "Lovelace" })
    );

    let (status, unchanged) = t.call(Method::PATCH, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unchanged, updated);
}

#[tokio::test]
async fn password_never_rendered() {
    let t = TestApp::new();
    let (status, created) = t
        .call(
            Method::POST,
            "/users/",
            Some(json!({ "first_name": "Grace", "email": "grace@example.com", "password": "hunter2" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created.get("password").is_none());
    assert!(created.get("email").is_none());

    let (_, read) = t.call(Method::GET, &format!("/users/{}", created["id"]), None).await;
    assert_eq!(read, json!({ "id": created["id"], "first_name": "Grace", "last_name": null }));

    let (_, listed) = t.call(Method::GET, "/users/", None).await;
    assert!(!listed.to_string().contains("hunter2"));
    assert!(!listed.to_string().contains("password"));
}

#[tokio::test]
async fn invalid_payloads_are_client_errors() {
    let t = TestApp::new();
    let (status, body) = t
        .call(Method::POST, "/projects/", Some(json!({ "name": "x", "color": "red" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "unknown field: color" }));

    let (status, body) = t.call(Method::POST, "/projects/", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "name is required" }));

    let (status, body) = t.call(Method::GET, "/projects/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "invalid id" }));

    let (status, body) = t.call(Method::POST, "/projects/", Some(json!([1, 2]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn list_filters_and_ordering() {
    let t = TestApp::new();
    for name in ["bravo", "alpha", "charlie", "delta"] {
        let (status, _) = t.call(Method::POST, "/projects/", Some(json!({ "name": name }))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = t.call(Method::GET, "/projects/?ordering=-name", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["delta", "charlie", "bravo", "alpha"]);

    // Clauses combine with OR by default.
    let (status, body) = t
        .call(Method::GET, "/projects/?filters=name==alpha,id%3E%3D4&ordering=id", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{ "id": 2, "name": "alpha" }, { "id": 4, "name": "delta" }]));

    let (status, body) = t
        .call(Method::GET, "/projects/?filters=name~contains~ar", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{ "id": 3, "name": "charlie" }]));
}

#[tokio::test]
async fn list_rejects_unresolvable_expressions() {
    let t = TestApp::new();
    for uri in [
        "/projects/?filters=color==red",
        "/projects/?filters=name",
        "/projects/?ordering=-color",
        "/users/?filters=password==pw",
        "/users/?ordering=password",
        "/projects/?filters=id%3E%3Dabc",
    ] {
        let (status, body) = t.call(Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(body["message"].is_string(), "{}", uri);
    }
}

#[tokio::test]
async fn and_combinator_from_settings() {
    let mut settings = Settings::new(SECRET);
    settings.filter_combinator = "and".parse().unwrap();
    let t = TestApp::with_configs(builtin_resources(), settings);
    for name in ["alpha", "beta"] {
        t.call(Method::POST, "/projects/", Some(json!({ "name": name }))).await;
    }
    let (_, body) = t
        .call(Method::GET, "/projects/?filters=name==alpha,id%3E%3D2", None)
        .await;
    assert_eq!(body, json!([]));
    let (_, body) = t
        .call(Method::GET, "/projects/?filters=name==beta,id%3E%3D2", None)
        .await;
    assert_eq!(body, json!([{ "id": 2, "name": "beta" }]));
}

#[tokio::test]
async fn resource_routes_require_bearer_token() {
    let t = TestApp::new();
    let unauthenticated = json!({ "message": "Not authenticated" });

    let request = Request::builder()
        .uri("/projects/")
        .body(Body::empty())
        .unwrap();
    let (status, body) = request_json(&t.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, unauthenticated);

    let request = authed(Method::GET, "/projects/", None, "garbage");
    let (status, body) = request_json(&t.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, unauthenticated);

    let expired = TokenManager::new(SECRET, Duration::from_secs(60))
        .encode(&Claims { user_id: 1, exp: 1_000_000 })
        .unwrap();
    let request = authed(Method::GET, "/projects/", None, &expired);
    let (status, _) = request_json(&t.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let foreign = TokenManager::new("other-secret", Duration::from_secs(60)).issue(1).unwrap().0;
    let request = authed(Method::GET, "/projects/", None, &foreign);
    let (status, _) = request_json(&t.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_flow() {
    let t = TestApp::new();
    let (status, user) = t
        .call(
            Method::POST,
            "/users/",
            Some(json!({ "first_name": "Ada", "email": "ada@example.com", "password": "s3cret" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let login = |password: &str| {
        Request::builder()
            .method(Method::POST)
            .uri("/tokens/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "grant_type": "password", "username": "ada@example.com", "password": password })
                    .to_string(),
            ))
            .unwrap()
    };

    let (status, body) = request_json(&t.router, login("wrong")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "Email and password do not match" }));

    let (status, body) = request_json(&t.router, login("s3cret")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    let access_token = body["access_token"].as_str().unwrap().to_string();
    let expires_in = body["expires_in"].as_i64().unwrap();
    assert!(expires_in > chrono::Utc::now().timestamp());

    let claims = TokenManager::new(SECRET, Duration::from_secs(1)).verify(&access_token).unwrap();
    assert_eq!(claims, Claims { user_id: user["id"].as_i64().unwrap(), exp: expires_in });

    let (status, body) = request_json(&t.router, authed(Method::GET, "/projects/", None, &access_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_array());
}

#[tokio::test]
async fn token_accepts_form_credentials() {
    let t = TestApp::new();
    t.call(
        Method::POST,
        "/users/",
        Some(json!({ "email": "bob@example.com", "password": "pw" })),
    )
    .await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/tokens/")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("grant_type=password&username=bob%40example.com&password=pw"))
        .unwrap();
    let (status, body) = request_json(&t.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/tokens/")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=nobody%40example.com&password=pw"))
        .unwrap();
    let (status, body) = request_json(&t.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "Email and password do not match" }));
}

#[tokio::test]
async fn disabled_operations_are_not_routed() {
    let tags: ResourceConfig = serde_json::from_value(json!({
        "name": "tags",
        "operations": ["list", "read"],
        "fields": [{ "name": "label", "type": "string" }],
        "render_fields": ["id", "label"]
    }))
    .unwrap();
    let mut configs = builtin_resources();
    configs.push(tags);
    let t = TestApp::with_configs(configs, Settings::new(SECRET));

    let (status, _) = t.call(Method::GET, "/tags/", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = t.call(Method::POST, "/tags/", Some(json!({ "label": "x" }))).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    let (status, _) = t.call(Method::DELETE, "/tags/1", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn ambient_routes() {
    let t = TestApp::new();
    let get = |uri: &str| Request::builder().uri(uri).body(Body::empty()).unwrap();

    let (status, body) = request_json(&t.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));

    let (status, body) = request_json(&t.router, get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = request_json(&t.router, get("/version")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "resource-server");

    let (status, body) = request_json(&t.router, get("/docs")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/users/{id}"].is_object());

    let (status, body) = request_json(&t.router, get("/nowhere")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, not_found());
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let mut settings = Settings::new(SECRET);
    settings.max_body_bytes = 64;
    let t = TestApp::with_configs(builtin_resources(), settings);
    let name = "x".repeat(200);
    let request = authed(Method::POST, "/projects/", Some(json!({ "name": name })), &t.token);
    let response = t.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
