use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use metablog::{
    build_app,
    config::{HashingConfig, JwtConfig},
    AppConfig, AppState,
};

fn config(auth_cookie: Option<&str>) -> AppConfig {
    AppConfig {
        database_url: "postgres://unused".into(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt: JwtConfig {
            secret: "integration-secret".into(),
            ttl_days: 30,
        },
        hashing: HashingConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        },
        auth_cookie: auth_cookie.map(str::to_string),
    }
}

fn app() -> Router {
    build_app(AppState::in_memory(config(None)).expect("state"))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, body)
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let req = match body {
        Some(b) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&b).unwrap()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    send(app, req).await
}

async fn register(app: &Router, name: &str, email: &str, password: &str) -> (StatusCode, Value) {
    call(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "name": name, "email": email, "password": password })),
    )
    .await
}

async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    call(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await
}

async fn token_for(app: &Router, name: &str, email: &str) -> (i64, String) {
    let (status, _) = register(app, name, email, "pw").await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = login(app, email, "pw").await;
    assert_eq!(status, StatusCode::OK);
    (
        body["data"]["id"].as_i64().unwrap(),
        body["data"]["token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn register_login_validate_scenario() {
    let app = app();

    let (status, body) = register(&app, "A", "a@x.com", "secret").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User created successfully");
    assert_eq!(body["data"]["email"], "a@x.com");
    assert!(body["data"].get("password_hash").is_none());
    assert!(!body.to_string().contains("secret"));
    let user_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = login(&app, "a@x.com", "secret").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User logged in successfully");
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert!(!token.is_empty());

    let (status, body) = call(&app, Method::GET, "/api/auth/validate", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User is authenticated");
    assert_eq!(body["data"]["id"].as_i64(), Some(user_id));

    let (status, body) = login(&app, "a@x.com", "wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");
    assert_eq!(body["error"], "unauthorized");

    let (status, body) = register(&app, "A", "a@x.com", "secret").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email already exists");
}

#[tokio::test]
async fn unknown_email_and_wrong_password_look_the_same() {
    let app = app();
    register(&app, "A", "a@x.com", "secret").await;
    let (s1, b1) = login(&app, "a@x.com", "wrong").await;
    let (s2, b2) = login(&app, "nobody@x.com", "secret").await;
    assert_eq!(s1, s2);
    assert_eq!(b1, b2);
}

#[tokio::test]
async fn validate_rejects_missing_tampered_and_foreign_tokens() {
    let app = app();
    let (_, token) = token_for(&app, "A", "a@x.com").await;

    let (status, body) = call(&app, Method::GET, "/api/auth/validate", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (head, sig) = token.rsplit_once('.').unwrap();
    let flipped = format!("{head}.{}{}", if sig.starts_with('A') { "B" } else { "A" }, &sig[1..]);
    let (_, payload_sig) = token.split_once('.').unwrap();
    let wrong_header = format!("eyJhbGciOiJub25lIn0.{payload_sig}");
    for bad in [flipped.as_str(), wrong_header.as_str(), "garbage"] {
        let (status, _) = call(&app, Method::GET, "/api/auth/validate", Some(bad), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "token {bad} accepted");
    }

    // same user id, different process secret
    let other = build_app(
        AppState::in_memory(AppConfig {
            jwt: JwtConfig {
                secret: "another-secret".into(),
                ttl_days: 30,
            },
            ..config(None)
        })
        .unwrap(),
    );
    let (status, _) = call(&other, Method::GET, "/api/auth/validate", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_for_unknown_user_is_rejected() {
    // Token minted by an app whose store has the user; presented to one that does not.
    let issuer = app();
    let (_, token) = token_for(&issuer, "A", "a@x.com").await;
    let fresh = app();
    let (status, body) = call(&fresh, Method::GET, "/api/auth/validate", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "User not found");
}

#[tokio::test]
async fn cookie_token_accepted_when_configured() {
    let app = build_app(AppState::in_memory(config(Some("Authorization"))).unwrap());
    let (id, token) = token_for(&app, "A", "a@x.com").await;

    let req = Request::builder()
        .method(Method::GET)
        .uri("/api/auth/validate")
        .header(header::COOKIE, format!("Authorization={token}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"].as_i64(), Some(id));
}

#[tokio::test]
async fn reset_password_revokes_old_tokens() {
    let app = app();
    let (_, old_token) = token_for(&app, "A", "a@x.com").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/resetpassword",
        None,
        Some(json!({ "email": "a@x.com", "newPassword": "new-pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password reset successfully");
    assert!(body["data"].is_null());

    let (status, _) = call(&app, Method::GET, "/api/auth/validate", Some(&old_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = login(&app, "a@x.com", "pw").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, body) = login(&app, "a@x.com", "new-pw").await;
    assert_eq!(status, StatusCode::OK);
    let new_token = body["data"]["token"].as_str().unwrap();
    let (status, _) = call(&app, Method::GET, "/api/auth/validate", Some(new_token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn reset_password_for_unknown_email() {
    let (status, body) = call(
        &app(),
        Method::POST,
        "/api/auth/resetpassword",
        None,
        Some(json!({ "email": "ghost@x.com", "newPassword": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User not found");
}

#[tokio::test]
async fn malformed_body_uses_error_envelope() {
    let app = app();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad request");
    assert_eq!(body["message"], "Failed to read body");

    let (status, body) = register(&app, "", "a@x.com", "pw").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Name, Email and Password are required");
}

fn blog(title: &str, description: &str) -> Value {
    json!({
        "title": title,
        "description": description,
        "author": "A",
        "image": "https://img.example/cover.png",
    })
}

#[tokio::test]
async fn blog_lifecycle() {
    let app = app();
    let (alice_id, alice) = token_for(&app, "Alice", "alice@x.com").await;
    let (_, bob) = token_for(&app, "Bob", "bob@x.com").await;

    let (status, _) = call(&app, Method::POST, "/api/blogs", None, Some(blog("t", "d"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/blogs",
        Some(&alice),
        Some(json!({ "title": "only a title" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Title, Description, Image and Author are required");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/blogs",
        Some(&alice),
        Some(blog("Rust ownership", "borrowing explained")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user_id"].as_i64(), Some(alice_id));
    assert_eq!(body["data"]["description"], "borrowing explained");
    let blog_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = call(&app, Method::GET, "/api/blogs", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let uri = format!("/api/blogs/single/{blog_id}");
    let (status, body) = call(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Rust ownership");

    let (status, body) = call(&app, Method::GET, "/api/blogs/single/999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Blog not found");

    // someone else's blog
    let uri = format!("/api/blogs/{blog_id}");
    let (status, _) = call(&app, Method::PUT, &uri, Some(&bob), Some(json!({ "title": "pwned" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&app, Method::DELETE, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(
        &app,
        Method::PUT,
        &uri,
        Some(&alice),
        Some(json!({ "title": "Rust lifetimes" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Rust lifetimes");
    assert_eq!(body["data"]["description"], "borrowing explained");

    let (status, body) = call(&app, Method::DELETE, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Blog deleted successfully");

    let (status, _) = call(&app, Method::DELETE, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_blogs_and_search_are_scoped_to_the_caller() {
    let app = app();
    let (alice_id, alice) = token_for(&app, "Alice", "alice@x.com").await;
    let (bob_id, bob) = token_for(&app, "Bob", "bob@x.com").await;

    for (token, title, description) in [
        (&alice, "Rust ownership", "borrowing"),
        (&alice, "Baking", "a rustic loaf"),
        (&alice, "Travel", "Lisbon"),
        (&bob, "Rust for Bob", "mine"),
    ] {
        let (status, _) =
            call(&app, Method::POST, "/api/blogs", Some(token), Some(blog(title, description))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let uri = format!("/api/blogs/user/{alice_id}");
    let (status, body) = call(&app, Method::GET, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let uri = format!("/api/blogs/user/{bob_id}");
    let (status, body) = call(&app, Method::GET, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "You are not authorized to access this resource");

    let (status, body) = call(&app, Method::GET, "/api/blogs/search?search=RUST", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Rust ownership", "Baking"]);

    let (status, body) = call(&app, Method::GET, "/api/blogs/search?search=zzz", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "No blogs found");
    assert_eq!(body["data"], json!([]));

    let (status, _) = call(&app, Method::GET, "/api/blogs/search?search=rust", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn list_users_requires_auth_and_hides_secrets() {
    let app = app();
    let (_, token) = token_for(&app, "A", "a@x.com").await;
    token_for(&app, "B", "b@x.com").await;

    let (status, _) = call(&app, Method::GET, "/api/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&app, Method::GET, "/api/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let users = body["data"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    for u in users {
        assert!(u.get("password_hash").is_none());
        assert!(u.get("token").is_none());
    }
}

#[tokio::test]
async fn health() {
    let (status, body) = call(&app(), Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));
}
