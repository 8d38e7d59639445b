#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use libris_app::app::Application;
use libris_kernel::settings::Settings;

/// A fully bootstrapped app over a private in-memory database.
pub async fn app() -> Application {
    let mut settings = Settings::default();
    settings.database.url = "sqlite::memory:".to_string();
    settings.auth.password_memory_kib = 1024;
    settings.recommendations.nprobe = settings.recommendations.nlist;
    Application::bootstrap(settings).await.unwrap()
}

pub struct Reply {
    pub status: StatusCode,
    pub bytes: Vec<u8>,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).unwrap_or(Value::Null)
    }
}

pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Reply {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    Reply { status, bytes }
}

/// Register `username` and return its access token.
pub async fn access_token(router: &Router, username: &str) -> String {
    let registered = send(
        router,
        Method::POST,
        "/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "Quiet-Reading-Room",
            "password2": "Quiet-Reading-Room",
        })),
    )
    .await;
    assert_eq!(registered.status, StatusCode::CREATED, "{:?}", registered.json());

    let login = send(
        router,
        Method::POST,
        "/login",
        None,
        Some(json!({ "username": username, "password": "Quiet-Reading-Room" })),
    )
    .await;
    assert_eq!(login.status, StatusCode::OK);
    login.json()["access"].as_str().unwrap().to_string()
}

pub async fn create_author(router: &Router, token: &str, name: &str) -> i64 {
    let reply = send(
        router,
        Method::POST,
        "/authors",
        Some(token),
        Some(json!({ "name": name, "about": format!("About {name}") })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.json());
    reply.json()["id"].as_i64().unwrap()
}

pub async fn create_book(
    router: &Router,
    token: &str,
    author: i64,
    title: &str,
    ratings_count: Option<i64>,
    average_rating: Option<f64>,
) -> i64 {
    let reply = send(
        router,
        Method::POST,
        "/books",
        Some(token),
        Some(json!({
            "title": title,
            "description": format!("{title}, a novel"),
            "author": author,
            "ratings_count": ratings_count,
            "average_rating": average_rating,
        })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.json());
    reply.json()["id"].as_i64().unwrap()
}
