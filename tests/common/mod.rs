#![allow(dead_code)]

use actix_http::Request;
use actix_web::{
    body::MessageBody,
    cookie::Cookie,
    dev::{Service, ServiceResponse},
    test::{self, TestRequest},
};
use ers::config::Config;
use serde_json::json;

pub fn test_config() -> Config {
    Config {
        database_url: String::new(),
        server_addr: "127.0.0.1:0".into(),
        session_ttl: 1800,
        rate_login_per_min: 600,
        rate_register_per_min: 600,
        rate_protected_per_min: 6000,
        cors_origin: "http://localhost:5173".into(),
    }
}

// The rate limiter keys on peer IP, so every test request needs one set.
fn with_peer(req: TestRequest) -> TestRequest {
    req.peer_addr("127.0.0.1:46851".parse().unwrap())
}

pub fn get(uri: &str) -> TestRequest {
    with_peer(TestRequest::get().uri(uri))
}

pub fn post(uri: &str) -> TestRequest {
    with_peer(TestRequest::post().uri(uri))
}

pub fn patch(uri: &str) -> TestRequest {
    with_peer(TestRequest::patch().uri(uri))
}

pub fn delete(uri: &str) -> TestRequest {
    with_peer(TestRequest::delete().uri(uri))
}

/// Registers a user and returns its id from the response body.
pub async fn register<S, B>(app: &S, username: &str, password: &str, role: Option<&str>) -> u64
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = test::call_service(
        app,
        post("/users")
            .set_json(json!({
                "username": username,
                "password": password,
                "role": role,
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 201, "registration failed");

    let body: serde_json::Value = test::read_body_json(resp).await;
    body["id"].as_u64().unwrap()
}

/// Logs in and returns the session cookie.
pub async fn login<S, B>(app: &S, username: &str, password: &str) -> Cookie<'static>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = test::call_service(
        app,
        post("/auth")
            .set_json(json!({ "username": username, "password": password }))
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success(), "login failed");

    resp.response()
        .cookies()
        .find(|c| c.name() == "session")
        .expect("login did not set a session cookie")
        .into_owned()
}
