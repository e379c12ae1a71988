mod common;

use std::time::Duration;

use actix_web::{App, test, web::Data};
use ers::{auth::session::SessionStore, routes, utils::username_cache::UsernameCache};
use serde_json::json;
use sqlx::MySqlPool;

macro_rules! init_app {
    ($pool:expr) => {
        test::init_service(
            App::new()
                .app_data(Data::new($pool.clone()))
                .app_data(Data::new(SessionStore::new(Duration::from_secs(1800))))
                .app_data(Data::new(UsernameCache::new()))
                .configure(|cfg| routes::configure(cfg, common::test_config())),
        )
        .await
    };
}

#[sqlx::test]
async fn login_returns_identity_and_opens_session(pool: MySqlPool) {
    let app = init_app!(pool);
    let user_id = common::register(&app, "alice", "pw1", None).await;

    let resp = test::call_service(
        &app,
        common::post("/auth")
            .set_json(json!({ "username": "alice", "password": "pw1" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 200);

    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == "session")
        .expect("no session cookie")
        .into_owned();

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["userId"].as_u64(), Some(user_id));
    assert_eq!(body["username"], "alice");
    assert_eq!(body["role"], "employee");

    // The cookie resolves to the same identity
    let resp = test::call_service(
        &app,
        common::get("/auth/session").cookie(cookie).to_request(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 200);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["userId"].as_u64(), Some(user_id));
    assert_eq!(body["role"], "employee");
}

#[sqlx::test]
async fn login_rejects_bad_credentials(pool: MySqlPool) {
    let app = init_app!(pool);
    common::register(&app, "alice", "pw1", None).await;

    let resp = test::call_service(
        &app,
        common::post("/auth")
            .set_json(json!({ "username": "alice", "password": "wrong" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 401);

    let resp = test::call_service(
        &app,
        common::post("/auth")
            .set_json(json!({ "username": "nobody", "password": "pw1" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 401);
}

#[sqlx::test]
async fn login_rejects_blank_fields(pool: MySqlPool) {
    let app = init_app!(pool);

    let resp = test::call_service(
        &app,
        common::post("/auth")
            .set_json(json!({ "username": "  ", "password": "pw1" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 400);

    let resp = test::call_service(
        &app,
        common::post("/auth")
            .set_json(json!({ "username": "alice", "password": "" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 400);
}

#[sqlx::test]
async fn session_query_requires_a_session(pool: MySqlPool) {
    let app = init_app!(pool);

    let resp = test::call_service(&app, common::get("/auth/session").to_request()).await;
    assert_eq!(resp.status().as_u16(), 401);
}

#[sqlx::test]
async fn logout_invalidates_the_session(pool: MySqlPool) {
    let app = init_app!(pool);
    common::register(&app, "alice", "pw1", None).await;
    let cookie = common::login(&app, "alice", "pw1").await;

    let resp = test::call_service(
        &app,
        common::post("/auth/logout").cookie(cookie.clone()).to_request(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 200);

    let resp = test::call_service(
        &app,
        common::get("/auth/session").cookie(cookie.clone()).to_request(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 401);

    // logging out again is a no-op
    let resp = test::call_service(
        &app,
        common::post("/auth/logout").cookie(cookie).to_request(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 200);
}

#[sqlx::test]
async fn passwords_are_stored_hashed(pool: MySqlPool) {
    let app = init_app!(pool);
    common::register(&app, "alice", "pw1", None).await;

    let stored: String =
        sqlx::query_scalar("SELECT password FROM users WHERE username = 'alice'")
            .fetch_one(&pool)
            .await
            .unwrap();

    assert_ne!(stored, "pw1");
    assert!(stored.starts_with("$argon2"));
}
