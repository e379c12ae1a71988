use actix_web::{HttpRequest, HttpResponse, cookie::Cookie, web};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use crate::{
    auth::{
        password::verify_password,
        session::{AuthSession, SESSION_COOKIE, SessionStore, SessionUser},
    },
    error::ApiError,
    model::user::{Role, UserAuthRow, UserView},
};

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginDto {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "pw1")]
    pub password: String,
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .finish()
}

/// Login
///
/// Verifies credentials, opens a server-side session and sets its token as
/// an HttpOnly cookie.
#[utoipa::path(
    post,
    path = "/auth",
    request_body = LoginDto,
    responses(
        (status = 200, description = "Logged in", body = UserView),
        (status = 400, description = "Blank username or password"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, store, payload),
    fields(username = %payload.username)
)]
pub async fn login(
    payload: web::Json<LoginDto>,
    pool: web::Data<MySqlPool>,
    store: web::Data<SessionStore>,
) -> Result<HttpResponse, ApiError> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "Username and password are required".into(),
        ));
    }

    debug!("Fetching user from database");

    let db_user = sqlx::query_as::<_, UserAuthRow>(
        r#"
        SELECT id, username, password, role
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(payload.username.trim())
    .fetch_optional(pool.get_ref())
    .await?;

    let Some(db_user) = db_user else {
        info!("Invalid credentials: user not found");
        return Err(ApiError::Unauthenticated);
    };

    if !verify_password(&payload.password, &db_user.password) {
        info!("Invalid credentials: password mismatch");
        return Err(ApiError::Unauthenticated);
    }

    let role: Role = db_user.role.parse().map_err(|_| ApiError::Internal)?;

    let token = store.create(SessionUser {
        user_id: db_user.id,
        username: db_user.username.clone(),
        role,
    });

    info!(user_id = db_user.id, "Login successful");

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(token))
        .json(UserView {
            user_id: db_user.id,
            username: db_user.username,
            role,
        }))
}

/// Current session
///
/// Returns the identity recorded in the caller's session.
#[utoipa::path(
    get,
    path = "/auth/session",
    responses(
        (status = 200, description = "Active session", body = UserView),
        (status = 401, description = "Not logged in")
    ),
    security(("session_cookie" = [])),
    tag = "Auth"
)]
pub async fn session(auth: AuthSession) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(UserView {
        user_id: auth.user.user_id,
        username: auth.user.username,
        role: auth.user.role,
    }))
}

/// Logout
///
/// Destroys the caller's session, if any, and expires the cookie.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 200, description = "Session destroyed")),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    store: web::Data<SessionStore>,
) -> Result<HttpResponse, ApiError> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        store.destroy(cookie.value());
    }

    let mut removal = Cookie::new(SESSION_COOKIE, "");
    removal.set_path("/");
    removal.make_removal();

    Ok(HttpResponse::Ok().cookie(removal).finish())
}
