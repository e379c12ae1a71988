use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::{password::hash_password, session::AuthSession},
    error::ApiError,
    model::user::{Role, UserRecord},
    utils::username_cache::UsernameCache,
};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUser {
    #[schema(example = "Alice", value_type = Option<String>)]
    pub first_name: Option<String>,
    #[schema(example = "Smith", value_type = Option<String>)]
    pub last_name: Option<String>,
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "pw1")]
    pub password: String,
    /// Defaults to "employee" when absent or blank.
    #[schema(example = "employee", value_type = Option<String>)]
    pub role: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct RoleQuery {
    /// New role, one of "employee" or "manager" (case-insensitive).
    pub role: String,
}

/// true  => username AVAILABLE
/// false => username TAKEN
async fn is_username_available(
    username: &str,
    cache: &UsernameCache,
    pool: &MySqlPool,
) -> Result<bool, ApiError> {
    // Fast positive from the in-memory cache
    if cache.is_taken(username).await {
        return Ok(false);
    }

    // Database fallback
    let exists = sqlx::query_scalar::<_, i64>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ? LIMIT 1)",
    )
    .bind(username)
    .fetch_one(pool)
    .await?;

    Ok(exists == 0)
}

async fn fetch_user(pool: &MySqlPool, id: u64) -> Result<Option<UserRecord>, ApiError> {
    let user = sqlx::query_as::<_, UserRecord>(
        r#"
        SELECT id, first_name, last_name, username, role, created_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Register a user
///
/// Open endpoint. Username must be unique; the password is stored as an
/// argon2 hash; role defaults to "employee".
#[utoipa::path(
    post,
    path = "/users",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "User created", body = UserRecord),
        (status = 400, description = "Blank username/password or unknown role"),
        (status = 409, description = "Username already exists")
    ),
    tag = "Users"
)]
pub async fn register(
    payload: web::Json<RegisterUser>,
    pool: web::Data<MySqlPool>,
    cache: web::Data<UsernameCache>,
) -> Result<HttpResponse, ApiError> {
    let username = payload.username.trim();

    if username.is_empty() {
        return Err(ApiError::Validation("Username cannot be blank".into()));
    }
    if payload.password.trim().is_empty() {
        return Err(ApiError::Validation("Password cannot be blank".into()));
    }

    let role = match payload.role.as_deref().map(str::trim) {
        None | Some("") => Role::Employee,
        Some(value) => value.parse::<Role>().map_err(|_| {
            ApiError::Validation("Role must be 'employee' or 'manager'".into())
        })?,
    };

    if !is_username_available(username, &cache, pool.get_ref()).await? {
        return Err(ApiError::Conflict("Username already exists".into()));
    }

    let hashed = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        ApiError::Internal
    })?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (first_name, last_name, username, password, role)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(username)
    .bind(&hashed)
    .bind(role.to_string())
    .execute(pool.get_ref())
    .await;

    let result = match result {
        Ok(r) => r,
        Err(e) => {
            // Unique-key race with a concurrent registration
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Err(ApiError::Conflict("Username already exists".into()));
                }
            }
            return Err(e.into());
        }
    };

    cache.mark_taken(username).await;

    let user = fetch_user(pool.get_ref(), result.last_insert_id())
        .await?
        .ok_or(ApiError::Internal)?;

    info!(user_id = user.id, "User registered");

    Ok(HttpResponse::Created().json(user))
}

/// List all users (manager only)
#[utoipa::path(
    get,
    path = "/users/all",
    responses(
        (status = 200, description = "All users", body = [UserRecord]),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Manager role required")
    ),
    security(("session_cookie" = [])),
    tag = "Users"
)]
pub async fn list_users(
    auth: AuthSession,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    auth.require_manager()?;

    let users = sqlx::query_as::<_, UserRecord>(
        r#"
        SELECT id, first_name, last_name, username, role, created_at
        FROM users
        ORDER BY id
        "#,
    )
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(users))
}

/// Delete a user (manager only)
///
/// Removes the user's reimbursements and the user itself in one
/// transaction, so a partial delete is never observable.
#[utoipa::path(
    delete,
    path = "/users/{user_id}",
    params(("user_id" = u64, Path, description = "ID of the user to delete")),
    responses(
        (status = 204, description = "User and owned reimbursements deleted"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Manager role required"),
        (status = 404, description = "User not found")
    ),
    security(("session_cookie" = [])),
    tag = "Users"
)]
pub async fn delete_user(
    auth: AuthSession,
    pool: web::Data<MySqlPool>,
    cache: web::Data<UsernameCache>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_manager()?;

    let user_id = path.into_inner();

    let mut tx = pool.begin().await?;

    let username = sqlx::query_scalar::<_, String>("SELECT username FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    sqlx::query("DELETE FROM reimbursement WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    cache.mark_available(&username).await;

    info!(user_id, "User deleted with owned reimbursements");

    Ok(HttpResponse::NoContent().finish())
}

/// Change a user's role (manager only)
#[utoipa::path(
    patch,
    path = "/users/{user_id}/role",
    params(
        ("user_id" = u64, Path, description = "ID of the user to update"),
        RoleQuery
    ),
    responses(
        (status = 200, description = "Updated user", body = UserRecord),
        (status = 400, description = "Unknown role value"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Manager role required"),
        (status = 404, description = "User not found")
    ),
    security(("session_cookie" = [])),
    tag = "Users"
)]
pub async fn update_role(
    auth: AuthSession,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    query: web::Query<RoleQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_manager()?;

    let user_id = path.into_inner();

    let role = query
        .role
        .parse::<Role>()
        .map_err(|_| ApiError::Validation("Role must be 'employee' or 'manager'".into()))?;

    // MySQL reports zero affected rows for a same-value update, so existence
    // is checked separately instead of via rows_affected.
    fetch_user(pool.get_ref(), user_id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    sqlx::query("UPDATE users SET role = ? WHERE id = ?")
        .bind(role.to_string())
        .bind(user_id)
        .execute(pool.get_ref())
        .await?;

    let user = fetch_user(pool.get_ref(), user_id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    info!(user_id, role = %role, "Role updated");

    Ok(HttpResponse::Ok().json(user))
}
