use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::session::AuthSession,
    error::ApiError,
    model::reimbursement::{ReimbursementRow, ReimbursementStatus, ReimbursementView},
};

/// Base SELECT used by every read: reimbursement joined to its owner.
const SELECT_VIEW: &str = r#"
    SELECT r.id, r.amount, r.description, r.status, r.created_at,
           u.id AS user_id, u.username, u.role AS user_role
    FROM reimbursement r
    JOIN users u ON u.id = r.user_id
"#;

#[derive(Deserialize, ToSchema)]
pub struct CreateReimbursement {
    #[schema(example = 50.0)]
    pub amount: f64,
    #[schema(example = "lunch")]
    pub description: String,
    /// Optional; when present it must be "PENDING".
    #[schema(example = "PENDING", value_type = Option<String>)]
    pub status: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateReimbursement {
    #[schema(example = 75.5, value_type = Option<f64>)]
    pub amount: Option<f64>,
    #[schema(example = "team lunch", value_type = Option<String>)]
    pub description: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct ResolveQuery {
    /// Target status: "APPROVED" or "DENIED" (case-insensitive).
    pub status: String,
}

async fn fetch_view(pool: &MySqlPool, id: u64) -> Result<Option<ReimbursementView>, ApiError> {
    let sql = format!("{SELECT_VIEW} WHERE r.id = ?");

    let row = sqlx::query_as::<_, ReimbursementRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(ReimbursementView::from))
}

async fn fetch_views(
    pool: &MySqlPool,
    user_id: Option<u64>,
    status: Option<ReimbursementStatus>,
) -> Result<Vec<ReimbursementView>, ApiError> {
    let mut sql = String::from(SELECT_VIEW);
    sql.push_str(" WHERE 1=1");
    if user_id.is_some() {
        sql.push_str(" AND r.user_id = ?");
    }
    if status.is_some() {
        sql.push_str(" AND r.status = ?");
    }
    sql.push_str(" ORDER BY r.created_at DESC, r.id DESC");

    let mut query = sqlx::query_as::<_, ReimbursementRow>(&sql);
    if let Some(user_id) = user_id {
        query = query.bind(user_id);
    }
    if let Some(status) = status {
        query = query.bind(status.to_string());
    }

    let rows = query.fetch_all(pool).await?;

    Ok(rows.into_iter().map(ReimbursementView::from).collect())
}

/// Validates the payload and inserts a reimbursement owned by `user_id`.
async fn insert_reimbursement(
    pool: &MySqlPool,
    payload: &CreateReimbursement,
    user_id: u64,
) -> Result<ReimbursementView, ApiError> {
    if payload.amount <= 0.0 {
        return Err(ApiError::Validation(
            "Amount must be greater than zero".into(),
        ));
    }
    if payload.description.trim().is_empty() {
        return Err(ApiError::Validation("Description cannot be blank".into()));
    }

    // A provided status may only restate the default
    let status = match payload.status.as_deref().map(str::trim) {
        None | Some("") => ReimbursementStatus::Pending,
        Some(value) => {
            let parsed = value.parse::<ReimbursementStatus>().map_err(|_| {
                ApiError::Validation("Status must be PENDING for a new reimbursement".into())
            })?;
            if !parsed.is_pending() {
                return Err(ApiError::Validation(
                    "Status must be PENDING for a new reimbursement".into(),
                ));
            }
            parsed
        }
    };

    let owner_exists =
        sqlx::query_scalar::<_, i64>("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
            .bind(user_id)
            .fetch_one(pool)
            .await?;
    if owner_exists == 0 {
        return Err(ApiError::NotFound("User"));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO reimbursement (amount, description, status, user_id)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(payload.amount)
    .bind(payload.description.trim())
    .bind(status.to_string())
    .bind(user_id)
    .execute(pool)
    .await?;

    let view = fetch_view(pool, result.last_insert_id())
        .await?
        .ok_or(ApiError::Internal)?;

    info!(id = view.id, user_id, "Reimbursement submitted");

    Ok(view)
}

/// Submit a reimbursement for the logged-in user
#[utoipa::path(
    post,
    path = "/reimbursements/user/self",
    request_body = CreateReimbursement,
    responses(
        (status = 201, description = "Created reimbursement", body = ReimbursementView),
        (status = 400, description = "Non-positive amount or blank description"),
        (status = 401, description = "Not logged in")
    ),
    security(("session_cookie" = [])),
    tag = "Reimbursements"
)]
pub async fn create_for_self(
    auth: AuthSession,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateReimbursement>,
) -> Result<HttpResponse, ApiError> {
    let view = insert_reimbursement(pool.get_ref(), &payload, auth.user.user_id).await?;
    Ok(HttpResponse::Created().json(view))
}

/// Submit a reimbursement for a named user (manager only)
#[utoipa::path(
    post,
    path = "/reimbursements/{user_id}",
    params(("user_id" = u64, Path, description = "Owner of the new reimbursement")),
    request_body = CreateReimbursement,
    responses(
        (status = 201, description = "Created reimbursement", body = ReimbursementView),
        (status = 400, description = "Non-positive amount or blank description"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Manager role required"),
        (status = 404, description = "User not found")
    ),
    security(("session_cookie" = [])),
    tag = "Reimbursements"
)]
pub async fn create_for_user(
    auth: AuthSession,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<CreateReimbursement>,
) -> Result<HttpResponse, ApiError> {
    auth.require_manager()?;

    let view = insert_reimbursement(pool.get_ref(), &payload, path.into_inner()).await?;
    Ok(HttpResponse::Created().json(view))
}

/// List the logged-in user's reimbursements
#[utoipa::path(
    get,
    path = "/reimbursements/user/self",
    responses(
        (status = 200, description = "Own reimbursements", body = [ReimbursementView]),
        (status = 401, description = "Not logged in")
    ),
    security(("session_cookie" = [])),
    tag = "Reimbursements"
)]
pub async fn list_own(
    auth: AuthSession,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    let views = fetch_views(pool.get_ref(), Some(auth.user.user_id), None).await?;
    Ok(HttpResponse::Ok().json(views))
}

/// List a user's reimbursements (self or manager)
#[utoipa::path(
    get,
    path = "/reimbursements/user/{user_id}",
    params(("user_id" = u64, Path, description = "Owner of the reimbursements")),
    responses(
        (status = 200, description = "The user's reimbursements", body = [ReimbursementView]),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Caller is neither the owner nor a manager")
    ),
    security(("session_cookie" = [])),
    tag = "Reimbursements"
)]
pub async fn list_for_user(
    auth: AuthSession,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    auth.require_self_or_manager(user_id)?;

    let views = fetch_views(pool.get_ref(), Some(user_id), None).await?;
    Ok(HttpResponse::Ok().json(views))
}

/// List all reimbursements (manager only)
#[utoipa::path(
    get,
    path = "/reimbursements/all",
    responses(
        (status = 200, description = "All reimbursements", body = [ReimbursementView]),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Manager role required")
    ),
    security(("session_cookie" = [])),
    tag = "Reimbursements"
)]
pub async fn list_all(
    auth: AuthSession,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    auth.require_manager()?;

    let views = fetch_views(pool.get_ref(), None, None).await?;
    Ok(HttpResponse::Ok().json(views))
}

/// List a user's pending reimbursements (self or manager)
#[utoipa::path(
    get,
    path = "/reimbursements/user/{user_id}/pending",
    params(("user_id" = u64, Path, description = "Owner of the reimbursements")),
    responses(
        (status = 200, description = "The user's pending reimbursements", body = [ReimbursementView]),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Caller is neither the owner nor a manager")
    ),
    security(("session_cookie" = [])),
    tag = "Reimbursements"
)]
pub async fn list_user_pending(
    auth: AuthSession,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    auth.require_self_or_manager(user_id)?;

    let views = fetch_views(
        pool.get_ref(),
        Some(user_id),
        Some(ReimbursementStatus::Pending),
    )
    .await?;
    Ok(HttpResponse::Ok().json(views))
}

/// List all pending reimbursements (manager only)
#[utoipa::path(
    get,
    path = "/reimbursements/pending",
    responses(
        (status = 200, description = "All pending reimbursements", body = [ReimbursementView]),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Manager role required")
    ),
    security(("session_cookie" = [])),
    tag = "Reimbursements"
)]
pub async fn list_pending(
    auth: AuthSession,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    auth.require_manager()?;

    let views = fetch_views(pool.get_ref(), None, Some(ReimbursementStatus::Pending)).await?;
    Ok(HttpResponse::Ok().json(views))
}

/// Resolve a pending reimbursement (manager only)
///
/// One-shot transition PENDING -> APPROVED or PENDING -> DENIED. The update
/// is guarded on the current status, so concurrent resolutions cannot both
/// win.
#[utoipa::path(
    patch,
    path = "/reimbursements/{id}/resolve",
    params(
        ("id" = u64, Path, description = "ID of the reimbursement to resolve"),
        ResolveQuery
    ),
    responses(
        (status = 200, description = "Resolved reimbursement", body = ReimbursementView),
        (status = 400, description = "Status is not APPROVED or DENIED"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Manager role required"),
        (status = 404, description = "Reimbursement not found"),
        (status = 409, description = "Reimbursement is no longer pending")
    ),
    security(("session_cookie" = [])),
    tag = "Reimbursements"
)]
pub async fn resolve(
    auth: AuthSession,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    query: web::Query<ResolveQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_manager()?;

    let id = path.into_inner();

    let status = query
        .status
        .parse::<ReimbursementStatus>()
        .ok()
        .filter(ReimbursementStatus::is_resolution)
        .ok_or_else(|| ApiError::Validation("Status must be 'APPROVED' or 'DENIED'".into()))?;

    let result = sqlx::query(
        r#"
        UPDATE reimbursement
        SET status = ?
        WHERE id = ?
          AND status = 'PENDING'
        "#,
    )
    .bind(status.to_string())
    .bind(id)
    .execute(pool.get_ref())
    .await?;

    if result.rows_affected() == 0 {
        // Classify: unknown id vs already resolved
        let current = sqlx::query_scalar::<_, String>("SELECT status FROM reimbursement WHERE id = ?")
            .bind(id)
            .fetch_optional(pool.get_ref())
            .await?;

        return match current {
            None => Err(ApiError::NotFound("Reimbursement")),
            Some(_) => Err(ApiError::InvalidState(
                "Only pending reimbursements can be resolved".into(),
            )),
        };
    }

    let view = fetch_view(pool.get_ref(), id)
        .await?
        .ok_or(ApiError::NotFound("Reimbursement"))?;

    info!(id, status = %status, resolver = auth.user.user_id, "Reimbursement resolved");

    Ok(HttpResponse::Ok().json(view))
}

/// Edit a pending reimbursement
///
/// Owners may edit their own pending reimbursements; managers may edit any
/// pending reimbursement. Absent fields keep their stored values.
#[utoipa::path(
    patch,
    path = "/reimbursements/{id}",
    params(("id" = u64, Path, description = "ID of the reimbursement to edit")),
    request_body = UpdateReimbursement,
    responses(
        (status = 200, description = "Updated reimbursement", body = ReimbursementView),
        (status = 400, description = "Non-positive amount or blank description"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Caller is neither the owner nor a manager"),
        (status = 404, description = "Reimbursement not found"),
        (status = 409, description = "Reimbursement is no longer pending")
    ),
    security(("session_cookie" = [])),
    tag = "Reimbursements"
)]
pub async fn update(
    auth: AuthSession,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateReimbursement>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    let existing = fetch_view(pool.get_ref(), id)
        .await?
        .ok_or(ApiError::NotFound("Reimbursement"))?;

    if !auth.is_manager() && existing.user.user_id != auth.user.user_id {
        return Err(ApiError::Forbidden);
    }

    if existing.status != ReimbursementStatus::Pending.to_string() {
        return Err(ApiError::InvalidState(
            "Only pending reimbursements can be edited".into(),
        ));
    }

    let amount = match payload.amount {
        Some(amount) if amount <= 0.0 => {
            return Err(ApiError::Validation(
                "Amount must be greater than zero".into(),
            ));
        }
        Some(amount) => amount,
        None => existing.amount,
    };

    let description = match payload.description.as_deref() {
        Some(d) if d.trim().is_empty() => {
            return Err(ApiError::Validation("Description cannot be blank".into()));
        }
        Some(d) => d.trim().to_owned(),
        None => existing.description.clone(),
    };

    // Guarded on status again in case a resolve landed in between
    let result = sqlx::query(
        r#"
        UPDATE reimbursement
        SET amount = ?, description = ?
        WHERE id = ?
          AND status = 'PENDING'
        "#,
    )
    .bind(amount)
    .bind(&description)
    .bind(id)
    .execute(pool.get_ref())
    .await?;

    if result.rows_affected() == 0 && (amount != existing.amount || description != existing.description)
    {
        return Err(ApiError::InvalidState(
            "Only pending reimbursements can be edited".into(),
        ));
    }

    let view = fetch_view(pool.get_ref(), id)
        .await?
        .ok_or(ApiError::NotFound("Reimbursement"))?;

    Ok(HttpResponse::Ok().json(view))
}
