use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Accepted role set. Stored in the `role` column as its lowercase name.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Employee,
    Manager,
}

/// Full user row, fetched only where the password hash is needed (login).
#[derive(Debug, FromRow)]
pub struct UserAuthRow {
    pub id: u64,
    pub username: String,
    pub password: String,
    pub role: String,
}

/// User record as returned by the API. Never carries the password column.
#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Alice", value_type = Option<String>)]
    pub first_name: Option<String>,
    #[schema(example = "Smith", value_type = Option<String>)]
    pub last_name: Option<String>,
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "employee")]
    pub role: String,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = Option<String>)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Public identity view: what login and the session endpoint expose.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    #[schema(example = 1)]
    pub user_id: u64,
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "employee")]
    pub role: Role,
}
