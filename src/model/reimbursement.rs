use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::model::user::UserView;

/// Reimbursement lifecycle. Starts PENDING; APPROVED and DENIED are terminal.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReimbursementStatus {
    Pending,
    Approved,
    Denied,
}

impl ReimbursementStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, ReimbursementStatus::Pending)
    }

    /// Valid targets for the one-shot resolve transition.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            ReimbursementStatus::Approved | ReimbursementStatus::Denied
        )
    }
}

/// Flat row from the reimbursement/users join.
#[derive(Debug, FromRow)]
pub struct ReimbursementRow {
    pub id: u64,
    pub amount: f64,
    pub description: String,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    pub user_id: u64,
    pub username: String,
    pub user_role: String,
}

/// Reimbursement as returned by the API, owner embedded.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReimbursementView {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 50.0)]
    pub amount: f64,
    #[schema(example = "lunch")]
    pub description: String,
    #[schema(example = "PENDING")]
    pub status: String,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = Option<String>)]
    pub created_at: Option<DateTime<Utc>>,
    pub user: UserView,
}

impl From<ReimbursementRow> for ReimbursementView {
    fn from(row: ReimbursementRow) -> Self {
        let role = row
            .user_role
            .parse()
            .unwrap_or(crate::model::user::Role::Employee);

        ReimbursementView {
            id: row.id,
            amount: row.amount,
            description: row.description,
            status: row.status,
            created_at: row.created_at,
            user: UserView {
                user_id: row.user_id,
                username: row.username,
                role,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!(
            "approved".parse::<ReimbursementStatus>().unwrap(),
            ReimbursementStatus::Approved
        );
        assert_eq!(
            "DENIED".parse::<ReimbursementStatus>().unwrap(),
            ReimbursementStatus::Denied
        );
        assert_eq!(
            "Pending".parse::<ReimbursementStatus>().unwrap(),
            ReimbursementStatus::Pending
        );
        assert!("resolved".parse::<ReimbursementStatus>().is_err());
    }

    #[test]
    fn stored_form_is_uppercase() {
        assert_eq!(ReimbursementStatus::Pending.to_string(), "PENDING");
        assert_eq!(ReimbursementStatus::Approved.to_string(), "APPROVED");
        assert_eq!(ReimbursementStatus::Denied.to_string(), "DENIED");
    }

    #[test]
    fn only_approved_and_denied_are_resolutions() {
        assert!(ReimbursementStatus::Approved.is_resolution());
        assert!(ReimbursementStatus::Denied.is_resolution());
        assert!(!ReimbursementStatus::Pending.is_resolution());
    }
}
