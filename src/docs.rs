use crate::api::reimbursement::{CreateReimbursement, UpdateReimbursement};
use crate::api::user::RegisterUser;
use crate::auth::handlers::LoginDto;
use crate::model::reimbursement::{ReimbursementStatus, ReimbursementView};
use crate::model::user::{Role, UserRecord, UserView};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Expense Reimbursement API",
        version = "1.0.0",
        description = r#"
## Employee Expense Reimbursement Service

Users submit expense reimbursement requests; managers approve or deny them.

### Key Features
- **Users**: register, list, delete (cascades owned reimbursements), change role
- **Reimbursements**: submit, list (own / per-user / all / pending), edit while pending, resolve
- **Auth**: cookie-backed server-side sessions with role-gated endpoints

### Security
Protected endpoints require the `session` cookie issued by `POST /auth`.
Admin-only endpoints additionally require the **manager** role.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::session,
        crate::auth::handlers::logout,

        crate::api::user::register,
        crate::api::user::list_users,
        crate::api::user::delete_user,
        crate::api::user::update_role,

        crate::api::reimbursement::create_for_self,
        crate::api::reimbursement::create_for_user,
        crate::api::reimbursement::list_own,
        crate::api::reimbursement::list_for_user,
        crate::api::reimbursement::list_all,
        crate::api::reimbursement::list_user_pending,
        crate::api::reimbursement::list_pending,
        crate::api::reimbursement::resolve,
        crate::api::reimbursement::update,
    ),
    components(
        schemas(
            LoginDto,
            RegisterUser,
            UserRecord,
            UserView,
            Role,
            CreateReimbursement,
            UpdateReimbursement,
            ReimbursementView,
            ReimbursementStatus,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, logout and session lookup"),
        (name = "Users", description = "User registration and administration"),
        (name = "Reimbursements", description = "Reimbursement submission and approval workflow")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("session"))),
            );
        }
    }
}
