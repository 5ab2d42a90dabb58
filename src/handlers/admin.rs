use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::errors::AppResult;
use crate::handlers::blocking;
use crate::handlers::extract::{CurrentUser, ValidatedJson};
use crate::models::Profile;
use crate::services::access;
use crate::services::accounts::{self, NewAccount};
use crate::state::AppState;

// GET /api/admin/staff
pub async fn list_staff(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<Profile>>> {
    let admin = access::require_admin(&user)?;
    let db = state.db()?;
    Ok(Json(accounts::list_staff(&db, &admin)?))
}

// POST /api/admin/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(account): ValidatedJson<NewAccount>,
) -> AppResult<Json<Profile>> {
    let admin = access::require_admin(&user)?;
    accounts::check_managed_role(account.role)?;

    let cost = state.config.bcrypt_cost;
    let NewAccount { registration, role } = account;
    let hashed = blocking(move || registration.into_hashed(cost)).await?;

    let db = state.db()?;
    Ok(Json(accounts::create_managed_account(&db, &admin, role, hashed)?))
}
