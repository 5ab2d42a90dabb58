use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::errors::AppResult;
use crate::handlers::blocking;
use crate::handlers::extract::{CurrentUser, ValidatedJson};
use crate::models::Profile;
use crate::services::accounts::{self, PasswordChange, ProfileChanges};
use crate::state::AppState;

// GET /api/users/profile
pub async fn get_profile(CurrentUser(user): CurrentUser) -> Json<Profile> {
    Json(Profile::from(&user))
}

// PUT /api/users/profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(changes): ValidatedJson<ProfileChanges>,
) -> AppResult<Json<Profile>> {
    let db = state.db()?;
    Ok(Json(accounts::update_profile(&db, &user, changes)?))
}

// POST /api/users/change-password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(change): ValidatedJson<PasswordChange>,
) -> AppResult<Json<serde_json::Value>> {
    let cost = state.config.bcrypt_cost;
    let (user, hash) = blocking(move || {
        let hash = accounts::hash_password_change(&user, &change, cost)?;
        Ok((user, hash))
    })
    .await?;

    let db = state.db()?;
    accounts::store_password(&db, &user, &hash)?;
    Ok(Json(serde_json::json!({ "message": "password changed" })))
}
