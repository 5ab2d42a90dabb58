use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::errors::AppResult;
use crate::handlers::blocking;
use crate::handlers::extract::{AppJson, ValidatedJson};
use crate::services::accounts::{self, Credentials, LoginResponse, Registration};
use crate::state::AppState;

// POST /api/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(registration): ValidatedJson<Registration>,
) -> AppResult<Json<LoginResponse>> {
    let cost = state.config.bcrypt_cost;
    let hashed = blocking(move || registration.into_hashed(cost)).await?;

    let db = state.db()?;
    Ok(Json(accounts::register(&db, &state.tokens, hashed)?))
}

// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(credentials): AppJson<Credentials>,
) -> AppResult<Json<LoginResponse>> {
    let user = {
        let db = state.db()?;
        accounts::find_login_account(&db, &credentials.email)?
    };

    let response = blocking(move || {
        accounts::authenticate(&state.tokens, &user, &credentials.password)
    })
    .await?;
    Ok(Json(response))
}
