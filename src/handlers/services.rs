use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppResult;
use crate::handlers::extract::{AppJson, CurrentUser};
use crate::models::Service;
use crate::services::access;
use crate::services::catalog::{self, NewService, ServiceChanges};
use crate::state::AppState;

// GET /api/services
pub async fn list_services(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Service>>> {
    let db = state.db()?;
    Ok(Json(catalog::active_services(&db)?))
}

// GET /api/services/search?q=
#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn search_services(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<Service>>> {
    let db = state.db()?;
    Ok(Json(catalog::search_services(&db, &query.q)?))
}

// GET /api/services/:id
pub async fn get_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Service>> {
    let db = state.db()?;
    Ok(Json(catalog::public_service(&db, &id)?))
}

// POST /api/services
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    AppJson(new): AppJson<NewService>,
) -> AppResult<Json<Service>> {
    let admin = access::require_admin(&user)?;
    let db = state.db()?;
    Ok(Json(catalog::create_service(&db, &admin, new)?))
}

// PUT /api/services/:id
pub async fn update_service(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    AppJson(changes): AppJson<ServiceChanges>,
) -> AppResult<Json<Service>> {
    let admin = access::require_admin(&user)?;
    let db = state.db()?;
    Ok(Json(catalog::update_service(&db, &admin, &id, changes)?))
}

// DELETE /api/services/:id
pub async fn deactivate_service(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let admin = access::require_admin(&user)?;
    let db = state.db()?;
    catalog::deactivate_service(&db, &admin, &id)?;
    Ok(Json(serde_json::json!({ "message": "service deactivated" })))
}
