use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use crate::errors::AppResult;
use crate::handlers::extract::{CurrentUser, ValidatedJson};
use crate::models::Vehicle;
use crate::services::vehicles::{self, NewVehicle};
use crate::state::AppState;

// GET /api/vehicles
pub async fn list_vehicles(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<Vehicle>>> {
    let db = state.db()?;
    Ok(Json(vehicles::my_vehicles(&db, &user)?))
}

// GET /api/vehicles/:id
pub async fn get_vehicle(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Vehicle>> {
    let db = state.db()?;
    Ok(Json(vehicles::get_vehicle(&db, &user, &id)?))
}

// POST /api/vehicles
pub async fn add_vehicle(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(new): ValidatedJson<NewVehicle>,
) -> AppResult<Json<Vehicle>> {
    let db = state.db()?;
    Ok(Json(vehicles::add_vehicle(&db, &user, new)?))
}

// DELETE /api/vehicles/:id
pub async fn delete_vehicle(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let db = state.db()?;
    vehicles::delete_vehicle(&db, &user, &id)?;
    Ok(Json(serde_json::json!({ "message": "vehicle deleted" })))
}
