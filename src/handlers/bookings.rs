use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::errors::{AppError, AppResult};
use crate::handlers::extract::{AppJson, CurrentUser};
use crate::models::{BookingStatus, BookingView};
use crate::services::access;
use crate::services::booking::{self, NewBooking};
use crate::state::AppState;

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    AppJson(req): AppJson<NewBooking>,
) -> AppResult<Json<BookingView>> {
    let now = Utc::now().naive_utc();
    let db = state.db()?;
    Ok(Json(booking::create_booking(&db, &user, &req, now)?))
}

// GET /api/bookings/my-bookings
pub async fn my_bookings(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<BookingView>>> {
    let db = state.db()?;
    Ok(Json(booking::customer_bookings(&db, &user)?))
}

// GET /api/bookings?status=
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<BookingsQuery>,
) -> AppResult<Json<Vec<BookingView>>> {
    let office = access::require_back_office(&user)?;
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(BookingStatus::parse(raw).ok_or_else(|| {
            AppError::InvalidArgument(format!("unknown booking status: {raw}"))
        })?),
    };
    let db = state.db()?;
    Ok(Json(booking::list_bookings(&db, &office, status)?))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<BookingView>> {
    let db = state.db()?;
    Ok(Json(booking::get_booking(&db, &user, &id)?))
}

// PUT /api/bookings/:id/status
#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: BookingStatus,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateStatusRequest>,
) -> AppResult<Json<BookingView>> {
    let staff = access::require_staff(&user)?;
    let db = state.db()?;
    Ok(Json(booking::update_status(&db, &staff, &id, req.status)?))
}

// POST /api/bookings/:id/rate
#[derive(Deserialize)]
pub struct RateRequest {
    pub rating: i32,
    pub review: Option<String>,
}

pub async fn rate_booking(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    AppJson(req): AppJson<RateRequest>,
) -> AppResult<Json<BookingView>> {
    let db = state.db()?;
    Ok(Json(booking::rate_booking(
        &db,
        &user,
        &id,
        req.rating,
        req.review.as_deref(),
    )?))
}

// PUT /api/bookings/:id/assign
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub staff_id: String,
}

pub async fn assign_staff(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    AppJson(req): AppJson<AssignRequest>,
) -> AppResult<Json<BookingView>> {
    let admin = access::require_admin(&user)?;
    let db = state.db()?;
    Ok(Json(booking::assign_staff(&db, &admin, &id, &req.staff_id)?))
}
