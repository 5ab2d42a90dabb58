use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::booking::wire_datetime;
use crate::models::{Booking, BookingStatus, BookingView, Role, User};
use crate::services::access::{AdminAccess, BackOfficeAccess, StaffAccess};

/// Minutes kept free on either side of a booking.
pub const SLOT_BUFFER_MINUTES: i64 = 30;

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub service_id: String,
    pub vehicle_id: String,
    #[serde(with = "wire_datetime")]
    pub booking_date_time: NaiveDateTime,
    pub notes: Option<String>,
}

/// Stored datetimes compare as text, which only orders correctly for
/// four-digit years.
fn latest_storable() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .unwrap_or(NaiveDateTime::MAX)
}

/// The span in which any existing booking blocks a request at `start` for a
/// service lasting `duration_minutes`. `None` when the span leaves the
/// storable range.
pub fn conflict_window(
    start: NaiveDateTime,
    duration_minutes: i32,
) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let buffer = Duration::minutes(SLOT_BUFFER_MINUTES);
    let window_start = start.checked_sub_signed(buffer)?;
    let window_end = start
        .checked_add_signed(Duration::minutes(duration_minutes as i64))?
        .checked_add_signed(buffer)?;
    (window_end <= latest_storable()).then_some((window_start, window_end))
}

/// Books `req` for `customer`. `now` is the instant the request is judged
/// against for the future-time check.
///
/// The slot check and the insert are separate statements with no
/// transaction around them; two writers on the same database file can both
/// pass the check.
pub fn create_booking(
    conn: &Connection,
    customer: &User,
    req: &NewBooking,
    now: NaiveDateTime,
) -> AppResult<BookingView> {
    let service = queries::get_service_by_id(conn, &req.service_id)?.ok_or_else(|| {
        AppError::NotFound(format!("service not found with id: {}", req.service_id))
    })?;

    let vehicle = queries::get_vehicle_by_id(conn, &req.vehicle_id)?
        .ok_or_else(|| AppError::NotFound("vehicle not found".to_string()))?;

    if !vehicle.is_owned_by(&customer.id) {
        return Err(AppError::Forbidden(
            "vehicle does not belong to you".to_string(),
        ));
    }

    if req.booking_date_time <= now {
        return Err(AppError::InvalidArgument(
            "booking time must be in the future".to_string(),
        ));
    }

    let (window_start, window_end) =
        conflict_window(req.booking_date_time, service.duration_minutes).ok_or_else(|| {
            AppError::InvalidArgument("booking time is too far in the future".to_string())
        })?;
    let existing = queries::get_bookings_in_range(conn, &window_start, &window_end)?;
    if !existing.is_empty() {
        tracing::info!(
            requested = %req.booking_date_time,
            blocking = existing.len(),
            "booking rejected: slot taken"
        );
        return Err(AppError::Conflict("time slot not available".to_string()));
    }

    let created_at = Utc::now().naive_utc();
    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        customer_id: customer.id.clone(),
        service_id: service.id,
        vehicle_id: vehicle.id,
        date_time: req.booking_date_time,
        status: BookingStatus::Pending,
        notes: req.notes.clone().filter(|n| !n.trim().is_empty()),
        rating: None,
        review: None,
        assigned_staff_id: None,
        created_at,
        updated_at: created_at,
    };
    queries::insert_booking(conn, &booking)?;

    tracing::info!(booking_id = %booking.id, customer_id = %customer.id, "booking created");

    load_view(conn, &booking.id)
}

pub fn customer_bookings(conn: &Connection, customer: &User) -> AppResult<Vec<BookingView>> {
    Ok(queries::list_booking_views_for_customer(conn, &customer.id)?)
}

/// Customers see only their own bookings; staff and admins see all.
pub fn get_booking(conn: &Connection, caller: &User, id: &str) -> AppResult<BookingView> {
    let view = load_view(conn, id)?;
    if caller.role == Role::Customer && view.customer_id != caller.id {
        return Err(AppError::Forbidden("access denied".to_string()));
    }
    Ok(view)
}

pub fn list_bookings(
    conn: &Connection,
    access: &BackOfficeAccess,
    status: Option<BookingStatus>,
) -> AppResult<Vec<BookingView>> {
    tracing::debug!(user_id = %access.user_id(), status = ?status, "listing bookings");
    Ok(queries::list_booking_views(conn, status)?)
}

/// Any status may follow any other; staff have unrestricted override.
pub fn update_status(
    conn: &Connection,
    access: &StaffAccess,
    id: &str,
    status: BookingStatus,
) -> AppResult<BookingView> {
    if !queries::update_booking_status(conn, id, status)? {
        return Err(not_found());
    }

    tracing::info!(booking_id = %id, status = status.as_str(), staff_id = %access.staff_id(), "booking status updated");

    load_view(conn, id)
}

pub fn rate_booking(
    conn: &Connection,
    customer: &User,
    id: &str,
    rating: i32,
    review: Option<&str>,
) -> AppResult<BookingView> {
    let booking = queries::get_booking_by_id(conn, id)?.ok_or_else(not_found)?;

    if booking.customer_id != customer.id {
        return Err(AppError::Forbidden(
            "you can only rate your own bookings".to_string(),
        ));
    }

    if booking.status != BookingStatus::Completed {
        return Err(AppError::InvalidState(
            "you can only rate completed bookings".to_string(),
        ));
    }

    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(AppError::InvalidArgument(format!(
            "rating must be between {MIN_RATING} and {MAX_RATING}"
        )));
    }

    queries::update_booking_rating(conn, id, rating, review)?;
    load_view(conn, id)
}

pub fn assign_staff(
    conn: &Connection,
    access: &AdminAccess,
    booking_id: &str,
    staff_id: &str,
) -> AppResult<BookingView> {
    queries::get_booking_by_id(conn, booking_id)?.ok_or_else(not_found)?;

    let staff = queries::get_user_by_id(conn, staff_id)?
        .ok_or_else(|| AppError::NotFound("staff member not found".to_string()))?;
    if staff.role != Role::Staff {
        return Err(AppError::InvalidArgument(
            "user is not a staff member".to_string(),
        ));
    }

    queries::assign_booking_staff(conn, booking_id, &staff.id)?;
    tracing::info!(booking_id = %booking_id, staff_id = %staff.id, admin_id = %access.admin_id(), "staff assigned");

    load_view(conn, booking_id)
}

fn load_view(conn: &Connection, id: &str) -> AppResult<BookingView> {
    queries::get_booking_view(conn, id)?.ok_or_else(not_found)
}

fn not_found() -> AppError {
    AppError::NotFound("booking not found".to_string())
}
