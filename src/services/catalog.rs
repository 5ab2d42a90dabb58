use std::borrow::Cow;

use chrono::Utc;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::Service;
use crate::services::access::AdminAccess;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewService {
    #[serde(default)]
    #[validate(custom(function = "non_blank_name"))]
    pub name: String,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    // At most one day.
    #[validate(range(
        min = 1,
        max = 1440,
        message = "service duration must be between 1 and 1440 minutes"
    ))]
    pub duration_minutes: Option<i32>,
}

/// Partial update: `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ServiceChanges {
    #[validate(custom(function = "non_blank_name"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    #[validate(range(
        min = 1,
        max = 1440,
        message = "service duration must be between 1 and 1440 minutes"
    ))]
    pub duration_minutes: Option<i32>,
}

fn non_blank_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some(Cow::Borrowed("service name is required"));
        return Err(err);
    }
    Ok(())
}

// validator has no range rule for Decimal.
fn check_price(price: Option<Decimal>) -> AppResult<Decimal> {
    match price {
        Some(p) if p > Decimal::ZERO => Ok(p),
        _ => Err(AppError::InvalidArgument(
            "service price must be greater than 0".to_string(),
        )),
    }
}

pub fn active_services(conn: &Connection) -> AppResult<Vec<Service>> {
    Ok(queries::list_active_services(conn)?)
}

pub fn search_services(conn: &Connection, keyword: &str) -> AppResult<Vec<Service>> {
    Ok(queries::search_active_services(conn, keyword.trim())?)
}

/// Public lookup. Deactivated services read as missing.
pub fn public_service(conn: &Connection, id: &str) -> AppResult<Service> {
    queries::get_service_by_id(conn, id)?
        .filter(|s| s.active)
        .ok_or_else(|| AppError::NotFound(format!("service not found with id: {id}")))
}

pub fn create_service(
    conn: &Connection,
    access: &AdminAccess,
    new: NewService,
) -> AppResult<Service> {
    new.validate()?;
    let price = check_price(new.price)?;
    let duration_minutes = new.duration_minutes.ok_or_else(|| {
        AppError::InvalidArgument("service duration is required".to_string())
    })?;

    let now = Utc::now().naive_utc();
    let service = Service {
        id: Uuid::new_v4().to_string(),
        name: new.name.trim().to_string(),
        description: new.description,
        price,
        duration_minutes,
        active: true,
        created_at: now,
        updated_at: now,
    };
    queries::insert_service(conn, &service)?;

    tracing::info!(service_id = %service.id, admin_id = %access.admin_id(), "service created");
    Ok(service)
}

pub fn update_service(
    conn: &Connection,
    access: &AdminAccess,
    id: &str,
    changes: ServiceChanges,
) -> AppResult<Service> {
    changes.validate()?;
    let mut service = queries::get_service_by_id(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("service not found with id: {id}")))?;

    if let Some(name) = changes.name {
        service.name = name.trim().to_string();
    }
    if let Some(description) = changes.description {
        service.description = Some(description);
    }
    if changes.price.is_some() {
        service.price = check_price(changes.price)?;
    }
    if let Some(minutes) = changes.duration_minutes {
        service.duration_minutes = minutes;
    }

    queries::update_service(conn, &service)?;
    tracing::info!(service_id = %id, admin_id = %access.admin_id(), "service updated");

    queries::get_service_by_id(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("service not found with id: {id}")))
}

/// Soft delete. Bookings keep pointing at the row.
pub fn deactivate_service(conn: &Connection, access: &AdminAccess, id: &str) -> AppResult<()> {
    if !queries::set_service_active(conn, id, false)? {
        return Err(AppError::NotFound(format!("service not found with id: {id}")));
    }
    tracing::info!(service_id = %id, admin_id = %access.admin_id(), "service deactivated");
    Ok(())
}
