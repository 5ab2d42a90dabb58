use chrono::Utc;
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::{User, Vehicle, VehicleType};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewVehicle {
    #[validate(length(min = 1, message = "make is required"))]
    pub make: String,
    #[validate(length(min = 1, message = "model is required"))]
    pub model: String,
    #[validate(length(min = 1, message = "license plate is required"))]
    pub license_plate: String,
    #[validate(length(min = 1, message = "color is required"))]
    pub color: String,
    #[serde(rename = "type")]
    pub vehicle_type: VehicleType,
}

pub fn add_vehicle(conn: &Connection, owner: &User, new: NewVehicle) -> AppResult<Vehicle> {
    let vehicle = Vehicle {
        id: Uuid::new_v4().to_string(),
        make: new.make.trim().to_string(),
        model: new.model.trim().to_string(),
        license_plate: new.license_plate.trim().to_uppercase(),
        color: new.color.trim().to_string(),
        vehicle_type: new.vehicle_type,
        owner_id: owner.id.clone(),
        created_at: Utc::now().naive_utc(),
    };

    if [&vehicle.make, &vehicle.model, &vehicle.license_plate, &vehicle.color]
        .iter()
        .any(|field| field.is_empty())
    {
        return Err(AppError::InvalidArgument(
            "make, model, license plate and color are required".to_string(),
        ));
    }

    queries::insert_vehicle(conn, &vehicle)?;
    tracing::info!(vehicle_id = %vehicle.id, owner_id = %owner.id, "vehicle added");
    Ok(vehicle)
}

pub fn my_vehicles(conn: &Connection, owner: &User) -> AppResult<Vec<Vehicle>> {
    Ok(queries::list_vehicles_for_user(conn, &owner.id)?)
}

fn owned_vehicle(conn: &Connection, caller: &User, id: &str, denied: &str) -> AppResult<Vehicle> {
    let vehicle = queries::get_vehicle_by_id(conn, id)?
        .ok_or_else(|| AppError::NotFound("vehicle not found".to_string()))?;
    if !vehicle.is_owned_by(&caller.id) {
        return Err(AppError::Forbidden(denied.to_string()));
    }
    Ok(vehicle)
}

pub fn get_vehicle(conn: &Connection, caller: &User, id: &str) -> AppResult<Vehicle> {
    owned_vehicle(conn, caller, id, "vehicle does not belong to you")
}

/// Owner-only hard delete. Refused while bookings still reference the
/// vehicle, since those must keep resolving.
pub fn delete_vehicle(conn: &Connection, caller: &User, id: &str) -> AppResult<()> {
    let vehicle = owned_vehicle(conn, caller, id, "you can only delete your own vehicles")?;

    if queries::count_bookings_for_vehicle(conn, &vehicle.id)? > 0 {
        return Err(AppError::Conflict(
            "vehicle has bookings and cannot be deleted".to_string(),
        ));
    }

    queries::delete_vehicle(conn, &vehicle.id)?;
    tracing::info!(vehicle_id = %vehicle.id, owner_id = %caller.id, "vehicle deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::services::booking::{create_booking, NewBooking};
    use crate::services::test_support::{dt, seed_service, seed_user, setup_db};

    fn civic() -> NewVehicle {
        NewVehicle {
            make: "Honda".to_string(),
            model: "Civic".to_string(),
            license_plate: " abc-123 ".to_string(),
            color: "Red".to_string(),
            vehicle_type: VehicleType::Sedan,
        }
    }

    #[test]
    fn test_add_and_list() {
        let conn = setup_db();
        let alice = seed_user(&conn, "alice", Role::Customer);
        let bob = seed_user(&conn, "bob", Role::Customer);

        let added = add_vehicle(&conn, &alice, civic()).unwrap();
        assert_eq!(added.license_plate, "ABC-123");

        assert_eq!(my_vehicles(&conn, &alice).unwrap().len(), 1);
        assert!(my_vehicles(&conn, &bob).unwrap().is_empty());
    }

    #[test]
    fn test_blank_fields_rejected() {
        let conn = setup_db();
        let alice = seed_user(&conn, "alice", Role::Customer);
        let mut blank = civic();
        blank.color = "  ".to_string();

        let err = add_vehicle(&conn, &alice, blank).unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[test]
    fn test_only_owner_reads_or_deletes() {
        let conn = setup_db();
        let alice = seed_user(&conn, "alice", Role::Customer);
        let bob = seed_user(&conn, "bob", Role::Customer);
        let car = add_vehicle(&conn, &alice, civic()).unwrap();

        assert!(matches!(get_vehicle(&conn, &bob, &car.id), Err(AppError::Forbidden(_))));
        assert!(matches!(
            delete_vehicle(&conn, &bob, &car.id),
            Err(AppError::Forbidden(_))
        ));

        delete_vehicle(&conn, &alice, &car.id).unwrap();
        assert!(matches!(
            get_vehicle(&conn, &alice, &car.id),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_vehicle_with_bookings_not_deleted() {
        let conn = setup_db();
        let alice = seed_user(&conn, "alice", Role::Customer);
        seed_service(&conn, "s1", 10, 30);
        let car = add_vehicle(&conn, &alice, civic()).unwrap();

        let req = NewBooking {
            service_id: "s1".to_string(),
            vehicle_id: car.id.clone(),
            booking_date_time: dt("2030-01-02 10:00"),
            notes: None,
        };
        create_booking(&conn, &alice, &req, dt("2030-01-01 08:00")).unwrap();

        let err = delete_vehicle(&conn, &alice, &car.id).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
