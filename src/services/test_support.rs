//! Fixtures shared by the service-level unit tests.

use chrono::{NaiveDateTime, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::db::{self, queries};
use crate::models::{Role, Service, User, Vehicle, VehicleType};

pub fn setup_db() -> Connection {
    db::init_db(":memory:").unwrap()
}

pub fn dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
}

pub fn seed_user(conn: &Connection, id: &str, role: Role) -> User {
    let user = User {
        id: id.to_string(),
        email: format!("{id}@example.com"),
        password_hash: crate::services::auth::hash_password("password123", 4).unwrap(),
        full_name: format!("User {id}"),
        phone_number: None,
        role,
        active: true,
        created_at: Utc::now().naive_utc(),
    };
    queries::insert_user(conn, &user).unwrap();
    user
}

pub fn seed_vehicle(conn: &Connection, id: &str, owner: &User) -> Vehicle {
    let vehicle = Vehicle {
        id: id.to_string(),
        make: "Toyota".to_string(),
        model: "Camry".to_string(),
        license_plate: format!("PLATE-{id}"),
        color: "Blue".to_string(),
        vehicle_type: VehicleType::Sedan,
        owner_id: owner.id.clone(),
        created_at: Utc::now().naive_utc(),
    };
    queries::insert_vehicle(conn, &vehicle).unwrap();
    vehicle
}

pub fn seed_service(conn: &Connection, id: &str, price: i64, duration_minutes: i32) -> Service {
    let now = Utc::now().naive_utc();
    let service = Service {
        id: id.to_string(),
        name: format!("Wash {id}"),
        description: Some("Exterior wash".to_string()),
        price: Decimal::new(price, 0),
        duration_minutes,
        active: true,
        created_at: now,
        updated_at: now,
    };
    queries::insert_service(conn, &service).unwrap();
    service
}
