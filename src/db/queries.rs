use anyhow::Context;
use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;

use crate::models::{
    Booking, BookingStatus, BookingView, Role, Service, ServiceSummary, User, Vehicle,
    VehicleSummary, VehicleType,
};

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn format_dt(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

fn parse_dt(raw: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT)
        .with_context(|| format!("malformed stored datetime: {raw}"))
}

fn now_str() -> String {
    format_dt(&Utc::now().naive_utc())
}

// ── Users ──

const USER_COLUMNS: &str =
    "id, email, password_hash, full_name, phone_number, role, active, created_at";

pub fn insert_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users (id, email, password_hash, full_name, phone_number, role, active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            user.id,
            user.email,
            user.password_hash,
            user.full_name,
            user.phone_number,
            user.role.as_str(),
            user.active,
            format_dt(&user.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<User>> {
    let result = conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        |row| Ok(parse_user_row(row)),
    );

    match result {
        Ok(user) => Ok(Some(user?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> anyhow::Result<Option<User>> {
    let result = conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 COLLATE NOCASE"),
        params![email],
        |row| Ok(parse_user_row(row)),
    );

    match result {
        Ok(user) => Ok(Some(user?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn email_exists(conn: &Connection, email: &str) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE email = ?1 COLLATE NOCASE",
        params![email],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Whether `phone` belongs to an account other than `except_user_id`.
pub fn phone_taken(
    conn: &Connection,
    phone: &str,
    except_user_id: Option<&str>,
) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE phone_number = ?1 AND id != COALESCE(?2, '')",
        params![phone, except_user_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn update_user_profile(
    conn: &Connection,
    id: &str,
    full_name: &str,
    phone_number: Option<&str>,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE users SET full_name = ?1, phone_number = ?2 WHERE id = ?3",
        params![full_name, phone_number, id],
    )?;
    Ok(count > 0)
}

pub fn update_password_hash(conn: &Connection, id: &str, hash: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE users SET password_hash = ?1 WHERE id = ?2",
        params![hash, id],
    )?;
    Ok(count > 0)
}

pub fn list_users_by_role(conn: &Connection, role: Role) -> anyhow::Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE role = ?1 ORDER BY full_name ASC"
    ))?;

    let rows = stmt.query_map(params![role.as_str()], |row| Ok(parse_user_row(row)))?;

    let mut users = vec![];
    for row in rows {
        users.push(row??);
    }
    Ok(users)
}

fn parse_user_row(row: &rusqlite::Row) -> anyhow::Result<User> {
    let role_str: String = row.get(5)?;
    let created_at_str: String = row.get(7)?;

    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        full_name: row.get(3)?,
        phone_number: row.get(4)?,
        role: Role::parse(&role_str)
            .with_context(|| format!("unknown role in users table: {role_str}"))?,
        active: row.get(6)?,
        created_at: parse_dt(&created_at_str)?,
    })
}

// ── Vehicles ──

const VEHICLE_COLUMNS: &str =
    "id, make, model, license_plate, color, vehicle_type, user_id, created_at";

pub fn insert_vehicle(conn: &Connection, vehicle: &Vehicle) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO vehicles (id, make, model, license_plate, color, vehicle_type, user_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            vehicle.id,
            vehicle.make,
            vehicle.model,
            vehicle.license_plate,
            vehicle.color,
            vehicle.vehicle_type.as_str(),
            vehicle.owner_id,
            format_dt(&vehicle.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_vehicle_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Vehicle>> {
    let result = conn.query_row(
        &format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = ?1"),
        params![id],
        |row| Ok(parse_vehicle_row(row)),
    );

    match result {
        Ok(vehicle) => Ok(Some(vehicle?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_vehicles_for_user(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<Vehicle>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE user_id = ?1 ORDER BY created_at ASC"
    ))?;

    let rows = stmt.query_map(params![user_id], |row| Ok(parse_vehicle_row(row)))?;

    let mut vehicles = vec![];
    for row in rows {
        vehicles.push(row??);
    }
    Ok(vehicles)
}

pub fn delete_vehicle(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM vehicles WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn count_bookings_for_vehicle(conn: &Connection, vehicle_id: &str) -> anyhow::Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE vehicle_id = ?1",
        params![vehicle_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn parse_vehicle_row(row: &rusqlite::Row) -> anyhow::Result<Vehicle> {
    let type_str: String = row.get(5)?;
    let created_at_str: String = row.get(7)?;

    Ok(Vehicle {
        id: row.get(0)?,
        make: row.get(1)?,
        model: row.get(2)?,
        license_plate: row.get(3)?,
        color: row.get(4)?,
        vehicle_type: VehicleType::parse(&type_str)
            .with_context(|| format!("unknown vehicle type: {type_str}"))?,
        owner_id: row.get(6)?,
        created_at: parse_dt(&created_at_str)?,
    })
}

// ── Services ──

const SERVICE_COLUMNS: &str =
    "id, name, description, price, duration_minutes, active, created_at, updated_at";

pub fn insert_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, name, description, price, duration_minutes, active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            service.id,
            service.name,
            service.description,
            service.price.to_string(),
            service.duration_minutes,
            service.active,
            format_dt(&service.created_at),
            format_dt(&service.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_service_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Service>> {
    let result = conn.query_row(
        &format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?1"),
        params![id],
        |row| Ok(parse_service_row(row)),
    );

    match result {
        Ok(service) => Ok(Some(service?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_active_services(conn: &Connection) -> anyhow::Result<Vec<Service>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SERVICE_COLUMNS} FROM services WHERE active = 1 ORDER BY name ASC"
    ))?;

    let rows = stmt.query_map([], |row| Ok(parse_service_row(row)))?;

    let mut services = vec![];
    for row in rows {
        services.push(row??);
    }
    Ok(services)
}

/// Case-insensitive substring match on the name, active services only.
pub fn search_active_services(conn: &Connection, keyword: &str) -> anyhow::Result<Vec<Service>> {
    let escaped = keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    let pattern = format!("%{escaped}%");

    let mut stmt = conn.prepare(&format!(
        "SELECT {SERVICE_COLUMNS} FROM services
         WHERE active = 1 AND name LIKE ?1 ESCAPE '\\' ORDER BY name ASC"
    ))?;

    let rows = stmt.query_map(params![pattern], |row| Ok(parse_service_row(row)))?;

    let mut services = vec![];
    for row in rows {
        services.push(row??);
    }
    Ok(services)
}

pub fn update_service(conn: &Connection, service: &Service) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE services SET name = ?1, description = ?2, price = ?3, duration_minutes = ?4, active = ?5, updated_at = ?6
         WHERE id = ?7",
        params![
            service.name,
            service.description,
            service.price.to_string(),
            service.duration_minutes,
            service.active,
            now_str(),
            service.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn set_service_active(conn: &Connection, id: &str, active: bool) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE services SET active = ?1, updated_at = ?2 WHERE id = ?3",
        params![active, now_str(), id],
    )?;
    Ok(count > 0)
}

fn parse_service_row(row: &rusqlite::Row) -> anyhow::Result<Service> {
    let price_str: String = row.get(3)?;
    let created_at_str: String = row.get(6)?;
    let updated_at_str: String = row.get(7)?;

    Ok(Service {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price: price_str
            .parse::<Decimal>()
            .with_context(|| format!("malformed stored price: {price_str}"))?,
        duration_minutes: row.get(4)?,
        active: row.get(5)?,
        created_at: parse_dt(&created_at_str)?,
        updated_at: parse_dt(&updated_at_str)?,
    })
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, customer_id, service_id, vehicle_id, booking_date_time, status, notes, rating, review, assigned_staff_id, created_at, updated_at";

const BOOKING_VIEW_SELECT: &str = "SELECT b.id, b.customer_id, s.id, s.name, s.description, s.price, s.duration_minutes,
            v.id, v.make, v.model, v.license_plate,
            b.booking_date_time, b.status, b.notes, b.rating, b.review, st.full_name
     FROM bookings b
     JOIN services s ON s.id = b.service_id
     JOIN vehicles v ON v.id = b.vehicle_id
     LEFT JOIN users st ON st.id = b.assigned_staff_id";

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, customer_id, service_id, vehicle_id, booking_date_time, status, notes, rating, review, assigned_staff_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            booking.id,
            booking.customer_id,
            booking.service_id,
            booking.vehicle_id,
            format_dt(&booking.date_time),
            booking.status.as_str(),
            booking.notes,
            booking.rating,
            booking.review,
            booking.assigned_staff_id,
            format_dt(&booking.created_at),
            format_dt(&booking.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Every booking scheduled in `[start, end]`, both ends inclusive, regardless
/// of status or customer.
pub fn get_bookings_in_range(
    conn: &Connection,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE booking_date_time >= ?1 AND booking_date_time <= ?2 ORDER BY booking_date_time ASC"
    ))?;

    let rows = stmt.query_map(params![format_dt(start), format_dt(end)], |row| {
        Ok(parse_booking_row(row))
    })?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_str(), id],
    )?;
    Ok(count > 0)
}

pub fn update_booking_rating(
    conn: &Connection,
    id: &str,
    rating: i32,
    review: Option<&str>,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET rating = ?1, review = ?2, updated_at = ?3 WHERE id = ?4",
        params![rating, review, now_str(), id],
    )?;
    Ok(count > 0)
}

pub fn assign_booking_staff(conn: &Connection, id: &str, staff_id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET assigned_staff_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![staff_id, now_str(), id],
    )?;
    Ok(count > 0)
}

pub fn get_booking_view(conn: &Connection, id: &str) -> anyhow::Result<Option<BookingView>> {
    let result = conn.query_row(
        &format!("{BOOKING_VIEW_SELECT} WHERE b.id = ?1"),
        params![id],
        |row| Ok(parse_booking_view_row(row)),
    );

    match result {
        Ok(view) => Ok(Some(view?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_booking_views_for_customer(
    conn: &Connection,
    customer_id: &str,
) -> anyhow::Result<Vec<BookingView>> {
    let mut stmt = conn.prepare(&format!(
        "{BOOKING_VIEW_SELECT} WHERE b.customer_id = ?1 ORDER BY b.booking_date_time ASC"
    ))?;

    let rows = stmt.query_map(params![customer_id], |row| Ok(parse_booking_view_row(row)))?;

    let mut views = vec![];
    for row in rows {
        views.push(row??);
    }
    Ok(views)
}

pub fn list_booking_views(
    conn: &Connection,
    status_filter: Option<BookingStatus>,
) -> anyhow::Result<Vec<BookingView>> {
    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match status_filter {
        Some(status) => (
            format!("{BOOKING_VIEW_SELECT} WHERE b.status = ?1 ORDER BY b.booking_date_time DESC"),
            vec![Box::new(status.as_str()) as Box<dyn rusqlite::types::ToSql>],
        ),
        None => (
            format!("{BOOKING_VIEW_SELECT} ORDER BY b.booking_date_time DESC"),
            vec![],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_view_row(row)))?;

    let mut views = vec![];
    for row in rows {
        views.push(row??);
    }
    Ok(views)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let date_time_str: String = row.get(4)?;
    let status_str: String = row.get(5)?;
    let created_at_str: String = row.get(10)?;
    let updated_at_str: String = row.get(11)?;

    Ok(Booking {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        service_id: row.get(2)?,
        vehicle_id: row.get(3)?,
        date_time: parse_dt(&date_time_str)?,
        status: BookingStatus::parse(&status_str)
            .with_context(|| format!("unknown booking status: {status_str}"))?,
        notes: row.get(6)?,
        rating: row.get(7)?,
        review: row.get(8)?,
        assigned_staff_id: row.get(9)?,
        created_at: parse_dt(&created_at_str)?,
        updated_at: parse_dt(&updated_at_str)?,
    })
}

fn parse_booking_view_row(row: &rusqlite::Row) -> anyhow::Result<BookingView> {
    let price_str: String = row.get(5)?;
    let date_time_str: String = row.get(11)?;
    let status_str: String = row.get(12)?;

    Ok(BookingView {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        service: ServiceSummary {
            id: row.get(2)?,
            name: row.get(3)?,
            description: row.get(4)?,
            price: price_str
                .parse::<Decimal>()
                .with_context(|| format!("malformed stored price: {price_str}"))?,
            duration_minutes: row.get(6)?,
        },
        vehicle: VehicleSummary {
            id: row.get(7)?,
            make: row.get(8)?,
            model: row.get(9)?,
            license_plate: row.get(10)?,
        },
        booking_date_time: parse_dt(&date_time_str)?,
        status: BookingStatus::parse(&status_str)
            .with_context(|| format!("unknown booking status: {status_str}"))?,
        notes: row.get(13)?,
        rating: row.get(14)?,
        review: row.get(15)?,
        assigned_staff_name: row.get(16)?,
    })
}
