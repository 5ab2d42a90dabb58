use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct Booking {
    pub id: String,
    pub customer_id: String,
    pub service_id: String,
    pub vehicle_id: String,
    pub date_time: NaiveDateTime,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub rating: Option<i32>,
    pub review: Option<String>,
    pub assigned_staff_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::InProgress => "IN_PROGRESS",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(BookingStatus::Pending),
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "IN_PROGRESS" => Some(BookingStatus::InProgress),
            "COMPLETED" => Some(BookingStatus::Completed),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

/// Booking as returned to clients, joined with its service, vehicle and
/// assigned staff member.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    pub id: String,
    #[serde(skip)]
    pub customer_id: String,
    pub service: ServiceSummary,
    pub vehicle: VehicleSummary,
    #[serde(with = "wire_datetime")]
    pub booking_date_time: NaiveDateTime,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub rating: Option<i32>,
    pub review: Option<String>,
    pub assigned_staff_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleSummary {
    pub id: String,
    pub make: String,
    pub model: String,
    pub license_plate: String,
}

/// ISO-8601 without offset. Browsers' `datetime-local` inputs omit the
/// seconds, so both forms are accepted on the way in.
pub mod wire_datetime {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
    const SHORT_FORMAT: &str = "%Y-%m-%dT%H:%M";

    pub fn serialize<S: Serializer>(dt: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<NaiveDateTime, String> {
        NaiveDateTime::parse_from_str(raw, FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(raw, SHORT_FORMAT))
            .map_err(|_| format!("invalid datetime '{raw}', expected YYYY-MM-DDTHH:MM[:SS]"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_storage_strings() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::InProgress,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::parse("DONE"), None);
    }

    #[test]
    fn test_status_wire_name_matches_storage() {
        let json = serde_json::to_value(BookingStatus::InProgress).unwrap();
        assert_eq!(json, "IN_PROGRESS");
    }

    #[test]
    fn test_wire_datetime_accepts_minutes_precision() {
        let full = wire_datetime::parse("2030-01-02T10:30:00").unwrap();
        let short = wire_datetime::parse("2030-01-02T10:30").unwrap();
        assert_eq!(full, short);
        assert!(wire_datetime::parse("02/01/2030 10:30").is_err());
    }
}
