use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;

/// A bookable offering in the catalog. Deactivated services stay in the
/// table so historical bookings keep resolving.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub duration_minutes: i32,
    pub active: bool,
    #[serde(skip)]
    pub created_at: NaiveDateTime,
    #[serde(skip)]
    pub updated_at: NaiveDateTime,
}
