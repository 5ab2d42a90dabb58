use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleType {
    Sedan,
    Suv,
    Truck,
    Van,
    Motorcycle,
}

impl VehicleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Sedan => "SEDAN",
            VehicleType::Suv => "SUV",
            VehicleType::Truck => "TRUCK",
            VehicleType::Van => "VAN",
            VehicleType::Motorcycle => "MOTORCYCLE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SEDAN" => Some(VehicleType::Sedan),
            "SUV" => Some(VehicleType::Suv),
            "TRUCK" => Some(VehicleType::Truck),
            "VAN" => Some(VehicleType::Van),
            "MOTORCYCLE" => Some(VehicleType::Motorcycle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
    pub make: String,
    pub model: String,
    pub license_plate: String,
    pub color: String,
    #[serde(rename = "type")]
    pub vehicle_type: VehicleType,
    #[serde(skip)]
    pub owner_id: String,
    #[serde(skip)]
    pub created_at: NaiveDateTime,
}

impl Vehicle {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }
}
