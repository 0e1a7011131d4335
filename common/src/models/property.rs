//! Property listing models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Listing kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Rental,
    Sale,
}

impl PropertyType {
    /// Value stored in the `property_type` column.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            PropertyType::Rental => "rental",
            PropertyType::Sale => "sale",
        }
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

impl std::str::FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rental" => Ok(PropertyType::Rental),
            "sale" => Ok(PropertyType::Sale),
            other => Err(format!("unknown property type '{}'", other)),
        }
    }
}

/// Compact listing row returned by searches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct PropertySummary {
    pub id: Uuid,
    pub title: String,
    pub property_type: PropertyType,
    pub price: Decimal,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub area_sqft: i32,
    pub location: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    /// Path of the listing's primary image, if it has one.
    pub primary_image_url: Option<String>,
}
