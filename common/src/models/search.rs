//! Search request models.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Raw query string of `GET /properties`.
///
/// Every field is kept as text so that malformed values surface as
/// field-tagged validation errors instead of extractor rejections.
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Case-insensitive substring of the listing location.
    pub location: Option<String>,
    /// Lower price bound (inclusive).
    pub min_price: Option<String>,
    /// Upper price bound (inclusive).
    pub max_price: Option<String>,
    /// Minimum number of bedrooms.
    pub bedrooms: Option<String>,
    /// Lower area bound in square feet.
    pub min_area: Option<String>,
    /// Upper area bound in square feet.
    pub max_area: Option<String>,
    /// `rental`, `sale`, or a comma-separated list of both.
    pub property_type: Option<String>,
    /// `price`, `created_at` or `bedrooms`.
    pub sort_by: Option<String>,
    /// `asc` or `desc`.
    pub sort_order: Option<String>,
    /// 1-based page number.
    pub page: Option<String>,
    /// Items per page.
    pub page_size: Option<String>,
}

/// Column a search may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Price,
    CreatedAt,
    Bedrooms,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Price => "price",
            SortField::CreatedAt => "created_at",
            SortField::Bedrooms => "bedrooms",
        }
    }
}

impl std::str::FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "price" => Ok(SortField::Price),
            "created_at" => Ok(SortField::CreatedAt),
            "bedrooms" => Ok(SortField::Bedrooms),
            _ => Err("must be one of: price, created_at, bedrooms".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err("must be 'asc' or 'desc'".to_string()),
        }
    }
}
