//! Filter Model: validated search criteria.
//!
//! [`FilterModel::from_params`] is the only way to obtain a value, so every
//! filter that reaches the query builder already satisfies its invariants.

use rust_decimal::Decimal;
use validator::Validate;

use common::errors::{AppError, AppResult, FieldError};
use common::models::{PropertyType, SearchParams, SortField, SortOrder};

/// Page size bounds taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct PageLimits {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

/// Validated, immutable search criteria.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterModel {
    location: Option<String>,
    price_min: Option<Decimal>,
    price_max: Option<Decimal>,
    bedrooms_min: Option<i32>,
    area_min: Option<i32>,
    area_max: Option<i32>,
    property_types: Vec<PropertyType>,
    sort_field: SortField,
    sort_order: SortOrder,
    page: u32,
    page_size: u32,
}

/// Parsed but not yet validated values. Field names match the wire.
#[derive(Debug, Validate)]
struct Candidate {
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    location: Option<String>,
    min_price: Option<Decimal>,
    max_price: Option<Decimal>,
    #[validate(range(min = 0, max = 50, message = "must be between 0 and 50"))]
    bedrooms: Option<i64>,
    #[validate(range(min = 0, max = 1_000_000, message = "must be between 0 and 1000000"))]
    min_area: Option<i64>,
    #[validate(range(min = 0, max = 1_000_000, message = "must be between 0 and 1000000"))]
    max_area: Option<i64>,
    #[validate(range(min = 1, message = "must be at least 1"))]
    page: i64,
    page_size: i64,
}

impl FilterModel {
    /// Parses and validates raw query parameters.
    ///
    /// Empty strings count as absent. All problems are reported together,
    /// each tagged with the field it concerns.
    pub fn from_params(params: &SearchParams, limits: PageLimits) -> AppResult<Self> {
        let mut errors = Vec::new();

        let location = present(&params.location).map(str::to_string);
        let min_price = parse_field::<Decimal>("min_price", &params.min_price, &mut errors);
        let max_price = parse_field::<Decimal>("max_price", &params.max_price, &mut errors);
        let bedrooms = parse_field::<i64>("bedrooms", &params.bedrooms, &mut errors);
        let min_area = parse_field::<i64>("min_area", &params.min_area, &mut errors);
        let max_area = parse_field::<i64>("max_area", &params.max_area, &mut errors);
        let page = parse_field::<i64>("page", &params.page, &mut errors).unwrap_or(1);
        let page_size = parse_field::<i64>("page_size", &params.page_size, &mut errors)
            .unwrap_or(i64::from(limits.default_page_size));

        let sort_field = match present(&params.sort_by) {
            Some(raw) => raw.parse().unwrap_or_else(|msg: String| {
                errors.push(FieldError::new("sort_by", msg));
                SortField::CreatedAt
            }),
            None => SortField::CreatedAt,
        };
        let sort_order = match present(&params.sort_order) {
            Some(raw) => raw.parse().unwrap_or_else(|msg: String| {
                errors.push(FieldError::new("sort_order", msg));
                SortOrder::Desc
            }),
            None => SortOrder::Desc,
        };
        let property_types = parse_property_types(&params.property_type, &mut errors);

        let candidate = Candidate {
            location,
            min_price,
            max_price,
            bedrooms,
            min_area,
            max_area,
            page,
            page_size,
        };

        if let Err(validation) = candidate.validate() {
            let mut field_errors: Vec<FieldError> = validation
                .field_errors()
                .into_iter()
                .flat_map(|(field, errs)| {
                    errs.iter().map(move |e| {
                        let message = e
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string());
                        FieldError::new(field.to_string(), message)
                    })
                })
                .collect();
            field_errors.sort_by(|a, b| a.field.cmp(&b.field));
            errors.extend(field_errors);
        }

        for (field, value) in [("min_price", candidate.min_price), ("max_price", candidate.max_price)] {
            if matches!(value, Some(v) if v.is_sign_negative() && !v.is_zero()) {
                errors.push(FieldError::new(field, "cannot be negative"));
            }
        }
        if let (Some(min), Some(max)) = (candidate.min_price, candidate.max_price) {
            if min > max {
                errors.push(FieldError::new(
                    "price",
                    "min_price cannot be greater than max_price",
                ));
            }
        }
        if let (Some(min), Some(max)) = (candidate.min_area, candidate.max_area) {
            if min > max {
                errors.push(FieldError::new(
                    "area",
                    "min_area cannot be greater than max_area",
                ));
            }
        }
        if candidate.page_size < 1 || candidate.page_size > i64::from(limits.max_page_size) {
            errors.push(FieldError::new(
                "page_size",
                format!("must be between 1 and {}", limits.max_page_size),
            ));
        }
        if candidate.page > i64::from(u32::MAX) {
            errors.push(FieldError::new("page", "is too large"));
        }

        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        // Every numeric value is range-checked above, so these narrowings hold.
        Ok(Self {
            location: candidate.location,
            price_min: candidate.min_price,
            price_max: candidate.max_price,
            bedrooms_min: candidate.bedrooms.map(|v| v as i32),
            area_min: candidate.min_area.map(|v| v as i32),
            area_max: candidate.max_area.map(|v| v as i32),
            property_types,
            sort_field,
            sort_order,
            page: candidate.page as u32,
            page_size: candidate.page_size as u32,
        })
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn price_min(&self) -> Option<Decimal> {
        self.price_min
    }

    pub fn price_max(&self) -> Option<Decimal> {
        self.price_max
    }

    pub fn bedrooms_min(&self) -> Option<i32> {
        self.bedrooms_min
    }

    pub fn area_min(&self) -> Option<i32> {
        self.area_min
    }

    pub fn area_max(&self) -> Option<i32> {
        self.area_max
    }

    /// Accepted listing kinds; empty means any.
    pub fn property_types(&self) -> &[PropertyType] {
        &self.property_types
    }

    pub fn sort_field(&self) -> SortField {
        self.sort_field
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }
}

fn present(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_field<T: std::str::FromStr>(
    field: &str,
    raw: &Option<String>,
    errors: &mut Vec<FieldError>,
) -> Option<T> {
    let raw = present(raw)?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.push(FieldError::new(field, format!("'{}' is not a valid number", raw)));
            None
        }
    }
}

fn parse_property_types(raw: &Option<String>, errors: &mut Vec<FieldError>) -> Vec<PropertyType> {
    let Some(raw) = present(raw) else {
        return Vec::new();
    };
    let mut types = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match part.parse::<PropertyType>() {
            Ok(t) if !types.contains(&t) => types.push(t),
            Ok(_) => {}
            Err(_) => errors.push(FieldError::new(
                "property_type",
                format!("'{}' is not one of: rental, sale", part),
            )),
        }
    }
    types
}
