//! Query Builder: compiles a [`FilterModel`] into typed query plans.
//!
//! Building never touches the database. Filters become an ordered list of
//! [`Predicate`]s; the list is lowered to SQL in exactly one place,
//! [`lower_predicates`], so every backend sees the same semantics.

use rust_decimal::Decimal;

use common::models::{SortField, SortOrder};
use common::utils::SqlInspector;

use super::filter::FilterModel;

/// Table holding the listings.
pub const LISTING_TABLE: &str = "properties";

/// Columns of the listing table the builder can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Location,
    Price,
    Bedrooms,
    AreaSqft,
    PropertyType,
    IsActive,
    CreatedAt,
    Id,
}

impl Column {
    pub fn name(&self) -> &'static str {
        match self {
            Column::Location => "location",
            Column::Price => "price",
            Column::Bedrooms => "bedrooms",
            Column::AreaSqft => "area_sqft",
            Column::PropertyType => "property_type",
            Column::IsActive => "is_active",
            Column::CreatedAt => "created_at",
            Column::Id => "id",
        }
    }
}

impl From<SortField> for Column {
    fn from(field: SortField) -> Self {
        match field {
            SortField::Price => Column::Price,
            SortField::CreatedAt => Column::CreatedAt,
            SortField::Bedrooms => Column::Bedrooms,
        }
    }
}

/// Columns every search may filter or sort on, in predicate order.
pub const ACCESS_COLUMNS: [Column; 7] = [
    Column::Location,
    Column::Price,
    Column::Bedrooms,
    Column::AreaSqft,
    Column::PropertyType,
    Column::IsActive,
    Column::CreatedAt,
];

/// A bound parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Text(String),
    Decimal(Decimal),
    Int(i32),
    BigInt(i64),
    Bool(bool),
}

/// One filter condition. Conditions in a plan are AND-ed.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Equals { column: Column, value: BindValue },
    /// Inclusive on both ends; at least one bound is set.
    Range {
        column: Column,
        min: Option<BindValue>,
        max: Option<BindValue>,
    },
    In { column: Column, values: Vec<BindValue> },
    /// Case-insensitive substring match.
    Contains { column: Column, needle: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: Column,
    pub order: SortOrder,
}

/// Page query: predicates, total ordering and window.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub predicates: Vec<Predicate>,
    pub sort: Vec<SortKey>,
    pub offset: i64,
    pub limit: i64,
}

/// Count query: the same predicates, no ordering or window.
#[derive(Debug, Clone, PartialEq)]
pub struct CountPlan {
    pub predicates: Vec<Predicate>,
}

/// Executable SQL with its positional binds.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub binds: Vec<BindValue>,
}

impl Statement {
    /// Canonical text for logs and metrics. Values stay out of it.
    pub fn signature(&self) -> String {
        SqlInspector::signature(&self.sql)
    }
}

/// Both plans for one search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPlan {
    pub page: QueryPlan,
    pub count: CountPlan,
}

pub struct QueryBuilder;

impl QueryBuilder {
    /// Compiles a validated filter. Deterministic: equal filters yield equal plans.
    pub fn build(filter: &FilterModel) -> SearchPlan {
        let predicates = Self::predicates(filter);

        let primary = SortKey {
            column: filter.sort_field().into(),
            order: filter.sort_order(),
        };
        let mut sort = vec![primary];
        if primary.column != Column::CreatedAt {
            sort.push(SortKey {
                column: Column::CreatedAt,
                order: SortOrder::Desc,
            });
        }
        // Listings created in the same instant still need a total order.
        sort.push(SortKey {
            column: Column::Id,
            order: SortOrder::Desc,
        });

        let page_size = i64::from(filter.page_size());
        let offset = (i64::from(filter.page()) - 1) * page_size;

        SearchPlan {
            count: CountPlan {
                predicates: predicates.clone(),
            },
            page: QueryPlan {
                predicates,
                sort,
                offset,
                limit: page_size,
            },
        }
    }

    /// location, price, bedrooms, area, property_type, then the active restriction.
    fn predicates(filter: &FilterModel) -> Vec<Predicate> {
        let mut predicates = Vec::new();

        if let Some(location) = filter.location() {
            predicates.push(Predicate::Contains {
                column: Column::Location,
                needle: location.to_string(),
            });
        }

        if filter.price_min().is_some() || filter.price_max().is_some() {
            predicates.push(Predicate::Range {
                column: Column::Price,
                min: filter.price_min().map(BindValue::Decimal),
                max: filter.price_max().map(BindValue::Decimal),
            });
        }

        if let Some(bedrooms) = filter.bedrooms_min() {
            predicates.push(Predicate::Range {
                column: Column::Bedrooms,
                min: Some(BindValue::Int(bedrooms)),
                max: None,
            });
        }

        if filter.area_min().is_some() || filter.area_max().is_some() {
            predicates.push(Predicate::Range {
                column: Column::AreaSqft,
                min: filter.area_min().map(BindValue::Int),
                max: filter.area_max().map(BindValue::Int),
            });
        }

        match filter.property_types() {
            [] => {}
            [single] => predicates.push(Predicate::Equals {
                column: Column::PropertyType,
                value: BindValue::Text(single.as_db_str().to_string()),
            }),
            many => predicates.push(Predicate::In {
                column: Column::PropertyType,
                values: many
                    .iter()
                    .map(|t| BindValue::Text(t.as_db_str().to_string()))
                    .collect(),
            }),
        }

        predicates.push(Predicate::Equals {
            column: Column::IsActive,
            value: BindValue::Bool(true),
        });

        predicates
    }
}

const SUMMARY_COLUMNS: &str = "p.id, p.title, p.property_type, p.price, p.bedrooms, \
     p.bathrooms, p.area_sqft, p.location, p.is_active, p.created_at, \
     (SELECT pi.file_path FROM property_images pi \
      WHERE pi.property_id = p.id AND pi.is_primary \
      ORDER BY pi.display_order LIMIT 1) AS primary_image_url";

impl QueryPlan {
    pub fn to_statement(&self) -> Statement {
        let mut binds = Vec::new();
        let mut sql = format!("SELECT {} FROM {} p", SUMMARY_COLUMNS, LISTING_TABLE);
        lower_predicates(&self.predicates, &mut sql, &mut binds);

        let order = self
            .sort
            .iter()
            .map(|k| format!("p.{} {}", k.column.name(), k.order.keyword()))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(" ORDER BY ");
        sql.push_str(&order);

        binds.push(BindValue::BigInt(self.limit));
        sql.push_str(&format!(" LIMIT ${}", binds.len()));
        binds.push(BindValue::BigInt(self.offset));
        sql.push_str(&format!(" OFFSET ${}", binds.len()));

        Statement { sql, binds }
    }
}

impl CountPlan {
    pub fn to_statement(&self) -> Statement {
        let mut binds = Vec::new();
        let mut sql = format!("SELECT count(*) FROM {} p", LISTING_TABLE);
        lower_predicates(&self.predicates, &mut sql, &mut binds);
        Statement { sql, binds }
    }
}

/// Appends a `WHERE` clause for `predicates` to `sql`, numbering
/// placeholders after the binds already present.
pub fn lower_predicates(predicates: &[Predicate], sql: &mut String, binds: &mut Vec<BindValue>) {
    let mut clauses = Vec::with_capacity(predicates.len());

    for predicate in predicates {
        match predicate {
            Predicate::Equals { column, value } => {
                binds.push(value.clone());
                clauses.push(format!("p.{} = ${}", column.name(), binds.len()));
            }
            Predicate::Range { column, min, max } => {
                if let Some(min) = min {
                    binds.push(min.clone());
                    clauses.push(format!("p.{} >= ${}", column.name(), binds.len()));
                }
                if let Some(max) = max {
                    binds.push(max.clone());
                    clauses.push(format!("p.{} <= ${}", column.name(), binds.len()));
                }
            }
            Predicate::In { column, values } => {
                let placeholders = values
                    .iter()
                    .map(|v| {
                        binds.push(v.clone());
                        format!("${}", binds.len())
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                clauses.push(format!("p.{} IN ({})", column.name(), placeholders));
            }
            Predicate::Contains { column, needle } => {
                binds.push(BindValue::Text(format!("%{}%", escape_like(needle))));
                clauses.push(format!("p.{} ILIKE ${}", column.name(), binds.len()));
            }
        }
    }

    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
