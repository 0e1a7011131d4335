pub mod filter;
pub mod pagination;
pub mod query_builder;

pub use filter::{FilterModel, PageLimits};
pub use pagination::Paginator;
pub use query_builder::{
    BindValue, CountPlan, QueryBuilder, QueryPlan, Statement, ACCESS_COLUMNS, LISTING_TABLE,
};
