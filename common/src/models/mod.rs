//! Shared data models for the listing services.

pub mod monitor;
pub mod property;
pub mod search;

// Re-export commonly used types
pub use monitor::{
    DatabaseLiveness, DatabaseMetrics, DeclaredIndex, EndpointSummary, IndexFinding, IndexReport,
    IndexStat, LivenessReport, PerformanceSummary, PlanDiagnostics, PoolSnapshot, QueryMetric,
    QueryOutcome, QueryPerformanceSummary, SystemHealth, TableReport, TableStat,
};
pub use property::{PropertySummary, PropertyType};
pub use search::{SearchParams, SortField, SortOrder};
