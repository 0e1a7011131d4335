//! Query, index, table and pool monitoring.

pub mod facade;
pub mod index;
pub mod pool;
pub mod query;
pub mod table;

pub use facade::MonitoringFacade;
pub use index::IndexAdvisor;
pub use pool::PoolMonitor;
pub use query::QueryMonitor;
pub use table::TableAnalyzer;
