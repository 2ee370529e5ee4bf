//! Execution backend interfaces and the provider strategy table.

mod table;
mod traits;

pub use table::BackendTable;
pub use traits::{BackendFactory, ExecutionHandle, HealthCollector};
