//! Public types for the Huginn API.

mod capability;
mod criteria;
mod model;
mod routing;

pub use capability::Capability;
pub use criteria::{PerformancePriority, SelectionCriteria};
pub use model::{ConnectionParams, ModelConfiguration, ModelDescriptor, ModelEntry, ModelLimits};
pub use routing::{Rationale, RoutingDecision, RoutingRequest};
