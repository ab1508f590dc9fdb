//! Tool catalog - canonical tool records, the shared in-memory store, and
//! loading from TOML definitions or JSON snapshots.

mod loader;
mod record;
mod store;

pub use loader::LoadReport;
pub use record::{
    CostModel, CostType, McpVariant, MetricsUpdate, PerformanceMetrics, QualityScores, ToolKind, ToolRecord,
    ToolType, Venue,
};
pub use store::{Catalog, ToolFilter, UpsertOutcome};
