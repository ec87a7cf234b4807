pub mod assembler;
pub mod cache;
pub mod dashboard;
pub mod impact;
pub mod insights;
pub mod invalidation;
pub mod votes;

pub use assembler::{assemble, trending, TRENDING_LIMIT};
pub use cache::{QueryCache, Slot};
pub use dashboard::DashboardFeed;
pub use impact::ImpactTracker;
pub use insights::{export_csv, summarize, top_correlation, CorrelationSummary, MinistryView};
pub use invalidation::{invalidation_set, CacheKey, InvalidationCoordinator};
pub use votes::merge_votes;
