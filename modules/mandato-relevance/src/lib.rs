pub mod engine;
pub mod registry;
pub mod weights;

pub use engine::{EngagementCounters, RelevanceBreakdown, RelevanceEngine};
pub use registry::SourceRegistry;
pub use weights::RelevanceWeights;
