pub mod aggregator;
pub mod stats;
pub mod timeline;
pub mod transition;

pub use aggregator::EntityAggregator;
pub use timeline::build_timeline;
pub use transition::StatusTransitionManager;
