pub mod daily_aggregator;
pub mod join_engine;
pub mod metric_deriver;
pub mod schema_normalizer;

pub use daily_aggregator::*;
pub use join_engine::*;
pub use metric_deriver::*;
pub use schema_normalizer::*;
