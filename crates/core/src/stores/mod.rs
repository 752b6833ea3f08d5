pub mod http_search;
pub mod statistics;

pub use http_search::HttpSearchBackend;
pub use statistics::{AggregateInput, StaticStatistics};
