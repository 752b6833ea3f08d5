pub mod aggregates;
pub mod charts;
pub mod error;
pub mod facets;
pub mod models;
pub mod orchestrator;
pub mod stores;
pub mod traits;
pub mod view;

pub use aggregates::{fetch_aggregates, AggregatePayload, AggregateReport, WordCloudImage};
pub use charts::{
    bar_layout, build_dashboard, histogram, pie_layout, Bar, Bin, ChartSlot, Dashboard, PieSector,
};
pub use error::{AggregateError, SearchError};
pub use facets::{collect_filters, FacetInputs, FacetSource};
pub use models::{
    CategoricalField, ChartOptions, ClientOptions, FilterSnapshot, ListingResult, NumericField,
    NumericRange, Price, RenderOptions, SearchRequest, SearchResponse, SimilarityMetric,
    SimilarityMetrics,
};
pub use orchestrator::{SearchFailure, SearchOrchestrator, SearchOutcome, SearchPhase};
pub use stores::{AggregateInput, HttpSearchBackend, StaticStatistics};
pub use traits::{SearchBackend, StatisticsSource};
pub use view::{
    ListingDetail, RenderableListing, ResultView, ResultViewBuilder, ResultViewState, ViewContent,
};
