use crate::aggregates::{AggregatePayload, WordCloudImage};
use crate::{AggregateError, SearchError, SearchRequest, SearchResponse};
use async_trait::async_trait;

#[async_trait]
pub trait SearchBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError>;
}

/// The two independent statistics resources behind the dashboard.
#[async_trait]
pub trait StatisticsSource {
    async fn aggregates(&self) -> Result<AggregatePayload, AggregateError>;

    async fn word_cloud(&self) -> Result<WordCloudImage, AggregateError>;
}
