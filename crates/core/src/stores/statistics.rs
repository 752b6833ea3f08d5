use crate::aggregates::{AggregatePayload, WordCloudImage};
use crate::models::ClientOptions;
use crate::traits::StatisticsSource;
use crate::AggregateError;
use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use url::Url;

/// Where the numeric aggregates come from.
#[derive(Debug, Clone)]
pub enum AggregateInput {
    /// Already in memory, handed over by the host.
    InMemory(AggregatePayload),
    /// A JSON document on disk.
    File(PathBuf),
    Missing,
}

/// Word cloud from the static JSON resource, aggregates from the host.
pub struct StaticStatistics {
    client: Client,
    word_cloud_url: Url,
    input: AggregateInput,
}

impl StaticStatistics {
    pub fn new(options: &ClientOptions, input: AggregateInput) -> Result<Self, AggregateError> {
        let word_cloud_url = Url::parse(&options.endpoint)?.join(&options.word_cloud_path)?;
        let client = Client::builder().timeout(options.timeout).build()?;
        Ok(Self {
            client,
            word_cloud_url,
            input,
        })
    }

    pub fn word_cloud_url(&self) -> &Url {
        &self.word_cloud_url
    }
}

#[async_trait]
impl StatisticsSource for StaticStatistics {
    async fn aggregates(&self) -> Result<AggregatePayload, AggregateError> {
        match &self.input {
            AggregateInput::InMemory(payload) => Ok(payload.clone()),
            AggregateInput::File(path) => {
                let bytes = tokio::fs::read(path).await?;
                AggregatePayload::from_json(&bytes)
            }
            AggregateInput::Missing => {
                Err(AggregateError::Missing("no aggregate payload supplied".to_string()))
            }
        }
    }

    async fn word_cloud(&self) -> Result<WordCloudImage, AggregateError> {
        let response = self.client.get(self.word_cloud_url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(AggregateError::BackendResponse {
                resource: self.word_cloud_url.to_string(),
                details: response.status().to_string(),
            });
        }

        let bytes = response.bytes().await?;
        WordCloudImage::from_document(&bytes)
    }
}
