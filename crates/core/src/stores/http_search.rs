use crate::models::ClientOptions;
use crate::traits::SearchBackend;
use crate::{SearchError, SearchRequest, SearchResponse};
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

/// `POST`s `{query, filters}` to the search endpoint.
pub struct HttpSearchBackend {
    client: Client,
    search_url: Url,
}

impl HttpSearchBackend {
    pub fn new(options: &ClientOptions) -> Result<Self, SearchError> {
        let client = Client::builder().timeout(options.timeout).build()?;
        Self::with_client(client, options)
    }

    /// Reuses a client the host already configured.
    pub fn with_client(client: Client, options: &ClientOptions) -> Result<Self, SearchError> {
        let search_url = Url::parse(&options.endpoint)?.join(&options.search_path)?;
        Ok(Self { client, search_url })
    }

    pub fn search_url(&self) -> &Url {
        &self.search_url
    }
}

#[async_trait]
impl SearchBackend for HttpSearchBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        let response = self
            .client
            .post(self.search_url.clone())
            .json(&request.body())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: self.search_url.to_string(),
                details: response.status().to_string(),
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice::<SearchResponse>(&bytes)?)
    }
}
