//! Statistics payloads for the dashboard and the fetcher that loads them.
//!
//! The numeric aggregates and the word-cloud image come from two separate
//! resources. They are fetched side by side and each keeps its own result,
//! so a broken word cloud never hides the charts and vice versa.

use crate::traits::StatisticsSource;
use crate::AggregateError;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use serde_with::{serde_as, DefaultOnError};
use tracing::warn;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// Pre-computed aggregate arrays. Every field is optional and independent:
/// a malformed field decodes to `None` without affecting the others.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AggregatePayload {
    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    pub prices: Option<Vec<f64>>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    pub property_types: Option<Vec<String>>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    pub property_type_counts: Option<Vec<u64>>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    pub room_types: Option<Vec<String>>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    pub room_type_counts: Option<Vec<u64>>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    pub top_amenities: Option<Vec<String>>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    pub amenity_counts: Option<Vec<u64>>,
}

impl AggregatePayload {
    pub fn from_json(bytes: &[u8]) -> Result<Self, AggregateError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[derive(Debug, Deserialize)]
struct WordCloudDocument {
    #[serde(default)]
    image: Option<String>,
}

/// Decoded word-cloud PNG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordCloudImage {
    pub png: Vec<u8>,
}

impl WordCloudImage {
    /// Parses the `{"image": "<base64 png>"}` document.
    pub fn from_document(bytes: &[u8]) -> Result<Self, AggregateError> {
        let document: WordCloudDocument = serde_json::from_slice(bytes)?;
        let encoded = document
            .image
            .filter(|image| !image.trim().is_empty())
            .ok_or(AggregateError::MissingImage)?;

        let png = STANDARD.decode(encoded.trim())?;
        if !png.starts_with(&PNG_SIGNATURE) {
            return Err(AggregateError::NotPng);
        }

        Ok(Self { png })
    }

    /// `data:` URI for hosts that embed the image inline.
    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}

/// Outcome of one dashboard load; each half fails on its own.
#[derive(Debug)]
pub struct AggregateReport {
    pub aggregates: Result<AggregatePayload, AggregateError>,
    pub word_cloud: Result<WordCloudImage, AggregateError>,
}

pub async fn fetch_aggregates<S>(source: &S) -> AggregateReport
where
    S: StatisticsSource + ?Sized,
{
    let (aggregates, word_cloud) = tokio::join!(source.aggregates(), source.word_cloud());

    if let Err(error) = &aggregates {
        warn!(error = %error, "aggregate statistics unavailable");
    }
    if let Err(error) = &word_cloud {
        warn!(error = %error, "word cloud unavailable");
    }

    AggregateReport {
        aggregates,
        word_cloud,
    }
}
