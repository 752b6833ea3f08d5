use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use serde_with::{serde_as, DefaultOnError, DisplayFromStr, PickFirst};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    Dice,
    Jaccard,
}

impl SimilarityMetric {
    pub const ALL: [SimilarityMetric; 3] = [Self::Cosine, Self::Dice, Self::Jaccard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Dice => "dice",
            Self::Jaccard => "jaccard",
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimilarityMetric {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "dice" => Ok(Self::Dice),
            "jaccard" => Ok(Self::Jaccard),
            other => Err(format!("unknown similarity metric: {other}")),
        }
    }
}

/// Numeric facets that accept a `[min, max]` pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    Price,
    Rating,
    Accommodates,
    Bedrooms,
    Beds,
}

impl NumericField {
    pub const ALL: [NumericField; 5] = [
        Self::Price,
        Self::Rating,
        Self::Accommodates,
        Self::Bedrooms,
        Self::Beds,
    ];

    /// Name of the input pair on the host page and the prefix of the wire key.
    pub fn input_name(&self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Rating => "review_scores_rating",
            Self::Accommodates => "accommodates",
            Self::Bedrooms => "bedrooms",
            Self::Beds => "beds",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalField {
    HostResponseTime,
    Neighbourhood,
    PropertyType,
    RoomType,
}

impl CategoricalField {
    pub const ALL: [CategoricalField; 4] = [
        Self::HostResponseTime,
        Self::Neighbourhood,
        Self::PropertyType,
        Self::RoomType,
    ];

    pub fn input_name(&self) -> &'static str {
        match self {
            Self::HostResponseTime => "host_response_time",
            Self::Neighbourhood => "neighbourhood_cleansed",
            Self::PropertyType => "property_type",
            Self::RoomType => "room_type",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NumericRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumericRange {
    /// Returns `None` when neither bound was supplied.
    pub fn new(min: Option<f64>, max: Option<f64>) -> Option<Self> {
        if min.is_none() && max.is_none() {
            None
        } else {
            Some(Self { min, max })
        }
    }
}

/// Immutable view of every facet at the moment a search was submitted.
///
/// Entries are only recorded when the user actually supplied something: a
/// range needs at least one bound, a categorical value must be non-empty and
/// the amenity set must contain at least one amenity.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct FilterSnapshot {
    query: String,
    similarity_metric: SimilarityMetric,
    numeric_ranges: BTreeMap<NumericField, NumericRange>,
    categorical: BTreeMap<CategoricalField, String>,
    amenities: BTreeSet<String>,
    superhost: Option<bool>,
    min_reviews: Option<f64>,
}

impl FilterSnapshot {
    pub fn new(query: impl Into<String>, similarity_metric: SimilarityMetric) -> Self {
        Self {
            query: query.into(),
            similarity_metric,
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_range(mut self, field: NumericField, min: Option<f64>, max: Option<f64>) -> Self {
        match NumericRange::new(min, max) {
            Some(range) => {
                self.numeric_ranges.insert(field, range);
            }
            None => {
                self.numeric_ranges.remove(&field);
            }
        }
        self
    }

    pub fn with_category(mut self, field: CategoricalField, value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            self.categorical.remove(&field);
        } else {
            self.categorical.insert(field, value);
        }
        self
    }

    pub fn with_amenities<I, S>(mut self, amenities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.amenities.extend(
            amenities
                .into_iter()
                .map(Into::into)
                .filter(|amenity: &String| !amenity.trim().is_empty()),
        );
        self
    }

    pub fn with_superhost(mut self, superhost: Option<bool>) -> Self {
        self.superhost = superhost;
        self
    }

    pub fn with_min_reviews(mut self, min_reviews: Option<f64>) -> Self {
        self.min_reviews = min_reviews;
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn similarity_metric(&self) -> SimilarityMetric {
        self.similarity_metric
    }

    pub fn range(&self, field: NumericField) -> Option<&NumericRange> {
        self.numeric_ranges.get(&field)
    }

    pub fn numeric_ranges(&self) -> &BTreeMap<NumericField, NumericRange> {
        &self.numeric_ranges
    }

    pub fn category(&self, field: CategoricalField) -> Option<&str> {
        self.categorical.get(&field).map(String::as_str)
    }

    pub fn categorical(&self) -> &BTreeMap<CategoricalField, String> {
        &self.categorical
    }

    /// `None` when no amenity was selected.
    pub fn amenities(&self) -> Option<&BTreeSet<String>> {
        if self.amenities.is_empty() {
            None
        } else {
            Some(&self.amenities)
        }
    }

    pub fn superhost(&self) -> Option<bool> {
        self.superhost
    }

    pub fn min_reviews(&self) -> Option<f64> {
        self.min_reviews
    }

    /// Flat filters object in the shape the `/search` endpoint reads.
    pub fn to_payload(&self) -> Value {
        let mut filters = Map::new();
        filters.insert(
            "similarity_metric".to_string(),
            json!(self.similarity_metric.as_str()),
        );

        for (field, range) in &self.numeric_ranges {
            filters.insert(
                format!("{}_range", field.input_name()),
                json!([range.min, range.max]),
            );
        }
        for (field, value) in &self.categorical {
            filters.insert(field.input_name().to_string(), json!(value));
        }
        if let Some(amenities) = self.amenities() {
            filters.insert("amenities".to_string(), json!(amenities));
        }
        if let Some(superhost) = self.superhost {
            filters.insert("superhost".to_string(), json!(superhost));
        }
        if let Some(min_reviews) = self.min_reviews {
            filters.insert("min_reviews".to_string(), json!(min_reviews));
        }

        Value::Object(filters)
    }
}

/// One issued search, tagged with its sequence number.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub sequence: u64,
    pub query: String,
    pub filters: FilterSnapshot,
    pub issued_at: DateTime<Utc>,
}

impl SearchRequest {
    pub fn body(&self) -> Value {
        json!({
            "query": self.query,
            "filters": self.filters.to_payload(),
        })
    }
}

#[serde_as]
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Default)]
pub struct SimilarityMetrics {
    #[serde(default)]
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub cosine: Option<f64>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub dice: Option<f64>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub jaccard: Option<f64>,
}

impl SimilarityMetrics {
    pub fn get(&self, metric: SimilarityMetric) -> Option<f64> {
        match metric {
            SimilarityMetric::Cosine => self.cosine,
            SimilarityMetric::Dice => self.dice,
            SimilarityMetric::Jaccard => self.jaccard,
        }
    }

    fn set(&mut self, metric: SimilarityMetric, score: Option<f64>) {
        match metric {
            SimilarityMetric::Cosine => self.cosine = score,
            SimilarityMetric::Dice => self.dice = score,
            SimilarityMetric::Jaccard => self.jaccard = score,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cosine.is_none() && self.dice.is_none() && self.jaccard.is_none()
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Price {
    Amount(f64),
    Text(String),
}

/// A listing as returned by the search endpoint.
///
/// Numeric attributes are decoded leniently: numbers and numeric strings are
/// accepted, anything else becomes `None`.
#[serde_as]
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct ListingResult {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub listing_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub picture_url: Option<String>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    pub price: Option<Price>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub neighbourhood: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub property_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub room_type: Option<String>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub accommodates: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub bathrooms: Option<String>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub bedrooms: Option<f64>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub beds: Option<f64>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    pub amenities: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub neighborhood_overview: Option<String>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub minimum_nights: Option<f64>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub maximum_nights: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub host_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub host_since: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub host_location: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub host_about: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub host_response_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub host_response_rate: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub host_acceptance_rate: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub host_is_superhost: Option<bool>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub host_listings_count: Option<f64>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub host_identity_verified: Option<bool>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub number_of_reviews: Option<f64>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub review_scores_rating: Option<f64>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub review_scores_accuracy: Option<f64>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub review_scores_cleanliness: Option<f64>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub review_scores_checkin: Option<f64>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub review_scores_communication: Option<f64>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub review_scores_location: Option<f64>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub review_scores_value: Option<f64>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub similarity_score: Option<f64>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    pub similarity_metrics: SimilarityMetrics,
}

impl ListingResult {
    /// Credits a bare `similarity_score` to `metric` when the backend did not
    /// send per-metric scores.
    pub fn attribute_legacy_score(&mut self, metric: SimilarityMetric) {
        if self.similarity_metrics.is_empty() && self.similarity_score.is_some() {
            self.similarity_metrics.set(metric, self.similarity_score);
        }
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    })
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(flag) => Some(flag),
        Value::Number(number) => number.as_f64().map(|value| value != 0.0),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "t" | "true" | "yes" | "1" => Some(true),
            "f" | "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireResponse {
    Bare(Vec<ListingResult>),
    Wrapped {
        results: Vec<ListingResult>,
        #[serde(default)]
        total_matches: Option<u64>,
        #[serde(default)]
        total_filtered: Option<u64>,
    },
}

/// A ranked page of listings plus summary counts.
///
/// Decodes from either a bare array of listings or the
/// `{results, total_matches, total_filtered}` wrapper.
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(from = "WireResponse")]
pub struct SearchResponse {
    pub results: Vec<ListingResult>,
    pub total_matches: u64,
    pub total_filtered: u64,
}

impl From<WireResponse> for SearchResponse {
    fn from(value: WireResponse) -> Self {
        match value {
            WireResponse::Bare(results) => {
                let count = results.len() as u64;
                Self {
                    results,
                    total_matches: count,
                    total_filtered: count,
                }
            }
            WireResponse::Wrapped {
                results,
                total_matches,
                total_filtered,
            } => {
                let total_filtered = total_filtered.unwrap_or(results.len() as u64);
                let total_matches = total_matches.unwrap_or(total_filtered).max(total_filtered);
                Self {
                    results,
                    total_matches,
                    total_filtered,
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub endpoint: String,
    pub search_path: String,
    pub word_cloud_path: String,
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5000".to_string(),
            search_path: "/search".to_string(),
            word_cloud_path: "/static/data/wordcloud_data.json".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub currency_symbol: String,
    pub amenity_preview: usize,
    pub empty_message: String,
    pub missing_value: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            currency_symbol: "€".to_string(),
            amenity_preview: 5,
            empty_message: "No results found.".to_string(),
            missing_value: "N/A".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChartOptions {
    pub histogram_buckets: usize,
    pub bar_extent: f64,
    pub band_extent: f64,
    /// Band padding of the property-type bars.
    pub band_padding: f64,
    /// Band padding of the amenity bars.
    pub amenity_band_padding: f64,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            histogram_buckets: 30,
            bar_extent: 600.0,
            band_extent: 400.0,
            band_padding: 0.2,
            amenity_band_padding: 0.1,
        }
    }
}
