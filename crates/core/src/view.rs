//! Turns a [`SearchResponse`] into display-ready rows and tracks which rows
//! are expanded.

use crate::models::{ListingResult, Price, RenderOptions, SearchResponse, SimilarityMetric};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

const PRICE_PATTERN: &str = r"\d[\d,]*(?:\.\d+)?";

/// Expansion flag per result position. Everything starts collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultViewState {
    expanded: BTreeMap<usize, bool>,
}

impl ResultViewState {
    /// Flips the flag at `index` and returns the new value.
    pub fn toggle(&mut self, index: usize) -> bool {
        let entry = self.expanded.entry(index).or_insert(false);
        *entry = !*entry;
        *entry
    }

    pub fn is_expanded(&self, index: usize) -> bool {
        self.expanded.get(&index).copied().unwrap_or(false)
    }

    pub fn expanded_count(&self) -> usize {
        self.expanded.values().filter(|expanded| **expanded).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityAnnotation {
    pub metric: SimilarityMetric,
    pub score: Option<f64>,
    pub primary: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscoreBar {
    pub label: &'static str,
    pub score: String,
    /// `score / 5`. Out-of-range scores pass through unclamped.
    pub fraction: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostDetail {
    pub name: String,
    pub superhost: bool,
    pub since: String,
    pub location: String,
    pub response_time: String,
    pub response_rate: String,
    pub acceptance_rate: String,
    pub listings_count: String,
    pub identity_verified: bool,
    pub about: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListingDetail {
    pub description: String,
    pub neighborhood_overview: String,
    pub bedrooms: String,
    pub beds: String,
    pub bathrooms: String,
    pub minimum_nights: String,
    pub maximum_nights: String,
    pub amenities: Vec<String>,
    pub host: HostDetail,
    pub review_count: u64,
    pub subscores: Vec<SubscoreBar>,
    pub listing_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderableListing {
    pub index: usize,
    pub title: String,
    pub price: String,
    pub kind: String,
    pub location: String,
    pub rating: String,
    pub accommodates: String,
    pub amenity_preview: Vec<String>,
    /// `"+N more"` when the preview was cut short.
    pub more_amenities: Option<String>,
    pub similarity: Vec<SimilarityAnnotation>,
    pub detail: ListingDetail,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewContent {
    Empty { message: String },
    Listings(Vec<RenderableListing>),
}

/// A rendered response together with its expansion state.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub sequence: u64,
    pub summary: String,
    pub content: ViewContent,
    state: ResultViewState,
}

impl ResultView {
    pub fn rows(&self) -> &[RenderableListing] {
        match &self.content {
            ViewContent::Listings(rows) => rows,
            ViewContent::Empty { .. } => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.content, ViewContent::Empty { .. })
    }

    /// Returns the new flag, or `None` when `index` is not a row of this view.
    pub fn toggle(&mut self, index: usize) -> Option<bool> {
        if index >= self.rows().len() {
            return None;
        }
        Some(self.state.toggle(index))
    }

    pub fn is_expanded(&self, index: usize) -> bool {
        self.state.is_expanded(index)
    }

    pub fn state(&self) -> &ResultViewState {
        &self.state
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResultViewBuilder {
    options: RenderOptions,
}

impl ResultViewBuilder {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Fresh view for `response`; expansion state always starts empty.
    pub fn render(
        &self,
        sequence: u64,
        response: &SearchResponse,
        metric: SimilarityMetric,
    ) -> ResultView {
        let rows = self.build(response, metric);
        let content = if rows.is_empty() {
            ViewContent::Empty {
                message: self.options.empty_message.clone(),
            }
        } else {
            ViewContent::Listings(rows)
        };

        ResultView {
            sequence,
            summary: summary_line(response),
            content,
            state: ResultViewState::default(),
        }
    }

    pub fn build(
        &self,
        response: &SearchResponse,
        metric: SimilarityMetric,
    ) -> Vec<RenderableListing> {
        response
            .results
            .iter()
            .enumerate()
            .map(|(index, listing)| self.build_row(index, listing, metric))
            .collect()
    }

    fn build_row(
        &self,
        index: usize,
        listing: &ListingResult,
        metric: SimilarityMetric,
    ) -> RenderableListing {
        let missing = self.options.missing_value.as_str();
        let preview_len = self.options.amenity_preview.min(listing.amenities.len());
        let hidden = listing.amenities.len() - preview_len;

        RenderableListing {
            index,
            title: listing
                .name
                .clone()
                .unwrap_or_else(|| format!("Listing {}", index + 1)),
            price: self.format_price(listing.price.as_ref()),
            kind: format!(
                "{} - {}",
                listing.property_type.as_deref().unwrap_or(missing),
                listing.room_type.as_deref().unwrap_or(missing)
            ),
            location: listing
                .neighbourhood
                .clone()
                .unwrap_or_else(|| missing.to_string()),
            rating: format_optional(listing.review_scores_rating, missing),
            accommodates: format!(
                "{} guests",
                format_optional(listing.accommodates, missing)
            ),
            amenity_preview: listing.amenities[..preview_len].to_vec(),
            more_amenities: (hidden > 0).then(|| format!("+{hidden} more")),
            similarity: SimilarityMetric::ALL
                .iter()
                .map(|candidate| SimilarityAnnotation {
                    metric: *candidate,
                    score: listing.similarity_metrics.get(*candidate),
                    primary: *candidate == metric,
                })
                .collect(),
            detail: self.build_detail(listing),
        }
    }

    fn build_detail(&self, listing: &ListingResult) -> ListingDetail {
        let missing = self.options.missing_value.as_str();
        let not_specified = |value: &Option<String>| {
            value
                .clone()
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| "Not specified".to_string())
        };

        let subscores = [
            ("Cleanliness", listing.review_scores_cleanliness),
            ("Accuracy", listing.review_scores_accuracy),
            ("Communication", listing.review_scores_communication),
            ("Location", listing.review_scores_location),
            ("Check-in", listing.review_scores_checkin),
            ("Value", listing.review_scores_value),
        ]
        .into_iter()
        .map(|(label, score)| SubscoreBar {
            label,
            score: format_optional(score, missing),
            fraction: score.map(|value| value / 5.0),
        })
        .collect();

        ListingDetail {
            description: listing
                .description
                .clone()
                .unwrap_or_else(|| "No description".to_string()),
            neighborhood_overview: listing
                .neighborhood_overview
                .clone()
                .unwrap_or_else(|| "No neighborhood overview available.".to_string()),
            bedrooms: format_optional(listing.bedrooms, missing),
            beds: format_optional(listing.beds, missing),
            bathrooms: listing.bathrooms.clone().unwrap_or_else(|| missing.to_string()),
            minimum_nights: format_optional(listing.minimum_nights, missing),
            maximum_nights: format_optional(listing.maximum_nights, missing),
            amenities: listing.amenities.clone(),
            host: HostDetail {
                name: not_specified(&listing.host_name),
                superhost: listing.host_is_superhost.unwrap_or(false),
                since: not_specified(&listing.host_since),
                location: not_specified(&listing.host_location),
                response_time: not_specified(&listing.host_response_time),
                response_rate: not_specified(&listing.host_response_rate),
                acceptance_rate: not_specified(&listing.host_acceptance_rate),
                listings_count: format_optional(listing.host_listings_count, "0"),
                identity_verified: listing.host_identity_verified.unwrap_or(false),
                about: listing
                    .host_about
                    .clone()
                    .filter(|text| !text.trim().is_empty()),
            },
            review_count: listing
                .number_of_reviews
                .filter(|count| *count > 0.0)
                .map(|count| count as u64)
                .unwrap_or(0),
            subscores,
            listing_url: listing.listing_url.clone(),
        }
    }

    fn format_price(&self, price: Option<&Price>) -> String {
        let currency = &self.options.currency_symbol;
        match price {
            Some(Price::Amount(amount)) => format!("{currency}{amount:.2}/night"),
            Some(Price::Text(text)) => match parse_price(text) {
                Some(amount) => format!("{currency}{amount:.2}/night"),
                None => text.clone(),
            },
            None => self.options.missing_value.clone(),
        }
    }
}

pub fn summary_line(response: &SearchResponse) -> String {
    if response.total_filtered < response.total_matches {
        format!(
            "Found {} listings, {} after filters",
            response.total_matches, response.total_filtered
        )
    } else {
        format!("Found {} listings", response.total_matches)
    }
}

/// Pulls the numeric amount out of strings like `"€1,250.00 per night"`.
pub fn parse_price(text: &str) -> Option<f64> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(PRICE_PATTERN).ok()).as_ref()?;
    let found = pattern.find(text)?;
    found.as_str().replace(',', "").parse::<f64>().ok()
}

fn format_optional(value: Option<f64>, missing: &str) -> String {
    match value {
        Some(number) if number.fract() == 0.0 => format!("{number:.0}"),
        Some(number) => number.to_string(),
        None => missing.to_string(),
    }
}
