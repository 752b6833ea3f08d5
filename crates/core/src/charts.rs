//! Geometry for the statistics dashboard.
//!
//! Everything here is a pure function of its numeric inputs and produces
//! descriptors (bins, bars, sectors) for whatever draws them.

use crate::aggregates::{AggregateReport, WordCloudImage};
use crate::models::ChartOptions;
use std::f64::consts::TAU;
use tracing::warn;

/// Histogram bucket. Covers `[lower_bound, upper_bound)`, or the closed
/// interval when `closed` is set (only ever the last bin).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub count: usize,
    pub closed: bool,
}

impl Bin {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower_bound
            && (value < self.upper_bound || (self.closed && value <= self.upper_bound))
    }
}

/// Splits `[0, max(prices)]` into `buckets` equal-width bins.
///
/// Negative and non-finite values are skipped. No usable prices means no bins.
pub fn histogram(prices: &[f64], buckets: usize) -> Vec<Bin> {
    let values: Vec<f64> = prices
        .iter()
        .copied()
        .filter(|price| price.is_finite() && *price >= 0.0)
        .collect();

    let Some(max) = values.iter().copied().reduce(f64::max) else {
        return Vec::new();
    };

    if max == 0.0 {
        return vec![Bin {
            lower_bound: 0.0,
            upper_bound: 0.0,
            count: values.len(),
            closed: true,
        }];
    }

    let buckets = buckets.max(1);
    let width = max / buckets as f64;
    let mut bins: Vec<Bin> = (0..buckets)
        .map(|index| Bin {
            lower_bound: index as f64 * width,
            upper_bound: if index + 1 == buckets {
                max
            } else {
                (index + 1) as f64 * width
            },
            count: 0,
            closed: index + 1 == buckets,
        })
        .collect();

    for value in values {
        let mut index = ((value / width) as usize).min(buckets - 1);
        // Float division can land one bucket off at an edge.
        if value < bins[index].lower_bound && index > 0 {
            index -= 1;
        } else if !bins[index].contains(value) && index + 1 < buckets {
            index += 1;
        }
        bins[index].count += 1;
    }

    bins
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub category: String,
    pub count: u64,
    /// Proportional length; the largest count spans the full extent.
    pub length: f64,
    /// Start of the bar's band along the category axis.
    pub offset: f64,
    pub band_width: f64,
}

/// Lays out one bar per category in input order.
///
/// The category axis is an ordinal band scale over `[0, band_extent]` with
/// `padding` applied inside and outside the bands.
pub fn bar_layout(
    categories: &[String],
    counts: &[u64],
    extent: f64,
    band_extent: f64,
    padding: f64,
) -> Vec<Bar> {
    let pairs: Vec<(&String, u64)> = categories.iter().zip(counts.iter().copied()).collect();
    if pairs.is_empty() {
        return Vec::new();
    }

    let max = pairs.iter().map(|(_, count)| *count).max().unwrap_or(0);
    let padding = padding.clamp(0.0, 1.0);
    let step = band_extent / (pairs.len() as f64 + padding);
    let band_width = step * (1.0 - padding);

    pairs
        .into_iter()
        .enumerate()
        .map(|(index, (category, count))| Bar {
            category: category.clone(),
            count,
            length: if max == 0 {
                0.0
            } else {
                count as f64 / max as f64 * extent
            },
            offset: step * padding + index as f64 * step,
            band_width,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieSector {
    pub category: String,
    pub count: u64,
    pub start_angle: f64,
    pub end_angle: f64,
    pub percentage: f64,
}

impl PieSector {
    pub fn span(&self) -> f64 {
        self.end_angle - self.start_angle
    }

    pub fn label(&self) -> String {
        format!("{} ({})", self.category, self.count)
    }
}

/// Cumulative sectors in input order. Zero counts keep a zero-width sector.
pub fn pie_layout(categories: &[String], counts: &[u64]) -> Vec<PieSector> {
    let pairs: Vec<(&String, u64)> = categories.iter().zip(counts.iter().copied()).collect();
    let total: f64 = pairs.iter().map(|(_, count)| *count as f64).sum();

    let mut cursor = 0.0;
    pairs
        .into_iter()
        .map(|(category, count)| {
            let share = if total == 0.0 {
                0.0
            } else {
                count as f64 / total
            };
            let start_angle = cursor;
            cursor += share * TAU;
            PieSector {
                category: category.clone(),
                count,
                start_angle,
                end_angle: cursor,
                percentage: share * 100.0,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartSlot<T> {
    Ready(T),
    Unavailable(String),
}

impl<T> ChartSlot<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Unavailable(_) => None,
        }
    }
}

/// Every visualisation of the statistics page, each in its own slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub price_histogram: ChartSlot<Vec<Bin>>,
    pub property_types: ChartSlot<Vec<Bar>>,
    pub room_types: ChartSlot<Vec<PieSector>>,
    pub amenities: ChartSlot<Vec<Bar>>,
    pub word_cloud: ChartSlot<WordCloudImage>,
    /// Charts drawn from parallel arrays of different lengths.
    pub truncated: Vec<&'static str>,
}

pub fn build_dashboard(report: &AggregateReport, options: &ChartOptions) -> Dashboard {
    let word_cloud = match &report.word_cloud {
        Ok(image) => ChartSlot::Ready(image.clone()),
        Err(error) => ChartSlot::Unavailable(format!(
            "Error loading word cloud. Please try refreshing the page. ({error})"
        )),
    };

    let payload = match &report.aggregates {
        Ok(payload) => payload,
        Err(error) => {
            let reason = format!("statistics unavailable: {error}");
            return Dashboard {
                price_histogram: ChartSlot::Unavailable(reason.clone()),
                property_types: ChartSlot::Unavailable(reason.clone()),
                room_types: ChartSlot::Unavailable(reason.clone()),
                amenities: ChartSlot::Unavailable(reason),
                word_cloud,
                truncated: Vec::new(),
            };
        }
    };

    let mut truncated = Vec::new();
    let mut paired = |name: &'static str, categories: &Option<Vec<String>>, counts: &Option<Vec<u64>>| {
        match (categories, counts) {
            (Some(categories), Some(counts)) => {
                if categories.len() != counts.len() {
                    warn!(
                        chart = name,
                        categories = categories.len(),
                        counts = counts.len(),
                        "category and count arrays differ in length"
                    );
                    truncated.push(name);
                }
                Some((categories.clone(), counts.clone()))
            }
            _ => None,
        }
    };

    let property_types = match paired(
        "property_types",
        &payload.property_types,
        &payload.property_type_counts,
    ) {
        Some((categories, counts)) => ChartSlot::Ready(bar_layout(
            &categories,
            &counts,
            options.bar_extent,
            options.band_extent,
            options.band_padding,
        )),
        None => ChartSlot::Unavailable("property types not supplied".to_string()),
    };

    let room_types = match paired("room_types", &payload.room_types, &payload.room_type_counts) {
        Some((categories, counts)) => ChartSlot::Ready(pie_layout(&categories, &counts)),
        None => ChartSlot::Unavailable("room types not supplied".to_string()),
    };

    let amenities = match paired("amenities", &payload.top_amenities, &payload.amenity_counts) {
        Some((categories, counts)) => ChartSlot::Ready(bar_layout(
            &categories,
            &counts,
            options.bar_extent,
            options.band_extent,
            options.amenity_band_padding,
        )),
        None => ChartSlot::Unavailable("amenity counts not supplied".to_string()),
    };

    let price_histogram = match &payload.prices {
        Some(prices) => ChartSlot::Ready(histogram(prices, options.histogram_buckets)),
        None => ChartSlot::Unavailable("prices not supplied".to_string()),
    };

    Dashboard {
        price_histogram,
        property_types,
        room_types,
        amenities,
        word_cloud,
        truncated,
    }
}
