//! Reads the facet controls of a host page into a [`FilterSnapshot`].
//!
//! The host decides which controls it shows. Every control is optional: a
//! missing control simply contributes nothing to the snapshot.

use crate::models::{CategoricalField, FilterSnapshot, NumericField, SimilarityMetric};
use std::collections::HashMap;

pub const QUERY_CONTROL: &str = "search-input";
pub const METRIC_CONTROL: &str = "similarity-metric";
pub const AMENITY_GROUP: &str = "amenity";
pub const SUPERHOST_CONTROL: &str = "superhost";
pub const MIN_REVIEWS_CONTROL: &str = "min_reviews";

/// Read access to the facet controls currently on the page.
pub trait FacetSource {
    /// Current value of a single-valued control, `None` when the control is absent.
    fn value(&self, control: &str) -> Option<String>;

    /// Checked values of a checkbox group, `None` when the group is absent.
    fn checked(&self, group: &str) -> Option<Vec<String>>;
}

/// In-memory facet controls, keyed by control name.
#[derive(Debug, Clone, Default)]
pub struct FacetInputs {
    values: HashMap<String, String>,
    groups: HashMap<String, Vec<String>>,
}

impl FacetInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, control: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(control.into(), value.into());
        self
    }

    pub fn with_checked<I, S>(mut self, group: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups
            .insert(group.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_query(self, query: impl Into<String>) -> Self {
        self.with_value(QUERY_CONTROL, query)
    }

    pub fn with_bounds(self, field: NumericField, min: &str, max: &str) -> Self {
        self.with_value(min_control(field), min)
            .with_value(max_control(field), max)
    }
}

impl FacetSource for FacetInputs {
    fn value(&self, control: &str) -> Option<String> {
        self.values.get(control).cloned()
    }

    fn checked(&self, group: &str) -> Option<Vec<String>> {
        self.groups.get(group).cloned()
    }
}

pub fn min_control(field: NumericField) -> String {
    format!("{}-min", field.input_name())
}

pub fn max_control(field: NumericField) -> String {
    format!("{}-max", field.input_name())
}

/// Builds a fresh snapshot from whatever controls `source` exposes.
///
/// Each recognised control is read once. Unparsable numeric bounds are
/// treated as if they had been left blank.
pub fn collect_filters<S>(source: &S) -> FilterSnapshot
where
    S: FacetSource + ?Sized,
{
    let query = source.value(QUERY_CONTROL).unwrap_or_default();
    let metric = source
        .value(METRIC_CONTROL)
        .and_then(|value| value.parse::<SimilarityMetric>().ok())
        .unwrap_or_default();

    let mut snapshot = FilterSnapshot::new(query.trim(), metric);

    for field in NumericField::ALL {
        let min = parse_bound(source.value(&min_control(field)));
        let max = parse_bound(source.value(&max_control(field)));
        snapshot = snapshot.with_range(field, min, max);
    }

    for field in CategoricalField::ALL {
        if let Some(value) = source.value(field.input_name()) {
            snapshot = snapshot.with_category(field, value);
        }
    }

    if let Some(amenities) = source.checked(AMENITY_GROUP) {
        snapshot = snapshot.with_amenities(amenities);
    }

    snapshot
        .with_superhost(source.value(SUPERHOST_CONTROL).and_then(|value| parse_flag(&value)))
        .with_min_reviews(parse_bound(source.value(MIN_REVIEWS_CONTROL)))
}

pub fn parse_bound(raw: Option<String>) -> Option<f64> {
    let raw = raw?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "t" | "yes" | "1" => Some(true),
        "false" | "f" | "no" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct CountingSource {
        inner: FacetInputs,
        reads: RefCell<HashMap<String, usize>>,
    }

    impl FacetSource for CountingSource {
        fn value(&self, control: &str) -> Option<String> {
            *self.reads.borrow_mut().entry(control.to_string()).or_default() += 1;
            self.inner.value(control)
        }

        fn checked(&self, group: &str) -> Option<Vec<String>> {
            *self.reads.borrow_mut().entry(group.to_string()).or_default() += 1;
            self.inner.checked(group)
        }
    }

    #[test]
    fn empty_page_yields_bare_snapshot() {
        let snapshot = collect_filters(&FacetInputs::new());
        assert_eq!(snapshot.query(), "");
        assert_eq!(snapshot.similarity_metric(), SimilarityMetric::Cosine);
        assert!(snapshot.numeric_ranges().is_empty());
        assert!(snapshot.categorical().is_empty());
        assert!(snapshot.amenities().is_none());
        assert!(snapshot.superhost().is_none());
    }

    #[test]
    fn range_present_only_when_a_bound_is_supplied() {
        let inputs = FacetInputs::new()
            .with_query("cozy loft")
            .with_bounds(NumericField::Price, "50", "")
            .with_bounds(NumericField::Beds, "", "")
            .with_value(max_control(NumericField::Bedrooms), "3");

        let snapshot = collect_filters(&inputs);
        let price = snapshot.range(NumericField::Price).expect("price range");
        assert_eq!(price.min, Some(50.0));
        assert_eq!(price.max, None);
        assert!(snapshot.range(NumericField::Beds).is_none());

        let bedrooms = snapshot.range(NumericField::Bedrooms).expect("bedrooms range");
        assert_eq!(bedrooms.min, None);
        assert_eq!(bedrooms.max, Some(3.0));
    }

    #[test]
    fn unparsable_bound_behaves_like_blank() {
        let inputs = FacetInputs::new()
            .with_bounds(NumericField::Rating, "abc", "")
            .with_bounds(NumericField::Accommodates, "two", "4");

        let snapshot = collect_filters(&inputs);
        assert!(snapshot.range(NumericField::Rating).is_none());

        let accommodates = snapshot
            .range(NumericField::Accommodates)
            .expect("max bound survives");
        assert_eq!(accommodates.min, None);
        assert_eq!(accommodates.max, Some(4.0));
    }

    #[test]
    fn categorical_and_amenities_skip_empty_values() {
        let inputs = FacetInputs::new()
            .with_value("room_type", "")
            .with_value("neighbourhood_cleansed", "Catania")
            .with_checked(AMENITY_GROUP, Vec::<String>::new());

        let snapshot = collect_filters(&inputs);
        assert!(snapshot.category(CategoricalField::RoomType).is_none());
        assert_eq!(
            snapshot.category(CategoricalField::Neighbourhood),
            Some("Catania")
        );
        assert!(snapshot.amenities().is_none());
    }

    #[test]
    fn unknown_metric_falls_back_to_cosine() {
        let inputs = FacetInputs::new().with_value(METRIC_CONTROL, "euclidean");
        assert_eq!(
            collect_filters(&inputs).similarity_metric(),
            SimilarityMetric::Cosine
        );

        let inputs = FacetInputs::new().with_value(METRIC_CONTROL, "dice");
        assert_eq!(collect_filters(&inputs).similarity_metric(), SimilarityMetric::Dice);
    }

    #[test]
    fn superhost_and_min_reviews_are_optional_facets() {
        let inputs = FacetInputs::new()
            .with_value(SUPERHOST_CONTROL, "on")
            .with_value(MIN_REVIEWS_CONTROL, "10");
        let snapshot = collect_filters(&inputs);
        assert_eq!(snapshot.superhost(), Some(true));
        assert_eq!(snapshot.min_reviews(), Some(10.0));

        let inputs = FacetInputs::new().with_value(SUPERHOST_CONTROL, "");
        assert_eq!(collect_filters(&inputs).superhost(), None);
    }

    #[test]
    fn each_control_is_read_once() {
        let source = CountingSource {
            inner: FacetInputs::new().with_query("villa"),
            reads: RefCell::new(HashMap::new()),
        };

        collect_filters(&source);
        let reads = source.reads.borrow();
        assert!(!reads.is_empty());
        assert!(reads.values().all(|count| *count == 1));
    }

    #[test]
    fn non_finite_bounds_are_ignored() {
        assert_eq!(parse_bound(Some("NaN".to_string())), None);
        assert_eq!(parse_bound(Some("inf".to_string())), None);
        assert_eq!(parse_bound(Some(" 12.5 ".to_string())), Some(12.5));
        assert_eq!(parse_bound(None), None);
    }
}
