//! Plain-text rendering of result views and dashboard charts.

use rental_search_core::{
    Bar, Bin, ChartSlot, Dashboard, PieSector, RenderableListing, ResultView, ViewContent,
};
use std::fmt::{self, Write};

const BAR_WIDTH: usize = 40;

pub fn result_view(view: &ResultView) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "{}", view.summary)?;

    let rows = match &view.content {
        ViewContent::Empty { message } => {
            writeln!(out, "{message}")?;
            return Ok(out);
        }
        ViewContent::Listings(rows) => rows,
    };

    for row in rows {
        let marker = if view.is_expanded(row.index) { "v" } else { ">" };
        writeln!(out, "\n{marker} [{}] {}", row.index, row.title)?;
        writeln!(out, "  Price: {}", row.price)?;
        writeln!(out, "  Type: {}", row.kind)?;
        writeln!(out, "  Location: {}", row.location)?;
        writeln!(out, "  Rating: {}", row.rating)?;
        writeln!(out, "  Accommodates: {}", row.accommodates)?;

        let mut amenities = row.amenity_preview.join(", ");
        if let Some(more) = &row.more_amenities {
            write!(amenities, " {more}")?;
        }
        writeln!(out, "  Amenities: {amenities}")?;

        let scores: Vec<String> = row
            .similarity
            .iter()
            .map(|annotation| {
                let score = annotation
                    .score
                    .map(|score| format!("{score:.3}"))
                    .unwrap_or_else(|| "-".to_string());
                if annotation.primary {
                    format!("*{}={score}", annotation.metric)
                } else {
                    format!("{}={score}", annotation.metric)
                }
            })
            .collect();
        writeln!(out, "  Similarity: {}", scores.join(" "))?;

        if view.is_expanded(row.index) {
            detail(&mut out, row)?;
        }
    }

    Ok(out)
}

fn detail(out: &mut String, row: &RenderableListing) -> fmt::Result {
    let detail = &row.detail;
    writeln!(out, "  ---")?;
    writeln!(out, "  Description: {}", detail.description)?;
    writeln!(out, "  Neighborhood: {}", detail.neighborhood_overview)?;
    writeln!(
        out,
        "  Bedrooms: {}  Beds: {}  Bathrooms: {}",
        detail.bedrooms, detail.beds, detail.bathrooms
    )?;
    writeln!(
        out,
        "  Nights: {} to {}",
        detail.minimum_nights, detail.maximum_nights
    )?;
    writeln!(out, "  All amenities: {}", detail.amenities.join(", "))?;

    let host = &detail.host;
    let badge = if host.superhost { " (Superhost)" } else { "" };
    writeln!(out, "  Hosted by {}{badge}", host.name)?;
    writeln!(
        out,
        "  Host since {}, {}; responds {} ({}), accepts {}; {} listings; identity verified: {}",
        host.since,
        host.location,
        host.response_time,
        host.response_rate,
        host.acceptance_rate,
        host.listings_count,
        if host.identity_verified { "Yes" } else { "No" }
    )?;
    if let Some(about) = &host.about {
        writeln!(out, "  About the host: {about}")?;
    }

    writeln!(out, "  Reviews: {} · {} reviews", row.rating, detail.review_count)?;
    for subscore in &detail.subscores {
        let filled = subscore
            .fraction
            .map(|fraction| scaled(fraction, 1.0, 20))
            .unwrap_or(0);
        writeln!(
            out,
            "    {:<14} {:>4} {}",
            subscore.label,
            subscore.score,
            "#".repeat(filled)
        )?;
    }

    if let Some(url) = &detail.listing_url {
        writeln!(out, "  {url}")?;
    }

    Ok(())
}

pub fn dashboard(dashboard: &Dashboard) -> Result<String, fmt::Error> {
    let mut out = String::new();

    writeln!(out, "Price distribution")?;
    match &dashboard.price_histogram {
        ChartSlot::Ready(bins) => histogram(&mut out, bins)?,
        ChartSlot::Unavailable(reason) => {
            writeln!(out, "  {reason}")?;
        }
    }

    writeln!(out, "\nProperty types")?;
    bars(&mut out, &dashboard.property_types)?;

    writeln!(out, "\nRoom types")?;
    match &dashboard.room_types {
        ChartSlot::Ready(sectors) => pie(&mut out, sectors)?,
        ChartSlot::Unavailable(reason) => {
            writeln!(out, "  {reason}")?;
        }
    }

    writeln!(out, "\nTop amenities")?;
    bars(&mut out, &dashboard.amenities)?;

    writeln!(out, "\nWord cloud")?;
    match &dashboard.word_cloud {
        ChartSlot::Ready(image) => {
            writeln!(out, "  {} byte PNG", image.png.len())?;
        }
        ChartSlot::Unavailable(reason) => {
            writeln!(out, "  {reason}")?;
        }
    }

    for chart in &dashboard.truncated {
        writeln!(out, "note: {chart} had mismatched arrays and was truncated")?;
    }

    Ok(out)
}

fn histogram(out: &mut String, bins: &[Bin]) -> fmt::Result {
    let max = bins.iter().map(|bin| bin.count).max().unwrap_or(0);
    for bin in bins {
        let close = if bin.closed { ']' } else { ')' };
        writeln!(
            out,
            "  [{:>9.2}, {:>9.2}{close} {:>6} {}",
            bin.lower_bound,
            bin.upper_bound,
            bin.count,
            "#".repeat(scaled(bin.count as f64, max as f64, BAR_WIDTH))
        )?;
    }

    Ok(())
}

fn bars(out: &mut String, slot: &ChartSlot<Vec<Bar>>) -> fmt::Result {
    let bars = match slot {
        ChartSlot::Ready(bars) => bars,
        ChartSlot::Unavailable(reason) => {
            return writeln!(out, "  {reason}");
        }
    };

    let extent = bars.iter().map(|bar| bar.length).fold(0.0, f64::max);
    for bar in bars {
        writeln!(
            out,
            "  {:<28} {:>7} {}",
            bar.category,
            bar.count,
            "#".repeat(scaled(bar.length, extent, BAR_WIDTH))
        )?;
    }

    Ok(())
}

fn pie(out: &mut String, sectors: &[PieSector]) -> fmt::Result {
    for sector in sectors {
        writeln!(
            out,
            "  {:<32} {:>6.1}%  {:>6.1}° - {:>6.1}°",
            sector.label(),
            sector.percentage,
            sector.start_angle.to_degrees(),
            sector.end_angle.to_degrees()
        )?;
    }

    Ok(())
}

fn scaled(value: f64, max: f64, width: usize) -> usize {
    if max <= 0.0 || !value.is_finite() {
        return 0;
    }
    ((value / max) * width as f64).round().clamp(0.0, width as f64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use rental_search_core::{
        histogram as bucket, pie_layout, ListingResult, ResultViewBuilder, SearchResponse,
        SimilarityMetric,
    };

    #[test]
    fn empty_view_prints_message() {
        let view = ResultViewBuilder::default().render(
            1,
            &SearchResponse::default(),
            SimilarityMetric::Cosine,
        );
        let text = result_view(&view).expect("render");
        assert!(text.contains("Found 0 listings"));
        assert!(text.contains("No results found."));
    }

    #[test]
    fn expanded_rows_show_details() {
        let response = SearchResponse {
            results: vec![ListingResult {
                name: Some("Loft".to_string()),
                host_name: Some("Giulia".to_string()),
                ..ListingResult::default()
            }],
            total_matches: 1,
            total_filtered: 1,
        };
        let mut view =
            ResultViewBuilder::default().render(1, &response, SimilarityMetric::Cosine);
        assert!(!result_view(&view).expect("render").contains("Hosted by Giulia"));

        view.toggle(0);
        assert!(result_view(&view).expect("render").contains("Hosted by Giulia"));
    }

    #[test]
    fn dashboard_text_lists_each_chart() {
        let dashboard = Dashboard {
            price_histogram: ChartSlot::Ready(bucket(&[10.0, 20.0], 2)),
            property_types: ChartSlot::Unavailable("property types not supplied".to_string()),
            room_types: ChartSlot::Ready(pie_layout(&["Private room".to_string()], &[4])),
            amenities: ChartSlot::Unavailable("amenity counts not supplied".to_string()),
            word_cloud: ChartSlot::Unavailable("Error loading word cloud.".to_string()),
            truncated: Vec::new(),
        };

        let text = super::dashboard(&dashboard).expect("render");
        assert!(text.contains("Private room (4)"));
        assert!(text.contains("property types not supplied"));
        assert!(text.contains("Error loading word cloud."));
    }

    #[test]
    fn scaling_never_exceeds_width() {
        assert_eq!(scaled(5.0, 10.0, 40), 20);
        assert_eq!(scaled(12.0, 10.0, 40), 40);
        assert_eq!(scaled(3.0, 0.0, 40), 0);
    }
}
