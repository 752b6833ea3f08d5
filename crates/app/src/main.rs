mod render;

use chrono::Utc;
use clap::{Parser, Subcommand};
use rental_search_core::facets::{
    max_control, min_control, AMENITY_GROUP, METRIC_CONTROL, MIN_REVIEWS_CONTROL,
    SUPERHOST_CONTROL,
};
use rental_search_core::{
    build_dashboard, fetch_aggregates, AggregateInput, CategoricalField, ChartOptions,
    ClientOptions, FacetInputs, HttpSearchBackend, NumericField, RenderOptions,
    ResultViewBuilder, SearchOrchestrator, SearchOutcome, SimilarityMetric, StaticStatistics,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "rental-search", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Base URL of the listing search application
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    endpoint: String,

    /// Path of the search endpoint
    #[arg(long, default_value = "/search")]
    search_path: String,

    /// Path of the word-cloud JSON resource
    #[arg(long, default_value = "/static/data/wordcloud_data.json")]
    word_cloud_path: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Search listings and print the ranked result view.
    Search {
        /// Free-text query
        #[arg(long)]
        query: String,
        /// Similarity metric used for ranking.
        #[arg(long)]
        metric: Option<SimilarityMetric>,
        #[arg(long)]
        price_min: Option<String>,
        #[arg(long)]
        price_max: Option<String>,
        #[arg(long)]
        rating_min: Option<String>,
        #[arg(long)]
        rating_max: Option<String>,
        #[arg(long)]
        accommodates_min: Option<String>,
        #[arg(long)]
        accommodates_max: Option<String>,
        #[arg(long)]
        bedrooms_min: Option<String>,
        #[arg(long)]
        bedrooms_max: Option<String>,
        #[arg(long)]
        beds_min: Option<String>,
        #[arg(long)]
        beds_max: Option<String>,
        #[arg(long)]
        host_response_time: Option<String>,
        #[arg(long)]
        neighbourhood: Option<String>,
        #[arg(long)]
        property_type: Option<String>,
        #[arg(long)]
        room_type: Option<String>,
        /// Required amenity; repeat for several.
        #[arg(long = "amenity")]
        amenities: Vec<String>,
        /// Only superhosts.
        #[arg(long, default_value_t = false)]
        superhost: bool,
        #[arg(long)]
        min_reviews: Option<String>,
        /// Expand the row at this position; repeat for several.
        #[arg(long = "expand")]
        expand: Vec<usize>,
        /// Currency symbol shown in front of prices.
        #[arg(long, default_value = "€")]
        currency: String,
        /// Number of amenities shown before "+N more".
        #[arg(long, default_value = "5")]
        amenity_preview: usize,
    },
    /// Load the statistics and print every dashboard chart.
    Stats {
        /// JSON document with the aggregate arrays.
        #[arg(long)]
        aggregates: Option<PathBuf>,
        /// Number of price histogram buckets.
        #[arg(long, default_value = "30")]
        buckets: usize,
        /// Write the decoded word-cloud PNG here.
        #[arg(long)]
        word_cloud_out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let client_options = ClientOptions {
        endpoint: cli.endpoint.clone(),
        search_path: cli.search_path.clone(),
        word_cloud_path: cli.word_cloud_path.clone(),
        timeout: Duration::from_secs(cli.timeout_secs),
    };

    info!(
        version = app_version,
        endpoint = %client_options.endpoint,
        started_at = %Utc::now().to_rfc3339(),
        "rental-search boot"
    );

    match cli.command {
        Command::Search {
            query,
            metric,
            price_min,
            price_max,
            rating_min,
            rating_max,
            accommodates_min,
            accommodates_max,
            bedrooms_min,
            bedrooms_max,
            beds_min,
            beds_max,
            host_response_time,
            neighbourhood,
            property_type,
            room_type,
            amenities,
            superhost,
            min_reviews,
            expand,
            currency,
            amenity_preview,
        } => {
            let mut facets = FacetInputs::new().with_query(query.clone());
            if let Some(metric) = metric {
                facets = facets.with_value(METRIC_CONTROL, metric.as_str());
            }

            let bounds = [
                (NumericField::Price, price_min, price_max),
                (NumericField::Rating, rating_min, rating_max),
                (NumericField::Accommodates, accommodates_min, accommodates_max),
                (NumericField::Bedrooms, bedrooms_min, bedrooms_max),
                (NumericField::Beds, beds_min, beds_max),
            ];
            for (field, min, max) in bounds {
                if let Some(min) = min {
                    facets = facets.with_value(min_control(field), min);
                }
                if let Some(max) = max {
                    facets = facets.with_value(max_control(field), max);
                }
            }

            let categories = [
                (CategoricalField::HostResponseTime, host_response_time),
                (CategoricalField::Neighbourhood, neighbourhood),
                (CategoricalField::PropertyType, property_type),
                (CategoricalField::RoomType, room_type),
            ];
            for (field, value) in categories {
                if let Some(value) = value {
                    facets = facets.with_value(field.input_name(), value);
                }
            }

            if !amenities.is_empty() {
                facets = facets.with_checked(AMENITY_GROUP, amenities);
            }
            if superhost {
                facets = facets.with_value(SUPERHOST_CONTROL, "on");
            }
            if let Some(min_reviews) = min_reviews {
                facets = facets.with_value(MIN_REVIEWS_CONTROL, min_reviews);
            }

            let backend = HttpSearchBackend::new(&client_options)
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            let builder = ResultViewBuilder::new(RenderOptions {
                currency_symbol: currency,
                amenity_preview,
                ..RenderOptions::default()
            });
            let orchestrator = SearchOrchestrator::new(backend, builder);

            match orchestrator.submit(&query, &facets).await {
                SearchOutcome::Failed(failure) => {
                    println!("{}", failure.message());
                    return Ok(());
                }
                SearchOutcome::Discarded { sequence } => {
                    warn!(sequence, "search response superseded");
                    return Ok(());
                }
                SearchOutcome::Rendered { .. } | SearchOutcome::Empty { .. } => {}
            }

            for index in expand {
                if orchestrator.toggle(index).is_none() {
                    warn!(index, "no result row at this position");
                }
            }

            if let Some(view) = orchestrator.view() {
                print!("{}", render::result_view(&view)?);
            }
        }
        Command::Stats {
            aggregates,
            buckets,
            word_cloud_out,
        } => {
            let input = match aggregates {
                Some(path) => AggregateInput::File(path),
                None => AggregateInput::Missing,
            };
            let source = StaticStatistics::new(&client_options, input)
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            let report = fetch_aggregates(&source).await;
            let options = ChartOptions {
                histogram_buckets: buckets,
                ..ChartOptions::default()
            };
            let dashboard = build_dashboard(&report, &options);

            print!("{}", render::dashboard(&dashboard)?);

            if let (Some(path), Some(image)) = (word_cloud_out, dashboard.word_cloud.ready()) {
                tokio::fs::write(&path, &image.png).await?;
                println!("word cloud written to {}", path.display());
            }
        }
    }

    Ok(())
}
