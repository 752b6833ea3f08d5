use crate::facets::{collect_filters, FacetSource};
use crate::traits::SearchBackend;
use crate::view::{ResultView, ResultViewBuilder};
use crate::{SearchError, SearchRequest, SearchResponse};
use chrono::Utc;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchFailure {
    /// Nothing to search for; the user is prompted and no request is sent.
    EmptyQuery,
    TransportError { message: String },
}

impl SearchFailure {
    pub fn message(&self) -> String {
        match self {
            Self::EmptyQuery => "Please enter a search query".to_string(),
            Self::TransportError { message } => message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchPhase {
    #[default]
    Idle,
    Validating,
    Loading { sequence: u64 },
    Success { sequence: u64 },
    Failure(SearchFailure),
}

/// What happened to one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Rendered { sequence: u64, rows: usize },
    Empty { sequence: u64 },
    /// A newer request was issued before this one resolved.
    Discarded { sequence: u64 },
    Failed(SearchFailure),
}

#[derive(Debug, Default)]
struct OrchestratorState {
    phase: SearchPhase,
    last_issued: u64,
    view: Option<ResultView>,
}

/// Owns the search request lifecycle and the currently displayed view.
///
/// Every issued request gets the next sequence number. A response is only
/// rendered when its sequence number is still the highest one issued, so a
/// slow earlier request can never overwrite a newer result set.
pub struct SearchOrchestrator<B>
where
    B: SearchBackend,
{
    backend: B,
    builder: ResultViewBuilder,
    state: Mutex<OrchestratorState>,
}

impl<B> SearchOrchestrator<B>
where
    B: SearchBackend + Send + Sync,
{
    pub fn new(backend: B, builder: ResultViewBuilder) -> Self {
        Self {
            backend,
            builder,
            state: Mutex::new(OrchestratorState::default()),
        }
    }

    /// Validates, issues and resolves one search.
    pub async fn submit<S>(&self, query_text: &str, facets: &S) -> SearchOutcome
    where
        S: FacetSource + ?Sized,
    {
        let request = match self.begin(query_text, facets) {
            Ok(request) => request,
            Err(failure) => return SearchOutcome::Failed(failure),
        };

        let result = self.backend.search(&request).await;
        self.complete(&request, result)
    }

    /// Validation and issue half of [`submit`](Self::submit).
    pub fn begin<S>(&self, query_text: &str, facets: &S) -> Result<SearchRequest, SearchFailure>
    where
        S: FacetSource + ?Sized,
    {
        let mut state = self.lock();
        state.phase = SearchPhase::Validating;

        let query = query_text.trim();
        if query.is_empty() {
            state.phase = SearchPhase::Failure(SearchFailure::EmptyQuery);
            return Err(SearchFailure::EmptyQuery);
        }

        // The submitted text wins over whatever the query control holds.
        let filters = collect_filters(facets).with_query(query);
        state.last_issued += 1;
        let sequence = state.last_issued;
        state.phase = SearchPhase::Loading { sequence };
        state.view = None;

        debug!(
            sequence,
            query,
            metric = %filters.similarity_metric(),
            "search request issued"
        );

        Ok(SearchRequest {
            sequence,
            query: query.to_string(),
            filters,
            issued_at: Utc::now(),
        })
    }

    /// Resolution half of [`submit`](Self::submit). Stale results leave the
    /// state untouched.
    pub fn complete(
        &self,
        request: &SearchRequest,
        result: Result<SearchResponse, SearchError>,
    ) -> SearchOutcome {
        let mut state = self.lock();
        let sequence = request.sequence;

        if sequence != state.last_issued {
            debug!(
                sequence,
                latest = state.last_issued,
                "discarding superseded search response"
            );
            return SearchOutcome::Discarded { sequence };
        }

        match result {
            Ok(mut response) => {
                let metric = request.filters.similarity_metric();
                for listing in &mut response.results {
                    listing.attribute_legacy_score(metric);
                }

                let view = self.builder.render(sequence, &response, metric);
                let rows = view.rows().len();
                state.phase = SearchPhase::Success { sequence };
                state.view = Some(view);

                debug!(sequence, rows, total = response.total_matches, "search rendered");
                if rows == 0 {
                    SearchOutcome::Empty { sequence }
                } else {
                    SearchOutcome::Rendered { sequence, rows }
                }
            }
            Err(error) => {
                warn!(sequence, error = %error, "search request failed");
                let failure = SearchFailure::TransportError {
                    message: format!(
                        "An error occurred while searching. Please try again. ({error})"
                    ),
                };
                state.phase = SearchPhase::Failure(failure.clone());
                state.view = None;
                SearchOutcome::Failed(failure)
            }
        }
    }

    /// Flips the expansion of row `index` in the displayed view.
    pub fn toggle(&self, index: usize) -> Option<bool> {
        self.lock().view.as_mut()?.toggle(index)
    }

    pub fn phase(&self) -> SearchPhase {
        self.lock().phase.clone()
    }

    /// Moves a settled `Success` or `Failure` back to `Idle` once the host has
    /// shown it. The displayed view is kept; a loading request is unaffected.
    pub fn acknowledge(&self) -> SearchPhase {
        let mut state = self.lock();
        if matches!(
            state.phase,
            SearchPhase::Success { .. } | SearchPhase::Failure(_)
        ) {
            state.phase = SearchPhase::Idle;
        }
        state.phase.clone()
    }

    pub fn view(&self) -> Option<ResultView> {
        self.lock().view.clone()
    }

    pub fn last_issued(&self) -> u64 {
        self.lock().last_issued
    }

    fn lock(&self) -> MutexGuard<'_, OrchestratorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facets::FacetInputs;
    use crate::models::{ListingResult, NumericField};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    fn listings(count: usize) -> Vec<ListingResult> {
        (0..count)
            .map(|index| ListingResult {
                name: Some(format!("listing {index}")),
                ..ListingResult::default()
            })
            .collect()
    }

    #[derive(Default)]
    struct FakeBackend {
        response: Option<SearchResponse>,
        calls: AtomicUsize,
        bodies: Mutex<Vec<serde_json::Value>>,
    }

    #[async_trait]
    impl SearchBackend for FakeBackend {
        async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.bodies
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request.body());
            self.response
                .clone()
                .ok_or_else(|| SearchError::Request("connection refused".to_string()))
        }
    }

    /// Each query waits until the test releases its response.
    #[derive(Default)]
    struct GatedBackend {
        gates: Mutex<HashMap<String, oneshot::Receiver<SearchResponse>>>,
    }

    impl GatedBackend {
        fn gate(&self, query: &str) -> oneshot::Sender<SearchResponse> {
            let (sender, receiver) = oneshot::channel();
            self.gates
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(query.to_string(), receiver);
            sender
        }
    }

    #[async_trait]
    impl SearchBackend for GatedBackend {
        async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
            let receiver = self
                .gates
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&request.query)
                .ok_or_else(|| SearchError::Request("no gate".to_string()))?;
            receiver
                .await
                .map_err(|error| SearchError::Request(error.to_string()))
        }
    }

    #[tokio::test]
    async fn valid_query_issues_one_request_and_renders() {
        let backend = FakeBackend {
            response: Some(SearchResponse {
                results: listings(20),
                total_matches: 42,
                total_filtered: 42,
            }),
            ..FakeBackend::default()
        };
        let orchestrator = SearchOrchestrator::new(backend, ResultViewBuilder::default());

        let outcome = orchestrator.submit("cozy loft", &FacetInputs::new()).await;
        assert_eq!(outcome, SearchOutcome::Rendered { sequence: 1, rows: 20 });
        assert_eq!(orchestrator.backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(orchestrator.phase(), SearchPhase::Success { sequence: 1 });

        let view = orchestrator.view().expect("view rendered");
        assert_eq!(view.summary, "Found 42 listings");
        assert_eq!(view.rows().len(), 20);
        assert_eq!(view.state().expanded_count(), 0);
    }

    #[tokio::test]
    async fn request_body_carries_query_and_filters() {
        let backend = FakeBackend {
            response: Some(SearchResponse::default()),
            ..FakeBackend::default()
        };
        let orchestrator = SearchOrchestrator::new(backend, ResultViewBuilder::default());
        let facets = FacetInputs::new().with_bounds(NumericField::Price, "40", "120");

        orchestrator.submit("  sea view ", &facets).await;

        let bodies = orchestrator
            .backend
            .bodies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["query"], "sea view");
        assert_eq!(bodies[0]["filters"]["price_range"], serde_json::json!([40.0, 120.0]));
        assert_eq!(bodies[0]["filters"]["similarity_metric"], "cosine");
    }

    #[tokio::test]
    async fn blank_query_sends_nothing() {
        let orchestrator =
            SearchOrchestrator::new(FakeBackend::default(), ResultViewBuilder::default());

        let outcome = orchestrator.submit("   ", &FacetInputs::new()).await;
        assert_eq!(outcome, SearchOutcome::Failed(SearchFailure::EmptyQuery));
        assert_eq!(orchestrator.backend.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            orchestrator.phase(),
            SearchPhase::Failure(SearchFailure::EmptyQuery)
        );
        assert!(orchestrator.view().is_none());
        assert_eq!(orchestrator.last_issued(), 0);
    }

    #[tokio::test]
    async fn zero_results_is_a_success_with_empty_state() {
        let backend = FakeBackend {
            response: Some(SearchResponse::default()),
            ..FakeBackend::default()
        };
        let orchestrator = SearchOrchestrator::new(backend, ResultViewBuilder::default());

        let outcome = orchestrator.submit("castle", &FacetInputs::new()).await;
        assert_eq!(outcome, SearchOutcome::Empty { sequence: 1 });
        assert_eq!(orchestrator.phase(), SearchPhase::Success { sequence: 1 });
        assert!(orchestrator.view().expect("empty view").is_empty());
    }

    #[tokio::test]
    async fn transport_failure_is_surfaced_without_retry() {
        let orchestrator =
            SearchOrchestrator::new(FakeBackend::default(), ResultViewBuilder::default());

        let outcome = orchestrator.submit("villa", &FacetInputs::new()).await;
        assert!(matches!(
            outcome,
            SearchOutcome::Failed(SearchFailure::TransportError { .. })
        ));
        assert_eq!(orchestrator.backend.calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            orchestrator.phase(),
            SearchPhase::Failure(SearchFailure::TransportError { .. })
        ));
    }

    #[test]
    fn out_of_order_responses_only_render_latest() {
        let orchestrator =
            SearchOrchestrator::new(FakeBackend::default(), ResultViewBuilder::default());
        let facets = FacetInputs::new();

        let first = orchestrator.begin("first", &facets).expect("first issued");
        let second = orchestrator.begin("second", &facets).expect("second issued");
        assert_eq!((first.sequence, second.sequence), (1, 2));

        let second_response = SearchResponse {
            results: listings(2),
            total_matches: 2,
            total_filtered: 2,
        };
        assert_eq!(
            orchestrator.complete(&second, Ok(second_response)),
            SearchOutcome::Rendered { sequence: 2, rows: 2 }
        );
        orchestrator.toggle(1);

        let first_response = SearchResponse {
            results: listings(5),
            total_matches: 5,
            total_filtered: 5,
        };
        assert_eq!(
            orchestrator.complete(&first, Ok(first_response)),
            SearchOutcome::Discarded { sequence: 1 }
        );

        let view = orchestrator.view().expect("latest view kept");
        assert_eq!(view.sequence, 2);
        assert_eq!(view.rows().len(), 2);
        assert!(view.is_expanded(1));
        assert_eq!(orchestrator.phase(), SearchPhase::Success { sequence: 2 });
    }

    #[test]
    fn snapshot_records_the_submitted_query() {
        let orchestrator =
            SearchOrchestrator::new(FakeBackend::default(), ResultViewBuilder::default());

        let request = orchestrator
            .begin("  cozy loft ", &FacetInputs::new())
            .expect("issued");
        assert_eq!(request.query, "cozy loft");
        assert_eq!(request.filters.query(), request.query);

        let facets = FacetInputs::new().with_query("castle");
        let request = orchestrator.begin("cozy loft", &facets).expect("issued");
        assert_eq!(request.filters.query(), "cozy loft");
        assert_eq!(request.filters.query(), request.query);
    }

    #[test]
    fn stale_failure_is_not_reported() {
        let orchestrator =
            SearchOrchestrator::new(FakeBackend::default(), ResultViewBuilder::default());
        let facets = FacetInputs::new();

        let first = orchestrator.begin("first", &facets).expect("first issued");
        let _second = orchestrator.begin("second", &facets).expect("second issued");

        let outcome = orchestrator.complete(
            &first,
            Err(SearchError::Request("timeout".to_string())),
        );
        assert_eq!(outcome, SearchOutcome::Discarded { sequence: 1 });
        assert_eq!(orchestrator.phase(), SearchPhase::Loading { sequence: 2 });
    }

    #[tokio::test]
    async fn concurrent_searches_keep_the_newest_result() {
        let backend = GatedBackend::default();
        let release_first = backend.gate("first");
        let release_second = backend.gate("second");
        let orchestrator = SearchOrchestrator::new(backend, ResultViewBuilder::default());
        let facets = FacetInputs::new();

        let (first, second, ()) = tokio::join!(
            orchestrator.submit("first", &facets),
            orchestrator.submit("second", &facets),
            async {
                let _ = release_second.send(SearchResponse {
                    results: listings(1),
                    total_matches: 1,
                    total_filtered: 1,
                });
                tokio::task::yield_now().await;
                let _ = release_first.send(SearchResponse {
                    results: listings(3),
                    total_matches: 3,
                    total_filtered: 3,
                });
            }
        );

        assert_eq!(second, SearchOutcome::Rendered { sequence: 2, rows: 1 });
        assert_eq!(first, SearchOutcome::Discarded { sequence: 1 });
        assert_eq!(orchestrator.view().expect("view").rows().len(), 1);
    }

    #[test]
    fn acknowledge_returns_settled_phase_to_idle() {
        let orchestrator =
            SearchOrchestrator::new(FakeBackend::default(), ResultViewBuilder::default());
        let facets = FacetInputs::new();

        let request = orchestrator.begin("loft", &facets).expect("issued");
        assert_eq!(
            orchestrator.acknowledge(),
            SearchPhase::Loading { sequence: 1 }
        );

        orchestrator.complete(&request, Ok(SearchResponse::default()));
        assert_eq!(orchestrator.acknowledge(), SearchPhase::Idle);
        assert!(orchestrator.view().is_some());
    }

    #[tokio::test]
    async fn new_response_resets_expansion() {
        let backend = FakeBackend {
            response: Some(SearchResponse {
                results: listings(3),
                total_matches: 3,
                total_filtered: 3,
            }),
            ..FakeBackend::default()
        };
        let orchestrator = SearchOrchestrator::new(backend, ResultViewBuilder::default());

        orchestrator.submit("loft", &FacetInputs::new()).await;
        assert_eq!(orchestrator.toggle(0), Some(true));
        assert_eq!(orchestrator.toggle(2), Some(true));

        orchestrator.submit("loft", &FacetInputs::new()).await;
        let view = orchestrator.view().expect("view");
        assert_eq!(view.sequence, 2);
        assert_eq!(view.state().expanded_count(), 0);
    }
}
