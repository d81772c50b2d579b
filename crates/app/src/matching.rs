//! Matchmaking endpoints: researcher lookup and the matching lifecycle
//! between researchers and company project postings.

use crate::server::{ApiError, AppState};
use axum::extract::{Path, Query, State};
use axum::Json;
use researcher_match_core::RESEARCHER_LIST_LIMIT;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    name: String,
}

#[derive(Debug, Deserialize)]
pub struct MatchingFilter {
    researcher_id: i32,
    matching_status: i32,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    new_status: i32,
}

/// GET /researchers - the first researchers in the directory.
pub async fn list_researchers(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let researchers = state.store()?.list_researchers(RESEARCHER_LIST_LIMIT).await?;
    Ok(Json(json!({"status": "success", "researchers": researchers})))
}

/// GET /search-researcher?name= - case-insensitive substring match on the name.
pub async fn search_researcher(
    State(state): State<AppState>,
    Query(query): Query<NameQuery>,
) -> Result<Json<Value>, ApiError> {
    let name = query.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".to_string()));
    }

    let researchers = state.store()?.find_researchers_by_name(name).await?;
    if researchers.is_empty() {
        return Ok(Json(json!({"status": "not_found"})));
    }
    Ok(Json(json!({"status": "success", "researchers": researchers})))
}

/// GET /matching-information?researcher_id=&matching_status=
pub async fn matching_information(
    State(state): State<AppState>,
    Query(filter): Query<MatchingFilter>,
) -> Result<Json<Value>, ApiError> {
    let projects = state
        .store()?
        .matchings_for(filter.researcher_id, filter.matching_status)
        .await?;
    let total = projects.len();
    Ok(Json(json!({"status": "success", "projects": projects, "total": total})))
}

/// GET /matching-id/{matching_id}
pub async fn matching_by_id(
    State(state): State<AppState>,
    Path(matching_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let project = state
        .store()?
        .matching(matching_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("matching {matching_id} not found")))?;
    Ok(Json(json!({"status": "success", "project": project})))
}

/// PATCH /matching-status/{matching_id}?new_status=
pub async fn update_matching_status(
    State(state): State<AppState>,
    Path(matching_id): Path<i32>,
    Query(update): Query<StatusUpdate>,
) -> Result<Json<Value>, ApiError> {
    let found = state
        .store()?
        .update_matching_status(matching_id, update.new_status)
        .await?;
    if !found {
        return Err(ApiError::NotFound(format!("matching {matching_id} not found")));
    }

    info!(matching_id, new_status = update.new_status, "matching status updated");
    Ok(Json(json!({
        "status": "success",
        "matching_id": matching_id,
        "new_status": update.new_status,
    })))
}

#[cfg(test)]
mod tests {
    use crate::config::DynPipeline;
    use crate::server::{cors_layer, router, AppState};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use axum::response::Response;
    use axum::Router;
    use chrono::NaiveDate;
    use http_body_util::BodyExt;
    use researcher_match_core::{
        ChatCompletion, ChatRequest, Embedder, MatchPipeline, MatchedProject, MatchingStore,
        ProviderError, ResearcherAffiliation, ResearcherSummary, RetrievedCandidate, StoreError,
        VectorIndex,
    };
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tower::ServiceExt;

    struct NoEmbedder;

    #[async_trait]
    impl Embedder for NoEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
            Ok(vec![0.0])
        }
    }

    struct NoIndex;

    #[async_trait]
    impl VectorIndex for NoIndex {
        async fn nearest(
            &self,
            _query_vector: &[f32],
            _top_k: usize,
        ) -> Result<Vec<RetrievedCandidate>, ProviderError> {
            Ok(Vec::new())
        }
    }

    struct NoChat;

    #[async_trait]
    impl ChatCompletion for NoChat {
        async fn complete(&self, _request: &ChatRequest) -> Result<String, ProviderError> {
            Ok(String::new())
        }
    }

    #[derive(Default)]
    struct FakeStore {
        researchers: Vec<ResearcherSummary>,
        matchings: Mutex<Vec<MatchedProject>>,
        requested_limits: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl MatchingStore for FakeStore {
        async fn list_researchers(&self, limit: u32) -> Result<Vec<ResearcherSummary>, StoreError> {
            self.requested_limits
                .lock()
                .expect("lock should not be poisoned")
                .push(limit);
            Ok(self.researchers.iter().take(limit as usize).cloned().collect())
        }

        async fn find_researchers_by_name(
            &self,
            name: &str,
        ) -> Result<Vec<ResearcherAffiliation>, StoreError> {
            let needle = name.to_lowercase();
            Ok(self
                .researchers
                .iter()
                .filter(|researcher| researcher.researcher_name.to_lowercase().contains(&needle))
                .map(|researcher| ResearcherAffiliation {
                    researcher_id: researcher.researcher_id,
                    researcher_name: researcher.researcher_name.clone(),
                    researcher_affiliation_current: Some("Kyoto University".to_string()),
                    researcher_department_current: None,
                })
                .collect())
        }

        async fn matchings_for(
            &self,
            researcher_id: i32,
            matching_status: i32,
        ) -> Result<Vec<MatchedProject>, StoreError> {
            Ok(self
                .matchings
                .lock()
                .expect("lock should not be poisoned")
                .iter()
                .filter(|matching| {
                    matching.researcher_id == researcher_id
                        && matching.matching_status == matching_status
                })
                .cloned()
                .collect())
        }

        async fn matching(&self, matching_id: i32) -> Result<Option<MatchedProject>, StoreError> {
            Ok(self
                .matchings
                .lock()
                .expect("lock should not be poisoned")
                .iter()
                .find(|matching| matching.matching_id == matching_id)
                .cloned())
        }

        async fn update_matching_status(
            &self,
            matching_id: i32,
            matching_status: i32,
        ) -> Result<bool, StoreError> {
            let mut matchings = self.matchings.lock().expect("lock should not be poisoned");
            match matchings
                .iter_mut()
                .find(|matching| matching.matching_id == matching_id)
            {
                Some(matching) => {
                    matching.matching_status = matching_status;
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    fn researcher(id: i32, name: &str) -> ResearcherSummary {
        ResearcherSummary {
            researcher_id: id,
            researcher_name: name.to_string(),
            position: Some("Professor".to_string()),
            research_field: Some("NLP".to_string()),
            keywords: None,
        }
    }

    fn matched(matching_id: i32, researcher_id: i32, status: i32) -> MatchedProject {
        let matched_date = NaiveDate::from_ymd_opt(2024, 4, 1)
            .and_then(|date| date.and_hms_opt(9, 0, 0))
            .expect("valid timestamp");
        MatchedProject {
            matching_id,
            project_id: 100 + matching_id,
            researcher_id,
            matching_status: status,
            matched_date,
            project_title: Some(format!("project {matching_id}")),
            consultation_category: Some("AI".to_string()),
            project_content: None,
            research_field: Some("NLP".to_string()),
            application_deadline: None,
            budget: Some(1_000_000),
            company_user_name: Some("Sato".to_string()),
            department: None,
            company_name: Some("Acme".to_string()),
        }
    }

    fn seeded_store() -> Arc<FakeStore> {
        Arc::new(FakeStore {
            researchers: (1..=12)
                .map(|id| researcher(id, &format!("Researcher {id}")))
                .chain([researcher(40, "Hanako TANAKA")])
                .collect(),
            matchings: Mutex::new(vec![matched(7, 11, 0), matched(8, 11, 1), matched(9, 12, 0)]),
            ..Default::default()
        })
    }

    fn app(store: Option<Arc<FakeStore>>) -> Router {
        let pipeline: DynPipeline = MatchPipeline::new(
            Box::new(NoEmbedder) as Box<dyn Embedder>,
            Box::new(NoIndex) as Box<dyn VectorIndex>,
            Box::new(NoChat) as Box<dyn ChatCompletion>,
        );
        let state = AppState {
            pipeline: Arc::new(pipeline),
            store: store.map(|store| store as Arc<dyn MatchingStore>),
        };
        router(
            state,
            cors_layer(&[]).expect("wildcard cors is valid"),
            Duration::from_secs(10),
        )
    }

    async fn call(app: Router, method: Method, uri: &str) -> Response {
        app.oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("router should respond")
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should be readable")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("body should be json")
    }

    #[tokio::test]
    async fn researcher_listing_is_capped_at_ten() {
        let store = seeded_store();
        let response = call(app(Some(store.clone())), Method::GET, "/researchers").await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["researchers"].as_array().map(Vec::len), Some(10));
        assert_eq!(body["researchers"][0]["position"], "Professor");
        assert_eq!(
            *store.requested_limits.lock().expect("lock should not be poisoned"),
            vec![10]
        );
    }

    #[tokio::test]
    async fn name_search_reports_matches_and_misses() {
        let router = app(Some(seeded_store()));

        let hit = call(router.clone(), Method::GET, "/search-researcher?name=tanaka").await;
        let body = json_body(hit).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["researchers"][0]["researcher_id"], 40);
        assert_eq!(
            body["researchers"][0]["researcher_affiliation_current"],
            "Kyoto University"
        );

        let miss = call(router.clone(), Method::GET, "/search-researcher?name=suzuki").await;
        assert_eq!(miss.status(), StatusCode::OK);
        assert_eq!(json_body(miss).await, json!({"status": "not_found"}));

        let blank = call(router, Method::GET, "/search-researcher?name=%20").await;
        assert_eq!(blank.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn matching_information_filters_by_researcher_and_status() {
        let response = call(
            app(Some(seeded_store())),
            Method::GET,
            "/matching-information?researcher_id=11&matching_status=0",
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["projects"][0]["matching_id"], 7);
        assert_eq!(body["projects"][0]["company_name"], "Acme");
        assert_eq!(body["projects"][0]["matched_date"], "2024-04-01T09:00:00");
    }

    #[tokio::test]
    async fn matching_information_requires_both_filters() {
        let response = call(
            app(Some(seeded_store())),
            Method::GET,
            "/matching-information?researcher_id=11",
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_matching_id_is_not_found() {
        let router = app(Some(seeded_store()));

        let found = call(router.clone(), Method::GET, "/matching-id/8").await;
        let body = json_body(found).await;
        assert_eq!(body["project"]["matching_status"], 1);
        assert_eq!(body["project"]["project_title"], "project 8");

        let missing = call(router, Method::GET, "/matching-id/99").await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert!(json_body(missing)
            .await["error"]
            .as_str()
            .is_some_and(|text| text.contains("99")));
    }

    #[tokio::test]
    async fn status_update_is_persisted() {
        let store = seeded_store();
        let router = app(Some(store.clone()));

        let response = call(
            router.clone(),
            Method::PATCH,
            "/matching-status/7?new_status=2",
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"status": "success", "matching_id": 7, "new_status": 2})
        );

        let updated = store
            .matching(7)
            .await
            .expect("fake store does not fail")
            .expect("matching exists");
        assert_eq!(updated.matching_status, 2);

        let missing = call(router, Method::PATCH, "/matching-status/99?new_status=2").await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn routes_without_a_database_are_unavailable() {
        let response = call(app(None), Method::GET, "/researchers").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
