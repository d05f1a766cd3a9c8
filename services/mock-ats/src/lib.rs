//! In-memory stand-in for an Ashby-style ATS
//!
//! Implements the four endpoints the Ashby adapter calls, plus `GET /` for a
//! quick liveness check. Every endpoint except `/` demands an `Authorization`
//! header exactly equal to `Basic <api key>`; anything else is a 401.
//!
//! State lives in a `MockStore` created at process start. Created applications
//! are appended to a list and never removed; restarting the process resets it.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Key the mock accepts unless told otherwise.
pub const MOCK_API_KEY: &str = "mock-key-12345";

/// The mock does not track which candidate owns an application; listed
/// applications all carry this identity.
pub const PLACEHOLDER_CANDIDATE_NAME: &str = "Test Candidate";
pub const PLACEHOLDER_CANDIDATE_EMAIL: &str = "test@example.com";

/// Status assigned to every new application.
pub const NEW_APPLICATION_STATUS: &str = "Active";

/// Job posting as returned by `/jobBoard.listJobs`.
#[derive(Debug, Clone, Serialize)]
pub struct MockJob {
    pub id: String,
    pub title: String,
    pub location: String,
    #[serde(rename = "jobUrl")]
    pub job_url: String,
}

/// Application record as stored and returned by `/application.create`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MockApplication {
    pub id: String,
    pub candidate_id: Option<String>,
    pub job_id: Option<String>,
    pub status: String,
}

/// Process-wide mock state shared by all handlers.
pub struct MockStore {
    expected_authorization: String,
    jobs: Vec<MockJob>,
    applications: Mutex<Vec<MockApplication>>,
}

impl MockStore {
    /// Store seeded with the two demo jobs.
    pub fn new(api_key: &str) -> Self {
        Self::with_jobs(api_key, seed_jobs())
    }

    pub fn with_jobs(api_key: &str, jobs: Vec<MockJob>) -> Self {
        Self {
            expected_authorization: format!("Basic {api_key}"),
            jobs,
            applications: Mutex::new(Vec::new()),
        }
    }

    pub fn jobs(&self) -> &[MockJob] {
        &self.jobs
    }

    fn is_authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == self.expected_authorization)
    }

    /// Append a new application and return it.
    pub async fn record_application(
        &self,
        candidate_id: Option<String>,
        job_id: Option<String>,
    ) -> MockApplication {
        let application = MockApplication {
            id: uuid::Uuid::new_v4().to_string(),
            candidate_id,
            job_id,
            status: NEW_APPLICATION_STATUS.to_string(),
        };
        self.applications.lock().await.push(application.clone());
        application
    }

    /// Applications whose job id equals `job_id` (a missing id only matches
    /// applications created without one).
    pub async fn applications_for(&self, job_id: Option<&str>) -> Vec<MockApplication> {
        self.applications
            .lock()
            .await
            .iter()
            .filter(|a| a.job_id.as_deref() == job_id)
            .cloned()
            .collect()
    }

    pub async fn application_count(&self) -> usize {
        self.applications.lock().await.len()
    }
}

/// The demo postings every fresh mock starts with.
pub fn seed_jobs() -> Vec<MockJob> {
    vec![
        MockJob {
            id: "job_001".into(),
            title: "Software Engineer".into(),
            location: "Remote".into(),
            job_url: "http://localhost:5000/jobs/1".into(),
        },
        MockJob {
            id: "job_002".into(),
            title: "Product Manager".into(),
            location: "New York".into(),
            job_url: "http://localhost:5000/jobs/2".into(),
        },
    ]
}

/// Build the mock router with all endpoints and shared state.
pub fn build_router(store: Arc<MockStore>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/jobBoard.listJobs", post(list_jobs))
        .route("/candidate.create", post(create_candidate))
        .route("/application.create", post(create_application))
        .route("/application.list", post(list_applications))
        .with_state(store)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "detail": "Unauthorized: Invalid API Key" })),
    )
        .into_response()
}

/// Check the auth header, then parse the body as a JSON object.
///
/// Auth runs first so a bad key is always a 401, whatever the body looks like.
fn authorize_and_parse(
    store: &MockStore,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Map<String, Value>, Response> {
    if !store.is_authorized(headers) {
        warn!("rejecting request with invalid API key");
        return Err(unauthorized());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": "request body must be a JSON object" })),
        )
            .into_response()),
        Err(e) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": format!("invalid JSON body: {e}") })),
        )
            .into_response()),
    }
}

fn string_field(payload: &Map<String, Value>, key: &str) -> Option<String> {
    payload.get(key).and_then(Value::as_str).map(str::to_string)
}

/// `GET /`: liveness plus the key clients should use.
async fn root(State(store): State<Arc<MockStore>>) -> Json<Value> {
    let api_key = store
        .expected_authorization
        .strip_prefix("Basic ")
        .unwrap_or_default();
    Json(json!({
        "message": "Mock ATS API is running",
        "api_key_to_use": api_key,
    }))
}

/// POST /jobBoard.listJobs
async fn list_jobs(
    State(store): State<Arc<MockStore>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(rejection) = authorize_and_parse(&store, &headers, &body) {
        return rejection;
    }
    debug!(jobs = store.jobs.len(), "listing jobs");
    Json(json!({ "results": store.jobs })).into_response()
}

/// `POST /candidate.create`: mints an id, echoes name and email.
async fn create_candidate(
    State(store): State<Arc<MockStore>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let payload = match authorize_and_parse(&store, &headers, &body) {
        Ok(p) => p,
        Err(rejection) => return rejection,
    };
    let candidate_id = uuid::Uuid::new_v4().to_string();
    info!(candidate_id = %candidate_id, "candidate created");
    Json(json!({
        "id": candidate_id,
        "name": payload.get("name"),
        "email": payload.get("email"),
    }))
    .into_response()
}

/// POST /application.create
async fn create_application(
    State(store): State<Arc<MockStore>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let payload = match authorize_and_parse(&store, &headers, &body) {
        Ok(p) => p,
        Err(rejection) => return rejection,
    };
    let application = store
        .record_application(
            string_field(&payload, "candidateId"),
            string_field(&payload, "jobId"),
        )
        .await;
    info!(
        application_id = %application.id,
        job_id = application.job_id.as_deref().unwrap_or("-"),
        "application created"
    );
    Json(application).into_response()
}

/// `POST /application.list`: filter by `jobId`, enrich with placeholder candidate.
async fn list_applications(
    State(store): State<Arc<MockStore>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let payload = match authorize_and_parse(&store, &headers, &body) {
        Ok(p) => p,
        Err(rejection) => return rejection,
    };
    let job_id = string_field(&payload, "jobId");
    let results: Vec<Value> = store
        .applications_for(job_id.as_deref())
        .await
        .into_iter()
        .map(|a| {
            json!({
                "id": a.id,
                "status": a.status,
                "candidate": {
                    "name": PLACEHOLDER_CANDIDATE_NAME,
                    "email": PLACEHOLDER_CANDIDATE_EMAIL,
                },
            })
        })
        .collect();
    Json(json!({ "results": results })).into_response()
}
