//! Ashby-style adapter: static API key, RPC-style POST endpoints.
//!
//! Wire contract (all `POST`, JSON bodies, `Authorization: Basic <api key>`):
//!
//! | operation            | path                  | payload                         |
//! |----------------------|-----------------------|---------------------------------|
//! | list jobs            | `/jobBoard.listJobs`  | `{"jobBoardName"}`              |
//! | create candidate     | `/candidate.create`   | `{name,email,phoneNumber,resumeUrl}` |
//! | attach to job        | `/application.create` | `{"candidateId","jobId"}`       |
//! | list applications    | `/application.list`   | `{"jobId"}`                     |
//!
//! The key is sent as-is after `Basic ` (not base64 encoded); the mock server
//! compares the header byte for byte.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use tracing::{info, instrument, warn};

use common::Secret;

use crate::http::send_json;
use crate::model::{Application, CandidateCreated, Job, JobStatus, NewCandidate};
use crate::{AssociationPolicy, AtsError, AtsProvider, Result, map_application_status};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_API_KEY: &str = "mock-key-12345";
pub const DEFAULT_JOB_BOARD: &str = "demo";

/// Settings for `AshbyProvider`.
#[derive(Debug, Clone)]
pub struct AshbyConfig {
    pub base_url: String,
    pub api_key: Secret<String>,
    pub job_board_name: String,
    pub association_policy: AssociationPolicy,
}

impl Default for AshbyConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: Secret::from(DEFAULT_API_KEY),
            job_board_name: DEFAULT_JOB_BOARD.to_string(),
            association_policy: AssociationPolicy::default(),
        }
    }
}

#[derive(Deserialize)]
struct ResultList<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Deserialize)]
struct AshbyJob {
    id: Option<String>,
    title: Option<String>,
    location: Option<String>,
    #[serde(rename = "jobUrl")]
    job_url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CandidatePayload<'a> {
    name: &'a str,
    email: &'a str,
    phone_number: Option<&'a str>,
    resume_url: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApplicationPayload<'a> {
    candidate_id: &'a str,
    job_id: &'a str,
}

#[derive(Deserialize)]
struct AshbyApplication {
    id: Option<String>,
    status: Option<String>,
    #[serde(default)]
    candidate: Option<AshbyCandidateRef>,
}

#[derive(Deserialize)]
struct AshbyCandidateRef {
    name: Option<String>,
    email: Option<String>,
}

/// Adapter for Ashby-style ATS APIs (and the bundled mock server).
pub struct AshbyProvider {
    client: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
    job_board_name: String,
    policy: AssociationPolicy,
}

impl AshbyProvider {
    /// Build the adapter. Fails only when the API key cannot be used as a
    /// header value.
    pub fn new(client: reqwest::Client, config: AshbyConfig) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Basic {}", config.api_key.expose()))
            .map_err(|e| AtsError::Internal(format!("invalid API key: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            headers,
            job_board_name: config.job_board_name,
            policy: config.association_policy,
        })
    }

    fn post<B: Serialize + ?Sized>(&self, method: &str, body: &B) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/{method}", self.base_url))
            .headers(self.headers.clone())
            .json(body)
    }

    #[instrument(skip_all, fields(provider = "ashby", board = %self.job_board_name))]
    async fn list_jobs(&self) -> Result<Vec<Job>> {
        let payload = serde_json::json!({ "jobBoardName": self.job_board_name });
        let list: Option<ResultList<AshbyJob>> =
            send_json(self.post("jobBoard.listJobs", &payload)).await?;

        let records = list.map(|l| l.results).unwrap_or_default();
        let jobs: Vec<Job> = records.into_iter().filter_map(to_canonical_job).collect();
        info!(jobs = jobs.len(), "fetched jobs");
        Ok(jobs)
    }

    #[instrument(skip_all, fields(provider = "ashby", job_id = %candidate.job_id))]
    async fn create_and_attach(&self, candidate: &NewCandidate) -> Result<CandidateCreated> {
        let payload = CandidatePayload {
            name: &candidate.name,
            email: &candidate.email,
            phone_number: candidate.phone.as_deref(),
            resume_url: candidate.resume_url.as_deref(),
        };
        let created: Option<serde_json::Value> =
            send_json(self.post("candidate.create", &payload)).await?;
        let candidate_id = created
            .as_ref()
            .and_then(extract_candidate_id)
            .ok_or(AtsError::MissingIdentifier)?;
        info!(candidate_id = %candidate_id, "candidate created");

        let association = send_json::<serde_json::Value>(self.post(
            "application.create",
            &ApplicationPayload {
                candidate_id: &candidate_id,
                job_id: &candidate.job_id,
            },
        ))
        .await
        .map(|_| ());

        self.policy
            .settle(self.id(), candidate_id, &candidate.job_id, association)
    }

    #[instrument(skip(self), fields(provider = "ashby"))]
    async fn list_applications(&self, job_id: &str) -> Result<Vec<Application>> {
        let payload = serde_json::json!({ "jobId": job_id });
        let list: Option<ResultList<AshbyApplication>> =
            send_json(self.post("application.list", &payload)).await?;

        let records = list.map(|l| l.results).unwrap_or_default();
        Ok(records
            .into_iter()
            .filter_map(to_canonical_application)
            .collect())
    }
}

/// Ashby job record → canonical job.
///
/// Status is always `OPEN`: the job-board endpoint only lists published
/// postings and carries no status field. Revisit if this adapter is pointed at
/// the full `job.list` API, which does.
fn to_canonical_job(job: AshbyJob) -> Option<Job> {
    let (Some(id), Some(title)) = (
        job.id.filter(|s| !s.is_empty()),
        job.title.filter(|s| !s.is_empty()),
    ) else {
        warn!("skipping job record without id or title");
        return None;
    };
    Some(Job {
        id,
        title,
        location: job.location.unwrap_or_default(),
        status: JobStatus::Open,
        external_url: job.job_url.unwrap_or_default(),
    })
}

fn to_canonical_application(app: AshbyApplication) -> Option<Application> {
    let Some(id) = app.id.filter(|s| !s.is_empty()) else {
        warn!("skipping application record without id");
        return None;
    };
    let (candidate_name, email) = app
        .candidate
        .map(|c| (c.name.unwrap_or_default(), c.email.unwrap_or_default()))
        .unwrap_or_default();
    Some(Application {
        id,
        candidate_name,
        email,
        status: map_application_status(app.status.as_deref()),
    })
}

/// The mock answers `{"id": ...}`; the hosted API wraps it as `{"results": {"id": ...}}`.
fn extract_candidate_id(body: &serde_json::Value) -> Option<String> {
    body.get("id")
        .or_else(|| body.get("results").and_then(|r| r.get("id")))
        .and_then(|id| id.as_str())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

impl AtsProvider for AshbyProvider {
    fn id(&self) -> &str {
        "ashby"
    }

    fn fetch_jobs(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Job>>> + Send + '_>> {
        Box::pin(self.list_jobs())
    }

    fn create_candidate<'a>(
        &'a self,
        candidate: &'a NewCandidate,
    ) -> Pin<Box<dyn Future<Output = Result<CandidateCreated>> + Send + 'a>> {
        Box::pin(self.create_and_attach(candidate))
    }

    fn fetch_applications<'a>(
        &'a self,
        job_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Application>>> + Send + 'a>> {
        Box::pin(self.list_applications(job_id))
    }
}
