//! Zoho Recruit adapter
//!
//! REST-style v2 API authenticated with an OAuth access token minted once at
//! construction from a self-client refresh token (see `zoho_auth`). The token
//! is not refreshed afterwards; once it expires every call fails with an
//! upstream 401 and the gateway must be restarted.
//!
//! | operation            | method + path                        |
//! |----------------------|--------------------------------------|
//! | list jobs            | `GET /JobOpenings`                   |
//! | create candidate     | `POST /Candidates`                   |
//! | attach to job        | `PUT /Candidates/actions/associate`  |
//! | list applications    | `GET /JobOpenings/{id}/associate`    |
//!
//! Record-level results arrive as `{"data": [...]}`. Write calls answer 2xx
//! even when the record was refused, so each entry's `status` is checked.

use reqwest::Url;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use tracing::{info, instrument, warn};

use ats_provider::http::send_json;
use ats_provider::{
    Application, AssociationPolicy, AtsError, AtsProvider, CandidateCreated, Job, JobStatus,
    NewCandidate, Result, map_application_status,
};
use zoho_auth::{AUTH_SCHEME, RefreshCredentials, acquire_or_placeholder};

/// Last name sent when the submitted name has no whitespace.
pub const PLACEHOLDER_LAST_NAME: &str = "Unknown";

/// Settings for `ZohoProvider::connect`.
#[derive(Debug)]
pub struct ZohoConfig {
    /// Recruit API root, e.g. `https://recruit.zoho.com/recruit/v2`
    pub base_url: String,
    pub token_url: String,
    /// Incomplete credentials are not an error here: the adapter starts with
    /// the placeholder token instead.
    pub credentials: zoho_auth::Result<RefreshCredentials>,
    pub association_policy: AssociationPolicy,
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Deserialize)]
struct ZohoJob {
    id: Option<serde_json::Value>,
    #[serde(rename = "Posting_Title")]
    posting_title: Option<String>,
    #[serde(rename = "City")]
    city: Option<String>,
    #[serde(rename = "Job_Opening_Status")]
    status: Option<String>,
    #[serde(rename = "Job_Opening_URL")]
    url: Option<String>,
}

#[derive(Serialize)]
struct CandidateRecord<'a> {
    #[serde(rename = "First_Name")]
    first_name: &'a str,
    #[serde(rename = "Last_Name")]
    last_name: &'a str,
    #[serde(rename = "Email")]
    email: &'a str,
    #[serde(rename = "Mobile", skip_serializing_if = "Option::is_none")]
    mobile: Option<&'a str>,
    #[serde(rename = "Resume_URL", skip_serializing_if = "Option::is_none")]
    resume_url: Option<&'a str>,
}

#[derive(Serialize)]
struct AssociateRecord<'a> {
    jobids: [&'a str; 1],
    ids: [&'a str; 1],
}

#[derive(Serialize)]
struct WriteEnvelope<T> {
    data: [T; 1],
}

#[derive(Deserialize)]
struct WriteResult {
    status: Option<String>,
    code: Option<String>,
    message: Option<String>,
    details: Option<WriteDetails>,
}

#[derive(Deserialize)]
struct WriteDetails {
    id: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ZohoApplicant {
    id: Option<serde_json::Value>,
    #[serde(rename = "Full_Name")]
    full_name: Option<String>,
    #[serde(rename = "First_Name")]
    first_name: Option<String>,
    #[serde(rename = "Last_Name")]
    last_name: Option<String>,
    #[serde(rename = "Email")]
    email: Option<String>,
    #[serde(rename = "Candidate_Status")]
    candidate_status: Option<String>,
}

/// Adapter for Zoho Recruit.
pub struct ZohoProvider {
    client: reqwest::Client,
    base_url: Url,
    headers: HeaderMap,
    policy: AssociationPolicy,
}

impl ZohoProvider {
    /// Exchange the refresh token and build the adapter.
    ///
    /// A failed exchange is logged and the placeholder token is used, so this
    /// only fails if the base URL or the resulting header value is unusable.
    pub async fn connect(client: reqwest::Client, config: ZohoConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| AtsError::Internal(format!("invalid base URL {}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(AtsError::Internal(format!(
                "base URL {base_url} cannot carry a path"
            )));
        }

        let token = acquire_or_placeholder(&client, &config.token_url, config.credentials).await;

        let mut auth = HeaderValue::from_str(&format!("{AUTH_SCHEME} {}", token.expose()))
            .map_err(|e| AtsError::Internal(format!("invalid access token: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        Ok(Self {
            client,
            base_url,
            headers,
            policy: config.association_policy,
        })
    }

    /// Base URL plus `segments`, each percent-encoded as a single path
    /// segment so caller-supplied ids cannot change the route.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        if let Some(dot) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
            return Err(AtsError::Rejected(format!("invalid path segment '{dot}'")));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                AtsError::Internal(format!("base URL {} cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments.iter().copied());
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, segments: &[&str]) -> Result<reqwest::RequestBuilder> {
        Ok(self
            .client
            .request(method, self.endpoint(segments)?)
            .headers(self.headers.clone()))
    }

    #[instrument(skip_all, fields(provider = "zoho"))]
    async fn list_jobs(&self) -> Result<Vec<Job>> {
        let envelope: Option<DataEnvelope<ZohoJob>> =
            send_json(self.request(reqwest::Method::GET, &["JobOpenings"])?).await?;

        let records = envelope.map(|e| e.data).unwrap_or_default();
        let jobs: Vec<Job> = records.into_iter().filter_map(to_canonical_job).collect();
        info!(jobs = jobs.len(), "fetched jobs");
        Ok(jobs)
    }

    #[instrument(skip_all, fields(provider = "zoho", job_id = %candidate.job_id))]
    async fn create_and_associate(&self, candidate: &NewCandidate) -> Result<CandidateCreated> {
        let (first_name, last_name) = split_name(&candidate.name);
        let payload = WriteEnvelope {
            data: [CandidateRecord {
                first_name,
                last_name,
                email: &candidate.email,
                mobile: candidate.phone.as_deref(),
                resume_url: candidate.resume_url.as_deref(),
            }],
        };
        let created: Option<DataEnvelope<WriteResult>> = send_json(
            self.request(reqwest::Method::POST, &["Candidates"])?
                .json(&payload),
        )
        .await?;
        let candidate_id = created_candidate_id(created)?;
        info!(candidate_id = %candidate_id, "candidate created");

        let association = self
            .associate(&candidate_id, &candidate.job_id)
            .await;

        self.policy
            .settle(self.id(), candidate_id, &candidate.job_id, association)
    }

    async fn associate(&self, candidate_id: &str, job_id: &str) -> Result<()> {
        let payload = WriteEnvelope {
            data: [AssociateRecord {
                jobids: [job_id],
                ids: [candidate_id],
            }],
        };
        let answer: Option<DataEnvelope<WriteResult>> = send_json(
            self.request(reqwest::Method::PUT, &["Candidates", "actions", "associate"])?
                .json(&payload),
        )
        .await?;

        match answer.and_then(|a| a.data.into_iter().next()) {
            Some(result) if result.is_error() => Err(AtsError::Rejected(result.describe())),
            _ => Ok(()),
        }
    }

    #[instrument(skip(self), fields(provider = "zoho"))]
    async fn list_applications(&self, job_id: &str) -> Result<Vec<Application>> {
        let request =
            self.request(reqwest::Method::GET, &["JobOpenings", job_id, "associate"])?;
        let envelope: Option<DataEnvelope<ZohoApplicant>> = send_json(request).await?;

        let records = envelope.map(|e| e.data).unwrap_or_default();
        Ok(records
            .into_iter()
            .filter_map(to_canonical_application)
            .collect())
    }
}

impl WriteResult {
    fn is_error(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("error"))
    }

    fn describe(&self) -> String {
        match (self.code.as_deref(), self.message.as_deref()) {
            (Some(code), Some(message)) => format!("{code}: {message}"),
            (Some(text), None) | (None, Some(text)) => text.to_string(),
            (None, None) => "record refused".to_string(),
        }
    }
}

/// First record of a `POST /Candidates` answer → new candidate id.
fn created_candidate_id(created: Option<DataEnvelope<WriteResult>>) -> Result<String> {
    let result = created
        .and_then(|c| c.data.into_iter().next())
        .ok_or(AtsError::MissingIdentifier)?;
    if result.is_error() {
        return Err(AtsError::Rejected(result.describe()));
    }
    result
        .details
        .and_then(|d| d.id)
        .as_ref()
        .and_then(id_string)
        .ok_or(AtsError::MissingIdentifier)
}

/// Zoho ids are numeric strings, but some endpoints return them as numbers.
fn id_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Split at the first whitespace run. No whitespace → placeholder last name.
fn split_name(name: &str) -> (&str, &str) {
    let name = name.trim();
    match name.split_once(char::is_whitespace) {
        Some((first, rest)) if !rest.trim().is_empty() => (first, rest.trim()),
        _ => (name, PLACEHOLDER_LAST_NAME),
    }
}

/// Zoho job opening → canonical job. The upstream status string is passed
/// through unchanged.
fn to_canonical_job(job: ZohoJob) -> Option<Job> {
    let (Some(id), Some(title)) = (
        job.id.as_ref().and_then(id_string),
        job.posting_title.filter(|s| !s.is_empty()),
    ) else {
        warn!("skipping job opening without id or Posting_Title");
        return None;
    };
    Some(Job {
        id,
        title,
        location: job.city.unwrap_or_default(),
        status: JobStatus::Upstream(job.status.unwrap_or_default()),
        external_url: job.url.unwrap_or_default(),
    })
}

/// `Candidate_Status` uses Zoho's own pipeline vocabulary ("Associated",
/// "Interview-Scheduled", ...). Only values that coincide with the shared
/// table, such as "Hired", map to anything other than `APPLIED`.
fn to_canonical_application(applicant: ZohoApplicant) -> Option<Application> {
    let Some(id) = applicant.id.as_ref().and_then(id_string) else {
        warn!("skipping associated candidate without id");
        return None;
    };
    let candidate_name = applicant.full_name.filter(|n| !n.is_empty()).unwrap_or_else(|| {
        [applicant.first_name, applicant.last_name]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    });
    Some(Application {
        id,
        candidate_name,
        email: applicant.email.unwrap_or_default(),
        status: map_application_status(applicant.candidate_status.as_deref()),
    })
}

impl AtsProvider for ZohoProvider {
    fn id(&self) -> &str {
        "zoho"
    }

    fn fetch_jobs(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Job>>> + Send + '_>> {
        Box::pin(self.list_jobs())
    }

    fn create_candidate<'a>(
        &'a self,
        candidate: &'a NewCandidate,
    ) -> Pin<Box<dyn Future<Output = Result<CandidateCreated>> + Send + 'a>> {
        Box::pin(self.create_and_associate(candidate))
    }

    fn fetch_applications<'a>(
        &'a self,
        job_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Application>>> + Send + 'a>> {
        Box::pin(self.list_applications(job_id))
    }
}
