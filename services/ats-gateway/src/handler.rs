//! Request handlers behind the gateway routes
//!
//! Each operation takes a transport-neutral request description (raw body
//! text, query parameters) and returns a `HandlerResponse` carrying a status
//! code and a JSON body. The axum layer in `main.rs` only converts between
//! that shape and HTTP, so the same functions can sit behind any trigger.

use std::collections::HashMap;
use std::time::Instant;

use ats_provider::{AtsProvider, NewCandidate};
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::Error;
use crate::metrics;

/// Status code plus JSON body, independent of the serving framework.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    pub status_code: u16,
    pub body: serde_json::Value,
}

impl HandlerResponse {
    fn ok<T: Serialize>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self {
                status_code: status.as_u16(),
                body,
            },
            Err(e) => {
                warn!(error = %e, "failed to serialize response body");
                Self {
                    status_code: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                    body: serde_json::json!({ "error": e.to_string() }),
                }
            }
        }
    }

    fn error(err: &Error) -> Self {
        Self {
            status_code: err.status_code().as_u16(),
            body: err.body(),
        }
    }
}

impl IntoResponse for HandlerResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.body)).into_response()
    }
}

/// Record metrics and turn an operation result into a response.
fn finish<T: Serialize>(
    provider: &dyn AtsProvider,
    operation: &'static str,
    started: Instant,
    success: StatusCode,
    result: Result<T, Error>,
) -> HandlerResponse {
    let response = match result {
        Ok(value) => HandlerResponse::ok(success, &value),
        Err(err) => {
            if let Error::Upstream(ref upstream) = err {
                warn!(provider = provider.id(), operation, error = %upstream, "upstream call failed");
                metrics::record_upstream_error(provider.id(), operation, upstream.kind());
            } else {
                info!(operation, error = %err, "rejected invalid request");
            }
            HandlerResponse::error(&err)
        }
    };
    metrics::record_request(
        operation,
        response.status_code,
        started.elapsed().as_secs_f64(),
    );
    response
}

/// `GET /jobs`
pub async fn get_jobs(provider: &dyn AtsProvider) -> HandlerResponse {
    let started = Instant::now();
    let result = provider.fetch_jobs().await.map_err(Error::from);
    finish(provider, "list_jobs", started, StatusCode::OK, result)
}

/// `POST /candidates`
///
/// A missing or empty body is treated as `{}` and therefore fails field
/// validation rather than JSON parsing.
pub async fn create_candidate(provider: &dyn AtsProvider, body: Option<&str>) -> HandlerResponse {
    let started = Instant::now();
    let result = match parse_candidate(body) {
        Ok(candidate) => provider
            .create_candidate(&candidate)
            .await
            .map_err(Error::from),
        Err(e) => Err(e),
    };
    finish(
        provider,
        "create_candidate",
        started,
        StatusCode::CREATED,
        result,
    )
}

/// `GET /applications?job_id=...`
pub async fn get_applications(
    provider: &dyn AtsProvider,
    query: &HashMap<String, String>,
) -> HandlerResponse {
    let started = Instant::now();
    let result = match query.get("job_id").map(|id| id.trim()).filter(|id| !id.is_empty()) {
        Some(job_id) => provider
            .fetch_applications(job_id)
            .await
            .map_err(Error::from),
        None => Err(Error::MissingJobId),
    };
    finish(provider, "list_applications", started, StatusCode::OK, result)
}

/// Validate a candidate submission.
///
/// Required fields must be non-blank strings. `phone` and `resume_url` are
/// optional; non-string values for them are ignored.
fn parse_candidate(body: Option<&str>) -> Result<NewCandidate, Error> {
    let text = body.map(str::trim).filter(|b| !b.is_empty()).unwrap_or("{}");
    let value: serde_json::Value = serde_json::from_str(text).map_err(|_| Error::InvalidJson)?;

    let Some(object) = value.as_object() else {
        return Err(Error::missing_candidate_fields());
    };
    let field = |key: &str| {
        object
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let (Some(name), Some(email), Some(job_id)) = (field("name"), field("email"), field("job_id"))
    else {
        return Err(Error::missing_candidate_fields());
    };

    Ok(NewCandidate {
        name,
        email,
        phone: field("phone"),
        resume_url: field("resume_url"),
        job_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ats_provider::{
        Application, ApplicationStatus, AtsError, CandidateCreated, Job, JobStatus,
    };
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    /// In-process provider with canned answers.
    #[derive(Default)]
    struct StubProvider {
        fail: bool,
        created: Mutex<Vec<NewCandidate>>,
        queried: Mutex<Vec<String>>,
    }

    impl StubProvider {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn outcome<T>(&self, value: T) -> ats_provider::Result<T> {
            if self.fail {
                Err(AtsError::Upstream {
                    url: "http://stub/op".into(),
                    status: 502,
                    body: "bad gateway".into(),
                })
            } else {
                Ok(value)
            }
        }
    }

    impl AtsProvider for StubProvider {
        fn id(&self) -> &str {
            "stub"
        }

        fn fetch_jobs(
            &self,
        ) -> Pin<Box<dyn Future<Output = ats_provider::Result<Vec<Job>>> + Send + '_>> {
            Box::pin(async move {
                self.outcome(vec![Job {
                    id: "job_001".into(),
                    title: "Software Engineer".into(),
                    location: "Remote".into(),
                    status: JobStatus::Open,
                    external_url: String::new(),
                }])
            })
        }

        fn create_candidate<'a>(
            &'a self,
            candidate: &'a NewCandidate,
        ) -> Pin<Box<dyn Future<Output = ats_provider::Result<CandidateCreated>> + Send + 'a>>
        {
            Box::pin(async move {
                self.created.lock().unwrap().push(candidate.clone());
                self.outcome(CandidateCreated::new("cand-1".into(), true))
            })
        }

        fn fetch_applications<'a>(
            &'a self,
            job_id: &'a str,
        ) -> Pin<Box<dyn Future<Output = ats_provider::Result<Vec<Application>>> + Send + 'a>>
        {
            Box::pin(async move {
                self.queried.lock().unwrap().push(job_id.to_string());
                let apps = if job_id == "job_001" {
                    vec![Application {
                        id: "app-1".into(),
                        candidate_name: "Test Candidate".into(),
                        email: "test@example.com".into(),
                        status: ApplicationStatus::Applied,
                    }]
                } else {
                    Vec::new()
                };
                self.outcome(apps)
            })
        }
    }

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn jobs_success_is_200_with_list() {
        let response = get_jobs(&StubProvider::default()).await;
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body[0]["id"], "job_001");
        assert_eq!(response.body[0]["status"], "OPEN");
    }

    #[tokio::test]
    async fn jobs_upstream_failure_is_500_with_message() {
        let response = get_jobs(&StubProvider::failing()).await;
        assert_eq!(response.status_code, 500);
        let message = response.body["error"].as_str().unwrap();
        assert!(message.contains("502"), "got: {message}");
    }

    #[tokio::test]
    async fn candidate_success_is_201() {
        let provider = StubProvider::default();
        let response = create_candidate(
            &provider,
            Some(r#"{"name":"Ada Lovelace","email":"ada@example.com","job_id":"job_001","phone":"555"}"#),
        )
        .await;

        assert_eq!(response.status_code, 201);
        assert_eq!(
            response.body,
            serde_json::json!({"status": "success", "candidate_id": "cand-1"})
        );
        let created = provider.created.lock().unwrap();
        assert_eq!(created[0].phone.as_deref(), Some("555"));
        assert_eq!(created[0].resume_url, None);
    }

    #[tokio::test]
    async fn candidate_malformed_json_is_400() {
        let provider = StubProvider::default();
        let response = create_candidate(&provider, Some("{not json")).await;
        assert_eq!(response.status_code, 400);
        assert_eq!(response.body, serde_json::json!({"error": "Invalid JSON"}));
        assert!(provider.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn candidate_missing_fields_is_400() {
        let provider = StubProvider::default();
        let response = create_candidate(&provider, Some(r#"{"email":"a@b.com"}"#)).await;
        assert_eq!(response.status_code, 400);
        let message = response.body["error"].as_str().unwrap();
        assert!(message.starts_with("Missing fields"), "got: {message}");
        for field in ["name", "email", "job_id"] {
            assert!(message.contains(field), "message must list {field}");
        }
        assert!(provider.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn candidate_empty_body_and_non_object_are_missing_fields() {
        let provider = StubProvider::default();
        for body in [None, Some(""), Some("[1,2]"), Some(r#"{"name":"Ada","email":"","job_id":"j"}"#)] {
            let response = create_candidate(&provider, body).await;
            assert_eq!(response.status_code, 400, "body {body:?}");
            assert!(
                response.body["error"]
                    .as_str()
                    .unwrap()
                    .starts_with("Missing fields")
            );
        }
    }

    #[tokio::test]
    async fn candidate_upstream_failure_is_500() {
        let response = create_candidate(
            &StubProvider::failing(),
            Some(r#"{"name":"Ada","email":"ada@example.com","job_id":"job_001"}"#),
        )
        .await;
        assert_eq!(response.status_code, 500);
        assert!(response.body["error"].as_str().unwrap().contains("bad gateway"));
    }

    #[tokio::test]
    async fn applications_require_job_id() {
        let provider = StubProvider::default();
        for q in [query(&[]), query(&[("job_id", "")]), query(&[("job_id", "  ")])] {
            let response = get_applications(&provider, &q).await;
            assert_eq!(response.status_code, 400);
            assert_eq!(
                response.body,
                serde_json::json!({"error": "job_id query parameter is required"})
            );
        }
        assert!(provider.queried.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn applications_for_unknown_job_is_empty_200() {
        let response =
            get_applications(&StubProvider::default(), &query(&[("job_id", "job_999")])).await;
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn applications_success_lists_canonical_entries() {
        let response =
            get_applications(&StubProvider::default(), &query(&[("job_id", "job_001")])).await;
        assert_eq!(response.status_code, 200);
        assert_eq!(
            response.body,
            serde_json::json!([{
                "id": "app-1",
                "candidate_name": "Test Candidate",
                "email": "test@example.com",
                "status": "APPLIED"
            }])
        );
    }

    #[tokio::test]
    async fn applications_upstream_failure_is_500() {
        let response =
            get_applications(&StubProvider::failing(), &query(&[("job_id", "job_001")])).await;
        assert_eq!(response.status_code, 500);
    }
}
