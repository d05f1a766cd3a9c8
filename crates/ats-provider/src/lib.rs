//! Provider abstraction over Applicant Tracking System APIs
//!
//! Defines the canonical job/candidate/application shapes and the
//! `AtsProvider` trait that every upstream adapter implements. Handlers only
//! ever see `Arc<dyn AtsProvider>`; which concrete adapter sits behind it is
//! decided once at startup from configuration.
//!
//! `AshbyProvider` lives here because it only needs a static API key. Adapters
//! that need token management (Zoho) live next to their auth crate in the
//! gateway service.

pub mod ashby;
pub mod error;
pub mod http;
pub mod model;

pub use ashby::{AshbyConfig, AshbyProvider};
pub use error::{AtsError, Result};
pub use model::{
    Application, ApplicationStatus, CandidateCreated, Job, JobStatus, NewCandidate,
    map_application_status,
};

use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use tracing::warn;

/// What to do when a candidate was created upstream but attaching it to the
/// job failed.
///
/// Applies to every adapter the same way, so a provider switch never changes
/// whether `create_candidate` reports success.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationPolicy {
    /// Report success with the candidate id and log the association failure.
    #[default]
    BestEffort,
    /// Fail the whole operation.
    Strict,
}

impl FromStr for AssociationPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "best_effort" | "best-effort" => Ok(Self::BestEffort),
            "strict" => Ok(Self::Strict),
            other => Err(format!(
                "unknown association policy '{other}' (expected best_effort or strict)"
            )),
        }
    }
}

impl AssociationPolicy {
    /// Resolve the outcome of the second `create_candidate` step.
    ///
    /// Step one already produced `candidate_id`; `association` is the result of
    /// attaching it to `job_id`.
    pub fn settle(
        self,
        provider: &str,
        candidate_id: String,
        job_id: &str,
        association: Result<()>,
    ) -> Result<CandidateCreated> {
        match association {
            Ok(()) => Ok(CandidateCreated::new(candidate_id, true)),
            Err(e) if self == AssociationPolicy::BestEffort => {
                warn!(
                    provider,
                    candidate_id = %candidate_id,
                    job_id,
                    error = %e,
                    "candidate created but job association failed"
                );
                Ok(CandidateCreated::new(candidate_id, false))
            }
            Err(e) => Err(e),
        }
    }
}

/// Uniform facade over one upstream ATS.
///
/// Every operation either returns its success shape or an `AtsError`; adapters
/// convert transport and parse failures instead of panicking.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn AtsProvider>`).
pub trait AtsProvider: Send + Sync {
    /// Identifier for logging, metrics and the health endpoint (e.g. "ashby", "zoho")
    fn id(&self) -> &str;

    /// List the upstream's job postings in canonical form.
    fn fetch_jobs(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Job>>> + Send + '_>>;

    /// Create a candidate, then attach it to `candidate.job_id`.
    ///
    /// The association step is never attempted when creation fails or yields
    /// no identifier. Association failure handling follows `AssociationPolicy`.
    fn create_candidate<'a>(
        &'a self,
        candidate: &'a NewCandidate,
    ) -> Pin<Box<dyn Future<Output = Result<CandidateCreated>> + Send + 'a>>;

    /// List applications for one job. An empty upstream answer is an empty list.
    fn fetch_applications<'a>(
        &'a self,
        job_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Application>>> + Send + 'a>>;
}
