//! Canonical job, candidate and application shapes
//!
//! These are the only types handlers serialize back to callers. Adapters map
//! provider-specific records into them; nothing here is persisted.

use serde::{Serialize, Serializer};

/// A job posting in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    pub id: String,
    pub title: String,
    pub location: String,
    pub status: JobStatus,
    pub external_url: String,
}

/// Job status as exposed to callers.
///
/// `Open` serializes as `"OPEN"`. Providers that report their own status
/// vocabulary pass it through verbatim as `Upstream`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Open,
    Upstream(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Open => "OPEN",
            JobStatus::Upstream(raw) => raw,
        }
    }
}

impl Serialize for JobStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Candidate submission accepted by `create_candidate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCandidate {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub resume_url: Option<String>,
    pub job_id: String,
}

/// Canonical application pipeline status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Applied,
    Screening,
    Rejected,
    Hired,
}

/// Raw upstream status → canonical status. Anything not listed is `Applied`.
const STATUS_TABLE: &[(&str, ApplicationStatus)] = &[
    ("Active", ApplicationStatus::Applied),
    ("Screener", ApplicationStatus::Screening),
    ("Archived", ApplicationStatus::Rejected),
    ("Hired", ApplicationStatus::Hired),
];

/// Map a raw upstream application status through the fixed table.
///
/// Matching is exact (case-sensitive). Missing and unknown values map to
/// `Applied` so a raw string never reaches callers.
pub fn map_application_status(raw: Option<&str>) -> ApplicationStatus {
    raw.and_then(|raw| {
        STATUS_TABLE
            .iter()
            .find(|(name, _)| *name == raw)
            .map(|(_, status)| *status)
    })
    .unwrap_or(ApplicationStatus::Applied)
}

/// A candidate's application to a job in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Application {
    pub id: String,
    pub candidate_name: String,
    pub email: String,
    pub status: ApplicationStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CreateStatus {
    Success,
}

/// Success body of `create_candidate`: `{"status":"success","candidate_id":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateCreated {
    pub status: CreateStatus,
    pub candidate_id: String,
    /// False when the job association step failed under a best-effort policy.
    #[serde(skip)]
    pub associated: bool,
}

impl CandidateCreated {
    pub fn new(candidate_id: String, associated: bool) -> Self {
        Self {
            status: CreateStatus::Success,
            candidate_id,
            associated,
        }
    }
}
