//! Surge job lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{SurgeError, SurgeResult};

/// Job status. Moves pending -> in_progress -> {completed | failed}, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    /// Numeric code stored in the job table.
    pub fn code(&self) -> i32 {
        match self {
            JobStatus::Pending => 4002,
            JobStatus::InProgress => 4003,
            JobStatus::Completed => 4004,
            JobStatus::Failed => 4005,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            4002 => Some(JobStatus::Pending),
            4003 => Some(JobStatus::InProgress),
            4004 => Some(JobStatus::Completed),
            4005 => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Statuses a job may currently be in for a move to `self` to be legal.
    pub fn allowed_predecessors(&self) -> &'static [JobStatus] {
        match self {
            JobStatus::Pending => &[],
            JobStatus::InProgress => &[JobStatus::Pending],
            // a job can fail before it was ever picked up
            JobStatus::Failed => &[JobStatus::Pending, JobStatus::InProgress],
            JobStatus::Completed => &[JobStatus::InProgress],
        }
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        next.allowed_predecessors().contains(self)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A surge run submitted for one cyclone case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub ty_code: String,
    /// The submitted request body, kept verbatim.
    pub parameters: serde_json::Value,
    pub status: JobStatus,
    pub submit_time: DateTime<Utc>,
    pub completion_time: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl Job {
    pub fn new(ty_code: impl Into<String>, parameters: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            ty_code: ty_code.into(),
            parameters,
            status: JobStatus::Pending,
            submit_time: Utc::now(),
            completion_time: None,
            error_message: None,
        }
    }

    /// Apply a status change, rejecting anything outside the lifecycle.
    pub fn transition(&mut self, next: JobStatus, error: Option<String>) -> SurgeResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(SurgeError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        if next.is_terminal() {
            self.completion_time = Some(Utc::now());
            self.error_message = error;
        }
        Ok(())
    }
}
