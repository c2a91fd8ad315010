//! Per-target outcomes and aggregated results.

use crate::request::InvalidationRequest;
use crate::target::InvalidationTarget;
use serde::Serialize;
use std::fmt;
use time::OffsetDateTime;

/// Result of invalidating one target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InvalidationOutcome {
    pub target: InvalidationTarget,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InvalidationOutcome {
    pub fn success(target: InvalidationTarget) -> Self {
        Self {
            target,
            succeeded: true,
            error: None,
        }
    }

    pub fn failure(target: InvalidationTarget, error: impl Into<String>) -> Self {
        Self {
            target,
            succeeded: false,
            error: Some(error.into()),
        }
    }
}

/// Caller-facing status of a handled request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// Every resolved target was invalidated.
    Ok,
    /// At least one target failed; the rest were still attempted.
    PartialFailure,
    /// The secret did not validate; nothing was resolved or executed.
    Unauthorized,
    /// The secret validated but nothing resolvable was requested.
    NoTargets,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::PartialFailure => "partial_failure",
            Self::Unauthorized => "unauthorized",
            Self::NoTargets => "no_targets",
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregated result returned to the caller. Never persisted.
#[derive(Clone, Debug, Serialize)]
pub struct InvalidationResult {
    pub requested: InvalidationRequest,
    pub outcomes: Vec<InvalidationOutcome>,
    pub overall_success: bool,
    pub status: ResultStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
}

impl InvalidationResult {
    /// Result for a request whose secret failed validation.
    pub fn rejected(requested: InvalidationRequest) -> Self {
        Self::empty(requested, ResultStatus::Unauthorized)
    }

    /// Result for an authorized request that resolved to nothing.
    pub fn no_targets(requested: InvalidationRequest) -> Self {
        Self::empty(requested, ResultStatus::NoTargets)
    }

    /// Aggregate executed outcomes. An empty outcome list is reported as `NoTargets`.
    pub fn from_outcomes(
        requested: InvalidationRequest,
        outcomes: Vec<InvalidationOutcome>,
    ) -> Self {
        if outcomes.is_empty() {
            return Self::no_targets(requested);
        }

        let overall_success = outcomes.iter().all(|o| o.succeeded);
        let status = if overall_success {
            ResultStatus::Ok
        } else {
            ResultStatus::PartialFailure
        };

        Self {
            requested,
            outcomes,
            overall_success,
            status,
            completed_at: OffsetDateTime::now_utc(),
        }
    }

    fn empty(requested: InvalidationRequest, status: ResultStatus) -> Self {
        Self {
            requested,
            outcomes: Vec::new(),
            overall_success: false,
            status,
            completed_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn succeeded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.succeeded_count()
    }

    /// Paths that were actually invalidated, in execution order.
    pub fn invalidated_paths(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.succeeded && o.target.is_path())
            .map(|o| o.target.value.as_str())
    }

    /// Failure messages formatted as `kind:value: error`.
    pub fn failure_messages(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| !o.succeeded)
            .map(|o| {
                format!(
                    "{}: {}",
                    o.target,
                    o.error.as_deref().unwrap_or("unknown error")
                )
            })
            .collect()
    }
}
