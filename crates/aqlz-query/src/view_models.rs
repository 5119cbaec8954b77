//! View models for executed queries
//!
//! These carry everything the front-end shows after an execute action:
//! plan, validation report and result records, each with its own outcome.

use aqlz_core::{AqlzError, BindVars, ExplainPlan, QueryCursor, Result, ValidationReport};

/// Outcome of one step of the execute action
#[derive(Debug)]
pub enum StepOutcome<T> {
    Done(T),
    Failed(AqlzError),
    /// Not attempted because an earlier step failed
    Skipped,
}

impl<T> StepOutcome<T> {
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(value) => StepOutcome::Done(value),
            Err(err) => StepOutcome::Failed(err),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, StepOutcome::Done(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StepOutcome::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, StepOutcome::Skipped)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            StepOutcome::Done(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&AqlzError> {
        match self {
            StepOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Short status word for display
    pub fn status(&self) -> &'static str {
        match self {
            StepOutcome::Done(_) => "ok",
            StepOutcome::Failed(_) => "failed",
            StepOutcome::Skipped => "skipped",
        }
    }
}

/// Result of the execute action
#[derive(Debug)]
pub struct ExecuteOutcome {
    pub query: String,
    pub bind_vars: BindVars,
    pub plan: StepOutcome<ExplainPlan>,
    pub validation: StepOutcome<ValidationReport>,
    pub result: StepOutcome<QueryCursor>,
    /// Wall-clock time of all three steps
    pub duration_ms: u64,
}

impl ExecuteOutcome {
    /// Whether every step completed
    pub fn is_success(&self) -> bool {
        self.plan.is_done() && self.validation.is_done() && self.result.is_done()
    }

    /// The first failure in step order: plan, validation, result
    pub fn first_error(&self) -> Option<&AqlzError> {
        self.plan
            .error()
            .or_else(|| self.validation.error())
            .or_else(|| self.result.error())
    }

    pub fn records(&self) -> &[serde_json::Value] {
        self.result
            .value()
            .map(|cursor| cursor.records.as_slice())
            .unwrap_or_default()
    }

    /// Take the result records, surfacing the first failure as the error
    pub fn into_cursor(self) -> Result<QueryCursor> {
        if let StepOutcome::Failed(err) = self.plan {
            return Err(err);
        }
        if let StepOutcome::Failed(err) = self.validation {
            return Err(err);
        }
        match self.result {
            StepOutcome::Done(cursor) => Ok(cursor),
            StepOutcome::Failed(err) => Err(err),
            StepOutcome::Skipped => Err(AqlzError::Other("query execution was skipped".to_string())),
        }
    }
}
