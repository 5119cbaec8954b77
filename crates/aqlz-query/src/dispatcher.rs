//! Action dispatcher
//!
//! Maps each user action onto one operation of the session's connection and
//! returns display-ready results. Nothing is retried or cached across
//! actions.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;

use aqlz_core::{
    BindVars, ExplainOptions, QueryDescriptor, QueryId, QueryRequest, Result,
    TrackingProperties, TrackingUpdate,
};
use serde_json::Value;

use crate::history::{QueryHistory, QueryHistoryEntry};
use crate::session::Session;
use crate::view_models::{ExecuteOutcome, StepOutcome};

/// Whether the execute step runs after validation failed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutePolicy {
    /// Skip execution when the server rejected the query
    #[default]
    SkipOnInvalid,
    /// Run explain, validate and execute regardless of earlier failures
    AlwaysRun,
}

/// Dispatches user actions against a [`Session`]
pub struct ActionDispatcher {
    session: Arc<Session>,
    history: Arc<RwLock<QueryHistory>>,
    policy: ExecutePolicy,
}

impl ActionDispatcher {
    /// Create a dispatcher with its own history
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            history: Arc::new(RwLock::new(QueryHistory::default())),
            policy: ExecutePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ExecutePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ExecutePolicy {
        self.policy
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn history(&self) -> Arc<RwLock<QueryHistory>> {
        self.history.clone()
    }

    /// Explain, validate and execute `query` with `bind_vars`
    pub async fn execute(&self, query: &str, bind_vars: BindVars) -> Result<ExecuteOutcome> {
        let request = QueryRequest::new(query).with_bind_vars(bind_vars);
        self.execute_request(&request, &ExplainOptions::default())
            .await
    }

    /// Explain, validate and execute a full request
    ///
    /// Each step's failure is captured in the outcome. Only a failure to
    /// obtain the connection is returned as an error.
    #[tracing::instrument(skip(self, request, explain), fields(query = %request.preview(60), policy = ?self.policy))]
    pub async fn execute_request(
        &self,
        request: &QueryRequest,
        explain: &ExplainOptions,
    ) -> Result<ExecuteOutcome> {
        let connection = self.session.connection().await?;
        let start = Instant::now();

        let plan = StepOutcome::from_result(connection.explain(request, explain).await);
        let validation = StepOutcome::from_result(connection.validate(&request.query).await);

        let result = if validation.is_failed() && self.policy == ExecutePolicy::SkipOnInvalid {
            tracing::debug!("validation failed, skipping execution");
            StepOutcome::Skipped
        } else {
            StepOutcome::from_result(connection.execute(request).await)
        };

        let outcome = ExecuteOutcome {
            query: request.query.clone(),
            bind_vars: request.bind_vars.clone(),
            plan,
            validation,
            result,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        self.record(&outcome);

        tracing::info!(
            plan = outcome.plan.status(),
            validation = outcome.validation.status(),
            result = outcome.result.status(),
            records = outcome.records().len(),
            duration_ms = outcome.duration_ms,
            "execute action completed"
        );
        Ok(outcome)
    }

    fn record(&self, outcome: &ExecuteOutcome) {
        let connection_id = Some(self.session.connection_id());
        let bind_var_count = outcome.bind_vars.len();
        let entry = match (&outcome.result, outcome.first_error()) {
            (StepOutcome::Done(cursor), None) => QueryHistoryEntry::success(
                outcome.query.clone(),
                bind_var_count,
                connection_id,
                outcome.duration_ms,
                cursor.len() as u64,
            ),
            (_, Some(err)) => QueryHistoryEntry::failure(
                outcome.query.clone(),
                bind_var_count,
                connection_id,
                outcome.duration_ms,
                err.to_string(),
            ),
            (_, None) => QueryHistoryEntry::failure(
                outcome.query.clone(),
                bind_var_count,
                connection_id,
                outcome.duration_ms,
                "execution skipped".to_string(),
            ),
        };
        self.history.write().add(entry);
    }

    #[tracing::instrument(skip(self))]
    pub async fn running_queries(&self) -> Result<Vec<QueryDescriptor>> {
        self.session.connection().await?.running_queries().await
    }

    #[tracing::instrument(skip(self))]
    pub async fn slow_queries(&self) -> Result<Vec<QueryDescriptor>> {
        self.session.connection().await?.slow_queries().await
    }

    #[tracing::instrument(skip(self))]
    pub async fn clear_slow_queries(&self) -> Result<()> {
        self.session.connection().await?.clear_slow_queries().await
    }

    #[tracing::instrument(skip(self))]
    pub async fn tracking(&self) -> Result<TrackingProperties> {
        self.session.connection().await?.tracking().await
    }

    /// Update tracking properties from name/value pairs
    ///
    /// The pairs are validated before the connection is touched, so a bad
    /// name or value leaves the server untouched.
    #[tracing::instrument(skip(self, pairs))]
    pub async fn set_tracking<K: AsRef<str>>(
        &self,
        pairs: impl IntoIterator<Item = (K, Value)>,
    ) -> Result<TrackingProperties> {
        let update = TrackingUpdate::from_pairs(pairs)?;
        self.apply_tracking(&update).await
    }

    pub async fn apply_tracking(&self, update: &TrackingUpdate) -> Result<TrackingProperties> {
        self.session.connection().await?.set_tracking(update).await
    }

    #[tracing::instrument(skip(self), fields(query_id = %id))]
    pub async fn kill(&self, id: QueryId) -> Result<()> {
        self.session.connection().await?.kill(id).await
    }
}
