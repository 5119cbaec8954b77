//! Connection trait for the AQL query API

use crate::{
    ExplainOptions, ExplainPlan, QueryCursor, QueryDescriptor, QueryId, QueryRequest, Result,
    TrackingProperties, TrackingUpdate, ValidationReport,
};
use async_trait::async_trait;

/// An authenticated connection to one database.
///
/// Every method is a single request/response round trip (query execution
/// additionally drains the server cursor). Implementations must be safe to
/// reuse sequentially from any task.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "arangodb")
    fn driver_name(&self) -> &str;

    /// Name of the database this connection is bound to
    fn database(&self) -> &str;

    /// User the connection authenticates as, if any
    fn username(&self) -> Option<&str>;

    /// Retrieve the execution plan without running the query
    async fn explain(&self, request: &QueryRequest, options: &ExplainOptions)
    -> Result<ExplainPlan>;

    /// Parse the query on the server without executing it
    async fn validate(&self, query: &str) -> Result<ValidationReport>;

    /// Execute the query and return every result record
    async fn execute(&self, request: &QueryRequest) -> Result<QueryCursor>;

    /// List currently running queries
    async fn running_queries(&self) -> Result<Vec<QueryDescriptor>>;

    /// List retained slow queries
    async fn slow_queries(&self) -> Result<Vec<QueryDescriptor>>;

    /// Clear the slow query list
    async fn clear_slow_queries(&self) -> Result<()>;

    /// Get the query tracking properties
    async fn tracking(&self) -> Result<TrackingProperties>;

    /// Update tracking properties, returning the resulting properties
    async fn set_tracking(&self, update: &TrackingUpdate) -> Result<TrackingProperties>;

    /// Ask the server to kill a running query
    async fn kill(&self, id: QueryId) -> Result<()>;

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}
