//! In-memory driver and connection used by the session and dispatcher tests

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use aqlz_core::{
    AqlzError, Connection, ConnectionConfig, DatabaseDriver, DriverCapabilities,
    ERROR_QUERY_NOT_FOUND, ERROR_QUERY_PARSE, ExplainOptions, ExplainPlan, QueryCursor,
    QueryDescriptor, QueryId, QueryRequest, Result, ServerErrorInfo, TrackingProperties,
    TrackingUpdate, ValidationReport,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};

pub fn fake_config() -> ConnectionConfig {
    ConnectionConfig::new_arangodb("http://fake:8529", "test")
}

fn parse_error() -> AqlzError {
    AqlzError::Query(ServerErrorInfo::new(
        400,
        Some(ERROR_QUERY_PARSE),
        "syntax error, unexpected identifier",
    ))
}

pub fn descriptor(id: u64, query: &str) -> QueryDescriptor {
    QueryDescriptor {
        id: QueryId(id),
        database: Some("test".to_string()),
        user: Some("root".to_string()),
        query: query.to_string(),
        bind_vars: None,
        started: None,
        run_time: Some(0.5),
        peak_memory_usage: None,
        state: Some("executing".to_string()),
        stream: Some(false),
        extra: Map::new(),
    }
}

/// Connection that answers from memory and records every call
pub struct FakeConnection {
    calls: Mutex<Vec<String>>,
    running: Mutex<Vec<QueryDescriptor>>,
    slow: Mutex<Vec<QueryDescriptor>>,
    tracking: Mutex<TrackingProperties>,
    results: HashMap<String, Vec<Value>>,
    closed: AtomicBool,
}

impl FakeConnection {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            running: Mutex::new(Vec::new()),
            slow: Mutex::new(Vec::new()),
            tracking: Mutex::new(TrackingProperties {
                enabled: true,
                track_slow_queries: true,
                track_bind_vars: true,
                max_slow_queries: 64,
                slow_query_threshold: 10.0,
                slow_streaming_query_threshold: Some(10.0),
                max_query_string_length: 4096,
                extra: Map::new(),
            }),
            results: HashMap::from([
                ("RETURN 1".to_string(), vec![json!(1)]),
                (
                    "FOR u IN users RETURN u.name".to_string(),
                    vec![json!("alice"), json!("bob")],
                ),
            ]),
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_running(self, running: Vec<QueryDescriptor>) -> Self {
        *self.running.lock() = running;
        self
    }

    pub fn with_slow(self, slow: Vec<QueryDescriptor>) -> Self {
        *self.slow.lock() = slow;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn current_tracking(&self) -> TrackingProperties {
        self.tracking.lock().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }
}

#[async_trait]
impl Connection for FakeConnection {
    fn driver_name(&self) -> &str {
        "fake"
    }

    fn database(&self) -> &str {
        "test"
    }

    fn username(&self) -> Option<&str> {
        None
    }

    async fn explain(&self, request: &QueryRequest, options: &ExplainOptions) -> Result<ExplainPlan> {
        self.record("explain");
        if request.query.contains("RETRUN") {
            return Err(parse_error());
        }
        let plan = json!({
            "nodes": [{ "type": "SingletonNode" }, { "type": "ReturnNode" }],
            "estimatedCost": 2.0
        });
        Ok(if options.all_plans {
            ExplainPlan {
                plans: vec![plan],
                ..ExplainPlan::default()
            }
        } else {
            ExplainPlan {
                plan: Some(plan),
                cacheable: Some(true),
                ..ExplainPlan::default()
            }
        })
    }

    async fn validate(&self, query: &str) -> Result<ValidationReport> {
        self.record("validate");
        if query.contains("RETRUN") {
            return Err(parse_error());
        }
        Ok(ValidationReport {
            parsed: true,
            ..ValidationReport::default()
        })
    }

    async fn execute(&self, request: &QueryRequest) -> Result<QueryCursor> {
        self.record("execute");
        if request.query.contains("RETRUN") {
            return Err(parse_error());
        }
        let records = self
            .results
            .get(request.query.trim())
            .cloned()
            .unwrap_or_default();
        Ok(QueryCursor::from_records(records))
    }

    async fn running_queries(&self) -> Result<Vec<QueryDescriptor>> {
        self.record("running_queries");
        Ok(self.running.lock().clone())
    }

    async fn slow_queries(&self) -> Result<Vec<QueryDescriptor>> {
        self.record("slow_queries");
        Ok(self.slow.lock().clone())
    }

    async fn clear_slow_queries(&self) -> Result<()> {
        self.record("clear_slow_queries");
        self.slow.lock().clear();
        Ok(())
    }

    async fn tracking(&self) -> Result<TrackingProperties> {
        self.record("tracking");
        Ok(self.tracking.lock().clone())
    }

    async fn set_tracking(&self, update: &TrackingUpdate) -> Result<TrackingProperties> {
        self.record("set_tracking");
        let mut tracking = self.tracking.lock();
        *tracking = update.apply_to(&tracking);
        Ok(tracking.clone())
    }

    async fn kill(&self, id: QueryId) -> Result<()> {
        self.record(format!("kill {}", id));
        let mut running = self.running.lock();
        match running.iter().position(|q| q.id == id) {
            Some(index) => {
                running.remove(index);
                Ok(())
            }
            None => Err(AqlzError::NotFound(ServerErrorInfo::new(
                404,
                Some(ERROR_QUERY_NOT_FOUND),
                "query ID not found",
            ))),
        }
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Driver that hands out one shared [`FakeConnection`] and counts connects
pub struct FakeDriver {
    connection: Arc<FakeConnection>,
    connects: AtomicUsize,
    failures_left: AtomicUsize,
}

impl FakeDriver {
    pub fn new() -> Arc<Self> {
        Self::with_connection(FakeConnection::new())
    }

    pub fn with_connection(connection: FakeConnection) -> Arc<Self> {
        Arc::new(Self {
            connection: Arc::new(connection),
            connects: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(0),
        })
    }

    /// Driver whose first `failures` connect attempts fail
    pub fn failing_first(failures: usize) -> Arc<Self> {
        let driver = Self::new();
        driver.failures_left.store(failures, Ordering::SeqCst);
        driver
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn connection(&self) -> &FakeConnection {
        &self.connection
    }
}

#[async_trait]
impl DatabaseDriver for FakeDriver {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn capabilities(&self) -> DriverCapabilities {
        DriverCapabilities::default()
    }

    fn default_host(&self) -> &'static str {
        "http://fake:8529"
    }

    async fn connect(&self, _config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        // Yield so concurrent callers overlap with the attempt in flight
        tokio::task::yield_now().await;
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(AqlzError::Connection("connection refused".to_string()));
        }
        Ok(self.connection.clone())
    }

    async fn test_connection(&self, _config: &ConnectionConfig) -> Result<()> {
        Ok(())
    }

    fn build_connection_string(&self, _config: &ConnectionConfig) -> String {
        "http://fake:8529/_db/test/".to_string()
    }
}
