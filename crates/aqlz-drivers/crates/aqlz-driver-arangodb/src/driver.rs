//! ArangoDB driver implementation

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use url::Url;
use aqlz_core::{
    AqlzError, Connection, ConnectionConfig, ConnectionField, ConnectionFieldSchema,
    DatabaseDriver, DriverCapabilities, ExplainOptions, ExplainPlan, QueryCursor,
    QueryDescriptor, QueryId, QueryRequest, Result, TrackingProperties, TrackingUpdate,
    ValidationReport,
};

use crate::wire::{
    CursorRequest, CursorResponse, ExplainRequest, ParseRequest, RequestKind, VersionResponse,
    map_error_response,
};

/// Endpoint used when the configuration names none
pub const DEFAULT_HOST: &str = "http://localhost:8529";

/// Database used when the configuration names none
pub const DEFAULT_DATABASE: &str = "test";

/// Request timeout used when the `timeout_secs` parameter is not set
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// ArangoDB database driver
///
/// Talks to the ArangoDB HTTP API of a single database
/// (`{host}/_db/{database}/_api/...`), authenticating with HTTP basic auth
/// when a username is configured.
pub struct ArangoDbDriver;

impl ArangoDbDriver {
    /// Create a new ArangoDB driver instance
    pub fn new() -> Self {
        tracing::debug!("ArangoDB driver initialized");
        Self
    }
}

impl Default for ArangoDbDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for ArangoDbDriver {
    fn id(&self) -> &'static str {
        "arangodb"
    }

    fn name(&self) -> &'static str {
        "arangodb"
    }

    fn display_name(&self) -> &'static str {
        "ArangoDB"
    }

    fn capabilities(&self) -> DriverCapabilities {
        DriverCapabilities {
            supports_explain: true,
            supports_validation: true,
            supports_bind_vars: true,
            supports_query_tracking: true,
            supports_kill: true,
            supports_streaming_cursors: true,
        }
    }

    fn default_host(&self) -> &'static str {
        DEFAULT_HOST
    }

    #[tracing::instrument(skip(self, config), fields(host = %config.host, database = config.database.as_deref()))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        tracing::debug!("connecting to ArangoDB");

        let settings = ConnectSettings::from_config(config)?;
        let connection = ArangoDbConnection::open(&settings)?;

        if settings.verify {
            let version = connection.server_version().await?;
            tracing::info!(
                server = %version.server,
                version = %version.version,
                "ArangoDB connection established"
            );
        } else {
            tracing::debug!("skipping connection verification");
        }

        Ok(Arc::new(connection))
    }

    #[tracing::instrument(skip(self, config))]
    async fn test_connection(&self, config: &ConnectionConfig) -> Result<()> {
        tracing::debug!("testing ArangoDB connection");
        let settings = ConnectSettings::from_config(config)?;
        let connection = ArangoDbConnection::open(&settings)?;
        connection.server_version().await?;
        Ok(())
    }

    fn build_connection_string(&self, config: &ConnectionConfig) -> String {
        let host = host_or_default(config);
        let database = database_or_default(config);
        match build_base_url(&host, &database) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}/_db/{}/", host.trim_end_matches('/'), database),
        }
    }

    fn connection_string_help(&self) -> &'static str {
        "ArangoDB connection parameters: host (default: http://localhost:8529), database (default: test), username, password, verify (true/false), timeout_secs"
    }

    fn default_params(&self) -> HashMap<String, String> {
        HashMap::from([
            ("verify".to_string(), "true".to_string()),
            ("timeout_secs".to_string(), DEFAULT_TIMEOUT_SECS.to_string()),
        ])
    }

    fn connection_field_schema(&self) -> ConnectionFieldSchema {
        ConnectionFieldSchema {
            title: Cow::Borrowed("ArangoDB Connection"),
            fields: vec![
                ConnectionField::url("host", "Host")
                    .placeholder(DEFAULT_HOST)
                    .default_value(DEFAULT_HOST)
                    .required(),
                ConnectionField::text("database", "Database")
                    .placeholder(DEFAULT_DATABASE)
                    .default_value(DEFAULT_DATABASE),
                ConnectionField::text("username", "Username").placeholder("root"),
                ConnectionField::password("password", "Password"),
                ConnectionField::boolean("verify", "Verify on connect")
                    .default_value("true")
                    .help_text("Request the server version when connecting"),
            ],
        }
    }
}

fn host_or_default(config: &ConnectionConfig) -> String {
    config
        .get_string("host")
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_HOST.to_string())
}

fn database_or_default(config: &ConnectionConfig) -> String {
    config
        .get_string("database")
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DATABASE.to_string())
}

/// Connection settings resolved from a [`ConnectionConfig`]
#[derive(Debug, Clone)]
struct ConnectSettings {
    base_url: Url,
    database: String,
    username: Option<String>,
    password: Option<String>,
    timeout: Duration,
    verify: bool,
}

impl ConnectSettings {
    fn from_config(config: &ConnectionConfig) -> Result<Self> {
        let host = host_or_default(config);
        let database = database_or_default(config);
        let timeout_secs = match config.params.get("timeout_secs") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                AqlzError::Configuration(format!("invalid timeout_secs: '{}'", raw))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            base_url: build_base_url(&host, &database)?,
            database,
            username: config
                .get_string("username")
                .filter(|s| !s.is_empty()),
            password: config.get_string("password"),
            timeout: Duration::from_secs(timeout_secs),
            verify: config.get_bool("verify").unwrap_or(true),
        })
    }
}

/// Build `{host}/_db/{database}/`, percent-encoding the database name
#[doc(hidden)]
pub fn build_base_url(host: &str, database: &str) -> Result<Url> {
    let mut url = Url::parse(host.trim())
        .map_err(|e| AqlzError::Configuration(format!("invalid host URL '{}': {}", host, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AqlzError::Configuration(format!(
            "host URL '{}' must use http or https",
            host
        )));
    }
    url.path_segments_mut()
        .map_err(|_| AqlzError::Configuration(format!("host URL '{}' cannot be a base", host)))?
        .pop_if_empty()
        .push("_db")
        .push(database)
        .push("");
    Ok(url)
}

/// ArangoDB connection implementing the Connection trait
pub struct ArangoDbConnection {
    client: Client,
    base_url: Url,
    database: String,
    username: Option<String>,
    password: Option<String>,
    closed: AtomicBool,
}

impl ArangoDbConnection {
    fn open(settings: &ConnectSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| AqlzError::Connection(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            database: settings.database.clone(),
            username: settings.username.clone(),
            password: settings.password.clone(),
            closed: AtomicBool::new(false),
        })
    }

    /// Base URL of the database API
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch the server version; used to verify the connection
    pub async fn server_version(&self) -> Result<VersionResponse> {
        self.send(self.request(Method::GET, &["_api", "version"])?, RequestKind::Admin)
            .await
    }

    fn ensure_not_closed(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AqlzError::Connection("Connection is closed".to_string()));
        }
        Ok(())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AqlzError::Configuration("base URL cannot be extended".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        self.ensure_not_closed()?;
        let url = self.endpoint(segments)?;
        tracing::trace!(%method, %url, "sending request");
        let builder = self.client.request(method, url);
        Ok(match &self.username {
            Some(user) => builder.basic_auth(user, self.password.as_deref()),
            None => builder,
        })
    }

    fn request_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> Result<RequestBuilder> {
        Ok(self.request(method, segments)?.json(body))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, kind: RequestKind) -> Result<T> {
        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;

        if !status.is_success() {
            let err = map_error_response(status.as_u16(), &body, kind);
            tracing::debug!(status = status.as_u16(), error = %err, "request failed");
            return Err(err);
        }

        serde_json::from_slice(&body).map_err(AqlzError::Serialization)
    }

    async fn fetch_batch(&self, cursor_id: &str) -> Result<CursorResponse> {
        self.send(
            self.request(Method::PUT, &["_api", "cursor", cursor_id])?,
            RequestKind::Query,
        )
        .await
    }
}

fn transport_error(err: reqwest::Error) -> AqlzError {
    if err.is_timeout() {
        AqlzError::Connection(format!("request timed out: {}", err))
    } else {
        AqlzError::Connection(format!("request failed: {}", err))
    }
}

#[async_trait]
impl Connection for ArangoDbConnection {
    fn driver_name(&self) -> &str {
        "arangodb"
    }

    fn database(&self) -> &str {
        &self.database
    }

    fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    #[tracing::instrument(skip(self, request, options), fields(query = %request.preview(60)))]
    async fn explain(
        &self,
        request: &QueryRequest,
        options: &ExplainOptions,
    ) -> Result<ExplainPlan> {
        let body = ExplainRequest::new(request, options);
        self.send(
            self.request_json(Method::POST, &["_api", "explain"], &body)?,
            RequestKind::Query,
        )
        .await
    }

    #[tracing::instrument(skip(self, query), fields(query_len = query.len()))]
    async fn validate(&self, query: &str) -> Result<ValidationReport> {
        self.send(
            self.request_json(Method::POST, &["_api", "query"], &ParseRequest { query })?,
            RequestKind::Query,
        )
        .await
    }

    #[tracing::instrument(skip(self, request), fields(query = %request.preview(60), bind_vars = request.bind_vars.len()))]
    async fn execute(&self, request: &QueryRequest) -> Result<QueryCursor> {
        let start = Instant::now();
        let body = CursorRequest::from_request(request);
        let mut batch: CursorResponse = self
            .send(
                self.request_json(Method::POST, &["_api", "cursor"], &body)?,
                RequestKind::Query,
            )
            .await?;

        let mut cursor = QueryCursor::from_records(Vec::new());
        cursor.count = batch.count;
        cursor.cached = batch.cached;

        loop {
            cursor.records.append(&mut batch.result);
            if let Some(extra) = batch.extra.take() {
                if extra.stats.is_some() {
                    cursor.stats = extra.stats;
                }
                cursor.warnings.extend(extra.warnings);
            }
            if !batch.has_more {
                break;
            }
            let cursor_id = batch.id.take().ok_or_else(|| {
                AqlzError::Other("server reported more results without a cursor id".to_string())
            })?;
            batch = self.fetch_batch(&cursor_id).await?;
            cursor.batches += 1;
        }

        cursor.execution_time_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            records = cursor.records.len(),
            batches = cursor.batches,
            duration_ms = cursor.execution_time_ms,
            "query completed"
        );
        Ok(cursor)
    }

    #[tracing::instrument(skip(self))]
    async fn running_queries(&self) -> Result<Vec<QueryDescriptor>> {
        self.send(
            self.request(Method::GET, &["_api", "query", "current"])?,
            RequestKind::Admin,
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn slow_queries(&self) -> Result<Vec<QueryDescriptor>> {
        self.send(
            self.request(Method::GET, &["_api", "query", "slow"])?,
            RequestKind::Admin,
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn clear_slow_queries(&self) -> Result<()> {
        let _: serde_json::Value = self
            .send(
                self.request(Method::DELETE, &["_api", "query", "slow"])?,
                RequestKind::Admin,
            )
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn tracking(&self) -> Result<TrackingProperties> {
        let properties: TrackingProperties = self
            .send(
                self.request(Method::GET, &["_api", "query", "properties"])?,
                RequestKind::Admin,
            )
            .await?;
        Ok(strip_envelope(properties))
    }

    #[tracing::instrument(skip(self, update))]
    async fn set_tracking(&self, update: &TrackingUpdate) -> Result<TrackingProperties> {
        if update.is_empty() {
            return Err(AqlzError::Validation(
                "no tracking properties given".to_string(),
            ));
        }
        let properties: TrackingProperties = self
            .send(
                self.request_json(Method::PUT, &["_api", "query", "properties"], update)?,
                RequestKind::Admin,
            )
            .await?;
        Ok(strip_envelope(properties))
    }

    #[tracing::instrument(skip(self), fields(query_id = %id))]
    async fn kill(&self, id: QueryId) -> Result<()> {
        let id = id.to_string();
        let _: serde_json::Value = self
            .send(
                self.request(Method::DELETE, &["_api", "query", &id])?,
                RequestKind::Kill,
            )
            .await?;
        tracing::info!("query killed");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        tracing::debug!("ArangoDB connection closed");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Drop the `error`/`code` envelope fields some server versions add
fn strip_envelope(mut properties: TrackingProperties) -> TrackingProperties {
    properties.extra.remove("error");
    properties.extra.remove("code");
    properties
}
