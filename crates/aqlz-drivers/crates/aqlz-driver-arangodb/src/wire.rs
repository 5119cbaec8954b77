//! Request and response bodies of the ArangoDB HTTP API, and the mapping
//! of server error bodies onto [`AqlzError`].

use aqlz_core::{
    AqlzError, BindVars, ERROR_QUERY_NOT_FOUND, ExplainOptions, QueryRequest, QueryWarning,
    ServerErrorInfo,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// ArangoDB error number for "database not found"
pub const ERROR_DATABASE_NOT_FOUND: u32 = 1228;

/// Longest raw body excerpt kept when a response is not an error document
const MAX_BODY_EXCERPT: usize = 200;

/// What a request was for, which decides how error statuses are classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Explain, validate or cursor requests
    Query,
    /// Killing a running query
    Kill,
    /// Everything else
    Admin,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorRequest<'a> {
    pub query: &'a str,
    #[serde(skip_serializing_if = "no_bind_vars")]
    pub bind_vars: &'a BindVars,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub count: bool,
    #[serde(skip_serializing_if = "CursorRequestOptions::is_empty")]
    pub options: CursorRequestOptions,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorRequestOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_count: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_runtime: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<bool>,
}

impl CursorRequestOptions {
    fn is_empty(&self) -> bool {
        self.full_count.is_none() && self.max_runtime.is_none() && self.profile.is_none()
    }
}

impl<'a> CursorRequest<'a> {
    pub fn from_request(request: &'a QueryRequest) -> Self {
        let options = &request.options;
        Self {
            query: &request.query,
            bind_vars: &request.bind_vars,
            batch_size: options.batch_size,
            count: options.count,
            options: CursorRequestOptions {
                full_count: options.full_count.then_some(true),
                max_runtime: options.max_runtime,
                profile: options.profile.then_some(true),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorResponse {
    #[serde(default)]
    pub result: Vec<Value>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub cached: bool,
    #[serde(default)]
    pub extra: Option<CursorExtra>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CursorExtra {
    #[serde(default)]
    pub stats: Option<Value>,
    #[serde(default)]
    pub warnings: Vec<QueryWarning>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainRequest<'a> {
    pub query: &'a str,
    #[serde(skip_serializing_if = "no_bind_vars")]
    pub bind_vars: &'a BindVars,
    pub options: ExplainRequestOptions,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainRequestOptions {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub all_plans: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_number_of_plans: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimizer: Option<OptimizerOptions>,
}

#[derive(Debug, Serialize)]
pub struct OptimizerOptions {
    pub rules: Vec<String>,
}

impl<'a> ExplainRequest<'a> {
    pub fn new(request: &'a QueryRequest, options: &ExplainOptions) -> Self {
        Self {
            query: &request.query,
            bind_vars: &request.bind_vars,
            options: ExplainRequestOptions {
                all_plans: options.all_plans,
                max_number_of_plans: options.max_number_of_plans,
                optimizer: (!options.optimizer_rules.is_empty()).then(|| OptimizerOptions {
                    rules: options.optimizer_rules.clone(),
                }),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ParseRequest<'a> {
    pub query: &'a str,
}

/// Response of `GET /_api/version`
#[derive(Debug, Clone, Deserialize)]
pub struct VersionResponse {
    #[serde(default)]
    pub server: String,
    pub version: String,
    #[serde(default)]
    pub license: Option<String>,
}

fn no_bind_vars(bind_vars: &&BindVars) -> bool {
    bind_vars.is_empty()
}

/// Error document returned with non-2xx responses
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    error_num: Option<u32>,
    #[serde(default)]
    error_message: Option<String>,
}

/// Turn a non-success response into the matching [`AqlzError`]
pub fn map_error_response(http_code: u16, body: &[u8], kind: RequestKind) -> AqlzError {
    let info = match serde_json::from_slice::<ErrorBody>(body) {
        Ok(parsed) => ServerErrorInfo::new(
            http_code,
            parsed.error_num,
            parsed
                .error_message
                .unwrap_or_else(|| format!("HTTP status {}", http_code)),
        ),
        Err(_) => ServerErrorInfo::new(http_code, None, body_excerpt(http_code, body)),
    };

    match http_code {
        401 | 403 => AqlzError::Connection(format!("authentication failed: {}", info)),
        404 if info.error_num == Some(ERROR_DATABASE_NOT_FOUND) => {
            AqlzError::Connection(format!("database not found: {}", info))
        }
        404 if info.error_num == Some(ERROR_QUERY_NOT_FOUND) || kind == RequestKind::Kill => {
            AqlzError::NotFound(info)
        }
        _ if info.is_query_error() => AqlzError::Query(info),
        400 if kind == RequestKind::Query => AqlzError::Query(info),
        _ => AqlzError::Server(info),
    }
}

fn body_excerpt(http_code: u16, body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return format!("HTTP status {}", http_code);
    }
    if text.chars().count() > MAX_BODY_EXCERPT {
        let cut: String = text.chars().take(MAX_BODY_EXCERPT).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
