//! Core types for AQLZ

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use uuid::Uuid;

use crate::{AqlzError, Result};

/// Bind variables for an AQL query, in insertion order.
///
/// Names starting with `@` are collection bind parameters (`@@coll` in the
/// query text) and are sent as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindVars(IndexMap<String, Value>);

impl BindVars {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Build bind variables from `name=value` assignments.
    pub fn from_assignments<S: AsRef<str>>(items: impl IntoIterator<Item = S>) -> Result<Self> {
        let mut vars = Self::new();
        for item in items {
            let (key, value) = parse_assignment(item.as_ref())?;
            vars.insert(key, value);
        }
        Ok(vars)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }
}

impl FromIterator<(String, Value)> for BindVars {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Interpret user-entered text as a JSON value, falling back to a string.
///
/// `42` becomes a number, `true` a boolean, `[1,2]` an array, while `alice`
/// stays the string `"alice"`. Surrounding whitespace is ignored for JSON
/// detection only.
pub fn parse_value(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::String(text.to_string());
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Split a `name=value` assignment, parsing the value with [`parse_value`].
pub fn parse_assignment(item: &str) -> Result<(String, Value)> {
    let (key, value) = item.split_once('=').ok_or_else(|| {
        AqlzError::Validation(format!("expected NAME=VALUE, got '{}'", item))
    })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(AqlzError::Validation(format!(
            "missing name in assignment '{}'",
            item
        )));
    }
    Ok((key.to_string(), parse_value(value)))
}

/// Cursor options sent along with a query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CursorOptions {
    /// Number of records per server batch
    pub batch_size: Option<u32>,
    /// Ask the server to report the total result count
    pub count: bool,
    /// Report the number of documents before the last LIMIT
    pub full_count: bool,
    /// Abort the query on the server after this many seconds
    pub max_runtime: Option<f64>,
    /// Return query profiling information
    pub profile: bool,
}

/// A query plus its bind variables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    pub query: String,
    pub bind_vars: BindVars,
    pub options: CursorOptions,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            bind_vars: BindVars::new(),
            options: CursorOptions::default(),
        }
    }

    pub fn with_bind_vars(mut self, bind_vars: BindVars) -> Self {
        self.bind_vars = bind_vars;
        self
    }

    pub fn with_bind_var(mut self, name: impl Into<String>, value: Value) -> Self {
        self.bind_vars.insert(name, value);
        self
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.options.batch_size = Some(batch_size);
        self
    }

    pub fn with_count(mut self, count: bool) -> Self {
        self.options.count = count;
        self
    }

    pub fn with_full_count(mut self, full_count: bool) -> Self {
        self.options.full_count = full_count;
        self
    }

    pub fn with_max_runtime(mut self, seconds: f64) -> Self {
        self.options.max_runtime = Some(seconds);
        self
    }

    pub fn with_profile(mut self, profile: bool) -> Self {
        self.options.profile = profile;
        self
    }

    /// First line of the query, truncated, for logs and history listings
    pub fn preview(&self, max_chars: usize) -> String {
        let first_line = self.query.trim().lines().next().unwrap_or_default();
        if first_line.chars().count() > max_chars {
            let cut: String = first_line.chars().take(max_chars).collect();
            format!("{}...", cut)
        } else {
            first_line.to_string()
        }
    }
}

/// Options for retrieving an execution plan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExplainOptions {
    /// Return all candidate plans instead of the optimal one
    pub all_plans: bool,
    /// Upper bound for the number of plans the optimizer generates
    pub max_number_of_plans: Option<u32>,
    /// Optimizer rules to enable (`+rule`) or disable (`-rule`)
    pub optimizer_rules: Vec<String>,
}

/// A warning attached to a server response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryWarning {
    pub code: i64,
    pub message: String,
}

/// Execution plan returned by the server. Plan bodies are passed through
/// unmodified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplainPlan {
    /// The optimal plan (absent when all plans were requested)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Value>,
    /// Every candidate plan, when requested
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plans: Vec<Value>,
    /// Whether the query result could be served from the query cache
    #[serde(default)]
    pub cacheable: Option<bool>,
    #[serde(default)]
    pub warnings: Vec<QueryWarning>,
    #[serde(default)]
    pub stats: Option<Value>,
}

impl ExplainPlan {
    /// Estimated cost of the optimal plan
    pub fn estimated_cost(&self) -> Option<f64> {
        self.primary()?.get("estimatedCost")?.as_f64()
    }

    /// The optimal plan, or the first candidate plan
    pub fn primary(&self) -> Option<&Value> {
        self.plan.as_ref().or_else(|| self.plans.first())
    }

    /// Node types of the primary plan, in execution order
    pub fn node_types(&self) -> Vec<String> {
        self.primary()
            .and_then(|plan| plan.get("nodes"))
            .and_then(Value::as_array)
            .map(|nodes| {
                nodes
                    .iter()
                    .filter_map(|node| node.get("type").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Result of parsing a query on the server without executing it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    #[serde(default)]
    pub parsed: bool,
    /// Collections referenced by the query
    #[serde(default)]
    pub collections: Vec<String>,
    /// Bind variables referenced by the query
    #[serde(default)]
    pub bind_vars: Vec<String>,
    /// Abstract syntax tree
    #[serde(default)]
    pub ast: Value,
}

impl ValidationReport {
    /// Bind variables the query references that `provided` lacks
    pub fn missing_bind_vars(&self, provided: &BindVars) -> Vec<String> {
        self.bind_vars
            .iter()
            .filter(|name| !provided.contains(name))
            .cloned()
            .collect()
    }

    /// Provided bind variables the query never references
    pub fn unused_bind_vars(&self, provided: &BindVars) -> Vec<String> {
        provided
            .names()
            .filter(|name| !self.bind_vars.iter().any(|used| used == name))
            .map(str::to_string)
            .collect()
    }
}

/// Fully drained query result
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCursor {
    /// Local identifier for this result
    pub id: Uuid,
    /// Result records, in server order
    pub records: Vec<Value>,
    /// Total result count, when requested
    pub count: Option<u64>,
    /// Whether the result came from the query cache
    pub cached: bool,
    /// Execution statistics (`extra.stats`)
    pub stats: Option<Value>,
    pub warnings: Vec<QueryWarning>,
    /// Number of server batches fetched
    pub batches: u32,
    /// Wall-clock time spent executing and draining, in milliseconds
    pub execution_time_ms: u64,
}

impl QueryCursor {
    /// Create a cursor over already-materialized records
    pub fn from_records(records: Vec<Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            records,
            count: None,
            cached: false,
            stats: None,
            warnings: Vec::new(),
            batches: 1,
            execution_time_ms: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Identifier of a query running on the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub struct QueryId(pub u64);

impl std::fmt::Display for QueryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<QueryId> for String {
    fn from(id: QueryId) -> Self {
        id.to_string()
    }
}

impl FromStr for QueryId {
    type Err = AqlzError;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u64>()
            .map(QueryId)
            .map_err(|_| AqlzError::Validation(format!("invalid query id: '{}'", s)))
    }
}

impl<'de> Deserialize<'de> for QueryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(QueryId(n)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// A running or slow query, as reported by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDescriptor {
    pub id: QueryId,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub bind_vars: Option<Map<String, Value>>,
    #[serde(default)]
    pub started: Option<DateTime<Utc>>,
    /// Run time in seconds
    #[serde(default)]
    pub run_time: Option<f64>,
    #[serde(default)]
    pub peak_memory_usage: Option<u64>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub stream: Option<bool>,
    /// Fields this client does not model, kept for display
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
