//! AQL query tracking properties
//!
//! The server keeps lists of running and slow queries according to a small
//! set of tracking properties. Updates are validated locally so that an
//! unknown or mistyped property never reaches the server.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{AqlzError, Result};

/// Tracking properties as reported by the server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingProperties {
    /// Whether running queries are tracked at all
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub track_slow_queries: bool,
    #[serde(default)]
    pub track_bind_vars: bool,
    #[serde(default)]
    pub max_slow_queries: u64,
    /// Seconds after which a query counts as slow
    #[serde(default)]
    pub slow_query_threshold: f64,
    /// Seconds after which a streaming query counts as slow
    #[serde(default)]
    pub slow_streaming_query_threshold: Option<f64>,
    #[serde(default)]
    pub max_query_string_length: u64,
    /// Fields this client does not model
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A recognized tracking property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingProperty {
    Enabled,
    TrackSlowQueries,
    TrackBindVars,
    MaxSlowQueries,
    SlowQueryThreshold,
    SlowStreamingQueryThreshold,
    MaxQueryStringLength,
}

impl TrackingProperty {
    pub const ALL: [TrackingProperty; 7] = [
        TrackingProperty::Enabled,
        TrackingProperty::TrackSlowQueries,
        TrackingProperty::TrackBindVars,
        TrackingProperty::MaxSlowQueries,
        TrackingProperty::SlowQueryThreshold,
        TrackingProperty::SlowStreamingQueryThreshold,
        TrackingProperty::MaxQueryStringLength,
    ];

    /// Wire name used by the server
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::TrackSlowQueries => "trackSlowQueries",
            Self::TrackBindVars => "trackBindVars",
            Self::MaxSlowQueries => "maxSlowQueries",
            Self::SlowQueryThreshold => "slowQueryThreshold",
            Self::SlowStreamingQueryThreshold => "slowStreamingQueryThreshold",
            Self::MaxQueryStringLength => "maxQueryStringLength",
        }
    }

    /// snake_case alias accepted from users
    pub fn snake_name(&self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::TrackSlowQueries => "track_slow_queries",
            Self::TrackBindVars => "track_bind_vars",
            Self::MaxSlowQueries => "max_slow_queries",
            Self::SlowQueryThreshold => "slow_query_threshold",
            Self::SlowStreamingQueryThreshold => "slow_streaming_query_threshold",
            Self::MaxQueryStringLength => "max_query_string_length",
        }
    }

    /// Look up a property by wire name or snake_case alias
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.wire_name() == name || p.snake_name() == name)
    }

    fn kind(&self) -> ValueKind {
        match self {
            Self::Enabled | Self::TrackSlowQueries | Self::TrackBindVars => ValueKind::Bool,
            Self::MaxSlowQueries | Self::MaxQueryStringLength => ValueKind::Count,
            Self::SlowQueryThreshold | Self::SlowStreamingQueryThreshold => ValueKind::Seconds,
        }
    }
}

impl std::fmt::Display for TrackingProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[derive(Debug, Clone, Copy)]
enum ValueKind {
    Bool,
    Count,
    Seconds,
}

/// A partial update of tracking properties. Only the fields that are set
/// are sent to the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_slow_queries: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_bind_vars: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_slow_queries: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slow_query_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slow_streaming_query_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_query_string_length: Option<u64>,
}

impl TrackingUpdate {
    /// Build an update from name/value pairs.
    ///
    /// Every pair is checked before anything is returned: an unknown name, a
    /// value of the wrong type, or an empty input fails with
    /// [`AqlzError::Validation`].
    pub fn from_pairs<K: AsRef<str>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Result<Self> {
        let mut update = Self::default();
        let mut seen = 0usize;
        for (name, value) in pairs {
            let name = name.as_ref();
            let property = TrackingProperty::from_name(name).ok_or_else(|| {
                AqlzError::Validation(format!(
                    "unknown tracking property '{}' (expected one of: {})",
                    name,
                    TrackingProperty::ALL
                        .iter()
                        .map(|p| p.wire_name())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })?;
            update.set(property, &value)?;
            seen += 1;
        }
        if seen == 0 {
            return Err(AqlzError::Validation(
                "no tracking properties given".to_string(),
            ));
        }
        Ok(update)
    }

    fn set(&mut self, property: TrackingProperty, value: &Value) -> Result<()> {
        let invalid = |expected: &str| {
            AqlzError::Validation(format!(
                "tracking property '{}' expects {}, got {}",
                property, expected, value
            ))
        };
        match property.kind() {
            ValueKind::Bool => {
                let v = value.as_bool().ok_or_else(|| invalid("a boolean"))?;
                match property {
                    TrackingProperty::Enabled => self.enabled = Some(v),
                    TrackingProperty::TrackSlowQueries => self.track_slow_queries = Some(v),
                    _ => self.track_bind_vars = Some(v),
                }
            }
            ValueKind::Count => {
                let v = value
                    .as_u64()
                    .ok_or_else(|| invalid("a non-negative integer"))?;
                match property {
                    TrackingProperty::MaxSlowQueries => self.max_slow_queries = Some(v),
                    _ => self.max_query_string_length = Some(v),
                }
            }
            ValueKind::Seconds => {
                let v = value
                    .as_f64()
                    .filter(|s| *s >= 0.0)
                    .ok_or_else(|| invalid("a non-negative number of seconds"))?;
                match property {
                    TrackingProperty::SlowQueryThreshold => self.slow_query_threshold = Some(v),
                    _ => self.slow_streaming_query_threshold = Some(v),
                }
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply this update to a copy of `current`
    pub fn apply_to(&self, current: &TrackingProperties) -> TrackingProperties {
        let mut next = current.clone();
        if let Some(v) = self.enabled {
            next.enabled = v;
        }
        if let Some(v) = self.track_slow_queries {
            next.track_slow_queries = v;
        }
        if let Some(v) = self.track_bind_vars {
            next.track_bind_vars = v;
        }
        if let Some(v) = self.max_slow_queries {
            next.max_slow_queries = v;
        }
        if let Some(v) = self.slow_query_threshold {
            next.slow_query_threshold = v;
        }
        if let Some(v) = self.slow_streaming_query_threshold {
            next.slow_streaming_query_threshold = Some(v);
        }
        if let Some(v) = self.max_query_string_length {
            next.max_query_string_length = v;
        }
        next
    }
}

#[cfg(test)]
mod tests;
