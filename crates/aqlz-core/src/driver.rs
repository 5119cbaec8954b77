//! Database driver trait definition

use crate::{Connection, Result};
use async_trait::async_trait;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

/// Field type for connection forms
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionFieldType {
    /// Single-line text input
    Text,
    /// Password input (masked)
    Password,
    /// URL input
    Url,
    /// Checkbox/toggle
    Boolean,
}

impl ConnectionFieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Password => "password",
            Self::Url => "url",
            Self::Boolean => "boolean",
        }
    }
}

/// Definition of a connection form field
#[derive(Debug, Clone)]
pub struct ConnectionField {
    /// Field identifier (used as key in params)
    pub id: Cow<'static, str>,
    /// Display label
    pub label: Cow<'static, str>,
    pub field_type: ConnectionFieldType,
    pub placeholder: Option<Cow<'static, str>>,
    pub default_value: Option<Cow<'static, str>>,
    pub required: bool,
    pub help_text: Option<Cow<'static, str>>,
}

impl ConnectionField {
    const fn with_type(id: &'static str, label: &'static str, field_type: ConnectionFieldType) -> Self {
        Self {
            id: Cow::Borrowed(id),
            label: Cow::Borrowed(label),
            field_type,
            placeholder: None,
            default_value: None,
            required: false,
            help_text: None,
        }
    }

    /// Create a new text field
    pub const fn text(id: &'static str, label: &'static str) -> Self {
        Self::with_type(id, label, ConnectionFieldType::Text)
    }

    /// Create a new password field
    pub const fn password(id: &'static str, label: &'static str) -> Self {
        Self::with_type(id, label, ConnectionFieldType::Password)
    }

    /// Create a new URL field
    pub const fn url(id: &'static str, label: &'static str) -> Self {
        Self::with_type(id, label, ConnectionFieldType::Url)
    }

    /// Create a new boolean/checkbox field
    pub const fn boolean(id: &'static str, label: &'static str) -> Self {
        Self::with_type(id, label, ConnectionFieldType::Boolean)
    }

    // Builder methods
    pub fn placeholder(mut self, placeholder: &'static str) -> Self {
        self.placeholder = Some(Cow::Borrowed(placeholder));
        self
    }

    pub fn default_value(mut self, value: &'static str) -> Self {
        self.default_value = Some(Cow::Borrowed(value));
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn help_text(mut self, text: &'static str) -> Self {
        self.help_text = Some(Cow::Borrowed(text));
        self
    }
}

/// Schema describing the connection fields a driver accepts
#[derive(Debug, Clone)]
pub struct ConnectionFieldSchema {
    pub title: Cow<'static, str>,
    pub fields: Vec<ConnectionField>,
}

/// What a driver's query API supports
#[derive(Debug, Clone, Default)]
pub struct DriverCapabilities {
    pub supports_explain: bool,
    pub supports_validation: bool,
    pub supports_bind_vars: bool,
    pub supports_query_tracking: bool,
    pub supports_kill: bool,
    pub supports_streaming_cursors: bool,
}

/// Core driver trait that all database drivers must implement
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Unique identifier of the driver
    fn id(&self) -> &'static str {
        self.name()
    }

    /// Driver name used for registry lookups
    fn name(&self) -> &'static str;

    /// Human-readable name
    fn display_name(&self) -> &'static str {
        self.name()
    }

    fn version(&self) -> &'static str {
        "0.1.0"
    }

    fn capabilities(&self) -> DriverCapabilities;

    /// Endpoint used when none is configured
    fn default_host(&self) -> &'static str;

    /// Open a connection
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>>;

    /// Open a connection and verify the server answers
    async fn test_connection(&self, config: &ConnectionConfig) -> Result<()>;

    /// Endpoint URL a config resolves to, without credentials
    fn build_connection_string(&self, config: &ConnectionConfig) -> String;

    fn connection_string_help(&self) -> &'static str {
        ""
    }

    /// Default connection parameters
    fn default_params(&self) -> HashMap<String, String> {
        HashMap::new()
    }

    /// Fields a connection form should show for this driver
    fn connection_field_schema(&self) -> ConnectionFieldSchema {
        ConnectionFieldSchema {
            title: Cow::Borrowed("Connection"),
            fields: vec![
                ConnectionField::url("host", "Host").required(),
                ConnectionField::text("database", "Database"),
                ConnectionField::text("username", "Username"),
                ConnectionField::password("password", "Password"),
            ],
        }
    }
}

/// Connection configuration
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Unique identifier
    pub id: uuid::Uuid,
    /// Display name
    pub name: String,
    /// Driver ID (e.g., "arangodb")
    pub driver: String,
    /// Endpoint URL (empty for the driver default)
    pub host: String,
    /// Database name
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Additional connection parameters
    pub params: HashMap<String, String>,
    /// Created timestamp
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ConnectionConfig {
    /// Create a new configuration with default values
    pub fn new(driver: &str, name: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            name: name.to_string(),
            driver: driver.to_string(),
            host: String::new(),
            database: None,
            username: None,
            password: None,
            params: HashMap::new(),
            created_at: chrono::Utc::now(),
        }
    }

    /// Create an ArangoDB configuration
    pub fn new_arangodb(host: &str, database: &str) -> Self {
        let mut config = Self::new("arangodb", "ArangoDB");
        config.host = host.to_string();
        config.database = Some(database.to_string());
        config
    }

    /// Set credentials
    pub fn with_credentials(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.username = username;
        self.password = password;
        self
    }

    /// Set a connection parameter
    pub fn with_param(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        let val = value.into();
        let str_val = match val {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        self.params.insert(key.to_string(), str_val);
        self
    }

    /// Get a string parameter
    pub fn get_string(&self, key: &str) -> Option<String> {
        // First check params
        if let Some(val) = self.params.get(key) {
            return Some(val.clone());
        }
        // Check known fields
        match key {
            "host" => Some(self.host.clone()),
            "database" => self.database.clone(),
            "username" | "user" => self.username.clone(),
            "password" => self.password.clone(),
            _ => None,
        }
    }

    /// Get a boolean parameter (`true`/`1`/`yes` are true)
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.params.get(key).map(|v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "yes"
            )
        })
    }
}
