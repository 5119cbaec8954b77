//! Unit tests for ArangoDB driver

use super::*;
use aqlz_core::{AqlzError, ConnectionConfig, DatabaseDriver, QueryRequest};

mod driver_metadata_tests {
    use super::*;

    #[test]
    fn test_arangodb_driver_id() {
        let driver = ArangoDbDriver::new();
        assert_eq!(driver.id(), "arangodb");
        assert_eq!(driver.name(), "arangodb");
        assert_eq!(driver.display_name(), "ArangoDB");
    }

    #[test]
    fn test_arangodb_default_host() {
        let driver = ArangoDbDriver::default();
        assert_eq!(driver.default_host(), "http://localhost:8529");
    }

    #[test]
    fn test_arangodb_capabilities() {
        let caps = ArangoDbDriver::new().capabilities();
        assert!(caps.supports_explain);
        assert!(caps.supports_validation);
        assert!(caps.supports_bind_vars);
        assert!(caps.supports_query_tracking);
        assert!(caps.supports_kill);
    }

    #[test]
    fn test_arangodb_default_params() {
        let params = ArangoDbDriver::new().default_params();
        assert_eq!(params.get("verify").map(String::as_str), Some("true"));
        assert_eq!(params.get("timeout_secs").map(String::as_str), Some("60"));
    }

    #[test]
    fn test_arangodb_field_schema() {
        let schema = ArangoDbDriver::new().connection_field_schema();
        let ids: Vec<&str> = schema.fields.iter().map(|f| f.id.as_ref()).collect();
        assert_eq!(ids, vec!["host", "database", "username", "password", "verify"]);
        assert!(schema.fields[0].required);
    }
}

mod connection_string_tests {
    use super::*;

    #[test]
    fn test_build_connection_string() {
        let driver = ArangoDbDriver::new();
        let config = ConnectionConfig::new_arangodb("http://db.example:8529", "test");
        assert_eq!(
            driver.build_connection_string(&config),
            "http://db.example:8529/_db/test/"
        );
    }

    #[test]
    fn test_build_connection_string_defaults() {
        let driver = ArangoDbDriver::new();
        let config = ConnectionConfig::new("arangodb", "defaults");
        assert_eq!(
            driver.build_connection_string(&config),
            "http://localhost:8529/_db/test/"
        );
    }

    #[test]
    fn test_base_url_keeps_host_path_prefix() {
        let url = build_base_url("https://proxy.example/arango/", "sales").unwrap();
        assert_eq!(url.as_str(), "https://proxy.example/arango/_db/sales/");
    }

    #[test]
    fn test_base_url_encodes_database_name() {
        let url = build_base_url("http://localhost:8529", "my db").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8529/_db/my%20db/");
    }

    #[test]
    fn test_base_url_rejects_invalid_host() {
        let err = build_base_url("not a url", "test").unwrap_err();
        assert!(matches!(err, AqlzError::Configuration(_)));
    }

    #[test]
    fn test_base_url_rejects_other_schemes() {
        let err = build_base_url("ftp://localhost", "test").unwrap_err();
        assert!(matches!(err, AqlzError::Configuration(_)));
    }
}

mod connect_tests {
    use super::*;

    fn unverified_config() -> ConnectionConfig {
        ConnectionConfig::new_arangodb("http://127.0.0.1:9", "test").with_param("verify", "false")
    }

    #[tokio::test]
    async fn test_connect_without_verification_does_no_io() {
        let driver = ArangoDbDriver::new();
        let conn = driver.connect(&unverified_config()).await.unwrap();
        assert_eq!(conn.driver_name(), "arangodb");
        assert_eq!(conn.database(), "test");
        assert_eq!(conn.username(), None);
        assert!(!conn.is_closed());
    }

    #[tokio::test]
    async fn test_connect_reports_username() {
        let driver = ArangoDbDriver::new();
        let config = unverified_config()
            .with_credentials(Some("root".to_string()), Some("secret".to_string()));
        let conn = driver.connect(&config).await.unwrap();
        assert_eq!(conn.username(), Some("root"));
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_timeout() {
        let driver = ArangoDbDriver::new();
        let config = unverified_config().with_param("timeout_secs", "soon");
        let err = driver.connect(&config).await.err().unwrap();
        assert!(matches!(err, AqlzError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_closed_connection_rejects_requests() {
        let driver = ArangoDbDriver::new();
        let conn = driver.connect(&unverified_config()).await.unwrap();
        conn.close().await.unwrap();
        assert!(conn.is_closed());

        let err = conn.execute(&QueryRequest::new("RETURN 1")).await.unwrap_err();
        assert!(matches!(err, AqlzError::Connection(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connection_error() {
        let driver = ArangoDbDriver::new();
        let config = ConnectionConfig::new_arangodb("http://127.0.0.1:9", "test")
            .with_param("timeout_secs", "2");
        let err = driver.connect(&config).await.err().unwrap();
        assert!(matches!(err, AqlzError::Connection(_)));
    }
}
