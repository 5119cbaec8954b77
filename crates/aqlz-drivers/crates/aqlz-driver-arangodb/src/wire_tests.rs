//! Unit tests for request bodies and error mapping

use super::wire::*;
use aqlz_core::{AqlzError, BindVars, ExplainOptions, QueryRequest};
use pretty_assertions::assert_eq;
use serde_json::json;

mod request_body_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cursor_request_minimal() {
        let request = QueryRequest::new("RETURN 1");
        let body = serde_json::to_value(CursorRequest::from_request(&request)).unwrap();
        assert_eq!(body, json!({ "query": "RETURN 1" }));
    }

    #[test]
    fn test_cursor_request_with_options() {
        let request = QueryRequest::new("FOR d IN @@col FILTER d.x == @x RETURN d")
            .with_bind_var("@col", json!("users"))
            .with_bind_var("x", json!(5))
            .with_batch_size(2)
            .with_count(true)
            .with_full_count(true)
            .with_max_runtime(1.5);
        let body = serde_json::to_value(CursorRequest::from_request(&request)).unwrap();
        assert_eq!(
            body,
            json!({
                "query": "FOR d IN @@col FILTER d.x == @x RETURN d",
                "bindVars": { "@col": "users", "x": 5 },
                "batchSize": 2,
                "count": true,
                "options": { "fullCount": true, "maxRuntime": 1.5 }
            })
        );
    }

    #[test]
    fn test_explain_request_all_plans_and_rules() {
        let request = QueryRequest::new("RETURN @v").with_bind_var("v", json!([1, 2]));
        let options = ExplainOptions {
            all_plans: true,
            max_number_of_plans: Some(3),
            optimizer_rules: vec!["-all".to_string(), "+use-indexes".to_string()],
        };
        let body = serde_json::to_value(ExplainRequest::new(&request, &options)).unwrap();
        assert_eq!(
            body,
            json!({
                "query": "RETURN @v",
                "bindVars": { "v": [1, 2] },
                "options": {
                    "allPlans": true,
                    "maxNumberOfPlans": 3,
                    "optimizer": { "rules": ["-all", "+use-indexes"] }
                }
            })
        );
    }

    #[test]
    fn test_explain_request_defaults_send_empty_options() {
        let request = QueryRequest::new("RETURN 1");
        let body =
            serde_json::to_value(ExplainRequest::new(&request, &ExplainOptions::default())).unwrap();
        assert_eq!(body, json!({ "query": "RETURN 1", "options": {} }));
    }

    #[test]
    fn test_parse_request() {
        let body = serde_json::to_value(ParseRequest { query: "RETURN 1" }).unwrap();
        assert_eq!(body, json!({ "query": "RETURN 1" }));
    }

    #[test]
    fn test_empty_bind_vars_omitted() {
        let request = QueryRequest::new("RETURN 1").with_bind_vars(BindVars::new());
        let body = serde_json::to_value(CursorRequest::from_request(&request)).unwrap();
        assert!(body.get("bindVars").is_none());
    }
}

mod response_body_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cursor_response_with_more() {
        let response: CursorResponse = serde_json::from_value(json!({
            "result": [1, 2],
            "hasMore": true,
            "id": "12345",
            "count": 3,
            "cached": false,
            "error": false,
            "code": 201
        }))
        .unwrap();
        assert_eq!(response.result, vec![json!(1), json!(2)]);
        assert!(response.has_more);
        assert_eq!(response.id.as_deref(), Some("12345"));
        assert_eq!(response.count, Some(3));
    }

    #[test]
    fn test_cursor_response_extra() {
        let response: CursorResponse = serde_json::from_value(json!({
            "result": [],
            "hasMore": false,
            "extra": {
                "stats": { "writesExecuted": 0, "scannedFull": 10 },
                "warnings": [{ "code": 1562, "message": "division by zero" }]
            }
        }))
        .unwrap();
        let extra = response.extra.unwrap();
        assert_eq!(extra.stats.unwrap()["scannedFull"], json!(10));
        assert_eq!(extra.warnings.len(), 1);
        assert_eq!(extra.warnings[0].code, 1562);
    }

    #[test]
    fn test_version_response() {
        let response: VersionResponse =
            serde_json::from_value(json!({ "server": "arango", "version": "3.11.5", "license": "community" }))
                .unwrap();
        assert_eq!(response.version, "3.11.5");
        assert_eq!(response.license.as_deref(), Some("community"));
    }
}

mod error_mapping_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn body(code: u16, num: u32, message: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "error": true,
            "code": code,
            "errorNum": num,
            "errorMessage": message
        }))
        .unwrap()
    }

    #[test]
    fn test_kill_unknown_query_is_not_found() {
        let err = map_error_response(404, &body(404, 1591, "query ID not found"), RequestKind::Kill);
        assert!(matches!(err, AqlzError::NotFound(_)));
        assert_eq!(err.http_code(), Some(404));
        assert_eq!(err.error_num(), Some(1591));
    }

    #[test]
    fn test_any_404_on_kill_is_not_found() {
        let err = map_error_response(404, b"", RequestKind::Kill);
        assert!(matches!(err, AqlzError::NotFound(_)));
        assert_eq!(err.error_num(), None);
    }

    #[test]
    fn test_parse_error_is_query_error() {
        let err = map_error_response(
            400,
            &body(400, 1501, "syntax error, unexpected identifier"),
            RequestKind::Query,
        );
        match err {
            AqlzError::Query(info) => {
                assert_eq!(info.http_code, 400);
                assert_eq!(info.error_num, Some(1501));
                assert_eq!(info.message, "syntax error, unexpected identifier");
            }
            other => panic!("expected Query error, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_request_without_query_error_num_on_query() {
        let err = map_error_response(400, &body(400, 10, "bad parameter"), RequestKind::Query);
        assert!(matches!(err, AqlzError::Query(_)));
    }

    #[test]
    fn test_bad_request_on_admin_is_server_error() {
        let err = map_error_response(400, &body(400, 10, "bad parameter"), RequestKind::Admin);
        assert!(matches!(err, AqlzError::Server(_)));
    }

    #[test]
    fn test_unauthorized_is_connection_error() {
        let err = map_error_response(401, &body(401, 11, "not authorized"), RequestKind::Admin);
        assert!(matches!(err, AqlzError::Connection(_)));
        let err = map_error_response(403, b"", RequestKind::Query);
        assert!(matches!(err, AqlzError::Connection(_)));
    }

    #[test]
    fn test_database_not_found_is_connection_error() {
        let err = map_error_response(
            404,
            &body(404, ERROR_DATABASE_NOT_FOUND, "database not found"),
            RequestKind::Admin,
        );
        match err {
            AqlzError::Connection(msg) => assert!(msg.contains("database not found")),
            other => panic!("expected Connection error, got {:?}", other),
        }
    }

    #[test]
    fn test_internal_error_is_server_error() {
        let err = map_error_response(500, &body(500, 4, "internal error"), RequestKind::Query);
        assert!(matches!(err, AqlzError::Server(_)));
        assert_eq!(err.http_code(), Some(500));
    }

    #[test]
    fn test_non_json_body_is_kept_as_message() {
        let err = map_error_response(502, b"<html>Bad Gateway</html>", RequestKind::Admin);
        match err {
            AqlzError::Server(info) => {
                assert_eq!(info.error_num, None);
                assert_eq!(info.message, "<html>Bad Gateway</html>");
            }
            other => panic!("expected Server error, got {:?}", other),
        }
    }

    #[test]
    fn test_long_body_is_truncated() {
        let long = "x".repeat(500);
        let err = map_error_response(500, long.as_bytes(), RequestKind::Admin);
        let info = err.server_info().unwrap();
        assert_eq!(info.message.len(), 203);
        assert!(info.message.ends_with("..."));
    }

    #[test]
    fn test_empty_body_uses_status() {
        let err = map_error_response(503, b"", RequestKind::Admin);
        assert_eq!(err.server_info().unwrap().message, "HTTP status 503");
    }
}
