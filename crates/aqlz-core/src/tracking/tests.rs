//! Unit tests for tracking properties

use super::*;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_property_lookup_accepts_both_spellings() {
    assert_eq!(
        TrackingProperty::from_name("slowQueryThreshold"),
        Some(TrackingProperty::SlowQueryThreshold)
    );
    assert_eq!(
        TrackingProperty::from_name("slow_query_threshold"),
        Some(TrackingProperty::SlowQueryThreshold)
    );
    assert_eq!(TrackingProperty::from_name("bogus"), None);
}

#[test]
fn test_update_serializes_only_set_fields() {
    let update = TrackingUpdate::from_pairs(vec![
        ("enabled", json!(true)),
        ("max_slow_queries", json!(64)),
    ])
    .unwrap();

    assert_eq!(
        serde_json::to_value(&update).unwrap(),
        json!({"enabled": true, "maxSlowQueries": 64})
    );
}

#[test]
fn test_unknown_property_is_rejected() {
    let err = TrackingUpdate::from_pairs(vec![
        ("enabled", json!(false)),
        ("colour", json!("blue")),
    ])
    .unwrap_err();

    match err {
        AqlzError::Validation(msg) => assert!(msg.contains("colour")),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn test_wrong_value_types_are_rejected() {
    assert!(TrackingUpdate::from_pairs(vec![("enabled", json!("yes"))]).is_err());
    assert!(TrackingUpdate::from_pairs(vec![("maxSlowQueries", json!(-1))]).is_err());
    assert!(TrackingUpdate::from_pairs(vec![("maxSlowQueries", json!(1.5))]).is_err());
    assert!(TrackingUpdate::from_pairs(vec![("slowQueryThreshold", json!(-0.5))]).is_err());
}

#[test]
fn test_thresholds_accept_integers_and_floats() {
    let update = TrackingUpdate::from_pairs(vec![
        ("slowQueryThreshold", json!(5)),
        ("slowStreamingQueryThreshold", json!(12.5)),
    ])
    .unwrap();
    assert_eq!(update.slow_query_threshold, Some(5.0));
    assert_eq!(update.slow_streaming_query_threshold, Some(12.5));
}

#[test]
fn test_empty_update_is_rejected() {
    let pairs: Vec<(&str, Value)> = Vec::new();
    assert!(matches!(
        TrackingUpdate::from_pairs(pairs),
        Err(AqlzError::Validation(_))
    ));
    assert!(TrackingUpdate::default().is_empty());
}

#[test]
fn test_apply_to_leaves_unset_fields() {
    let current = TrackingProperties {
        enabled: true,
        track_slow_queries: true,
        track_bind_vars: true,
        max_slow_queries: 64,
        slow_query_threshold: 10.0,
        slow_streaming_query_threshold: Some(10.0),
        max_query_string_length: 4096,
        extra: Map::new(),
    };
    let update = TrackingUpdate {
        track_bind_vars: Some(false),
        slow_query_threshold: Some(2.0),
        ..Default::default()
    };

    let next = update.apply_to(&current);
    assert!(!next.track_bind_vars);
    assert_eq!(next.slow_query_threshold, 2.0);
    assert_eq!(next.max_slow_queries, 64);
    assert!(next.enabled);
}

#[test]
fn test_properties_from_server_json() {
    let props: TrackingProperties = serde_json::from_value(json!({
        "enabled": true,
        "trackSlowQueries": true,
        "trackBindVars": true,
        "maxSlowQueries": 64,
        "slowQueryThreshold": 10,
        "slowStreamingQueryThreshold": 10,
        "maxQueryStringLength": 4096,
        "maxDNFConditionMembers": 786
    }))
    .unwrap();

    assert_eq!(props.max_query_string_length, 4096);
    assert_eq!(props.slow_query_threshold, 10.0);
    assert_eq!(props.extra.get("maxDNFConditionMembers"), Some(&json!(786)));
}
