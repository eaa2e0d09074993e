// Integration tests for the InfluxDB client
// Requires InfluxDB 1.x reachable over HTTP at INFLUX_TEST_HOST (host or host:port)

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use service_connectors::{Connector, InfluxClient};
use std::collections::HashMap;
use std::env;

async fn test_client() -> Option<InfluxClient> {
    let Ok(endpoint) = env::var("INFLUX_TEST_HOST") else {
        eprintln!("Skipping test: INFLUX_TEST_HOST not set");
        return None;
    };
    let (host, port) = match endpoint.split_once(':') {
        Some((host, port)) => (host.to_string(), port.parse().unwrap_or(8086)),
        None => (endpoint, 8086),
    };

    let client = InfluxClient::http(
        &host,
        port,
        &env::var("INFLUX_TEST_USERNAME").unwrap_or_default(),
        &env::var("INFLUX_TEST_PASSWORD").unwrap_or_default(),
    );
    if !client.health_check().await.unwrap_or(false) {
        eprintln!("Skipping test: InfluxDB not available at {}", host);
        return None;
    }
    Some(client)
}

fn count_of(results: &[service_connectors::QueryResult]) -> i64 {
    results
        .first()
        .and_then(|r| r.series.first())
        .and_then(|s| s.values.first())
        .and_then(|row| row.get(1))
        .and_then(Value::as_i64)
        .unwrap_or(0)
}

#[tokio::test]
async fn test_write_count_and_delete() {
    let Some(client) = test_client().await else {
        return;
    };
    let db = format!("connectors_test_{}", std::process::id());
    client.create_database(&db).await.unwrap();

    let mut fields = HashMap::new();
    fields.insert("temp".to_string(), json!(24.5));
    fields.insert("pump_on".to_string(), json!(true));
    client
        .insert_batch(&db, "tank", "tank_id", "a1", &fields)
        .await
        .unwrap();

    let earlier = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    client
        .insert_batch_with_time(&db, "tank", "tank_id", "a2", &fields, earlier)
        .await
        .unwrap();
    client.insert(&db, "tank", "temp", "25.1").await.unwrap();

    let counted = client.count_fields(&db, "temp", "tank").await.unwrap();
    assert_eq!(count_of(&counted), 3);

    let points = client.get_by_field(&db, "tank").await.unwrap();
    assert_eq!(points[0].series[0].values.len(), 3);
    assert!(points[0].series[0].columns.contains(&"tank_id".to_string()));

    client.delete_all(&db, "tank").await.unwrap();
    let counted = client.count_fields(&db, "temp", "tank").await.unwrap();
    assert_eq!(count_of(&counted), 0);

    client.query(&db, &format!("DROP DATABASE {}", db)).await.unwrap();
}

#[tokio::test]
async fn test_query_error_is_returned() {
    let Some(client) = test_client().await else {
        return;
    };

    let err = client
        .query("connectors_missing_db", "SELECT * FROM nothing")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("database not found"));
}
