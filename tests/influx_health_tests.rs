// InfluxDB health check tests against an in-process axum server answering
// /ping and /query like an InfluxDB 1.x node holding a single "metrics" database

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use service_connectors::config::InfluxConfig;
use service_connectors::{Connector, InfluxClient};
use std::collections::HashMap;

async fn ping() -> (StatusCode, [(&'static str, &'static str); 2]) {
    (
        StatusCode::NO_CONTENT,
        [("X-Influxdb-Build", "OSS"), ("X-Influxdb-Version", "1.8.10")],
    )
}

async fn query(Query(params): Query<HashMap<String, String>>) -> String {
    match params.get("db").map(String::as_str) {
        Some("metrics") => {
            r#"{"results":[{"statement_id":0,"series":[{"name":"measurements","columns":["name"],"values":[["cpu"]]}]}]}"#
                .to_string()
        }
        Some(db) => format!(
            r#"{{"results":[{{"statement_id":0,"error":"database not found: {}"}}]}}"#,
            db
        ),
        None => r#"{"error":"database name required"}"#.to_string(),
    }
}

async fn spawn_influx() -> u16 {
    let app = Router::new()
        .route("/ping", get(ping).head(ping))
        .route("/query", get(query).post(query));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    port
}

fn config(port: u16, database: Option<&str>) -> InfluxConfig {
    InfluxConfig {
        host: "127.0.0.1".to_string(),
        port,
        database: database.map(str::to_string),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_health_check_with_existing_database() {
    let port = spawn_influx().await;
    let client = InfluxClient::from_config(&config(port, Some("metrics")))
        .await
        .unwrap();
    assert!(client.health_check().await.unwrap());
}

#[tokio::test]
async fn test_health_check_with_missing_database() {
    let port = spawn_influx().await;
    let client = InfluxClient::from_config(&config(port, Some("archive")))
        .await
        .unwrap();
    assert!(!client.health_check().await.unwrap());
}

#[tokio::test]
async fn test_health_check_without_database_only_pings() {
    let port = spawn_influx().await;

    let client = InfluxClient::from_config(&config(port, None)).await.unwrap();
    assert!(client.health_check().await.unwrap());

    // An empty value from `${INFLUX_DATABASE:-}` behaves like an unset one
    let client = InfluxClient::from_config(&config(port, Some("")))
        .await
        .unwrap();
    assert!(client.health_check().await.unwrap());
}
