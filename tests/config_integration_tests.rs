// Configuration system integration tests

use service_connectors::config::{load_config, load_config_with_env, ConfigLoader};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("services.yaml");
    fs::write(&path, content).expect("Failed to write temp config");
    path
}

#[test]
fn test_load_default_config() {
    let config_path = PathBuf::from("config/default.yaml");

    if config_path.exists() {
        let result = load_config(&config_path);
        assert!(result.is_ok(), "Failed to load default config: {:?}", result.err());

        let config = result.unwrap();

        let influx = config.influx.expect("influx section");
        assert_eq!(influx.transport, "http");
        assert_eq!(influx.port, 8086);

        let mongo = config.mongodb.expect("mongodb section");
        assert_eq!(mongo.port, 27017);
        assert_eq!(mongo.timeout_seconds, 5);

        let amqp = config.rabbitmq.expect("rabbitmq section");
        assert_eq!(amqp.vhost, "/");
        assert_eq!(amqp.prefetch_count, Some(10));
        assert_eq!(amqp.dead_letter.expect("dead letter").routing_key, "rejected");

        let redis = config.redis.expect("redis section");
        assert_eq!(redis.pool.max_size, 5);
        assert_eq!(redis.pool.idle_timeout_seconds, 240);
        assert!(redis.pool.test_on_checkout);
        assert_eq!(redis.response_timeout(), Some(Duration::from_secs(2)));

        let s3 = config.s3.expect("s3 section");
        assert_eq!(s3.download_dir, "images");

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "text");
    }
}

#[test]
fn test_config_with_env_vars() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
redis:
  host: ${CFG_IT_REDIS_HOST:-localhost}
  port: ${CFG_IT_REDIS_PORT:-6379}
  password: ${CFG_IT_REDIS_PASSWORD}

mongodb:
  host: ${CFG_IT_MONGO_HOST:-mongo.internal}
  database: ${CFG_IT_MONGO_DB:-inventory}
"#,
    );

    std::env::set_var("CFG_IT_REDIS_HOST", "cache.internal");
    std::env::set_var("CFG_IT_REDIS_PORT", "6380");
    std::env::remove_var("CFG_IT_REDIS_PASSWORD");

    let result = load_config(&path);
    assert!(result.is_ok(), "Failed to load config with env vars: {:?}", result.err());
    let config = result.unwrap();

    let redis = config.redis.unwrap();
    assert_eq!(redis.host, "cache.internal");
    assert_eq!(redis.port, 6380);
    // Unset without default stays verbatim
    assert_eq!(redis.password.as_deref(), Some("${CFG_IT_REDIS_PASSWORD}"));

    let mongo = config.mongodb.unwrap();
    assert_eq!(mongo.host, "mongo.internal");
    assert_eq!(mongo.database, "inventory");
    assert!(config.influx.is_none());
    assert!(config.s3.is_none());

    std::env::remove_var("CFG_IT_REDIS_HOST");
    std::env::remove_var("CFG_IT_REDIS_PORT");
}

#[test]
fn test_env_overrides_only_touch_configured_sections() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
redis:
  host: localhost
s3:
  access_key_id: key
  secret_access_key: secret
  region: us-east-1
  bucket: uploads
"#,
    );

    std::env::set_var("REDIS_HOST", "redis.override");
    std::env::set_var("REDIS_PASSWORD", "hunter2");
    std::env::set_var("S3_REGION", "eu-west-1");
    std::env::set_var("MONGO_HOST", "mongo.override");

    let config = load_config_with_env(&path).unwrap();

    std::env::remove_var("REDIS_HOST");
    std::env::remove_var("REDIS_PASSWORD");
    std::env::remove_var("S3_REGION");
    std::env::remove_var("MONGO_HOST");

    let redis = config.redis.unwrap();
    assert_eq!(redis.host, "redis.override");
    assert_eq!(redis.password.as_deref(), Some("hunter2"));
    assert_eq!(config.s3.unwrap().region, "eu-west-1");
    assert!(config.mongodb.is_none());
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();

    let path = write_config(&dir, "redis:\n  host: localhost\n  pool:\n    max_size: 0\n");
    let err = load_config(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("redis.pool.max_size"));

    let path = write_config(&dir, "s3:\n  access_key_id: a\n  secret_access_key: b\n  region: us-east-1\n  bucket: \"\"\n");
    let err = load_config(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("s3.bucket"));

    let path = write_config(&dir, "logging:\n  format: xml\n");
    let err = load_config(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("logging.format"));
}

#[test]
fn test_malformed_yaml() {
    let result = ConfigLoader::parse("redis: [unterminated");
    assert!(result.is_err());
}

#[test]
fn test_missing_file() {
    let result = load_config("/nonexistent/services.yaml");
    assert!(result.is_err());
}

#[test]
fn test_minimal_sections_use_defaults() {
    let config = ConfigLoader::parse(
        r#"
influx:
  host: tsdb.internal
http: {}
rabbitmq:
  host: mq.internal
  username: svc
  password: secret
  queue: orders
  exchange: orders
  routing_key: created
"#,
    )
    .unwrap();

    let influx = config.influx.unwrap();
    assert_eq!(influx.transport, "http");
    assert_eq!(influx.port, 8086);
    assert!(influx.username.is_none());

    let http = config.http.unwrap();
    assert_eq!(http.timeout_seconds, 5);
    assert!(http.health_url.is_none());

    let amqp = config.rabbitmq.unwrap();
    assert_eq!(amqp.port, 5672);
    assert_eq!(amqp.vhost, "/");
    assert!(amqp.dead_letter.is_none());
    assert!(amqp.prefetch_count.is_none());
}

#[test]
fn test_redis_response_timeout() {
    let config = ConfigLoader::parse(
        r#"
redis:
  host: cache.internal
  response_timeout_seconds: 0
"#,
    )
    .unwrap();
    let redis = config.redis.unwrap();
    assert_eq!(redis.response_timeout(), None);
    assert_eq!(redis.connect_timeout(), Duration::from_secs(20));

    let config = ConfigLoader::parse("redis:\n  host: cache.internal\n").unwrap();
    assert_eq!(
        config.redis.unwrap().response_timeout(),
        Some(Duration::from_secs(2))
    );
}
