// Integration tests for the Redis client
// Requires Redis reachable at REDIS_TEST_HOST (host or host:port)

use service_connectors::config::RedisConfig;
use service_connectors::kv::{connect_single, KvClient};
use service_connectors::Connector;
use std::collections::HashMap;
use std::env;

fn test_config() -> Option<RedisConfig> {
    let endpoint = env::var("REDIS_TEST_HOST").ok()?;
    let (host, port) = match endpoint.split_once(':') {
        Some((host, port)) => (host.to_string(), port.parse().ok()?),
        None => (endpoint, 6379),
    };

    Some(RedisConfig {
        host,
        port,
        password: env::var("REDIS_TEST_PASSWORD").ok(),
        database: 15,
        connect_timeout_seconds: 2,
        ..Default::default()
    })
}

async fn test_client() -> Option<KvClient> {
    let Some(config) = test_config() else {
        eprintln!("Skipping test: REDIS_TEST_HOST not set");
        return None;
    };

    match KvClient::connect(&config).await {
        Ok(client) => Some(client),
        Err(e) => {
            eprintln!("Skipping test: Redis not available: {}", e);
            None
        }
    }
}

fn key(name: &str) -> String {
    format!("service-connectors:test:{}:{}", name, std::process::id())
}

#[tokio::test]
async fn test_scalar_commands() {
    let Some(client) = test_client().await else {
        return;
    };
    let k = key("scalar");

    assert_eq!(client.get(&k).await.unwrap(), None);

    client.set(&k, &[0xde, 0xad]).await.unwrap();
    assert_eq!(client.get(&k).await.unwrap(), Some(vec![0xde, 0xad]));

    client.set_string(&k, "hello").await.unwrap();
    assert_eq!(client.get_string(&k).await.unwrap().as_deref(), Some("hello"));
    assert!(client.exists(&k).await.unwrap());

    let missing = key("scalar-missing");
    let values = client.get_many(&[k.as_str(), missing.as_str()]).await.unwrap();
    assert_eq!(values, vec![Some("hello".to_string()), None]);
    assert!(client.get_many(&[]).await.unwrap().is_empty());

    assert_eq!(client.ttl(&k).await.unwrap(), -1);
    client.expire(&k, 60).await.unwrap();
    assert!(client.ttl(&k).await.unwrap() > 0);

    client.delete(&k).await.unwrap();
    assert!(!client.exists(&k).await.unwrap());
    assert_eq!(client.ttl(&k).await.unwrap(), -2);
}

#[tokio::test]
async fn test_hash_commands() {
    let Some(client) = test_client().await else {
        return;
    };
    let k = key("hash");
    client.delete(&k).await.unwrap();

    assert_eq!(client.hget(&k, "name").await.unwrap(), None);
    client.hset(&k, "name", "reef").await.unwrap();
    assert_eq!(client.hget(&k, "name").await.unwrap().as_deref(), Some("reef"));

    let mut data = HashMap::new();
    data.insert("temp".to_string(), "24.5".to_string());
    data.insert("ph".to_string(), "8.1".to_string());
    client.hcache_all(&k, &data, 120).await.unwrap();
    client.hset_all(&k, &HashMap::new()).await.unwrap();

    let all = client.hget_all(&k).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all.get("temp").map(String::as_str), Some("24.5"));
    assert!(client.ttl(&k).await.unwrap() > 0);

    client.hdel(&k, "name").await.unwrap();
    assert_eq!(client.hget(&k, "name").await.unwrap(), None);
    assert!(client.exists(&k).await.unwrap());

    client.delete(&k).await.unwrap();
}

#[tokio::test]
async fn test_list_commands() {
    let Some(client) = test_client().await else {
        return;
    };
    let k = key("list");
    client.delete(&k).await.unwrap();

    client.rpush(&k, "b").await.unwrap();
    client.rpush(&k, "c").await.unwrap();
    client.lpush(&k, "a").await.unwrap();
    assert_eq!(client.llen(&k).await.unwrap(), 3);
    assert_eq!(client.lrange(&k, 0, -1).await.unwrap(), vec!["a", "b", "c"]);

    assert_eq!(client.lpop(&k).await.unwrap().as_deref(), Some("a"));
    assert_eq!(client.rpop(&k).await.unwrap().as_deref(), Some("c"));
    assert_eq!(client.rpop(&k).await.unwrap().as_deref(), Some("b"));
    assert_eq!(client.lpop(&k).await.unwrap(), None);
}

#[tokio::test]
async fn test_keys_incr_publish() {
    let Some(client) = test_client().await else {
        return;
    };
    let prefix = key("scan");
    for i in 0..25 {
        client.set_string(&format!("{}:{}", prefix, i), "x").await.unwrap();
    }

    let mut keys = client.keys(&format!("{}:*", prefix)).await.unwrap();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 25);
    for k in keys {
        client.delete(&k).await.unwrap();
    }

    let counter = key("counter");
    client.delete(&counter).await.unwrap();
    assert_eq!(client.incr(&counter).await.unwrap(), 1);
    assert_eq!(client.incr(&counter).await.unwrap(), 2);
    client.delete(&counter).await.unwrap();

    assert_eq!(client.publish(&key("channel"), "ping").await.unwrap(), 0);
}

#[tokio::test]
async fn test_single_connection_and_health() {
    let Some(client) = test_client().await else {
        return;
    };
    assert!(client.health_check().await.unwrap());
    assert_eq!(client.service_name(), "redis");

    let config = test_config().unwrap();
    let mut conn = connect_single(&config).await.unwrap();
    let pong: String = redis::cmd("PING").query_async(&mut conn).await.unwrap();
    assert_eq!(pong, "PONG");
}

#[tokio::test]
async fn test_slow_command_hits_response_timeout() {
    let Some(config) = test_config() else {
        eprintln!("Skipping test: REDIS_TEST_HOST not set");
        return;
    };
    let config = RedisConfig {
        response_timeout_seconds: 1,
        ..config
    };
    let Ok(mut conn) = connect_single(&config).await else {
        eprintln!("Skipping test: Redis not available");
        return;
    };

    // BLPOP on an empty list blocks server-side past the 1s deadline
    let started = std::time::Instant::now();
    let result: redis::RedisResult<Option<(String, String)>> = redis::cmd("BLPOP")
        .arg(key("never-pushed"))
        .arg(5)
        .query_async(&mut conn)
        .await;
    assert!(result.is_err());
    assert!(started.elapsed() < std::time::Duration::from_secs(4));

    let client = test_client().await.unwrap();
    assert_eq!(
        client.response_timeout(),
        Some(std::time::Duration::from_secs(2))
    );
}

#[tokio::test]
async fn test_connect_unreachable() {
    let config = RedisConfig {
        host: "127.0.0.1".to_string(),
        port: 1,
        connect_timeout_seconds: 1,
        ..Default::default()
    };

    assert!(KvClient::connect(&config).await.is_err());
    assert!(connect_single(&config).await.is_err());
}
