// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Configuration types for service-connectors

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure
///
/// Every service section is optional; only configured services are
/// connected by the factory.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServicesConfig {
    #[serde(default)]
    pub influx: Option<InfluxConfig>,
    #[serde(default)]
    pub mongodb: Option<MongoConfig>,
    #[serde(default)]
    pub http: Option<HttpConfig>,
    #[serde(default)]
    pub rabbitmq: Option<AmqpConfig>,
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    #[serde(default)]
    pub s3: Option<S3Config>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// InfluxDB 1.x connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InfluxConfig {
    #[serde(default = "default_influx_transport")]
    pub transport: String, // "http" or "udp"
    pub host: String,
    #[serde(default = "default_influx_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// When set, the health probe also checks this database is queryable
    #[serde(default)]
    pub database: Option<String>,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            transport: default_influx_transport(),
            host: "localhost".to_string(),
            port: default_influx_port(),
            username: None,
            password: None,
            database: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MongoConfig {
    pub host: String,
    #[serde(default = "default_mongo_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Database to authenticate against
    pub database: String,
    /// Non-positive values fall back to 5 seconds
    #[serde(default = "default_mongo_timeout")]
    pub timeout_seconds: i64,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: default_mongo_port(),
            username: None,
            password: None,
            database: "admin".to_string(),
            timeout_seconds: default_mongo_timeout(),
        }
    }
}

impl MongoConfig {
    pub fn timeout(&self) -> Duration {
        if self.timeout_seconds <= 0 {
            Duration::from_secs(default_mongo_timeout() as u64)
        } else {
            Duration::from_secs(self.timeout_seconds as u64)
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u64,
    /// URL probed by the health check (any status <= 210 is healthy)
    #[serde(default)]
    pub health_url: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_http_timeout(),
            health_url: None,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AmqpConfig {
    pub host: String,
    #[serde(default = "default_amqp_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    #[serde(default = "default_vhost")]
    pub vhost: String,
    pub queue: String,
    pub exchange: String,
    pub routing_key: String,
    /// Reject queue wiring; absent means no dead-lettering
    #[serde(default)]
    pub dead_letter: Option<DeadLetterConfig>,
    #[serde(default)]
    pub prefetch_count: Option<u16>,
}

impl Default for AmqpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: default_amqp_port(),
            username: "guest".to_string(),
            password: "guest".to_string(),
            vhost: default_vhost(),
            queue: "events".to_string(),
            exchange: "events".to_string(),
            routing_key: "events".to_string(),
            dead_letter: None,
            prefetch_count: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeadLetterConfig {
    pub queue: String,
    pub exchange: String,
    pub routing_key: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    pub host: String,
    #[serde(default = "default_redis_port")]
    pub port: u16,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub database: i64,
    #[serde(default = "default_redis_connect_timeout")]
    pub connect_timeout_seconds: u64,
    /// Read/write deadline for each command; 0 disables it
    #[serde(default = "default_redis_response_timeout")]
    pub response_timeout_seconds: u64,
    #[serde(default)]
    pub pool: PoolConfig,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: default_redis_port(),
            password: None,
            database: 0,
            connect_timeout_seconds: default_redis_connect_timeout(),
            response_timeout_seconds: default_redis_response_timeout(),
            pool: PoolConfig::default(),
        }
    }
}

impl RedisConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn response_timeout(&self) -> Option<Duration> {
        match self.response_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    #[serde(default = "default_pool_size")]
    pub max_size: u32,

    /// Idle connections the pool keeps open; unset lets the pool shrink to zero
    #[serde(default)]
    pub min_idle: Option<u32>,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,

    /// Whether to PING connections on checkout
    #[serde(default = "default_true")]
    pub test_on_checkout: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: default_pool_size(),
            min_idle: None,
            idle_timeout_seconds: default_idle_timeout(),
            test_on_checkout: true,
        }
    }
}

impl PoolConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct S3Config {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub bucket: String,
    /// Custom endpoint (MinIO, LocalStack); unset uses AWS
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub force_path_style: bool,
    /// Target of `S3Client::download_to_default_dir`
    #[serde(default = "default_download_dir")]
    pub download_dir: String,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            access_key_id: String::new(),
            secret_access_key: String::new(),
            region: "us-east-1".to_string(),
            bucket: String::new(),
            endpoint_url: None,
            force_path_style: false,
            download_dir: default_download_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"

    #[serde(default = "default_log_format")]
    pub format: String, // "text", "json"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_influx_transport() -> String { "http".to_string() }
fn default_influx_port() -> u16 { 8086 }
fn default_mongo_port() -> u16 { 27017 }
fn default_mongo_timeout() -> i64 { 5 }
fn default_http_timeout() -> u64 { 5 }
fn default_amqp_port() -> u16 { 5672 }
fn default_vhost() -> String { "/".to_string() }
fn default_redis_port() -> u16 { 6379 }
fn default_redis_connect_timeout() -> u64 { 20 }
fn default_redis_response_timeout() -> u64 { 2 }
fn default_pool_size() -> u32 { 5 }
fn default_idle_timeout() -> u64 { 240 }
fn default_true() -> bool { true }
fn default_download_dir() -> String { "images".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "text".to_string() }
