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

// Key/value store module
//
// Thin wrappers over Redis commands. Each call checks a connection out of
// the pool, issues one command (or a fixed pair of commands) and returns
// the reply as Redis produced it.

mod commands;
pub mod pool;

pub use pool::{build_pool, connect_single, connection_url};

use crate::config::RedisConfig;
use crate::connector::Connector;
use crate::error::{Error, Result};
use async_trait::async_trait;
use bb8::{Pool, PooledConnection, RunError};
use bb8_redis::RedisConnectionManager;
use std::time::Duration;
use tracing::warn;

/// Pooled Redis client
#[derive(Clone)]
pub struct KvClient {
    pool: Pool<RedisConnectionManager>,
    response_timeout: Option<Duration>,
}

impl KvClient {
    /// Build the pool and verify the server answers `PING`.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = Self {
            pool: build_pool(config).await?,
            response_timeout: config.response_timeout(),
        };
        client.ping().await?;
        Ok(client)
    }

    /// Wrap an existing pool; commands have no response deadline.
    pub fn from_pool(pool: Pool<RedisConnectionManager>) -> Self {
        Self {
            pool,
            response_timeout: None,
        }
    }

    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout
    }

    pub fn pool(&self) -> &Pool<RedisConnectionManager> {
        &self.pool
    }

    async fn conn(&self) -> Result<PooledConnection<'_, RedisConnectionManager>> {
        let mut conn = self.pool.get().await.map_err(|e| match e {
            RunError::User(source) => Error::Redis {
                context: "cannot get connection from pool".to_string(),
                source,
            },
            RunError::TimedOut => Error::Timeout("redis pool checkout".to_string()),
        })?;
        // Pooled connections are opened by bb8-redis without a deadline.
        if let Some(timeout) = self.response_timeout {
            conn.set_response_timeout(timeout);
        }
        Ok(conn)
    }
}

#[async_trait]
impl Connector for KvClient {
    async fn health_check(&self) -> anyhow::Result<bool> {
        match self.ping().await {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!("Redis health check failed: {}", e);
                Ok(false)
            }
        }
    }

    fn service_name(&self) -> &str {
        "redis"
    }
}
