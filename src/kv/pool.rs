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

// Redis connection setup: single connections and bb8 pools

use crate::config::RedisConfig;
use crate::error::{Error, Result, ResultExt};
use bb8::Pool;
use bb8_redis::RedisConnectionManager;
use redis::aio::MultiplexedConnection;
use tracing::{debug, info};

/// Build the `redis://` URL for a configuration, with password and database.
pub fn connection_url(config: &RedisConfig) -> String {
    let auth = match config.password.as_deref() {
        Some(password) if !password.is_empty() => {
            format!(":{}@", urlencoding::encode(password))
        }
        _ => String::new(),
    };

    format!(
        "redis://{}{}:{}/{}",
        auth, config.host, config.port, config.database
    )
}

/// Open one multiplexed connection.
///
/// Setup is bounded by the connect timeout and every later command by the
/// response timeout.
pub async fn connect_single(config: &RedisConfig) -> Result<MultiplexedConnection> {
    let client = redis::Client::open(connection_url(config))
        .context("Can not initialize redis client")?;

    debug!(
        "Connecting to redis at {}:{} (db {})",
        config.host, config.port, config.database
    );

    let connection = match config.response_timeout() {
        Some(response_timeout) => {
            client
                .get_multiplexed_async_connection_with_timeouts(
                    response_timeout,
                    config.connect_timeout(),
                )
                .await
        }
        None => {
            match tokio::time::timeout(
                config.connect_timeout(),
                client.get_multiplexed_async_connection(),
            )
            .await
            {
                Ok(connection) => connection,
                Err(_) => return Err(connect_timed_out(config)),
            }
        }
    };

    match connection {
        Err(e) if e.is_timeout() => Err(connect_timed_out(config)),
        connection => connection.context("Can not initialize redis client"),
    }
}

fn connect_timed_out(config: &RedisConfig) -> Error {
    Error::Timeout(format!("redis connect to {}:{}", config.host, config.port))
}

/// Build a bb8 pool sized and tuned from the configuration.
///
/// The pool is created lazily; callers verify reachability with `PING`.
pub async fn build_pool(config: &RedisConfig) -> Result<Pool<RedisConnectionManager>> {
    let manager = RedisConnectionManager::new(connection_url(config))
        .context("Can not initialize redis client")?;

    let pool = Pool::builder()
        .max_size(config.pool.max_size)
        .min_idle(config.pool.min_idle)
        .idle_timeout(Some(config.pool.idle_timeout()))
        .connection_timeout(config.connect_timeout())
        .test_on_check_out(config.pool.test_on_checkout)
        .build(manager)
        .await
        .context("Can not initialize redis pool")?;

    info!(
        "Redis pool ready for {}:{} (max {} connections)",
        config.host, config.port, config.pool.max_size
    );

    Ok(pool)
}
