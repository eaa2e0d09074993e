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

// Scalar, hash and list command wrappers

use super::KvClient;
use crate::error::{Result, ResultExt};
use std::collections::HashMap;
use tracing::debug;

impl KvClient {
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .context("cannot ping db")?;
        Ok(())
    }

    /// `GET` returning raw bytes; `None` when the key does not exist.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn().await?;
        redis::cmd("GET")
            .arg(key)
            .query_async(&mut *conn)
            .await
            .with_context(|| format!("error getting key {}", key))
    }

    pub async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async(&mut *conn)
            .await
            .with_context(|| format!("error setting key {} to {:02x?}", key, value))?;
        Ok(())
    }

    pub async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn().await?;
        redis::cmd("GET")
            .arg(key)
            .query_async(&mut *conn)
            .await
            .with_context(|| format!("error getting key {}", key))
    }

    pub async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async(&mut *conn)
            .await
            .with_context(|| format!("error setting key {} to {}", key, value))?;
        Ok(())
    }

    /// `MGET`; missing keys come back as `None` in their position.
    pub async fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn().await?;
        redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut *conn)
            .await
            .with_context(|| format!("error getting keys {}", keys.join(", ")))
    }

    pub async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut conn = self.conn().await?;
        redis::cmd("HGET")
            .arg(key)
            .arg(field)
            .query_async(&mut *conn)
            .await
            .with_context(|| format!("error getting key {}", key))
    }

    pub async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: () = redis::cmd("HSET")
            .arg(key)
            .arg(field)
            .arg(value)
            .query_async(&mut *conn)
            .await
            .with_context(|| {
                format!(
                    "error setting key {} to hash field {} with value {}",
                    key, field, value
                )
            })?;
        Ok(())
    }

    pub async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>> {
        let mut conn = self.conn().await?;
        redis::cmd("HGETALL")
            .arg(key)
            .query_async(&mut *conn)
            .await
            .with_context(|| format!("error getting key {}", key))
    }

    /// Set every field of `data` on the hash in one `HSET`.
    pub async fn hset_all(&self, key: &str, data: &HashMap<String, String>) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        let mut cmd = redis::cmd("HSET");
        cmd.arg(key);
        for (field, value) in data {
            cmd.arg(field).arg(value);
        }

        let mut conn = self.conn().await?;
        let _: () = cmd
            .query_async(&mut *conn)
            .await
            .with_context(|| format!("error setting {} hash fields on key {}", data.len(), key))?;
        Ok(())
    }

    /// `hset_all` followed by `expire`.
    pub async fn hcache_all(
        &self,
        key: &str,
        data: &HashMap<String, String>,
        ttl_seconds: i64,
    ) -> Result<()> {
        self.hset_all(key, data).await?;
        self.expire(key, ttl_seconds).await
    }

    pub async fn hdel(&self, key: &str, field: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: () = redis::cmd("HDEL")
            .arg(key)
            .arg(field)
            .query_async(&mut *conn)
            .await
            .with_context(|| format!("error deleting hash field {} of key {}", field, key))?;
        Ok(())
    }

    pub async fn expire(&self, key: &str, ttl_seconds: i64) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: () = redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl_seconds)
            .query_async(&mut *conn)
            .await
            .with_context(|| format!("error setting expiry of key {}", key))?;
        Ok(())
    }

    /// Remaining time to live; `-1` without expiry, `-2` when missing.
    pub async fn ttl(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn().await?;
        redis::cmd("TTL")
            .arg(key)
            .query_async(&mut *conn)
            .await
            .with_context(|| format!("error getting ttl of key {}", key))
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn().await?;
        redis::cmd("EXISTS")
            .arg(key)
            .query_async(&mut *conn)
            .await
            .with_context(|| format!("error checking if key {} exists", key))
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: () = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut *conn)
            .await
            .with_context(|| format!("error deleting the key {}", key))?;
        Ok(())
    }

    /// All keys matching `pattern`, walking `SCAN` until the cursor returns to 0.
    ///
    /// Keys touched while the scan runs may be reported twice.
    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.conn().await?;
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .query_async(&mut *conn)
                .await
                .with_context(|| format!("error retrieving '{}' keys", pattern))?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!("SCAN {} matched {} keys", pattern, keys.len());
        Ok(keys)
    }

    pub async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn().await?;
        redis::cmd("INCR")
            .arg(key)
            .query_async(&mut *conn)
            .await
            .with_context(|| format!("error increasing the key {}", key))
    }

    /// Returns the number of subscribers that received the message.
    pub async fn publish(&self, channel: &str, message: &str) -> Result<i64> {
        let mut conn = self.conn().await?;
        redis::cmd("PUBLISH")
            .arg(channel)
            .arg(message)
            .query_async(&mut *conn)
            .await
            .with_context(|| format!("error publishing the key {}", channel))
    }

    pub async fn lpush(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: () = redis::cmd("LPUSH")
            .arg(key)
            .arg(value)
            .query_async(&mut *conn)
            .await
            .with_context(|| {
                format!("error setting list {} from left with value {}", key, value)
            })?;
        Ok(())
    }

    pub async fn lpop(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn().await?;
        redis::cmd("LPOP")
            .arg(key)
            .query_async(&mut *conn)
            .await
            .with_context(|| format!("error popping list {} from left", key))
    }

    pub async fn rpush(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: () = redis::cmd("RPUSH")
            .arg(key)
            .arg(value)
            .query_async(&mut *conn)
            .await
            .with_context(|| {
                format!("error setting list {} from right with value {}", key, value)
            })?;
        Ok(())
    }

    pub async fn rpop(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn().await?;
        redis::cmd("RPOP")
            .arg(key)
            .query_async(&mut *conn)
            .await
            .with_context(|| format!("error popping list {} from right", key))
    }

    /// `LRANGE` with inclusive, possibly negative, bounds.
    pub async fn lrange(&self, key: &str, start: isize, end: isize) -> Result<Vec<String>> {
        let mut conn = self.conn().await?;
        redis::cmd("LRANGE")
            .arg(key)
            .arg(start)
            .arg(end)
            .query_async(&mut *conn)
            .await
            .with_context(|| {
                format!("error getting range ({} - {}) of list {}", start, end, key)
            })
    }

    pub async fn llen(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn().await?;
        redis::cmd("LLEN")
            .arg(key)
            .query_async(&mut *conn)
            .await
            .with_context(|| format!("error getting length of list {}", key))
    }
}
