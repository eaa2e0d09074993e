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

// Time-series module (InfluxDB 1.x)
//
// InfluxQL commands go over HTTP through the influxdb crate. Points are
// encoded by the crate's WriteQuery and sent either over HTTP or as a single
// UDP datagram.

use crate::config::InfluxConfig;
use crate::connector::Connector;
use crate::error::{Error, Result, ResultExt};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use influxdb::{Query, ReadQuery, Timestamp, WriteQuery};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

/// InfluxDB client over HTTP or UDP
pub struct InfluxClient {
    transport: Transport,
    probe_database: Option<String>,
}

enum Transport {
    Http {
        url: String,
        credentials: Option<(String, String)>,
    },
    Udp {
        socket: UdpSocket,
        addr: String,
    },
}

/// One statement's result in an InfluxQL response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub statement_id: u32,
    #[serde(default)]
    pub series: Vec<Series>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
    #[serde(default)]
    pub partial: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub level: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<QueryResult>,
    #[serde(default)]
    error: Option<String>,
}

impl InfluxClient {
    /// HTTP client for `http://host:port`; empty username means no auth.
    pub fn http(host: &str, port: u16, username: &str, password: &str) -> Self {
        let credentials = if username.is_empty() {
            None
        } else {
            Some((username.to_string(), password.to_string()))
        };

        Self {
            transport: Transport::Http {
                url: format!("http://{}:{}", host, port),
                credentials,
            },
            probe_database: None,
        }
    }

    /// UDP client sending line protocol datagrams to `host:port`.
    pub async fn udp(host: &str, port: u16) -> Result<Self> {
        let addr = format!("{}:{}", host, port);
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .context("cannot bind udp socket")?;
        socket
            .connect(&addr)
            .await
            .with_context(|| format!("cannot connect udp socket to {}", addr))?;

        Ok(Self {
            transport: Transport::Udp { socket, addr },
            probe_database: None,
        })
    }

    pub async fn from_config(config: &InfluxConfig) -> Result<Self> {
        let client = match config.transport.as_str() {
            "udp" => Self::udp(&config.host, config.port).await?,
            "http" => Self::http(
                &config.host,
                config.port,
                config.username.as_deref().unwrap_or_default(),
                config.password.as_deref().unwrap_or_default(),
            ),
            other => {
                return Err(Error::Config(format!(
                    "unknown influx transport '{}'",
                    other
                )))
            }
        };
        info!(
            "InfluxDB client ready for {}:{} over {}",
            config.host, config.port, config.transport
        );

        let database = config.database.as_deref().filter(|db| !db.is_empty());
        Ok(match database {
            Some(db) => client.with_probe_database(db),
            None => client,
        })
    }

    /// Have the HTTP health check also query `db`, so a missing database
    /// or bad credentials report unhealthy.
    pub fn with_probe_database(mut self, db: &str) -> Self {
        self.probe_database = Some(db.to_string());
        self
    }

    pub fn is_udp(&self) -> bool {
        matches!(self.transport, Transport::Udp { .. })
    }

    fn http_client(&self, db: &str) -> Result<influxdb::Client> {
        match &self.transport {
            Transport::Http { url, credentials } => {
                let client = influxdb::Client::new(url.as_str(), db);
                Ok(match credentials {
                    Some((username, password)) => client.with_auth(username, password),
                    None => client,
                })
            }
            Transport::Udp { .. } => Err(Error::Unsupported(
                "Querying via UDP is not supported".to_string(),
            )),
        }
    }

    /// Run an InfluxQL command against `db`.
    ///
    /// The first statement error in the response is returned as an error.
    pub async fn query(&self, db: &str, command: &str) -> Result<Vec<QueryResult>> {
        let client = self.http_client(db)?;
        debug!("influx query on {}: {}", db, command);

        let body = client
            .query(ReadQuery::new(command))
            .await
            .with_context(|| format!("error running query on {}", db))?;

        parse_query_response(&body)
    }

    pub async fn create_database(&self, db: &str) -> Result<()> {
        self.query(db, &format!("CREATE DATABASE {}", db)).await?;
        Ok(())
    }

    /// Forwards `USE <db>`; servers that only accept it from the CLI reject it.
    pub async fn use_database(&self, db: &str) -> Result<()> {
        self.query(db, &format!("USE {}", db)).await?;
        Ok(())
    }

    pub async fn create_user(&self, username: &str, password: &str, db: &str) -> Result<()> {
        self.query(db, &create_user_query(username, password)).await?;
        Ok(())
    }

    /// Create the user, then grant it all privileges.
    pub async fn create_super_user(&self, username: &str, password: &str, db: &str) -> Result<()> {
        self.create_user(username, password, db).await?;
        self.query(db, &format!("GRANT ALL PRIVILEGES TO {}", username))
            .await?;
        Ok(())
    }

    pub async fn count_fields(
        &self,
        db: &str,
        field: &str,
        measurement: &str,
    ) -> Result<Vec<QueryResult>> {
        self.query(db, &format!("SELECT COUNT({}) FROM {}", field, measurement))
            .await
    }

    /// Every point of `measurement` in the default retention policy of `db`.
    pub async fn get_by_field(&self, db: &str, measurement: &str) -> Result<Vec<QueryResult>> {
        self.query(db, &format!("SELECT * FROM \"{}\"..\"{}\"", db, measurement))
            .await
    }

    pub async fn delete_all(&self, db: &str, measurement: &str) -> Result<()> {
        self.query(db, &format!("DELETE FROM \"{}\"", measurement))
            .await?;
        Ok(())
    }

    /// Write one point tagged `tag_key=tag_value`, stamped now.
    pub async fn insert_batch(
        &self,
        db: &str,
        measurement: &str,
        tag_key: &str,
        tag_value: &str,
        fields: &HashMap<String, Value>,
    ) -> Result<()> {
        self.insert_batch_with_time(db, measurement, tag_key, tag_value, fields, Utc::now())
            .await
    }

    /// Write one point tagged `tag_key=tag_value` at `timestamp` (microsecond precision).
    pub async fn insert_batch_with_time(
        &self,
        db: &str,
        measurement: &str,
        tag_key: &str,
        tag_value: &str,
        fields: &HashMap<String, Value>,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        let point = build_point(measurement, tag_key, tag_value, fields, timestamp)?;
        self.write(db, point).await
    }

    /// Write a single-field point; `value` is typed the way line protocol reads it.
    pub async fn insert(&self, db: &str, measurement: &str, key: &str, value: &str) -> Result<()> {
        let mut fields = HashMap::new();
        fields.insert(key.to_string(), parse_field_value(value));

        let point = apply_fields(
            WriteQuery::new(timestamp_micros(Utc::now()), measurement),
            &fields,
        )?;
        self.write(db, point).await
    }

    async fn write(&self, db: &str, point: WriteQuery) -> Result<()> {
        match &self.transport {
            Transport::Http { .. } => {
                self.http_client(db)?
                    .query(point)
                    .await
                    .with_context(|| format!("error writing point to {}", db))?;
            }
            Transport::Udp { socket, addr } => {
                let line = point
                    .build()
                    .with_context(|| format!("error encoding point for {}", addr))?
                    .get();
                socket
                    .send(line.as_bytes())
                    .await
                    .with_context(|| format!("error sending point to {}", addr))?;
            }
        }
        Ok(())
    }

    /// Release the transport.
    pub fn close(self) {
        drop(self);
    }
}

#[async_trait]
impl Connector for InfluxClient {
    async fn health_check(&self) -> anyhow::Result<bool> {
        match &self.transport {
            Transport::Http { .. } => {
                let db = self.probe_database.as_deref().unwrap_or_default();
                match self.http_client(db)?.ping().await {
                    Ok((build, version)) => debug!("InfluxDB {} {} is up", build, version),
                    Err(e) => {
                        warn!("InfluxDB health check failed: {}", e);
                        return Ok(false);
                    }
                }

                if db.is_empty() {
                    return Ok(true);
                }
                match self.query(db, "SHOW MEASUREMENTS LIMIT 1").await {
                    Ok(_) => Ok(true),
                    Err(e) => {
                        warn!("InfluxDB health check of database {} failed: {}", db, e);
                        Ok(false)
                    }
                }
            }
            // Datagrams are fire-and-forget; a bound socket is all there is to check.
            Transport::Udp { socket, .. } => Ok(socket.peer_addr().is_ok()),
        }
    }

    fn service_name(&self) -> &str {
        "influx"
    }
}

/// `CREATE USER` statement with the password quoted as an InfluxQL string.
pub fn create_user_query(username: &str, password: &str) -> String {
    format!(
        "CREATE USER {} WITH PASSWORD '{}'",
        username,
        password.replace('\\', "\\\\").replace('\'', "\\'")
    )
}

/// Parse an InfluxQL JSON response, surfacing the first error it carries.
pub fn parse_query_response(body: &str) -> Result<Vec<QueryResult>> {
    let response: QueryResponse =
        serde_json::from_str(body).context("error decoding influx response")?;

    let error = response
        .error
        .or_else(|| response.results.iter().find_map(|r| r.error.clone()));
    if let Some(error) = error {
        return Err(Error::Influx {
            context: "influx query returned an error".to_string(),
            source: influxdb::Error::DatabaseError { error },
        });
    }

    Ok(response.results)
}

/// Build the point written by `insert_batch_with_time`.
pub fn build_point(
    measurement: &str,
    tag_key: &str,
    tag_value: &str,
    fields: &HashMap<String, Value>,
    timestamp: DateTime<Utc>,
) -> Result<WriteQuery> {
    let query = WriteQuery::new(timestamp_micros(timestamp), measurement).add_tag(tag_key, tag_value);
    apply_fields(query, fields)
}

fn timestamp_micros(timestamp: DateTime<Utc>) -> Timestamp {
    Timestamp::Microseconds(timestamp.timestamp_micros().max(0) as u128)
}

fn apply_fields(mut query: WriteQuery, fields: &HashMap<String, Value>) -> Result<WriteQuery> {
    if fields.is_empty() {
        return Err(Error::InvalidField {
            field: String::new(),
            reason: "a point needs at least one field".to_string(),
        });
    }

    let mut keys: Vec<&String> = fields.keys().collect();
    keys.sort();

    for key in keys {
        query = match &fields[key] {
            Value::Bool(b) => query.add_field(key.as_str(), *b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    query.add_field(key.as_str(), i)
                } else if let Some(u) = n.as_u64() {
                    query.add_field(key.as_str(), u)
                } else {
                    query.add_field(key.as_str(), n.as_f64().unwrap_or_default())
                }
            }
            Value::String(s) => query.add_field(key.as_str(), s.clone()),
            other => {
                return Err(Error::InvalidField {
                    field: key.clone(),
                    reason: format!("unsupported value {}", other),
                })
            }
        };
    }

    Ok(query)
}

/// Read a field value the way line protocol does: `12i` is an integer, bare
/// numbers are floats, `t`/`true`/`F`/... are booleans, anything else is text.
pub fn parse_field_value(raw: &str) -> Value {
    if let Some(int) = raw.strip_suffix('i').and_then(|s| s.parse::<i64>().ok()) {
        return Value::from(int);
    }
    if let Ok(float) = raw.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(float) {
            return Value::Number(n);
        }
    }
    match raw {
        "t" | "T" | "true" | "True" | "TRUE" => return Value::Bool(true),
        "f" | "F" | "false" | "False" | "FALSE" => return Value::Bool(false),
        _ => {}
    }
    let text = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw);
    Value::String(text.to_string())
}
