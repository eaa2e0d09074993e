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

// Connector factory for building service clients from configuration

use super::Connector;
use crate::amqp::AmqpClient;
use crate::config::ServicesConfig;
use crate::influx::InfluxClient;
use crate::kv::KvClient;
use crate::mongo::MongoClient;
use crate::s3::S3Client;
use crate::web::HttpClient;
use anyhow::{anyhow, bail, Context, Result};
use std::sync::Arc;

/// Service names in the order they are probed
pub const SERVICES: [&str; 6] = ["influx", "mongodb", "http", "rabbitmq", "redis", "s3"];

pub struct ConnectorFactory;

impl ConnectorFactory {
    /// Names of the sections present in the configuration
    pub fn configured_services(config: &ServicesConfig) -> Vec<&'static str> {
        SERVICES
            .iter()
            .copied()
            .filter(|service| match *service {
                "influx" => config.influx.is_some(),
                "mongodb" => config.mongodb.is_some(),
                "http" => config.http.is_some(),
                "rabbitmq" => config.rabbitmq.is_some(),
                "redis" => config.redis.is_some(),
                "s3" => config.s3.is_some(),
                _ => false,
            })
            .collect()
    }

    /// Connect one service from its configuration section
    pub async fn create(config: &ServicesConfig, service: &str) -> Result<Arc<dyn Connector>> {
        let missing = || anyhow!("'{}' is not configured", service);

        match service {
            "influx" => {
                let section = config.influx.as_ref().ok_or_else(missing)?;
                let client = InfluxClient::from_config(section).await?;
                Ok(Arc::new(client))
            }

            "mongodb" => {
                let section = config.mongodb.as_ref().ok_or_else(missing)?;
                let client = MongoClient::connect(section)
                    .await
                    .context("Failed to connect to MongoDB")?;
                Ok(Arc::new(client))
            }

            "http" => {
                let section = config.http.as_ref().ok_or_else(missing)?;
                Ok(Arc::new(HttpClient::new(section)?))
            }

            "rabbitmq" => {
                let section = config.rabbitmq.as_ref().ok_or_else(missing)?;
                let client = AmqpClient::connect(section)
                    .await
                    .context("Failed to connect to RabbitMQ")?;
                Ok(Arc::new(client))
            }

            "redis" => {
                let section = config.redis.as_ref().ok_or_else(missing)?;
                let client = KvClient::connect(section)
                    .await
                    .context("Failed to connect to Redis")?;
                Ok(Arc::new(client))
            }

            "s3" => {
                let section = config.s3.as_ref().ok_or_else(missing)?;
                Ok(Arc::new(S3Client::from_config(section)?))
            }

            unknown => bail!(
                "Unknown service: '{}'. Supported: {}",
                unknown,
                SERVICES.join(", ")
            ),
        }
    }

    /// Connect every configured service, failing on the first error
    pub async fn create_all(config: &ServicesConfig) -> Result<Vec<Arc<dyn Connector>>> {
        let mut connectors = Vec::new();
        for service in Self::configured_services(config) {
            connectors.push(Self::create(config, service).await?);
        }
        Ok(connectors)
    }
}
