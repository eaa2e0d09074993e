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

// Service connectors
//
// Thin async adapters over existing client libraries:
// - InfluxDB 1.x over HTTP or UDP
// - MongoDB documents with paging, sorting and aggregation passthrough
// - Outbound HTTP JSON/multipart calls and inbound client info
// - RabbitMQ topology with dead-lettering, publish and consume
// - Pooled Redis commands
// - S3 object upload and download
//
// Each adapter forwards its arguments to the wrapped library and returns that
// library's result, or its error wrapped with a short context string.

pub mod amqp;
pub mod config;
pub mod connector;
pub mod error;
pub mod influx;
pub mod kv;
pub mod mongo;
pub mod s3;
pub mod web;

// Re-export main types
pub use amqp::{AmqpClient, Publisher};
pub use config::{load_config, load_config_with_env, ServicesConfig};
pub use connector::{Connector, ConnectorFactory};
pub use error::{Error, Result, ResultExt};
pub use influx::{InfluxClient, QueryResult, Series};
pub use kv::KvClient;
pub use mongo::MongoClient;
pub use s3::{ObjectData, S3Client};
pub use web::{ClientInfo, HttpClient};
