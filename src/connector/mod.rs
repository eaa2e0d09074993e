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

// Connector module
//
// Every service client implements `Connector` so the binary can probe
// whatever the configuration names without knowing the concrete types.

pub mod factory;

pub use factory::ConnectorFactory;

use anyhow::Result;
use async_trait::async_trait;

/// A connected service client that can report its health
#[async_trait]
pub trait Connector: Send + Sync {
    /// Probe the remote service
    ///
    /// `Ok(false)` means the service answered badly or not at all;
    /// `Err` is reserved for probes that could not be attempted.
    async fn health_check(&self) -> Result<bool>;

    /// Config section name of the service ("redis", "mongodb", ...)
    fn service_name(&self) -> &str;
}
