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

use anyhow::{bail, Result};
use clap::Parser;
use service_connectors::config::{load_config_with_env, LoggingConfig};
use service_connectors::connector::ConnectorFactory;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Service connectors - probe the services named in a configuration file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.yaml")]
    config: PathBuf,

    /// Probe only this service (influx, mongodb, http, rabbitmq, redis, s3)
    #[arg(long)]
    only: Option<String>,
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let log_level = match logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder().with_max_level(log_level);
    if logging.format == "json" {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

async fn run(args: Args) -> Result<bool> {
    let config = load_config_with_env(&args.config)?;
    init_tracing(&config.logging)?;

    info!("Loaded configuration from: {:?}", args.config);

    let services = match args.only.as_deref() {
        Some(service) => {
            let configured = ConnectorFactory::configured_services(&config);
            if !configured.iter().any(|name| *name == service) {
                bail!("Service '{}' is not configured in {:?}", service, args.config);
            }
            vec![service]
        }
        None => ConnectorFactory::configured_services(&config),
    };

    if services.is_empty() {
        bail!("No services configured in {:?}", args.config);
    }

    let mut all_healthy = true;
    for service in services {
        let healthy = match ConnectorFactory::create(&config, service).await {
            Ok(connector) => match connector.health_check().await {
                Ok(healthy) => healthy,
                Err(e) => {
                    error!("{} health check error: {:#}", service, e);
                    false
                }
            },
            Err(e) => {
                error!("{} connection failed: {:#}", service, e);
                false
            }
        };

        println!("{:<10} {}", service, if healthy { "ok" } else { "unhealthy" });
        all_healthy &= healthy;
    }

    Ok(all_healthy)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
