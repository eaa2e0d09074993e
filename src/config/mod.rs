// Configuration module for service-connectors
//
// Provides:
// - YAML configuration file loading
// - Environment variable substitution
// - Configuration validation
// - Default values

pub mod types;
mod loader;

pub use types::*;
pub use loader::ConfigLoader;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ServicesConfig> {
    ConfigLoader::load(path).context("Failed to load configuration")
}

/// Load configuration with environment variable overrides
pub fn load_config_with_env<P: AsRef<Path>>(path: P) -> Result<ServicesConfig> {
    let mut config = load_config(path)?;
    apply_env_overrides(&mut config);
    ConfigLoader::validate(&config).context("Invalid configuration after env overrides")?;
    Ok(config)
}

/// Override hosts and secrets of already configured sections from the environment.
///
/// Sections absent from the file are not created.
pub fn apply_env_overrides(config: &mut ServicesConfig) {
    if let Ok(host) = std::env::var("INFLUX_HOST") {
        if let Some(influx) = config.influx.as_mut() {
            influx.host = host;
        }
    }

    if let Ok(host) = std::env::var("MONGO_HOST") {
        if let Some(mongo) = config.mongodb.as_mut() {
            mongo.host = host;
        }
    }

    if let Ok(host) = std::env::var("RABBITMQ_HOST") {
        if let Some(amqp) = config.rabbitmq.as_mut() {
            amqp.host = host;
        }
    }

    if let Ok(host) = std::env::var("REDIS_HOST") {
        if let Some(redis) = config.redis.as_mut() {
            redis.host = host;
        }
    }

    if let Ok(password) = std::env::var("REDIS_PASSWORD") {
        if let Some(redis) = config.redis.as_mut() {
            redis.password = Some(password);
        }
    }

    if let Ok(region) = std::env::var("S3_REGION") {
        if let Some(s3) = config.s3.as_mut() {
            s3.region = region;
        }
    }
}
