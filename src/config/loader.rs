// Configuration loader with environment variable substitution

use super::types::*;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file with environment variable substitution
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ServicesConfig> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file {}", path.as_ref().display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a YAML string
    pub fn parse(content: &str) -> Result<ServicesConfig> {
        let content = Self::substitute_env_vars(content)?;

        let config: ServicesConfig = serde_yaml::from_str(&content)
            .context("Failed to parse YAML configuration")?;

        Self::validate(&config)?;

        Ok(config)
    }

    /// Substitute ${VAR} and ${VAR:-default} patterns with environment variables
    ///
    /// Examples:
    /// - ${HOME} -> /home/user
    /// - ${REDIS_HOST:-localhost} -> localhost (if REDIS_HOST not set)
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}")
            .context("Invalid substitution pattern")?;

        let substituted = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str());

            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => match default_value {
                    Some(default) => default.to_string(),
                    // Keep original if no default and var not found
                    None => format!("${{{}}}", var_name),
                },
            }
        });

        Ok(substituted.into_owned())
    }

    /// Validate configuration
    pub fn validate(config: &ServicesConfig) -> Result<()> {
        if let Some(influx) = &config.influx {
            match influx.transport.as_str() {
                "http" | "udp" => {}
                unknown => bail!(
                    "influx.transport must be 'http' or 'udp', got '{}'",
                    unknown
                ),
            }
            Self::require_host("influx.host", &influx.host, influx.port)?;
        }

        if let Some(mongo) = &config.mongodb {
            Self::require_host("mongodb.host", &mongo.host, mongo.port)?;
            if mongo.database.is_empty() {
                bail!("mongodb.database cannot be empty");
            }
        }

        if let Some(http) = &config.http {
            if http.timeout_seconds == 0 {
                bail!("http.timeout_seconds must be > 0");
            }
        }

        if let Some(amqp) = &config.rabbitmq {
            Self::require_host("rabbitmq.host", &amqp.host, amqp.port)?;
            if amqp.queue.is_empty() {
                bail!("rabbitmq.queue cannot be empty");
            }
            if amqp.exchange.is_empty() {
                bail!("rabbitmq.exchange cannot be empty");
            }
            if let Some(dead_letter) = &amqp.dead_letter {
                if dead_letter.queue.is_empty()
                    || dead_letter.exchange.is_empty()
                    || dead_letter.routing_key.is_empty()
                {
                    bail!("rabbitmq.dead_letter requires queue, exchange and routing_key");
                }
            }
        }

        if let Some(redis) = &config.redis {
            Self::require_host("redis.host", &redis.host, redis.port)?;
            if redis.pool.max_size == 0 {
                bail!("redis.pool.max_size must be > 0");
            }
            if redis.pool.min_idle.unwrap_or(0) > redis.pool.max_size {
                bail!("redis.pool.min_idle cannot exceed redis.pool.max_size");
            }
        }

        if let Some(s3) = &config.s3 {
            if s3.region.is_empty() {
                bail!("s3.region cannot be empty");
            }
            if s3.bucket.is_empty() {
                bail!("s3.bucket cannot be empty");
            }
        }

        match config.logging.format.as_str() {
            "text" | "json" => {}
            unknown => bail!("logging.format must be 'text' or 'json', got '{}'", unknown),
        }

        Ok(())
    }

    fn require_host(key: &str, host: &str, port: u16) -> Result<()> {
        if host.is_empty() {
            bail!("{} cannot be empty", key);
        }
        if port == 0 {
            bail!("{} port must be > 0", key);
        }
        Ok(())
    }
}
