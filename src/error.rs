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

// Crate-wide error type
//
// Every adapter hands back the wrapped library's error untouched, with a
// short context string describing the call that failed.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{context}: {source}")]
    Influx {
        context: String,
        #[source]
        source: influxdb::Error,
    },

    #[error("{context}: {source}")]
    Mongo {
        context: String,
        #[source]
        source: mongodb::error::Error,
    },

    #[error("{context}: {source}")]
    Http {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{context}: {source}")]
    Amqp {
        context: String,
        #[source]
        source: lapin::Error,
    },

    #[error("{context}: {source}")]
    Redis {
        context: String,
        #[source]
        source: redis::RedisError,
    },

    #[error("{context}: {source}")]
    S3 {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{context}: {source}")]
    Bson {
        context: String,
        #[source]
        source: mongodb::bson::ser::Error,
    },

    /// Remote answered with a status code above the accepted range.
    /// `body` is the response text as returned.
    #[error("{body}")]
    Status { code: u16, body: String },

    #[error("not found")]
    NotFound,

    #[error("Document does exist")]
    DocumentExists,

    #[error("Bad credentials: {0}")]
    InvalidCredentials(String),

    #[error("{0}")]
    Unsupported(String),

    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0} timed out")]
    Timeout(String),
}

impl Error {
    /// HTTP status carried by the error, if the remote produced one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Status { code, .. } => Some(*code),
            Error::Http { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Attach a context string to a library error, mapping it into [`Error`].
///
/// Mirrors `anyhow::Context` for the typed error used by library code.
pub trait ResultExt<T> {
    fn context<C: Into<String>>(self, context: C) -> Result<T>;

    fn with_context<C: Into<String>, F: FnOnce() -> C>(self, f: F) -> Result<T>;
}

macro_rules! impl_result_ext {
    ($source:ty, $variant:ident) => {
        impl<T> ResultExt<T> for std::result::Result<T, $source> {
            fn context<C: Into<String>>(self, context: C) -> Result<T> {
                self.map_err(|source| Error::$variant {
                    context: context.into(),
                    source,
                })
            }

            fn with_context<C: Into<String>, F: FnOnce() -> C>(self, f: F) -> Result<T> {
                self.map_err(|source| Error::$variant {
                    context: f().into(),
                    source,
                })
            }
        }
    };
}

impl_result_ext!(influxdb::Error, Influx);
impl_result_ext!(mongodb::error::Error, Mongo);
impl_result_ext!(reqwest::Error, Http);
impl_result_ext!(lapin::Error, Amqp);
impl_result_ext!(redis::RedisError, Redis);
impl_result_ext!(std::io::Error, Io);
impl_result_ext!(serde_json::Error, Json);
impl_result_ext!(mongodb::bson::ser::Error, Bson);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_displays_body() {
        let err = Error::Status {
            code: 404,
            body: "no such route".to_string(),
        };
        assert_eq!(err.to_string(), "no such route");
        assert_eq!(err.status_code(), Some(404));
    }

    #[test]
    fn test_context_prefixes_source() {
        let io: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        let err = io.context("error opening images/a.png").unwrap_err();
        assert_eq!(err.to_string(), "error opening images/a.png: missing");
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn test_fixed_messages() {
        assert_eq!(Error::DocumentExists.to_string(), "Document does exist");
        assert_eq!(
            Error::InvalidCredentials("empty access key".into()).to_string(),
            "Bad credentials: empty access key"
        );
    }
}
