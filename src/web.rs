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

// HTTP utility module
//
// Outbound JSON and multipart helpers over reqwest, plus client address and
// user agent extraction for inbound axum requests. Responses with a status
// above 210 are returned as `Error::Status` carrying the response body.

use crate::config::HttpConfig;
use crate::connector::Connector;
use crate::error::{Error, Result, ResultExt};
use async_trait::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, warn};

/// Highest status code still treated as success
pub const MAX_SUCCESS_STATUS: u16 = 210;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Reusable HTTP client with a fixed request timeout
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    health_url: Option<String>,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut client = Self::with_timeout(config.timeout())?;
        client.health_url = config.health_url.clone();
        Ok(client)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            health_url: None,
        })
    }

    /// GET `url` and return the raw body with the status code.
    pub async fn get_bytes(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        params: &HashMap<String, String>,
    ) -> Result<(Bytes, u16)> {
        let mut request = self.client.get(url).query(params);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        debug!("GET {}", url);
        let response = request
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        let code = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .with_context(|| format!("error reading response body of {}", url))?;

        if code > MAX_SUCCESS_STATUS {
            return Err(Error::Status {
                code,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok((body, code))
    }

    /// GET `url` and decode the body as arbitrary JSON.
    pub async fn get_json(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        params: &HashMap<String, String>,
    ) -> Result<(Value, u16)> {
        let (body, code) = self.get_bytes(url, headers, params).await?;
        let value = serde_json::from_slice(&body)
            .with_context(|| format!("error decoding JSON from {}", url))?;
        Ok((value, code))
    }

    /// POST `request` as JSON and decode the JSON response into `Resp`.
    pub async fn post_json<Req, Resp>(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        params: &HashMap<String, String>,
        request: &Req,
    ) -> Result<(Resp, u16)>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let body = serde_json::to_vec(request).context("error encoding request body")?;

        let mut builder = self
            .client
            .post(url)
            .query(params)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        debug!("POST {}", url);
        let response = builder
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        let code = response.status().as_u16();
        let data = response
            .bytes()
            .await
            .with_context(|| format!("error reading response body of {}", url))?;

        if code > MAX_SUCCESS_STATUS {
            return Err(Error::Status {
                code,
                body: String::from_utf8_lossy(&data).into_owned(),
            });
        }

        let decoded = serde_json::from_slice(&data)
            .with_context(|| format!("error decoding JSON from {}", url))?;
        Ok((decoded, code))
    }

    /// POST a multipart form holding `contents` as file part `param_name`
    /// plus every entry of `params` as a text field.
    ///
    /// The response is decoded as JSON whatever its status.
    pub async fn post_form_data<Resp>(
        &self,
        url: &str,
        params: &HashMap<String, String>,
        headers: &HashMap<String, String>,
        param_name: &str,
        contents: Vec<u8>,
        file_name: &str,
    ) -> Result<(Resp, u16)>
    where
        Resp: DeserializeOwned,
    {
        let mut form = Form::new().part(
            param_name.to_string(),
            Part::bytes(contents).file_name(file_name.to_string()),
        );
        for (key, value) in params {
            form = form.text(key.clone(), value.clone());
        }

        let mut builder = self.client.post(url).multipart(form);
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        debug!("POST multipart {} ({})", url, file_name);
        let response = builder
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        let code = response.status().as_u16();
        let decoded = response
            .json::<Resp>()
            .await
            .with_context(|| format!("error decoding JSON from {}", url))?;
        Ok((decoded, code))
    }
}

#[async_trait]
impl Connector for HttpClient {
    async fn health_check(&self) -> anyhow::Result<bool> {
        let Some(url) = self.health_url.as_deref() else {
            return Ok(true);
        };

        match self.get_bytes(url, &HashMap::new(), &HashMap::new()).await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("HTTP health check of {} failed: {}", url, e);
                Ok(false)
            }
        }
    }

    fn service_name(&self) -> &str {
        "http"
    }
}

/// `HttpClient::get_bytes` with a fresh 5 second client
pub async fn get_bytes(
    url: &str,
    headers: &HashMap<String, String>,
    params: &HashMap<String, String>,
) -> Result<(Bytes, u16)> {
    HttpClient::with_timeout(DEFAULT_TIMEOUT)?
        .get_bytes(url, headers, params)
        .await
}

/// `HttpClient::get_json` with a fresh 5 second client
pub async fn get_json(
    url: &str,
    headers: &HashMap<String, String>,
    params: &HashMap<String, String>,
) -> Result<(Value, u16)> {
    HttpClient::with_timeout(DEFAULT_TIMEOUT)?
        .get_json(url, headers, params)
        .await
}

/// `HttpClient::post_json` with a fresh 5 second client
pub async fn post_json<Req, Resp>(
    url: &str,
    headers: &HashMap<String, String>,
    params: &HashMap<String, String>,
    request: &Req,
) -> Result<(Resp, u16)>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    HttpClient::with_timeout(DEFAULT_TIMEOUT)?
        .post_json(url, headers, params, request)
        .await
}

/// `HttpClient::post_form_data` with a fresh 5 second client
pub async fn post_form_data<Resp>(
    url: &str,
    params: &HashMap<String, String>,
    headers: &HashMap<String, String>,
    param_name: &str,
    contents: Vec<u8>,
    file_name: &str,
) -> Result<(Resp, u16)>
where
    Resp: DeserializeOwned,
{
    HttpClient::with_timeout(DEFAULT_TIMEOUT)?
        .post_form_data(url, params, headers, param_name, contents, file_name)
        .await
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Best guess at the caller's public address
///
/// Checks `True-Client-IP`, `X-Forwarded-For` and `X-Real-Ip` in order and
/// falls back to the peer address. Header values are returned verbatim.
pub fn client_ip(headers: &HeaderMap, remote_addr: Option<SocketAddr>) -> String {
    ["True-Client-IP", "X-Forwarded-For", "X-Real-Ip"]
        .iter()
        .find_map(|name| header_value(headers, name))
        .map(str::to_string)
        .or_else(|| remote_addr.map(|addr| addr.ip().to_string()))
        .unwrap_or_default()
}

pub fn user_agent(headers: &HeaderMap) -> String {
    header_value(headers, "User-Agent")
        .unwrap_or("Unknown device")
        .to_string()
}

/// Caller address and user agent of an inbound request
///
/// The peer address is only known when the router is served with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: String,
    pub user_agent: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let remote = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(ClientInfo {
            ip: client_ip(&parts.headers, remote),
            user_agent: user_agent(&parts.headers),
        })
    }
}
