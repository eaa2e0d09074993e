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

// Object storage module
//
// Objects live under `<doc_type>/<filename>` in a bucket. Uploads are
// private, served as attachments and encrypted at rest with AES256.

use crate::config::S3Config;
use crate::connector::Connector;
use crate::error::{Error, Result, ResultExt};
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{ObjectCannedAcl, ServerSideEncryption};
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const DEFAULT_DOWNLOAD_DIR: &str = "images";

/// S3 client with static credentials
#[derive(Clone)]
pub struct S3Client {
    client: Client,
    bucket: Option<String>,
    download_dir: PathBuf,
}

/// Body and metadata of a fetched object
#[derive(Debug, Clone)]
pub struct ObjectData {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub content_length: Option<i64>,
}

fn s3_error<E>(context: String) -> impl FnOnce(E) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    move |source| Error::S3 {
        context,
        source: Box::new(source),
    }
}

impl S3Client {
    /// Client for AWS in `region`.
    pub fn new(access_key_id: &str, secret_access_key: &str, region: &str) -> Result<Self> {
        Self::build(access_key_id, secret_access_key, region, None, false, None)
    }

    /// Client from a configuration section, honouring endpoint overrides.
    pub fn from_config(config: &S3Config) -> Result<Self> {
        let client = Self::build(
            &config.access_key_id,
            &config.secret_access_key,
            &config.region,
            config.endpoint_url.as_deref(),
            config.force_path_style,
            Some(config.bucket.clone()),
        )?
        .with_download_dir(&config.download_dir);

        info!(
            "S3 client ready for bucket '{}' in {}",
            config.bucket, config.region
        );
        Ok(client)
    }

    fn build(
        access_key_id: &str,
        secret_access_key: &str,
        region: &str,
        endpoint_url: Option<&str>,
        force_path_style: bool,
        bucket: Option<String>,
    ) -> Result<Self> {
        if access_key_id.is_empty() {
            return Err(Error::InvalidCredentials(
                "access key id is empty".to_string(),
            ));
        }
        if secret_access_key.is_empty() {
            return Err(Error::InvalidCredentials(
                "secret access key is empty".to_string(),
            ));
        }

        let credentials = Credentials::new(access_key_id, secret_access_key, None, None, "static");

        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .force_path_style(force_path_style);
        if let Some(endpoint) = endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket,
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
        })
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Store `body` at `doc_type/filename`.
    pub async fn upload(
        &self,
        bucket: &str,
        body: Vec<u8>,
        content_type: &str,
        doc_type: &str,
        filename: &str,
    ) -> Result<()> {
        let key = object_key(doc_type, filename);
        let length = body.len() as i64;

        self.client
            .put_object()
            .bucket(bucket)
            .key(&key)
            .acl(ObjectCannedAcl::Private)
            .body(ByteStream::from(body))
            .content_length(length)
            .content_type(content_type)
            .content_disposition("attachment")
            .server_side_encryption(ServerSideEncryption::Aes256)
            .send()
            .await
            .map_err(s3_error(format!("error uploading {} to {}", key, bucket)))?;

        info!("Uploaded {} ({} bytes) to bucket {}", key, length, bucket);
        Ok(())
    }

    /// Fetch `doc_type/filename` with its metadata.
    pub async fn download_object(
        &self,
        bucket: &str,
        doc_type: &str,
        filename: &str,
    ) -> Result<ObjectData> {
        let key = object_key(doc_type, filename);

        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(&key)
            .send()
            .await
            .map_err(s3_error(format!("error fetching {} from {}", key, bucket)))?;

        let content_type = output.content_type().map(str::to_string);
        let content_length = output.content_length();
        let body = output
            .body
            .collect()
            .await
            .map_err(s3_error(format!("error reading {} from {}", key, bucket)))?
            .into_bytes();

        debug!("Fetched {} ({} bytes) from bucket {}", key, body.len(), bucket);
        Ok(ObjectData {
            body,
            content_type,
            content_length,
        })
    }

    /// Write `doc_type/filename` to `dir/<file name>`, creating `dir` if needed.
    ///
    /// Only the last component of `filename` names the local file, so the
    /// write always lands inside `dir`.
    pub async fn download(
        &self,
        bucket: &str,
        doc_type: &str,
        filename: &str,
        dir: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        let dir = dir.as_ref();
        let path = local_path(dir, filename)?;
        let object = self.download_object(bucket, doc_type, filename).await?;

        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("error creating {}", dir.display()))?;
        tokio::fs::write(&path, &object.body)
            .await
            .with_context(|| format!("error writing {}", path.display()))?;

        debug!("Wrote {} to {}", filename, path.display());
        Ok(path)
    }

    /// `download` into the configured download directory.
    pub async fn download_to_default_dir(
        &self,
        bucket: &str,
        doc_type: &str,
        filename: &str,
    ) -> Result<PathBuf> {
        self.download(bucket, doc_type, filename, &self.download_dir)
            .await
    }
}

#[async_trait]
impl Connector for S3Client {
    async fn health_check(&self) -> anyhow::Result<bool> {
        let Some(bucket) = self.bucket.as_deref() else {
            return Ok(true);
        };

        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("S3 health check of bucket {} failed: {}", bucket, e);
                Ok(false)
            }
        }
    }

    fn service_name(&self) -> &str {
        "s3"
    }
}

/// Local target for a downloaded object: `dir` joined with the last
/// component of `filename`.
pub fn local_path(dir: &Path, filename: &str) -> Result<PathBuf> {
    match Path::new(filename).file_name() {
        Some(name) => Ok(dir.join(name)),
        None => Err(Error::InvalidField {
            field: "filename".to_string(),
            reason: format!("'{}' does not name a file", filename),
        }),
    }
}

/// Object key for a document: `doc_type/filename`
pub fn object_key(doc_type: &str, filename: &str) -> String {
    format!(
        "{}/{}",
        doc_type.trim_matches('/'),
        filename.trim_start_matches('/')
    )
}
