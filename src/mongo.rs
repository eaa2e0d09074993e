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

// Document store module
//
// CRUD, paginated find and aggregation passthrough over the MongoDB driver.
// Every operation names its database and collection explicitly.

use crate::config::MongoConfig;
use crate::connector::Connector;
use crate::error::{Error, Result, ResultExt};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::{
    ClientOptions, Credential, FindOneOptions, FindOptions, ReplaceOptions, ServerAddress,
    UpdateOptions,
};
use mongodb::{Client, Collection};
use serde::Serialize;
use tracing::{debug, info, warn};

pub use mongodb::bson;

/// MongoDB session shared by all calls
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    database: String,
}

impl MongoClient {
    /// Connect and verify the deployment answers `ping` within the timeout.
    pub async fn connect(config: &MongoConfig) -> Result<Self> {
        let timeout = config.timeout();

        let mut options = ClientOptions::builder()
            .hosts(vec![ServerAddress::Tcp {
                host: config.host.clone(),
                port: Some(config.port),
            }])
            .build();
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);
        options.default_database = Some(config.database.clone());

        if let Some(username) = config.username.as_ref().filter(|u| !u.is_empty()) {
            let mut credential = Credential::default();
            credential.username = Some(username.clone());
            credential.password = config.password.clone();
            credential.source = Some(config.database.clone());
            options.credential = Some(credential);
        }

        let client = Client::with_options(options).context("Can not initialize mongodb client")?;
        let session = Self {
            client,
            database: config.database.clone(),
        };
        session.ping().await?;

        info!(
            "Connected to mongodb at {}:{} (database {})",
            config.host, config.port, config.database
        );
        Ok(session)
    }

    /// Wrap an already configured driver client.
    pub fn from_client(client: Client, database: impl Into<String>) -> Self {
        Self {
            client,
            database: database.into(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn ping(&self) -> Result<()> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 }, None)
            .await
            .context("cannot ping mongodb")?;
        Ok(())
    }

    fn collection(&self, db: &str, collection: &str) -> Collection<Document> {
        self.client.database(db).collection::<Document>(collection)
    }

    /// Serialize `object` to BSON and insert it.
    pub async fn insert<T: Serialize>(&self, db: &str, collection: &str, object: &T) -> Result<()> {
        let document = bson::to_document(object)
            .with_context(|| format!("error encoding document for {}.{}", db, collection))?;
        self.collection(db, collection)
            .insert_one(document, None)
            .await
            .with_context(|| format!("error inserting into {}.{}", db, collection))?;
        Ok(())
    }

    pub async fn find_one(
        &self,
        db: &str,
        collection: &str,
        query: Document,
    ) -> Result<Option<Document>> {
        self.collection(db, collection)
            .find_one(query, None)
            .await
            .with_context(|| format!("error finding one in {}.{}", db, collection))
    }

    pub async fn find_one_sorted(
        &self,
        db: &str,
        collection: &str,
        query: Document,
        sort: &str,
    ) -> Result<Option<Document>> {
        let mut options = FindOneOptions::default();
        options.sort = Some(sort_document(sort));

        self.collection(db, collection)
            .find_one(query, options)
            .await
            .with_context(|| format!("error finding one sorted in {}.{}", db, collection))
    }

    /// First match, restricted to the projected `fields`.
    pub async fn find_one_projected(
        &self,
        db: &str,
        collection: &str,
        query: Document,
        fields: Document,
    ) -> Result<Option<Document>> {
        let mut options = FindOneOptions::default();
        options.projection = Some(fields);

        self.collection(db, collection)
            .find_one(query, options)
            .await
            .with_context(|| format!("error finding one in {}.{}", db, collection))
    }

    /// One page of matches; pages start at 1.
    pub async fn find_all(
        &self,
        db: &str,
        collection: &str,
        query: Document,
        page_num: u64,
        page_size: u64,
    ) -> Result<Vec<Document>> {
        let options = page_options(None, page_num, page_size);
        self.find_with(db, collection, query, options).await
    }

    pub async fn find_all_sorted(
        &self,
        db: &str,
        collection: &str,
        query: Document,
        sort: &str,
        page_num: u64,
        page_size: u64,
    ) -> Result<Vec<Document>> {
        let options = page_options(Some(sort_document(sort)), page_num, page_size);
        self.find_with(db, collection, query, options).await
    }

    pub async fn find_all_unpaged(
        &self,
        db: &str,
        collection: &str,
        query: Document,
    ) -> Result<Vec<Document>> {
        self.find_with(db, collection, query, FindOptions::default())
            .await
    }

    pub async fn find_all_projected(
        &self,
        db: &str,
        collection: &str,
        query: Document,
        fields: Document,
    ) -> Result<Vec<Document>> {
        let mut options = FindOptions::default();
        options.projection = Some(fields);
        self.find_with(db, collection, query, options).await
    }

    async fn find_with(
        &self,
        db: &str,
        collection: &str,
        query: Document,
        options: FindOptions,
    ) -> Result<Vec<Document>> {
        let cursor = self
            .collection(db, collection)
            .find(query, options)
            .await
            .with_context(|| format!("error finding in {}.{}", db, collection))?;

        let documents: Vec<Document> = cursor
            .try_collect()
            .await
            .with_context(|| format!("error reading cursor of {}.{}", db, collection))?;
        Ok(documents)
    }

    /// Update the first match; `Error::NotFound` when nothing matched.
    ///
    /// An `updater` made only of `$` operators is applied as an update,
    /// anything else replaces the matched document.
    pub async fn update(
        &self,
        db: &str,
        collection: &str,
        selector: Document,
        updater: Document,
    ) -> Result<()> {
        let matched = self
            .update_one_with(db, collection, selector, updater, false)
            .await?;
        if matched == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    /// Update or insert the first match.
    pub async fn upsert(
        &self,
        db: &str,
        collection: &str,
        selector: Document,
        updater: Document,
    ) -> Result<()> {
        self.update_one_with(db, collection, selector, updater, true)
            .await?;
        Ok(())
    }

    async fn update_one_with(
        &self,
        db: &str,
        collection: &str,
        selector: Document,
        updater: Document,
        upsert: bool,
    ) -> Result<u64> {
        let coll = self.collection(db, collection);

        let result = if is_update_document(&updater) {
            let mut options = UpdateOptions::default();
            options.upsert = Some(upsert);
            coll.update_one(selector, updater, options).await
        } else {
            let mut options = ReplaceOptions::default();
            options.upsert = Some(upsert);
            coll.replace_one(selector, updater, options).await
        }
        .with_context(|| format!("error updating {}.{}", db, collection))?;

        debug!(
            "update on {}.{}: matched {}, modified {}",
            db, collection, result.matched_count, result.modified_count
        );
        Ok(result.matched_count)
    }

    /// Apply `updater` to every match; returns the modified count.
    pub async fn update_all(
        &self,
        db: &str,
        collection: &str,
        selector: Document,
        updater: Document,
    ) -> Result<u64> {
        let result = self
            .collection(db, collection)
            .update_many(selector, updater, None)
            .await
            .with_context(|| format!("error updating all in {}.{}", db, collection))?;
        Ok(result.modified_count)
    }

    pub async fn count(&self, db: &str, collection: &str, query: Document) -> Result<u64> {
        self.collection(db, collection)
            .count_documents(query, None)
            .await
            .with_context(|| format!("error counting {}.{}", db, collection))
    }

    /// `Ok(())` when no document matches `query`, `Error::DocumentExists` otherwise.
    pub async fn ensure_absent(&self, db: &str, collection: &str, query: Document) -> Result<()> {
        if self.count(db, collection, query).await? > 0 {
            return Err(Error::DocumentExists);
        }
        Ok(())
    }

    /// Run an aggregation pipeline and return its first output document.
    pub async fn pipe_one(
        &self,
        db: &str,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> Result<Option<Document>> {
        let mut cursor = self
            .collection(db, collection)
            .aggregate(pipeline, None)
            .await
            .with_context(|| format!("error aggregating {}.{}", db, collection))?;

        cursor
            .try_next()
            .await
            .with_context(|| format!("error reading pipeline of {}.{}", db, collection))
    }

    pub async fn pipe_all(
        &self,
        db: &str,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> Result<Vec<Document>> {
        let cursor = self
            .collection(db, collection)
            .aggregate(pipeline, None)
            .await
            .with_context(|| format!("error aggregating {}.{}", db, collection))?;

        let documents: Vec<Document> = cursor
            .try_collect()
            .await
            .with_context(|| format!("error reading pipeline of {}.{}", db, collection))?;
        Ok(documents)
    }

    /// Remove the first match; `Error::NotFound` when nothing matched.
    pub async fn remove(&self, db: &str, collection: &str, query: Document) -> Result<()> {
        let result = self
            .collection(db, collection)
            .delete_one(query, None)
            .await
            .with_context(|| format!("error removing from {}.{}", db, collection))?;
        if result.deleted_count == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    /// Remove every match; returns the removed count.
    pub async fn remove_all(&self, db: &str, collection: &str, query: Document) -> Result<u64> {
        let result = self
            .collection(db, collection)
            .delete_many(query, None)
            .await
            .with_context(|| format!("error removing all from {}.{}", db, collection))?;
        Ok(result.deleted_count)
    }
}

#[async_trait]
impl Connector for MongoClient {
    async fn health_check(&self) -> anyhow::Result<bool> {
        match self.ping().await {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!("MongoDB health check failed: {}", e);
                Ok(false)
            }
        }
    }

    fn service_name(&self) -> &str {
        "mongodb"
    }
}

/// Turn `"-created_at,name"` into `{ created_at: -1, name: 1 }`.
pub fn sort_document(spec: &str) -> Document {
    let mut sort = Document::new();
    for field in spec.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        match field.strip_prefix('-') {
            Some(name) => sort.insert(name, -1),
            None => sort.insert(field.trim_start_matches('+'), 1),
        };
    }
    sort
}

/// Skip for a 1-based page; page 0 is treated as the first page.
pub fn page_skip(page_num: u64, page_size: u64) -> u64 {
    page_num.saturating_sub(1).saturating_mul(page_size)
}

fn page_options(sort: Option<Document>, page_num: u64, page_size: u64) -> FindOptions {
    let mut options = FindOptions::default();
    options.sort = sort;
    options.skip = Some(page_skip(page_num, page_size));
    if page_size > 0 {
        options.limit = Some(i64::try_from(page_size).unwrap_or(i64::MAX));
    }
    options
}

fn is_update_document(updater: &Document) -> bool {
    !updater.is_empty() && updater.keys().all(|k| k.starts_with('$'))
}
