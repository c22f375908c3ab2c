//! MongoDB-backed durable store.
//!
//! MongoDB is used purely as a record store. Ranking always happens
//! in-process, so a scan reads every document; there is no server-side
//! vector search.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, spec::BinarySubtype, to_bson, Binary, Bson, DateTime as BsonDateTime, Document},
    options::{ClientOptions, IndexOptions},
    Client, Collection, IndexModel,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::record::ScreenshotRecord;
use super::{DocumentStore, StoreConfig};
use crate::error::ServiceError;

const APP_NAME: &str = "screenshot-search";

/// Screenshot collection in a MongoDB database.
#[derive(Debug, Clone)]
pub struct MongoStore {
    collection: Collection<Document>,
    location: String,
}

impl MongoStore {
    /// Connect, verify the server answers a ping, and ensure indexes.
    pub async fn connect(uri: &str, config: &StoreConfig) -> Result<Self, ServiceError> {
        info!(
            database = %config.database,
            collection = %config.collection,
            "Connecting to MongoDB"
        );

        let mut options = ClientOptions::parse(uri).await.map_err(|e| {
            ServiceError::StorageConnect(format!("Failed to parse MongoDB URI: {}", e))
        })?;
        options.app_name = Some(APP_NAME.to_string());
        options.connect_timeout = Some(config.connect_timeout);
        options.server_selection_timeout = Some(config.connect_timeout);

        let client = Client::with_options(options).map_err(|e| {
            ServiceError::StorageConnect(format!("Failed to create MongoDB client: {}", e))
        })?;

        let db = client.database(&config.database);
        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| ServiceError::StorageConnect(format!("Failed to reach MongoDB: {}", e)))?;

        let store = Self {
            collection: db.collection::<Document>(&config.collection),
            location: format!("mongodb://{}/{}", config.database, config.collection),
        };
        store.ensure_indexes().await;

        info!(location = %store.location, "Connected to MongoDB");
        Ok(store)
    }

    async fn ensure_indexes(&self) {
        let index = IndexModel::builder()
            .keys(doc! { "record_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("record_id_unique".to_string())
                    .build(),
            )
            .build();

        if let Err(e) = self.collection.create_index(index).await {
            warn!(error = %e, "Failed to create record_id index");
        }
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn insert(&self, record: ScreenshotRecord) -> Result<Uuid, ServiceError> {
        let id = record.id.unwrap_or_else(Uuid::new_v4);
        let filename = record.filename.clone();
        let document = record_to_doc(id, record)?;

        self.collection
            .insert_one(document)
            .await
            .map_err(|e| ServiceError::StorageWrite(format!("Failed to store {}: {}", filename, e)))?;

        debug!(id = %id, filename = %filename, "Stored screenshot in MongoDB");
        Ok(id)
    }

    async fn fetch_all_with_vectors(&self) -> Result<Vec<ScreenshotRecord>, ServiceError> {
        // ObjectIds increase with insertion, so sorting on _id keeps insertion order.
        let mut cursor = self
            .collection
            .find(doc! {})
            .sort(doc! { "_id": 1 })
            .projection(doc! { "_id": 0 })
            .await
            .map_err(|e| ServiceError::StorageRead(format!("Failed to scan screenshots: {}", e)))?;

        let mut records = Vec::new();
        while let Some(document) = cursor.try_next().await.map_err(|e| {
            ServiceError::StorageRead(format!("Failed to iterate screenshots: {}", e))
        })? {
            match doc_to_record(&document) {
                Ok(record) => records.push(record),
                Err(e) => warn!(error = %e, "Skipping undecodable screenshot document"),
            }
        }

        Ok(records)
    }

    async fn count(&self) -> u64 {
        match self.collection.count_documents(doc! {}).await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "Failed to count screenshots, reporting 0");
                0
            }
        }
    }

    fn describe(&self) -> String {
        self.location.clone()
    }
}

fn record_to_doc(id: Uuid, record: ScreenshotRecord) -> Result<Document, ServiceError> {
    let embedding = to_bson(&record.vector)
        .map_err(|e| ServiceError::StorageWrite(format!("Failed to encode embedding: {}", e)))?;

    Ok(doc! {
        "record_id": id.to_string(),
        "filename": record.filename,
        "image_data": Bson::Binary(Binary {
            subtype: BinarySubtype::Generic,
            bytes: record.image_data,
        }),
        "ocr_text": record.ocr_text,
        "visual_description": record.visual_description,
        "combined_text": record.combined_text,
        "embedding": embedding,
        "created_at": BsonDateTime::from_millis(record.created_at.timestamp_millis()),
    })
}

fn doc_to_record(document: &Document) -> Result<ScreenshotRecord, ServiceError> {
    let id = document
        .get_str("record_id")
        .ok()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| ServiceError::StorageRead("missing or invalid record_id".into()))?;

    let vector = document
        .get("embedding")
        .and_then(|b| mongodb::bson::from_bson::<Vec<f32>>(b.clone()).ok())
        .ok_or_else(|| ServiceError::StorageRead(format!("record {} has no embedding", id)))?;

    let created_at: DateTime<Utc> = document
        .get_datetime("created_at")
        .ok()
        .and_then(|dt| Utc.timestamp_millis_opt(dt.timestamp_millis()).single())
        .unwrap_or_default();

    Ok(ScreenshotRecord {
        id: Some(id),
        filename: document.get_str("filename").unwrap_or("").to_string(),
        image_data: document
            .get_binary_generic("image_data")
            .cloned()
            .unwrap_or_default(),
        ocr_text: document.get_str("ocr_text").unwrap_or("").to_string(),
        visual_description: document
            .get_str("visual_description")
            .unwrap_or("")
            .to_string(),
        combined_text: document.get_str("combined_text").unwrap_or("").to_string(),
        vector,
        created_at,
    })
}
