// file: src/database/client.rs
// description: LanceDB client wrapper with connection management and index reads
// reference: https://docs.rs/lancedb

use crate::config::IndexConfig;
use crate::error::{PipelineError, Result};
use crate::models::{Chunk, Document, DocumentKind};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, StringArray, UInt32Array, UInt64Array,
};
use futures::StreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, Table, connect};
use tracing::{debug, info};

/// A chunk row as persisted: insertion ordinal, chunk and its embedding.
pub type StoredChunk = (u64, Chunk, Vec<f32>);

#[derive(Clone)]
pub struct LanceDbClient {
    connection: Connection,
    config: IndexConfig,
}

impl LanceDbClient {
    pub async fn new(config: IndexConfig) -> Result<Self> {
        info!("Connecting to LanceDB at {}", config.uri);

        let connection = connect(&config.uri)
            .execute()
            .await
            .map_err(|e| PipelineError::Database(format!("Failed to connect to LanceDB: {}", e)))?;

        Ok(Self { connection, config })
    }

    pub fn get_connection(&self) -> &Connection {
        &self.connection
    }

    pub fn uri(&self) -> &str {
        &self.config.uri
    }

    pub fn documents_table(&self) -> &str {
        &self.config.documents_table
    }

    pub fn chunks_table(&self) -> &str {
        &self.config.chunks_table
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    pub async fn ping(&self) -> Result<bool> {
        debug!("Checking LanceDB connection");

        match self.connection.table_names().execute().await {
            Ok(_) => Ok(true),
            Err(e) => Err(PipelineError::Database(format!(
                "LanceDB connection failed: {}",
                e
            ))),
        }
    }

    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| PipelineError::Database(format!("Failed to list tables: {}", e)))?;

        Ok(table_names.iter().any(|name| name == table_name))
    }

    pub async fn get_table(&self, table_name: &str) -> Result<Table> {
        self.connection
            .open_table(table_name)
            .execute()
            .await
            .map_err(|e| {
                PipelineError::Database(format!("Failed to open table {}: {}", table_name, e))
            })
    }

    pub async fn count_rows(&self, table_name: &str) -> Result<u64> {
        if !self.table_exists(table_name).await? {
            return Ok(0);
        }

        let table = self.get_table(table_name).await?;
        let count = table
            .count_rows(None)
            .await
            .map_err(|e| PipelineError::Database(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    pub async fn get_document_count(&self) -> Result<u64> {
        self.count_rows(self.documents_table()).await
    }

    pub async fn get_chunk_count(&self) -> Result<u64> {
        self.count_rows(self.chunks_table()).await
    }

    async fn read_all(&self, table_name: &str) -> Result<Vec<RecordBatch>> {
        let count = self.count_rows(table_name).await?;
        if count == 0 {
            return Ok(Vec::new());
        }

        let table = self.get_table(table_name).await?;
        let mut stream = table
            .query()
            .limit(count as usize)
            .execute()
            .await
            .map_err(|e| {
                PipelineError::Database(format!("Failed to scan table {}: {}", table_name, e))
            })?;

        let mut batches = Vec::new();
        while let Some(batch_result) = stream.next().await {
            let batch = batch_result.map_err(|e| {
                PipelineError::Database(format!("Failed to read result batch: {}", e))
            })?;
            batches.push(batch);
        }

        debug!("Read {} rows from {}", count, table_name);
        Ok(batches)
    }

    pub async fn load_documents(&self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();

        for batch in self.read_all(self.documents_table()).await? {
            let ids = column::<StringArray>(&batch, "id")?;
            let kinds = column::<StringArray>(&batch, "kind")?;
            let jurisdictions = column::<StringArray>(&batch, "jurisdiction")?;
            let lines = column::<StringArray>(&batch, "line_of_business")?;
            let providers = column::<StringArray>(&batch, "provider")?;
            let sources = column::<StringArray>(&batch, "source")?;
            let texts = column::<StringArray>(&batch, "text")?;
            let hashes = column::<StringArray>(&batch, "content_hash")?;

            for i in 0..batch.num_rows() {
                documents.push(Document {
                    id: ids.value(i).to_string(),
                    kind: parse_kind(kinds.value(i))?,
                    jurisdiction: jurisdictions.value(i).to_string(),
                    line_of_business: optional(lines, i),
                    provider: optional(providers, i),
                    source: sources.value(i).to_string(),
                    text: texts.value(i).to_string(),
                    content_hash: hashes.value(i).to_string(),
                });
            }
        }

        documents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(documents)
    }

    /// Every chunk row, sorted by insertion ordinal.
    pub async fn load_chunks(&self) -> Result<Vec<StoredChunk>> {
        let mut rows = Vec::new();

        for batch in self.read_all(self.chunks_table()).await? {
            let ids = column::<StringArray>(&batch, "id")?;
            let ordinals = column::<UInt64Array>(&batch, "ordinal")?;
            let document_ids = column::<StringArray>(&batch, "document_id")?;
            let positions = column::<UInt32Array>(&batch, "position")?;
            let texts = column::<StringArray>(&batch, "text")?;
            let kinds = column::<StringArray>(&batch, "kind")?;
            let jurisdictions = column::<StringArray>(&batch, "jurisdiction")?;
            let lines = column::<StringArray>(&batch, "line_of_business")?;
            let providers = column::<StringArray>(&batch, "provider")?;
            let embeddings = column::<FixedSizeListArray>(&batch, "embedding")?;

            for i in 0..batch.num_rows() {
                let chunk = Chunk {
                    id: ids.value(i).to_string(),
                    document_id: document_ids.value(i).to_string(),
                    position: positions.value(i),
                    text: texts.value(i).to_string(),
                    kind: parse_kind(kinds.value(i))?,
                    jurisdiction: jurisdictions.value(i).to_string(),
                    line_of_business: optional(lines, i),
                    provider: optional(providers, i),
                };

                let values = embeddings.value(i);
                let values = values
                    .as_any()
                    .downcast_ref::<Float32Array>()
                    .ok_or_else(|| {
                        PipelineError::Database("Invalid 'embedding' item type".to_string())
                    })?;

                rows.push((ordinals.value(i), chunk, values.values().to_vec()));
            }
        }

        rows.sort_by_key(|(ordinal, _, _)| *ordinal);
        Ok(rows)
    }
}

fn column<'b, T: 'static>(batch: &'b RecordBatch, name: &str) -> Result<&'b T> {
    batch
        .column_by_name(name)
        .ok_or_else(|| PipelineError::Database(format!("Missing '{}' column", name)))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| PipelineError::Database(format!("Invalid '{}' column type", name)))
}

fn optional(array: &StringArray, idx: usize) -> Option<String> {
    if array.is_null(idx) {
        None
    } else {
        Some(array.value(idx).to_string())
    }
}

fn parse_kind(value: &str) -> Result<DocumentKind> {
    value.parse::<DocumentKind>().map_err(PipelineError::Database)
}
