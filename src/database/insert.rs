// file: src/database/insert.rs
// description: LanceDB batch insertion of documents and embedded chunks
// reference: https://docs.rs/lancedb

use crate::database::client::LanceDbClient;
use crate::database::schema::SchemaManager;
use crate::error::{PipelineError, Result};
use crate::models::{Chunk, Document};
use arrow_array::{
    FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray, UInt32Array,
    UInt64Array,
};
use arrow_schema::Schema;
use lance_arrow::FixedSizeListArrayExt;
use std::sync::Arc;
use tracing::{debug, info};

pub struct BatchInserter<'a> {
    client: &'a LanceDbClient,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertStats {
    pub documents_inserted: usize,
    pub chunks_inserted: usize,
    pub batches: usize,
}

impl<'a> BatchInserter<'a> {
    pub fn new(client: &'a LanceDbClient) -> Self {
        Self { client }
    }

    pub async fn insert_documents(&self, documents: &[Document]) -> Result<InsertStats> {
        let schema = SchemaManager::documents_schema();
        let table_name = self.client.documents_table();
        let mut stats = InsertStats::default();

        if documents.is_empty() {
            self.create_empty(table_name, schema).await?;
            return Ok(stats);
        }

        for batch in documents.chunks(self.client.batch_size()) {
            let record_batch = Self::documents_batch(schema.clone(), batch)?;
            self.write(table_name, schema.clone(), record_batch).await?;
            stats.documents_inserted += batch.len();
            stats.batches += 1;
        }

        info!("Inserted {} documents", stats.documents_inserted);
        Ok(stats)
    }

    /// `rows` must all share one embedding dimension; row order becomes the
    /// persisted ordinal.
    pub async fn insert_chunks(
        &self,
        rows: &[(Chunk, Vec<f32>)],
        dimension: usize,
    ) -> Result<InsertStats> {
        let schema = SchemaManager::chunks_schema(dimension);
        let table_name = self.client.chunks_table();
        let mut stats = InsertStats::default();

        if rows.is_empty() {
            self.create_empty(table_name, schema).await?;
            return Ok(stats);
        }

        let mut ordinal = 0u64;
        for batch in rows.chunks(self.client.batch_size()) {
            let record_batch = Self::chunks_batch(schema.clone(), batch, ordinal, dimension)?;
            self.write(table_name, schema.clone(), record_batch).await?;
            ordinal += batch.len() as u64;
            stats.chunks_inserted += batch.len();
            stats.batches += 1;
        }

        info!("Inserted {} chunks", stats.chunks_inserted);
        Ok(stats)
    }

    async fn write(
        &self,
        table_name: &str,
        schema: Arc<Schema>,
        record_batch: RecordBatch,
    ) -> Result<()> {
        let rows = record_batch.num_rows();

        if !self.client.table_exists(table_name).await? {
            self.client
                .get_connection()
                .create_table(
                    table_name,
                    RecordBatchIterator::new(vec![Ok(record_batch)], schema),
                )
                .execute()
                .await
                .map_err(|e| {
                    PipelineError::Database(format!("Failed to create table {}: {}", table_name, e))
                })?;
            info!("Created new table: {}", table_name);
        } else {
            let table = self.client.get_table(table_name).await?;
            table
                .add(RecordBatchIterator::new(vec![Ok(record_batch)], schema))
                .execute()
                .await
                .map_err(|e| {
                    PipelineError::Database(format!("Failed to insert into {}: {}", table_name, e))
                })?;
        }

        debug!("Wrote batch of {} rows to {}", rows, table_name);
        Ok(())
    }

    async fn create_empty(&self, table_name: &str, schema: Arc<Schema>) -> Result<()> {
        if self.client.table_exists(table_name).await? {
            return Ok(());
        }

        self.client
            .get_connection()
            .create_empty_table(table_name, schema)
            .execute()
            .await
            .map_err(|e| {
                PipelineError::Database(format!("Failed to create table {}: {}", table_name, e))
            })?;
        info!("Created empty table: {}", table_name);
        Ok(())
    }

    fn documents_batch(schema: Arc<Schema>, documents: &[Document]) -> Result<RecordBatch> {
        let ids: StringArray = documents.iter().map(|d| Some(d.id.as_str())).collect();
        let kinds: StringArray = documents.iter().map(|d| Some(d.kind.as_str())).collect();
        let jurisdictions: StringArray = documents
            .iter()
            .map(|d| Some(d.jurisdiction.as_str()))
            .collect();
        let lines: StringArray = documents
            .iter()
            .map(|d| d.line_of_business.as_deref())
            .collect();
        let providers: StringArray = documents.iter().map(|d| d.provider.as_deref()).collect();
        let sources: StringArray = documents.iter().map(|d| Some(d.source.as_str())).collect();
        let texts: StringArray = documents.iter().map(|d| Some(d.text.as_str())).collect();
        let hashes: StringArray = documents
            .iter()
            .map(|d| Some(d.content_hash.as_str()))
            .collect();

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(ids),
                Arc::new(kinds),
                Arc::new(jurisdictions),
                Arc::new(lines),
                Arc::new(providers),
                Arc::new(sources),
                Arc::new(texts),
                Arc::new(hashes),
            ],
        )
        .map_err(|e| PipelineError::Database(format!("Failed to create record batch: {}", e)))
    }

    fn chunks_batch(
        schema: Arc<Schema>,
        rows: &[(Chunk, Vec<f32>)],
        first_ordinal: u64,
        dimension: usize,
    ) -> Result<RecordBatch> {
        if let Some((chunk, embedding)) = rows.iter().find(|(_, e)| e.len() != dimension) {
            return Err(PipelineError::Database(format!(
                "Chunk {} has embedding dimension {}, expected {}",
                chunk.id,
                embedding.len(),
                dimension
            )));
        }

        let ids: StringArray = rows.iter().map(|(c, _)| Some(c.id.as_str())).collect();
        let ordinals: UInt64Array = (0..rows.len() as u64)
            .map(|offset| Some(first_ordinal + offset))
            .collect();
        let document_ids: StringArray = rows
            .iter()
            .map(|(c, _)| Some(c.document_id.as_str()))
            .collect();
        let positions: UInt32Array = rows.iter().map(|(c, _)| Some(c.position)).collect();
        let texts: StringArray = rows.iter().map(|(c, _)| Some(c.text.as_str())).collect();
        let kinds: StringArray = rows.iter().map(|(c, _)| Some(c.kind.as_str())).collect();
        let jurisdictions: StringArray = rows
            .iter()
            .map(|(c, _)| Some(c.jurisdiction.as_str()))
            .collect();
        let lines: StringArray = rows
            .iter()
            .map(|(c, _)| c.line_of_business.as_deref())
            .collect();
        let providers: StringArray = rows.iter().map(|(c, _)| c.provider.as_deref()).collect();

        let embedding_values: Float32Array = rows
            .iter()
            .flat_map(|(_, emb)| emb.iter().copied())
            .collect();
        let embedding_list =
            FixedSizeListArray::try_new_from_values(embedding_values, dimension as i32).map_err(
                |e| PipelineError::Database(format!("Failed to create embedding array: {}", e)),
            )?;

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(ids),
                Arc::new(ordinals),
                Arc::new(document_ids),
                Arc::new(positions),
                Arc::new(texts),
                Arc::new(kinds),
                Arc::new(jurisdictions),
                Arc::new(lines),
                Arc::new(providers),
                Arc::new(embedding_list),
            ],
        )
        .map_err(|e| PipelineError::Database(format!("Failed to create record batch: {}", e)))
    }
}
