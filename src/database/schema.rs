// file: src/database/schema.rs
// description: LanceDB schema management for documents and embedded chunks
// reference: https://docs.rs/lancedb

use crate::database::client::LanceDbClient;
use crate::error::{PipelineError, Result};
use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;
use tracing::{info, warn};

pub struct SchemaManager<'a> {
    client: &'a LanceDbClient,
}

impl<'a> SchemaManager<'a> {
    pub fn new(client: &'a LanceDbClient) -> Self {
        Self { client }
    }

    /// True when both tables are present.
    pub async fn verify_schema(&self) -> Result<bool> {
        for table_name in [self.client.documents_table(), self.client.chunks_table()] {
            if !self.client.table_exists(table_name).await? {
                warn!("Table '{}' does not exist", table_name);
                return Ok(false);
            }
        }

        info!("Index tables present");
        Ok(true)
    }

    pub fn documents_schema() -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("kind", DataType::Utf8, false),
            Field::new("jurisdiction", DataType::Utf8, false),
            Field::new("line_of_business", DataType::Utf8, true),
            Field::new("provider", DataType::Utf8, true),
            Field::new("source", DataType::Utf8, false),
            Field::new("text", DataType::Utf8, false),
            Field::new("content_hash", DataType::Utf8, false),
        ]))
    }

    /// `ordinal` preserves insertion order across reloads.
    pub fn chunks_schema(embedding_dim: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("ordinal", DataType::UInt64, false),
            Field::new("document_id", DataType::Utf8, false),
            Field::new("position", DataType::UInt32, false),
            Field::new("text", DataType::Utf8, false),
            Field::new("kind", DataType::Utf8, false),
            Field::new("jurisdiction", DataType::Utf8, false),
            Field::new("line_of_business", DataType::Utf8, true),
            Field::new("provider", DataType::Utf8, true),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    embedding_dim as i32,
                ),
                false,
            ),
        ]))
    }

    pub async fn drop_all_tables(&self) -> Result<()> {
        warn!("Dropping index tables in LanceDB");

        for table_name in [self.client.documents_table(), self.client.chunks_table()] {
            if self.client.table_exists(table_name).await? {
                self.client
                    .get_connection()
                    .drop_table(table_name)
                    .await
                    .map_err(|e| {
                        PipelineError::Database(format!(
                            "Failed to drop table {}: {}",
                            table_name, e
                        ))
                    })?;
                info!("Dropped table: {}", table_name);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documents_schema() {
        let schema = SchemaManager::documents_schema();
        assert_eq!(schema.fields().len(), 8);
        assert!(schema.field_with_name("provider").unwrap().is_nullable());
        assert!(!schema.field_with_name("text").unwrap().is_nullable());
    }

    #[test]
    fn test_chunks_schema() {
        let schema = SchemaManager::chunks_schema(384);
        assert_eq!(schema.fields().len(), 10);

        let embedding_field = schema.field_with_name("embedding").unwrap();
        assert!(matches!(embedding_field.data_type(), DataType::FixedSizeList(_, 384)));
        assert_eq!(
            schema.field_with_name("ordinal").unwrap().data_type(),
            &DataType::UInt64
        );
    }
}
