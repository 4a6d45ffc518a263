use async_trait::async_trait;
use sqlx::Row;

use super::SqliteRepository;
use crate::repository::{DocumentRepository, StorageError};

#[async_trait]
impl DocumentRepository for SqliteRepository {
    async fn get_document(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT body FROM documents WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        row.map(|row| {
            row.try_get::<String, _>("body")
                .map_err(|err| StorageError::Serialization(err.to_string()))
        })
        .transpose()
    }

    async fn put_document(&self, key: &str, body: &str) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO documents (key, body, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at
            ",
        )
        .bind(key)
        .bind(body)
        .bind(self.clock.now())
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }
}
