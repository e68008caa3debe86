//! Artist repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::Artist;
use async_trait::async_trait;
use sqlx::{query, query_as, query_scalar, FromRow, SqlitePool};

/// Identity projection for artists whose fingerprint is still unset.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ArtistFingerprintRow {
    pub id: i64,
    pub name: String,
}

/// Artist repository interface for data access operations
#[async_trait]
pub trait ArtistRepository: Send + Sync {
    /// Find an artist by its ID
    ///
    /// # Returns
    /// - `Ok(Some(artist))` if found
    /// - `Ok(None)` if not found
    /// - `Err` if database error occurs
    async fn find_by_id(&self, id: i64) -> Result<Option<Artist>>;

    /// Find an artist by exact name
    async fn find_by_name(&self, name: &str) -> Result<Option<Artist>>;

    /// Fetch the names of the given artists
    ///
    /// Order of the returned names is unspecified; fingerprint hashing
    /// sorts its input anyway.
    async fn names_by_ids(&self, ids: &[i64]) -> Result<Vec<String>>;

    /// Artists missing a fingerprint, projected to identity fields only
    async fn missing_fingerprint(&self) -> Result<Vec<ArtistFingerprintRow>>;

    /// Persist a computed fingerprint for one artist
    ///
    /// # Errors
    /// Returns `NotFound` if the artist does not exist
    async fn set_fingerprint(&self, id: i64, fingerprint: &str) -> Result<()>;

    /// Count total artists
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of ArtistRepository
pub struct SqliteArtistRepository {
    pool: SqlitePool,
}

impl SqliteArtistRepository {
    /// Create a new SqliteArtistRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArtistRepository for SqliteArtistRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Artist>> {
        let artist = query_as::<_, Artist>("SELECT * FROM artists WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(artist)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Artist>> {
        let artist = query_as::<_, Artist>("SELECT * FROM artists WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(artist)
    }

    async fn names_by_ids(&self, ids: &[i64]) -> Result<Vec<String>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT name FROM artists WHERE id IN ({placeholders})");

        let mut q = query_scalar::<_, String>(&sql);
        for id in ids {
            q = q.bind(id);
        }

        Ok(q.fetch_all(&self.pool).await?)
    }

    async fn missing_fingerprint(&self) -> Result<Vec<ArtistFingerprintRow>> {
        let rows = query_as::<_, ArtistFingerprintRow>(
            "SELECT id, name FROM artists WHERE fingerprint IS NULL ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn set_fingerprint(&self, id: i64, fingerprint: &str) -> Result<()> {
        let result = query("UPDATE artists SET fingerprint = ? WHERE id = ?")
            .bind(fingerprint)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::NotFound {
                entity_type: "Artist".to_string(),
                id,
            });
        }

        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = query_scalar("SELECT COUNT(*) FROM artists")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::models::NewArtist;
    use crate::service::LibraryService;

    fn artist(name: &str) -> NewArtist {
        NewArtist {
            name: name.to_string(),
            thumbnail: None,
            is_favorite: false,
        }
    }

    #[tokio::test]
    async fn test_find_by_id_and_name() {
        let pool = create_test_pool().await.unwrap();
        let service = LibraryService::new(pool.clone());
        let repo = SqliteArtistRepository::new(pool);

        let created = service.insert_artist(artist("Test Artist")).await.unwrap();

        let by_id = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.name, "Test Artist");
        assert_eq!(by_id.normalized_name, "test artist");

        let by_name = repo.find_by_name("Test Artist").await.unwrap();
        assert!(by_name.is_some());

        let missing = repo.find_by_name("Nobody").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_names_by_ids() {
        let pool = create_test_pool().await.unwrap();
        let service = LibraryService::new(pool.clone());
        let repo = SqliteArtistRepository::new(pool);

        let a = service.insert_artist(artist("A")).await.unwrap();
        let b = service.insert_artist(artist("B")).await.unwrap();

        let mut names = repo.names_by_ids(&[a.id, b.id]).await.unwrap();
        names.sort();
        assert_eq!(names, vec!["A".to_string(), "B".to_string()]);

        assert!(repo.names_by_ids(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_fingerprint_requires_existing_row() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteArtistRepository::new(pool);

        let result = repo.set_fingerprint(9999, "abc").await;
        assert!(matches!(result, Err(LibraryError::NotFound { .. })));
    }
}
