//! Album repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{Album, AlbumType};
use async_trait::async_trait;
use sqlx::{query, query_as, query_scalar, FromRow, SqlitePool};

/// Identity projection for albums whose fingerprint is still unset.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct AlbumFingerprintRow {
    pub id: i64,
    pub name: String,
    pub album_type: AlbumType,
}

/// Album repository interface for data access operations
#[async_trait]
pub trait AlbumRepository: Send + Sync {
    /// Find an album by its ID
    ///
    /// # Returns
    /// - `Ok(Some(album))` if found
    /// - `Ok(None)` if not found
    /// - `Err` if database error occurs
    async fn find_by_id(&self, id: i64) -> Result<Option<Album>>;

    /// Ids of the artists credited on an album, sorted ascending
    ///
    /// The sorted form is what duplicate detection compares; credit order
    /// is available through [`AlbumRepository::artist_names`].
    async fn artist_ids(&self, album_id: i64) -> Result<Vec<i64>>;

    /// Names of the artists credited on an album, in credit order
    async fn artist_names(&self, album_id: i64) -> Result<Vec<String>>;

    /// Albums missing a fingerprint, projected to identity fields only
    async fn missing_fingerprint(&self) -> Result<Vec<AlbumFingerprintRow>>;

    /// Persist a computed fingerprint for one album
    ///
    /// # Errors
    /// Returns `NotFound` if the album does not exist
    async fn set_fingerprint(&self, id: i64, fingerprint: &str) -> Result<()>;

    /// Count total albums
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of AlbumRepository
pub struct SqliteAlbumRepository {
    pool: SqlitePool,
}

impl SqliteAlbumRepository {
    /// Create a new SqliteAlbumRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlbumRepository for SqliteAlbumRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Album>> {
        let album = query_as::<_, Album>("SELECT * FROM albums WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(album)
    }

    async fn artist_ids(&self, album_id: i64) -> Result<Vec<i64>> {
        let ids = query_scalar::<_, i64>(
            "SELECT artist_id FROM album_artists WHERE album_id = ? ORDER BY artist_id ASC",
        )
        .bind(album_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn artist_names(&self, album_id: i64) -> Result<Vec<String>> {
        let names = query_scalar::<_, String>(
            "SELECT a.name FROM album_artists aa \
             INNER JOIN artists a ON a.id = aa.artist_id \
             WHERE aa.album_id = ? \
             ORDER BY aa.artist_order ASC",
        )
        .bind(album_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(names)
    }

    async fn missing_fingerprint(&self) -> Result<Vec<AlbumFingerprintRow>> {
        let rows = query_as::<_, AlbumFingerprintRow>(
            "SELECT id, name, album_type FROM albums WHERE fingerprint IS NULL ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn set_fingerprint(&self, id: i64, fingerprint: &str) -> Result<()> {
        let result = query("UPDATE albums SET fingerprint = ? WHERE id = ?")
            .bind(fingerprint)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::NotFound {
                entity_type: "Album".to_string(),
                id,
            });
        }

        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = query_scalar("SELECT COUNT(*) FROM albums")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
