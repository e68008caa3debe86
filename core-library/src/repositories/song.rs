//! Song repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::Song;
use async_trait::async_trait;
use sqlx::{query, query_as, query_scalar, FromRow, SqlitePool};

/// Identity projection for songs whose fingerprint is still unset.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct SongFingerprintRow {
    pub id: i64,
    pub name: String,
    pub duration: i64,
    pub album_id: Option<i64>,
}

/// Song repository interface for data access operations
#[async_trait]
pub trait SongRepository: Send + Sync {
    /// Find a song by its ID
    ///
    /// # Returns
    /// - `Ok(Some(song))` if found
    /// - `Ok(None)` if not found
    /// - `Err` if database error occurs
    async fn find_by_id(&self, id: i64) -> Result<Option<Song>>;

    /// All songs, ordered by id
    async fn all(&self) -> Result<Vec<Song>>;

    /// Songs assigned to an album, ordered by id
    async fn query_by_album(&self, album_id: i64) -> Result<Vec<Song>>;

    /// Ids of the artists credited on a song, in credit order
    async fn artist_ids(&self, song_id: i64) -> Result<Vec<i64>>;

    /// Names of the artists credited on a song, in credit order
    async fn artist_names(&self, song_id: i64) -> Result<Vec<String>>;

    /// Songs missing a fingerprint, projected to identity fields only
    async fn missing_fingerprint(&self) -> Result<Vec<SongFingerprintRow>>;

    /// Persist a computed fingerprint for one song
    ///
    /// # Errors
    /// Returns `NotFound` if the song does not exist
    async fn set_fingerprint(&self, id: i64, fingerprint: &str) -> Result<()>;

    /// Count total songs
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of SongRepository
pub struct SqliteSongRepository {
    pool: SqlitePool,
}

impl SqliteSongRepository {
    /// Create a new SqliteSongRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SongRepository for SqliteSongRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Song>> {
        let song = query_as::<_, Song>("SELECT * FROM songs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(song)
    }

    async fn all(&self) -> Result<Vec<Song>> {
        let songs = query_as::<_, Song>("SELECT * FROM songs ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(songs)
    }

    async fn query_by_album(&self, album_id: i64) -> Result<Vec<Song>> {
        let songs = query_as::<_, Song>("SELECT * FROM songs WHERE album_id = ? ORDER BY id ASC")
            .bind(album_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(songs)
    }

    async fn artist_ids(&self, song_id: i64) -> Result<Vec<i64>> {
        let ids = query_scalar::<_, i64>(
            "SELECT artist_id FROM song_artists WHERE song_id = ? ORDER BY artist_order ASC",
        )
        .bind(song_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn artist_names(&self, song_id: i64) -> Result<Vec<String>> {
        let names = query_scalar::<_, String>(
            "SELECT a.name FROM song_artists sa \
             INNER JOIN artists a ON a.id = sa.artist_id \
             WHERE sa.song_id = ? \
             ORDER BY sa.artist_order ASC",
        )
        .bind(song_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(names)
    }

    async fn missing_fingerprint(&self) -> Result<Vec<SongFingerprintRow>> {
        let rows = query_as::<_, SongFingerprintRow>(
            "SELECT id, name, duration, album_id FROM songs \
             WHERE fingerprint IS NULL ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn set_fingerprint(&self, id: i64, fingerprint: &str) -> Result<()> {
        let result = query("UPDATE songs SET fingerprint = ? WHERE id = ?")
            .bind(fingerprint)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::NotFound {
                entity_type: "Song".to_string(),
                id,
            });
        }

        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = query_scalar("SELECT COUNT(*) FROM songs")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
