//! Playlist repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::Playlist;
use async_trait::async_trait;
use sqlx::{query, query_as, query_scalar, FromRow, SqlitePool};

/// Identity projection for playlists whose fingerprint is still unset.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct PlaylistFingerprintRow {
    pub id: i64,
    pub name: String,
}

/// Playlist repository interface for data access operations
#[async_trait]
pub trait PlaylistRepository: Send + Sync {
    /// Find a playlist by its ID
    ///
    /// # Returns
    /// - `Ok(Some(playlist))` if found
    /// - `Ok(None)` if not found
    /// - `Err` if database error occurs
    async fn find_by_id(&self, id: i64) -> Result<Option<Playlist>>;

    /// Add a song to a playlist
    ///
    /// Adding a song that is already present is a no-op.
    async fn add_song(&self, playlist_id: i64, song_id: i64) -> Result<()>;

    /// Remove a song from a playlist
    ///
    /// # Returns
    /// - `Ok(true)` if the membership row was deleted
    /// - `Ok(false)` if the song was not in the playlist
    async fn remove_song(&self, playlist_id: i64, song_id: i64) -> Result<bool>;

    /// Ids of the songs in a playlist
    async fn song_ids(&self, playlist_id: i64) -> Result<Vec<i64>>;

    /// Playlists missing a fingerprint, projected to identity fields only
    async fn missing_fingerprint(&self) -> Result<Vec<PlaylistFingerprintRow>>;

    /// Persist a computed fingerprint for one playlist
    ///
    /// # Errors
    /// Returns `NotFound` if the playlist does not exist
    async fn set_fingerprint(&self, id: i64, fingerprint: &str) -> Result<()>;

    /// Count total playlists
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of PlaylistRepository
pub struct SqlitePlaylistRepository {
    pool: SqlitePool,
}

impl SqlitePlaylistRepository {
    /// Create a new SqlitePlaylistRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlaylistRepository for SqlitePlaylistRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Playlist>> {
        let playlist = query_as::<_, Playlist>("SELECT * FROM playlists WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(playlist)
    }

    async fn add_song(&self, playlist_id: i64, song_id: i64) -> Result<()> {
        query(
            "INSERT INTO playlist_songs (playlist_id, song_id, added_at) VALUES (?, ?, ?) \
             ON CONFLICT (playlist_id, song_id) DO NOTHING",
        )
        .bind(playlist_id)
        .bind(song_id)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_song(&self, playlist_id: i64, song_id: i64) -> Result<bool> {
        let result = query("DELETE FROM playlist_songs WHERE playlist_id = ? AND song_id = ?")
            .bind(playlist_id)
            .bind(song_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn song_ids(&self, playlist_id: i64) -> Result<Vec<i64>> {
        let ids = query_scalar::<_, i64>(
            "SELECT song_id FROM playlist_songs WHERE playlist_id = ? ORDER BY added_at ASC, song_id ASC",
        )
        .bind(playlist_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn missing_fingerprint(&self) -> Result<Vec<PlaylistFingerprintRow>> {
        let rows = query_as::<_, PlaylistFingerprintRow>(
            "SELECT id, name FROM playlists WHERE fingerprint IS NULL ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn set_fingerprint(&self, id: i64, fingerprint: &str) -> Result<()> {
        let result = query("UPDATE playlists SET fingerprint = ? WHERE id = ?")
            .bind(fingerprint)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::NotFound {
                entity_type: "Playlist".to_string(),
                id,
            });
        }

        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = query_scalar("SELECT COUNT(*) FROM playlists")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::models::{NewPlaylist, NewSong};
    use crate::service::LibraryService;
    use crate::models::NewArtist;

    fn playlist(name: &str) -> NewPlaylist {
        NewPlaylist {
            name: name.to_string(),
            thumbnail: None,
            is_favorite: false,
        }
    }

    fn standalone_song(name: &str) -> NewSong {
        NewSong {
            name: name.to_string(),
            thumbnail: None,
            duration: 200,
            release_year: None,
            album_id: None,
            standalone: true,
            is_favorite: false,
        }
    }

    #[tokio::test]
    async fn test_song_membership_roundtrip() {
        let pool = create_test_pool().await.unwrap();
        let service = LibraryService::new(pool.clone());
        let repo = SqlitePlaylistRepository::new(pool);

        let a = service
            .insert_artist(NewArtist {
                name: "A".to_string(),
                thumbnail: None,
                is_favorite: false,
            })
            .await
            .unwrap();
        let p = service.insert_playlist(playlist("Mix")).await.unwrap();
        let s = service
            .insert_song(standalone_song("Track"), &[a.id])
            .await
            .unwrap();

        repo.add_song(p.id, s.id).await.unwrap();
        // Duplicate add is a no-op
        repo.add_song(p.id, s.id).await.unwrap();
        assert_eq!(repo.song_ids(p.id).await.unwrap(), vec![s.id]);

        assert!(repo.remove_song(p.id, s.id).await.unwrap());
        assert!(!repo.remove_song(p.id, s.id).await.unwrap());
        assert!(repo.song_ids(p.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let pool = create_test_pool().await.unwrap();
        let service = LibraryService::new(pool.clone());
        let repo = SqlitePlaylistRepository::new(pool);

        let p = service.insert_playlist(playlist("Road Trip")).await.unwrap();
        let found = repo.find_by_id(p.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Road Trip");
        assert!(found.fingerprint.is_some());
    }
}
