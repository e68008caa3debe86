//! # Guarded Mutation Service
//!
//! The write path for library entities. Every identity-field mutation runs
//! inside one transaction that also evaluates the duplicate and integrity
//! predicates, so a check can never be invalidated between read and write.
//! Fingerprints are recomputed from the current related-entity names within
//! the same transaction; soft-state changes (favorites, play statistics)
//! never touch fingerprint inputs.
//!
//! The service holds the pool handle explicitly and is constructed once at
//! startup; there is no global store registry.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dedup::is_duplicate_album;
use crate::error::{LibraryError, Result};
use crate::fingerprint::{
    album_fingerprint, artist_fingerprint, playlist_fingerprint, song_fingerprint,
};
use crate::integrity::{has_album_artist_conflict, has_artist_deletion_conflict};
use crate::models::{Album, Artist, NewAlbum, NewArtist, NewPlaylist, NewSong, Playlist, Song};
use crate::normalize::normalize;

/// Library mutation service over a single local store.
pub struct LibraryService {
    pool: SqlitePool,
}

impl LibraryService {
    /// Create a new service over the given pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The underlying pool handle
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ------------------------------------------------------------------
    // Artists
    // ------------------------------------------------------------------

    /// Insert a new artist with its fingerprint computed from the name.
    pub async fn insert_artist(&self, new: NewArtist) -> Result<Artist> {
        new.validate().map_err(|e| LibraryError::InvalidInput {
            field: "Artist".to_string(),
            message: e,
        })?;

        let now = chrono::Utc::now().timestamp();
        let artist = sqlx::query_as::<_, Artist>(
            "INSERT INTO artists \
             (uuid, name, normalized_name, thumbnail, fingerprint, is_favorite, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING *",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&new.name)
        .bind(normalize(&new.name))
        .bind(&new.thumbnail)
        .bind(artist_fingerprint(&new.name))
        .bind(new.is_favorite)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        debug!(artist_id = artist.id, "Inserted artist");
        Ok(artist)
    }

    /// Update an artist.
    ///
    /// Renaming refreshes not only the artist's own fingerprint but also
    /// the fingerprints of every album and song crediting the artist,
    /// since those digests hash current artist names.
    pub async fn update_artist(&self, id: i64, new: NewArtist) -> Result<Artist> {
        new.validate().map_err(|e| LibraryError::InvalidInput {
            field: "Artist".to_string(),
            message: e,
        })?;

        let mut tx = self.pool.begin().await?;

        let artist = sqlx::query_as::<_, Artist>(
            "UPDATE artists \
             SET name = ?, normalized_name = ?, thumbnail = ?, fingerprint = ?, \
                 is_favorite = ?, updated_at = ? \
             WHERE id = ? \
             RETURNING *",
        )
        .bind(&new.name)
        .bind(normalize(&new.name))
        .bind(&new.thumbnail)
        .bind(artist_fingerprint(&new.name))
        .bind(new.is_favorite)
        .bind(chrono::Utc::now().timestamp())
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(LibraryError::NotFound {
            entity_type: "Artist".to_string(),
            id,
        })?;

        let album_ids: Vec<i64> =
            sqlx::query_scalar("SELECT album_id FROM album_artists WHERE artist_id = ?")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;
        for album_id in album_ids {
            refresh_album_fingerprint(&mut tx, album_id).await?;
        }

        let song_ids: Vec<i64> =
            sqlx::query_scalar("SELECT song_id FROM song_artists WHERE artist_id = ?")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;
        for song_id in song_ids {
            refresh_song_fingerprint(&mut tx, song_id).await?;
        }

        tx.commit().await?;
        Ok(artist)
    }

    /// Delete an artist unless it is the structural link between a song
    /// and that song's album.
    ///
    /// Albums and songs that credited the artist lose a name from their
    /// fingerprint input, so their digests are refreshed in the same
    /// transaction.
    pub async fn delete_artist(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        if has_artist_deletion_conflict(&mut tx, id).await? {
            warn!(artist_id = id, "Refusing artist deletion: structural conflict");
            return Err(LibraryError::ArtistDeletionConflict { artist_id: id });
        }

        let album_ids: Vec<i64> =
            sqlx::query_scalar("SELECT album_id FROM album_artists WHERE artist_id = ?")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;
        let song_ids: Vec<i64> =
            sqlx::query_scalar("SELECT song_id FROM song_artists WHERE artist_id = ?")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        let result = sqlx::query("DELETE FROM artists WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for album_id in album_ids {
            refresh_album_fingerprint(&mut tx, album_id).await?;
        }
        for song_id in song_ids {
            refresh_song_fingerprint(&mut tx, song_id).await?;
        }

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------
    // Albums
    // ------------------------------------------------------------------

    /// Insert a new album after duplicate detection.
    ///
    /// `artist_ids` is the credit order; the fingerprint input is sorted
    /// independently.
    pub async fn insert_album(&self, new: NewAlbum, artist_ids: &[i64]) -> Result<Album> {
        new.validate().map_err(|e| LibraryError::InvalidInput {
            field: "Album".to_string(),
            message: e,
        })?;

        let mut tx = self.pool.begin().await?;

        if is_duplicate_album(&mut tx, &new.name, new.album_type, artist_ids, None).await? {
            warn!(name = %new.name, "Refusing album insert: duplicate");
            return Err(LibraryError::DuplicateAlbum {
                name: new.name,
                album_type: new.album_type.as_str().to_string(),
            });
        }

        let artist_names = artist_names_by_ids(&mut tx, artist_ids).await?;
        let fingerprint = album_fingerprint(&new.name, new.album_type, &artist_names);

        let now = chrono::Utc::now().timestamp();
        let album = sqlx::query_as::<_, Album>(
            "INSERT INTO albums \
             (uuid, name, normalized_name, thumbnail, release_year, album_type, fingerprint, \
              is_favorite, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING *",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&new.name)
        .bind(normalize(&new.name))
        .bind(&new.thumbnail)
        .bind(new.release_year)
        .bind(new.album_type)
        .bind(fingerprint)
        .bind(new.is_favorite)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        link_album_artists(&mut tx, album.id, artist_ids).await?;

        tx.commit().await?;
        debug!(album_id = album.id, "Inserted album");
        Ok(album)
    }

    /// Update an album and replace its artist roster.
    ///
    /// Refused when the result would duplicate another album, or when an
    /// artist being removed from the roster is still credited on songs of
    /// this album.
    pub async fn update_album(&self, id: i64, new: NewAlbum, artist_ids: &[i64]) -> Result<Album> {
        new.validate().map_err(|e| LibraryError::InvalidInput {
            field: "Album".to_string(),
            message: e,
        })?;

        let mut tx = self.pool.begin().await?;

        if is_duplicate_album(&mut tx, &new.name, new.album_type, artist_ids, Some(id)).await? {
            warn!(album_id = id, "Refusing album update: duplicate");
            return Err(LibraryError::DuplicateAlbum {
                name: new.name,
                album_type: new.album_type.as_str().to_string(),
            });
        }

        let current_artist_ids: Vec<i64> =
            sqlx::query_scalar("SELECT artist_id FROM album_artists WHERE album_id = ?")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;
        let removed: Vec<i64> = current_artist_ids
            .iter()
            .copied()
            .filter(|artist_id| !artist_ids.contains(artist_id))
            .collect();

        if has_album_artist_conflict(&mut tx, id, &removed).await? {
            warn!(album_id = id, "Refusing album update: artist roster conflict");
            return Err(LibraryError::AlbumArtistConflict { album_id: id });
        }

        let artist_names = artist_names_by_ids(&mut tx, artist_ids).await?;
        let fingerprint = album_fingerprint(&new.name, new.album_type, &artist_names);

        let album = sqlx::query_as::<_, Album>(
            "UPDATE albums \
             SET name = ?, normalized_name = ?, thumbnail = ?, release_year = ?, \
                 album_type = ?, fingerprint = ?, is_favorite = ?, updated_at = ? \
             WHERE id = ? \
             RETURNING *",
        )
        .bind(&new.name)
        .bind(normalize(&new.name))
        .bind(&new.thumbnail)
        .bind(new.release_year)
        .bind(new.album_type)
        .bind(fingerprint)
        .bind(new.is_favorite)
        .bind(chrono::Utc::now().timestamp())
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(LibraryError::NotFound {
            entity_type: "Album".to_string(),
            id,
        })?;

        sqlx::query("DELETE FROM album_artists WHERE album_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        link_album_artists(&mut tx, id, artist_ids).await?;

        // Songs of this album hash its name; keep them in step.
        let song_ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM songs WHERE album_id = ?")
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;
        for song_id in song_ids {
            refresh_song_fingerprint(&mut tx, song_id).await?;
        }

        tx.commit().await?;
        Ok(album)
    }

    /// Delete an album; its songs become album-less via the foreign key
    /// and their fingerprints drop the album name in the same transaction.
    pub async fn delete_album(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let song_ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM songs WHERE album_id = ?")
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM albums WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for song_id in song_ids {
            refresh_song_fingerprint(&mut tx, song_id).await?;
        }

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------
    // Playlists
    // ------------------------------------------------------------------

    /// Insert a new playlist with its fingerprint computed from the name.
    pub async fn insert_playlist(&self, new: NewPlaylist) -> Result<Playlist> {
        new.validate().map_err(|e| LibraryError::InvalidInput {
            field: "Playlist".to_string(),
            message: e,
        })?;

        let now = chrono::Utc::now().timestamp();
        let playlist = sqlx::query_as::<_, Playlist>(
            "INSERT INTO playlists \
             (uuid, name, normalized_name, thumbnail, fingerprint, is_favorite, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING *",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&new.name)
        .bind(normalize(&new.name))
        .bind(&new.thumbnail)
        .bind(playlist_fingerprint(&new.name))
        .bind(new.is_favorite)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        debug!(playlist_id = playlist.id, "Inserted playlist");
        Ok(playlist)
    }

    /// Update a playlist, recomputing its fingerprint from the new name.
    pub async fn update_playlist(&self, id: i64, new: NewPlaylist) -> Result<Playlist> {
        new.validate().map_err(|e| LibraryError::InvalidInput {
            field: "Playlist".to_string(),
            message: e,
        })?;

        let playlist = sqlx::query_as::<_, Playlist>(
            "UPDATE playlists \
             SET name = ?, normalized_name = ?, thumbnail = ?, fingerprint = ?, \
                 is_favorite = ?, updated_at = ? \
             WHERE id = ? \
             RETURNING *",
        )
        .bind(&new.name)
        .bind(normalize(&new.name))
        .bind(&new.thumbnail)
        .bind(playlist_fingerprint(&new.name))
        .bind(new.is_favorite)
        .bind(chrono::Utc::now().timestamp())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(LibraryError::NotFound {
            entity_type: "Playlist".to_string(),
            id,
        })?;

        Ok(playlist)
    }

    /// Delete a playlist and its membership rows.
    pub async fn delete_playlist(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM playlists WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------
    // Songs
    // ------------------------------------------------------------------

    /// Insert a new song with at least one credited artist.
    ///
    /// The fingerprint hashes the current names of the given artists and
    /// the referenced album, resolved inside the insert transaction.
    pub async fn insert_song(&self, new: NewSong, artist_ids: &[i64]) -> Result<Song> {
        new.validate().map_err(|e| LibraryError::InvalidInput {
            field: "Song".to_string(),
            message: e,
        })?;

        if artist_ids.is_empty() {
            return Err(LibraryError::InvalidInput {
                field: "Song".to_string(),
                message: "A song requires at least one artist".to_string(),
            });
        }

        let mut tx = self.pool.begin().await?;

        let artist_names = artist_names_by_ids(&mut tx, artist_ids).await?;
        let album_name = match new.album_id {
            Some(album_id) => album_name(&mut tx, album_id).await?,
            None => None,
        };
        let fingerprint = song_fingerprint(
            &new.name,
            new.duration,
            &artist_names,
            album_name.as_deref(),
        );

        let now = chrono::Utc::now().timestamp();
        let song = sqlx::query_as::<_, Song>(
            "INSERT INTO songs \
             (uuid, name, normalized_name, thumbnail, duration, release_year, album_id, \
              fingerprint, is_favorite, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING *",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&new.name)
        .bind(normalize(&new.name))
        .bind(&new.thumbnail)
        .bind(new.duration)
        .bind(new.release_year)
        .bind(new.album_id)
        .bind(fingerprint)
        .bind(new.is_favorite)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        link_song_artists(&mut tx, song.id, artist_ids).await?;

        tx.commit().await?;
        debug!(song_id = song.id, "Inserted song");
        Ok(song)
    }

    /// Update a song, replacing its artist roster and recomputing the
    /// fingerprint from the new identity fields.
    pub async fn update_song(&self, id: i64, new: NewSong, artist_ids: &[i64]) -> Result<Song> {
        new.validate().map_err(|e| LibraryError::InvalidInput {
            field: "Song".to_string(),
            message: e,
        })?;

        if artist_ids.is_empty() {
            return Err(LibraryError::InvalidInput {
                field: "Song".to_string(),
                message: "A song requires at least one artist".to_string(),
            });
        }

        let mut tx = self.pool.begin().await?;

        let artist_names = artist_names_by_ids(&mut tx, artist_ids).await?;
        let album_name = match new.album_id {
            Some(album_id) => album_name(&mut tx, album_id).await?,
            None => None,
        };
        let fingerprint = song_fingerprint(
            &new.name,
            new.duration,
            &artist_names,
            album_name.as_deref(),
        );

        let song = sqlx::query_as::<_, Song>(
            "UPDATE songs \
             SET name = ?, normalized_name = ?, thumbnail = ?, duration = ?, release_year = ?, \
                 album_id = ?, fingerprint = ?, is_favorite = ?, updated_at = ? \
             WHERE id = ? \
             RETURNING *",
        )
        .bind(&new.name)
        .bind(normalize(&new.name))
        .bind(&new.thumbnail)
        .bind(new.duration)
        .bind(new.release_year)
        .bind(new.album_id)
        .bind(fingerprint)
        .bind(new.is_favorite)
        .bind(chrono::Utc::now().timestamp())
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(LibraryError::NotFound {
            entity_type: "Song".to_string(),
            id,
        })?;

        sqlx::query("DELETE FROM song_artists WHERE song_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        link_song_artists(&mut tx, id, artist_ids).await?;

        tx.commit().await?;
        Ok(song)
    }

    /// Delete a song; artist and playlist links cascade.
    pub async fn delete_song(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM songs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Flip a song's favorite flag. Does not touch fingerprint inputs.
    pub async fn toggle_song_favorite(&self, id: i64) -> Result<Song> {
        let song = sqlx::query_as::<_, Song>(
            "UPDATE songs SET is_favorite = NOT is_favorite WHERE id = ? RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(LibraryError::NotFound {
            entity_type: "Song".to_string(),
            id,
        })?;

        Ok(song)
    }

    /// Record a playback of a song. Does not touch fingerprint inputs.
    pub async fn record_play(&self, id: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE songs SET play_count = play_count + 1, last_played_at = ? WHERE id = ?",
        )
        .bind(chrono::Utc::now().timestamp())
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
}

// ----------------------------------------------------------------------
// Transaction-scoped helpers
// ----------------------------------------------------------------------

async fn artist_names_by_ids(conn: &mut SqliteConnection, ids: &[i64]) -> Result<Vec<String>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("SELECT name FROM artists WHERE id IN ({placeholders})");

    let mut q = sqlx::query_scalar::<_, String>(&sql);
    for id in ids {
        q = q.bind(id);
    }

    Ok(q.fetch_all(&mut *conn).await?)
}

async fn album_name(conn: &mut SqliteConnection, album_id: i64) -> Result<Option<String>> {
    let name = sqlx::query_scalar::<_, String>("SELECT name FROM albums WHERE id = ?")
        .bind(album_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(name)
}

async fn link_song_artists(
    conn: &mut SqliteConnection,
    song_id: i64,
    artist_ids: &[i64],
) -> Result<()> {
    for (order, artist_id) in artist_ids.iter().enumerate() {
        sqlx::query(
            "INSERT INTO song_artists (song_id, artist_id, artist_order) VALUES (?, ?, ?) \
             ON CONFLICT (song_id, artist_id) DO NOTHING",
        )
        .bind(song_id)
        .bind(artist_id)
        .bind(order as i64)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

async fn link_album_artists(
    conn: &mut SqliteConnection,
    album_id: i64,
    artist_ids: &[i64],
) -> Result<()> {
    for (order, artist_id) in artist_ids.iter().enumerate() {
        sqlx::query(
            "INSERT INTO album_artists (album_id, artist_id, artist_order) VALUES (?, ?, ?) \
             ON CONFLICT (album_id, artist_id) DO NOTHING",
        )
        .bind(album_id)
        .bind(artist_id)
        .bind(order as i64)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Recompute one album's fingerprint from its current name, type, and
/// credited artist names.
async fn refresh_album_fingerprint(conn: &mut SqliteConnection, album_id: i64) -> Result<()> {
    let row: Option<(String, crate::models::AlbumType)> =
        sqlx::query_as("SELECT name, album_type FROM albums WHERE id = ?")
            .bind(album_id)
            .fetch_optional(&mut *conn)
            .await?;

    let Some((name, album_type)) = row else {
        return Ok(());
    };

    let names: Vec<String> = sqlx::query_scalar(
        "SELECT a.name FROM album_artists aa \
         INNER JOIN artists a ON a.id = aa.artist_id \
         WHERE aa.album_id = ?",
    )
    .bind(album_id)
    .fetch_all(&mut *conn)
    .await?;

    sqlx::query("UPDATE albums SET fingerprint = ? WHERE id = ?")
        .bind(album_fingerprint(&name, album_type, &names))
        .bind(album_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Recompute one song's fingerprint from its current name, duration,
/// credited artist names, and album name.
async fn refresh_song_fingerprint(conn: &mut SqliteConnection, song_id: i64) -> Result<()> {
    let row: Option<(String, i64, Option<i64>)> =
        sqlx::query_as("SELECT name, duration, album_id FROM songs WHERE id = ?")
            .bind(song_id)
            .fetch_optional(&mut *conn)
            .await?;

    let Some((name, duration, album_id)) = row else {
        return Ok(());
    };

    let names: Vec<String> = sqlx::query_scalar(
        "SELECT a.name FROM song_artists sa \
         INNER JOIN artists a ON a.id = sa.artist_id \
         WHERE sa.song_id = ?",
    )
    .bind(song_id)
    .fetch_all(&mut *conn)
    .await?;

    let album = match album_id {
        Some(album_id) => album_name(&mut *conn, album_id).await?,
        None => None,
    };

    sqlx::query("UPDATE songs SET fingerprint = ? WHERE id = ?")
        .bind(song_fingerprint(&name, duration, &names, album.as_deref()))
        .bind(song_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}
