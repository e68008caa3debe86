//! # Import Write Path
//!
//! Inserts for entities received from another store's export bundle. The
//! producing side already computed each entity's fingerprint; these writes
//! persist it verbatim so both stores agree on identity, and the
//! `resolve_*` helpers use it (via the [`EntityCache`]) to merge without
//! creating duplicates. Link writes preserve the bundle's credit order.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use core_library::models::AlbumType;
use core_library::normalize::normalize;

use crate::cache::EntityCache;
use crate::error::Result;

/// Artist metadata received from an export bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedArtist {
    pub name: String,
    pub thumbnail: Option<String>,
    pub is_favorite: bool,
    pub fingerprint: String,
}

/// Album metadata received from an export bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedAlbum {
    pub name: String,
    pub thumbnail: Option<String>,
    pub release_year: Option<i64>,
    pub album_type: AlbumType,
    pub is_favorite: bool,
    pub fingerprint: String,
}

/// Playlist metadata received from an export bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedPlaylist {
    pub name: String,
    pub thumbnail: Option<String>,
    pub is_favorite: bool,
    pub fingerprint: String,
}

/// Song metadata received from an export bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedSong {
    pub name: String,
    pub thumbnail: Option<String>,
    pub duration: i64,
    pub release_year: Option<i64>,
    pub is_favorite: bool,
    pub fingerprint: String,
}

/// Insert a synced artist, returning its local id.
pub async fn insert_synced_artist(pool: &SqlitePool, data: &SyncedArtist) -> Result<i64> {
    let now = chrono::Utc::now().timestamp();
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO artists \
         (uuid, name, normalized_name, thumbnail, fingerprint, is_favorite, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
         RETURNING id",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&data.name)
    .bind(normalize(&data.name))
    .bind(&data.thumbnail)
    .bind(&data.fingerprint)
    .bind(data.is_favorite)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Insert a synced album, returning its local id.
pub async fn insert_synced_album(pool: &SqlitePool, data: &SyncedAlbum) -> Result<i64> {
    let now = chrono::Utc::now().timestamp();
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO albums \
         (uuid, name, normalized_name, thumbnail, release_year, album_type, fingerprint, \
          is_favorite, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         RETURNING id",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&data.name)
    .bind(normalize(&data.name))
    .bind(&data.thumbnail)
    .bind(data.release_year)
    .bind(data.album_type)
    .bind(&data.fingerprint)
    .bind(data.is_favorite)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Insert a synced playlist, returning its local id.
pub async fn insert_synced_playlist(pool: &SqlitePool, data: &SyncedPlaylist) -> Result<i64> {
    let now = chrono::Utc::now().timestamp();
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO playlists \
         (uuid, name, normalized_name, thumbnail, fingerprint, is_favorite, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
         RETURNING id",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&data.name)
    .bind(normalize(&data.name))
    .bind(&data.thumbnail)
    .bind(&data.fingerprint)
    .bind(data.is_favorite)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Insert a synced song, returning its local id.
///
/// `album_id` is the already-resolved local album, or `None` for a
/// standalone song.
pub async fn insert_synced_song(
    pool: &SqlitePool,
    data: &SyncedSong,
    album_id: Option<i64>,
) -> Result<i64> {
    let now = chrono::Utc::now().timestamp();
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO songs \
         (uuid, name, normalized_name, thumbnail, duration, release_year, album_id, \
          fingerprint, is_favorite, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         RETURNING id",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&data.name)
    .bind(normalize(&data.name))
    .bind(&data.thumbnail)
    .bind(data.duration)
    .bind(data.release_year)
    .bind(album_id)
    .bind(&data.fingerprint)
    .bind(data.is_favorite)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Link a song to its artists, preserving the given credit order.
///
/// Existing links are left untouched.
pub async fn link_song_to_artists(
    pool: &SqlitePool,
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
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Link an album to its artists, preserving the given credit order.
pub async fn link_album_to_artists(
    pool: &SqlitePool,
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
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Add a song to the given playlists.
pub async fn link_song_to_playlists(
    pool: &SqlitePool,
    song_id: i64,
    playlist_ids: &[i64],
) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    for playlist_id in playlist_ids {
        sqlx::query(
            "INSERT INTO playlist_songs (playlist_id, song_id, added_at) VALUES (?, ?, ?) \
             ON CONFLICT (playlist_id, song_id) DO NOTHING",
        )
        .bind(playlist_id)
        .bind(song_id)
        .bind(now)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Resolve an incoming artist to a local id, inserting on cache miss.
pub async fn resolve_artist(
    pool: &SqlitePool,
    cache: &mut EntityCache,
    data: &SyncedArtist,
) -> Result<i64> {
    if let Some(id) = cache.artist(&data.fingerprint) {
        return Ok(id);
    }

    let id = insert_synced_artist(pool, data).await?;
    cache.add_artist(data.fingerprint.clone(), id);
    debug!(artist_id = id, "Imported artist");
    Ok(id)
}

/// Resolve an incoming album to a local id, inserting on cache miss.
pub async fn resolve_album(
    pool: &SqlitePool,
    cache: &mut EntityCache,
    data: &SyncedAlbum,
) -> Result<i64> {
    if let Some(id) = cache.album(&data.fingerprint) {
        return Ok(id);
    }

    let id = insert_synced_album(pool, data).await?;
    cache.add_album(data.fingerprint.clone(), id);
    debug!(album_id = id, "Imported album");
    Ok(id)
}

/// Resolve an incoming playlist to a local id, inserting on cache miss.
pub async fn resolve_playlist(
    pool: &SqlitePool,
    cache: &mut EntityCache,
    data: &SyncedPlaylist,
) -> Result<i64> {
    if let Some(id) = cache.playlist(&data.fingerprint) {
        return Ok(id);
    }

    let id = insert_synced_playlist(pool, data).await?;
    cache.add_playlist(data.fingerprint.clone(), id);
    debug!(playlist_id = id, "Imported playlist");
    Ok(id)
}
