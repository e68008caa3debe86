//! # Export Data Shape
//!
//! Materializes songs with their full relational context for export or
//! synchronization: each song carries its own fields plus its album (with
//! the album's credited artists) and its own credited artists. Artists
//! appear in stored credit order; the fingerprint's sorted hashing order
//! never leaks into this shape.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use core_library::models::AlbumType;
use core_library::repositories::{SongRepository, SqliteSongRepository};

use crate::error::Result;

/// Artist entry as exposed in export payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ArtistForExport {
    pub id: i64,
    pub name: String,
    pub thumbnail: Option<String>,
}

/// Album context nested under an exported song.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumForExport {
    pub id: i64,
    pub name: String,
    pub thumbnail: Option<String>,
    pub release_year: Option<i64>,
    pub album_type: AlbumType,
    /// Credited artists in credit order
    pub artists: Vec<ArtistForExport>,
}

/// A song with its full relational context for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongForExport {
    pub id: i64,
    pub name: String,
    pub thumbnail: Option<String>,
    pub duration: i64,
    pub release_year: Option<i64>,
    pub album: Option<AlbumForExport>,
    /// Credited artists in credit order
    pub artists: Vec<ArtistForExport>,
}

/// Fetch every song with nested album and artist data.
pub async fn all_songs_for_export(pool: &SqlitePool) -> Result<Vec<SongForExport>> {
    let song_repo = SqliteSongRepository::new(pool.clone());
    let songs = song_repo.all().await?;

    let mut exported = Vec::with_capacity(songs.len());
    for song in songs {
        let artists = song_artists_for_export(pool, song.id).await?;

        let album = match song.album_id {
            Some(album_id) => album_for_export(pool, album_id).await?,
            None => None,
        };

        exported.push(SongForExport {
            id: song.id,
            name: song.name,
            thumbnail: song.thumbnail,
            duration: song.duration,
            release_year: song.release_year,
            album,
            artists,
        });
    }

    Ok(exported)
}

async fn song_artists_for_export(pool: &SqlitePool, song_id: i64) -> Result<Vec<ArtistForExport>> {
    let artists = sqlx::query_as::<_, ArtistForExport>(
        "SELECT a.id, a.name, a.thumbnail FROM song_artists sa \
         INNER JOIN artists a ON a.id = sa.artist_id \
         WHERE sa.song_id = ? \
         ORDER BY sa.artist_order ASC",
    )
    .bind(song_id)
    .fetch_all(pool)
    .await?;

    Ok(artists)
}

async fn album_for_export(pool: &SqlitePool, album_id: i64) -> Result<Option<AlbumForExport>> {
    let row: Option<(i64, String, Option<String>, Option<i64>, AlbumType)> = sqlx::query_as(
        "SELECT id, name, thumbnail, release_year, album_type FROM albums WHERE id = ?",
    )
    .bind(album_id)
    .fetch_optional(pool)
    .await?;

    let Some((id, name, thumbnail, release_year, album_type)) = row else {
        return Ok(None);
    };

    let artists = sqlx::query_as::<_, ArtistForExport>(
        "SELECT a.id, a.name, a.thumbnail FROM album_artists aa \
         INNER JOIN artists a ON a.id = aa.artist_id \
         WHERE aa.album_id = ? \
         ORDER BY aa.artist_order ASC",
    )
    .bind(album_id)
    .fetch_all(pool)
    .await?;

    Ok(Some(AlbumForExport {
        id,
        name,
        thumbnail,
        release_year,
        album_type,
        artists,
    }))
}
