//! # Fingerprint Backfill Job
//!
//! Brings a store that predates the fingerprint column up to date: every
//! row with a null fingerprint gets one computed from its current identity
//! fields and persisted as an independent single-row update.
//!
//! ## Ordering
//!
//! Entity classes are processed as artists, then albums, then playlists,
//! then songs. Album and song fingerprints hash the current names of their
//! linked artists (and the album name, for songs), joined out at read time
//! rather than taken from any cache, so the digest always reflects live
//! related-entity state.
//!
//! ## Failure and cancellation
//!
//! Each row is an independent read-compute-write; a store error aborts the
//! job without rolling back rows already written. The job checks its
//! cancellation token between rows and returns a partial report instead of
//! leaving a row half-written (the fingerprint is a single scalar column,
//! so per-row writes are atomic anyway).

use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use core_library::fingerprint::{
    album_fingerprint, artist_fingerprint, playlist_fingerprint, song_fingerprint,
};
use core_library::repositories::{
    AlbumRepository, ArtistRepository, PlaylistRepository, SongRepository,
    SqliteAlbumRepository, SqliteArtistRepository, SqlitePlaylistRepository,
    SqliteSongRepository,
};

use crate::error::Result;

/// Counts of fingerprints written per entity class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackfillReport {
    pub artists: u64,
    pub albums: u64,
    pub playlists: u64,
    pub songs: u64,
    /// True when the job stopped early on its cancellation token.
    pub cancelled: bool,
}

impl BackfillReport {
    /// Total fingerprints written across all entity classes.
    pub fn total(&self) -> u64 {
        self.artists + self.albums + self.playlists + self.songs
    }
}

/// Batch job computing fingerprints for rows that lack one.
pub struct BackfillJob {
    pool: SqlitePool,
    cancellation_token: CancellationToken,
}

impl BackfillJob {
    /// Create a job over the given pool
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Create a job that stops between rows once `token` is cancelled
    pub fn with_cancellation(pool: SqlitePool, token: CancellationToken) -> Self {
        Self {
            pool,
            cancellation_token: token,
        }
    }

    /// Run the backfill. Idempotent: a second run finds nothing to do.
    pub async fn run(&self) -> Result<BackfillReport> {
        info!("Starting fingerprint backfill");
        let mut report = BackfillReport::default();

        let artists = SqliteArtistRepository::new(self.pool.clone());
        let albums = SqliteAlbumRepository::new(self.pool.clone());
        let playlists = SqlitePlaylistRepository::new(self.pool.clone());
        let songs = SqliteSongRepository::new(self.pool.clone());

        for row in artists.missing_fingerprint().await? {
            if self.cancellation_token.is_cancelled() {
                return Ok(self.cancelled(report));
            }

            artists
                .set_fingerprint(row.id, &artist_fingerprint(&row.name))
                .await?;
            report.artists += 1;
        }

        for row in albums.missing_fingerprint().await? {
            if self.cancellation_token.is_cancelled() {
                return Ok(self.cancelled(report));
            }

            let artist_names = albums.artist_names(row.id).await?;
            albums
                .set_fingerprint(
                    row.id,
                    &album_fingerprint(&row.name, row.album_type, &artist_names),
                )
                .await?;
            report.albums += 1;
        }

        for row in playlists.missing_fingerprint().await? {
            if self.cancellation_token.is_cancelled() {
                return Ok(self.cancelled(report));
            }

            playlists
                .set_fingerprint(row.id, &playlist_fingerprint(&row.name))
                .await?;
            report.playlists += 1;
        }

        for row in songs.missing_fingerprint().await? {
            if self.cancellation_token.is_cancelled() {
                return Ok(self.cancelled(report));
            }

            let artist_names = songs.artist_names(row.id).await?;
            let album_name = match row.album_id {
                Some(album_id) => albums.find_by_id(album_id).await?.map(|a| a.name),
                None => None,
            };

            songs
                .set_fingerprint(
                    row.id,
                    &song_fingerprint(
                        &row.name,
                        row.duration,
                        &artist_names,
                        album_name.as_deref(),
                    ),
                )
                .await?;
            report.songs += 1;
        }

        info!(
            artists = report.artists,
            albums = report.albums,
            playlists = report.playlists,
            songs = report.songs,
            "Fingerprint backfill completed"
        );
        Ok(report)
    }

    fn cancelled(&self, mut report: BackfillReport) -> BackfillReport {
        debug!(written = report.total(), "Fingerprint backfill cancelled");
        report.cancelled = true;
        report
    }
}
