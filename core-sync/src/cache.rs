//! # Entity Cache
//!
//! Fingerprint-to-id lookup maps used while merging an export bundle into
//! a local store. Pre-populated once per sync session so resolving an
//! incoming entity to a local row never repeats a database lookup.

use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::debug;

use crate::error::Result;

/// Caches fingerprint→id mappings for artists, albums, and playlists.
#[derive(Debug, Default)]
pub struct EntityCache {
    artists: HashMap<String, i64>,
    albums: HashMap<String, i64>,
    playlists: HashMap<String, i64>,
}

impl EntityCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the cache from every row with a known fingerprint.
    ///
    /// Selects only the id and fingerprint columns.
    pub async fn initialize(pool: &SqlitePool) -> Result<Self> {
        let mut cache = Self::new();

        let artists: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, fingerprint FROM artists WHERE fingerprint IS NOT NULL")
                .fetch_all(pool)
                .await?;
        for (id, fingerprint) in artists {
            cache.artists.insert(fingerprint, id);
        }

        let albums: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, fingerprint FROM albums WHERE fingerprint IS NOT NULL")
                .fetch_all(pool)
                .await?;
        for (id, fingerprint) in albums {
            cache.albums.insert(fingerprint, id);
        }

        let playlists: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, fingerprint FROM playlists WHERE fingerprint IS NOT NULL")
                .fetch_all(pool)
                .await?;
        for (id, fingerprint) in playlists {
            cache.playlists.insert(fingerprint, id);
        }

        debug!(
            artists = cache.artists.len(),
            albums = cache.albums.len(),
            playlists = cache.playlists.len(),
            "Entity cache initialized"
        );
        Ok(cache)
    }

    /// Look up a cached artist id by fingerprint
    pub fn artist(&self, fingerprint: &str) -> Option<i64> {
        self.artists.get(fingerprint).copied()
    }

    /// Record an artist inserted during this session
    pub fn add_artist(&mut self, fingerprint: impl Into<String>, id: i64) {
        self.artists.insert(fingerprint.into(), id);
    }

    /// Look up a cached album id by fingerprint
    pub fn album(&self, fingerprint: &str) -> Option<i64> {
        self.albums.get(fingerprint).copied()
    }

    /// Record an album inserted during this session
    pub fn add_album(&mut self, fingerprint: impl Into<String>, id: i64) {
        self.albums.insert(fingerprint.into(), id);
    }

    /// Look up a cached playlist id by fingerprint
    pub fn playlist(&self, fingerprint: &str) -> Option<i64> {
        self.playlists.get(fingerprint).copied()
    }

    /// Record a playlist inserted during this session
    pub fn add_playlist(&mut self, fingerprint: impl Into<String>, id: i64) {
        self.playlists.insert(fingerprint.into(), id);
    }

    /// Drop all cached entries. Called when the sync session completes.
    pub fn clear(&mut self) {
        self.artists.clear();
        self.albums.clear();
        self.playlists.clear();
    }
}
