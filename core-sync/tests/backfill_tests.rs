//! Integration tests for the fingerprint backfill job
//!
//! These tests verify the complete backfill workflow including:
//! - Dependency-ordered processing (artists, albums, playlists, songs)
//! - Live related-entity name joins at fingerprint time
//! - Idempotence across repeated runs
//! - Cooperative cancellation with partial reporting

use core_library::db::create_test_pool;
use core_library::fingerprint::{
    album_fingerprint, artist_fingerprint, playlist_fingerprint, song_fingerprint,
};
use core_library::models::AlbumType;
use core_library::normalize::normalize;
use core_sync::BackfillJob;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

// ============================================================================
// Seed helpers: legacy rows written before the fingerprint column existed
// ============================================================================

async fn seed_artist(pool: &SqlitePool, name: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO artists (uuid, name, normalized_name, created_at, updated_at) \
         VALUES (?, ?, ?, 0, 0) RETURNING id",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(name)
    .bind(normalize(name))
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn seed_album(pool: &SqlitePool, name: &str, album_type: AlbumType) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO albums (uuid, name, normalized_name, album_type, created_at, updated_at) \
         VALUES (?, ?, ?, ?, 0, 0) RETURNING id",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(name)
    .bind(normalize(name))
    .bind(album_type)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn seed_playlist(pool: &SqlitePool, name: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO playlists (uuid, name, normalized_name, created_at, updated_at) \
         VALUES (?, ?, ?, 0, 0) RETURNING id",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(name)
    .bind(normalize(name))
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn seed_song(pool: &SqlitePool, name: &str, duration: i64, album_id: Option<i64>) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO songs (uuid, name, normalized_name, duration, album_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, 0, 0) RETURNING id",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(name)
    .bind(normalize(name))
    .bind(duration)
    .bind(album_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn link_album_artist(pool: &SqlitePool, album_id: i64, artist_id: i64, order: i64) {
    sqlx::query("INSERT INTO album_artists (album_id, artist_id, artist_order) VALUES (?, ?, ?)")
        .bind(album_id)
        .bind(artist_id)
        .bind(order)
        .execute(pool)
        .await
        .unwrap();
}

async fn link_song_artist(pool: &SqlitePool, song_id: i64, artist_id: i64, order: i64) {
    sqlx::query("INSERT INTO song_artists (song_id, artist_id, artist_order) VALUES (?, ?, ?)")
        .bind(song_id)
        .bind(artist_id)
        .bind(order)
        .execute(pool)
        .await
        .unwrap();
}

async fn fingerprint_of(pool: &SqlitePool, table: &str, id: i64) -> Option<String> {
    sqlx::query_scalar(&format!("SELECT fingerprint FROM {table} WHERE id = ?"))
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_backfill_populates_every_entity_class() {
    let pool = create_test_pool().await.unwrap();

    let lennon = seed_artist(&pool, "John Lennon").await;
    let mccartney = seed_artist(&pool, "Paul McCartney").await;
    let album = seed_album(&pool, "Abbey Road", AlbumType::Album).await;
    link_album_artist(&pool, album, lennon, 0).await;
    link_album_artist(&pool, album, mccartney, 1).await;
    let playlist = seed_playlist(&pool, "Favourites").await;
    let song = seed_song(&pool, "Come Together", 259, Some(album)).await;
    link_song_artist(&pool, song, lennon, 0).await;
    link_song_artist(&pool, song, mccartney, 1).await;

    let report = BackfillJob::new(pool.clone()).run().await.unwrap();
    assert_eq!(report.artists, 2);
    assert_eq!(report.albums, 1);
    assert_eq!(report.playlists, 1);
    assert_eq!(report.songs, 1);
    assert!(!report.cancelled);

    assert_eq!(
        fingerprint_of(&pool, "artists", lennon).await.as_deref(),
        Some(artist_fingerprint("John Lennon").as_str())
    );
    assert_eq!(
        fingerprint_of(&pool, "albums", album).await.as_deref(),
        Some(
            album_fingerprint(
                "Abbey Road",
                AlbumType::Album,
                &["John Lennon".to_string(), "Paul McCartney".to_string()],
            )
            .as_str()
        )
    );
    assert_eq!(
        fingerprint_of(&pool, "playlists", playlist).await.as_deref(),
        Some(playlist_fingerprint("Favourites").as_str())
    );
    assert_eq!(
        fingerprint_of(&pool, "songs", song).await.as_deref(),
        Some(
            song_fingerprint(
                "Come Together",
                259,
                &["John Lennon".to_string(), "Paul McCartney".to_string()],
                Some("Abbey Road"),
            )
            .as_str()
        )
    );
}

#[tokio::test]
async fn test_backfill_is_idempotent() {
    let pool = create_test_pool().await.unwrap();

    let artist = seed_artist(&pool, "Queen").await;
    let song = seed_song(&pool, "Bohemian Rhapsody", 354, None).await;
    link_song_artist(&pool, song, artist, 0).await;

    let first = BackfillJob::new(pool.clone()).run().await.unwrap();
    assert_eq!(first.total(), 2);
    let after_first = fingerprint_of(&pool, "songs", song).await;

    let second = BackfillJob::new(pool.clone()).run().await.unwrap();
    assert_eq!(second.total(), 0, "second run should find nothing to do");
    assert_eq!(fingerprint_of(&pool, "songs", song).await, after_first);
}

#[tokio::test]
async fn test_album_fingerprint_joins_live_artist_names() {
    let pool = create_test_pool().await.unwrap();

    let artist = seed_artist(&pool, "Prince").await;
    let album = seed_album(&pool, "Purple Rain", AlbumType::Album).await;
    link_album_artist(&pool, album, artist, 0).await;

    // Rename between seeding and backfilling: the digest must reflect the
    // name as read at fingerprint time, not as seeded.
    sqlx::query("UPDATE artists SET name = ? WHERE id = ?")
        .bind("The Artist")
        .bind(artist)
        .execute(&pool)
        .await
        .unwrap();

    BackfillJob::new(pool.clone()).run().await.unwrap();

    assert_eq!(
        fingerprint_of(&pool, "albums", album).await.as_deref(),
        Some(
            album_fingerprint("Purple Rain", AlbumType::Album, &["The Artist".to_string()])
                .as_str()
        )
    );
}

#[tokio::test]
async fn test_backfill_skips_rows_with_a_fingerprint() {
    let pool = create_test_pool().await.unwrap();

    let artist = seed_artist(&pool, "Kept").await;
    sqlx::query("UPDATE artists SET fingerprint = ? WHERE id = ?")
        .bind("preexisting-digest")
        .bind(artist)
        .execute(&pool)
        .await
        .unwrap();

    let report = BackfillJob::new(pool.clone()).run().await.unwrap();
    assert_eq!(report.artists, 0);
    assert_eq!(
        fingerprint_of(&pool, "artists", artist).await.as_deref(),
        Some("preexisting-digest")
    );
}

#[tokio::test]
async fn test_standalone_song_hashes_the_album_sentinel() {
    let pool = create_test_pool().await.unwrap();

    let artist = seed_artist(&pool, "Solo").await;
    let song = seed_song(&pool, "Loose Track", 120, None).await;
    link_song_artist(&pool, song, artist, 0).await;

    BackfillJob::new(pool.clone()).run().await.unwrap();

    assert_eq!(
        fingerprint_of(&pool, "songs", song).await.as_deref(),
        Some(song_fingerprint("Loose Track", 120, &["Solo".to_string()], None).as_str())
    );
}

#[tokio::test]
async fn test_cancelled_job_reports_partial_progress() {
    let pool = create_test_pool().await.unwrap();

    seed_artist(&pool, "Never Processed").await;

    let token = CancellationToken::new();
    token.cancel();

    let report = BackfillJob::with_cancellation(pool.clone(), token)
        .run()
        .await
        .unwrap();
    assert!(report.cancelled);
    assert_eq!(report.total(), 0);

    // A later run without the token finishes the work.
    let resumed = BackfillJob::new(pool.clone()).run().await.unwrap();
    assert_eq!(resumed.artists, 1);
}
