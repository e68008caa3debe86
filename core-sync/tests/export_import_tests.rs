//! Integration tests for the export shape and the fingerprint-keyed import
//!
//! These tests verify:
//! - The nested song/album/artist export payload with credit ordering
//! - Entity cache initialization from persisted fingerprints
//! - Import writes that merge by fingerprint instead of duplicating

use core_library::db::create_test_pool;
use core_library::fingerprint::{album_fingerprint, artist_fingerprint};
use core_library::models::{AlbumType, NewAlbum, NewArtist, NewSong};
use core_library::repositories::{SongRepository, SqliteSongRepository};
use core_library::LibraryService;
use core_sync::export::all_songs_for_export;
use core_sync::import::{
    insert_synced_song, link_album_to_artists, link_song_to_artists, resolve_album,
    resolve_artist, SyncedAlbum, SyncedArtist, SyncedSong,
};
use core_sync::EntityCache;
use sqlx::SqlitePool;

fn artist(name: &str) -> NewArtist {
    NewArtist {
        name: name.to_string(),
        thumbnail: None,
        is_favorite: false,
    }
}

fn album(name: &str) -> NewAlbum {
    NewAlbum {
        name: name.to_string(),
        thumbnail: None,
        release_year: Some(1969),
        album_type: AlbumType::Album,
        is_favorite: false,
    }
}

fn song(name: &str, album_id: Option<i64>) -> NewSong {
    NewSong {
        name: name.to_string(),
        thumbnail: None,
        duration: 259,
        release_year: None,
        album_id,
        standalone: album_id.is_none(),
        is_favorite: false,
    }
}

async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_export_nests_album_and_artists_in_credit_order() {
    let pool = create_test_pool().await.unwrap();
    let service = LibraryService::new(pool.clone());

    let second = service.insert_artist(artist("Second Billed")).await.unwrap();
    let first = service.insert_artist(artist("First Billed")).await.unwrap();
    // Credit order deliberately differs from id order and from sort order.
    let m = service
        .insert_album(album("Abbey Road"), &[first.id, second.id])
        .await
        .unwrap();
    service
        .insert_song(song("Come Together", Some(m.id)), &[first.id, second.id])
        .await
        .unwrap();

    let exported = all_songs_for_export(&pool).await.unwrap();
    assert_eq!(exported.len(), 1);

    let song = &exported[0];
    assert_eq!(song.name, "Come Together");
    assert_eq!(song.duration, 259);

    let song_artists: Vec<&str> = song.artists.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(song_artists, vec!["First Billed", "Second Billed"]);

    let album = song.album.as_ref().expect("song should carry its album");
    assert_eq!(album.name, "Abbey Road");
    assert_eq!(album.album_type, AlbumType::Album);
    assert_eq!(album.release_year, Some(1969));
    let album_artists: Vec<&str> = album.artists.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(album_artists, vec!["First Billed", "Second Billed"]);
}

#[tokio::test]
async fn test_standalone_song_exports_without_album() {
    let pool = create_test_pool().await.unwrap();
    let service = LibraryService::new(pool.clone());

    let a = service.insert_artist(artist("Solo")).await.unwrap();
    service.insert_song(song("Loose Track", None), &[a.id]).await.unwrap();

    let exported = all_songs_for_export(&pool).await.unwrap();
    assert_eq!(exported.len(), 1);
    assert!(exported[0].album.is_none());
}

#[tokio::test]
async fn test_export_payload_serializes() {
    let pool = create_test_pool().await.unwrap();
    let service = LibraryService::new(pool.clone());

    let a = service.insert_artist(artist("A")).await.unwrap();
    let m = service.insert_album(album("M"), &[a.id]).await.unwrap();
    service.insert_song(song("S", Some(m.id)), &[a.id]).await.unwrap();

    let exported = all_songs_for_export(&pool).await.unwrap();
    let json = serde_json::to_string(&exported).unwrap();
    assert!(json.contains("\"album_type\":\"album\""));
    assert!(json.contains("\"name\":\"S\""));
}

#[tokio::test]
async fn test_entity_cache_initializes_from_persisted_fingerprints() {
    let pool = create_test_pool().await.unwrap();
    let service = LibraryService::new(pool.clone());

    let a = service.insert_artist(artist("Cached")).await.unwrap();
    let m = service.insert_album(album("Cached Album"), &[a.id]).await.unwrap();

    let cache = EntityCache::initialize(&pool).await.unwrap();
    assert_eq!(cache.artist(&artist_fingerprint("Cached")), Some(a.id));
    assert_eq!(
        cache.album(&album_fingerprint(
            "Cached Album",
            AlbumType::Album,
            &["Cached".to_string()],
        )),
        Some(m.id)
    );
    assert_eq!(cache.artist("unknown-fingerprint"), None);
}

#[tokio::test]
async fn test_resolve_artist_merges_by_fingerprint() {
    let pool = create_test_pool().await.unwrap();
    let service = LibraryService::new(pool.clone());

    let existing = service.insert_artist(artist("Already Here")).await.unwrap();
    let mut cache = EntityCache::initialize(&pool).await.unwrap();

    // Same fingerprint: resolves to the existing row, no insert.
    let incoming = SyncedArtist {
        name: "Already Here".to_string(),
        thumbnail: None,
        is_favorite: false,
        fingerprint: artist_fingerprint("Already Here"),
    };
    let resolved = resolve_artist(&pool, &mut cache, &incoming).await.unwrap();
    assert_eq!(resolved, existing.id);
    assert_eq!(count(&pool, "artists").await, 1);

    // Unknown fingerprint: inserts and caches.
    let fresh = SyncedArtist {
        name: "Brand New".to_string(),
        thumbnail: None,
        is_favorite: false,
        fingerprint: artist_fingerprint("Brand New"),
    };
    let inserted = resolve_artist(&pool, &mut cache, &fresh).await.unwrap();
    assert_eq!(count(&pool, "artists").await, 2);

    let again = resolve_artist(&pool, &mut cache, &fresh).await.unwrap();
    assert_eq!(again, inserted);
    assert_eq!(count(&pool, "artists").await, 2);
}

#[tokio::test]
async fn test_import_roundtrip_from_export_bundle() {
    // Source store with one credited song.
    let source = create_test_pool().await.unwrap();
    let service = LibraryService::new(source.clone());
    let a1 = service.insert_artist(artist("Lead")).await.unwrap();
    let a2 = service.insert_artist(artist("Featured")).await.unwrap();
    let m = service
        .insert_album(album("Shared Album"), &[a1.id, a2.id])
        .await
        .unwrap();
    service
        .insert_song(song("Shared Song", Some(m.id)), &[a1.id, a2.id])
        .await
        .unwrap();

    let bundle = all_songs_for_export(&source).await.unwrap();

    // Destination store merges the bundle; the producer side computes
    // fingerprints from the exported names.
    let dest = create_test_pool().await.unwrap();
    let mut cache = EntityCache::initialize(&dest).await.unwrap();

    for exported in &bundle {
        let mut artist_ids = Vec::new();
        for entry in &exported.artists {
            let synced = SyncedArtist {
                name: entry.name.clone(),
                thumbnail: entry.thumbnail.clone(),
                is_favorite: false,
                fingerprint: artist_fingerprint(&entry.name),
            };
            artist_ids.push(resolve_artist(&dest, &mut cache, &synced).await.unwrap());
        }

        let album_id = match &exported.album {
            Some(exported_album) => {
                let names: Vec<String> =
                    exported_album.artists.iter().map(|a| a.name.clone()).collect();
                let synced = SyncedAlbum {
                    name: exported_album.name.clone(),
                    thumbnail: exported_album.thumbnail.clone(),
                    release_year: exported_album.release_year,
                    album_type: exported_album.album_type,
                    is_favorite: false,
                    fingerprint: album_fingerprint(
                        &exported_album.name,
                        exported_album.album_type,
                        &names,
                    ),
                };
                let id = resolve_album(&dest, &mut cache, &synced).await.unwrap();

                let mut album_artist_ids = Vec::new();
                for entry in &exported_album.artists {
                    let synced = SyncedArtist {
                        name: entry.name.clone(),
                        thumbnail: entry.thumbnail.clone(),
                        is_favorite: false,
                        fingerprint: artist_fingerprint(&entry.name),
                    };
                    album_artist_ids
                        .push(resolve_artist(&dest, &mut cache, &synced).await.unwrap());
                }
                link_album_to_artists(&dest, id, &album_artist_ids).await.unwrap();

                Some(id)
            }
            None => None,
        };

        let names: Vec<String> = exported.artists.iter().map(|a| a.name.clone()).collect();
        let synced_song = SyncedSong {
            name: exported.name.clone(),
            thumbnail: exported.thumbnail.clone(),
            duration: exported.duration,
            release_year: exported.release_year,
            is_favorite: false,
            fingerprint: core_library::fingerprint::song_fingerprint(
                &exported.name,
                exported.duration,
                &names,
                exported.album.as_ref().map(|a| a.name.as_str()),
            ),
        };
        let song_id = insert_synced_song(&dest, &synced_song, album_id).await.unwrap();
        link_song_to_artists(&dest, song_id, &artist_ids).await.unwrap();
    }

    assert_eq!(count(&dest, "artists").await, 2);
    assert_eq!(count(&dest, "albums").await, 1);
    assert_eq!(count(&dest, "songs").await, 1);

    // Credit order survived the merge.
    let song_repo = SqliteSongRepository::new(dest.clone());
    let songs = song_repo.all().await.unwrap();
    let names = song_repo.artist_names(songs[0].id).await.unwrap();
    assert_eq!(names, vec!["Lead".to_string(), "Featured".to_string()]);

    // The destination's cache now matches the source's fingerprints, so a
    // second merge of the same bundle resolves everything without inserts.
    let refreshed = EntityCache::initialize(&dest).await.unwrap();
    assert!(refreshed
        .album(&album_fingerprint(
            "Shared Album",
            AlbumType::Album,
            &["Lead".to_string(), "Featured".to_string()],
        ))
        .is_some());
}
