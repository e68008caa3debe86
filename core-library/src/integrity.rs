//! # Relational Integrity Guard
//!
//! Read-only predicates evaluated before relationship mutations are
//! committed. They only report conflicts; refusing the mutation is the
//! caller's responsibility. Both take `&mut SqliteConnection` so the check
//! and the dependent write can share one transaction.

use sqlx::SqliteConnection;

use crate::error::Result;

/// Check whether songs already assigned to `album_id` are credited to any
/// of the submitted artists.
///
/// Used when an album's artist roster is edited: replacing the roster while
/// songs of the album are still linked to the prior artists would leave the
/// song and album crediting different people. An empty candidate list
/// short-circuits to `false`.
pub async fn has_album_artist_conflict(
    conn: &mut SqliteConnection,
    album_id: i64,
    candidate_artist_ids: &[i64],
) -> Result<bool> {
    if candidate_artist_ids.is_empty() {
        return Ok(false);
    }

    let placeholders = vec!["?"; candidate_artist_ids.len()].join(", ");
    let sql = format!(
        "SELECT s.id FROM songs s \
         WHERE s.album_id = ? \
           AND EXISTS ( \
               SELECT 1 FROM song_artists sa \
               WHERE sa.song_id = s.id AND sa.artist_id IN ({placeholders}) \
           ) \
         LIMIT 1"
    );

    let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(album_id);
    for artist_id in candidate_artist_ids {
        query = query.bind(artist_id);
    }

    let conflicting_song = query.fetch_optional(&mut *conn).await?;
    Ok(conflicting_song.is_some())
}

/// Check whether deleting an artist would break a song/album pairing.
///
/// True iff some song belongs to an album, is credited to `artist_id`, and
/// that album is also credited to `artist_id`: the artist is the structural
/// link between the two and removing them would orphan the relationship.
pub async fn has_artist_deletion_conflict(
    conn: &mut SqliteConnection,
    artist_id: i64,
) -> Result<bool> {
    let conflicting_song: Option<i64> = sqlx::query_scalar(
        "SELECT s.id FROM songs s \
         WHERE s.album_id IS NOT NULL \
           AND EXISTS ( \
               SELECT 1 FROM song_artists sa \
               WHERE sa.song_id = s.id AND sa.artist_id = ? \
           ) \
           AND EXISTS ( \
               SELECT 1 FROM album_artists aa \
               WHERE aa.album_id = s.album_id AND aa.artist_id = ? \
           ) \
         LIMIT 1",
    )
    .bind(artist_id)
    .bind(artist_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(conflicting_song.is_some())
}
