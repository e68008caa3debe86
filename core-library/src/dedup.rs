//! # Duplicate Detection
//!
//! Decides whether a candidate album already exists in the store under
//! composite identity rules stronger than a fingerprint comparison: name,
//! album type, and the full unordered set of credited artist ids must all
//! match. Artist identity is by id here because the check runs within one
//! store where ids are already resolved; fingerprints are reserved for
//! cross-store matching where only names are available.
//!
//! The predicate takes `&mut SqliteConnection` so a caller can evaluate it
//! inside the same transaction as the dependent insert/update, closing the
//! check-then-act window.

use sqlx::SqliteConnection;

use crate::error::Result;
use crate::models::AlbumType;
use crate::normalize::normalize;

/// Check whether an album equivalent to the candidate already exists.
///
/// Name comparison is on the normalized name, matching the fingerprint
/// canonicalization. `exclude_id` skips a row when validating an update
/// against itself. Two albums with empty artist rosters are considered
/// duplicates of each other; the empty set equals the empty set.
pub async fn is_duplicate_album(
    conn: &mut SqliteConnection,
    name: &str,
    album_type: AlbumType,
    artist_ids: &[i64],
    exclude_id: Option<i64>,
) -> Result<bool> {
    let candidates: Vec<i64> = match exclude_id {
        Some(exclude) => {
            sqlx::query_scalar(
                "SELECT id FROM albums WHERE normalized_name = ? AND album_type = ? AND id != ?",
            )
            .bind(normalize(name))
            .bind(album_type)
            .bind(exclude)
            .fetch_all(&mut *conn)
            .await?
        }
        None => {
            sqlx::query_scalar(
                "SELECT id FROM albums WHERE normalized_name = ? AND album_type = ?",
            )
            .bind(normalize(name))
            .bind(album_type)
            .fetch_all(&mut *conn)
            .await?
        }
    };

    if candidates.is_empty() {
        return Ok(false);
    }

    let mut wanted = artist_ids.to_vec();
    wanted.sort_unstable();

    for album_id in candidates {
        let linked: Vec<i64> = sqlx::query_scalar(
            "SELECT artist_id FROM album_artists WHERE album_id = ? ORDER BY artist_id ASC",
        )
        .bind(album_id)
        .fetch_all(&mut *conn)
        .await?;

        if linked == wanted {
            return Ok(true);
        }
    }

    Ok(false)
}
