//! # Content Fingerprints
//!
//! Derives a stable identity digest per entity type so that two
//! independently created rows describing the same real-world song, album,
//! artist, or playlist can be matched across library stores.
//!
//! ## Algorithm
//!
//! Every text input is passed through [`normalize`]; artist name lists are
//! additionally sorted lexicographically and joined with `,` so the digest
//! is independent of credit order. The composed string is tagged with an
//! entity-type prefix (an artist and a playlist sharing a name must not
//! collide) and hashed with SHA-256; the lowercase hex encoding is the
//! fingerprint. Optional fields hash as the empty string rather than being
//! omitted, so their absence is still part of the input.
//!
//! These functions are pure: they never validate and never fail.
//! Fingerprints are only ever compared against fingerprints produced by the
//! same functions, never interpreted.

use sha2::{Digest, Sha256};

use crate::models::AlbumType;
use crate::normalize::normalize;

/// Hash the composed identity string to a lowercase hex digest.
fn digest(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Normalize, sort, and join a list of artist names for hashing.
///
/// Sorting happens after normalization so casing differences cannot
/// reorder the joined input.
fn canonical_artists(artist_names: &[String]) -> String {
    let mut names: Vec<String> = artist_names.iter().map(|n| normalize(n)).collect();
    names.sort();
    names.join(",")
}

/// Fingerprint for an artist, derived from its name alone.
pub fn artist_fingerprint(name: &str) -> String {
    digest(&format!("artist:{}", normalize(name)))
}

/// Fingerprint for a playlist, derived from its name alone.
pub fn playlist_fingerprint(name: &str) -> String {
    digest(&format!("playlist:{}", normalize(name)))
}

/// Fingerprint for an album, derived from name, album type, and the
/// unordered set of credited artist names.
pub fn album_fingerprint(name: &str, album_type: AlbumType, artist_names: &[String]) -> String {
    digest(&format!(
        "album:{}:{}:{}",
        normalize(name),
        album_type.as_str(),
        canonical_artists(artist_names),
    ))
}

/// Fingerprint for a song, derived from name, duration in seconds, the
/// unordered set of credited artist names, and the album name if any.
pub fn song_fingerprint(
    name: &str,
    duration: i64,
    artist_names: &[String],
    album_name: Option<&str>,
) -> String {
    digest(&format!(
        "song:{}:{}:{}:{}",
        normalize(name),
        duration,
        album_name.map(normalize).unwrap_or_default(),
        canonical_artists(artist_names),
    ))
}
