//! Domain models for the music library
//!
//! Row structs map 1:1 onto the SQLite schema; `New*` payloads carry the
//! caller-supplied fields for inserts and updates, with validation in the
//! style of the upstream schema layer. Fingerprints are derived columns and
//! never set directly through a payload (the mutation service and the
//! backfill job own them).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Classification of an album release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AlbumType {
    Single,
    Album,
    Compilation,
}

impl AlbumType {
    /// String form stored in the database and used as fingerprint input.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlbumType::Single => "single",
            AlbumType::Album => "album",
            AlbumType::Compilation => "compilation",
        }
    }
}

impl fmt::Display for AlbumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Music artist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Artist {
    /// Unique identifier
    pub id: i64,
    /// Stable identifier carried across exports
    pub uuid: String,
    /// Artist name
    pub name: String,
    /// Normalized name for matching
    pub normalized_name: String,
    /// Thumbnail file reference
    pub thumbnail: Option<String>,
    /// Content fingerprint; None until computed
    pub fingerprint: Option<String>,
    /// Favorite flag
    pub is_favorite: bool,
    /// Play statistics
    pub play_count: i64,
    /// Last playback time (unix seconds)
    pub last_played_at: Option<i64>,
    /// Timestamps
    pub created_at: i64,
    pub updated_at: i64,
}

/// Album with its release classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Album {
    /// Unique identifier
    pub id: i64,
    /// Stable identifier carried across exports
    pub uuid: String,
    /// Album name
    pub name: String,
    /// Normalized name for matching
    pub normalized_name: String,
    /// Thumbnail file reference
    pub thumbnail: Option<String>,
    /// Release year
    pub release_year: Option<i64>,
    /// Release classification
    pub album_type: AlbumType,
    /// Content fingerprint; None until computed
    pub fingerprint: Option<String>,
    /// Favorite flag
    pub is_favorite: bool,
    /// Play statistics
    pub play_count: i64,
    /// Last playback time (unix seconds)
    pub last_played_at: Option<i64>,
    /// Timestamps
    pub created_at: i64,
    pub updated_at: i64,
}

/// User playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Playlist {
    /// Unique identifier
    pub id: i64,
    /// Stable identifier carried across exports
    pub uuid: String,
    /// Playlist name
    pub name: String,
    /// Normalized name for matching
    pub normalized_name: String,
    /// Thumbnail file reference
    pub thumbnail: Option<String>,
    /// Content fingerprint; None until computed
    pub fingerprint: Option<String>,
    /// Favorite flag
    pub is_favorite: bool,
    /// Play statistics
    pub play_count: i64,
    /// Last playback time (unix seconds)
    pub last_played_at: Option<i64>,
    /// Timestamps
    pub created_at: i64,
    pub updated_at: i64,
}

/// Music track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Song {
    /// Unique identifier
    pub id: i64,
    /// Stable identifier carried across exports
    pub uuid: String,
    /// Song title
    pub name: String,
    /// Normalized name for matching
    pub normalized_name: String,
    /// Thumbnail file reference
    pub thumbnail: Option<String>,
    /// Duration in seconds
    pub duration: i64,
    /// Release year
    pub release_year: Option<i64>,
    /// Album reference; None for standalone songs
    pub album_id: Option<i64>,
    /// Content fingerprint; None until computed
    pub fingerprint: Option<String>,
    /// Favorite flag
    pub is_favorite: bool,
    /// Play statistics
    pub play_count: i64,
    /// Last playback time (unix seconds)
    pub last_played_at: Option<i64>,
    /// Timestamps
    pub created_at: i64,
    pub updated_at: i64,
}

/// Insert/update payload for an artist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewArtist {
    pub name: String,
    pub thumbnail: Option<String>,
    pub is_favorite: bool,
}

impl NewArtist {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Artist name cannot be empty".to_string());
        }

        Ok(())
    }
}

/// Insert/update payload for an album
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAlbum {
    pub name: String,
    pub thumbnail: Option<String>,
    pub release_year: Option<i64>,
    pub album_type: AlbumType,
    pub is_favorite: bool,
}

impl NewAlbum {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Album name cannot be empty".to_string());
        }

        if let Some(year) = self.release_year {
            if !(0..=3000).contains(&year) {
                return Err(format!("Album release year {} is out of valid range", year));
            }
        }

        Ok(())
    }
}

/// Insert/update payload for a playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPlaylist {
    pub name: String,
    pub thumbnail: Option<String>,
    pub is_favorite: bool,
}

impl NewPlaylist {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Playlist name cannot be empty".to_string());
        }

        Ok(())
    }
}

/// Insert/update payload for a song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSong {
    pub name: String,
    pub thumbnail: Option<String>,
    pub duration: i64,
    pub release_year: Option<i64>,
    pub album_id: Option<i64>,
    /// A standalone song may omit its album; any other song must reference one.
    pub standalone: bool,
    pub is_favorite: bool,
}

impl NewSong {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Song name cannot be empty".to_string());
        }

        if self.duration <= 0 {
            return Err("Song duration must be positive".to_string());
        }

        if !self.standalone && self.album_id.is_none() {
            return Err("A song that is not standalone must reference an album".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_album_type_as_str() {
        assert_eq!(AlbumType::Single.as_str(), "single");
        assert_eq!(AlbumType::Album.as_str(), "album");
        assert_eq!(AlbumType::Compilation.as_str(), "compilation");
    }

    #[test]
    fn test_new_artist_validation() {
        let mut artist = NewArtist {
            name: "Valid Artist".to_string(),
            thumbnail: None,
            is_favorite: false,
        };
        assert!(artist.validate().is_ok());

        artist.name = "   ".to_string();
        assert!(artist.validate().is_err());
    }

    #[test]
    fn test_new_album_validation() {
        let mut album = NewAlbum {
            name: "Valid Album".to_string(),
            thumbnail: None,
            release_year: Some(1982),
            album_type: AlbumType::Album,
            is_favorite: false,
        };
        assert!(album.validate().is_ok());

        album.name = "".to_string();
        assert!(album.validate().is_err());

        album.name = "Valid".to_string();
        album.release_year = Some(-5);
        assert!(album.validate().is_err());
    }

    #[test]
    fn test_new_song_validation() {
        let mut song = NewSong {
            name: "Valid Song".to_string(),
            thumbnail: None,
            duration: 215,
            release_year: None,
            album_id: Some(1),
            standalone: false,
            is_favorite: false,
        };
        assert!(song.validate().is_ok());

        // Non-standalone songs must reference an album
        song.album_id = None;
        assert!(song.validate().is_err());

        // Standalone songs may omit it
        song.standalone = true;
        assert!(song.validate().is_ok());

        song.duration = 0;
        assert!(song.validate().is_err());
    }
}
