//! # Repository Pattern Implementation
//!
//! Repository traits and SQLite implementations for read access and the
//! fingerprint maintenance writes. Guarded mutations (inserts and updates
//! that must pass duplicate detection and integrity checks) live in the
//! [`crate::service`] layer; the import write path lives with the sync
//! crate. All operations return `Result<T>` and suspend only at store I/O.
//!
//! ## Available Repositories
//!
//! - `ArtistRepository` - Artists with name lookups for identity resolution
//! - `AlbumRepository` - Albums with ordered and sorted artist-link reads
//! - `PlaylistRepository` - Playlists with song membership management
//! - `SongRepository` - Songs with ordered artist-link reads

pub mod album;
pub mod artist;
pub mod playlist;
pub mod song;

pub use album::{AlbumFingerprintRow, AlbumRepository, SqliteAlbumRepository};
pub use artist::{ArtistFingerprintRow, ArtistRepository, SqliteArtistRepository};
pub use playlist::{PlaylistFingerprintRow, PlaylistRepository, SqlitePlaylistRepository};
pub use song::{SongFingerprintRow, SongRepository, SqliteSongRepository};
