use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: i64 },

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("An album named \"{name}\" of type {album_type} with the same artists already exists")]
    DuplicateAlbum { name: String, album_type: String },

    #[error("Album {album_id} has songs credited to the submitted artists")]
    AlbumArtistConflict { album_id: i64 },

    #[error("Artist {artist_id} is still credited on songs of albums they are linked to")]
    ArtistDeletionConflict { artist_id: i64 },
}

pub type Result<T> = std::result::Result<T, LibraryError>;
