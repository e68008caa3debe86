//! # Library Management Module
//!
//! Owns the canonical music library database and the content-identity layer
//! built on top of it.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite database schema and migrations
//! - Domain models for songs, albums, artists, and playlists
//! - Content fingerprints: normalized, order-independent identity digests
//! - Duplicate detection under composite identity rules
//! - Relational integrity predicates guarding song/album/artist links
//! - Repository patterns for data access and a guarded mutation service

pub mod db;
pub mod dedup;
pub mod error;
pub mod fingerprint;
pub mod integrity;
pub mod models;
pub mod normalize;
pub mod repositories;
pub mod service;

pub use error::{LibraryError, Result};
pub use service::LibraryService;
