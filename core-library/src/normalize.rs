//! Canonicalization of free-text identity fields.
//!
//! Every field that participates in fingerprint hashing or duplicate
//! detection goes through [`normalize`] first, so casing and stray
//! whitespace never affect matching.

/// Normalize a free-text field for hashing and comparison.
///
/// - Trims leading/trailing whitespace
/// - Collapses consecutive whitespace to a single space
/// - Lowercases
///
/// Pure and total; the empty string maps to the empty string.
///
/// # Examples
///
/// ```
/// use core_library::normalize::normalize;
///
/// assert_eq!(normalize("  The  Beatles "), "the beatles");
/// ```
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
