//! Username policy of the local directory.

/// Normalises a username to the directory's legal character set.
///
/// The result is trimmed and lowercased; every character outside
/// `[a-z0-9._@-]` is dropped. An empty result means the username cannot
/// be represented locally.
#[must_use]
pub fn sanitize_username(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '@' | '-'))
        .collect()
}
