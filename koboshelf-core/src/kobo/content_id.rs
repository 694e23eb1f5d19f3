//! Kobo ContentID / ImageID derivation

use std::path::Path;

/// Mount point of the user partition as seen by the device itself
pub const ONBOARD_PREFIX: &str = "file:///mnt/onboard/";

/// ContentID of a book from its path relative to the device root.
///
/// Path components are joined with `/`, whatever the host separator. A
/// backslash is only a separator on Windows; elsewhere it stays in the name.
pub fn content_id(relative_path: impl AsRef<Path>) -> String {
    let rel = relative_path
        .as_ref()
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    format!("{}{}", ONBOARD_PREFIX, rel)
}

/// ImageID used as the `content` table key for sideloaded books
pub fn image_id(content_id: &str) -> String {
    content_id
        .chars()
        .map(|c| match c {
            ' ' | '/' | ':' | '.' => '_',
            other => other,
        })
        .collect()
}
