//! Reversible names for remote resources.
//!
//! Display names on the drive are not unique, so every name exposed over
//! WebDAV carries the remote ID:
//!
//! - files: `Movie.mkv` with ID `F1` becomes `Movie.F1.mkv`
//! - folders: `Show A` with ID `S1` becomes `Show A [S1]`
//!
//! Folder IDs are taken from the *last* bracket pair, so a display name that
//! itself ends in `[...]` cannot be told apart from the ID suffix.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("no identifier in name")]
    NoIdentifier,
}

/// Insert `id` in front of the extension of `name`.
pub fn encode_file(name: &str, id: &str) -> String {
    let (base, ext) = split_extension(name);
    format!("{base}.{id}{ext}")
}

/// Recover the ID from an encoded file name.
///
/// The ID is the second-to-last dot-separated segment; names with two or
/// fewer segments carry no ID.
pub fn decode_file(encoded: &str) -> Result<&str, NameError> {
    let parts: Vec<&str> = encoded.split('.').collect();
    if parts.len() <= 2 {
        return Err(NameError::NoIdentifier);
    }
    Ok(parts[parts.len() - 2])
}

/// Append ` [id]` to a folder name.
pub fn encode_folder(name: &str, id: &str) -> String {
    format!("{name} [{id}]")
}

/// Split an encoded folder name into `(display name, id)`.
pub fn decode_folder(encoded: &str) -> Result<(&str, &str), NameError> {
    let open = encoded.rfind('[').ok_or(NameError::NoIdentifier)?;
    let close = encoded.rfind(']').ok_or(NameError::NoIdentifier)?;
    if close < open {
        return Err(NameError::NoIdentifier);
    }

    let prefix = &encoded[..open];
    let name = prefix.strip_suffix(' ').unwrap_or(prefix);
    Ok((name, &encoded[open + 1..close]))
}

/// Split `name` into base and extension, the extension keeping its dot.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(i) => name.split_at(i),
        None => (name, ""),
    }
}
