//! # stream-index
//!
//! Read-only access to the drive index maintained by the synchronisation
//! engine.
//!
//! This crate provides:
//! - The [`FileEntry`] and [`FolderEntry`] snapshots served over WebDAV
//! - The [`HierarchyReader`] trait: point lookups and recursive listings
//! - [`SqliteIndex`], a pooled SQLite implementation of the reader
//!
//! The index is owned by the synchronisation engine. Nothing here writes
//! entries; the only schema change made is adding the parent-id indexes the
//! recursive queries rely on.
//!
//! ## Example
//!
//! ```ignore
//! use stream_index::{HierarchyReader, SqliteIndex};
//!
//! let index = SqliteIndex::open("bernard.db")?;
//! for file in index.recursive_files("films-folder-id")? {
//!     println!("{} ({} bytes)", file.name, file.size);
//! }
//! ```

mod error;
mod model;
mod sqlite;

pub use error::{IndexError, Result};
pub use model::{FileEntry, FolderEntry};
pub use sqlite::SqliteIndex;

/// Read-only hierarchy queries over the synchronised index.
///
/// Every call is a point-in-time snapshot; trashed entries are never
/// returned.
pub trait HierarchyReader: Send + Sync {
    /// Fetch one non-trashed file by its remote ID.
    fn get_file(&self, id: &str) -> Result<FileEntry>;

    /// All non-trashed files transitively below `folder_id`, at any depth.
    fn recursive_files(&self, folder_id: &str) -> Result<Vec<FileEntry>>;

    /// Non-trashed folders exactly `depth` levels below `folder_id`.
    ///
    /// Direct children are at depth 1.
    fn recursive_folders(&self, folder_id: &str, depth: u32) -> Result<Vec<FolderEntry>>;
}
