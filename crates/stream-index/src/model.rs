/// A remote file as reflected in the local index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Opaque remote identifier, unique across the drive.
    pub id: String,
    /// Display name. Not unique within a folder.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Content checksum, exposed as the ETag.
    pub content_hash: String,
}

/// A remote folder as reflected in the local index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    pub id: String,
    pub name: String,
}
