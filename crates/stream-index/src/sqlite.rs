//! SQLite-backed [`HierarchyReader`].
//!
//! Reads the `file` and `folder` tables written by the synchronisation
//! engine. Both tables carry `id`, `name`, `parent` and `trashed` columns;
//! `file` additionally has `size` and `md5`.

use crate::{FileEntry, FolderEntry, HierarchyReader, IndexError, Result};
use log::{debug, trace};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

const SQL_PARENT_INDEXES: &str = "
CREATE INDEX IF NOT EXISTS folder_parent ON folder(parent);
CREATE INDEX IF NOT EXISTS file_parent ON file(parent);
";

const SQL_GET_FILE: &str = "
SELECT id, name, size, md5 FROM file WHERE file.id = ?1 AND NOT file.trashed
";

// The queried folder itself seeds the walk so its direct children are included.
const SQL_RECURSIVE_FILES: &str = "
WITH RECURSIVE tree(id) AS (
    SELECT ?1
    UNION
    SELECT folder.id FROM folder JOIN tree ON folder.parent = tree.id
    WHERE NOT folder.trashed
)
SELECT file.id, file.name, file.size, file.md5 FROM file
WHERE file.parent IN (SELECT id FROM tree) AND NOT file.trashed
";

const SQL_RECURSIVE_FOLDERS: &str = "
WITH RECURSIVE tree(id, name, depth) AS (
    SELECT id, name, 1 FROM folder WHERE parent = ?1 AND NOT trashed
    UNION ALL
    SELECT folder.id, folder.name, tree.depth + 1 FROM folder JOIN tree ON folder.parent = tree.id
    WHERE tree.depth < ?2 AND NOT folder.trashed
)
SELECT id, name FROM tree WHERE depth = ?2
";

/// Default number of idle read connections kept open.
pub const DEFAULT_MAX_IDLE: usize = 8;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Pooled, read-only SQLite index.
pub struct SqliteIndex {
    path: PathBuf,
    idle: Mutex<Vec<Connection>>,
    max_idle: usize,
}

impl SqliteIndex {
    /// Open the index at `path`.
    ///
    /// The database must already contain the `file` and `folder` tables. The
    /// parent-id indexes used by the recursive queries are created if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let conn = Connection::open(&path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SQL_PARENT_INDEXES)?;
        drop(conn);

        debug!("Opened index at {}", path.display());

        Ok(Self {
            path,
            idle: Mutex::new(Vec::new()),
            max_idle: DEFAULT_MAX_IDLE,
        })
    }

    /// Set the maximum number of idle connections kept for reuse.
    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }

    /// Path of the underlying database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` on an idle connection, opening one if none is free.
    ///
    /// The connection goes back to the pool afterwards, whether or not `f`
    /// succeeded.
    fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let reused = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();

        let conn = match reused {
            Some(conn) => conn,
            None => {
                trace!("Opening new read connection to {}", self.path.display());
                let conn = Connection::open_with_flags(
                    &self.path,
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )?;
                conn.busy_timeout(BUSY_TIMEOUT)?;
                conn
            }
        };

        let result = f(&conn);
        self.checkin(conn);
        result
    }

    fn checkin(&self, conn: Connection) {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.max_idle {
            idle.push(conn);
        }
    }

    /// Number of idle connections currently pooled.
    pub fn idle_connections(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl HierarchyReader for SqliteIndex {
    fn get_file(&self, id: &str) -> Result<FileEntry> {
        self.with_conn(|conn| {
            conn.query_row(SQL_GET_FILE, params![id], file_from_row)
                .optional()?
                .ok_or(IndexError::NotFound)
        })
    }

    fn recursive_files(&self, folder_id: &str) -> Result<Vec<FileEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(SQL_RECURSIVE_FILES)?;
            let files = stmt
                .query_map(params![folder_id], file_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(files)
        })
    }

    fn recursive_folders(&self, folder_id: &str, depth: u32) -> Result<Vec<FolderEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(SQL_RECURSIVE_FOLDERS)?;
            let folders = stmt
                .query_map(params![folder_id, i64::from(depth)], |row| {
                    Ok(FolderEntry {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(folders)
        })
    }
}

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<FileEntry> {
    let size: i64 = row.get(2)?;
    let md5: Option<String> = row.get(3)?;
    Ok(FileEntry {
        id: row.get(0)?,
        name: row.get(1)?,
        size: u64::try_from(size).unwrap_or(0),
        content_hash: md5.unwrap_or_default(),
    })
}
