use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use stream_index::{HierarchyReader, IndexError, SqliteIndex};
use tempfile::TempDir;

// Tree used by every test:
//
// films (root)
// ├── Direct.mkv
// ├── Collection/
// │   ├── Part 1.mkv
// │   └── Extras/
// │       └── Trailer.mp4
// └── Old/ (trashed)
//     └── Gone.mkv
// shows (root)
// ├── Show A/
// │   ├── Season 1/
// │   │   └── A.S01E01.mkv
// │   └── Season 2/ (trashed)
// └── Show B/
//     └── B.S01E01.mkv (trashed)
fn create_test_index(temp_dir: &Path) -> PathBuf {
    let db_path = temp_dir.join("index.db");
    let conn = Connection::open(&db_path).unwrap();

    conn.execute_batch(
        "CREATE TABLE folder (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            parent TEXT,
            trashed INTEGER NOT NULL DEFAULT 0
        );
        CREATE TABLE file (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            parent TEXT,
            size INTEGER NOT NULL,
            md5 TEXT,
            trashed INTEGER NOT NULL DEFAULT 0
        );",
    )
    .unwrap();

    let folders = [
        ("collection", "Collection", "films", 0),
        ("extras", "Extras", "collection", 0),
        ("old", "Old", "films", 1),
        ("show-a", "Show A", "shows", 0),
        ("show-a-s1", "Season 1", "show-a", 0),
        ("show-a-s2", "Season 2", "show-a", 1),
        ("show-b", "Show B", "shows", 0),
    ];
    for (id, name, parent, trashed) in folders {
        conn.execute(
            "INSERT INTO folder (id, name, parent, trashed) VALUES (?1, ?2, ?3, ?4)",
            params![id, name, parent, trashed],
        )
        .unwrap();
    }

    let files = [
        ("direct", "Direct.mkv", "films", 100, Some("h-direct"), 0),
        ("part1", "Part 1.mkv", "collection", 200, Some("h-part1"), 0),
        ("trailer", "Trailer.mp4", "extras", 300, None, 0),
        ("gone", "Gone.mkv", "old", 400, Some("h-gone"), 0),
        ("a-e1", "A.S01E01.mkv", "show-a-s1", 500, Some("h-a-e1"), 0),
        ("b-e1", "B.S01E01.mkv", "show-b", 600, Some("h-b-e1"), 1),
    ];
    for (id, name, parent, size, md5, trashed) in files {
        conn.execute(
            "INSERT INTO file (id, name, parent, size, md5, trashed) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, name, parent, size, md5, trashed],
        )
        .unwrap();
    }

    db_path
}

fn open_index() -> (SqliteIndex, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = create_test_index(temp_dir.path());
    (SqliteIndex::open(&db_path).unwrap(), temp_dir)
}

fn sorted_ids<I: IntoIterator<Item = String>>(ids: I) -> Vec<String> {
    let mut ids: Vec<String> = ids.into_iter().collect();
    ids.sort();
    ids
}

#[test]
fn get_file_returns_entry() {
    let (index, _dir) = open_index();

    let file = index.get_file("part1").unwrap();
    assert_eq!(file.name, "Part 1.mkv");
    assert_eq!(file.size, 200);
    assert_eq!(file.content_hash, "h-part1");
}

#[test]
fn get_file_missing_hash_is_empty() {
    let (index, _dir) = open_index();

    let file = index.get_file("trailer").unwrap();
    assert_eq!(file.content_hash, "");
}

#[test]
fn get_file_unknown_or_trashed_is_not_found() {
    let (index, _dir) = open_index();

    assert!(matches!(index.get_file("nope"), Err(IndexError::NotFound)));
    assert!(matches!(index.get_file("b-e1"), Err(IndexError::NotFound)));
}

#[test]
fn recursive_files_flattens_all_depths() {
    let (index, _dir) = open_index();

    let files = index.recursive_files("films").unwrap();
    assert_eq!(
        sorted_ids(files.into_iter().map(|f| f.id)),
        vec!["direct", "part1", "trailer"]
    );
}

#[test]
fn recursive_files_skips_trashed() {
    let (index, _dir) = open_index();

    assert!(index.recursive_files("show-b").unwrap().is_empty());

    // Files under a trashed subfolder are not reached.
    let films = index.recursive_files("films").unwrap();
    assert!(films.iter().all(|f| f.id != "gone"));
}

#[test]
fn recursive_files_of_show() {
    let (index, _dir) = open_index();

    let files = index.recursive_files("show-a").unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "A.S01E01.mkv");
}

#[test]
fn recursive_folders_exact_depth() {
    let (index, _dir) = open_index();

    let shows = index.recursive_folders("shows", 1).unwrap();
    assert_eq!(
        sorted_ids(shows.into_iter().map(|f| f.id)),
        vec!["show-a", "show-b"]
    );

    let seasons = index.recursive_folders("shows", 2).unwrap();
    assert_eq!(sorted_ids(seasons.into_iter().map(|f| f.id)), vec!["show-a-s1"]);

    assert!(index.recursive_folders("shows", 3).unwrap().is_empty());
}

#[test]
fn connections_are_reused_across_queries() {
    let (index, _dir) = open_index();
    let index = index.with_max_idle(1);

    for _ in 0..10 {
        assert_eq!(index.recursive_files("films").unwrap().len(), 3);
        assert!(index.get_file("direct").is_ok());
    }
    assert_eq!(index.idle_connections(), 1);
}
