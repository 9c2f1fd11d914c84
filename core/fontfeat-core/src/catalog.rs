/// The catalog: where every cataloged face and its feature tags end up
///
/// Two SQLite tables hold the results of one ingestion run. `fonts` keeps one
/// row per physical face, keyed by `(filename, face_index)`; `features` keeps
/// one row per feature tag of that face, keyed by `(filename, face_index, tag)`.
/// Any tool that speaks SQL can ask the finished catalog questions like
/// "which faces support `hlig`" or "how many faces have `ss01`".
///
/// Writing happens inside a single batch. The store builds the database in a
/// uniquely named staging file next to the requested path and only moves it
/// into place once the batch commits, so a run that dies halfway leaves no
/// catalog behind and two runs never share a staging file. An existing catalog is never reopened for writing.
///
/// Made with care at FontLab https://www.fontlab.com/
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};
use read_fonts::types::Tag;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OpenFlags, Row};
use serde::{Deserialize, Serialize};
use tempfile::TempPath;

use crate::error::CatalogError;
use crate::tags::tag_to_string;

/// File name used when no explicit catalog path is configured.
pub const DEFAULT_CATALOG_FILENAME: &str = "fontfeatures.db";

/// Stored in SQLite's `user_version` so readers can tell layouts apart.
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA: &str = r#"
CREATE TABLE fonts (
    family TEXT NOT NULL,
    style TEXT NOT NULL,
    filename TEXT NOT NULL,
    face_index INTEGER NOT NULL,
    PRIMARY KEY (filename, face_index)
);

CREATE TABLE features (
    filename TEXT NOT NULL,
    face_index INTEGER NOT NULL,
    tag TEXT NOT NULL,
    PRIMARY KEY (filename, face_index, tag),
    FOREIGN KEY (filename, face_index) REFERENCES fonts (filename, face_index)
);

CREATE INDEX features_by_tag ON features (tag);
"#;

/// One cataloged face.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub family: String,
    pub style: String,
    pub filename: String,
    pub face_index: u32,
}

impl CatalogEntry {
    /// Render the key as `path#index`.
    pub fn path_with_index(&self) -> String {
        format!("{}#{}", self.filename, self.face_index)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            family: row.get(0)?,
            style: row.get(1)?,
            filename: row.get(2)?,
            face_index: row.get(3)?,
        })
    }
}

/// Result of [`CatalogStore::insert_entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryInsert {
    Inserted,
    /// `(filename, face_index)` was already cataloged; nothing was written.
    Duplicate,
}

/// Write side of the catalog, used for exactly one ingestion run.
pub struct CatalogStore {
    conn: Option<Connection>,
    target: PathBuf,
    staging: Option<TempPath>,
    batching: bool,
    last_entry: Option<(String, u32)>,
}

impl CatalogStore {
    /// Create a fresh catalog destined for `path`.
    ///
    /// Fails with [`CatalogError::AlreadyExists`] before touching anything if
    /// `path` is already occupied.
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        if path.symlink_metadata().is_ok() {
            return Err(CatalogError::AlreadyExists(path.to_path_buf()));
        }

        let staging = staging_file(path)?;
        let conn = Connection::open_with_flags(
            &*staging,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        conn.execute_batch(SCHEMA)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        debug!("staging catalog at {}", staging.display());

        Ok(Self {
            conn: Some(conn),
            target: path.to_path_buf(),
            staging: Some(staging),
            batching: false,
            last_entry: None,
        })
    }

    /// Path the catalog will occupy once committed.
    pub fn path(&self) -> &Path {
        &self.target
    }

    pub fn begin_batch(&mut self) -> Result<(), CatalogError> {
        if self.batching {
            return Err(CatalogError::BatchInProgress);
        }
        self.conn()?.execute_batch("BEGIN TRANSACTION")?;
        self.batching = true;
        Ok(())
    }

    /// Commit the batch and move the catalog into place.
    ///
    /// Consumes the store: a catalog is written by one run only.
    pub fn commit_batch(mut self) -> Result<PathBuf, CatalogError> {
        if !self.batching {
            return Err(CatalogError::NotBatching);
        }

        let conn = self.conn.take().ok_or(CatalogError::Closed)?;
        conn.execute_batch("COMMIT")?;
        conn.close().map_err(|(_, err)| err)?;
        self.batching = false;

        let staging = self.staging.take().ok_or(CatalogError::Closed)?;
        staging.persist_noclobber(&self.target).map_err(|err| {
            if err.error.kind() == io::ErrorKind::AlreadyExists {
                CatalogError::AlreadyExists(self.target.clone())
            } else {
                CatalogError::Io(err.error)
            }
        })?;

        info!("catalog committed to {}", self.target.display());
        Ok(self.target.clone())
    }

    /// Insert one face row.
    ///
    /// A key that is already present is reported as [`EntryInsert::Duplicate`]
    /// and leaves the store untouched.
    pub fn insert_entry(&mut self, entry: &CatalogEntry) -> Result<EntryInsert, CatalogError> {
        if !self.batching {
            return Err(CatalogError::NotBatching);
        }
        self.last_entry = None;

        let inserted = self
            .conn()?
            .prepare_cached(
                "INSERT INTO fonts (family, style, filename, face_index) VALUES (?1, ?2, ?3, ?4)",
            )?
            .execute(params![
                entry.family,
                entry.style,
                entry.filename,
                entry.face_index
            ]);

        match inserted {
            Ok(_) => {
                self.last_entry = Some((entry.filename.clone(), entry.face_index));
                Ok(EntryInsert::Inserted)
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Ok(EntryInsert::Duplicate)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Insert one feature row per tag for the entry that was just inserted.
    ///
    /// Only valid directly after a successful [`insert_entry`](Self::insert_entry)
    /// for the same key. Returns the number of rows written.
    pub fn insert_features(
        &mut self,
        filename: &str,
        face_index: u32,
        tags: &BTreeSet<Tag>,
    ) -> Result<usize, CatalogError> {
        if !self.batching {
            return Err(CatalogError::NotBatching);
        }
        match self.last_entry.take() {
            Some((last_file, last_index)) if last_file == filename && last_index == face_index => {}
            _ => {
                return Err(CatalogError::FeaturesWithoutEntry {
                    filename: filename.to_string(),
                    face_index,
                })
            }
        }

        let mut stmt = self.conn()?.prepare_cached(
            "INSERT INTO features (filename, face_index, tag) VALUES (?1, ?2, ?3)",
        )?;
        for tag in tags {
            stmt.execute(params![filename, face_index, tag_to_string(*tag)])?;
        }

        Ok(tags.len())
    }

    fn conn(&self) -> Result<&Connection, CatalogError> {
        self.conn.as_ref().ok_or(CatalogError::Closed)
    }
}

impl Drop for CatalogStore {
    fn drop(&mut self) {
        // Close before unlinking so no journal is left next to the staging file.
        drop(self.conn.take());
        if let Some(staging) = self.staging.take() {
            let shown = staging.display().to_string();
            if let Err(err) = staging.close() {
                debug!("could not remove staging file {shown}: {err}");
            }
        }
    }
}

/// Create `.<name>.<random>.partial` in the catalog's directory.
fn staging_file(target: &Path) -> Result<TempPath, CatalogError> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let file = tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".partial")
        .tempfile_in(dir)?;
    Ok(file.into_temp_path())
}

/// How many cataloged faces declare a given tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureCount {
    pub tag: String,
    pub faces: u64,
}

/// Read-only view over a committed catalog.
pub struct CatalogReader {
    conn: Connection,
}

impl CatalogReader {
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Self { conn })
    }

    pub fn schema_version(&self) -> Result<u32, CatalogError> {
        Ok(self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    pub fn entry_count(&self) -> Result<u64, CatalogError> {
        self.count("SELECT COUNT(*) FROM fonts")
    }

    pub fn feature_record_count(&self) -> Result<u64, CatalogError> {
        self.count("SELECT COUNT(*) FROM features")
    }

    /// Every cataloged face, ordered by key.
    pub fn entries(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let mut stmt = self.conn.prepare(
            "SELECT family, style, filename, face_index FROM fonts ORDER BY filename, face_index",
        )?;
        let rows = stmt.query_map([], CatalogEntry::from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    pub fn faces_with_feature(&self, tag: Tag) -> Result<Vec<CatalogEntry>, CatalogError> {
        self.faces_with_features(&[tag])
    }

    /// Faces declaring every one of `tags`. An empty slice returns all faces.
    pub fn faces_with_features(&self, tags: &[Tag]) -> Result<Vec<CatalogEntry>, CatalogError> {
        let wanted: BTreeSet<String> = tags.iter().copied().map(tag_to_string).collect();
        if wanted.is_empty() {
            return self.entries();
        }

        let placeholders = vec!["?"; wanted.len()].join(", ");
        let sql = format!(
            "SELECT f.family, f.style, f.filename, f.face_index
             FROM fonts f
             JOIN features t ON t.filename = f.filename AND t.face_index = f.face_index
             WHERE t.tag IN ({placeholders})
             GROUP BY f.filename, f.face_index
             HAVING COUNT(DISTINCT t.tag) = {}
             ORDER BY f.filename, f.face_index",
            wanted.len()
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(wanted.iter()), CatalogEntry::from_row)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Tags recorded for one face, sorted.
    pub fn features_of(&self, filename: &str, face_index: u32) -> Result<Vec<String>, CatalogError> {
        let mut stmt = self.conn.prepare(
            "SELECT tag FROM features WHERE filename = ?1 AND face_index = ?2 ORDER BY tag",
        )?;
        let rows = stmt.query_map(params![filename, face_index], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Faces per tag, most common first.
    pub fn feature_counts(&self) -> Result<Vec<FeatureCount>, CatalogError> {
        let mut stmt = self.conn.prepare(
            "SELECT tag, COUNT(*) AS faces FROM features GROUP BY tag ORDER BY faces DESC, tag",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(FeatureCount {
                tag: row.get(0)?,
                faces: row.get::<_, i64>(1)? as u64,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    fn count(&self, sql: &str) -> Result<u64, CatalogError> {
        let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::tag4;
    use std::fs;
    use tempfile::TempDir;

    fn dir_listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn entry(filename: &str, face_index: u32) -> CatalogEntry {
        CatalogEntry {
            family: "Sample".to_string(),
            style: "Regular".to_string(),
            filename: filename.to_string(),
            face_index,
        }
    }

    fn tags(raw: &[&str]) -> BTreeSet<Tag> {
        raw.iter().map(|t| tag4(t).unwrap()).collect()
    }

    #[test]
    fn refuses_existing_path_without_touching_it() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CATALOG_FILENAME);
        fs::write(&path, b"keep me").unwrap();

        let err = CatalogStore::open(&path).err().expect("must refuse");

        assert!(matches!(err, CatalogError::AlreadyExists(ref p) if p == &path));
        assert_eq!(fs::read(&path).unwrap(), b"keep me");
        assert_eq!(dir_listing(dir.path()), vec![DEFAULT_CATALOG_FILENAME]);
    }

    #[test]
    fn commit_moves_catalog_into_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cat.db");

        let mut store = CatalogStore::open(&path).unwrap();
        assert!(!path.exists());
        store.begin_batch().unwrap();
        assert_eq!(
            store.insert_entry(&entry("/f/Sample.ttf", 0)).unwrap(),
            EntryInsert::Inserted
        );
        let written = store
            .insert_features("/f/Sample.ttf", 0, &tags(&["liga", "kern"]))
            .unwrap();
        assert_eq!(written, 2);
        assert_eq!(store.commit_batch().unwrap(), path);

        assert!(path.exists());
        assert_eq!(dir_listing(dir.path()), vec!["cat.db"]);

        let reader = CatalogReader::open(&path).unwrap();
        assert_eq!(reader.schema_version().unwrap(), SCHEMA_VERSION);
        assert_eq!(reader.entry_count().unwrap(), 1);
        assert_eq!(reader.feature_record_count().unwrap(), 2);
        assert_eq!(
            reader.features_of("/f/Sample.ttf", 0).unwrap(),
            vec!["kern".to_string(), "liga".to_string()]
        );
    }

    #[test]
    fn duplicate_entry_is_rejected_and_keeps_first_row() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cat.db");

        let mut store = CatalogStore::open(&path).unwrap();
        store.begin_batch().unwrap();
        store.insert_entry(&entry("/f/x.ttf", 0)).unwrap();
        store.insert_features("/f/x.ttf", 0, &tags(&["smcp"])).unwrap();

        let mut again = entry("/f/x.ttf", 0);
        again.family = "Other".to_string();
        assert_eq!(store.insert_entry(&again).unwrap(), EntryInsert::Duplicate);
        assert!(matches!(
            store.insert_features("/f/x.ttf", 0, &tags(&["c2sc"])),
            Err(CatalogError::FeaturesWithoutEntry { .. })
        ));

        store.insert_entry(&entry("/f/x.ttf", 1)).unwrap();
        store.commit_batch().unwrap();

        let reader = CatalogReader::open(&path).unwrap();
        assert_eq!(reader.entry_count().unwrap(), 2);
        assert_eq!(reader.feature_record_count().unwrap(), 1);
        assert_eq!(reader.entries().unwrap()[0].family, "Sample");
    }

    #[test]
    fn inserts_require_an_open_batch() {
        let dir = TempDir::new().unwrap();
        let mut store = CatalogStore::open(&dir.path().join("cat.db")).unwrap();

        assert!(matches!(
            store.insert_entry(&entry("/f/x.ttf", 0)),
            Err(CatalogError::NotBatching)
        ));
        store.begin_batch().unwrap();
        assert!(matches!(
            store.begin_batch(),
            Err(CatalogError::BatchInProgress)
        ));
    }

    #[test]
    fn dropping_uncommitted_store_leaves_no_catalog() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cat.db");

        {
            let mut store = CatalogStore::open(&path).unwrap();
            store.begin_batch().unwrap();
            store.insert_entry(&entry("/f/x.ttf", 0)).unwrap();
        }

        assert!(dir_listing(dir.path()).is_empty());
        assert!(CatalogStore::open(&path).is_ok());
    }

    #[test]
    fn reader_answers_tag_queries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cat.db");

        let mut store = CatalogStore::open(&path).unwrap();
        store.begin_batch().unwrap();
        store.insert_entry(&entry("/f/a.ttf", 0)).unwrap();
        store
            .insert_features("/f/a.ttf", 0, &tags(&["hlig", "liga"]))
            .unwrap();
        store.insert_entry(&entry("/f/b.ttf", 0)).unwrap();
        store.insert_features("/f/b.ttf", 0, &tags(&["liga"])).unwrap();
        store.commit_batch().unwrap();

        let reader = CatalogReader::open(&path).unwrap();

        let hlig = reader.faces_with_feature(tag4("hlig").unwrap()).unwrap();
        assert_eq!(hlig.len(), 1);
        assert_eq!(hlig[0].path_with_index(), "/f/a.ttf#0");

        let both = reader
            .faces_with_features(&[tag4("liga").unwrap(), tag4("hlig").unwrap()])
            .unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(reader.faces_with_features(&[]).unwrap().len(), 2);

        assert_eq!(
            reader.feature_counts().unwrap(),
            vec![
                FeatureCount {
                    tag: "liga".to_string(),
                    faces: 2
                },
                FeatureCount {
                    tag: "hlig".to_string(),
                    faces: 1
                },
            ]
        );
    }

    #[test]
    fn concurrent_stores_keep_separate_staging_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cat.db");

        let mut first = CatalogStore::open(&path).unwrap();
        let mut second = CatalogStore::open(&path).unwrap();
        first.begin_batch().unwrap();
        second.begin_batch().unwrap();

        let staged = dir_listing(dir.path());
        assert_eq!(staged.len(), 2);
        assert!(staged
            .iter()
            .all(|name| name.starts_with(".cat.db.") && name.ends_with(".partial")));

        first.insert_entry(&entry("/f/first.ttf", 0)).unwrap();
        second.insert_entry(&entry("/f/second.ttf", 0)).unwrap();
        first.commit_batch().unwrap();

        assert!(matches!(
            second.commit_batch(),
            Err(CatalogError::AlreadyExists(ref p)) if p == &path
        ));
        assert_eq!(dir_listing(dir.path()), vec!["cat.db"]);

        let reader = CatalogReader::open(&path).unwrap();
        assert_eq!(reader.entries().unwrap()[0].filename, "/f/first.ttf");
    }

    #[test]
    fn relative_target_stages_in_working_directory() {
        let staged = staging_file(Path::new("fontfeat-staging-test.db")).unwrap();

        assert_eq!(staged.parent(), Some(Path::new(".")));
        let name = staged.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".fontfeat-staging-test.db."));
        assert!(staged.exists());
    }
}
