use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use tracing::{debug, error, info};

use crate::models::{RawComment, StructuredRecord};

const PARTITION_PREFIX: &str = "thread_";
const MERGED_PREFIX: &str = "hn_jobs_raw_";
const SQLITE_EXT: &str = "sqlite";

const RAW_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS comments (
        id          TEXT PRIMARY KEY,
        thread_date TEXT NOT NULL,
        raw_text    TEXT NOT NULL,
        user        TEXT NOT NULL,
        url         TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_comments_date ON comments(thread_date);
";

/// Output columns, in order, with their SQLite types.
pub const STRUCTURED_COLUMNS: &[(&str, &str)] = &[
    ("id", "TEXT PRIMARY KEY"),
    ("date", "TEXT NOT NULL"),
    ("raw_text", "TEXT NOT NULL"),
    ("company_name", "TEXT"),
    ("role_title", "TEXT"),
    ("salary_min", "INTEGER"),
    ("salary_max", "INTEGER"),
    ("salary_avg", "INTEGER"),
    ("currency", "TEXT"),
    ("is_remote", "BOOLEAN NOT NULL"),
    ("tech_stack", "TEXT NOT NULL"),
    ("job_category", "TEXT NOT NULL"),
    ("is_senior", "BOOLEAN NOT NULL"),
    ("is_junior", "BOOLEAN NOT NULL"),
    ("is_manager", "BOOLEAN NOT NULL"),
    ("years_experience", "INTEGER"),
    ("is_tier_1_city", "BOOLEAN NOT NULL"),
    ("is_europe", "BOOLEAN NOT NULL"),
    ("is_global_remote", "BOOLEAN NOT NULL"),
    ("is_yc", "BOOLEAN NOT NULL"),
    ("is_funded", "BOOLEAN NOT NULL"),
    ("is_crypto", "BOOLEAN NOT NULL"),
    ("has_equity", "BOOLEAN NOT NULL"),
    ("offers_visa", "BOOLEAN NOT NULL"),
    ("tech_combo_ai", "BOOLEAN NOT NULL"),
    ("tech_combo_blockchain", "BOOLEAN NOT NULL"),
];

pub fn connect(path: &Path) -> Result<Connection> {
    Connection::open(path).with_context(|| format!("Failed to open {:?}", path))
}

// ── Raw comments ──

fn insert_comments(conn: &Connection, rows: &[RawComment]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        // First write wins on id collision.
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO comments (id, thread_date, raw_text, user, url)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for r in rows {
            count += stmt.execute(rusqlite::params![r.id, r.thread_date, r.raw_text, r.user, r.url])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn load_raw(path: &Path) -> Result<Vec<RawComment>> {
    let conn = connect(path)?;
    let mut stmt =
        conn.prepare("SELECT id, thread_date, raw_text, user, url FROM comments ORDER BY rowid")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(RawComment {
                id: row.get(0)?,
                thread_date: row.get(1)?,
                raw_text: row.get(2)?,
                user: row.get(3)?,
                url: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Write a fresh SQLite file next to `path` and move it into place.
fn write_raw_file(path: &Path, rows: &[RawComment]) -> Result<usize> {
    let tmp = path.with_extension("sqlite.tmp");
    if tmp.exists() {
        fs::remove_file(&tmp)?;
    }
    let written = {
        let conn = connect(&tmp)?;
        conn.execute_batch(RAW_SCHEMA)?;
        insert_comments(&conn, rows)?
    };
    fs::rename(&tmp, path).with_context(|| format!("Failed to move {:?} into place", tmp))?;
    Ok(written)
}

/// Directory of per-thread partitions plus merged run files.
pub struct TableStore {
    root: PathBuf,
}

impl TableStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        TableStore { root: root.into() }
    }

    pub fn threads_dir(&self) -> PathBuf {
        self.root.join("threads")
    }

    pub fn partition_path(&self, thread_id: &str) -> PathBuf {
        self.threads_dir()
            .join(format!("{}{}.{}", PARTITION_PREFIX, thread_id, SQLITE_EXT))
    }

    /// Replace the partition for `thread_id` with `records`. Empty input writes nothing.
    pub fn save_partition(&self, records: &[RawComment], thread_id: &str) -> Result<()> {
        if records.is_empty() {
            debug!("Thread {} has no comments, nothing to store", thread_id);
            return Ok(());
        }
        fs::create_dir_all(self.threads_dir())
            .with_context(|| format!("Failed to create {:?}", self.threads_dir()))?;
        let path = self.partition_path(thread_id);
        let written = write_raw_file(&path, records)?;
        info!("Saved thread {} ({} comments) to {:?}", thread_id, written, path);
        Ok(())
    }

    pub fn partition_files(&self) -> Result<Vec<PathBuf>> {
        list_sqlite_files(&self.threads_dir(), PARTITION_PREFIX)
    }

    pub fn merged_files(&self) -> Result<Vec<PathBuf>> {
        list_sqlite_files(&self.root, MERGED_PREFIX)
    }

    /// All partition rows, in file-name order. Unreadable files are logged and skipped.
    pub fn load_all_partitions(&self) -> Result<Vec<RawComment>> {
        let mut all = Vec::new();
        for path in self.partition_files()? {
            match load_raw(&path) {
                Ok(rows) => all.extend(rows),
                Err(e) => error!("Error reading {:?}: {:#}", path, e),
            }
        }
        Ok(all)
    }

    /// Ids already present in merged run files.
    pub fn scan_existing_ids(&self) -> Result<HashSet<String>> {
        let mut ids = HashSet::new();
        for path in self.merged_files()? {
            let conn = match connect(&path) {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Error reading {:?}: {:#}", path, e);
                    continue;
                }
            };
            let mut stmt = conn.prepare("SELECT id FROM comments")?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            ids.extend(rows);
        }
        Ok(ids)
    }

    /// Merge every partition into one file named by its date range.
    pub fn merge_and_dedupe(&self) -> Result<Option<(PathBuf, usize)>> {
        let all = self.load_all_partitions()?;
        if all.is_empty() {
            info!("No thread files to merge");
            return Ok(None);
        }

        let mut seen = HashSet::new();
        let mut rows: Vec<RawComment> = all
            .into_iter()
            .filter(|r| seen.insert(r.id.clone()))
            .collect();
        rows.sort_by_key(|r| r.thread_date);

        let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
            return Ok(None);
        };
        let path = self.root.join(format!(
            "{}{}_{}.{}",
            MERGED_PREFIX, first.thread_date, last.thread_date, SQLITE_EXT
        ));
        let written = write_raw_file(&path, &rows)?;
        info!("Merged {} records into {:?}", written, path);
        Ok(Some((path, written)))
    }

    /// Most recently written merged file.
    pub fn latest_merged(&self) -> Result<Option<PathBuf>> {
        let mut newest: Option<(SystemTime, PathBuf)> = None;
        for path in self.merged_files()? {
            let modified = fs::metadata(&path)?.modified()?;
            if newest.as_ref().map_or(true, |(t, _)| modified >= *t) {
                newest = Some((modified, path));
            }
        }
        Ok(newest.map(|(_, p)| p))
    }
}

fn list_sqlite_files(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to list {:?}", dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            let name_ok = p
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.starts_with(prefix));
            name_ok && p.extension().and_then(|e| e.to_str()) == Some(SQLITE_EXT)
        })
        .collect();
    files.sort();
    Ok(files)
}

// ── Structured output ──

fn structured_schema() -> String {
    let cols = STRUCTURED_COLUMNS
        .iter()
        .map(|(name, ty)| format!("{} {}", name, ty))
        .collect::<Vec<_>>()
        .join(",\n    ");
    format!("CREATE TABLE IF NOT EXISTS jobs (\n    {}\n);", cols)
}

fn structured_values(r: &StructuredRecord) -> Result<Vec<SqlValue>> {
    let tech_stack = serde_json::to_string(&r.tech_stack)?;
    Ok(vec![
        SqlValue::from(r.id.clone()),
        SqlValue::from(r.date.to_string()),
        SqlValue::from(r.raw_text.clone()),
        SqlValue::from(r.company_name.clone()),
        SqlValue::from(r.role_title.clone()),
        SqlValue::from(r.salary_min),
        SqlValue::from(r.salary_max),
        SqlValue::from(r.salary_avg),
        SqlValue::from(r.currency.map(|c| c.as_str().to_string())),
        SqlValue::from(r.is_remote),
        SqlValue::from(tech_stack),
        SqlValue::from(r.job_category.as_str().to_string()),
        SqlValue::from(r.is_senior),
        SqlValue::from(r.is_junior),
        SqlValue::from(r.is_manager),
        SqlValue::from(r.years_experience),
        SqlValue::from(r.is_tier_1_city),
        SqlValue::from(r.is_europe),
        SqlValue::from(r.is_global_remote),
        SqlValue::from(r.is_yc),
        SqlValue::from(r.is_funded),
        SqlValue::from(r.is_crypto),
        SqlValue::from(r.has_equity),
        SqlValue::from(r.offers_visa),
        SqlValue::from(r.tech_combo_ai),
        SqlValue::from(r.tech_combo_blockchain),
    ])
}

/// Replace the structured dataset at `path` with `records`. The previous file
/// stays in place until the new one is complete.
pub fn save_structured(path: &Path, records: &[StructuredRecord]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("sqlite.tmp");
    if tmp.exists() {
        fs::remove_file(&tmp)?;
    }
    let count = {
        let conn = connect(&tmp)?;
        insert_structured(&conn, records)?
    };
    fs::rename(&tmp, path).with_context(|| format!("Failed to move {:?} into place", tmp))?;
    Ok(count)
}

fn insert_structured(conn: &Connection, records: &[StructuredRecord]) -> Result<usize> {
    conn.execute_batch(&structured_schema())?;

    let names: Vec<&str> = STRUCTURED_COLUMNS.iter().map(|(n, _)| *n).collect();
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "INSERT OR IGNORE INTO jobs ({}) VALUES ({})",
        names.join(", "),
        placeholders.join(", ")
    );

    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(&sql)?;
        for r in records {
            let values = structured_values(r)?;
            debug_assert_eq!(values.len(), STRUCTURED_COLUMNS.len());
            count += stmt.execute(rusqlite::params_from_iter(values))?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn count_rows(path: &Path, table: &str) -> Result<usize> {
    let conn = connect(path)?;
    let n: usize = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
    Ok(n)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{extract_record, ExtractionRules};
    use chrono::NaiveDate;

    fn comment(id: &str, month: u32, text: &str) -> RawComment {
        RawComment {
            id: id.to_string(),
            thread_date: NaiveDate::from_ymd_opt(2024, month, 1).unwrap(),
            raw_text: text.to_string(),
            user: "someone".to_string(),
            url: format!("https://news.ycombinator.com/item?id={}", id),
        }
    }

    #[test]
    fn partition_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::new(dir.path());
        let rows = vec![comment("1", 3, "first"), comment("2", 3, "second")];

        store.save_partition(&rows, "900").unwrap();
        assert!(store.partition_path("900").exists());
        assert_eq!(load_raw(&store.partition_path("900")).unwrap(), rows);
    }

    #[test]
    fn partition_rewrite_replaces_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::new(dir.path());

        store.save_partition(&[comment("1", 3, "old")], "900").unwrap();
        store.save_partition(&[comment("1", 3, "new")], "900").unwrap();

        let rows = store.load_all_partitions().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].raw_text, "new");
    }

    #[test]
    fn empty_partition_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::new(dir.path());
        store.save_partition(&[], "900").unwrap();
        assert!(store.partition_files().unwrap().is_empty());
    }

    #[test]
    fn merge_dedupes_and_names_by_date_range() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::new(dir.path());
        store
            .save_partition(&[comment("1", 5, "may"), comment("2", 5, "may 2")], "a")
            .unwrap();
        store
            .save_partition(&[comment("2", 5, "dup"), comment("3", 2, "feb")], "b")
            .unwrap();

        let (path, written) = store.merge_and_dedupe().unwrap().unwrap();
        assert_eq!(written, 3);
        assert!(path.ends_with("hn_jobs_raw_2024-02-01_2024-05-01.sqlite"));

        let merged = load_raw(&path).unwrap();
        assert_eq!(merged[0].id, "3");
        let two = merged.iter().find(|r| r.id == "2").unwrap();
        assert_eq!(two.raw_text, "may 2");

        let ids = store.scan_existing_ids().unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(store.latest_merged().unwrap(), Some(path));
    }

    #[test]
    fn merge_without_partitions_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::new(dir.path());
        assert!(store.merge_and_dedupe().unwrap().is_none());
        assert!(store.latest_merged().unwrap().is_none());
    }

    #[test]
    fn structured_table_has_exact_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.sqlite");
        let record = extract_record(
            &comment("7", 3, "Acme | Rust Engineer | Remote | $150k - $180k | crypto"),
            &ExtractionRules::default(),
        );
        assert_eq!(save_structured(&path, &[record]).unwrap(), 1);

        let conn = connect(&path).unwrap();
        let mut stmt = conn.prepare("PRAGMA table_info(jobs)").unwrap();
        let cols: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        let expected: Vec<&str> = STRUCTURED_COLUMNS.iter().map(|(n, _)| *n).collect();
        assert_eq!(cols, expected);

        let (stack, salary_avg, blockchain): (String, i64, bool) = conn
            .query_row(
                "SELECT tech_stack, salary_avg, tech_combo_blockchain FROM jobs WHERE id = '7'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert_eq!(stack, "[\"Rust\"]");
        assert_eq!(salary_avg, 165000);
        assert!(blockchain);
        assert_eq!(count_rows(&path, "jobs").unwrap(), 1);
    }

    #[test]
    fn structured_rewrite_replaces_previous_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.sqlite");
        let rules = ExtractionRules::default();
        let first = extract_record(&comment("1", 3, "Acme | Rust Engineer | Remote"), &rules);
        let second = extract_record(&comment("2", 3, "Globex | SRE | NYC"), &rules);
        let third = extract_record(&comment("3", 3, "Initech | Backend | Austin"), &rules);

        save_structured(&path, &[first]).unwrap();
        assert_eq!(save_structured(&path, &[second, third]).unwrap(), 2);
        assert_eq!(count_rows(&path, "jobs").unwrap(), 2);
        assert!(!path.with_extension("sqlite.tmp").exists());
    }

    #[test]
    fn failed_structured_write_keeps_previous_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.sqlite");
        let rules = ExtractionRules::default();
        save_structured(&path, &[extract_record(&comment("1", 3, "Acme | Rust"), &rules)]).unwrap();

        // A directory squatting on the temp path makes the new write fail.
        fs::create_dir(path.with_extension("sqlite.tmp")).unwrap();
        fs::write(path.with_extension("sqlite.tmp").join("keep"), "x").unwrap();
        let second = extract_record(&comment("2", 3, "Globex | SRE"), &rules);
        assert!(save_structured(&path, &[second]).is_err());

        assert_eq!(count_rows(&path, "jobs").unwrap(), 1);
    }
}
