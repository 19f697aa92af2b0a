//! Per-teacher audit log of deflected questions.
//!
//! Each teacher gets an append-only CSV file `unknowns_<teacher_id>.csv` in
//! the logs directory with columns `ts,teacher_id,question,reason`. The
//! header is written together with the first row of a new file. Rows are
//! never rewritten or rotated.
//!
//! Appends from concurrent requests are serialized by a lock held across
//! the new-file check and the write, and each row reaches the file in a
//! single `write_all` on an append-mode handle.

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::Config;
use crate::models::{AuditTable, DeflectReason};

pub const AUDIT_HEADER: [&str; 4] = ["ts", "teacher_id", "question", "reason"];

pub struct AuditLog {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the log file for `teacher_id`.
    pub fn path_for(&self, teacher_id: &str) -> PathBuf {
        self.dir
            .join(format!("unknowns_{}.csv", file_safe_id(teacher_id)))
    }

    /// Append one deflection record, timestamped now (UTC).
    pub fn record(&self, question: &str, teacher_id: &str, reason: DeflectReason) -> Result<()> {
        let ts = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let path = self.path_for(teacher_id);

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create logs dir: {}", self.dir.display()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open audit log: {}", path.display()))?;
        let is_new = file.metadata()?.len() == 0;

        let mut buf = csv::Writer::from_writer(Vec::new());
        if is_new {
            buf.write_record(AUDIT_HEADER)?;
        }
        buf.write_record([ts.as_str(), teacher_id, question, reason.as_str()])?;
        let bytes = buf
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to encode audit row: {}", e.error()))?;

        file.write_all(&bytes)
            .with_context(|| format!("Failed to append audit log: {}", path.display()))?;
        Ok(())
    }

    /// Read a teacher's log back. `None` when nothing has been logged yet.
    pub fn read(&self, teacher_id: &str) -> Result<Option<AuditTable>> {
        read_table(&self.path_for(teacher_id))
    }
}

/// CLI entry point: print a teacher's deflection log as a table.
pub fn print_unknowns(config: &Config, teacher_id: &str) -> Result<()> {
    let log = AuditLog::new(&config.paths.logs_dir);
    let Some(table) = log.read(teacher_id)? else {
        println!("No unanswered questions logged for '{}'.", teacher_id);
        return Ok(());
    };

    println!("{}", table.header.join("  "));
    for row in &table.rows {
        println!("{}", row.join("  "));
    }
    println!();
    println!("{} unanswered question(s)", table.rows.len());
    Ok(())
}

fn read_table(path: &Path) -> Result<Option<AuditTable>> {
    if !path.exists() {
        return Ok(None);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open audit log: {}", path.display()))?;

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Malformed audit log: {}", path.display()))?;
        records.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    let mut records = records.into_iter();
    let Some(header) = records.next() else {
        return Ok(None);
    };

    Ok(Some(AuditTable {
        header,
        rows: records.collect(),
    }))
}

/// Percent-encode a teacher id for use in a file name. Distinct ids map to
/// distinct names and path separators are always encoded.
fn file_safe_id(teacher_id: &str) -> String {
    urlencoding::encode(teacher_id).into_owned()
}
