//! Teacher document corpus.
//!
//! Reads the fixed set of classroom documents from the configured docs
//! directory:
//!
//! | File | Documents |
//! |------|-----------|
//! | `procedures.txt` | one document, id `eng-procedures.txt` |
//! | `syllabus.txt` | one document, id `eng-syllabus.txt` |
//! | `faq.csv` | one document per row, id `eng-faq-<row>`, text `Q: ...\nA: ...` |
//!
//! Missing files are skipped. Only the two text files feed answer context;
//! FAQ rows are listed by `aita corpus`. The procedures file doubles as the
//! substitute teacher's day plan.

use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::models::CorpusDocument;
use crate::text::take_chars;

pub const PROCEDURES_FILE: &str = "procedures.txt";
pub const SYLLABUS_FILE: &str = "syllabus.txt";
pub const FAQ_FILE: &str = "faq.csv";

const DOC_ID_PREFIX: &str = "eng-";
const DAY_PLAN_CHARS: usize = 600;
pub const DAY_PLAN_MISSING: &str = "Day plan not found.";

#[derive(Debug, Clone)]
pub struct Corpus {
    docs_dir: PathBuf,
}

impl Corpus {
    pub fn new(docs_dir: impl Into<PathBuf>) -> Self {
        Self {
            docs_dir: docs_dir.into(),
        }
    }

    pub fn docs_dir(&self) -> &Path {
        &self.docs_dir
    }

    /// Raw text of a document file, `None` when it does not exist.
    pub fn read(&self, name: &str) -> Result<Option<String>> {
        let path = self.docs_dir.join(name);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to read document: {}", path.display()))
            }
        }
    }

    /// Every non-empty document, text files first, then FAQ rows in file order.
    pub fn documents(&self) -> Result<Vec<CorpusDocument>> {
        let mut docs = self.text_documents()?;
        if let Some(raw) = self.read(FAQ_FILE)? {
            docs.extend(parse_faq(&raw)?);
        }
        Ok(docs)
    }

    /// The non-empty `.txt` documents only. FAQ rows are not answer context.
    pub fn text_documents(&self) -> Result<Vec<CorpusDocument>> {
        let mut docs = Vec::new();

        for name in [PROCEDURES_FILE, SYLLABUS_FILE] {
            if let Some(text) = self.read(name)? {
                let text = text.trim();
                if !text.is_empty() {
                    docs.push(CorpusDocument {
                        id: format!("{}{}", DOC_ID_PREFIX, name),
                        text: text.to_string(),
                    });
                }
            }
        }
        Ok(docs)
    }

    /// Opening of the procedures document, for substitute teachers.
    pub fn day_plan(&self) -> String {
        match self.read(PROCEDURES_FILE) {
            Ok(Some(text)) => take_chars(&text, DAY_PLAN_CHARS).to_string(),
            Ok(None) => DAY_PLAN_MISSING.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "day plan unreadable");
                DAY_PLAN_MISSING.to_string()
            }
        }
    }
}

/// CLI entry point: list every loaded document with its size.
pub fn list_corpus(config: &Config) -> Result<()> {
    let corpus = Corpus::new(&config.paths.docs_dir);
    let docs = corpus.documents()?;

    println!("{:<24} CHARS", "DOCUMENT");
    for doc in &docs {
        println!("{:<24} {}", doc.id, doc.text.chars().count());
    }
    println!();
    println!(
        "{} document(s) from {}",
        docs.len(),
        corpus.docs_dir().display()
    );
    Ok(())
}

/// Parse FAQ rows of the form `question,answer`. A row without an answer
/// column keeps an empty answer. Row ids come from the line a record starts
/// on, so skipped blank lines still advance the index.
fn parse_faq(raw: &str) -> Result<Vec<CorpusDocument>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(raw.as_bytes());

    let mut docs = Vec::new();
    for (n, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Malformed {} record {}", FAQ_FILE, n))?;
        let Some(question) = record.get(0) else {
            continue;
        };
        let i = record.position().map_or(n as u64, |p| p.line() - 1);
        let answer = record.get(1).unwrap_or("");
        docs.push(CorpusDocument {
            id: format!("{}faq-{}", DOC_ID_PREFIX, i),
            text: format!("Q: {}\nA: {}", question, answer),
        });
    }
    Ok(docs)
}
