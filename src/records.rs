// Line-delimited JSON record store.
//
// Every stage hand-off is a record file: one UTF-8 JSON object per line,
// `\n`-terminated, each carrying a `url` key plus the stage-specific payload.
// Record order within a file is meaningful (the deduplicator's keep-first
// rule depends on it) and is preserved by every reader and writer here.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

/// One fetched page. The `text` field holds the raw HTML document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPage {
    pub url: String,
    pub text: String,
}

/// One page as an ordered list of per-section strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionRecord {
    pub url: String,
    pub text_list: Vec<String>,
}

/// One page as sections of sentences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentenceRecord {
    pub url: String,
    pub text_list: Vec<Vec<String>>,
}

/// One page as sections of tokenized sentences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub url: String,
    pub text_list: Vec<Vec<Vec<String>>>,
}

/// Read every well-formed record from a record file, in file order.
///
/// A malformed line (bad JSON, missing key, wrong nesting) is logged and
/// skipped; it never aborts the stage.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(record) => records.push(record),
            Err(err) => warn!(
                "{}:{}: skipping malformed record: {err}",
                path.display(),
                line_no + 1
            ),
        }
    }
    Ok(records)
}

/// Write all records to `path` through a temporary sibling, then rename.
///
/// Readers never observe a partially written stage output.
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let tmp = tmp_path(path);
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        for record in records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Incremental writer that appends one JSON object per line.
///
/// Used by the crawler, whose data file must survive an aborted run.
pub struct RecordWriter {
    inner: BufWriter<File>,
}

impl RecordWriter {
    /// Open `path` for appending, creating it if missing.
    pub fn append(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            inner: BufWriter::new(file),
        })
    }

    pub fn write<T: Serialize>(&mut self, record: &T) -> Result<()> {
        serde_json::to_writer(&mut self.inner, record)?;
        self.inner.write_all(b"\n")?;
        self.inner.flush()?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
