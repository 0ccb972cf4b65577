//! Append-only output file of joined records.
//!
//! Header-less CSV with columns
//! `id, keyword, sentiment, created_at, language, author_handle, text`.
//! Every append is flushed and synced before returning, so the file is
//! always a valid prefix of the run that wrote it.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CorpusError;
use crate::record::{CorpusRecord, JoinedRecord, Sentiment, TweetPayload};

#[derive(Serialize)]
struct OutputRowRef<'a> {
    id: i64,
    keyword: &'a str,
    sentiment: Sentiment,
    created_at: DateTime<Utc>,
    language: &'a str,
    author_handle: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct OutputRow {
    id: i64,
    keyword: String,
    sentiment: Sentiment,
    created_at: DateTime<Utc>,
    language: String,
    author_handle: String,
    text: String,
}

impl From<OutputRow> for JoinedRecord {
    fn from(row: OutputRow) -> Self {
        JoinedRecord {
            record: CorpusRecord {
                id: row.id,
                keyword: row.keyword,
                sentiment: row.sentiment,
            },
            tweet: TweetPayload {
                created_at: row.created_at,
                language: row.language,
                author_handle: row.author_handle,
                text: row.text,
            },
        }
    }
}

/// Writer appending one durable row per call
#[derive(Debug, Clone)]
pub struct OutputWriter {
    path: PathBuf,
}

impl OutputWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record: open, write, flush, sync, close.
    pub fn append(&self, joined: &JoinedRecord) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        wtr.serialize(OutputRowRef {
            id: joined.record.id,
            keyword: &joined.record.keyword,
            sentiment: joined.record.sentiment,
            created_at: joined.tweet.created_at,
            language: &joined.tweet.language,
            author_handle: &joined.tweet.author_handle,
            text: &joined.tweet.text,
        })
        .map_err(io::Error::other)?;
        wtr.flush()?;

        let mut file = wtr.into_inner().map_err(|e| e.into_error())?;
        file.flush()?;
        file.sync_data()
    }
}

/// Read every row of an output file.
///
/// A missing file reads as empty. Malformed rows (including a row cut
/// short by a crash mid-write) are a [`CorpusError::Parse`].
pub fn read_output(path: &Path) -> Result<Vec<JoinedRecord>, CorpusError> {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(CorpusError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(file);

    let mut records = Vec::new();
    for result in rdr.deserialize::<OutputRow>() {
        let row = result.map_err(|e| CorpusError::Parse {
            path: path.to_path_buf(),
            line: e.position().map_or(0, |p| p.line()),
            message: e.to_string(),
        })?;
        records.push(row.into());
    }
    Ok(records)
}
