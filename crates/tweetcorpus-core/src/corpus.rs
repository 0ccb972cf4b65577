//! Corpus loading: header-less `keyword,sentiment,id` CSV

use std::io::Read;
use std::path::Path;

use crate::error::CorpusError;
use crate::record::{CorpusRecord, Sentiment};

/// Load the corpus file, preserving row order.
///
/// Any malformed row aborts the load; row order defines resume positions,
/// so a partially loaded corpus is never returned.
pub fn load_corpus(path: &Path) -> Result<Vec<CorpusRecord>, CorpusError> {
    let file = std::fs::File::open(path).map_err(|source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = parse_corpus(file, path)?;
    log::info!("Loaded {} corpus records from {}", records.len(), path.display());
    Ok(records)
}

/// Parse corpus rows from any reader. `path` is only used in errors.
pub fn parse_corpus<R: Read>(reader: R, path: &Path) -> Result<Vec<CorpusRecord>, CorpusError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    let mut row = csv::StringRecord::new();
    loop {
        let line = rdr.position().line();
        match rdr.read_record(&mut row) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                return Err(CorpusError::Parse {
                    path: path.to_path_buf(),
                    line,
                    message: e.to_string(),
                });
            }
        }
        let line = row.position().map_or(line, |p| p.line());
        if row.iter().all(str::is_empty) {
            continue;
        }
        let record = parse_row(&row).map_err(|message| CorpusError::Parse {
            path: path.to_path_buf(),
            line,
            message,
        })?;
        records.push(record);
    }
    Ok(records)
}

fn parse_row(row: &csv::StringRecord) -> Result<CorpusRecord, String> {
    if row.len() != 3 {
        return Err(format!("expected 3 columns, found {}", row.len()));
    }
    let keyword = row[0].to_string();
    let sentiment = Sentiment::from_label(&row[1])
        .ok_or_else(|| format!("unknown sentiment {:?}", &row[1]))?;
    let id = row[2]
        .parse::<i64>()
        .map_err(|e| format!("invalid tweet id {:?}: {e}", &row[2]))?;
    Ok(CorpusRecord {
        id,
        keyword,
        sentiment,
    })
}
