//! Resume detection from an existing output file

use std::path::Path;

use crate::error::CorpusError;
use crate::output::read_output;
use crate::record::CorpusRecord;

/// Corpus position at which fetching continues.
///
/// Output ids are matched, in order, against the corpus; the position after
/// the match of the last output row is returned. With unique ids this is
/// simply "index of the last saved id + 1". An output row that cannot be
/// matched means output and corpus disagree, which is reported rather than
/// resuming from 0.
pub fn resume_index(corpus: &[CorpusRecord], output_path: &Path) -> Result<usize, CorpusError> {
    let saved = read_output(output_path)?;
    let Some(last) = saved.last() else {
        log::debug!("No saved records in {}, starting at 0", output_path.display());
        return Ok(0);
    };

    let mut next = 0usize;
    for (row, joined) in saved.iter().enumerate() {
        let id = joined.id();
        match corpus[next..].iter().position(|r| r.id == id) {
            Some(offset) => next += offset + 1,
            None => {
                return Err(CorpusError::ResumeMismatch {
                    path: output_path.to_path_buf(),
                    id,
                    row: row + 1,
                });
            }
        }
    }

    log::info!(
        "Resume index {next} (last saved id {}, {} rows in {})",
        last.id(),
        saved.len(),
        output_path.display()
    );
    Ok(next)
}
