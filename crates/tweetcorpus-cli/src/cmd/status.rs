//! Status subcommand - offline progress report

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use tweetcorpus_core::{
    CorpusRecord, JoinedRecord, Sentiment, fmt_num, load_corpus, read_output, resume_index,
};

use super::print_summary;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Labeled corpus CSV (keyword, sentiment, id)
    #[arg(long)]
    pub corpus: Option<PathBuf>,

    /// Output CSV to inspect
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Counts derived from the corpus and output files
#[derive(Debug, PartialEq, Eq)]
pub struct Status {
    pub total: usize,
    pub saved: usize,
    pub resume_at: usize,
    pub corpus_by_sentiment: HashMap<Sentiment, usize>,
    pub saved_by_sentiment: HashMap<Sentiment, usize>,
}

impl Status {
    pub fn compute(corpus: &[CorpusRecord], saved: &[JoinedRecord], resume_at: usize) -> Self {
        let mut corpus_by_sentiment = HashMap::new();
        for r in corpus {
            *corpus_by_sentiment.entry(r.sentiment).or_insert(0) += 1;
        }
        let mut saved_by_sentiment = HashMap::new();
        for j in saved {
            *saved_by_sentiment.entry(j.record.sentiment).or_insert(0) += 1;
        }
        Self {
            total: corpus.len(),
            saved: saved.len(),
            resume_at,
            corpus_by_sentiment,
            saved_by_sentiment,
        }
    }

    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.resume_at)
    }

    /// Share of the corpus already processed (saved or skipped)
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.resume_at as f64 * 100.0 / self.total as f64
    }
}

pub fn run(args: StatusArgs, config: &Config) -> Result<()> {
    let corpus_path = args.corpus.unwrap_or_else(|| config.paths.corpus.clone());
    let output_path = args.output.unwrap_or_else(|| config.paths.output.clone());

    let corpus = load_corpus(&corpus_path)?;
    let saved = read_output(&output_path)?;
    let resume_at = resume_index(&corpus, &output_path)?;
    let status = Status::compute(&corpus, &saved, resume_at);

    print_summary(
        "Status",
        &[
            ("Corpus", corpus_path.display().to_string()),
            ("Output", output_path.display().to_string()),
            ("Records", fmt_num(status.total)),
            ("Saved", fmt_num(status.saved)),
            ("Skipped", fmt_num(status.resume_at.saturating_sub(status.saved))),
            ("Resume at", fmt_num(status.resume_at)),
            ("Remaining", fmt_num(status.remaining())),
            ("Complete", format!("{:.1}%", status.percent_complete())),
        ],
    );

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Sentiment").fg(Color::Cyan),
            Cell::new("Corpus").fg(Color::Cyan),
            Cell::new("Saved").fg(Color::Cyan),
        ]);
    for sentiment in Sentiment::ALL {
        let count = |m: &HashMap<Sentiment, usize>| fmt_num(m.get(&sentiment).copied().unwrap_or(0));
        table.add_row(vec![
            Cell::new(sentiment),
            Cell::new(count(&status.corpus_by_sentiment)),
            Cell::new(count(&status.saved_by_sentiment)),
        ]);
    }
    eprintln!("{table}");
    Ok(())
}
