//! End-to-end tests for the fetch loop: scripted fetcher, fake clock,
//! real output files in a temp dir.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use indicatif::ProgressBar;
use tempfile::TempDir;
use tweetcorpus_core::{
    Clock, CorpusRecord, FetchError, FetchOutcome, LoopError, LoopOptions, OutputWriter,
    RateLimit, Sentiment, TweetFetcher, TweetPayload, load_corpus, read_output, resume_index,
    run_fetch_loop,
};

/// Clock that never blocks: sleeping just moves `now` forward.
struct FakeClock {
    now: Cell<DateTime<Utc>>,
    sleeps: RefCell<Vec<Duration>>,
}

impl FakeClock {
    fn new() -> Self {
        Self {
            now: Cell::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
            sleeps: RefCell::new(Vec::new()),
        }
    }

    fn total_slept(&self) -> Duration {
        self.sleeps.borrow().iter().sum()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        let step = chrono::Duration::from_std(duration).unwrap();
        self.now.set(self.now.get() + step);
    }
}

/// Per-id scripted responses; ids without a script succeed with "tweet <id>".
#[derive(Default)]
struct ScriptedFetcher {
    scripts: HashMap<i64, VecDeque<Result<FetchOutcome, FetchError>>>,
    always: HashMap<i64, FetchOutcome>,
    calls: Vec<i64>,
}

impl ScriptedFetcher {
    fn script(mut self, id: i64, responses: Vec<Result<FetchOutcome, FetchError>>) -> Self {
        self.scripts.insert(id, responses.into());
        self
    }

    fn always(mut self, id: i64, outcome: FetchOutcome) -> Self {
        self.always.insert(id, outcome);
        self
    }

    fn calls_for(&self, id: i64) -> usize {
        self.calls.iter().filter(|&&c| c == id).count()
    }
}

impl TweetFetcher for ScriptedFetcher {
    fn fetch(&mut self, id: i64) -> Result<FetchOutcome, FetchError> {
        self.calls.push(id);
        if let Some(outcome) = self.always.get(&id) {
            return Ok(outcome.clone());
        }
        if let Some(next) = self.scripts.get_mut(&id).and_then(VecDeque::pop_front) {
            return next;
        }
        Ok(success(&format!("tweet {id}")))
    }
}

fn success(text: &str) -> FetchOutcome {
    FetchOutcome::Success(TweetPayload {
        created_at: Utc.with_ymd_and_hms(2011, 10, 19, 8, 30, 0).unwrap(),
        language: "en".to_string(),
        author_handle: "author".to_string(),
        text: text.to_string(),
    })
}

fn not_found() -> FetchOutcome {
    FetchOutcome::Unavailable {
        status: 404,
        reason: "Not Found Error".to_string(),
    }
}

fn exhausted(reset_at: DateTime<Utc>) -> FetchOutcome {
    FetchOutcome::RateLimited(RateLimit {
        remaining: 0,
        reset_at,
    })
}

fn corpus(ids: &[i64]) -> Vec<CorpusRecord> {
    ids.iter()
        .map(|&id| CorpusRecord {
            id,
            keyword: format!("kw{id}"),
            sentiment: Sentiment::Neutral,
        })
        .collect()
}

fn run(
    corpus: &[CorpusRecord],
    out: &Path,
    fetcher: &mut ScriptedFetcher,
    clock: &FakeClock,
) -> Result<tweetcorpus_core::FetchSummary, LoopError> {
    run_fetch_loop(
        corpus,
        &OutputWriter::new(out),
        fetcher,
        clock,
        &LoopOptions::default(),
        &ProgressBar::hidden(),
    )
}

fn output_ids(path: &Path) -> Vec<i64> {
    read_output(path).unwrap().iter().map(|r| r.id()).collect()
}

#[test]
fn saves_every_record_in_order() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("tweets.csv");
    let c = corpus(&[5, 3, 9, 1]);
    let mut fetcher = ScriptedFetcher::default();

    let summary = run(&c, &out, &mut fetcher, &FakeClock::new()).unwrap();

    assert_eq!(summary.saved, 4);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.stopped_at, 4);
    assert!(!summary.interrupted);
    assert_eq!(output_ids(&out), vec![5, 3, 9, 1]);
}

#[test]
fn rate_limited_record_saved_after_pause() {
    let dir = TempDir::new().unwrap();
    let corpus_path = dir.path().join("corpus.csv");
    std::fs::write(&corpus_path, "a,positive,1\nb,negative,2\n").unwrap();
    let c = load_corpus(&corpus_path).unwrap();

    let out = dir.path().join("tweets.csv");
    let clock = FakeClock::new();
    let mut fetcher = ScriptedFetcher::default()
        .script(1, vec![Ok(success("hello"))])
        .script(2, vec![Ok(exhausted(clock.now())), Ok(success("world"))]);

    let summary = run(&c, &out, &mut fetcher, &clock).unwrap();

    let rows = read_output(&out).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id(), 1);
    assert_eq!(rows[0].tweet.text, "hello");
    assert_eq!(rows[0].record.sentiment, Sentiment::Positive);
    assert_eq!(rows[1].id(), 2);
    assert_eq!(rows[1].tweet.text, "world");
    assert_eq!(rows[1].record.sentiment, Sentiment::Negative);

    // reset was "now", so the pause is exactly the safety margin
    assert_eq!(*clock.sleeps.borrow(), vec![Duration::from_secs(60)]);
    assert_eq!(summary.rate_limit_waits, 1);
    assert_eq!(fetcher.calls, vec![1, 2, 2]);
}

#[test]
fn rate_limit_stalls_but_never_loses_record() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("tweets.csv");
    let clock = FakeClock::new();
    let reset = clock.now() + chrono::Duration::minutes(15);
    let mut fetcher = ScriptedFetcher::default().script(
        7,
        vec![
            Ok(exhausted(reset)),
            Ok(exhausted(reset)),
            Ok(success("finally")),
        ],
    );

    let summary = run(&corpus(&[6, 7, 8]), &out, &mut fetcher, &clock).unwrap();

    assert_eq!(summary.saved, 3);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.rate_limit_waits, 2);
    assert_eq!(fetcher.calls_for(7), 3);
    assert_eq!(output_ids(&out), vec![6, 7, 8]);
    // first wait: 15 min + 1 min margin; the second sees a stale reset
    // and still pauses for the margin
    assert_eq!(
        *clock.sleeps.borrow(),
        vec![Duration::from_secs(16 * 60), Duration::from_secs(60)]
    );
    assert_eq!(clock.total_slept(), Duration::from_secs(17 * 60));
}

#[test]
fn unavailable_record_is_skipped_exactly_once() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("tweets.csv");
    let mut fetcher = ScriptedFetcher::default().always(2, not_found());

    let summary = run(&corpus(&[1, 2, 3]), &out, &mut fetcher, &FakeClock::new()).unwrap();

    assert_eq!(fetcher.calls_for(2), 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.saved, 2);
    assert_eq!(output_ids(&out), vec![1, 3]);
}

#[test]
fn restart_resumes_after_last_saved_record() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("tweets.csv");
    let c = corpus(&[10, 20, 30, 40, 50]);

    // First run dies on a bad token at record 30
    let mut first = ScriptedFetcher::default().script(
        30,
        vec![Err(FetchError::Unauthorized {
            message: "token revoked".to_string(),
        })],
    );
    let err = run(&c, &out, &mut first, &FakeClock::new()).unwrap_err();
    assert!(matches!(err, LoopError::Fetch { id: 30, .. }));
    assert_eq!(output_ids(&out), vec![10, 20]);
    assert_eq!(resume_index(&c, &out).unwrap(), 2);

    let mut second = ScriptedFetcher::default();
    let summary = run(&c, &out, &mut second, &FakeClock::new()).unwrap();
    assert_eq!(summary.resumed_at, 2);
    assert_eq!(second.calls, vec![30, 40, 50]);
    assert_eq!(output_ids(&out), vec![10, 20, 30, 40, 50]);
}

#[test]
fn running_twice_produces_no_duplicates() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("tweets.csv");
    let c = corpus(&[1, 2, 3, 4]);

    let mut first = ScriptedFetcher::default().always(4, not_found());
    run(&c, &out, &mut first, &FakeClock::new()).unwrap();
    let mut second = ScriptedFetcher::default();
    let summary = run(&c, &out, &mut second, &FakeClock::new()).unwrap();

    // 4 was skipped by the first run, so it is the only record fetched again
    let ids = output_ids(&out);
    let unique: HashSet<i64> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len());
    assert_eq!(summary.resumed_at, 3);
    assert_eq!(second.calls, vec![4]);
}

#[test]
fn transport_failures_are_retried_with_backoff() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("tweets.csv");
    let clock = FakeClock::new();
    let mut fetcher = ScriptedFetcher::default().script(
        1,
        vec![
            Err(FetchError::Transport {
                message: "timed out".to_string(),
            }),
            Err(FetchError::Transport {
                message: "timed out".to_string(),
            }),
        ],
    );

    let summary = run(&corpus(&[1]), &out, &mut fetcher, &clock).unwrap();

    assert_eq!(summary.saved, 1);
    assert_eq!(summary.transport_retries, 2);
    assert_eq!(
        *clock.sleeps.borrow(),
        vec![Duration::from_secs(2), Duration::from_secs(4)]
    );
}

#[test]
fn persistent_transport_failure_aborts_without_skipping() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("tweets.csv");
    let transport = || {
        Err(FetchError::Transport {
            message: "dns failure".to_string(),
        })
    };
    let mut fetcher = ScriptedFetcher::default().script(2, (0..6).map(|_| transport()).collect());

    let err = run(&corpus(&[1, 2, 3]), &out, &mut fetcher, &FakeClock::new()).unwrap_err();

    assert!(matches!(
        err,
        LoopError::Fetch {
            id: 2,
            source: FetchError::Transport { .. }
        }
    ));
    assert_eq!(fetcher.calls_for(2), 6);
    assert_eq!(fetcher.calls_for(3), 0);
    assert_eq!(output_ids(&out), vec![1]);
}

#[test]
fn mismatched_output_fails_fast() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("tweets.csv");
    let mut seed = ScriptedFetcher::default();
    run(&corpus(&[100]), &out, &mut seed, &FakeClock::new()).unwrap();

    let mut fetcher = ScriptedFetcher::default();
    let err = run(&corpus(&[1, 2]), &out, &mut fetcher, &FakeClock::new()).unwrap_err();

    assert!(matches!(err, LoopError::Resume(_)));
    assert!(fetcher.calls.is_empty());
}

#[test]
fn progress_interval_does_not_change_results() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("tweets.csv");
    let ids: Vec<i64> = (1..=7).collect();
    let mut fetcher = ScriptedFetcher::default();
    let options = LoopOptions {
        progress_interval: 2,
        ..Default::default()
    };

    let summary = run_fetch_loop(
        &corpus(&ids),
        &OutputWriter::new(&out),
        &mut fetcher,
        &FakeClock::new(),
        &options,
        &ProgressBar::hidden(),
    )
    .unwrap();

    assert_eq!(summary.saved, 7);
    assert_eq!(output_ids(&out), ids);
}
