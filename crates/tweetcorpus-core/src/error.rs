//! Error types for corpus I/O, tweet fetching, and the fetch loop

use std::path::PathBuf;

/// Error reading the corpus or the output file.
///
/// All variants are fatal: they mean the input data cannot be trusted
/// to drive (or resume) a run.
#[derive(Debug)]
pub enum CorpusError {
    /// File could not be opened or read
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A row could not be parsed (1-based line number)
    Parse {
        path: PathBuf,
        line: u64,
        message: String,
    },
    /// An output row has no matching position in the corpus
    ResumeMismatch {
        path: PathBuf,
        id: i64,
        row: usize,
    },
}

impl std::fmt::Display for CorpusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Parse {
                path,
                line,
                message,
            } => write!(f, "{}:{line}: {message}", path.display()),
            Self::ResumeMismatch { path, id, row } => write!(
                f,
                "{}: row {row} has id {id} which does not follow the corpus order",
                path.display()
            ),
        }
    }
}

impl std::error::Error for CorpusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Failure of a single fetch call that is not a structured API outcome.
#[derive(Debug)]
pub enum FetchError {
    /// No response: DNS, connect, timeout, or body read failure
    Transport { message: String },
    /// Credentials rejected (HTTP 401)
    Unauthorized { message: String },
    /// A 200 response whose body could not be decoded
    Decode { message: String },
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport { message } => write!(f, "transport error: {message}"),
            Self::Unauthorized { message } => write!(f, "unauthorized: {message}"),
            Self::Decode { message } => write!(f, "invalid response body: {message}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl FetchError {
    /// Only transport failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Error that stops the fetch loop.
#[derive(Debug)]
pub enum LoopError {
    Resume(CorpusError),
    Fetch { id: i64, source: FetchError },
    Write { id: i64, source: std::io::Error },
}

impl std::fmt::Display for LoopError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resume(e) => write!(f, "locating resume position: {e}"),
            Self::Fetch { id, source } => write!(f, "fetching tweet {id}: {source}"),
            Self::Write { id, source } => write!(f, "saving tweet {id}: {source}"),
        }
    }
}

impl std::error::Error for LoopError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Resume(e) => Some(e),
            Self::Fetch { source, .. } => Some(source),
            Self::Write { source, .. } => Some(source),
        }
    }
}
