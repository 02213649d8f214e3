use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static HOSTILE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/*?:"<>|]"#).expect("static regex is valid"));

/// One row's image fetch. Built by the row normalizer, consumed once by the
/// fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTask {
    pub row_index: u64,
    pub display_name: String,
    pub source_url: Option<String>,
}

impl FetchTask {
    pub fn sanitized_name(&self) -> SanitizedName {
        SanitizedName::new(&self.display_name)
    }
}

/// Display name with characters that are illegal in file names replaced by `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SanitizedName(String);

impl SanitizedName {
    pub fn new(display_name: &str) -> Self {
        Self(HOSTILE_CHARS.replace_all(display_name, "_").into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn with_extension(&self, extension: &str) -> String {
        format!("{}.{}", self.0, extension.trim_start_matches('.'))
    }
}

impl fmt::Display for SanitizedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Status(u16),
    Transport(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Status(code) => write!(f, "status: {code}"),
            FailureReason::Transport(message) => write!(f, "{message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success {
        row_index: u64,
        sanitized_name: SanitizedName,
        bytes: Vec<u8>,
    },
    Failure {
        row_index: u64,
        sanitized_name: SanitizedName,
        source_url: String,
        reason: FailureReason,
    },
}

impl FetchOutcome {
    pub fn row_index(&self) -> u64 {
        match self {
            FetchOutcome::Success { row_index, .. } | FetchOutcome::Failure { row_index, .. } => {
                *row_index
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }
}

/// A failed task as kept by the ledger. `display_name` is the name the failure
/// outcome carried, i.e. the sanitized one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub row_index: u64,
    pub display_name: String,
    pub source_url: String,
    pub reason: FailureReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}
