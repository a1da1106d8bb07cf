use thiserror::Error;

/// Why a pull request could not be placed in a release-note category.
///
/// These are recoverable: the sorter reports them per PR and keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CategorizationError {
    #[error("Missing label: #{id} ({title}): {labels}")]
    MissingLabel {
        id: u64,
        title: String,
        labels: String,
    },

    #[error("Ambiguous labels: #{id} ({title}) has exclusive categories {categories:?}")]
    AmbiguousLabels {
        id: u64,
        title: String,
        categories: Vec<String>,
    },
}

impl CategorizationError {
    pub fn pull_id(&self) -> u64 {
        match self {
            CategorizationError::MissingLabel { id, .. } => *id,
            CategorizationError::AmbiguousLabels { id, .. } => *id,
        }
    }
}

/// Unified error type for release bookkeeping operations
#[derive(Error, Debug)]
pub enum ReleaseNotesError {
    #[error("Version control command failed: {0}")]
    Vcs(String),

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Lookup failed: {0}")]
    Lookup(String),

    #[error("Categorization error: {0}")]
    Categorization(#[from] CategorizationError),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("{service} returned {status}: {context}")]
    RemoteService {
        service: String,
        status: u16,
        context: String,
    },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Version parsing error: {0}")]
    Version(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, ReleaseNotesError>;

impl ReleaseNotesError {
    /// Create a version-control error with context
    pub fn vcs(msg: impl Into<String>) -> Self {
        ReleaseNotesError::Vcs(msg.into())
    }

    /// Create a lookup error with context
    pub fn lookup(msg: impl Into<String>) -> Self {
        ReleaseNotesError::Lookup(msg.into())
    }

    /// Create a schema error with context
    pub fn schema(msg: impl Into<String>) -> Self {
        ReleaseNotesError::Schema(msg.into())
    }

    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseNotesError::Config(msg.into())
    }

    /// Create a version error with context
    pub fn version(msg: impl Into<String>) -> Self {
        ReleaseNotesError::Version(msg.into())
    }

    /// Create a remote service error for a non-2xx response
    pub fn remote(service: impl Into<String>, status: u16, context: impl Into<String>) -> Self {
        ReleaseNotesError::RemoteService {
            service: service.into(),
            status,
            context: context.into(),
        }
    }

    /// Whether re-running the failing step might succeed.
    ///
    /// Server-side (5xx) responses and transport failures are observed to be
    /// transient; everything else needs a human to change an input first.
    pub fn is_transient(&self) -> bool {
        match self {
            ReleaseNotesError::RemoteService { status, .. } => *status >= 500,
            ReleaseNotesError::Http(_) => true,
            _ => false,
        }
    }
}
