use thiserror::Error;
use tracklist_core_types::RunId;

/// Result type alias using the canonical error facility
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure in the pipeline maps to one of these kinds. Each kind has a
/// stable code used by tests, batch summaries and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Validation
    InvalidInput,
    NotFound,
    AlreadyExists,
    UnknownEntityType,
    MetadataMismatch,

    // Setup / configuration (fatal)
    InvalidConfig,
    ListNotSet,

    // Snapshot store
    /// Snapshot bytes exist but cannot be decoded (recovered locally as "no snapshot")
    CorruptSnapshot,

    // Fetch capability
    /// Upstream signalled a rate limit; batch drivers halt on this kind
    RateLimited,
    /// Upstream reported the entity does not exist
    UpstreamNotFound,
    /// Any other transport failure (recoverable, skip-and-continue)
    Transport,

    // Integration/IO
    Io,
    Serialization,
    Persistence,
    Concurrency,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::UnknownEntityType => "ERR_UNKNOWN_ENTITY_TYPE",
            ExErrorKind::MetadataMismatch => "ERR_METADATA_MISMATCH",
            ExErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            ExErrorKind::ListNotSet => "ERR_LIST_NOT_SET",
            ExErrorKind::CorruptSnapshot => "ERR_CORRUPT_SNAPSHOT",
            ExErrorKind::RateLimited => "ERR_RATE_LIMITED",
            ExErrorKind::UpstreamNotFound => "ERR_UPSTREAM_NOT_FOUND",
            ExErrorKind::Transport => "ERR_TRANSPORT",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Concurrency => "ERR_CONCURRENCY",
        }
    }

    /// Whether a batch driver must stop processing further entities
    pub fn halts_batch(&self) -> bool {
        matches!(self, ExErrorKind::RateLimited)
    }

    /// Whether this kind is a setup error that must never be swallowed per entity
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExErrorKind::ListNotSet | ExErrorKind::InvalidConfig)
    }
}

/// Canonical structured error type
///
/// Carries a classification for programmatic handling plus the context
/// (operation, identifier, run) needed to explain a per-entity failure.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    entity_type: Option<String>,
    run_id: Option<RunId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            entity_type: None,
            run_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity identifier context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add entity type context
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Add run ID context
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity identifier context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the entity type context, if any
    pub fn entity_type(&self) -> Option<&str> {
        self.entity_type.as_deref()
    }

    /// Get the run ID context, if any
    pub fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_type) = &self.entity_type {
            write!(f, " (entity_type: {})", entity_type)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(run_id) = &self.run_id {
            write!(f, " (run: {})", run_id)?;
        }
        if let Some(source) = &self.source {
            write!(f, " <- {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|s| s as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain error taxonomy for the tracking pipeline
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    // ===== Setup Errors =====
    /// Reconciliation was attempted before the target list was resolved
    #[error("Target list not set for entity type {entity_type}: call set_list() first")]
    ListNotSet { entity_type: String },

    /// Change detector or registry configuration is unusable
    #[error("Invalid configuration for {entity_type}: {reason}")]
    InvalidConfig { entity_type: String, reason: String },

    /// Entity type name is not present in the registry
    #[error("Unknown entity type: {entity_type}")]
    UnknownEntityType { entity_type: String },

    // ===== List Errors =====
    /// List does not exist
    #[error("List not found: {list_id}")]
    ListNotFound { list_id: String },

    /// List item does not exist
    #[error("List item not found: {full_name} in list {list_id}")]
    ItemNotFound { list_id: String, full_name: String },

    /// List item already exists for (list_id, full_name)
    #[error("List item already exists: {full_name} in list {list_id}")]
    ItemAlreadyExists { list_id: String, full_name: String },

    /// Metadata tag does not match the list's source type
    #[error("Metadata of type {actual} cannot be stored in a {expected} list")]
    MetadataMismatch { expected: String, actual: String },

    // ===== Encoding =====
    /// Serialization error (JSON encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl From<TrackerError> for ExError {
    fn from(err: TrackerError) -> Self {
        let message = err.to_string();
        match err {
            TrackerError::ListNotSet { entity_type } => ExError::new(ExErrorKind::ListNotSet)
                .with_entity_type(entity_type)
                .with_message(message),
            TrackerError::InvalidConfig { entity_type, .. } => {
                ExError::new(ExErrorKind::InvalidConfig)
                    .with_entity_type(entity_type)
                    .with_message(message)
            }
            TrackerError::UnknownEntityType { entity_type } => {
                ExError::new(ExErrorKind::UnknownEntityType)
                    .with_entity_type(entity_type)
                    .with_message(message)
            }
            TrackerError::ListNotFound { list_id } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(list_id)
                .with_message(message),
            TrackerError::ItemNotFound { full_name, .. } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(full_name)
                .with_message(message),
            TrackerError::ItemAlreadyExists { full_name, .. } => {
                ExError::new(ExErrorKind::AlreadyExists)
                    .with_entity_id(full_name)
                    .with_message(message)
            }
            TrackerError::MetadataMismatch { .. } => {
                ExError::new(ExErrorKind::MetadataMismatch).with_message(message)
            }
            TrackerError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
        }
    }
}

/// Conversion from serde_json::Error to TrackerError
impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        TrackerError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Create a serialization error for the given operation
pub fn serialization_error(op: &str, err: impl std::fmt::Display) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op(op.to_string())
        .with_message(err.to_string())
}
