//! Error types for blogmate operations.

use thiserror::Error;

/// Result type alias for blogmate operations.
pub type Result<T> = std::result::Result<T, BlogError>;

/// Main error type for blogmate operations.
///
/// Every store, directory and AI call returns one of these kinds; the HTTP
/// layer maps them onto status codes.
#[derive(Error, Debug)]
pub enum BlogError {
    /// Requested entity, user or token owner does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Caller is not allowed to perform the operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Input failed validation
    #[error("Validation error: {0}")]
    ValidationFailed(String),

    /// Identifier is not a well-formed id
    #[error("Invalid id: {0}")]
    InvalidId(String),

    /// Child entity does not belong to the addressed parent
    #[error("Scope mismatch: {0}")]
    ScopeMismatch(String),

    /// Unique field already taken
    #[error("{0} already exists")]
    Duplicate(String),

    /// Token unknown, malformed or already consumed
    #[error("Invalid token")]
    InvalidToken,

    /// Token was valid but has expired
    #[error("Token expired")]
    TokenExpired,

    /// Login or password check failed
    #[error("Invalid credentials")]
    BadCredentials,

    /// The topical guard rejected a prompt
    #[error("Prompt is not about blogging")]
    OffTopic,

    /// Model output could not be parsed
    #[error("Failed to parse model response: {0}")]
    ParseFailed(String),

    /// Model produced fewer recommendations than required
    #[error("Insufficient recommendations generated: got {got}, need {need}")]
    InsufficientResults { got: usize, need: usize },

    /// AI call exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Store call exceeded its deadline or the worker was lost
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Author id does not resolve to a user
    #[error("Invalid author: {0}")]
    InvalidAuthor(String),

    /// Interacting user id does not resolve to a user
    #[error("Invalid user: {0}")]
    InvalidUser(String),

    /// Interaction type is not one of like, dislike, view
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// An admin tried to demote themselves
    #[error("Cannot demote yourself")]
    SelfDemotion,

    /// Storage backend errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else that should surface as an internal failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BlogError {
    /// Creates a new not-found error for the named thing.
    pub fn not_found<T: ToString>(what: T) -> Self {
        Self::NotFound(what.to_string())
    }

    /// Creates a new unauthorized error.
    pub fn unauthorized<T: ToString>(msg: T) -> Self {
        Self::Unauthorized(msg.to_string())
    }

    /// Creates a new validation error.
    pub fn validation<T: ToString>(msg: T) -> Self {
        Self::ValidationFailed(msg.to_string())
    }

    /// Creates a new scope mismatch error.
    pub fn scope<T: ToString>(msg: T) -> Self {
        Self::ScopeMismatch(msg.to_string())
    }

    /// Creates a new duplicate error for the named field.
    pub fn duplicate<T: ToString>(field: T) -> Self {
        Self::Duplicate(field.to_string())
    }

    /// Creates a new storage error.
    pub fn storage<T: ToString>(msg: T) -> Self {
        Self::Storage(msg.to_string())
    }

    /// Creates a new serialization error.
    pub fn serialization<T: ToString>(msg: T) -> Self {
        Self::Serialization(msg.to_string())
    }

    /// Creates a new configuration error.
    pub fn config<T: ToString>(msg: T) -> Self {
        Self::Config(msg.to_string())
    }

    /// Creates a new internal error.
    pub fn internal<T: ToString>(msg: T) -> Self {
        Self::Internal(msg.to_string())
    }

    /// Returns true for errors caused by the caller's input rather than the system.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::Timeout(_)
                | Self::StoreUnavailable(_)
                | Self::Storage(_)
                | Self::Serialization(_)
                | Self::Config(_)
                | Self::Io(_)
                | Self::Internal(_)
        )
    }
}
