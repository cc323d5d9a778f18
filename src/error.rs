//! Unified error handling for slirc-dispatch.
//!
//! Matching-phase errors ([`ArgumentSyntaxError`], [`DispatchError`]) are
//! resolved inside the engine and always surfaced to the user through the
//! message's reply capability. Handler errors ([`HandlerError`]) are never
//! caught by the engine; they propagate to whatever supervises the message
//! task (see [`crate::router::EventRouter`]).

use thiserror::Error;

// ============================================================================
// Matching Errors (argument parsing)
// ============================================================================

/// Raised by an argument matcher that explicitly rejects its input.
///
/// Aborts the whole dispatch chain. `message` is sent to the user, followed by
/// the node's usage string when `show_usage` is set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ArgumentSyntaxError {
    pub message: String,
    pub show_usage: bool,
}

impl ArgumentSyntaxError {
    /// Syntax error that appends the node's usage to the reply.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            show_usage: true,
        }
    }

    /// Syntax error whose reply is only the message itself.
    pub fn without_usage(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            show_usage: false,
        }
    }
}

/// Reasons a matched command was rejected before reaching its handler.
///
/// The user has already been told by the time one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("syntax error: {0}")]
    Syntax(#[from] ArgumentSyntaxError),

    #[error("missing required argument: {name}")]
    MissingArgument { name: String },

    #[error("subcommand required")]
    SubcommandRequired,
}

impl DispatchError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Syntax(_) => "syntax_error",
            Self::MissingArgument { .. } => "missing_argument",
            Self::SubcommandRequired => "subcommand_required",
        }
    }
}

// ============================================================================
// Handler Errors (bound handler execution)
// ============================================================================

/// Failure delivering a reply. The engine logs these and moves on.
#[derive(Debug, Error)]
#[error("reply failed: {0}")]
pub struct ReplyError(pub String);

/// Errors raised by command and passive handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Reply(#[from] ReplyError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),

    /// Several stacked passive handlers failed on the same message.
    #[error("{} handlers failed", .0.len())]
    Multiple(Vec<HandlerError>),
}

impl HandlerError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Failed(_) => "handler_failed",
            Self::Reply(_) => "reply_error",
            Self::Internal(_) => "internal_error",
            Self::Multiple(_) => "multiple_errors",
        }
    }
}

/// Result type for command and passive handlers.
pub type HandlerResult = Result<(), HandlerError>;

// ============================================================================
// Registration Errors
// ============================================================================

/// Errors detected while freezing the command tree or building a watcher.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("command name must not be empty")]
    EmptyName,

    #[error("command name {0:?} contains whitespace")]
    NameWhitespace(String),

    #[error("command {0:?} has more than one name rule")]
    ConflictingNameRule(String),

    #[error("argument name must not be empty")]
    EmptyArgumentName,

    #[error("invalid pattern for {name}: {source}")]
    Pattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("passive watcher has no handler")]
    MissingHandler,
}
