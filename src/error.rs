use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to any other error
    /// category in this enum. Reaching it means the bridge itself is broken.
    Internal,

    /// The caller asked for something the capability table never declared,
    /// or used a capability as the wrong kind. Fixing it means fixing code.
    Programmer,

    /// The capability is declared but this platform/build cannot provide it.
    /// Callers may recover, e.g. by falling back to another implementation.
    Environment,

    /// The caller supplied malformed input (lengths, types, arity).
    User,

    /// The native library ran and reported failure.
    Native,

    /// The bridge was configured inconsistently with the linked library.
    Configuration,
}

/// Fine-grained condition flags for consumers that want to branch on error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Name is not declared in the capability table.
    UnknownCapability,
    /// Declared, but failed to resolve at load time.
    CapabilityUnavailable,
    /// A constant was invoked, or a function was read as a value.
    WrongCapabilityKind,
    /// A buffer was missing, empty, or of the wrong length; or a length
    /// argument exceeded its bound.
    InvalidArgumentLength,
    /// An argument of the wrong shape (integer vs. buffer, null) was supplied.
    InvalidArgumentType,
    /// More arguments were supplied than the signature accepts.
    InvalidArgumentCount,
    /// The native call reported failure (e.g. authentication failed).
    NativeOperationFailed,
    /// The linked library's version does not match the capability table.
    VersionMismatch,
    /// Unexpected state reached within the bridge.
    InternalInvariant,
    /// Interaction with the filesystem, stdin/stdout, or other I/O failed.
    Io,
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct BridgeError {
    /// Broad error category, always provided.
    pub category: ErrorCategory,
    /// Specific condition tag, always provided.
    pub kind: ErrorKind,
    capability: Option<String>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl BridgeError {
    /// Creates a new error with a category, a kind and a display message.
    pub fn new(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind,
            capability: None,
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that retains the originating source error.
    pub fn with_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind,
            capability: None,
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// Tags the error with the capability it concerns.
    pub fn for_capability(mut self, name: impl Into<String>) -> Self {
        self.capability = Some(name.into());
        self
    }

    /// `name` was never declared in the capability table.
    pub fn unknown_capability(name: &str) -> Self {
        Self::new(
            ErrorCategory::Programmer,
            ErrorKind::UnknownCapability,
            format!("unknown capability: {name}"),
        )
        .for_capability(name)
    }

    /// `name` is declared but did not resolve at load time.
    pub fn unavailable(name: &str, reason: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorCategory::Environment,
            ErrorKind::CapabilityUnavailable,
            format!("capability {name} is unavailable: {reason}"),
        )
        .for_capability(name)
    }

    pub fn invalid_length(name: &str, msg: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorCategory::User,
            ErrorKind::InvalidArgumentLength,
            format!("{name}: {msg}"),
        )
        .for_capability(name)
    }

    pub fn invalid_type(name: &str, msg: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorCategory::User,
            ErrorKind::InvalidArgumentType,
            format!("{name}: {msg}"),
        )
        .for_capability(name)
    }

    /// The name of the capability the error concerns, if any.
    pub fn capability(&self) -> Option<&str> {
        self.capability.as_deref()
    }

    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns the preserved source error if present.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, BridgeError>;
