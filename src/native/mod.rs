//! The native library boundary.
//!
//! The bridge never talks to cryptographic code directly: it asks a
//! [`NativeLibrary`] for symbols by name, the way a dynamic loader would,
//! and records what it finds.

mod bundled;
mod instrumented;
mod masked;

pub use bundled::BundledLibrary;
pub use instrumented::InstrumentedLibrary;
pub use masked::MaskedLibrary;

use std::sync::Arc;

use thiserror::Error;

use crate::buffer::{Arg, Buffer};
use crate::capability::LibraryVersion;

/// Failure reported by the native layer, kept verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{symbol} returned {code}: {message}")]
pub struct NativeFailure {
    pub symbol: &'static str,
    /// Native return code (libsodium uses -1 for failure).
    pub code: i32,
    pub message: String,
}

impl NativeFailure {
    pub fn new(symbol: &'static str, message: impl Into<String>) -> Self {
        Self {
            symbol,
            code: -1,
            message: message.into(),
        }
    }
}

pub type NativeResult<T> = std::result::Result<T, NativeFailure>;

/// A resolved native function. Arguments are moved in; the result is a
/// fresh buffer owned by the caller.
pub type NativeFn = Arc<dyn Fn(Vec<Arg>) -> NativeResult<Buffer> + Send + Sync>;

/// The symbol table of a linked native cryptographic library.
pub trait NativeLibrary: Send + Sync {
    /// Human-readable library name for logs.
    fn name(&self) -> &str;

    /// ABI version, if the library exposes one.
    fn version(&self) -> Option<LibraryVersion>;

    /// One-time library initialization (`sodium_init`). Must be safe to
    /// call more than once.
    fn init(&self) -> NativeResult<()>;

    /// Value of an exported integer constant.
    fn constant(&self, symbol: &str) -> Option<usize>;

    /// An exported function.
    fn function(&self, symbol: &str) -> Option<NativeFn>;
}

impl<L: NativeLibrary + ?Sized> NativeLibrary for Arc<L> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn version(&self) -> Option<LibraryVersion> {
        (**self).version()
    }

    fn init(&self) -> NativeResult<()> {
        (**self).init()
    }

    fn constant(&self, symbol: &str) -> Option<usize> {
        (**self).constant(symbol)
    }

    fn function(&self, symbol: &str) -> Option<NativeFn> {
        (**self).function(symbol)
    }
}
