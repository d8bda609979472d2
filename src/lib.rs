//! sodium-bridge - capability-checked access to libsodium primitives
//!
//! The bridge loads a native cryptographic library, records per capability
//! whether it resolved, and exposes constants and functions through
//! [`Bridge::value`] and [`Bridge::invoke`]. Missing natives surface as
//! typed `CapabilityUnavailable` errors instead of crashes, and malformed
//! arguments are rejected before any native code runs.

#![forbid(unsafe_code)]

pub mod buffer;
pub mod capability;
pub mod config;
pub mod error;
pub mod guard;
pub mod loader;
pub mod native;
pub mod surface;

pub use buffer::{Arg, Buffer};
pub use config::BridgeConfig;
pub use error::{BridgeError, ErrorCategory, ErrorKind, Result};
pub use surface::{Bridge, CapabilityInfo};

use once_cell::sync::OnceCell;

use native::BundledLibrary;

static GLOBAL: OnceCell<Bridge> = OnceCell::new();

/// The process-wide bridge over the bundled library, configured from the
/// environment on first use.
///
/// A configuration error is returned to every caller until one succeeds;
/// once loaded the same bridge is returned for the life of the process.
pub fn global() -> Result<&'static Bridge> {
    GLOBAL.get_or_try_init(|| Bridge::load(BundledLibrary::new(), BridgeConfig::from_env()))
}
