//! Availability guard: the single check between a caller and native code.

use crate::error::{BridgeError, Result};
use crate::loader::{Capability, Registry};

/// Returns the capability if it resolved at load time.
///
/// Fails with `UnknownCapability` if `name` was never declared, and with
/// `CapabilityUnavailable` if it was declared but is absent. Both the
/// constant and the function paths go through here before touching the
/// native library.
pub fn guard<'r>(registry: &'r Registry, name: &str) -> Result<&'r Capability> {
    let capability = registry
        .get(name)
        .ok_or_else(|| BridgeError::unknown_capability(name))?;
    match capability.absence() {
        Some(reason) => Err(BridgeError::unavailable(name, reason)),
        None if capability.is_present() => Ok(capability),
        // Registries are only published fully settled.
        None => Err(BridgeError::unavailable(name, "not resolved")),
    }
}
