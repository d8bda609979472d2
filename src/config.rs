//! Loader configuration: operator-disabled capabilities and version policy.

use std::collections::BTreeSet;

/// Comma-separated capability names to force absent.
pub const DISABLE_ENV: &str = "SODIUM_BRIDGE_DISABLE";

/// Set to a truthy value (`1`, `yes`, `true`, `on`) to load even if the
/// library version does not match.
pub const SKIP_VERSION_CHECK_ENV: &str = "SODIUM_BRIDGE_SKIP_VERSION_CHECK";

/// Configuration consumed by the loader.
///
/// Capabilities not in the disabled set are loaded if the native library
/// provides them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    disabled: BTreeSet<String>,
    /// Fail the load when the library reports an incompatible version.
    pub enforce_version: bool,
}

impl BridgeConfig {
    /// Nothing disabled, version enforced.
    pub fn new() -> Self {
        Self {
            disabled: BTreeSet::new(),
            enforce_version: true,
        }
    }

    /// Create a config with specific capabilities disabled.
    pub fn with_disabled(disabled: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            disabled: disabled.into_iter().map(Into::into).collect(),
            ..Self::new()
        }
    }

    /// Build a config from `SODIUM_BRIDGE_DISABLE` and
    /// `SODIUM_BRIDGE_SKIP_VERSION_CHECK`.
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var(DISABLE_ENV).ok().as_deref(),
            std::env::var(SKIP_VERSION_CHECK_ENV).ok().as_deref(),
        )
    }

    fn from_vars(disable: Option<&str>, skip_version_check: Option<&str>) -> Self {
        let mut config = Self::new();
        if let Some(list) = disable {
            for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                config.disable(name);
            }
        }
        if let Some(flag) = skip_version_check {
            let flag = flag.trim().to_ascii_lowercase();
            config.enforce_version = !matches!(flag.as_str(), "1" | "y" | "yes" | "t" | "true" | "on");
        }
        config
    }

    pub fn disable(&mut self, name: impl Into<String>) {
        self.disabled.insert(name.into());
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled.contains(name)
    }

    /// Disabled names, sorted.
    pub fn disabled(&self) -> impl Iterator<Item = &str> {
        self.disabled.iter().map(String::as_str)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new()
    }
}
