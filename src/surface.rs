//! The caller-facing binding surface.
//!
//! A [`Bridge`] owns a native library and the registry loaded from it.
//! Every call takes a snapshot of the current registry, passes the
//! availability guard, validates arguments against the resolved signature
//! and only then reaches native code. Output buffers are returned exactly
//! as the native layer produced them.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::buffer::{Arg, Buffer};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, ErrorCategory, ErrorKind, Result};
use crate::guard::guard;
use crate::loader::{self, AbsenceReason, Binding, Bound, Capability, Registry, ResolvedParam};
use crate::native::NativeLibrary;

/// Introspection record for one capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityInfo {
    pub name: &'static str,
    pub symbol: &'static str,
    /// `"constant"` or `"function"`.
    pub kind: &'static str,
    pub present: bool,
    pub absence: Option<AbsenceReason>,
    pub description: &'static str,
}

impl CapabilityInfo {
    fn of(capability: &Capability) -> Self {
        let spec = capability.spec();
        Self {
            name: spec.name,
            symbol: spec.symbol,
            kind: spec.kind.label(),
            present: capability.is_present(),
            absence: capability.absence().cloned(),
            description: spec.description,
        }
    }
}

pub struct Bridge {
    library: Arc<dyn NativeLibrary>,
    config: BridgeConfig,
    registry: RwLock<Arc<Registry>>,
    // Serializes reloads so generations stay monotonic.
    reloading: Mutex<()>,
}

impl Bridge {
    /// Load `library` and build the bridge around it.
    pub fn load(library: impl NativeLibrary + 'static, config: BridgeConfig) -> Result<Self> {
        Self::from_shared(Arc::new(library), config)
    }

    pub fn from_shared(library: Arc<dyn NativeLibrary>, config: BridgeConfig) -> Result<Self> {
        let registry = loader::load(library.as_ref(), &config)?;
        Ok(Self {
            library,
            config,
            registry: RwLock::new(Arc::new(registry)),
            reloading: Mutex::new(()),
        })
    }

    /// Rerun the loader and publish the new registry in one swap.
    ///
    /// Calls already in flight finish against the registry they started
    /// with. On error the current registry stays in place.
    pub fn reload(&self) -> Result<()> {
        let _reloading = self.reloading.lock().unwrap_or_else(PoisonError::into_inner);
        let generation = self.registry().generation() + 1;
        let fresh = loader::load_generation(self.library.as_ref(), &self.config, generation)?;
        *self.registry.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(fresh);
        Ok(())
    }

    /// Snapshot of the current registry.
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Value of a constant capability.
    pub fn value(&self, name: &str) -> Result<usize> {
        let registry = self.registry();
        let capability = guard(&registry, name)?;
        match capability.binding() {
            Some(Binding::Constant(value)) => Ok(*value),
            _ => Err(wrong_kind(name, "function", "read as a value")),
        }
    }

    /// Invoke a function capability.
    ///
    /// Missing trailing arguments are treated as [`Arg::Null`]. The native
    /// function is not called unless every argument matches its signature.
    pub fn invoke(&self, name: &str, mut args: Vec<Arg>) -> Result<Buffer> {
        let registry = self.registry();
        let capability = guard(&registry, name)?;
        let Some(Binding::Function { params, native }) = capability.binding() else {
            return Err(wrong_kind(name, "constant", "invoked"));
        };

        if args.len() > params.len() {
            return Err(BridgeError::new(
                ErrorCategory::User,
                ErrorKind::InvalidArgumentCount,
                format!(
                    "{name}: expected at most {} arguments, got {}",
                    params.len(),
                    args.len()
                ),
            )
            .for_capability(name));
        }
        args.resize_with(params.len(), || Arg::Null);
        for (param, arg) in params.iter().zip(&args) {
            check_arg(name, param, arg)?;
        }

        native(args).map_err(|e| {
            BridgeError::with_source(
                ErrorCategory::Native,
                ErrorKind::NativeOperationFailed,
                format!("{name} failed: {}", e.message),
                e,
            )
            .for_capability(name)
        })
    }

    /// Names of present capabilities, in table order.
    pub fn available(&self) -> Vec<&'static str> {
        self.registry()
            .iter()
            .filter(|c| c.is_present())
            .map(Capability::name)
            .collect()
    }

    /// Every declared capability with its load outcome.
    pub fn capabilities(&self) -> Vec<CapabilityInfo> {
        self.registry().iter().map(CapabilityInfo::of).collect()
    }

    /// Load outcome of one capability; fails only for undeclared names.
    pub fn describe(&self, name: &str) -> Result<CapabilityInfo> {
        self.registry()
            .get(name)
            .map(CapabilityInfo::of)
            .ok_or_else(|| BridgeError::unknown_capability(name))
    }
}

fn wrong_kind(name: &str, actual: &str, action: &str) -> BridgeError {
    BridgeError::new(
        ErrorCategory::Programmer,
        ErrorKind::WrongCapabilityKind,
        format!("{name} is a {actual} and cannot be {action}"),
    )
    .for_capability(name)
}

fn check_arg(name: &str, param: &ResolvedParam, arg: &Arg) -> Result<()> {
    match (param, arg) {
        (ResolvedParam::Bytes { label, len }, Arg::Bytes(buffer)) => match *len {
            Bound::Exact(n) if buffer.len() != n => Err(BridgeError::invalid_length(
                name,
                format!("{label} must be {n} bytes, got {}", buffer.len()),
            )),
            Bound::AtLeast(n) if buffer.len() < n => Err(BridgeError::invalid_length(
                name,
                format!("{label} must be at least {n} bytes, got {}", buffer.len()),
            )),
            _ => Ok(()),
        },
        (
            ResolvedParam::Bytes {
                label,
                len: Bound::Exact(n) | Bound::AtLeast(n),
            },
            Arg::Null,
        ) => Err(BridgeError::invalid_length(
            name,
            format!("{label} is required ({n} bytes), got null"),
        )),
        (ResolvedParam::Bytes { label, .. }, other) => Err(BridgeError::invalid_type(
            name,
            format!("{label} must be bytes, got {}", other.shape()),
        )),
        (ResolvedParam::Length { label, max }, Arg::Int(value)) => match *max {
            Some(max) if *value > max as u64 => Err(BridgeError::invalid_length(
                name,
                format!("{label} {value} exceeds maximum {max}"),
            )),
            _ => Ok(()),
        },
        (ResolvedParam::Int { .. }, Arg::Int(_)) => Ok(()),
        (ResolvedParam::Length { label, .. } | ResolvedParam::Int { label }, other) => {
            Err(BridgeError::invalid_type(
                name,
                format!("{label} must be an integer, got {}", other.shape()),
            ))
        }
    }
}
