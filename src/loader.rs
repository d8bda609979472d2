//! Resolves the capability table against a native library.
//!
//! Each capability moves from `Unresolved` to exactly one of `Present` or
//! `Absent` during a load and never changes afterwards. Loading is
//! independent per capability: a missing symbol only takes down that
//! capability (and functions whose argument sizes depend on it).

use std::collections::HashMap;
use std::fmt;

use crate::capability::{
    CAPABILITIES, CapabilityKind, CapabilitySpec, Len, LibraryVersion, Param, REQUIRED_VERSION,
    SizeRef, describe,
};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, ErrorCategory, ErrorKind, Result};
use crate::native::{NativeFn, NativeLibrary};

/// Why a declared capability did not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbsenceReason {
    /// Library initialization failed; nothing from it is trusted.
    InitFailed(String),
    /// Disabled by configuration.
    Disabled,
    /// The native library does not export the symbol.
    SymbolMissing,
    /// The library reports a different value than the table expects.
    SizeMismatch { expected: usize, actual: usize },
    /// A constant this function's argument sizes depend on is absent.
    DependencyAbsent(&'static str),
}

impl fmt::Display for AbsenceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbsenceReason::InitFailed(msg) => {
                write!(f, "native library failed to initialize: {msg}")
            }
            AbsenceReason::Disabled => write!(f, "disabled by configuration"),
            AbsenceReason::SymbolMissing => write!(f, "native symbol not found"),
            AbsenceReason::SizeMismatch { expected, actual } => {
                write!(f, "native library reports {actual}, expected {expected}")
            }
            AbsenceReason::DependencyAbsent(name) => write!(f, "depends on absent constant {name}"),
        }
    }
}

/// A byte-length rule with sizes filled in from the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Exact(usize),
    AtLeast(usize),
    Any,
}

/// A signature parameter with sizes filled in from the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedParam {
    Bytes { label: &'static str, len: Bound },
    Length { label: &'static str, max: Option<usize> },
    Int { label: &'static str },
}

impl ResolvedParam {
    pub fn label(&self) -> &'static str {
        match self {
            ResolvedParam::Bytes { label, .. }
            | ResolvedParam::Length { label, .. }
            | ResolvedParam::Int { label } => label,
        }
    }
}

/// What a present capability is bound to.
pub enum Binding {
    Constant(usize),
    Function {
        params: Vec<ResolvedParam>,
        native: NativeFn,
    },
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Binding::Function { params, .. } => f
                .debug_struct("Function")
                .field("params", params)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Debug)]
pub enum Availability {
    Unresolved,
    Present(Binding),
    Absent(AbsenceReason),
}

/// A declared capability together with its load outcome.
#[derive(Debug)]
pub struct Capability {
    spec: &'static CapabilitySpec,
    availability: Availability,
}

impl Capability {
    fn unresolved(spec: &'static CapabilitySpec) -> Self {
        Self {
            spec,
            availability: Availability::Unresolved,
        }
    }

    /// Records the load outcome. Only valid once, and only with a terminal state.
    fn settle(&mut self, outcome: Availability) -> Result<()> {
        if !matches!(self.availability, Availability::Unresolved) {
            return Err(BridgeError::new(
                ErrorCategory::Internal,
                ErrorKind::InternalInvariant,
                format!("capability {} settled twice", self.spec.name),
            ));
        }
        if matches!(outcome, Availability::Unresolved) {
            return Err(BridgeError::new(
                ErrorCategory::Internal,
                ErrorKind::InternalInvariant,
                format!("capability {} settled to unresolved", self.spec.name),
            ));
        }
        self.availability = outcome;
        Ok(())
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn spec(&self) -> &'static CapabilitySpec {
        self.spec
    }

    pub fn kind(&self) -> CapabilityKind {
        self.spec.kind
    }

    pub fn availability(&self) -> &Availability {
        &self.availability
    }

    pub fn is_present(&self) -> bool {
        matches!(self.availability, Availability::Present(_))
    }

    pub fn absence(&self) -> Option<&AbsenceReason> {
        match &self.availability {
            Availability::Absent(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn binding(&self) -> Option<&Binding> {
        match &self.availability {
            Availability::Present(binding) => Some(binding),
            _ => None,
        }
    }
}

/// The loaded capability table. Immutable once returned by [`load`].
#[derive(Debug)]
pub struct Registry {
    capabilities: Vec<Capability>,
    index: HashMap<&'static str, usize>,
    library: String,
    version: Option<LibraryVersion>,
    generation: u64,
}

impl Registry {
    fn unresolved(library: &dyn NativeLibrary, generation: u64) -> Self {
        let capabilities: Vec<_> = CAPABILITIES.iter().map(Capability::unresolved).collect();
        let index = capabilities
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name(), i))
            .collect();
        Self {
            capabilities,
            index,
            library: library.name().to_string(),
            version: library.version(),
            generation,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.index.get(name).map(|&i| &self.capabilities[i])
    }

    /// All capabilities in table order.
    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.capabilities.iter()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    pub fn present_count(&self) -> usize {
        self.iter().filter(|c| c.is_present()).count()
    }

    /// `(name, present)` for every capability, in table order.
    pub fn presence(&self) -> Vec<(&'static str, bool)> {
        self.iter().map(|c| (c.name(), c.is_present())).collect()
    }

    pub fn library(&self) -> &str {
        &self.library
    }

    pub fn version(&self) -> Option<LibraryVersion> {
        self.version
    }

    /// Incremented on each reload of the owning bridge.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn constant_value(&self, name: &str) -> Option<usize> {
        match self.get(name)?.binding()? {
            Binding::Constant(value) => Some(*value),
            Binding::Function { .. } => None,
        }
    }

    fn resolve_size(&self, size: SizeRef) -> std::result::Result<usize, AbsenceReason> {
        match size {
            SizeRef::Literal(n) => Ok(n),
            SizeRef::Const(name) => self
                .constant_value(name)
                .ok_or(AbsenceReason::DependencyAbsent(name)),
        }
    }

    fn resolve_params(
        &self,
        params: &[Param],
    ) -> std::result::Result<Vec<ResolvedParam>, AbsenceReason> {
        params
            .iter()
            .map(|param| -> std::result::Result<ResolvedParam, AbsenceReason> {
                Ok(match *param {
                    Param::Bytes(label, len) => ResolvedParam::Bytes {
                        label,
                        len: match len {
                            Len::Exact(size) => Bound::Exact(self.resolve_size(size)?),
                            Len::AtLeast(size) => Bound::AtLeast(self.resolve_size(size)?),
                            Len::Any => Bound::Any,
                        },
                    },
                    Param::Length(label, max) => ResolvedParam::Length {
                        label,
                        max: max.map(|size| self.resolve_size(size)).transpose()?,
                    },
                    Param::Int(label) => ResolvedParam::Int { label },
                })
            })
            .collect()
    }
}

/// Resolve every declared capability against `library`.
///
/// Fails only for configuration errors (incompatible library version,
/// unknown names in the disabled set). Individual missing capabilities are
/// recorded as `Absent`, never returned as errors.
pub fn load(library: &dyn NativeLibrary, config: &BridgeConfig) -> Result<Registry> {
    load_generation(library, config, 0)
}

pub(crate) fn load_generation(
    library: &dyn NativeLibrary,
    config: &BridgeConfig,
    generation: u64,
) -> Result<Registry> {
    check_version(library, config)?;

    for name in config.disabled() {
        if describe(name).is_err() {
            return Err(BridgeError::new(
                ErrorCategory::Configuration,
                ErrorKind::UnknownCapability,
                format!("cannot disable unknown capability {name}"),
            )
            .for_capability(name));
        }
    }

    let init_failure = library.init().err().map(|e| {
        tracing::warn!(library = library.name(), error = %e, "native library failed to initialize");
        e.to_string()
    });

    let mut registry = Registry::unresolved(library, generation);

    // Constants first: function signatures are sized from them.
    for pass_functions in [false, true] {
        for i in 0..registry.capabilities.len() {
            let spec = registry.capabilities[i].spec;
            if spec.kind.is_function() != pass_functions {
                continue;
            }
            let outcome = if config.is_disabled(spec.name) {
                Availability::Absent(AbsenceReason::Disabled)
            } else if let Some(msg) = &init_failure {
                Availability::Absent(AbsenceReason::InitFailed(msg.clone()))
            } else {
                resolve(&registry, library, spec)
            };
            match &outcome {
                Availability::Absent(reason) => {
                    tracing::debug!(
                        capability = spec.name,
                        symbol = spec.symbol,
                        %reason,
                        "capability absent"
                    );
                }
                _ => {
                    tracing::debug!(
                        capability = spec.name,
                        symbol = spec.symbol,
                        "capability present"
                    );
                }
            }
            registry.capabilities[i].settle(outcome)?;
        }
    }

    if let Some(unsettled) = registry
        .iter()
        .find(|c| matches!(c.availability, Availability::Unresolved))
    {
        return Err(BridgeError::new(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            format!("capability {} left unresolved after load", unsettled.name()),
        ));
    }

    tracing::info!(
        library = registry.library(),
        generation,
        present = registry.present_count(),
        absent = registry.len() - registry.present_count(),
        "native capabilities loaded"
    );
    Ok(registry)
}

fn check_version(library: &dyn NativeLibrary, config: &BridgeConfig) -> Result<()> {
    match library.version() {
        Some(version) if !version.satisfies(&REQUIRED_VERSION) => {
            if config.enforce_version {
                return Err(BridgeError::new(
                    ErrorCategory::Configuration,
                    ErrorKind::VersionMismatch,
                    format!(
                        "native library {} has version {}, capability table requires {}",
                        library.name(),
                        version,
                        REQUIRED_VERSION
                    ),
                ));
            }
            tracing::warn!(
                library = library.name(),
                %version,
                required = %REQUIRED_VERSION,
                "loading incompatible native library; version check disabled"
            );
        }
        Some(_) => {}
        None => tracing::warn!(
            library = library.name(),
            "native library reports no version; cannot check compatibility"
        ),
    }
    Ok(())
}

fn resolve(
    registry: &Registry,
    library: &dyn NativeLibrary,
    spec: &'static CapabilitySpec,
) -> Availability {
    match spec.kind {
        CapabilityKind::Constant { expected } => match library.constant(spec.symbol) {
            None => Availability::Absent(AbsenceReason::SymbolMissing),
            Some(actual) => match expected {
                Some(expected) if expected != actual => {
                    Availability::Absent(AbsenceReason::SizeMismatch { expected, actual })
                }
                _ => Availability::Present(Binding::Constant(actual)),
            },
        },
        CapabilityKind::Function { params } => {
            let Some(native) = library.function(spec.symbol) else {
                return Availability::Absent(AbsenceReason::SymbolMissing);
            };
            match registry.resolve_params(params) {
                Ok(params) => Availability::Present(Binding::Function { params, native }),
                Err(reason) => Availability::Absent(reason),
            }
        }
    }
}
