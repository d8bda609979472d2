//! The native capability table.
//!
//! Every primitive and constant the bridge may expose is declared here,
//! together with the native symbol it resolves to and the shape of its
//! arguments. The table tracks the libsodium API surface of
//! [`REQUIRED_VERSION`]; bump both together.

use std::fmt;

use crate::error::{BridgeError, Result};

/// Version of the native library the table is kept in lock-step with.
pub const REQUIRED_VERSION: LibraryVersion = LibraryVersion { major: 10, minor: 3 };

/// Library ABI version as reported by `sodium_library_version_major/minor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryVersion {
    pub major: u32,
    pub minor: u32,
}

impl LibraryVersion {
    /// Same major and at least the required minor.
    pub fn satisfies(&self, required: &LibraryVersion) -> bool {
        self.major == required.major && self.minor >= required.minor
    }
}

impl fmt::Display for LibraryVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A size used in a signature: fixed, or read from a constant at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeRef {
    Literal(usize),
    /// Name of a constant capability in this table.
    Const(&'static str),
}

/// Length rule for a byte-buffer parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Len {
    Exact(SizeRef),
    AtLeast(SizeRef),
    Any,
}

/// One parameter of a function capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    Bytes(&'static str, Len),
    /// An integer denoting an output length, optionally bounded.
    Length(&'static str, Option<SizeRef>),
    Int(&'static str),
}

impl Param {
    pub fn label(&self) -> &'static str {
        match self {
            Param::Bytes(label, _) | Param::Length(label, _) | Param::Int(label) => label,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityKind {
    /// An integer constant; `expected` is `None` when only the native
    /// library knows the value (e.g. it depends on build flags).
    Constant { expected: Option<usize> },
    Function { params: &'static [Param] },
}

impl CapabilityKind {
    pub fn is_function(&self) -> bool {
        matches!(self, CapabilityKind::Function { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            CapabilityKind::Constant { .. } => "constant",
            CapabilityKind::Function { .. } => "function",
        }
    }
}

/// Static declaration of a capability.
#[derive(Debug)]
pub struct CapabilitySpec {
    /// Host-facing name (libsodium name without the `crypto_` prefix).
    pub name: &'static str,
    /// Symbol looked up in the native library.
    pub symbol: &'static str,
    pub kind: CapabilityKind,
    pub description: &'static str,
}

const fn constant(
    name: &'static str,
    symbol: &'static str,
    expected: Option<usize>,
    description: &'static str,
) -> CapabilitySpec {
    CapabilitySpec {
        name,
        symbol,
        kind: CapabilityKind::Constant { expected },
        description,
    }
}

const fn function(
    name: &'static str,
    symbol: &'static str,
    params: &'static [Param],
    description: &'static str,
) -> CapabilitySpec {
    CapabilitySpec {
        name,
        symbol,
        kind: CapabilityKind::Function { params },
        description,
    }
}

const SECRETBOX_KEY: Param = Param::Bytes("key", Len::Exact(SizeRef::Const("secretbox_KEYBYTES")));
const SECRETBOX_NONCE: Param =
    Param::Bytes("nonce", Len::Exact(SizeRef::Const("secretbox_NONCEBYTES")));
const AUTH_KEY: Param = Param::Bytes("key", Len::Exact(SizeRef::Const("auth_KEYBYTES")));

/// The complete capability table. Constants come before the functions that
/// reference them.
pub const CAPABILITIES: &[CapabilitySpec] = &[
    // --- Secret-key authenticated encryption (XSalsa20-Poly1305) ---
    constant(
        "secretbox_KEYBYTES",
        "crypto_secretbox_keybytes",
        Some(32),
        "Secretbox key size",
    ),
    constant(
        "secretbox_NONCEBYTES",
        "crypto_secretbox_noncebytes",
        Some(24),
        "Secretbox nonce size",
    ),
    constant(
        "secretbox_MACBYTES",
        "crypto_secretbox_macbytes",
        Some(16),
        "Secretbox authentication tag size",
    ),
    // --- Secret-key authentication (HMAC-SHA512-256) ---
    constant("auth_BYTES", "crypto_auth_bytes", Some(32), "Authenticator tag size"),
    constant("auth_KEYBYTES", "crypto_auth_keybytes", Some(32), "Authenticator key size"),
    // --- Password hashing (scrypt) ---
    constant(
        "pwhash_scryptsalsa208sha256_SALTBYTES",
        "crypto_pwhash_scryptsalsa208sha256_saltbytes",
        Some(32),
        "Recommended scrypt salt size",
    ),
    constant(
        "pwhash_scryptsalsa208sha256_BYTES_MAX",
        "crypto_pwhash_scryptsalsa208sha256_bytes_max",
        None,
        "Largest scrypt output length the library accepts",
    ),
    // --- Randomness ---
    constant(
        "randombytes_BYTES_MAX",
        "randombytes_bytes_max",
        None,
        "Largest buffer randombytes_buf fills in one call",
    ),
    // --- Encoding ---
    constant(
        "base64_VARIANT_ORIGINAL",
        "sodium_base64_VARIANT_ORIGINAL",
        Some(1),
        "Standard base64 alphabet, padded",
    ),
    constant(
        "base64_VARIANT_ORIGINAL_NO_PADDING",
        "sodium_base64_VARIANT_ORIGINAL_NO_PADDING",
        Some(3),
        "Standard base64 alphabet, unpadded",
    ),
    constant(
        "base64_VARIANT_URLSAFE",
        "sodium_base64_VARIANT_URLSAFE",
        Some(5),
        "URL-safe base64 alphabet, padded",
    ),
    constant(
        "base64_VARIANT_URLSAFE_NO_PADDING",
        "sodium_base64_VARIANT_URLSAFE_NO_PADDING",
        Some(7),
        "URL-safe base64 alphabet, unpadded",
    ),
    // --- Library metadata ---
    constant(
        "library_version_major",
        "sodium_library_version_major",
        None,
        "Native library ABI major version",
    ),
    constant(
        "library_version_minor",
        "sodium_library_version_minor",
        None,
        "Native library ABI minor version",
    ),
    // --- Functions ---
    function(
        "secretbox_keygen",
        "crypto_secretbox_keygen",
        &[],
        "Generate a random secretbox key",
    ),
    function(
        "secretbox",
        "crypto_secretbox_easy",
        &[
            SECRETBOX_KEY,
            SECRETBOX_NONCE,
            Param::Bytes("message", Len::Any),
        ],
        "Encrypt and authenticate a message; output is tag || ciphertext",
    ),
    function(
        "secretbox_open",
        "crypto_secretbox_open_easy",
        &[
            SECRETBOX_KEY,
            SECRETBOX_NONCE,
            Param::Bytes(
                "ciphertext",
                Len::AtLeast(SizeRef::Const("secretbox_MACBYTES")),
            ),
        ],
        "Verify and decrypt a secretbox ciphertext",
    ),
    function("auth_keygen", "crypto_auth_keygen", &[], "Generate a random authenticator key"),
    function(
        "auth",
        "crypto_auth",
        &[AUTH_KEY, Param::Bytes("message", Len::Any)],
        "Compute an authentication tag for a message",
    ),
    function(
        "auth_verify",
        "crypto_auth_verify",
        &[
            AUTH_KEY,
            Param::Bytes("tag", Len::Exact(SizeRef::Const("auth_BYTES"))),
            Param::Bytes("message", Len::Any),
        ],
        "Verify an authentication tag; returns an empty buffer on success",
    ),
    function(
        "pwhash_scryptsalsa208sha256_ll",
        "crypto_pwhash_scryptsalsa208sha256_ll",
        &[
            Param::Bytes("passwd", Len::Any),
            Param::Bytes("salt", Len::Any),
            Param::Int("N"),
            Param::Int("r"),
            Param::Int("p"),
            Param::Length(
                "outlen",
                Some(SizeRef::Const("pwhash_scryptsalsa208sha256_BYTES_MAX")),
            ),
        ],
        "Derive bytes from a password with explicit scrypt parameters",
    ),
    function(
        "randombytes_buf",
        "randombytes_buf",
        &[Param::Length("len", Some(SizeRef::Const("randombytes_BYTES_MAX")))],
        "Fill a buffer of the requested length with random bytes",
    ),
    function(
        "to_base64",
        "sodium_bin2base64",
        &[Param::Bytes("bin", Len::Any), Param::Int("variant")],
        "Encode bytes as base64 in the given variant",
    ),
    function(
        "from_base64",
        "sodium_base642bin",
        &[Param::Bytes("b64", Len::Any), Param::Int("variant")],
        "Decode base64 text in the given variant",
    ),
    function(
        "version_string",
        "sodium_version_string",
        &[],
        "Native library version string",
    ),
];

/// Look up the static declaration of a capability.
pub fn describe(name: &str) -> Result<&'static CapabilitySpec> {
    CAPABILITIES
        .iter()
        .find(|spec| spec.name == name)
        .ok_or_else(|| BridgeError::unknown_capability(name))
}
