//! Owned byte buffers and call arguments passed across the bridge.

use std::collections::TryReserveError;
use std::fmt;
use std::ops::Deref;

use zeroize::Zeroizing;

/// An owned byte sequence moved into and out of native calls.
///
/// The contents are wiped when the buffer is dropped. `Buffer` is
/// deliberately not `Clone`: a buffer handed to a native call is gone from
/// the caller, and the result comes back as a fresh buffer.
pub struct Buffer {
    bytes: Zeroizing<Vec<u8>>,
}

impl Buffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Zeroizing::new(bytes),
        }
    }

    /// A buffer of `len` zero bytes. Fails instead of aborting when the
    /// allocation cannot be satisfied.
    pub fn try_zeroed(len: usize) -> Result<Self, TryReserveError> {
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(len)?;
        bytes.resize(len, 0);
        Ok(Self::new(bytes))
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl Deref for Buffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for Buffer {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for Buffer {
    fn from(bytes: [u8; N]) -> Self {
        Self::new(bytes.to_vec())
    }
}

// Contents never show up in logs or panic messages.
impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Buffer(len={})", self.len())
    }
}

/// A single argument to `Bridge::invoke`.
#[derive(Debug)]
pub enum Arg {
    Bytes(Buffer),
    Int(u64),
    /// The host passed null/undefined, or omitted a trailing argument.
    Null,
}

impl Arg {
    /// Short shape name used in error messages.
    pub fn shape(&self) -> &'static str {
        match self {
            Arg::Bytes(_) => "bytes",
            Arg::Int(_) => "integer",
            Arg::Null => "null",
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Arg::Bytes(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<u64> {
        match self {
            Arg::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<Buffer> for Arg {
    fn from(buffer: Buffer) -> Self {
        Arg::Bytes(buffer)
    }
}

impl From<Vec<u8>> for Arg {
    fn from(bytes: Vec<u8>) -> Self {
        Arg::Bytes(bytes.into())
    }
}

impl From<&[u8]> for Arg {
    fn from(bytes: &[u8]) -> Self {
        Arg::Bytes(bytes.into())
    }
}

impl<const N: usize> From<[u8; N]> for Arg {
    fn from(bytes: [u8; N]) -> Self {
        Arg::Bytes(bytes.into())
    }
}

impl From<u64> for Arg {
    fn from(value: u64) -> Self {
        Arg::Int(value)
    }
}
