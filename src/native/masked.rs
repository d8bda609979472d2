use std::collections::HashSet;

use super::{NativeFn, NativeLibrary, NativeResult};
use crate::capability::LibraryVersion;

/// Hides selected symbols of an inner library, as on a platform build
/// where those natives were never compiled in.
pub struct MaskedLibrary<L> {
    inner: L,
    hidden: HashSet<String>,
}

impl<L: NativeLibrary> MaskedLibrary<L> {
    pub fn new(inner: L, hidden: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            inner,
            hidden: hidden.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_hidden(&self, symbol: &str) -> bool {
        self.hidden.contains(symbol)
    }
}

impl<L: NativeLibrary> NativeLibrary for MaskedLibrary<L> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn version(&self) -> Option<LibraryVersion> {
        self.inner.version()
    }

    fn init(&self) -> NativeResult<()> {
        self.inner.init()
    }

    fn constant(&self, symbol: &str) -> Option<usize> {
        if self.is_hidden(symbol) {
            return None;
        }
        self.inner.constant(symbol)
    }

    fn function(&self, symbol: &str) -> Option<NativeFn> {
        if self.is_hidden(symbol) {
            return None;
        }
        self.inner.function(symbol)
    }
}
