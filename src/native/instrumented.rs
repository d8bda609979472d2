use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{NativeFn, NativeLibrary, NativeResult};
use crate::buffer::Arg;
use crate::capability::LibraryVersion;

/// Wraps a library and counts every native function invocation.
///
/// Resolution itself (`function()`) is not counted, only calls through the
/// returned function handles.
pub struct InstrumentedLibrary<L> {
    inner: L,
    calls: Arc<AtomicUsize>,
}

impl<L: NativeLibrary> InstrumentedLibrary<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of native calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// A handle that keeps observing the counter after the library has been
    /// moved into a bridge.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl<L: NativeLibrary> NativeLibrary for InstrumentedLibrary<L> {
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
        self.inner.constant(symbol)
    }

    fn function(&self, symbol: &str) -> Option<NativeFn> {
        let native = self.inner.function(symbol)?;
        let calls = Arc::clone(&self.calls);
        Some(Arc::new(move |args: Vec<Arg>| {
            calls.fetch_add(1, Ordering::SeqCst);
            native(args)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::BundledLibrary;

    #[test]
    fn test_counts_calls_not_lookups() {
        let lib = InstrumentedLibrary::new(BundledLibrary::new());
        let keygen = lib.function("crypto_secretbox_keygen").unwrap();
        assert_eq!(lib.calls(), 0);

        keygen(Vec::new()).unwrap();
        keygen(Vec::new()).unwrap();
        assert_eq!(lib.calls(), 2);

        let counter = lib.counter();
        assert!(lib.function("no_such_symbol").is_none());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
