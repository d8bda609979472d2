//! End-to-end availability and validation behavior of the bridge.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use sodium_bridge::capability::CAPABILITIES;
use sodium_bridge::loader::{AbsenceReason, load};
use sodium_bridge::native::{BundledLibrary, InstrumentedLibrary, MaskedLibrary, NativeLibrary};
use sodium_bridge::{Arg, Bridge, BridgeConfig, ErrorCategory, ErrorKind};

#[test]
fn test_module_loads_with_every_native_missing() {
    // Equivalent of a host where none of the native globals were installed.
    let symbols: Vec<&str> = CAPABILITIES.iter().map(|c| c.symbol).collect();
    let lib = MaskedLibrary::new(BundledLibrary::new(), symbols);
    let bridge = Bridge::load(lib, BridgeConfig::new()).expect("load must not fail");

    assert!(bridge.available().is_empty());
    assert_eq!(bridge.capabilities().len(), CAPABILITIES.len());

    let err = bridge.value("secretbox_KEYBYTES").expect_err("constant missing");
    assert_eq!(err.kind, ErrorKind::CapabilityUnavailable);
}

#[test]
fn test_scenario_secretbox_open_unavailable() {
    let lib = InstrumentedLibrary::new(MaskedLibrary::new(
        BundledLibrary::new(),
        ["crypto_secretbox_open_easy"],
    ));
    let calls = lib.counter();
    let bridge = Bridge::load(lib, BridgeConfig::new()).unwrap();

    let err = bridge
        .invoke(
            "secretbox_open",
            vec![[0u8; 32].into(), [0u8; 24].into(), [0u8; 32].into()],
        )
        .expect_err("masked capability");

    assert_eq!(err.kind, ErrorKind::CapabilityUnavailable);
    assert_eq!(err.category, ErrorCategory::Environment);
    assert_eq!(err.capability(), Some("secretbox_open"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // The rest of the secretbox family is unaffected.
    assert_eq!(bridge.value("secretbox_KEYBYTES").unwrap(), 32);
}

#[test]
fn test_scenario_auth_bytes_value() {
    let bridge = Bridge::load(BundledLibrary::new(), BridgeConfig::new()).unwrap();
    assert_eq!(bridge.value("auth_BYTES").unwrap(), 32);
}

#[test]
fn test_scenario_short_key_rejected_before_native() {
    let lib = InstrumentedLibrary::new(BundledLibrary::new());
    let calls = lib.counter();
    let bridge = Bridge::load(lib, BridgeConfig::new()).unwrap();

    let err = bridge
        .invoke(
            "secretbox",
            vec![[0u8; 16].into(), [0u8; 24].into(), b"message".to_vec().into()],
        )
        .expect_err("16-byte key");
    assert_eq!(err.kind, ErrorKind::InvalidArgumentLength);
    assert!(err.to_string().contains("key must be 32 bytes, got 16"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // A valid call does reach native code.
    bridge
        .invoke(
            "secretbox",
            vec![[0u8; 32].into(), [0u8; 24].into(), b"message".to_vec().into()],
        )
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_absent_capability_never_calls_native() {
    let lib = InstrumentedLibrary::new(BundledLibrary::new());
    let calls = lib.counter();
    let config = BridgeConfig::with_disabled(["auth", "randombytes_buf"]);
    let bridge = Bridge::load(lib, config).unwrap();

    for _ in 0..3 {
        let err = bridge
            .invoke("auth", vec![[1u8; 32].into(), b"m".to_vec().into()])
            .expect_err("disabled");
        assert_eq!(err.kind, ErrorKind::CapabilityUnavailable);
        assert!(err.to_string().contains("disabled by configuration"));

        let err = bridge
            .invoke("randombytes_buf", vec![Arg::Int(8)])
            .expect_err("disabled");
        assert_eq!(err.kind, ErrorKind::CapabilityUnavailable);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_unknown_vs_unavailable() {
    let lib = MaskedLibrary::new(BundledLibrary::new(), ["crypto_auth"]);
    let bridge = Bridge::load(lib, BridgeConfig::new()).unwrap();

    let unknown = bridge.invoke("box_seal", Vec::new()).expect_err("undeclared");
    let unavailable = bridge.invoke("auth", Vec::new()).expect_err("masked");

    assert_eq!(unknown.kind, ErrorKind::UnknownCapability);
    assert_eq!(unknown.category, ErrorCategory::Programmer);
    assert_eq!(unavailable.kind, ErrorKind::CapabilityUnavailable);
    assert_eq!(unavailable.category, ErrorCategory::Environment);

    let err = bridge.value("box_PUBLICKEYBYTES").expect_err("undeclared");
    assert_eq!(err.kind, ErrorKind::UnknownCapability);
}

#[test]
fn test_loader_is_idempotent() {
    let lib = MaskedLibrary::new(
        BundledLibrary::new(),
        ["crypto_secretbox_macbytes", "sodium_bin2base64"],
    );
    let config = BridgeConfig::new();

    let first = load(&lib, &config).unwrap();
    let second = load(&lib, &config).unwrap();
    assert_eq!(first.presence(), second.presence());
    assert_eq!(
        first.get("secretbox_open").unwrap().absence(),
        Some(&AbsenceReason::DependencyAbsent("secretbox_MACBYTES"))
    );
    // secretbox itself does not depend on the tag size
    assert!(first.get("secretbox").unwrap().is_present());

    let shared: Arc<dyn NativeLibrary> = Arc::new(lib);
    let bridge = Bridge::from_shared(shared, config).unwrap();
    let before = bridge.registry().presence();
    bridge.reload().unwrap();
    bridge.reload().unwrap();
    assert_eq!(bridge.registry().presence(), before);
    assert_eq!(bridge.registry().generation(), 2);
}

#[test]
fn test_auth_verify_failure_is_not_masked() {
    let bridge = Bridge::load(BundledLibrary::new(), BridgeConfig::new()).unwrap();
    let key = bridge.invoke("auth_keygen", Vec::new()).unwrap();
    let key = key.as_slice().to_vec();
    let tag = bridge
        .invoke("auth", vec![key.clone().into(), b"original".to_vec().into()])
        .unwrap();

    let ok = bridge
        .invoke(
            "auth_verify",
            vec![key.clone().into(), tag.as_slice().into(), b"original".to_vec().into()],
        )
        .unwrap();
    assert!(ok.is_empty());

    let err = bridge
        .invoke(
            "auth_verify",
            vec![key.into(), tag.into(), b"forged".to_vec().into()],
        )
        .expect_err("forged message");
    assert_eq!(err.kind, ErrorKind::NativeOperationFailed);
    assert!(err.to_string().contains("authentication tag mismatch"));
}

#[test]
fn test_huge_sizes_fail_with_typed_errors() {
    let lib = InstrumentedLibrary::new(BundledLibrary::new());
    let calls = lib.counter();
    let bridge = Bridge::load(lib, BridgeConfig::new()).unwrap();

    for len in [u64::MAX, 1 << 40] {
        let err = bridge
            .invoke("randombytes_buf", vec![Arg::Int(len)])
            .expect_err("length beyond randombytes_BYTES_MAX");
        assert_eq!(err.kind, ErrorKind::InvalidArgumentLength);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let scrypt = |n: u64, r: u64, outlen: u64| {
        bridge.invoke(
            "pwhash_scryptsalsa208sha256_ll",
            vec![
                b"pw".to_vec().into(),
                b"salt".to_vec().into(),
                Arg::Int(n),
                Arg::Int(r),
                Arg::Int(1),
                Arg::Int(outlen),
            ],
        )
    };

    let err = scrypt(1 << 50, 8, 32).expect_err("N needs an exabyte");
    assert_eq!(err.kind, ErrorKind::NativeOperationFailed);
    assert_eq!(err.category, ErrorCategory::Native);

    let max = bridge.value("pwhash_scryptsalsa208sha256_BYTES_MAX").unwrap() as u64;
    let err = scrypt(16, 1, max).expect_err("outlen beyond memory limit");
    assert_eq!(err.kind, ErrorKind::NativeOperationFailed);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // The bridge is still usable afterwards.
    assert_eq!(scrypt(16, 1, 64).unwrap().len(), 64);
}
