//! Golden test vector validation
//!
//! Every vector is run through the full bridge (guard, validation, native
//! call) and must reproduce the recorded output byte for byte.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use serde::Deserialize;
use sodium_bridge::native::BundledLibrary;
use sodium_bridge::{Arg, Bridge, BridgeConfig};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum VectorArg {
    B64(String),
    Int(u64),
}

#[derive(Debug, Deserialize)]
struct GoldenVector {
    capability: String,
    args: Vec<VectorArg>,
    output: String,
    comment: String,
}

fn load_golden_vectors() -> Vec<GoldenVector> {
    let json_data = include_str!("../testdata/golden-vectors.json");
    serde_json::from_str(json_data).expect("failed to parse golden vectors")
}

fn to_args(args: &[VectorArg]) -> Vec<Arg> {
    args.iter()
        .map(|arg| match arg {
            VectorArg::B64(text) => Arg::from(
                BASE64_STANDARD
                    .decode(text)
                    .expect("failed to decode argument"),
            ),
            VectorArg::Int(value) => Arg::Int(*value),
        })
        .collect()
}

#[test]
fn test_golden_vectors() {
    let bridge = Bridge::load(BundledLibrary::new(), BridgeConfig::new()).unwrap();
    let vectors = load_golden_vectors();
    println!("Testing {} golden vectors", vectors.len());

    let mut passed = 0;
    let mut failed = 0;

    for (i, vector) in vectors.iter().enumerate() {
        let expected = BASE64_STANDARD
            .decode(&vector.output)
            .expect("failed to decode output");

        let output = match bridge.invoke(&vector.capability, to_args(&vector.args)) {
            Ok(output) => output,
            Err(e) => {
                eprintln!("Vector {} ({}): FAILED to invoke - {}", i, vector.capability, e);
                eprintln!("  Comment: {}", vector.comment);
                failed += 1;
                continue;
            }
        };

        if output.as_slice() != &expected[..] {
            eprintln!("Vector {} ({}): FAILED - output mismatch", i, vector.capability);
            eprintln!("  Comment: {}", vector.comment);
            eprintln!("  Expected: {}", vector.output);
            eprintln!("  Actual:   {}", BASE64_STANDARD.encode(output.as_slice()));
            failed += 1;
            continue;
        }

        passed += 1;
    }

    println!(
        "Results: {} passed, {} failed out of {} total",
        passed,
        failed,
        passed + failed
    );

    assert_eq!(failed, 0, "Some golden vectors failed validation");
    assert!(passed > 0, "No golden vectors were tested");
}

/// Flipping any byte of a sealed box must make `secretbox_open` fail.
#[test]
fn test_tampered_secretbox_vector_fails() {
    let bridge = Bridge::load(BundledLibrary::new(), BridgeConfig::new()).unwrap();
    let vectors = load_golden_vectors();
    let open = vectors
        .iter()
        .find(|v| v.capability == "secretbox_open")
        .expect("secretbox_open vector present");

    let ciphertext_len = match &open.args[2] {
        VectorArg::B64(text) => BASE64_STANDARD.decode(text).unwrap().len(),
        VectorArg::Int(_) => panic!("ciphertext must be bytes"),
    };

    for position in 0..ciphertext_len {
        let mut args = to_args(&open.args);
        if let Arg::Bytes(ciphertext) = &mut args[2] {
            ciphertext.as_mut_slice()[position] ^= 0x80;
        }
        let err = bridge
            .invoke("secretbox_open", args)
            .expect_err("tampered ciphertext opened");
        assert_eq!(err.kind, sodium_bridge::ErrorKind::NativeOperationFailed);
    }
}
