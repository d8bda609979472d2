//! The native library linked into this crate.
//!
//! Exposes libsodium-named symbols implemented by the RustCrypto crates:
//! - `crypto_secretbox_*`: XSalsa20Poly1305 (NaCl secretbox)
//! - `crypto_auth*`: HMAC-SHA512 truncated to 256 bits
//! - `crypto_pwhash_scryptsalsa208sha256_ll`: scrypt with explicit N, r, p
//! - `randombytes_buf`: the OS random number generator
//! - `sodium_bin2base64` / `sodium_base642bin`: libsodium's four base64 variants

use base64::Engine;
use base64::engine::GeneralPurpose;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use crypto_secretbox::aead::{Aead, KeyInit};
use crypto_secretbox::{Nonce, XSalsa20Poly1305};
use hmac::{Hmac, Mac};
use rand::RngCore;
use rand::rngs::OsRng;
use scrypt::{Params, scrypt};
use sha2::Sha512;
use std::sync::Arc;

use super::{NativeFailure, NativeFn, NativeLibrary, NativeResult};
use crate::buffer::{Arg, Buffer};
use crate::capability::LibraryVersion;

type HmacSha512 = Hmac<Sha512>;

const SECRETBOX_KEYBYTES: usize = 32;
const SECRETBOX_NONCEBYTES: usize = 24;
const SECRETBOX_MACBYTES: usize = 16;

const AUTH_BYTES: usize = 32;
const AUTH_KEYBYTES: usize = 32;

const SCRYPT_SALTBYTES: usize = 32;

/// Upper bound libsodium places on scrypt output, capped to the address space.
const SCRYPT_BYTES_MAX: u64 = 0x1f_ffff_ffe0;

/// Most memory one scrypt call may use (libsodium's 64-bit `MEMLIMIT_MAX`).
const SCRYPT_MEMLIMIT_MAX: u64 = 68_719_476_736;

/// Largest request `randombytes_buf` serves in one call.
const RANDOMBYTES_BYTES_MAX: usize = 0xffff_ffff;

const BASE64_VARIANT_ORIGINAL: usize = 1;
const BASE64_VARIANT_ORIGINAL_NO_PADDING: usize = 3;
const BASE64_VARIANT_URLSAFE: usize = 5;
const BASE64_VARIANT_URLSAFE_NO_PADDING: usize = 7;

const VERSION: LibraryVersion = LibraryVersion { major: 10, minor: 3 };
const VERSION_STRING: &str = "1.0.18";

/// The statically linked native library.
#[derive(Debug, Default, Clone, Copy)]
pub struct BundledLibrary;

impl BundledLibrary {
    pub fn new() -> Self {
        Self
    }
}

impl NativeLibrary for BundledLibrary {
    fn name(&self) -> &str {
        "bundled"
    }

    fn version(&self) -> Option<LibraryVersion> {
        Some(VERSION)
    }

    fn init(&self) -> NativeResult<()> {
        // Nothing to set up: the OS RNG is opened lazily per call.
        Ok(())
    }

    fn constant(&self, symbol: &str) -> Option<usize> {
        let value = match symbol {
            "crypto_secretbox_keybytes" => SECRETBOX_KEYBYTES,
            "crypto_secretbox_noncebytes" => SECRETBOX_NONCEBYTES,
            "crypto_secretbox_macbytes" => SECRETBOX_MACBYTES,
            "crypto_auth_bytes" => AUTH_BYTES,
            "crypto_auth_keybytes" => AUTH_KEYBYTES,
            "crypto_pwhash_scryptsalsa208sha256_saltbytes" => SCRYPT_SALTBYTES,
            "crypto_pwhash_scryptsalsa208sha256_bytes_max" => {
                usize::try_from(SCRYPT_BYTES_MAX).unwrap_or(usize::MAX)
            }
            "randombytes_bytes_max" => RANDOMBYTES_BYTES_MAX,
            "sodium_base64_VARIANT_ORIGINAL" => BASE64_VARIANT_ORIGINAL,
            "sodium_base64_VARIANT_ORIGINAL_NO_PADDING" => BASE64_VARIANT_ORIGINAL_NO_PADDING,
            "sodium_base64_VARIANT_URLSAFE" => BASE64_VARIANT_URLSAFE,
            "sodium_base64_VARIANT_URLSAFE_NO_PADDING" => BASE64_VARIANT_URLSAFE_NO_PADDING,
            "sodium_library_version_major" => VERSION.major as usize,
            "sodium_library_version_minor" => VERSION.minor as usize,
            _ => return None,
        };
        Some(value)
    }

    fn function(&self, symbol: &str) -> Option<NativeFn> {
        let f: NativeFn = match symbol {
            "crypto_secretbox_keygen" => Arc::new(secretbox_keygen),
            "crypto_secretbox_easy" => Arc::new(secretbox_easy),
            "crypto_secretbox_open_easy" => Arc::new(secretbox_open_easy),
            "crypto_auth_keygen" => Arc::new(auth_keygen),
            "crypto_auth" => Arc::new(auth),
            "crypto_auth_verify" => Arc::new(auth_verify),
            "crypto_pwhash_scryptsalsa208sha256_ll" => Arc::new(scrypt_ll),
            "randombytes_buf" => Arc::new(randombytes_buf),
            "sodium_bin2base64" => Arc::new(bin2base64),
            "sodium_base642bin" => Arc::new(base642bin),
            "sodium_version_string" => Arc::new(version_string),
            _ => return None,
        };
        Some(f)
    }
}

fn bytes_at<'a>(symbol: &'static str, args: &'a [Arg], index: usize) -> NativeResult<&'a [u8]> {
    args.get(index)
        .and_then(Arg::as_bytes)
        .ok_or_else(|| NativeFailure::new(symbol, format!("argument {index} is not a buffer")))
}

fn int_at(symbol: &'static str, args: &[Arg], index: usize) -> NativeResult<u64> {
    args.get(index)
        .and_then(Arg::as_int)
        .ok_or_else(|| NativeFailure::new(symbol, format!("argument {index} is not an integer")))
}

fn allocate(symbol: &'static str, len: usize) -> NativeResult<Buffer> {
    Buffer::try_zeroed(len)
        .map_err(|e| NativeFailure::new(symbol, format!("cannot allocate {len} bytes: {e}")))
}

fn random_buffer(symbol: &'static str, len: usize) -> NativeResult<Buffer> {
    let mut buffer = allocate(symbol, len)?;
    OsRng.fill_bytes(buffer.as_mut_slice());
    Ok(buffer)
}

fn secretbox_parts(
    symbol: &'static str,
    key: &[u8],
    nonce: &[u8],
) -> NativeResult<(XSalsa20Poly1305, Nonce)> {
    let cipher = <XSalsa20Poly1305 as KeyInit>::new_from_slice(key)
        .map_err(|_| NativeFailure::new(symbol, "invalid key length"))?;
    let nonce: [u8; SECRETBOX_NONCEBYTES] = nonce
        .try_into()
        .map_err(|_| NativeFailure::new(symbol, "invalid nonce length"))?;
    Ok((cipher, Nonce::from(nonce)))
}

fn secretbox_keygen(_args: Vec<Arg>) -> NativeResult<Buffer> {
    random_buffer("crypto_secretbox_keygen", SECRETBOX_KEYBYTES)
}

fn secretbox_easy(args: Vec<Arg>) -> NativeResult<Buffer> {
    const SYMBOL: &str = "crypto_secretbox_easy";
    let (cipher, nonce) =
        secretbox_parts(SYMBOL, bytes_at(SYMBOL, &args, 0)?, bytes_at(SYMBOL, &args, 1)?)?;
    let message = bytes_at(SYMBOL, &args, 2)?;
    cipher
        .encrypt(&nonce, message)
        .map(Buffer::from)
        .map_err(|e| NativeFailure::new(SYMBOL, format!("encryption failed: {}", e)))
}

fn secretbox_open_easy(args: Vec<Arg>) -> NativeResult<Buffer> {
    const SYMBOL: &str = "crypto_secretbox_open_easy";
    let (cipher, nonce) =
        secretbox_parts(SYMBOL, bytes_at(SYMBOL, &args, 0)?, bytes_at(SYMBOL, &args, 1)?)?;
    let ciphertext = bytes_at(SYMBOL, &args, 2)?;
    if ciphertext.len() < SECRETBOX_MACBYTES {
        return Err(NativeFailure::new(SYMBOL, "ciphertext shorter than tag"));
    }
    cipher
        .decrypt(&nonce, ciphertext)
        .map(Buffer::from)
        .map_err(|_| NativeFailure::new(SYMBOL, "forged or corrupted ciphertext, or wrong key"))
}

fn auth_mac(symbol: &'static str, key: &[u8], message: &[u8]) -> NativeResult<HmacSha512> {
    let mut mac = <HmacSha512 as Mac>::new_from_slice(key)
        .map_err(|_| NativeFailure::new(symbol, "invalid key length"))?;
    mac.update(message);
    Ok(mac)
}

fn auth_keygen(_args: Vec<Arg>) -> NativeResult<Buffer> {
    random_buffer("crypto_auth_keygen", AUTH_KEYBYTES)
}

fn auth(args: Vec<Arg>) -> NativeResult<Buffer> {
    const SYMBOL: &str = "crypto_auth";
    let mac = auth_mac(SYMBOL, bytes_at(SYMBOL, &args, 0)?, bytes_at(SYMBOL, &args, 1)?)?;
    let full = mac.finalize().into_bytes();
    Ok(Buffer::from(&full[..AUTH_BYTES]))
}

fn auth_verify(args: Vec<Arg>) -> NativeResult<Buffer> {
    const SYMBOL: &str = "crypto_auth_verify";
    let tag = bytes_at(SYMBOL, &args, 1)?;
    if tag.len() != AUTH_BYTES {
        return Err(NativeFailure::new(SYMBOL, "invalid tag length"));
    }
    let mac = auth_mac(SYMBOL, bytes_at(SYMBOL, &args, 0)?, bytes_at(SYMBOL, &args, 2)?)?;
    mac.verify_truncated_left(tag)
        .map_err(|_| NativeFailure::new(SYMBOL, "authentication tag mismatch"))?;
    Ok(Buffer::empty())
}

fn scrypt_ll(args: Vec<Arg>) -> NativeResult<Buffer> {
    const SYMBOL: &str = "crypto_pwhash_scryptsalsa208sha256_ll";
    let passwd = bytes_at(SYMBOL, &args, 0)?;
    let salt = bytes_at(SYMBOL, &args, 1)?;
    let n = int_at(SYMBOL, &args, 2)?;
    if n < 2 || !n.is_power_of_two() {
        return Err(NativeFailure::new(SYMBOL, "N must be a power of two greater than 1"));
    }
    let log_n = n.trailing_zeros() as u8;
    let r = u32::try_from(int_at(SYMBOL, &args, 3)?)
        .map_err(|_| NativeFailure::new(SYMBOL, "r out of range"))?;
    let p = u32::try_from(int_at(SYMBOL, &args, 4)?)
        .map_err(|_| NativeFailure::new(SYMBOL, "p out of range"))?;
    let outlen = usize::try_from(int_at(SYMBOL, &args, 5)?)
        .map_err(|_| NativeFailure::new(SYMBOL, "outlen out of range"))?;
    if r == 0 || p == 0 || u64::from(r) * u64::from(p) >= 1 << 30 {
        return Err(NativeFailure::new(SYMBOL, "r * p out of range"));
    }

    let memory = scrypt_memory(n, r, p, outlen)
        .filter(|m| *m <= SCRYPT_MEMLIMIT_MAX)
        .ok_or_else(|| {
            let msg = format!("parameters need more than {SCRYPT_MEMLIMIT_MAX} bytes of memory");
            NativeFailure::new(SYMBOL, msg)
        })?;
    // The scrypt crate allocates its working set infallibly; make sure it can be had first.
    let working = usize::try_from(memory - outlen as u64).unwrap_or(usize::MAX);
    Vec::<u8>::new()
        .try_reserve_exact(working)
        .map_err(|e| NativeFailure::new(SYMBOL, format!("cannot allocate {working} bytes: {e}")))?;

    // The params length only matters for PHC strings; the output buffer sets the real length.
    let params = Params::new(log_n, r, p, 32)
        .map_err(|e| NativeFailure::new(SYMBOL, format!("invalid scrypt parameters: {}", e)))?;
    let mut out = allocate(SYMBOL, outlen)?;
    scrypt(passwd, salt, &params, out.as_mut_slice())
        .map_err(|e| NativeFailure::new(SYMBOL, format!("scrypt failed: {}", e)))?;
    Ok(out)
}

/// Bytes scrypt needs for `V` (N blocks), `B` (p blocks), `XY` (two blocks)
/// and the output, or `None` on overflow.
fn scrypt_memory(n: u64, r: u32, p: u32, outlen: usize) -> Option<u64> {
    let block = 128u64.checked_mul(u64::from(r))?;
    let blocks = n.checked_add(u64::from(p))?.checked_add(2)?;
    block.checked_mul(blocks)?.checked_add(u64::try_from(outlen).ok()?)
}

fn randombytes_buf(args: Vec<Arg>) -> NativeResult<Buffer> {
    const SYMBOL: &str = "randombytes_buf";
    let len = usize::try_from(int_at(SYMBOL, &args, 0)?)
        .ok()
        .filter(|len| *len <= RANDOMBYTES_BYTES_MAX)
        .ok_or_else(|| NativeFailure::new(SYMBOL, "length out of range"))?;
    random_buffer(SYMBOL, len)
}

fn base64_engine(symbol: &'static str, variant: u64) -> NativeResult<GeneralPurpose> {
    match usize::try_from(variant) {
        Ok(BASE64_VARIANT_ORIGINAL) => Ok(STANDARD),
        Ok(BASE64_VARIANT_ORIGINAL_NO_PADDING) => Ok(STANDARD_NO_PAD),
        Ok(BASE64_VARIANT_URLSAFE) => Ok(URL_SAFE),
        Ok(BASE64_VARIANT_URLSAFE_NO_PADDING) => Ok(URL_SAFE_NO_PAD),
        _ => Err(NativeFailure::new(symbol, format!("unsupported base64 variant {variant}"))),
    }
}

fn bin2base64(args: Vec<Arg>) -> NativeResult<Buffer> {
    const SYMBOL: &str = "sodium_bin2base64";
    let engine = base64_engine(SYMBOL, int_at(SYMBOL, &args, 1)?)?;
    let encoded = engine.encode(bytes_at(SYMBOL, &args, 0)?);
    Ok(Buffer::from(encoded.into_bytes()))
}

fn base642bin(args: Vec<Arg>) -> NativeResult<Buffer> {
    const SYMBOL: &str = "sodium_base642bin";
    let engine = base64_engine(SYMBOL, int_at(SYMBOL, &args, 1)?)?;
    engine
        .decode(bytes_at(SYMBOL, &args, 0)?)
        .map(Buffer::from)
        .map_err(|e| NativeFailure::new(SYMBOL, format!("invalid base64 input: {}", e)))
}

fn version_string(_args: Vec<Arg>) -> NativeResult<Buffer> {
    Ok(Buffer::from(VERSION_STRING.as_bytes()))
}
