// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device fingerprinting for token binding.
//!
//! A token pair is stamped with the fingerprint of the device that obtained
//! it so a copied credential store can be detected. The fingerprint is
//! composed from immutable install/platform attributes only — never from
//! mutable user data such as a display name or email.

use std::sync::OnceLock;

use sha2::{Digest, Sha256};

/// Placeholder identifier used when no stable platform identifier is
/// available. Fingerprinting then degrades to "no binding enforced" instead
/// of blocking login.
pub const FALLBACK_DEVICE_ID: &str = "unknown-device";

/// Env override for the platform device identifier (containers, tests).
const DEVICE_ID_ENV: &str = "LOCUM_DEVICE_ID";

/// Resolve the platform device identifier.
///
/// Checks `LOCUM_DEVICE_ID`, then the machine-id files Linux installs
/// provide, then falls back to [`FALLBACK_DEVICE_ID`].
fn platform_device_id() -> String {
    if let Ok(id) = std::env::var(DEVICE_ID_ENV) {
        let id = id.trim();
        if !id.is_empty() {
            return id.to_owned();
        }
    }
    for path in ["/etc/machine-id", "/var/lib/dbus/machine-id"] {
        if let Ok(contents) = std::fs::read_to_string(path) {
            let id = contents.trim();
            if !id.is_empty() {
                return id.to_owned();
            }
        }
    }
    FALLBACK_DEVICE_ID.to_owned()
}

/// Compose the device fingerprint: SHA-256 over the platform identifier and
/// platform attributes, hex-encoded. Deterministic for a given install.
pub fn fingerprint() -> String {
    let mut hasher = Sha256::new();
    hasher.update(platform_device_id().as_bytes());
    hasher.update(b"|");
    hasher.update(std::env::consts::OS.as_bytes());
    hasher.update(b"|");
    hasher.update(std::env::consts::ARCH.as_bytes());

    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Process-wide cached fingerprint. The underlying attributes cannot change
/// within a process lifetime, so one computation serves every session.
pub fn cached_fingerprint() -> &'static str {
    static FINGERPRINT: OnceLock<String> = OnceLock::new();
    FINGERPRINT.get_or_init(fingerprint)
}

/// Constant-time string comparison to prevent timing side-channel attacks.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

#[cfg(test)]
#[path = "device_tests.rs"]
mod tests;
