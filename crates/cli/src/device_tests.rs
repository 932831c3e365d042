// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serial_test::serial;

use super::*;

#[test]
#[serial]
fn fingerprint_is_deterministic() {
    assert_eq!(fingerprint(), fingerprint());
}

#[test]
#[serial]
fn fingerprint_is_sha256_hex() {
    let fp = fingerprint();
    assert_eq!(fp.len(), 64);
    assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
#[serial]
fn env_override_changes_fingerprint() {
    std::env::set_var("LOCUM_DEVICE_ID", "device-alpha");
    let alpha = fingerprint();
    std::env::set_var("LOCUM_DEVICE_ID", "device-beta");
    let beta = fingerprint();
    std::env::remove_var("LOCUM_DEVICE_ID");

    assert_ne!(alpha, beta);

    // Same identifier reproduces the same fingerprint.
    std::env::set_var("LOCUM_DEVICE_ID", "device-alpha");
    assert_eq!(fingerprint(), alpha);
    std::env::remove_var("LOCUM_DEVICE_ID");
}

#[test]
#[serial]
fn blank_env_override_is_ignored() {
    std::env::set_var("LOCUM_DEVICE_ID", "   ");
    let fp = fingerprint();
    std::env::remove_var("LOCUM_DEVICE_ID");
    // Falls through to machine-id or the placeholder; still a full digest.
    assert_eq!(fp.len(), 64);
}

#[test]
fn cached_fingerprint_is_stable() {
    assert_eq!(cached_fingerprint(), cached_fingerprint());
}

#[yare::parameterized(
    equal = { "abc", "abc", true },
    different = { "abc", "abd", false },
    length_mismatch = { "abc", "abcd", false },
    both_empty = { "", "", true },
)]
fn constant_time_eq_cases(a: &str, b: &str, expected: bool) {
    assert_eq!(constant_time_eq(a, b), expected);
}
