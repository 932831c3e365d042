// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn roundtrip(store: &dyn CredentialStore) -> anyhow::Result<()> {
    assert_eq!(store.get(KEY_ACCESS_TOKEN)?, None);

    store.put(KEY_ACCESS_TOKEN, "tok-1")?;
    assert_eq!(store.get(KEY_ACCESS_TOKEN)?.as_deref(), Some("tok-1"));

    // Overwrite replaces the previous value.
    store.put(KEY_ACCESS_TOKEN, "tok-2")?;
    assert_eq!(store.get(KEY_ACCESS_TOKEN)?.as_deref(), Some("tok-2"));

    store.delete(KEY_ACCESS_TOKEN)?;
    assert_eq!(store.get(KEY_ACCESS_TOKEN)?, None);

    // Deleting an absent key succeeds silently.
    store.delete(KEY_ACCESS_TOKEN)?;
    Ok(())
}

#[test]
fn memory_store_roundtrip() -> anyhow::Result<()> {
    roundtrip(&MemoryStore::new())
}

#[test]
fn file_store_roundtrip() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    roundtrip(&FileStore::new(dir.path()))
}

#[test]
fn file_store_keys_are_independent() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FileStore::new(dir.path());

    store.put(KEY_ACCESS_TOKEN, "access")?;
    store.put(KEY_REFRESH_TOKEN, "refresh")?;
    store.put(KEY_DEVICE_FINGERPRINT, "fp")?;

    store.delete(KEY_ACCESS_TOKEN)?;
    assert_eq!(store.get(KEY_ACCESS_TOKEN)?, None);
    assert_eq!(store.get(KEY_REFRESH_TOKEN)?.as_deref(), Some("refresh"));
    assert_eq!(store.get(KEY_DEVICE_FINGERPRINT)?.as_deref(), Some("fp"));
    Ok(())
}

#[test]
fn file_store_leaves_no_tmp_files() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FileStore::new(dir.path());

    for i in 0..10 {
        store.put(KEY_ACCESS_TOKEN, &format!("tok-{i}"))?;
    }

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "tmp files left behind: {leftovers:?}");
    Ok(())
}

#[test]
fn file_store_creates_missing_dir() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let nested = dir.path().join("state").join("session");
    let store = FileStore::new(&nested);

    store.put(KEY_REFRESH_TOKEN, "tok")?;
    assert_eq!(store.get(KEY_REFRESH_TOKEN)?.as_deref(), Some("tok"));
    Ok(())
}

#[test]
fn memory_store_is_isolated_per_instance() -> anyhow::Result<()> {
    let a = MemoryStore::new();
    let b = MemoryStore::new();
    a.put(KEY_ACCESS_TOKEN, "only-in-a")?;
    assert_eq!(b.get(KEY_ACCESS_TOKEN)?, None);
    Ok(())
}
