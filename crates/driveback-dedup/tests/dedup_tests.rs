//! Integration tests for hashing against the manifest.

use std::fs;

use driveback_core::{BackupLayout, Candidate};
use driveback_dedup::{hash_all, hash_file, hash_pool, Manifest};
use tempfile::TempDir;

#[test]
fn test_duplicates_share_one_manifest_entry() {
    let source = TempDir::new().unwrap();
    fs::create_dir(source.path().join("b")).unwrap();
    fs::write(source.path().join("a.jpg"), "X").unwrap();
    fs::write(source.path().join("b/copy.jpg"), "X").unwrap();
    fs::write(source.path().join("notes.txt"), "N").unwrap();

    let candidates = vec![
        Candidate::new(source.path().join("a.jpg"), "a.jpg"),
        Candidate::new(source.path().join("b/copy.jpg"), "b/copy.jpg"),
        Candidate::new(source.path().join("notes.txt"), "notes.txt"),
    ];

    let pool = hash_pool(2).unwrap();
    let hashed = hash_all(&pool, candidates).unwrap();

    let mut manifest = Manifest::new();
    let recorded: Vec<bool> = hashed
        .iter()
        .map(|item| manifest.record(item.digest, item.candidate.manifest_path()))
        .collect();

    assert_eq!(recorded, vec![true, false, true]);
    assert_eq!(manifest.len(), 2);
    assert_eq!(manifest.get(&hashed[1].digest), Some("a.jpg"));
}

#[test]
fn test_manifest_survives_reload_in_backup_root() {
    let drive = TempDir::new().unwrap();
    let layout = BackupLayout::new(drive.path());
    let file = drive.path().join("photo.png");
    fs::write(&file, "pixels").unwrap();
    let digest = hash_file(&file).unwrap();

    let mut manifest = Manifest::load(&layout.manifest_path()).unwrap();
    assert!(manifest.is_empty());
    manifest.record(digest, "photo.png");
    manifest.save(&layout.manifest_path()).unwrap();

    let reloaded = Manifest::load(&layout.manifest_path()).unwrap();
    assert!(reloaded.contains(&digest));
    assert_eq!(
        reloaded.iter().collect::<Vec<_>>(),
        vec![(&digest, "photo.png")]
    );
}

#[test]
fn test_manifest_file_is_plain_json_object() {
    let drive = TempDir::new().unwrap();
    let path = drive.path().join("manifest.json");
    let file = drive.path().join("doc.md");
    fs::write(&file, "# title").unwrap();
    let digest = hash_file(&file).unwrap();

    let mut manifest = Manifest::new();
    manifest.record(digest, "docs/doc.md");
    manifest.save(&path).unwrap();

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let object = value.as_object().unwrap();
    assert_eq!(object.len(), 1);
    assert_eq!(object[&digest.to_hex()], "docs/doc.md");
}
