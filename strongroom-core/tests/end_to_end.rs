//! Full backup -> verify -> restore -> tamper -> rollback -> audit sequences
//! against a real temp directory, mirroring the scenarios in spec.md §8.

use std::fs;
use std::path::Path;

use strongroom_core::{audit, AuditLog, SnapshotEngine, StrongroomError, STATUS_OK};

fn write_tree(dir: &Path, files: &[(&str, &[u8])]) {
    for (path, data) in files {
        let full = dir.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, data).unwrap();
    }
}

#[test]
fn full_lifecycle_backup_verify_restore() {
    let src = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();

    write_tree(
        src.path(),
        &[
            ("docs/readme.txt", b"hello strongroom"),
            ("docs/nested/deep.txt", b"deep file"),
            ("empty.bin", b""),
        ],
    );

    let engine = SnapshotEngine::with_chunk_size(store.path(), 6);
    let manifest = engine.backup(src.path(), "full", 1_000).unwrap();

    let verified = engine.verify(&manifest.snapshot_id).unwrap();
    assert_eq!(verified.merkle_root, manifest.merkle_root);

    engine.restore(&manifest.snapshot_id, target.path()).unwrap();
    assert_eq!(
        fs::read(target.path().join("docs/readme.txt")).unwrap(),
        b"hello strongroom"
    );
    assert_eq!(
        fs::read(target.path().join("docs/nested/deep.txt")).unwrap(),
        b"deep file"
    );
    assert_eq!(fs::read(target.path().join("empty.bin")).unwrap(), b"");
}

#[test]
fn rollback_then_truncated_roots_scenario() {
    let src = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();

    write_tree(src.path(), &[("a.txt", b"version one")]);
    let engine = SnapshotEngine::with_chunk_size(store.path(), 4);
    let s1 = engine.backup(src.path(), "s1", 1).unwrap();

    write_tree(src.path(), &[("a.txt", b"version two is longer")]);
    let s2 = engine.backup(src.path(), "s2", 2).unwrap();

    // s2 is current; s1 must now be rejected as rollback.
    assert!(matches!(
        engine.verify(&s1.snapshot_id),
        Err(StrongroomError::Rollback { .. })
    ));
    assert!(engine.verify(&s2.snapshot_id).is_ok());

    // Manually roll the chain's tip back to s1's root (scenario 6 in spec.md §8).
    let roots_path = store.path().join("roots.log");
    let content = fs::read_to_string(&roots_path).unwrap();
    let mut lines: Vec<&str> = content.lines().collect();
    lines.pop();
    let mut rewritten = lines.join("\n");
    rewritten.push('\n');
    rewritten.push_str(&format!("{} {}\n", lines.len() + 1, s1.merkle_root));
    fs::write(&roots_path, rewritten).unwrap();

    assert!(engine.verify(&s1.snapshot_id).is_ok());
    assert!(matches!(
        engine.verify(&s2.snapshot_id),
        Err(StrongroomError::Rollback { .. })
    ));
}

#[test]
fn audit_log_records_a_full_command_sequence_and_verifies() {
    let store = tempfile::tempdir().unwrap();
    let log = AuditLog::new(store.path().join("audit.log"));

    log.log("alice", "backup", "src label", STATUS_OK, 1).unwrap();
    log.log("alice", "verify", "1_label", STATUS_OK, 2).unwrap();
    log.log("bob", "restore", "1_label /tmp/out", STATUS_OK, 3).unwrap();
    log.log("mallory", "purge", "purge", "DENY", 4).unwrap();
    log.log("alice", "audit-verify", "audit-verify", STATUS_OK, 5).unwrap();

    audit::audit_verify(&store.path().join("audit.log")).unwrap();
}

#[test]
fn audit_truncation_with_expected_counts() {
    let store = tempfile::tempdir().unwrap();
    let path = store.path().join("audit.log");
    let log = AuditLog::new(&path);

    for i in 0..5 {
        log.log("alice", "verify", &format!("s{i}"), STATUS_OK, i).unwrap();
    }

    let content = fs::read_to_string(&path).unwrap();
    let kept: String = content.lines().take(3).collect::<Vec<_>>().join("\n") + "\n";
    fs::write(&path, kept).unwrap();

    match audit::audit_verify(&path) {
        Err(StrongroomError::AuditTruncated { expected, found }) => {
            assert_eq!(expected, 5);
            assert_eq!(found, 3);
        }
        other => panic!("expected AuditTruncated, got {other:?}"),
    }
}

#[test]
fn crash_recovery_then_list_only_shows_committed() {
    let src = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    write_tree(src.path(), &[("a.txt", b"payload")]);

    let engine = SnapshotEngine::with_chunk_size(store.path(), 4);
    let good = engine.backup(src.path(), "good", 1).unwrap();

    // An orphan BEGIN with no COMMIT, left behind by a simulated crash.
    fs::create_dir_all(store.path().join(".tmp_2_orphan/chunks")).unwrap();
    fs::write(
        store.path().join("wal.log"),
        format!(
            "{}\nBEGIN 2_orphan\n",
            fs::read_to_string(store.path().join("wal.log")).unwrap().trim_end()
        ),
    )
    .unwrap();

    let listed = engine.list_snapshots().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, good.snapshot_id);
    assert!(!store.path().join(".tmp_2_orphan").exists());
}
