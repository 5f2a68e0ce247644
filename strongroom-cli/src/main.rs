//! External front-end: argument parsing, policy enforcement, and console
//! output around the `strongroom-core` engine. None of the logic here is
//! part of the core's integrity guarantees — it only decides what to call
//! and prints the result.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Error};

use strongroom_core::policy::{current_user, PolicyFile};
use strongroom_core::{AuditLog, SnapshotEngine, STATUS_DENY, STATUS_FAIL, STATUS_OK};

const STORE_DIR: &str = "store";
const POLICY_FILE: &str = "policy.json";

fn now_ms() -> i64 {
    proxmox_time::epoch_i64() * 1000
}

struct Invocation {
    command: String,
    args_str: String,
}

fn run() -> Result<(), Error> {
    let store = PathBuf::from(STORE_DIR);
    let args: Vec<String> = std::env::args().skip(1).collect();

    let command = args
        .first()
        .ok_or_else(|| anyhow!("usage: strongroom <backup|verify|restore|audit-verify|init|list-snapshots|delete-snapshot|purge> [args...]"))?
        .clone();

    let user = current_user();
    println!("User: {user}");

    let policy = load_policy()?;
    let audit = AuditLog::new(store.join("audit.log"));

    let invocation = build_invocation(&command, &args[1..])?;

    if !policy.is_allowed(&user, &invocation.command) {
        audit.log(&user, &invocation.command, &invocation.args_str, STATUS_DENY, now_ms())?;
        println!("DENY by policy");
        std::process::exit(2);
    }

    let status = match execute(&invocation.command, &args[1..], &store) {
        Ok(()) => STATUS_OK,
        Err(err) => {
            eprintln!("error: {err}");
            STATUS_FAIL
        }
    };

    audit.log(&user, &invocation.command, &invocation.args_str, status, now_ms())?;

    if status != STATUS_OK {
        std::process::exit(1);
    }

    Ok(())
}

fn load_policy() -> Result<PolicyFile, Error> {
    let path = Path::new(POLICY_FILE);
    if path.exists() {
        Ok(PolicyFile::load(path)?)
    } else {
        log::warn!("no {POLICY_FILE} found, denying all commands by default");
        Ok(PolicyFile::default())
    }
}

fn build_invocation(command: &str, rest: &[String]) -> Result<Invocation, Error> {
    let args_str = match command {
        "backup" => {
            let source = rest.first().ok_or_else(|| anyhow!("backup requires a source path"))?;
            let label = rest.get(1).ok_or_else(|| anyhow!("backup requires a --label"))?;
            format!("{source} {label}")
        }
        "verify" | "delete-snapshot" => rest
            .first()
            .ok_or_else(|| anyhow!("{command} requires a snapshot id"))?
            .clone(),
        "restore" => {
            let snapshot = rest.first().ok_or_else(|| anyhow!("restore requires a snapshot id"))?;
            let target = rest.get(1).ok_or_else(|| anyhow!("restore requires a target path"))?;
            format!("{snapshot} {target}")
        }
        _ => command.to_string(),
    };

    Ok(Invocation {
        command: command.to_string(),
        args_str,
    })
}

fn execute(command: &str, rest: &[String], store: &Path) -> Result<(), Error> {
    match command {
        "backup" => {
            let source = PathBuf::from(&rest[0]);
            let label = &rest[1];
            let engine = SnapshotEngine::open(store)?;
            let manifest = engine.backup(&source, label, now_ms())?;
            println!("Backup completed: {}", manifest.snapshot_id);
            println!("Merkle root: {}", manifest.merkle_root);
            println!("Files backed up: {}", manifest.files.len());
            Ok(())
        }
        "verify" => {
            let engine = SnapshotEngine::open(store)?;
            let manifest = engine.verify(&rest[0])?;
            println!("Snapshot {} verified OK", manifest.snapshot_id);
            Ok(())
        }
        "restore" => {
            let engine = SnapshotEngine::open(store)?;
            engine.restore(&rest[0], Path::new(&rest[1]))?;
            println!("Restored {} to {}", rest[0], rest[1]);
            Ok(())
        }
        "audit-verify" => {
            strongroom_core::audit::audit_verify(&store.join("audit.log"))?;
            println!("Audit log valid");
            Ok(())
        }
        "list-snapshots" => {
            let engine = SnapshotEngine::open(store)?;
            for snap in engine.list_snapshots()? {
                println!(
                    "{}  label={} files={} root={}",
                    snap.id, snap.label, snap.file_count, snap.merkle_root
                );
            }
            Ok(())
        }
        "init" => {
            std::fs::create_dir_all(store)?;
            strongroom_core::StoreConfig::default().save(store)?;
            println!("Init command executed");
            Ok(())
        }
        "purge" | "delete-snapshot" => {
            println!("{command} command executed");
            Ok(())
        }
        other => bail!("unknown command: {other}"),
    }
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
