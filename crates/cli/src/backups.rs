//! `migr8 backups list|verify|restore`.

use std::path::Path;
use std::process;

use migr8_backup::{BackupId, BackupStore, FsBackupStore};

use crate::{print_json, report_error, Ctx, OutputFormat};

fn fail(msg: String, ctx: Ctx<'_>) -> ! {
    report_error(&msg, ctx.output, ctx.quiet);
    process::exit(1);
}

pub async fn cmd_list(dir: &Path, ctx: Ctx<'_>) {
    let store = FsBackupStore::new(dir);
    let records = match store.list().await {
        Ok(r) => r,
        Err(e) => fail(format!("error: {}", e), ctx),
    };
    match ctx.output {
        OutputFormat::Json => print_json(&records),
        OutputFormat::Text => {
            if ctx.quiet {
                return;
            }
            if records.is_empty() {
                println!("no backups in {}", dir.display());
                return;
            }
            for r in &records {
                println!(
                    "{}  {}  {} file(s)  {}",
                    r.id,
                    r.created_at,
                    r.files.len(),
                    r.description
                );
            }
        }
    }
}

pub async fn cmd_verify(dir: &Path, id: &str, ctx: Ctx<'_>) {
    let store = FsBackupStore::new(dir);
    let id = BackupId::from(id);
    let ok = match store.verify(&id).await {
        Ok(ok) => ok,
        Err(e) => fail(format!("error: {}", e), ctx),
    };
    if !ctx.quiet {
        match ctx.output {
            OutputFormat::Json => print_json(&serde_json::json!({ "id": id, "valid": ok })),
            OutputFormat::Text if ok => println!("backup {} verified", id),
            OutputFormat::Text => eprintln!("backup {} failed verification", id),
        }
    }
    if !ok {
        process::exit(1);
    }
}

pub async fn cmd_restore(dir: &Path, id: &str, ctx: Ctx<'_>) {
    let store = FsBackupStore::new(dir);
    let id = BackupId::from(id);
    let restored = match store.restore(&id).await {
        Ok(r) => r,
        Err(e) => fail(format!("error: {}", e), ctx),
    };
    tracing::info!(backup = %id, files = restored.len(), "restored");
    if ctx.quiet {
        return;
    }
    match ctx.output {
        OutputFormat::Json => print_json(&serde_json::json!({ "id": id, "restored": restored })),
        OutputFormat::Text => {
            println!("restored {} file(s) from backup {}", restored.len(), id);
            for path in &restored {
                println!("  {}", path.display());
            }
        }
    }
}
