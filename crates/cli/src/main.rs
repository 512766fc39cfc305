mod backups;
mod config;
mod migrate;
mod rules;
mod scan;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Options every subcommand sees.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Ctx<'a> {
    pub output: OutputFormat,
    pub quiet: bool,
    pub config: Option<&'a Path>,
}

/// Rule-driven migration of JSX component usages.
#[derive(Parser)]
#[command(name = "migr8", version, about = "Rule-driven JSX component migration")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log debug detail to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Config file (default: <root>/migr8.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the project graph of imports and JSX elements
    Scan {
        /// Project root
        #[arg(default_value = ".")]
        root: PathBuf,
        /// Directory names to skip (replaces the default list)
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
    },

    /// Summarise component and prop usage per package
    Report {
        /// Project root
        #[arg(default_value = ".")]
        root: PathBuf,
        /// Only report components from this package
        #[arg(long)]
        package: Option<String>,
        /// Directory names to skip (replaces the default list)
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
    },

    /// Generate a starting rule document for a package
    Scaffold {
        /// Project root
        #[arg(default_value = ".")]
        root: PathBuf,
        /// Source package to write rules for
        #[arg(long)]
        package: String,
        /// Rules directory (default: migr8-rules)
        #[arg(long)]
        rules_dir: Option<PathBuf>,
        /// Write the document into the rules directory instead of stdout
        #[arg(long)]
        write: bool,
        /// Directory names to skip (replaces the default list)
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
    },

    /// Check rule documents against the rule schema
    ValidateRules {
        /// Project root
        #[arg(default_value = ".")]
        root: PathBuf,
        /// Rules directory (default: migr8-rules)
        #[arg(long)]
        rules_dir: Option<PathBuf>,
    },

    /// Migrate component usages (dry run unless --apply)
    Migrate {
        /// Project root
        #[arg(default_value = ".")]
        root: PathBuf,
        /// Write changes to disk
        #[arg(long)]
        apply: bool,
        /// Do not snapshot files before writing them
        #[arg(long)]
        no_backup: bool,
        /// Rules directory (default: migr8-rules)
        #[arg(long)]
        rules_dir: Option<PathBuf>,
        /// Only use these rule sets (file stems); repeatable
        #[arg(long = "rule-set")]
        rule_sets: Vec<String>,
        /// Directory names to skip (replaces the default list)
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
        /// Concurrent file writes
        #[arg(long)]
        jobs: Option<usize>,
    },

    /// Inspect and restore file snapshots taken before writes
    Backups {
        /// Project root
        #[arg(long, default_value = ".")]
        root: PathBuf,
        #[command(subcommand)]
        command: BackupCommands,
    },
}

#[derive(Subcommand)]
enum BackupCommands {
    /// List snapshots, oldest first
    List,
    /// Check a snapshot's stored content against its hashes
    Verify {
        /// Backup id
        id: String,
    },
    /// Write a snapshot's files back to their original paths
    Restore {
        /// Backup id
        id: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = Ctx {
        output: cli.output,
        quiet: cli.quiet,
        config: cli.config.as_deref(),
    };

    match cli.command {
        Commands::Scan { root, exclude } => {
            let (root, config) = project(&root, ctx);
            scan::cmd_scan(&root, &config, &exclude, ctx);
        }
        Commands::Report {
            root,
            package,
            exclude,
        } => {
            let (root, config) = project(&root, ctx);
            scan::cmd_report(&root, &config, &exclude, package.as_deref(), ctx);
        }
        Commands::Scaffold {
            root,
            package,
            rules_dir,
            write,
            exclude,
        } => {
            let (root, config) = project(&root, ctx);
            rules::cmd_scaffold(
                rules::ScaffoldOptions {
                    root: &root,
                    package: &package,
                    rules_dir: config.rules_dir(&root, rules_dir.as_deref()),
                    write,
                    scan: config.scan_options(&exclude),
                },
                ctx,
            );
        }
        Commands::ValidateRules { root, rules_dir } => {
            let (root, config) = project(&root, ctx);
            rules::cmd_validate_rules(&config.rules_dir(&root, rules_dir.as_deref()), ctx);
        }
        Commands::Migrate {
            root,
            apply,
            no_backup,
            rules_dir,
            rule_sets,
            exclude,
            jobs,
        } => {
            let (root, config) = project(&root, ctx);
            let opts = migrate::MigrateOptions {
                rules_dir: config.rules_dir(&root, rules_dir.as_deref()),
                backup_dir: config.backup_dir(&root),
                scan: config.scan_options(&exclude),
                annotate_placeholders: config.annotate_placeholders.unwrap_or(true),
                jobs: jobs.or(config.jobs),
                rule_sets,
                apply,
                backup: !no_backup,
                root,
            };
            let rt = runtime(ctx);
            let ok = rt.block_on(migrate::cmd_migrate(opts, ctx));
            if !ok {
                process::exit(1);
            }
        }
        Commands::Backups { root, command } => {
            let (root, config) = project(&root, ctx);
            let dir = config.backup_dir(&root);
            let rt = runtime(ctx);
            rt.block_on(async {
                match command {
                    BackupCommands::List => backups::cmd_list(&dir, ctx).await,
                    BackupCommands::Verify { id } => backups::cmd_verify(&dir, &id, ctx).await,
                    BackupCommands::Restore { id } => backups::cmd_restore(&dir, &id, ctx).await,
                }
            });
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable. `RUST_LOG` wins over
/// `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn runtime(ctx: Ctx<'_>) -> tokio::runtime::Runtime {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(&format!("failed to start async runtime: {}", e), ctx.output, ctx.quiet);
            process::exit(1);
        }
    }
}

/// Canonical project root and its configuration.
fn project(root: &Path, ctx: Ctx<'_>) -> (PathBuf, Config) {
    let root = match std::fs::canonicalize(root) {
        Ok(r) => r,
        Err(e) => {
            let msg = format!("error: project root '{}': {}", root.display(), e);
            report_error(&msg, ctx.output, ctx.quiet);
            process::exit(1);
        }
    };
    match Config::load(&root, ctx.config) {
        Ok(config) => (root, config),
        Err(e) => {
            report_error(&format!("error: {}", e), ctx.output, ctx.quiet);
            process::exit(1);
        }
    }
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value)
            .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e))
    );
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
