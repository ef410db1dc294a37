//! ami-backup: scheduled EC2 AMI backups with per-instance retention
//!
//! `run` performs a full invocation (backup and cleanup waves together);
//! the other commands run or inspect a single wave.

use ami_backup::aws::{AwsContext, Ec2Client, FromAwsContext};
use ami_backup::backup::{BackupInitiator, BackupReport};
use ami_backup::config::{AwsConfig, BackupConfig, RunConfig};
use ami_backup::handler::{self, InvocationContext};
use ami_backup::retention::{RetentionEngine, RetentionPlan, RetentionReport};
use ami_backup_common::defaults::DEFAULT_RETENTION_COUNT;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ami-backup")]
#[command(about = "Scheduled EC2 AMI backups with per-instance retention")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// AWS region (SDK default chain when unset)
    #[arg(long, global = true, env = "AWS_REGION")]
    region: Option<String>,

    /// AWS profile to use (overrides AWS_PROFILE env var)
    #[arg(long, global = true)]
    aws_profile: Option<String>,

    /// JSON config file; command-line flags override its values
    #[arg(long, global = true, env = "AMI_BACKUP_CONFIG")]
    config: Option<PathBuf>,

    /// Number of most recent backups kept per instance
    #[arg(long, global = true, env = "AMI_BACKUP_RETENTION")]
    retention: Option<usize>,

    /// Tag key marking instances for backup
    #[arg(long, global = true)]
    instance_tag_key: Option<String>,

    /// Tag key holding a backup image's source instance ID
    #[arg(long, global = true)]
    instance_id_tag_key: Option<String>,

    /// Keep snapshots of deregistered images
    #[arg(long, global = true)]
    keep_snapshots: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a full invocation: back up tagged instances and apply retention
    Run {
        /// Trigger event payload (JSON), accepted and ignored
        #[arg(long, default_value = "{}")]
        event: String,
    },

    /// Back up tagged instances only
    Backup,

    /// Apply retention only
    Cleanup {
        /// Report what would be torn down without deregistering or deleting
        #[arg(long)]
        dry_run: bool,
    },

    /// Show retention groups and which images would be torn down
    Plan {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Table,
    Json,
}

impl Args {
    /// Assemble the run configuration: defaults, then config file, then flags
    fn run_config(&self) -> Result<RunConfig> {
        let mut backup = match &self.config {
            Some(path) => BackupConfig::load(path)?,
            None => BackupConfig::default(),
        };

        if let Some(retention) = self.retention {
            backup.retention_count = retention;
        }
        if let Some(key) = &self.instance_tag_key {
            backup.instance_tag_key = key.clone();
        }
        if let Some(key) = &self.instance_id_tag_key {
            backup.instance_id_tag_key = key.clone();
        }
        if self.keep_snapshots {
            backup.delete_snapshots = false;
        }
        if let Command::Cleanup { dry_run: true } = self.command {
            backup.dry_run = true;
        }

        backup.validate().context("Invalid configuration")?;

        Ok(RunConfig {
            backup,
            aws: AwsConfig {
                region: self.region.clone(),
                aws_profile: self.aws_profile.clone(),
            },
        })
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if std::env::var("RUST_BACKTRACE").is_err() {
        let _ = writeln!(
            stderr,
            "\n\x1b[2mSet RUST_BACKTRACE=1 for a detailed backtrace\x1b[0m"
        );
    } else {
        let backtrace = e.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            let _ = writeln!(stderr, "\n\x1b[2mBacktrace:\x1b[0m\n{backtrace}");
        }
    }
}

fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy()
        // Reduce noise from AWS SDK (show only warnings and errors)
        .add_directive("aws_config=warn".parse()?)
        .add_directive("aws_sdk_ec2=warn".parse()?)
        .add_directive("aws_smithy_runtime=warn".parse()?);

    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .init(),
    }

    Ok(())
}

async fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format)?;

    let config = args.run_config()?;

    if let Some(profile) = &config.aws.aws_profile {
        info!(profile = %profile, "Using AWS profile");
    }

    let aws = AwsContext::with_profile(
        config.aws.region.as_deref(),
        config.aws.aws_profile.as_deref(),
    )
    .await;
    let ec2 = Ec2Client::from_context(&aws);

    info!(
        region = %aws.region(),
        retention_count = config.backup.retention_count,
        delete_snapshots = config.backup.delete_snapshots,
        "Loaded configuration"
    );

    match args.command {
        Command::Run { event } => {
            let event: serde_json::Value =
                serde_json::from_str(&event).context("Failed to parse --event as JSON")?;
            let context = InvocationContext::new();
            let report = handler::handle(&ec2, &config.backup, event, &context).await;

            println!("\n=== Invocation {} ===", report.invocation_id);
            match &report.backup {
                Some(backup) => print_backup_report(backup),
                None => println!("\nBackup wave aborted (see logs)"),
            }
            match &report.retention {
                Some(retention) => print_retention_report(retention, config.backup.dry_run),
                None => println!("\nCleanup wave aborted (see logs)"),
            }
        }

        Command::Backup => {
            let report = BackupInitiator::new(&ec2, &config.backup)
                .run_backups()
                .await?;
            print_backup_report(&report);
        }

        Command::Cleanup { dry_run } => {
            let report = RetentionEngine::new(&ec2, &config.backup)
                .reconcile_retention()
                .await?;
            print_retention_report(&report, dry_run);
        }

        Command::Plan { format } => {
            let plan = RetentionEngine::new(&ec2, &config.backup).plan().await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
                OutputFormat::Table => print_plan(&plan),
            }
        }
    }

    Ok(())
}

fn print_backup_report(report: &BackupReport) {
    println!("\n=== Backup Report ===");
    println!("Instances found: {}", report.instances_found);
    println!("  Created:        {}", report.created());
    println!("  Create failed:  {}", report.create_failed());
    println!("  Tag failed:     {}", report.tag_failed());
}

fn print_retention_report(report: &RetentionReport, dry_run: bool) {
    println!("\n=== Cleanup Report ===");
    println!("Mode: {}", if dry_run { "DRY-RUN" } else { "EXECUTE" });
    println!("Images found: {}", report.images_found);
    println!("  Instances:  {}", report.groups);
    println!("  Kept:       {}", report.kept);
    println!("  Untracked:  {}", report.untracked);
    println!();
    if dry_run {
        println!("Would deregister: {}", report.skipped());
    } else {
        println!("Deregistered:      {}", report.deregistered());
        println!("Failed:            {}", report.failed());
        println!("Snapshots deleted: {}", report.snapshots_deleted());
        println!("Snapshots failed:  {}", report.snapshots_failed());
    }
}

fn print_plan(plan: &RetentionPlan) {
    if plan.groups.is_empty() {
        println!("No backup images found.");
        return;
    }

    println!(
        "{:<22} {:<24} {:<26} {:<8}",
        "INSTANCE", "IMAGE", "CREATED_AT", "ACTION"
    );
    println!("{}", "-".repeat(82));
    for group in &plan.groups {
        let rows = group
            .keep
            .iter()
            .map(|i| (i, "keep"))
            .chain(group.delete.iter().map(|i| (i, "delete")));
        for (image, action) in rows {
            let created = image
                .created_at()
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| image.creation_date.clone());
            println!(
                "{:<22} {:<24} {:<26} {:<8}",
                group.instance_id, image.image_id, created, action
            );
        }
    }

    let selected = plan.to_teardown().count();
    println!(
        "\nRetention: {} per instance, {} selected for teardown",
        plan.retention_count, selected
    );
    if plan.retention_count == DEFAULT_RETENTION_COUNT {
        println!("(default retention; override with --retention or AMI_BACKUP_RETENTION)");
    }
    if !plan.untracked.is_empty() {
        println!(
            "Untracked (no instance-id tag, never torn down): {}",
            plan.untracked.join(", ")
        );
    }
}
