use std::sync::Arc;

use anyhow::Context;
use aus_remote::{Credentials, GerritClient, RateLimiter};
use aus_store::{Blob, Commit, ObjectKind, Tree};
use aus_sync::{
    BuildOutcome, Repository, SyncConfig, SyncError, SyncOptions, SyncOrchestrator, SyncReport,
};
use colored::Colorize;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Init(args) => cmd_init(args),
        Command::Sync(args) => cmd_sync(args).await,
        Command::Refs(args) => cmd_refs(args),
        Command::Show(args) => cmd_show(args),
    }
}

fn cmd_init(args: InitArgs) -> anyhow::Result<()> {
    Repository::init(&args.path)
        .with_context(|| format!("cannot initialize {}", args.path.display()))?;
    println!(
        "{} Initialized aus repository in {}",
        "✓".green().bold(),
        args.path.display().to_string().bold()
    );
    Ok(())
}

/// Config file values with command-line flags applied on top.
fn effective_config(args: &SyncArgs, mut config: SyncConfig) -> SyncConfig {
    if let Some(url) = &args.url {
        config.remote.url = url.clone();
    }
    if let Some(rate) = args.rate {
        config.remote.rate_per_second = rate;
    }
    if let Some(burst) = args.burst {
        config.remote.burst = burst;
    }
    if args.prune_external_ids {
        config.prune_external_ids = true;
    }
    config
}

fn credentials(args: &SyncArgs) -> anyhow::Result<Credentials> {
    match (&args.basic, &args.cookie) {
        (Some(basic), _) => Ok(Credentials::parse_basic(basic)?),
        (None, Some(cookie)) => Ok(Credentials::cookie(cookie.clone())),
        (None, None) => Ok(Credentials::Anonymous),
    }
}

async fn cmd_sync(args: SyncArgs) -> anyhow::Result<()> {
    let repo = Repository::open(&args.repo)
        .with_context(|| format!("cannot open {}", args.repo.display()))?;
    let config = SyncConfig::discover(repo.root(), args.config.as_deref())?;
    let config = effective_config(&args, config);
    tracing::debug!(
        url = %config.remote.url,
        rate = config.remote.rate_per_second,
        burst = config.remote.burst,
        prune = config.prune_external_ids,
        "effective sync configuration"
    );

    let limiter = Arc::new(RateLimiter::new(
        config.remote.rate_per_second,
        config.remote.burst,
    )?);
    let client = GerritClient::new(&config.remote.url, credentials(&args)?, limiter)?;
    if !args.skip_capability_check {
        client
            .check_access_database()
            .await
            .context("reading external ids requires the accessDatabase capability")?;
    }

    let orchestrator = SyncOrchestrator::new(&repo, &client, SyncOptions::from(&config));
    match orchestrator.run(&args.ids).await {
        Ok(report) if report.is_noop() => {
            println!("nothing to do.");
            Ok(())
        }
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(err) => {
            print_failure(&err);
            Err(err.into())
        }
    }
}

fn print_report(report: &SyncReport) {
    println!(
        "{} Synced {} account(s): {} updated, {} unchanged, {} not found",
        "✓".green().bold(),
        report.fetched.len().to_string().bold(),
        report.created.len().to_string().green(),
        report.unchanged.len(),
        report.not_found.len().to_string().yellow(),
    );
    match report.ledger {
        Some(BuildOutcome::Created { commit, .. }) => {
            println!("  External ids: {} {}", "updated".green(), commit.short_hex().yellow())
        }
        Some(BuildOutcome::Unchanged { .. }) => println!("  External ids: unchanged"),
        None => println!("  External ids: none"),
    }
    if !report.pruned.is_empty() {
        println!("  Pruned: {} external id(s)", report.pruned.len().to_string().red());
    }
    println!("  References updated: {}", report.refs_updated.to_string().bold());
}

fn join_ids<T: ToString>(items: &[T]) -> String {
    if items.is_empty() {
        return "(none)".to_string();
    }
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
}

/// Diagnostic lines for an aborted sync, each naming the accounts or
/// references involved. Errors outside the sync pipeline get none.
fn failure_lines(err: &SyncError) -> Vec<String> {
    match err {
        SyncError::Fetch { id, processed, .. } => vec![
            format!("{} fetch of account {} failed", "✗".red().bold(), id.to_string().yellow()),
            format!("  Processed before failure: {}", join_ids(processed)),
            "  Nothing was written. Re-run once the server is reachable.".to_string(),
        ],
        SyncError::Build {
            failed_at,
            processed,
            source,
        } => {
            let step = match failed_at {
                Some(id) => format!("account {}", id.to_string().yellow()),
                None => "the external-id ledger".to_string(),
            };
            vec![
                format!("{} writing objects for {step} failed", "✗".red().bold()),
                format!("  Cause: {source}"),
                format!("  Processed before failure: {}", join_ids(processed)),
                "  No references were changed. Re-run once the repository is writable.".to_string(),
            ]
        }
        SyncError::PartialApply {
            applied,
            failed,
            remaining,
            ..
        } => vec![
            format!("{} references were only partially updated", "✗".red().bold()),
            format!("  Applied: {}", join_ids(applied)),
            format!("  Failed:  {}", failed.red()),
            format!("  Not applied: {}", join_ids(remaining)),
            "  Re-running the same sync completes the update.".to_string(),
        ],
        _ => Vec::new(),
    }
}

fn print_failure(err: &SyncError) {
    for line in failure_lines(err) {
        eprintln!("{line}");
    }
}

fn cmd_refs(args: RefsArgs) -> anyhow::Result<()> {
    let repo = Repository::open(&args.repo)
        .with_context(|| format!("cannot open {}", args.repo.display()))?;
    let refs = repo.refs().list_refs(args.prefix.as_deref().unwrap_or(""))?;
    if refs.is_empty() {
        println!("No references.");
    }
    for (name, id) in refs {
        println!("{} {}", id.to_hex().yellow(), name);
    }
    Ok(())
}

fn cmd_show(args: ShowArgs) -> anyhow::Result<()> {
    let repo = Repository::open(&args.repo)
        .with_context(|| format!("cannot open {}", args.repo.display()))?;
    let id = repo.lookup(&args.revision)?;
    let object = repo
        .objects()
        .read(&id)?
        .with_context(|| format!("object {id} vanished"))?;

    match object.kind {
        ObjectKind::Commit => {
            let commit = Commit::from_stored_object(&object)?;
            println!("{} {}", "commit".yellow().bold(), id.to_hex().yellow());
            println!("tree   {}", commit.tree);
            for parent in &commit.parents {
                println!("parent {parent}");
            }
            println!(
                "author {} <{}> {}",
                commit.author.name, commit.author.email, commit.author.timestamp
            );
            println!("\n    {}", commit.message);
        }
        ObjectKind::Tree => {
            let tree = Tree::from_stored_object(&object)?;
            for entry in &tree.entries {
                println!("{:06o} {} {}", entry.mode.mode_bits(), entry.object_id, entry.name);
            }
        }
        ObjectKind::Blob => {
            let blob = Blob::from_stored_object(&object)?;
            print!("{}", String::from_utf8_lossy(&blob.data));
        }
    }
    Ok(())
}
