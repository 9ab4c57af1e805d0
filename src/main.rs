use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mirrorsync::{ChangeSet, Config, GitHubClient, SyncApplier};

#[derive(Parser)]
#[command(name = "mirrorsync")]
#[command(about = "Selective upstream source-tree mirroring between two revisions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (defaults to XDG config location)
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the mirror root and write the default configuration
    Init {
        /// Mirror root directory
        #[arg(short, long, default_value = ".")]
        root: String,
    },

    /// Apply upstream changes between two revisions to the local mirror
    Sync {
        /// Revision marker to sync from (tag, branch, or commit)
        from: String,

        /// Revision marker to sync to
        #[arg(default_value = "master")]
        to: String,

        /// Classify and print the plan without touching the tree
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config is loaded first so its logging level can seed the filter.
    let config = load_config(cli.config)?;
    init_logging(cli.verbose, &config.logging.level)?;

    info!("Starting MirrorSync v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Init { root } => cmd_init(root, &config).await,
        Commands::Sync { from, to, dry_run } => cmd_sync(from, to, dry_run, &config).await,
    }
}

/// Initialize logging from the verbosity flag, the environment, or the
/// configured default level, in that order of precedence
fn init_logging(verbose: bool, configured_level: &str) -> Result<()> {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured_level))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Ok(())
}

/// Load configuration from specified path or default location
fn load_config(config_path: Option<std::path::PathBuf>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load(&path),
        None => Config::load_or_default(),
    }
}

/// Create the mirror root directory and persist the configuration
async fn cmd_init(root: String, config: &Config) -> Result<()> {
    let expanded_root = shellexpand::full(&root)?;
    std::fs::create_dir_all(expanded_root.as_ref())
        .with_context(|| format!("Failed to create mirror root: {}", expanded_root))?;

    let mut new_config = config.clone();
    new_config.mirror.root = root.clone();

    let config_path = Config::default_config_path()?;
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    new_config.save(&config_path)?;

    println!("✅ MirrorSync initialized successfully!");
    println!("   Config: {:?}", config_path);
    println!("   Mirror root: {}", expanded_root);
    println!(
        "   Upstream: {}/{}",
        new_config.upstream.owner, new_config.upstream.repo
    );

    Ok(())
}

/// Retrieve, classify, and apply the upstream change-set
async fn cmd_sync(from: String, to: String, dry_run: bool, config: &Config) -> Result<()> {
    let client = GitHubClient::new(config)?;

    println!(
        "🔍 Comparing {}/{}: {}...{}",
        config.upstream.owner, config.upstream.repo, from, to
    );

    let records = client
        .compare(&from, &to)
        .await
        .context("Failed to retrieve the upstream change-set")?;

    let changes = ChangeSet::classify(records);

    println!("\n📋 Detected changes:");
    println!("   ➕ Added:    {}", changes.added.len());
    println!("   ✏️  Modified: {}", changes.modified.len());
    println!("   ➖ Removed:  {}", changes.removed.len());
    println!("   🔀 Renamed:  {}", changes.renamed.len());
    if !changes.malformed.is_empty() {
        println!("   ⚠️  Malformed: {}", changes.malformed.len());
    }

    if dry_run {
        print_plan(&changes);
        return Ok(());
    }

    let applier = SyncApplier::new(
        config.root_path(),
        config.ignore_list(),
        config.rewriter(),
        config.cleanup.clone(),
    );

    println!("\n🔄 Applying changes to {}", config.mirror.root);
    let summary = applier.apply(&changes, &client).await?;

    println!("\n🎉 Synchronization complete!");
    println!("   ➕ Added:    {}", summary.added);
    println!("   ✏️  Modified: {}", summary.modified);
    println!("   🔀 Renamed:  {} ({} via fetch fallback)", summary.renamed, summary.fallbacks);
    println!("   ➖ Removed:  {} ({} already absent)", summary.removed, summary.already_absent);
    if summary.skipped > 0 {
        println!("   ⏭️  Skipped (ignore-list): {}", summary.skipped);
    }
    if summary.cleaned > 0 {
        println!("   🧹 Cleaned up: {}", summary.cleaned);
    }

    if !summary.is_clean() {
        println!("\n🔍 Failed operations:");
        for failure in &summary.failures {
            println!("   ❌ {}: {}", failure.path, failure.error);
        }
        bail!(
            "synchronization completed with {} file-level failure(s)",
            summary.failures.len()
        );
    }

    Ok(())
}

/// Print what a sync run would do, without touching the tree
fn print_plan(changes: &ChangeSet) {
    println!("\n🔍 Dry run - no files will be touched");

    for change in &changes.added {
        println!("   ➕ fetch {}", change.path);
    }
    for change in &changes.modified {
        println!("   ✏️  fetch {}", change.path);
    }
    for change in &changes.renamed {
        println!("   🔀 rename {} -> {}", change.previous_path, change.path);
    }
    for change in &changes.removed {
        println!("   ➖ remove {}", change.path);
    }
    for malformed in &changes.malformed {
        println!("   ⚠️  skip {} ({})", malformed.path, malformed.reason);
    }
}
