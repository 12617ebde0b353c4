//! ivy-features - inspect and toggle Ivy feature flags
//!
//! Loads configuration, builds the feature service and runs one command.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ivy_app::{commands, AppContext};
use ivy_core::FlagState;
use ivy_infra::{config, observability};

#[derive(Debug, Parser)]
#[command(name = "ivy-features", version, about = "Inspect and toggle Ivy feature flags")]
struct Cli {
    /// Config file (.toml or .json); probed from the working directory if omitted
    #[arg(short, long, env = "IVY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List every flag with its resolved value and origin
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print whether a flag is enabled
    Check { key: String },
    /// Store a local override (`on`, `off`, or a variant name)
    Set { key: String, value: String },
    /// Remove a local override
    Clear { key: String },
    /// Fetch overrides once and print the outcome
    Refresh,
    /// Keep refreshing in the background and print every change until Ctrl-C
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = match cli.config {
        Some(path) => config::load_from_file(Some(path)),
        None => config::load(),
    }
    .context("failed to load configuration")?;

    observability::init(&config.logging).context("failed to initialize logging")?;
    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }

    let ctx = AppContext::new(config).await.context("failed to initialize feature flags")?;

    let result = run(&ctx, cli.command).await;
    ctx.shutdown().await.context("failed to shut down")?;
    result
}

async fn run(ctx: &AppContext, command: Command) -> anyhow::Result<()> {
    match command {
        Command::List { json } => {
            let flags = commands::list_feature_flags(ctx).await.map_err(anyhow::Error::msg)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&flags)?);
            } else {
                print_table(&flags);
            }
        }
        Command::Check { key } => {
            let enabled = commands::is_feature_enabled(ctx, &key).await.map_err(anyhow::Error::msg)?;
            match commands::get_feature_variant(ctx, &key).await.map_err(anyhow::Error::msg)? {
                Some(variant) => println!("{key}: {enabled} ({variant})"),
                None => println!("{key}: {enabled}"),
            }
        }
        Command::Set { key, value } => {
            commands::set_feature_flag(ctx, &key, &value).await.map_err(anyhow::Error::msg)?;
            println!("{key} set to {value}");
        }
        Command::Clear { key } => {
            commands::clear_feature_flag(ctx, &key).await.map_err(anyhow::Error::msg)?;
            println!("{key} override cleared");
        }
        Command::Refresh => {
            let outcome = commands::refresh_feature_flags(ctx).await.map_err(anyhow::Error::msg)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Watch => watch(ctx).await?,
    }
    Ok(())
}

async fn watch(ctx: &AppContext) -> anyhow::Result<()> {
    let mut updates = ctx.features.subscribe();
    ctx.start_background_refresh().await.context("failed to start background refresh")?;
    println!("watching feature flags (revision {}), Ctrl-C to stop", updates.borrow().revision());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                println!("revision {}", snapshot.revision());
                for state in FlagState::collect(ctx.features.registry(), &snapshot) {
                    println!("  {:<32} {:<10} {}", state.key, state.value.to_string(), state.origin);
                }
            }
        }
    }
    Ok(())
}

fn print_table(flags: &[FlagState]) {
    println!("{:<32} {:<12} {:<10} {:<8} ENABLED", "KEY", "GROUP", "VALUE", "ORIGIN");
    for flag in flags {
        println!(
            "{:<32} {:<12} {:<10} {:<8} {}",
            flag.key,
            flag.group.to_string(),
            flag.value.to_string(),
            flag.origin.to_string(),
            flag.enabled
        );
    }
}
