//! Header Rules CLI
//!
//! CLI tool for managing declared header rules and syncing them into a
//! file-backed filtering engine.

mod state;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hm_core::hash::rule_id;
use hm_core::rule::{NewRule, Operation};
use hm_sync::{FilterEngine, InstallReason, ReconcileOutcome, Trigger};

use state::{load_config, State};

#[derive(Parser)]
#[command(name = "hm-cli")]
#[command(about = "Header rule manager and sync tool")]
struct Cli {
    /// Directory holding the store, engine and badge files
    #[arg(long, default_value = ".header-rules", global = true)]
    state_dir: PathBuf,

    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List declared rules
    List,

    /// Add a rule and sync
    Add {
        /// URL filter; empty matches all sites
        #[arg(short, long, default_value = "")]
        pattern: String,

        /// set or remove
        #[arg(short, long, default_value = "set")]
        operation: Operation,

        /// Header name
        #[arg(long)]
        header: String,

        /// Header value (ignored for remove)
        #[arg(long, default_value = "")]
        value: String,
    },

    /// Delete a rule and sync
    Delete { id: String },

    /// Enable a rule and sync
    Enable { id: String },

    /// Disable a rule and sync
    Disable { id: String },

    /// Bring the engine in line with the declared rules
    Sync,

    /// Run the pass that follows an install or update
    Install {
        /// install, update or browser_update
        #[arg(long, default_value = "install")]
        reason: InstallReason,
    },

    /// Show the error indicator and active rule count
    Status,

    /// Dump the engine's active rules
    Active,

    /// Print the engine rules the declared rules translate to
    Translate,

    /// Print the engine id for a rule key
    Id { key: String },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start tokio runtime: {}", e))
        .and_then(|runtime| runtime.block_on(run(cli)));

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), String> {
    if let Commands::Id { key } = &cli.command {
        println!("{}", rule_id(key));
        return Ok(());
    }

    let config = load_config(cli.config.as_ref())?;
    let state = State::open(&cli.state_dir, &config);
    log::debug!("Using state directory '{}'", cli.state_dir.display());

    match cli.command {
        Commands::List => cmd_list(&state).await,
        Commands::Add {
            pattern,
            operation,
            header,
            value,
        } => {
            let input = NewRule {
                domain_pattern: pattern,
                operation,
                header_name: header,
                header_value: value,
            };
            cmd_add(&state, input).await
        }
        Commands::Delete { id } => cmd_delete(&state, &id).await,
        Commands::Enable { id } => cmd_set_enabled(&state, &id, true).await,
        Commands::Disable { id } => cmd_set_enabled(&state, &id, false).await,
        Commands::Sync => cmd_sync(&state, Trigger::Startup).await,
        Commands::Install { reason } => cmd_sync(&state, Trigger::Installed(reason)).await,
        Commands::Status => cmd_status(&state).await,
        Commands::Active => cmd_active(&state).await,
        Commands::Translate => cmd_translate(&state).await,
        Commands::Id { .. } => Ok(()),
    }
}

async fn cmd_list(state: &State) -> Result<(), String> {
    let rules = state
        .book
        .list()
        .await
        .map_err(|e| e.user_message().to_string())?;

    if rules.is_empty() {
        println!("No rules defined yet.");
    }
    for rule in &rules {
        println!(
            "{} [{}]\n  Site:   {}\n  Action: {}",
            rule.id,
            if rule.enabled { "on" } else { "off" },
            rule.site_label(),
            rule.action_label()
        );
    }

    if let Some(warning) = state.book.status().await.warning {
        println!();
        println!("{warning}");
    }
    Ok(())
}

async fn cmd_add(state: &State, input: NewRule) -> Result<(), String> {
    let mut changes = state.subscribe();
    let rule = state
        .book
        .add(input)
        .await
        .map_err(|e| e.user_message().to_string())?;
    println!("Added rule {} (engine id {})", rule.id, rule_id(&rule.id));
    state.notify_change(&mut changes).await
}

async fn cmd_delete(state: &State, id: &str) -> Result<(), String> {
    let mut changes = state.subscribe();
    let removed = state
        .book
        .delete(id)
        .await
        .map_err(|e| e.user_message().to_string())?;
    if removed {
        println!("Deleted rule {id}");
    } else {
        println!("No rule with id {id}");
    }
    state.notify_change(&mut changes).await
}

async fn cmd_set_enabled(state: &State, id: &str, enabled: bool) -> Result<(), String> {
    let mut changes = state.subscribe();
    let rule = state
        .book
        .set_enabled(id, enabled)
        .await
        .map_err(|e| format!("{} ({})", e.user_message(), e))?;
    println!(
        "Rule {} {}",
        rule.id,
        if rule.enabled { "enabled" } else { "disabled" }
    );
    state.notify_change(&mut changes).await
}

async fn cmd_sync(state: &State, trigger: Trigger) -> Result<(), String> {
    let outcome = match state.triggers.fire(trigger).await {
        Some(result) => result.map_err(|e| e.user_message().to_string())?,
        None => return Ok(()),
    };
    match outcome {
        ReconcileOutcome::Applied { removed, added } => {
            println!("Synced: removed {removed}, added/updated {added}")
        }
        ReconcileOutcome::Cleared { removed } => println!("Cleared {removed} rules"),
        ReconcileOutcome::Unchanged => println!("No changes needed"),
    }
    Ok(())
}

async fn cmd_status(state: &State) -> Result<(), String> {
    let status = state.book.status().await;
    let active = state
        .engine
        .active_rules()
        .await
        .map_err(|e| format!("Failed to read engine state: {}", e))?;

    println!("Badge:        {:?}", status.indicator.badge_text());
    println!("Active rules: {}", active.len());
    if let Some(warning) = status.warning {
        println!("{warning}");
    }
    Ok(())
}

async fn cmd_active(state: &State) -> Result<(), String> {
    let active = state
        .engine
        .active_rules()
        .await
        .map_err(|e| format!("Failed to read engine state: {}", e))?;
    print_json(&active)
}

async fn cmd_translate(state: &State) -> Result<(), String> {
    let desired = state
        .reconciler
        .desired_rules()
        .await
        .map_err(|e| format!("Failed to read rules: {}", e))?;
    print_json(&desired)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON: {}", e))?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add() {
        let cli = Cli::try_parse_from([
            "hm-cli",
            "add",
            "--operation",
            "remove",
            "--header",
            "Referer",
            "--pattern",
            "*://*.example.com/*",
        ])
        .unwrap();
        match cli.command {
            Commands::Add {
                operation, header, ..
            } => {
                assert_eq!(operation, Operation::Remove);
                assert_eq!(header, "Referer");
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn test_parse_install_reason() {
        let cli = Cli::try_parse_from(["hm-cli", "install", "--reason", "browser_update"]).unwrap();
        match cli.command {
            Commands::Install { reason } => assert_eq!(reason, InstallReason::BrowserUpdate),
            _ => panic!("expected install"),
        }

        let cli = Cli::try_parse_from(["hm-cli", "install"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Install {
                reason: InstallReason::Install
            }
        ));
        assert!(Cli::try_parse_from(["hm-cli", "install", "--reason", "reboot"]).is_err());
    }
}
