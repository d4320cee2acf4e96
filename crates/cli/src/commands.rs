// SPDX-License-Identifier: MIT

//! `morphic`'s subcommands: thin wrappers that turn CLI arguments into IPC
//! requests against `morphicd` and print the response.

use std::io::{BufRead, BufReader};
use std::process::Command;

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};

use crate::client::DaemonClient;

#[derive(Subcommand)]
pub enum Cmd {
    /// Check the daemon's IPC version handshake
    Hello,
    /// Fire a manual evolution trigger (spec.md §6 "Manual trigger")
    Trigger {
        /// What kind of problem the operator observed, e.g. "stagnation"
        problem_type: String,
        /// Severity in [0.0, 1.0]
        severity: f64,
    },
    /// Submit a mutation proposal directly to the Gatekeeper
    Propose {
        /// Agent identifier attributed to this proposal
        agent_id: String,
        /// Optional task identifier this proposal is tied to
        #[arg(long)]
        task_id: Option<String>,
        /// Canonical trait name the proposal targets
        trait_name: String,
        /// Human-readable goal the proposal pursues
        goal: String,
        /// Trait source code, read from a file if prefixed with `@`
        source: String,
    },
    /// Dump the trait registry's current families and version counts
    Registry,
    /// Dump the current cycle lock, if one is held
    Cycle,
    /// Inspect the most recently saved checkpoint
    Checkpoint,
    /// Show cumulative process-lifetime counters (kills, mutations applied)
    Stats,
    /// Manage the `morphicd` daemon process
    Daemon(DaemonArgs),
}

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: Option<DaemonCommand>,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon in the background (or foreground with `--foreground`)
    Start {
        #[arg(long)]
        foreground: bool,
    },
    /// Ask the running daemon to shut down gracefully
    Stop,
    /// Check whether the daemon is running
    Status,
    /// View the daemon's log file
    Logs {
        /// Number of recent lines to show
        #[arg(short = 'n', long, default_value_t = 200)]
        limit: usize,
        /// Show the whole log, ignoring `--limit`
        #[arg(long, conflicts_with = "limit")]
        no_limit: bool,
    },
}

pub async fn run(command: Cmd) -> Result<()> {
    match command {
        Cmd::Hello => hello().await,
        Cmd::Trigger { problem_type, severity } => trigger(problem_type, severity).await,
        Cmd::Propose { agent_id, task_id, trait_name, goal, source } => {
            propose(agent_id, task_id, trait_name, goal, resolve_source(&source)?).await
        }
        Cmd::Registry => registry().await,
        Cmd::Cycle => cycle().await,
        Cmd::Checkpoint => checkpoint().await,
        Cmd::Stats => stats().await,
        Cmd::Daemon(args) => daemon(args).await,
    }
}

/// `source` is either the literal trait source or `@path/to/file.py`.
fn resolve_source(source: &str) -> Result<String> {
    match source.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).map_err(|err| anyhow!("reading {path}: {err}")),
        None => Ok(source.to_string()),
    }
}

async fn hello() -> Result<()> {
    let mut client = DaemonClient::connect().await?;
    let version = client.hello().await?;
    println!("morphicd {version}");
    Ok(())
}

async fn trigger(problem_type: String, severity: f64) -> Result<()> {
    let mut client = DaemonClient::connect().await?;
    client.manual_trigger(problem_type, severity).await?;
    println!("trigger accepted");
    Ok(())
}

async fn propose(agent_id: String, task_id: Option<String>, trait_name: String, goal: String, source: String) -> Result<()> {
    let mut client = DaemonClient::connect().await?;
    let mutation_id = client.propose_mutation(agent_id, task_id, trait_name, goal, source).await?;
    println!("mutation proposed: {mutation_id}");
    Ok(())
}

async fn registry() -> Result<()> {
    let mut client = DaemonClient::connect().await?;
    let families = client.dump_registry().await?;
    if families.is_empty() {
        println!("registry is empty");
        return Ok(());
    }
    for family in families {
        println!("{:<24} {:<24} versions={}", family.canonical_name, family.class_name, family.version_count);
    }
    Ok(())
}

async fn cycle() -> Result<()> {
    let mut client = DaemonClient::connect().await?;
    match client.dump_cycle().await? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => println!("no cycle lock held"),
    }
    Ok(())
}

async fn checkpoint() -> Result<()> {
    let mut client = DaemonClient::connect().await?;
    match client.inspect_checkpoint().await? {
        Some(checkpoint) => println!("{}", serde_json::to_string_pretty(&checkpoint)?),
        None => println!("no checkpoint saved"),
    }
    Ok(())
}

async fn stats() -> Result<()> {
    let mut client = DaemonClient::connect().await?;
    let snapshot = client.stats().await?;
    println!("tick:               {}", snapshot.tick);
    println!("predator kills:     {}", snapshot.predator_kills);
    println!("virus kills:        {}", snapshot.virus_kills);
    println!("predator deaths:    {}", snapshot.predator_deaths);
    println!("mutations applied:  {}", snapshot.mutations_applied);
    match snapshot.soft_restart_tick_threshold {
        Some(threshold) => println!("soft restart at tick {threshold}"),
        None => println!("soft restart (tick): disabled"),
    }
    match snapshot.soft_restart_mutation_threshold {
        Some(threshold) => println!("soft restart at {threshold} mutations"),
        None => println!("soft restart (mutations): disabled"),
    }
    Ok(())
}

async fn daemon(args: DaemonArgs) -> Result<()> {
    match args.command {
        Some(DaemonCommand::Start { foreground }) => daemon_start(foreground).await,
        Some(DaemonCommand::Stop) => daemon_stop().await,
        Some(DaemonCommand::Status) => daemon_status().await,
        Some(DaemonCommand::Logs { limit, no_limit }) => daemon_logs(limit, no_limit),
        None => {
            println!("usage: morphic daemon <start|stop|status|logs>");
            Ok(())
        }
    }
}

async fn daemon_start(foreground: bool) -> Result<()> {
    if foreground {
        let status = Command::new(find_morphicd_binary()?).status()?;
        if !status.success() {
            return Err(anyhow!("daemon exited with status: {status}"));
        }
        return Ok(());
    }

    if DaemonClient::connect().await.is_ok() {
        println!("daemon already running");
        return Ok(());
    }

    Command::new(find_morphicd_binary()?).spawn().map_err(|err| anyhow!("failed to start daemon: {err}"))?;
    println!("daemon started");
    Ok(())
}

async fn daemon_stop() -> Result<()> {
    let mut client = match DaemonClient::connect().await {
        Ok(client) => client,
        Err(err) if err.is_not_running() => {
            println!("daemon not running");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };
    client.shutdown().await?;
    println!("daemon stopped");
    Ok(())
}

async fn daemon_status() -> Result<()> {
    let mut client = match DaemonClient::connect().await {
        Ok(client) => client,
        Err(err) if err.is_not_running() => {
            println!("daemon not running");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };
    let version = client.hello().await?;
    println!("status: running");
    println!("version: {version}");
    Ok(())
}

fn daemon_logs(limit: usize, no_limit: bool) -> Result<()> {
    let log_path = match latest_log_path()? {
        Some(path) => path,
        None => {
            println!("no log file found under {}", mp_daemon::env::state_dir().display());
            return Ok(());
        }
    };
    let content = if no_limit { std::fs::read_to_string(&log_path)? } else { read_last_lines(&log_path, limit)? };
    print!("{content}");
    Ok(())
}

/// `morphicd` rolls its log daily as `morphicd.log.YYYY-MM-DD`; the most
/// recent one sorts last lexicographically.
fn latest_log_path() -> Result<Option<std::path::PathBuf>> {
    let state_dir = mp_daemon::env::state_dir();
    if !state_dir.exists() {
        return Ok(None);
    }
    let mut candidates: Vec<std::path::PathBuf> = std::fs::read_dir(&state_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.starts_with("morphicd.log")))
        .collect();
    candidates.sort();
    Ok(candidates.pop())
}

fn read_last_lines(path: &std::path::Path, n: usize) -> Result<String> {
    let file = std::fs::File::open(path)?;
    let lines: Vec<String> = BufReader::new(file).lines().collect::<std::io::Result<_>>()?;
    let start = lines.len().saturating_sub(n);
    Ok(lines[start..].join("\n"))
}

fn find_morphicd_binary() -> Result<std::path::PathBuf> {
    if let Ok(current_exe) = std::env::current_exe() {
        if let Some(dir) = current_exe.parent() {
            let sibling = dir.join("morphicd");
            if sibling.exists() {
                return Ok(sibling);
            }
        }
    }
    Ok(std::path::PathBuf::from("morphicd"))
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
