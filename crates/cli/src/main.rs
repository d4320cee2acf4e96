// SPDX-License-Identifier: MIT

//! `morphic`: a small operator CLI over `morphicd`'s IPC socket (spec.md
//! §6 "Manual trigger", "Externally-proposed mutation", "Cycle state
//! (inspectable)").

mod client;
mod commands;

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "morphic",
    version = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH")),
    about = "Operator CLI for the morphicd daemon"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Cmd,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if let Err(err) = commands::run(cli.command).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    Ok(())
}
