// SPDX-License-Identifier: MIT

//! Centralized environment variable access for the daemon process. Mirrors
//! `mp_core::Config`'s `GENESIS_*` overlay convention for everything that
//! isn't a simulation tunable: where the daemon keeps its state, how long
//! it waits for in-flight work to drain on shutdown, and its IPC socket.

use std::path::PathBuf;
use std::time::Duration;

/// Resolve the daemon's state directory: `GENESIS_STATE_DIR` >
/// `XDG_STATE_HOME/morphic` > `~/.local/state/morphic`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("GENESIS_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("morphic");
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".local/state/morphic")
}

/// The Unix domain socket the CLI connects to.
pub fn socket_path() -> PathBuf {
    std::env::var("GENESIS_SOCKET_PATH").map(PathBuf::from).unwrap_or_else(|_| state_dir().join("morphicd.sock"))
}

/// How long the shutdown sequence waits for in-flight evolution-pipeline
/// work to reach a terminal state before cancelling the remaining tasks.
pub fn drain_timeout() -> Duration {
    std::env::var("GENESIS_DRAIN_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// How often the supervisor checks whether a soft restart is due.
pub fn soft_restart_check_interval() -> Duration {
    std::env::var("GENESIS_SOFT_RESTART_CHECK_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(60))
}

/// Tick count after which the supervisor requests a soft restart of the
/// tick engine's in-memory state (world is checkpointed and reloaded),
/// bounding the lifetime of any accumulated drift in the spatial index or
/// registry snapshot cache. `None` disables the feature.
pub fn soft_restart_tick_threshold() -> Option<u64> {
    std::env::var("GENESIS_SOFT_RESTART_TICK_THRESHOLD").ok().and_then(|s| s.parse::<u64>().ok())
}

/// Mutation count after which the supervisor requests a soft restart,
/// bounding how much trait-registry churn (file versions, compiled module
/// cache) a single process lifetime accumulates. `None` disables the
/// feature.
pub fn soft_restart_mutation_threshold() -> Option<u64> {
    std::env::var("GENESIS_SOFT_RESTART_MUTATION_THRESHOLD").ok().and_then(|s| s.parse::<u64>().ok())
}

/// The address the world-frame WebSocket broadcaster binds to.
pub fn ws_bind_addr() -> std::net::SocketAddr {
    std::env::var("GENESIS_WS_BIND_ADDR")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_else(|| std::net::SocketAddr::from(([127, 0, 0, 1], 7777)))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
