// SPDX-License-Identifier: MIT

//! Accepts connections on the IPC socket and dispatches each request to the
//! shared daemon context, without blocking the tick loop (spec.md §6
//! "Cycle state (inspectable)", "Manual trigger", "Externally-proposed
//! mutation").

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mp_evolution::GatekeeperError;
use mp_net::{ManualTriggerRequest, TriggerApi};
use mp_sim::Registry;
use mp_storage::CycleStore;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;

use crate::protocol::{read_message, write_message, ProtocolError, RegistryFamilySummary, Request, Response};
use crate::stats::Stats;

pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct ListenCtx {
    pub registry: Arc<Registry>,
    pub cycle_store: Arc<CycleStore>,
    pub checkpoint_store: Arc<mp_storage::CheckpointStore>,
    pub trigger_api: Arc<TriggerApi>,
    pub stats: Arc<Stats>,
    pub shutdown: CancellationToken,
}

pub struct Listener {
    socket: UnixListener,
    ctx: Arc<ListenCtx>,
}

impl Listener {
    pub fn bind(path: &Path, ctx: Arc<ListenCtx>) -> std::io::Result<Self> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { socket: UnixListener::bind(path)?, ctx })
    }

    pub async fn serve(self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                accepted = self.socket.accept() => {
                    match accepted {
                        Ok((stream, _)) => {
                            let ctx = self.ctx.clone();
                            tokio::spawn(async move {
                                if let Err(err) = handle_connection(stream, ctx).await {
                                    tracing::debug!(error = %err, "ipc connection closed");
                                }
                            });
                        }
                        Err(err) => tracing::warn!(error = %err, "failed to accept ipc connection"),
                    }
                }
                _ = shutdown.cancelled() => return,
            }
        }
    }
}

async fn handle_connection(mut stream: UnixStream, ctx: Arc<ListenCtx>) -> Result<(), ProtocolError> {
    loop {
        let request: Request = match read_message(&mut stream).await {
            Ok(request) => request,
            Err(ProtocolError::Io(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(err) => return Err(err),
        };
        let response = dispatch(&ctx, request);
        write_message(&mut stream, &response).await?;
    }
}

fn dispatch(ctx: &ListenCtx, request: Request) -> Response {
    match request {
        Request::Hello => Response::Hello { version: PROTOCOL_VERSION.to_string() },
        Request::ManualTrigger { problem_type, severity } => {
            match ctx.trigger_api.fire_manual_trigger(&ManualTriggerRequest { problem_type, severity }) {
                Ok(()) => Response::Ok,
                Err(err) => Response::Error { message: err.to_string() },
            }
        }
        Request::ProposeMutation { agent_id, task_id, trait_name, goal, source } => {
            let proposal = mp_evolution::MutationProposal { agent_id, task_id, trait_name, goal, source };
            let now_epoch_ms = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0);
            match ctx.trigger_api.propose_mutation(&proposal, "127.0.0.1", now_epoch_ms) {
                Ok(mutation_id) => Response::MutationAccepted { mutation_id },
                Err(err) => Response::Error { message: rejection_message(&err) },
            }
        }
        Request::DumpRegistry => {
            let snapshot = ctx.registry.snapshot();
            let families = snapshot
                .values()
                .map(|entry| RegistryFamilySummary {
                    canonical_name: entry.canonical_name.clone(),
                    class_name: entry.class_name.clone(),
                    version_count: entry.file_paths.len(),
                })
                .collect();
            Response::Registry { families }
        }
        Request::DumpCycle => match ctx.cycle_store.current() {
            Ok(record) => Response::Cycle { record },
            Err(err) => Response::Error { message: err.to_string() },
        },
        Request::InspectCheckpoint => match ctx.checkpoint_store.load_latest() {
            Ok(checkpoint) => Response::Checkpoint { checkpoint },
            Err(err) => Response::Error { message: err.to_string() },
        },
        Request::Stats => Response::Stats { snapshot: ctx.stats.snapshot() },
        Request::Shutdown => {
            ctx.shutdown.cancel();
            Response::Ok
        }
    }
}

fn rejection_message(err: &GatekeeperError) -> String {
    err.to_string()
}

pub fn default_socket_path() -> PathBuf {
    crate::env::socket_path()
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
