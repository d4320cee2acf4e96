// SPDX-License-Identifier: MIT

//! A thin client over the `morphicd` IPC socket: connect, send one
//! length-prefixed request, read the matching response.

use std::path::PathBuf;

use mp_daemon::protocol::{read_message, write_message, ProtocolError, Request, Response};
use thiserror::Error;
use tokio::net::UnixStream;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon is not running (socket at {0} not found)")]
    NotRunning(PathBuf),

    #[error("connection to daemon failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("daemon rejected the request: {0}")]
    Rejected(String),

    #[error("unexpected response from daemon: {0:?}")]
    UnexpectedResponse(Response),
}

impl ClientError {
    pub fn is_not_running(&self) -> bool {
        matches!(self, ClientError::NotRunning(_))
    }
}

pub struct DaemonClient {
    stream: UnixStream,
}

impl DaemonClient {
    /// Connect to the daemon's Unix socket, or report `NotRunning` if it
    /// isn't listening there.
    pub async fn connect() -> Result<Self, ClientError> {
        let socket_path = mp_daemon::env::socket_path();
        if !socket_path.exists() {
            return Err(ClientError::NotRunning(socket_path));
        }
        let stream = UnixStream::connect(&socket_path)
            .await
            .map_err(|_| ClientError::NotRunning(socket_path))?;
        Ok(Self { stream })
    }

    async fn send(&mut self, request: &Request) -> Result<Response, ClientError> {
        write_message(&mut self.stream, request).await?;
        let response = read_message(&mut self.stream).await?;
        Ok(response)
    }

    async fn send_ok(&mut self, request: &Request) -> Result<(), ClientError> {
        match self.send(request).await? {
            Response::Ok => Ok(()),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }

    pub async fn hello(&mut self) -> Result<String, ClientError> {
        match self.send(&Request::Hello).await? {
            Response::Hello { version } => Ok(version),
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }

    pub async fn manual_trigger(&mut self, problem_type: String, severity: f64) -> Result<(), ClientError> {
        self.send_ok(&Request::ManualTrigger { problem_type, severity }).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn propose_mutation(
        &mut self,
        agent_id: String,
        task_id: Option<String>,
        trait_name: String,
        goal: String,
        source: String,
    ) -> Result<String, ClientError> {
        let request = Request::ProposeMutation { agent_id, task_id, trait_name, goal, source };
        match self.send(&request).await? {
            Response::MutationAccepted { mutation_id } => Ok(mutation_id),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }

    pub async fn dump_registry(&mut self) -> Result<Vec<mp_daemon::protocol::RegistryFamilySummary>, ClientError> {
        match self.send(&Request::DumpRegistry).await? {
            Response::Registry { families } => Ok(families),
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }

    pub async fn dump_cycle(&mut self) -> Result<Option<mp_storage::CycleLockRecord>, ClientError> {
        match self.send(&Request::DumpCycle).await? {
            Response::Cycle { record } => Ok(record),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }

    pub async fn inspect_checkpoint(&mut self) -> Result<Option<mp_storage::Checkpoint>, ClientError> {
        match self.send(&Request::InspectCheckpoint).await? {
            Response::Checkpoint { checkpoint } => Ok(checkpoint),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }

    pub async fn shutdown(&mut self) -> Result<(), ClientError> {
        self.send_ok(&Request::Shutdown).await
    }

    pub async fn stats(&mut self) -> Result<mp_daemon::stats::StatsSnapshot, ClientError> {
        match self.send(&Request::Stats).await? {
            Response::Stats { snapshot } => Ok(snapshot),
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
