// SPDX-License-Identifier: MIT

//! IPC protocol between `morphicd` and `morphic` (the CLI): a 4-byte
//! big-endian length prefix followed by a JSON payload over a Unix domain
//! socket. Small and inspectable over swapping in a binary codec, which
//! matters more here than throughput — every request is operator-driven,
//! never on the simulation's hot path.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use mp_storage::{Checkpoint, CycleLockRecord};

use crate::stats::StatsSnapshot;

const MAX_MESSAGE_BYTES: u32 = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("message of {0} bytes exceeds the {MAX_MESSAGE_BYTES} byte limit")]
    TooLarge(u32),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Hello,
    ManualTrigger { problem_type: String, severity: f64 },
    ProposeMutation { agent_id: String, task_id: Option<String>, trait_name: String, goal: String, source: String },
    DumpRegistry,
    DumpCycle,
    InspectCheckpoint,
    Stats,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryFamilySummary {
    pub canonical_name: String,
    pub class_name: String,
    pub version_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Hello { version: String },
    Ok,
    Error { message: String },
    MutationAccepted { mutation_id: String },
    Registry { families: Vec<RegistryFamilySummary> },
    Cycle { record: Option<CycleLockRecord> },
    Checkpoint { checkpoint: Option<Checkpoint> },
    Stats { snapshot: StatsSnapshot },
}

/// Read one length-prefixed JSON message.
pub async fn read_message<T: for<'de> Deserialize<'de>>(
    reader: &mut (impl AsyncRead + Unpin),
) -> Result<T, ProtocolError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_MESSAGE_BYTES {
        return Err(ProtocolError::TooLarge(len));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    Ok(serde_json::from_slice(&payload)?)
}

/// Write one length-prefixed JSON message.
pub async fn write_message<T: Serialize>(
    writer: &mut (impl AsyncWrite + Unpin),
    value: &T,
) -> Result<(), ProtocolError> {
    let payload = serde_json::to_vec(value)?;
    let len = u32::try_from(payload.len()).map_err(|_| ProtocolError::TooLarge(u32::MAX))?;
    if len > MAX_MESSAGE_BYTES {
        return Err(ProtocolError::TooLarge(len));
    }
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
