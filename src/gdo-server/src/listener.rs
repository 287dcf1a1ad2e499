// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! JSON-over-TCP listener for gdo-server.
//!
//! Accepts client connections speaking the `ClientEnvelope`/`ClientResponse`
//! protocol defined in `gdo-core::client`, one JSON object per line.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{error, info};

use gdo_core::{ClientCommand, ClientEnvelope, ClientResponse, DoorCommand};

use crate::auth::TokenValidator;
use crate::door_handle::DoorHandle;

/// Run the JSON TCP listener until shutdown is signalled.
pub async fn run_listener(
    addr: SocketAddr,
    door: DoorHandle,
    validator: Arc<dyn TokenValidator>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {} for {}", addr, door.name);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, peer) = accepted?;
                info!("Client connected: {}", peer);

                let door = door.clone();
                let validator = Arc::clone(&validator);
                tokio::spawn(async move {
                    if let Err(e) = handle_client(socket, peer, door, validator).await {
                        error!("Client {} error: {:?}", peer, e);
                    }
                });
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!("Listener on {} stopping", addr);
                    return Ok(());
                }
            }
        }
    }
}

async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    resp: &ClientResponse,
) -> std::io::Result<()> {
    let resp_line = serde_json::to_string(resp)? + "\n";
    writer.write_all(resp_line.as_bytes()).await?;
    writer.flush().await
}

/// Answer one request line.
pub async fn handle_line(
    line: &str,
    door: &DoorHandle,
    validator: &dyn TokenValidator,
) -> ClientResponse {
    let envelope = match serde_json::from_str::<ClientEnvelope>(line) {
        Ok(envelope) => envelope,
        Err(e) => return ClientResponse::failure(format!("Invalid JSON: {}", e)),
    };

    if let Err(err) = validator.validate(envelope.token.as_deref()) {
        return ClientResponse::failure(err);
    }

    match envelope.cmd {
        // Served from the watch channel; the door task is not involved.
        ClientCommand::GetState => door.status().into(),
        ClientCommand::SetTarget { target } => {
            door.request(DoorCommand::SetTarget(target)).await.into()
        }
    }
}

async fn handle_client(
    socket: TcpStream,
    addr: SocketAddr,
    door: DoorHandle,
    validator: Arc<dyn TokenValidator>,
) -> std::io::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            info!("Client {} disconnected", addr);
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let resp = handle_line(trimmed, &door, validator.as_ref()).await;
        if let Some(err) = resp.error.as_deref() {
            if resp.code.is_none() {
                error!("Rejected request from {}: {}", addr, err);
            }
        }
        write_response(&mut writer, &resp).await?;
    }

    Ok(())
}
