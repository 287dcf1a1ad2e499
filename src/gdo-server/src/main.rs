// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

mod auth;
mod config;
mod door_handle;
mod door_task;
mod listener;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};

use gdo_app::{init_logging, normalize_name, ConfigFile};
use gdo_backend::{register_builtin_backends_on, RegistrationContext};
use gdo_core::{DoorError, DoorRequest, DynResult};

use auth::TokenSet;
use config::ServerConfig;
use door_handle::{DoorHandle, DoorStatus};

const PKG_DESCRIPTION: &str = concat!(env!("CARGO_PKG_NAME"), " - garage door controller daemon");
const DOOR_TASK_CHANNEL_BUFFER: usize = 32;

#[derive(Debug, Parser)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = PKG_DESCRIPTION,
)]
struct Cli {
    /// Path to configuration file
    #[arg(long = "config", short = 'C', value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print example configuration and exit
    #[arg(long = "print-config")]
    print_config: bool,
    /// Pin backend to use (e.g. sim, rppal)
    #[arg(short = 'b', long = "backend")]
    backend: Option<String>,
    /// Door display name
    #[arg(short = 'n', long = "name")]
    name: Option<String>,
    /// IP address for the JSON TCP listener
    #[arg(short = 'l', long = "listen")]
    listen: Option<IpAddr>,
    /// Port for the JSON TCP listener
    #[arg(short = 'p', long = "port")]
    port: Option<u16>,
}

/// Pick the backend from CLI or config and make sure it exists.
fn resolve_backend(
    cli: &Cli,
    cfg: &ServerConfig,
    registry: &RegistrationContext,
) -> DynResult<String> {
    let backend = normalize_name(cli.backend.as_deref().unwrap_or(&cfg.door.backend));
    if !registry.is_backend_registered(&backend) {
        return Err(format!(
            "Unknown pin backend: {} (available: {})",
            backend,
            registry.registered_backends().join(", ")
        )
        .into());
    }
    Ok(backend)
}

#[tokio::main]
async fn main() -> DynResult<()> {
    let mut registry = RegistrationContext::new();
    register_builtin_backends_on(&mut registry);

    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", ServerConfig::example_toml());
        return Ok(());
    }

    let (mut cfg, config_path) = ServerConfig::load(cli.config.as_deref())?;
    if let Some(ref name) = cli.name {
        cfg.door.name = name.clone();
    }
    cfg.validate()
        .map_err(|e| format!("Invalid server configuration: {}", e))?;

    init_logging(cfg.general.log_level.as_deref());

    if let Some(ref path) = config_path {
        info!("Loaded configuration from {}", path.display());
    }

    let backend = resolve_backend(&cli, &cfg, &registry)?;
    let door_config = cfg.door_config();
    info!(
        "Starting gdo-server (door: {}, backend: {})",
        door_config.name, backend
    );

    let (tx, rx) = mpsc::channel::<DoorRequest>(DOOR_TASK_CHANNEL_BUFFER);
    let mut task_handles: Vec<JoinHandle<()>> = Vec::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let initial: DoorStatus = Err(DoorError::communication_failure("door task starting"));
    let (state_tx, state_rx) = watch::channel(initial);

    let handle = DoorHandle {
        name: door_config.name.clone(),
        door_tx: tx.clone(),
        state_rx,
    };

    let door_task_config = door_task::DoorTaskConfig {
        registry: Arc::new(registry),
        backend,
        door: door_config,
        prebuilt_pins: None,
    };
    let door_shutdown_rx = shutdown_rx.clone();
    task_handles.push(tokio::spawn(async move {
        if let Err(e) =
            door_task::run_door_task(door_task_config, rx, state_tx, door_shutdown_rx).await
        {
            error!("Door task error: {:?}", e);
        }
    }));

    if cfg.listen.enabled {
        let listen_ip = cli.listen.unwrap_or(cfg.listen.listen);
        let listen_port = cli.port.unwrap_or(cfg.listen.port);
        let listen_addr = SocketAddr::from((listen_ip, listen_port));
        let validator = Arc::new(TokenSet::new(cfg.listen.auth.tokens.clone()));
        if validator.is_open() {
            info!("Listener authentication disabled");
        }
        let listener_handle = handle.clone();
        let listener_shutdown_rx = shutdown_rx.clone();
        task_handles.push(tokio::spawn(async move {
            if let Err(e) =
                listener::run_listener(listen_addr, listener_handle, validator, listener_shutdown_rx)
                    .await
            {
                error!("Listener error: {:?}", e);
            }
        }));
    }

    signal::ctrl_c().await?;
    info!("Ctrl+C received, shutting down");
    let _ = shutdown_tx.send(true);
    drop(tx);
    drop(handle);
    tokio::time::sleep(Duration::from_millis(400)).await;

    for handle in &task_handles {
        if !handle.is_finished() {
            handle.abort();
        }
    }
    for handle in task_handles {
        let _ = handle.await;
    }
    Ok(())
}
