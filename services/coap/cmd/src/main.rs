//! CoAP node binary.
//!
//! Serves the demo echo resources over UDP, sends one-shot requests, and
//! decodes captured datagrams for inspection.

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use coap_transport::{listen_and_serve, receive_timeout, transmit};
use coap_wire::{codes, Message, MessageType, OptionId};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod logging;
mod resources;

use config::ServiceConfig;
use logging::CoapLogFormatter;
use resources::EchoResources;

/// CoAP node: UDP server, client, and datagram decoder
#[derive(Parser, Debug)]
#[command(name = "coap", version, about = "CoAP message server and tools")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "COAP_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Configuration file path
    #[arg(long, default_value = "config.yaml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the echo resources
    Serve {
        /// Listen address, e.g. 0.0.0.0:5683 (overrides config)
        #[arg(long)]
        listen: Option<SocketAddr>,
    },
    /// Send a GET request and print the response
    Get {
        /// Server address, e.g. 127.0.0.1:5683
        addr: SocketAddr,

        /// Resource path, e.g. sensors/temp
        #[arg(default_value = "")]
        path: String,

        /// Response timeout, e.g. 2s (overrides config)
        #[arg(long)]
        timeout: Option<humantime::Duration>,

        /// Send non-confirmable instead of confirmable
        #[arg(long)]
        non: bool,
    },
    /// Decode a hex-encoded datagram and print it as JSON
    Decode {
        /// Datagram bytes as hex
        hex: String,
    },
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::new("info")
        .add_directive(format!("coap={}", args.log_level).parse()?)
        .add_directive(format!("coap_wire={}", args.log_level).parse()?)
        .add_directive(format!("coap_transport={}", args.log_level).parse()?);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(true)
        .event_format(CoapLogFormatter::new("coap".to_string()))
        .init();

    let config = ServiceConfig::load_from_file(&args.config)?;

    match args.command {
        Command::Serve { listen } => run_server(listen.unwrap_or(config.listen_addr)).await,
        Command::Get {
            addr,
            path,
            timeout,
            non,
        } => {
            let timeout = timeout
                .map(Duration::from)
                .unwrap_or_else(|| config.response_timeout());
            run_get(addr, &path, timeout, non).await
        }
        Command::Decode { hex } => run_decode(&hex),
    }
}

async fn run_server(listen: SocketAddr) -> Result<()> {
    info!("Starting CoAP service v{}", env!("CARGO_PKG_VERSION"));

    let handler = Arc::new(EchoResources::new(rand::random()));

    tokio::select! {
        result = listen_and_serve(listen, handler) => {
            result.with_context(|| format!("failed to serve on {}", listen))
        }
        _ = tokio::signal::ctrl_c() => {
            crate::component_info!("server", "Shutdown signal received");
            Ok(())
        }
    }
}

async fn run_get(addr: SocketAddr, path: &str, timeout: Duration, non: bool) -> Result<()> {
    let bind: SocketAddr = if addr.is_ipv4() {
        SocketAddr::from(([0, 0, 0, 0], 0))
    } else {
        SocketAddr::from(([0u16; 8], 0))
    };
    let socket = UdpSocket::bind(bind).await?;
    socket.connect(addr).await?;

    let typ = if non {
        MessageType::NonConfirmable
    } else {
        MessageType::Confirmable
    };
    let mut req = Message::new(typ, codes::GET, rand::random())
        .with_option(OptionId::TOKEN, rand::random::<[u8; 4]>().to_vec());
    if !path.is_empty() {
        req.set_path_string(path.trim_start_matches('/'));
    }

    info!("Sending {} to {}", req, addr);
    transmit(&socket, None, &mut req).await?;

    let (resp, from) = receive_timeout(&socket, timeout)
        .await
        .with_context(|| format!("no response from {}", addr))?;
    if resp.option(OptionId::TOKEN) != req.option(OptionId::TOKEN) {
        crate::component_warn!("client", "Response token does not match request");
    }

    info!("Received {} from {}", resp, from);
    println!("{}", String::from_utf8_lossy(&resp.payload));
    Ok(())
}

fn run_decode(hex: &str) -> Result<()> {
    let raw = hex::decode(hex.trim()).context("invalid hex input")?;
    let msg = Message::decode(Bytes::from(raw)).context("failed to decode datagram")?;

    info!("Decoded {}", msg);
    println!("{}", serde_json::to_string_pretty(&msg)?);
    Ok(())
}
