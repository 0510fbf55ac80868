//! # Party Rooms Server
//!
//! Hosts party rooms over WebSocket.
//!
//! Clients connect with query parameters: `?room=<id>&user=<id>&name=<name>`.
//! A connection without `room` opens a new room led by that user.
//!
//! ## Running
//!
//! ```sh
//! PARTY_ROOMS_CATALOG=cards.json cargo run --features server --bin party_rooms_server
//!
//! # Override the listen address and log level:
//! PARTY_ROOMS_ADDR=0.0.0.0:9000 RUST_LOG=party_rooms=debug cargo run --features server
//! ```

use std::sync::Arc;

use party_rooms::{AnonymousIdentity, RoomConfig, RoomRegistry, StaticCatalog, WebSocketTransport};
use tokio::net::{TcpListener, TcpStream};

/// Listen address when `PARTY_ROOMS_ADDR` is not set.
const DEFAULT_ADDR: &str = "127.0.0.1:3536";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let addr = std::env::var("PARTY_ROOMS_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let catalog = match std::env::var("PARTY_ROOMS_CATALOG") {
        Ok(path) => {
            let catalog = StaticCatalog::from_path(&path)?;
            tracing::info!("Loaded {} card packs from {path}", catalog.packs().len());
            catalog
        }
        Err(_) => {
            tracing::warn!("PARTY_ROOMS_CATALOG is not set; games cannot start without cards");
            StaticCatalog::new()
        }
    };

    let registry = RoomRegistry::new(
        RoomConfig::default(),
        Arc::new(catalog),
        Arc::new(AnonymousIdentity::default()),
    );

    // ── Accept loop ─────────────────────────────────────────────────
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {addr}");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((tcp, peer)) => {
                        tracing::debug!(%peer, "tcp connection accepted");
                        tokio::spawn(serve(registry.clone(), tcp));
                    }
                    Err(e) => tracing::warn!("accept failed: {e}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down");
                break;
            }
        }
    }

    registry.shutdown().await;
    Ok(())
}

/// Upgrade one TCP stream and hand it to its room.
async fn serve(registry: RoomRegistry, tcp: TcpStream) {
    let (transport, handshake) = match WebSocketTransport::accept(tcp).await {
        Ok(accepted) => accepted,
        Err(e) => {
            tracing::warn!("websocket handshake failed: {e}");
            return;
        }
    };

    let result = if handshake.room_id.is_some() {
        registry.dispatch(handshake, transport).await
    } else {
        registry.host(handshake, transport).await
    };
    match result {
        Ok(room_id) => tracing::debug!(%room_id, "connection attached"),
        Err(e) => tracing::info!("connection refused: {e}"),
    }
}
