//! WebSocket transport: accept loop and per-connection tasks.

pub mod delivery;

use crate::config::Config;
use crate::hub::Hub;
use crate::sim;
use delivery::{Delivery, Outbound};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{RwLock, broadcast};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};

/// Outbound channel depth per process; a connection that falls this far
/// behind starts losing deliveries rather than stalling anyone else.
const OUTBOUND_CAPACITY: usize = 256;

/// Run the hub server.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on ws://{addr}");

    let outbound = Outbound::new(OUTBOUND_CAPACITY);
    let hub = Arc::new(RwLock::new(Hub::new(&config, outbound.clone())));

    // Start the simulation loop
    let sim_hub = Arc::clone(&hub);
    let tick_interval = config.server.tick_interval_ms;
    tokio::spawn(async move {
        sim::run_sim_loop(sim_hub, tick_interval).await;
    });

    loop {
        let (stream, addr) = listener.accept().await?;
        let hub = Arc::clone(&hub);
        let outbound_rx = outbound.subscribe();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, addr, hub, outbound_rx).await {
                error!("Connection error from {addr}: {e}");
            }
        });
    }
}

/// Handle a single WebSocket connection from admission to removal.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    hub: Arc<RwLock<Hub>>,
    mut outbound_rx: broadcast::Receiver<Delivery>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New connection from {addr}");

    let (mut write, mut read) = ws_stream.split();

    // Admit under the state lock; existing connections learn of the roster
    // change through the outbound channel (the newcomer is excluded there).
    let (client_id, init) = {
        let mut hub = hub.write().await;
        hub.admit_client()
    };

    // Init goes straight to the socket, ahead of anything the outbound
    // subscription has picked up since admission.
    let mut connected = true;
    match init.encode() {
        Ok(json) => {
            if let Err(e) = write.send(Message::Text(json.into())).await {
                warn!("Failed to send init to {addr}: {e}");
                connected = false;
            }
        }
        Err(e) => {
            warn!("Failed to encode init for {addr}: {e}");
            connected = false;
        }
    }

    while connected {
        tokio::select! {
            // Inbound frames mutate hub state under the write lock.
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let mut hub = hub.write().await;
                        hub.handle_frame(client_id, text.as_str());
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Client {addr} disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        // A transport error takes the same removal path as a
                        // clean close.
                        warn!("WebSocket error from {addr}: {e}");
                        break;
                    }
                    None => break,
                    _ => {}
                }
            }
            // Outbound deliveries, filtered to this connection.
            delivery = outbound_rx.recv() => {
                match delivery {
                    Ok(delivery) => {
                        if !delivery.is_for(client_id) {
                            continue;
                        }
                        if let Err(e) = write.send(Message::Text(delivery.payload)).await {
                            warn!("Failed to send to {addr}: {e}");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Connection {addr} lagged, dropped {skipped} deliveries");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    // Clean close and error converge here; removal is idempotent.
    {
        let mut hub = hub.write().await;
        hub.remove_client(client_id);
    }

    Ok(())
}
