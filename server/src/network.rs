//! Server network layer: UDP transport, session lifecycle and event dispatch

use crate::broadcast::{Broadcaster, Outbound};
use crate::collection::CollectionResolver;
use crate::config::ServerConfig;
use crate::session::SessionRegistry;
use crate::world::WorldStore;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{Packet, PlayerId};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

pub type ServerResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Largest datagram the server will read
const RECV_BUFFER_SIZE: usize = 65_536;

/// Messages sent from network tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ClientTimeout { player_id: PlayerId },
    Shutdown,
}

/// Cloneable handle for stopping a running server
#[derive(Debug, Clone)]
pub struct ServerHandle {
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ServerHandle {
    pub fn shutdown(&self) {
        if self.tx.send(ServerMessage::Shutdown).is_err() {
            debug!("Server already stopped");
        }
    }
}

/// Authoritative session server
pub struct Server {
    socket: Arc<UdpSocket>,
    world: Arc<WorldStore>,
    sessions: Arc<RwLock<SessionRegistry>>,
    broadcaster: Broadcaster,
    resolver: CollectionResolver,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    outbound_rx: Option<mpsc::UnboundedReceiver<Outbound>>,
}

impl Server {
    /// Binds the socket and seeds the world with its first collectible.
    pub async fn bind(config: &ServerConfig) -> ServerResult<Self> {
        let socket = Arc::new(UdpSocket::bind(config.bind_addr()).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let world = Arc::new(WorldStore::seeded().await);
        let sessions = Arc::new(RwLock::new(SessionRegistry::new(
            Arc::clone(&world),
            config.max_clients,
            config.client_timeout(),
        )));

        let (broadcaster, outbound_rx) = Broadcaster::new();
        let resolver = CollectionResolver::new(Arc::clone(&world), broadcaster.clone());
        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            world,
            sessions,
            broadcaster,
            resolver,
            server_tx,
            server_rx,
            outbound_rx: Some(outbound_rx),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn world(&self) -> Arc<WorldStore> {
        Arc::clone(&self.world)
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            tx: self.server_tx.clone(),
        }
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) -> JoinHandle<()> {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = vec![0u8; RECV_BUFFER_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match deserialize::<Packet>(&buffer[..len]) {
                        Ok(packet) if packet.is_client_packet() => {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        }
                        Ok(_) => warn!("Dropping server-only packet from {}", addr),
                        Err(_) => warn!("Failed to deserialize packet from {}", addr),
                    },
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        })
    }

    /// Spawns task that drains the outbound queue in order
    fn spawn_network_sender(&mut self) -> JoinHandle<()> {
        let socket = Arc::clone(&self.socket);
        let sessions = Arc::clone(&self.sessions);
        let mut outbound_rx = self
            .outbound_rx
            .take()
            .unwrap_or_else(|| mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(Outbound { audience, packet }) = outbound_rx.recv().await {
                let live = sessions.read().await.addrs();
                let data = match serialize(&packet) {
                    Ok(data) => data,
                    Err(e) => {
                        error!("Failed to serialize {:?}: {}", packet, e);
                        continue;
                    }
                };

                for addr in audience.resolve(&live) {
                    if let Err(e) = socket.send_to(&data, addr).await {
                        error!("Failed to send packet to {}: {}", addr, e);
                    }
                }
            }
        })
    }

    /// Spawns task that reports silent sessions to the main loop
    fn spawn_timeout_checker(&self) -> JoinHandle<()> {
        let sessions = Arc::clone(&self.sessions);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = sessions.read().await.timed_out();
                for player_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { player_id }) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        })
    }

    /// Dispatches one inbound packet
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        if let Packet::Connect { client_version } = packet {
            self.handle_connect(addr, client_version).await;
            return;
        }

        let player_id = {
            let mut sessions = self.sessions.write().await;
            let player_id = sessions.find_by_addr(addr);
            if let Some(id) = &player_id {
                sessions.touch(id);
            }
            player_id
        };

        let Some(player_id) = player_id else {
            debug!("Ignoring {:?} from unknown address {}", packet, addr);
            return;
        };

        match packet {
            Packet::Heartbeat => {}

            Packet::PlayerMovement { x, y } => {
                self.handle_movement(&player_id, x, y).await;
            }

            Packet::CollectibleCollected { collectible_id } => {
                if self.resolver.resolve(&player_id, collectible_id).await.is_none() {
                    debug!(
                        "Collectible {} requested by {} is no longer active",
                        collectible_id, player_id
                    );
                }
            }

            Packet::Disconnect => {
                self.handle_disconnect(&player_id).await;
            }

            _ => {
                warn!("Unexpected packet type from client {}", player_id);
            }
        }
    }

    async fn handle_connect(&mut self, addr: SocketAddr, client_version: u32) {
        info!(
            "Client connecting from {} (version: {})",
            addr, client_version
        );

        // A reconnect from the same address replaces the old session
        let existing = self.sessions.read().await.find_by_addr(addr);
        if let Some(existing_id) = existing {
            info!("Replacing existing session {} from {}", existing_id, addr);
            self.handle_disconnect(&existing_id).await;
        }

        let result = self.sessions.write().await.connect(addr, client_version).await;
        match result {
            Ok((player_id, player)) => {
                self.broadcaster.unicast(
                    &player_id,
                    Packet::Connected {
                        player_id: player_id.clone(),
                    },
                );
                self.broadcaster.unicast(
                    &player_id,
                    Packet::CurrentPlayers {
                        players: self.world.players().await,
                    },
                );
                self.broadcaster.unicast(
                    &player_id,
                    Packet::CurrentCollectibles {
                        collectibles: self.world.collectibles().await,
                    },
                );
                self.broadcaster
                    .broadcast_except(&player_id, Packet::NewPlayer { player });
            }
            Err(e) => {
                warn!("Rejected connection from {}: {}", addr, e);
                self.broadcaster.reply_to(
                    addr,
                    Packet::Disconnected {
                        reason: e.to_string(),
                    },
                );
            }
        }
    }

    async fn handle_movement(&self, player_id: &str, x: f32, y: f32) {
        if !x.is_finite() || !y.is_finite() {
            warn!("Ignoring non-finite position from {}", player_id);
            return;
        }

        // Positions are taken as sent; clients clamp before sending
        if let Some(player) = self.world.update_player_position(player_id, x, y).await {
            self.broadcaster.broadcast_except(
                player_id,
                Packet::PlayerMoved {
                    id: player.id,
                    x: player.x,
                    y: player.y,
                },
            );
        }
    }

    async fn handle_disconnect(&mut self, player_id: &str) {
        let removed = self.sessions.write().await.disconnect(player_id).await;
        if removed {
            self.broadcaster.broadcast_except(
                player_id,
                Packet::PlayerDisconnected {
                    id: player_id.to_string(),
                },
            );
        }
    }

    /// Drops a session reported by the timeout checker, unless a datagram
    /// refreshed it after the report was queued.
    async fn handle_timeout(&mut self, player_id: &str) {
        if !self.sessions.read().await.is_timed_out(player_id) {
            debug!("Client {} became active again, keeping session", player_id);
            return;
        }

        info!("Client {} timed out", player_id);
        self.handle_disconnect(player_id).await;
    }

    /// Main server loop
    pub async fn run(mut self) -> ServerResult<()> {
        let tasks = [
            self.spawn_network_receiver(),
            self.spawn_network_sender(),
            self.spawn_timeout_checker(),
        ];

        info!("Server started successfully");

        while let Some(message) = self.server_rx.recv().await {
            match message {
                ServerMessage::PacketReceived { packet, addr } => {
                    self.handle_packet(packet, addr).await;
                }
                ServerMessage::ClientTimeout { player_id } => {
                    self.handle_timeout(&player_id).await;
                }
                ServerMessage::Shutdown => {
                    info!("Server shutting down");
                    break;
                }
            }
        }

        for task in tasks {
            task.abort();
        }

        Ok(())
    }
}
