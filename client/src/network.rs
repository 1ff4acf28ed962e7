use crate::game::ClientWorld;
use crate::steering::steer_towards;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{Packet, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::interval;

pub type ClientResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

const RECV_BUFFER_SIZE: usize = 65_536;
/// Stand-in deadline for open-ended runs
const RUN_FOREVER: Duration = Duration::from_secs(60 * 60 * 24 * 365);

pub struct ClientSettings {
    pub speed: f32,
    pub send_interval: Duration,
    pub heartbeat_interval: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            speed: shared::MOVE_SPEED,
            send_interval: Duration::from_millis(16),
            heartbeat_interval: Duration::from_secs(1),
        }
    }
}

/// Headless client that chases collectibles on its own
pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    settings: ClientSettings,
    world: ClientWorld,
}

impl Client {
    pub async fn new(server_addr: &str, settings: ClientSettings) -> ClientResult<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;

        Ok(Client {
            socket,
            server_addr,
            settings,
            world: ClientWorld::new(),
        })
    }

    pub fn world(&self) -> &ClientWorld {
        &self.world
    }

    async fn send_packet(&self, packet: &Packet) -> ClientResult<()> {
        let data = serialize(packet)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    fn handle_packet(&mut self, packet: Packet) {
        match &packet {
            Packet::Connected { player_id } => info!("Connected! Player ID: {}", player_id),
            Packet::Collected {
                player_id,
                new_score: Some(score),
                ..
            } if self.world.local_id.as_ref() == Some(player_id) => {
                info!("Picked up a collectible, score is now {}", score);
            }
            _ => {}
        }

        self.world.apply_packet(&packet);
    }

    /// One autopilot step: walk towards the nearest collectible and claim
    /// anything in reach.
    async fn step(&mut self) -> ClientResult<()> {
        let Some(local) = self.world.local.as_ref() else {
            return Ok(());
        };

        let directions = match self.world.nearest_collectible() {
            Some(target) => steer_towards(local, target.x, target.y, self.settings.speed),
            None => Vec::new(),
        };

        if let Some(movement) = self.world.apply_moves(&directions, self.settings.speed) {
            self.send_packet(&movement).await?;
        }

        for request in self.world.pickup_requests(Instant::now()) {
            debug!("Requesting {:?}", request);
            self.send_packet(&request).await?;
        }

        Ok(())
    }

    /// Connects and plays until `duration` runs out, or forever if `None`.
    pub async fn run(&mut self, duration: Option<Duration>) -> ClientResult<()> {
        info!("Connecting to {}...", self.server_addr);
        self.send_packet(&Packet::Connect {
            client_version: PROTOCOL_VERSION,
        })
        .await?;

        let deadline = tokio::time::sleep(duration.unwrap_or(RUN_FOREVER));
        tokio::pin!(deadline);

        let mut step_interval = interval(self.settings.send_interval);
        let mut heartbeat_interval = interval(self.settings.heartbeat_interval);
        let mut status_interval = interval(Duration::from_secs(2));

        let mut buffer = vec![0u8; RECV_BUFFER_SIZE];

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, _)) => match deserialize::<Packet>(&buffer[..len]) {
                            Ok(packet) => self.handle_packet(packet),
                            Err(_) => warn!("Failed to deserialize packet from server"),
                        },
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                _ = step_interval.tick() => {
                    if let Err(e) = self.step().await {
                        error!("Error sending input: {}", e);
                    }
                },

                _ = heartbeat_interval.tick() => {
                    if self.world.is_joined() {
                        self.send_packet(&Packet::Heartbeat).await?;
                    }
                },

                _ = status_interval.tick() => {
                    if let (Some(local), Some(rank)) = (&self.world.local, self.world.rank()) {
                        info!("Score: {} | {}", local.score, rank);
                    }
                },

                _ = &mut deadline => break,
            }
        }

        if self.world.is_joined() {
            self.send_packet(&Packet::Disconnect).await?;
        }

        Ok(())
    }
}
