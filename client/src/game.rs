//! Client-side mirror of the server's world.
//!
//! Everything here is rebuilt from server events. The only thing the client
//! decides on its own is where its own player moves to; the server relays
//! that position as-is.

use log::{debug, warn};
use shared::{
    calculate_rank, Collectible, CollectibleId, Direction, Packet, Player, PlayerId, Rank,
};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// How long to wait before asking for the same collectible again
pub const PICKUP_RETRY: Duration = Duration::from_millis(500);

#[derive(Debug, Default)]
pub struct ClientWorld {
    pub local_id: Option<PlayerId>,
    pub local: Option<Player>,
    pub others: HashMap<PlayerId, Player>,
    pub collectibles: HashMap<CollectibleId, Collectible>,
    pending_pickups: HashMap<CollectibleId, Instant>,
}

impl ClientWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_joined(&self) -> bool {
        self.local.is_some()
    }

    /// Folds one server event into the mirror.
    pub fn apply_packet(&mut self, packet: &Packet) {
        match packet {
            Packet::Connected { player_id } => {
                self.local_id = Some(player_id.clone());
            }

            Packet::CurrentPlayers { players } => {
                self.others.clear();
                for player in players {
                    if Some(&player.id) == self.local_id.as_ref() {
                        self.local = Some(player.clone());
                    } else {
                        self.others.insert(player.id.clone(), player.clone());
                    }
                }
            }

            Packet::CurrentCollectibles { collectibles } => {
                self.collectibles = collectibles.iter().map(|c| (c.id, c.clone())).collect();
                self.pending_pickups.clear();
            }

            Packet::NewPlayer { player } => {
                if Some(&player.id) != self.local_id.as_ref() {
                    self.others.insert(player.id.clone(), player.clone());
                }
            }

            Packet::PlayerMoved { id, x, y } => {
                if let Some(player) = self.others.get_mut(id) {
                    player.x = *x;
                    player.y = *y;
                }
            }

            Packet::PlayerDisconnected { id } => {
                self.others.remove(id);
            }

            Packet::Collected {
                collectible_id,
                new_collectible,
                player_id,
                new_score,
            } => {
                self.collectibles.remove(collectible_id);
                self.pending_pickups.remove(collectible_id);
                self.collectibles
                    .insert(new_collectible.id, new_collectible.clone());

                if let Some(score) = new_score {
                    match &mut self.local {
                        Some(local) if &local.id == player_id => local.score = *score,
                        _ => {
                            if let Some(player) = self.others.get_mut(player_id) {
                                player.score = *score;
                            }
                        }
                    }
                }
            }

            Packet::Disconnected { reason } => {
                warn!("Server closed the session: {}", reason);
                *self = Self::default();
            }

            other => debug!("Ignoring {:?}", other),
        }
    }

    /// Moves the local player one step per direction, then clamps it to the
    /// world. Returns the movement packet to send if the position changed.
    pub fn apply_moves(&mut self, directions: &[Direction], speed: f32) -> Option<Packet> {
        let local = self.local.as_mut()?;
        let (old_x, old_y) = (local.x, local.y);

        for direction in directions {
            local.move_player(*direction, speed);
        }
        local.clamp_to_world();

        if local.x != old_x || local.y != old_y {
            Some(Packet::PlayerMovement {
                x: local.x,
                y: local.y,
            })
        } else {
            None
        }
    }

    /// Pickup requests for every collectible the local player is touching.
    ///
    /// A collectible already asked for is not asked for again until
    /// [`PICKUP_RETRY`] has passed without an answer.
    pub fn pickup_requests(&mut self, now: Instant) -> Vec<Packet> {
        let Some(local) = &self.local else {
            return Vec::new();
        };

        let mut requests = Vec::new();
        for collectible in self.collectibles.values() {
            if !local.within_pickup_range(collectible) {
                continue;
            }
            let due = self
                .pending_pickups
                .get(&collectible.id)
                .map_or(true, |sent| now.duration_since(*sent) >= PICKUP_RETRY);
            if due {
                self.pending_pickups.insert(collectible.id, now);
                requests.push(Packet::CollectibleCollected {
                    collectible_id: collectible.id,
                });
            }
        }
        requests
    }

    /// Every known player, local one included.
    pub fn roster(&self) -> Vec<Player> {
        self.local
            .iter()
            .chain(self.others.values())
            .cloned()
            .collect()
    }

    pub fn rank(&self) -> Option<Rank> {
        let local = self.local.as_ref()?;
        Some(calculate_rank(local, &self.roster()))
    }

    pub fn nearest_collectible(&self) -> Option<&Collectible> {
        let local = self.local.as_ref()?;
        self.collectibles.values().min_by(|a, b| {
            let da = (a.x - local.x).powi(2) + (a.y - local.y).powi(2);
            let db = (b.x - local.x).powi(2) + (b.y - local.y).powi(2);
            da.total_cmp(&db)
        })
    }
}
