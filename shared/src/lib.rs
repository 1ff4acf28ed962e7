use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

pub const PROTOCOL_VERSION: u32 = 1;
pub const WORLD_WIDTH: f32 = 640.0;
pub const WORLD_HEIGHT: f32 = 480.0;
pub const PLAYER_SIZE: f32 = 20.0;
pub const COLLECTIBLE_SIZE: f32 = 15.0;
/// Centre distance below which a player touches a collectible (sum of radii).
pub const PICKUP_DISTANCE: f32 = (PLAYER_SIZE + COLLECTIBLE_SIZE) / 2.0;
pub const MOVE_SPEED: f32 = 5.0;
pub const COLLECTIBLE_VALUE: u32 = 1;

/// Spawn coordinates are drawn from `SPAWN_MARGIN..SPAWN_MARGIN + SPAWN_RANGE_*`.
pub const SPAWN_MARGIN: u32 = 20;
pub const SPAWN_RANGE_X: u32 = 600;
pub const SPAWN_RANGE_Y: u32 = 440;

pub type PlayerId = String;
pub type CollectibleId = u64;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    // Client -> server
    Connect {
        client_version: u32,
    },
    Heartbeat,
    PlayerMovement {
        x: f32,
        y: f32,
    },
    CollectibleCollected {
        collectible_id: CollectibleId,
    },
    Disconnect,

    // Server -> client
    Connected {
        player_id: PlayerId,
    },
    CurrentPlayers {
        players: Vec<Player>,
    },
    CurrentCollectibles {
        collectibles: Vec<Collectible>,
    },
    NewPlayer {
        player: Player,
    },
    PlayerMoved {
        id: PlayerId,
        x: f32,
        y: f32,
    },
    PlayerDisconnected {
        id: PlayerId,
    },
    /// Result of a resolved pickup. `new_score` is `None` when the collector
    /// left before the pickup was resolved.
    Collected {
        collectible_id: CollectibleId,
        new_collectible: Collectible,
        player_id: PlayerId,
        new_score: Option<u32>,
    },
    Disconnected {
        reason: String,
    },
}

impl Packet {
    /// True for packets a client is allowed to send.
    pub fn is_client_packet(&self) -> bool {
        matches!(
            self,
            Packet::Connect { .. }
                | Packet::Heartbeat
                | Packet::PlayerMovement { .. }
                | Packet::CollectibleCollected { .. }
                | Packet::Disconnect
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Parses `"up" | "down" | "left" | "right"`. Anything else yields `None`,
    /// which callers treat as "don't move".
    pub fn from_name(name: &str) -> Option<Direction> {
        match name {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            "left" => Some(Direction::Left),
            "right" => Some(Direction::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub score: u32,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, x: f32, y: f32) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            score: 0,
        }
    }

    /// Shifts one axis by `speed`. Screen coordinates: up decreases `y`.
    ///
    /// Does not clamp; call [`Player::clamp_to_world`] afterwards.
    pub fn move_player(&mut self, direction: Direction, speed: f32) {
        match direction {
            Direction::Up => self.y -= speed,
            Direction::Down => self.y += speed,
            Direction::Left => self.x -= speed,
            Direction::Right => self.x += speed,
        }
    }

    /// Like [`Player::move_player`] but takes a direction name; unknown names
    /// leave the player where it is.
    pub fn move_named(&mut self, direction: &str, speed: f32) {
        if let Some(direction) = Direction::from_name(direction) {
            self.move_player(direction, speed);
        }
    }

    /// Keeps the player's square fully inside the world.
    pub fn clamp_to_world(&mut self) {
        let half = PLAYER_SIZE / 2.0;
        self.x = self.x.clamp(half, WORLD_WIDTH - half);
        self.y = self.y.clamp(half, WORLD_HEIGHT - half);
    }

    /// Exact-position collision. Discrete movement steps rarely land on the
    /// same coordinates, so pickups use [`Player::within_pickup_range`].
    pub fn collision(&self, item: &Collectible) -> bool {
        self.x == item.x && self.y == item.y
    }

    pub fn within_pickup_range(&self, item: &Collectible) -> bool {
        let dx = self.x - item.x;
        let dy = self.y - item.y;
        (dx * dx + dy * dy).sqrt() < PICKUP_DISTANCE
    }

    pub fn calculate_rank(&self, roster: &[Player]) -> Rank {
        calculate_rank(self, roster)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Collectible {
    pub id: CollectibleId,
    pub x: f32,
    pub y: f32,
    pub value: u32,
}

impl Collectible {
    pub fn new(id: CollectibleId, x: f32, y: f32) -> Self {
        Self {
            id,
            x,
            y,
            value: COLLECTIBLE_VALUE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rank {
    pub rank: usize,
    pub total: usize,
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rank: {}/{}", self.rank, self.total)
    }
}

/// Leaderboard order: higher score first, equal scores by ascending id.
pub fn leaderboard_order(a: &Player, b: &Player) -> Ordering {
    b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id))
}

/// Ranks `player` within `roster`.
///
/// The roster is expected to contain the player itself. If it doesn't, the
/// player is ranked as if it had been inserted, and counted in the total.
pub fn calculate_rank(player: &Player, roster: &[Player]) -> Rank {
    let mut present = false;
    let mut ahead = 0;

    for other in roster {
        if other.id == player.id {
            present = true;
            continue;
        }
        if leaderboard_order(other, player) == Ordering::Less {
            ahead += 1;
        }
    }

    Rank {
        rank: ahead + 1,
        total: if present { roster.len() } else { roster.len() + 1 },
    }
}
