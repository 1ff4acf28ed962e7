//! Authoritative world state: connected players and active collectibles.
//!
//! `WorldStore` is the only owner of `Player` and `Collectible` records. Every
//! operation takes the store's single lock for its whole duration, so each one
//! is atomic relative to every other caller. Reads hand out cloned snapshots;
//! nothing borrowed from inside the lock escapes it.

use log::{debug, info};
use rand::Rng;
use shared::{
    Collectible, CollectibleId, Player, PlayerId, SPAWN_MARGIN, SPAWN_RANGE_X, SPAWN_RANGE_Y,
};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct World {
    players: HashMap<PlayerId, Player>,
    collectibles: HashMap<CollectibleId, Collectible>,
    next_collectible_id: CollectibleId,
}

impl World {
    fn credit(&mut self, id: &str, amount: u32) -> Option<u32> {
        let player = self.players.get_mut(id)?;
        player.score = player.score.saturating_add(amount);
        Some(player.score)
    }

    fn spawn_collectible(&mut self) -> Collectible {
        let (x, y) = random_spawn_position();
        self.next_collectible_id += 1;
        let collectible = Collectible::new(self.next_collectible_id, x, y);
        self.collectibles.insert(collectible.id, collectible.clone());
        debug!(
            "Spawned collectible {} at ({}, {})",
            collectible.id, collectible.x, collectible.y
        );
        collectible
    }
}

/// Result of [`WorldStore::collect`].
#[derive(Debug, Clone, PartialEq)]
pub struct Pickup {
    pub collected: Collectible,
    /// `None` if the collector is no longer in the world
    pub new_score: Option<u32>,
    pub replacement: Collectible,
}

/// Process-wide store of players and collectibles.
#[derive(Debug, Default)]
pub struct WorldStore {
    world: RwLock<World>,
}

impl WorldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with one active collectible.
    pub async fn seeded() -> Self {
        let store = Self::new();
        store.add_collectible().await;
        store
    }

    /// Inserts a player at a random in-bounds position with score 0.
    ///
    /// An existing entry with the same id is replaced.
    pub async fn add_player(&self, id: &str) -> Player {
        let (x, y) = random_spawn_position();
        let player = Player::new(id, x, y);

        let mut world = self.world.write().await;
        world.players.insert(player.id.clone(), player.clone());
        info!("Added player {} at ({}, {})", player.id, player.x, player.y);

        player
    }

    /// Removes a player. Returns the removed record, or `None` if it was
    /// already gone.
    pub async fn remove_player(&self, id: &str) -> Option<Player> {
        let removed = self.world.write().await.players.remove(id);
        if removed.is_some() {
            info!("Removed player {}", id);
        }
        removed
    }

    /// Overwrites a player's position as given. Unknown ids are ignored.
    pub async fn update_player_position(&self, id: &str, x: f32, y: f32) -> Option<Player> {
        let mut world = self.world.write().await;
        let player = world.players.get_mut(id)?;
        player.x = x;
        player.y = y;
        Some(player.clone())
    }

    pub async fn player(&self, id: &str) -> Option<Player> {
        self.world.read().await.players.get(id).cloned()
    }

    pub async fn players(&self) -> Vec<Player> {
        self.world.read().await.players.values().cloned().collect()
    }

    pub async fn player_count(&self) -> usize {
        self.world.read().await.players.len()
    }

    /// Spawns a collectible with a fresh id at a random in-bounds position.
    pub async fn add_collectible(&self) -> Collectible {
        self.world.write().await.spawn_collectible()
    }

    /// Removes and returns a collectible in one step. Of any number of
    /// concurrent calls for the same id, exactly one gets `Some`.
    pub async fn remove_collectible(&self, id: CollectibleId) -> Option<Collectible> {
        self.world.write().await.collectibles.remove(&id)
    }

    /// Removes a collectible, credits its value to `player_id` and spawns the
    /// replacement, all under one write lock.
    ///
    /// Returns `None` if the collectible is not active. A missing player still
    /// gets the collectible replaced, with `new_score` set to `None`.
    pub async fn collect(
        &self,
        player_id: &str,
        collectible_id: CollectibleId,
    ) -> Option<Pickup> {
        let mut world = self.world.write().await;
        let collected = world.collectibles.remove(&collectible_id)?;
        let new_score = world.credit(player_id, collected.value);
        let replacement = world.spawn_collectible();

        Some(Pickup {
            collected,
            new_score,
            replacement,
        })
    }

    pub async fn collectibles(&self) -> Vec<Collectible> {
        self.world
            .read()
            .await
            .collectibles
            .values()
            .cloned()
            .collect()
    }
}

fn random_spawn_position() -> (f32, f32) {
    let mut rng = rand::thread_rng();
    let x = SPAWN_MARGIN + rng.gen_range(0..SPAWN_RANGE_X);
    let y = SPAWN_MARGIN + rng.gen_range(0..SPAWN_RANGE_Y);
    (x as f32, y as f32)
}
