//! Pickup arbitration.
//!
//! A collectible goes from active to collected exactly once. The transition is
//! decided by `WorldStore::collect`, which removes the collectible, credits the
//! collector and spawns the replacement under one lock. Whichever request
//! removes the id wins; every other request for that id finds nothing and is
//! dropped without a broadcast. The winner's result goes to every session.
//!
//! Proximity is not re-checked here; clients only ask for collectibles they
//! are touching.

use crate::broadcast::Broadcaster;
use crate::world::WorldStore;
use log::debug;
use shared::{Collectible, CollectibleId, Packet, PlayerId};
use std::sync::Arc;

/// Outcome of a successful pickup.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub collectible_id: CollectibleId,
    pub new_collectible: Collectible,
    pub player_id: PlayerId,
    /// `None` if the collector disconnected before being credited
    pub new_score: Option<u32>,
}

impl Collection {
    pub fn to_packet(&self) -> Packet {
        Packet::Collected {
            collectible_id: self.collectible_id,
            new_collectible: self.new_collectible.clone(),
            player_id: self.player_id.clone(),
            new_score: self.new_score,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollectionResolver {
    world: Arc<WorldStore>,
    broadcaster: Broadcaster,
}

impl CollectionResolver {
    pub fn new(world: Arc<WorldStore>, broadcaster: Broadcaster) -> Self {
        Self { world, broadcaster }
    }

    /// Handles one pickup request from `player_id`.
    ///
    /// Returns `None` when the collectible was already taken or never existed.
    pub async fn resolve(
        &self,
        player_id: &str,
        collectible_id: CollectibleId,
    ) -> Option<Collection> {
        let pickup = self.world.collect(player_id, collectible_id).await?;
        if pickup.new_score.is_none() {
            debug!(
                "Collector {} left before collectible {} was credited",
                player_id, collectible_id
            );
        }

        let collection = Collection {
            collectible_id: pickup.collected.id,
            new_collectible: pickup.replacement,
            player_id: player_id.to_string(),
            new_score: pickup.new_score,
        };
        debug!(
            "Collectible {} collected by {} (score {:?}), replaced by {}",
            collection.collectible_id,
            collection.player_id,
            collection.new_score,
            collection.new_collectible.id
        );

        self.broadcaster.broadcast_all(collection.to_packet());
        Some(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::{Audience, Outbound};
    use tokio::sync::mpsc;

    async fn setup() -> (
        Arc<WorldStore>,
        CollectionResolver,
        mpsc::UnboundedReceiver<Outbound>,
        CollectibleId,
    ) {
        let world = Arc::new(WorldStore::seeded().await);
        let (broadcaster, rx) = Broadcaster::new();
        let resolver = CollectionResolver::new(Arc::clone(&world), broadcaster);
        let id = world.collectibles().await[0].id;
        (world, resolver, rx, id)
    }

    #[tokio::test]
    async fn test_successful_pickup() {
        let (world, resolver, mut rx, id) = setup().await;
        world.add_player("p1").await;

        let collection = resolver.resolve("p1", id).await.unwrap();
        assert_eq!(collection.collectible_id, id);
        assert_eq!(collection.player_id, "p1");
        assert_eq!(collection.new_score, Some(1));
        assert_ne!(collection.new_collectible.id, id);

        assert_eq!(world.player("p1").await.unwrap().score, 1);
        let active = world.collectibles().await;
        assert_eq!(active, vec![collection.new_collectible.clone()]);

        let outbound = rx.try_recv().unwrap();
        assert_eq!(outbound.audience, Audience::All);
        assert_eq!(outbound.packet, collection.to_packet());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_collectible_is_ignored() {
        let (world, resolver, mut rx, id) = setup().await;
        world.add_player("p1").await;

        assert!(resolver.resolve("p1", id + 100).await.is_none());
        assert_eq!(world.player("p1").await.unwrap().score, 0);
        assert_eq!(world.collectibles().await.len(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_second_request_for_same_id_is_ignored() {
        let (world, resolver, mut rx, id) = setup().await;
        world.add_player("p1").await;
        world.add_player("p2").await;

        assert!(resolver.resolve("p1", id).await.is_some());
        assert!(resolver.resolve("p2", id).await.is_none());

        assert_eq!(world.player("p2").await.unwrap().score, 0);
        assert_eq!(world.collectibles().await.len(), 1);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_departed_collector_still_replaces_collectible() {
        let (world, resolver, mut rx, id) = setup().await;

        let collection = resolver.resolve("gone", id).await.unwrap();
        assert_eq!(collection.new_score, None);

        let active = world.collectibles().await;
        assert_eq!(active.len(), 1);
        assert_ne!(active[0].id, id);
        assert!(matches!(
            rx.try_recv().unwrap().packet,
            Packet::Collected { new_score: None, .. }
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_players_single_credit() {
        for _ in 0..20 {
            let (world, resolver, mut rx, id) = setup().await;
            world.add_player("a").await;
            world.add_player("b").await;

            let ra = resolver.clone();
            let rb = resolver.clone();
            let (res_a, res_b) = tokio::join!(
                tokio::spawn(async move { ra.resolve("a", id).await }),
                tokio::spawn(async move { rb.resolve("b", id).await }),
            );
            let results = [res_a.unwrap(), res_b.unwrap()];

            let winners: Vec<&Collection> = results.iter().flatten().collect();
            assert_eq!(winners.len(), 1);
            let winner = winners[0];

            let score_a = world.player("a").await.unwrap().score;
            let score_b = world.player("b").await.unwrap().score;
            assert_eq!(score_a + score_b, 1);
            let credited = if score_a == 1 { "a" } else { "b" };
            assert_eq!(winner.player_id, credited);

            let active = world.collectibles().await;
            assert_eq!(active.len(), 1);
            assert_ne!(active[0].id, id);

            match rx.try_recv().unwrap().packet {
                Packet::Collected { player_id, new_score, .. } => {
                    assert_eq!(player_id, credited);
                    assert_eq!(new_score, Some(1));
                }
                other => panic!("unexpected packet {:?}", other),
            }
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_world_always_has_one_collectible_during_pickups() {
        let (world, resolver, _rx, _) = setup().await;
        world.add_player("p1").await;
        let rounds = 5_000;

        let collector = {
            let world = Arc::clone(&world);
            tokio::spawn(async move {
                for _ in 0..rounds {
                    let id = world.collectibles().await[0].id;
                    assert!(resolver.resolve("p1", id).await.is_some());
                }
            })
        };

        let mut empty_samples = 0;
        while !collector.is_finished() {
            if world.collectibles().await.is_empty() {
                empty_samples += 1;
            }
            tokio::task::yield_now().await;
        }
        collector.await.unwrap();

        assert_eq!(empty_samples, 0);
        assert_eq!(world.player("p1").await.unwrap().score, rounds);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_many_concurrent_requests_single_replacement() {
        let (world, resolver, mut rx, id) = setup().await;
        let ids: Vec<String> = (0..16).map(|i| format!("p{}", i)).collect();
        for player in &ids {
            world.add_player(player).await;
        }

        let handles: Vec<_> = ids
            .iter()
            .cloned()
            .map(|player| {
                let resolver = resolver.clone();
                tokio::spawn(async move { resolver.resolve(&player, id).await })
            })
            .collect();

        let mut credited = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                credited += 1;
            }
        }
        assert_eq!(credited, 1);

        let total: u32 = world.players().await.iter().map(|p| p.score).sum();
        assert_eq!(total, 1);
        assert_eq!(world.collectibles().await.len(), 1);

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
