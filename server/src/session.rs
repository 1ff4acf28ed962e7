//! Session registry: one session per connected client, keyed by the
//! connection identifier the server hands out on connect.
//!
//! The session id is reused as the player id, so there is exactly one player
//! in the world for every live session and no second mapping layer. The
//! registry handles:
//! - Connection admission (protocol version, capacity)
//! - Join/leave lifecycle, creating and removing the session's player
//! - Address lookup for routing inbound datagrams and outbound events
//! - Inactivity timeout detection

use crate::world::WorldStore;
use log::info;
use shared::{Player, PlayerId, PROTOCOL_VERSION};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Server full")]
    ServerFull,
    #[error("Protocol version mismatch (expected {expected}, got {got})")]
    VersionMismatch { expected: u32, got: u32 },
}

/// A live connection bound to a player id.
#[derive(Debug)]
pub struct Session {
    pub id: PlayerId,
    pub addr: SocketAddr,
    /// Last time any datagram arrived from this client
    pub last_seen: Instant,
}

impl Session {
    pub fn new(id: PlayerId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
        }
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

pub struct SessionRegistry {
    world: Arc<WorldStore>,
    sessions: HashMap<PlayerId, Session>,
    next_session: u64,
    max_clients: usize,
    timeout: Duration,
}

impl SessionRegistry {
    pub fn new(world: Arc<WorldStore>, max_clients: usize, timeout: Duration) -> Self {
        Self {
            world,
            sessions: HashMap::new(),
            next_session: 1,
            max_clients,
            timeout,
        }
    }

    /// Admits a client and creates its player.
    ///
    /// Returns the new session id (also the player id) and the player snapshot.
    pub async fn connect(
        &mut self,
        addr: SocketAddr,
        client_version: u32,
    ) -> Result<(PlayerId, Player), SessionError> {
        if client_version != PROTOCOL_VERSION {
            return Err(SessionError::VersionMismatch {
                expected: PROTOCOL_VERSION,
                got: client_version,
            });
        }
        if self.len() >= self.max_clients {
            return Err(SessionError::ServerFull);
        }

        let id = format!("p{}", self.next_session);
        self.next_session += 1;

        let player = self.world.add_player(&id).await;
        self.sessions.insert(id.clone(), Session::new(id.clone(), addr));
        info!("Client {} connected from {}", id, addr);

        Ok((id, player))
    }

    /// Ends a session and removes its player. Returns false if the session
    /// was already gone.
    pub async fn disconnect(&mut self, id: &str) -> bool {
        match self.sessions.remove(id) {
            Some(session) => {
                self.world.remove_player(id).await;
                info!("Client {} disconnected", session.id);
                true
            }
            None => false,
        }
    }

    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<PlayerId> {
        self.sessions
            .values()
            .find(|session| session.addr == addr)
            .map(|session| session.id.clone())
    }

    /// Marks a session as active now.
    pub fn touch(&mut self, id: &str) {
        if let Some(session) = self.sessions.get_mut(id) {
            session.last_seen = Instant::now();
        }
    }

    /// Ids of sessions that have been silent for longer than the timeout.
    ///
    /// Sessions are not removed here; the caller disconnects them so that
    /// departures are broadcast through the usual path.
    pub fn timed_out(&self) -> Vec<PlayerId> {
        if self.is_empty() {
            return Vec::new();
        }

        self.sessions
            .values()
            .filter(|session| session.is_timed_out(self.timeout))
            .map(|session| session.id.clone())
            .collect()
    }

    pub fn addrs(&self) -> Vec<(PlayerId, SocketAddr)> {
        self.sessions
            .values()
            .map(|session| (session.id.clone(), session.addr))
            .collect()
    }

    /// True if `id` is live and still silent past the timeout.
    pub fn is_timed_out(&self, id: &str) -> bool {
        self.sessions
            .get(id)
            .is_some_and(|session| session.is_timed_out(self.timeout))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn backdate(&mut self, id: &str, by: Duration) {
        if let Some(session) = self.sessions.get_mut(id) {
            session.last_seen = Instant::now() - by;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    fn registry(max_clients: usize) -> (Arc<WorldStore>, SessionRegistry) {
        let world = Arc::new(WorldStore::new());
        let registry = SessionRegistry::new(Arc::clone(&world), max_clients, Duration::from_secs(5));
        (world, registry)
    }

    #[test]
    fn test_session_timeout() {
        let mut session = Session::new("p1".into(), test_addr());
        assert!(!session.is_timed_out(Duration::from_secs(1)));

        session.last_seen = Instant::now() - Duration::from_secs(2);
        assert!(session.is_timed_out(Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_connect_creates_player() {
        let (world, mut registry) = registry(4);

        let (id, player) = registry.connect(test_addr(), PROTOCOL_VERSION).await.unwrap();
        assert_eq!(player.id, id);
        assert_eq!(player.score, 0);
        assert_eq!(registry.len(), 1);
        assert_eq!(world.player(&id).await, Some(player));
    }

    #[tokio::test]
    async fn test_session_ids_are_unique() {
        let (_, mut registry) = registry(4);

        let (id1, _) = registry.connect(test_addr(), PROTOCOL_VERSION).await.unwrap();
        registry.disconnect(&id1).await;
        let (id2, _) = registry.connect(test_addr(), PROTOCOL_VERSION).await.unwrap();

        assert_ne!(id1, id2);
    }

    #[tokio::test]
    async fn test_connect_rejects_when_full() {
        let (world, mut registry) = registry(1);

        registry.connect(test_addr(), PROTOCOL_VERSION).await.unwrap();
        let result = registry.connect(test_addr2(), PROTOCOL_VERSION).await;

        assert_eq!(result.unwrap_err(), SessionError::ServerFull);
        assert_eq!(registry.len(), 1);
        assert_eq!(world.player_count().await, 1);
    }

    #[tokio::test]
    async fn test_connect_rejects_wrong_version() {
        let (world, mut registry) = registry(4);

        let result = registry.connect(test_addr(), PROTOCOL_VERSION + 1).await;
        assert_eq!(
            result.unwrap_err(),
            SessionError::VersionMismatch {
                expected: PROTOCOL_VERSION,
                got: PROTOCOL_VERSION + 1
            }
        );
        assert!(registry.is_empty());
        assert_eq!(world.player_count().await, 0);
    }

    #[tokio::test]
    async fn test_disconnect_removes_exactly_one_player() {
        let (world, mut registry) = registry(4);

        let (id1, _) = registry.connect(test_addr(), PROTOCOL_VERSION).await.unwrap();
        let (id2, _) = registry.connect(test_addr2(), PROTOCOL_VERSION).await.unwrap();

        assert!(registry.disconnect(&id1).await);
        assert_eq!(registry.len(), 1);
        assert!(world.player(&id1).await.is_none());
        assert!(world.player(&id2).await.is_some());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let (world, mut registry) = registry(4);

        let (id, _) = registry.connect(test_addr(), PROTOCOL_VERSION).await.unwrap();
        assert!(registry.disconnect(&id).await);
        assert!(!registry.disconnect(&id).await);
        assert!(!registry.disconnect("p999").await);
        assert_eq!(world.player_count().await, 0);
    }

    #[tokio::test]
    async fn test_find_by_addr() {
        let (_, mut registry) = registry(4);

        let (id1, _) = registry.connect(test_addr(), PROTOCOL_VERSION).await.unwrap();
        let (id2, _) = registry.connect(test_addr2(), PROTOCOL_VERSION).await.unwrap();

        assert_eq!(registry.find_by_addr(test_addr()), Some(id1));
        assert!(registry.addrs().contains(&(id2, test_addr2())));

        let unknown: SocketAddr = "192.168.1.1:9999".parse().unwrap();
        assert_eq!(registry.find_by_addr(unknown), None);
    }

    #[tokio::test]
    async fn test_timed_out_sessions() {
        let world = Arc::new(WorldStore::new());
        let mut registry = SessionRegistry::new(world, 4, Duration::from_millis(50));

        let (id1, _) = registry.connect(test_addr(), PROTOCOL_VERSION).await.unwrap();
        let (id2, _) = registry.connect(test_addr2(), PROTOCOL_VERSION).await.unwrap();
        registry.backdate(&id1, Duration::from_secs(1));

        assert_eq!(registry.timed_out(), vec![id1.clone()]);
        assert!(registry.is_timed_out(&id1));
        assert!(!registry.is_timed_out(&id2));

        registry.backdate(&id2, Duration::from_secs(1));
        assert!(registry.is_timed_out(&id2));
        registry.touch(&id2);
        assert!(!registry.is_timed_out(&id2));
        assert_eq!(registry.timed_out(), vec![id1.clone()]);
        assert_eq!(registry.len(), 2);

        registry.disconnect(&id1).await;
        assert!(!registry.is_timed_out(&id1));
    }
}
