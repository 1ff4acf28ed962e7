//! Outbound event delivery.
//!
//! Handlers never touch the socket. They queue packets on the `Broadcaster`
//! together with an audience, and a single sender task drains the queue in
//! FIFO order. Audiences are resolved against the live session table when the
//! packet is actually sent, so a session removed before that point receives
//! nothing further.

use log::error;
use shared::{Packet, PlayerId};
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// Who receives an outbound packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Exactly one session
    One(PlayerId),
    /// Every live session except the given one
    AllExcept(PlayerId),
    /// Every live session
    All,
    /// A raw address with no session, e.g. a rejected connect
    Address(SocketAddr),
}

impl Audience {
    /// Picks the destination addresses out of the live sessions.
    pub fn resolve(&self, sessions: &[(PlayerId, SocketAddr)]) -> Vec<SocketAddr> {
        match self {
            Audience::One(target) => sessions
                .iter()
                .filter(|(id, _)| id == target)
                .map(|(_, addr)| *addr)
                .collect(),
            Audience::AllExcept(sender) => sessions
                .iter()
                .filter(|(id, _)| id != sender)
                .map(|(_, addr)| *addr)
                .collect(),
            Audience::All => sessions.iter().map(|(_, addr)| *addr).collect(),
            Audience::Address(addr) => vec![*addr],
        }
    }
}

#[derive(Debug)]
pub struct Outbound {
    pub audience: Audience,
    pub packet: Packet,
}

/// Fire-and-forget handle for queueing outbound packets.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl Broadcaster {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn unicast(&self, session: &str, packet: Packet) {
        self.queue(Audience::One(session.to_string()), packet);
    }

    pub fn broadcast_except(&self, sender: &str, packet: Packet) {
        self.queue(Audience::AllExcept(sender.to_string()), packet);
    }

    pub fn broadcast_all(&self, packet: Packet) {
        self.queue(Audience::All, packet);
    }

    pub fn reply_to(&self, addr: SocketAddr, packet: Packet) {
        self.queue(Audience::Address(addr), packet);
    }

    fn queue(&self, audience: Audience, packet: Packet) {
        if let Err(e) = self.tx.send(Outbound { audience, packet }) {
            error!("Failed to queue outbound packet: {}", e);
        }
    }
}
