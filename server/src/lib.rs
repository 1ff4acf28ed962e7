//! # Session Server Library
//!
//! This library provides the authoritative server for the collectible arena.
//! It owns the shared world (players and collectibles), applies client events
//! to it, and relays every change to the connected clients.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative World State
//! All player and collectible records live in one [`world::WorldStore`].
//! Clients keep read-only mirrors rebuilt from the events the server sends;
//! they never hold the truth.
//!
//! ### Session Lifecycle
//! A `Connect` datagram opens a session, creates the player and sends the
//! joining client a snapshot of the world. `Disconnect`, an inactivity
//! timeout, or a reconnect from the same address closes it again and tells
//! everyone else.
//!
//! ### Pickup Arbitration
//! Several clients may claim the same collectible at once. The
//! [`collection::CollectionResolver`] credits exactly one of them and spawns
//! exactly one replacement.
//!
//! ## Architecture Design
//!
//! ### Event-Driven Main Loop
//! A receiver task decodes datagrams and forwards them to the main loop, which
//! handles them one at a time. Outbound events are queued on the
//! [`broadcast::Broadcaster`] and written by a single sender task, so events
//! caused by one client go out in the order they were handled.
//!
//! ### One Synchronization Boundary
//! Every store operation takes the store's lock for its whole duration.
//! Operations racing against a disconnect find the player gone and become
//! no-ops instead of errors.
//!
//! ### UDP-Based Communication
//! Each datagram carries one `bincode`-encoded [`shared::Packet`]. Datagrams
//! that fail to decode are logged and dropped without touching the world.
//!
//! ## Module Organization
//!
//! - `world`: player and collectible store
//! - `session`: session registry and admission
//! - `broadcast`: audience selection and outbound queue
//! - `collection`: pickup resolution
//! - `config`: command line / environment settings
//! - `network`: socket tasks and event dispatch
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = ServerConfig::default();
//!     let server = Server::bind(&config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Trust Model
//!
//! Positions and pickup claims are accepted as the client sends them. The
//! client clamps its own movement and checks proximity before claiming a
//! collectible; the server does not re-check either.

pub mod broadcast;
pub mod collection;
pub mod config;
pub mod network;
pub mod session;
pub mod world;
