//! # Headless Game Client
//!
//! Client-side half of the collectible arena protocol, without rendering or
//! keyboard capture.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! A read-only mirror of the server's world rebuilt from server events, plus
//! local movement prediction for the client's own player: each step is
//! applied with [`shared::Player::move_player`], clamped to the world, and
//! only sent when the position actually changed. The mirror also does the
//! proximity pre-check before a pickup is requested.
//!
//! ### Steering Module (`steering`)
//! Stands in for keyboard input by steering towards a target position.
//!
//! ### Network Module (`network`)
//! UDP connection to the server: connect, heartbeats, movement and pickup
//! requests, and event handling.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::{Client, ClientSettings};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let mut client = Client::new("127.0.0.1:3000", ClientSettings::default()).await?;
//!     client.run(Some(Duration::from_secs(30))).await?;
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod network;
pub mod steering;
