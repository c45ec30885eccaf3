//! # Hexhold Game Server
//!
//! Authoritative server for a real-time top-down strategy game. The server
//! owns the entire simulated world; clients connect over a binary WebSocket
//! channel, send intents and receive a stream of world-delta frames.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HEXHOLD SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/             - Small primitives with invariants        │
//! │  ├── ids.rs        - FIFO 8-bit ID pools                     │
//! │  ├── counters.rs   - Health / capacity / resource counters   │
//! │  ├── position.rs   - Integer anchors, float movers           │
//! │  └── polygon.rs    - Polygon shapes + SAT intersection       │
//! │                                                              │
//! │  game/             - World simulation                        │
//! │  ├── catalog.rs    - Static stats tables + upgrade graph     │
//! │  ├── base.rs       - Buildings, bullets, spawners per base   │
//! │  ├── player.rs     - Units, resources, anti-cheat state      │
//! │  ├── world.rs      - Global entity registry                  │
//! │  ├── tick.rs       - Seven periodic simulation loops         │
//! │  ├── collision.rs  - Broad-phase + SAT damage resolution     │
//! │  └── events.rs     - Typed event bus with fan-out            │
//! │                                                              │
//! │  network/          - Transport and sessions                  │
//! │  ├── protocol.rs   - Binary frame codec (40+ message kinds)  │
//! │  ├── server.rs     - WebSocket accept + per-connection loop  │
//! │  ├── handlers.rs   - Intent handlers + anti-cheat            │
//! │  ├── worker.rs     - Event worker pool (serialize+broadcast) │
//! │  └── http.rs       - Admin endpoints (playercount, reboot)   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Simulation loops mutate the shared world under a strict lock order
//! (world → player/neutral → base → entity) and publish [`game::events::GameEvent`]s
//! into an unbounded channel; a worker pool drains the channel, serializes
//! frames and broadcasts them, so no tick loop ever blocks on network I/O.

pub mod core;
pub mod game;
pub mod network;

/// Protocol version byte sent to every client on connect.
pub const SERVER_VERSION: u8 = 6;

pub use crate::core::ids::EntityId;
pub use crate::core::position::{TilePos, WorldPos};
pub use crate::game::world::World;
