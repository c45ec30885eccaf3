//! Typed world events and the fan-out bus.
//!
//! Simulators and handlers push events into one unbounded channel; a
//! dispatcher task forwards each event to every subscriber's bounded queue.
//! Subscribers (the network worker pool) do the slow work, so emitting from
//! a critical section never blocks on I/O.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;

use crate::core::ids::EntityId;
use crate::core::position::WorldPos;
use crate::game::base::Owner;
use crate::game::building::Building;
use crate::game::config::KickReason;
use crate::game::leaderboard::LeaderboardEntry;
use crate::game::neutral::NeutralBase;
use crate::game::player::Player;
use crate::game::unit::Unit;

/// Queue depth of each subscriber channel.
pub const SUBSCRIBER_QUEUE: usize = 10_000;

/// Everything the simulation can tell the outside world. Position-carrying
/// arms snapshot their coordinates at emit time, inside the critical section
/// that produced them.
#[derive(Clone)]
pub enum GameEvent {
    ResourceUpdate {
        player: Arc<Player>,
    },
    UnitSpawn {
        owner: Owner,
        barracks_id: EntityId,
        unit: Arc<Unit>,
    },
    UnitPositionUpdates {
        player_id: EntityId,
        units: Vec<(EntityId, WorldPos)>,
    },
    UnitsRotationUpdate {
        player_id: EntityId,
        units: Vec<(EntityId, f32)>,
    },
    TurretRotationUpdate {
        owner: Owner,
        turret_id: EntityId,
        angle: f32,
    },
    BaseHealthUpdate {
        owner: Owner,
        health: u16,
    },
    NeutralBaseCaptured {
        neutral: Arc<NeutralBase>,
    },
    PlayerKilled {
        player: Arc<Player>,
        killer_id: EntityId,
    },
    UnitRemove {
        player_id: EntityId,
        unit_id: EntityId,
    },
    BuildingRemoved {
        owner: Owner,
        building: Arc<Building>,
    },
    BulletSpawn {
        owner: Owner,
        turret_id: EntityId,
        bullet_id: EntityId,
        position: WorldPos,
    },
    UnitBulletSpawn {
        player_id: EntityId,
        unit_id: EntityId,
        bullet_id: EntityId,
        position: WorldPos,
    },
    BulletRemove {
        owner: Owner,
        bullet_id: EntityId,
    },
    BulletPositionUpdate {
        owner: Owner,
        bullet_id: EntityId,
        position: WorldPos,
    },
    LeaderboardUpdate {
        changes: Vec<LeaderboardEntry>,
    },
    RemoveSpawnProtection {
        player_id: EntityId,
    },
    Kick {
        player: Arc<Player>,
        reason: KickReason,
    },
}

/// Cloneable producer half of the bus.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::UnboundedSender<GameEvent>,
}

impl EventBus {
    pub fn new() -> (EventBus, EventDispatcher) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            EventBus { tx },
            EventDispatcher {
                rx,
                subscribers: Vec::new(),
            },
        )
    }

    /// Fire-and-forget; the dispatcher may already be gone during shutdown.
    pub fn emit(&self, event: GameEvent) {
        let _ = self.tx.send(event);
    }
}

/// Owns the fan-in end and forwards to all subscribers.
pub struct EventDispatcher {
    rx: mpsc::UnboundedReceiver<GameEvent>,
    subscribers: Vec<mpsc::Sender<GameEvent>>,
}

impl EventDispatcher {
    /// Register a subscriber before the dispatcher starts running.
    pub fn subscribe(&mut self) -> mpsc::Receiver<GameEvent> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE);
        self.subscribers.push(tx);
        rx
    }

    /// Drain the fan-in channel forever. A full subscriber queue backs the
    /// dispatcher up rather than dropping events.
    pub async fn run(mut self) {
        while let Some(event) = self.rx.recv().await {
            for subscriber in &self.subscribers {
                if subscriber.send(event.clone()).await.is_err() {
                    warn!("event subscriber dropped its receiver");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_reach_every_subscriber() {
        let (bus, mut dispatcher) = EventBus::new();
        let mut rx_a = dispatcher.subscribe();
        let mut rx_b = dispatcher.subscribe();
        tokio::spawn(dispatcher.run());

        bus.emit(GameEvent::RemoveSpawnProtection {
            player_id: EntityId(3),
        });

        for rx in [&mut rx_a, &mut rx_b] {
            match rx.recv().await {
                Some(GameEvent::RemoveSpawnProtection { player_id }) => {
                    assert_eq!(player_id, EntityId(3));
                }
                _ => panic!("expected the emitted event"),
            }
        }
    }

    #[tokio::test]
    async fn emit_is_nonblocking_for_the_producer() {
        let (bus, dispatcher) = EventBus::new();
        // No subscriber drains anything yet; emits must still return.
        for i in 0..1000 {
            bus.emit(GameEvent::UnitRemove {
                player_id: EntityId(0),
                unit_id: EntityId(i as u8),
            });
        }
        drop(dispatcher);
    }
}
