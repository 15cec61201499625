//! Match events and the publishing port

#[cfg(test)]
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use super::roster::Tank;

pub const MOVEMENT_TOPIC: &str = "/topic/matches/1/movement";
pub const COLLISION_TOPIC: &str = "/topic/matches/1/collisionResult";
pub const WINNER_TOPIC: &str = "/topic/matches/1/winner";

/// Payload published when a projectile eliminates a tank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollisionReport {
    pub eliminated_id: String,
    pub x: i32,
    pub y: i32,
    pub shot_id: String,
}

/// Broadcast events emitted by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MatchEvent {
    Movement(Tank),
    Collision(CollisionReport),
    Winner(Tank),
}

impl MatchEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            MatchEvent::Movement(_) => MOVEMENT_TOPIC,
            MatchEvent::Collision(_) => COLLISION_TOPIC,
            MatchEvent::Winner(_) => WINNER_TOPIC,
        }
    }
}

/// Fire-and-forget event sink
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: MatchEvent);
}

/// Publisher backed by a tokio broadcast channel; every WebSocket session
/// holds a receiver
#[derive(Clone)]
pub struct BroadcastPublisher {
    tx: broadcast::Sender<MatchEvent>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MatchEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventPublisher for BroadcastPublisher {
    fn publish(&self, event: MatchEvent) {
        debug!(topic = event.topic(), "Publishing match event");
        // No receivers is not an error
        let _ = self.tx.send(event);
    }
}

/// Keeps every published event in order
#[cfg(test)]
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<MatchEvent>>,
}

#[cfg(test)]
impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MatchEvent> {
        self.events.lock().clone()
    }

    pub fn collisions(&self) -> Vec<CollisionReport> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                MatchEvent::Collision(report) => Some(report.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn winners(&self) -> Vec<Tank> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                MatchEvent::Winner(tank) => Some(tank.clone()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: MatchEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Heading;

    #[test]
    fn test_topics() {
        let tank = Tank::new("alice", 1, 8, "#fa0a0a", Heading::Right);
        assert_eq!(MatchEvent::Movement(tank.clone()).topic(), MOVEMENT_TOPIC);
        assert_eq!(MatchEvent::Winner(tank).topic(), WINNER_TOPIC);
    }

    #[test]
    fn test_collision_payload_shape() {
        let event = MatchEvent::Collision(CollisionReport {
            eliminated_id: "bob".into(),
            x: 13,
            y: 8,
            shot_id: "s1".into(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "collision");
        assert_eq!(json["payload"]["eliminatedId"], "bob");
        assert_eq!(json["payload"]["shotId"], "s1");
    }

    #[tokio::test]
    async fn test_broadcast_reaches_subscribers() {
        let publisher = BroadcastPublisher::new(8);
        let mut rx = publisher.subscribe();
        let tank = Tank::new("alice", 1, 8, "#fa0a0a", Heading::Right);
        publisher.publish(MatchEvent::Winner(tank.clone()));
        assert_eq!(rx.recv().await.unwrap(), MatchEvent::Winner(tank));
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let publisher = BroadcastPublisher::new(8);
        let tank = Tank::new("alice", 1, 8, "#fa0a0a", Heading::Right);
        publisher.publish(MatchEvent::Movement(tank));
    }
}
