//! Connection registry.
//!
//! Tracks every live connection's identity, its outbound frame queue, the
//! fingerprint-per-IP index, the set of Discord accounts currently playing
//! and per-player chat throttling.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::core::ids::EntityId;

/// Depth of each connection's outbound queue.
const OUTBOUND_QUEUE: usize = 256;

/// Opaque per-connection token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnId(pub u64);

/// Send half of a connection. Frames pushed here are written to the socket
/// by the connection's writer task, one at a time, so frames from different
/// producers never interleave.
#[derive(Clone)]
pub struct ClientHandle {
    tx: mpsc::Sender<Bytes>,
}

impl ClientHandle {
    pub fn new(tx: mpsc::Sender<Bytes>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (ClientHandle, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE);
        (ClientHandle { tx }, rx)
    }

    /// Handle whose peer is already gone; sends vanish. For tests and
    /// placeholder wiring.
    pub fn detached() -> ClientHandle {
        let (tx, _) = mpsc::channel(OUTBOUND_QUEUE);
        ClientHandle { tx }
    }

    /// Queue a frame; false when the connection is closed or the queue is
    /// jammed (the session cleanup will reap it).
    pub async fn send(&self, frame: Bytes) -> bool {
        self.tx.send(frame).await.is_ok()
    }
}

/// Identity attached to a connection by the upstream auth service.
#[derive(Clone, Debug, Default)]
pub struct UserProfile {
    pub client_ip: String,
    pub role: String,
    pub discord_id: Option<String>,
    pub unlocked_skins: Vec<i64>,
}

struct ConnectionEntry {
    profile: UserProfile,
    handle: ClientHandle,
    fingerprint: Option<u32>,
    player_id: Option<EntityId>,
}

struct ChatState {
    last_message_at: Option<Instant>,
    last_message: String,
}

#[derive(Default)]
struct RegistryInner {
    connections: HashMap<ConnId, ConnectionEntry>,
    fingerprints_by_ip: HashMap<String, HashSet<u32>>,
    playing_discord: HashSet<String>,
    chat: HashMap<EntityId, ChatState>,
}

pub struct Registry {
    inner: Mutex<RegistryInner>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    pub fn register(&self, conn: ConnId, profile: UserProfile, handle: ClientHandle) {
        self.inner.lock().unwrap().connections.insert(
            conn,
            ConnectionEntry {
                profile,
                handle,
                fingerprint: None,
                player_id: None,
            },
        );
    }

    pub fn profile(&self, conn: ConnId) -> Option<UserProfile> {
        self.inner
            .lock()
            .unwrap()
            .connections
            .get(&conn)
            .map(|e| e.profile.clone())
    }

    pub fn handle(&self, conn: ConnId) -> Option<ClientHandle> {
        self.inner
            .lock()
            .unwrap()
            .connections
            .get(&conn)
            .map(|e| e.handle.clone())
    }

    pub fn set_player(&self, conn: ConnId, player_id: EntityId) {
        if let Some(entry) = self.inner.lock().unwrap().connections.get_mut(&conn) {
            entry.player_id = Some(player_id);
        }
    }

    /// Detach the player from the connection after a kick or kill; the
    /// socket may linger while the client reads its final notification.
    pub fn clear_player(&self, conn: ConnId) {
        if let Some(entry) = self.inner.lock().unwrap().connections.get_mut(&conn) {
            entry.player_id = None;
        }
    }

    pub fn player_id(&self, conn: ConnId) -> Option<EntityId> {
        self.inner
            .lock()
            .unwrap()
            .connections
            .get(&conn)
            .and_then(|e| e.player_id)
    }

    /// Merge freshly unlocked skins into the connection's profile.
    pub fn unlock_skins(&self, conn: ConnId, skins: &[i64]) {
        if let Some(entry) = self.inner.lock().unwrap().connections.get_mut(&conn) {
            for &skin in skins {
                if !entry.profile.unlocked_skins.contains(&skin) {
                    entry.profile.unlocked_skins.push(skin);
                }
            }
        }
    }

    // =========================================================================
    // FINGERPRINTS (one join per fingerprint per IP)
    // =========================================================================

    pub fn is_fingerprint_used(&self, ip: &str, fingerprint: u32) -> bool {
        self.inner
            .lock()
            .unwrap()
            .fingerprints_by_ip
            .get(ip)
            .map(|set| set.contains(&fingerprint))
            .unwrap_or(false)
    }

    pub fn add_fingerprint(&self, conn: ConnId, fingerprint: u32) {
        let mut inner = self.inner.lock().unwrap();
        let Some(entry) = inner.connections.get_mut(&conn) else {
            return;
        };
        entry.fingerprint = Some(fingerprint);
        let ip = entry.profile.client_ip.clone();
        inner
            .fingerprints_by_ip
            .entry(ip)
            .or_default()
            .insert(fingerprint);
    }

    pub fn clear_fingerprint(&self, conn: ConnId) {
        let mut inner = self.inner.lock().unwrap();
        let Some(entry) = inner.connections.get_mut(&conn) else {
            return;
        };
        let Some(fingerprint) = entry.fingerprint.take() else {
            return;
        };
        let ip = entry.profile.client_ip.clone();
        if let Some(set) = inner.fingerprints_by_ip.get_mut(&ip) {
            set.remove(&fingerprint);
        }
    }

    // =========================================================================
    // DISCORD SESSION LOCKS (one game per account)
    // =========================================================================

    pub fn is_discord_playing(&self, discord_id: &str) -> bool {
        self.inner
            .lock()
            .unwrap()
            .playing_discord
            .contains(discord_id)
    }

    pub fn add_playing_discord(&self, discord_id: &str) {
        self.inner
            .lock()
            .unwrap()
            .playing_discord
            .insert(discord_id.to_string());
    }

    pub fn remove_playing_discord(&self, discord_id: &str) {
        self.inner.lock().unwrap().playing_discord.remove(discord_id);
    }

    // =========================================================================
    // CHAT THROTTLING
    // =========================================================================

    /// One message per five seconds per player, and never the same message
    /// twice in a row. Records the message when accepted.
    pub fn admit_chat_message(&self, player_id: EntityId, message: &str) -> bool {
        const RATE_LIMIT: Duration = Duration::from_secs(5);

        let mut inner = self.inner.lock().unwrap();
        let state = inner.chat.entry(player_id).or_insert(ChatState {
            last_message_at: None,
            last_message: String::new(),
        });
        if state
            .last_message_at
            .map(|t| t.elapsed() < RATE_LIMIT)
            .unwrap_or(false)
        {
            return false;
        }
        if state.last_message == message {
            return false;
        }
        state.last_message_at = Some(Instant::now());
        state.last_message = message.to_string();
        true
    }

    pub fn remove_chat_state(&self, player_id: EntityId) {
        self.inner.lock().unwrap().chat.remove(&player_id);
    }

    /// Drop a connection entry entirely (fingerprint index included).
    pub fn remove(&self, conn: ConnId) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(entry) = inner.connections.remove(&conn) {
            if let Some(fingerprint) = entry.fingerprint {
                if let Some(set) = inner.fingerprints_by_ip.get_mut(&entry.profile.client_ip) {
                    set.remove(&fingerprint);
                }
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(registry: &Registry, conn: u64, ip: &str) -> ConnId {
        let id = ConnId(conn);
        registry.register(
            id,
            UserProfile {
                client_ip: ip.to_string(),
                ..Default::default()
            },
            ClientHandle::detached(),
        );
        id
    }

    #[test]
    fn fingerprint_is_one_shot_per_ip() {
        let registry = Registry::new();
        let a = register(&registry, 1, "10.0.0.1");
        assert!(!registry.is_fingerprint_used("10.0.0.1", 42));
        registry.add_fingerprint(a, 42);
        assert!(registry.is_fingerprint_used("10.0.0.1", 42));
        // Different IP, same fingerprint: fine.
        assert!(!registry.is_fingerprint_used("10.0.0.2", 42));
        registry.clear_fingerprint(a);
        assert!(!registry.is_fingerprint_used("10.0.0.1", 42));
    }

    #[test]
    fn removing_connection_clears_its_fingerprint() {
        let registry = Registry::new();
        let a = register(&registry, 1, "10.0.0.1");
        registry.add_fingerprint(a, 7);
        registry.remove(a);
        assert!(!registry.is_fingerprint_used("10.0.0.1", 7));
        assert!(registry.profile(a).is_none());
    }

    #[test]
    fn discord_lock_round_trip() {
        let registry = Registry::new();
        assert!(!registry.is_discord_playing("u1"));
        registry.add_playing_discord("u1");
        assert!(registry.is_discord_playing("u1"));
        registry.remove_playing_discord("u1");
        assert!(!registry.is_discord_playing("u1"));
    }

    #[test]
    fn chat_rejects_rapid_and_duplicate_messages() {
        let registry = Registry::new();
        let player = EntityId(3);
        assert!(registry.admit_chat_message(player, "hello"));
        // Within the rate window.
        assert!(!registry.admit_chat_message(player, "again"));
        registry.remove_chat_state(player);
        assert!(registry.admit_chat_message(player, "hello"));
    }

    #[test]
    fn skin_unlock_merge_deduplicates() {
        let registry = Registry::new();
        let a = register(&registry, 1, "10.0.0.1");
        registry.unlock_skins(a, &[3, 4]);
        registry.unlock_skins(a, &[4, 5]);
        assert_eq!(registry.profile(a).unwrap().unlocked_skins, vec![3, 4, 5]);
    }
}
