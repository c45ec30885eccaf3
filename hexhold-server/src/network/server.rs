//! WebSocket game server.
//!
//! Accepts connections (globally rate-limited), resolves the client's
//! identity from the handshake cookie, then runs one reader loop and one
//! writer task per connection. Disconnect cleanup is idempotent.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::game::skins::SkinCatalog;
use crate::game::world::World;
use crate::network::auth::{IdentityClient, StatsClient};
use crate::network::broadcast::Broadcaster;
use crate::network::encode;
use crate::network::filter::{ProfanityFilter, WordListFilter};
use crate::network::handlers;
use crate::network::registry::{ClientHandle, ConnId, Registry, UserProfile};
use crate::SERVER_VERSION;

/// New connections admitted per second, across all clients.
const ACCEPTS_PER_SECOND: u32 = 5;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub admin_addr: SocketAddr,
    pub identity_endpoint: String,
    pub stats_endpoint: String,
    pub skin_catalog_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().unwrap(),
            admin_addr: "127.0.0.1:8081".parse().unwrap(),
            identity_endpoint: "https://account.hexhold.io/api/user".to_string(),
            stats_endpoint: "https://account.hexhold.io/api/user/update/stats".to_string(),
            skin_catalog_path: "data/skins.json".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind: {0}")]
    Bind(#[from] std::io::Error),
    #[error("upstream client setup failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

/// Everything the session layer shares: world, registries, upstream clients
/// and the reboot latch.
pub struct ServerShared {
    pub world: Arc<World>,
    pub registry: Registry,
    pub broadcaster: Broadcaster,
    pub identity: IdentityClient,
    pub stats: StatsClient,
    pub skins: SkinCatalog,
    pub filter: Box<dyn ProfanityFilter>,
    pub palette: Vec<[u8; 3]>,
    rebooting: AtomicBool,
}

impl ServerShared {
    pub fn new(
        world: Arc<World>,
        skins: SkinCatalog,
        config: &ServerConfig,
    ) -> Result<Arc<ServerShared>, ServerError> {
        Ok(Arc::new(ServerShared {
            broadcaster: Broadcaster::new(world.clone()),
            world,
            registry: Registry::new(),
            identity: IdentityClient::new(&config.identity_endpoint)?,
            stats: StatsClient::new(&config.stats_endpoint)?,
            skins,
            filter: Box::new(WordListFilter::default()),
            palette: crate::game::skins::fallback_palette(),
            rebooting: AtomicBool::new(false),
        }))
    }

    pub fn is_rebooting(&self) -> bool {
        self.rebooting.load(Ordering::Acquire)
    }

    pub fn set_rebooting(&self) {
        self.rebooting.store(true, Ordering::Release);
    }
}

struct RateWindow {
    window_start: Instant,
    count: u32,
}

pub struct GameServer {
    shared: Arc<ServerShared>,
    config: ServerConfig,
    accept_rate: Mutex<RateWindow>,
    next_conn_id: AtomicU64,
}

impl GameServer {
    pub fn new(config: ServerConfig, shared: Arc<ServerShared>) -> Self {
        Self {
            shared,
            config,
            accept_rate: Mutex::new(RateWindow {
                window_start: Instant::now(),
                count: 0,
            }),
            next_conn_id: AtomicU64::new(1),
        }
    }

    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("game server listening on {}", self.config.bind_addr);

        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(error) => {
                    error!(%error, "accept failed");
                    continue;
                }
            };
            if !self.admit() {
                warn!(%peer, "connection rate limit exceeded");
                continue;
            }
            let conn_id = ConnId(self.next_conn_id.fetch_add(1, Ordering::Relaxed));
            let shared = self.shared.clone();
            tokio::spawn(async move {
                handle_connection(shared, conn_id, stream, peer).await;
            });
        }
    }

    fn admit(&self) -> bool {
        let mut rate = self.accept_rate.lock().unwrap();
        if rate.window_start.elapsed() >= Duration::from_secs(1) {
            rate.window_start = Instant::now();
            rate.count = 0;
        }
        if rate.count >= ACCEPTS_PER_SECOND {
            return false;
        }
        rate.count += 1;
        true
    }
}

/// Headers we pull out of the websocket handshake.
#[derive(Default)]
struct HandshakeInfo {
    refresh_token: Option<String>,
    forwarded_ip: Option<String>,
}

fn cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

async fn handle_connection(
    shared: Arc<ServerShared>,
    conn_id: ConnId,
    stream: TcpStream,
    peer: SocketAddr,
) {
    let info = Arc::new(Mutex::new(HandshakeInfo::default()));
    let callback_info = info.clone();
    let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        let mut info = callback_info.lock().unwrap();
        if let Some(cookies) = request
            .headers()
            .get("cookie")
            .and_then(|v| v.to_str().ok())
        {
            info.refresh_token = cookie_value(cookies, "refreshToken");
        }
        for header in ["x-real-ip", "x-forwarded-for"] {
            if info.forwarded_ip.is_none() {
                info.forwarded_ip = request
                    .headers()
                    .get(header)
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.to_string());
            }
        }
        Ok(response)
    };

    let ws_stream = match tokio_tungstenite::accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(error) => {
            debug!(%peer, %error, "websocket handshake failed");
            return;
        }
    };

    // Resolve the cookie into an identity; anonymous connections are fine.
    let (refresh_token, forwarded_ip) = {
        let info = info.lock().unwrap();
        (info.refresh_token.clone(), info.forwarded_ip.clone())
    };
    let mut profile = UserProfile {
        client_ip: forwarded_ip.unwrap_or_else(|| peer.ip().to_string()),
        ..Default::default()
    };
    if let Some(token) = refresh_token {
        match shared.identity.resolve(&token).await {
            Ok(identity) => {
                profile.role = identity.role;
                if !identity.discord.id.is_empty() {
                    profile.discord_id = Some(identity.discord.id);
                }
                profile.unlocked_skins = identity.skins.unlocked;
            }
            Err(error) => {
                // An expired token closes the door, matching the HTTP 403
                // the bootstrap path would have produced.
                debug!(%peer, %error, "refresh token rejected");
                return;
            }
        }
    }

    let (handle, mut outbound) = ClientHandle::channel();
    shared.registry.register(conn_id, profile, handle.clone());

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Writer task: drains the outbound queue one frame at a time.
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if ws_sender.send(Message::Binary(frame.to_vec())).await.is_err() {
                break;
            }
        }
    });

    handle.send(encode::server_version(SERVER_VERSION)).await;
    debug!(%peer, conn = conn_id.0, "connection established");

    while let Some(message) = ws_receiver.next().await {
        match message {
            Ok(Message::Binary(data)) => {
                handlers::handle_frame(&shared, conn_id, &data).await;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Text(_)) => {}
            Ok(Message::Close(_)) | Ok(Message::Frame(_)) => break,
            Err(error) => {
                debug!(%peer, %error, "read error");
                break;
            }
        }
    }

    writer.abort();
    disconnect(&shared, conn_id).await;
    debug!(%peer, conn = conn_id.0, "connection closed");
}

/// Tear down whatever this connection had in the world. Safe to call after a
/// kick or kill already removed the player.
pub async fn disconnect(shared: &Arc<ServerShared>, conn_id: ConnId) {
    if let Some(player_id) = shared.registry.player_id(conn_id) {
        if let Some(stats) = shared.world.remove_player(player_id) {
            shared
                .broadcaster
                .broadcast_all(encode::player_left(player_id))
                .await;
            shared.registry.remove_chat_state(player_id);
            report_stats(shared, conn_id, stats.score, stats.kills, stats.playtime).await;
        }
    }
    shared.registry.remove(conn_id);
}

/// Fire-and-forget stats report for Discord-linked accounts; merges any
/// newly unlocked skins back into the profile and releases the session lock.
pub async fn report_stats(
    shared: &Arc<ServerShared>,
    conn_id: ConnId,
    score: u32,
    kills: u32,
    playtime: Duration,
) {
    let Some(profile) = shared.registry.profile(conn_id) else {
        return;
    };
    let Some(discord_id) = profile.discord_id else {
        return;
    };
    let shared = shared.clone();
    tokio::spawn(async move {
        if let Some(new_skins) = shared
            .stats
            .report(&discord_id, score, kills, playtime.as_secs())
            .await
        {
            shared.registry.unlock_skins(conn_id, &new_skins);
        }
        shared.registry.remove_playing_discord(&discord_id);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_parsing() {
        assert_eq!(
            cookie_value("a=1; refreshToken=tok; b=2", "refreshToken"),
            Some("tok".to_string())
        );
        assert_eq!(cookie_value("a=1", "refreshToken"), None);
        assert_eq!(cookie_value("refreshToken=x", "refreshToken"), Some("x".to_string()));
    }

    #[test]
    fn accept_rate_limits_per_second() {
        let config = ServerConfig::default();
        let (bus, _dispatcher) = crate::game::events::EventBus::new();
        let world = World::from_layout(crate::game::map::generate_layout(), bus);
        let shared = ServerShared::new(world, SkinCatalog::default(), &config).unwrap();
        let server = GameServer::new(config, shared);
        for _ in 0..ACCEPTS_PER_SECOND {
            assert!(server.admit());
        }
        assert!(!server.admit());
    }
}
