//! Hexhold game server binary.

use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use hexhold::game::events::EventBus;
use hexhold::game::skins::SkinCatalog;
use hexhold::game::tick;
use hexhold::network::server::{GameServer, ServerConfig, ServerShared};
use hexhold::network::{http, worker};
use hexhold::{World, SERVER_VERSION};

fn config_from_env() -> ServerConfig {
    let mut config = ServerConfig::default();
    if let Ok(port) = std::env::var("PORT") {
        if let Ok(addr) = format!("0.0.0.0:{port}").parse() {
            config.bind_addr = addr;
        }
    }
    if let Ok(port) = std::env::var("ADMIN_PORT") {
        if let Ok(addr) = format!("127.0.0.1:{port}").parse() {
            config.admin_addr = addr;
        }
    }
    if let Ok(endpoint) = std::env::var("IDENTITY_ENDPOINT") {
        config.identity_endpoint = endpoint;
    }
    if let Ok(endpoint) = std::env::var("STATS_ENDPOINT") {
        config.stats_endpoint = endpoint;
    }
    if let Ok(path) = std::env::var("SKIN_CATALOG") {
        config.skin_catalog_path = path;
    }
    config
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("failed to set tracing subscriber");

    info!("Hexhold server, protocol v{SERVER_VERSION}");
    let config = config_from_env();

    let skins = match SkinCatalog::load(&config.skin_catalog_path) {
        Ok(catalog) => catalog,
        Err(error) => {
            warn!(%error, "skin catalogue unavailable, continuing without skins");
            SkinCatalog::default()
        }
    };

    // World + event plumbing: simulators feed the bus, the dispatcher fans
    // out to the network worker pool.
    let (bus, mut dispatcher) = EventBus::new();
    let network_events = dispatcher.subscribe();
    tokio::spawn(dispatcher.run());

    let world = World::new(bus);
    info!(
        anchors = world.neutral_bases.len(),
        bushes = world.bushes.len(),
        rocks = world.rocks.len(),
        "world generated"
    );

    let shared = match ServerShared::new(world.clone(), skins, &config) {
        Ok(shared) => shared,
        Err(error) => {
            error!(%error, "failed to build server state");
            return;
        }
    };

    worker::spawn_workers(shared.clone(), network_events);
    tick::spawn_loops(world);

    let admin_shared = shared.clone();
    let admin_addr = config.admin_addr;
    tokio::spawn(async move {
        if let Err(error) = http::serve(admin_shared, admin_addr).await {
            error!(%error, "admin endpoint server failed");
        }
    });

    let server = GameServer::new(config, shared);
    if let Err(error) = server.run().await {
        error!(%error, "game server failed");
    }
}
