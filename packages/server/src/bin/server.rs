//! Dengon chat relay server.
//!
//! Run with:
//! ```not_rust
//! JWT_SECRET=... cargo run --bin dengon-server
//! JWT_SECRET=... cargo run --bin dengon-server -- --host 0.0.0.0 --port 3000 --seed-file rooms.json
//! JWT_SECRET=... DENGON_BROKER_URL=postgres://dengon@localhost/dengon cargo run --bin dengon-server
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use dengon_server::{
    config::RelayConfig,
    domain::Broker,
    infrastructure::{
        auth::JwtTokenVerifier,
        broker::{InMemoryBroker, PostgresBroker},
        dto::JsonFrameEncoder,
        notifier::BrokerNotificationPublisher,
        registry::InMemoryConnectionRegistry,
        repository::{InMemoryMembershipOracle, InMemoryMessageStore, SeedData},
    },
    ui::{AppState, Server},
    usecase::{
        AuthorizeConnectionUseCase, ConnectSessionUseCase, DisconnectSessionUseCase,
        ForwardNotificationsUseCase, InspectRegistryUseCase, ResubscribePolicy,
        SendMessageUseCase,
    },
};
use dengon_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "dengon-server")]
#[command(about = "Real-time chat relay with per-user notifications", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "DENGON_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "DENGON_PORT", default_value = "8080")]
    port: u16,

    /// HS256 secret used to verify access tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    /// JSON file with rooms and their members
    #[arg(long, env = "DENGON_SEED_FILE")]
    seed_file: Option<PathBuf>,

    /// PostgreSQL URL of the LISTEN/NOTIFY broker shared by every relay process.
    /// Without it notifications stay inside this process.
    #[arg(long, env = "DENGON_BROKER_URL", hide_env_values = true)]
    broker_url: Option<String>,

    /// Frames a socket may have queued before it is dropped as a slow consumer
    #[arg(long, env = "DENGON_OUTBOUND_BUFFER", default_value = "64")]
    outbound_buffer: usize,

    /// Upper bound on one socket write, in milliseconds
    #[arg(long, env = "DENGON_WRITE_TIMEOUT_MS", default_value = "5000")]
    write_timeout_ms: u64,

    /// Consecutive broker resubscribe attempts before a notification socket is closed
    #[arg(long, env = "DENGON_RESUBSCRIBE_ATTEMPTS", default_value = "5")]
    resubscribe_attempts: u32,

    /// Base delay between broker resubscribe attempts, in milliseconds
    #[arg(long, env = "DENGON_RESUBSCRIBE_INTERVAL_MS", default_value = "500")]
    resubscribe_interval_ms: u64,
}

impl Args {
    fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            outbound_buffer: self.outbound_buffer,
            write_timeout: Duration::from_millis(self.write_timeout_ms),
            resubscribe: ResubscribePolicy {
                max_attempts: self.resubscribe_attempts,
                interval: Duration::from_millis(self.resubscribe_interval_ms),
            },
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();
    let config = args.relay_config();

    // Initialize dependencies in order:
    // 1. External collaborators (token verifier, membership, message store, broker)
    // 2. Connection registry
    // 3. UseCases
    // 4. Server

    // 1. External collaborators
    let verifier = Arc::new(JwtTokenVerifier::new(args.jwt_secret.as_bytes()));
    let oracle = Arc::new(InMemoryMembershipOracle::new());
    if let Some(path) = &args.seed_file {
        let loaded = match SeedData::from_path(path) {
            Ok(seed) => seed.apply(&oracle).await,
            Err(e) => Err(e),
        };
        match loaded {
            Ok(rooms) => tracing::info!(rooms, path = %path.display(), "seed data loaded"),
            Err(e) => {
                tracing::error!("Failed to load seed data: {}", e);
                std::process::exit(1);
            }
        }
    }
    let store = Arc::new(InMemoryMessageStore::new());
    let broker: Arc<dyn Broker> = match &args.broker_url {
        Some(url) => match PostgresBroker::connect(url).await {
            Ok(broker) => Arc::new(broker),
            Err(e) => {
                tracing::error!("Failed to connect to the broker: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            tracing::info!("no broker url given, notifications stay in this process");
            Arc::new(InMemoryBroker::new())
        }
    };
    let publisher = Arc::new(BrokerNotificationPublisher::new(broker.clone()));

    // 2. Connection registry
    let registry = Arc::new(InMemoryConnectionRegistry::new());

    // 3. UseCases
    let state = AppState {
        authorize_connection_usecase: Arc::new(AuthorizeConnectionUseCase::new(
            verifier,
            oracle.clone(),
        )),
        connect_session_usecase: Arc::new(ConnectSessionUseCase::new(registry.clone())),
        disconnect_session_usecase: Arc::new(DisconnectSessionUseCase::new(registry.clone())),
        send_message_usecase: Arc::new(SendMessageUseCase::new(
            store,
            oracle,
            registry.clone(),
            publisher,
            Arc::new(JsonFrameEncoder),
            Arc::new(SystemClock),
        )),
        forward_notifications_usecase: Arc::new(ForwardNotificationsUseCase::new(
            broker,
            config.resubscribe,
        )),
        inspect_registry_usecase: Arc::new(InspectRegistryUseCase::new(registry)),
        config,
    };

    // 4. Create and run the server
    let server = Server::new(state);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
