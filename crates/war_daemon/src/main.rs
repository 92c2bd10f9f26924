mod delivery;
mod routes;
mod session;
mod state;
mod tick_loop;

use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use state::{AppState, SimState};
use tracing::info;
use war_world::{build_initial_state, load_content};

#[derive(Parser)]
#[command(name = "war_daemon", about = "Multiplayer space-combat game server")]
struct Cli {
    #[arg(long, default_value = "./content")]
    content_dir: String,
    /// Fixed seed for a reproducible galaxy and dice. Random when absent.
    #[arg(long)]
    seed: Option<u64>,
    /// Line-protocol port for captains.
    #[arg(long, default_value_t = 2323)]
    port: u16,
    /// HTTP port for telemetry and snapshots.
    #[arg(long, default_value_t = 3001)]
    http_port: u16,
    /// Computer-piloted ships kept in play.
    #[arg(long, default_value_t = 0)]
    bots: u32,
    #[arg(long, default_value = "http://localhost:5173")]
    cors_origin: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let content = load_content(&cli.content_dir)?;
    let seed = cli.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut game_state = build_initial_state(&content, seed, &mut rng);
    game_state.meta.bot_target = cli.bots;
    info!(
        seed,
        game_id = %game_state.meta.game_id,
        content_version = %content.content_version,
        bots = cli.bots,
        "game created"
    );

    let app = AppState::new(SimState::new(game_state, content, rng));

    tokio::spawn(tick_loop::run_idle_loop(app.clone()));
    tokio::spawn(tick_loop::run_nudge_loop(app.clone()));

    let tcp = tokio::net::TcpListener::bind(("0.0.0.0", cli.port))
        .await
        .with_context(|| format!("binding game port {}", cli.port))?;
    info!(port = cli.port, "accepting captains");
    let game_server = tokio::spawn(session::serve_tcp(tcp, app.clone()));

    let router = routes::make_router_with_cors(app, &cli.cors_origin);
    let http = tokio::net::TcpListener::bind(("0.0.0.0", cli.http_port))
        .await
        .with_context(|| format!("binding http port {}", cli.http_port))?;
    info!(port = cli.http_port, "telemetry listening");

    tokio::select! {
        served = axum::serve(http, router) => served.context("http server")?,
        joined = game_server => joined.context("game server task")??,
    }
    Ok(())
}
