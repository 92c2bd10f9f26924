use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use war_core::headless::SimClock;
use war_core::{Event, GameState, ScoreCategory, Side};
use war_world::{build_initial_state, load_content};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "war_cli", about = "Headless space-combat runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a bot-only game on a simulated clock.
    Run {
        /// Simulated seconds to play.
        #[arg(long, default_value_t = 600)]
        seconds: u64,
        /// Generate the galaxy with this seed. Mutually exclusive with --state.
        #[arg(long, conflicts_with = "state_file")]
        seed: Option<u64>,
        /// Resume from a GameState JSON file. Mutually exclusive with --seed.
        #[arg(long = "state", conflicts_with = "seed")]
        state_file: Option<String>,
        #[arg(long, default_value = "./content")]
        content_dir: String,
        #[arg(long, default_value_t = 6)]
        bots: u32,
        /// Print a status line every N sweeps.
        #[arg(long, default_value_t = 10)]
        print_every: u64,
        /// Write the final GameState as JSON.
        #[arg(long)]
        save: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

struct RunArgs {
    seconds: u64,
    seed: Option<u64>,
    state_file: Option<String>,
    content_dir: String,
    bots: u32,
    print_every: u64,
    save: Option<String>,
}

fn run(args: RunArgs) -> Result<()> {
    let content = load_content(&args.content_dir)?;

    let (mut state, mut rng) = if let Some(path) = &args.state_file {
        let json =
            std::fs::read_to_string(path).with_context(|| format!("reading state file: {path}"))?;
        let loaded: GameState =
            serde_json::from_str(&json).with_context(|| format!("parsing state file: {path}"))?;
        let rng_seed = loaded.meta.seed ^ loaded.meta.now_ms;
        (loaded, ChaCha8Rng::seed_from_u64(rng_seed))
    } else {
        let resolved_seed = args.seed.unwrap_or_else(rand::random);
        let mut new_rng = ChaCha8Rng::seed_from_u64(resolved_seed);
        let new_state = build_initial_state(&content, resolved_seed, &mut new_rng);
        (new_state, new_rng)
    };
    state.meta.bot_target = args.bots;

    println!(
        "Starting game: seed={} game_id={} planets={} stars={} bots={} content_version={}",
        state.meta.seed,
        state.meta.game_id,
        state.planets.len(),
        state.stars.len(),
        args.bots,
        content.content_version,
    );
    println!("{}", "-".repeat(80));

    let until_ms = state.meta.now_ms + args.seconds * 1000;
    let mut clock = SimClock::new(state.meta.now_ms);
    let print_every = args.print_every.max(1);
    clock.run_until(&mut state, &content, &mut rng, until_ms, |state, out| {
        for envelope in &out.events {
            if let Some(line) = headline(state, &envelope.event) {
                println!("[sd={:05}] *** {line} ***", envelope.tick);
            }
            if let Event::SweepCompleted { sweep, .. } = envelope.event {
                if sweep % print_every == 0 {
                    print_status(state);
                }
            }
        }
    });

    println!("{}", "-".repeat(80));
    println!("Done after {} simulated seconds:", args.seconds);
    print_status(&state);
    print_scoreboard(&state);

    if let Some(path) = &args.save {
        let json = serde_json::to_string_pretty(&state).context("serializing final state")?;
        std::fs::write(path, json).with_context(|| format!("writing {path}"))?;
        println!("Final state written to {path}");
    }
    Ok(())
}

fn ship_name(state: &GameState, actor: war_core::ActorId) -> String {
    state
        .actors
        .get(&actor)
        .map_or_else(|| actor.to_string(), |a| a.name.clone())
}

/// Events worth a line of their own.
fn headline(state: &GameState, event: &Event) -> Option<String> {
    match event {
        Event::ShipDestroyed { ship, by, .. } => Some(match by {
            Some(killer) => format!("{ship} destroyed by {}", ship_name(state, *killer)),
            None => format!("{ship} destroyed"),
        }),
        Event::BaseDestroyed { planet, side } => Some(format!("{side} base {planet} destroyed")),
        Event::BaseCreated { planet, side } => Some(format!("{side} base established at {planet}")),
        Event::PlanetCaptured { planet, side, .. } => Some(format!("{planet} captured by {side}")),
        Event::RomulanSpawned { position, .. } => Some(format!("Romulan sighted near {position}")),
        Event::RomulanKnockedOut { .. } => Some("Romulan knocked out".to_string()),
        _ => None,
    }
}

fn print_status(state: &GameState) {
    let fed = war_core::registry::ships_on_side(state, Side::Federation);
    let emp = war_core::registry::ships_on_side(state, Side::Empire);
    println!(
        "[sd={:05}  sweeps={:4}  t={:6}s]  ships F/E={fed}/{emp}  bases F/E={}/{}  score F/E={}/{}",
        state.clock.stardate,
        state.clock.sweeps,
        state.meta.now_ms / 1000,
        state.bases.list(Side::Federation).len(),
        state.bases.list(Side::Empire).len(),
        state.ledger.side(Side::Federation).total(),
        state.ledger.side(Side::Empire).total(),
    );
}

fn print_scoreboard(state: &GameState) {
    let fed = state.ledger.side(Side::Federation);
    let emp = state.ledger.side(Side::Empire);
    println!("{:<22}{:>14}{:>14}", "", "Federation", "Empire");
    for category in ScoreCategory::ALL {
        println!(
            "{:<22}{:>14}{:>14}",
            category.label(),
            fed.get(category),
            emp.get(category)
        );
    }
    println!("{:<22}{:>14}{:>14}", "Total", fed.total(), emp.total());
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            seconds,
            seed,
            state_file,
            content_dir,
            bots,
            print_every,
            save,
        } => run(RunArgs {
            seconds,
            seed,
            state_file,
            content_dir,
            bots,
            print_every,
            save,
        })?,
    }
    Ok(())
}
