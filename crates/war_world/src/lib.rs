//! Galaxy generation and content loading shared between war_cli and war_daemon.

use anyhow::{Context, Result};
use rand::Rng;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{info, warn};
use war_core::random::{between, iran};
use war_core::scoring::ScoreLedger;
use war_core::{
    generate_game_id, registry, Constants, Counters, GalaxyDef, GameContent, GameState, MetaState,
    Outbox, Planet, PlanetId, Position, RomulanState, Side, SideBases, WorldClock,
};

const PLACEMENT_ATTEMPTS: u32 = 500;
const FILLER_ATTEMPTS: u32 = 1000;

#[derive(Deserialize)]
struct ShipsFile {
    content_version: String,
    federation_ships: Vec<String>,
    empire_ships: Vec<String>,
}

/// Validates loaded content, panicking on any authoring error.
///
/// Catches mistakes like: a roster shared between sides, delays that would make
/// a command instantaneous, or a galaxy too crowded for the grid.
pub fn validate_content(content: &GameContent) {
    let c = &content.constants;
    assert!(
        c.grid_width > 0 && c.grid_height > 0,
        "grid must be non-empty, got {}x{}",
        c.grid_height,
        c.grid_width,
    );
    assert!(
        c.max_ship_energy > 0.0 && c.max_shield_energy > 0.0 && c.max_base_energy > 0.0,
        "energy caps must be positive",
    );
    assert!(
        c.phaser_min_power <= c.phaser_default_power && c.phaser_default_power <= c.phaser_max_power,
        "phaser default power {} is outside [{}, {}]",
        c.phaser_default_power,
        c.phaser_min_power,
        c.phaser_max_power,
    );
    assert!(
        c.max_builds_per_planet > 0,
        "max_builds_per_planet must be positive"
    );
    assert!(c.idle_window_ticks > 0, "idle_window_ticks must be positive");
    for (name, delay) in [
        ("warp_delay_min_ms", c.warp_delay_min_ms),
        ("impulse_delay_ms", c.impulse_delay_ms),
        ("dock_delay_min_ms", c.dock_delay_min_ms),
        ("build_delay_min_ms", c.build_delay_min_ms),
        ("capture_delay_min_ms", c.capture_delay_min_ms),
        ("repair_ms_per_unit", c.repair_ms_per_unit),
    ] {
        assert!(delay > 0, "{name} must be positive");
    }
    for (name, p) in [
        ("nova_chance", c.nova_chance),
        ("romulan_attack_chance", c.romulan_attack_chance),
        ("bot_fire_bias", c.bot_fire_bias),
    ] {
        assert!((0.0..=1.0).contains(&p), "{name} {p} is not a probability");
    }

    let mut seen = HashSet::new();
    for name in content.federation_ships.iter().chain(&content.empire_ships) {
        assert!(!name.is_empty(), "ship roster contains an empty name");
        assert!(
            seen.insert(name.to_ascii_uppercase()),
            "ship name '{name}' appears more than once",
        );
    }

    validate_galaxy(&content.galaxy, c);
}

fn validate_galaxy(galaxy: &GalaxyDef, c: &Constants) {
    for (name, (low, high)) in [
        ("star_count", galaxy.star_count),
        ("blackhole_count", galaxy.blackhole_count),
    ] {
        assert!(low <= high, "{name} range ({low}, {high}) is inverted");
    }
    assert!(
        galaxy.initial_bases_per_side as usize <= c.max_bases_per_side,
        "initial_bases_per_side {} exceeds max_bases_per_side {}",
        galaxy.initial_bases_per_side,
        c.max_bases_per_side,
    );
    assert!(
        galaxy.initial_bases_per_side * 2 <= galaxy.planet_count,
        "{} planets cannot host {} bases per side",
        galaxy.planet_count,
        galaxy.initial_bases_per_side,
    );
    let cells = i64::from(c.grid_width) * i64::from(c.grid_height);
    let objects =
        i64::from(galaxy.planet_count) + i64::from(galaxy.star_count.1) + i64::from(galaxy.blackhole_count.1);
    assert!(
        objects * 2 <= cells,
        "galaxy of {objects} objects leaves no room on a {cells}-sector grid",
    );
}

fn read_json<T: serde::de::DeserializeOwned>(dir: &Path, file: &str) -> Result<T> {
    let path = dir.join(file);
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {file}"))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {file}"))
}

pub fn load_content(content_dir: &str) -> Result<GameContent> {
    let dir = Path::new(content_dir);
    let constants: Constants = read_json(dir, "constants.json")?;
    let ships: ShipsFile = read_json(dir, "ships.json")?;
    let galaxy: GalaxyDef = read_json(dir, "galaxy.json")?;
    let content = GameContent {
        content_version: ships.content_version,
        federation_ships: ships.federation_ships,
        empire_ships: ships.empire_ships,
        galaxy,
        constants,
    };
    validate_content(&content);
    Ok(content)
}

/// A fresh game: neutral planets, starting bases for both sides, blackholes, then stars.
///
/// Everything is drawn from `rng`, so the same seed always yields the same galaxy.
pub fn build_initial_state(content: &GameContent, seed: u64, rng: &mut impl Rng) -> GameState {
    let game_id = generate_game_id(rng);
    let mut state = GameState {
        meta: MetaState {
            seed,
            game_id,
            content_version: content.content_version.clone(),
            now_ms: 0,
            bot_target: 0,
        },
        actors: BTreeMap::new(),
        planets: Vec::new(),
        stars: Vec::new(),
        blackholes: Vec::new(),
        bases: SideBases::default(),
        ledger: ScoreLedger::default(),
        romulan: RomulanState::default(),
        clock: WorldClock::default(),
        counters: Counters::default(),
    };

    place_planets(&mut state, content, rng);
    for side in [Side::Federation, Side::Empire] {
        place_bases(&mut state, content, rng, side);
    }

    let galaxy = &content.galaxy;
    let blackholes = count_in(rng, galaxy.blackhole_count);
    state.blackholes = scatter(&state, content, rng, blackholes);
    let stars = count_in(rng, galaxy.star_count);
    state.stars = scatter(&state, content, rng, stars);

    info!(
        %game_id,
        seed,
        planets = state.planets.len(),
        stars = state.stars.len(),
        blackholes = state.blackholes.len(),
        "galaxy generated"
    );
    state
}

fn count_in(rng: &mut impl Rng, (low, high): (u32, u32)) -> u32 {
    low + iran(rng, high - low + 1)
}

fn random_cell(content: &GameContent, rng: &mut impl Rng) -> Position {
    let c = &content.constants;
    Position::new(between(rng, 1, c.grid_height), between(rng, 1, c.grid_width))
}

/// Planets keep `planet_min_spacing` from each other; a planet that cannot be placed is skipped.
fn place_planets(state: &mut GameState, content: &GameContent, rng: &mut impl Rng) {
    let spacing = content.galaxy.planet_min_spacing;
    for index in 0..content.galaxy.planet_count {
        let spot = (0..PLACEMENT_ATTEMPTS)
            .map(|_| random_cell(content, rng))
            .find(|cell| state.planets.iter().all(|p| p.position.distance(*cell) >= spacing));
        let Some(position) = spot else {
            warn!(planet = index + 1, "could not place planet");
            continue;
        };
        let id = PlanetId(u32::try_from(state.planets.len()).unwrap_or(u32::MAX));
        state.planets.push(Planet::new(id, position, Side::Neutral));
    }
}

/// Hand a random selection of the remaining neutral planets to `side` as bases.
fn place_bases(state: &mut GameState, content: &GameContent, rng: &mut impl Rng, side: Side) {
    let mut eligible: Vec<PlanetId> = state
        .planets
        .iter()
        .filter(|p| !p.is_base && p.side == Side::Neutral)
        .map(|p| p.id)
        .collect();
    for i in (1..eligible.len()).rev() {
        let j = iran(rng, u32::try_from(i + 1).unwrap_or(u32::MAX)) as usize;
        eligible.swap(i, j);
    }

    let mut setup = Outbox::new();
    let wanted = content.galaxy.initial_bases_per_side as usize;
    for id in eligible.into_iter().take(wanted) {
        if let Some(planet) = registry::planet_mut(state, id) {
            planet.side = side;
        }
        registry::promote_to_base(state, content, &mut setup, id);
    }
}

/// Up to `count` objects on free sectors; gives up after a bounded number of attempts.
fn scatter(
    state: &GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    count: u32,
) -> Vec<Position> {
    let mut taken = registry::occupied_cells(state);
    let mut placed = Vec::new();
    let mut attempts = 0;
    while placed.len() < count as usize && attempts < FILLER_ATTEMPTS {
        let cell = random_cell(content, rng);
        if taken.insert(cell) {
            placed.push(cell);
        }
        attempts += 1;
    }
    placed
}
