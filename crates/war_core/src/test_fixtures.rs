//! Shared test fixtures for war_core and downstream crates.
//!
//! `base_content()` mirrors the shipped tunables on an empty 75×75 grid with
//! short delays. `base_state()` is that grid with no actors, planets or stars;
//! tests place exactly what they need with the `add_*` helpers.

use rand::{Error, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, VecDeque};

use crate::scoring::ScoreLedger;
use crate::{
    Actor, ActorId, ActorKind, BotRole, BotState, Constants, Counters, GalaxyDef, GameContent,
    GameState, MetaState, Planet, PlanetId, Position, RomulanState, Ship, Side, SideBases,
    WorldClock,
};

pub fn base_constants() -> Constants {
    Constants {
        grid_width: 75,
        grid_height: 75,
        max_ship_energy: 5000.0,
        max_shield_energy: 2500.0,
        max_torpedoes: 10,
        max_base_energy: 1000.0,
        max_builds_per_planet: 5,
        max_bases_per_side: 10,
        ship_fatal_damage: 2500.0,
        device_damaged_threshold: 100.0,
        device_inoperative_damage: 300.0,
        life_support_reserve: 5,

        phaser_range: 10,
        phaser_min_power: 50.0,
        phaser_max_power: 500.0,
        phaser_default_power: 200.0,
        phaser_shield_surcharge: 200.0,
        phaser_power_divisor: 10.0,
        phaser_cooldown_ms: 1000,
        phaser_overheat_power: 400.0,
        critical_hit_threshold: 1700.0,
        torpedo_range: 10,
        max_torpedoes_per_volley: 3,
        nova_chance: 0.8,

        base_defense_radius: 4,
        base_defense_budget: 200.0,
        planet_defense_range: 2,
        planet_defense_power: 50.0,
        planet_defense_power_per_build: 30.0,
        base_regen_budget: 50.0,

        max_warp: 6,
        warp_delay_min_ms: 100,
        warp_delay_range_ms: 100,
        impulse_delay_ms: 50,
        dock_delay_min_ms: 100,
        dock_delay_range_ms: 100,
        build_delay_min_ms: 100,
        build_delay_range_ms: 100,
        capture_delay_min_ms: 100,
        capture_lock_timeout_ms: 30_000,
        repair_ms_per_unit: 80,
        shield_raise_cost: 100.0,

        idle_window_ticks: 3,

        romulan_energy: 5000.0,
        romulan_detection_range: 20,
        romulan_max_step: 4,
        romulan_phaser_power: 200.0,
        romulan_attack_chance: 0.5,
        romulan_reveal_sweeps: 5,

        bot_engage_range: 20,
        bot_close_range: 3,
        bot_max_step: 5,
        bot_fire_bias: 0.7,
        bot_phaser_cooldown_ms: 750,
        bot_torpedo_cooldown_ms: 1000,
    }
}

pub fn base_content() -> GameContent {
    let names = |list: &[&str]| list.iter().map(|s| (*s).to_string()).collect();
    GameContent {
        content_version: "test".to_string(),
        federation_ships: names(&["EXCALIBUR", "FARRAGUT", "INTREPID", "LEXINGTON"]),
        empire_ships: names(&["BUZZARD", "COBRA", "DEMON", "GOBLIN"]),
        galaxy: GalaxyDef {
            planet_count: 20,
            planet_min_spacing: 2,
            initial_bases_per_side: 3,
            star_count: (10, 15),
            blackhole_count: (2, 4),
        },
        constants: base_constants(),
    }
}

/// Empty galaxy: no actors, planets, stars or blackholes.
pub fn base_state(content: &GameContent) -> GameState {
    GameState {
        meta: MetaState {
            seed: 0,
            game_id: uuid::Uuid::nil(),
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
    }
}

pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}

fn add_actor(state: &mut GameState, name: &str, kind: ActorKind) -> ActorId {
    let id = ActorId(state.counters.next_actor_id);
    state.counters.next_actor_id += 1;
    state.actors.insert(id, Actor::new(id, name, kind));
    id
}

/// Human actor commanding a fresh ship at `position`.
pub fn add_ship(
    state: &mut GameState,
    content: &GameContent,
    name: &str,
    side: Side,
    position: Position,
) -> ActorId {
    let id = add_actor(state, name, ActorKind::Human);
    if let Some(actor) = state.actors.get_mut(&id) {
        actor.ship = Some(Ship::new(name, side, position, &content.constants));
    }
    id
}

pub fn add_bot(
    state: &mut GameState,
    content: &GameContent,
    name: &str,
    side: Side,
    position: Position,
    role: BotRole,
) -> ActorId {
    let kind = ActorKind::Bot(BotState {
        role,
        next_phaser_ms: 0,
        next_torpedo_ms: 0,
    });
    let id = add_actor(state, name, kind);
    if let Some(actor) = state.actors.get_mut(&id) {
        actor.ship = Some(Ship::new(name, side, position, &content.constants));
    }
    id
}

pub fn add_planet(state: &mut GameState, position: Position, side: Side, builds: u32) -> PlanetId {
    let id = PlanetId(u32::try_from(state.planets.len()).unwrap_or(u32::MAX));
    let mut planet = Planet::new(id, position, side);
    planet.builds = builds;
    state.planets.push(planet);
    id
}

/// Fully built base at full energy, registered in its side's base list.
pub fn add_base(
    state: &mut GameState,
    content: &GameContent,
    position: Position,
    side: Side,
) -> PlanetId {
    let id = add_planet(state, position, side, content.constants.max_builds_per_planet);
    if let Some(planet) = state.planets.iter_mut().find(|p| p.id == id) {
        planet.is_base = true;
        planet.energy = content.constants.max_base_energy;
    }
    if let Some(list) = state.bases.list_mut(side) {
        list.push(id);
    }
    id
}

pub fn ship(state: &GameState, actor: ActorId) -> &Ship {
    state.actors[&actor].ship.as_ref().unwrap()
}

pub fn ship_mut(state: &mut GameState, actor: ActorId) -> &mut Ship {
    state.actors.get_mut(&actor).unwrap().ship.as_mut().unwrap()
}

/// Rng that replays a fixed list of `ran()` values, then repeats `fallback`.
///
/// Values must lie in `[0, 1)`. Each entry is consumed by exactly one
/// `random::ran` call, so tests can pin down every branch of a combat roll.
#[derive(Debug, Clone)]
pub struct ScriptedRng {
    values: VecDeque<f64>,
    fallback: f64,
}

impl ScriptedRng {
    pub fn new(values: &[f64]) -> Self {
        Self {
            values: values.iter().copied().collect(),
            fallback: 0.5,
        }
    }

    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

impl RngCore for ScriptedRng {
    fn next_u32(&mut self) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        let high = (self.next_u64() >> 32) as u32;
        high
    }

    // `gen::<f64>()` keeps the top 53 bits and scales by 2^-53.
    fn next_u64(&mut self) -> u64 {
        let value = self.values.pop_front().unwrap_or(self.fallback);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let mantissa = (value.clamp(0.0, 1.0 - f64::EPSILON) * (1u64 << 53) as f64) as u64;
        mantissa << 11
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
