//! Periodic installation behavior: base defense fire, planetary defense fire,
//! and base energy regeneration. Each runs once per sweep.

use rand::Rng;
use smallvec::SmallVec;
use tracing::debug;

use crate::combat::{self, phaser_hit, Shooter, Target};
use crate::comms::{publish, Outbox};
use crate::random::ran;
use crate::registry;
use crate::{ActorId, Event, GameContent, GameState, PlanetId, Position, Side};

const NEUTRAL_FIRE_CHANCE: f64 = 0.5;

/// Sides whose installations act this sweep, given the actor that closed it.
///
/// Installations of the trigger's opponent act. With no trigger, or with the
/// Romulan as trigger, both playable sides act.
pub fn responding_sides(state: &GameState, trigger: Option<ActorId>) -> SmallVec<[Side; 2]> {
    let trigger_side = trigger
        .and_then(|a| state.actors.get(&a))
        .and_then(|a| a.ship.as_ref())
        .map(|s| s.side);
    match trigger_side.and_then(Side::opponent) {
        Some(side) => SmallVec::from_slice(&[side]),
        None => SmallVec::from_slice(&[Side::Federation, Side::Empire]),
    }
}

/// Ships an installation can see: in play, alive, and not cloaked.
fn visible_ships(state: &GameState) -> Vec<(ActorId, Side, Position)> {
    state
        .actors
        .values()
        .filter_map(|a| {
            a.active_ship()
                .filter(|s| !s.cloaked && s.energy > 0.0)
                .map(|s| (a.id, s.side, s.position))
        })
        .collect()
}

/// Every operational base of each responding side fires once at each hostile ship in range.
pub fn base_defense_fire(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
    trigger: Option<ActorId>,
) {
    let active = registry::sweep_population(state).max(1);
    let phit = (content.constants.base_defense_budget / f64::from(active))
        .floor()
        .max(1.0);
    let radius = content.constants.base_defense_radius;
    for side in responding_sides(state, trigger) {
        let bases: Vec<(PlanetId, Position)> = state
            .bases
            .list(side)
            .iter()
            .filter_map(|id| registry::planet(state, *id))
            .filter(|p| p.energy > 0.0)
            .map(|p| (p.id, p.position))
            .collect();
        for (base_id, base_pos) in bases {
            for (victim, victim_side, victim_pos) in visible_ships(state) {
                if !side.is_hostile_to(victim_side) || victim_pos.distance(base_pos) > radius {
                    continue;
                }
                let base_alive = registry::planet(state, base_id).is_some_and(|p| p.is_base);
                let victim_alive = registry::ship(state, victim).is_some();
                if !base_alive || !victim_alive {
                    continue;
                }
                debug!(base = %base_id, %victim, phit, "base defense fire");
                let shooter = Shooter::installation(side, base_pos);
                publish_fire(state, out, base_pos, victim_pos, phit);
                let report = phaser_hit(state, content, rng, out, shooter, Target::Ship(victim), phit);
                combat::report_to_victim(state, out, &format!("{side} base"), "phasers", &report);
            }
        }
    }
}

/// Claimed and neutral planets defend themselves against hostile ships nearby.
pub fn planet_defense_fire(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
) {
    let c = &content.constants;
    let planets: Vec<(Side, u32, Position)> = state
        .planets
        .iter()
        .filter(|p| !p.is_base)
        .map(|p| (p.side, p.builds, p.position))
        .collect();
    for (side, builds, position) in planets {
        let power = c.planet_defense_power + c.planet_defense_power_per_build * f64::from(builds);
        let phit = (power / c.phaser_power_divisor).floor().max(1.0);
        for (victim, victim_side, victim_pos) in visible_ships(state) {
            if victim_side == side || victim_pos.distance(position) > c.planet_defense_range {
                continue;
            }
            if side == Side::Neutral && ran(rng) >= NEUTRAL_FIRE_CHANCE {
                continue;
            }
            if registry::ship(state, victim).is_none() {
                continue;
            }
            let shooter = Shooter::installation(side, position);
            publish_fire(state, out, position, victim_pos, power);
            let report = phaser_hit(state, content, rng, out, shooter, Target::Ship(victim), phit);
            combat::report_to_victim(state, out, &format!("Planet at {position}"), "phasers", &report);
        }
    }
}

fn publish_fire(state: &mut GameState, out: &mut Outbox, from: Position, to: Position, power: f64) {
    publish(
        state,
        out,
        Event::PhaserFired {
            shooter: None,
            from,
            to,
            power,
        },
    );
}

/// Restore base energy for each responding side, scaled down by that side's fleet size.
pub fn regenerate_bases(state: &mut GameState, content: &GameContent, trigger: Option<ActorId>) {
    let cap = content.constants.max_base_energy;
    for side in responding_sides(state, trigger) {
        let amount = regen_amount(state, content, side);
        let ids: Vec<PlanetId> = state.bases.list(side).to_vec();
        for id in ids {
            if let Some(planet) = registry::planet_mut(state, id) {
                if planet.energy > 0.0 {
                    planet.energy = (planet.energy + amount).min(cap);
                }
            }
        }
    }
}

/// Whole units added per sweep: the regen budget shared by the side's ships plus one.
pub fn regen_amount(state: &GameState, content: &GameContent, side: Side) -> f64 {
    let ships = registry::ships_on_side(state, side);
    (content.constants.base_regen_budget / f64::from(ships + 1))
        .floor()
        .max(1.0)
}
