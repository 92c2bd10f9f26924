//! Star novas: area damage, displacement, and chain reactions.

use ahash::AHashSet;
use rand::Rng;
use std::collections::VecDeque;
use tracing::info;

use crate::combat::{kill_base, kill_ship, Shooter};
use crate::comms::{notify_nearby, publish, Outbox};
use crate::random::ran;
use crate::registry::{self, Occupant};
use crate::scoring::ScoreCategory;
use crate::{romulan, ActorId, Event, GameContent, GameState, Position};

const NOVA_MIN_DAMAGE: f64 = 1000.0;
const NOVA_DAMAGE_SPREAD: f64 = 2000.0;
const NOVA_BASE_DIVISOR: f64 = 20.0;

/// Detonate the star at `origin` and every adjacent star it sets off.
pub fn trigger_nova(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
    shooter: Shooter,
    origin: Position,
) -> u32 {
    let mut pending = VecDeque::from([origin]);
    let mut seen: AHashSet<Position> = AHashSet::new();
    let mut detonated = 0;
    while let Some(star) = pending.pop_front() {
        if !seen.insert(star) || !state.stars.contains(&star) {
            continue;
        }
        state.stars.retain(|s| *s != star);
        detonated += 1;
        state
            .ledger
            .credit(shooter.actor, shooter.side, ScoreCategory::StarsDestroyed, 1);
        info!(%star, "nova");
        publish(
            state,
            out,
            Event::NovaTriggered {
                position: star,
                by: shooter.actor,
            },
        );
        notify_nearby(
            state,
            out,
            star,
            content.constants.phaser_range,
            None,
            &format!("Star at {star} has gone nova!"),
        );
        blast_ships(state, content, rng, out, shooter, star);
        blast_bases(state, rng, out, shooter, star);
        pending.extend(
            state
                .stars
                .iter()
                .filter(|s| s.is_adjacent(star))
                .copied(),
        );
    }
    detonated
}

fn blast_ships(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
    shooter: Shooter,
    star: Position,
) {
    let victims: Vec<ActorId> = state
        .actors
        .values()
        .filter(|a| a.active_ship().is_some_and(|s| s.position.is_adjacent(star)))
        .map(|a| a.id)
        .collect();
    for victim in victims {
        let amount = NOVA_MIN_DAMAGE + NOVA_DAMAGE_SPREAD * ran(rng);
        if state.actors.get(&victim).is_some_and(crate::Actor::is_romulan) {
            romulan::absorb_hit(state, content, out, shooter, victim, amount);
            continue;
        }
        registry::break_tractor(state, victim);
        let Some(ship) = registry::ship_mut(state, victim) else {
            continue;
        };
        ship.energy = (ship.energy - amount).max(0.0);
        ship.damage += amount / 2.0;
        let from = ship.position;
        let away = from.offset((from.v - star.v).signum(), (from.h - star.h).signum());
        let mut swallowed = false;
        if content.in_bounds(away) {
            match registry::object_at(state, away) {
                Occupant::Empty => {
                    if let Some(ship) = registry::ship_mut(state, victim) {
                        ship.position = away;
                    }
                    publish(
                        state,
                        out,
                        Event::ObjectDisplaced {
                            actor: victim,
                            from,
                            to: away,
                        },
                    );
                }
                Occupant::Blackhole => swallowed = true,
                _ => {}
            }
        }
        let dead = swallowed
            || registry::ship(state, victim).is_some_and(|s| s.is_destroyed(&content.constants));
        if dead {
            kill_ship(state, out, shooter, victim);
        }
    }
}

fn blast_bases(
    state: &mut GameState,
    rng: &mut impl Rng,
    out: &mut Outbox,
    shooter: Shooter,
    star: Position,
) {
    let bases: Vec<_> = state
        .planets
        .iter()
        .filter(|p| p.is_base && p.position.is_adjacent(star))
        .map(|p| p.id)
        .collect();
    for id in bases {
        let loss = (NOVA_MIN_DAMAGE + NOVA_DAMAGE_SPREAD * ran(rng)) / NOVA_BASE_DIVISOR;
        let mut remaining = 0.0;
        if let Some(planet) = registry::planet_mut(state, id) {
            planet.energy = (planet.energy - loss).max(0.0);
            remaining = planet.energy;
        }
        publish(
            state,
            out,
            Event::PlanetHit {
                planet: id,
                hull: loss,
                energy: remaining,
            },
        );
        if remaining <= 0.0 {
            kill_base(state, out, shooter, id);
        }
    }
}
