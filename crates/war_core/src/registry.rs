//! Entity registry queries and the few mutations that must keep several
//! collections consistent (base lists, docking, tractor pairs, removal).

use ahash::AHashSet;
use rand::Rng;
use tracing::info;

use crate::comms::{notify, publish, Outbox};
use crate::random::between;
use crate::{
    Actor, ActorId, ActorKind, CommandError, Event, GameContent, GameState, PlanetId, Position,
    Ship, Side,
};

/// What occupies a sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupant {
    Empty,
    Ship(ActorId),
    Planet(PlanetId),
    Star,
    Blackhole,
}

pub fn object_at(state: &GameState, position: Position) -> Occupant {
    if let Some(actor) = state
        .actors
        .values()
        .find(|a| a.active_ship().is_some_and(|s| s.position == position))
    {
        return Occupant::Ship(actor.id);
    }
    if let Some(planet) = state.planets.iter().find(|p| p.position == position) {
        return Occupant::Planet(planet.id);
    }
    if state.stars.contains(&position) {
        return Occupant::Star;
    }
    if state.blackholes.contains(&position) {
        return Occupant::Blackhole;
    }
    Occupant::Empty
}

pub fn is_empty(state: &GameState, position: Position) -> bool {
    object_at(state, position) == Occupant::Empty
}

pub fn ship(state: &GameState, actor: ActorId) -> Option<&Ship> {
    state.actors.get(&actor).and_then(Actor::active_ship)
}

pub fn ship_mut(state: &mut GameState, actor: ActorId) -> Option<&mut Ship> {
    state
        .actors
        .get_mut(&actor)
        .filter(|a| !a.limbo)
        .and_then(|a| a.ship.as_mut())
}

pub fn planet(state: &GameState, id: PlanetId) -> Option<&crate::Planet> {
    state.planets.iter().find(|p| p.id == id)
}

pub fn planet_mut(state: &mut GameState, id: PlanetId) -> Option<&mut crate::Planet> {
    state.planets.iter_mut().find(|p| p.id == id)
}

/// Actors whose ships are in play, in ID order.
pub fn live_ship_ids(state: &GameState) -> Vec<ActorId> {
    state
        .actors
        .values()
        .filter(|a| a.active_ship().is_some())
        .map(|a| a.id)
        .collect()
}

/// Active actors that count toward a sweep: live ship, not the hostile NPC.
pub fn sweep_population(state: &GameState) -> u32 {
    let count = state
        .actors
        .values()
        .filter(|a| !a.is_romulan() && a.active_ship().is_some())
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

pub fn ships_on_side(state: &GameState, side: Side) -> u32 {
    let count = state
        .actors
        .values()
        .filter(|a| a.active_ship().is_some_and(|s| s.side == side))
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Case-insensitive ship-name prefix lookup.
pub fn find_ship_by_name(state: &GameState, name: &str) -> Option<ActorId> {
    let wanted = name.to_ascii_uppercase();
    if wanted.is_empty() {
        return None;
    }
    state
        .actors
        .values()
        .find(|a| {
            a.active_ship()
                .is_some_and(|s| s.name.to_ascii_uppercase().starts_with(&wanted))
        })
        .map(|a| a.id)
}

/// First planet adjacent to `position` satisfying `filter`, by planet ID.
pub fn adjacent_planet(
    state: &GameState,
    position: Position,
    filter: impl Fn(&crate::Planet) -> bool,
) -> Option<PlanetId> {
    state
        .planets
        .iter()
        .filter(|p| p.position.is_adjacent(position))
        .find(|p| filter(p))
        .map(|p| p.id)
}

pub fn random_empty_position(
    state: &GameState,
    content: &GameContent,
    rng: &mut impl Rng,
) -> Option<Position> {
    let c = &content.constants;
    for _ in 0..1000 {
        let candidate = Position::new(between(rng, 1, c.grid_height), between(rng, 1, c.grid_width));
        if is_empty(state, candidate) {
            return Some(candidate);
        }
    }
    None
}

/// All sectors currently holding something, for generation and placement checks.
pub fn occupied_cells(state: &GameState) -> AHashSet<Position> {
    let mut cells: AHashSet<Position> = state.stars.iter().copied().collect();
    cells.extend(state.blackholes.iter().copied());
    cells.extend(state.planets.iter().map(|p| p.position));
    cells.extend(
        state
            .actors
            .values()
            .filter_map(|a| a.active_ship().map(|s| s.position)),
    );
    cells
}

// ---------------------------------------------------------------------------
// Actors
// ---------------------------------------------------------------------------

fn ship_name_taken(state: &GameState, name: &str) -> bool {
    state
        .actors
        .values()
        .any(|a| a.ship.as_ref().is_some_and(|s| s.name.eq_ignore_ascii_case(name)))
}

/// Roster names for `side` not currently in play, in roster order.
pub fn free_roster_names(state: &GameState, content: &GameContent, side: Side) -> Vec<String> {
    content
        .ship_names(side)
        .iter()
        .filter(|n| !ship_name_taken(state, n))
        .cloned()
        .collect()
}

/// First free roster name for `side`, or a synthesized one once the roster is used up.
pub fn free_ship_name(state: &GameState, content: &GameContent, side: Side) -> String {
    if let Some(name) = free_roster_names(state, content, side).into_iter().next() {
        return name;
    }
    let prefix = if side == Side::Federation { "F" } else { "E" };
    (1..)
        .map(|i| format!("{prefix}-BOT-{i}"))
        .find(|n| !ship_name_taken(state, n))
        .unwrap_or_else(|| format!("{prefix}-BOT"))
}

/// The side with fewer ships in play; ties go to the Federation.
pub fn weaker_side(state: &GameState) -> Side {
    if ships_on_side(state, Side::Empire) < ships_on_side(state, Side::Federation) {
        Side::Empire
    } else {
        Side::Federation
    }
}

/// Register a new actor with no ship. Returns its ID.
pub fn connect_actor(state: &mut GameState, name: &str, kind: ActorKind) -> ActorId {
    let id = ActorId(state.counters.next_actor_id);
    state.counters.next_actor_id += 1;
    state.actors.insert(id, Actor::new(id, name, kind));
    id
}

/// Put a ship under `actor`'s command at a random empty sector.
pub fn launch_ship(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
    actor: ActorId,
    side: Side,
    name: &str,
) -> Result<Position, CommandError> {
    if state.actors.get(&actor).is_some_and(|a| a.ship.is_some()) {
        return Err(CommandError::Rejected("You already command a ship.".to_string()));
    }
    if ship_name_taken(state, name) {
        return Err(CommandError::Rejected(format!("The {name} is already in use.")));
    }
    let position = random_empty_position(state, content, rng)
        .ok_or_else(|| CommandError::Rejected("The galaxy is full.".to_string()))?;
    let new_ship = Ship::new(name, side, position, &content.constants);
    let Some(entry) = state.actors.get_mut(&actor) else {
        return Err(CommandError::NoShip);
    };
    entry.ship = Some(new_ship);
    info!(%actor, ship = name, %side, %position, "ship launched");
    publish(
        state,
        out,
        Event::ShipJoined {
            actor,
            ship: name.to_string(),
            side,
            position,
        },
    );
    Ok(position)
}

/// Drop an actor entirely: ship, queue, timer and capture locks.
pub fn disconnect_actor(state: &mut GameState, out: &mut Outbox, actor: ActorId) {
    retire_ship(state, out, actor);
    if state.actors.remove(&actor).is_some() {
        out.cancelled.push(actor);
    }
}

/// Take `actor`'s ship out of play without destruction credit (QUIT, disconnect).
pub fn retire_ship(state: &mut GameState, out: &mut Outbox, actor: ActorId) {
    let Some(name) = state
        .actors
        .get(&actor)
        .and_then(|a| a.ship.as_ref())
        .map(|s| s.name.clone())
    else {
        return;
    };
    detach_ship(state, actor);
    if let Some(entry) = state.actors.get_mut(&actor) {
        entry.ship = None;
        entry.limbo = false;
    }
    publish(state, out, Event::ShipLeft { actor, ship: name });
}

/// Undock, break the tractor pair, and release capture locks held by `actor`.
pub fn detach_ship(state: &mut GameState, actor: ActorId) {
    break_tractor(state, actor);
    if let Some(ship) = state.actors.get_mut(&actor).and_then(|a| a.ship.as_mut()) {
        ship.docked_at = None;
    }
    release_capture_locks(state, actor);
}

/// Remove a destroyed ship. Bots leave the roster with it; humans become observers.
pub fn remove_destroyed_ship(
    state: &mut GameState,
    out: &mut Outbox,
    victim: ActorId,
    by: Option<ActorId>,
) {
    let Some(name) = state
        .actors
        .get(&victim)
        .and_then(|a| a.ship.as_ref())
        .map(|s| s.name.clone())
    else {
        return;
    };
    detach_ship(state, victim);
    let is_bot = state.actors.get(&victim).is_some_and(Actor::is_bot);
    if let Some(entry) = state.actors.get_mut(&victim) {
        entry.ship = None;
        entry.limbo = false;
        entry.queue.clear();
        entry.busy = false;
        if entry.pending.take().is_some() {
            out.cancelled.push(victim);
        }
    }
    info!(actor = %victim, ship = %name, "ship destroyed");
    notify(state, out, victim, format!("The {name} has been destroyed."));
    publish(
        state,
        out,
        Event::ShipDestroyed {
            actor: victim,
            ship: name,
            by,
        },
    );
    if is_bot {
        state.actors.remove(&victim);
    }
}

/// A ship that spent its own energy down to nothing is lost, with no kill credit.
///
/// Returns true if the ship was removed.
pub fn settle_exhausted_ship(
    state: &mut GameState,
    content: &GameContent,
    out: &mut Outbox,
    actor: ActorId,
) -> bool {
    let Some(ship) = ship_mut(state, actor) else {
        return false;
    };
    if ship.kill_credited || !ship.is_destroyed(&content.constants) {
        return false;
    }
    ship.kill_credited = true;
    notify(state, out, actor, "Energy reserves exhausted. Your ship is dead in space.");
    remove_destroyed_ship(state, out, actor, None);
    true
}

pub fn break_tractor(state: &mut GameState, actor: ActorId) {
    let partner = state
        .actors
        .get_mut(&actor)
        .and_then(|a| a.ship.as_mut())
        .and_then(|s| s.tractor_partner.take());
    if let Some(partner) = partner {
        if let Some(other) = state.actors.get_mut(&partner).and_then(|a| a.ship.as_mut()) {
            if other.tractor_partner == Some(actor) {
                other.tractor_partner = None;
            }
        }
    }
}

pub fn release_capture_locks(state: &mut GameState, actor: ActorId) {
    for planet in &mut state.planets {
        if planet.capture_lock.is_some_and(|l| l.holder == actor) {
            planet.capture_lock = None;
        }
    }
}

/// Drop capture locks older than the timeout.
pub fn release_stale_capture_locks(state: &mut GameState, content: &GameContent) {
    let now = state.meta.now_ms;
    let timeout = content.constants.capture_lock_timeout_ms;
    for planet in &mut state.planets {
        if planet
            .capture_lock
            .is_some_and(|l| now.saturating_sub(l.since_ms) >= timeout)
        {
            planet.capture_lock = None;
        }
    }
}

// ---------------------------------------------------------------------------
// Bases
// ---------------------------------------------------------------------------

/// Turn a fully built planet into a base if its side is under the base cap.
pub fn promote_to_base(
    state: &mut GameState,
    content: &GameContent,
    out: &mut Outbox,
    planet_id: PlanetId,
) -> bool {
    let Some(side) = planet(state, planet_id).map(|p| p.side) else {
        return false;
    };
    let cap = content.constants.max_bases_per_side;
    let Some(list) = state.bases.list_mut(side) else {
        return false;
    };
    if list.len() >= cap || list.contains(&planet_id) {
        return false;
    }
    list.push(planet_id);
    if let Some(p) = planet_mut(state, planet_id) {
        p.is_base = true;
        p.builds = content.constants.max_builds_per_planet;
        p.energy = content.constants.max_base_energy;
    }
    info!(planet = %planet_id, %side, "base established");
    publish(state, out, Event::BaseCreated { planet: planet_id, side });
    true
}

/// Demote a base to an unclaimed planet and undock everyone there.
///
/// Returns false if the planet was not a base, so callers can treat the first
/// successful call as the single destruction event.
pub fn demote_base(state: &mut GameState, out: &mut Outbox, planet_id: PlanetId) -> bool {
    let Some(p) = planet_mut(state, planet_id) else {
        return false;
    };
    if !p.is_base {
        return false;
    }
    let side = p.side;
    p.is_base = false;
    p.builds = 0;
    p.energy = 0.0;
    p.side = Side::Neutral;
    p.capture_lock = None;
    if let Some(list) = state.bases.list_mut(side) {
        list.retain(|id| *id != planet_id);
    }
    let docked: Vec<ActorId> = state
        .actors
        .values()
        .filter(|a| {
            a.ship
                .as_ref()
                .is_some_and(|s| s.docked_at == Some(planet_id))
        })
        .map(|a| a.id)
        .collect();
    for actor in docked {
        if let Some(s) = state.actors.get_mut(&actor).and_then(|a| a.ship.as_mut()) {
            s.docked_at = None;
        }
        publish(state, out, Event::ShipUndocked { actor });
    }
    publish(state, out, Event::BaseDestroyed { planet: planet_id, side });
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{add_base, add_planet, add_ship, base_content, base_state};

    #[test]
    fn object_at_finds_each_kind() {
        let content = base_content();
        let mut state = base_state(&content);
        let ship = add_ship(&mut state, &content, "Lexington", Side::Federation, Position::new(2, 2));
        let planet = add_planet(&mut state, Position::new(3, 3), Side::Neutral, 0);
        state.stars.push(Position::new(4, 4));
        state.blackholes.push(Position::new(5, 5));

        assert_eq!(object_at(&state, Position::new(2, 2)), Occupant::Ship(ship));
        assert_eq!(object_at(&state, Position::new(3, 3)), Occupant::Planet(planet));
        assert_eq!(object_at(&state, Position::new(4, 4)), Occupant::Star);
        assert_eq!(object_at(&state, Position::new(5, 5)), Occupant::Blackhole);
        assert_eq!(object_at(&state, Position::new(6, 6)), Occupant::Empty);
    }

    #[test]
    fn demote_base_keeps_lists_consistent_and_undocks() {
        let content = base_content();
        let mut state = base_state(&content);
        let base = add_base(&mut state, &content, Position::new(10, 10), Side::Empire);
        let ship = add_ship(&mut state, &content, "Kongo", Side::Empire, Position::new(10, 11));
        state.actors.get_mut(&ship).unwrap().ship.as_mut().unwrap().docked_at = Some(base);

        let mut out = Outbox::new();
        assert!(demote_base(&mut state, &mut out, base));
        assert!(!demote_base(&mut state, &mut out, base), "second demotion is a no-op");

        let p = planet(&state, base).unwrap();
        assert!(!p.is_base);
        assert_eq!(p.side, Side::Neutral);
        assert_eq!(p.builds, 0);
        assert!(state.bases.empire.is_empty());
        assert_eq!(ship_docked(&state, ship), None);
    }

    #[test]
    fn promote_respects_side_cap() {
        let mut content = base_content();
        content.constants.max_bases_per_side = 1;
        let mut state = base_state(&content);
        add_base(&mut state, &content, Position::new(10, 10), Side::Federation);
        let planet = add_planet(&mut state, Position::new(20, 20), Side::Federation, 5);

        let mut out = Outbox::new();
        assert!(!promote_to_base(&mut state, &content, &mut out, planet));
        assert!(!super::planet(&state, planet).unwrap().is_base);
    }

    fn ship_docked(state: &GameState, actor: ActorId) -> Option<PlanetId> {
        ship(state, actor).and_then(|s| s.docked_at)
    }
}
