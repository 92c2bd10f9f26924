//! The cloaked hostile NPC.
//!
//! At most one Romulan exists. It keeps its own destructible pool instead of the
//! usual energy/damage pair and leaves the galaxy when the pool runs out.

use rand::Rng;
use tracing::info;

use crate::combat::{self, launch_torpedo, phaser_hit, HitReport, Shooter, Target, TorpedoOutcome};
use crate::comms::{notify_all, notify_nearby, publish, Outbox};
use crate::random::{between, iran, ran};
use crate::registry;
use crate::scoring::{points, ScoreCategory};
use crate::{
    path, ActorId, ActorKind, Event, GameContent, GameState, Position, RomulanPhase,
    RomulanState, Ship, Side,
};

const ROMULAN_NAME: &str = "Romulan";
const SPAWN_SWEEPS_PER_PLAYER: u32 = 3;

const INSULT_OPENERS: [&str; 6] = [
    "Surrender, you",
    "Prepare to die, you",
    "Your end is near, you",
    "Flee while you can, you",
    "You cannot hide from me, you",
    "Pathetic,",
];
const INSULT_ADJECTIVES: [&str; 6] = [
    "spineless",
    "misbegotten",
    "slime-ridden",
    "cowardly",
    "pitiful",
    "feeble-minded",
];
const INSULT_NOUNS: [&str; 6] = [
    "space-slug",
    "tribble",
    "bucket of bolts",
    "excuse for a captain",
    "targ",
    "pile of scrap",
];

/// One sweep of Romulan behavior: spawn, approach, fire.
pub fn romulan_turn(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
) {
    let Some(actor) = state.romulan.actor else {
        maybe_spawn(state, content, rng, out);
        return;
    };
    let Some(position) = registry::ship(state, actor).map(|s| s.position) else {
        state.actors.remove(&actor);
        state.romulan = fresh_state(content);
        return;
    };

    if state.romulan.reveal_sweeps > 0 {
        state.romulan.reveal_sweeps -= 1;
        if state.romulan.reveal_sweeps == 0 {
            if let Some(ship) = registry::ship_mut(state, actor) {
                ship.cloaked = true;
            }
        }
    }

    let c = &content.constants;
    let Some((target, target_pos)) = nearest_target(state, position, c.romulan_detection_range)
    else {
        state.romulan.phase = RomulanPhase::Hunting;
        wander(state, content, rng, out, actor, position);
        return;
    };
    state.romulan.phase = RomulanPhase::Hunting;
    let position = approach(state, out, actor, position, target_pos, c.romulan_max_step);

    if position.distance(target_pos) <= c.phaser_range && ran(rng) < c.romulan_attack_chance {
        attack(state, content, rng, out, actor, position, target, target_pos);
    }
}

fn fresh_state(content: &GameContent) -> RomulanState {
    RomulanState {
        pool: content.constants.romulan_energy,
        ..RomulanState::default()
    }
}

fn maybe_spawn(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
) {
    state.romulan.sweeps_since_spawn += 1;
    let players = registry::sweep_population(state).max(1);
    if state.romulan.sweeps_since_spawn < players * SPAWN_SWEEPS_PER_PLAYER || iran(rng, 5) != 4 {
        return;
    }
    let Some(position) = registry::random_empty_position(state, content, rng) else {
        return;
    };
    let actor = registry::connect_actor(state, ROMULAN_NAME, ActorKind::Romulan);
    let mut ship = Ship::new(ROMULAN_NAME, Side::Romulan, position, &content.constants);
    ship.cloaked = true;
    if let Some(entry) = state.actors.get_mut(&actor) {
        entry.ship = Some(ship);
    }
    state.romulan = RomulanState {
        actor: Some(actor),
        phase: RomulanPhase::Hunting,
        pool: content.constants.romulan_energy,
        sweeps_since_spawn: 0,
        reveal_sweeps: 0,
        prefer_torpedo: false,
    };
    info!(%actor, %position, "romulan spawned");
    publish(state, out, Event::RomulanSpawned { actor, position });
}

fn nearest_target(state: &GameState, from: Position, range: i32) -> Option<(Target, Position)> {
    let ships = state.actors.values().filter_map(|a| {
        a.active_ship()
            .filter(|s| s.side != Side::Romulan)
            .map(|s| (Target::Ship(a.id), s.position))
    });
    let bases = state
        .planets
        .iter()
        .filter(|p| p.is_base)
        .map(|p| (Target::Planet(p.id), p.position));
    ships
        .chain(bases)
        .filter(|(_, p)| p.distance(from) <= range)
        .min_by_key(|(_, p)| p.distance(from))
}

/// Close in along the raster, never entering the target's cell or any occupied one.
fn approach(
    state: &mut GameState,
    out: &mut Outbox,
    actor: ActorId,
    from: Position,
    target: Position,
    max_step: i32,
) -> Position {
    let mut to = from;
    for cell in path::line(from, target)
        .into_iter()
        .take(usize::try_from(max_step).unwrap_or(0))
    {
        if cell == target || !registry::is_empty(state, cell) {
            break;
        }
        to = cell;
    }
    relocate(state, out, actor, from, to);
    to
}

fn wander(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
    actor: ActorId,
    from: Position,
) {
    let step = content.constants.romulan_max_step;
    let goal = from.offset(between(rng, -step, step), between(rng, -step, step));
    if !content.in_bounds(goal) {
        return;
    }
    let mut to = from;
    for cell in path::line(from, goal) {
        if !registry::is_empty(state, cell) {
            break;
        }
        to = cell;
    }
    relocate(state, out, actor, from, to);
}

fn relocate(state: &mut GameState, out: &mut Outbox, actor: ActorId, from: Position, to: Position) {
    if from == to {
        return;
    }
    if let Some(ship) = registry::ship_mut(state, actor) {
        ship.position = to;
    }
    publish(state, out, Event::ShipMoved { actor, from, to });
}

#[allow(clippy::too_many_arguments)]
fn attack(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
    actor: ActorId,
    position: Position,
    target: Target,
    target_pos: Position,
) {
    if let Some(ship) = registry::ship_mut(state, actor) {
        ship.cloaked = false;
    }
    state.romulan.phase = RomulanPhase::Attacking;
    state.romulan.reveal_sweeps = content.constants.romulan_reveal_sweeps;
    let taunt = insult(rng);
    notify_nearby(
        state,
        out,
        position,
        content.constants.phaser_range,
        None,
        &format!("Romulan: {taunt}"),
    );

    let shooter = Shooter {
        actor: Some(actor),
        side: Side::Romulan,
        position,
        impaired: false,
    };
    let use_torpedo = state.romulan.prefer_torpedo;
    state.romulan.prefer_torpedo = !use_torpedo;
    if use_torpedo {
        if let TorpedoOutcome::Struck(report) =
            launch_torpedo(state, content, rng, out, shooter, target_pos)
        {
            combat::report_to_victim(state, out, ROMULAN_NAME, "torpedo", &report);
        }
        return;
    }
    let phit = (content.constants.romulan_phaser_power / content.constants.phaser_power_divisor)
        .floor();
    publish(
        state,
        out,
        Event::PhaserFired {
            shooter: Some(actor),
            from: position,
            to: target_pos,
            power: content.constants.romulan_phaser_power,
        },
    );
    let report: HitReport = phaser_hit(state, content, rng, out, shooter, target, phit);
    combat::report_to_victim(state, out, ROMULAN_NAME, "phasers", &report);
}

fn insult(rng: &mut impl Rng) -> String {
    let opener = pick(rng, &INSULT_OPENERS);
    let adjective = pick(rng, &INSULT_ADJECTIVES);
    let noun = pick(rng, &INSULT_NOUNS);
    format!("{opener} {adjective} {noun}!")
}

fn pick(rng: &mut impl Rng, words: &[&'static str]) -> &'static str {
    let len = u32::try_from(words.len()).unwrap_or(u32::MAX);
    words[iran(rng, len) as usize]
}

/// Damage against the Romulan goes to its pool. Returns true if it was knocked out.
pub fn absorb_hit(
    state: &mut GameState,
    content: &GameContent,
    out: &mut Outbox,
    shooter: Shooter,
    actor: ActorId,
    hull: f64,
) -> bool {
    if state.romulan.actor != Some(actor) {
        return false;
    }
    state.romulan.pool -= hull;
    state.ledger.credit(
        shooter.actor,
        shooter.side,
        ScoreCategory::DamageToRomulans,
        points(hull),
    );
    publish(
        state,
        out,
        Event::ShipHit {
            target: actor,
            hull,
            shield_pct: 0.0,
            critical: false,
        },
    );
    if state.romulan.pool <= 0.0 {
        return knock_out(state, content, out, shooter);
    }
    false
}

/// Remove the Romulan from play and reset its pool for the next appearance.
pub fn knock_out(
    state: &mut GameState,
    content: &GameContent,
    out: &mut Outbox,
    shooter: Shooter,
) -> bool {
    let Some(actor) = state.romulan.actor else {
        return false;
    };
    let Some(ship) = registry::ship_mut(state, actor) else {
        return false;
    };
    if ship.kill_credited {
        return false;
    }
    ship.kill_credited = true;
    ship.cloaked = true;
    if shooter.side != Side::Romulan {
        state
            .ledger
            .credit(shooter.actor, shooter.side, ScoreCategory::EnemiesDestroyed, 1);
    }
    info!(%actor, by = ?shooter.actor, "romulan knocked out");
    publish(
        state,
        out,
        Event::RomulanKnockedOut {
            actor,
            by: shooter.actor,
        },
    );
    notify_all(state, out, None, "The Romulan has been destroyed.");
    state.actors.remove(&actor);
    state.romulan = fresh_state(content);
    true
}
