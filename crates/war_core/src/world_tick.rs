//! Shared world clock and the sweep that drives periodic subsystems.
//!
//! Every time-consuming command advances the clock once. After as many advances
//! as there are active actors, the periodic subsystems run once, in fixed order.

use rand::Rng;
use tracing::{debug, warn};

use crate::comms::{notify, publish, Outbox};
use crate::registry;
use crate::{bots, installations, romulan, ActorId, Device, Event, GameContent, GameState};

/// Advance world time by one action. Returns true if this advance closed a sweep.
///
/// A no-op while a sweep is running, so subsystem activity that itself completes
/// commands cannot start a nested sweep.
pub fn advance(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
    actor: Option<ActorId>,
    attributed: bool,
) -> bool {
    if state.clock.sweeping {
        return false;
    }
    if attributed {
        if let Some(actor) = actor {
            credit_turn(state, content, out, actor);
        }
        state.clock.idle_ticks = 0;
    }
    state.clock.stardate += 1;
    state.clock.sweep_counter += 1;

    let population = registry::sweep_population(state).max(1);
    if state.clock.sweep_counter < population {
        return false;
    }
    state.clock.sweep_counter = 0;
    state.clock.sweeping = true;
    run_sweep(state, content, rng, out, actor, population);
    state.clock.sweeping = false;
    true
}

/// Entry point for a completed time-consuming command.
pub fn on_attributed_advance(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
    actor: ActorId,
) -> bool {
    advance(state, content, rng, out, Some(actor), true)
}

/// Called by the runtime on a fixed cadence. Advances the world once the idle window elapses.
pub fn on_idle_tick(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
) -> bool {
    state.clock.idle_ticks += 1;
    if state.clock.idle_ticks < content.constants.idle_window_ticks {
        return false;
    }
    state.clock.idle_ticks = 0;
    advance(state, content, rng, out, None, false)
}

/// Called by the runtime more often than the idle tick. Advances only after instantaneous commands.
pub fn on_nudge(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
) -> bool {
    if !state.clock.nudge_pending {
        return false;
    }
    state.clock.nudge_pending = false;
    advance(state, content, rng, out, None, false)
}

fn credit_turn(state: &mut GameState, content: &GameContent, out: &mut Outbox, actor: ActorId) {
    let Some(entry) = state.actors.get_mut(&actor) else {
        return;
    };
    entry.personal_clock += 1;
    let Some(side) = entry.active_ship().map(|s| s.side) else {
        return;
    };
    *state.clock.side_turns.entry(side).or_insert(0) += 1;
    tick_life_support(state, content, out, actor);
}

fn tick_life_support(state: &mut GameState, content: &GameContent, out: &mut Outbox, actor: ActorId) {
    let c = &content.constants;
    let Some(ship) = registry::ship_mut(state, actor) else {
        return;
    };
    if ship.docked_at.is_some() || !ship.device_inoperative(Device::LifeSupport, c) {
        return;
    }
    ship.life_support_reserve = ship.life_support_reserve.saturating_sub(1);
    let reserve = ship.life_support_reserve;
    if reserve > 0 {
        notify(
            state,
            out,
            actor,
            format!("WARNING: life support failing. {reserve} stardates of reserves left."),
        );
        return;
    }
    warn!(%actor, "life support exhausted");
    notify(state, out, actor, "Life support reserves exhausted. Your crew is lost.");
    registry::remove_destroyed_ship(state, out, actor, None);
}

fn run_sweep(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
    trigger: Option<ActorId>,
    population: u32,
) {
    state.clock.sweeps += 1;
    debug!(sweep = state.clock.sweeps, population, "sweep");
    registry::release_stale_capture_locks(state, content);

    installations::base_defense_fire(state, content, rng, out, trigger);
    installations::planet_defense_fire(state, content, rng, out);
    installations::regenerate_bases(state, content, trigger);
    romulan::romulan_turn(state, content, rng, out);
    bots::maintain_bots(state, content, rng, out);

    let sweep = state.clock.sweeps;
    publish(
        state,
        out,
        Event::SweepCompleted {
            sweep,
            active_actors: population,
        },
    );
}
