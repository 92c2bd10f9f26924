//! MOVE (warp) and IMPULSE.

use rand::Rng;
use tracing::debug;

use super::args::{jittered_delay, own_ship, point, take_mode};
use super::Completion;
use crate::comms::{notify, publish, Outbox};
use crate::error::{CommandError, CommandResult};
use crate::random::{iran, ran};
use crate::registry::{self, Occupant};
use crate::{
    path, ActorId, CoordMode, DelayedAction, Device, Event, GameContent, GameState, Position,
};

const MOVE_USAGE: &str = "MOVE [A|R|C] <vertical> <horizontal> | MOVE C <ship>";
const IMPULSE_USAGE: &str = "IMPULSE [A|R] <vertical> <horizontal>";
const STRAIN_WARP: i32 = 5;
const STRAIN_CHANCE: [f64; 2] = [0.2, 0.5];
const STRAIN_DAMAGE: [f64; 2] = [100.0, 200.0];
const SHIELDS_UP_MULTIPLIER: f64 = 2.0;
const TRACTOR_MULTIPLIER: f64 = 3.0;

pub fn warp(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
    actor: ActorId,
    args: &[String],
) -> CommandResult<Completion> {
    let c = &content.constants;
    let ship = own_ship(state, actor)?;
    if ship.device_inoperative(Device::Warp, c) {
        return Err(CommandError::DeviceInoperative(Device::Warp));
    }
    let (mode, rest) = take_mode(state, actor, args);
    let (target, _) = point(state, content, actor, mode, rest, MOVE_USAGE)?;
    let ship = own_ship(state, actor)?;
    let start = ship.position;
    let warp = start.distance(target);
    if warp == 0 {
        return Err(CommandError::AlreadyThere(target));
    }
    if warp > c.max_warp {
        return Err(CommandError::WarpTooHigh {
            requested: warp,
            max: c.max_warp,
        });
    }

    let mut destination = start;
    for cell in path::line(start, target) {
        if !registry::is_empty(state, cell) {
            break;
        }
        destination = cell;
    }
    if destination == start {
        return Err(CommandError::Blocked(start.step_toward(target)));
    }
    let collision = destination != target;

    let multiplier = if ship.tractor_partner.is_some() {
        TRACTOR_MULTIPLIER
    } else if ship.shields_up {
        SHIELDS_UP_MULTIPLIER
    } else {
        1.0
    };
    let cost = f64::from(warp * warp) * multiplier;
    if ship.energy < cost {
        return Err(CommandError::InsufficientEnergy {
            needed: crate::scoring::points(cost),
            available: crate::scoring::points(ship.energy),
        });
    }

    strain_engines(state, content, rng, out, actor, warp);
    let misnavigate = ship_computer_down(state, content, actor);
    if let Some(ship) = registry::ship_mut(state, actor) {
        ship.energy -= cost;
    }
    undock(state, out, actor);
    if misnavigate {
        destination = wobble(rng, content, destination);
        notify(state, out, actor, "Navigation is inexact: computer inoperative.");
    }
    if collision {
        notify(state, out, actor, "Navigation Officer: Collision averted, Captain!");
    }
    notify(state, out, actor, format!("Warping to {destination} (warp {warp})..."));

    Ok(Completion::Delayed {
        delay_ms: jittered_delay(rng, c.warp_delay_min_ms, c.warp_delay_range_ms),
        action: DelayedAction::Move { destination, cost },
    })
}

pub fn finish_warp(
    state: &mut GameState,
    out: &mut Outbox,
    actor: ActorId,
    destination: Position,
    cost: f64,
) -> CommandResult<()> {
    let ship = own_ship(state, actor)?;
    let from = ship.position;
    match registry::object_at(state, destination) {
        Occupant::Empty => {}
        Occupant::Ship(id) if id == actor => return Ok(()),
        _ => {
            super::refund(state, actor, cost);
            return Err(CommandError::Rejected(
                "Warp aborted: sector is now occupied.".to_string(),
            ));
        }
    }
    relocate(state, out, actor, from, destination);
    let name = own_ship(state, actor)?.name.clone();
    notify(state, out, actor, format!("{name} now in sector {destination}."));
    trail_partner(state, out, actor, from, destination);
    Ok(())
}

pub fn impulse(
    state: &mut GameState,
    content: &GameContent,
    out: &mut Outbox,
    actor: ActorId,
    args: &[String],
) -> CommandResult<Completion> {
    let c = &content.constants;
    let ship = own_ship(state, actor)?;
    if ship.device_inoperative(Device::Impulse, c) {
        return Err(CommandError::DeviceInoperative(Device::Impulse));
    }
    let (mode, rest) = take_mode(state, actor, args);
    if mode == CoordMode::Computed {
        return Err(CommandError::Usage(IMPULSE_USAGE));
    }
    let (destination, _) = point(state, content, actor, mode, rest, IMPULSE_USAGE)?;
    let ship = own_ship(state, actor)?;
    if !ship.position.is_adjacent(destination) {
        return Err(CommandError::NotAdjacent(destination));
    }
    if !registry::is_empty(state, destination) {
        return Err(CommandError::Blocked(destination));
    }
    let cost = if ship.shields_up { 2.0 } else { 1.0 };
    if ship.energy < cost {
        return Err(CommandError::InsufficientEnergy {
            needed: crate::scoring::points(cost),
            available: crate::scoring::points(ship.energy),
        });
    }
    if let Some(ship) = registry::ship_mut(state, actor) {
        ship.energy -= cost;
    }
    undock(state, out, actor);
    Ok(Completion::Delayed {
        delay_ms: c.impulse_delay_ms,
        action: DelayedAction::Impulse { destination },
    })
}

pub fn finish_impulse(
    state: &mut GameState,
    out: &mut Outbox,
    actor: ActorId,
    destination: Position,
) -> CommandResult<()> {
    let from = own_ship(state, actor)?.position;
    if !registry::is_empty(state, destination) {
        return Err(CommandError::Blocked(destination));
    }
    relocate(state, out, actor, from, destination);
    notify(state, out, actor, format!("Impulse complete to sector {destination}."));
    trail_partner(state, out, actor, from, destination);
    Ok(())
}

fn ship_computer_down(state: &GameState, content: &GameContent, actor: ActorId) -> bool {
    registry::ship(state, actor)
        .is_some_and(|s| s.device_inoperative(Device::Computer, &content.constants))
}

/// Warp 5 and above can damage the engines.
fn strain_engines(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
    actor: ActorId,
    warp: i32,
) {
    if warp < STRAIN_WARP {
        return;
    }
    notify(state, out, actor, format!("Warning: warp factor {warp} may damage engines."));
    let tier = usize::from(warp > STRAIN_WARP);
    if ran(rng) >= STRAIN_CHANCE[tier] {
        return;
    }
    let Some(ship) = registry::ship_mut(state, actor) else {
        return;
    };
    ship.devices.add(Device::Warp, STRAIN_DAMAGE[tier]);
    let status = if ship.device_inoperative(Device::Warp, &content.constants) {
        "destroyed"
    } else {
        "damaged"
    };
    notify(state, out, actor, format!("Warp engines {status}."));
}

fn wobble(rng: &mut impl Rng, content: &GameContent, at: Position) -> Position {
    let c = &content.constants;
    let dv = i32::try_from(iran(rng, 3)).unwrap_or(1) - 1;
    let dh = i32::try_from(iran(rng, 3)).unwrap_or(1) - 1;
    Position::new(
        (at.v + dv).clamp(1, c.grid_height),
        (at.h + dh).clamp(1, c.grid_width),
    )
}

fn undock(state: &mut GameState, out: &mut Outbox, actor: ActorId) {
    let was_docked = registry::ship_mut(state, actor)
        .and_then(|s| s.docked_at.take())
        .is_some();
    if was_docked {
        notify(state, out, actor, "You have undocked.");
        publish(state, out, Event::ShipUndocked { actor });
    }
}

fn relocate(state: &mut GameState, out: &mut Outbox, actor: ActorId, from: Position, to: Position) {
    if let Some(ship) = registry::ship_mut(state, actor) {
        ship.position = to;
        ship.docked_at = None;
    }
    debug!(%actor, %from, %to, "moved");
    publish(state, out, Event::ShipMoved { actor, from, to });
}

/// Drag the tractored partner into the cell just behind the mover.
fn trail_partner(state: &mut GameState, out: &mut Outbox, actor: ActorId, from: Position, to: Position) {
    let Some(partner) = registry::ship(state, actor).and_then(|s| s.tractor_partner) else {
        return;
    };
    let Some(partner_from) = registry::ship(state, partner).map(|s| s.position) else {
        registry::break_tractor(state, actor);
        return;
    };
    let trailing = to.step_toward(from);
    let free = match registry::object_at(state, trailing) {
        Occupant::Empty => true,
        Occupant::Ship(id) => id == partner,
        _ => false,
    };
    if !free {
        registry::break_tractor(state, actor);
        notify(state, out, actor, "Tractor beam broken.");
        notify(state, out, partner, "Tractor beam broken.");
        return;
    }
    if partner_from == trailing {
        return;
    }
    relocate(state, out, partner, partner_from, trailing);
    let name = registry::ship(state, actor).map_or_else(String::new, |s| s.name.clone());
    notify(state, out, partner, format!("You were tractored to {trailing} by the {name}."));
}
