//! SHIELDS, TRACTOR, ENERGY and REPAIR.

use super::args::{float, keyword, number, own_ship};
use super::Completion;
use crate::comms::{notify, notify_variant, publish, Outbox};
use crate::error::{CommandError, CommandResult};
use crate::registry;
use crate::{ActorId, DelayedAction, Device, Event, GameContent, GameState};

const SHIELDS_USAGE: &str = "SHIELDS UP | DOWN | TRANSFER <amount>";
const TRACTOR_USAGE: &str = "TRACTOR <ship> | TRACTOR OFF";
const ENERGY_USAGE: &str = "ENERGY <ship> <amount>";
const REPAIR_USAGE: &str = "REPAIR [units]";
const ENERGY_TRANSIT_KEPT: f64 = 0.9;
const REPAIR_UNITS: f64 = 50.0;
const REPAIR_UNITS_DOCKED: f64 = 100.0;
const SHIELD_REPAIR_AMOUNT: f64 = 250.0;
const SHIELD_REPAIR_COST: f64 = 100.0;
const ENERGY_REPAIR_AMOUNT: f64 = 500.0;

pub fn shields(
    state: &mut GameState,
    content: &GameContent,
    out: &mut Outbox,
    actor: ActorId,
    args: &[String],
) -> CommandResult<Completion> {
    let c = &content.constants;
    let ship = own_ship(state, actor)?;
    let action = args.first().ok_or(CommandError::Usage(SHIELDS_USAGE))?;

    if keyword(action, "UP", 1) {
        if ship.device_inoperative(Device::Shield, c) {
            return Err(CommandError::DeviceInoperative(Device::Shield));
        }
        if ship.shields_up {
            return Err(CommandError::Rejected("Shields are already up.".to_string()));
        }
        if ship.energy < c.shield_raise_cost {
            return Err(CommandError::InsufficientEnergy {
                needed: crate::scoring::points(c.shield_raise_cost),
                available: crate::scoring::points(ship.energy),
            });
        }
        let partner = ship.tractor_partner;
        if let Some(ship) = registry::ship_mut(state, actor) {
            ship.energy -= c.shield_raise_cost;
            ship.shields_up = true;
        }
        if let Some(partner) = partner {
            registry::break_tractor(state, actor);
            notify(state, out, actor, "Tractor beam broken, Captain.");
            notify(state, out, partner, "Tractor beam was broken: partner raised shields.");
        }
        publish(state, out, Event::ShieldsToggled { actor, up: true });
        let long = format!(
            "Defensive shields have been raised. Energy expenditure: {:.0} units.",
            c.shield_raise_cost
        );
        notify_variant(state, out, actor, "SH > UP", &long);
    } else if keyword(action, "DOWN", 1) {
        if !ship.shields_up {
            return Err(CommandError::Rejected("Shields are already down.".to_string()));
        }
        if let Some(ship) = registry::ship_mut(state, actor) {
            ship.shields_up = false;
        }
        publish(state, out, Event::ShieldsToggled { actor, up: false });
        notify_variant(state, out, actor, "SH > DN", "Defensive shields have been lowered.");
    } else if keyword(action, "TRANSFER", 1) {
        let amount = float(args.get(1).ok_or(CommandError::Usage(SHIELDS_USAGE))?)?;
        transfer_to_shields(state, content, out, actor, amount)?;
    } else {
        return Err(CommandError::Usage(SHIELDS_USAGE));
    }
    Ok(Completion::TIMED)
}

/// Positive amounts move ship energy into the shields, negative ones drain the shields back.
fn transfer_to_shields(
    state: &mut GameState,
    content: &GameContent,
    out: &mut Outbox,
    actor: ActorId,
    amount: f64,
) -> CommandResult<()> {
    let c = &content.constants;
    let Some(ship) = registry::ship_mut(state, actor) else {
        return Err(CommandError::NoShip);
    };
    let moved = if amount >= 0.0 {
        amount
            .min(ship.energy.max(0.0))
            .min((c.max_shield_energy - ship.shield_energy).max(0.0))
    } else {
        -(-amount)
            .min(ship.shield_energy)
            .min((c.max_ship_energy - ship.energy).max(0.0))
    };
    if moved.abs() < f64::EPSILON {
        return Err(CommandError::Rejected(
            "Nothing to transfer: shields or energy already at the limit.".to_string(),
        ));
    }
    ship.shield_energy += moved;
    ship.energy -= moved;
    let (energy, shields) = (ship.energy, ship.shield_energy);
    notify(
        state,
        out,
        actor,
        format!("Transferred {moved:.0} units. Ship energy {energy:.0}, shield energy {shields:.0}."),
    );
    Ok(())
}

pub fn tractor(
    state: &mut GameState,
    content: &GameContent,
    out: &mut Outbox,
    actor: ActorId,
    args: &[String],
) -> CommandResult<Completion> {
    let ship = own_ship(state, actor)?;
    if ship.device_inoperative(Device::Tractor, &content.constants) {
        return Err(CommandError::DeviceInoperative(Device::Tractor));
    }

    let release = args.first().map_or(true, |a| a.eq_ignore_ascii_case("OFF"));
    if release {
        let Some(partner) = ship.tractor_partner else {
            return Err(CommandError::Rejected("No tractor beam is active.".to_string()));
        };
        let name = ship.name.clone();
        registry::break_tractor(state, actor);
        notify_variant(state, out, actor, "Trac. Beam off", "Tractor beam broken, Captain.");
        notify(state, out, partner, format!("{name} has disengaged tractor beam."));
        return Ok(Completion::TIMED);
    }

    let wanted = &args[0];
    let target = registry::find_ship_by_name(state, wanted)
        .ok_or_else(|| CommandError::UnknownShip(wanted.clone()))?;
    if target == actor {
        return Err(CommandError::Rejected("You cannot tractor yourself.".to_string()));
    }
    if ship.tractor_partner.is_some() {
        return Err(CommandError::Rejected(format!(
            "Tractor beam already active. {TRACTOR_USAGE}"
        )));
    }
    let other = registry::ship(state, target).ok_or(CommandError::UnknownShip(wanted.clone()))?;
    if other.side != ship.side {
        return Err(CommandError::WrongSide(other.side));
    }
    if !ship.position.is_adjacent(other.position) {
        return Err(CommandError::NotAdjacent(other.position));
    }
    if ship.shields_up || other.shields_up {
        return Err(CommandError::ShieldsUp);
    }
    if other.tractor_partner.is_some() {
        return Err(CommandError::Rejected(format!("{} is already in a tractor beam.", other.name)));
    }
    let (name, other_name) = (ship.name.clone(), other.name.clone());
    if let Some(s) = registry::ship_mut(state, actor) {
        s.tractor_partner = Some(target);
    }
    if let Some(s) = registry::ship_mut(state, target) {
        s.tractor_partner = Some(actor);
    }
    notify(state, out, actor, format!("Tractor beam locked on to {other_name}."));
    notify(state, out, target, format!("You are now being tractored by {name}."));
    Ok(Completion::TIMED)
}

pub fn energy(
    state: &mut GameState,
    content: &GameContent,
    out: &mut Outbox,
    actor: ActorId,
    args: &[String],
) -> CommandResult<Completion> {
    let c = &content.constants;
    let [wanted, amount, ..] = args else {
        return Err(CommandError::Usage(ENERGY_USAGE));
    };
    let ship = own_ship(state, actor)?;
    if ship.device_inoperative(Device::Radio, c) {
        return Err(CommandError::DeviceInoperative(Device::Radio));
    }
    let requested = f64::from(number(amount)?);
    if requested <= 0.0 {
        return Err(CommandError::Usage(ENERGY_USAGE));
    }
    if ship.energy < requested {
        return Err(CommandError::InsufficientEnergy {
            needed: crate::scoring::points(requested),
            available: crate::scoring::points(ship.energy),
        });
    }
    let target = registry::find_ship_by_name(state, wanted)
        .filter(|id| *id != actor)
        .ok_or_else(|| CommandError::UnknownShip(wanted.clone()))?;
    let other = registry::ship(state, target).ok_or(CommandError::UnknownShip(wanted.clone()))?;
    if other.side != ship.side {
        return Err(CommandError::WrongSide(other.side));
    }
    if !ship.position.is_adjacent(other.position) {
        return Err(CommandError::NotAdjacent(other.position));
    }
    let room = c.max_ship_energy - other.energy;
    if room <= 0.0 {
        return Err(CommandError::Rejected(format!(
            "{} cannot accept more energy.",
            other.name
        )));
    }
    let sent = requested.min(room);
    let received = (sent * ENERGY_TRANSIT_KEPT).floor();
    let (name, other_name) = (ship.name.clone(), other.name.clone());
    if let Some(s) = registry::ship_mut(state, actor) {
        s.energy -= sent;
    }
    if let Some(s) = registry::ship_mut(state, target) {
        s.energy += received;
    }
    notify(
        state,
        out,
        actor,
        format!("{sent:.0} units sent to {other_name}; {received:.0} received (10% lost in transmission)."),
    );
    notify(state, out, target, format!("Received {received:.0} units of energy from {name}."));
    Ok(Completion::TIMED)
}

pub fn repair(
    state: &mut GameState,
    content: &GameContent,
    actor: ActorId,
    args: &[String],
) -> CommandResult<Completion> {
    let c = &content.constants;
    let ship = own_ship(state, actor)?;
    let docked = ship.docked_at.is_some();
    let amount = match args.first() {
        Some(token) => f64::from(number(token)?),
        None if docked => REPAIR_UNITS_DOCKED,
        None => REPAIR_UNITS,
    };
    if amount <= 0.0 {
        return Err(CommandError::Usage(REPAIR_USAGE));
    }
    let intact = ship.devices.iter().all(|(_, level)| level <= 0.0)
        && ship.energy >= c.max_ship_energy
        && ship.shield_energy >= c.max_shield_energy;
    if intact {
        return Err(CommandError::Rejected(
            "All systems are fully operational. No repairs needed.".to_string(),
        ));
    }
    let mut delay = amount * c.repair_ms_per_unit as f64;
    if docked {
        delay /= 2.0;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let delay_ms = delay as u64;
    Ok(Completion::Delayed {
        delay_ms,
        action: DelayedAction::Repair { amount },
    })
}

pub fn finish_repair(
    state: &mut GameState,
    content: &GameContent,
    out: &mut Outbox,
    actor: ActorId,
    amount: f64,
) -> CommandResult<()> {
    let c = &content.constants;
    let Some(ship) = registry::ship_mut(state, actor) else {
        return Err(CommandError::NoShip);
    };
    let before: f64 = ship.devices.iter().map(|(_, level)| level).sum();
    ship.devices.repair_all(amount);
    let after: f64 = ship.devices.iter().map(|(_, level)| level).sum();

    let mut restored = Vec::new();
    if ship.shield_energy < c.max_shield_energy && ship.energy >= SHIELD_REPAIR_COST {
        ship.energy -= SHIELD_REPAIR_COST;
        ship.shield_energy = (ship.shield_energy + SHIELD_REPAIR_AMOUNT).min(c.max_shield_energy);
        restored.push("shields");
    }
    if ship.energy < c.max_ship_energy {
        ship.energy = (ship.energy + ENERGY_REPAIR_AMOUNT).min(c.max_ship_energy);
        restored.push("energy");
    }
    let fixed = before - after;
    let text = if restored.is_empty() {
        format!("Repair completed. Devices repaired: {fixed:.0} units.")
    } else {
        format!(
            "Repair completed. Devices repaired: {fixed:.0} units. Restored: {}.",
            restored.join(", ")
        )
    };
    notify(state, out, actor, text);
    Ok(())
}
