//! PHASERS and TORPEDOES.

use rand::Rng;
use smallvec::SmallVec;

use super::args::{float, is_number, number, own_ship, point, take_mode};
use super::Completion;
use crate::combat::{
    self, launch_torpedo, phaser_hit, HitKind, HitReport, Shooter, Target, TorpedoOutcome,
};
use crate::comms::{notify, publish, Outbox};
use crate::error::{CommandError, CommandResult};
use crate::random::{iran, ran};
use crate::registry::{self, Occupant};
use crate::{ActorId, CoordMode, DelayedAction, Device, Event, GameContent, GameState, Position};

const PHASER_USAGE: &str = "PHASERS [A|R|C] [power] <vertical> <horizontal> | PHASERS C [power] <ship>";
const TORPEDO_USAGE: &str = "TORPEDOES [A|R|C] <count> <target> [<target> ...]";
const OVERHEAT_PERCENT_DIVISOR: f64 = 7.7;
const OVERHEAT_MIN_DAMAGE: f64 = 300.0;
const OVERHEAT_DAMAGE_SPREAD: u32 = 601;
const TORPEDO_RELOAD_MS: f64 = 2000.0;

pub fn phasers(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
    actor: ActorId,
    args: &[String],
) -> CommandResult<Completion> {
    let c = &content.constants;
    let ship = own_ship(state, actor)?;
    if ship.device_inoperative(Device::Phaser, c) {
        return Err(CommandError::DeviceInoperative(Device::Phaser));
    }
    let (mode, rest) = take_mode(state, actor, args);
    let power_given = match mode {
        CoordMode::Computed => rest.len() >= 2 && is_number(&rest[0]),
        CoordMode::Absolute | CoordMode::Relative => rest.len() >= 3,
    };
    let (requested, rest) = if power_given {
        (float(&rest[0])?, &rest[1..])
    } else {
        (c.phaser_default_power, rest)
    };
    let (aim, _) = point(state, content, actor, mode, rest, PHASER_USAGE)?;
    let ship = own_ship(state, actor)?;
    let distance = ship.position.distance(aim);
    if distance > c.phaser_range {
        return Err(CommandError::OutOfRange {
            distance,
            max: c.phaser_range,
        });
    }
    let target = match registry::object_at(state, aim) {
        Occupant::Ship(id) if id != actor => Target::Ship(id),
        Occupant::Planet(id) => Target::Planet(id),
        _ => return Err(CommandError::NoTarget(aim)),
    };

    let now = state.meta.now_ms;
    let bank = usize::from(ship.phaser_banks[1] < ship.phaser_banks[0]);
    if ship.phaser_banks[bank] > now {
        return Err(CommandError::PhasersRecharging);
    }
    let level = ship.devices.get(Device::Phaser);
    if ship.device_damaged(Device::Phaser, c) && ran(rng) < level / c.device_inoperative_damage {
        return Err(CommandError::DeviceMalfunction(Device::Phaser));
    }
    let surcharge = if ship.shields_up && ship.shield_energy > 0.0 {
        c.phaser_shield_surcharge
    } else {
        0.0
    };
    let power = requested.clamp(c.phaser_min_power, c.phaser_max_power);
    let affordable = ship.energy - surcharge;
    if affordable <= 0.0 {
        return Err(CommandError::InsufficientEnergy {
            needed: crate::scoring::points(power + surcharge),
            available: crate::scoring::points(ship.energy),
        });
    }
    let power = power.min(affordable);
    let shooter = Shooter::from_ship(state, content, actor).ok_or(CommandError::NoShip)?;
    let label = target_label(state, target);

    let cooldown = c.phaser_cooldown_ms as f64 * (1.0 + ran(rng)) + level;
    let overheat = power > c.phaser_overheat_power
        && ran(rng) * 100.0 < (power - c.phaser_overheat_power) / OVERHEAT_PERCENT_DIVISOR;
    let overheat_damage = OVERHEAT_MIN_DAMAGE + f64::from(iran(rng, OVERHEAT_DAMAGE_SPREAD));
    if let Some(ship) = registry::ship_mut(state, actor) {
        ship.energy -= power + surcharge;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let ready = now + cooldown as u64;
        ship.phaser_banks[bank] = ready;
        if overheat {
            ship.devices.add(Device::Phaser, overheat_damage);
        }
    }
    if overheat {
        notify(state, out, actor, "Phaser banks overheated!");
    }

    publish(
        state,
        out,
        Event::PhaserFired {
            shooter: Some(actor),
            from: shooter.position,
            to: aim,
            power,
        },
    );
    let phit = (power / c.phaser_power_divisor).floor();
    let report = phaser_hit(state, content, rng, out, shooter, target, phit);
    describe_hit(state, out, actor, "Phaser", &label, aim, &report);
    let attacker = registry::ship(state, actor).map_or_else(String::new, |s| s.name.clone());
    combat::report_to_victim(state, out, &attacker, "phasers", &report);
    Ok(Completion::TIMED)
}

pub fn torpedoes(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
    actor: ActorId,
    args: &[String],
) -> CommandResult<Completion> {
    let c = &content.constants;
    let ship = own_ship(state, actor)?;
    if ship.device_inoperative(Device::Torpedo, c) {
        return Err(CommandError::DeviceInoperative(Device::Torpedo));
    }
    let (mode, rest) = take_mode(state, actor, args);
    let (count, mut rest) = rest
        .split_first()
        .ok_or(CommandError::Usage(TORPEDO_USAGE))?;
    let count = number(count)?;
    let max = i32::try_from(c.max_torpedoes_per_volley).unwrap_or(i32::MAX);
    if !(1..=max).contains(&count) {
        return Err(CommandError::Usage(TORPEDO_USAGE));
    }
    let count = count.unsigned_abs();
    if count > ship.torpedoes {
        return Err(CommandError::InsufficientTorpedoes {
            available: ship.torpedoes,
        });
    }
    let origin = ship.position;

    let mut aims: SmallVec<[Position; 3]> = SmallVec::new();
    for _ in 0..count {
        if rest.is_empty() {
            if let Some(last) = aims.last().copied() {
                aims.push(last);
                continue;
            }
        }
        let (aim, remaining) = point(state, content, actor, mode, rest, TORPEDO_USAGE)?;
        if aim == origin {
            return Err(CommandError::NoTarget(aim));
        }
        aims.push(aim);
        rest = remaining;
    }

    for aim in aims {
        let Some(shooter) = Shooter::from_ship(state, content, actor) else {
            return Ok(Completion::TIMED);
        };
        if let Some(ship) = registry::ship_mut(state, actor) {
            ship.torpedoes -= 1;
        }
        let outcome = launch_torpedo(state, content, rng, out, shooter, aim);
        describe_torpedo(state, out, actor, &outcome);
    }

    let Some(ship) = registry::ship(state, actor) else {
        return Ok(Completion::TIMED);
    };
    let delay = TORPEDO_RELOAD_MS * (1.0 + ran(rng)) + ship.devices.get(Device::Torpedo) / 100.0;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let delay_ms = delay as u64;
    Ok(Completion::Delayed {
        delay_ms,
        action: DelayedAction::TorpedoVolley,
    })
}

pub fn finish_volley(state: &GameState, out: &mut Outbox, actor: ActorId) -> CommandResult<()> {
    if let Some(ship) = registry::ship(state, actor) {
        let left = ship.torpedoes;
        notify(state, out, actor, format!("Torpedo tubes reloaded; {left} remaining."));
    }
    Ok(())
}

fn target_label(state: &GameState, target: Target) -> String {
    match target {
        Target::Ship(id) => registry::ship(state, id).map_or_else(String::new, |s| s.name.clone()),
        Target::Planet(id) => match registry::planet(state, id) {
            Some(p) if p.is_base => format!("{} base", p.side),
            Some(_) | None => "planet".to_string(),
        },
    }
}

fn describe_hit(
    state: &GameState,
    out: &mut Outbox,
    actor: ActorId,
    weapon: &str,
    label: &str,
    at: Position,
    report: &HitReport,
) {
    let mut text = match report.kind {
        HitKind::Hit => format!("{weapon} hit on {label} at {at}: {:.0} units.", report.hull),
        HitKind::Deflected => format!("{weapon} deflected by the {label}'s shields."),
        HitKind::InstallationsDamaged => format!("{weapon} damaged installations on the {label} at {at}."),
        HitKind::NoEffect => format!("{weapon} had no effect on the {label} at {at}."),
    };
    if report.critical {
        text.push_str(" Critical hit!");
    }
    if report.destroyed {
        text.push_str(&format!(" The {label} is destroyed."));
    }
    notify(state, out, actor, text);
}

fn describe_torpedo(state: &GameState, out: &mut Outbox, actor: ActorId, outcome: &TorpedoOutcome) {
    match outcome {
        TorpedoOutcome::Struck(report) => {
            let label = match report.target {
                Target::Ship(_) => "ship".to_string(),
                Target::Planet(id) => registry::planet(state, id)
                    .map_or_else(|| "planet".to_string(), |p| {
                        if p.is_base {
                            format!("{} base", p.side)
                        } else {
                            "planet".to_string()
                        }
                    }),
            };
            let at = match report.target {
                Target::Ship(id) => registry::ship(state, id).map(|s| s.position),
                Target::Planet(id) => registry::planet(state, id).map(|p| p.position),
            }
            .unwrap_or_default();
            describe_hit(state, out, actor, "Torpedo", &label, at, report);
            let attacker = registry::ship(state, actor).map_or_else(String::new, |s| s.name.clone());
            combat::report_to_victim(state, out, &attacker, "torpedo", report);
        }
        TorpedoOutcome::Nova(at) => notify(state, out, actor, format!("Torpedo ignited the star at {at}!")),
        TorpedoOutcome::StarUnaffected(at) => {
            notify(state, out, actor, format!("Torpedo struck the star at {at} without effect."));
        }
        TorpedoOutcome::Swallowed(at) => {
            notify(state, out, actor, format!("Torpedo lost in the black hole at {at}."));
        }
        TorpedoOutcome::Fizzled(at) => notify(state, out, actor, format!("Torpedo missed; it fizzled out at {at}.")),
    }
}
