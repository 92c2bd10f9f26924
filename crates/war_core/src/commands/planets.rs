//! BUILD, CAPTURE and DOCK: everything done next to a planet.

use rand::Rng;
use tracing::info;

use super::args::{jittered_delay, own_ship, point, take_mode};
use super::Completion;
use crate::comms::{notify, notify_all, publish, Outbox};
use crate::error::{CommandError, CommandResult};
use crate::registry;
use crate::scoring::ScoreCategory;
use crate::{
    ActorId, CaptureLock, CoordMode, DelayedAction, Device, Event, GameContent, GameState,
    Planet, PlanetId, Side,
};

const BUILD_USAGE: &str = "BUILD [A|R] <vertical> <horizontal>";
const CAPTURE_USAGE: &str = "CAPTURE [A|R] <vertical> <horizontal>";
const CAPTURE_COST_PER_BUILD: f64 = 50.0;
const CAPTURE_MS_PER_BUILD: u64 = 30;
const CAPTURE_OWNED_EXTRA_MS: u64 = 500;

/// Resupply from one dock.
struct DockRates {
    energy: f64,
    shields: f64,
    torpedoes: u32,
    repair: f64,
    docked_bonus: f64,
}

const BASE_DOCK: DockRates = DockRates {
    energy: 1000.0,
    shields: 500.0,
    torpedoes: 10,
    repair: 100.0,
    docked_bonus: 200.0,
};

const PLANET_DOCK: DockRates = DockRates {
    energy: 500.0,
    shields: 250.0,
    torpedoes: 5,
    repair: 50.0,
    docked_bonus: 100.0,
};

/// Resolve the planet a command points at: explicit coordinates, or the first
/// adjacent planet accepted by `fallback` when no coordinates were given.
fn target_planet(
    state: &GameState,
    content: &GameContent,
    actor: ActorId,
    args: &[String],
    usage: &'static str,
    fallback: impl Fn(&Planet) -> bool,
) -> CommandResult<PlanetId> {
    let ship = own_ship(state, actor)?;
    if args.is_empty() {
        return registry::adjacent_planet(state, ship.position, fallback)
            .ok_or(CommandError::NothingAdjacent("planet"));
    }
    let (mode, rest) = take_mode(state, actor, args);
    if mode == CoordMode::Computed {
        return Err(CommandError::Usage(usage));
    }
    let (at, _) = point(state, content, actor, mode, rest, usage)?;
    if !ship.position.is_adjacent(at) {
        return Err(CommandError::NotAdjacent(at));
    }
    state
        .planets
        .iter()
        .find(|p| p.position == at)
        .map(|p| p.id)
        .ok_or(CommandError::NoTarget(at))
}

fn adjacent(state: &GameState, actor: ActorId, planet: PlanetId) -> CommandResult<&Planet> {
    let ship = own_ship(state, actor)?;
    let p = registry::planet(state, planet).ok_or(CommandError::NothingAdjacent("planet"))?;
    if !ship.position.is_adjacent(p.position) {
        return Err(CommandError::NotAdjacent(p.position));
    }
    Ok(p)
}

// ---------------------------------------------------------------------------
// BUILD
// ---------------------------------------------------------------------------

fn check_buildable(
    state: &GameState,
    content: &GameContent,
    actor: ActorId,
    planet: PlanetId,
) -> CommandResult<()> {
    let side = own_ship(state, actor)?.side;
    let p = adjacent(state, actor, planet)?;
    if p.side != side {
        return Err(CommandError::WrongSide(p.side));
    }
    if p.is_base || p.builds >= content.constants.max_builds_per_planet {
        return Err(CommandError::BuildLimit);
    }
    Ok(())
}

pub fn build(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    actor: ActorId,
    args: &[String],
) -> CommandResult<Completion> {
    let side = own_ship(state, actor)?.side;
    let max = content.constants.max_builds_per_planet;
    let planet = target_planet(state, content, actor, args, BUILD_USAGE, |p| {
        p.side == side && !p.is_base && p.builds < max
    })?;
    check_buildable(state, content, actor, planet)?;
    let c = &content.constants;
    Ok(Completion::Delayed {
        delay_ms: jittered_delay(rng, c.build_delay_min_ms, c.build_delay_range_ms),
        action: DelayedAction::Build { planet },
    })
}

pub fn finish_build(
    state: &mut GameState,
    content: &GameContent,
    out: &mut Outbox,
    actor: ActorId,
    planet: PlanetId,
) -> CommandResult<()> {
    check_buildable(state, content, actor, planet)?;
    let side = own_ship(state, actor)?.side;
    let Some(p) = registry::planet_mut(state, planet) else {
        return Err(CommandError::NothingAdjacent("planet"));
    };
    p.builds += 1;
    let builds = p.builds;
    let at = p.position;
    publish(state, out, Event::PlanetBuildsChanged { planet, builds });

    if builds < content.constants.max_builds_per_planet {
        let plural = if builds == 1 { "" } else { "s" };
        notify(
            state,
            out,
            actor,
            format!("One build added. Planet at {at} now has {builds} build{plural}."),
        );
        return Ok(());
    }
    if registry::promote_to_base(state, content, out, planet) {
        state
            .ledger
            .credit(Some(actor), side, ScoreCategory::BasesBuilt, 1);
        notify(
            state,
            out,
            actor,
            format!("Planet at {at} has been promoted to a fully operational starbase."),
        );
        notify_all(state, out, None, &format!("A new {side} starbase is operational at {at}."));
    } else {
        notify(
            state,
            out,
            actor,
            format!("Planet at {at} is fully fortified, but the {side} already has its maximum number of starbases."),
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CAPTURE
// ---------------------------------------------------------------------------

fn check_capturable(state: &GameState, actor: ActorId, planet: PlanetId) -> CommandResult<()> {
    let ship = own_ship(state, actor)?;
    let p = adjacent(state, actor, planet)?;
    if p.side == ship.side {
        return Err(CommandError::WrongSide(p.side));
    }
    if p.is_base {
        return Err(CommandError::BaseNotCapturable);
    }
    Ok(())
}

pub fn capture(
    state: &mut GameState,
    content: &GameContent,
    actor: ActorId,
    args: &[String],
) -> CommandResult<Completion> {
    let side = own_ship(state, actor)?.side;
    let planet = target_planet(state, content, actor, args, CAPTURE_USAGE, |p| {
        p.side != side && !p.is_base
    })?;
    check_capturable(state, actor, planet)?;
    let ship = own_ship(state, actor)?;
    if ship.shields_up && ship.shield_energy > 0.0 {
        return Err(CommandError::ShieldsUp);
    }
    let p = adjacent(state, actor, planet)?;
    if p.capture_lock.is_some_and(|l| l.holder != actor) {
        return Err(CommandError::CaptureInProgress);
    }
    let cost = f64::from(p.builds) * CAPTURE_COST_PER_BUILD;
    if ship.energy < cost {
        return Err(CommandError::InsufficientEnergy {
            needed: crate::scoring::points(cost),
            available: crate::scoring::points(ship.energy),
        });
    }
    let mut delay_ms = u64::from(p.builds) * CAPTURE_MS_PER_BUILD + content.constants.capture_delay_min_ms;
    if p.side != Side::Neutral {
        delay_ms += CAPTURE_OWNED_EXTRA_MS;
    }

    let since_ms = state.meta.now_ms;
    if let Some(p) = registry::planet_mut(state, planet) {
        p.capture_lock = Some(CaptureLock {
            holder: actor,
            since_ms,
        });
    }
    if let Some(ship) = registry::ship_mut(state, actor) {
        ship.energy -= cost;
    }
    Ok(Completion::Delayed {
        delay_ms,
        action: DelayedAction::Capture { planet, cost },
    })
}

pub fn finish_capture(
    state: &mut GameState,
    out: &mut Outbox,
    actor: ActorId,
    planet: PlanetId,
) -> CommandResult<()> {
    let held = registry::planet(state, planet)
        .and_then(|p| p.capture_lock)
        .is_some_and(|l| l.holder == actor);
    if let Some(p) = registry::planet_mut(state, planet) {
        if held {
            p.capture_lock = None;
        }
    }
    check_capturable(state, actor, planet)?;
    let ship = own_ship(state, actor)?;
    let (side, name) = (ship.side, ship.name.clone());
    let Some(p) = registry::planet_mut(state, planet) else {
        return Err(CommandError::NothingAdjacent("planet"));
    };
    let previous = p.side;
    let at = p.position;
    if p.builds > 0 {
        p.builds -= 1;
        let builds = p.builds;
        publish(state, out, Event::PlanetBuildsChanged { planet, builds });
        notify(
            state,
            out,
            actor,
            format!("One build removed. Planet now has {builds} builds."),
        );
        if builds > 0 {
            return Ok(());
        }
    }

    if let Some(p) = registry::planet_mut(state, planet) {
        p.side = side;
    }
    state
        .ledger
        .credit(Some(actor), side, ScoreCategory::PlanetsCaptured, 1);
    info!(%actor, planet = %planet, %side, "planet captured");
    publish(
        state,
        out,
        Event::PlanetCaptured {
            planet,
            side,
            by: actor,
        },
    );
    let news = if previous == Side::Neutral {
        format!("{name} has captured a neutral planet at {at}.")
    } else {
        format!("{name} has captured a planet at {at} from the {previous}.")
    };
    notify_all(state, out, Some(actor), &news);
    notify(state, out, actor, format!("You captured the planet at {at}."));
    Ok(())
}

// ---------------------------------------------------------------------------
// DOCK
// ---------------------------------------------------------------------------

fn check_dockable(state: &GameState, actor: ActorId, planet: PlanetId) -> CommandResult<()> {
    let side = own_ship(state, actor)?.side;
    let p = adjacent(state, actor, planet)?;
    if p.side != side {
        return Err(CommandError::WrongSide(p.side));
    }
    Ok(())
}

pub fn dock(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    actor: ActorId,
) -> CommandResult<Completion> {
    let ship = own_ship(state, actor)?;
    let side = ship.side;
    // A base next door wins over a plain planet.
    let planet = registry::adjacent_planet(state, ship.position, |p| p.side == side && p.is_base)
        .or_else(|| registry::adjacent_planet(state, ship.position, |p| p.side == side))
        .ok_or(CommandError::NothingAdjacent("friendly base or planet"))?;
    check_dockable(state, actor, planet)?;
    let c = &content.constants;
    Ok(Completion::Delayed {
        delay_ms: jittered_delay(rng, c.dock_delay_min_ms, c.dock_delay_range_ms),
        action: DelayedAction::Dock { planet },
    })
}

pub fn finish_dock(
    state: &mut GameState,
    content: &GameContent,
    out: &mut Outbox,
    actor: ActorId,
    planet: PlanetId,
) -> CommandResult<()> {
    check_dockable(state, actor, planet).map_err(|_| {
        CommandError::Rejected("Docking aborted: target no longer available.".to_string())
    })?;
    let is_base = registry::planet(state, planet).is_some_and(|p| p.is_base);
    let rates = if is_base { &BASE_DOCK } else { &PLANET_DOCK };
    let c = &content.constants;
    let Some(ship) = registry::ship_mut(state, actor) else {
        return Err(CommandError::NoShip);
    };
    let fully_supplied = ship.energy >= c.max_ship_energy
        && ship.shield_energy >= c.max_shield_energy
        && ship.torpedoes >= c.max_torpedoes
        && ship.damage <= 0.0;
    let bonus = if ship.docked_at == Some(planet) {
        rates.docked_bonus
    } else {
        0.0
    };
    ship.docked_at = Some(planet);
    ship.energy = (ship.energy + rates.energy).min(c.max_ship_energy);
    ship.shield_energy = (ship.shield_energy + rates.shields).min(c.max_shield_energy);
    ship.shields_up = false;
    ship.torpedoes = (ship.torpedoes + rates.torpedoes).min(c.max_torpedoes);
    ship.damage = (ship.damage - rates.repair - bonus).max(0.0);
    ship.devices.set(Device::LifeSupport, 0.0);
    ship.life_support_reserve = c.life_support_reserve;

    publish(state, out, Event::ShipDocked { actor, planet });
    let text = if fully_supplied {
        "Docking has no effect. Ship fully supplied."
    } else {
        "Docking complete. Supplies replenished."
    };
    notify(state, out, actor, text);
    Ok(())
}
