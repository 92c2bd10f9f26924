//! Weapon resolution against ships and bases.
//!
//! Both weapon families run the same pipeline once the shield model has split a
//! hit into hull damage and shield drain: shield write-back, base collapse,
//! ship critical hit, hull application, scoring, destruction.

use rand::Rng;
use smallvec::SmallVec;
use tracing::{debug, info};

use crate::comms::{notify, notify_all, publish, Outbox};
use crate::random::{iran, ran};
use crate::registry::{self, Occupant};
use crate::scoring::{points, ScoreCategory};
use crate::{
    nova, path, romulan, ActorId, Device, Event, GameContent, GameState, PlanetId, Position, Side,
};

/// Shield percentage at or above which a hit is treated as fully absorbed.
const FULL_SHIELD_PCT: f64 = 999.999;
const SHIELDED_POWER_FACTOR: f64 = 40.0;
const UNSHIELDED_POWER_FACTOR: f64 = 80.0;
const IMPAIRED_PENALTY: f64 = 0.8;
const PLANET_INSTALLATION_HIT_CHANCE: f64 = 0.25;
const TORPEDO_SCALE: f64 = 0.9;
const SHIP_KILL_POINTS: i64 = 5000;
const BASE_KILL_POINTS: i64 = 10_000;

// ---------------------------------------------------------------------------
// Participants
// ---------------------------------------------------------------------------

/// Whoever pulls the trigger: a ship, an installation, or the Romulan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shooter {
    pub actor: Option<ActorId>,
    pub side: Side,
    pub position: Position,
    /// Weapon or targeting computer damaged.
    pub impaired: bool,
}

impl Shooter {
    pub fn from_ship(state: &GameState, content: &GameContent, actor: ActorId) -> Option<Shooter> {
        let ship = registry::ship(state, actor)?;
        let c = &content.constants;
        Some(Shooter {
            actor: Some(actor),
            side: ship.side,
            position: ship.position,
            impaired: ship.device_damaged(Device::Phaser, c)
                || ship.device_damaged(Device::Computer, c),
        })
    }

    pub fn installation(side: Side, position: Position) -> Shooter {
        Shooter {
            actor: None,
            side,
            position,
            impaired: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Ship(ActorId),
    Planet(PlanetId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitKind {
    Hit,
    Deflected,
    InstallationsDamaged,
    NoEffect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HitReport {
    pub target: Target,
    pub kind: HitKind,
    /// Ship: hull damage added. Base: energy removed by the hull stage.
    pub hull: f64,
    pub shield_pct_before: f64,
    pub shield_pct_after: f64,
    pub critical: bool,
    pub crit_device: Option<Device>,
    pub collapse_penalty: Option<f64>,
    pub destroyed: bool,
}

impl HitReport {
    fn new(target: Target, kind: HitKind) -> Self {
        Self {
            target,
            kind,
            hull: 0.0,
            shield_pct_before: 0.0,
            shield_pct_after: 0.0,
            critical: false,
            crit_device: None,
            collapse_penalty: None,
            destroyed: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Shield model
// ---------------------------------------------------------------------------

/// Convert a raw reserve to the 0..1000 scale.
pub fn shield_percent(energy: f64, max: f64) -> f64 {
    if max <= 0.0 {
        return 0.0;
    }
    (energy / max * 1000.0).clamp(0.0, 1000.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShieldProfile {
    pub pct: f64,
    pub is_base: bool,
    pub shields_up: bool,
}

impl ShieldProfile {
    pub fn treated_as_shielded(self) -> bool {
        self.is_base || (self.shields_up && self.pct > 0.0)
    }
}

/// Hull damage and shield drain from one hit, before crits and scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Absorption {
    pub hull: f64,
    pub pct_before: f64,
    pub pct_after: f64,
    pub shielded: bool,
}

/// Directed-energy core. `phit` is already on the internal scale.
pub fn absorb_phaser(
    rng: &mut impl Rng,
    profile: ShieldProfile,
    distance: i32,
    impaired: bool,
    phit: f64,
) -> Absorption {
    let mut falloff = (0.90 + 0.02 * ran(rng)).powi(distance);
    if impaired {
        falloff *= IMPAIRED_PENALTY;
    }
    let pct = profile.pct;
    let shielded = profile.treated_as_shielded();
    if !shielded {
        return Absorption {
            hull: falloff * UNSHIELDED_POWER_FACTOR * phit,
            pct_before: pct,
            pct_after: pct,
            shielded,
        };
    }
    let through = falloff * (1000.0 - pct) * 0.001;
    let drain = (falloff * SHIELDED_POWER_FACTOR * phit * (pct * 0.001).max(0.1) + 10.0) * 0.03;
    let hull = if pct >= FULL_SHIELD_PCT {
        0.0
    } else {
        through * SHIELDED_POWER_FACTOR * phit
    };
    Absorption {
        hull,
        pct_before: pct,
        pct_after: (pct - drain).clamp(0.0, 1000.0),
        shielded,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TorpedoAbsorption {
    Deflected { drain: f64, pct_after: f64 },
    Penetrated(Absorption),
}

/// Projectile core: deflection test, then the same penetration and drain shape.
pub fn absorb_torpedo(rng: &mut impl Rng, profile: ShieldProfile) -> TorpedoAbsorption {
    let hit = 4000.0 + 4000.0 * ran(rng);
    let pct = profile.pct;
    if !profile.treated_as_shielded() {
        return TorpedoAbsorption::Penetrated(Absorption {
            hull: hit,
            pct_before: pct,
            pct_after: pct,
            shielded: false,
        });
    }
    let rana = ran(rng);
    let ranb = ran(rng);
    if rana - pct * 0.001 * ranb + 0.1 <= 0.0 {
        let mut drain = 50.0 * rana;
        if drain > 0.0 && drain < 1.0 {
            drain = 1.0;
        }
        return TorpedoAbsorption::Deflected {
            drain,
            pct_after: (pct - drain).max(0.0),
        };
    }
    let hull = if pct >= FULL_SHIELD_PCT {
        0.0
    } else {
        hit * (1000.0 - pct) * 0.001
    };
    let drain = (hit * (pct * 0.001).max(0.1) + 10.0) * 0.03;
    TorpedoAbsorption::Penetrated(Absorption {
        hull,
        pct_before: pct,
        pct_after: (pct - drain).clamp(0.0, 1000.0),
        shielded: true,
    })
}

fn profile_of(state: &GameState, content: &GameContent, target: Target) -> Option<ShieldProfile> {
    let c = &content.constants;
    match target {
        Target::Ship(actor) => {
            let ship = registry::ship(state, actor)?;
            if ship.is_destroyed(c) {
                return None;
            }
            Some(ShieldProfile {
                pct: shield_percent(ship.shield_energy, c.max_shield_energy),
                is_base: false,
                shields_up: ship.shields_up,
            })
        }
        Target::Planet(id) => {
            let planet = registry::planet(state, id)?;
            if planet.is_base && planet.energy <= 0.0 {
                return None;
            }
            Some(ShieldProfile {
                pct: shield_percent(planet.energy, c.max_base_energy),
                is_base: planet.is_base,
                shields_up: planet.is_base,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Resolve one phaser shot. `phit` is already on the internal scale.
pub fn phaser_hit(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
    shooter: Shooter,
    target: Target,
    phit: f64,
) -> HitReport {
    if let Some(report) = plain_planet_hit(state, out, target, rng) {
        return report;
    }
    let Some(profile) = profile_of(state, content, target) else {
        return HitReport::new(target, HitKind::NoEffect);
    };
    let distance = target_position(state, target).map_or(0, |p| p.distance(shooter.position));
    let absorption = absorb_phaser(rng, profile, distance, shooter.impaired, phit);
    land_hit(state, content, rng, out, shooter, target, absorption, 1.0)
}

/// Resolve one torpedo striking `target`.
pub fn torpedo_hit(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
    shooter: Shooter,
    target: Target,
) -> HitReport {
    // Torpedoes do nothing to an unfortified planet.
    if is_plain_planet(state, target) {
        return HitReport::new(target, HitKind::NoEffect);
    }
    let Some(profile) = profile_of(state, content, target) else {
        return HitReport::new(target, HitKind::NoEffect);
    };
    match absorb_torpedo(rng, profile) {
        TorpedoAbsorption::Deflected { drain, pct_after } => {
            write_shields(state, content, target, pct_after);
            debug!(?target, drain, "torpedo deflected");
            let mut report = HitReport::new(target, HitKind::Deflected);
            report.shield_pct_before = profile.pct;
            report.shield_pct_after = pct_after;
            report
        }
        TorpedoAbsorption::Penetrated(absorption) => land_hit(
            state,
            content,
            rng,
            out,
            shooter,
            target,
            absorption,
            TORPEDO_SCALE,
        ),
    }
}

/// Plain planets take installation damage only. Returns `None` for ships and bases.
fn plain_planet_hit(
    state: &mut GameState,
    out: &mut Outbox,
    target: Target,
    rng: &mut impl Rng,
) -> Option<HitReport> {
    let Target::Planet(id) = target else {
        return None;
    };
    let planet = registry::planet_mut(state, id)?;
    if planet.is_base {
        return None;
    }
    let strikes = ran(rng) < PLANET_INSTALLATION_HIT_CHANCE;
    if !strikes || planet.builds == 0 {
        return Some(HitReport::new(target, HitKind::NoEffect));
    }
    planet.builds -= 1;
    let builds = planet.builds;
    publish(state, out, Event::PlanetBuildsChanged { planet: id, builds });
    Some(HitReport::new(target, HitKind::InstallationsDamaged))
}

fn is_plain_planet(state: &GameState, target: Target) -> bool {
    match target {
        Target::Planet(id) => registry::planet(state, id).is_some_and(|p| !p.is_base),
        Target::Ship(_) => false,
    }
}

fn target_position(state: &GameState, target: Target) -> Option<Position> {
    match target {
        Target::Ship(actor) => registry::ship(state, actor).map(|s| s.position),
        Target::Planet(id) => registry::planet(state, id).map(|p| p.position),
    }
}

fn target_side(state: &GameState, target: Target) -> Side {
    match target {
        Target::Ship(actor) => registry::ship(state, actor).map_or(Side::Neutral, |s| s.side),
        Target::Planet(id) => registry::planet(state, id).map_or(Side::Neutral, |p| p.side),
    }
}

fn write_shields(state: &mut GameState, content: &GameContent, target: Target, pct: f64) {
    let c = &content.constants;
    match target {
        Target::Ship(actor) => {
            if let Some(ship) = registry::ship_mut(state, actor) {
                ship.shield_energy = (pct * 0.001 * c.max_shield_energy).max(0.0);
            }
        }
        Target::Planet(id) => {
            if let Some(planet) = registry::planet_mut(state, id) {
                planet.energy = (pct * 0.001 * c.max_base_energy).max(0.0);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Shared pipeline
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn land_hit(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
    shooter: Shooter,
    target: Target,
    absorption: Absorption,
    scale: f64,
) -> HitReport {
    let mut report = HitReport::new(target, HitKind::Hit);
    report.shield_pct_before = absorption.pct_before;
    report.shield_pct_after = absorption.pct_after;
    let victim_side = target_side(state, target);
    if absorption.shielded {
        write_shields(state, content, target, absorption.pct_after);
    }
    let mut hull = absorption.hull;

    match target {
        Target::Planet(id) => {
            if absorption.pct_before > 0.0 && absorption.pct_after <= 0.0 {
                let destroyed = collapse_base(state, rng, out, shooter, id, &mut report);
                if destroyed {
                    return report;
                }
            }
            hull *= scale;
            let loss = if hull > 0.0 { (hull * 0.01).max(1.0) } else { 0.0 };
            let mut remaining = 0.0;
            if let Some(planet) = registry::planet_mut(state, id) {
                planet.energy = (planet.energy - loss).max(0.0);
                remaining = planet.energy;
            }
            report.hull = loss;
            credit_damage(state, shooter, victim_side, ScoreCategory::DamageToBases, hull);
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
                report.destroyed = kill_base(state, out, shooter, id);
            }
        }
        Target::Ship(actor) => {
            let is_romulan = state.actors.get(&actor).is_some_and(crate::Actor::is_romulan);
            if !is_romulan {
                if let Some(ship) = registry::ship_mut(state, actor) {
                    let threshold = content.constants.critical_hit_threshold;
                    let (after, device) = critical_check(rng, ship, hull, threshold);
                    report.critical = device.is_some();
                    report.crit_device = device;
                    hull = after;
                }
            }
            hull *= scale;
            report.hull = hull;
            report.destroyed = if is_romulan {
                romulan::absorb_hit(state, content, out, shooter, actor, hull)
            } else {
                apply_ship_hull(state, content, rng, out, shooter, actor, victim_side, &mut report)
            };
        }
    }
    report
}

/// Base shields hit zero this shot: extra energy loss, maybe outright destruction.
fn collapse_base(
    state: &mut GameState,
    rng: &mut impl Rng,
    out: &mut Outbox,
    shooter: Shooter,
    id: PlanetId,
    report: &mut HitReport,
) -> bool {
    let penalty = 50.0 + f64::from(iran(rng, 100));
    let mut energy = 0.0;
    if let Some(planet) = registry::planet_mut(state, id) {
        planet.energy = (planet.energy - penalty).max(0.0);
        energy = planet.energy;
    }
    report.critical = true;
    report.collapse_penalty = Some(penalty);
    publish(state, out, Event::BaseCollapsed { planet: id, penalty });
    if ran(rng) < 0.1 || energy <= 0.0 {
        report.destroyed = kill_base(state, out, shooter, id);
        return true;
    }
    false
}

/// Crit rule shared by every weapon. Returns the post-crit hull and the device hit, if any.
fn critical_check(
    rng: &mut impl Rng,
    ship: &mut crate::Ship,
    hull: f64,
    threshold: f64,
) -> (f64, Option<Device>) {
    if hull * (ran(rng) + 0.1) < threshold {
        return (hull, None);
    }
    let halved = hull / 2.0;
    #[allow(clippy::cast_possible_truncation)]
    let device = Device::ALL[iran(rng, Device::ALL.len() as u32) as usize];
    ship.devices.add(device, halved);
    if device == Device::Shield {
        ship.shields_up = false;
        ship.shield_energy = 0.0;
    }
    let jittered = (halved + (ran(rng) * 1000.0 - 500.0)).max(0.0);
    (jittered, Some(device))
}

#[allow(clippy::too_many_arguments)]
fn apply_ship_hull(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
    shooter: Shooter,
    actor: ActorId,
    victim_side: Side,
    report: &mut HitReport,
) -> bool {
    let hull = report.hull;
    let drain = hull * ran(rng);
    let Some(ship) = registry::ship_mut(state, actor) else {
        return false;
    };
    ship.damage += hull;
    ship.energy = (ship.energy - drain).max(0.0);
    let dead = ship.is_destroyed(&content.constants);
    credit_damage(state, shooter, victim_side, ScoreCategory::DamageToEnemies, hull);
    publish(
        state,
        out,
        Event::ShipHit {
            target: actor,
            hull,
            shield_pct: report.shield_pct_after,
            critical: report.critical,
        },
    );
    if dead {
        return kill_ship(state, out, shooter, actor);
    }
    false
}

fn sign(shooter: Shooter, victim_side: Side) -> i64 {
    if shooter.side == victim_side {
        -1
    } else {
        1
    }
}

fn credit_damage(
    state: &mut GameState,
    shooter: Shooter,
    victim_side: Side,
    category: ScoreCategory,
    amount: f64,
) {
    let delta = sign(shooter, victim_side) * points(amount);
    state
        .ledger
        .credit(shooter.actor, shooter.side, category, delta);
}

// ---------------------------------------------------------------------------
// Destruction
// ---------------------------------------------------------------------------

/// Credit and remove a destroyed ship. Credit is guarded by the hull's one-shot flag.
pub fn kill_ship(
    state: &mut GameState,
    out: &mut Outbox,
    shooter: Shooter,
    victim: ActorId,
) -> bool {
    let Some(ship) = state.actors.get_mut(&victim).and_then(|a| a.ship.as_mut()) else {
        return false;
    };
    if ship.kill_credited {
        return false;
    }
    ship.kill_credited = true;
    let victim_side = ship.side;
    let victim_name = ship.name.clone();
    let s = sign(shooter, victim_side);
    if shooter.actor != Some(victim) {
        state.ledger.credit(
            shooter.actor,
            shooter.side,
            ScoreCategory::DamageToEnemies,
            s * SHIP_KILL_POINTS,
        );
        if shooter.side.is_hostile_to(victim_side) {
            state
                .ledger
                .credit(shooter.actor, shooter.side, ScoreCategory::EnemiesDestroyed, 1);
        }
    }
    let killer = shooter
        .actor
        .and_then(|a| registry::ship(state, a))
        .map_or_else(|| format!("{} forces", shooter.side), |s| s.name.clone());
    info!(victim = %victim, ship = %victim_name, killer = %killer, "kill credited");
    notify_all(
        state,
        out,
        None,
        &format!("The {victim_name} has been destroyed by {killer}."),
    );
    registry::remove_destroyed_ship(state, out, victim, shooter.actor);
    true
}

/// Credit and demote a destroyed base. Only the first call for a base does anything.
pub fn kill_base(state: &mut GameState, out: &mut Outbox, shooter: Shooter, id: PlanetId) -> bool {
    let Some(side) = registry::planet(state, id).filter(|p| p.is_base).map(|p| p.side) else {
        return false;
    };
    let position = registry::planet(state, id).map(|p| p.position).unwrap_or_default();
    if !registry::demote_base(state, out, id) {
        return false;
    }
    let s = sign(shooter, side);
    state.ledger.credit(
        shooter.actor,
        shooter.side,
        ScoreCategory::DamageToBases,
        s * BASE_KILL_POINTS,
    );
    if shooter.side.is_hostile_to(side) {
        state
            .ledger
            .credit(shooter.actor, shooter.side, ScoreCategory::EnemiesDestroyed, 1);
    }
    info!(planet = %id, %side, "base destroyed");
    notify_all(
        state,
        out,
        None,
        &format!("The {side} base at {position} has been destroyed."),
    );
    true
}

// ---------------------------------------------------------------------------
// Torpedo flight
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum TorpedoOutcome {
    Struck(HitReport),
    Nova(Position),
    StarUnaffected(Position),
    Swallowed(Position),
    Fizzled(Position),
}

/// Fly one torpedo from the shooter toward `aim` and resolve whatever it meets first.
pub fn launch_torpedo(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
    shooter: Shooter,
    aim: Position,
) -> TorpedoOutcome {
    let flight: SmallVec<[Position; 16]> = path::flight_path(
        shooter.position,
        aim,
        content.constants.torpedo_range,
        content,
    )
    .into_iter()
    .collect();
    let end = flight.last().copied().unwrap_or(shooter.position);
    for cell in &flight {
        let target = match registry::object_at(state, *cell) {
            Occupant::Empty => continue,
            Occupant::Ship(actor) if Some(actor) == shooter.actor => continue,
            Occupant::Ship(actor) => Target::Ship(actor),
            Occupant::Planet(id) => Target::Planet(id),
            Occupant::Star => {
                publish_flight(state, out, shooter, *cell);
                if ran(rng) < content.constants.nova_chance {
                    nova::trigger_nova(state, content, rng, out, shooter, *cell);
                    return TorpedoOutcome::Nova(*cell);
                }
                return TorpedoOutcome::StarUnaffected(*cell);
            }
            Occupant::Blackhole => {
                publish_flight(state, out, shooter, *cell);
                return TorpedoOutcome::Swallowed(*cell);
            }
        };
        publish_flight(state, out, shooter, *cell);
        let report = torpedo_hit(state, content, rng, out, shooter, target);
        return TorpedoOutcome::Struck(report);
    }
    publish_flight(state, out, shooter, end);
    TorpedoOutcome::Fizzled(end)
}

fn publish_flight(state: &mut GameState, out: &mut Outbox, shooter: Shooter, to: Position) {
    publish(
        state,
        out,
        Event::TorpedoFired {
            shooter: shooter.actor,
            from: shooter.position,
            to,
        },
    );
}

/// Tell the victim what hit them.
pub fn report_to_victim(
    state: &GameState,
    out: &mut Outbox,
    attacker_label: &str,
    weapon: &str,
    report: &HitReport,
) {
    let Target::Ship(victim) = report.target else {
        return;
    };
    let text = match report.kind {
        HitKind::Deflected => format!("{attacker_label}'s {weapon} deflected by your shields."),
        HitKind::Hit if report.critical => format!(
            "CRITICAL HIT! {attacker_label}'s {weapon} hit you for {:.0} units.",
            report.hull
        ),
        HitKind::Hit => format!(
            "{attacker_label}'s {weapon} hit you for {:.0} units.",
            report.hull
        ),
        HitKind::InstallationsDamaged | HitKind::NoEffect => return,
    };
    notify(state, out, victim, text);
}
