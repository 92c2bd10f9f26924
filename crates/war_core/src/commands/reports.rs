//! Reports, charts, messaging and per-actor settings: STATUS, DAMAGES, POINTS,
//! TIME, SCAN, SRS, LIST and its shorthands, TELL, RADIO, SET, GRIPE and QUIT.
//! None of these consume game time.

use std::fmt::Write as _;

use ahash::AHashSet;
use tracing::info;

use super::args::{is_number, keyword, number, own_ship};
use super::Completion;
use crate::combat::shield_percent;
use crate::comms::{notify, publish, Outbox};
use crate::error::{CommandError, CommandResult};
use crate::registry::{self, Occupant};
use crate::scoring::{ScoreCard, ScoreCategory};
use crate::{
    ActorId, CoordMode, Device, Event, GameContent, GameState, Planet, Position, Ship, Side,
    Verbosity,
};

const TELL_USAGE: &str = "TELL ALL|FEDERATION|EMPIRE|ENEMY|FRIENDLY|<ship> ... ; <message>";
const RADIO_USAGE: &str = "RADIO ON | OFF | GAG <ship> | UNGAG <ship>";
const SET_USAGE: &str = "SET OUTPUT SHORT|MEDIUM|LONG | SET ICDEF ABSOLUTE|RELATIVE";
const POINTS_USAGE: &str = "POINTS [ME] [FEDERATION] [EMPIRE] [ROMULAN] [ALL]";
const SCAN_USAGE: &str = "SCAN [<rows> [<columns>]] [UP|DOWN|LEFT|RIGHT] [CORNER <dv> <dh>] [WARNING]";
const LOW_ENERGY: f64 = 1000.0;

/// Reach of a full scan, and of LIST coordinates for enemy ships.
pub const SCAN_RANGE: i32 = 10;
pub const SHORT_SCAN_RANGE: i32 = 7;
const BASE_WARNING_DISTANCE: i32 = 4;
const PLANET_WARNING_DISTANCE: i32 = 2;
const BLACKHOLE_WARNING_DISTANCE: i32 = 1;

// ---------------------------------------------------------------------------
// STATUS / DAMAGES / TIME
// ---------------------------------------------------------------------------

fn condition(state: &GameState, content: &GameContent, actor: ActorId) -> &'static str {
    let Some(ship) = registry::ship(state, actor) else {
        return "GREEN";
    };
    let threatened = state.actors.values().any(|a| {
        a.id != actor
            && a.active_ship().is_some_and(|s| {
                s.side.is_hostile_to(ship.side)
                    && !s.cloaked
                    && s.position.distance(ship.position) <= content.constants.phaser_range
            })
    });
    if threatened {
        "RED"
    } else if ship.energy < LOW_ENERGY || ship.damage > 0.0 {
        "YELLOW"
    } else {
        "GREEN"
    }
}

pub fn status(
    state: &GameState,
    content: &GameContent,
    out: &mut Outbox,
    actor: ActorId,
) -> CommandResult<Completion> {
    let ship = own_ship(state, actor)?;
    let c = &content.constants;
    let radio_on = state.actors.get(&actor).is_some_and(|a| a.settings.radio_on);
    let verbosity = state
        .actors
        .get(&actor)
        .map(|a| a.settings.verbosity)
        .unwrap_or_default();
    let cond = condition(state, content, actor);
    let docked = if ship.docked_at.is_some() { "+DOCKED" } else { "" };
    let shields = shield_percent(ship.shield_energy, c.max_shield_energy) / 10.0;
    let up = if ship.shields_up { "UP" } else { "DN" };
    let now = state.meta.now_ms;
    let ready_in = ship.phaser_banks.iter().min().map_or(0, |t| t.saturating_sub(now));

    let text = if verbosity == Verbosity::Short {
        format!(
            "SD{} {}{} {} T{} E{:.0} D{:.0} SH{:.0}/{} {} PH{}",
            state.clock.stardate,
            &cond[..1],
            docked,
            ship.position,
            ship.torpedoes,
            ship.energy,
            ship.damage,
            shields,
            up,
            if radio_on { "ROn" } else { "ROff" },
            if ready_in == 0 { "ok".to_string() } else { format!("{}s", ready_in.div_ceil(1000)) },
        )
    } else {
        let mut text = String::new();
        let _ = writeln!(text, "Stardate   {}", state.clock.stardate);
        let _ = writeln!(text, "Condition  {cond}{docked}");
        let _ = writeln!(text, "Location   {}", ship.position);
        let _ = writeln!(text, "Torpedoes  {}", ship.torpedoes);
        let _ = writeln!(text, "Energy     {:.1}", ship.energy);
        let _ = writeln!(text, "Damage     {:.1}", ship.damage);
        let _ = writeln!(
            text,
            "Shields    {shields:.1}%   {:.1} units ({up})",
            ship.shield_energy
        );
        let _ = writeln!(text, "Radio      {}", if radio_on { "On" } else { "Off" });
        if ready_in == 0 {
            let _ = write!(text, "Phasers    ready");
        } else {
            let _ = write!(text, "Phasers    ready in {}s", ready_in.div_ceil(1000));
        }
        text
    };
    notify(state, out, actor, text);
    Ok(Completion::FREE)
}

pub fn damages(
    state: &GameState,
    content: &GameContent,
    out: &mut Outbox,
    actor: ActorId,
) -> CommandResult<Completion> {
    let ship = own_ship(state, actor)?;
    let c = &content.constants;
    let damaged: Vec<(Device, f64)> = ship.devices.iter().filter(|(_, l)| *l > 0.0).collect();
    if damaged.is_empty() {
        notify(state, out, actor, "All devices functional.");
        return Ok(Completion::FREE);
    }
    let mut text = String::from("Device                 Damage");
    for (device, level) in damaged {
        let note = if ship.device_inoperative(device, c) {
            "  inoperative"
        } else if ship.device_damaged(device, c) {
            "  damaged"
        } else {
            ""
        };
        let _ = write!(text, "\n{:<22} {level:>6.0}{note}", device.to_string());
    }
    notify(state, out, actor, text);
    Ok(Completion::FREE)
}

pub fn time(state: &GameState, out: &mut Outbox, actor: ActorId) -> CommandResult<Completion> {
    let personal = state.actors.get(&actor).map_or(0, |a| a.personal_clock);
    let mut text = format!("Stardate:              {}", state.clock.stardate);
    let _ = write!(text, "\nSweeps completed:      {}", state.clock.sweeps);
    let _ = write!(text, "\nShip's elapsed turns:  {personal}");
    for side in [Side::Federation, Side::Empire] {
        let turns = state.clock.side_turns.get(&side).copied().unwrap_or(0);
        let _ = write!(text, "\n{:<23}{turns}", format!("{side} turns:"));
    }
    notify(state, out, actor, text);
    Ok(Completion::FREE)
}

// ---------------------------------------------------------------------------
// POINTS
// ---------------------------------------------------------------------------

fn render_scores(rows: &[(String, ScoreCard)]) -> String {
    let mut text = format!("{:<22}", "");
    for (label, _) in rows {
        let _ = write!(text, "{label:>14}");
    }
    for category in ScoreCategory::ALL {
        let _ = write!(text, "\n{:<22}", category.label());
        for (_, card) in rows {
            let _ = write!(text, "{:>14}", card.get(category));
        }
    }
    let _ = write!(text, "\n{:<22}", "Total");
    for (_, card) in rows {
        let _ = write!(text, "{:>14}", card.total());
    }
    text
}

pub fn points(
    state: &GameState,
    out: &mut Outbox,
    actor: ActorId,
    args: &[String],
) -> CommandResult<Completion> {
    let ship = own_ship(state, actor)?;
    let (mut me, mut fed, mut emp, mut rom) = (false, false, false, false);
    if args.is_empty() {
        me = true;
        match ship.side {
            Side::Federation => fed = true,
            Side::Empire => emp = true,
            Side::Romulan | Side::Neutral => {}
        }
    }
    for arg in args {
        if keyword(arg, "ALL", 1) {
            (me, fed, emp, rom) = (true, true, true, true);
        } else if keyword(arg, "ME", 1) || keyword(arg, "I", 1) {
            me = true;
        } else if keyword(arg, "FEDERATION", 1) || keyword(arg, "HUMAN", 1) {
            fed = true;
        } else if keyword(arg, "EMPIRE", 1) || keyword(arg, "KLINGON", 1) {
            emp = true;
        } else if keyword(arg, "ROMULAN", 1) {
            rom = true;
        } else {
            return Err(CommandError::Usage(POINTS_USAGE));
        }
    }

    let mut rows = Vec::new();
    if me {
        rows.push((ship.name.clone(), state.ledger.actor(actor)));
    }
    for (wanted, side) in [(fed, Side::Federation), (emp, Side::Empire), (rom, Side::Romulan)] {
        if wanted {
            rows.push((side.to_string(), state.ledger.side(side)));
        }
    }
    notify(state, out, actor, render_scores(&rows));
    Ok(Completion::FREE)
}

// ---------------------------------------------------------------------------
// TELL / RADIO
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Audience {
    All,
    Federation,
    Empire,
    Enemy,
    Friendly,
}

impl Audience {
    fn parse(token: &str) -> Option<Audience> {
        if keyword(token, "ALL", 1) {
            Some(Audience::All)
        } else if keyword(token, "FEDERATION", 2) || keyword(token, "HUMAN", 1) {
            Some(Audience::Federation)
        } else if keyword(token, "EMPIRE", 2) || keyword(token, "KLINGON", 1) {
            Some(Audience::Empire)
        } else if keyword(token, "ENEMY", 2) {
            Some(Audience::Enemy)
        } else if keyword(token, "FRIENDLY", 2) {
            Some(Audience::Friendly)
        } else {
            None
        }
    }

    fn includes(self, recipient: Side, sender: Side) -> bool {
        match self {
            Audience::All => true,
            Audience::Federation => recipient == Side::Federation,
            Audience::Empire => recipient == Side::Empire,
            Audience::Enemy => recipient.is_hostile_to(sender),
            Audience::Friendly => recipient == sender,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Audience::All => "ALL",
            Audience::Federation => "FEDERATION",
            Audience::Empire => "EMPIRE",
            Audience::Enemy => "ENEMY",
            Audience::Friendly => "FRIENDLY",
        }
    }
}

pub fn tell(
    state: &mut GameState,
    content: &GameContent,
    out: &mut Outbox,
    actor: ActorId,
    args: &[String],
) -> CommandResult<Completion> {
    let ship = own_ship(state, actor)?;
    if ship.device_inoperative(Device::Radio, &content.constants) {
        return Err(CommandError::DeviceInoperative(Device::Radio));
    }
    let Some(split) = args.iter().position(|a| a == ";") else {
        return Err(CommandError::Usage(TELL_USAGE));
    };
    let (targets, message) = (&args[..split], args[split + 1..].join(" "));
    if targets.is_empty() || message.is_empty() {
        return Err(CommandError::Usage(TELL_USAGE));
    }
    if !state.actors.get(&actor).is_some_and(|a| a.settings.radio_on) {
        return Err(CommandError::Rejected("Captain, your radio is off.".to_string()));
    }
    let (side, name) = (ship.side, ship.name.clone());

    let (label, recipients): (String, Vec<ActorId>) = match Audience::parse(&targets[0]) {
        Some(audience) => {
            let ids = state
                .actors
                .values()
                .filter(|a| a.id != actor && !a.is_romulan())
                .filter(|a| a.active_ship().is_some_and(|s| audience.includes(s.side, side)))
                .map(|a| a.id)
                .collect();
            (audience.label().to_string(), ids)
        }
        None => {
            let mut ids = Vec::new();
            for t in targets {
                let id = registry::find_ship_by_name(state, t)
                    .filter(|id| *id != actor)
                    .ok_or_else(|| CommandError::UnknownShip(t.clone()))?;
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            (targets.join(" ").to_ascii_uppercase(), ids)
        }
    };

    for id in &recipients {
        let accepts = state
            .actors
            .get(id)
            .is_some_and(|a| a.settings.radio_on && !a.settings.gagged.contains(&actor));
        if accepts {
            notify(state, out, *id, format!("<< {name} (TELL): {message}"));
        }
    }
    publish(
        state,
        out,
        Event::Comms {
            from: Some(actor),
            to: label.clone(),
            text: message.clone(),
        },
    );
    notify(state, out, actor, format!(">> To {label}: {message}"));
    Ok(Completion::FREE)
}

pub fn radio(
    state: &mut GameState,
    out: &mut Outbox,
    actor: ActorId,
    args: &[String],
) -> CommandResult<Completion> {
    own_ship(state, actor)?;
    let action = args.first().ok_or(CommandError::Usage(RADIO_USAGE))?;
    let text = if keyword(action, "ON", 2) || keyword(action, "OFF", 2) {
        let on = keyword(action, "ON", 2);
        if let Some(a) = state.actors.get_mut(&actor) {
            a.settings.radio_on = on;
        }
        if on {
            "Radio turned on.".to_string()
        } else {
            "Radio turned off.".to_string()
        }
    } else if keyword(action, "GAG", 1) || keyword(action, "UNGAG", 1) {
        let gag = keyword(action, "GAG", 1);
        let wanted = args.get(1).ok_or(CommandError::Usage(RADIO_USAGE))?;
        let target = registry::find_ship_by_name(state, wanted)
            .filter(|id| *id != actor)
            .ok_or_else(|| CommandError::UnknownShip(wanted.clone()))?;
        let ship_name = registry::ship(state, target).map_or_else(String::new, |s| s.name.clone());
        if let Some(a) = state.actors.get_mut(&actor) {
            if gag {
                a.settings.gagged.insert(target);
            } else {
                a.settings.gagged.remove(&target);
            }
        }
        if gag {
            format!("Messages from {ship_name} will be ignored.")
        } else {
            format!("Messages from {ship_name} will be received.")
        }
    } else {
        return Err(CommandError::Usage(RADIO_USAGE));
    };
    notify(state, out, actor, text);
    Ok(Completion::FREE)
}

// ---------------------------------------------------------------------------
// SET
// ---------------------------------------------------------------------------

pub fn set(
    state: &mut GameState,
    out: &mut Outbox,
    actor: ActorId,
    args: &[String],
) -> CommandResult<Completion> {
    let [setting, value, ..] = args else {
        return Err(CommandError::Usage(SET_USAGE));
    };
    let Some(entry) = state.actors.get_mut(&actor) else {
        return Err(CommandError::NoShip);
    };
    let text = if keyword(setting, "OUTPUT", 1) {
        let verbosity = if keyword(value, "SHORT", 1) {
            Verbosity::Short
        } else if keyword(value, "MEDIUM", 1) {
            Verbosity::Medium
        } else if keyword(value, "LONG", 1) {
            Verbosity::Long
        } else {
            return Err(CommandError::Usage(SET_USAGE));
        };
        entry.settings.verbosity = verbosity;
        format!("OUTPUT set to {verbosity:?}.")
    } else if keyword(setting, "ICDEF", 1) {
        let mode = if keyword(value, "ABSOLUTE", 1) {
            CoordMode::Absolute
        } else if keyword(value, "RELATIVE", 1) {
            CoordMode::Relative
        } else {
            return Err(CommandError::Usage(SET_USAGE));
        };
        entry.settings.default_coords = mode;
        format!("ICDEF set to {mode:?}.")
    } else {
        return Err(CommandError::Usage(SET_USAGE));
    };
    notify(state, out, actor, text.to_ascii_uppercase());
    Ok(Completion::FREE)
}

// ---------------------------------------------------------------------------
// SCAN / SRS
// ---------------------------------------------------------------------------

/// Sectors of a window rendered by a scan, inclusive and already clipped to the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScanWindow {
    v_min: i32,
    v_max: i32,
    h_min: i32,
    h_max: i32,
}

/// Parse scan arguments around `center`. Returns the window and whether hazard
/// warnings were asked for.
fn scan_window(
    center: Position,
    content: &GameContent,
    args: &[String],
    range: i32,
) -> CommandResult<(ScanWindow, bool)> {
    let mut numbers = Vec::new();
    let (mut v_dir, mut h_dir) = (0, 0);
    let (mut corner, mut warning) = (false, false);
    for arg in args {
        if is_number(arg) {
            numbers.push(number(arg)?);
        } else if keyword(arg, "UP", 1) {
            v_dir = 1;
        } else if keyword(arg, "DOWN", 1) {
            v_dir = -1;
        } else if keyword(arg, "RIGHT", 1) {
            h_dir = 1;
        } else if keyword(arg, "LEFT", 1) {
            h_dir = -1;
        } else if keyword(arg, "CORNER", 1) {
            corner = true;
        } else if keyword(arg, "WARNING", 1) {
            warning = true;
        } else {
            return Err(CommandError::Usage(SCAN_USAGE));
        }
    }

    let (v, h) = (center.v, center.h);
    let (v_min, v_max, h_min, h_max) = match numbers.as_slice() {
        [dv, dh, ..] if corner => {
            let (dv, dh) = ((*dv).clamp(-range, range), (*dh).clamp(-range, range));
            (v.min(v + dv), v.max(v + dv), h.min(h + dh), h.max(h + dh))
        }
        _ if corner => return Err(CommandError::Usage(SCAN_USAGE)),
        extents => {
            let (vertical, horizontal) = match extents {
                [] => (range, range),
                [n] => (n.abs().min(range), n.abs().min(range)),
                [a, b, ..] => (a.abs().min(range), b.abs().min(range)),
            };
            let (v_min, v_max) = match v_dir {
                1 => (v, v + vertical),
                -1 => (v - vertical, v),
                _ => (v - vertical, v + vertical),
            };
            let (h_min, h_max) = match h_dir {
                1 => (h, h + horizontal),
                -1 => (h - horizontal, h),
                _ => (h - horizontal, h + horizontal),
            };
            (v_min, v_max, h_min, h_max)
        }
    };
    let c = &content.constants;
    let window = ScanWindow {
        v_min: v_min.max(1),
        v_max: v_max.min(c.grid_height),
        h_min: h_min.max(1),
        h_max: h_max.min(c.grid_width),
    };
    Ok((window, warning))
}

/// Sectors next to hostile or neutral planets and bases, and around blackholes.
fn warning_sectors(state: &GameState, side: Side) -> AHashSet<Position> {
    let mut sectors = AHashSet::new();
    let mut ring = |center: Position, reach: i32| {
        for dv in -reach..=reach {
            for dh in -reach..=reach {
                if dv != 0 || dh != 0 {
                    sectors.insert(center.offset(dv, dh));
                }
            }
        }
    };
    for planet in state.planets.iter().filter(|p| p.side != side) {
        let reach = if planet.is_base {
            BASE_WARNING_DISTANCE
        } else {
            PLANET_WARNING_DISTANCE
        };
        ring(planet.position, reach);
    }
    for blackhole in &state.blackholes {
        ring(*blackhole, BLACKHOLE_WARNING_DISTANCE);
    }
    sectors
}

fn sector_symbol(state: &GameState, position: Position, warnings: &AHashSet<Position>) -> String {
    let symbol = match registry::object_at(state, position) {
        Occupant::Ship(id) => match registry::ship(state, id) {
            Some(ship) if ship.cloaked => ".".to_string(),
            Some(ship) if ship.side == Side::Romulan => "R".to_string(),
            Some(ship) => ship.name.chars().next().map_or_else(|| "?".to_string(), |c| c.to_string()),
            None => "?".to_string(),
        },
        Occupant::Planet(id) => match registry::planet(state, id) {
            Some(p) if p.is_base && p.side == Side::Federation => "<>".to_string(),
            Some(p) if p.is_base && p.side == Side::Empire => ")(".to_string(),
            Some(p) if p.side == Side::Federation => "@F".to_string(),
            Some(p) if p.side == Side::Empire => "@E".to_string(),
            Some(p) if p.side == Side::Neutral => "@".to_string(),
            _ => "@?".to_string(),
        },
        Occupant::Star => "*".to_string(),
        Occupant::Blackhole => " ".to_string(),
        Occupant::Empty if warnings.contains(&position) => "!".to_string(),
        Occupant::Empty => ".".to_string(),
    };
    format!("{symbol:>2}")
}

fn render_scan(state: &GameState, window: ScanWindow, warnings: &AHashSet<Position>) -> String {
    let columns: Vec<String> = (window.h_min..=window.h_max)
        .step_by(2)
        .map(|h| format!("{h:>2}"))
        .collect();
    let header = format!("   {}", columns.join("  "));
    let mut text = header.clone();
    for v in (window.v_min..=window.v_max).rev() {
        let _ = write!(text, "\n{v:>2} ");
        for h in window.h_min..=window.h_max {
            text.push_str(&sector_symbol(state, Position::new(v, h), warnings));
        }
        let _ = write!(text, " {v:>2}");
    }
    let _ = write!(text, "\n{header}");
    text
}

/// Chart the sectors around the ship. `range` caps how far the window reaches.
pub fn scan(
    state: &GameState,
    content: &GameContent,
    out: &mut Outbox,
    actor: ActorId,
    args: &[String],
    range: i32,
) -> CommandResult<Completion> {
    let ship = own_ship(state, actor)?;
    let (window, warning) = scan_window(ship.position, content, args, range)?;
    let warnings = if warning {
        warning_sectors(state, ship.side)
    } else {
        AHashSet::new()
    };
    let text = render_scan(state, window, &warnings);
    notify(state, out, actor, text);
    Ok(Completion::FREE)
}

// ---------------------------------------------------------------------------
// LIST / TARGETS / PLANETS / BASES / SUMMARY
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SideFilter {
    Federation,
    Empire,
    Friendly,
    Enemy,
    Neutral,
    Captured,
}

impl SideFilter {
    fn parse(token: &str) -> Option<SideFilter> {
        if keyword(token, "FEDERATION", 2) || keyword(token, "HUMAN", 1) {
            Some(SideFilter::Federation)
        } else if keyword(token, "EMPIRE", 2) || keyword(token, "KLINGON", 1) {
            Some(SideFilter::Empire)
        } else if keyword(token, "FRIENDLY", 2) {
            Some(SideFilter::Friendly)
        } else if keyword(token, "ENEMY", 2) || keyword(token, "TARGETS", 1) {
            Some(SideFilter::Enemy)
        } else if keyword(token, "NEUTRAL", 1) {
            Some(SideFilter::Neutral)
        } else if keyword(token, "CAPTURED", 2) {
            Some(SideFilter::Captured)
        } else {
            None
        }
    }

    fn admits(self, viewer: Side, target: Side, is_planet: bool) -> bool {
        match self {
            SideFilter::Federation => target == Side::Federation,
            SideFilter::Empire => target == Side::Empire,
            SideFilter::Friendly => target == viewer && target != Side::Neutral,
            SideFilter::Enemy => target != viewer && target != Side::Neutral,
            SideFilter::Neutral => target == Side::Neutral,
            SideFilter::Captured => is_planet && target != Side::Neutral,
        }
    }
}

/// A parsed LIST request.
#[derive(Debug, Clone, Default, PartialEq)]
struct ListQuery {
    ships: bool,
    bases: bool,
    planets: bool,
    sides: Vec<SideFilter>,
    range: Option<i32>,
    closest: bool,
    locations: Vec<Position>,
    names: Vec<ActorId>,
    summary: bool,
}

impl ListQuery {
    fn parse(state: &GameState, args: &[String]) -> CommandResult<ListQuery> {
        let mut query = ListQuery::default();
        let mut rest = args;
        while let Some((token, tail)) = rest.split_first() {
            rest = tail;
            if keyword(token, "SHIPS", 2) {
                query.ships = true;
            } else if keyword(token, "BASES", 1) {
                query.bases = true;
            } else if keyword(token, "PLANETS", 2) {
                query.planets = true;
            } else if keyword(token, "PORTS", 2) {
                query.bases = true;
                query.planets = true;
            } else if let Some(side) = SideFilter::parse(token) {
                query.sides.push(side);
            } else if keyword(token, "CLOSEST", 2) {
                query.closest = true;
            } else if keyword(token, "ALL", 1) {
                query.range = None;
            } else if keyword(token, "SUMMARY", 2) {
                query.summary = true;
            } else if is_number(token) {
                let v = number(token)?;
                match tail.split_first() {
                    Some((h, tail)) if is_number(h) => {
                        query.locations.push(Position::new(v, number(h)?));
                        rest = tail;
                    }
                    _ => query.range = Some(v.abs()),
                }
            } else {
                let id = registry::find_ship_by_name(state, token)
                    .ok_or_else(|| CommandError::UnknownShip(token.clone()))?;
                query.names.push(id);
                query.ships = true;
            }
        }
        if !query.ships && !query.bases && !query.planets {
            (query.ships, query.bases, query.planets) = (true, true, true);
        }
        Ok(query)
    }

    fn admits(
        &self,
        origin: Position,
        viewer: Side,
        position: Position,
        side: Side,
        is_planet: bool,
    ) -> bool {
        self.sides.iter().all(|f| f.admits(viewer, side, is_planet))
            && self.range.map_or(true, |r| origin.distance(position) <= r)
            && (self.locations.is_empty() || self.locations.contains(&position))
    }

    fn qualifier(&self) -> &'static str {
        if self.range.is_some() {
            "in specified range"
        } else {
            "in game"
        }
    }
}

fn signed(n: i32) -> String {
    if n == 0 {
        "0".to_string()
    } else {
        format!("{n:+}")
    }
}

fn locate(origin: Position, target: Position, mode: CoordMode) -> String {
    match mode {
        CoordMode::Relative => {
            format!("{},{}", signed(target.v - origin.v), signed(target.h - origin.h))
        }
        CoordMode::Absolute | CoordMode::Computed => target.to_string(),
    }
}

fn side_abbrev(side: Side) -> String {
    side.to_string().chars().take(3).collect()
}

/// Keep only the entry nearest `origin`; ties keep the earliest.
fn nearest<T>(items: Vec<T>, origin: Position, position: impl Fn(&T) -> Position) -> Vec<T> {
    let mut best: Option<(i32, T)> = None;
    for item in items {
        let d = origin.distance(position(&item));
        if best.as_ref().map_or(true, |(bd, _)| d < *bd) {
            best = Some((d, item));
        }
    }
    best.into_iter().map(|(_, item)| item).collect()
}

#[derive(Debug, Default)]
struct Tally {
    federation: u32,
    empire: u32,
    romulan: u32,
    neutral: u32,
}

impl Tally {
    fn count(&mut self, side: Side) {
        match side {
            Side::Federation => self.federation += 1,
            Side::Empire => self.empire += 1,
            Side::Romulan => self.romulan += 1,
            Side::Neutral => self.neutral += 1,
        }
    }

    fn report(&self, lines: &mut Vec<String>, label: &str, qualifier: &str) {
        for (n, side) in [
            (self.federation, Side::Federation),
            (self.empire, Side::Empire),
            (self.romulan, Side::Romulan),
            (self.neutral, Side::Neutral),
        ] {
            if n > 0 {
                lines.push(format!("{n} {side} {label} {qualifier}"));
            }
        }
    }
}

fn ship_line(
    viewer: &Ship,
    ship: &Ship,
    verbosity: Verbosity,
    mode: CoordMode,
    max_shields: f64,
) -> String {
    let flag = if ship.side == viewer.side { ' ' } else { '*' };
    let sign = if ship.shields_up { '+' } else { '-' };
    let shields = shield_percent(ship.shield_energy, max_shields) / 10.0;
    let out_of_range =
        ship.side != viewer.side && viewer.position.distance(ship.position) > SCAN_RANGE;
    let coord = locate(viewer.position, ship.position, mode);
    if verbosity == Verbosity::Long {
        let mut name = ship.name.to_ascii_lowercase();
        if let Some(first) = name.get_mut(..1) {
            first.make_ascii_uppercase();
        }
        if out_of_range {
            format!("{flag}{name:<12}out of range")
        } else {
            let shields = format!("{sign}{shields:.0}%");
            format!("{flag}{name:<12}@{coord}{shields:>7}")
        }
    } else {
        let initial: String = ship.name.chars().take(1).collect();
        if out_of_range {
            format!("{flag}{initial:<3}out of range")
        } else {
            let shields = format!("{sign}{shields:.1}");
            format!("{flag}{initial:<3}{coord} {shields:>9}")
        }
    }
}

fn base_line(
    viewer: &Ship,
    base: &Planet,
    verbosity: Verbosity,
    mode: CoordMode,
    max_energy: f64,
) -> String {
    let flag = if base.side == viewer.side { ' ' } else { '*' };
    let strength = if max_energy > 0.0 {
        base.energy / max_energy * 100.0
    } else {
        0.0
    };
    let coord = locate(viewer.position, base.position, mode);
    if verbosity == Verbosity::Long {
        let name = format!("{} Base", side_abbrev(base.side));
        let strength = format!("+{strength:.1}%");
        format!("{flag}{name:<12}@{coord}{strength:>9}")
    } else {
        let symbol = match base.side {
            Side::Federation => "<>".to_string(),
            Side::Empire => ")(".to_string(),
            other => side_abbrev(other),
        };
        format!("{flag}{symbol:<3}{coord}{strength:>8.0}")
    }
}

fn planet_line(viewer: &Ship, planet: &Planet, verbosity: Verbosity, mode: CoordMode) -> String {
    let flag = if planet.side == Side::Neutral {
        ' '
    } else if planet.side == viewer.side {
        '-'
    } else {
        '*'
    };
    let coord = locate(viewer.position, planet.position, mode);
    if verbosity == Verbosity::Long {
        let name = format!("{} planet", side_abbrev(planet.side));
        let builds = if planet.builds == 0 {
            String::new()
        } else {
            format!("{} builds", planet.builds)
        };
        format!("{flag}{name:<12}@{coord:<10}{builds}")
    } else {
        let builds = if planet.builds == 0 {
            String::new()
        } else {
            format!("{:>6}", planet.builds)
        };
        format!(" {flag}@ {coord}{builds}")
    }
}

/// List ships, bases and planets matching `args`. With `counts_only` just the
/// per-side tallies are printed.
pub fn list(
    state: &GameState,
    content: &GameContent,
    out: &mut Outbox,
    actor: ActorId,
    args: &[String],
    counts_only: bool,
) -> CommandResult<Completion> {
    let viewer = own_ship(state, actor)?;
    let query = ListQuery::parse(state, args)?;
    let c = &content.constants;
    let (verbosity, mode) = state.actors.get(&actor).map_or_else(
        || (Verbosity::default(), CoordMode::default()),
        |a| (a.settings.verbosity, a.settings.default_coords),
    );
    let origin = viewer.position;
    let summary = query.summary || counts_only;
    let qualifier = query.qualifier();
    let mut lines = Vec::new();

    if query.ships {
        let mut ships: Vec<(ActorId, &Ship)> = state
            .actors
            .values()
            .filter_map(|a| a.active_ship().map(|s| (a.id, s)))
            .filter(|(_, s)| !s.cloaked)
            .filter(|(id, _)| query.names.is_empty() || query.names.contains(id))
            .filter(|(_, s)| query.admits(origin, viewer.side, s.position, s.side, false))
            .collect();
        if query.closest {
            ships.retain(|(id, _)| *id != actor);
            ships = nearest(ships, origin, |(_, s)| s.position);
        }
        let mut tally = Tally::default();
        for (_, ship) in &ships {
            if !counts_only {
                lines.push(ship_line(viewer, ship, verbosity, mode, c.max_shield_energy));
            }
            tally.count(ship.side);
        }
        if summary {
            tally.report(&mut lines, "ships", qualifier);
        }
    }

    for want_bases in [true, false] {
        if (want_bases && !query.bases) || (!want_bases && !query.planets) {
            continue;
        }
        let mut found: Vec<&Planet> = state
            .planets
            .iter()
            .filter(|p| p.is_base == want_bases)
            .filter(|p| query.admits(origin, viewer.side, p.position, p.side, true))
            .collect();
        if query.closest {
            found = nearest(found, origin, |p| p.position);
        }
        let mut tally = Tally::default();
        for planet in &found {
            if !counts_only {
                lines.push(if want_bases {
                    base_line(viewer, planet, verbosity, mode, c.max_base_energy)
                } else {
                    planet_line(viewer, planet, verbosity, mode)
                });
            }
            tally.count(planet.side);
        }
        if summary {
            tally.report(&mut lines, if want_bases { "bases" } else { "planets" }, qualifier);
        }
    }

    let text = if lines.is_empty() {
        "Nothing matches your LIST criteria.".to_string()
    } else {
        lines.join("\n")
    };
    notify(state, out, actor, text);
    Ok(Completion::FREE)
}

/// LIST with a fixed leading filter word, as TARGETS, PLANETS and BASES use.
pub fn list_with(
    state: &GameState,
    content: &GameContent,
    out: &mut Outbox,
    actor: ActorId,
    filter: &str,
    args: &[String],
) -> CommandResult<Completion> {
    let mut words = Vec::with_capacity(args.len() + 1);
    words.push(filter.to_string());
    words.extend_from_slice(args);
    list(state, content, out, actor, &words, false)
}

// ---------------------------------------------------------------------------
// GRIPE / QUIT
// ---------------------------------------------------------------------------

/// Park the ship in limbo: a blackhole holds its sector until the gripe is in.
pub fn gripe(state: &mut GameState, out: &mut Outbox, actor: ActorId) -> CommandResult<Completion> {
    let position = registry::ship(state, actor).map(|s| s.position);
    let Some(entry) = state.actors.get_mut(&actor) else {
        return Err(CommandError::NoShip);
    };
    entry.limbo = true;
    if let Some(position) = position {
        state.blackholes.push(position);
    }
    notify(state, out, actor, "Enter gripe on one line:");
    Ok(Completion::FREE)
}

/// Record the gripe text and bring the ship back.
pub fn finish_gripe(state: &mut GameState, out: &mut Outbox, actor: ActorId, line: &str) {
    let ship = state
        .actors
        .get(&actor)
        .and_then(|a| a.ship.as_ref())
        .map_or_else(|| "unknown".to_string(), |s| s.name.clone());
    info!(%actor, %ship, stardate = state.clock.stardate, gripe = %line.trim(), "gripe");
    leave_limbo(state, actor);
    notify(state, out, actor, "Your gripe has been noted.");
}

/// Swap the placeholder blackhole back out for the parked ship.
pub fn leave_limbo(state: &mut GameState, actor: ActorId) {
    let Some(entry) = state.actors.get_mut(&actor) else {
        return;
    };
    if !entry.limbo {
        return;
    }
    entry.limbo = false;
    let Some(position) = entry.ship.as_ref().map(|s| s.position) else {
        return;
    };
    if let Some(index) = state.blackholes.iter().position(|b| *b == position) {
        state.blackholes.swap_remove(index);
    }
}

pub fn quit(state: &mut GameState, out: &mut Outbox, actor: ActorId) -> CommandResult<Completion> {
    own_ship(state, actor)?;
    notify(
        state,
        out,
        actor,
        "You have chosen to resign from your post as captain. Your ship has been removed.",
    );
    registry::retire_ship(state, out, actor);
    if let Some(entry) = state.actors.get_mut(&actor) {
        entry.queue.clear();
    }
    Ok(Completion::FREE)
}
