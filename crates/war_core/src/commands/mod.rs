//! Command table and dispatch.
//!
//! Names resolve by minimum abbreviation: the first entry whose required prefix
//! the token satisfies wins, so table order matters.

use rand::Rng;

use crate::error::{CommandError, CommandResult};
use crate::{comms::Outbox, registry, ActorId, DelayedAction, GameContent, GameState};

pub(crate) mod args;
pub mod movement;
pub mod planets;
pub mod reports;
pub mod ship_ops;
pub mod weapons;

/// How a handler finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Done. `timed` commands consume game time and advance the world once.
    Immediate { timed: bool },
    /// Park the actor until the timer fires, then run `action`.
    Delayed { delay_ms: u64, action: DelayedAction },
}

impl Completion {
    pub(crate) const FREE: Completion = Completion::Immediate { timed: false };
    pub(crate) const TIMED: Completion = Completion::Immediate { timed: true };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandName {
    Bases,
    Build,
    Capture,
    Damages,
    Dock,
    Energy,
    Gripe,
    Impulse,
    List,
    Move,
    Phasers,
    Planets,
    Points,
    Quit,
    Radio,
    Repair,
    Scan,
    Set,
    Shields,
    Srs,
    Status,
    Summary,
    Targets,
    Tell,
    Time,
    Torpedoes,
    Tractor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: CommandName,
    pub word: &'static str,
    pub min: &'static str,
    pub delayed: bool,
}

const fn spec(name: CommandName, word: &'static str, min: &'static str, delayed: bool) -> CommandSpec {
    CommandSpec {
        name,
        word,
        min,
        delayed,
    }
}

pub const COMMANDS: &[CommandSpec] = &[
    spec(CommandName::Bases, "BASES", "BA", false),
    spec(CommandName::Build, "BUILD", "BU", true),
    spec(CommandName::Capture, "CAPTURE", "CA", true),
    spec(CommandName::Damages, "DAMAGES", "DA", false),
    spec(CommandName::Dock, "DOCK", "DO", true),
    spec(CommandName::Energy, "ENERGY", "EN", false),
    spec(CommandName::Gripe, "GRIPE", "GR", false),
    spec(CommandName::Impulse, "IMPULSE", "IM", true),
    spec(CommandName::List, "LIST", "LI", false),
    spec(CommandName::Move, "MOVE", "M", true),
    spec(CommandName::Phasers, "PHASERS", "PH", false),
    spec(CommandName::Planets, "PLANETS", "PL", false),
    spec(CommandName::Points, "POINTS", "PO", false),
    spec(CommandName::Quit, "QUIT", "Q", false),
    spec(CommandName::Radio, "RADIO", "RA", false),
    spec(CommandName::Repair, "REPAIR", "RE", true),
    spec(CommandName::Scan, "SCAN", "SC", false),
    spec(CommandName::Set, "SET", "SE", false),
    spec(CommandName::Shields, "SHIELDS", "SH", false),
    spec(CommandName::Srs, "SRS", "SR", false),
    spec(CommandName::Status, "STATUS", "ST", false),
    spec(CommandName::Summary, "SUMMARY", "SU", false),
    spec(CommandName::Targets, "TARGETS", "TA", false),
    spec(CommandName::Tell, "TELL", "TE", false),
    spec(CommandName::Time, "TIME", "TI", false),
    spec(CommandName::Torpedoes, "TORPEDOES", "TO", true),
    spec(CommandName::Tractor, "TRACTOR", "TR", false),
];

/// Resolve a possibly abbreviated command word. Only the minimum prefix is checked.
pub fn lookup(token: &str) -> Option<&'static CommandSpec> {
    let token = token.to_ascii_uppercase();
    COMMANDS.iter().find(|c| token.starts_with(c.min))
}

/// Run the command named by `words[0]`.
pub fn dispatch(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
    actor: ActorId,
    words: &[String],
) -> CommandResult<Completion> {
    let Some((first, args)) = words.split_first() else {
        return Ok(Completion::FREE);
    };
    let spec = lookup(first).ok_or_else(|| CommandError::UnknownCommand(first.clone()))?;
    match spec.name {
        CommandName::Bases => reports::list_with(state, content, out, actor, "BASES", args),
        CommandName::Build => planets::build(state, content, rng, actor, args),
        CommandName::Capture => planets::capture(state, content, actor, args),
        CommandName::Damages => reports::damages(state, content, out, actor),
        CommandName::Dock => planets::dock(state, content, rng, actor),
        CommandName::Energy => ship_ops::energy(state, content, out, actor, args),
        CommandName::Gripe => reports::gripe(state, out, actor),
        CommandName::Impulse => movement::impulse(state, content, out, actor, args),
        CommandName::List => reports::list(state, content, out, actor, args, false),
        CommandName::Move => movement::warp(state, content, rng, out, actor, args),
        CommandName::Phasers => weapons::phasers(state, content, rng, out, actor, args),
        CommandName::Planets => reports::list_with(state, content, out, actor, "PLANETS", args),
        CommandName::Points => reports::points(state, out, actor, args),
        CommandName::Quit => reports::quit(state, out, actor),
        CommandName::Radio => reports::radio(state, out, actor, args),
        CommandName::Repair => ship_ops::repair(state, content, actor, args),
        CommandName::Scan => {
            reports::scan(state, content, out, actor, args, reports::SCAN_RANGE)
        }
        CommandName::Set => reports::set(state, out, actor, args),
        CommandName::Shields => ship_ops::shields(state, content, out, actor, args),
        CommandName::Srs => {
            reports::scan(state, content, out, actor, args, reports::SHORT_SCAN_RANGE)
        }
        CommandName::Status => reports::status(state, content, out, actor),
        CommandName::Summary => reports::list(state, content, out, actor, args, true),
        CommandName::Targets => reports::list_with(state, content, out, actor, "ENEMY", args),
        CommandName::Tell => reports::tell(state, content, out, actor, args),
        CommandName::Time => reports::time(state, out, actor),
        CommandName::Torpedoes => weapons::torpedoes(state, content, rng, out, actor, args),
        CommandName::Tractor => ship_ops::tractor(state, content, out, actor, args),
    }
}

/// Return energy a delayed command charged up front but never used.
pub(crate) fn refund(state: &mut GameState, actor: ActorId, amount: f64) {
    if amount <= 0.0 {
        return;
    }
    if let Some(ship) = registry::ship_mut(state, actor) {
        ship.energy += amount;
    }
}

/// Run the continuation of a delayed command after its timer fired.
pub fn resume(
    state: &mut GameState,
    content: &GameContent,
    out: &mut Outbox,
    actor: ActorId,
    action: DelayedAction,
) -> CommandResult<()> {
    match action {
        DelayedAction::Build { planet } => planets::finish_build(state, content, out, actor, planet),
        DelayedAction::Capture { planet, cost } => {
            planets::finish_capture(state, out, actor, planet).inspect_err(|_| {
                refund(state, actor, cost);
            })
        }
        DelayedAction::Dock { planet } => planets::finish_dock(state, content, out, actor, planet),
        DelayedAction::Move { destination, cost } => {
            movement::finish_warp(state, out, actor, destination, cost)
        }
        DelayedAction::Impulse { destination } => {
            movement::finish_impulse(state, out, actor, destination)
        }
        DelayedAction::Repair { amount } => ship_ops::finish_repair(state, content, out, actor, amount),
        DelayedAction::TorpedoVolley => weapons::finish_volley(state, out, actor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbreviations_resolve_to_first_matching_entry() {
        assert_eq!(lookup("m").map(|c| c.name), Some(CommandName::Move));
        assert_eq!(lookup("PHA").map(|c| c.name), Some(CommandName::Phasers));
        assert_eq!(lookup("po").map(|c| c.name), Some(CommandName::Points));
        assert_eq!(lookup("TORPEDOS").map(|c| c.name), Some(CommandName::Torpedoes));
        assert_eq!(lookup("torpedoes").map(|c| c.name), Some(CommandName::Torpedoes));
        assert_eq!(lookup("TOR").map(|c| c.name), Some(CommandName::Torpedoes));
        assert_eq!(lookup("tr").map(|c| c.name), Some(CommandName::Tractor));
        assert_eq!(lookup("SR").map(|c| c.name), Some(CommandName::Srs));
        assert_eq!(lookup("sum").map(|c| c.name), Some(CommandName::Summary));
        assert_eq!(lookup("TARG").map(|c| c.name), Some(CommandName::Targets));
        assert_eq!(lookup("SHIELDSS").map(|c| c.name), Some(CommandName::Shields));
    }

    #[test]
    fn too_short_or_unknown_tokens_do_not_resolve() {
        assert!(lookup("P").is_none(), "P is ambiguous between PHASERS and POINTS");
        assert!(lookup("S").is_none());
        assert!(lookup("XYZZY").is_none());
        assert!(lookup("T").is_none());
    }
}
