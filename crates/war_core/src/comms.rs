//! Outbound side of the engine: text lines, telemetry, and timer requests.
//!
//! The core never talks to sockets. Every call appends to an [`Outbox`] that the
//! runtime drains after the call returns.

use serde::{Deserialize, Serialize};

use crate::{emit, ActorId, ActorKind, Event, EventEnvelope, GameState, Position, Verbosity};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundLine {
    pub to: ActorId,
    pub text: String,
}

/// Ask the runtime to call `scheduler::complete_delayed(actor, action_id)` after `delay_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerRequest {
    pub actor: ActorId,
    pub action_id: u64,
    pub delay_ms: u64,
}

#[derive(Debug, Default)]
pub struct Outbox {
    pub lines: Vec<OutboundLine>,
    pub events: Vec<EventEnvelope>,
    pub timers: Vec<TimerRequest>,
    /// Actors whose outstanding timer should be aborted.
    pub cancelled: Vec<ActorId>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
            && self.events.is_empty()
            && self.timers.is_empty()
            && self.cancelled.is_empty()
    }

    /// Lines addressed to `actor`, in order. Mostly useful in tests.
    pub fn lines_for(&self, actor: ActorId) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|l| l.to == actor)
            .map(|l| l.text.as_str())
            .collect()
    }

    /// Move everything out, leaving the outbox empty.
    pub fn take(&mut self) -> Outbox {
        std::mem::take(self)
    }
}

/// Append a telemetry event stamped with the current stardate.
pub(crate) fn publish(state: &mut GameState, out: &mut Outbox, event: Event) {
    let envelope = emit(&mut state.counters, state.clock.stardate, event);
    out.events.push(envelope);
}

fn has_terminal(state: &GameState, actor: ActorId) -> bool {
    state
        .actors
        .get(&actor)
        .is_some_and(|a| matches!(a.kind, ActorKind::Human))
}

/// Deliver a line to one actor. Bots and the Romulan have no terminal and are skipped.
pub fn notify(state: &GameState, out: &mut Outbox, to: ActorId, text: impl Into<String>) {
    if has_terminal(state, to) {
        out.lines.push(OutboundLine {
            to,
            text: text.into(),
        });
    }
}

/// Deliver the variant matching the recipient's output setting.
pub fn notify_variant(state: &GameState, out: &mut Outbox, to: ActorId, short: &str, long: &str) {
    let Some(actor) = state.actors.get(&to) else {
        return;
    };
    let text = match actor.settings.verbosity {
        Verbosity::Short => short,
        Verbosity::Medium | Verbosity::Long => long,
    };
    notify(state, out, to, text);
}

/// True when `recipient` accepts radio traffic from `sender`.
fn accepts_radio(state: &GameState, recipient: ActorId, sender: Option<ActorId>) -> bool {
    let Some(actor) = state.actors.get(&recipient) else {
        return false;
    };
    match sender {
        None => true,
        Some(sender) => actor.settings.radio_on && !actor.settings.gagged.contains(&sender),
    }
}

/// Deliver to every actor whose ship is within `range` of `origin`.
pub fn notify_nearby(
    state: &GameState,
    out: &mut Outbox,
    origin: Position,
    range: i32,
    sender: Option<ActorId>,
    text: &str,
) {
    let recipients: Vec<ActorId> = state
        .actors
        .values()
        .filter(|a| Some(a.id) != sender)
        .filter(|a| {
            a.active_ship()
                .is_some_and(|s| s.position.distance(origin) <= range)
        })
        .map(|a| a.id)
        .collect();
    for id in recipients {
        if accepts_radio(state, id, sender) {
            notify(state, out, id, text);
        }
    }
}

/// Deliver to every connected actor except the sender.
pub fn notify_all(state: &GameState, out: &mut Outbox, sender: Option<ActorId>, text: &str) {
    let recipients: Vec<ActorId> = state
        .actors
        .keys()
        .copied()
        .filter(|id| Some(*id) != sender)
        .collect();
    for id in recipients {
        if accepts_radio(state, id, sender) {
            notify(state, out, id, text);
        }
    }
}
