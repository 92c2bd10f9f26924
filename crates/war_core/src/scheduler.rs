//! Per-actor command queues.
//!
//! Each actor runs at most one command at a time. A delayed command parks the
//! actor until its timer fires; other actors keep going. The runtime owns the
//! actual timers and calls [`complete_delayed`] with the action ID it was given.

use rand::Rng;
use tracing::{debug, warn};

use crate::commands::{self, Completion};
use crate::comms::{notify, Outbox, TimerRequest};
use crate::{registry, world_tick, ActorId, GameContent, GameState, PendingAction};

const STATEMENT_SEPARATOR: char = '/';

/// Split a raw line into statements.
pub fn split_statements(line: &str) -> Vec<String> {
    line.split(STATEMENT_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split one statement into words. `;` stands alone; commas separate like spaces.
pub fn split_words(statement: &str) -> Vec<String> {
    statement
        .replace(';', " ; ")
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Queue every statement on `line` for `actor` and start draining.
pub fn submit_line(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
    actor: ActorId,
    line: &str,
) {
    let Some(entry) = state.actors.get_mut(&actor) else {
        return;
    };
    if entry.limbo {
        commands::reports::finish_gripe(state, out, actor, line);
        drain(state, content, rng, out, actor);
        return;
    }
    entry.queue.extend(split_statements(line));
    drain(state, content, rng, out, actor);
}

/// Run queued commands until the queue is empty or a delayed command (or GRIPE) parks the actor.
pub fn drain(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
    actor: ActorId,
) {
    loop {
        let Some(entry) = state.actors.get_mut(&actor) else {
            return;
        };
        if entry.busy || entry.pending.is_some() || entry.limbo {
            return;
        }
        let Some(statement) = entry.queue.pop_front() else {
            return;
        };
        entry.busy = true;
        let words = split_words(&statement);
        debug!(%actor, %statement, "dispatch");

        let result = commands::dispatch(state, content, rng, out, actor, &words);
        let lost = registry::settle_exhausted_ship(state, content, out, actor);
        match result {
            Ok(Completion::Immediate { timed }) => {
                // Still busy during the advance, so a sweep never hands this actor new orders.
                if timed {
                    world_tick::on_attributed_advance(state, content, rng, out, actor);
                } else {
                    state.clock.nudge_pending = true;
                }
                release(state, actor);
            }
            Ok(Completion::Delayed { .. }) if lost => {
                release(state, actor);
                return;
            }
            Ok(Completion::Delayed { delay_ms, action }) => {
                let id = state.counters.next_action_id;
                state.counters.next_action_id += 1;
                let due_ms = state.meta.now_ms + delay_ms;
                if let Some(entry) = state.actors.get_mut(&actor) {
                    entry.pending = Some(PendingAction { id, due_ms, action });
                }
                out.timers.push(TimerRequest {
                    actor,
                    action_id: id,
                    delay_ms,
                });
                return;
            }
            Err(err) => {
                notify(state, out, actor, err.to_string());
                release(state, actor);
            }
        }
    }
}

fn release(state: &mut GameState, actor: ActorId) {
    if let Some(entry) = state.actors.get_mut(&actor) {
        entry.busy = false;
    }
}

/// Timer callback. Ignores timers that were cancelled or superseded.
///
/// The continuation re-checks every precondition; a failure is reported to the
/// actor like any other validation error. Either way the wait consumed game time.
pub fn complete_delayed(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
    actor: ActorId,
    action_id: u64,
) -> bool {
    let Some(entry) = state.actors.get_mut(&actor) else {
        return false;
    };
    let action = match entry.pending.take() {
        Some(pending) if pending.id == action_id => pending.action,
        other => {
            entry.pending = other;
            warn!(%actor, action_id, "stale timer ignored");
            return false;
        }
    };

    if let Err(err) = commands::resume(state, content, out, actor, action) {
        notify(state, out, actor, err.to_string());
    }
    registry::settle_exhausted_ship(state, content, out, actor);
    world_tick::on_attributed_advance(state, content, rng, out, actor);
    release(state, actor);
    drain(state, content, rng, out, actor);
    true
}

/// Abort whatever `actor` is doing: clear the queue, cancel the timer, leave limbo.
pub fn interrupt(state: &mut GameState, out: &mut Outbox, actor: ActorId) {
    let Some(entry) = state.actors.get_mut(&actor) else {
        return;
    };
    entry.queue.clear();
    entry.busy = false;
    let pending = entry.pending.take();
    let had_timer = pending.is_some();
    let in_limbo = entry.limbo;
    if let Some(pending) = pending {
        out.cancelled.push(actor);
        commands::refund(state, actor, pending.action.upfront_cost());
    }
    registry::release_capture_locks(state, actor);
    if in_limbo {
        commands::reports::leave_limbo(state, actor);
    }
    debug!(%actor, had_timer, "interrupted");
    notify(state, out, actor, "Interrupted.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_split_on_separator() {
        assert_eq!(
            split_statements("sh up / ph 200 10 10//st"),
            vec!["sh up", "ph 200 10 10", "st"]
        );
    }

    #[test]
    fn words_split_on_spaces_commas_and_semicolon() {
        assert_eq!(
            split_words("te all;hello,there  friend"),
            vec!["te", "all", ";", "hello", "there", "friend"]
        );
    }
}
