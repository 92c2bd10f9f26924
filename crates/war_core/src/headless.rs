//! Simulated clock for running a game without a network runtime.
//!
//! Plays the part the daemon plays with real timers: delayed-action callbacks,
//! the idle fallback tick and the nudge tick, all driven from one priority
//! queue over `meta.now_ms`. Used by the headless CLI and by integration tests.

use rand::Rng;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::comms::Outbox;
use crate::{scheduler, world_tick, ActorId, GameContent, GameState};

pub const IDLE_PERIOD_MS: u64 = 1000;
pub const NUDGE_PERIOD_MS: u64 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct ScheduledTimer {
    due_ms: u64,
    action_id: u64,
    actor: ActorId,
}

#[derive(Debug)]
pub struct SimClock {
    timers: BinaryHeap<Reverse<ScheduledTimer>>,
    next_idle_ms: u64,
    next_nudge_ms: u64,
}

impl SimClock {
    pub fn new(now_ms: u64) -> Self {
        Self {
            timers: BinaryHeap::new(),
            next_idle_ms: now_ms + IDLE_PERIOD_MS,
            next_nudge_ms: now_ms + NUDGE_PERIOD_MS,
        }
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Pick up timer requests and cancellations from `out`. Lines and events are left alone.
    pub fn absorb(&mut self, state: &GameState, out: &mut Outbox) {
        for actor in out.cancelled.drain(..) {
            self.timers.retain(|Reverse(t)| t.actor != actor);
        }
        for request in out.timers.drain(..) {
            self.timers.push(Reverse(ScheduledTimer {
                due_ms: state.meta.now_ms + request.delay_ms,
                action_id: request.action_id,
                actor: request.actor,
            }));
        }
    }

    /// Jump to the next due timer or periodic tick and run it.
    pub fn step(
        &mut self,
        state: &mut GameState,
        content: &GameContent,
        rng: &mut impl Rng,
        out: &mut Outbox,
    ) {
        let timer_due = self.timers.peek().map(|Reverse(t)| t.due_ms);
        let periodic_due = self.next_idle_ms.min(self.next_nudge_ms);

        match timer_due {
            Some(due) if due <= periodic_due => {
                let Some(Reverse(timer)) = self.timers.pop() else {
                    return;
                };
                state.meta.now_ms = state.meta.now_ms.max(due);
                scheduler::complete_delayed(state, content, rng, out, timer.actor, timer.action_id);
            }
            _ if self.next_idle_ms <= self.next_nudge_ms => {
                state.meta.now_ms = state.meta.now_ms.max(self.next_idle_ms);
                self.next_idle_ms += IDLE_PERIOD_MS;
                world_tick::on_idle_tick(state, content, rng, out);
            }
            _ => {
                state.meta.now_ms = state.meta.now_ms.max(self.next_nudge_ms);
                self.next_nudge_ms += NUDGE_PERIOD_MS;
                world_tick::on_nudge(state, content, rng, out);
            }
        }
        self.absorb(state, out);
    }

    /// Run until the game clock reaches `until_ms`, handing each step's outbox to `sink`.
    pub fn run_until(
        &mut self,
        state: &mut GameState,
        content: &GameContent,
        rng: &mut impl Rng,
        until_ms: u64,
        mut sink: impl FnMut(&GameState, Outbox),
    ) {
        let mut out = Outbox::new();
        while state.meta.now_ms < until_ms {
            self.step(state, content, rng, &mut out);
            sink(state, out.take());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{add_ship, base_content, base_state, make_rng};
    use crate::{Position, Side};

    #[test]
    fn idle_ticks_fire_every_second() {
        let content = base_content();
        let mut state = base_state(&content);
        add_ship(&mut state, &content, "LEXINGTON", Side::Federation, Position::new(5, 5));
        let mut rng = make_rng();
        let mut clock = SimClock::new(0);

        clock.run_until(&mut state, &content, &mut rng, 3000, |_, _| {});

        assert_eq!(state.meta.now_ms, 3000);
        // Idle window of 3 ticks: exactly one fallback advance in three seconds.
        assert_eq!(state.clock.stardate, 1);
    }

    #[test]
    fn delayed_command_completes_on_schedule() {
        let content = base_content();
        let mut state = base_state(&content);
        let actor = add_ship(&mut state, &content, "LEXINGTON", Side::Federation, Position::new(5, 5));
        let mut rng = make_rng();
        let mut out = Outbox::new();
        let mut clock = SimClock::new(0);

        scheduler::submit_line(&mut state, &content, &mut rng, &mut out, actor, "IMPULSE R 0 1");
        clock.absorb(&state, &mut out);
        assert_eq!(clock.pending_timers(), 1);

        clock.step(&mut state, &content, &mut rng, &mut out);
        assert_eq!(state.meta.now_ms, content.constants.impulse_delay_ms);
        assert_eq!(clock.pending_timers(), 0);
        assert_eq!(state.actors[&actor].ship.as_ref().unwrap().position, Position::new(5, 6));
    }

    #[test]
    fn cancelled_timers_are_dropped() {
        let content = base_content();
        let mut state = base_state(&content);
        let actor = add_ship(&mut state, &content, "LEXINGTON", Side::Federation, Position::new(5, 5));
        let mut rng = make_rng();
        let mut out = Outbox::new();
        let mut clock = SimClock::new(0);

        scheduler::submit_line(&mut state, &content, &mut rng, &mut out, actor, "IMPULSE R 0 1");
        clock.absorb(&state, &mut out);
        scheduler::interrupt(&mut state, &mut out, actor);
        clock.absorb(&state, &mut out);

        assert_eq!(clock.pending_timers(), 0);
    }
}
