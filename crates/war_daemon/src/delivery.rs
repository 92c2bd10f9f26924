//! Drains an [`Outbox`] into the runtime: text to sessions, events to the
//! broadcast channel, timer requests to sleeping tasks.

use std::time::Duration;
use tracing::debug;
use war_core::{scheduler, ActorId, Outbox, TimerRequest};

use crate::state::{AppState, SimState};

pub fn deliver(app: &AppState, sim: &mut SimState, out: Outbox) {
    let Outbox {
        lines,
        events,
        timers,
        cancelled,
    } = out;

    for line in lines {
        if let Some(writer) = sim.writers.get(&line.to) {
            // A closed writer means the session is going away; its reader cleans up.
            let _ = writer.send(line.text);
        }
    }
    if !events.is_empty() {
        // No subscribers is fine.
        let _ = app.event_tx.send(events);
    }
    for actor in cancelled {
        if let Some(handle) = sim.timers.remove(&actor) {
            handle.abort();
        }
    }
    for request in timers {
        arm_timer(app, sim, request);
    }
}

fn arm_timer(app: &AppState, sim: &mut SimState, request: TimerRequest) {
    let TimerRequest {
        actor,
        action_id,
        delay_ms,
    } = request;
    // Interrupted or disconnected within the same call.
    let still_pending = sim
        .game_state
        .actors
        .get(&actor)
        .and_then(|a| a.pending.as_ref())
        .is_some_and(|p| p.id == action_id);
    if !still_pending {
        return;
    }
    let task_app = app.clone();
    let handle = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        fire_timer(&task_app, actor, action_id);
    });
    if let Some(previous) = sim.timers.insert(actor, handle) {
        previous.abort();
    }
}

fn fire_timer(app: &AppState, actor: ActorId, action_id: u64) {
    let mut guard = app.sim.lock();
    let sim = &mut *guard;
    sim.stamp();
    let current = sim
        .game_state
        .actors
        .get(&actor)
        .and_then(|a| a.pending.as_ref())
        .is_some_and(|p| p.id == action_id);
    if current {
        sim.timers.remove(&actor);
    }
    let mut out = Outbox::new();
    let fired = scheduler::complete_delayed(
        &mut sim.game_state,
        &sim.content,
        &mut sim.rng,
        &mut out,
        actor,
        action_id,
    );
    debug!(%actor, action_id, fired, "timer fired");
    deliver(app, sim, out);
}
