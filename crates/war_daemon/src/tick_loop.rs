use std::time::Duration;
use war_core::{world_tick, GameContent, GameState, Outbox};

use crate::delivery::deliver;
use crate::state::AppState;

pub const IDLE_PERIOD: Duration = Duration::from_secs(1);
pub const NUDGE_PERIOD: Duration = Duration::from_millis(250);

type TickFn = fn(&mut GameState, &GameContent, &mut rand_chacha::ChaCha8Rng, &mut Outbox) -> bool;

/// Idle fallback: advances the world once every idle window with no attributed actions.
pub async fn run_idle_loop(app: AppState) {
    run_periodic(app, IDLE_PERIOD, world_tick::on_idle_tick).await;
}

/// Advances the world shortly after an instantaneous command.
pub async fn run_nudge_loop(app: AppState) {
    run_periodic(app, NUDGE_PERIOD, world_tick::on_nudge).await;
}

async fn run_periodic(app: AppState, period: Duration, tick: TickFn) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    interval.tick().await; // discard the immediate first tick
    loop {
        interval.tick().await;
        run_once(&app, tick);
    }
}

fn run_once(app: &AppState, tick: TickFn) -> bool {
    let mut guard = app.sim.lock();
    let sim = &mut *guard;
    sim.stamp();
    let mut out = Outbox::new();
    let swept = tick(&mut sim.game_state, &sim.content, &mut sim.rng, &mut out);
    deliver(app, sim, out);
    swept
}
