use super::*;
use crate::test_fixtures::{add_base, add_planet, add_ship, base_content, base_state, make_rng};

mod commands;
mod world_tick;

// --- Shared test helpers ------------------------------------------------

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

/// Two ships facing each other across one empty sector.
fn duel(content: &GameContent) -> (GameState, ActorId, ActorId) {
    let mut state = base_state(content);
    let attacker = add_ship(&mut state, content, "LEXINGTON", Side::Federation, Position::new(10, 10));
    let target = add_ship(&mut state, content, "COBRA", Side::Empire, Position::new(10, 12));
    (state, attacker, target)
}

/// Submit one line and hand back everything it produced.
fn run_line(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl rand::Rng,
    actor: ActorId,
    line: &str,
) -> Outbox {
    let mut out = Outbox::new();
    crate::scheduler::submit_line(state, content, rng, &mut out, actor, line);
    out
}

/// Fire the pending timer for `actor`, as the runtime would once it expires.
fn fire_timer(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl rand::Rng,
    actor: ActorId,
) -> Outbox {
    let id = state.actors[&actor]
        .pending
        .as_ref()
        .map(|p| p.id)
        .expect("actor should have a pending action");
    let mut out = Outbox::new();
    assert!(crate::scheduler::complete_delayed(state, content, rng, &mut out, actor, id));
    out
}

fn count_events(out: &Outbox, matches: impl Fn(&Event) -> bool) -> usize {
    out.events.iter().filter(|e| matches(&e.event)).count()
}

#[test]
fn event_ids_are_sequential_and_stamped_with_stardate() {
    let mut counters = Counters::default();
    let a = emit(&mut counters, 7, Event::ShipUndocked { actor: ActorId(1) });
    let b = emit(&mut counters, 8, Event::ShipUndocked { actor: ActorId(1) });
    assert_eq!(a.id.0, "evt_000000");
    assert_eq!(b.id.0, "evt_000001");
    assert_eq!(a.tick, 7);
    assert_eq!(counters.next_event_id, 2);
}

#[test]
fn state_survives_json_round_trip() {
    let content = base_content();
    let mut state = base_state(&content);
    add_ship(&mut state, &content, "LEXINGTON", Side::Federation, Position::new(3, 4));
    add_base(&mut state, &content, Position::new(20, 20), Side::Empire);
    add_planet(&mut state, Position::new(30, 30), Side::Neutral, 2);
    let json = serde_json::to_string(&state).unwrap();
    let back: GameState = serde_json::from_str(&json).unwrap();
    assert_eq!(back, state);
}

#[test]
fn seeded_rng_is_reproducible() {
    use rand::Rng;
    let mut a = make_rng();
    let mut b = make_rng();
    let xs: Vec<u32> = (0..5).map(|_| a.gen()).collect();
    let ys: Vec<u32> = (0..5).map(|_| b.gen()).collect();
    assert_eq!(xs, ys);
}
