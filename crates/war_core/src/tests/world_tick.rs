use super::*;
use crate::test_fixtures::{ship, ship_mut};
use crate::world_tick::{advance, on_attributed_advance, on_idle_tick, on_nudge};

fn fleet(content: &GameContent, n: usize) -> (GameState, Vec<ActorId>) {
    let mut state = base_state(content);
    let ids = (0..n)
        .map(|i| {
            let spread = i32::try_from(i).unwrap() * 12 + 2;
            let side = if i % 2 == 0 { Side::Federation } else { Side::Empire };
            add_ship(&mut state, content, &format!("SHIP-{i}"), side, Position::new(spread, spread))
        })
        .collect();
    (state, ids)
}

#[test]
fn one_sweep_per_population_worth_of_advances() {
    let content = base_content();
    for n in [1usize, 2, 5] {
        let (mut state, ids) = fleet(&content, n);
        let mut rng = make_rng();
        let mut out = Outbox::new();
        let mut closed = 0;
        for round in 0..3 {
            for (i, actor) in ids.iter().enumerate() {
                let last = i + 1 == ids.len();
                let swept = on_attributed_advance(&mut state, &content, &mut rng, &mut out, *actor);
                assert_eq!(swept, last, "n={n} round={round} i={i}");
                closed += usize::from(swept);
            }
        }
        assert_eq!(closed, 3);
        assert_eq!(state.clock.sweeps, 3);
        assert_eq!(state.clock.stardate, 3 * n as u64);
        assert_eq!(
            count_events(&out, |e| matches!(e, Event::SweepCompleted { .. })),
            3
        );
    }
}

#[test]
fn advance_is_inert_while_a_sweep_runs() {
    let content = base_content();
    let (mut state, ids) = fleet(&content, 1);
    state.clock.sweeping = true;
    let mut out = Outbox::new();
    assert!(!advance(&mut state, &content, &mut make_rng(), &mut out, Some(ids[0]), true));
    assert_eq!(state.clock.stardate, 0);
    assert_eq!(state.clock.sweeps, 0);
    assert_eq!(state.actors[&ids[0]].personal_clock, 0);
}

#[test]
fn idle_ticks_advance_the_world_without_crediting_anyone() {
    let content = base_content();
    let (mut state, ids) = fleet(&content, 1);
    let mut rng = make_rng();
    let mut out = Outbox::new();

    for _ in 1..content.constants.idle_window_ticks {
        assert!(!on_idle_tick(&mut state, &content, &mut rng, &mut out));
    }
    assert_eq!(state.clock.stardate, 0);
    assert!(on_idle_tick(&mut state, &content, &mut rng, &mut out));
    assert_eq!(state.clock.stardate, 1);
    assert_eq!(state.actors[&ids[0]].personal_clock, 0);
    assert!(state.clock.side_turns.is_empty());
}

#[test]
fn attributed_advance_resets_the_idle_window() {
    let content = base_content();
    let (mut state, ids) = fleet(&content, 2);
    let mut rng = make_rng();
    let mut out = Outbox::new();

    on_idle_tick(&mut state, &content, &mut rng, &mut out);
    on_idle_tick(&mut state, &content, &mut rng, &mut out);
    on_attributed_advance(&mut state, &content, &mut rng, &mut out, ids[0]);
    assert_eq!(state.clock.idle_ticks, 0);
    assert_eq!(state.clock.side_turns.get(&Side::Federation), Some(&1));
    assert_eq!(state.actors[&ids[0]].personal_clock, 1);
}

#[test]
fn nudge_fires_once_after_a_free_command() {
    let content = base_content();
    let (mut state, ids) = fleet(&content, 1);
    let mut rng = make_rng();

    run_line(&mut state, &content, &mut rng, ids[0], "TIME");
    let mut out = Outbox::new();
    assert!(on_nudge(&mut state, &content, &mut rng, &mut out));
    assert_eq!(state.clock.stardate, 1);
    assert!(!on_nudge(&mut state, &content, &mut rng, &mut out));
    assert_eq!(state.clock.stardate, 1);
}

#[test]
fn failed_life_support_counts_down_reserves_and_kills_the_crew() {
    let content = base_content();
    let (mut state, ids) = fleet(&content, 1);
    let actor = ids[0];
    ship_mut(&mut state, actor)
        .devices
        .set(Device::LifeSupport, content.constants.device_inoperative_damage);
    let mut rng = make_rng();
    let mut out = Outbox::new();

    on_attributed_advance(&mut state, &content, &mut rng, &mut out, actor);
    assert_eq!(ship(&state, actor).life_support_reserve, 4);
    assert!(out.lines_for(actor)[0].starts_with("WARNING: life support failing."));

    for _ in 0..4 {
        on_attributed_advance(&mut state, &content, &mut rng, &mut out, actor);
    }
    assert!(state.actors[&actor].ship.is_none());
    assert_eq!(
        count_events(&out, |e| matches!(e, Event::ShipDestroyed { by: None, .. })),
        1
    );
}

#[test]
fn docked_ships_do_not_use_life_support_reserves() {
    let content = base_content();
    let (mut state, ids) = fleet(&content, 1);
    let actor = ids[0];
    let here = ship(&state, actor).position;
    let planet = crate::test_fixtures::add_planet(&mut state, here.offset(0, 1), Side::Federation, 0);
    let s = ship_mut(&mut state, actor);
    s.devices.set(Device::LifeSupport, 1000.0);
    s.docked_at = Some(planet);

    let mut out = Outbox::new();
    on_attributed_advance(&mut state, &content, &mut make_rng(), &mut out, actor);
    assert_eq!(ship(&state, actor).life_support_reserve, 5);
}
