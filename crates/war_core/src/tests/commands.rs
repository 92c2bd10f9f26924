use super::*;
use crate::test_fixtures::{add_planet, ship, ship_mut};

fn solo(content: &GameContent) -> (GameState, ActorId) {
    let mut state = base_state(content);
    let actor = add_ship(&mut state, content, "LEXINGTON", Side::Federation, Position::new(10, 10));
    (state, actor)
}

// --- SHIELDS ---------------------------------------------------------------

#[test]
fn raising_shields_costs_once_and_lowering_is_free() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    let mut rng = make_rng();

    run_line(&mut state, &content, &mut rng, actor, "SHIELDS UP");
    assert!(ship(&state, actor).shields_up);
    assert!(approx(ship(&state, actor).energy, 4900.0));

    let out = run_line(&mut state, &content, &mut rng, actor, "SH UP");
    assert_eq!(out.lines_for(actor), vec!["Shields are already up."]);
    assert!(approx(ship(&state, actor).energy, 4900.0));

    run_line(&mut state, &content, &mut rng, actor, "SH DOWN");
    assert!(!ship(&state, actor).shields_up);
    assert!(approx(ship(&state, actor).energy, 4900.0));
}

#[test]
fn short_output_gets_the_terse_variant() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    let mut rng = make_rng();
    run_line(&mut state, &content, &mut rng, actor, "SET OUTPUT SHORT");
    let out = run_line(&mut state, &content, &mut rng, actor, "SH UP");
    assert_eq!(out.lines_for(actor), vec!["SH > UP"]);
}

#[test]
fn shield_transfer_moves_energy_both_ways() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    ship_mut(&mut state, actor).shield_energy = 1000.0;
    let mut rng = make_rng();

    run_line(&mut state, &content, &mut rng, actor, "SHIELDS TRANSFER 600");
    assert!(approx(ship(&state, actor).shield_energy, 1600.0));
    assert!(approx(ship(&state, actor).energy, 4400.0));

    run_line(&mut state, &content, &mut rng, actor, "SHIELDS TRANSFER -300");
    assert!(approx(ship(&state, actor).shield_energy, 1300.0));
    assert!(approx(ship(&state, actor).energy, 4700.0));
}

// --- PHASERS / TORPEDOES ---------------------------------------------------

#[test]
fn phasers_alternate_banks_then_report_recharging() {
    let content = base_content();
    let (mut state, attacker, target) = duel(&content);
    ship_mut(&mut state, target).shields_up = true;
    let mut rng = make_rng();

    for _ in 0..2 {
        let out = run_line(&mut state, &content, &mut rng, attacker, "PHASERS A 200 10 12");
        assert_eq!(
            count_events(&out, |e| matches!(e, Event::PhaserFired { .. })),
            1
        );
    }
    assert!(approx(ship(&state, attacker).energy, 4600.0));
    let banks = ship(&state, attacker).phaser_banks;
    assert!(banks[0] > 0 && banks[1] > 0);

    let out = run_line(&mut state, &content, &mut rng, attacker, "PHASERS A 200 10 12");
    assert_eq!(out.lines_for(attacker), vec!["Both phaser banks are recharging."]);
    assert!(approx(ship(&state, attacker).energy, 4600.0));
}

#[test]
fn shields_up_phaser_pays_the_surcharge() {
    let content = base_content();
    let (mut state, attacker, _) = duel(&content);
    ship_mut(&mut state, attacker).shields_up = true;
    let mut rng = make_rng();
    run_line(&mut state, &content, &mut rng, attacker, "PH A 100 10 12");
    assert!(approx(ship(&state, attacker).energy, 5000.0 - 100.0 - 200.0));
}

#[test]
fn phasers_out_of_range_or_at_nothing_are_rejected() {
    let content = base_content();
    let (mut state, attacker, _) = duel(&content);
    let mut rng = make_rng();

    let out = run_line(&mut state, &content, &mut rng, attacker, "PH A 200 10 30");
    assert_eq!(
        out.lines_for(attacker),
        vec!["Target is 20 sectors away; maximum range is 10."]
    );
    let out = run_line(&mut state, &content, &mut rng, attacker, "PH A 200 11 11");
    assert_eq!(out.lines_for(attacker), vec!["Nothing to fire at in sector 11-11."]);
    assert!(approx(ship(&state, attacker).energy, 5000.0));
}

#[test]
fn computed_phaser_targets_a_ship_by_name() {
    let content = base_content();
    let (mut state, attacker, target) = duel(&content);
    let mut rng = make_rng();
    let out = run_line(&mut state, &content, &mut rng, attacker, "PH C COB");
    assert!(ship(&state, target).damage > 0.0);
    assert!(out.lines_for(target).iter().any(|l| l.contains("LEXINGTON's phasers hit you")));
}

#[test]
fn oversized_torpedo_volley_is_a_usage_error() {
    let content = base_content();
    let (mut state, attacker, _) = duel(&content);
    let mut rng = make_rng();
    let out = run_line(&mut state, &content, &mut rng, attacker, "TORPEDOES A 4 10 12");
    assert!(out.lines_for(attacker)[0].starts_with("Usage: TORPEDOES"));
    assert_eq!(ship(&state, attacker).torpedoes, 10);
    assert!(out.timers.is_empty());
}

#[test]
fn torpedo_volley_fires_now_and_reloads_on_the_timer() {
    let content = base_content();
    let (mut state, attacker, target) = duel(&content);
    let mut rng = make_rng();

    let out = run_line(&mut state, &content, &mut rng, attacker, "TO A 2 10 12");
    assert_eq!(ship(&state, attacker).torpedoes, 8);
    assert_eq!(out.timers.len(), 1);
    assert!(out.timers[0].delay_ms >= 2000);
    assert_eq!(
        count_events(&out, |e| matches!(e, Event::TorpedoFired { .. })),
        2
    );
    assert!(state.actors[&target].ship.is_none() || ship(&state, target).damage > 0.0);

    let out = fire_timer(&mut state, &content, &mut rng, attacker);
    assert_eq!(out.lines_for(attacker)[0], "Torpedo tubes reloaded; 8 remaining.");
}

// --- MOVE / IMPULSE --------------------------------------------------------

#[test]
fn warp_charges_up_front_and_arrives_on_the_timer() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    let mut rng = make_rng();

    let out = run_line(&mut state, &content, &mut rng, actor, "MOVE A 10 13");
    assert!(approx(ship(&state, actor).energy, 5000.0 - 9.0));
    assert_eq!(ship(&state, actor).position, Position::new(10, 10));
    assert_eq!(out.timers.len(), 1);

    fire_timer(&mut state, &content, &mut rng, actor);
    assert_eq!(ship(&state, actor).position, Position::new(10, 13));
}

#[test]
fn warp_stops_short_of_an_obstacle() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    state.stars.push(Position::new(10, 12));
    let mut rng = make_rng();

    let out = run_line(&mut state, &content, &mut rng, actor, "M R 0 4");
    assert!(out
        .lines_for(actor)
        .contains(&"Navigation Officer: Collision averted, Captain!"));
    assert!(approx(ship(&state, actor).energy, 5000.0 - 16.0));
    fire_timer(&mut state, &content, &mut rng, actor);
    assert_eq!(ship(&state, actor).position, Position::new(10, 11));
}

#[test]
fn warp_beyond_the_limit_is_refused() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    let mut rng = make_rng();
    let out = run_line(&mut state, &content, &mut rng, actor, "MOVE A 10 20");
    assert_eq!(
        out.lines_for(actor),
        vec!["Warp 10 exceeds the maximum of warp 6."]
    );
    assert!(approx(ship(&state, actor).energy, 5000.0));
}

#[test]
fn impulse_moves_one_sector() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    let mut rng = make_rng();
    let out = run_line(&mut state, &content, &mut rng, actor, "IMPULSE R 1 1");
    assert_eq!(out.timers[0].delay_ms, content.constants.impulse_delay_ms);
    fire_timer(&mut state, &content, &mut rng, actor);
    assert_eq!(ship(&state, actor).position, Position::new(11, 11));
    assert!(approx(ship(&state, actor).energy, 4999.0));
}

#[test]
fn tractored_partner_trails_behind() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    let partner = add_ship(&mut state, &content, "EXCALIBUR", Side::Federation, Position::new(10, 9));
    let mut rng = make_rng();

    let out = run_line(&mut state, &content, &mut rng, actor, "TRACTOR EXC");
    assert_eq!(out.lines_for(actor), vec!["Tractor beam locked on to EXCALIBUR."]);
    run_line(&mut state, &content, &mut rng, actor, "MOVE A 10 13");
    assert!(approx(ship(&state, actor).energy, 5000.0 - 27.0));
    fire_timer(&mut state, &content, &mut rng, actor);
    assert_eq!(ship(&state, actor).position, Position::new(10, 13));
    assert_eq!(ship(&state, partner).position, Position::new(10, 12));
}

// --- running dry ------------------------------------------------------------

fn assert_lost_without_credit(state: &GameState, out: &Outbox, actor: ActorId) {
    assert!(crate::registry::ship(state, actor).is_none(), "ship should be gone");
    assert_eq!(
        count_events(out, |e| matches!(
            e,
            Event::ShipDestroyed { actor: a, by: None, .. } if *a == actor
        )),
        1
    );
    for side in [Side::Federation, Side::Empire] {
        assert_eq!(
            state.ledger.side(side).get(ScoreCategory::EnemiesDestroyed),
            0
        );
    }
}

#[test]
fn phasers_that_drain_the_last_energy_lose_the_ship() {
    let content = base_content();
    let (mut state, attacker, target) = duel(&content);
    ship_mut(&mut state, attacker).energy = 300.0;
    let mut rng = make_rng();

    let out = run_line(&mut state, &content, &mut rng, attacker, "PH A 500 10 12");
    assert_eq!(
        count_events(&out, |e| matches!(e, Event::PhaserFired { power, .. } if approx(*power, 300.0))),
        1
    );
    assert_lost_without_credit(&state, &out, attacker);
    assert!(crate::registry::ship(&state, target).is_some());
}

#[test]
fn shield_transfer_of_every_unit_loses_the_ship() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    ship_mut(&mut state, actor).energy = 100.0;
    ship_mut(&mut state, actor).shield_energy = 0.0;
    let mut rng = make_rng();

    let out = run_line(&mut state, &content, &mut rng, actor, "SHIELDS TRANSFER 100");
    assert_lost_without_credit(&state, &out, actor);
}

#[test]
fn warp_costing_exactly_the_remaining_energy_loses_the_ship() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    ship_mut(&mut state, actor).energy = 9.0;
    let mut rng = make_rng();

    let out = run_line(&mut state, &content, &mut rng, actor, "MOVE A 10 13 / STATUS");
    assert_lost_without_credit(&state, &out, actor);
    assert!(out.timers.is_empty());
    let entry = &state.actors[&actor];
    assert!(entry.pending.is_none() && entry.queue.is_empty() && !entry.busy);
}

#[test]
fn interrupted_warp_refunds_its_energy() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    let mut rng = make_rng();

    run_line(&mut state, &content, &mut rng, actor, "MOVE A 10 13");
    assert!(approx(ship(&state, actor).energy, 5000.0 - 9.0));
    let mut out = Outbox::new();
    crate::scheduler::interrupt(&mut state, &mut out, actor);
    assert!(approx(ship(&state, actor).energy, 5000.0));
    assert_eq!(ship(&state, actor).position, Position::new(10, 10));
}

// --- planets ---------------------------------------------------------------

#[test]
fn capturing_a_neutral_planet_takes_a_lock_and_then_the_planet() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    let planet = add_planet(&mut state, Position::new(10, 11), Side::Neutral, 0);
    let mut rng = make_rng();

    let out = run_line(&mut state, &content, &mut rng, actor, "CAPTURE A 10 11");
    assert_eq!(out.timers[0].delay_ms, content.constants.capture_delay_min_ms);
    assert_eq!(
        state.planets[0].capture_lock.map(|l| l.holder),
        Some(actor)
    );

    let out = fire_timer(&mut state, &content, &mut rng, actor);
    assert_eq!(state.planets[0].side, Side::Federation);
    assert!(state.planets[0].capture_lock.is_none());
    assert_eq!(
        state.ledger.actor(actor).get(ScoreCategory::PlanetsCaptured),
        1
    );
    assert_eq!(
        count_events(&out, |e| matches!(e, Event::PlanetCaptured { planet: p, .. } if *p == planet)),
        1
    );
}

#[test]
fn capture_needs_shields_down_and_no_rival_lock() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    let rival = add_ship(&mut state, &content, "EXCALIBUR", Side::Federation, Position::new(11, 12));
    add_planet(&mut state, Position::new(10, 11), Side::Empire, 2);
    ship_mut(&mut state, actor).shields_up = true;
    let mut rng = make_rng();

    let out = run_line(&mut state, &content, &mut rng, actor, "CAPTURE");
    assert_eq!(out.lines_for(actor), vec!["Shields must be down to do that."]);

    run_line(&mut state, &content, &mut rng, rival, "CAPTURE A 10 11");
    ship_mut(&mut state, actor).shields_up = false;
    let out = run_line(&mut state, &content, &mut rng, actor, "CAPTURE A 10 11");
    assert_eq!(
        out.lines_for(actor),
        vec!["Another ship is already capturing that planet."]
    );
}

#[test]
fn capturing_an_owned_planet_strips_builds_first() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    add_planet(&mut state, Position::new(10, 11), Side::Empire, 2);
    let mut rng = make_rng();

    run_line(&mut state, &content, &mut rng, actor, "CAPTURE");
    assert!(approx(ship(&state, actor).energy, 4900.0));
    fire_timer(&mut state, &content, &mut rng, actor);
    assert_eq!(state.planets[0].builds, 1);
    assert_eq!(state.planets[0].side, Side::Empire);
}

#[test]
fn capture_that_fails_its_recheck_refunds_the_energy() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    add_planet(&mut state, Position::new(10, 11), Side::Empire, 2);
    let mut rng = make_rng();

    run_line(&mut state, &content, &mut rng, actor, "CAPTURE");
    assert!(approx(ship(&state, actor).energy, 4900.0));
    state.planets[0].side = Side::Federation;

    let out = fire_timer(&mut state, &content, &mut rng, actor);
    assert!(out
        .lines_for(actor)
        .contains(&"That planet belongs to the Federation."));
    assert!(approx(ship(&state, actor).energy, 5000.0));
    assert_eq!(state.planets[0].builds, 2);
}

#[test]
fn interrupted_capture_refunds_and_releases_the_lock() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    add_planet(&mut state, Position::new(10, 11), Side::Empire, 2);
    let mut rng = make_rng();

    run_line(&mut state, &content, &mut rng, actor, "CAPTURE");
    let mut out = Outbox::new();
    crate::scheduler::interrupt(&mut state, &mut out, actor);
    assert!(approx(ship(&state, actor).energy, 5000.0));
    assert!(state.planets[0].capture_lock.is_none());
}

#[test]
fn fifth_build_promotes_the_planet_to_a_base() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    let planet = add_planet(&mut state, Position::new(10, 11), Side::Federation, 4);
    let mut rng = make_rng();

    let out = run_line(&mut state, &content, &mut rng, actor, "BUILD");
    assert_eq!(out.timers.len(), 1);
    fire_timer(&mut state, &content, &mut rng, actor);

    assert!(state.planets[0].is_base);
    assert_eq!(state.bases.federation, vec![planet]);
    assert!(approx(state.planets[0].energy, content.constants.max_base_energy));
    assert_eq!(state.ledger.actor(actor).get(ScoreCategory::BasesBuilt), 1);

    let out = run_line(&mut state, &content, &mut rng, actor, "BUILD A 10 11");
    assert_eq!(out.lines_for(actor), vec!["That planet is fully fortified."]);
}

#[test]
fn docking_at_a_base_resupplies_more_than_a_planet() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    add_base(&mut state, &content, Position::new(10, 11), Side::Federation);
    let s = ship_mut(&mut state, actor);
    s.energy = 1000.0;
    s.torpedoes = 0;
    s.damage = 300.0;
    s.shields_up = true;
    let mut rng = make_rng();

    run_line(&mut state, &content, &mut rng, actor, "DOCK");
    fire_timer(&mut state, &content, &mut rng, actor);
    let s = ship(&state, actor);
    assert!(approx(s.energy, 2000.0));
    assert_eq!(s.torpedoes, 10);
    assert!(approx(s.damage, 200.0));
    assert!(!s.shields_up);
    assert!(s.docked_at.is_some());
}

// --- ENERGY / REPAIR -------------------------------------------------------

#[test]
fn energy_transfer_loses_ten_percent_in_transit() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    let friend = add_ship(&mut state, &content, "EXCALIBUR", Side::Federation, Position::new(10, 11));
    ship_mut(&mut state, friend).energy = 3000.0;
    let mut rng = make_rng();

    run_line(&mut state, &content, &mut rng, actor, "ENERGY EXC 1000");
    assert!(approx(ship(&state, actor).energy, 4000.0));
    assert!(approx(ship(&state, friend).energy, 3900.0));
}

#[test]
fn repair_takes_time_and_fixes_devices() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    ship_mut(&mut state, actor).devices.set(Device::Warp, 200.0);
    let mut rng = make_rng();

    let out = run_line(&mut state, &content, &mut rng, actor, "REPAIR 100");
    assert_eq!(out.timers[0].delay_ms, 100 * content.constants.repair_ms_per_unit);
    fire_timer(&mut state, &content, &mut rng, actor);
    assert!(approx(ship(&state, actor).devices.get(Device::Warp), 100.0));
}

#[test]
fn repair_with_nothing_broken_is_refused() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    let mut rng = make_rng();
    let out = run_line(&mut state, &content, &mut rng, actor, "REPAIR");
    assert_eq!(
        out.lines_for(actor),
        vec!["All systems are fully operational. No repairs needed."]
    );
    assert!(out.timers.is_empty());
}

// --- TELL / RADIO / reports ------------------------------------------------

#[test]
fn tell_respects_gags_and_echoes_to_the_sender() {
    let content = base_content();
    let mut state = base_state(&content);
    let sender = add_ship(&mut state, &content, "LEXINGTON", Side::Federation, Position::new(5, 5));
    let deaf = add_ship(&mut state, &content, "COBRA", Side::Empire, Position::new(40, 40));
    let ally = add_ship(&mut state, &content, "EXCALIBUR", Side::Federation, Position::new(60, 60));
    let mut rng = make_rng();

    run_line(&mut state, &content, &mut rng, deaf, "RADIO GAG LEX");
    let out = run_line(&mut state, &content, &mut rng, sender, "TELL ALL; hold the line");

    assert!(out.lines_for(deaf).is_empty());
    assert_eq!(out.lines_for(ally), vec!["<< LEXINGTON (TELL): hold the line"]);
    assert_eq!(out.lines_for(sender), vec![">> To ALL: hold the line"]);
    assert_eq!(count_events(&out, |e| matches!(e, Event::Comms { .. })), 1);
}

#[test]
fn tell_to_friendly_reaches_only_the_own_side() {
    let content = base_content();
    let mut state = base_state(&content);
    let sender = add_ship(&mut state, &content, "LEXINGTON", Side::Federation, Position::new(5, 5));
    let enemy = add_ship(&mut state, &content, "COBRA", Side::Empire, Position::new(40, 40));
    let ally = add_ship(&mut state, &content, "EXCALIBUR", Side::Federation, Position::new(60, 60));
    let mut rng = make_rng();

    let out = run_line(&mut state, &content, &mut rng, sender, "TELL FRIENDLY; regroup");
    assert!(out.lines_for(enemy).is_empty());
    assert_eq!(out.lines_for(ally).len(), 1);
}

#[test]
fn radio_off_blocks_sending() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    let mut rng = make_rng();
    run_line(&mut state, &content, &mut rng, actor, "RADIO OFF");
    let out = run_line(&mut state, &content, &mut rng, actor, "TELL ALL; anyone?");
    assert_eq!(out.lines_for(actor), vec!["Captain, your radio is off."]);
}

#[test]
fn status_and_points_report_without_consuming_time() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    let mut rng = make_rng();
    let out = run_line(&mut state, &content, &mut rng, actor, "STATUS / POINTS / DAMAGES");
    let lines = out.lines_for(actor);
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("Condition  GREEN"));
    assert!(lines[1].contains("Planets captured"));
    assert_eq!(lines[2], "All devices functional.");
    assert_eq!(state.clock.stardate, 0);
}

#[test]
fn status_shows_red_with_an_enemy_in_range() {
    let content = base_content();
    let (mut state, attacker, _) = duel(&content);
    let out = run_line(&mut state, &content, &mut make_rng(), attacker, "ST");
    assert!(out.lines_for(attacker)[0].contains("Condition  RED"));
}

#[test]
fn quit_removes_the_ship_but_keeps_the_actor() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    let mut rng = make_rng();
    let out = run_line(&mut state, &content, &mut rng, actor, "QUIT / STATUS");
    assert!(state.actors[&actor].ship.is_none());
    assert!(state.actors[&actor].queue.is_empty());
    assert_eq!(count_events(&out, |e| matches!(e, Event::ShipLeft { .. })), 1);
    let again = run_line(&mut state, &content, &mut rng, actor, "STATUS");
    assert_eq!(
        again.lines_for(actor),
        vec!["You must be in the game with a ship to do that."]
    );
}

#[test]
fn relative_coordinates_follow_the_icdef_setting() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    let mut rng = make_rng();
    run_line(&mut state, &content, &mut rng, actor, "SET ICDEF RELATIVE");
    run_line(&mut state, &content, &mut rng, actor, "MOVE 0 2");
    fire_timer(&mut state, &content, &mut rng, actor);
    assert_eq!(ship(&state, actor).position, Position::new(10, 12));
}

// --- SCAN / LIST -----------------------------------------------------------

/// Rows of a rendered chart: header, sector rows top to bottom, footer.
fn chart_rows(out: &Outbox, actor: ActorId) -> Vec<String> {
    let lines = out.lines_for(actor);
    assert_eq!(lines.len(), 1, "a chart is sent as one block");
    lines[0].lines().map(str::to_string).collect()
}

/// Two-character cell for column `h` of a sector row whose window starts at `h_min`.
fn cell(row: &str, h_min: i32, h: i32) -> &str {
    let start = 3 + 2 * usize::try_from(h - h_min).unwrap();
    &row[start..start + 2]
}

#[test]
fn short_range_scan_charts_what_surrounds_the_ship() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    add_ship(&mut state, &content, "COBRA", Side::Empire, Position::new(12, 13));
    add_planet(&mut state, Position::new(8, 10), Side::Federation, 0);
    add_base(&mut state, &content, Position::new(4, 4), Side::Empire);
    state.stars.push(Position::new(10, 8));
    state.blackholes.push(Position::new(11, 11));
    let mut rng = make_rng();

    let out = run_line(&mut state, &content, &mut rng, actor, "SRS");
    let rows = chart_rows(&out, actor);
    assert_eq!(rows.len(), 15 + 2);
    assert_eq!(rows[0], rows[16]);
    assert!(rows[0].starts_with("    3   5"));

    let row = |v: i32| rows[1 + usize::try_from(17 - v).unwrap()].as_str();
    assert!(row(17).starts_with("17 "));
    assert!(row(10).ends_with(" 10"));
    assert_eq!(cell(row(10), 3, 10), " L");
    assert_eq!(cell(row(10), 3, 8), " *");
    assert_eq!(cell(row(10), 3, 9), " .");
    assert_eq!(cell(row(12), 3, 13), " C");
    assert_eq!(cell(row(8), 3, 10), "@F");
    assert_eq!(cell(row(4), 3, 4), ")(");
    assert_eq!(cell(row(11), 3, 11), "  ");
    assert_eq!(state.clock.stardate, 0);
    assert!(!state.actors[&actor].busy);
}

#[test]
fn scan_window_stops_at_the_grid_edge() {
    let content = base_content();
    let mut state = base_state(&content);
    let actor = add_ship(&mut state, &content, "LEXINGTON", Side::Federation, Position::new(2, 2));
    let out = run_line(&mut state, &content, &mut make_rng(), actor, "SCAN UP");
    let rows = chart_rows(&out, actor);
    assert_eq!(rows.len(), 11 + 2);
    assert!(rows[0].starts_with("    1   3"));
    assert!(rows[1].starts_with("12 "));
    assert!(rows[11].starts_with(" 2 "));
    assert_eq!(rows[11].len(), 3 + 12 * 2 + 3);
    assert_eq!(cell(&rows[11], 1, 2), " L");
}

#[test]
fn scan_warning_marks_sectors_near_enemy_planets_only() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    add_planet(&mut state, Position::new(10, 14), Side::Empire, 1);
    add_planet(&mut state, Position::new(14, 6), Side::Federation, 1);
    let mut rng = make_rng();

    let plain = chart_rows(&run_line(&mut state, &content, &mut rng, actor, "SCAN 5"), actor);
    let row10 = &plain[1 + 5];
    assert_eq!(cell(row10, 5, 12), " .");

    let warned = chart_rows(
        &run_line(&mut state, &content, &mut rng, actor, "SCAN 5 WARNING"),
        actor,
    );
    let row10 = &warned[1 + 5];
    assert_eq!(cell(row10, 5, 12), " !");
    assert_eq!(cell(row10, 5, 11), " .");
    assert_eq!(cell(row10, 5, 14), "@E");
    let row14 = &warned[1 + 1];
    assert_eq!(cell(row14, 5, 7), " .");
    assert_eq!(cell(row14, 5, 6), "@F");
}

#[test]
fn scan_rejects_unknown_words() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    let out = run_line(&mut state, &content, &mut make_rng(), actor, "SCAN SIDEWAYS");
    assert!(out.lines_for(actor)[0].starts_with("Usage: SCAN"));
}

#[test]
fn cloaked_ships_stay_off_charts_and_lists() {
    let content = base_content();
    let (mut state, attacker, target) = duel(&content);
    ship_mut(&mut state, target).cloaked = true;
    let mut rng = make_rng();

    let rows = chart_rows(&run_line(&mut state, &content, &mut rng, attacker, "SRS"), attacker);
    assert_eq!(cell(&rows[1 + 7], 3, 12), " .");

    let out = run_line(&mut state, &content, &mut rng, attacker, "TARGETS");
    assert_eq!(out.lines_for(attacker), vec!["Nothing matches your LIST criteria."]);
}

#[test]
fn targets_lists_enemy_ships_and_planets() {
    let content = base_content();
    let (mut state, attacker, _) = duel(&content);
    add_ship(&mut state, &content, "EXCALIBUR", Side::Federation, Position::new(20, 20));
    add_planet(&mut state, Position::new(15, 15), Side::Empire, 2);
    add_planet(&mut state, Position::new(16, 16), Side::Neutral, 0);
    add_base(&mut state, &content, Position::new(18, 18), Side::Federation);

    let out = run_line(&mut state, &content, &mut make_rng(), attacker, "TARGETS");
    let text = out.lines_for(attacker)[0];
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, vec!["*Cobra       @10-12  -100%", "*Emp planet  @15-15     2 builds"]);
}

#[test]
fn planets_and_bases_split_the_installations() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    add_planet(&mut state, Position::new(12, 12), Side::Empire, 0);
    add_planet(&mut state, Position::new(15, 15), Side::Neutral, 0);
    add_base(&mut state, &content, Position::new(20, 20), Side::Federation);
    let mut rng = make_rng();

    let out = run_line(&mut state, &content, &mut rng, actor, "PLANETS");
    let planets: Vec<&str> = out.lines_for(actor)[0].lines().map(str::trim_end).collect();
    assert_eq!(planets, vec!["*Emp planet  @12-12", " Neu planet  @15-15"]);

    let out = run_line(&mut state, &content, &mut rng, actor, "BASES");
    assert_eq!(out.lines_for(actor), vec![" Fed Base    @20-20  +100.0%"]);
}

#[test]
fn summary_counts_every_side() {
    let content = base_content();
    let (mut state, attacker, _) = duel(&content);
    add_planet(&mut state, Position::new(30, 30), Side::Federation, 1);
    add_planet(&mut state, Position::new(31, 31), Side::Empire, 1);
    add_planet(&mut state, Position::new(32, 32), Side::Neutral, 0);
    add_base(&mut state, &content, Position::new(40, 40), Side::Empire);

    let out = run_line(&mut state, &content, &mut make_rng(), attacker, "SUMMARY");
    let expected = [
        "1 Federation ships in game",
        "1 Empire ships in game",
        "1 Empire bases in game",
        "1 Federation planets in game",
        "1 Empire planets in game",
        "1 Neutral planets in game",
    ]
    .join("\n");
    assert_eq!(out.lines_for(attacker), vec![expected.as_str()]);
}

#[test]
fn list_filters_by_range_and_closest() {
    let content = base_content();
    let (mut state, attacker, _) = duel(&content);
    add_ship(&mut state, &content, "EXCALIBUR", Side::Federation, Position::new(20, 20));
    let mut rng = make_rng();

    let out = run_line(&mut state, &content, &mut rng, attacker, "LIST SHIPS 5");
    let names: Vec<&str> = out.lines_for(attacker)[0].lines().map(|l| &l[..8]).collect();
    assert_eq!(names, vec![" Lexingt", "*Cobra  "]);

    let out = run_line(&mut state, &content, &mut rng, attacker, "LIST SHIPS CLOSEST");
    assert_eq!(out.lines_for(attacker), vec!["*Cobra       @10-12  -100%"]);

    let out = run_line(&mut state, &content, &mut rng, attacker, "LIST NEUTRAL SHIPS");
    assert_eq!(out.lines_for(attacker), vec!["Nothing matches your LIST criteria."]);

    let out = run_line(&mut state, &content, &mut rng, attacker, "LIST ZANZIBAR");
    assert_eq!(out.lines_for(attacker), vec!["No ship named \"ZANZIBAR\"."]);
}

#[test]
fn list_hides_far_enemy_positions_and_honours_relative_coordinates() {
    let content = base_content();
    let (mut state, actor) = solo(&content);
    add_ship(&mut state, &content, "COBRA", Side::Empire, Position::new(40, 40));
    add_planet(&mut state, Position::new(12, 9), Side::Empire, 0);
    let mut rng = make_rng();

    let out = run_line(&mut state, &content, &mut rng, actor, "LIST SHIPS ENEMY");
    assert_eq!(out.lines_for(actor), vec!["*Cobra       out of range"]);

    run_line(&mut state, &content, &mut rng, actor, "SET ICDEF RELATIVE");
    let out = run_line(&mut state, &content, &mut rng, actor, "PLANETS");
    assert_eq!(out.lines_for(actor)[0].trim_end(), "*Emp planet  @+2,-1");
}
