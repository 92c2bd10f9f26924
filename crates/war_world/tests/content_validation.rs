//! Content validation tests for the shipped JSON game data.
//!
//! These tests load the actual `content/*.json` files and check:
//! 1. Schema validity: every file deserializes
//! 2. Range constraints: positive caps, sane delays, usable rosters
//! 3. Playability: a generated galaxy has room and bases for both sides
//! 4. Loader errors name the file that failed

use std::collections::HashSet;
use std::sync::OnceLock;
use war_core::test_fixtures::make_rng;
use war_core::{GameContent, Side};
use war_world::{build_initial_state, load_content};

/// Integration tests run from the crate directory, so we go up two levels.
fn content_dir() -> String {
    let manifest = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    format!("{manifest}/../../content")
}

/// Shared content loaded once across all tests in this module.
fn load_test_content() -> &'static GameContent {
    static CONTENT: OnceLock<GameContent> = OnceLock::new();
    CONTENT.get_or_init(|| {
        load_content(&content_dir()).expect("load_content should succeed for production content")
    })
}

// =========================================================================
// 1. Schema validation
// =========================================================================

#[test]
fn content_loads_successfully() {
    let content = load_test_content();
    assert!(!content.content_version.is_empty());
}

// =========================================================================
// 2. Range constraints
// =========================================================================

#[test]
fn both_sides_have_a_roster() {
    let content = load_test_content();
    for side in [Side::Federation, Side::Empire] {
        assert!(
            content.ship_names(side).len() >= 5,
            "{side} roster is too short to seat a full side"
        );
    }
}

#[test]
fn ship_names_are_upper_case() {
    let content = load_test_content();
    for name in content.federation_ships.iter().chain(&content.empire_ships) {
        assert_eq!(name, &name.to_ascii_uppercase(), "ship '{name}' is not upper case");
    }
}

#[test]
fn ship_names_have_distinct_prefixes() {
    // Ships are addressed by name prefix, so no name may be a prefix of another.
    let content = load_test_content();
    let names: Vec<&String> = content.federation_ships.iter().chain(&content.empire_ships).collect();
    for a in &names {
        for b in &names {
            if a != b {
                assert!(!b.starts_with(a.as_str()), "'{a}' is a prefix of '{b}'");
            }
        }
    }
}

#[test]
fn shields_cannot_exceed_ship_energy() {
    let c = &load_test_content().constants;
    assert!(c.max_shield_energy <= c.max_ship_energy);
    assert!(c.shield_raise_cost < c.max_ship_energy);
}

#[test]
fn weapon_ranges_fit_the_grid() {
    let c = &load_test_content().constants;
    let span = c.grid_width.min(c.grid_height);
    assert!(c.phaser_range > 0 && c.phaser_range < span);
    assert!(c.torpedo_range > 0 && c.torpedo_range < span);
    assert!(c.max_warp > 0 && c.max_warp < span);
}

#[test]
fn delayed_commands_take_real_time() {
    let c = &load_test_content().constants;
    assert!(c.warp_delay_min_ms >= 1000, "warp should take at least a second");
    assert!(c.build_delay_min_ms >= c.dock_delay_min_ms);
}

// =========================================================================
// 3. Playability
// =========================================================================

#[test]
fn generated_galaxy_is_playable() {
    let content = load_test_content();
    let state = build_initial_state(content, 42, &mut make_rng());

    assert_eq!(state.planets.len(), content.galaxy.planet_count as usize);
    for side in [Side::Federation, Side::Empire] {
        assert_eq!(
            state.bases.list(side).len(),
            content.galaxy.initial_bases_per_side as usize,
            "{side} is missing starting bases"
        );
    }
    let neutral = state.planets.iter().filter(|p| p.side == Side::Neutral).count();
    assert!(neutral > 0, "no planets left to capture");
}

#[test]
fn generated_galaxy_has_no_overlaps() {
    let content = load_test_content();
    let state = build_initial_state(content, 7, &mut make_rng());
    let mut cells = HashSet::new();
    for cell in state
        .planets
        .iter()
        .map(|p| p.position)
        .chain(state.stars.iter().copied())
        .chain(state.blackholes.iter().copied())
    {
        assert!(cells.insert(cell), "two objects at {cell}");
    }
}

// =========================================================================
// 4. Loader errors
// =========================================================================

#[test]
fn missing_file_is_named_in_the_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_content(dir.path().to_str().unwrap()).unwrap_err();
    assert!(format!("{err:#}").contains("constants.json"), "got: {err:#}");
}

#[test]
fn malformed_file_is_named_in_the_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = std::path::PathBuf::from(content_dir());
    std::fs::copy(source.join("constants.json"), dir.path().join("constants.json")).unwrap();
    std::fs::write(dir.path().join("ships.json"), "{ not json").unwrap();

    let err = load_content(dir.path().to_str().unwrap()).unwrap_err();
    assert!(format!("{err:#}").contains("parsing ships.json"), "got: {err:#}");
}
