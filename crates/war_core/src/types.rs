use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use crate::scoring::ScoreLedger;

// ---------------------------------------------------------------------------
// IDs
// ---------------------------------------------------------------------------

macro_rules! numeric_id {
    ($name:ident, $prefix:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "_{:04}"), self.0)
            }
        }
    };
}

numeric_id!(ActorId, "actor");
numeric_id!(PlanetId, "planet");

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

/// Sector coordinate. `v` is the vertical axis, `h` the horizontal one; both 1-based.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Position {
    pub v: i32,
    pub h: i32,
}

impl Position {
    pub const fn new(v: i32, h: i32) -> Self {
        Self { v, h }
    }

    /// Chebyshev distance: diagonal steps cost the same as straight ones.
    pub fn distance(self, other: Position) -> i32 {
        (self.v - other.v).abs().max((self.h - other.h).abs())
    }

    pub fn is_adjacent(self, other: Position) -> bool {
        self.distance(other) == 1
    }

    pub fn offset(self, dv: i32, dh: i32) -> Position {
        Position::new(self.v + dv, self.h + dh)
    }

    /// One step from `self` toward `target` along each axis.
    pub fn step_toward(self, target: Position) -> Position {
        self.offset((target.v - self.v).signum(), (target.h - self.h).signum())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.v, self.h)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Federation,
    Empire,
    Romulan,
    Neutral,
}

impl Side {
    /// The opposing playable side. Romulan and neutral have none.
    pub fn opponent(self) -> Option<Side> {
        match self {
            Side::Federation => Some(Side::Empire),
            Side::Empire => Some(Side::Federation),
            Side::Romulan | Side::Neutral => None,
        }
    }

    pub fn is_playable(self) -> bool {
        matches!(self, Side::Federation | Side::Empire)
    }

    /// True when the two sides fight each other. Neutral fights nobody.
    pub fn is_hostile_to(self, other: Side) -> bool {
        self != other && self != Side::Neutral && other != Side::Neutral
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Side::Federation => "Federation",
            Side::Empire => "Empire",
            Side::Romulan => "Romulan",
            Side::Neutral => "Neutral",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Ship devices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Device {
    Warp,
    Impulse,
    Torpedo,
    Phaser,
    Shield,
    Computer,
    Radio,
    Tractor,
    LifeSupport,
}

impl Device {
    pub const ALL: [Device; 9] = [
        Device::Warp,
        Device::Impulse,
        Device::Torpedo,
        Device::Phaser,
        Device::Shield,
        Device::Computer,
        Device::Radio,
        Device::Tractor,
        Device::LifeSupport,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Device::Warp => "Warp engines",
            Device::Impulse => "Impulse engines",
            Device::Torpedo => "Photon torpedo tubes",
            Device::Phaser => "Phaser banks",
            Device::Shield => "Deflector shields",
            Device::Computer => "Computer",
            Device::Radio => "Sub-space radio",
            Device::Tractor => "Tractor beam",
            Device::LifeSupport => "Life support",
        };
        f.write_str(name)
    }
}

/// Accumulated damage per device. Higher is worse; zero is pristine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Devices {
    levels: [f64; 9],
}

impl Devices {
    pub fn get(&self, device: Device) -> f64 {
        self.levels[device.index()]
    }

    pub fn set(&mut self, device: Device, level: f64) {
        self.levels[device.index()] = level.max(0.0);
    }

    pub fn add(&mut self, device: Device, amount: f64) {
        let current = self.get(device);
        self.set(device, current + amount);
    }

    /// Reduce every device's damage by `amount`, never below zero.
    pub fn repair_all(&mut self, amount: f64) {
        for level in &mut self.levels {
            *level = (*level - amount).max(0.0);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Device, f64)> + '_ {
        Device::ALL.iter().map(|d| (*d, self.get(*d)))
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    pub name: String,
    pub side: Side,
    pub position: Position,
    pub energy: f64,
    pub shield_energy: f64,
    pub shields_up: bool,
    pub damage: f64,
    pub torpedoes: u32,
    pub devices: Devices,
    pub docked_at: Option<PlanetId>,
    pub tractor_partner: Option<ActorId>,
    /// Game-clock millisecond at which each phaser bank is ready again.
    pub phaser_banks: [u64; 2],
    pub kill_credited: bool,
    pub life_support_reserve: u32,
    pub cloaked: bool,
}

impl Ship {
    pub fn new(name: &str, side: Side, position: Position, constants: &Constants) -> Self {
        Self {
            name: name.to_string(),
            side,
            position,
            energy: constants.max_ship_energy,
            shield_energy: constants.max_shield_energy,
            shields_up: false,
            damage: 0.0,
            torpedoes: constants.max_torpedoes,
            devices: Devices::default(),
            docked_at: None,
            tractor_partner: None,
            phaser_banks: [0, 0],
            kill_credited: false,
            life_support_reserve: constants.life_support_reserve,
            cloaked: false,
        }
    }

    pub fn is_destroyed(&self, constants: &Constants) -> bool {
        self.energy <= 0.0 || self.damage >= constants.ship_fatal_damage
    }

    pub fn device_inoperative(&self, device: Device, constants: &Constants) -> bool {
        self.devices.get(device) >= constants.device_inoperative_damage
    }

    pub fn device_damaged(&self, device: Device, constants: &Constants) -> bool {
        self.devices.get(device) >= constants.device_damaged_threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureLock {
    pub holder: ActorId,
    pub since_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Planet {
    pub id: PlanetId,
    pub position: Position,
    pub side: Side,
    pub builds: u32,
    pub is_base: bool,
    /// Base reserve on the 0..1000 shield-percentage scale. Zero for plain planets.
    pub energy: f64,
    pub capture_lock: Option<CaptureLock>,
}

impl Planet {
    pub fn new(id: PlanetId, position: Position, side: Side) -> Self {
        Self {
            id,
            position,
            side,
            builds: 0,
            is_base: false,
            energy: 0.0,
            capture_lock: None,
        }
    }
}

/// Per-side lists of base planet IDs, kept in step with `Planet::is_base`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideBases {
    pub federation: Vec<PlanetId>,
    pub empire: Vec<PlanetId>,
}

impl SideBases {
    pub fn list(&self, side: Side) -> &[PlanetId] {
        match side {
            Side::Federation => &self.federation,
            Side::Empire => &self.empire,
            Side::Romulan | Side::Neutral => &[],
        }
    }

    pub fn list_mut(&mut self, side: Side) -> Option<&mut Vec<PlanetId>> {
        match side {
            Side::Federation => Some(&mut self.federation),
            Side::Empire => Some(&mut self.empire),
            Side::Romulan | Side::Neutral => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Actors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotRole {
    Aggressor,
    Defender,
    Raider,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotState {
    pub role: BotRole,
    pub next_phaser_ms: u64,
    pub next_torpedo_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorKind {
    Human,
    Bot(BotState),
    Romulan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Verbosity {
    Short,
    Medium,
    #[default]
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CoordMode {
    #[default]
    Absolute,
    Relative,
    Computed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorSettings {
    pub verbosity: Verbosity,
    pub radio_on: bool,
    pub gagged: BTreeSet<ActorId>,
    pub default_coords: CoordMode,
}

impl Default for ActorSettings {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::Long,
            radio_on: true,
            gagged: BTreeSet::new(),
            default_coords: CoordMode::Absolute,
        }
    }
}

/// A time-consuming command waiting on its timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: u64,
    pub due_ms: u64,
    pub action: DelayedAction,
}

/// Continuation run when a delayed command's timer fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DelayedAction {
    Build { planet: PlanetId },
    Capture { planet: PlanetId, cost: f64 },
    Dock { planet: PlanetId },
    Move { destination: Position, cost: f64 },
    Impulse { destination: Position },
    Repair { amount: f64 },
    TorpedoVolley,
}

impl DelayedAction {
    /// Energy charged when the command started, owed back if it never completes.
    pub fn upfront_cost(&self) -> f64 {
        match self {
            DelayedAction::Move { cost, .. } | DelayedAction::Capture { cost, .. } => *cost,
            DelayedAction::Build { .. }
            | DelayedAction::Dock { .. }
            | DelayedAction::Impulse { .. }
            | DelayedAction::Repair { .. }
            | DelayedAction::TorpedoVolley => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    pub kind: ActorKind,
    pub ship: Option<Ship>,
    pub queue: VecDeque<String>,
    pub busy: bool,
    pub pending: Option<PendingAction>,
    pub settings: ActorSettings,
    pub personal_clock: u64,
    /// Ship temporarily swapped out of the galaxy (GRIPE). Restored by the next line or an interrupt.
    pub limbo: bool,
}

impl Actor {
    pub fn new(id: ActorId, name: &str, kind: ActorKind) -> Self {
        Self {
            id,
            name: name.to_string(),
            kind,
            ship: None,
            queue: VecDeque::new(),
            busy: false,
            pending: None,
            settings: ActorSettings::default(),
            personal_clock: 0,
            limbo: false,
        }
    }

    pub fn is_romulan(&self) -> bool {
        matches!(self.kind, ActorKind::Romulan)
    }

    pub fn is_bot(&self) -> bool {
        matches!(self.kind, ActorKind::Bot(_))
    }

    /// Ship that is in play: present and not parked in limbo.
    pub fn active_ship(&self) -> Option<&Ship> {
        if self.limbo {
            None
        } else {
            self.ship.as_ref()
        }
    }
}

// ---------------------------------------------------------------------------
// Clocks and NPC state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldClock {
    /// Set while the periodic subsystems run.
    pub sweeping: bool,
    pub sweep_counter: u32,
    pub sweeps: u64,
    pub stardate: u64,
    pub side_turns: BTreeMap<Side, u64>,
    /// Idle ticks since the last attributed advance.
    pub idle_ticks: u32,
    pub nudge_pending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RomulanPhase {
    #[default]
    Absent,
    Hunting,
    Attacking,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RomulanState {
    pub actor: Option<ActorId>,
    pub phase: RomulanPhase,
    pub pool: f64,
    pub sweeps_since_spawn: u32,
    pub reveal_sweeps: u32,
    pub prefer_torpedo: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaState {
    pub seed: u64,
    pub game_id: uuid::Uuid,
    pub content_version: String,
    /// Game clock in milliseconds, advanced by the runtime.
    pub now_ms: u64,
    pub bot_target: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub next_event_id: u64,
    pub next_action_id: u64,
    pub next_actor_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub meta: MetaState,
    pub actors: BTreeMap<ActorId, Actor>,
    pub planets: Vec<Planet>,
    pub stars: Vec<Position>,
    pub blackholes: Vec<Position>,
    pub bases: SideBases,
    pub ledger: ScoreLedger,
    pub romulan: RomulanState,
    pub clock: WorldClock,
    pub counters: Counters,
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// Game tunables, loaded from `content/constants.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constants {
    pub grid_width: i32,
    pub grid_height: i32,
    pub max_ship_energy: f64,
    pub max_shield_energy: f64,
    pub max_torpedoes: u32,
    pub max_base_energy: f64,
    pub max_builds_per_planet: u32,
    pub max_bases_per_side: usize,
    pub ship_fatal_damage: f64,
    pub device_damaged_threshold: f64,
    pub device_inoperative_damage: f64,
    pub life_support_reserve: u32,

    pub phaser_range: i32,
    pub phaser_min_power: f64,
    pub phaser_max_power: f64,
    pub phaser_default_power: f64,
    pub phaser_shield_surcharge: f64,
    pub phaser_power_divisor: f64,
    pub phaser_cooldown_ms: u64,
    pub phaser_overheat_power: f64,
    pub critical_hit_threshold: f64,
    pub torpedo_range: i32,
    pub max_torpedoes_per_volley: u32,
    pub nova_chance: f64,

    pub base_defense_radius: i32,
    pub base_defense_budget: f64,
    pub planet_defense_range: i32,
    pub planet_defense_power: f64,
    pub planet_defense_power_per_build: f64,
    pub base_regen_budget: f64,

    pub max_warp: i32,
    pub warp_delay_min_ms: u64,
    pub warp_delay_range_ms: u64,
    pub impulse_delay_ms: u64,
    pub dock_delay_min_ms: u64,
    pub dock_delay_range_ms: u64,
    pub build_delay_min_ms: u64,
    pub build_delay_range_ms: u64,
    pub capture_delay_min_ms: u64,
    pub capture_lock_timeout_ms: u64,
    pub repair_ms_per_unit: u64,
    pub shield_raise_cost: f64,

    pub idle_window_ticks: u32,

    pub romulan_energy: f64,
    pub romulan_detection_range: i32,
    pub romulan_max_step: i32,
    pub romulan_phaser_power: f64,
    pub romulan_attack_chance: f64,
    pub romulan_reveal_sweeps: u32,

    pub bot_engage_range: i32,
    pub bot_close_range: i32,
    pub bot_max_step: i32,
    pub bot_fire_bias: f64,
    pub bot_phaser_cooldown_ms: u64,
    pub bot_torpedo_cooldown_ms: u64,
}

/// Galaxy generation parameters, loaded from `content/galaxy.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalaxyDef {
    pub planet_count: u32,
    /// Planets never spawn closer than this to each other.
    pub planet_min_spacing: i32,
    pub initial_bases_per_side: u32,
    pub star_count: (u32, u32),
    pub blackhole_count: (u32, u32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameContent {
    pub content_version: String,
    pub federation_ships: Vec<String>,
    pub empire_ships: Vec<String>,
    pub galaxy: GalaxyDef,
    pub constants: Constants,
}

impl GameContent {
    pub fn in_bounds(&self, position: Position) -> bool {
        (1..=self.constants.grid_height).contains(&position.v)
            && (1..=self.constants.grid_width).contains(&position.h)
    }

    pub fn ship_names(&self, side: Side) -> &[String] {
        match side {
            Side::Federation => &self.federation_ships,
            Side::Empire => &self.empire_ships,
            Side::Romulan | Side::Neutral => &[],
        }
    }
}

// ---------------------------------------------------------------------------
// Telemetry events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: EventId,
    pub tick: u64,
    pub event: Event,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    ShipJoined {
        actor: ActorId,
        ship: String,
        side: Side,
        position: Position,
    },
    ShipLeft {
        actor: ActorId,
        ship: String,
    },
    ShipMoved {
        actor: ActorId,
        from: Position,
        to: Position,
    },
    PhaserFired {
        shooter: Option<ActorId>,
        from: Position,
        to: Position,
        power: f64,
    },
    TorpedoFired {
        shooter: Option<ActorId>,
        from: Position,
        to: Position,
    },
    ShipHit {
        target: ActorId,
        hull: f64,
        shield_pct: f64,
        critical: bool,
    },
    PlanetHit {
        planet: PlanetId,
        hull: f64,
        energy: f64,
    },
    PlanetBuildsChanged {
        planet: PlanetId,
        builds: u32,
    },
    PlanetCaptured {
        planet: PlanetId,
        side: Side,
        by: ActorId,
    },
    BaseCreated {
        planet: PlanetId,
        side: Side,
    },
    BaseCollapsed {
        planet: PlanetId,
        penalty: f64,
    },
    BaseDestroyed {
        planet: PlanetId,
        side: Side,
    },
    ShipDestroyed {
        actor: ActorId,
        ship: String,
        by: Option<ActorId>,
    },
    ShipDocked {
        actor: ActorId,
        planet: PlanetId,
    },
    ShipUndocked {
        actor: ActorId,
    },
    ShieldsToggled {
        actor: ActorId,
        up: bool,
    },
    NovaTriggered {
        position: Position,
        by: Option<ActorId>,
    },
    ObjectDisplaced {
        actor: ActorId,
        from: Position,
        to: Position,
    },
    RomulanSpawned {
        actor: ActorId,
        position: Position,
    },
    RomulanKnockedOut {
        actor: ActorId,
        by: Option<ActorId>,
    },
    SweepCompleted {
        sweep: u64,
        active_actors: u32,
    },
    Comms {
        from: Option<ActorId>,
        to: String,
        text: String,
    },
}
