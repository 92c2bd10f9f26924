//! Computer-piloted ships.
//!
//! Bots enter ordinary command lines through the scheduler, so they obey the same
//! validation, delays and world-time accounting as human captains.

use rand::Rng;
use tracing::info;

use crate::comms::Outbox;
use crate::random::ran;
use crate::registry;
use crate::{
    scheduler, ActorId, ActorKind, BotRole, BotState, GameContent, GameState, Position, Side,
};

const BOT_ROLES: [BotRole; 3] = [BotRole::Aggressor, BotRole::Defender, BotRole::Raider];
const WANDER_CHANCE: f64 = 0.3;
const LOW_ENERGY: f64 = 1000.0;
const SHIELD_ENERGY_FLOOR: f64 = 500.0;

/// Anything that can drive an actor by producing command lines.
pub trait CommandSource {
    fn generate_orders(
        &mut self,
        state: &GameState,
        content: &GameContent,
        rng: &mut impl Rng,
        actor: ActorId,
    ) -> Vec<Order>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weapon {
    Phaser,
    Torpedo,
}

/// One command line, tagged with the weapon it fires so cooldowns can be charged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub line: String,
    pub fires: Option<Weapon>,
}

impl Order {
    fn plain(line: String) -> Self {
        Order { line, fires: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetKind {
    Ship,
    Base,
    Planet,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    kind: TargetKind,
    position: Position,
    distance: i32,
    weight: f64,
}

/// Role-aware pilot: pick the most attractive enemy in range, close in, fire.
#[derive(Debug, Default, Clone, Copy)]
pub struct BotPilot;

impl BotPilot {
    fn weight(
        state: &GameState,
        side: Side,
        role: BotRole,
        kind: TargetKind,
        at: Position,
    ) -> f64 {
        match (role, kind) {
            (BotRole::Aggressor, TargetKind::Ship) | (BotRole::Raider, TargetKind::Base) => 1.0,
            (BotRole::Aggressor, TargetKind::Base) => 0.7,
            (BotRole::Aggressor | BotRole::Defender, TargetKind::Planet) => 0.4,
            (BotRole::Defender, TargetKind::Ship) => {
                let to_base = state
                    .bases
                    .list(side)
                    .iter()
                    .filter_map(|id| registry::planet(state, *id))
                    .map(|p| p.position.distance(at))
                    .min()
                    .unwrap_or(99);
                1.0 + f64::from(20 - to_base.min(20)) * 0.03
            }
            (BotRole::Defender, TargetKind::Base) => 0.6,
            (BotRole::Raider, TargetKind::Planet) => 0.9,
            (BotRole::Raider, TargetKind::Ship) => 0.5,
        }
    }

    fn choose_target(
        state: &GameState,
        content: &GameContent,
        actor: ActorId,
        role: BotRole,
    ) -> Option<Candidate> {
        let me = registry::ship(state, actor)?;
        let range = content.constants.bot_engage_range;
        let mut candidates = Vec::new();
        let mut consider = |kind, position: Position| {
            let distance = position.distance(me.position);
            if distance <= range {
                candidates.push(Candidate {
                    kind,
                    position,
                    distance,
                    weight: Self::weight(state, me.side, role, kind, position),
                });
            }
        };
        for other in state.actors.values() {
            if other.id == actor || other.is_romulan() {
                continue;
            }
            if let Some(ship) = other.active_ship() {
                if ship.side.is_hostile_to(me.side) {
                    consider(TargetKind::Ship, ship.position);
                }
            }
        }
        for planet in &state.planets {
            if !planet.side.is_hostile_to(me.side) {
                continue;
            }
            let kind = if planet.is_base {
                TargetKind::Base
            } else {
                TargetKind::Planet
            };
            consider(kind, planet.position);
        }
        candidates.into_iter().min_by(|a, b| {
            b.weight
                .total_cmp(&a.weight)
                .then(a.distance.cmp(&b.distance))
        })
    }

    /// Step toward `dest` without entering it, at most `max_steps` cells.
    fn approach(from: Position, dest: Position, max_steps: i32) -> Option<(i32, i32)> {
        let (dv, dh) = (dest.v - from.v, dest.h - from.h);
        let distance = dv.abs().max(dh.abs());
        if distance <= 1 {
            return None;
        }
        let steps = max_steps.min(distance - 1);
        Some((
            dv.signum() * steps.min(dv.abs()),
            dh.signum() * steps.min(dh.abs()),
        ))
    }

    fn wants_torpedo(rng: &mut impl Rng, role: BotRole, kind: TargetKind) -> bool {
        let chance = match (role, kind) {
            (BotRole::Aggressor, _) => 0.75,
            (BotRole::Defender, _) => 0.25,
            (BotRole::Raider, TargetKind::Ship) => 0.6,
            (BotRole::Raider, TargetKind::Base | TargetKind::Planet) => 0.4,
        };
        ran(rng) < chance
    }
}

impl CommandSource for BotPilot {
    fn generate_orders(
        &mut self,
        state: &GameState,
        content: &GameContent,
        rng: &mut impl Rng,
        actor: ActorId,
    ) -> Vec<Order> {
        let c = &content.constants;
        let Some(ActorKind::Bot(bot)) = state.actors.get(&actor).map(|a| &a.kind) else {
            return Vec::new();
        };
        let Some(me) = registry::ship(state, actor) else {
            return Vec::new();
        };
        let mut orders = Vec::new();

        if me.energy < LOW_ENERGY {
            let side = me.side;
            if registry::adjacent_planet(state, me.position, |p| p.side == side).is_some() {
                orders.push(Order::plain("DOCK".to_string()));
                return orders;
            }
        }

        let Some(target) = Self::choose_target(state, content, actor, bot.role) else {
            if ran(rng) < WANDER_CHANCE {
                let step = c.bot_max_step.max(1);
                let dv = rng.gen_range(-step..=step);
                let dh = rng.gen_range(-step..=step);
                if dv != 0 || dh != 0 {
                    orders.push(Order::plain(format!("MOVE R {dv} {dh}")));
                }
            }
            return orders;
        };

        if bot.role == BotRole::Raider
            && target.kind == TargetKind::Planet
            && target.distance == 1
            && !me.shields_up
        {
            let Position { v, h } = target.position;
            orders.push(Order::plain(format!("CAPTURE A {v} {h}")));
            return orders;
        }

        let now = state.meta.now_ms;
        let phaser_ready = now >= bot.next_phaser_ms && target.distance <= c.phaser_range;
        let torpedo_ready =
            now >= bot.next_torpedo_ms && me.torpedoes > 0 && target.distance <= c.torpedo_range;
        if (phaser_ready || torpedo_ready) && ran(rng) < c.bot_fire_bias {
            if !me.shields_up && me.energy > SHIELD_ENERGY_FLOOR + c.shield_raise_cost {
                orders.push(Order::plain("SHIELDS UP".to_string()));
            }
            let torpedo = torpedo_ready
                && (!phaser_ready || Self::wants_torpedo(rng, bot.role, target.kind));
            let Position { v, h } = target.position;
            orders.push(if torpedo {
                Order {
                    line: format!("TORPEDOES A 1 {v} {h}"),
                    fires: Some(Weapon::Torpedo),
                }
            } else {
                Order {
                    line: format!("PHASERS A {:.0} {v} {h}", c.phaser_default_power),
                    fires: Some(Weapon::Phaser),
                }
            });
            return orders;
        }

        if target.distance > c.bot_close_range {
            if let Some((dv, dh)) = Self::approach(me.position, target.position, c.bot_max_step) {
                orders.push(Order::plain(format!("MOVE R {dv} {dh}")));
            }
        }
        orders
    }
}

/// Top up the bot roster, then give every idle bot its orders for this sweep.
pub fn maintain_bots(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
) {
    let desired = state.meta.bot_target;
    ensure_bots(state, content, rng, out, desired);

    let idle: Vec<ActorId> = state
        .actors
        .values()
        .filter(|a| a.is_bot() && a.active_ship().is_some())
        .filter(|a| !a.busy && a.pending.is_none() && a.queue.is_empty())
        .map(|a| a.id)
        .collect();
    let scale = u64::from(registry::sweep_population(state)) + 1;
    let mut pilot = BotPilot;
    for actor in idle {
        let orders = pilot.generate_orders(state, content, rng, actor);
        for order in orders {
            if let Some(weapon) = order.fires {
                charge_cooldown(state, content, actor, weapon, scale);
            }
            scheduler::submit_line(state, content, rng, out, actor, &order.line);
        }
    }
}

fn charge_cooldown(
    state: &mut GameState,
    content: &GameContent,
    actor: ActorId,
    weapon: Weapon,
    scale: u64,
) {
    let now = state.meta.now_ms;
    let c = &content.constants;
    if let Some(ActorKind::Bot(bot)) = state.actors.get_mut(&actor).map(|a| &mut a.kind) {
        match weapon {
            Weapon::Phaser => bot.next_phaser_ms = now + scale * c.bot_phaser_cooldown_ms,
            Weapon::Torpedo => bot.next_torpedo_ms = now + scale * c.bot_torpedo_cooldown_ms,
        }
    }
}

/// Grow or shrink the bot roster to `desired`, always reinforcing the weaker side.
pub fn ensure_bots(
    state: &mut GameState,
    content: &GameContent,
    rng: &mut impl Rng,
    out: &mut Outbox,
    desired: u32,
) {
    let mut bots: Vec<ActorId> = state
        .actors
        .values()
        .filter(|a| a.is_bot())
        .map(|a| a.id)
        .collect();
    while bots.len() > desired as usize {
        let Some(actor) = bots.pop() else {
            break;
        };
        registry::disconnect_actor(state, out, actor);
    }

    let now = state.meta.now_ms;
    while bots.len() < desired as usize {
        let side = registry::weaker_side(state);
        let role = BOT_ROLES[bots.len() % BOT_ROLES.len()];
        let name = registry::free_ship_name(state, content, side);
        let actor = registry::connect_actor(
            state,
            &name,
            ActorKind::Bot(BotState {
                role,
                next_phaser_ms: now,
                next_torpedo_ms: now,
            }),
        );
        if registry::launch_ship(state, content, rng, out, actor, side, &name).is_err() {
            state.actors.remove(&actor);
            break;
        }
        info!(%actor, ship = %name, %side, ?role, "bot commissioned");
        bots.push(actor);
    }
}
