//! Point ledger, kept per side and per actor.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{ActorId, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScoreCategory {
    DamageToEnemies,
    EnemiesDestroyed,
    DamageToBases,
    PlanetsCaptured,
    BasesBuilt,
    DamageToRomulans,
    StarsDestroyed,
    PlanetsDestroyed,
}

impl ScoreCategory {
    pub const ALL: [ScoreCategory; 8] = [
        ScoreCategory::DamageToEnemies,
        ScoreCategory::EnemiesDestroyed,
        ScoreCategory::DamageToBases,
        ScoreCategory::PlanetsCaptured,
        ScoreCategory::BasesBuilt,
        ScoreCategory::DamageToRomulans,
        ScoreCategory::StarsDestroyed,
        ScoreCategory::PlanetsDestroyed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ScoreCategory::DamageToEnemies => "Damage to enemies",
            ScoreCategory::EnemiesDestroyed => "Enemies destroyed",
            ScoreCategory::DamageToBases => "Damage to bases",
            ScoreCategory::PlanetsCaptured => "Planets captured",
            ScoreCategory::BasesBuilt => "Bases built",
            ScoreCategory::DamageToRomulans => "Damage to Romulans",
            ScoreCategory::StarsDestroyed => "Stars destroyed",
            ScoreCategory::PlanetsDestroyed => "Planets destroyed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub points: BTreeMap<ScoreCategory, i64>,
}

impl ScoreCard {
    pub fn get(&self, category: ScoreCategory) -> i64 {
        self.points.get(&category).copied().unwrap_or(0)
    }

    pub fn total(&self) -> i64 {
        self.points.values().sum()
    }

    fn add(&mut self, category: ScoreCategory, delta: i64) {
        *self.points.entry(category).or_insert(0) += delta;
    }
}

/// Append-only: totals change only through [`ScoreLedger::credit`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreLedger {
    pub sides: BTreeMap<Side, ScoreCard>,
    pub actors: BTreeMap<ActorId, ScoreCard>,
}

impl ScoreLedger {
    /// Credit `delta` points to `side` and, when known, to `actor`.
    pub fn credit(
        &mut self,
        actor: Option<ActorId>,
        side: Side,
        category: ScoreCategory,
        delta: i64,
    ) {
        if delta == 0 {
            return;
        }
        self.sides.entry(side).or_default().add(category, delta);
        if let Some(actor) = actor {
            self.actors.entry(actor).or_default().add(category, delta);
        }
    }

    pub fn side(&self, side: Side) -> ScoreCard {
        self.sides.get(&side).cloned().unwrap_or_default()
    }

    pub fn actor(&self, actor: ActorId) -> ScoreCard {
        self.actors.get(&actor).cloned().unwrap_or_default()
    }
}

/// Round a floating damage figure to whole points.
pub(crate) fn points(amount: f64) -> i64 {
    #[allow(clippy::cast_possible_truncation)]
    let rounded = amount.round() as i64;
    rounded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_updates_side_and_actor() {
        let mut ledger = ScoreLedger::default();
        ledger.credit(
            Some(ActorId(1)),
            Side::Empire,
            ScoreCategory::PlanetsCaptured,
            1,
        );
        ledger.credit(None, Side::Empire, ScoreCategory::DamageToBases, 250);
        assert_eq!(ledger.side(Side::Empire).total(), 251);
        assert_eq!(ledger.actor(ActorId(1)).total(), 1);
        assert_eq!(ledger.side(Side::Federation).total(), 0);
    }

    #[test]
    fn zero_credit_creates_no_entry() {
        let mut ledger = ScoreLedger::default();
        ledger.credit(Some(ActorId(2)), Side::Federation, ScoreCategory::BasesBuilt, 0);
        assert!(ledger.sides.is_empty());
        assert!(ledger.actors.is_empty());
    }
}
