//! `war_core`: the multiplayer space-combat engine.
//!
//! No IO, no network, no wall clock. Callers feed command lines and timer
//! callbacks in; everything outbound lands in an [`Outbox`]. All randomness
//! comes from the passed-in Rng.

pub mod bots;
pub mod combat;
pub mod commands;
pub mod comms;
mod error;
pub mod headless;
mod id;
pub mod installations;
pub mod nova;
pub mod path;
pub mod random;
pub mod registry;
pub mod romulan;
pub mod scheduler;
pub mod scoring;
mod types;
pub mod world_tick;

pub use comms::{OutboundLine, Outbox, TimerRequest};
pub use error::{CommandError, CommandResult};
pub use id::generate_game_id;
pub use scoring::{ScoreCard, ScoreCategory, ScoreLedger};
pub use types::*;

pub(crate) fn emit(counters: &mut Counters, tick: u64, event: Event) -> EventEnvelope {
    let id = EventId(format!("evt_{:06}", counters.next_event_id));
    counters.next_event_id += 1;
    EventEnvelope { id, tick, event }
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

#[cfg(test)]
mod tests;
