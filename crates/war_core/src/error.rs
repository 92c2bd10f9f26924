//! Command failures reported back to the issuing actor.
//!
//! A failed command never mutates the world and never stops the actor's queue.

use thiserror::Error;

use crate::{Device, Position, Side};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("You must be in the game with a ship to do that.")]
    NoShip,

    #[error("Unknown command \"{0}\".")]
    UnknownCommand(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("\"{0}\" is not a number.")]
    BadNumber(String),

    #[error("Sector {0} is outside the galaxy.")]
    OutOfBounds(Position),

    #[error("Target is {distance} sectors away; maximum range is {max}.")]
    OutOfRange { distance: i32, max: i32 },

    #[error("Insufficient energy: {needed} units required, {available} available.")]
    InsufficientEnergy { needed: i64, available: i64 },

    #[error("Only {available} torpedoes left.")]
    InsufficientTorpedoes { available: u32 },

    #[error("{0} inoperative.")]
    DeviceInoperative(Device),

    #[error("{0} malfunctioned.")]
    DeviceMalfunction(Device),

    #[error("No {0} adjacent to your ship.")]
    NothingAdjacent(&'static str),

    #[error("Sector {0} is not adjacent to your ship.")]
    NotAdjacent(Position),

    #[error("That planet belongs to the {0}.")]
    WrongSide(Side),

    #[error("Nothing to fire at in sector {0}.")]
    NoTarget(Position),

    #[error("No ship named \"{0}\".")]
    UnknownShip(String),

    #[error("Both phaser banks are recharging.")]
    PhasersRecharging,

    #[error("Shields must be down to do that.")]
    ShieldsUp,

    #[error("That planet is fully fortified.")]
    BuildLimit,

    #[error("Bases must be destroyed before they can be captured.")]
    BaseNotCapturable,

    #[error("Another ship is already capturing that planet.")]
    CaptureInProgress,

    #[error("Navigation blocked at sector {0}.")]
    Blocked(Position),

    #[error("Warp {requested} exceeds the maximum of warp {max}.")]
    WarpTooHigh { requested: i32, max: i32 },

    #[error("You are already at sector {0}.")]
    AlreadyThere(Position),

    #[error("{0}")]
    Rejected(String),
}

pub type CommandResult<T> = Result<T, CommandError>;
