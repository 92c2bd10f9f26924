use rand::Rng;

use crate::error::{CommandError, CommandResult};
use crate::random::ran;
use crate::registry;
use crate::{ActorId, CoordMode, Device, GameContent, GameState, Position, Ship};

pub(crate) fn number(token: &str) -> CommandResult<i32> {
    token
        .parse::<i32>()
        .map_err(|_| CommandError::BadNumber(token.to_string()))
}

pub(crate) fn float(token: &str) -> CommandResult<f64> {
    token
        .parse::<f64>()
        .ok()
        .filter(|x| x.is_finite())
        .ok_or_else(|| CommandError::BadNumber(token.to_string()))
}

pub(crate) fn is_number(token: &str) -> bool {
    token.parse::<f64>().is_ok()
}

pub(crate) fn keyword(token: &str, word: &str, min_len: usize) -> bool {
    let token = token.to_ascii_uppercase();
    token.len() >= min_len && word.starts_with(token.as_str())
}

/// `min_ms` plus a uniform share of `range_ms`.
pub(crate) fn jittered_delay(rng: &mut impl Rng, min_ms: u64, range_ms: u64) -> u64 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let extra = (ran(rng) * range_ms as f64) as u64;
    min_ms + extra
}

pub(crate) fn own_ship(state: &GameState, actor: ActorId) -> CommandResult<&Ship> {
    registry::ship(state, actor).ok_or(CommandError::NoShip)
}

fn coord_mode(token: &str) -> Option<CoordMode> {
    if keyword(token, "ABSOLUTE", 1) {
        Some(CoordMode::Absolute)
    } else if keyword(token, "RELATIVE", 1) {
        Some(CoordMode::Relative)
    } else if keyword(token, "COMPUTED", 1) {
        Some(CoordMode::Computed)
    } else {
        None
    }
}

/// Leading `A`/`R`/`C` mode token, falling back to the actor's default.
pub(crate) fn take_mode<'a>(
    state: &GameState,
    actor: ActorId,
    args: &'a [String],
) -> (CoordMode, &'a [String]) {
    if let Some((first, rest)) = args.split_first() {
        if let Some(mode) = coord_mode(first) {
            return (mode, rest);
        }
    }
    let default = state
        .actors
        .get(&actor)
        .map(|a| a.settings.default_coords)
        .unwrap_or_default();
    (default, args)
}

/// Read one target point in `mode`. Returns the point and the unread arguments.
pub(crate) fn point<'a>(
    state: &GameState,
    content: &GameContent,
    actor: ActorId,
    mode: CoordMode,
    args: &'a [String],
    usage: &'static str,
) -> CommandResult<(Position, &'a [String])> {
    let ship = own_ship(state, actor)?;
    let (position, rest) = match mode {
        CoordMode::Computed => {
            let (name, rest) = args.split_first().ok_or(CommandError::Usage(usage))?;
            if ship.device_inoperative(Device::Computer, &content.constants) {
                return Err(CommandError::DeviceInoperative(Device::Computer));
            }
            let target = registry::find_ship_by_name(state, name)
                .filter(|id| *id != actor)
                .and_then(|id| registry::ship(state, id))
                .filter(|s| !s.cloaked)
                .ok_or_else(|| CommandError::UnknownShip(name.clone()))?;
            (target.position, rest)
        }
        CoordMode::Absolute | CoordMode::Relative => {
            let [v, h, rest @ ..] = args else {
                return Err(CommandError::Usage(usage));
            };
            let (v, h) = (number(v)?, number(h)?);
            let position = if mode == CoordMode::Relative {
                ship.position.offset(v, h)
            } else {
                Position::new(v, h)
            };
            (position, rest)
        }
    };
    if !content.in_bounds(position) {
        return Err(CommandError::OutOfBounds(position));
    }
    Ok((position, rest))
}
