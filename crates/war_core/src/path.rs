//! Integer rasters for torpedo flight and warp travel.

use crate::{GameContent, Position};

/// Cells on the line from `from` to `to`, excluding `from` and including `to`.
pub fn line(from: Position, to: Position) -> Vec<Position> {
    let dv = (to.v - from.v).abs();
    let dh = (to.h - from.h).abs();
    let sv = (to.v - from.v).signum();
    let sh = (to.h - from.h).signum();
    let mut cells = Vec::with_capacity(usize::try_from(dv.max(dh)).unwrap_or(0));
    let (mut v, mut h) = (from.v, from.h);
    let mut err = dh - dv;
    while (v, h) != (to.v, to.h) {
        let e2 = 2 * err;
        if e2 > -dv {
            err -= dv;
            h += sh;
        }
        if e2 < dh {
            err += dh;
            v += sv;
        }
        cells.push(Position::new(v, h));
    }
    cells
}

/// The point `range` steps from `from` in the direction of `aim`.
pub fn extend_to_range(from: Position, aim: Position, range: i32) -> Position {
    let dv = aim.v - from.v;
    let dh = aim.h - from.h;
    let span = dv.abs().max(dh.abs());
    if span == 0 {
        return from;
    }
    let scale = f64::from(range) / f64::from(span);
    #[allow(clippy::cast_possible_truncation)]
    let end = Position::new(
        from.v + (f64::from(dv) * scale).round() as i32,
        from.h + (f64::from(dh) * scale).round() as i32,
    );
    end
}

/// Torpedo flight: the raster toward `aim`, stretched to full range and clipped at the galaxy edge.
pub fn flight_path(from: Position, aim: Position, range: i32, content: &GameContent) -> Vec<Position> {
    line(from, extend_to_range(from, aim, range))
        .into_iter()
        .take_while(|p| content.in_bounds(*p))
        .collect()
}
