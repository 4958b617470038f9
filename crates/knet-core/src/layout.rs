//! Node positions and the radial placement of expansion results.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Distance of freshly expanded nodes from their anchor.
pub const EXPANSION_RADIUS: f64 = 50.0;

/// A point on the drawing canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Position { x, y }
    }
}

/// Positions for `count` nodes spread evenly on a circle around `center`,
/// starting at angle 0 and stepping by `2π / count`.
pub fn radial(center: Position, count: usize) -> impl Iterator<Item = Position> {
    let step = if count == 0 { 0.0 } else { 2.0 * PI / count as f64 };
    (0..count).map(move |k| {
        let angle = step * k as f64;
        Position {
            x: center.x + EXPANSION_RADIUS * angle.cos(),
            y: center.y + EXPANSION_RADIUS * angle.sin(),
        }
    })
}
