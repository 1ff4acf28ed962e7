//! Autopilot input: picks movement directions instead of reading a keyboard.

use shared::{Direction, Player};

/// Directions that bring `player` closer to `(target_x, target_y)`.
///
/// An axis is left alone once the player is within half a step of the target
/// on it, so the player settles instead of oscillating around it.
pub fn steer_towards(player: &Player, target_x: f32, target_y: f32, speed: f32) -> Vec<Direction> {
    let mut directions = Vec::with_capacity(2);
    let dead_zone = speed / 2.0;

    let dx = target_x - player.x;
    if dx > dead_zone {
        directions.push(Direction::Right);
    } else if dx < -dead_zone {
        directions.push(Direction::Left);
    }

    let dy = target_y - player.y;
    if dy > dead_zone {
        directions.push(Direction::Down);
    } else if dy < -dead_zone {
        directions.push(Direction::Up);
    }

    directions
}
