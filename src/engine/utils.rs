use crate::types::{Direction, Vec2};

pub(super) fn manhattan(a: Vec2, b: Vec2) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

/// `steps` cells from `from` along `dir`, ignoring walls and board edges.
pub(super) fn offset(from: Vec2, dir: Direction, steps: i32) -> Vec2 {
    let (dx, dy) = dir.vector();
    Vec2::new(from.x + dx * steps, from.y + dy * steps)
}

/// Reflects `point` through `pivot`.
pub(super) fn mirror(point: Vec2, pivot: Vec2) -> Vec2 {
    Vec2::new(pivot.x * 2 - point.x, pivot.y * 2 - point.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_scales_direction() {
        assert_eq!(offset(Vec2::new(5, 5), Direction::Up, 4), Vec2::new(5, 1));
        assert_eq!(offset(Vec2::new(5, 5), Direction::Right, 2), Vec2::new(7, 5));
        assert_eq!(offset(Vec2::new(5, 5), Direction::None, 3), Vec2::new(5, 5));
    }

    #[test]
    fn mirror_reflects_through_pivot() {
        assert_eq!(mirror(Vec2::new(2, 3), Vec2::new(4, 4)), Vec2::new(6, 5));
        assert_eq!(manhattan(Vec2::new(2, 3), Vec2::new(6, 5)), 6);
    }
}
