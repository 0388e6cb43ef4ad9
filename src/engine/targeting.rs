use crate::board::{Board, Mover};
use crate::constants::{FLANK_PIVOT_AHEAD, OPPORTUNIST_SHY_DISTANCE};
use crate::types::{Direction, GhostMode, GhostRole, GhostView, Vec2};

use super::utils::{manhattan, mirror, offset};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Objective {
    Approach,
    /// Step to the neighbor farthest from the target cell.
    Flee,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Target {
    pub cell: Vec2,
    pub objective: Objective,
}

impl Target {
    fn approach(cell: Vec2) -> Self {
        Self {
            cell,
            objective: Objective::Approach,
        }
    }
}

/// Everything a ghost may look at when picking its target. `ghosts` is the full
/// roster with live positions, so ghosts moved earlier in the same tick are seen
/// where they now stand.
#[derive(Clone, Copy, Debug)]
pub struct TargetContext<'a> {
    pub player: Vec2,
    pub player_dir: Direction,
    pub ghosts: &'a [GhostView],
    pub mode: GhostMode,
    pub ambush_lookahead: i32,
    pub width: i32,
    pub height: i32,
}

pub fn scatter_corner(role: GhostRole, width: i32, height: i32) -> Vec2 {
    match role {
        GhostRole::Chaser => Vec2::new(width - 1, 0),
        GhostRole::Ambusher => Vec2::new(0, 0),
        GhostRole::Flanker => Vec2::new(width - 1, height - 1),
        GhostRole::Opportunist => Vec2::new(0, height - 1),
    }
}

pub fn compute_target(ctx: &TargetContext<'_>, ghost: &GhostView, frightened: bool) -> Target {
    let pos = Vec2::new(ghost.x, ghost.y);
    if frightened {
        return Target {
            cell: mirror(ctx.player, pos),
            objective: Objective::Flee,
        };
    }

    let corner = scatter_corner(ghost.role, ctx.width, ctx.height);
    if ctx.mode == GhostMode::Scatter {
        return Target::approach(corner);
    }

    match ghost.role {
        GhostRole::Chaser => Target::approach(ctx.player),
        GhostRole::Ambusher => {
            Target::approach(offset(ctx.player, ctx.player_dir, ctx.ambush_lookahead))
        }
        GhostRole::Flanker => {
            let pivot = offset(ctx.player, ctx.player_dir, FLANK_PIVOT_AHEAD);
            let chaser = ctx
                .ghosts
                .iter()
                .find(|other| other.role == GhostRole::Chaser)
                .map(|other| Vec2::new(other.x, other.y))
                .unwrap_or(ctx.player);
            Target::approach(mirror(chaser, pivot))
        }
        GhostRole::Opportunist => {
            if manhattan(pos, ctx.player) > OPPORTUNIST_SHY_DISTANCE {
                Target::approach(ctx.player)
            } else {
                Target::approach(corner)
            }
        }
    }
}

/// Greedy one-step choice among the legal neighbors. Ties keep the first
/// candidate in `Direction::ORTHOGONAL` order. `None` when boxed in.
pub fn choose_step(board: &Board, from: Vec2, target: &Target) -> Option<(Direction, Vec2)> {
    let mut best: Option<(Direction, Vec2, i32)> = None;
    for (dir, next) in board.legal_neighbors(from, Mover::Ghost) {
        let score = match target.objective {
            Objective::Approach => -manhattan(next, target.cell),
            Objective::Flee => manhattan(next, target.cell),
        };
        if best.is_none_or(|(_, _, best_score)| score > best_score) {
            best = Some((dir, next, score));
        }
    }
    best.map(|(dir, next, _)| (dir, next))
}
