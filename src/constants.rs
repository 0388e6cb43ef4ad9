use crate::types::{Difficulty, DifficultyProfile, FruitKind};

pub const FRAME_MS: u64 = 16;
pub const COLLISION_POLL_MS: u64 = 50;

pub const STARTING_LIVES: u32 = 3;

pub const PELLET_POINTS: u32 = 10;
pub const POWER_PELLET_POINTS: u32 = 50;
pub const GHOST_EATEN_POINTS: u32 = 200;
pub const COMBO_BONUS_PER_STREAK: u32 = 5;
pub const COMBO_WINDOW_MS: u64 = 2_000;

pub const FRIGHTENED_DURATION_MS: u64 = 8_000;
pub const GHOST_RESPAWN_DELAY_MS: u64 = 3_000;
pub const RESET_DELAY_MS: u64 = 2_000;

pub const CHASE_DURATION_MS: u64 = 20_000;
pub const MODE_CYCLE_MS: u64 = 27_000;

pub const AMBUSH_LOOKAHEAD_BASE: i32 = 4;
pub const FLANK_PIVOT_AHEAD: i32 = 2;
pub const OPPORTUNIST_SHY_DISTANCE: i32 = 8;

pub const FRUIT_LIFETIME_MS: u64 = 9_000;
/// Percent of the level's pellets that must be eaten before each fruit appears.
pub const FRUIT_SPAWN_PERCENTS: [usize; 2] = [30, 70];

pub const DANGER_HIGH_DISTANCE: i32 = 3;
pub const DANGER_MEDIUM_DISTANCE: i32 = 5;
pub const DANGER_LOW_DISTANCE: i32 = 8;

pub const CLASSIC_LAYOUT: [&str; 22] = [
    "#####################",
    "#.........#.........#",
    "#o###.###.#.###.###o#",
    "#...................#",
    "#.###.#.#####.#.###.#",
    "#.....#...#...#.....#",
    "#####.###.#.###.#####",
    "#####.#.......#.#####",
    "#####.#.##-##.#.#####",
    "......#.#GGG#.#......",
    "#####.#.##G##.#.#####",
    "#####.#.#####.#.#####",
    "#####.#...F...#.#####",
    "#####.#.#####.#.#####",
    "#.........#.........#",
    "#.###.###.#.###.###.#",
    "#o..#.....P.....#..o#",
    "###.#.#.#####.#.#.###",
    "#.....#...#...#.....#",
    "#.#######.#.#######.#",
    "#...................#",
    "#####################",
];

pub fn get_difficulty_profile(difficulty: Difficulty) -> DifficultyProfile {
    let (player_tick_interval_ms, ghost_tick_interval_ms, aggression_factor) = match difficulty {
        Difficulty::Casual => (200, 260, 0.5),
        Difficulty::Normal => (160, 200, 1.0),
        Difficulty::Hard => (140, 170, 1.5),
        Difficulty::Nightmare => (120, 140, 2.0),
    };
    DifficultyProfile {
        player_tick_interval_ms,
        ghost_tick_interval_ms,
        aggression_factor,
    }
}

pub fn get_ambush_lookahead(profile: &DifficultyProfile) -> i32 {
    ((AMBUSH_LOOKAHEAD_BASE as f32) * profile.aggression_factor)
        .round()
        .max(1.0) as i32
}

pub fn get_combo_bonus(streak: u32) -> u32 {
    streak.saturating_mul(COMBO_BONUS_PER_STREAK)
}

pub fn get_fruit_for_level(level: u32) -> (FruitKind, u32) {
    match level {
        0 | 1 => (FruitKind::Cherry, 100),
        2 => (FruitKind::Strawberry, 300),
        3 | 4 => (FruitKind::Orange, 500),
        5 | 6 => (FruitKind::Apple, 700),
        7 | 8 => (FruitKind::Melon, 1_000),
        9 | 10 => (FruitKind::Galaxian, 2_000),
        11 | 12 => (FruitKind::Bell, 3_000),
        _ => (FruitKind::Key, 5_000),
    }
}
