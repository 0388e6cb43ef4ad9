use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    None,
}

impl Direction {
    // Ties in ghost targeting go to the earliest entry.
    pub const ORTHOGONAL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    pub fn from_vector(dx: i32, dy: i32) -> Option<Self> {
        match (dx, dy) {
            (0, -1) => Some(Self::Up),
            (0, 1) => Some(Self::Down),
            (-1, 0) => Some(Self::Left),
            (1, 0) => Some(Self::Right),
            _ => None,
        }
    }

    pub fn vector(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
            Self::None => (0, 0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

impl Vec2 {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostRole {
    Chaser,
    Ambusher,
    Flanker,
    Opportunist,
}

impl GhostRole {
    pub const ALL: [GhostRole; 4] = [
        GhostRole::Chaser,
        GhostRole::Ambusher,
        GhostRole::Flanker,
        GhostRole::Opportunist,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    Playing,
    Won,
    Lost,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostMode {
    Scatter,
    Chase,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DangerLevel {
    None,
    Low,
    Medium,
    High,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Casual,
    Normal,
    Hard,
    Nightmare,
}

impl Difficulty {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "casual" => Some(Self::Casual),
            "normal" => Some(Self::Normal),
            "hard" => Some(Self::Hard),
            "nightmare" => Some(Self::Nightmare),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DifficultyProfile {
    #[serde(rename = "playerTickIntervalMs")]
    pub player_tick_interval_ms: u64,
    #[serde(rename = "ghostTickIntervalMs")]
    pub ghost_tick_interval_ms: u64,
    #[serde(rename = "aggressionFactor")]
    pub aggression_factor: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FruitKind {
    Cherry,
    Strawberry,
    Orange,
    Apple,
    Melon,
    Galaxian,
    Bell,
    Key,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub x: i32,
    pub y: i32,
    pub dir: Direction,
    #[serde(rename = "bufferedDir")]
    pub buffered_dir: Direction,
    #[serde(rename = "mouthOpen")]
    pub mouth_open: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct GhostView {
    pub role: GhostRole,
    pub x: i32,
    pub y: i32,
    pub dir: Direction,
    pub home: Vec2,
    pub eaten: bool,
    pub frightened: bool,
    pub target: Vec2,
    #[serde(rename = "respawnAt")]
    pub respawn_at: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FruitView {
    #[serde(rename = "type")]
    pub kind: FruitKind,
    pub x: i32,
    pub y: i32,
    pub points: u32,
    #[serde(rename = "expiresAt")]
    pub expires_at: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    PelletEaten {
        x: i32,
        y: i32,
        points: u32,
        streak: u32,
    },
    PowerActivated {
        x: i32,
        y: i32,
        #[serde(rename = "frightenedUntil")]
        frightened_until: u64,
    },
    FrightenedEnded,
    ComboReset {
        streak: u32,
    },
    GhostEaten {
        role: GhostRole,
        points: u32,
    },
    GhostRespawned {
        role: GhostRole,
    },
    FruitSpawned {
        fruit: FruitView,
    },
    FruitEaten {
        #[serde(rename = "fruitType")]
        kind: FruitKind,
        points: u32,
    },
    FruitExpired,
    ModeChanged {
        mode: GhostMode,
    },
    LifeLost {
        lives: u32,
    },
    Won {
        level: u32,
    },
    Lost {
        score: u32,
    },
    BoardReset {
        level: u32,
    },
    SessionRestarted,
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    #[serde(rename = "nowMs")]
    pub now_ms: u64,
    pub state: GameState,
    pub width: i32,
    pub height: i32,
    pub tiles: Vec<String>,
    pub player: PlayerView,
    pub ghosts: Vec<GhostView>,
    pub fruit: Option<FruitView>,
    pub score: u32,
    pub lives: u32,
    pub level: u32,
    #[serde(rename = "comboStreak")]
    pub combo_streak: u32,
    #[serde(rename = "pelletsRemaining")]
    pub pellets_remaining: usize,
    pub mode: GhostMode,
    #[serde(rename = "frightenedRemainingMs")]
    pub frightened_remaining_ms: u64,
    pub danger: DangerLevel,
    pub events: Vec<GameEvent>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SessionStats {
    #[serde(rename = "pelletsEaten")]
    pub pellets_eaten: u32,
    #[serde(rename = "powerPelletsEaten")]
    pub power_pellets_eaten: u32,
    #[serde(rename = "ghostsEaten")]
    pub ghosts_eaten: u32,
    #[serde(rename = "fruitsEaten")]
    pub fruits_eaten: u32,
    #[serde(rename = "livesLost")]
    pub lives_lost: u32,
    #[serde(rename = "bestCombo")]
    pub best_combo: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct SessionSummary {
    pub state: GameState,
    pub difficulty: Difficulty,
    pub score: u32,
    pub level: u32,
    pub lives: u32,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    pub stats: SessionStats,
}
