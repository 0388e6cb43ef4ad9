use crate::board::{Board, BoardError, Mover};
use crate::constants::{
    get_ambush_lookahead, get_difficulty_profile, RESET_DELAY_MS, STARTING_LIVES,
};
use crate::types::{
    DangerLevel, Difficulty, DifficultyProfile, Direction, FruitView, GameEvent, GameState,
    GhostMode, GhostRole, GhostView, PlayerView, SessionStats, SessionSummary, Snapshot, Vec2,
};

mod collision;
mod mode;
mod movement;
mod targeting;
mod utils;

pub use self::mode::ModeController;
pub use self::targeting::{choose_step, compute_target, scatter_corner, Objective, Target, TargetContext};

#[derive(Clone, Debug)]
struct PlayerInternal {
    view: PlayerView,
}

impl PlayerInternal {
    fn at_spawn(spawn: Vec2) -> Self {
        Self {
            view: PlayerView {
                x: spawn.x,
                y: spawn.y,
                dir: Direction::None,
                buffered_dir: Direction::None,
                mouth_open: false,
            },
        }
    }

    fn pos(&self) -> Vec2 {
        Vec2::new(self.view.x, self.view.y)
    }
}

#[derive(Clone, Debug)]
struct GhostInternal {
    view: GhostView,
    eaten_in_activation: Option<u32>,
}

impl GhostInternal {
    fn at_home(role: GhostRole, home: Vec2) -> Self {
        Self {
            view: GhostView {
                role,
                x: home.x,
                y: home.y,
                dir: Direction::None,
                home,
                eaten: false,
                frightened: false,
                target: home,
                respawn_at: None,
            },
            eaten_in_activation: None,
        }
    }

    fn pos(&self) -> Vec2 {
        Vec2::new(self.view.x, self.view.y)
    }

    // Eaten-in activation survives the trip home.
    fn send_home(&mut self) {
        let eaten_in = self.eaten_in_activation;
        *self = Self::at_home(self.view.role, self.view.home);
        self.eaten_in_activation = eaten_in;
    }
}

#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub difficulty: Difficulty,
    pub layout: Option<Vec<String>>,
    pub starting_lives: Option<u32>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Normal,
            layout: None,
            starting_lives: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GameSession {
    pub started_at_ms: u64,
    pub difficulty: Difficulty,
    pub profile: DifficultyProfile,
    pub board: Board,

    starting_lives: u32,
    player: PlayerInternal,
    ghosts: Vec<GhostInternal>,
    mode: ModeController,
    state: GameState,

    score: u32,
    lives: u32,
    level: u32,
    combo_streak: u32,
    combo_expires_at: Option<u64>,
    frightened_until: Option<u64>,
    power_activation: u32,
    fruit: Option<FruitView>,
    fruits_spawned: usize,
    danger: DangerLevel,

    last_player_move_ms: u64,
    last_ghost_move_ms: u64,
    reset_at: Option<u64>,
    last_seen_ms: u64,
    stopped: bool,

    events: Vec<GameEvent>,
    stats: SessionStats,
}

impl GameSession {
    pub fn new(options: SessionOptions, now_ms: u64) -> Result<Self, BoardError> {
        let board = match options.layout.as_deref() {
            Some(rows) => Board::parse(rows)?,
            None => Board::classic()?,
        };
        let starting_lives = options.starting_lives.unwrap_or(STARTING_LIVES).max(1);
        let player = PlayerInternal::at_spawn(board.player_spawn);
        let ghosts = GhostRole::ALL
            .iter()
            .zip(board.ghost_homes.iter())
            .map(|(role, home)| GhostInternal::at_home(*role, *home))
            .collect();

        Ok(Self {
            started_at_ms: now_ms,
            difficulty: options.difficulty,
            profile: get_difficulty_profile(options.difficulty),
            board,
            starting_lives,
            player,
            ghosts,
            mode: ModeController::new(now_ms),
            state: GameState::Playing,
            score: 0,
            lives: starting_lives,
            level: 1,
            combo_streak: 0,
            combo_expires_at: None,
            frightened_until: None,
            power_activation: 0,
            fruit: None,
            fruits_spawned: 0,
            danger: DangerLevel::None,
            last_player_move_ms: now_ms,
            last_ghost_move_ms: now_ms,
            reset_at: None,
            last_seen_ms: now_ms,
            stopped: false,
            events: Vec::new(),
            stats: SessionStats::default(),
        })
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn combo_streak(&self) -> u32 {
        self.combo_streak
    }

    pub fn pellets_remaining(&self) -> usize {
        self.board.pellets_remaining()
    }

    pub fn mode(&self) -> GhostMode {
        self.mode.mode()
    }

    pub fn danger(&self) -> DangerLevel {
        self.danger
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn player_position(&self) -> Vec2 {
        self.player.pos()
    }

    pub fn player_direction(&self) -> Direction {
        self.player.view.dir
    }

    pub fn ghost_positions(&self) -> Vec<(GhostRole, Vec2)> {
        self.ghosts
            .iter()
            .map(|ghost| (ghost.view.role, ghost.pos()))
            .collect()
    }

    pub fn legal_ghost_moves(&self, ghost_idx: usize) -> Vec<(Direction, Vec2)> {
        self.ghosts
            .get(ghost_idx)
            .map(|ghost| self.board.legal_neighbors(ghost.pos(), Mover::Ghost))
            .unwrap_or_default()
    }

    pub fn is_frightened(&self, now_ms: u64) -> bool {
        self.frightened_until.is_some_and(|until| until > now_ms)
    }

    pub fn frightened_remaining_ms(&self, now_ms: u64) -> u64 {
        self.frightened_until
            .map(|until| until.saturating_sub(now_ms))
            .unwrap_or(0)
    }

    fn is_ghost_frightened(&self, ghost_idx: usize, now_ms: u64) -> bool {
        let Some(ghost) = self.ghosts.get(ghost_idx) else {
            return false;
        };
        self.is_frightened(now_ms)
            && !ghost.view.eaten
            && ghost.eaten_in_activation != Some(self.power_activation)
    }

    fn ambush_lookahead(&self) -> i32 {
        get_ambush_lookahead(&self.profile)
    }

    pub fn set_direction(&mut self, dir: Direction) {
        if self.stopped {
            return;
        }
        self.player.view.buffered_dir = dir;
    }

    pub fn set_direction_vector(&mut self, dx: i32, dy: i32) -> bool {
        match Direction::from_vector(dx, dy) {
            Some(dir) => {
                self.set_direction(dir);
                true
            }
            None => false,
        }
    }

    pub fn restart(&mut self, now_ms: u64) {
        if self.stopped {
            return;
        }
        self.start_new_session(now_ms);
    }

    pub fn stop(&mut self) {
        self.stopped = true;
        self.reset_at = None;
        self.frightened_until = None;
        self.combo_expires_at = None;
        self.fruit = None;
    }

    fn start_new_session(&mut self, now_ms: u64) {
        self.started_at_ms = now_ms;
        self.score = 0;
        self.lives = self.starting_lives;
        self.level = 1;
        self.stats = SessionStats::default();
        self.reset_board(now_ms);
        self.events.push(GameEvent::SessionRestarted);
    }

    fn reset_board(&mut self, now_ms: u64) {
        self.board.reset();
        self.reset_agents(now_ms);
        self.mode.restart(now_ms);
        self.state = GameState::Playing;
        self.reset_at = None;
        self.combo_streak = 0;
        self.combo_expires_at = None;
        self.fruit = None;
        self.fruits_spawned = 0;
        self.danger = DangerLevel::None;
    }

    fn reset_agents(&mut self, now_ms: u64) {
        self.player = PlayerInternal::at_spawn(self.board.player_spawn);
        for ghost in &mut self.ghosts {
            ghost.send_home();
        }
        self.frightened_until = None;
        self.last_player_move_ms = now_ms;
        self.last_ghost_move_ms = now_ms;
    }

    // Runs at the start of both tick and poll_collisions.
    fn update_timers(&mut self, now_ms: u64) {
        self.last_seen_ms = self.last_seen_ms.max(now_ms);

        if let Some(reset_at) = self.reset_at {
            if now_ms >= reset_at {
                self.finish_pending_reset(now_ms);
            }
            return;
        }
        if self.state != GameState::Playing {
            return;
        }

        if let Some(mode) = self.mode.update(now_ms) {
            self.events.push(GameEvent::ModeChanged { mode });
        }

        if self.frightened_until.is_some_and(|until| now_ms >= until) {
            self.frightened_until = None;
            self.events.push(GameEvent::FrightenedEnded);
        }

        for ghost in &mut self.ghosts {
            if ghost.view.eaten && ghost.view.respawn_at.is_some_and(|at| now_ms >= at) {
                ghost.send_home();
                self.events.push(GameEvent::GhostRespawned {
                    role: ghost.view.role,
                });
            }
        }

        if self.combo_expires_at.is_some_and(|at| now_ms >= at) {
            self.combo_expires_at = None;
            let streak = self.combo_streak;
            self.combo_streak = 0;
            self.events.push(GameEvent::ComboReset { streak });
        }

        if self
            .fruit
            .as_ref()
            .is_some_and(|fruit| now_ms >= fruit.expires_at)
        {
            self.fruit = None;
            self.events.push(GameEvent::FruitExpired);
        }
    }

    fn finish_pending_reset(&mut self, now_ms: u64) {
        match self.state {
            GameState::Won => {
                self.reset_board(now_ms);
                self.events.push(GameEvent::BoardReset { level: self.level });
            }
            GameState::Lost => self.start_new_session(now_ms),
            GameState::Playing => self.reset_at = None,
        }
    }

    fn schedule_reset(&mut self, now_ms: u64) {
        self.reset_at = Some(now_ms + RESET_DELAY_MS);
        self.frightened_until = None;
        self.combo_expires_at = None;
        self.fruit = None;
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let now_ms = self.last_seen_ms;
        let ghosts = (0..self.ghosts.len())
            .map(|idx| {
                let mut view = self.ghosts[idx].view.clone();
                view.frightened = self.is_ghost_frightened(idx, now_ms);
                view
            })
            .collect();
        let snapshot = Snapshot {
            now_ms,
            state: self.state,
            width: self.board.width,
            height: self.board.height,
            tiles: self.board.tiles(),
            player: self.player.view.clone(),
            ghosts,
            fruit: self.fruit.clone(),
            score: self.score,
            lives: self.lives,
            level: self.level,
            combo_streak: self.combo_streak,
            pellets_remaining: self.board.pellets_remaining(),
            mode: self.mode.mode(),
            frightened_remaining_ms: self.frightened_remaining_ms(now_ms),
            danger: self.danger,
            events: if include_events {
                self.events.clone()
            } else {
                Vec::new()
            },
        };
        if include_events {
            self.events.clear();
        }
        snapshot
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            state: self.state,
            difficulty: self.difficulty,
            score: self.score,
            level: self.level,
            lives: self.lives,
            duration_ms: self.last_seen_ms.saturating_sub(self.started_at_ms),
            stats: self.stats.clone(),
        }
    }
}

#[cfg(test)]
fn test_session(rows: &[&str]) -> GameSession {
    GameSession::new(
        SessionOptions {
            difficulty: Difficulty::Normal,
            layout: Some(rows.iter().map(|row| row.to_string()).collect()),
            starting_lives: None,
        },
        0,
    )
    .expect("test layout parses")
}
