use super::utils::manhattan;
use super::*;
use crate::board::Cell;
use crate::constants::{
    get_combo_bonus, get_fruit_for_level, COMBO_WINDOW_MS, DANGER_HIGH_DISTANCE,
    DANGER_LOW_DISTANCE, DANGER_MEDIUM_DISTANCE, FRIGHTENED_DURATION_MS, FRUIT_LIFETIME_MS,
    FRUIT_SPAWN_PERCENTS, GHOST_EATEN_POINTS, GHOST_RESPAWN_DELAY_MS, PELLET_POINTS,
    POWER_PELLET_POINTS,
};

impl GameSession {
    /// Fixed-interval check for everything that happens when the player shares
    /// a cell with something: ghosts and the bonus fruit.
    pub fn poll_collisions(&mut self, now_ms: u64) {
        if self.stopped {
            return;
        }
        self.update_timers(now_ms);
        if self.state != GameState::Playing {
            return;
        }

        self.danger = self.compute_danger(now_ms);
        let player = self.player.pos();

        if let Some(fruit) = self.fruit.take() {
            if fruit.x == player.x && fruit.y == player.y {
                self.score += fruit.points;
                self.stats.fruits_eaten += 1;
                self.events.push(GameEvent::FruitEaten {
                    kind: fruit.kind,
                    points: fruit.points,
                });
            } else {
                self.fruit = Some(fruit);
            }
        }

        for idx in 0..self.ghosts.len() {
            let ghost = &self.ghosts[idx];
            if ghost.view.eaten || ghost.pos() != player {
                continue;
            }
            if self.is_ghost_frightened(idx, now_ms) {
                self.eat_ghost(idx, now_ms);
            } else {
                self.lose_life(now_ms);
                break;
            }
        }
    }

    fn eat_ghost(&mut self, idx: usize, now_ms: u64) {
        let ghost = &mut self.ghosts[idx];
        ghost.view.eaten = true;
        ghost.eaten_in_activation = Some(self.power_activation);
        ghost.view.respawn_at = Some(now_ms + GHOST_RESPAWN_DELAY_MS);
        let role = ghost.view.role;

        self.score += GHOST_EATEN_POINTS;
        self.stats.ghosts_eaten += 1;
        self.events.push(GameEvent::GhostEaten {
            role,
            points: GHOST_EATEN_POINTS,
        });
    }

    fn lose_life(&mut self, now_ms: u64) {
        self.lives = self.lives.saturating_sub(1);
        self.stats.lives_lost += 1;
        if self.lives == 0 {
            self.state = GameState::Lost;
            self.schedule_reset(now_ms);
            self.events.push(GameEvent::Lost { score: self.score });
            return;
        }
        self.events.push(GameEvent::LifeLost { lives: self.lives });
        self.reset_agents(now_ms);
    }

    /// Side effects of the cell the player just stepped onto. Runs inline with
    /// the move so the next poll already sees the updated board.
    pub(super) fn apply_player_pickups(&mut self, now_ms: u64) {
        let pos = self.player.pos();
        match self.board.consume(pos.x, pos.y) {
            Some(Cell::Pellet) => {
                let points = PELLET_POINTS + get_combo_bonus(self.combo_streak);
                self.score += points;
                self.combo_streak += 1;
                self.combo_expires_at = Some(now_ms + COMBO_WINDOW_MS);
                self.stats.pellets_eaten += 1;
                self.stats.best_combo = self.stats.best_combo.max(self.combo_streak);
                self.events.push(GameEvent::PelletEaten {
                    x: pos.x,
                    y: pos.y,
                    points,
                    streak: self.combo_streak,
                });
            }
            Some(Cell::PowerPellet) => {
                let until = now_ms + FRIGHTENED_DURATION_MS;
                self.score += POWER_PELLET_POINTS;
                self.frightened_until = Some(until);
                self.power_activation += 1;
                self.stats.power_pellets_eaten += 1;
                self.events.push(GameEvent::PowerActivated {
                    x: pos.x,
                    y: pos.y,
                    frightened_until: until,
                });
            }
            _ => return,
        }

        self.maybe_spawn_fruit(now_ms);
        if self.board.pellets_remaining() == 0 {
            self.state = GameState::Won;
            self.level += 1;
            self.schedule_reset(now_ms);
            self.events.push(GameEvent::Won { level: self.level });
        }
    }

    fn maybe_spawn_fruit(&mut self, now_ms: u64) {
        let Some(percent) = FRUIT_SPAWN_PERCENTS.get(self.fruits_spawned).copied() else {
            return;
        };
        let total = self.board.total_pellets();
        if self.board.pellets_eaten() * 100 < total * percent {
            return;
        }
        self.fruits_spawned += 1;
        let (kind, points) = get_fruit_for_level(self.level);
        let fruit = FruitView {
            kind,
            x: self.board.fruit_cell.x,
            y: self.board.fruit_cell.y,
            points,
            expires_at: now_ms + FRUIT_LIFETIME_MS,
        };
        self.events.push(GameEvent::FruitSpawned {
            fruit: fruit.clone(),
        });
        self.fruit = Some(fruit);
    }

    fn compute_danger(&self, now_ms: u64) -> DangerLevel {
        let player = self.player.pos();
        let nearest = (0..self.ghosts.len())
            .filter(|idx| !self.ghosts[*idx].view.eaten && !self.is_ghost_frightened(*idx, now_ms))
            .map(|idx| manhattan(self.ghosts[idx].pos(), player))
            .min();
        match nearest {
            Some(d) if d <= DANGER_HIGH_DISTANCE => DangerLevel::High,
            Some(d) if d <= DANGER_MEDIUM_DISTANCE => DangerLevel::Medium,
            Some(d) if d <= DANGER_LOW_DISTANCE => DangerLevel::Low,
            _ => DangerLevel::None,
        }
    }
}
