use super::*;
use crate::board::Mover;

impl GameSession {
    /// One frame of the movement scheduler. The player and the ghosts each
    /// advance at most one cell, each on its own cadence.
    pub fn tick(&mut self, now_ms: u64) {
        if self.stopped {
            return;
        }
        self.update_timers(now_ms);
        if self.state != GameState::Playing {
            return;
        }

        if now_ms.saturating_sub(self.last_player_move_ms) >= self.profile.player_tick_interval_ms {
            self.last_player_move_ms = now_ms;
            self.advance_player(now_ms);
        }
        if self.state != GameState::Playing {
            return;
        }

        if now_ms.saturating_sub(self.last_ghost_move_ms) >= self.profile.ghost_tick_interval_ms {
            self.last_ghost_move_ms = now_ms;
            self.advance_ghosts();
        }
    }

    /// Buffered turn first, then the current heading, else stay put.
    fn advance_player(&mut self, now_ms: u64) {
        let from = self.player.pos();
        let buffered = self.player.view.buffered_dir;
        let current = self.player.view.dir;

        let (dir, next) = if let Some(next) = self.board.try_step(from, buffered, Mover::Player) {
            (buffered, next)
        } else if let Some(next) = self.board.try_step(from, current, Mover::Player) {
            (current, next)
        } else {
            return;
        };

        self.player.view.x = next.x;
        self.player.view.y = next.y;
        self.player.view.dir = dir;
        self.player.view.mouth_open = !self.player.view.mouth_open;
        self.apply_player_pickups(now_ms);
    }

    fn advance_ghosts(&mut self) {
        let now_ms = self.last_seen_ms;
        let mode = self.mode.mode();
        let player = self.player.pos();
        let player_dir = self.player.view.dir;
        let ambush_lookahead = self.ambush_lookahead();

        for idx in 0..self.ghosts.len() {
            if self.ghosts[idx].view.eaten {
                continue;
            }
            let frightened = self.is_ghost_frightened(idx, now_ms);
            let roster: Vec<GhostView> = self.ghosts.iter().map(|g| g.view.clone()).collect();
            let ctx = TargetContext {
                player,
                player_dir,
                ghosts: &roster,
                mode,
                ambush_lookahead,
                width: self.board.width,
                height: self.board.height,
            };
            let target = compute_target(&ctx, &roster[idx], frightened);
            let step = choose_step(&self.board, self.ghosts[idx].pos(), &target);

            let ghost = &mut self.ghosts[idx];
            ghost.view.target = target.cell;
            if let Some((dir, next)) = step {
                ghost.view.x = next.x;
                ghost.view.y = next.y;
                ghost.view.dir = dir;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PELLET_POINTS;

    const CORRIDOR: [&str; 7] = [
        "##############",
        "#P.....      #",
        "#### #########",
        "#            #",
        "############ #",
        "#GGGG        #",
        "##############",
    ];

    const TUNNEL: [&str; 5] = [
        "#########",
        "#GGGG   #",
        "####### #",
        "P.      .",
        "#########",
    ];

    #[test]
    fn player_waits_for_its_interval() {
        let mut session = test_session(&CORRIDOR);
        session.set_direction(Direction::Right);

        session.tick(100);
        assert_eq!(session.player_position(), Vec2::new(1, 1));
        session.tick(159);
        assert_eq!(session.player_position(), Vec2::new(1, 1));
        session.tick(160);
        assert_eq!(session.player_position(), Vec2::new(2, 1));
        session.tick(200);
        assert_eq!(session.player_position(), Vec2::new(2, 1));
        session.tick(320);
        assert_eq!(session.player_position(), Vec2::new(3, 1));
    }

    #[test]
    fn blocked_turn_falls_back_to_current_heading() {
        let mut session = test_session(&CORRIDOR);
        session.set_direction(Direction::Right);
        session.tick(160);
        assert_eq!(session.player_direction(), Direction::Right);

        // (2,2) is a wall, so the player keeps going right.
        session.set_direction(Direction::Down);
        session.tick(320);
        assert_eq!(session.player_position(), Vec2::new(3, 1));
        assert_eq!(session.player_direction(), Direction::Right);

        // (4,2) is open: the buffered turn is taken as soon as it is legal.
        session.tick(480);
        assert_eq!(session.player_position(), Vec2::new(4, 1));
        session.tick(640);
        assert_eq!(session.player_position(), Vec2::new(4, 2));
        assert_eq!(session.player_direction(), Direction::Down);
    }

    #[test]
    fn player_stops_when_both_directions_are_walls() {
        let mut session = test_session(&CORRIDOR);
        session.set_direction(Direction::Up);
        session.tick(160);
        assert_eq!(session.player_position(), Vec2::new(1, 1));
        assert_eq!(session.player_direction(), Direction::None);
    }

    #[test]
    fn tunnel_wraps_left_edge_to_right_edge() {
        let mut session = test_session(&TUNNEL);
        assert_eq!(session.player_position(), Vec2::new(0, 3));
        session.set_direction(Direction::Left);
        session.tick(160);
        assert_eq!(session.player_position(), Vec2::new(8, 3));
        assert_eq!(session.score(), PELLET_POINTS);
    }

    #[test]
    fn tunnel_wraps_right_edge_to_left_edge() {
        let mut session = test_session(&TUNNEL);
        session.player.view.x = 8;
        session.set_direction(Direction::Right);
        session.tick(160);
        assert_eq!(session.player_position(), Vec2::new(0, 3));
    }

    #[test]
    fn chaser_steps_toward_player() {
        let mut session = test_session(&CORRIDOR);
        session.ghosts[0].view.x = 8;
        session.ghosts[0].view.y = 3;
        session.player.view.x = 4;
        session.player.view.y = 3;

        session.tick(200);
        assert_eq!(session.ghost_positions()[0].1, Vec2::new(7, 3));
        assert_eq!(session.ghosts[0].view.dir, Direction::Left);
        assert_eq!(session.ghosts[0].view.target, Vec2::new(4, 3));
    }

    #[test]
    fn eaten_ghost_does_not_move_on_ticks() {
        let mut session = test_session(&CORRIDOR);
        session.ghosts[0].view.eaten = true;
        session.ghosts[0].view.respawn_at = Some(u64::MAX);
        let before = session.ghost_positions()[0].1;

        session.tick(200);
        session.tick(400);
        assert_eq!(session.ghost_positions()[0].1, before);
    }

    #[test]
    fn ghost_without_legal_moves_holds_position() {
        let mut session = test_session(&[
            "##########",
            "#P.GGGG  #",
            "##########",
            "#### #####",
            "##########",
        ]);
        session.ghosts[1].view.x = 4;
        session.ghosts[1].view.y = 3;
        assert!(session.legal_ghost_moves(1).is_empty());

        session.tick(200);
        assert_eq!(session.ghost_positions()[1].1, Vec2::new(4, 3));
        assert_eq!(session.state(), GameState::Playing);
    }

    #[test]
    fn ghost_moves_never_land_on_walls() {
        let mut session = GameSession::new(SessionOptions::default(), 0).expect("classic");
        session.set_direction(Direction::Left);
        for frame in 1..=600u64 {
            let now = frame * 16;
            session.tick(now);
            for idx in 0..4 {
                for (_, next) in session.legal_ghost_moves(idx) {
                    assert!(session.board.is_walkable(next.x, next.y, Mover::Ghost));
                }
            }
            for (_, pos) in session.ghost_positions() {
                assert!(session.board.is_walkable(pos.x, pos.y, Mover::Ghost));
            }
        }
    }

    #[test]
    fn ghosts_keep_their_own_cadence() {
        let mut session = test_session(&CORRIDOR);
        let before = session.ghost_positions();
        session.tick(160);
        assert_eq!(session.ghost_positions(), before);
        session.tick(200);
        assert_ne!(session.ghost_positions(), before);
    }
}
