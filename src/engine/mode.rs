use crate::constants::{CHASE_DURATION_MS, MODE_CYCLE_MS};
use crate::types::GhostMode;

/// Scatter/chase cycle. Each cycle opens with `chase_ms` of chase and spends the
/// rest of `cycle_ms` in scatter. Frightened never touches this machine.
#[derive(Clone, Debug)]
pub struct ModeController {
    cycle_started_at: u64,
    chase_ms: u64,
    cycle_ms: u64,
    mode: GhostMode,
}

impl ModeController {
    pub fn new(now_ms: u64) -> Self {
        Self::with_timings(now_ms, CHASE_DURATION_MS, MODE_CYCLE_MS)
    }

    pub fn with_timings(now_ms: u64, chase_ms: u64, cycle_ms: u64) -> Self {
        Self {
            cycle_started_at: now_ms,
            chase_ms,
            cycle_ms: cycle_ms.max(1),
            mode: GhostMode::Chase,
        }
    }

    pub fn mode(&self) -> GhostMode {
        self.mode
    }

    pub fn restart(&mut self, now_ms: u64) {
        self.cycle_started_at = now_ms;
        self.mode = GhostMode::Chase;
    }

    /// Returns the new mode when a boundary was crossed since the last update.
    pub fn update(&mut self, now_ms: u64) -> Option<GhostMode> {
        let next = self.mode_at(now_ms);
        if next == self.mode {
            return None;
        }
        self.mode = next;
        Some(next)
    }

    fn mode_at(&self, now_ms: u64) -> GhostMode {
        let phase = now_ms.saturating_sub(self.cycle_started_at) % self.cycle_ms;
        if phase < self.chase_ms {
            GhostMode::Chase
        } else {
            GhostMode::Scatter
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_chase_and_switches_to_scatter() {
        let mut mode = ModeController::new(1_000);
        assert_eq!(mode.mode(), GhostMode::Chase);
        assert_eq!(mode.update(1_000 + CHASE_DURATION_MS - 1), None);
        assert_eq!(
            mode.update(1_000 + CHASE_DURATION_MS),
            Some(GhostMode::Scatter)
        );
        assert_eq!(mode.update(1_000 + CHASE_DURATION_MS + 10), None);
    }

    #[test]
    fn cycle_reenters_chase() {
        let mut mode = ModeController::with_timings(0, 100, 150);
        assert_eq!(mode.update(120), Some(GhostMode::Scatter));
        assert_eq!(mode.update(150), Some(GhostMode::Chase));
        assert_eq!(mode.update(260), Some(GhostMode::Scatter));
        assert_eq!(mode.update(300), Some(GhostMode::Chase));
    }

    #[test]
    fn restart_rearms_from_zero() {
        let mut mode = ModeController::with_timings(0, 100, 150);
        mode.update(120);
        assert_eq!(mode.mode(), GhostMode::Scatter);

        mode.restart(130);
        assert_eq!(mode.mode(), GhostMode::Chase);
        assert_eq!(mode.update(229), None);
        assert_eq!(mode.update(230), Some(GhostMode::Scatter));
    }
}
