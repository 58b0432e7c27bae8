use std::time::Instant;

use crate::games::hud::HudSnapshot;
use crate::games::physics::clamp_dt;
use crate::games::surface::Surface;
use crate::games::Game;

/// Measures wall time between frames.
#[derive(Debug, Default)]
pub struct FrameClock {
    last: Option<Instant>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous tick, clamped. The first tick after a
    /// reset reports zero so a paused game does not jump.
    pub fn tick(&mut self, now: Instant) -> f32 {
        let dt = self.last.map_or(0.0, |last| now.saturating_duration_since(last).as_secs_f32());
        self.last = Some(now);
        clamp_dt(dt)
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// One frame: simulate, collect HUD changes, then draw.
pub fn run_frame(game: &mut dyn Game, dt: f32, surface: &mut Surface) -> Vec<HudSnapshot> {
    game.update(dt);
    let hud = game.drain_hud();
    game.render(surface);
    hud
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::games::registry;

    #[test]
    fn clock_clamps_and_resets() {
        let mut clock = FrameClock::new();
        let t0 = Instant::now();
        assert_eq!(clock.tick(t0), 0.0);
        let dt = clock.tick(t0 + Duration::from_millis(16));
        assert!((dt - 0.016).abs() < 1e-4);
        assert_eq!(clock.tick(t0 + Duration::from_secs(3)), 0.05);
        clock.reset();
        assert_eq!(clock.tick(t0 + Duration::from_secs(4)), 0.0);
    }

    #[test]
    fn frame_reports_hud_before_drawing() {
        let info = registry::find("stacker").unwrap();
        let mut game = info.create(Some(1));
        game.init(64, 20);
        let mut surface = Surface::new(64, 20);
        assert_eq!(run_frame(game.as_mut(), 0.016, &mut surface).len(), 1);
        assert!(run_frame(game.as_mut(), 0.016, &mut surface).is_empty());
    }
}
