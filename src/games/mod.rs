pub mod hud;
pub mod palette;
pub mod physics;
pub mod registry;
pub mod surface;
pub mod viewport;

pub mod asteroids;
pub mod breakout;
pub mod centipede;
pub mod frogger;
pub mod invaders;
pub mod maze_chase;
pub mod pong;
pub mod rhythm;
pub mod snake;
pub mod stacker;

use hud::HudSnapshot;
use surface::Surface;

/// Abstract inputs shared by every game. The host maps keys onto these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Left,
    Right,
    Up,
    Down,
    Fire,
    Thrust,
    Rotate,
    Drop,
}

impl Action {
    pub fn label(self) -> &'static str {
        match self {
            Action::Left => "Left",
            Action::Right => "Right",
            Action::Up => "Up",
            Action::Down => "Down",
            Action::Fire => "Fire",
            Action::Thrust => "Thrust",
            Action::Rotate => "Rotate",
            Action::Drop => "Drop",
        }
    }
}

/// Per-frame contract between the host and a running game.
///
/// The host calls `init` once with the surface size, then `update` and
/// `render` every tick. `render` must not change simulation state. After
/// `destroy` the instance is dropped; a new round builds a fresh instance.
pub trait Game {
    fn init(&mut self, width: u16, height: u16);
    fn update(&mut self, dt: f32);
    fn render(&self, surface: &mut Surface);
    fn resize(&mut self, width: u16, height: u16);
    fn handle_key_down(&mut self, action: Action);
    fn handle_key_up(&mut self, action: Action);
    fn destroy(&mut self);

    /// Current HUD values.
    fn hud(&self) -> HudSnapshot;

    /// Snapshots queued since the last call, oldest first.
    fn drain_hud(&mut self) -> Vec<HudSnapshot>;

    /// On-screen touch controls use the same flags as the keyboard.
    fn handle_touch_action(&mut self, action: Action, pressed: bool) {
        if pressed {
            self.handle_key_down(action);
        } else {
            self.handle_key_up(action);
        }
    }
}
