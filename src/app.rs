use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::config::ArcadeConfig;
use crate::driver::{self, FrameClock};
use crate::games::hud::HudSnapshot;
use crate::games::registry::{self, GameInfo};
use crate::games::surface::Surface;
use crate::games::Game;
use crate::input::{InputMapper, Transition};

/// Picker tiles per row.
pub const PICKER_COLUMNS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Picker,
    Playing,
}

/// The one running game and the registry entry it came from.
pub struct Session {
    pub index: usize,
    pub info: &'static GameInfo,
    game: Box<dyn Game>,
}

pub struct App {
    pub should_quit: bool,
    pub selected: usize,
    pub session: Option<Session>,
    pub hud: HudSnapshot,
    pub paused: bool,
    pub surface: Surface,
    seed: Option<u64>,
    input: InputMapper,
    clock: FrameClock,
}

impl App {
    pub fn new(config: &ArcadeConfig) -> Self {
        Self {
            should_quit: false,
            selected: 0,
            session: None,
            hud: HudSnapshot::default(),
            paused: false,
            surface: Surface::new(80, 24),
            seed: config.seed,
            input: InputMapper::new(Duration::from_millis(config.key_release_ms)),
            clock: FrameClock::new(),
        }
    }

    pub fn screen(&self) -> Screen {
        if self.session.is_some() {
            Screen::Playing
        } else {
            Screen::Picker
        }
    }

    /// Start the game at `index`, tearing down whatever was running.
    pub fn launch(&mut self, index: usize) {
        let Some(info) = registry::all().get(index) else {
            return;
        };
        self.end_session();

        let mut game = info.create(self.seed);
        game.init(self.surface.width(), self.surface.height());
        self.hud = game.drain_hud().last().copied().unwrap_or_else(|| game.hud());
        game.render(&mut self.surface);

        self.selected = index;
        self.paused = false;
        self.clock.reset();
        self.session = Some(Session { index, info, game });
        tracing::info!(game = info.id, seed = ?self.seed, "launched game");
    }

    fn end_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            self.input.release_all();
            session.game.destroy();
            tracing::info!(game = session.info.id, score = self.hud.score, "left game");
        }
        self.hud = HudSnapshot::default();
    }

    fn restart(&mut self) {
        if let Some(index) = self.session.as_ref().map(|s| s.index) {
            self.launch(index);
        }
    }

    fn back_to_picker(&mut self) {
        self.end_session();
        self.paused = false;
    }

    pub fn on_tick(&mut self, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if self.paused {
            self.clock.reset();
            return;
        }
        for transition in self.input.expire(now) {
            apply(session.game.as_mut(), transition);
        }
        let dt = self.clock.tick(now);
        if let Some(last) = driver::run_frame(session.game.as_mut(), dt, &mut self.surface).last() {
            if last.game_over && !self.hud.game_over {
                tracing::info!(game = session.info.id, score = last.score, "game over");
            }
            self.hud = *last;
        }
    }

    /// Match the game surface to the area the UI gives it.
    pub fn resize_play_area(&mut self, width: u16, height: u16) {
        if width == self.surface.width() && height == self.surface.height() {
            return;
        }
        self.surface.resize(width, height);
        if let Some(session) = self.session.as_mut() {
            session.game.resize(width, height);
            session.game.render(&mut self.surface);
        }
    }

    pub fn on_key(&mut self, key: KeyEvent, now: Instant) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        let pressed = key.kind != KeyEventKind::Release;
        match self.screen() {
            Screen::Picker => {
                if pressed {
                    self.picker_key(key.code);
                }
            }
            Screen::Playing => {
                if pressed && self.session_key(key.code) {
                    return;
                }
                if self.paused {
                    return;
                }
                if let Some(session) = self.session.as_mut() {
                    if let Some(transition) = self.input.on_key(session.info, key, now) {
                        apply(session.game.as_mut(), transition);
                    }
                }
            }
        }
    }

    fn picker_key(&mut self, code: KeyCode) {
        let count = registry::all().len();
        match code {
            KeyCode::Char('q') | KeyCode::Char('Q') => self.should_quit = true,
            KeyCode::Right | KeyCode::Tab => self.selected = (self.selected + 1) % count,
            KeyCode::Left | KeyCode::BackTab => self.selected = (self.selected + count - 1) % count,
            KeyCode::Down => self.selected = (self.selected + PICKER_COLUMNS) % count,
            KeyCode::Up => self.selected = (self.selected + count - PICKER_COLUMNS % count) % count,
            KeyCode::Enter => self.launch(self.selected),
            KeyCode::Char(c) => {
                if let Some(index) = registry::index_for_hotkey(c) {
                    self.launch(index);
                }
            }
            _ => {}
        }
    }

    /// Host keys while a game runs. Returns true when the key was consumed.
    fn session_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Esc => {
                self.back_to_picker();
                true
            }
            KeyCode::Enter | KeyCode::Char('r') | KeyCode::Char('R') if self.hud.game_over => {
                self.restart();
                true
            }
            KeyCode::Char('p') | KeyCode::Char('P') if !self.hud.game_over => {
                self.paused = !self.paused;
                if self.paused {
                    if let Some(session) = self.session.as_mut() {
                        for transition in self.input.release_all() {
                            apply(session.game.as_mut(), transition);
                        }
                    }
                }
                true
            }
            _ => false,
        }
    }
}

fn apply(game: &mut dyn Game, transition: Transition) {
    match transition {
        Transition::Down(action) => game.handle_key_down(action),
        Transition::Up(action) => game.handle_key_up(action),
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.end_session();
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyEventState;

    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent { code, modifiers: KeyModifiers::NONE, kind: KeyEventKind::Press, state: KeyEventState::NONE }
    }

    fn seeded_app() -> App {
        App::new(&ArcadeConfig { seed: Some(3), ..ArcadeConfig::default() })
    }

    #[test]
    fn hotkey_launches_and_esc_returns() {
        let mut app = seeded_app();
        let now = Instant::now();
        app.on_key(press(KeyCode::Char('3')), now);
        assert_eq!(app.screen(), Screen::Playing);
        assert_eq!(app.session.as_ref().map(|s| s.info.id), Some("stacker"));
        assert_eq!(app.hud.lives, None);
        assert_eq!(app.hud.level, 1);

        app.on_key(press(KeyCode::Esc), now);
        assert_eq!(app.screen(), Screen::Picker);
        assert_eq!(app.selected, 2);
        assert_eq!(app.hud, HudSnapshot::default());
    }

    #[test]
    fn picker_navigation_wraps() {
        let mut app = seeded_app();
        let now = Instant::now();
        app.on_key(press(KeyCode::Left), now);
        assert_eq!(app.selected, 9);
        app.on_key(press(KeyCode::Right), now);
        assert_eq!(app.selected, 0);
        app.on_key(press(KeyCode::Down), now);
        assert_eq!(app.selected, 5);
        app.on_key(press(KeyCode::Down), now);
        assert_eq!(app.selected, 0);
        app.on_key(press(KeyCode::Up), now);
        assert_eq!(app.selected, 5);
        app.on_key(press(KeyCode::Enter), now);
        assert_eq!(app.session.as_ref().map(|s| s.info.id), Some("frogger"));
    }

    #[test]
    fn q_only_quits_from_picker() {
        let mut app = seeded_app();
        let now = Instant::now();
        app.launch(0);
        app.on_key(press(KeyCode::Char('q')), now);
        assert!(!app.should_quit);
        app.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), now);
        assert!(app.should_quit);

        let mut app = seeded_app();
        app.on_key(press(KeyCode::Char('q')), now);
        assert!(app.should_quit);
    }

    #[test]
    fn pause_freezes_the_game() {
        let mut app = seeded_app();
        let t0 = Instant::now();
        app.launch(registry::index_of("snake").unwrap());
        app.on_key(press(KeyCode::Char('p')), t0);
        assert!(app.paused);
        for i in 0..200 {
            app.on_tick(t0 + Duration::from_millis(50 * i));
        }
        assert!(!app.hud.game_over);
        app.on_key(press(KeyCode::Char('p')), t0);
        assert!(!app.paused);
    }

    #[test]
    fn game_over_then_play_again() {
        let mut app = seeded_app();
        let t0 = Instant::now();
        app.launch(registry::index_of("snake").unwrap());
        for i in 0..200 {
            app.on_tick(t0 + Duration::from_millis(50 * i));
        }
        assert!(app.hud.game_over);
        assert_eq!(app.hud.lives, Some(0));

        app.on_key(press(KeyCode::Char('r')), t0);
        assert_eq!(app.screen(), Screen::Playing);
        assert!(!app.hud.game_over);
        assert_eq!(app.hud.score, 0);
        assert_eq!(app.hud.lives, Some(1));
    }

    #[test]
    fn resize_reaches_the_surface() {
        let mut app = seeded_app();
        app.launch(0);
        app.resize_play_area(120, 40);
        assert_eq!((app.surface.width(), app.surface.height()), (120, 40));
    }
}
