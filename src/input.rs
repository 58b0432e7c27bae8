use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{KeyEvent, KeyEventKind};

use crate::games::registry::GameInfo;
use crate::games::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Down(Action),
    Up(Action),
}

/// Turns terminal key events into press/release transitions for one game.
///
/// Terminals without the keyboard enhancement protocol only report presses
/// (plus auto-repeat presses while a key is held). Until a real release event
/// shows up, a held action is released once no press has refreshed it for
/// `release_after`.
#[derive(Debug)]
pub struct InputMapper {
    release_after: Duration,
    held: HashMap<Action, Instant>,
    reports_release: bool,
}

impl InputMapper {
    pub fn new(release_after: Duration) -> Self {
        Self { release_after, held: HashMap::new(), reports_release: false }
    }

    pub fn on_key(&mut self, info: &GameInfo, key: KeyEvent, now: Instant) -> Option<Transition> {
        let action = info.action_for(key.code)?;
        match key.kind {
            KeyEventKind::Press | KeyEventKind::Repeat => {
                let fresh = self.held.insert(action, now).is_none();
                fresh.then_some(Transition::Down(action))
            }
            KeyEventKind::Release => {
                self.reports_release = true;
                self.held.remove(&action).map(|_| Transition::Up(action))
            }
        }
    }

    /// Synthesised releases for actions whose key went quiet.
    pub fn expire(&mut self, now: Instant) -> Vec<Transition> {
        if self.reports_release {
            return Vec::new();
        }
        let stale: Vec<Action> = self
            .held
            .iter()
            .filter(|(_, at)| now.saturating_duration_since(**at) >= self.release_after)
            .map(|(action, _)| *action)
            .collect();
        for action in &stale {
            self.held.remove(action);
        }
        stale.into_iter().map(Transition::Up).collect()
    }

    /// Release everything, e.g. when pausing or leaving a game.
    pub fn release_all(&mut self) -> Vec<Transition> {
        self.held.drain().map(|(action, _)| Transition::Up(action)).collect()
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyEventState, KeyModifiers};

    use super::*;
    use crate::games::registry;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent { code, modifiers: KeyModifiers::NONE, kind, state: KeyEventState::NONE }
    }

    fn invaders() -> &'static GameInfo {
        registry::find("invaders").unwrap()
    }

    #[test]
    fn repeat_presses_are_one_hold() {
        let mut input = InputMapper::new(Duration::from_millis(150));
        let t0 = Instant::now();
        let info = invaders();
        assert_eq!(
            input.on_key(info, key(KeyCode::Char(' '), KeyEventKind::Press), t0),
            Some(Transition::Down(Action::Fire))
        );
        assert_eq!(input.on_key(info, key(KeyCode::Char(' '), KeyEventKind::Press), t0), None);
        assert_eq!(input.on_key(info, key(KeyCode::Char('x'), KeyEventKind::Press), t0), None);
    }

    #[test]
    fn quiet_keys_release_after_timeout() {
        let mut input = InputMapper::new(Duration::from_millis(150));
        let t0 = Instant::now();
        let info = invaders();
        input.on_key(info, key(KeyCode::Left, KeyEventKind::Press), t0);
        assert!(input.expire(t0 + Duration::from_millis(100)).is_empty());
        input.on_key(info, key(KeyCode::Left, KeyEventKind::Press), t0 + Duration::from_millis(100));
        assert!(input.expire(t0 + Duration::from_millis(200)).is_empty());
        assert_eq!(input.expire(t0 + Duration::from_millis(260)), vec![Transition::Up(Action::Left)]);
        assert!(input.expire(t0 + Duration::from_millis(400)).is_empty());
    }

    #[test]
    fn real_release_disables_synthesis() {
        let mut input = InputMapper::new(Duration::from_millis(150));
        let t0 = Instant::now();
        let info = invaders();
        input.on_key(info, key(KeyCode::Right, KeyEventKind::Press), t0);
        assert_eq!(
            input.on_key(info, key(KeyCode::Right, KeyEventKind::Release), t0),
            Some(Transition::Up(Action::Right))
        );
        input.on_key(info, key(KeyCode::Right, KeyEventKind::Press), t0);
        assert!(input.expire(t0 + Duration::from_secs(5)).is_empty());
        assert_eq!(input.release_all(), vec![Transition::Up(Action::Right)]);
    }

    #[test]
    fn keymap_is_per_game() {
        let mut input = InputMapper::new(Duration::from_millis(150));
        let now = Instant::now();
        let asteroids = registry::find("asteroids").unwrap();
        let stacker = registry::find("stacker").unwrap();
        assert_eq!(
            input.on_key(asteroids, key(KeyCode::Up, KeyEventKind::Press), now),
            Some(Transition::Down(Action::Thrust))
        );
        assert_eq!(
            input.on_key(stacker, key(KeyCode::Up, KeyEventKind::Press), now),
            Some(Transition::Down(Action::Rotate))
        );
    }
}
