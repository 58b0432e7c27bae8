use crossterm::event::KeyCode;
use ratatui::style::Color;

use super::asteroids::Asteroids;
use super::breakout::Breakout;
use super::centipede::Centipede;
use super::frogger::Frogger;
use super::invaders::Invaders;
use super::maze_chase::MazeChase;
use super::palette;
use super::pong::Pong;
use super::rhythm::Rhythm;
use super::snake::Snake;
use super::stacker::Stacker;
use super::{Action, Game};

pub type Factory = fn() -> Box<dyn Game>;
pub type SeededFactory = fn(u64) -> Box<dyn Game>;

/// Static description of one cabinet in the picker.
pub struct GameInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
    pub accent: Color,
    /// Actions the game responds to, in the order the help panel lists them.
    pub controls: &'static [Action],
    pub keymap: &'static [(KeyCode, Action)],
    pub factory: Factory,
    pub seeded: SeededFactory,
}

impl GameInfo {
    pub fn action_for(&self, code: KeyCode) -> Option<Action> {
        self.keymap.iter().find(|(k, _)| *k == code).map(|(_, a)| *a)
    }

    /// Keys bound to `action`, for the controls panel.
    pub fn keys_for(&self, action: Action) -> Vec<KeyCode> {
        self.keymap.iter().filter(|(_, a)| *a == action).map(|(k, _)| *k).collect()
    }

    pub fn create(&self, seed: Option<u64>) -> Box<dyn Game> {
        match seed {
            Some(seed) => (self.seeded)(seed),
            None => (self.factory)(),
        }
    }
}

fn build<G: Game + Default + 'static>() -> Box<dyn Game> {
    Box::new(G::default())
}

/// For games with no randomness the seed has nothing to drive.
fn build_unseeded<G: Game + Default + 'static>(_seed: u64) -> Box<dyn Game> {
    Box::new(G::default())
}

macro_rules! seeded {
    ($game:ty) => {{
        fn with_seed(seed: u64) -> Box<dyn Game> {
            Box::new(<$game>::with_seed(seed))
        }
        with_seed as SeededFactory
    }};
}

const ARROWS: [(KeyCode, Action); 4] = [
    (KeyCode::Left, Action::Left),
    (KeyCode::Right, Action::Right),
    (KeyCode::Up, Action::Up),
    (KeyCode::Down, Action::Down),
];

static GAMES: [GameInfo; 10] = [
    GameInfo {
        id: "invaders",
        name: "Space Invaders",
        icon: "👾",
        description: "Defend Earth from waves of alien invaders",
        accent: palette::CYAN,
        controls: &[Action::Left, Action::Right, Action::Fire],
        keymap: &[
            (KeyCode::Left, Action::Left),
            (KeyCode::Right, Action::Right),
            (KeyCode::Char(' '), Action::Fire),
        ],
        factory: build::<Invaders>,
        seeded: seeded!(Invaders),
    },
    GameInfo {
        id: "asteroids",
        name: "Asteroids",
        icon: "☄",
        description: "Navigate and blast through an asteroid field",
        accent: palette::VIOLET,
        controls: &[Action::Left, Action::Right, Action::Thrust, Action::Fire],
        keymap: &[
            (KeyCode::Left, Action::Left),
            (KeyCode::Right, Action::Right),
            (KeyCode::Up, Action::Thrust),
            (KeyCode::Char(' '), Action::Fire),
        ],
        factory: build::<Asteroids>,
        seeded: seeded!(Asteroids),
    },
    GameInfo {
        id: "stacker",
        name: "Stacker",
        icon: "🧩",
        description: "Stack and clear lines before they reach the top",
        accent: palette::ORANGE,
        controls: &[Action::Left, Action::Right, Action::Down, Action::Rotate, Action::Drop],
        keymap: &[
            (KeyCode::Left, Action::Left),
            (KeyCode::Right, Action::Right),
            (KeyCode::Down, Action::Down),
            (KeyCode::Up, Action::Rotate),
            (KeyCode::Char(' '), Action::Drop),
        ],
        factory: build::<Stacker>,
        seeded: seeded!(Stacker),
    },
    GameInfo {
        id: "maze-chase",
        name: "Maze Chase",
        icon: "ᗧ",
        description: "Clear the maze while four pursuers hunt you down",
        accent: palette::ORANGE,
        controls: &[Action::Left, Action::Right, Action::Up, Action::Down],
        keymap: &ARROWS,
        factory: build::<MazeChase>,
        seeded: seeded!(MazeChase),
    },
    GameInfo {
        id: "breakout",
        name: "Breakout",
        icon: "🧱",
        description: "Smash every brick with the ball",
        accent: palette::CYAN,
        controls: &[Action::Left, Action::Right, Action::Fire],
        keymap: &[
            (KeyCode::Left, Action::Left),
            (KeyCode::Right, Action::Right),
            (KeyCode::Char(' '), Action::Fire),
        ],
        factory: build::<Breakout>,
        seeded: build_unseeded::<Breakout>,
    },
    GameInfo {
        id: "frogger",
        name: "Frogger",
        icon: "🐸",
        description: "Hop across the road and river to reach home",
        accent: palette::GREEN,
        controls: &[Action::Left, Action::Right, Action::Up, Action::Down],
        keymap: &ARROWS,
        factory: build::<Frogger>,
        seeded: build_unseeded::<Frogger>,
    },
    GameInfo {
        id: "snake",
        name: "Snake",
        icon: "🐍",
        description: "Eat, grow and never bite your own tail",
        accent: palette::GREEN,
        controls: &[Action::Left, Action::Right, Action::Up, Action::Down],
        keymap: &ARROWS,
        factory: build::<Snake>,
        seeded: seeded!(Snake),
    },
    GameInfo {
        id: "pong",
        name: "Pong",
        icon: "🏓",
        description: "Outplay the machine at paddle-ball",
        accent: palette::WHITE,
        controls: &[Action::Up, Action::Down],
        keymap: &[(KeyCode::Up, Action::Up), (KeyCode::Down, Action::Down)],
        factory: build::<Pong>,
        seeded: seeded!(Pong),
    },
    GameInfo {
        id: "rhythm",
        name: "Rhythm Catch",
        icon: "🎵",
        description: "Catch falling notes on the beat",
        accent: palette::VIOLET,
        controls: &[Action::Left, Action::Down, Action::Up, Action::Right],
        keymap: &ARROWS,
        factory: build::<Rhythm>,
        seeded: seeded!(Rhythm),
    },
    GameInfo {
        id: "centipede",
        name: "Centipede",
        icon: "🐛",
        description: "Shoot the centipede down through the mushroom field",
        accent: palette::ORANGE,
        controls: &[Action::Left, Action::Right, Action::Up, Action::Down, Action::Fire],
        keymap: &[
            (KeyCode::Left, Action::Left),
            (KeyCode::Right, Action::Right),
            (KeyCode::Up, Action::Up),
            (KeyCode::Down, Action::Down),
            (KeyCode::Char(' '), Action::Fire),
        ],
        factory: build::<Centipede>,
        seeded: seeded!(Centipede),
    },
];

pub fn all() -> &'static [GameInfo] {
    &GAMES
}

pub fn find(id: &str) -> Option<&'static GameInfo> {
    GAMES.iter().find(|g| g.id == id)
}

pub fn index_of(id: &str) -> Option<usize> {
    GAMES.iter().position(|g| g.id == id)
}

/// Number key that launches the game at `index` from the picker.
pub fn hotkey(index: usize) -> Option<char> {
    match index {
        0..=8 => char::from_digit(index as u32 + 1, 10),
        9 => Some('0'),
        _ => None,
    }
}

pub fn index_for_hotkey(c: char) -> Option<usize> {
    let index = match c {
        '0' => 9,
        '1'..='9' => c.to_digit(10)? as usize - 1,
        _ => return None,
    };
    (index < GAMES.len()).then_some(index)
}
