use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use ratatui::prelude::*;

use super::hud::{HudOutbox, HudSnapshot};
use super::palette;
use super::physics::clamp_dt;
use super::surface::Surface;
use super::viewport::Viewport;
use super::{Action, Game};

const COLS: usize = 10;
const ROWS: usize = 20;
const CELL: f32 = 16.0;
const PREVIEW_COLS: usize = 6;
const GAME_W: f32 = (COLS + PREVIEW_COLS) as f32 * CELL;
const GAME_H: f32 = ROWS as f32 * CELL;

const LINE_SCORES: [u32; 5] = [0, 100, 300, 500, 800];
const LINES_PER_LEVEL: u32 = 10;
const SOFT_DROP_INTERVAL: f32 = 0.05;
const DAS_INITIAL_DELAY: f32 = 0.170;
const DAS_REPEAT_RATE: f32 = 0.050;
const LINE_CLEAR_FLASH: f32 = 0.200;

/// Seconds per row by level, the last entry repeating.
const GRAVITY: [f32; 15] = [
    1.0, 0.8, 0.65, 0.5, 0.4, 0.32, 0.25, 0.19, 0.14, 0.1, 0.08, 0.07, 0.06, 0.055, 0.05,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Kind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

type Shape = [(i32, i32); 4];

impl Kind {
    const ALL: [Kind; 7] = [Kind::I, Kind::O, Kind::T, Kind::S, Kind::Z, Kind::J, Kind::L];

    fn shape(self, rot: usize) -> Shape {
        let rotations: [Shape; 4] = match self {
            Kind::I => [
                [(0, 1), (1, 1), (2, 1), (3, 1)],
                [(2, 0), (2, 1), (2, 2), (2, 3)],
                [(0, 2), (1, 2), (2, 2), (3, 2)],
                [(1, 0), (1, 1), (1, 2), (1, 3)],
            ],
            Kind::O => [[(0, 0), (1, 0), (0, 1), (1, 1)]; 4],
            Kind::T => [
                [(1, 0), (0, 1), (1, 1), (2, 1)],
                [(1, 0), (1, 1), (2, 1), (1, 2)],
                [(0, 1), (1, 1), (2, 1), (1, 2)],
                [(1, 0), (0, 1), (1, 1), (1, 2)],
            ],
            Kind::S => [
                [(1, 0), (2, 0), (0, 1), (1, 1)],
                [(1, 0), (1, 1), (2, 1), (2, 2)],
                [(1, 1), (2, 1), (0, 2), (1, 2)],
                [(0, 0), (0, 1), (1, 1), (1, 2)],
            ],
            Kind::Z => [
                [(0, 0), (1, 0), (1, 1), (2, 1)],
                [(2, 0), (1, 1), (2, 1), (1, 2)],
                [(0, 1), (1, 1), (1, 2), (2, 2)],
                [(1, 0), (0, 1), (1, 1), (0, 2)],
            ],
            Kind::J => [
                [(0, 0), (0, 1), (1, 1), (2, 1)],
                [(1, 0), (2, 0), (1, 1), (1, 2)],
                [(0, 1), (1, 1), (2, 1), (2, 2)],
                [(1, 0), (1, 1), (0, 2), (1, 2)],
            ],
            Kind::L => [
                [(2, 0), (0, 1), (1, 1), (2, 1)],
                [(1, 0), (1, 1), (1, 2), (2, 2)],
                [(0, 1), (1, 1), (2, 1), (0, 2)],
                [(0, 0), (1, 0), (1, 1), (1, 2)],
            ],
        };
        rotations[rot % 4]
    }

    fn color(self) -> Color {
        match self {
            Kind::I | Kind::S => palette::CYAN,
            Kind::O | Kind::Z => palette::ORANGE,
            Kind::T | Kind::J => palette::VIOLET,
            Kind::L => palette::WHITE,
        }
    }
}

/// Wall-kick candidates for a rotation between `from` and `to`, in SRS
/// convention (positive y is up).
fn kicks(kind: Kind, from: usize, to: usize) -> Option<[(i32, i32); 5]> {
    let jlstz = match (from, to) {
        (0, 1) | (2, 1) => [(0, 0), (-1, 0), (-1, -1), (0, 2), (-1, 2)],
        (1, 0) | (1, 2) => [(0, 0), (1, 0), (1, 1), (0, -2), (1, -2)],
        (2, 3) | (0, 3) => [(0, 0), (1, 0), (1, -1), (0, 2), (1, 2)],
        (3, 2) | (3, 0) => [(0, 0), (-1, 0), (-1, 1), (0, -2), (-1, -2)],
        _ => return None,
    };
    let i = match (from, to) {
        (0, 1) | (3, 2) => [(0, 0), (-2, 0), (1, 0), (-2, 1), (1, -2)],
        (1, 0) | (2, 3) => [(0, 0), (2, 0), (-1, 0), (2, -1), (-1, 2)],
        (1, 2) | (0, 3) => [(0, 0), (-1, 0), (2, 0), (-1, -2), (2, 1)],
        (2, 1) | (3, 0) => [(0, 0), (1, 0), (-2, 0), (1, 2), (-2, -1)],
        _ => return None,
    };
    match kind {
        Kind::O => None,
        Kind::I => Some(i),
        _ => Some(jlstz),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Piece {
    kind: Kind,
    rot: usize,
    x: i32,
    y: i32,
}

impl Piece {
    fn spawn(kind: Kind) -> Self {
        let shape = kind.shape(0);
        let min_x = shape.iter().map(|c| c.0).min().unwrap_or(0);
        let max_x = shape.iter().map(|c| c.0).max().unwrap_or(0);
        let min_y = shape.iter().map(|c| c.1).min().unwrap_or(0);
        let width = max_x - min_x + 1;
        Self { kind, rot: 0, x: (COLS as i32 - width) / 2 - min_x, y: -min_y }
    }

    fn cells(&self) -> impl Iterator<Item = (i32, i32)> {
        let (x, y) = (self.x, self.y);
        self.kind.shape(self.rot).into_iter().map(move |(cx, cy)| (cx + x, cy + y))
    }

    fn shifted(self, dx: i32, dy: i32) -> Self {
        Self { x: self.x + dx, y: self.y + dy, ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DasPhase {
    Idle,
    Initial,
    Repeat,
}

type Board = Vec<[Option<Kind>; COLS]>;

pub struct Stacker {
    rng: StdRng,
    viewport: Viewport,
    hud: HudOutbox,
    score: u32,
    level: u32,
    lines_cleared: u32,
    game_over: bool,
    board: Board,
    bag: Vec<Kind>,
    current: Piece,
    next: Kind,
    drop_timer: f32,
    soft_drop: bool,
    held_left: bool,
    held_right: bool,
    rotate_held: bool,
    drop_held: bool,
    das_dir: i32,
    das_phase: DasPhase,
    das_timer: f32,
    /// Full rows waiting out the flash, with time remaining.
    clearing: Option<(Vec<usize>, f32)>,
}

impl Stacker {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng,
            viewport: Viewport::new(GAME_W, GAME_H),
            hud: HudOutbox::new(),
            score: 0,
            level: 1,
            lines_cleared: 0,
            game_over: false,
            board: vec![[None; COLS]; ROWS],
            bag: Vec::new(),
            current: Piece::spawn(Kind::T),
            next: Kind::T,
            drop_timer: 0.0,
            soft_drop: false,
            held_left: false,
            held_right: false,
            rotate_held: false,
            drop_held: false,
            das_dir: 0,
            das_phase: DasPhase::Idle,
            das_timer: 0.0,
            clearing: None,
        }
    }

    fn emit_hud(&mut self) {
        let snap = self.hud();
        self.hud.push(snap);
    }

    fn pull_from_bag(&mut self) -> Kind {
        if self.bag.is_empty() {
            self.bag = Kind::ALL.to_vec();
            self.bag.shuffle(&mut self.rng);
        }
        self.bag.pop().unwrap_or(Kind::T)
    }

    fn fits(&self, piece: &Piece) -> bool {
        piece.cells().all(|(x, y)| {
            if x < 0 || x >= COLS as i32 || y >= ROWS as i32 {
                return false;
            }
            y < 0 || self.board[y as usize][x as usize].is_none()
        })
    }

    fn spawn_piece(&mut self) {
        let kind = self.next;
        self.next = self.pull_from_bag();
        self.current = Piece::spawn(kind);
        self.drop_timer = 0.0;
        if !self.fits(&self.current) {
            self.game_over = true;
            tracing::debug!(score = self.score, lines = self.lines_cleared, "stacker: game over");
            self.emit_hud();
        }
    }

    fn gravity(&self) -> f32 {
        let idx = (self.level as usize).saturating_sub(1).min(GRAVITY.len() - 1);
        GRAVITY[idx]
    }

    fn ghost(&self) -> Piece {
        let mut ghost = self.current;
        while self.fits(&ghost.shifted(0, 1)) {
            ghost = ghost.shifted(0, 1);
        }
        ghost
    }

    fn lock_piece(&mut self) {
        let kind = self.current.kind;
        for (x, y) in self.current.cells() {
            if (0..ROWS as i32).contains(&y) && (0..COLS as i32).contains(&x) {
                self.board[y as usize][x as usize] = Some(kind);
            }
        }
        let full: Vec<usize> = (0..ROWS).filter(|&r| self.board[r].iter().all(Option::is_some)).collect();
        if full.is_empty() {
            self.spawn_piece();
        } else {
            self.clearing = Some((full, LINE_CLEAR_FLASH));
        }
    }

    fn clear_lines(&mut self, rows: &[usize]) {
        let count = rows.len();
        self.board = std::mem::take(&mut self.board)
            .into_iter()
            .enumerate()
            .filter(|(r, _)| !rows.contains(r))
            .map(|(_, row)| row)
            .collect();
        for _ in 0..count {
            self.board.insert(0, [None; COLS]);
        }

        self.score += LINE_SCORES[count.min(LINE_SCORES.len() - 1)] * self.level;
        self.lines_cleared += count as u32;
        let level = self.lines_cleared / LINES_PER_LEVEL + 1;
        if level > self.level {
            self.level = level;
            tracing::debug!(level, "stacker: level up");
        }
        self.emit_hud();
        self.spawn_piece();
    }

    fn rotate(&mut self, dir: i32) {
        if self.game_over || self.clearing.is_some() {
            return;
        }
        let from = self.current.rot;
        let to = (from as i32 + dir).rem_euclid(4) as usize;
        let Some(candidates) = kicks(self.current.kind, from, to) else {
            return;
        };
        let turned = Piece { rot: to, ..self.current };
        if let Some(kicked) = candidates
            .iter()
            .map(|&(kx, ky)| turned.shifted(kx, -ky))
            .find(|p| self.fits(p))
        {
            self.current = kicked;
        }
    }

    fn shift(&mut self, dir: i32) {
        if self.game_over || self.clearing.is_some() {
            return;
        }
        let moved = self.current.shifted(dir, 0);
        if self.fits(&moved) {
            self.current = moved;
        }
    }

    fn hard_drop(&mut self) {
        if self.game_over || self.clearing.is_some() {
            return;
        }
        let ghost = self.ghost();
        self.score += (ghost.y - self.current.y) as u32 * 2;
        self.current = ghost;
        self.lock_piece();
        self.emit_hud();
    }

    fn press_horizontal(&mut self, dir: i32) {
        self.shift(dir);
        self.das_dir = dir;
        self.das_phase = DasPhase::Initial;
        self.das_timer = 0.0;
    }

    fn release_horizontal(&mut self, dir: i32) {
        if self.das_dir == dir {
            self.das_dir = 0;
            self.das_phase = DasPhase::Idle;
            self.das_timer = 0.0;
        }
    }

    fn update_das(&mut self, dt: f32) {
        let dir = match (self.held_left, self.held_right) {
            (true, false) => -1,
            (false, true) => 1,
            _ => 0,
        };
        if dir == 0 {
            self.das_dir = 0;
            self.das_phase = DasPhase::Idle;
            self.das_timer = 0.0;
            return;
        }
        if dir != self.das_dir {
            self.das_dir = dir;
            self.das_phase = DasPhase::Initial;
            self.das_timer = 0.0;
            return;
        }

        self.das_timer += dt;
        if self.das_phase == DasPhase::Initial && self.das_timer >= DAS_INITIAL_DELAY {
            self.das_timer -= DAS_INITIAL_DELAY;
            self.das_phase = DasPhase::Repeat;
            self.shift(dir);
        }
        if self.das_phase == DasPhase::Repeat {
            while self.das_timer >= DAS_REPEAT_RATE {
                self.das_timer -= DAS_REPEAT_RATE;
                self.shift(dir);
            }
        }
    }

    fn render_cell(&self, surface: &mut Surface, col: f32, row: f32, ch: char, color: Color) {
        let style = Style::default().fg(color);
        surface.rect(&self.viewport, col * CELL, row * CELL, CELL, CELL, ch, style);
    }
}

impl Default for Stacker {
    fn default() -> Self {
        Self::new()
    }
}

impl Game for Stacker {
    fn init(&mut self, width: u16, height: u16) {
        self.viewport.fit(width, height);
        self.score = 0;
        self.level = 1;
        self.lines_cleared = 0;
        self.game_over = false;
        self.board = vec![[None; COLS]; ROWS];
        self.bag.clear();
        self.soft_drop = false;
        self.held_left = false;
        self.held_right = false;
        self.rotate_held = false;
        self.drop_held = false;
        self.das_dir = 0;
        self.das_phase = DasPhase::Idle;
        self.das_timer = 0.0;
        self.clearing = None;
        self.next = self.pull_from_bag();
        self.spawn_piece();
        self.hud.force(self.hud());
    }

    fn update(&mut self, dt: f32) {
        if self.game_over {
            return;
        }
        let dt = clamp_dt(dt);

        if let Some((rows, t)) = self.clearing.take() {
            let t = t - dt;
            if t <= 0.0 {
                self.clear_lines(&rows);
            } else {
                self.clearing = Some((rows, t));
            }
            return;
        }

        self.update_das(dt);

        let interval = if self.soft_drop { self.gravity().min(SOFT_DROP_INTERVAL) } else { self.gravity() };
        self.drop_timer += dt;
        if self.drop_timer >= interval {
            self.drop_timer = 0.0;
            let lowered = self.current.shifted(0, 1);
            if self.fits(&lowered) {
                self.current = lowered;
                if self.soft_drop {
                    self.score += 1;
                    self.emit_hud();
                }
            } else {
                self.lock_piece();
                self.emit_hud();
            }
        }
    }

    fn render(&self, surface: &mut Surface) {
        let vp = &self.viewport;
        surface.play_field(vp, palette::BG);
        surface.rect(vp, 0.0, 0.0, COLS as f32 * CELL, GAME_H, ' ', Style::default().bg(palette::LETTERBOX));

        let flashing: &[usize] = match &self.clearing {
            Some((rows, _)) => rows,
            None => &[],
        };
        for (r, row) in self.board.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if let Some(kind) = cell {
                    let color = if flashing.contains(&r) { palette::WHITE } else { kind.color() };
                    self.render_cell(surface, c as f32, r as f32, '▓', color);
                }
            }
        }

        if !self.game_over && self.clearing.is_none() {
            for (x, y) in self.ghost().cells().filter(|&(_, y)| y >= 0) {
                self.render_cell(surface, x as f32, y as f32, '░', palette::DIM);
            }
            let color = self.current.kind.color();
            for (x, y) in self.current.cells().filter(|&(_, y)| y >= 0) {
                self.render_cell(surface, x as f32, y as f32, '█', color);
            }
        }

        let preview_x = (COLS + 1) as f32;
        let (label_x, label_y) = vp.to_cell(preview_x * CELL, CELL);
        surface.text(label_x, label_y, "NEXT", Style::default().fg(palette::MUTED));
        for (cx, cy) in self.next.shape(0) {
            self.render_cell(surface, preview_x + cx as f32, 2.0 + cy as f32, '█', self.next.color());
        }
        let (lines_x, lines_y) = vp.to_cell(preview_x * CELL, 6.0 * CELL);
        let lines = format!("LINES {}", self.lines_cleared);
        surface.text(lines_x, lines_y, &lines, Style::default().fg(palette::MUTED));
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.viewport.fit(width, height);
    }

    fn handle_key_down(&mut self, action: Action) {
        if self.game_over {
            return;
        }
        match action {
            Action::Left if !self.held_left => {
                self.held_left = true;
                self.press_horizontal(-1);
            }
            Action::Right if !self.held_right => {
                self.held_right = true;
                self.press_horizontal(1);
            }
            Action::Down => self.soft_drop = true,
            Action::Up | Action::Rotate if !self.rotate_held => {
                self.rotate_held = true;
                self.rotate(1);
            }
            Action::Drop if !self.drop_held => {
                self.drop_held = true;
                self.hard_drop();
            }
            _ => {}
        }
    }

    fn handle_key_up(&mut self, action: Action) {
        match action {
            Action::Left => {
                self.held_left = false;
                self.release_horizontal(-1);
            }
            Action::Right => {
                self.held_right = false;
                self.release_horizontal(1);
            }
            Action::Down => self.soft_drop = false,
            Action::Up | Action::Rotate => self.rotate_held = false,
            Action::Drop => self.drop_held = false,
            _ => {}
        }
    }

    fn destroy(&mut self) {
        self.board.clear();
        self.bag.clear();
        self.clearing = None;
        self.hud.clear();
    }

    fn hud(&self) -> HudSnapshot {
        HudSnapshot {
            score: self.score,
            lives: None,
            level: self.level,
            game_over: self.game_over,
        }
    }

    fn drain_hud(&mut self) -> Vec<HudSnapshot> {
        self.hud.drain()
    }
}
