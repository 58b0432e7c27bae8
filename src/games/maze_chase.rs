use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use ratatui::prelude::*;

use super::hud::{HudOutbox, HudSnapshot};
use super::palette;
use super::physics::{clamp_dt, distance, manhattan};
use super::surface::Surface;
use super::viewport::Viewport;
use super::{Action, Game};

const COLS: i32 = 28;
const ROWS: i32 = 31;
const TILE: f32 = 16.0;
const GAME_W: f32 = COLS as f32 * TILE;
const GAME_H: f32 = ROWS as f32 * TILE;
const TUNNEL_ROW: i32 = 14;

// '#' wall, '.' dot, 'o' power item, ' ' empty, '_' pen, '=' gate
const MAZE: [&str; 31] = [
    "############################",
    "#............##............#",
    "#.####.#####.##.#####.####.#",
    "#o####.#####.##.#####.####o#",
    "#.####.#####.##.#####.####.#",
    "#..........................#",
    "#.####.##.########.##.####.#",
    "#.####.##.########.##.####.#",
    "#......##....##....##......#",
    "######.##### ## #####.######",
    "######.##### ## #####.######",
    "######.##          ##.######",
    "######.## ###==### ##.######",
    "######.   #______#   .######",
    "      .## #______# ##.      ",
    "######.## #______# ##.######",
    "######.## ######## ##.######",
    "######.##          ##.######",
    "######.## ######## ##.######",
    "#............##............#",
    "#.####.#####.##.#####.####.#",
    "#.####.#####.##.#####.####.#",
    "#o..##.......  .......##..o#",
    "###.##.##.########.##.##.###",
    "###.##.##.########.##.##.###",
    "#......##....##....##......#",
    "#.##########.##.##########.#",
    "#.##########.##.##########.#",
    "#..........................#",
    "############################",
    "############################",
];

const PROTAGONIST_SPEED: f32 = 8.0;
const PROTAGONIST_SPEED_STEP: f32 = 0.3;
const PURSUER_SPEED: f32 = 7.0;
const PURSUER_SPEED_STEP: f32 = 0.4;
const TUNNEL_SPEED: f32 = 4.0;
const PEN_SPEED: f32 = 3.0;
const EATEN_SPEED: f32 = 16.0;

const MODE_SCHEDULE: [f32; 8] = [7.0, 20.0, 7.0, 20.0, 5.0, 20.0, 5.0, f32::INFINITY];
const FRIGHT_TIME: f32 = 7.0;
const FRIGHT_FLASH_TIME: f32 = 2.0;
const PEN_RELEASE: [f32; 4] = [0.0, 3.0, 7.0, 12.0];

const PROTAGONIST_START: (i32, i32) = (14, 22);
const PURSUER_STARTS: [(i32, i32); 4] = [(14, 11), (14, 14), (12, 14), (16, 14)];
const SCATTER_TARGETS: [(i32, i32); 4] = [(25, 0), (2, 0), (27, 30), (0, 30)];
const PURSUER_COLORS: [Color; 4] = [palette::ORANGE, palette::VIOLET, palette::CYAN, palette::WHITE];
const PEN_EXIT: (i32, i32) = (14, 11);
const PEN_CENTER: (i32, i32) = (14, 14);

const STARTING_LIVES: u32 = 3;
const DOT_SCORE: u32 = 10;
const POWER_SCORE: u32 = 50;
const CATCH_BONUS: [u32; 4] = [200, 400, 800, 1600];
const DEATH_TIME: f32 = 1.0;
const LEVEL_TRANSITION: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tile {
    Wall,
    Dot,
    Power,
    Empty,
    Pen,
    Gate,
}

fn tile_at(col: i32, row: i32) -> Option<Tile> {
    if !(0..ROWS).contains(&row) {
        return None;
    }
    if !(0..COLS).contains(&col) {
        return (row == TUNNEL_ROW).then_some(Tile::Empty);
    }
    let tile = match MAZE[row as usize].as_bytes()[col as usize] {
        b'#' => Tile::Wall,
        b'.' => Tile::Dot,
        b'o' => Tile::Power,
        b'_' => Tile::Pen,
        b'=' => Tile::Gate,
        _ => Tile::Empty,
    };
    Some(tile)
}

fn protagonist_walkable(col: i32, row: i32) -> bool {
    matches!(tile_at(col, row), Some(Tile::Dot | Tile::Power | Tile::Empty))
}

fn pursuer_walkable(col: i32, row: i32, state: PursuerState) -> bool {
    match tile_at(col, row) {
        None | Some(Tile::Wall) => false,
        Some(Tile::Gate) => matches!(state, PursuerState::LeavingPen | PursuerState::Eaten),
        Some(_) => true,
    }
}

fn tile_center(col: i32, row: i32) -> (f32, f32) {
    (col as f32 * TILE + TILE / 2.0, row as f32 * TILE + TILE / 2.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dir {
    Up,
    Left,
    Down,
    Right,
}

impl Dir {
    /// Tie-break order for pursuer steering.
    const PRIORITY: [Dir; 4] = [Dir::Up, Dir::Left, Dir::Down, Dir::Right];

    fn delta(self) -> (i32, i32) {
        match self {
            Dir::Up => (0, -1),
            Dir::Left => (-1, 0),
            Dir::Down => (0, 1),
            Dir::Right => (1, 0),
        }
    }

    fn opposite(self) -> Dir {
        match self {
            Dir::Up => Dir::Down,
            Dir::Left => Dir::Right,
            Dir::Down => Dir::Up,
            Dir::Right => Dir::Left,
        }
    }
}

/// Something that walks the maze grid in virtual pixels.
#[derive(Debug, Clone, Copy)]
struct Walker {
    x: f32,
    y: f32,
    dir: Dir,
}

impl Walker {
    fn at_tile(col: i32, row: i32, dir: Dir) -> Self {
        let (x, y) = tile_center(col, row);
        Self { x, y, dir }
    }

    fn tile(&self) -> (i32, i32) {
        ((self.x / TILE).floor() as i32, (self.y / TILE).floor() as i32)
    }

    fn at_center(&self) -> bool {
        let (col, row) = self.tile();
        let (cx, cy) = tile_center(col, row);
        (self.x - cx).abs() < 1e-3 && (self.y - cy).abs() < 1e-3
    }

    fn wrap(&mut self) {
        if self.x < -TILE / 2.0 {
            self.x += GAME_W;
        } else if self.x > GAME_W + TILE / 2.0 {
            self.x -= GAME_W;
        }
    }

    /// Advance up to `budget` pixels. `decide` runs at every tile centre
    /// reached and returns the heading to leave on, or `None` to stop there.
    fn travel(&mut self, mut budget: f32, mut decide: impl FnMut(&Walker) -> Option<Dir>) {
        if self.at_center() {
            match decide(&*self) {
                Some(d) => self.dir = d,
                None => return,
            }
        }
        while budget > 0.0 {
            let (dx, dy) = self.dir.delta();
            let (col, row) = self.tile();
            let (cx, cy) = tile_center(col, row);
            let mut ahead = (cx - self.x) * dx as f32 + (cy - self.y) * dy as f32;
            if ahead <= 1e-3 {
                ahead += TILE;
            }
            if budget < ahead {
                self.x += dx as f32 * budget;
                self.y += dy as f32 * budget;
                break;
            }
            self.x += dx as f32 * ahead;
            self.y += dy as f32 * ahead;
            budget -= ahead;
            let (col, row) = self.tile();
            (self.x, self.y) = tile_center(col, row);
            self.wrap();
            match decide(&*self) {
                Some(d) => self.dir = d,
                None => break,
            }
        }
        self.wrap();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PursuerState {
    InPen { release: f32 },
    LeavingPen,
    Active,
    Eaten,
}

#[derive(Debug, Clone, Copy)]
struct Pursuer {
    index: usize,
    walker: Walker,
    state: PursuerState,
    frightened: bool,
}

impl Pursuer {
    fn spawn(index: usize) -> Self {
        let (col, row) = PURSUER_STARTS[index];
        let (state, dir) = if index == 0 {
            (PursuerState::Active, Dir::Left)
        } else {
            (PursuerState::InPen { release: PEN_RELEASE[index] }, Dir::Up)
        };
        Self { index, walker: Walker::at_tile(col, row, dir), state, frightened: false }
    }
}

/// Pick the non-reversing walkable heading closest to `target`, ties going
/// to the earlier entry of `Dir::PRIORITY`. Dead ends reverse.
fn choose_heading(col: i32, row: i32, dir: Dir, target: (i32, i32), state: PursuerState) -> Dir {
    let reverse = dir.opposite();
    let mut best: Option<(Dir, f32)> = None;
    for d in Dir::PRIORITY {
        if d == reverse {
            continue;
        }
        let (dx, dy) = d.delta();
        let (nc, nr) = (col + dx, row + dy);
        if !pursuer_walkable(nc, nr, state) {
            continue;
        }
        let dist = distance(nc as f32, nr as f32, target.0 as f32, target.1 as f32);
        if best.map_or(true, |(_, b)| dist < b) {
            best = Some((d, dist));
        }
    }
    best.map_or(reverse, |(d, _)| d)
}

fn pellet_index(col: i32, row: i32) -> Option<usize> {
    ((0..COLS).contains(&col) && (0..ROWS).contains(&row)).then(|| (row * COLS + col) as usize)
}

/// Autopilot used until the first input: keep going while there are dots
/// ahead, otherwise wander.
fn demo_heading(w: &Walker, pellets: &[Option<Tile>], rng: &mut StdRng) -> Option<Dir> {
    let (col, row) = w.tile();
    let reverse = w.dir.opposite();
    let open: Vec<Dir> = [Dir::Up, Dir::Down, Dir::Left, Dir::Right]
        .into_iter()
        .filter(|&d| {
            let (dx, dy) = d.delta();
            d != reverse && protagonist_walkable(col + dx, row + dy)
        })
        .collect();
    if open.is_empty() {
        let (dx, dy) = reverse.delta();
        return protagonist_walkable(col + dx, row + dy).then_some(reverse);
    }
    let with_dot: Vec<Dir> = open
        .iter()
        .copied()
        .filter(|d| {
            let (dx, dy) = d.delta();
            pellet_index(col + dx, row + dy).is_some_and(|i| pellets[i].is_some())
        })
        .collect();
    let pool = if with_dot.is_empty() { &open } else { &with_dot };
    if pool.contains(&w.dir) {
        Some(w.dir)
    } else {
        pool.choose(rng).copied()
    }
}

pub struct MazeChase {
    rng: StdRng,
    viewport: Viewport,
    hud: HudOutbox,
    score: u32,
    lives: u32,
    level: u32,
    game_over: bool,
    pellets: Vec<Option<Tile>>,
    dots_left: usize,
    protagonist: Walker,
    wanted: Dir,
    pursuers: Vec<Pursuer>,
    mode_index: usize,
    mode_timer: f32,
    chase: bool,
    fright_timer: Option<f32>,
    catches: usize,
    dying: Option<f32>,
    transition_timer: Option<f32>,
    demo: bool,
    elapsed: f32,
}

impl MazeChase {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        let mut game = Self {
            rng,
            viewport: Viewport::new(GAME_W, GAME_H),
            hud: HudOutbox::new(),
            score: 0,
            lives: STARTING_LIVES,
            level: 1,
            game_over: false,
            pellets: Vec::new(),
            dots_left: 0,
            protagonist: Walker::at_tile(PROTAGONIST_START.0, PROTAGONIST_START.1, Dir::Left),
            wanted: Dir::Left,
            pursuers: Vec::new(),
            mode_index: 0,
            mode_timer: MODE_SCHEDULE[0],
            chase: false,
            fright_timer: None,
            catches: 0,
            dying: None,
            transition_timer: None,
            demo: true,
            elapsed: 0.0,
        };
        game.build_pellets();
        game.reset_actors();
        game
    }

    fn emit_hud(&mut self) {
        let snap = self.hud();
        self.hud.push(snap);
    }

    fn build_pellets(&mut self) {
        self.pellets = (0..ROWS)
            .flat_map(|row| (0..COLS).map(move |col| (col, row)))
            .map(|(col, row)| tile_at(col, row).filter(|t| matches!(t, Tile::Dot | Tile::Power)))
            .collect();
        self.dots_left = self.pellets.iter().flatten().count();
    }

    /// Protagonist, pursuers and the mode schedule back to their level-start state.
    fn reset_actors(&mut self) {
        self.protagonist = Walker::at_tile(PROTAGONIST_START.0, PROTAGONIST_START.1, Dir::Left);
        self.wanted = Dir::Left;
        self.pursuers = (0..4).map(Pursuer::spawn).collect();
        self.mode_index = 0;
        self.mode_timer = MODE_SCHEDULE[0];
        self.chase = false;
        self.fright_timer = None;
        self.catches = 0;
    }

    fn protagonist_speed(&self) -> f32 {
        (PROTAGONIST_SPEED + (self.level - 1) as f32 * PROTAGONIST_SPEED_STEP) * TILE
    }

    fn pursuer_speed(&self, p: &Pursuer) -> f32 {
        let base = PURSUER_SPEED + (self.level - 1) as f32 * PURSUER_SPEED_STEP;
        let (col, row) = p.walker.tile();
        let in_tunnel = row == TUNNEL_ROW && !(6..=21).contains(&col);
        let tiles_per_sec = if p.frightened {
            base / 2.0
        } else if in_tunnel {
            TUNNEL_SPEED
        } else {
            base
        };
        tiles_per_sec * TILE
    }

    fn update_protagonist(&mut self, dt: f32) {
        if self.wanted == self.protagonist.dir.opposite() {
            self.protagonist.dir = self.wanted;
        }
        let budget = self.protagonist_speed() * dt;
        let demo = self.demo;
        let wanted = self.wanted;
        let pellets = &self.pellets;
        let rng = &mut self.rng;
        self.protagonist.travel(budget, |w| {
            if demo {
                return demo_heading(w, pellets, rng);
            }
            let (col, row) = w.tile();
            [wanted, w.dir].into_iter().find(|d| {
                let (dx, dy) = d.delta();
                protagonist_walkable(col + dx, row + dy)
            })
        });

        let (col, row) = self.protagonist.tile();
        let Some(i) = pellet_index(col, row) else {
            return;
        };
        match self.pellets[i].take() {
            Some(Tile::Power) => {
                self.score += POWER_SCORE;
                self.dots_left -= 1;
                self.start_fright();
                self.emit_hud();
            }
            Some(_) => {
                self.score += DOT_SCORE;
                self.dots_left -= 1;
                self.emit_hud();
            }
            None => {}
        }
        if self.dots_left == 0 {
            tracing::debug!(level = self.level, "maze_chase: maze cleared");
            self.transition_timer = Some(LEVEL_TRANSITION);
        }
    }

    fn start_fright(&mut self) {
        self.fright_timer = Some(FRIGHT_TIME);
        self.catches = 0;
        for p in &mut self.pursuers {
            if p.state == PursuerState::Active {
                p.frightened = true;
                p.walker.dir = p.walker.dir.opposite();
            }
        }
    }

    fn update_mode(&mut self, dt: f32) {
        if let Some(t) = self.fright_timer {
            let t = t - dt;
            if t <= 0.0 {
                self.fright_timer = None;
                for p in &mut self.pursuers {
                    p.frightened = false;
                }
            } else {
                self.fright_timer = Some(t);
            }
            return;
        }

        self.mode_timer -= dt;
        if self.mode_timer <= 0.0 {
            self.mode_index = (self.mode_index + 1).min(MODE_SCHEDULE.len() - 1);
            self.mode_timer = MODE_SCHEDULE[self.mode_index];
            self.chase = self.mode_index % 2 == 1;
            tracing::debug!(chase = self.chase, "maze_chase: mode switch");
            for p in &mut self.pursuers {
                if p.state == PursuerState::Active {
                    p.walker.dir = p.walker.dir.opposite();
                }
            }
        }
    }

    /// Target tile for an active, unfrightened pursuer. Every other state
    /// moves on a script or a fixed target and never asks.
    fn pursuit_target(&self, p: &Pursuer) -> Option<(i32, i32)> {
        if p.state != PursuerState::Active || p.frightened {
            return None;
        }
        if !self.chase {
            return Some(SCATTER_TARGETS[p.index]);
        }
        let (pc, pr) = self.protagonist.tile();
        let (dx, dy) = self.protagonist.dir.delta();
        let target = match p.index {
            0 => (pc, pr),
            1 => {
                let quirk = if self.protagonist.dir == Dir::Up { 4 } else { 0 };
                (pc + dx * 4 - quirk, pr + dy * 4)
            }
            2 => {
                let pivot = (pc + dx * 2, pr + dy * 2);
                let (lc, lr) = self.pursuers.first().map_or((pc, pr), |lead| lead.walker.tile());
                (pivot.0 * 2 - lc, pivot.1 * 2 - lr)
            }
            _ => {
                let (gc, gr) = p.walker.tile();
                if distance(gc as f32, gr as f32, pc as f32, pr as f32) > 8.0 {
                    (pc, pr)
                } else {
                    SCATTER_TARGETS[p.index]
                }
            }
        };
        Some(target)
    }

    fn update_pursuers(&mut self, dt: f32) {
        for i in 0..self.pursuers.len() {
            let mut p = self.pursuers[i];
            match p.state {
                PursuerState::InPen { release } => {
                    let (_, top) = tile_center(0, 13);
                    let (_, bottom) = tile_center(0, 15);
                    let step = PEN_SPEED * TILE * dt;
                    p.walker.y += if p.walker.dir == Dir::Up { -step } else { step };
                    if p.walker.y < top {
                        p.walker.y = top;
                        p.walker.dir = Dir::Down;
                    } else if p.walker.y > bottom {
                        p.walker.y = bottom;
                        p.walker.dir = Dir::Up;
                    }
                    let release = release - dt;
                    p.state = if release <= 0.0 {
                        PursuerState::LeavingPen
                    } else {
                        PursuerState::InPen { release }
                    };
                }
                PursuerState::LeavingPen => {
                    let (exit_x, exit_y) = tile_center(PEN_EXIT.0, PEN_EXIT.1);
                    let step = PEN_SPEED * TILE * dt;
                    if (p.walker.x - exit_x).abs() > step {
                        p.walker.x += step.copysign(exit_x - p.walker.x);
                    } else {
                        p.walker.x = exit_x;
                        p.walker.y -= step;
                    }
                    if p.walker.y <= exit_y {
                        p.walker = Walker::at_tile(PEN_EXIT.0, PEN_EXIT.1, Dir::Left);
                        p.state = PursuerState::Active;
                    }
                }
                PursuerState::Eaten => {
                    let state = p.state;
                    p.walker.travel(EATEN_SPEED * TILE * dt, |w| {
                        let (col, row) = w.tile();
                        ((col, row) != PEN_CENTER).then(|| choose_heading(col, row, w.dir, PEN_CENTER, state))
                    });
                    if p.walker.at_center() && p.walker.tile() == PEN_CENTER {
                        p.state = PursuerState::LeavingPen;
                        p.frightened = false;
                    }
                }
                PursuerState::Active => {
                    let target = if p.frightened {
                        (self.rng.gen_range(0..COLS), self.rng.gen_range(0..ROWS))
                    } else {
                        match self.pursuit_target(&p) {
                            Some(t) => t,
                            None => continue,
                        }
                    };
                    let speed = self.pursuer_speed(&p);
                    let state = p.state;
                    p.walker.travel(speed * dt, |w| {
                        let (col, row) = w.tile();
                        Some(choose_heading(col, row, w.dir, target, state))
                    });
                }
            }
            self.pursuers[i] = p;
        }
    }

    fn check_collisions(&mut self) {
        let (px, py) = (self.protagonist.x, self.protagonist.y);
        for i in 0..self.pursuers.len() {
            let p = self.pursuers[i];
            if p.state != PursuerState::Active {
                continue;
            }
            if manhattan(px, py, p.walker.x, p.walker.y) >= TILE * 0.8 {
                continue;
            }
            if p.frightened {
                let bonus = CATCH_BONUS[self.catches.min(CATCH_BONUS.len() - 1)];
                self.score += bonus;
                self.catches += 1;
                let eaten = &mut self.pursuers[i];
                eaten.state = PursuerState::Eaten;
                eaten.frightened = false;
                tracing::debug!(pursuer = i, bonus, "maze_chase: pursuer eaten");
                self.emit_hud();
            } else {
                self.lives = self.lives.saturating_sub(1);
                self.dying = Some(DEATH_TIME);
                tracing::debug!(lives = self.lives, "maze_chase: caught");
                self.emit_hud();
                return;
            }
        }
    }

    fn start_next_level(&mut self) {
        self.level += 1;
        self.build_pellets();
        self.reset_actors();
        tracing::debug!(level = self.level, "maze_chase: next level");
        self.emit_hud();
    }

    fn steer(&mut self, action: Action) {
        let dir = match action {
            Action::Up => Dir::Up,
            Action::Down => Dir::Down,
            Action::Left => Dir::Left,
            Action::Right => Dir::Right,
            _ => return,
        };
        self.demo = false;
        self.wanted = dir;
    }
}

impl Default for MazeChase {
    fn default() -> Self {
        Self::new()
    }
}

impl Game for MazeChase {
    fn init(&mut self, width: u16, height: u16) {
        self.viewport.fit(width, height);
        self.score = 0;
        self.lives = STARTING_LIVES;
        self.level = 1;
        self.game_over = false;
        self.dying = None;
        self.transition_timer = None;
        self.demo = true;
        self.elapsed = 0.0;
        self.build_pellets();
        self.reset_actors();
        self.hud.force(self.hud());
    }

    fn update(&mut self, dt: f32) {
        if self.game_over {
            return;
        }
        let dt = clamp_dt(dt);
        self.elapsed += dt;

        if let Some(t) = self.transition_timer {
            let t = t - dt;
            if t <= 0.0 {
                self.transition_timer = None;
                self.start_next_level();
            } else {
                self.transition_timer = Some(t);
            }
            return;
        }

        if let Some(t) = self.dying {
            let t = t - dt;
            if t > 0.0 {
                self.dying = Some(t);
                return;
            }
            self.dying = None;
            if self.lives == 0 {
                self.game_over = true;
                tracing::debug!(score = self.score, level = self.level, "maze_chase: game over");
                self.emit_hud();
                return;
            }
            self.reset_actors();
            return;
        }

        self.update_protagonist(dt);
        if self.transition_timer.is_some() {
            return;
        }
        self.update_mode(dt);
        self.update_pursuers(dt);
        self.check_collisions();
    }

    fn render(&self, surface: &mut Surface) {
        let vp = &self.viewport;
        surface.play_field(vp, palette::BG);

        let clear_flash = self.transition_timer.is_some_and(|t| (t * 6.0) as i32 % 2 == 0);
        let wall_color = if clear_flash { palette::WHITE } else { palette::VIOLET };
        for row in 0..ROWS {
            for col in 0..COLS {
                let (x, y) = (col as f32 * TILE, row as f32 * TILE);
                match tile_at(col, row) {
                    Some(Tile::Wall) => surface.rect(vp, x, y, TILE, TILE, '█', Style::default().fg(wall_color)),
                    Some(Tile::Gate) => surface.rect(vp, x, y, TILE, TILE, '─', Style::default().fg(palette::MUTED)),
                    _ => {}
                }
            }
        }

        let pulse = (self.elapsed * 4.0) as i32 % 2 == 0;
        for (i, pellet) in self.pellets.iter().enumerate() {
            let (col, row) = (i as i32 % COLS, i as i32 / COLS);
            let (x, y) = tile_center(col, row);
            match pellet {
                Some(Tile::Power) if pulse => surface.point(vp, x, y, '●', Style::default().fg(palette::ORANGE)),
                Some(Tile::Dot) => surface.point(vp, x, y, '·', Style::default().fg(palette::MUTED)),
                _ => {}
            }
        }

        let flashing = self.fright_timer.is_some_and(|t| t < FRIGHT_FLASH_TIME && (t * 6.0) as i32 % 2 == 0);
        for p in &self.pursuers {
            let (ch, color) = match p.state {
                PursuerState::Eaten => ('"', palette::WHITE),
                _ if p.frightened && flashing => ('ᗣ', palette::WHITE),
                _ if p.frightened => ('ᗣ', palette::MUTED),
                _ => ('ᗣ', PURSUER_COLORS[p.index]),
            };
            surface.point(vp, p.walker.x, p.walker.y, ch, Style::default().fg(color));
        }

        let w = &self.protagonist;
        let glyph = match (self.dying, w.dir) {
            (Some(t), _) if t < DEATH_TIME / 2.0 => '·',
            (Some(_), _) => '*',
            (None, Dir::Left) => 'ᗧ',
            (None, Dir::Right) => 'ᗤ',
            (None, Dir::Up) => 'ᗢ',
            (None, Dir::Down) => 'ᗣ',
        };
        surface.point(vp, w.x, w.y, glyph, Style::default().fg(palette::GREEN).add_modifier(Modifier::BOLD));

        if self.demo {
            let style = Style::default().fg(palette::CYAN);
            surface.banner(vp, 17.5 * TILE, "DEMO - PRESS AN ARROW", style);
        } else if self.transition_timer.is_some() {
            let style = Style::default().fg(palette::CYAN).add_modifier(Modifier::BOLD);
            surface.banner(vp, 17.5 * TILE, "MAZE CLEAR", style);
        }
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.viewport.fit(width, height);
    }

    fn handle_key_down(&mut self, action: Action) {
        self.steer(action);
    }

    fn handle_key_up(&mut self, _action: Action) {}

    fn destroy(&mut self) {
        self.pursuers.clear();
        self.pellets.clear();
        self.hud.clear();
    }

    fn hud(&self) -> HudSnapshot {
        HudSnapshot {
            score: self.score,
            lives: Some(self.lives),
            level: self.level,
            game_over: self.game_over,
        }
    }

    fn drain_hud(&mut self) -> Vec<HudSnapshot> {
        self.hud.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game() -> MazeChase {
        let mut g = MazeChase::with_seed(3);
        g.init(112, 31);
        g
    }

    fn park_pursuers(g: &mut MazeChase) {
        for p in &mut g.pursuers {
            p.state = PursuerState::InPen { release: 100.0 };
            p.walker = Walker::at_tile(14, 14, Dir::Up);
        }
    }

    fn place_active(g: &mut MazeChase, i: usize, frightened: bool) {
        let p = &mut g.pursuers[i];
        p.state = PursuerState::Active;
        p.frightened = frightened;
        p.walker = g.protagonist;
    }

    #[test]
    fn init_layout() {
        let g = game();
        assert_eq!(g.dots_left, 242);
        assert_eq!(g.protagonist.tile(), (14, 22));
        assert_eq!(g.pursuers[0].state, PursuerState::Active);
        assert!(g.pursuers[1..].iter().all(|p| matches!(p.state, PursuerState::InPen { .. })));
        assert!(g.demo);
    }

    #[test]
    fn buffered_turn_waits_for_opening() {
        let mut g = game();
        park_pursuers(&mut g);
        g.handle_key_down(Action::Up);
        assert!(!g.demo);
        for _ in 0..20 {
            g.update(0.05);
        }
        assert_eq!(g.protagonist.tile(), (12, 19));
        assert!(g.protagonist.at_center());
        assert_eq!(g.score, 40);
    }

    #[test]
    fn reversal_is_immediate() {
        let mut g = game();
        park_pursuers(&mut g);
        g.handle_key_down(Action::Left);
        g.update(0.05);
        let x = g.protagonist.x;
        g.handle_key_down(Action::Right);
        g.update(0.05);
        assert!(g.protagonist.x > x);
    }

    #[test]
    fn tunnel_wraps() {
        let mut g = game();
        park_pursuers(&mut g);
        g.handle_key_down(Action::Left);
        g.protagonist = Walker::at_tile(0, TUNNEL_ROW, Dir::Left);
        for _ in 0..4 {
            g.update(0.05);
        }
        assert!(g.protagonist.x > GAME_W / 2.0);
    }

    #[test]
    fn catching_frightened_pursuers_escalates_bonus() {
        let mut g = game();
        park_pursuers(&mut g);
        g.fright_timer = Some(FRIGHT_TIME);
        place_active(&mut g, 0, true);
        place_active(&mut g, 1, true);
        g.check_collisions();
        assert_eq!(g.pursuers[0].state, PursuerState::Eaten);
        assert_eq!(g.pursuers[1].state, PursuerState::Eaten);
        assert_eq!(g.score, 600);
        assert_eq!(g.lives, 3);
        assert!(g.dying.is_none());
    }

    #[test]
    fn power_item_frightens_and_reverses() {
        let mut g = game();
        let before = g.pursuers[0].walker.dir;
        g.start_fright();
        assert!(g.pursuers[0].frightened);
        assert_eq!(g.pursuers[0].walker.dir, before.opposite());
        assert!(!g.pursuers[1].frightened);
        g.update_mode(FRIGHT_TIME + 0.01);
        assert!(g.fright_timer.is_none());
        assert!(g.pursuers.iter().all(|p| !p.frightened));
    }

    #[test]
    fn caught_protagonist_respawns_or_game_over() {
        let mut g = game();
        park_pursuers(&mut g);
        place_active(&mut g, 0, false);
        g.check_collisions();
        assert_eq!(g.lives, 2);
        for _ in 0..21 {
            g.update(0.05);
        }
        assert!(g.dying.is_none());
        assert_eq!(g.protagonist.tile(), PROTAGONIST_START);

        g.lives = 1;
        park_pursuers(&mut g);
        place_active(&mut g, 0, false);
        g.check_collisions();
        for _ in 0..21 {
            g.update(0.05);
        }
        assert!(g.game_over);
        assert!(g.drain_hud().last().is_some_and(|h| h.game_over));
    }

    #[test]
    fn targeting_only_for_active_pursuers() {
        let mut g = game();
        g.chase = true;
        for state in [PursuerState::InPen { release: 1.0 }, PursuerState::LeavingPen, PursuerState::Eaten] {
            let mut p = g.pursuers[0];
            p.state = state;
            assert_eq!(g.pursuit_target(&p), None);
        }
        let mut p = g.pursuers[0];
        p.frightened = true;
        assert_eq!(g.pursuit_target(&p), None);
    }

    #[test]
    fn scatter_targets_corners() {
        let g = game();
        assert_eq!(g.pursuit_target(&g.pursuers[0]), Some((25, 0)));
    }

    #[test]
    fn chase_targeting_quirks() {
        let mut g = game();
        g.chase = true;
        g.protagonist = Walker::at_tile(14, 22, Dir::Up);
        g.pursuers[0].walker = Walker::at_tile(10, 20, Dir::Left);
        for p in &mut g.pursuers {
            p.state = PursuerState::Active;
        }
        assert_eq!(g.pursuit_target(&g.pursuers[0]), Some((14, 22)));
        assert_eq!(g.pursuit_target(&g.pursuers[1]), Some((10, 18)));
        // pivot (14, 20), reflected from (10, 20)
        assert_eq!(g.pursuit_target(&g.pursuers[2]), Some((18, 20)));

        g.pursuers[3].walker = Walker::at_tile(14, 26, Dir::Left);
        assert_eq!(g.pursuit_target(&g.pursuers[3]), Some((0, 30)));
        g.pursuers[3].walker = Walker::at_tile(1, 1, Dir::Left);
        assert_eq!(g.pursuit_target(&g.pursuers[3]), Some((14, 22)));
    }

    #[test]
    fn heading_ties_follow_priority() {
        let active = PursuerState::Active;
        assert_eq!(choose_heading(6, 5, Dir::Right, (6, 5), active), Dir::Up);
        assert_eq!(choose_heading(1, 1, Dir::Up, (20, 20), active), Dir::Right);
        assert_eq!(choose_heading(14, 11, Dir::Left, (14, 14), active), Dir::Left);
        assert_eq!(choose_heading(14, 11, Dir::Left, (14, 14), PursuerState::Eaten), Dir::Down);
    }

    #[test]
    fn mode_switch_reverses_active_pursuers() {
        let mut g = game();
        g.update_mode(7.01);
        assert!(g.chase);
        assert_eq!(g.pursuers[0].walker.dir, Dir::Right);
        assert_eq!(g.pursuers[1].walker.dir, Dir::Up);
    }

    #[test]
    fn mode_schedule_pauses_while_frightened() {
        let mut g = game();
        g.fright_timer = Some(FRIGHT_TIME);
        g.update_mode(5.0);
        assert!((g.mode_timer - 7.0).abs() < 1e-4);
    }

    #[test]
    fn eaten_pursuer_returns_and_leaves_pen() {
        let mut g = game();
        park_pursuers(&mut g);
        g.pursuers[0].state = PursuerState::Eaten;
        g.pursuers[0].walker = Walker::at_tile(14, 11, Dir::Left);
        for _ in 0..10 {
            g.update_pursuers(0.05);
        }
        assert_eq!(g.pursuers[0].state, PursuerState::LeavingPen);
        for _ in 0..30 {
            if g.pursuers[0].state == PursuerState::Active {
                break;
            }
            g.update_pursuers(0.05);
        }
        assert_eq!(g.pursuers[0].state, PursuerState::Active);
        assert_eq!(g.pursuers[0].walker.tile(), PEN_EXIT);
    }

    #[test]
    fn pen_release_follows_timers() {
        let mut g = game();
        for _ in 0..70 {
            g.update_pursuers(0.05);
        }
        assert!(!matches!(g.pursuers[1].state, PursuerState::InPen { .. }));
        assert!(matches!(g.pursuers[3].state, PursuerState::InPen { .. }));
    }

    #[test]
    fn clearing_maze_advances_level() {
        let mut g = game();
        park_pursuers(&mut g);
        g.handle_key_down(Action::Left);
        g.pellets.iter_mut().for_each(|p| *p = None);
        if let Some(i) = pellet_index(12, 22) {
            g.pellets[i] = Some(Tile::Dot);
        }
        g.dots_left = 1;
        for _ in 0..6 {
            g.update(0.05);
        }
        assert!(g.transition_timer.is_some());
        for _ in 0..31 {
            g.update(0.05);
        }
        assert_eq!(g.level, 2);
        assert_eq!(g.dots_left, 242);
    }

    #[test]
    fn demo_moves_until_first_input() {
        let mut g = game();
        park_pursuers(&mut g);
        let start = (g.protagonist.x, g.protagonist.y);
        for _ in 0..10 {
            g.update(0.05);
        }
        assert!(g.demo);
        assert_ne!((g.protagonist.x, g.protagonist.y), start);
        g.handle_key_down(Action::Fire);
        assert!(g.demo);
        g.handle_key_down(Action::Down);
        assert!(!g.demo);
    }
}
