use ratatui::prelude::*;

use super::hud::{HudOutbox, HudSnapshot};
use super::palette;
use super::physics::clamp_dt;
use super::surface::Surface;
use super::viewport::Viewport;
use super::{Action, Game};

const GAME_W: f32 = 480.0;
const GAME_H: f32 = 360.0;
const CELL: f32 = 30.0;
const COLS: i32 = 16;
const ROWS: usize = 12;
const START_ROW: usize = ROWS - 1;

const STARTING_LIVES: u32 = 3;
const MOVE_COOLDOWN: f32 = 0.12;
const DEATH_TIME: f32 = 0.8;
const LANE_WRAP: f32 = 20.0;
const CAR_INSET: f32 = 4.0;
const LEVEL_SPEEDUP: f32 = 0.2;

const HOP_SCORE: u32 = 10;
const GOAL_SCORE: u32 = 50;
const ROUND_BONUS: u32 = 100;
const GOAL_COLUMNS: [i32; 5] = [1, 4, 7, 10, 13];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LaneKind {
    Goal,
    River,
    Safe,
    Road,
    Start,
}

const LANE_KINDS: [LaneKind; ROWS] = [
    LaneKind::Goal,
    LaneKind::River,
    LaneKind::River,
    LaneKind::River,
    LaneKind::River,
    LaneKind::River,
    LaneKind::Safe,
    LaneKind::Road,
    LaneKind::Road,
    LaneKind::Road,
    LaneKind::Road,
    LaneKind::Start,
];

#[derive(Debug, Clone, Copy)]
struct LaneSpec {
    speed: f32,
    dir: f32,
    obj_w: f32,
    gap: f32,
}

const fn lane(speed: f32, dir: f32, obj_w: f32, gap: f32) -> LaneSpec {
    LaneSpec { speed, dir, obj_w, gap }
}

const RIVER_LANES: [LaneSpec; 5] = [
    lane(40.0, 1.0, 90.0, 130.0),
    lane(55.0, -1.0, 60.0, 110.0),
    lane(35.0, 1.0, 120.0, 160.0),
    lane(50.0, -1.0, 60.0, 100.0),
    lane(45.0, 1.0, 90.0, 140.0),
];

const ROAD_LANES: [LaneSpec; 4] = [
    lane(50.0, -1.0, 40.0, 120.0),
    lane(70.0, 1.0, 60.0, 140.0),
    lane(45.0, -1.0, 35.0, 100.0),
    lane(65.0, 1.0, 50.0, 130.0),
];

#[derive(Debug, Clone)]
struct Lane {
    kind: LaneKind,
    speed: f32,
    dir: f32,
    /// Left edge of each log or vehicle.
    objects: Vec<f32>,
    obj_w: f32,
}

impl Lane {
    fn build(kind: LaneKind, spec: LaneSpec, level: u32) -> Self {
        let count = ((GAME_W + spec.gap) / (spec.obj_w + spec.gap)).ceil() as usize + 1;
        Self {
            kind,
            speed: spec.speed * (1.0 + (level - 1) as f32 * LEVEL_SPEEDUP),
            dir: spec.dir,
            objects: (0..count).map(|i| i as f32 * (spec.obj_w + spec.gap)).collect(),
            obj_w: spec.obj_w,
        }
    }

    fn velocity(&self) -> f32 {
        self.speed * self.dir
    }

    fn advance(&mut self, dt: f32) {
        let dx = self.velocity() * dt;
        for x in &mut self.objects {
            *x += dx;
            if self.dir > 0.0 && *x > GAME_W + LANE_WRAP {
                *x = -self.obj_w - LANE_WRAP;
            } else if self.dir < 0.0 && *x + self.obj_w < -LANE_WRAP {
                *x = GAME_W + LANE_WRAP;
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Frog {
    /// Fractional while riding a log; hops snap it back to a whole column.
    col: f32,
    row: usize,
    dead: bool,
    death_timer: f32,
}

impl Frog {
    fn start() -> Self {
        Self { col: (COLS / 2) as f32, row: START_ROW, dead: false, death_timer: 0.0 }
    }
}

pub struct Frogger {
    viewport: Viewport,
    hud: HudOutbox,
    score: u32,
    lives: u32,
    level: u32,
    game_over: bool,
    frog: Frog,
    highest_row: usize,
    move_cooldown: f32,
    goals: [bool; 5],
    lanes: Vec<Option<Lane>>,
}

impl Frogger {
    pub fn new() -> Self {
        Self {
            viewport: Viewport::new(GAME_W, GAME_H),
            hud: HudOutbox::new(),
            score: 0,
            lives: STARTING_LIVES,
            level: 1,
            game_over: false,
            frog: Frog::start(),
            highest_row: START_ROW,
            move_cooldown: 0.0,
            goals: [false; 5],
            lanes: Vec::new(),
        }
    }

    fn emit_hud(&mut self) {
        let snap = self.hud();
        self.hud.push(snap);
    }

    fn build_lanes(level: u32) -> Vec<Option<Lane>> {
        LANE_KINDS
            .iter()
            .enumerate()
            .map(|(row, &kind)| match kind {
                LaneKind::River => Some(Lane::build(kind, RIVER_LANES[row - 1], level)),
                LaneKind::Road => Some(Lane::build(kind, ROAD_LANES[row - 7], level)),
                _ => None,
            })
            .collect()
    }

    fn reset_frog(&mut self) {
        self.frog = Frog::start();
        self.highest_row = START_ROW;
    }

    fn kill_frog(&mut self) {
        self.frog.dead = true;
        self.frog.death_timer = DEATH_TIME;
        self.lives = self.lives.saturating_sub(1);
        tracing::debug!(lives = self.lives, row = self.frog.row, "frogger: frog lost");
        self.emit_hud();
    }

    fn hop(&mut self, dx: i32, dy: i32) {
        if self.frog.dead || self.move_cooldown > 0.0 || self.game_over {
            return;
        }
        let col = self.frog.col.round() as i32 + dx;
        let row = self.frog.row as i32 + dy;
        if col < 0 || col >= COLS || row < 0 || row >= ROWS as i32 {
            return;
        }
        self.frog.col = col as f32;
        self.frog.row = row as usize;
        self.move_cooldown = MOVE_COOLDOWN;

        if self.frog.row < self.highest_row {
            self.highest_row = self.frog.row;
            self.score += HOP_SCORE;
            self.emit_hud();
        }
    }

    fn steer(&mut self, action: Action) {
        match action {
            Action::Up => self.hop(0, -1),
            Action::Down => self.hop(0, 1),
            Action::Left => self.hop(-1, 0),
            Action::Right => self.hop(1, 0),
            _ => {}
        }
    }

    /// Resolve the frog against its current lane after objects moved.
    fn settle_frog(&mut self, dt: f32) {
        let row = self.frog.row;
        match LANE_KINDS[row] {
            LaneKind::River => {
                let Some(lane) = self.lanes.get(row).and_then(Option::as_ref) else {
                    return;
                };
                let frog_x = self.frog.col * CELL;
                let on_log = lane.objects.iter().any(|&x| frog_x + CELL > x && frog_x < x + lane.obj_w);
                if !on_log {
                    self.kill_frog();
                    return;
                }
                self.frog.col += lane.velocity() * dt / CELL;
                let x = self.frog.col * CELL;
                if x < -CELL || x > GAME_W {
                    self.kill_frog();
                }
            }
            LaneKind::Road => {
                let Some(lane) = self.lanes.get(row).and_then(Option::as_ref) else {
                    return;
                };
                let frog_x = self.frog.col * CELL;
                let hit = lane
                    .objects
                    .iter()
                    .any(|&x| frog_x + CELL - CAR_INSET > x && frog_x + CAR_INSET < x + lane.obj_w);
                if hit {
                    self.kill_frog();
                }
            }
            LaneKind::Goal => self.reach_goal(),
            LaneKind::Safe | LaneKind::Start => {}
        }
    }

    fn reach_goal(&mut self) {
        let col = self.frog.col.round() as i32;
        let slot = GOAL_COLUMNS
            .iter()
            .enumerate()
            .find(|&(i, &gx)| (col - gx).abs() <= 1 && !self.goals[i])
            .map(|(i, _)| i);
        let Some(slot) = slot else {
            self.kill_frog();
            return;
        };

        self.goals[slot] = true;
        self.score += GOAL_SCORE;
        self.emit_hud();
        if self.goals.iter().all(|&g| g) {
            self.score += ROUND_BONUS;
            self.level += 1;
            self.goals = [false; 5];
            self.lanes = Self::build_lanes(self.level);
            tracing::debug!(level = self.level, "frogger: all homes filled");
            self.emit_hud();
        }
        self.reset_frog();
    }
}

impl Default for Frogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Game for Frogger {
    fn init(&mut self, width: u16, height: u16) {
        self.viewport.fit(width, height);
        self.score = 0;
        self.lives = STARTING_LIVES;
        self.level = 1;
        self.game_over = false;
        self.move_cooldown = 0.0;
        self.goals = [false; 5];
        self.reset_frog();
        self.lanes = Self::build_lanes(self.level);
        self.hud.force(self.hud());
    }

    fn update(&mut self, dt: f32) {
        if self.game_over {
            return;
        }
        let dt = clamp_dt(dt);

        if self.frog.dead {
            self.frog.death_timer -= dt;
            if self.frog.death_timer <= 0.0 {
                if self.lives == 0 {
                    self.game_over = true;
                    tracing::debug!(score = self.score, "frogger: game over");
                    self.emit_hud();
                    return;
                }
                self.reset_frog();
            }
            return;
        }

        if self.move_cooldown > 0.0 {
            self.move_cooldown -= dt;
        }
        for lane in self.lanes.iter_mut().flatten() {
            lane.advance(dt);
        }
        self.settle_frog(dt);
    }

    fn render(&self, surface: &mut Surface) {
        let vp = &self.viewport;
        surface.play_field(vp, palette::BG);

        for (row, kind) in LANE_KINDS.iter().enumerate() {
            let bg = match kind {
                LaneKind::River => palette::WATER,
                LaneKind::Road => palette::ROAD,
                LaneKind::Safe | LaneKind::Start => palette::GRASS,
                LaneKind::Goal => palette::BG,
            };
            surface.rect(vp, 0.0, row as f32 * CELL, GAME_W, CELL, ' ', Style::default().bg(bg));
        }

        for (i, &gx) in GOAL_COLUMNS.iter().enumerate() {
            let (ch, color) = if self.goals[i] { ('♦', palette::CYAN) } else { ('□', palette::MUTED) };
            surface.rect(vp, gx as f32 * CELL, 0.0, CELL, CELL, ch, Style::default().fg(color));
        }

        for (row, lane) in self.lanes.iter().enumerate() {
            let Some(lane) = lane else { continue };
            let (ch, color) = match lane.kind {
                LaneKind::River => ('═', palette::ORANGE),
                _ => ('▄', palette::VIOLET),
            };
            for &x in &lane.objects {
                surface.rect(vp, x, row as f32 * CELL + 4.0, lane.obj_w, CELL - 8.0, ch, Style::default().fg(color));
            }
        }

        let f = &self.frog;
        let visible = !f.dead || (f.death_timer * 10.0) as i32 % 2 == 1;
        if visible {
            let color = if f.dead { palette::ORANGE } else { palette::GREEN };
            let glyph = if f.dead { 'x' } else { '@' };
            surface.rect(
                vp,
                f.col * CELL + 4.0,
                f.row as f32 * CELL + 4.0,
                CELL - 8.0,
                CELL - 8.0,
                glyph,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            );
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
        self.lanes.clear();
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
