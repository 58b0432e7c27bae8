use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::prelude::*;

use super::hud::{HudOutbox, HudSnapshot};
use super::palette;
use super::physics::clamp_dt;
use super::surface::Surface;
use super::viewport::Viewport;
use super::{Action, Game};

const GAME_W: f32 = 480.0;
const GAME_H: f32 = 360.0;

const LANES: usize = 4;
const LANE_W: f32 = 60.0;
const LANE_GAP: f32 = 10.0;
const LANES_X: f32 = (GAME_W - (LANES as f32 * LANE_W + (LANES as f32 - 1.0) * LANE_GAP)) / 2.0;

const CATCH_ZONE_Y: f32 = GAME_H - 50.0;
const CATCH_ZONE_H: f32 = 16.0;
const PERFECT_WINDOW: f32 = 20.0;
const GOOD_WINDOW: f32 = 40.0;
const MISS_LINE: f32 = CATCH_ZONE_Y + CATCH_ZONE_H + GOOD_WINDOW;

const NOTE_SIZE: f32 = 20.0;
const NOTE_BASE_SPEED: f32 = 150.0;
const NOTE_SPEED_INCREMENT: f32 = 15.0;

const SPAWN_BASE_INTERVAL: f32 = 0.5;
const SPAWN_MIN_INTERVAL: f32 = 0.2;
const SPAWN_STEP: f32 = 0.03;
const CATCHES_PER_LEVEL: u32 = 20;
const MOTIFS_PER_PATTERN: usize = 10;

const STARTING_LIVES: u32 = 3;
const MISS_STREAK_LIMIT: u32 = 3;
const SCORE_PERFECT: u32 = 100;
const SCORE_GOOD: u32 = 50;
const MAX_MULTIPLIER: u32 = 4;

const MOTIFS: [[usize; 4]; 8] = [
    [0, 1, 2, 3],
    [3, 2, 1, 0],
    [0, 3, 1, 2],
    [1, 2, 1, 2],
    [0, 0, 3, 3],
    [0, 2, 1, 3],
    [1, 3, 0, 2],
    [2, 2, 0, 0],
];

const LANE_COLORS: [Color; LANES] = [palette::CYAN, palette::VIOLET, palette::ORANGE, palette::CYAN];
const LANE_GLYPHS: [char; LANES] = ['◄', '▼', '▲', '►'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Judgement {
    Perfect,
    Good,
    Miss,
}

impl Judgement {
    fn duration(self) -> f32 {
        match self {
            Judgement::Perfect => 0.5,
            Judgement::Good | Judgement::Miss => 0.4,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Judgement::Perfect => "PERFECT",
            Judgement::Good => "GOOD",
            Judgement::Miss => "MISS",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Note {
    lane: usize,
    y: f32,
}

#[derive(Debug, Clone, Copy)]
struct Effect {
    kind: Judgement,
    lane: usize,
    timer: f32,
}

fn lane_action(action: Action) -> Option<usize> {
    match action {
        Action::Left => Some(0),
        Action::Down => Some(1),
        Action::Up => Some(2),
        Action::Right => Some(3),
        _ => None,
    }
}

fn lane_x(lane: usize) -> f32 {
    LANES_X + lane as f32 * (LANE_W + LANE_GAP)
}

pub struct Rhythm {
    rng: StdRng,
    viewport: Viewport,
    hud: HudOutbox,
    score: u32,
    lives: u32,
    level: u32,
    game_over: bool,
    notes: Vec<Note>,
    effects: Vec<Effect>,
    combo: u32,
    max_combo: u32,
    miss_streak: u32,
    spawn_timer: f32,
    caught: u32,
    pattern: Vec<usize>,
    pattern_index: usize,
}

impl Rhythm {
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
            lives: STARTING_LIVES,
            level: 1,
            game_over: false,
            notes: Vec::new(),
            effects: Vec::new(),
            combo: 0,
            max_combo: 0,
            miss_streak: 0,
            spawn_timer: 0.0,
            caught: 0,
            pattern: Vec::new(),
            pattern_index: 0,
        }
    }

    fn emit_hud(&mut self) {
        let snap = self.hud();
        self.hud.push(snap);
    }

    fn generate_pattern(&mut self) {
        self.pattern.clear();
        for _ in 0..MOTIFS_PER_PATTERN {
            let motif = MOTIFS[self.rng.gen_range(0..MOTIFS.len())];
            self.pattern.extend_from_slice(&motif);
        }
    }

    fn note_speed(&self) -> f32 {
        NOTE_BASE_SPEED + (self.level - 1) as f32 * NOTE_SPEED_INCREMENT
    }

    fn spawn_interval(&self) -> f32 {
        (SPAWN_BASE_INTERVAL - (self.level - 1) as f32 * SPAWN_STEP).max(SPAWN_MIN_INTERVAL)
    }

    fn multiplier(&self) -> u32 {
        (self.combo / 5 + 1).min(MAX_MULTIPLIER)
    }

    fn spawn_note(&mut self) {
        if self.pattern.is_empty() {
            return;
        }
        let lane = self.pattern[self.pattern_index % self.pattern.len()];
        self.pattern_index += 1;
        self.notes.push(Note { lane, y: -NOTE_SIZE });
    }

    fn try_hit(&mut self, lane: usize) {
        if self.game_over {
            return;
        }
        let best = self
            .notes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.lane == lane)
            .map(|(i, n)| (i, (n.y - CATCH_ZONE_Y).abs()))
            .filter(|&(_, dist)| dist < GOOD_WINDOW)
            .min_by(|a, b| a.1.total_cmp(&b.1));
        let Some((index, dist)) = best else {
            return;
        };
        self.notes.remove(index);

        let judgement = if dist <= PERFECT_WINDOW { Judgement::Perfect } else { Judgement::Good };
        self.combo += 1;
        self.max_combo = self.max_combo.max(self.combo);
        self.miss_streak = 0;
        let base = if judgement == Judgement::Perfect { SCORE_PERFECT } else { SCORE_GOOD };
        self.score += base * self.multiplier();
        self.effects.push(Effect { kind: judgement, lane, timer: judgement.duration() });

        self.caught += 1;
        if self.caught % CATCHES_PER_LEVEL == 0 {
            self.level += 1;
            tracing::debug!(level = self.level, max_combo = self.max_combo, "rhythm: level up");
            self.generate_pattern();
        }
        self.emit_hud();
    }

    fn on_miss(&mut self, lane: usize) {
        self.combo = 0;
        self.miss_streak += 1;
        self.effects.push(Effect { kind: Judgement::Miss, lane, timer: Judgement::Miss.duration() });

        if self.miss_streak >= MISS_STREAK_LIMIT {
            self.lives = self.lives.saturating_sub(1);
            self.miss_streak = 0;
            if self.lives == 0 {
                self.game_over = true;
                tracing::debug!(score = self.score, "rhythm: game over");
            }
            self.emit_hud();
        }
    }
}

impl Default for Rhythm {
    fn default() -> Self {
        Self::new()
    }
}

impl Game for Rhythm {
    fn init(&mut self, width: u16, height: u16) {
        self.viewport.fit(width, height);
        self.score = 0;
        self.lives = STARTING_LIVES;
        self.level = 1;
        self.game_over = false;
        self.notes.clear();
        self.effects.clear();
        self.combo = 0;
        self.max_combo = 0;
        self.miss_streak = 0;
        self.spawn_timer = 0.0;
        self.caught = 0;
        self.pattern_index = 0;
        self.generate_pattern();
        self.hud.force(self.hud());
    }

    fn update(&mut self, dt: f32) {
        if self.game_over {
            return;
        }
        let dt = clamp_dt(dt);

        self.spawn_timer -= dt;
        if self.spawn_timer <= 0.0 {
            self.spawn_note();
            self.spawn_timer = self.spawn_interval();
        }

        let speed = self.note_speed();
        let mut missed = Vec::new();
        self.notes.retain_mut(|n| {
            n.y += speed * dt;
            if n.y > MISS_LINE {
                missed.push(n.lane);
                false
            } else {
                true
            }
        });
        for lane in missed {
            if self.game_over {
                break;
            }
            self.on_miss(lane);
        }

        for e in &mut self.effects {
            e.timer -= dt;
        }
        self.effects.retain(|e| e.timer > 0.0);
    }

    fn render(&self, surface: &mut Surface) {
        let vp = &self.viewport;
        surface.play_field(vp, palette::BG);

        let divider = Style::default().fg(palette::DIM);
        for lane in 0..=LANES {
            let x = lane_x(lane) - LANE_GAP / 2.0;
            surface.line(vp, (x, 0.0), (x, GAME_H), '│', divider);
        }

        for lane in 0..LANES {
            let style = Style::default().fg(LANE_COLORS[lane]);
            surface.rect(vp, lane_x(lane), CATCH_ZONE_Y, LANE_W, CATCH_ZONE_H, '─', style);
            surface.point(vp, lane_x(lane) + LANE_W / 2.0, CATCH_ZONE_Y + CATCH_ZONE_H + 12.0, LANE_GLYPHS[lane], style);
        }

        for n in &self.notes {
            let style = Style::default().fg(LANE_COLORS[n.lane]).add_modifier(Modifier::BOLD);
            surface.rect(vp, lane_x(n.lane) + 10.0, n.y - NOTE_SIZE / 2.0, LANE_W - 20.0, NOTE_SIZE / 2.0, '█', style);
        }

        for e in &self.effects {
            let color = match e.kind {
                Judgement::Perfect => palette::CYAN,
                Judgement::Good => palette::VIOLET,
                Judgement::Miss => palette::ORANGE,
            };
            let rise = (1.0 - e.timer / e.kind.duration()) * 30.0;
            let label = e.kind.label();
            let (cx, cy) = vp.to_cell(lane_x(e.lane) + LANE_W / 2.0, CATCH_ZONE_Y - 20.0 - rise);
            surface.text(cx - label.len() as i32 / 2, cy, label, Style::default().fg(color));
        }

        if self.combo >= 2 {
            let text = format!("{} COMBO  x{}", self.combo, self.multiplier());
            surface.banner(vp, 40.0, &text, Style::default().fg(palette::WHITE).add_modifier(Modifier::BOLD));
        }
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.viewport.fit(width, height);
    }

    fn handle_key_down(&mut self, action: Action) {
        if let Some(lane) = lane_action(action) {
            self.try_hit(lane);
        }
    }

    fn handle_key_up(&mut self, _action: Action) {}

    fn destroy(&mut self) {
        self.notes.clear();
        self.effects.clear();
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

    fn game() -> Rhythm {
        let mut g = Rhythm::with_seed(9);
        g.init(80, 24);
        g
    }

    #[test]
    fn pattern_is_ten_motifs() {
        let g = game();
        assert_eq!(g.pattern.len(), 40);
        assert!(g.pattern.chunks(4).all(|c| MOTIFS.iter().any(|m| m == c)));
    }

    #[test]
    fn first_update_spawns_note() {
        let mut g = game();
        g.update(0.016);
        assert_eq!(g.notes.len(), 1);
        assert_eq!(g.notes[0].lane, g.pattern[0]);
    }

    #[test]
    fn perfect_and_good_windows() {
        let mut g = game();
        g.notes = vec![Note { lane: 0, y: CATCH_ZONE_Y + 5.0 }];
        g.handle_key_down(Action::Left);
        assert_eq!(g.score, 100);
        g.notes = vec![Note { lane: 1, y: CATCH_ZONE_Y - 30.0 }];
        g.handle_key_down(Action::Down);
        assert_eq!(g.score, 150);
        assert_eq!(g.combo, 2);
    }

    #[test]
    fn press_outside_window_does_nothing() {
        let mut g = game();
        g.notes = vec![Note { lane: 2, y: CATCH_ZONE_Y - 60.0 }];
        g.handle_key_down(Action::Up);
        assert_eq!(g.notes.len(), 1);
        assert_eq!(g.score, 0);
        assert_eq!(g.combo, 0);
    }

    #[test]
    fn combo_multiplier_caps_at_four() {
        let mut g = game();
        g.combo = 4;
        assert_eq!(g.multiplier(), 1);
        g.notes = vec![Note { lane: 3, y: CATCH_ZONE_Y }];
        g.handle_key_down(Action::Right);
        assert_eq!(g.score, 200);
        g.combo = 40;
        assert_eq!(g.multiplier(), 4);
    }

    #[test]
    fn three_misses_cost_a_life() {
        let mut g = game();
        g.spawn_timer = 10.0;
        g.notes = (0..3).map(|lane| Note { lane, y: MISS_LINE + 1.0 }).collect();
        g.update(0.016);
        assert_eq!(g.lives, 2);
        assert_eq!(g.miss_streak, 0);
        assert_eq!(g.combo, 0);
    }

    #[test]
    fn twentieth_catch_levels_up() {
        let mut g = game();
        g.caught = 19;
        g.notes = vec![Note { lane: 0, y: CATCH_ZONE_Y }];
        g.handle_key_down(Action::Left);
        assert_eq!(g.level, 2);
        assert!((g.note_speed() - 165.0).abs() < 1e-4);
        assert!((g.spawn_interval() - 0.47).abs() < 1e-4);
    }

    #[test]
    fn spawn_interval_has_floor() {
        let mut g = game();
        g.level = 30;
        assert_eq!(g.spawn_interval(), SPAWN_MIN_INTERVAL);
    }

    #[test]
    fn lives_run_out() {
        let mut g = game();
        g.lives = 1;
        g.miss_streak = 2;
        g.on_miss(0);
        assert!(g.game_over);
        g.notes = vec![Note { lane: 0, y: CATCH_ZONE_Y }];
        g.handle_key_down(Action::Left);
        assert_eq!(g.notes.len(), 1);
    }
}
