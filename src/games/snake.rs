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
const CELL: f32 = 15.0;
const COLS: i32 = 32;
const ROWS: i32 = 24;

const BASE_MOVE_INTERVAL: f32 = 0.15;
const MIN_MOVE_INTERVAL: f32 = 0.06;
const SPEED_DECREASE: f32 = 0.005;
const FOOD_SCORE: u32 = 10;
const FOOD_PER_LEVEL: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pos {
    x: i32,
    y: i32,
}

pub struct Snake {
    rng: StdRng,
    viewport: Viewport,
    hud: HudOutbox,
    score: u32,
    lives: u32,
    level: u32,
    game_over: bool,
    segments: Vec<Pos>,
    direction: Pos,
    next_direction: Pos,
    food: Option<Pos>,
    food_eaten: u32,
    move_timer: f32,
    move_interval: f32,
}

impl Snake {
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
            lives: 1,
            level: 1,
            game_over: false,
            segments: Vec::new(),
            direction: Pos { x: 1, y: 0 },
            next_direction: Pos { x: 1, y: 0 },
            food: None,
            food_eaten: 0,
            move_timer: 0.0,
            move_interval: BASE_MOVE_INTERVAL,
        }
    }

    fn emit_hud(&mut self) {
        let snap = self.hud();
        self.hud.push(snap);
    }

    fn spawn_food(&mut self) {
        let free: Vec<Pos> = (0..COLS)
            .flat_map(|x| (0..ROWS).map(move |y| Pos { x, y }))
            .filter(|p| !self.segments.contains(p))
            .collect();
        if free.is_empty() {
            // Board full.
            self.food = None;
            self.trigger_game_over();
            return;
        }
        self.food = Some(free[self.rng.gen_range(0..free.len())]);
    }

    fn trigger_game_over(&mut self) {
        self.lives = 0;
        self.game_over = true;
        tracing::debug!(score = self.score, "snake: game over");
        self.emit_hud();
    }

    fn step(&mut self) {
        self.direction = self.next_direction;
        let Some(&head) = self.segments.first() else {
            return;
        };
        let next = Pos { x: head.x + self.direction.x, y: head.y + self.direction.y };

        if next.x < 0 || next.x >= COLS || next.y < 0 || next.y >= ROWS {
            self.trigger_game_over();
            return;
        }
        if self.segments.contains(&next) {
            self.trigger_game_over();
            return;
        }

        self.segments.insert(0, next);
        if self.food == Some(next) {
            self.score += FOOD_SCORE;
            self.food_eaten += 1;
            self.move_interval = (BASE_MOVE_INTERVAL - self.food_eaten as f32 * SPEED_DECREASE)
                .max(MIN_MOVE_INTERVAL);
            if self.food_eaten % FOOD_PER_LEVEL == 0 {
                self.level += 1;
                tracing::debug!(level = self.level, "snake: level up");
            }
            self.emit_hud();
            self.spawn_food();
        } else {
            self.segments.pop();
        }
    }

    fn steer(&mut self, action: Action) {
        let d = self.direction;
        self.next_direction = match action {
            Action::Up if d.y != 1 => Pos { x: 0, y: -1 },
            Action::Down if d.y != -1 => Pos { x: 0, y: 1 },
            Action::Left if d.x != 1 => Pos { x: -1, y: 0 },
            Action::Right if d.x != -1 => Pos { x: 1, y: 0 },
            _ => return,
        };
    }
}

impl Default for Snake {
    fn default() -> Self {
        Self::new()
    }
}

impl Game for Snake {
    fn init(&mut self, width: u16, height: u16) {
        self.viewport.fit(width, height);
        self.score = 0;
        self.lives = 1;
        self.level = 1;
        self.game_over = false;
        self.direction = Pos { x: 1, y: 0 };
        self.next_direction = self.direction;
        self.move_timer = 0.0;
        self.move_interval = BASE_MOVE_INTERVAL;
        self.food_eaten = 0;

        let (cx, cy) = (COLS / 2, ROWS / 2);
        self.segments = vec![Pos { x: cx, y: cy }, Pos { x: cx - 1, y: cy }, Pos { x: cx - 2, y: cy }];
        self.spawn_food();
        self.hud.force(self.hud());
    }

    fn update(&mut self, dt: f32) {
        if self.game_over {
            return;
        }
        self.move_timer += clamp_dt(dt);
        if self.move_timer >= self.move_interval {
            self.move_timer -= self.move_interval;
            self.step();
        }
    }

    fn render(&self, surface: &mut Surface) {
        let vp = &self.viewport;
        surface.play_field(vp, palette::BG);

        if let Some(food) = self.food {
            surface.rect(
                vp,
                food.x as f32 * CELL,
                food.y as f32 * CELL,
                CELL,
                CELL,
                '●',
                Style::default().fg(palette::ORANGE),
            );
        }

        for (i, s) in self.segments.iter().enumerate().rev() {
            let style = if i == 0 {
                Style::default().fg(palette::CYAN).bg(palette::CYAN)
            } else {
                Style::default().fg(palette::VIOLET).bg(palette::VIOLET)
            };
            surface.rect(vp, s.x as f32 * CELL, s.y as f32 * CELL, CELL, CELL, '█', style);
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
        self.segments.clear();
        self.food = None;
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

    fn game() -> Snake {
        let mut g = Snake::with_seed(7);
        g.init(80, 24);
        g
    }

    #[test]
    fn init_state() {
        let mut g = game();
        assert_eq!(g.segments.len(), 3);
        assert_eq!(g.segments[0], Pos { x: 16, y: 12 });
        assert!(g.food.is_some());
        let hud = g.drain_hud();
        assert_eq!(hud.len(), 1);
        assert_eq!(hud[0].lives, Some(1));
        assert_eq!(hud[0].level, 1);
    }

    #[test]
    fn moves_right_by_default() {
        let mut g = game();
        for _ in 0..4 {
            g.update(0.05);
        }
        assert_eq!(g.segments[0].x, 17);
        assert_eq!(g.segments.len(), 3);
    }

    #[test]
    fn reversal_is_rejected() {
        let mut g = game();
        g.handle_key_down(Action::Left);
        assert_eq!(g.next_direction, Pos { x: 1, y: 0 });
        g.handle_key_down(Action::Up);
        assert_eq!(g.next_direction, Pos { x: 0, y: -1 });
    }

    #[test]
    fn touch_steers_like_keys() {
        let mut g = game();
        g.handle_touch_action(Action::Down, true);
        assert_eq!(g.next_direction, Pos { x: 0, y: 1 });
        g.handle_touch_action(Action::Down, false);
        assert_eq!(g.next_direction, Pos { x: 0, y: 1 });
    }

    #[test]
    fn eating_food_grows_and_scores() {
        let mut g = game();
        g.food = Some(Pos { x: 17, y: 12 });
        g.step();
        assert_eq!(g.segments.len(), 4);
        assert_eq!(g.score, 10);
        assert!((g.move_interval - 0.145).abs() < 1e-6);
        assert!(g.food.is_some());
        assert_ne!(g.food, Some(Pos { x: 17, y: 12 }));
    }

    #[test]
    fn tenth_food_levels_up() {
        let mut g = game();
        g.food_eaten = 9;
        g.food = Some(Pos { x: 17, y: 12 });
        g.step();
        assert_eq!(g.level, 2);
    }

    #[test]
    fn wall_collision_ends_game() {
        let mut g = game();
        g.segments = vec![Pos { x: COLS - 1, y: 5 }, Pos { x: COLS - 2, y: 5 }];
        g.step();
        assert!(g.game_over);
        assert_eq!(g.lives, 0);
        let last = g.drain_hud().last().copied();
        assert_eq!(last.map(|h| h.game_over), Some(true));
    }

    #[test]
    fn self_collision_ends_game() {
        let mut g = game();
        g.segments = vec![
            Pos { x: 5, y: 5 },
            Pos { x: 6, y: 5 },
            Pos { x: 6, y: 6 },
            Pos { x: 5, y: 6 },
            Pos { x: 4, y: 6 },
        ];
        g.direction = Pos { x: 0, y: 1 };
        g.next_direction = g.direction;
        g.step();
        assert!(g.game_over);
    }

    #[test]
    fn full_board_ends_game() {
        let mut g = game();
        g.segments = (0..COLS).flat_map(|x| (0..ROWS).map(move |y| Pos { x, y })).collect();
        g.spawn_food();
        assert!(g.game_over);
        assert!(g.food.is_none());
    }

    #[test]
    fn frozen_after_game_over() {
        let mut g = game();
        g.game_over = true;
        let head = g.segments[0];
        g.update(0.05);
        g.update(0.05);
        g.update(0.05);
        assert_eq!(g.segments[0], head);
    }
}
