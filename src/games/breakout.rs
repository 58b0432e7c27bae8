use std::f32::consts::PI;

use ratatui::prelude::*;

use super::hud::{HudOutbox, HudSnapshot};
use super::palette;
use super::physics::{aabb_overlap, clamp_dt, Rect};
use super::surface::Surface;
use super::viewport::Viewport;
use super::{Action, Game};

const GAME_W: f32 = 480.0;
const GAME_H: f32 = 360.0;

const PADDLE_W: f32 = 60.0;
const PADDLE_H: f32 = 10.0;
const PADDLE_SPEED: f32 = 250.0;
const PADDLE_Y: f32 = GAME_H - 30.0;

const BALL_SIZE: f32 = 6.0;
const BALL_BASE_SPEED: f32 = 200.0;
const BALL_SPEED_INCREMENT: f32 = 20.0;
const LAUNCH_VX_RATIO: f32 = 0.7;
const BOUNCE_SPREAD: f32 = PI * 0.7;
const FALL_LIMIT: f32 = GAME_H + 20.0;

const BRICK_ROWS: usize = 6;
const BRICK_COLS: usize = 10;
const BRICK_W: f32 = 40.0;
const BRICK_H: f32 = 14.0;
const BRICK_PAD_X: f32 = 4.0;
const BRICK_PAD_Y: f32 = 4.0;
const BRICK_TOP: f32 = 50.0;

const STARTING_LIVES: u32 = 3;
const RESPAWN_DELAY: f32 = 1.0;
const LEVEL_TRANSITION: f32 = 1.0;

const ROW_COLORS: [Color; BRICK_ROWS] = [
    palette::ORANGE,
    palette::ORANGE,
    palette::VIOLET,
    palette::VIOLET,
    palette::CYAN,
    palette::CYAN,
];
const ROW_SCORES: [u32; BRICK_ROWS] = [7, 7, 5, 5, 3, 1];

#[derive(Debug, Clone, Copy)]
struct Brick {
    rect: Rect,
    row: usize,
}

#[derive(Debug, Clone, Copy)]
struct Ball {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    launched: bool,
}

impl Ball {
    fn bounds(&self) -> Rect {
        Rect::centered(self.x, self.y, BALL_SIZE)
    }
}

pub struct Breakout {
    viewport: Viewport,
    hud: HudOutbox,
    score: u32,
    lives: u32,
    level: u32,
    game_over: bool,
    left_held: bool,
    right_held: bool,
    fire_held: bool,
    launch_requested: bool,
    paddle: Rect,
    ball: Ball,
    bricks: Vec<Brick>,
    respawn_timer: f32,
    transition_timer: Option<f32>,
}

impl Breakout {
    pub fn new() -> Self {
        Self {
            viewport: Viewport::new(GAME_W, GAME_H),
            hud: HudOutbox::new(),
            score: 0,
            lives: STARTING_LIVES,
            level: 1,
            game_over: false,
            left_held: false,
            right_held: false,
            fire_held: false,
            launch_requested: false,
            paddle: Rect::new(GAME_W / 2.0 - PADDLE_W / 2.0, PADDLE_Y, PADDLE_W, PADDLE_H),
            ball: Self::parked_ball(),
            bricks: Vec::new(),
            respawn_timer: 0.0,
            transition_timer: None,
        }
    }

    fn parked_ball() -> Ball {
        Ball { x: GAME_W / 2.0, y: PADDLE_Y - BALL_SIZE, vx: 0.0, vy: 0.0, launched: false }
    }

    fn build_bricks() -> Vec<Brick> {
        let total_w = BRICK_COLS as f32 * (BRICK_W + BRICK_PAD_X) - BRICK_PAD_X;
        let start_x = (GAME_W - total_w) / 2.0;
        (0..BRICK_ROWS)
            .flat_map(|row| {
                (0..BRICK_COLS).map(move |col| Brick {
                    rect: Rect::new(
                        start_x + col as f32 * (BRICK_W + BRICK_PAD_X),
                        BRICK_TOP + row as f32 * (BRICK_H + BRICK_PAD_Y),
                        BRICK_W,
                        BRICK_H,
                    ),
                    row,
                })
            })
            .collect()
    }

    fn emit_hud(&mut self) {
        let snap = self.hud();
        self.hud.push(snap);
    }

    fn update_paddle(&mut self, dt: f32) {
        if self.left_held {
            self.paddle.x -= PADDLE_SPEED * dt;
        }
        if self.right_held {
            self.paddle.x += PADDLE_SPEED * dt;
        }
        self.paddle.x = self.paddle.x.clamp(0.0, GAME_W - self.paddle.w);
    }

    fn update_ball(&mut self, dt: f32) {
        let b = &mut self.ball;
        if !b.launched {
            b.x = self.paddle.x + self.paddle.w / 2.0;
            b.y = PADDLE_Y - BALL_SIZE;
            if self.launch_requested {
                let speed = BALL_BASE_SPEED + (self.level - 1) as f32 * BALL_SPEED_INCREMENT;
                b.launched = true;
                b.vx = speed * LAUNCH_VX_RATIO;
                b.vy = -speed;
                self.launch_requested = false;
            }
            return;
        }

        b.x += b.vx * dt;
        b.y += b.vy * dt;

        if b.x - BALL_SIZE < 0.0 {
            b.x = BALL_SIZE;
            b.vx = b.vx.abs();
        }
        if b.x + BALL_SIZE > GAME_W {
            b.x = GAME_W - BALL_SIZE;
            b.vx = -b.vx.abs();
        }
        if b.y - BALL_SIZE < 0.0 {
            b.y = BALL_SIZE;
            b.vy = b.vy.abs();
        }

        if b.y > FALL_LIMIT {
            self.lose_life();
        }
    }

    fn check_collisions(&mut self) {
        if !self.ball.launched {
            return;
        }

        let bounds = self.ball.bounds();
        if self.ball.vy > 0.0 && aabb_overlap(&bounds, &self.paddle) {
            let b = &mut self.ball;
            let p = self.paddle;
            b.y = p.y - BALL_SIZE;
            let hit = (b.x - p.x) / p.w;
            let speed = (b.vx * b.vx + b.vy * b.vy).sqrt();
            let angle = (hit - 0.5) * BOUNCE_SPREAD;
            b.vx = angle.sin() * speed;
            b.vy = -(angle.cos() * speed).abs();
        }

        let bounds = self.ball.bounds();
        if let Some(i) = self.bricks.iter().rposition(|brick| aabb_overlap(&bounds, &brick.rect)) {
            let brick = self.bricks.remove(i);
            self.score += ROW_SCORES[brick.row];
            self.emit_hud();

            let r = brick.rect;
            let overlap_left = bounds.x + bounds.w - r.x;
            let overlap_right = r.x + r.w - bounds.x;
            let overlap_top = bounds.y + bounds.h - r.y;
            let overlap_bottom = r.y + r.h - bounds.y;
            if overlap_left.min(overlap_right) < overlap_top.min(overlap_bottom) {
                self.ball.vx = -self.ball.vx;
            } else {
                self.ball.vy = -self.ball.vy;
            }
        }

        if self.bricks.is_empty() {
            tracing::debug!(level = self.level, "breakout: wall cleared");
            self.transition_timer = Some(LEVEL_TRANSITION);
        }
    }

    fn lose_life(&mut self) {
        self.lives = self.lives.saturating_sub(1);
        if self.lives == 0 {
            self.game_over = true;
            tracing::debug!(score = self.score, "breakout: game over");
            self.emit_hud();
            return;
        }
        self.emit_hud();
        self.respawn_timer = RESPAWN_DELAY;
    }

    fn start_next_level(&mut self) {
        self.level += 1;
        self.bricks = Self::build_bricks();
        self.ball = Self::parked_ball();
        self.launch_requested = false;
        self.emit_hud();
    }
}

impl Default for Breakout {
    fn default() -> Self {
        Self::new()
    }
}

impl Game for Breakout {
    fn init(&mut self, width: u16, height: u16) {
        self.viewport.fit(width, height);
        self.score = 0;
        self.lives = STARTING_LIVES;
        self.level = 1;
        self.game_over = false;
        self.left_held = false;
        self.right_held = false;
        self.fire_held = false;
        self.launch_requested = false;
        self.paddle = Rect::new(GAME_W / 2.0 - PADDLE_W / 2.0, PADDLE_Y, PADDLE_W, PADDLE_H);
        self.ball = Self::parked_ball();
        self.bricks = Self::build_bricks();
        self.respawn_timer = 0.0;
        self.transition_timer = None;
        self.hud.force(self.hud());
    }

    fn update(&mut self, dt: f32) {
        if self.game_over {
            return;
        }
        let dt = clamp_dt(dt);

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

        if self.respawn_timer > 0.0 {
            self.respawn_timer -= dt;
            if self.respawn_timer <= 0.0 {
                self.ball = Self::parked_ball();
                self.launch_requested = false;
            }
            return;
        }

        self.update_paddle(dt);
        self.update_ball(dt);
        if !self.game_over {
            self.check_collisions();
        }
    }

    fn render(&self, surface: &mut Surface) {
        let vp = &self.viewport;
        surface.play_field(vp, palette::BG);

        for brick in &self.bricks {
            let r = brick.rect;
            let color = ROW_COLORS[brick.row];
            surface.rect(vp, r.x, r.y, r.w, r.h, '▆', Style::default().fg(color).bg(color));
        }

        let p = self.paddle;
        surface.rect(vp, p.x, p.y, p.w, p.h, '▀', Style::default().fg(palette::CYAN));

        if self.respawn_timer <= 0.0 {
            surface.point(vp, self.ball.x, self.ball.y, '●', Style::default().fg(palette::WHITE));
        }

        let text = Style::default().fg(palette::CYAN).add_modifier(Modifier::BOLD);
        if self.transition_timer.is_some() {
            surface.banner(vp, GAME_H / 2.0, &format!("LEVEL {}", self.level + 1), text);
        } else if !self.ball.launched && !self.game_over && self.respawn_timer <= 0.0 {
            surface.banner(vp, GAME_H * 0.65, "SPACE TO LAUNCH", Style::default().fg(palette::MUTED));
        }
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.viewport.fit(width, height);
    }

    fn handle_key_down(&mut self, action: Action) {
        match action {
            Action::Left => self.left_held = true,
            Action::Right => self.right_held = true,
            Action::Fire => {
                if !self.fire_held {
                    self.fire_held = true;
                    self.launch_requested = !self.ball.launched && self.respawn_timer <= 0.0;
                }
            }
            _ => {}
        }
    }

    fn handle_key_up(&mut self, action: Action) {
        match action {
            Action::Left => self.left_held = false,
            Action::Right => self.right_held = false,
            Action::Fire => {
                self.fire_held = false;
                self.launch_requested = false;
            }
            _ => {}
        }
    }

    fn destroy(&mut self) {
        self.bricks.clear();
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

    fn game() -> Breakout {
        let mut g = Breakout::new();
        g.init(80, 24);
        g
    }

    #[test]
    fn builds_full_wall() {
        let g = game();
        assert_eq!(g.bricks.len(), 60);
        let total: u32 = g.bricks.iter().map(|b| ROW_SCORES[b.row]).sum();
        assert_eq!(total, 10 * (7 + 7 + 5 + 5 + 3 + 1));
    }

    #[test]
    fn ball_rides_paddle_until_launch() {
        let mut g = game();
        g.handle_key_down(Action::Right);
        g.update(0.05);
        assert!(!g.ball.launched);
        assert_eq!(g.ball.x, g.paddle.x + PADDLE_W / 2.0);

        g.handle_key_down(Action::Fire);
        g.update(0.016);
        assert!(g.ball.launched);
        assert!((g.ball.vx - 140.0).abs() < 1e-3);
        assert!((g.ball.vy + 200.0).abs() < 1e-3);
    }

    #[test]
    fn launch_is_edge_triggered() {
        let mut g = game();
        g.handle_key_down(Action::Fire);
        g.handle_key_down(Action::Fire);
        g.update(0.016);
        assert!(g.ball.launched);
        assert!(!g.launch_requested);
        g.handle_key_down(Action::Fire);
        assert!(!g.launch_requested);
    }

    #[test]
    fn brick_hit_scores_and_removes_one() {
        let mut g = game();
        let target = g.bricks[g.bricks.len() - 1].rect;
        g.ball = Ball {
            x: target.x + target.w / 2.0,
            y: target.y + target.h + BALL_SIZE - 1.0,
            vx: 0.0,
            vy: -200.0,
            launched: true,
        };
        g.check_collisions();
        assert_eq!(g.bricks.len(), 59);
        assert_eq!(g.score, 1);
        assert!(g.ball.vy > 0.0);
    }

    #[test]
    fn paddle_center_bounces_straight_up() {
        let mut g = game();
        let p = g.paddle;
        g.ball = Ball { x: p.x + p.w / 2.0, y: p.y - 2.0, vx: 0.0, vy: 200.0, launched: true };
        g.check_collisions();
        assert!(g.ball.vy < 0.0);
        assert!(g.ball.vx.abs() < 1e-3);
        assert_eq!(g.ball.y, p.y - BALL_SIZE);
    }

    #[test]
    fn lost_ball_with_no_lives_freezes_game() {
        let mut g = game();
        g.lives = 1;
        g.ball = Ball { x: 100.0, y: FALL_LIMIT + 1.0, vx: 0.0, vy: 200.0, launched: true };
        g.update(0.016);
        assert!(g.game_over);
        let (bx, by, px) = (g.ball.x, g.ball.y, g.paddle.x);
        g.handle_key_down(Action::Left);
        for _ in 0..5 {
            g.update(0.05);
        }
        assert_eq!((g.ball.x, g.ball.y, g.paddle.x), (bx, by, px));
    }

    #[test]
    fn lost_ball_respawns_after_delay() {
        let mut g = game();
        g.ball = Ball { x: 100.0, y: FALL_LIMIT + 1.0, vx: 0.0, vy: 200.0, launched: true };
        g.update(0.016);
        assert_eq!(g.lives, 2);
        for _ in 0..21 {
            g.update(0.05);
        }
        assert!(!g.ball.launched);
    }

    #[test]
    fn fire_held_through_a_lost_ball_does_not_relaunch() {
        let mut g = game();
        g.handle_key_down(Action::Fire);
        g.update(0.016);
        assert!(g.ball.launched);
        g.handle_key_up(Action::Fire);
        g.handle_key_down(Action::Fire);
        g.ball = Ball { x: 100.0, y: FALL_LIMIT + 1.0, vx: 0.0, vy: 200.0, launched: true };
        g.update(0.016);
        assert_eq!(g.lives, 2);
        for _ in 0..30 {
            g.update(0.05);
        }
        assert!(!g.ball.launched);

        g.handle_key_up(Action::Fire);
        g.handle_key_down(Action::Fire);
        g.update(0.016);
        assert!(g.ball.launched);
    }

    #[test]
    fn clearing_wall_advances_level() {
        let mut g = game();
        g.bricks.truncate(1);
        let target = g.bricks[0].rect;
        g.ball = Ball {
            x: target.x + target.w / 2.0,
            y: target.y + target.h + BALL_SIZE - 1.0,
            vx: 0.0,
            vy: -200.0,
            launched: true,
        };
        g.check_collisions();
        assert!(g.transition_timer.is_some());
        for _ in 0..21 {
            g.update(0.05);
        }
        assert_eq!(g.level, 2);
        assert_eq!(g.bricks.len(), 60);
    }
}
