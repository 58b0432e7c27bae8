use std::f32::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::prelude::*;

use super::hud::{HudOutbox, HudSnapshot};
use super::palette;
use super::physics::{clamp_dt, Rect};
use super::surface::Surface;
use super::viewport::Viewport;
use super::{Action, Game};

const GAME_W: f32 = 480.0;
const GAME_H: f32 = 360.0;

const PADDLE_W: f32 = 10.0;
const PADDLE_H: f32 = 50.0;
const PADDLE_MARGIN: f32 = 20.0;
const PADDLE_SPEED: f32 = 220.0;

const BALL_SIZE: f32 = 6.0;
const BALL_BASE_SPEED: f32 = 200.0;
const BALL_SPEED_INCREMENT: f32 = 15.0;
const BALL_MAX_ANGLE: f32 = PI / 3.0;
const BOUNCE_SPEEDUP: f32 = 1.02;

const AI_BASE_SPEED: f32 = 160.0;
const AI_SPEED_INCREMENT: f32 = 20.0;
const AI_REACTION_DELAY: f32 = 0.08;
const AI_JITTER: f32 = 0.3;
const AI_DEADZONE: f32 = 2.0;

const STARTING_LIVES: u32 = 3;
const POINTS_PER_LEVEL: u32 = 5;
const SERVE_DELAY: f32 = 0.8;
const SCORE_FLASH: f32 = 0.3;

#[derive(Debug, Clone, Copy)]
struct Ball {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
}

pub struct Pong {
    rng: StdRng,
    viewport: Viewport,
    hud: HudOutbox,
    score: u32,
    lives: u32,
    level: u32,
    game_over: bool,
    up_held: bool,
    down_held: bool,
    player: Rect,
    ai: Rect,
    ball: Ball,
    serve_timer: f32,
    ai_reaction_timer: f32,
    ai_target_y: f32,
    score_flash: f32,
}

impl Pong {
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
            up_held: false,
            down_held: false,
            player: Rect::new(PADDLE_MARGIN, GAME_H / 2.0 - PADDLE_H / 2.0, PADDLE_W, PADDLE_H),
            ai: Rect::new(
                GAME_W - PADDLE_MARGIN - PADDLE_W,
                GAME_H / 2.0 - PADDLE_H / 2.0,
                PADDLE_W,
                PADDLE_H,
            ),
            ball: Ball { x: GAME_W / 2.0, y: GAME_H / 2.0, vx: 0.0, vy: 0.0 },
            serve_timer: SERVE_DELAY,
            ai_reaction_timer: 0.0,
            ai_target_y: GAME_H / 2.0,
            score_flash: 0.0,
        }
    }

    fn emit_hud(&mut self) {
        let snap = self.hud();
        self.hud.push(snap);
    }

    fn ball_speed(&self) -> f32 {
        BALL_BASE_SPEED + (self.level - 1) as f32 * BALL_SPEED_INCREMENT
    }

    fn ai_speed(&self) -> f32 {
        AI_BASE_SPEED + (self.level - 1) as f32 * AI_SPEED_INCREMENT
    }

    fn serve(&mut self) {
        let speed = self.ball_speed();
        let angle = (self.rng.gen::<f32>() - 0.5) * PI / 3.0;
        let dir = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        self.ball = Ball {
            x: GAME_W / 2.0,
            y: GAME_H / 2.0,
            vx: angle.cos() * speed * dir,
            vy: angle.sin() * speed,
        };
        self.serve_timer = SERVE_DELAY;
    }

    fn update_player(&mut self, dt: f32) {
        if self.up_held {
            self.player.y -= PADDLE_SPEED * dt;
        }
        if self.down_held {
            self.player.y += PADDLE_SPEED * dt;
        }
        self.player.y = self.player.y.clamp(0.0, GAME_H - self.player.h);
    }

    fn update_ai(&mut self, dt: f32) {
        self.ai_reaction_timer -= dt;
        if self.ai_reaction_timer <= 0.0 {
            self.ai_reaction_timer = AI_REACTION_DELAY;
            let jitter = (self.rng.gen::<f32>() - 0.5) * PADDLE_H * AI_JITTER;
            self.ai_target_y = self.ball.y + jitter - self.ai.h / 2.0;
        }

        let diff = self.ai_target_y - self.ai.y;
        if diff.abs() > AI_DEADZONE {
            self.ai.y += diff.signum() * (self.ai_speed() * dt).min(diff.abs());
        }
        self.ai.y = self.ai.y.clamp(0.0, GAME_H - self.ai.h);
    }

    fn paddle_bounce(&mut self, paddle: Rect, dir_x: f32) {
        let b = &mut self.ball;
        let hit = (b.y - paddle.y) / paddle.h;
        let angle = (hit - 0.5) * BALL_MAX_ANGLE * 2.0;
        let speed = (b.vx * b.vx + b.vy * b.vy).sqrt() * BOUNCE_SPEEDUP;
        b.vx = angle.cos() * speed * dir_x;
        b.vy = angle.sin() * speed;
        b.x = if dir_x > 0.0 { paddle.x + paddle.w + BALL_SIZE } else { paddle.x - BALL_SIZE };
    }

    fn touches(&self, paddle: &Rect) -> bool {
        let b = &self.ball;
        b.x - BALL_SIZE <= paddle.x + paddle.w
            && b.x + BALL_SIZE >= paddle.x
            && b.y + BALL_SIZE >= paddle.y
            && b.y - BALL_SIZE <= paddle.y + paddle.h
    }

    fn update_ball(&mut self, dt: f32) {
        self.ball.x += self.ball.vx * dt;
        self.ball.y += self.ball.vy * dt;

        if self.ball.y - BALL_SIZE < 0.0 {
            self.ball.y = BALL_SIZE;
            self.ball.vy = self.ball.vy.abs();
        }
        if self.ball.y + BALL_SIZE > GAME_H {
            self.ball.y = GAME_H - BALL_SIZE;
            self.ball.vy = -self.ball.vy.abs();
        }

        if self.ball.vx < 0.0 && self.touches(&self.player) {
            self.paddle_bounce(self.player, 1.0);
        }
        if self.ball.vx > 0.0 && self.touches(&self.ai) {
            self.paddle_bounce(self.ai, -1.0);
        }

        if self.ball.x + BALL_SIZE < 0.0 {
            self.lives = self.lives.saturating_sub(1);
            if self.lives == 0 {
                self.game_over = true;
                tracing::debug!(score = self.score, "pong: game over");
                self.emit_hud();
                return;
            }
            self.emit_hud();
            self.serve();
        } else if self.ball.x - BALL_SIZE > GAME_W {
            self.score += 1;
            self.score_flash = SCORE_FLASH;
            if self.score % POINTS_PER_LEVEL == 0 {
                self.level += 1;
                tracing::debug!(level = self.level, "pong: level up");
            }
            self.emit_hud();
            self.serve();
        }
    }

    fn set_held(&mut self, action: Action, held: bool) {
        match action {
            Action::Up => self.up_held = held,
            Action::Down => self.down_held = held,
            _ => {}
        }
    }
}

impl Default for Pong {
    fn default() -> Self {
        Self::new()
    }
}

impl Game for Pong {
    fn init(&mut self, width: u16, height: u16) {
        self.viewport.fit(width, height);
        self.score = 0;
        self.lives = STARTING_LIVES;
        self.level = 1;
        self.game_over = false;
        self.up_held = false;
        self.down_held = false;
        self.ai_reaction_timer = 0.0;
        self.ai_target_y = GAME_H / 2.0;
        self.score_flash = 0.0;
        self.player.y = GAME_H / 2.0 - PADDLE_H / 2.0;
        self.ai.y = GAME_H / 2.0 - PADDLE_H / 2.0;
        self.serve();
        self.hud.force(self.hud());
    }

    fn update(&mut self, dt: f32) {
        if self.game_over {
            return;
        }
        let dt = clamp_dt(dt);
        if self.serve_timer > 0.0 {
            self.serve_timer -= dt;
            return;
        }
        self.update_player(dt);
        self.update_ai(dt);
        self.update_ball(dt);
        if self.score_flash > 0.0 {
            self.score_flash -= dt;
        }
    }

    fn render(&self, surface: &mut Surface) {
        let vp = &self.viewport;
        surface.play_field(vp, palette::BG);

        let muted = Style::default().fg(palette::MUTED);
        let mut y = 0.0;
        while y < GAME_H {
            surface.point(vp, GAME_W / 2.0, y, '┊', muted);
            y += 16.0;
        }

        for (paddle, color) in [(self.player, palette::CYAN), (self.ai, palette::VIOLET)] {
            surface.rect(vp, paddle.x, paddle.y, paddle.w, paddle.h, '█', Style::default().fg(color));
        }

        let ball_color = if self.score_flash > 0.0 { palette::ORANGE } else { palette::WHITE };
        surface.point(vp, self.ball.x, self.ball.y, '●', Style::default().fg(ball_color));
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.viewport.fit(width, height);
    }

    fn handle_key_down(&mut self, action: Action) {
        self.set_held(action, true);
    }

    fn handle_key_up(&mut self, action: Action) {
        self.set_held(action, false);
    }

    fn destroy(&mut self) {
        self.up_held = false;
        self.down_held = false;
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

    fn game() -> Pong {
        let mut g = Pong::with_seed(3);
        g.init(80, 24);
        g.serve_timer = 0.0;
        g
    }

    #[test]
    fn serve_speed_matches_level() {
        let g = game();
        let speed = (g.ball.vx.powi(2) + g.ball.vy.powi(2)).sqrt();
        assert!((speed - 200.0).abs() < 0.01);
        assert!(g.ball.vy.abs() <= speed * (PI / 6.0).sin() + 0.01);
    }

    #[test]
    fn player_paddle_is_clamped() {
        let mut g = game();
        g.handle_key_down(Action::Up);
        for _ in 0..200 {
            g.update_player(0.05);
        }
        assert_eq!(g.player.y, 0.0);
        g.handle_key_up(Action::Up);
        g.handle_key_down(Action::Down);
        for _ in 0..200 {
            g.update_player(0.05);
        }
        assert_eq!(g.player.y, GAME_H - PADDLE_H);
    }

    #[test]
    fn paddle_bounce_speeds_up_and_reverses() {
        let mut g = game();
        g.ball = Ball { x: g.player.x + PADDLE_W + 2.0, y: g.player.y + PADDLE_H / 2.0, vx: -200.0, vy: 0.0 };
        g.update_ball(0.01);
        assert!(g.ball.vx > 0.0);
        let speed = (g.ball.vx.powi(2) + g.ball.vy.powi(2)).sqrt();
        assert!((speed - 204.0).abs() < 0.1);
    }

    #[test]
    fn ball_past_ai_scores() {
        let mut g = game();
        g.ball = Ball { x: GAME_W + 10.0, y: 10.0, vx: 200.0, vy: 0.0 };
        g.update_ball(0.01);
        assert_eq!(g.score, 1);
        assert!(g.score_flash > 0.0);
        assert!(g.serve_timer > 0.0);
    }

    #[test]
    fn fifth_point_levels_up() {
        let mut g = game();
        g.score = 4;
        g.ball = Ball { x: GAME_W + 10.0, y: 10.0, vx: 200.0, vy: 0.0 };
        g.update_ball(0.01);
        assert_eq!(g.level, 2);
    }

    #[test]
    fn last_miss_ends_game() {
        let mut g = game();
        g.lives = 1;
        g.ball = Ball { x: -10.0, y: 10.0, vx: -200.0, vy: 0.0 };
        g.update_ball(0.01);
        assert!(g.game_over);
        assert_eq!(g.lives, 0);
        let ai_y = g.ai.y;
        g.update(0.05);
        assert_eq!(g.ai.y, ai_y);
    }

    #[test]
    fn ai_tracks_ball() {
        let mut g = game();
        g.ball = Ball { x: 300.0, y: 40.0, vx: 0.0, vy: 0.0 };
        let start = g.ai.y;
        for _ in 0..10 {
            g.update_ai(0.05);
        }
        assert!(g.ai.y < start);
    }

    #[test]
    fn serve_delay_freezes_ball() {
        let mut g = Pong::with_seed(1);
        g.init(80, 24);
        let x = g.ball.x;
        g.update(0.05);
        assert_eq!(g.ball.x, x);
    }
}
