use std::f32::consts::{PI, TAU};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::prelude::*;

use super::hud::{HudOutbox, HudSnapshot};
use super::palette;
use super::physics::{circles_overlap, clamp_dt, distance, wrap_coord};
use super::surface::Surface;
use super::viewport::Viewport;
use super::{Action, Game};

const GAME_W: f32 = 800.0;
const GAME_H: f32 = 600.0;
const WRAP_MARGIN: f32 = 20.0;

const SHIP_ROTATION_SPEED: f32 = 4.0;
const SHIP_THRUST: f32 = 280.0;
const SHIP_MAX_SPEED: f32 = 400.0;
const SHIP_SIZE: f32 = 18.0;
const FRICTION: f32 = 0.99;

const BULLET_SPEED: f32 = 500.0;
const BULLET_LIFETIME: f32 = 1.5;
const BULLET_RADIUS: f32 = 2.5;
const BULLET_INHERIT: f32 = 0.3;
const FIRE_COOLDOWN: f32 = 0.25;

const INVULNERABILITY: f32 = 2.0;
const BLINK_RATE: f32 = 0.1;
const RESPAWN_DELAY: f32 = 1.0;
const LEVEL_TRANSITION: f32 = 1.5;
const STARTING_ASTEROIDS: u32 = 4;
const STARTING_LIVES: u32 = 3;
const SPAWN_CLEARANCE: f32 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Size {
    Large,
    Medium,
    Small,
}

impl Size {
    fn radius(self) -> f32 {
        match self {
            Size::Large => 45.0,
            Size::Medium => 25.0,
            Size::Small => 12.0,
        }
    }

    fn score(self) -> u32 {
        match self {
            Size::Large => 20,
            Size::Medium => 50,
            Size::Small => 100,
        }
    }

    fn speed_range(self) -> (f32, f32) {
        match self {
            Size::Large => (30.0, 60.0),
            Size::Medium => (50.0, 100.0),
            Size::Small => (80.0, 150.0),
        }
    }

    fn child(self) -> Option<Size> {
        match self {
            Size::Large => Some(Size::Medium),
            Size::Medium => Some(Size::Small),
            Size::Small => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Asteroid {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    size: Size,
    /// Outline as (angle, radius) pairs around the centre.
    vertices: Vec<(f32, f32)>,
    spin: f32,
    spin_speed: f32,
}

#[derive(Debug, Clone, Copy)]
struct Ship {
    x: f32,
    y: f32,
    angle: f32,
    vx: f32,
    vy: f32,
    thrusting: bool,
    invulnerable: f32,
    blink: f32,
    visible: bool,
}

impl Ship {
    fn spawn() -> Self {
        Self {
            x: GAME_W / 2.0,
            y: GAME_H / 2.0,
            angle: -PI / 2.0,
            vx: 0.0,
            vy: 0.0,
            thrusting: false,
            invulnerable: INVULNERABILITY,
            blink: 0.0,
            visible: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bullet {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    life: f32,
}

#[derive(Debug, Default, Clone, Copy)]
struct Controls {
    left: bool,
    right: bool,
    thrust: bool,
    fire: bool,
}

pub struct Asteroids {
    rng: StdRng,
    viewport: Viewport,
    hud: HudOutbox,
    score: u32,
    lives: u32,
    level: u32,
    game_over: bool,
    controls: Controls,
    ship: Option<Ship>,
    bullets: Vec<Bullet>,
    asteroids: Vec<Asteroid>,
    fire_cooldown: f32,
    respawn_timer: f32,
    transition_timer: Option<f32>,
}

impl Asteroids {
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
            controls: Controls::default(),
            ship: None,
            bullets: Vec::new(),
            asteroids: Vec::new(),
            fire_cooldown: 0.0,
            respawn_timer: 0.0,
            transition_timer: None,
        }
    }

    fn emit_hud(&mut self) {
        let snap = self.hud();
        self.hud.push(snap);
    }

    fn reset(&mut self) {
        self.score = 0;
        self.lives = STARTING_LIVES;
        self.level = 1;
        self.game_over = false;
        self.controls = Controls::default();
        self.bullets.clear();
        self.asteroids.clear();
        self.fire_cooldown = 0.0;
        self.respawn_timer = 0.0;
        self.transition_timer = None;
        self.ship = Some(Ship::spawn());
        self.spawn_wave(STARTING_ASTEROIDS);
        self.hud.force(self.hud());
    }

    fn spawn_wave(&mut self, count: u32) {
        for _ in 0..count {
            self.spawn_asteroid(Size::Large, None);
        }
    }

    fn spawn_asteroid(&mut self, size: Size, at: Option<(f32, f32)>) {
        let radius = size.radius();
        let (x, y) = match at {
            Some(pos) => pos,
            None => {
                let mut pos = (self.rng.gen::<f32>() * GAME_W, self.rng.gen::<f32>() * GAME_H);
                if let Some(ship) = self.ship {
                    let clearance = radius + SHIP_SIZE + SPAWN_CLEARANCE;
                    for _ in 0..64 {
                        if distance(pos.0, pos.1, ship.x, ship.y) >= clearance {
                            break;
                        }
                        pos = (self.rng.gen::<f32>() * GAME_W, self.rng.gen::<f32>() * GAME_H);
                    }
                }
                pos
            }
        };

        let (min, max) = size.speed_range();
        let speed = self.rng.gen_range(min..max);
        let heading = self.rng.gen::<f32>() * TAU;
        let vertex_count = self.rng.gen_range(6..=10);
        let vertices = (0..vertex_count)
            .map(|i| {
                let a = i as f32 / vertex_count as f32 * TAU;
                (a, radius * (0.7 + self.rng.gen::<f32>() * 0.3))
            })
            .collect();

        self.asteroids.push(Asteroid {
            x,
            y,
            vx: heading.cos() * speed,
            vy: heading.sin() * speed,
            size,
            vertices,
            spin: self.rng.gen::<f32>() * TAU,
            spin_speed: (self.rng.gen::<f32>() - 0.5) * 1.5,
        });
    }

    fn update_ship(&mut self, dt: f32) {
        let Some(ship) = self.ship.as_mut() else {
            return;
        };
        let c = self.controls;

        if c.left {
            ship.angle -= SHIP_ROTATION_SPEED * dt;
        }
        if c.right {
            ship.angle += SHIP_ROTATION_SPEED * dt;
        }

        ship.thrusting = c.thrust;
        if c.thrust {
            ship.vx += ship.angle.cos() * SHIP_THRUST * dt;
            ship.vy += ship.angle.sin() * SHIP_THRUST * dt;
        }

        let friction = FRICTION.powf(dt * 60.0);
        ship.vx *= friction;
        ship.vy *= friction;

        let speed = (ship.vx * ship.vx + ship.vy * ship.vy).sqrt();
        if speed > SHIP_MAX_SPEED {
            let scale = SHIP_MAX_SPEED / speed;
            ship.vx *= scale;
            ship.vy *= scale;
        }

        ship.x = wrap_coord(ship.x + ship.vx * dt, GAME_W, WRAP_MARGIN);
        ship.y = wrap_coord(ship.y + ship.vy * dt, GAME_H, WRAP_MARGIN);

        if ship.invulnerable > 0.0 {
            ship.invulnerable -= dt;
            ship.blink -= dt;
            if ship.blink <= 0.0 {
                ship.visible = !ship.visible;
                ship.blink = BLINK_RATE;
            }
            if ship.invulnerable <= 0.0 {
                ship.invulnerable = 0.0;
                ship.visible = true;
            }
        }

        self.fire_cooldown -= dt;
        if c.fire && self.fire_cooldown <= 0.0 {
            let (cos, sin) = (ship.angle.cos(), ship.angle.sin());
            self.bullets.push(Bullet {
                x: ship.x + cos * SHIP_SIZE,
                y: ship.y + sin * SHIP_SIZE,
                vx: cos * BULLET_SPEED + ship.vx * BULLET_INHERIT,
                vy: sin * BULLET_SPEED + ship.vy * BULLET_INHERIT,
                life: BULLET_LIFETIME,
            });
            self.fire_cooldown = FIRE_COOLDOWN;
        }
    }

    fn update_bullets(&mut self, dt: f32) {
        for b in &mut self.bullets {
            b.x = wrap_coord(b.x + b.vx * dt, GAME_W, WRAP_MARGIN);
            b.y = wrap_coord(b.y + b.vy * dt, GAME_H, WRAP_MARGIN);
            b.life -= dt;
        }
        self.bullets.retain(|b| b.life > 0.0);
    }

    fn update_asteroids(&mut self, dt: f32) {
        for a in &mut self.asteroids {
            a.x = wrap_coord(a.x + a.vx * dt, GAME_W, WRAP_MARGIN);
            a.y = wrap_coord(a.y + a.vy * dt, GAME_H, WRAP_MARGIN);
            a.spin += a.spin_speed * dt;
        }
    }

    /// Remove the asteroid at `index`, replacing it with two children of the
    /// next size at its exact position.
    fn destroy_asteroid(&mut self, index: usize) {
        let a = self.asteroids.remove(index);
        if let Some(child) = a.size.child() {
            self.spawn_asteroid(child, Some((a.x, a.y)));
            self.spawn_asteroid(child, Some((a.x, a.y)));
        }
    }

    fn check_bullet_hits(&mut self) {
        let mut bi = self.bullets.len();
        while bi > 0 {
            bi -= 1;
            let b = self.bullets[bi];
            let hit = self
                .asteroids
                .iter()
                .rposition(|a| circles_overlap(b.x, b.y, BULLET_RADIUS, a.x, a.y, a.size.radius()));
            if let Some(ai) = hit {
                self.bullets.remove(bi);
                self.score += self.asteroids[ai].size.score();
                self.destroy_asteroid(ai);
                self.emit_hud();
            }
        }
    }

    fn check_ship_hits(&mut self) {
        let Some(ship) = self.ship else {
            return;
        };
        if ship.invulnerable > 0.0 {
            return;
        }
        let hit = self
            .asteroids
            .iter()
            .any(|a| circles_overlap(ship.x, ship.y, SHIP_SIZE * 0.6, a.x, a.y, a.size.radius()));
        if hit {
            self.ship_death();
        }
    }

    fn ship_death(&mut self) {
        self.ship = None;
        self.lives = self.lives.saturating_sub(1);
        if self.lives == 0 {
            self.game_over = true;
            tracing::debug!(score = self.score, level = self.level, "asteroids: game over");
            self.emit_hud();
            return;
        }
        self.emit_hud();
        self.respawn_timer = RESPAWN_DELAY;
    }

    fn set_control(&mut self, action: Action, on: bool) {
        match action {
            Action::Left => self.controls.left = on,
            Action::Right => self.controls.right = on,
            Action::Thrust | Action::Up => self.controls.thrust = on,
            Action::Fire => self.controls.fire = on,
            _ => {}
        }
    }

    fn ship_outline(ship: &Ship) -> [(f32, f32); 4] {
        let (cos, sin) = (ship.angle.cos(), ship.angle.sin());
        let local = [
            (SHIP_SIZE, 0.0),
            (-SHIP_SIZE * 0.7, -SHIP_SIZE * 0.6),
            (-SHIP_SIZE * 0.4, 0.0),
            (-SHIP_SIZE * 0.7, SHIP_SIZE * 0.6),
        ];
        local.map(|(lx, ly)| (ship.x + lx * cos - ly * sin, ship.y + lx * sin + ly * cos))
    }
}

impl Default for Asteroids {
    fn default() -> Self {
        Self::new()
    }
}

impl Game for Asteroids {
    fn init(&mut self, width: u16, height: u16) {
        self.viewport.fit(width, height);
        self.reset();
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
                self.level += 1;
                tracing::debug!(level = self.level, "asteroids: next wave");
                self.spawn_wave(STARTING_ASTEROIDS + self.level - 1);
                self.emit_hud();
            } else {
                self.transition_timer = Some(t);
            }
            self.update_ship(dt);
            self.update_bullets(dt);
            return;
        }

        if self.ship.is_none() && self.respawn_timer > 0.0 {
            self.respawn_timer -= dt;
            if self.respawn_timer <= 0.0 {
                self.ship = Some(Ship::spawn());
            }
            self.update_asteroids(dt);
            return;
        }

        self.update_ship(dt);
        self.update_bullets(dt);
        self.update_asteroids(dt);
        self.check_bullet_hits();
        self.check_ship_hits();

        if self.asteroids.is_empty() && !self.game_over {
            self.transition_timer = Some(LEVEL_TRANSITION);
        }
    }

    fn render(&self, surface: &mut Surface) {
        let vp = &self.viewport;
        surface.play_field(vp, palette::BG);

        let rock = Style::default().fg(palette::CYAN);
        for a in &self.asteroids {
            let points: Vec<(f32, f32)> = a
                .vertices
                .iter()
                .map(|&(angle, r)| (a.x + (angle + a.spin).cos() * r, a.y + (angle + a.spin).sin() * r))
                .collect();
            for (i, &p) in points.iter().enumerate() {
                let q = points[(i + 1) % points.len()];
                surface.line(vp, p, q, '·', rock);
            }
        }

        let shot = Style::default().fg(palette::ORANGE);
        for b in &self.bullets {
            surface.point(vp, b.x, b.y, '•', shot);
        }

        if let Some(ship) = self.ship.filter(|s| s.visible) {
            let hull = Style::default().fg(palette::VIOLET);
            let outline = Self::ship_outline(&ship);
            for i in 0..outline.len() {
                surface.line(vp, outline[i], outline[(i + 1) % outline.len()], '*', hull);
            }
            if ship.thrusting {
                let tail = (
                    ship.x - ship.angle.cos() * SHIP_SIZE * 1.1,
                    ship.y - ship.angle.sin() * SHIP_SIZE * 1.1,
                );
                surface.point(vp, tail.0, tail.1, '^', Style::default().fg(palette::ORANGE));
            }
        }

        if self.transition_timer.is_some() {
            let style = Style::default().fg(palette::CYAN).add_modifier(Modifier::BOLD);
            surface.banner(vp, GAME_H / 3.0, &format!("WAVE {}", self.level + 1), style);
        }
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.viewport.fit(width, height);
    }

    fn handle_key_down(&mut self, action: Action) {
        if self.game_over && action == Action::Fire {
            tracing::debug!("asteroids: restart");
            self.reset();
            return;
        }
        self.set_control(action, true);
    }

    fn handle_key_up(&mut self, action: Action) {
        self.set_control(action, false);
    }

    fn destroy(&mut self) {
        self.controls = Controls::default();
        self.ship = None;
        self.bullets.clear();
        self.asteroids.clear();
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

    fn game() -> Asteroids {
        let mut g = Asteroids::with_seed(5);
        g.init(100, 30);
        g
    }

    #[test]
    fn first_wave_spawns_clear_of_ship() {
        let g = game();
        assert_eq!(g.asteroids.len(), 4);
        assert!(g.asteroids.iter().all(|a| a.size == Size::Large));
        for a in &g.asteroids {
            assert!(distance(a.x, a.y, GAME_W / 2.0, GAME_H / 2.0) >= 45.0 + SHIP_SIZE + SPAWN_CLEARANCE);
        }
    }

    #[test]
    fn large_splits_into_two_medium_at_parent_position() {
        let mut g = game();
        let (x, y) = (g.asteroids[0].x, g.asteroids[0].y);
        g.destroy_asteroid(0);
        let kids: Vec<_> = g.asteroids.iter().filter(|a| a.size == Size::Medium).collect();
        assert_eq!(kids.len(), 2);
        assert!(kids.iter().all(|a| a.x == x && a.y == y));
    }

    #[test]
    fn medium_splits_into_small_and_small_vanishes() {
        let mut g = game();
        g.asteroids.clear();
        g.spawn_asteroid(Size::Medium, Some((100.0, 100.0)));
        g.destroy_asteroid(0);
        assert_eq!(g.asteroids.len(), 2);
        assert!(g.asteroids.iter().all(|a| a.size == Size::Small));
        g.destroy_asteroid(0);
        g.destroy_asteroid(0);
        assert!(g.asteroids.is_empty());
    }

    #[test]
    fn bullet_hit_scores_by_size() {
        let mut g = game();
        g.asteroids.clear();
        g.spawn_asteroid(Size::Small, Some((100.0, 100.0)));
        g.bullets.push(Bullet { x: 100.0, y: 100.0, vx: 0.0, vy: 0.0, life: 1.0 });
        g.check_bullet_hits();
        assert_eq!(g.score, 100);
        assert!(g.bullets.is_empty());
        assert!(g.asteroids.is_empty());
    }

    #[test]
    fn bullet_hits_on_combined_radius() {
        let mut g = game();
        g.asteroids.clear();
        g.spawn_asteroid(Size::Medium, Some((200.0, 200.0)));
        g.bullets.push(Bullet { x: 200.0 + 25.0 + 2.5 + 0.5, y: 200.0, vx: 0.0, vy: 0.0, life: 1.0 });
        g.check_bullet_hits();
        assert_eq!(g.score, 0);
        assert_eq!(g.bullets.len(), 1);

        g.bullets[0].x = 200.0 + 25.0 + 2.0;
        g.check_bullet_hits();
        assert_eq!(g.score, 50);
        assert!(g.bullets.is_empty());
    }

    #[test]
    fn ship_speed_is_capped() {
        let mut g = game();
        g.asteroids.clear();
        g.handle_key_down(Action::Thrust);
        for _ in 0..200 {
            g.update_ship(0.05);
        }
        let ship = g.ship.expect("ship present");
        let speed = (ship.vx * ship.vx + ship.vy * ship.vy).sqrt();
        assert!(speed <= SHIP_MAX_SPEED + 0.01);
        assert!(ship.x.is_finite() && ship.y.is_finite());
    }

    #[test]
    fn held_fire_respects_cooldown() {
        let mut g = game();
        g.handle_key_down(Action::Fire);
        g.update_ship(0.05);
        g.update_ship(0.05);
        assert_eq!(g.bullets.len(), 1);
        for _ in 0..5 {
            g.update_ship(0.05);
        }
        assert_eq!(g.bullets.len(), 2);
    }

    #[test]
    fn invulnerable_ship_survives_collision() {
        let mut g = game();
        let ship = g.ship.expect("ship present");
        g.spawn_asteroid(Size::Large, Some((ship.x, ship.y)));
        g.check_ship_hits();
        assert!(g.ship.is_some());
        if let Some(s) = g.ship.as_mut() {
            s.invulnerable = 0.0;
        }
        g.check_ship_hits();
        assert!(g.ship.is_none());
        assert_eq!(g.lives, 2);
    }

    #[test]
    fn fire_after_game_over_restarts() {
        let mut g = game();
        g.lives = 1;
        g.ship_death();
        assert!(g.game_over);
        g.handle_key_down(Action::Fire);
        assert!(!g.game_over);
        assert_eq!(g.lives, STARTING_LIVES);
        assert_eq!(g.score, 0);
    }

    #[test]
    fn cleared_field_starts_larger_wave() {
        let mut g = game();
        g.asteroids.clear();
        g.update(0.01);
        assert!(g.transition_timer.is_some());
        for _ in 0..31 {
            g.update(0.05);
        }
        assert_eq!(g.level, 2);
        assert_eq!(g.asteroids.len(), 5);
    }

    #[test]
    fn positions_stay_finite() {
        let mut g = game();
        g.handle_key_down(Action::Thrust);
        g.handle_key_down(Action::Left);
        g.handle_key_down(Action::Fire);
        for _ in 0..2000 {
            g.update(0.05);
        }
        assert!(g.asteroids.iter().all(|a| a.x.is_finite() && a.y.is_finite()));
        assert!(g.bullets.iter().all(|b| b.x.is_finite() && b.y.is_finite()));
    }
}
