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
const PLAYER_ZONE_ROWS: i32 = 6;
const PLAYER_ZONE_TOP: f32 = GAME_H - PLAYER_ZONE_ROWS as f32 * CELL;

const PLAYER_SIZE: f32 = 12.0;
const PLAYER_SPEED: f32 = 180.0;
const BULLET_SPEED: f32 = 350.0;
const BULLET_W: f32 = 2.0;
const BULLET_H: f32 = 8.0;
const FIRE_COOLDOWN: f32 = 0.15;

const CHAIN_BASE_SPEED: f32 = 80.0;
const CHAIN_SPEED_INCREMENT: f32 = 15.0;
const STARTING_SEGMENTS: i32 = 10;

const SPIDER_SPEED: f32 = 120.0;
const SPIDER_SIZE: f32 = 10.0;
const SPIDER_INTERVAL: f32 = 8.0;

const MUSHROOM_HP: u8 = 4;
const STARTING_MUSHROOMS: usize = 25;

const STARTING_LIVES: u32 = 3;
const DEATH_TIME: f32 = 0.8;
const RESPAWN_INVULN: f32 = 1.5;
const LEVEL_TRANSITION: f32 = 1.0;

const SCORE_SEGMENT: u32 = 10;
const SCORE_MUSHROOM: u32 = 1;
const SCORE_SPIDER: u32 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cell {
    col: i32,
    row: i32,
}

impl Cell {
    fn center(self) -> (f32, f32) {
        (self.col as f32 * CELL + CELL / 2.0, self.row as f32 * CELL + CELL / 2.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct Mushroom {
    at: Cell,
    hp: u8,
}

/// A centipede: head first, each segment following the one ahead.
#[derive(Debug, Clone)]
struct Chain {
    segments: Vec<Cell>,
    dir: i32,
    speed: f32,
    move_accum: f32,
}

#[derive(Debug, Clone, Copy)]
struct Spider {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
}

#[derive(Debug, Clone, Copy)]
struct Bullet {
    x: f32,
    y: f32,
    /// Where the bullet was before this frame's step.
    prev_y: f32,
}

impl Bullet {
    fn at(x: f32, y: f32) -> Self {
        Self { x, y, prev_y: y }
    }

    /// Cells the bullet crossed this frame, nearest its old position first.
    fn swept_cells(&self) -> impl Iterator<Item = Cell> {
        let col = (self.x / CELL).floor() as i32;
        let top = (self.y / CELL).floor() as i32;
        let bottom = (self.prev_y / CELL).floor() as i32;
        (top..=bottom.max(top)).rev().map(move |row| Cell { col, row })
    }
}

#[derive(Debug, Clone, Copy)]
struct Player {
    x: f32,
    y: f32,
    alive: bool,
    /// Dead time while `!alive`, invulnerability while alive.
    timer: f32,
}

impl Player {
    fn spawn(timer: f32) -> Self {
        Self { x: GAME_W / 2.0, y: GAME_H - PLAYER_SIZE * 2.0, alive: true, timer }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Controls {
    left: bool,
    right: bool,
    up: bool,
    down: bool,
    fire: bool,
}

pub struct Centipede {
    rng: StdRng,
    viewport: Viewport,
    hud: HudOutbox,
    score: u32,
    lives: u32,
    level: u32,
    game_over: bool,
    controls: Controls,
    player: Player,
    bullets: Vec<Bullet>,
    fire_cooldown: f32,
    mushrooms: Vec<Mushroom>,
    chains: Vec<Chain>,
    spider: Option<Spider>,
    spider_timer: f32,
    transition_timer: Option<f32>,
}

impl Centipede {
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
            player: Player::spawn(0.0),
            bullets: Vec::new(),
            fire_cooldown: 0.0,
            mushrooms: Vec::new(),
            chains: Vec::new(),
            spider: None,
            spider_timer: SPIDER_INTERVAL,
            transition_timer: None,
        }
    }

    fn emit_hud(&mut self) {
        let snap = self.hud();
        self.hud.push(snap);
    }

    fn mushroom_at(&self, at: Cell) -> Option<usize> {
        self.mushrooms.iter().position(|m| m.at == at)
    }

    fn place_mushroom(&mut self, at: Cell) {
        if self.mushroom_at(at).is_none() {
            self.mushrooms.push(Mushroom { at, hp: MUSHROOM_HP });
        }
    }

    fn seed_mushrooms(&mut self) {
        self.mushrooms.clear();
        for _ in 0..STARTING_MUSHROOMS {
            let at = Cell {
                col: self.rng.gen_range(0..COLS),
                row: self.rng.gen_range(2..ROWS - PLAYER_ZONE_ROWS),
            };
            self.place_mushroom(at);
        }
    }

    fn spawn_chain(&mut self) {
        let speed = CHAIN_BASE_SPEED + (self.level - 1) as f32 * CHAIN_SPEED_INCREMENT;
        let segments = (0..STARTING_SEGMENTS).map(|i| Cell { col: COLS - 1 - i, row: 0 }).collect();
        self.chains = vec![Chain { segments, dir: -1, speed, move_accum: 0.0 }];
    }

    fn segment_count(&self) -> usize {
        self.chains.iter().map(|c| c.segments.len()).sum()
    }

    fn update_player(&mut self, dt: f32) {
        let c = self.controls;
        let p = &mut self.player;
        if c.left {
            p.x -= PLAYER_SPEED * dt;
        }
        if c.right {
            p.x += PLAYER_SPEED * dt;
        }
        if c.up {
            p.y -= PLAYER_SPEED * dt;
        }
        if c.down {
            p.y += PLAYER_SPEED * dt;
        }
        p.x = p.x.clamp(PLAYER_SIZE, GAME_W - PLAYER_SIZE);
        p.y = p.y.clamp(PLAYER_ZONE_TOP, GAME_H - PLAYER_SIZE);

        self.fire_cooldown -= dt;
        if c.fire && self.fire_cooldown <= 0.0 {
            self.bullets.push(Bullet::at(p.x, p.y - PLAYER_SIZE));
            self.fire_cooldown = FIRE_COOLDOWN;
        }
    }

    fn update_bullets(&mut self, dt: f32) {
        for b in &mut self.bullets {
            b.prev_y = b.y;
            b.y -= BULLET_SPEED * dt;
        }
        self.bullets.retain(|b| b.y + BULLET_H >= 0.0);
    }

    fn update_chains(&mut self, dt: f32) {
        let mushrooms = &self.mushrooms;
        let blocked = |at: Cell| mushrooms.iter().any(|m| m.at == at);
        for chain in &mut self.chains {
            chain.move_accum += chain.speed * dt;
            while chain.move_accum >= CELL && !chain.segments.is_empty() {
                chain.move_accum -= CELL;
                let head = chain.segments[0];
                let mut next = Cell { col: head.col + chain.dir, row: head.row };
                if next.col < 0 || next.col >= COLS || blocked(next) {
                    next = Cell { col: head.col, row: (head.row + 1).min(ROWS - 1) };
                    chain.dir = -chain.dir;
                }
                chain.segments.pop();
                chain.segments.insert(0, next);
            }
        }
    }

    fn update_spider(&mut self, dt: f32) {
        self.spider_timer -= dt;
        if self.spider.is_none() && self.spider_timer <= 0.0 {
            let from_left = self.rng.gen_bool(0.5);
            let zone_offset = self.rng.gen::<f32>() * PLAYER_ZONE_ROWS as f32 + 1.0;
            self.spider = Some(Spider {
                x: if from_left { -SPIDER_SIZE } else { GAME_W + SPIDER_SIZE },
                y: GAME_H - zone_offset * CELL,
                vx: if from_left { SPIDER_SPEED } else { -SPIDER_SPEED },
                vy: (self.rng.gen::<f32>() - 0.5) * SPIDER_SPEED,
            });
        }

        let Some(mut s) = self.spider else {
            return;
        };
        s.x += s.vx * dt;
        s.y += s.vy * dt;
        if s.y < PLAYER_ZONE_TOP || s.y > GAME_H - SPIDER_SIZE {
            s.vy = -s.vy;
        }
        if s.x < -SPIDER_SIZE * 3.0 || s.x > GAME_W + SPIDER_SIZE * 3.0 {
            self.spider = None;
            self.spider_timer = SPIDER_INTERVAL;
            return;
        }
        self.spider = Some(s);

        let under = Cell { col: (s.x / CELL).floor() as i32, row: (s.y / CELL).floor() as i32 };
        if let Some(i) = self.mushroom_at(under) {
            self.mushrooms.swap_remove(i);
        }
    }

    /// Remove the segment at `seg` from chain `chain`; everything behind it
    /// becomes a new chain heading the other way.
    fn split_chain(&mut self, chain: usize, seg: usize) {
        let Some(c) = self.chains.get_mut(chain) else {
            return;
        };
        let mut tail = c.segments.split_off(seg);
        tail.remove(0);
        let (dir, speed) = (c.dir, c.speed);
        let emptied = c.segments.is_empty();
        if !tail.is_empty() {
            self.chains.push(Chain { segments: tail, dir: -dir, speed, move_accum: 0.0 });
        }
        if emptied {
            self.chains.remove(chain);
        }
    }

    fn find_segment_hit(&self, b: &Bullet) -> Option<(usize, usize)> {
        self.chains.iter().enumerate().find_map(|(ci, chain)| {
            chain.segments.iter().position(|seg| {
                let (cx, cy) = seg.center();
                (b.x - cx).abs() < CELL / 2.0 + BULLET_W && (b.y - cy).abs() < CELL / 2.0 + BULLET_H
            })
            .map(|si| (ci, si))
        })
    }

    fn check_collisions(&mut self) {
        let mut bi = self.bullets.len();
        while bi > 0 {
            bi -= 1;
            let b = self.bullets[bi];

            if let Some(mi) = b.swept_cells().find_map(|cell| self.mushroom_at(cell)) {
                let m = &mut self.mushrooms[mi];
                m.hp = m.hp.saturating_sub(1);
                if m.hp == 0 {
                    self.mushrooms.swap_remove(mi);
                    self.score += SCORE_MUSHROOM;
                    self.emit_hud();
                }
                self.bullets.remove(bi);
                continue;
            }

            if let Some((ci, si)) = self.find_segment_hit(&b) {
                let at = self.chains[ci].segments[si];
                self.score += SCORE_SEGMENT;
                self.emit_hud();
                self.place_mushroom(at);
                self.split_chain(ci, si);
                self.bullets.remove(bi);
                continue;
            }

            if let Some(s) = self.spider {
                if (b.x - s.x).abs() < SPIDER_SIZE + BULLET_W && (b.y - s.y).abs() < SPIDER_SIZE + BULLET_H {
                    self.score += SCORE_SPIDER;
                    self.spider = None;
                    self.spider_timer = SPIDER_INTERVAL;
                    self.bullets.remove(bi);
                    tracing::debug!("centipede: spider shot");
                    self.emit_hud();
                }
            }
        }

        let p = self.player;
        if !p.alive || p.timer > 0.0 {
            return;
        }
        let touched_chain = self.chains.iter().flat_map(|c| c.segments.iter()).any(|seg| {
            let (cx, cy) = seg.center();
            (p.x - cx).abs() < PLAYER_SIZE + CELL / 3.0 && (p.y - cy).abs() < PLAYER_SIZE + CELL / 3.0
        });
        let touched_spider = self.spider.is_some_and(|s| {
            (p.x - s.x).abs() < PLAYER_SIZE + SPIDER_SIZE && (p.y - s.y).abs() < PLAYER_SIZE + SPIDER_SIZE
        });
        if touched_chain || touched_spider {
            self.player_hit();
        }
    }

    fn player_hit(&mut self) {
        self.lives = self.lives.saturating_sub(1);
        self.player.alive = false;
        self.player.timer = DEATH_TIME;
        self.bullets.clear();
        if self.lives == 0 {
            self.game_over = true;
            tracing::debug!(score = self.score, level = self.level, "centipede: game over");
        }
        self.emit_hud();
    }

    fn set_control(&mut self, action: Action, on: bool) {
        match action {
            Action::Left => self.controls.left = on,
            Action::Right => self.controls.right = on,
            Action::Up => self.controls.up = on,
            Action::Down => self.controls.down = on,
            Action::Fire => self.controls.fire = on,
            _ => {}
        }
    }
}

impl Default for Centipede {
    fn default() -> Self {
        Self::new()
    }
}

impl Game for Centipede {
    fn init(&mut self, width: u16, height: u16) {
        self.viewport.fit(width, height);
        self.score = 0;
        self.lives = STARTING_LIVES;
        self.level = 1;
        self.game_over = false;
        self.controls = Controls::default();
        self.player = Player::spawn(0.0);
        self.bullets.clear();
        self.fire_cooldown = 0.0;
        self.spider = None;
        self.spider_timer = SPIDER_INTERVAL;
        self.transition_timer = None;
        self.seed_mushrooms();
        self.spawn_chain();
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
                self.level += 1;
                tracing::debug!(level = self.level, "centipede: next wave");
                self.spawn_chain();
                self.emit_hud();
            } else {
                self.transition_timer = Some(t);
            }
            return;
        }

        if !self.player.alive {
            self.player.timer -= dt;
            if self.player.timer <= 0.0 {
                self.player = Player::spawn(RESPAWN_INVULN);
            }
            return;
        }
        if self.player.timer > 0.0 {
            self.player.timer -= dt;
        }

        self.update_player(dt);
        self.update_bullets(dt);
        self.update_chains(dt);
        self.update_spider(dt);
        self.check_collisions();

        if self.segment_count() == 0 && !self.game_over {
            self.transition_timer = Some(LEVEL_TRANSITION);
        }
    }

    fn render(&self, surface: &mut Surface) {
        let vp = &self.viewport;
        surface.play_field(vp, palette::BG);
        surface.rect(vp, 0.0, PLAYER_ZONE_TOP, GAME_W, GAME_H - PLAYER_ZONE_TOP, ' ', Style::default().bg(palette::DIM));

        for m in &self.mushrooms {
            let ch = match m.hp {
                4 => '♣',
                3 => '♠',
                2 => '▴',
                _ => '·',
            };
            let (x, y) = m.at.center();
            surface.point(vp, x, y, ch, Style::default().fg(palette::ORANGE));
        }

        for chain in &self.chains {
            for (i, seg) in chain.segments.iter().enumerate().rev() {
                let (x, y) = seg.center();
                let (ch, color) = if i == 0 { ('◉', palette::CYAN) } else { ('●', palette::VIOLET) };
                surface.point(vp, x, y, ch, Style::default().fg(color));
            }
        }

        if let Some(s) = self.spider {
            surface.point(vp, s.x, s.y, 'Ж', Style::default().fg(palette::WHITE));
        }

        for b in &self.bullets {
            surface.point(vp, b.x, b.y, '|', Style::default().fg(palette::WHITE));
        }

        let p = &self.player;
        let blink = p.timer > 0.0 && (p.timer * 10.0) as i32 % 2 == 0;
        if p.alive && !blink {
            surface.point(vp, p.x, p.y, '▲', Style::default().fg(palette::CYAN).add_modifier(Modifier::BOLD));
        }

        if self.transition_timer.is_some() {
            let style = Style::default().fg(palette::CYAN).add_modifier(Modifier::BOLD);
            surface.banner(vp, GAME_H / 2.0, &format!("WAVE {}", self.level + 1), style);
        }
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.viewport.fit(width, height);
    }

    fn handle_key_down(&mut self, action: Action) {
        self.set_control(action, true);
    }

    fn handle_key_up(&mut self, action: Action) {
        self.set_control(action, false);
    }

    fn destroy(&mut self) {
        self.controls = Controls::default();
        self.bullets.clear();
        self.mushrooms.clear();
        self.chains.clear();
        self.spider = None;
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

    fn game() -> Centipede {
        let mut g = Centipede::with_seed(21);
        g.init(80, 24);
        g
    }

    #[test]
    fn init_layout() {
        let g = game();
        assert_eq!(g.segment_count(), 10);
        assert_eq!(g.chains[0].segments[0], Cell { col: 31, row: 0 });
        assert!(!g.mushrooms.is_empty() && g.mushrooms.len() <= 25);
        assert!(g.mushrooms.iter().all(|m| m.at.row >= 2 && m.at.row < ROWS - PLAYER_ZONE_ROWS));
    }

    #[test]
    fn chain_steps_one_cell_at_a_time() {
        let mut g = game();
        g.mushrooms.clear();
        g.update_chains(CELL / 80.0 + 0.001);
        assert_eq!(g.chains[0].segments[0], Cell { col: 30, row: 0 });
        assert_eq!(g.chains[0].segments[1], Cell { col: 31, row: 0 });
        assert_eq!(g.chains[0].segments[9], Cell { col: 23, row: 0 });
        assert_eq!(g.chains[0].segments.len(), 10);
    }

    #[test]
    fn mushroom_turns_chain_down() {
        let mut g = game();
        g.mushrooms = vec![Mushroom { at: Cell { col: 30, row: 0 }, hp: MUSHROOM_HP }];
        g.update_chains(CELL / 80.0 + 0.001);
        assert_eq!(g.chains[0].segments[0], Cell { col: 31, row: 1 });
        assert_eq!(g.chains[0].dir, 1);
    }

    #[test]
    fn segment_hit_splits_and_drops_mushroom() {
        let mut g = game();
        g.mushrooms.clear();
        let hit = g.chains[0].segments[4];
        let (x, y) = hit.center();
        g.bullets = vec![Bullet::at(x, y)];
        g.check_collisions();
        assert_eq!(g.score, 10);
        assert_eq!(g.chains.len(), 2);
        assert_eq!(g.chains[0].segments.len(), 4);
        assert_eq!(g.chains[1].segments.len(), 5);
        assert_eq!(g.chains[1].dir, 1);
        assert!(g.mushroom_at(hit).is_some());
    }

    #[test]
    fn head_hit_leaves_single_chain() {
        let mut g = game();
        g.mushrooms.clear();
        let (x, y) = g.chains[0].segments[0].center();
        g.bullets = vec![Bullet::at(x, y)];
        g.check_collisions();
        assert_eq!(g.chains.len(), 1);
        assert_eq!(g.segment_count(), 9);
        assert_eq!(g.chains[0].dir, 1);
    }

    #[test]
    fn mushroom_takes_four_hits() {
        let mut g = game();
        let at = Cell { col: 5, row: 10 };
        g.mushrooms = vec![Mushroom { at, hp: MUSHROOM_HP }];
        let (x, y) = at.center();
        for hit in 1..=4 {
            g.bullets = vec![Bullet::at(x, y)];
            g.check_collisions();
            assert_eq!(g.mushroom_at(at).is_none(), hit == 4);
        }
        assert_eq!(g.score, 1);
    }

    #[test]
    fn fast_bullet_cannot_skip_a_mushroom() {
        let mut g = game();
        let at = Cell { col: 5, row: 10 };
        g.mushrooms = vec![Mushroom { at, hp: MUSHROOM_HP }];
        let (x, _) = at.center();
        g.bullets = vec![Bullet::at(x, 11.0 * CELL + 1.0)];
        g.update_bullets(0.05);
        assert!(g.bullets[0].y < 10.0 * CELL);
        g.check_collisions();
        assert!(g.bullets.is_empty());
        assert_eq!(g.mushrooms[0].hp, MUSHROOM_HP - 1);
    }

    #[test]
    fn held_fire_repeats_on_cooldown() {
        let mut g = game();
        g.handle_key_down(Action::Fire);
        g.update_player(0.016);
        g.update_player(0.1);
        assert_eq!(g.bullets.len(), 1);
        g.update_player(0.1);
        assert_eq!(g.bullets.len(), 2);
    }

    #[test]
    fn player_stays_in_zone() {
        let mut g = game();
        g.handle_key_down(Action::Up);
        for _ in 0..100 {
            g.update_player(0.05);
        }
        assert_eq!(g.player.y, PLAYER_ZONE_TOP);
    }

    #[test]
    fn contact_kills_then_respawns_invulnerable() {
        let mut g = game();
        g.chains[0].segments[0] = Cell { col: 16, row: 22 };
        g.player.x = 16.0 * CELL + CELL / 2.0;
        g.player.y = 22.0 * CELL + CELL / 2.0;
        g.check_collisions();
        assert_eq!(g.lives, 2);
        assert!(!g.player.alive);
        for _ in 0..17 {
            g.update(0.05);
        }
        assert!(g.player.alive);
        assert!(g.player.timer > 1.0);
    }

    #[test]
    fn cleared_wave_advances_level() {
        let mut g = game();
        g.chains.clear();
        g.update(0.016);
        for _ in 0..21 {
            g.update(0.05);
        }
        assert_eq!(g.level, 2);
        assert!((g.chains[0].speed - 95.0).abs() < 1e-4);
    }
}
