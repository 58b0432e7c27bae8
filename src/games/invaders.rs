use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratatui::prelude::*;

use super::hud::{HudOutbox, HudSnapshot};
use super::palette;
use super::physics::{aabb_overlap, clamp_dt, Rect};
use super::surface::Surface;
use super::viewport::Viewport;
use super::{Action, Game};

const GAME_W: f32 = 480.0;
const GAME_H: f32 = 360.0;
const EDGE: f32 = 4.0;

const PLAYER_W: f32 = 26.0;
const PLAYER_H: f32 = 14.0;
const PLAYER_SPEED: f32 = 160.0;
const PLAYER_Y: f32 = GAME_H - 24.0 - PLAYER_H;
const PLAYER_BULLET_SPEED: f32 = 260.0;
const PLAYER_BULLET_W: f32 = 2.0;
const PLAYER_BULLET_H: f32 = 8.0;
const MAX_PLAYER_BULLETS: usize = 2;
const FIRE_COOLDOWN: f32 = 0.25;

const ALIEN_COLS: usize = 11;
const ALIEN_ROWS: usize = 5;
const ALIEN_TOTAL: usize = ALIEN_COLS * ALIEN_ROWS;
const ALIEN_W: f32 = 18.0;
const ALIEN_H: f32 = 12.0;
const ALIEN_PAD_X: f32 = 24.0;
const ALIEN_PAD_Y: f32 = 20.0;
const ALIEN_TOP: f32 = 36.0;
const ALIEN_BASE_SPEED: f32 = 30.0;
const ALIEN_SPEED_INCREMENT: f32 = 8.0;
const ALIEN_SPEEDUP: f32 = 2.5;
const ALIEN_DROP: f32 = 10.0;
const ALIEN_BULLET_SPEED: f32 = 130.0;
const ALIEN_BULLET_W: f32 = 2.0;
const ALIEN_BULLET_H: f32 = 6.0;
const ALIEN_FIRE_BASE_INTERVAL: f32 = 1.2;
const ALIEN_FIRE_MIN_INTERVAL: f32 = 0.25;

const SHIELD_COUNT: usize = 4;
const SHIELD_BLOCK: f32 = 3.0;
const SHIELD_ROWS: usize = 6;
const SHIELD_COLS: usize = 10;
const SHIELD_LINE: f32 = GAME_H - 58.0 - SHIELD_ROWS as f32 * SHIELD_BLOCK;
const SHIELD_PATTERN: [[u8; SHIELD_COLS]; SHIELD_ROWS] = [
    [0, 0, 1, 1, 1, 1, 1, 1, 0, 0],
    [0, 1, 1, 1, 1, 1, 1, 1, 1, 0],
    [1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
    [1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
    [1, 1, 1, 0, 0, 0, 0, 1, 1, 1],
    [1, 1, 0, 0, 0, 0, 0, 0, 1, 1],
];

const STARTING_LIVES: u32 = 3;
const DEATH_TIME: f32 = 0.8;
const RESPAWN_INVULN: f32 = 1.5;
const LEVEL_TRANSITION: f32 = 1.0;

#[derive(Debug, Clone, Copy)]
struct Alien {
    rect: Rect,
    row: usize,
    col: usize,
}

impl Alien {
    fn points(&self) -> u32 {
        match self.row {
            0 | 1 => 30,
            2 | 3 => 20,
            _ => 10,
        }
    }

    fn color(&self) -> Color {
        match self.row {
            0 | 1 => palette::ORANGE,
            2 | 3 => palette::VIOLET,
            _ => palette::CYAN,
        }
    }

    fn glyph(&self, frame: bool) -> char {
        match (self.row, frame) {
            (0 | 1, false) => 'Ѫ',
            (0 | 1, true) => 'Ж',
            (2 | 3, false) => 'Ö',
            (2 | 3, true) => 'Ô',
            (_, false) => 'ᴥ',
            (_, true) => 'ӂ',
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Player {
    x: f32,
    alive: bool,
    /// Dead time while `!alive`, invulnerability while alive.
    timer: f32,
}

impl Player {
    fn rect(&self) -> Rect {
        Rect::new(self.x, PLAYER_Y, PLAYER_W, PLAYER_H)
    }
}

pub struct Invaders {
    rng: StdRng,
    viewport: Viewport,
    hud: HudOutbox,
    score: u32,
    lives: u32,
    level: u32,
    game_over: bool,
    left_held: bool,
    right_held: bool,
    fire_requested: bool,
    fire_lock: bool,
    fire_cooldown: f32,
    player: Player,
    aliens: Vec<Alien>,
    alien_dir: f32,
    alien_fire_timer: f32,
    anim_timer: f32,
    anim_frame: bool,
    shields: Vec<Vec<Rect>>,
    player_bullets: Vec<Rect>,
    alien_bullets: Vec<Rect>,
    transition_timer: Option<f32>,
}

impl Invaders {
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
            left_held: false,
            right_held: false,
            fire_requested: false,
            fire_lock: false,
            fire_cooldown: 0.0,
            player: Player { x: GAME_W / 2.0 - PLAYER_W / 2.0, alive: true, timer: 0.0 },
            aliens: Vec::new(),
            alien_dir: 1.0,
            alien_fire_timer: ALIEN_FIRE_BASE_INTERVAL,
            anim_timer: 0.0,
            anim_frame: false,
            shields: Vec::new(),
            player_bullets: Vec::new(),
            alien_bullets: Vec::new(),
            transition_timer: None,
        }
    }

    fn emit_hud(&mut self) {
        let snap = self.hud();
        self.hud.push(snap);
    }

    fn spawn_aliens(&mut self) {
        let grid_w = ALIEN_COLS as f32 * ALIEN_PAD_X;
        let start_x = (GAME_W - grid_w) / 2.0 + (ALIEN_PAD_X - ALIEN_W) / 2.0;
        self.aliens = (0..ALIEN_ROWS)
            .flat_map(|row| {
                (0..ALIEN_COLS).map(move |col| Alien {
                    rect: Rect::new(
                        start_x + col as f32 * ALIEN_PAD_X,
                        ALIEN_TOP + row as f32 * ALIEN_PAD_Y,
                        ALIEN_W,
                        ALIEN_H,
                    ),
                    row,
                    col,
                })
            })
            .collect();
        self.alien_dir = 1.0;
        self.alien_fire_timer = ALIEN_FIRE_BASE_INTERVAL;
        self.anim_timer = 0.0;
        self.anim_frame = false;
    }

    fn build_shields() -> Vec<Vec<Rect>> {
        let total_w = SHIELD_COUNT as f32 * SHIELD_COLS as f32 * SHIELD_BLOCK;
        let spacing = (GAME_W - total_w) / (SHIELD_COUNT as f32 + 1.0);
        (0..SHIELD_COUNT)
            .map(|s| {
                let sx = spacing + s as f32 * (SHIELD_COLS as f32 * SHIELD_BLOCK + spacing);
                let mut blocks = Vec::new();
                for (r, row) in SHIELD_PATTERN.iter().enumerate() {
                    for (c, &filled) in row.iter().enumerate() {
                        if filled == 1 {
                            blocks.push(Rect::new(
                                sx + c as f32 * SHIELD_BLOCK,
                                SHIELD_LINE + r as f32 * SHIELD_BLOCK,
                                SHIELD_BLOCK,
                                SHIELD_BLOCK,
                            ));
                        }
                    }
                }
                blocks
            })
            .collect()
    }

    fn alive_ratio(&self) -> f32 {
        self.aliens.len() as f32 / ALIEN_TOTAL as f32
    }

    fn update_player(&mut self, dt: f32) {
        let p = &mut self.player;
        if !p.alive {
            self.fire_requested = false;
            p.timer -= dt;
            if p.timer <= 0.0 {
                p.alive = true;
                p.x = GAME_W / 2.0 - PLAYER_W / 2.0;
                p.timer = RESPAWN_INVULN;
            }
            return;
        }
        if p.timer > 0.0 {
            p.timer -= dt;
        }

        if self.left_held {
            p.x -= PLAYER_SPEED * dt;
        }
        if self.right_held {
            p.x += PLAYER_SPEED * dt;
        }
        p.x = p.x.clamp(EDGE, GAME_W - EDGE - PLAYER_W);

        if self.fire_cooldown > 0.0 {
            self.fire_cooldown -= dt;
        }
        if self.fire_requested {
            self.fire_requested = false;
            if self.fire_cooldown <= 0.0 && self.player_bullets.len() < MAX_PLAYER_BULLETS {
                self.player_bullets.push(Rect::new(
                    p.x + PLAYER_W / 2.0 - PLAYER_BULLET_W / 2.0,
                    PLAYER_Y - PLAYER_BULLET_H,
                    PLAYER_BULLET_W,
                    PLAYER_BULLET_H,
                ));
                self.fire_cooldown = FIRE_COOLDOWN;
            }
        }
    }

    fn update_player_bullets(&mut self, dt: f32) {
        for b in &mut self.player_bullets {
            b.y -= PLAYER_BULLET_SPEED * dt;
        }
        self.player_bullets.retain(|b| b.y + b.h >= 0.0);
    }

    fn update_aliens(&mut self, dt: f32) {
        let base = ALIEN_BASE_SPEED + (self.level - 1) as f32 * ALIEN_SPEED_INCREMENT;
        let speed = base * (1.0 + (1.0 - self.alive_ratio()) * ALIEN_SPEEDUP);

        self.anim_timer += dt;
        if self.anim_timer > 0.5 {
            self.anim_timer -= 0.5;
            self.anim_frame = !self.anim_frame;
        }

        let step = speed * self.alien_dir * dt;
        let mut hit_edge = false;
        for a in &mut self.aliens {
            a.rect.x += step;
            if a.rect.x < EDGE || a.rect.x + a.rect.w > GAME_W - EDGE {
                hit_edge = true;
            }
        }
        if hit_edge {
            self.alien_dir = -self.alien_dir;
            for a in &mut self.aliens {
                a.rect.x -= step;
                a.rect.y += ALIEN_DROP;
            }
        }

        if self.aliens.iter().any(|a| a.rect.y + a.rect.h >= SHIELD_LINE) {
            self.trigger_game_over();
            return;
        }

        self.alien_fire_timer -= dt;
        if self.alien_fire_timer <= 0.0 {
            self.alien_fire();
            self.alien_fire_timer = ALIEN_FIRE_MIN_INTERVAL
                + (ALIEN_FIRE_BASE_INTERVAL - ALIEN_FIRE_MIN_INTERVAL) * self.alive_ratio();
        }
    }

    fn alien_fire(&mut self) {
        let mut bottom: Vec<&Alien> = Vec::new();
        for col in 0..ALIEN_COLS {
            if let Some(a) = self.aliens.iter().filter(|a| a.col == col).max_by_key(|a| a.row) {
                bottom.push(a);
            }
        }
        if bottom.is_empty() {
            return;
        }
        let shooter = bottom[self.rng.gen_range(0..bottom.len())].rect;
        self.alien_bullets.push(Rect::new(
            shooter.x + shooter.w / 2.0 - ALIEN_BULLET_W / 2.0,
            shooter.y + shooter.h,
            ALIEN_BULLET_W,
            ALIEN_BULLET_H,
        ));
    }

    fn update_alien_bullets(&mut self, dt: f32) {
        for b in &mut self.alien_bullets {
            b.y += ALIEN_BULLET_SPEED * dt;
        }
        self.alien_bullets.retain(|b| b.y <= GAME_H);
    }

    /// Remove the first shield block hit by `bullet`, returning whether one was.
    fn chip_shield(shields: &mut [Vec<Rect>], bullet: &Rect) -> bool {
        for shield in shields.iter_mut() {
            if let Some(i) = shield.iter().position(|block| aabb_overlap(bullet, block)) {
                shield.swap_remove(i);
                return true;
            }
        }
        false
    }

    fn check_collisions(&mut self) {
        let mut i = self.player_bullets.len();
        while i > 0 {
            i -= 1;
            let bullet = self.player_bullets[i];
            if let Some(ai) = self.aliens.iter().position(|a| aabb_overlap(&bullet, &a.rect)) {
                let alien = self.aliens.remove(ai);
                self.player_bullets.remove(i);
                self.score += alien.points();
                self.emit_hud();
            } else if Self::chip_shield(&mut self.shields, &bullet) {
                self.player_bullets.remove(i);
            }
        }

        if self.player.alive && self.player.timer <= 0.0 {
            let body = self.player.rect();
            if let Some(bi) = self.alien_bullets.iter().rposition(|b| aabb_overlap(b, &body)) {
                self.alien_bullets.remove(bi);
                self.player_hit();
            }
        }

        self.alien_bullets.retain(|b| !Self::chip_shield(&mut self.shields, b));

        for a in &self.aliens {
            for shield in self.shields.iter_mut() {
                shield.retain(|block| !aabb_overlap(&a.rect, block));
            }
        }

        if self.aliens.is_empty() && self.transition_timer.is_none() && !self.game_over {
            tracing::debug!(level = self.level, "invaders: wave cleared");
            self.transition_timer = Some(LEVEL_TRANSITION);
        }
    }

    fn player_hit(&mut self) {
        self.lives = self.lives.saturating_sub(1);
        self.player.alive = false;
        self.player.timer = DEATH_TIME;
        self.fire_requested = false;
        self.emit_hud();
        if self.lives == 0 {
            self.trigger_game_over();
        }
    }

    fn trigger_game_over(&mut self) {
        self.game_over = true;
        tracing::debug!(score = self.score, level = self.level, "invaders: game over");
        self.emit_hud();
    }

    fn start_next_level(&mut self) {
        self.level += 1;
        self.spawn_aliens();
        self.shields = Self::build_shields();
        self.player_bullets.clear();
        self.alien_bullets.clear();
        self.emit_hud();
    }
}

impl Default for Invaders {
    fn default() -> Self {
        Self::new()
    }
}

impl Game for Invaders {
    fn init(&mut self, width: u16, height: u16) {
        self.viewport.fit(width, height);
        self.score = 0;
        self.lives = STARTING_LIVES;
        self.level = 1;
        self.game_over = false;
        self.left_held = false;
        self.right_held = false;
        self.fire_requested = false;
        self.fire_lock = false;
        self.fire_cooldown = 0.0;
        self.player = Player { x: GAME_W / 2.0 - PLAYER_W / 2.0, alive: true, timer: 0.0 };
        self.spawn_aliens();
        self.shields = Self::build_shields();
        self.player_bullets.clear();
        self.alien_bullets.clear();
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

        self.update_player(dt);
        self.update_player_bullets(dt);
        self.update_aliens(dt);
        if self.game_over {
            return;
        }
        self.update_alien_bullets(dt);
        self.check_collisions();
    }

    fn render(&self, surface: &mut Surface) {
        let vp = &self.viewport;
        surface.play_field(vp, palette::BG);

        let shield_style = Style::default().fg(palette::CYAN);
        for block in self.shields.iter().flatten() {
            surface.rect(vp, block.x, block.y, block.w, block.h, '▓', shield_style);
        }

        for a in &self.aliens {
            let r = a.rect;
            surface.point(vp, r.x + r.w / 2.0, r.y + r.h / 2.0, a.glyph(self.anim_frame), Style::default().fg(a.color()));
        }

        let p = &self.player;
        let blink = p.alive && p.timer > 0.0 && (p.timer * 10.0) as i32 % 2 == 0;
        if p.alive && !blink {
            let r = p.rect();
            let style = Style::default().fg(palette::CYAN);
            surface.rect(vp, r.x, r.y + r.h / 2.0, r.w, r.h / 2.0, '▀', style);
            surface.point(vp, r.x + r.w / 2.0, r.y, '▲', style);
        }

        for b in &self.player_bullets {
            surface.point(vp, b.x, b.y, '│', Style::default().fg(palette::WHITE));
        }
        for b in &self.alien_bullets {
            surface.point(vp, b.x, b.y, '¦', Style::default().fg(palette::ORANGE));
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
        match action {
            Action::Left => self.left_held = true,
            Action::Right => self.right_held = true,
            Action::Fire => {
                if !self.fire_lock {
                    self.fire_requested = true;
                    self.fire_lock = true;
                }
            }
            _ => {}
        }
    }

    fn handle_key_up(&mut self, action: Action) {
        match action {
            Action::Left => self.left_held = false,
            Action::Right => self.right_held = false,
            Action::Fire => self.fire_lock = false,
            _ => {}
        }
    }

    fn destroy(&mut self) {
        self.aliens.clear();
        self.shields.clear();
        self.player_bullets.clear();
        self.alien_bullets.clear();
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

    fn game() -> Invaders {
        let mut g = Invaders::with_seed(11);
        g.init(80, 24);
        g
    }

    #[test]
    fn init_builds_grid_and_shields() {
        let g = game();
        assert_eq!(g.aliens.len(), 55);
        assert_eq!(g.shields.len(), 4);
        let per_shield = SHIELD_PATTERN.iter().flatten().filter(|&&c| c == 1).count();
        assert!(g.shields.iter().all(|s| s.len() == per_shield));
    }

    #[test]
    fn fire_spawns_one_bullet_within_cooldown() {
        let mut g = game();
        g.handle_key_down(Action::Fire);
        g.update(0.016);
        assert_eq!(g.player_bullets.len(), 1);
        g.update(0.016);
        assert_eq!(g.player_bullets.len(), 1);
    }

    #[test]
    fn fire_latch_needs_release() {
        let mut g = game();
        g.handle_key_down(Action::Fire);
        g.update(0.016);
        g.handle_key_down(Action::Fire);
        for _ in 0..20 {
            g.update(0.016);
        }
        assert!(g.player_bullets.len() <= 1);
        g.handle_key_up(Action::Fire);
        g.handle_key_down(Action::Fire);
        g.update(0.016);
        assert!(!g.fire_requested);
    }

    #[test]
    fn cooldown_blocks_rapid_second_shot() {
        let mut g = game();
        g.handle_key_down(Action::Fire);
        g.update(0.016);
        g.handle_key_up(Action::Fire);
        g.handle_key_down(Action::Fire);
        g.update(0.016);
        assert_eq!(g.player_bullets.len(), 1);
    }

    #[test]
    fn bullet_kills_alien_and_scores() {
        let mut g = game();
        let target = g.aliens[0].rect;
        g.player_bullets.push(Rect::new(target.x + 2.0, target.y + 2.0, PLAYER_BULLET_W, PLAYER_BULLET_H));
        g.check_collisions();
        assert_eq!(g.aliens.len(), 54);
        assert_eq!(g.score, 30);
        assert!(g.player_bullets.is_empty());
    }

    #[test]
    fn aliens_drop_and_reverse_at_edge() {
        let mut g = game();
        let max_x = g.aliens.iter().map(|a| a.rect.x).fold(f32::MIN, f32::max);
        let shift = GAME_W - EDGE - ALIEN_W - max_x - 0.1;
        for a in &mut g.aliens {
            a.rect.x += shift;
        }
        let y0 = g.aliens[0].rect.y;
        g.update_aliens(0.05);
        assert_eq!(g.alien_dir, -1.0);
        assert_eq!(g.aliens[0].rect.y, y0 + ALIEN_DROP);
    }

    #[test]
    fn reaching_shield_line_ends_game() {
        let mut g = game();
        for a in &mut g.aliens {
            a.rect.y = SHIELD_LINE - ALIEN_H;
        }
        g.update(0.016);
        assert!(g.game_over);
    }

    #[test]
    fn hit_player_respawns_invulnerable() {
        let mut g = game();
        g.alien_bullets.push(Rect::new(g.player.x + 5.0, PLAYER_Y + 2.0, ALIEN_BULLET_W, ALIEN_BULLET_H));
        g.check_collisions();
        assert_eq!(g.lives, 2);
        assert!(!g.player.alive);
        g.update_player(0.5);
        g.update_player(0.5);
        assert!(g.player.alive);
        assert_eq!(g.player.timer, RESPAWN_INVULN);
    }

    #[test]
    fn fire_pressed_while_dead_is_dropped() {
        let mut g = game();
        g.player_hit();
        g.handle_key_down(Action::Fire);
        g.update_player(0.5);
        g.update_player(0.5);
        assert!(g.player.alive);
        g.update_player(0.016);
        assert!(g.player_bullets.is_empty());
    }

    #[test]
    fn clearing_wave_starts_next_level() {
        let mut g = game();
        g.aliens.clear();
        g.check_collisions();
        assert!(g.transition_timer.is_some());
        for _ in 0..25 {
            g.update(0.05);
        }
        assert_eq!(g.level, 2);
        assert_eq!(g.aliens.len(), 55);
    }
}
