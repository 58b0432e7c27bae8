use ratatui::style::Color;

// Neon outrun palette shared by every cabinet.
pub const BG: Color = Color::Rgb(14, 14, 26);
pub const LETTERBOX: Color = Color::Rgb(6, 6, 12);
pub const CYAN: Color = Color::Rgb(0, 229, 255);
pub const VIOLET: Color = Color::Rgb(184, 41, 245);
pub const ORANGE: Color = Color::Rgb(255, 69, 0);
pub const WHITE: Color = Color::Rgb(232, 230, 240);
pub const MUTED: Color = Color::Rgb(136, 136, 170);
pub const DIM: Color = Color::Rgb(40, 40, 60);
pub const GREEN: Color = Color::Rgb(80, 220, 80);
pub const WATER: Color = Color::Rgb(10, 30, 90);
pub const ROAD: Color = Color::Rgb(30, 30, 38);
pub const GRASS: Color = Color::Rgb(15, 45, 10);
