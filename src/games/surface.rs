use ratatui::prelude::*;

use super::palette;
use super::viewport::Viewport;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub ch: char,
    pub style: Style,
}

impl Cell {
    fn blank(bg: Color) -> Self {
        Self { ch: ' ', style: Style::default().bg(bg) }
    }
}

/// Grid of styled terminal cells that games draw into.
///
/// Writes outside the grid are ignored, so games can draw entities that are
/// partially off screen without bounds checks of their own.
#[derive(Debug, Clone)]
pub struct Surface {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl Surface {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::blank(palette::BG); width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        if width != self.width || height != self.height {
            *self = Surface::new(width, height);
        }
    }

    pub fn clear(&mut self, bg: Color) {
        self.cells.fill(Cell::blank(bg));
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn get(&self, x: i32, y: i32) -> Option<&Cell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    /// Set a cell's glyph and foreground, keeping its existing background
    /// unless `style` specifies one.
    pub fn put(&mut self, x: i32, y: i32, ch: char, style: Style) {
        if let Some(i) = self.index(x, y) {
            let cell = &mut self.cells[i];
            cell.ch = ch;
            cell.style = cell.style.patch(style);
        }
    }

    pub fn fill(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, ch: char, style: Style) {
        for y in y0.max(0)..y1.min(self.height as i32) {
            for x in x0.max(0)..x1.min(self.width as i32) {
                self.put(x, y, ch, style);
            }
        }
    }

    pub fn text(&mut self, x: i32, y: i32, text: &str, style: Style) {
        for (i, ch) in text.chars().enumerate() {
            self.put(x + i as i32, y, ch, style);
        }
    }

    /// Centered text on row `y` of the letterboxed area.
    pub fn banner(&mut self, vp: &Viewport, y: f32, text: &str, style: Style) {
        let (x0, _, x1, _) = vp.play_area();
        let (_, cy) = vp.to_cell(0.0, y);
        let len = text.chars().count() as i32;
        self.text(x0 + ((x1 - x0) - len) / 2, cy, text, style);
    }

    /// Paint the letterboxed play area with the game background, leaving the
    /// bars around it dark.
    pub fn play_field(&mut self, vp: &Viewport, bg: Color) {
        self.clear(palette::LETTERBOX);
        let (x0, y0, x1, y1) = vp.play_area();
        self.fill(x0, y0, x1, y1, ' ', Style::default().bg(bg));
    }

    pub fn point(&mut self, vp: &Viewport, x: f32, y: f32, ch: char, style: Style) {
        let (cx, cy) = vp.to_cell(x, y);
        self.put(cx, cy, ch, style);
    }

    pub fn rect(&mut self, vp: &Viewport, x: f32, y: f32, w: f32, h: f32, ch: char, style: Style) {
        let (x0, y0, x1, y1) = vp.rect_to_cells(x, y, w, h);
        self.fill(x0, y0, x1, y1, ch, style);
    }

    /// Straight segment between two virtual points, stepped in cell space.
    pub fn line(&mut self, vp: &Viewport, from: (f32, f32), to: (f32, f32), ch: char, style: Style) {
        let (x0, y0) = vp.to_cell(from.0, from.1);
        let (x1, y1) = vp.to_cell(to.0, to.1);
        let steps = (x1 - x0).abs().max((y1 - y0).abs()).max(1);
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let x = x0 as f32 + (x1 - x0) as f32 * t;
            let y = y0 as f32 + (y1 - y0) as f32 * t;
            self.put(x.round() as i32, y.round() as i32, ch, style);
        }
    }

    /// Convert to ratatui lines, one per row.
    pub fn to_lines(&self) -> Vec<Line<'static>> {
        self.cells
            .chunks(self.width.max(1) as usize)
            .take(self.height as usize)
            .map(|row| {
                let spans: Vec<Span<'static>> = row
                    .iter()
                    .map(|c| Span::styled(String::from(c.ch), c.style))
                    .collect();
                Line::from(spans)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_writes_are_ignored() {
        let mut s = Surface::new(4, 3);
        s.put(-1, 0, 'x', Style::default());
        s.put(4, 0, 'x', Style::default());
        s.put(0, 3, 'x', Style::default());
        assert!(s.to_lines().iter().all(|l| l.spans.iter().all(|sp| sp.content == " ")));
    }

    #[test]
    fn put_keeps_background() {
        let mut s = Surface::new(2, 1);
        s.clear(Color::Blue);
        s.put(0, 0, '#', Style::default().fg(Color::Red));
        let cell = s.get(0, 0).copied();
        assert_eq!(cell.map(|c| c.ch), Some('#'));
        assert_eq!(cell.and_then(|c| c.style.bg), Some(Color::Blue));
        assert_eq!(cell.and_then(|c| c.style.fg), Some(Color::Red));
    }

    #[test]
    fn to_lines_matches_dimensions() {
        let mut s = Surface::new(5, 2);
        s.text(1, 1, "hey", Style::default());
        let lines = s.to_lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].spans.len(), 5);
        assert_eq!(lines[1].spans[2].content, "e");
    }
}
