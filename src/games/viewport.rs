//! Letterbox transform from a game's virtual coordinate space to terminal cells.

/// Terminal cells are roughly twice as tall as they are wide.
pub const CELL_ASPECT: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    virtual_w: f32,
    virtual_h: f32,
    cols: u16,
    rows: u16,
    scale: f32,
    offset_x: f32,
    offset_y: f32,
}

impl Viewport {
    pub fn new(virtual_w: f32, virtual_h: f32) -> Self {
        Self {
            virtual_w,
            virtual_h,
            cols: 0,
            rows: 0,
            scale: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    /// Recompute scale and offsets for a surface of `cols` x `rows` cells,
    /// preserving the virtual aspect ratio and centering the result.
    pub fn fit(&mut self, cols: u16, rows: u16) {
        self.cols = cols;
        self.rows = rows;
        if cols == 0 || rows == 0 || self.virtual_w <= 0.0 || self.virtual_h <= 0.0 {
            self.scale = 0.0;
            self.offset_x = 0.0;
            self.offset_y = 0.0;
            return;
        }

        // Physical units: one unit per column, CELL_ASPECT units per row.
        let pw = cols as f32;
        let ph = rows as f32 * CELL_ASPECT;
        let aspect = self.virtual_w / self.virtual_h;
        let (mut w, mut h) = (pw, ph);
        if w / h > aspect {
            w = h * aspect;
        } else {
            h = w / aspect;
        }
        self.scale = w / self.virtual_w;
        self.offset_x = (pw - w) / 2.0;
        self.offset_y = (ph - h) / 2.0;
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn virtual_size(&self) -> (f32, f32) {
        (self.virtual_w, self.virtual_h)
    }

    pub fn surface_size(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }

    /// Map a virtual point to the cell that contains it.
    pub fn to_cell(&self, x: f32, y: f32) -> (i32, i32) {
        let px = self.offset_x + x * self.scale;
        let py = (self.offset_y + y * self.scale) / CELL_ASPECT;
        (px.floor() as i32, py.floor() as i32)
    }

    /// Cell span `[x0, x1) x [y0, y1)` covered by a virtual rectangle.
    /// Never empty: tiny rectangles still occupy their origin cell.
    pub fn rect_to_cells(&self, x: f32, y: f32, w: f32, h: f32) -> (i32, i32, i32, i32) {
        let (x0, y0) = self.to_cell(x, y);
        let (mut x1, mut y1) = self.to_cell(x + w, y + h);
        if x1 <= x0 {
            x1 = x0 + 1;
        }
        if y1 <= y0 {
            y1 = y0 + 1;
        }
        (x0, y0, x1, y1)
    }

    /// Cell span of the whole letterboxed play area.
    pub fn play_area(&self) -> (i32, i32, i32, i32) {
        self.rect_to_cells(0.0, 0.0, self.virtual_w, self.virtual_h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_surface_is_pillarboxed() {
        let mut vp = Viewport::new(480.0, 360.0);
        // 200 cols x 50 rows = 200 x 100 physical units, much wider than 4:3
        vp.fit(200, 50);
        let (x0, y0, x1, y1) = vp.play_area();
        assert_eq!((y0, y1), (0, 50));
        let width = x1 - x0;
        assert!((width - 133).abs() <= 1, "width {width}");
        assert!(x0 > 0);
        assert!((x0 - (200 - x1)).abs() <= 1, "not centered");
    }

    #[test]
    fn tall_surface_is_letterboxed() {
        let mut vp = Viewport::new(480.0, 360.0);
        vp.fit(40, 100);
        let (x0, y0, x1, y1) = vp.play_area();
        assert_eq!((x0, x1), (0, 40));
        assert!(y0 > 0);
        assert!(y1 < 100);
    }

    #[test]
    fn zero_size_surface_is_inert() {
        let mut vp = Viewport::new(480.0, 360.0);
        vp.fit(0, 0);
        assert_eq!(vp.scale(), 0.0);
        assert_eq!(vp.to_cell(100.0, 100.0), (0, 0));
    }

    #[test]
    fn refit_keeps_virtual_size() {
        let mut vp = Viewport::new(448.0, 496.0);
        vp.fit(80, 24);
        let first = vp.scale();
        vp.fit(160, 48);
        assert!((vp.scale() - first * 2.0).abs() < 1e-4);
        assert_eq!(vp.virtual_size(), (448.0, 496.0));
    }
}
