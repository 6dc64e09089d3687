//! Raster canvas and turtle state
//!
//! The canvas is a square grid of palette colors mutated by the drawing
//! commands and read by the query built-ins. The turtle (position, brush
//! color, brush size) lives here too; the executor owns a `Canvas`
//! exclusively for the duration of a run.
//!
//! All drawing goes through bounds-checked pixel writes, so no command can
//! ever touch a cell outside `[0,n) x [0,n)` regardless of its arguments.

use std::collections::VecDeque;

/// The fixed brush/canvas palette.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaletteColor {
    Red,
    Blue,
    Green,
    Yellow,
    Orange,
    Purple,
    Black,
    White,
    /// A valid brush color that disables all drawing operations.
    Transparent,
}

impl PaletteColor {
    /// Parse a color name, case-insensitively. `None` for unknown names;
    /// callers decide whether that is an error (`Color(...)`) or a
    /// "no match" query result (`IsBrushColor`, `GetColorCount`, ...).
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "red" => Some(PaletteColor::Red),
            "blue" => Some(PaletteColor::Blue),
            "green" => Some(PaletteColor::Green),
            "yellow" => Some(PaletteColor::Yellow),
            "orange" => Some(PaletteColor::Orange),
            "purple" => Some(PaletteColor::Purple),
            "black" => Some(PaletteColor::Black),
            "white" => Some(PaletteColor::White),
            "transparent" => Some(PaletteColor::Transparent),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PaletteColor::Red => "red",
            PaletteColor::Blue => "blue",
            PaletteColor::Green => "green",
            PaletteColor::Yellow => "yellow",
            PaletteColor::Orange => "orange",
            PaletteColor::Purple => "purple",
            PaletteColor::Black => "black",
            PaletteColor::White => "white",
            PaletteColor::Transparent => "transparent",
        }
    }

    /// RGB used by the terminal renderer.
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            PaletteColor::Red => (220, 50, 47),
            PaletteColor::Blue => (38, 139, 210),
            PaletteColor::Green => (64, 160, 43),
            PaletteColor::Yellow => (230, 200, 0),
            PaletteColor::Orange => (203, 75, 22),
            PaletteColor::Purple => (140, 80, 200),
            PaletteColor::Black => (0, 0, 0),
            PaletteColor::White | PaletteColor::Transparent => (255, 255, 255),
        }
    }
}

/// Square pixel buffer plus turtle state.
pub struct Canvas {
    size: i64,
    pixels: Vec<PaletteColor>,
    x: i64,
    y: i64,
    color: PaletteColor,
    brush: i64,
}

impl Canvas {
    /// Create an n-by-n white canvas with the turtle at the origin.
    pub fn new(size: usize) -> Self {
        let size = size.max(1) as i64;
        Self {
            size,
            pixels: vec![PaletteColor::White; (size * size) as usize],
            x: 0,
            y: 0,
            color: PaletteColor::Black,
            brush: 1,
        }
    }

    /// Reallocate to n-by-n, clear to white, reset the turtle to the origin.
    pub fn resize(&mut self, size: usize) {
        let size = size.max(1) as i64;
        self.size = size;
        self.pixels = vec![PaletteColor::White; (size * size) as usize];
        self.x = 0;
        self.y = 0;
    }

    /// Clear to white without moving the turtle.
    pub fn clear(&mut self) {
        self.pixels.fill(PaletteColor::White);
    }

    pub fn size(&self) -> i64 {
        self.size
    }

    pub fn position(&self) -> (i64, i64) {
        (self.x, self.y)
    }

    pub fn brush_color(&self) -> PaletteColor {
        self.color
    }

    pub fn brush_size(&self) -> i64 {
        self.brush
    }

    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.size && y < self.size
    }

    /// Place the turtle. The executor bounds-checks `Spawn` arguments
    /// before calling this.
    pub fn set_position(&mut self, x: i64, y: i64) {
        self.x = x.clamp(0, self.size - 1);
        self.y = y.clamp(0, self.size - 1);
    }

    pub fn set_color(&mut self, color: PaletteColor) {
        self.color = color;
    }

    /// Effective size is max(1, n), decremented by one if even, so the
    /// brush is always odd and at least 1.
    pub fn set_brush_size(&mut self, size: i64) {
        let mut brush = size.max(1);
        if brush % 2 == 0 {
            brush -= 1;
        }
        self.brush = brush;
    }

    /// Get pixel color; `None` outside the canvas.
    pub fn pixel(&self, x: i64, y: i64) -> Option<PaletteColor> {
        if self.in_bounds(x, y) {
            Some(self.pixels[(y * self.size + x) as usize])
        } else {
            None
        }
    }

    /// Bounds-checked write of the current brush color.
    fn pset(&mut self, x: i64, y: i64) {
        if self.in_bounds(x, y) {
            self.pixels[(y * self.size + x) as usize] = self.color;
        }
    }

    /// Stamp the square brush centered on (x, y).
    fn stamp(&mut self, x: i64, y: i64) {
        let r = self.brush / 2;
        for yy in (y - r)..=(y + r) {
            for xx in (x - r)..=(x + r) {
                self.pset(xx, yy);
            }
        }
    }

    /// Draw a brush-width segment using Bresenham's algorithm.
    fn segment(&mut self, x1: i64, y1: i64, x2: i64, y2: i64) {
        let dx = (x2 - x1).abs();
        let dy = -(y2 - y1).abs();
        let sx = if x1 < x2 { 1 } else { -1 };
        let sy = if y1 < y2 { 1 } else { -1 };
        let mut err = dx + dy;
        let mut x = x1;
        let mut y = y1;

        loop {
            self.stamp(x, y);

            if x == x2 && y == y2 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                if x == x2 {
                    break;
                }
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                if y == y2 {
                    break;
                }
                err += dx;
                y += sy;
            }
        }
    }

    /// Draw a line of `dist` steps in direction (dx, dy). The endpoint is
    /// clamped per axis to the canvas; the turtle moves to the clamped
    /// endpoint.
    pub fn draw_line(&mut self, dx: i64, dy: i64, dist: i64) {
        if self.color == PaletteColor::Transparent || dist <= 0 {
            return;
        }

        let end_x = self
            .x
            .saturating_add(dx.saturating_mul(dist))
            .clamp(0, self.size - 1);
        let end_y = self
            .y
            .saturating_add(dy.saturating_mul(dist))
            .clamp(0, self.size - 1);

        let (x, y) = (self.x, self.y);
        self.segment(x, y, end_x, end_y);
        self.x = end_x;
        self.y = end_y;
    }

    /// Draw a circle outline of `radius` centered `radius` steps away in
    /// direction (dx, dy), clamped so the full circle stays on-canvas. The
    /// turtle moves to the center.
    pub fn draw_circle(&mut self, dx: i64, dy: i64, radius: i64) {
        if self.color == PaletteColor::Transparent || radius <= 0 {
            return;
        }

        let cx = self
            .x
            .saturating_add(dx.saturating_mul(radius))
            .min(self.size - 1 - radius)
            .max(radius);
        let cy = self
            .y
            .saturating_add(dy.saturating_mul(radius))
            .min(self.size - 1 - radius)
            .max(radius);

        // Midpoint circle
        let mut x = radius;
        let mut y = 0;
        let mut p = 1 - radius;

        self.circle_points(cx, cy, x, y);
        while x > y {
            y += 1;
            if p <= 0 {
                p += 2 * y + 1;
            } else {
                x -= 1;
                p += 2 * y - 2 * x + 1;
            }
            self.circle_points(cx, cy, x, y);
        }

        // The center clamp cannot fit a shape wider than the canvas, so
        // the turtle is clamped separately to stay on-canvas.
        self.set_position(cx, cy);
    }

    fn circle_points(&mut self, cx: i64, cy: i64, x: i64, y: i64) {
        self.stamp(cx + x, cy + y);
        self.stamp(cx - x, cy + y);
        self.stamp(cx + x, cy - y);
        self.stamp(cx - x, cy - y);
        self.stamp(cx + y, cy + x);
        self.stamp(cx - y, cy + x);
        self.stamp(cx + y, cy - x);
        self.stamp(cx - y, cy - x);
    }

    /// Draw a w-by-h rectangle outline centered `dist` steps away in
    /// direction (dx, dy), clamped by half-extents so the rectangle stays
    /// on-canvas. The turtle moves to the center.
    pub fn draw_rectangle(&mut self, dx: i64, dy: i64, dist: i64, w: i64, h: i64) {
        if self.color == PaletteColor::Transparent || w <= 0 || h <= 0 {
            return;
        }

        let cx = self
            .x
            .saturating_add(dx.saturating_mul(dist))
            .min(self.size - 1 - w / 2)
            .max(w / 2);
        let cy = self
            .y
            .saturating_add(dy.saturating_mul(dist))
            .min(self.size - 1 - h / 2)
            .max(h / 2);

        let left = cx - w / 2;
        let top = cy - h / 2;
        let right = left + w - 1;
        let bottom = top + h - 1;

        self.segment(left, top, right, top);
        self.segment(left, bottom, right, bottom);
        self.segment(left, top, left, bottom);
        self.segment(right, top, right, bottom);

        self.set_position(cx, cy);
    }

    /// Flood-fill the maximal 4-connected region sharing the color under
    /// the turtle with the current brush color. No-op when the brush is
    /// transparent or the region already has the brush color.
    ///
    /// Pixels are recolored as they are enqueued, so no pixel enters the
    /// worklist twice and the queue is bounded by the canvas area.
    pub fn fill(&mut self) {
        if self.color == PaletteColor::Transparent {
            return;
        }
        let target = match self.pixel(self.x, self.y) {
            Some(c) if c != self.color => c,
            _ => return,
        };

        let mut worklist = VecDeque::new();
        self.pset(self.x, self.y);
        worklist.push_back((self.x, self.y));

        while let Some((x, y)) = worklist.pop_front() {
            for (nx, ny) in [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)] {
                if self.pixel(nx, ny) == Some(target) {
                    self.pset(nx, ny);
                    worklist.push_back((nx, ny));
                }
            }
        }
    }

    /// 1 if the pixel at the turtle position offset by (dx, dy) matches
    /// `color`, else 0. Out-of-bounds offsets and unknown color names are
    /// the "no match" value 0.
    pub fn is_canvas_color(&self, color: Option<PaletteColor>, dx: i64, dy: i64) -> i64 {
        let color = match color {
            Some(c) => c,
            None => return 0,
        };
        match self.pixel(self.x.saturating_add(dx), self.y.saturating_add(dy)) {
            Some(c) if c == color => 1,
            _ => 0,
        }
    }

    /// Count pixels matching `color` in the axis-aligned box spanned by the
    /// two corners, corner order irrelevant, coordinates clamped to the
    /// canvas. Unknown color names count as 0.
    pub fn color_count(&self, color: Option<PaletteColor>, x1: i64, y1: i64, x2: i64, y2: i64) -> i64 {
        let color = match color {
            Some(c) => c,
            None => return 0,
        };

        let min_x = x1.min(x2).max(0);
        let max_x = x1.max(x2).min(self.size - 1);
        let min_y = y1.min(y2).max(0);
        let max_y = y1.max(y2).min(self.size - 1);

        let mut count = 0;
        let mut y = min_y;
        while y <= max_y {
            let mut x = min_x;
            while x <= max_x {
                if self.pixels[(y * self.size + x) as usize] == color {
                    count += 1;
                }
                x += 1;
            }
            y += 1;
        }
        count
    }

    /// Render the raster as ANSI truecolor half-block characters, two pixel
    /// rows per terminal row.
    pub fn to_ansi(&self) -> String {
        let mut out = String::new();
        let mut y = 0;
        while y < self.size {
            for x in 0..self.size {
                let (tr, tg, tb) = self.pixels[(y * self.size + x) as usize].rgb();
                let bottom = if y + 1 < self.size {
                    self.pixels[((y + 1) * self.size + x) as usize]
                } else {
                    PaletteColor::White
                };
                let (br, bg, bb) = bottom.rgb();
                out.push_str(&format!(
                    "\x1b[38;2;{};{};{}m\x1b[48;2;{};{};{}m▀",
                    tr, tg, tb, br, bg, bb
                ));
            }
            out.push_str("\x1b[0m\n");
            y += 2;
        }
        out
    }
}
