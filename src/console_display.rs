use crate::render::{Renderer, SceneGraph, SceneItem};
use crate::types::Point;
use std::io::{self, Write};

/// Renders the headless scene as an ASCII dashboard.
pub struct ConsoleDisplay {
    cols: usize,
    rows: usize,
    /// Redraw every n-th frame.
    every: u64,
    frames: u64,
}

/// Fill glyphs, cycled by draw order.
const FILLS: [char; 5] = ['█', '▓', '▒', '░', '#'];

impl ConsoleDisplay {
    pub fn new(cols: usize, rows: usize, update_hz: u32, fps: u32) -> Self {
        let every = if update_hz == 0 { 1 } else { (fps / update_hz).max(1) as u64 };
        Self {
            cols: cols.max(8),
            rows: rows.max(4),
            every,
            frames: 0,
        }
    }

    /// Count a frame and draw it if it's due.
    pub fn frame(&mut self, scene: &SceneGraph, header: &str, footer: &str) {
        self.frames += 1;
        if self.frames % self.every != 0 {
            return;
        }
        let mut stdout = io::stdout();
        // Clear screen and move cursor home
        print!("\x1b[2J\x1b[H");
        print!("{}", self.render(scene, header, footer));
        let _ = stdout.flush();
    }

    /// One full dashboard frame as text.
    pub fn render(&self, scene: &SceneGraph, header: &str, footer: &str) -> String {
        let width = self.cols;
        let mut out = String::new();
        out.push_str(&format!("╔{}╗\n", "═".repeat(width)));
        out.push_str(&format!("║{}║\n", pad(&format!(" CHORD BLOBS  {}", header), width)));
        out.push_str(&format!("╠{}╣\n", "═".repeat(width)));
        for row in self.rasterize(scene) {
            out.push_str(&format!("║{}║\n", row.iter().collect::<String>()));
        }
        out.push_str(&format!("╠{}╣\n", "═".repeat(width)));
        out.push_str(&format!("║{}║\n", pad(&format!(" {}", footer), width)));
        out.push_str(&format!("╚{}╝\n", "═".repeat(width)));
        out
    }

    fn rasterize(&self, scene: &SceneGraph) -> Vec<Vec<char>> {
        let (w, h) = scene.canvas_size();
        let (w, h) = (w.max(1.0), h.max(1.0));
        let sx = w / self.cols as f32;
        let sy = h / self.rows as f32;
        let mut grid = vec![vec![' '; self.cols]; self.rows];
        let mut shape_index = 0;

        for item in scene.items() {
            match item {
                SceneItem::Shape { points, fill } => {
                    let glyph = FILLS[shape_index % FILLS.len()];
                    shape_index += 1;
                    if fill.a < 0.2 || points.len() < 3 {
                        continue;
                    }
                    for (r, row) in grid.iter_mut().enumerate() {
                        for (c, cell) in row.iter_mut().enumerate() {
                            let p = Point::new((c as f32 + 0.5) * sx, (r as f32 + 0.5) * sy);
                            if inside(points, p) {
                                *cell = glyph;
                            }
                        }
                    }
                }
                SceneItem::Label {
                    text, at, opacity, fill, ..
                } => {
                    if *opacity < 0.5 || fill.a < 0.5 {
                        continue;
                    }
                    let r = (at.y / sy) as isize;
                    let len = text.chars().count() as isize;
                    let c0 = (at.x / sx) as isize - len / 2;
                    if r < 0 || r >= self.rows as isize {
                        continue;
                    }
                    for (k, ch) in text.chars().enumerate() {
                        let c = c0 + k as isize;
                        if c >= 0 && c < self.cols as isize {
                            grid[r as usize][c as usize] = ch;
                        }
                    }
                }
            }
        }
        grid
    }
}

/// Even-odd point-in-polygon test.
fn inside(poly: &[Point], p: Point) -> bool {
    let mut hit = false;
    let mut j = poly.len() - 1;
    for i in 0..poly.len() {
        let (a, b) = (poly[i], poly[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            hit = !hit;
        }
        j = i;
    }
    hit
}

/// Pad or truncate to exactly `width` chars.
fn pad(s: &str, width: usize) -> String {
    let mut out: String = s.chars().take(width).collect();
    let n = out.chars().count();
    out.push_str(&" ".repeat(width - n));
    out
}

/// Progression header: `Imaj7 - ii7 - [V7]`, latest chord bracketed.
pub fn format_sequence(chords: &[String]) -> String {
    let n = chords.len();
    chords
        .iter()
        .enumerate()
        .map(|(i, c)| if i + 1 == n { format!("[{}]", c) } else { c.clone() })
        .collect::<Vec<_>>()
        .join(" - ")
}

/// `[████░░░] 3/7`
pub fn make_bar(done: usize, total: usize, width: usize) -> String {
    let frac = if total == 0 { 1.0 } else { (done as f32 / total as f32).min(1.0) };
    let filled = (frac * width as f32).round() as usize;
    let empty = width.saturating_sub(filled);
    format!("[{}{}] {}/{}", "█".repeat(filled), "░".repeat(empty), done, total)
}
