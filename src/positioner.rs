use crate::types::{Placement, Point};
use log::debug;
use rand::Rng;

/// Rejection-sampling placement for one batch of blobs.
///
/// Samples uniformly inside the canvas inset by `margin` and accepts the
/// first point that keeps `radius + other.radius + spacing` clear of every
/// placement recorded so far. After `max_attempts` misses it returns one
/// more random point unconditionally, so placement never stalls (overlap
/// is possible in that case).
///
/// Callers must `add_position` each accepted point before placing the next,
/// and `reset` between batches.
#[derive(Debug, Clone)]
pub struct BlobPositioner {
    width: f32,
    height: f32,
    margin: f32,
    positions: Vec<Placement>,
}

impl BlobPositioner {
    pub fn new(width: f32, height: f32, margin: f32) -> Self {
        Self {
            width,
            height,
            margin,
            positions: Vec::new(),
        }
    }

    pub fn find_non_overlapping<R: Rng + ?Sized>(
        &self,
        radius: f32,
        spacing: f32,
        max_attempts: u32,
        rng: &mut R,
    ) -> Point {
        for _ in 0..max_attempts {
            let p = self.random_position(rng);
            if !self.is_overlapping(p, radius, spacing) {
                return p;
            }
        }
        debug!(
            "no free spot for r={:.0} after {} attempts ({} placed), accepting overlap",
            radius,
            max_attempts,
            self.positions.len()
        );
        self.random_position(rng)
    }

    pub fn add_position(&mut self, x: f32, y: f32, radius: f32) {
        self.positions.push(Placement { x, y, radius });
    }

    pub fn reset(&mut self) {
        self.positions.clear();
    }

    pub fn positions(&self) -> &[Placement] {
        &self.positions
    }

    fn is_overlapping(&self, p: Point, radius: f32, spacing: f32) -> bool {
        self.positions.iter().any(|pos| {
            let min_distance = radius + pos.radius + spacing;
            p.distance(&Point::new(pos.x, pos.y)) < min_distance
        })
    }

    /// Uniform point in `[margin, dim - margin]` on both axes. A canvas
    /// narrower than twice the margin collapses to the margin line.
    fn random_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Point {
        let span_x = (self.width - self.margin * 2.0).max(0.0);
        let span_y = (self.height - self.margin * 2.0).max(0.0);
        Point::new(
            self.margin + rng.gen::<f32>() * span_x,
            self.margin + rng.gen::<f32>() * span_y,
        )
    }
}
