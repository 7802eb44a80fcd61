use crate::config::BlobTuning;
use crate::render::{Renderer, ShapeId};
use crate::types::{BlobId, Point, Rgba};
use log::trace;
use rand::Rng;
use std::f32::consts::TAU;
use std::fmt;

/// Repeating tap handler.
pub type TapCallback = Box<dyn FnMut() + Send>;

/// A callback slot that fires at most once. Firing empties the slot.
#[derive(Default)]
pub struct EventSlot(Option<Box<dyn FnOnce() + Send>>);

impl EventSlot {
    pub fn new<F: FnOnce() + Send + 'static>(f: F) -> Self {
        Self(Some(Box::new(f)))
    }

    pub fn empty() -> Self {
        Self(None)
    }

    pub fn is_armed(&self) -> bool {
        self.0.is_some()
    }

    /// Run and clear the callback. Returns false if the slot was empty.
    pub fn fire(&mut self) -> bool {
        match self.0.take() {
            Some(f) => {
                f();
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for EventSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_armed() { "EventSlot(armed)" } else { "EventSlot(empty)" })
    }
}

// ─── Config ─────────────────────────────────────────────────────────────────

/// Everything needed to build a blob. Start from `BlobConfig::new` and
/// override with the builder methods.
///
/// | field                 | default            |
/// |-----------------------|--------------------|
/// | `id`                  | `blob#0`           |
/// | `color`               | white              |
/// | `canvas_width/height` | 800 × 600          |
/// | `gravity`             | 0                  |
/// | `speed_multiplier`    | 1                  |
/// | `on_tap`              | none (taps ignored)|
/// | `on_bottom_collision` | none               |
/// | `tuning`              | `BlobTuning::default()` |
pub struct BlobConfig {
    pub id: BlobId,
    pub label: String,
    pub center: Point,
    pub radius: f32,
    pub color: Rgba,
    pub canvas_width: f32,
    pub canvas_height: f32,
    pub gravity: f32,
    /// Scales the randomly drawn phase speed.
    pub speed_multiplier: f32,
    pub on_tap: Option<TapCallback>,
    pub on_bottom_collision: EventSlot,
    pub tuning: BlobTuning,
}

impl BlobConfig {
    pub fn new(label: impl Into<String>, center: Point, radius: f32) -> Self {
        Self {
            id: BlobId(0),
            label: label.into(),
            center,
            radius,
            color: Rgba::WHITE,
            canvas_width: 800.0,
            canvas_height: 600.0,
            gravity: 0.0,
            speed_multiplier: 1.0,
            on_tap: None,
            on_bottom_collision: EventSlot::empty(),
            tuning: BlobTuning::default(),
        }
    }

    pub fn id(mut self, id: BlobId) -> Self {
        self.id = id;
        self
    }

    pub fn color(mut self, color: Rgba) -> Self {
        self.color = color;
        self
    }

    pub fn canvas(mut self, width: f32, height: f32) -> Self {
        self.canvas_width = width;
        self.canvas_height = height;
        self
    }

    pub fn gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn speed_multiplier(mut self, m: f32) -> Self {
        self.speed_multiplier = m;
        self
    }

    pub fn on_tap<F: FnMut() + Send + 'static>(mut self, f: F) -> Self {
        self.on_tap = Some(Box::new(f));
        self
    }

    pub fn on_bottom_collision<F: FnOnce() + Send + 'static>(mut self, f: F) -> Self {
        self.on_bottom_collision = EventSlot::new(f);
        self
    }

    pub fn tuning(mut self, tuning: BlobTuning) -> Self {
        self.tuning = tuning;
        self
    }
}

// ─── Blob ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlobState {
    Normal,
    Expanding { progress: f32 },
    FadingOut { progress: f32 },
    Removed,
}

/// A tappable, wobbling chord blob.
///
/// Owns one outline shape and one text label in the renderer. In `Normal`
/// it drifts under simple physics and bounces off the canvas edges. Once
/// `start_expanding` is called it grows past the canvas, fades and removes
/// its visuals; that path cannot be reversed.
pub struct AnimatedBlob {
    id: BlobId,
    label: String,
    shape_id: ShapeId,
    label_id: ShapeId,
    base_radius: f32,
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    gravity: f32,
    phase: f32,
    speed: f32,
    color: Rgba,
    label_opacity: f32,
    canvas_width: f32,
    canvas_height: f32,
    /// Center including the wander offset; what the user sees.
    visual_center: Point,
    outline: Vec<Point>,
    tuning: BlobTuning,
    state: BlobState,
    on_tap: Option<TapCallback>,
    on_bottom_collision: EventSlot,
    on_expand_complete: EventSlot,
}

impl AnimatedBlob {
    pub fn new<R: Rng + ?Sized>(config: BlobConfig, renderer: &mut dyn Renderer, rng: &mut R) -> Self {
        let BlobConfig {
            id,
            label,
            center,
            radius,
            color,
            canvas_width,
            canvas_height,
            gravity,
            speed_multiplier,
            on_tap,
            on_bottom_collision,
            tuning,
        } = config;

        let n = tuning.outline_points.max(3);
        let outline: Vec<Point> = (0..n)
            .map(|i| {
                let angle = i as f32 / n as f32 * TAU;
                let r = radius + (rng.gen::<f32>() * 2.0 - 1.0) * tuning.outline_jitter;
                Point::new(center.x + angle.cos() * r, center.y + angle.sin() * r)
            })
            .collect();
        let phase = rng.gen::<f32>() * TAU;
        let speed = (tuning.phase_speed_min + rng.gen::<f32>() * tuning.phase_speed_range) * speed_multiplier;

        let shape_id = renderer.create_shape(&outline, color);
        let font_size = (radius * 0.4).max(16.0);
        let label_id = renderer.create_label(&label, center, font_size, Rgba::WHITE);
        trace!("blob {:?} created at {} r={:.1}", label, center, radius);

        Self {
            id,
            label,
            shape_id,
            label_id,
            base_radius: radius,
            x: center.x,
            y: center.y,
            vx: 0.0,
            vy: 0.0,
            gravity,
            phase,
            speed,
            color,
            label_opacity: 1.0,
            canvas_width,
            canvas_height,
            visual_center: center,
            outline,
            tuning,
            state: BlobState::Normal,
            on_tap,
            on_bottom_collision,
            on_expand_complete: EventSlot::empty(),
        }
    }

    pub fn id(&self) -> BlobId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> BlobState {
        self.state
    }

    pub fn is_removed(&self) -> bool {
        self.state == BlobState::Removed
    }

    pub fn is_expanding(&self) -> bool {
        matches!(self.state, BlobState::Expanding { .. })
    }

    /// Whether the pointer should react to this blob. Only true in `Normal`.
    pub fn is_hoverable(&self) -> bool {
        self.state == BlobState::Normal
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn visual_center(&self) -> Point {
        self.visual_center
    }

    pub fn velocity(&self) -> (f32, f32) {
        (self.vx, self.vy)
    }

    pub fn base_radius(&self) -> f32 {
        self.base_radius
    }

    pub fn color(&self) -> Rgba {
        self.color
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn gravity(&self) -> f32 {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: f32) {
        self.gravity = gravity;
    }

    pub fn outline(&self) -> &[Point] {
        &self.outline
    }

    pub fn shape_id(&self) -> ShapeId {
        self.shape_id
    }

    pub fn label_id(&self) -> ShapeId {
        self.label_id
    }

    pub fn set_canvas_size(&mut self, width: f32, height: f32) {
        self.canvas_width = width;
        self.canvas_height = height;
    }

    /// True if `p` falls inside the blob as currently drawn.
    pub fn contains_point(&self, p: Point) -> bool {
        self.state != BlobState::Removed && self.visual_center.distance(&p) <= self.base_radius
    }

    /// Deliver a tap. Ignored unless the blob is `Normal` and has a handler.
    pub fn tap(&mut self) -> bool {
        if self.state != BlobState::Normal {
            return false;
        }
        match self.on_tap.as_mut() {
            Some(f) => {
                f();
                true
            }
            None => false,
        }
    }

    /// Begin the expand-then-fade exit. Stops all motion and raises the
    /// blob above its neighbours. Returns false (and drops `on_complete`)
    /// unless the blob is `Normal`.
    pub fn start_expanding(&mut self, on_complete: EventSlot, renderer: &mut dyn Renderer) -> bool {
        if self.state != BlobState::Normal {
            return false;
        }
        self.state = BlobState::Expanding { progress: 0.0 };
        self.on_expand_complete = on_complete;
        self.gravity = 0.0;
        self.vx = 0.0;
        self.vy = 0.0;
        renderer.bring_to_front(self.shape_id);
        renderer.bring_to_front(self.label_id);
        trace!("blob {:?} expanding", self.label);
        true
    }

    /// Advance one frame.
    pub fn update(&mut self, renderer: &mut dyn Renderer) {
        match self.state {
            BlobState::Normal => {
                self.integrate();
                self.resolve_walls();
                self.wobble(renderer);
            }
            BlobState::Expanding { progress } => {
                let mut progress = progress + self.tuning.expand_speed;
                if progress >= 1.0 {
                    progress = 1.0;
                    self.state = BlobState::FadingOut { progress: 0.0 };
                    self.on_expand_complete.fire();
                } else {
                    self.state = BlobState::Expanding { progress };
                }
                self.draw_expanded(progress, renderer);
            }
            BlobState::FadingOut { progress } => {
                let progress = progress + self.tuning.fade_speed;
                if progress >= 1.0 {
                    self.remove(renderer);
                    return;
                }
                self.state = BlobState::FadingOut { progress };
                let alpha = 1.0 - progress;
                renderer.update_shape(self.shape_id, &self.outline, self.color.with_alpha(alpha));
                renderer.update_label(
                    self.label_id,
                    self.visual_center,
                    Rgba::WHITE.with_alpha(alpha),
                    self.label_opacity,
                );
            }
            BlobState::Removed => {}
        }
    }

    /// Soft separation from an overlapping neighbour. Both blobs must be
    /// `Normal`; otherwise nothing happens.
    pub fn check_collision(&mut self, other: &mut AnimatedBlob) {
        if self.state != BlobState::Normal || other.state != BlobState::Normal {
            return;
        }
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let distance = (dx * dx + dy * dy).sqrt();
        let min_distance = self.base_radius + other.base_radius;
        if distance >= min_distance {
            return;
        }
        let angle = dy.atan2(dx);
        let target_x = self.x + angle.cos() * min_distance;
        let target_y = self.y + angle.sin() * min_distance;
        let k = self.tuning.collision_stiffness;
        let ax = (target_x - other.x) * k;
        let ay = (target_y - other.y) * k;
        self.vx -= ax;
        self.vy -= ay;
        other.vx += ax;
        other.vy += ay;
    }

    /// Detach visuals and drop pending callbacks. Safe to call repeatedly.
    pub fn remove(&mut self, renderer: &mut dyn Renderer) {
        if self.state == BlobState::Removed {
            return;
        }
        renderer.remove(self.shape_id);
        renderer.remove(self.label_id);
        self.on_bottom_collision = EventSlot::empty();
        self.on_expand_complete = EventSlot::empty();
        self.state = BlobState::Removed;
        trace!("blob {:?} removed", self.label);
    }

    // ─── Per-state helpers ──────────────────────────────────────────────

    fn integrate(&mut self) {
        self.phase += self.speed;
        self.vy += self.gravity;
        self.vx *= self.tuning.friction;
        self.vy *= self.tuning.friction;
        self.x += self.vx;
        self.y += self.vy;
    }

    fn resolve_walls(&mut self) {
        let margin = self.base_radius;
        let bounce = self.tuning.restitution;
        if self.x - margin < 0.0 {
            self.x = margin;
            self.vx *= bounce;
        }
        if self.x + margin > self.canvas_width {
            self.x = self.canvas_width - margin;
            self.vx *= bounce;
        }
        if self.y - margin < 0.0 {
            self.y = margin;
            self.vy *= bounce;
        }
        if self.y + margin > self.canvas_height {
            self.y = self.canvas_height - margin;
            self.vy *= bounce;
            if self.on_bottom_collision.fire() {
                trace!("blob {:?} hit bottom", self.label);
            }
        }
    }

    fn wobble(&mut self, renderer: &mut dyn Renderer) {
        let t = self.phase;
        let wander = self.tuning.wander_amplitude;
        let cx = self.x + t.sin() * wander;
        let cy = self.y + (t * 1.3).cos() * wander;
        let n = self.outline.len();
        for (i, p) in self.outline.iter_mut().enumerate() {
            let angle = i as f32 / n as f32 * TAU;
            let r = self.base_radius + (t * 2.0 + i as f32).sin() * self.tuning.wobble_amplitude;
            *p = Point::new(cx + angle.cos() * r, cy + angle.sin() * r);
        }
        self.visual_center = Point::new(cx, cy);
        renderer.update_shape(self.shape_id, &self.outline, self.color);
        renderer.update_label(self.label_id, self.visual_center, Rgba::WHITE, self.label_opacity);
    }

    fn draw_expanded(&mut self, progress: f32, renderer: &mut dyn Renderer) {
        let target = self.canvas_width.max(self.canvas_height) * self.tuning.expand_target_scale;
        let eased = progress * progress;
        let radius = self.base_radius + (target - self.base_radius) * eased;
        let n = self.outline.len();
        for (i, p) in self.outline.iter_mut().enumerate() {
            let angle = i as f32 / n as f32 * TAU;
            *p = Point::new(self.x + angle.cos() * radius, self.y + angle.sin() * radius);
        }
        self.visual_center = Point::new(self.x, self.y);
        self.label_opacity = 1.0 - progress;
        renderer.update_shape(self.shape_id, &self.outline, self.color);
        renderer.update_label(self.label_id, self.visual_center, Rgba::WHITE, self.label_opacity);
    }
}

impl fmt::Debug for AnimatedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimatedBlob")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("state", &self.state)
            .field("position", &self.position())
            .field("base_radius", &self.base_radius)
            .finish()
    }
}
