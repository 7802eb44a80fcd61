//! Drawing contract consumed by blobs, plus a headless in-memory scene.
//!
//! Blobs never draw directly: they create, update and remove primitives
//! through a `Renderer`, which owns the draw stack. A canvas backend
//! implements the trait; `SceneGraph` is the headless implementation used
//! by the CLI and tests.

use crate::types::{Point, Rgba};
use log::trace;

/// Handle to a primitive owned by a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeId(pub u64);

pub trait Renderer {
    /// Closed polygon through `points`. Backends may smooth the outline.
    fn create_shape(&mut self, points: &[Point], fill: Rgba) -> ShapeId;
    fn update_shape(&mut self, id: ShapeId, points: &[Point], fill: Rgba);
    /// Text centered on `at`.
    fn create_label(&mut self, text: &str, at: Point, font_size: f32, fill: Rgba) -> ShapeId;
    fn update_label(&mut self, id: ShapeId, at: Point, fill: Rgba, opacity: f32);
    /// Move to the top of the draw stack.
    fn bring_to_front(&mut self, id: ShapeId);
    /// Remove a primitive. Unknown ids are ignored.
    fn remove(&mut self, id: ShapeId);
    /// Current canvas (width, height) in pixels.
    fn canvas_size(&self) -> (f32, f32);
}

// ─── Headless scene ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum SceneItem {
    Shape {
        points: Vec<Point>,
        fill: Rgba,
    },
    Label {
        text: String,
        at: Point,
        font_size: f32,
        fill: Rgba,
        opacity: f32,
    },
}

/// In-memory draw stack. Index 0 is drawn first (bottom).
#[derive(Debug, Clone)]
pub struct SceneGraph {
    width: f32,
    height: f32,
    next_id: u64,
    items: Vec<(ShapeId, SceneItem)>,
}

impl SceneGraph {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            next_id: 1,
            items: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: ShapeId) -> Option<&SceneItem> {
        self.items.iter().find(|(i, _)| *i == id).map(|(_, item)| item)
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.get(id).is_some()
    }

    /// Position in the draw stack (0 = bottom).
    pub fn z_index(&self, id: ShapeId) -> Option<usize> {
        self.items.iter().position(|(i, _)| *i == id)
    }

    /// Items bottom to top.
    pub fn items(&self) -> impl Iterator<Item = &SceneItem> {
        self.items.iter().map(|(_, item)| item)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    fn insert(&mut self, item: SceneItem) -> ShapeId {
        let id = ShapeId(self.next_id);
        self.next_id += 1;
        self.items.push((id, item));
        id
    }

    fn get_mut(&mut self, id: ShapeId) -> Option<&mut SceneItem> {
        self.items
            .iter_mut()
            .find(|(i, _)| *i == id)
            .map(|(_, item)| item)
    }
}

impl Renderer for SceneGraph {
    fn create_shape(&mut self, points: &[Point], fill: Rgba) -> ShapeId {
        self.insert(SceneItem::Shape {
            points: points.to_vec(),
            fill,
        })
    }

    fn update_shape(&mut self, id: ShapeId, new_points: &[Point], new_fill: Rgba) {
        if let Some(SceneItem::Shape { points, fill }) = self.get_mut(id) {
            points.clear();
            points.extend_from_slice(new_points);
            *fill = new_fill;
        }
    }

    fn create_label(&mut self, text: &str, at: Point, font_size: f32, fill: Rgba) -> ShapeId {
        self.insert(SceneItem::Label {
            text: text.to_string(),
            at,
            font_size,
            fill,
            opacity: 1.0,
        })
    }

    fn update_label(&mut self, id: ShapeId, new_at: Point, new_fill: Rgba, new_opacity: f32) {
        if let Some(SceneItem::Label {
            at, fill, opacity, ..
        }) = self.get_mut(id)
        {
            *at = new_at;
            *fill = new_fill;
            *opacity = new_opacity.clamp(0.0, 1.0);
        }
    }

    fn bring_to_front(&mut self, id: ShapeId) {
        if let Some(idx) = self.z_index(id) {
            let entry = self.items.remove(idx);
            self.items.push(entry);
        }
    }

    fn remove(&mut self, id: ShapeId) {
        if let Some(idx) = self.z_index(id) {
            trace!("scene: remove {:?}", id);
            self.items.remove(idx);
        }
    }

    fn canvas_size(&self) -> (f32, f32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_update_remove() {
        let mut scene = SceneGraph::new(640.0, 480.0);
        let shape = scene.create_shape(&[Point::new(0.0, 0.0), Point::new(1.0, 0.0)], Rgba::WHITE);
        let label = scene.create_label("V7", Point::new(5.0, 5.0), 16.0, Rgba::WHITE);
        assert_eq!(scene.len(), 2);

        scene.update_label(label, Point::new(9.0, 9.0), Rgba::WHITE.with_alpha(0.5), 0.25);
        match scene.get(label) {
            Some(SceneItem::Label { at, fill, opacity, text, .. }) => {
                assert_eq!(*at, Point::new(9.0, 9.0));
                assert_eq!(fill.a, 0.5);
                assert_eq!(*opacity, 0.25);
                assert_eq!(text, "V7");
            }
            other => panic!("expected label, got {:?}", other),
        }

        // Label updates never touch shapes and vice versa.
        scene.update_label(shape, Point::new(1.0, 1.0), Rgba::WHITE, 0.0);
        assert!(matches!(scene.get(shape), Some(SceneItem::Shape { .. })));

        scene.remove(shape);
        scene.remove(shape);
        assert_eq!(scene.len(), 1);
        assert!(!scene.contains(shape));
    }

    #[test]
    fn test_bring_to_front() {
        let mut scene = SceneGraph::new(640.0, 480.0);
        let a = scene.create_shape(&[], Rgba::WHITE);
        let b = scene.create_shape(&[], Rgba::WHITE);
        assert_eq!(scene.z_index(a), Some(0));
        scene.bring_to_front(a);
        assert_eq!(scene.z_index(a), Some(1));
        assert_eq!(scene.z_index(b), Some(0));
    }
}
