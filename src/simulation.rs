//! Per-frame driver shared by the play and playback sessions.

use crate::blob::AnimatedBlob;
use crate::render::Renderer;
use crate::types::Point;

/// Update every blob, then run one collision check per unordered pair.
pub fn step(blobs: &mut [AnimatedBlob], renderer: &mut dyn Renderer) {
    update_all(blobs, renderer);
    for i in 0..blobs.len() {
        let (head, tail) = blobs.split_at_mut(i + 1);
        let a = &mut head[i];
        for b in tail.iter_mut() {
            a.check_collision(b);
        }
    }
}

/// Update every blob without pairwise collisions.
pub fn update_all(blobs: &mut [AnimatedBlob], renderer: &mut dyn Renderer) {
    for blob in blobs.iter_mut() {
        blob.update(renderer);
    }
}

/// Drop blobs that finished fading out.
pub fn prune_removed(blobs: &mut Vec<AnimatedBlob>) {
    blobs.retain(|b| !b.is_removed());
}

/// Index of the topmost hoverable blob under `p`. Later blobs draw above
/// earlier ones, so the search runs back to front.
pub fn hit_test(blobs: &[AnimatedBlob], p: Point) -> Option<usize> {
    blobs
        .iter()
        .enumerate()
        .rev()
        .find(|(_, b)| b.is_hoverable() && b.contains_point(p))
        .map(|(i, _)| i)
}
