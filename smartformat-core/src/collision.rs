//! Best-effort overlap elimination.
//!
//! Pairwise O(n²) test; the lower-priority element of an overlapping pair
//! moves below the other one. A displaced element may come to overlap a
//! third element; with the default single pass this is not re-checked.

use serde::{Deserialize, Serialize};

use crate::{Element, LayoutContext, Role};

/// Default gap left below an obstacle.
pub const DEFAULT_GUTTER: f32 = 10.0;

/// Collision resolver settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollisionConfig {
    /// Gap between an obstacle and the displaced element.
    pub gutter: f32,
    /// Number of sweeps; sweeping stops early once nothing moves.
    pub passes: usize,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            gutter: DEFAULT_GUTTER,
            passes: 1,
        }
    }
}

fn participates(element: &Element) -> bool {
    element.visible && element.role != Role::Background
}

/// Displace overlapping elements downward.
///
/// Elements flagged in `pinned` act as obstacles but never move.
/// Returns the number of displacements.
pub fn resolve_collisions(
    elements: &mut [Element],
    context: &LayoutContext,
    config: &CollisionConfig,
    pinned: &[bool],
) -> usize {
    let is_pinned = |i: usize| pinned.get(i).copied().unwrap_or(false);
    let mut total = 0;

    for pass in 0..config.passes {
        let mut moved = 0;
        for i in 0..elements.len() {
            for j in (i + 1)..elements.len() {
                let (a, b) = (&elements[i], &elements[j]);
                if !participates(a) || !participates(b) || !a.bounds.intersects(&b.bounds) {
                    continue;
                }

                // Lower priority yields; ties displace the later element.
                let (mover, obstacle) = if a.role.priority() < b.role.priority() {
                    (i, j)
                } else {
                    (j, i)
                };
                let (mover, obstacle) = match (is_pinned(mover), is_pinned(obstacle)) {
                    (false, _) => (mover, obstacle),
                    (true, false) => (obstacle, mover),
                    (true, true) => continue,
                };

                let below = elements[obstacle].bounds.bottom() + config.gutter;
                let target = &mut elements[mover].bounds;
                let y = below.min(context.container_height - target.height).max(0.0);
                if (y - target.y).abs() > f32::EPSILON {
                    tracing::debug!(
                        "Collision: moved {} below {} ({} -> {})",
                        elements[mover].id,
                        elements[obstacle].id,
                        elements[mover].bounds.y,
                        y
                    );
                    elements[mover].bounds.y = y;
                    moved += 1;
                }
            }
        }
        total += moved;
        if moved == 0 {
            break;
        }
        tracing::trace!("Collision pass {pass} moved {moved} elements");
    }

    total
}
