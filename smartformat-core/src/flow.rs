//! Flow composer - repositions elements along a preset's flow axis.
//!
//! Only positions change; sizes come from the per-element transform.
//! Background elements keep their place behind the flow.

use crate::{Element, FlowAlignment, FlowDirection, LayoutContext, LayoutPreset, Role};

/// Sort key: explicit layout order, otherwise role priority.
fn order_key(element: &Element) -> u32 {
    element
        .layout_order
        .unwrap_or_else(|| u32::from(element.role.priority()))
}

/// Offset of an item of size `item` inside a span of size `span`.
fn align(alignment: FlowAlignment, span: f32, item: f32, spacing: f32) -> f32 {
    match alignment {
        FlowAlignment::Start => spacing,
        FlowAlignment::Center => (span - item) / 2.0,
        FlowAlignment::End => span - item - spacing,
    }
}

/// Arrange `elements` along the preset's flow.
///
/// Elements flagged in `pinned` keep their position. Returns the number of
/// elements that were flowed.
pub fn compose(
    elements: &mut [Element],
    preset: &LayoutPreset,
    context: &LayoutContext,
    pinned: &[bool],
) -> usize {
    let mut order: Vec<usize> = (0..elements.len())
        .filter(|&i| {
            let e = &elements[i];
            e.visible && e.role != Role::Background && !pinned.get(i).copied().unwrap_or(false)
        })
        .collect();
    // Stable, so equal keys keep their input order.
    order.sort_by_key(|&i| order_key(&elements[i]));

    let flow = preset.flow;
    let (cw, ch) = (context.container_width, context.container_height);

    match flow.direction {
        FlowDirection::Vertical => {
            let mut cursor = flow.spacing;
            for &i in &order {
                let b = &mut elements[i].bounds;
                b.x = align(flow.alignment, cw, b.width, flow.spacing);
                b.y = cursor;
                cursor += b.height + flow.spacing;
            }
        }
        FlowDirection::Horizontal => {
            let mut cursor = flow.spacing;
            for &i in &order {
                let b = &mut elements[i].bounds;
                b.x = cursor;
                b.y = align(flow.alignment, ch, b.height, flow.spacing);
                cursor += b.width + flow.spacing;
            }
        }
        FlowDirection::Grid => {
            grid(elements, &order, flow.spacing, flow.alignment, flow.columns, cw);
        }
    }

    for &i in &order {
        let b = &mut elements[i].bounds;
        b.x = b.x.round().min(cw - b.width).max(0.0);
        b.y = b.y.round().min(ch - b.height).max(0.0);
    }

    tracing::debug!("Flowed {} elements with preset {}", order.len(), preset.id);
    order.len()
}

/// Row-major grid placement with equal column widths and per-row heights.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn grid(
    elements: &mut [Element],
    order: &[usize],
    spacing: f32,
    alignment: FlowAlignment,
    columns: Option<usize>,
    container_width: f32,
) {
    if order.is_empty() {
        return;
    }
    let columns = columns
        .unwrap_or_else(|| (order.len() as f32).sqrt().ceil() as usize)
        .max(1);
    let cell_width =
        ((container_width - spacing * (columns as f32 + 1.0)) / columns as f32).max(0.0);

    let mut row_top = spacing;
    for row in order.chunks(columns) {
        let mut row_height: f32 = 0.0;
        for (col, &i) in row.iter().enumerate() {
            let b = &mut elements[i].bounds;
            let cell_x = spacing + col as f32 * (cell_width + spacing);
            b.x = cell_x + align(alignment, cell_width, b.width, 0.0);
            b.y = row_top;
            row_height = row_height.max(b.height);
        }
        row_top += row_height + spacing;
    }
}
