//! Per-element geometry conversion, one function per responsive mode.
//!
//! Every mode computes from pristine geometry against the authoring canvas
//! and finishes with the same containment step, so repeated conversions
//! never compound rounding error.

use crate::{
    Anchor, Bounds, Element, FormatResult, LayoutContext, LayoutPreset, Margin, Percentages,
    ResponsiveMode, RoleRule, SizeConstraints,
};

/// Reference canvas width for adaptive font scaling.
const ADAPTIVE_BASE_WIDTH: f32 = 1080.0;

/// Un-contained result of a mode.
#[derive(Debug, Clone, Copy)]
struct Placement {
    bounds: Bounds,
    font_size: Option<f32>,
    constraints: Option<SizeConstraints>,
}

/// Convert one element to the destination context.
///
/// Pristine geometry is never modified. If the element has no authoring
/// canvas recorded yet, `from` is recorded as its authoring canvas.
///
/// # Errors
///
/// Returns an error if the element geometry is unusable.
pub fn transform_element(
    element: &Element,
    from: &LayoutContext,
    to: &LayoutContext,
    preset: Option<&LayoutPreset>,
) -> FormatResult<Element> {
    element.check_geometry()?;

    let mut out = element.clone();
    if out.pristine.canvas().is_none() {
        out.pristine.canvas_width = Some(from.container_width);
        out.pristine.canvas_height = Some(from.container_height);
    }
    let reference = out
        .pristine
        .canvas()
        .unwrap_or((from.container_width, from.container_height));

    let own = out.responsive.constraints;
    let placement = match out.responsive.mode {
        ResponsiveMode::Fixed => fixed(&out, own, reference, to),
        ResponsiveMode::Fluid => fluid(&out, own, reference, to),
        ResponsiveMode::Relative => {
            let cached = out.responsive.percentages;
            let (placement, percentages) =
                relative(&out, out.responsive.anchor, cached, own, reference, to);
            out.responsive.percentages = Some(percentages);
            placement
        }
        ResponsiveMode::Adaptive => match preset.and_then(|p| p.rule(out.role)) {
            Some(rule) => adaptive(&out, reference, to, rule),
            None => fluid(&out, own, reference, to),
        },
    };

    out.bounds = contain(&placement, out.responsive.margin, to);
    out.font_size = placement.font_size.map(round_font);
    Ok(out)
}

/// Authoring-to-destination scale factors.
fn scales(reference: (f32, f32), to: &LayoutContext) -> (f32, f32) {
    (
        to.container_width / reference.0,
        to.container_height / reference.1,
    )
}

/// Uniform scale, clamped at 1 so fixed elements never grow.
fn fixed(
    element: &Element,
    constraints: Option<SizeConstraints>,
    reference: (f32, f32),
    to: &LayoutContext,
) -> Placement {
    let (sx, sy) = scales(reference, to);
    let scale = sx.min(sy).min(1.0);
    let p = &element.pristine;
    Placement {
        bounds: Bounds::new(p.x * scale, p.y * scale, p.width * scale, p.height * scale),
        font_size: p.font_size.map(|f| f * scale),
        constraints,
    }
}

/// Independent per-axis scale.
fn fluid(
    element: &Element,
    constraints: Option<SizeConstraints>,
    reference: (f32, f32),
    to: &LayoutContext,
) -> Placement {
    let (sx, sy) = scales(reference, to);
    let p = &element.pristine;
    Placement {
        bounds: Bounds::new(p.x * sx, p.y * sy, p.width * sx, p.height * sy),
        font_size: p.font_size.map(|f| f * sx.min(sy)),
        constraints,
    }
}

/// Percentage placement of the anchor point.
///
/// `cached` percentages are reused as-is; otherwise they are derived from
/// pristine geometry for `anchor`.
fn relative(
    element: &Element,
    anchor: Anchor,
    cached: Option<Percentages>,
    constraints: Option<SizeConstraints>,
    reference: (f32, f32),
    to: &LayoutContext,
) -> (Placement, Percentages) {
    let p = &element.pristine;
    let percentages = cached.unwrap_or_else(|| {
        let (fx, fy) = anchor.fractions();
        Percentages {
            x_percent: (p.x + fx * p.width) / reference.0 * 100.0,
            y_percent: (p.y + fy * p.height) / reference.1 * 100.0,
            width_percent: p.width / reference.0 * 100.0,
            height_percent: p.height / reference.1 * 100.0,
        }
    });

    let (width, height) = constrain(
        percentages.width_percent * to.container_width / 100.0,
        percentages.height_percent * to.container_height / 100.0,
        constraints,
    );
    let (x, y) = anchor.top_left(
        percentages.x_percent * to.container_width / 100.0,
        percentages.y_percent * to.container_height / 100.0,
        width,
        height,
    );
    let (sx, sy) = scales(reference, to);

    (
        Placement {
            bounds: Bounds::new(x, y, width, height),
            font_size: p.font_size.map(|f| f * sx.min(sy)),
            constraints,
        },
        percentages,
    )
}

/// Preset rule placement.
///
/// The rule's anchor and constraints apply to this placement only; the
/// element's own responsive settings are left as authored. A rule naming
/// another mode delegates to that mode.
fn adaptive(
    element: &Element,
    reference: (f32, f32),
    to: &LayoutContext,
    rule: &RoleRule,
) -> Placement {
    let constraints = rule.constraints.or(element.responsive.constraints);
    match rule.mode {
        ResponsiveMode::Fixed => return fixed(element, constraints, reference, to),
        ResponsiveMode::Fluid => return fluid(element, constraints, reference, to),
        ResponsiveMode::Relative => {
            return relative(element, rule.anchor, None, constraints, reference, to).0;
        }
        ResponsiveMode::Adaptive => {}
    }

    let (width, height) = constrain(
        rule.size.width.resolve(to.container_width),
        rule.size.height.resolve(to.container_height),
        constraints,
    );
    let (x, y) = rule.anchor.top_left(
        rule.position.x.resolve(to.container_width),
        rule.position.y.resolve(to.container_height),
        width,
        height,
    );
    let font_scale = to.container_width / ADAPTIVE_BASE_WIDTH * element.role.font_multiplier();

    Placement {
        bounds: Bounds::new(x, y, width, height),
        font_size: element.pristine.font_size.map(|f| f * font_scale),
        constraints,
    }
}

fn constrain(width: f32, height: f32, constraints: Option<SizeConstraints>) -> (f32, f32) {
    constraints.map_or((width, height), |c| c.apply(width, height))
}

/// Constrain, round to whole pixels and clamp fully inside the container.
fn contain(placement: &Placement, margin: Option<Margin>, to: &LayoutContext) -> Bounds {
    let m = margin.unwrap_or_default();
    let (cw, ch) = (to.container_width, to.container_height);
    let (width, height) = constrain(
        placement.bounds.width,
        placement.bounds.height,
        placement.constraints,
    );

    let min_side = 1.0_f32;
    let avail_w = (cw - m.left - m.right).floor().max(min_side.min(cw));
    let avail_h = (ch - m.top - m.bottom).floor().max(min_side.min(ch));
    let width = width.round().min(avail_w).max(min_side.min(avail_w));
    let height = height.round().min(avail_h).max(min_side.min(avail_h));

    let x = placement
        .bounds
        .x
        .round()
        .min(cw - m.right - width)
        .max(m.left)
        .min(cw - width)
        .max(0.0);
    let y = placement
        .bounds
        .y
        .round()
        .min(ch - m.bottom - height)
        .max(m.top)
        .min(ch - height)
        .max(0.0);

    Bounds::new(x, y, width, height)
}

/// Clamp an element's current geometry inside the container.
///
/// Elements already inside come back unchanged.
#[must_use]
pub fn keep_inside(element: &Element, to: &LayoutContext) -> Element {
    let mut out = element.clone();
    if !element.bounds.is_within(to.container_width, to.container_height) {
        let placement = Placement {
            bounds: element.bounds,
            font_size: element.font_size,
            constraints: None,
        };
        out.bounds = contain(&placement, None, to);
    }
    out
}

fn round_font(size: f32) -> f32 {
    (size * 10.0).round() / 10.0
}

/// Uniform proportional scale of current geometry, used when a transform fails.
///
/// Contexts with unusable dimensions leave elements untouched.
#[must_use]
pub fn fallback_scale(
    elements: &[Element],
    from: &LayoutContext,
    to: &LayoutContext,
) -> Vec<Element> {
    if from.check().is_err() || to.check().is_err() {
        return elements.to_vec();
    }
    let sx = to.container_width / from.container_width;
    let sy = to.container_height / from.container_height;
    elements
        .iter()
        .map(|element| {
            let mut out = element.clone();
            let b = element.bounds;
            out.bounds = Bounds::new(b.x * sx, b.y * sy, b.width * sx, b.height * sy);
            out.font_size = element.font_size.map(|f| f * sx.min(sy));
            out
        })
        .collect()
}
