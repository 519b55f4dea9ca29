//! Design elements - the building blocks of a layout.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{FormatError, FormatResult, LayoutContext};

/// Unique identifier for an element.
///
/// Identifiers come from the editor and are opaque strings; new elements
/// get a UUID.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    /// Create a new unique element ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ElementId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ElementId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The type of content an element contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// A text block.
    Text,
    /// A raster or vector image.
    Image,
    /// A geometric shape.
    Shape,
    /// An icon glyph.
    Icon,
    /// A group of other elements.
    Group,
}

/// Semantic classification of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Main title.
    Heading,
    /// Secondary title.
    Subheading,
    /// Running text.
    Body,
    /// Small print.
    Caption,
    /// Content image.
    Image,
    /// Brand mark.
    Logo,
    /// Call to action.
    Cta,
    /// Full-canvas backdrop.
    Background,
    /// Ornamental element.
    Decoration,
    /// Separator line.
    Divider,
}

impl Role {
    /// Stacking priority used by the flow composer and the collision resolver.
    ///
    /// Lower values are laid out first and yield on collision.
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Background => 0,
            Self::Decoration => 1,
            Self::Image => 2,
            Self::Logo => 3,
            Self::Heading => 4,
            Self::Subheading => 5,
            Self::Body => 6,
            Self::Caption => 7,
            Self::Cta => 8,
            Self::Divider => 9,
        }
    }

    /// Font scale applied by adaptive placement.
    #[must_use]
    pub const fn font_multiplier(self) -> f32 {
        match self {
            Self::Heading => 1.2,
            Self::Cta => 1.1,
            Self::Body => 0.9,
            Self::Caption => 0.8,
            _ => 1.0,
        }
    }

    /// Roles whose mutual overlap the validator reports.
    #[must_use]
    pub const fn is_critical(self) -> bool {
        matches!(self, Self::Heading | Self::Cta | Self::Logo)
    }

    /// Guess a role from kind, geometry and font size.
    ///
    /// Area-based rules only apply when the canvas is known.
    #[must_use]
    pub fn infer(
        kind: ElementKind,
        bounds: &Bounds,
        font_size: Option<f32>,
        canvas: Option<&LayoutContext>,
    ) -> Self {
        let short = bounds.width.min(bounds.height);
        let long = bounds.width.max(bounds.height);
        if short <= 4.0 && long >= short * 10.0 {
            return Self::Divider;
        }

        let coverage = canvas.map(|c| bounds.area() / (c.container_width * c.container_height));

        match kind {
            ElementKind::Text => match font_size {
                Some(size) if size >= 48.0 => Self::Heading,
                Some(size) if size >= 28.0 => Self::Subheading,
                Some(size) if size <= 14.0 => Self::Caption,
                _ => Self::Body,
            },
            ElementKind::Image => match coverage {
                Some(c) if c >= 0.9 => Self::Background,
                Some(c) if c <= 0.05 => Self::Logo,
                _ => Self::Image,
            },
            ElementKind::Shape => match coverage {
                Some(c) if c >= 0.9 => Self::Background,
                _ => Self::Decoration,
            },
            ElementKind::Icon | ElementKind::Group => Self::Decoration,
        }
    }
}

/// Axis-aligned position and size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// X position (pixels from left).
    pub x: f32,
    /// Y position (pixels from top).
    pub y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl Bounds {
    /// Create bounds from position and size.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Area in square pixels.
    #[must_use]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Strict overlap test; touching edges do not intersect.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Whether the bounds lie fully inside a `width` x `height` container.
    #[must_use]
    pub fn is_within(&self, width: f32, height: f32) -> bool {
        self.x >= 0.0 && self.y >= 0.0 && self.right() <= width && self.bottom() <= height
    }
}

/// Reference point on an element's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    /// Top-left corner.
    #[default]
    TopLeft,
    /// Middle of the top edge.
    TopCenter,
    /// Top-right corner.
    TopRight,
    /// Middle of the left edge.
    CenterLeft,
    /// Center of the box.
    Center,
    /// Middle of the right edge.
    CenterRight,
    /// Bottom-left corner.
    BottomLeft,
    /// Middle of the bottom edge.
    BottomCenter,
    /// Bottom-right corner.
    BottomRight,
}

impl Anchor {
    /// The anchor as fractions of width and height measured from the top-left.
    #[must_use]
    pub const fn fractions(self) -> (f32, f32) {
        match self {
            Self::TopLeft => (0.0, 0.0),
            Self::TopCenter => (0.5, 0.0),
            Self::TopRight => (1.0, 0.0),
            Self::CenterLeft => (0.0, 0.5),
            Self::Center => (0.5, 0.5),
            Self::CenterRight => (1.0, 0.5),
            Self::BottomLeft => (0.0, 1.0),
            Self::BottomCenter => (0.5, 1.0),
            Self::BottomRight => (1.0, 1.0),
        }
    }

    /// Top-left corner of a `width` x `height` box whose anchor sits at (`ax`, `ay`).
    #[must_use]
    pub fn top_left(self, ax: f32, ay: f32, width: f32, height: f32) -> (f32, f32) {
        let (fx, fy) = self.fractions();
        (ax - fx * width, ay - fy * height)
    }
}

/// Strategy governing how geometry reacts to a canvas change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponsiveMode {
    /// Uniform scale, never upscaled.
    Fixed,
    /// Independent per-axis scale.
    #[default]
    Fluid,
    /// Percentage placement of the anchor point.
    Relative,
    /// Preset rule placement.
    Adaptive,
}

/// Cached percentage placement for relative mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Percentages {
    /// Anchor X as a percentage of container width.
    pub x_percent: f32,
    /// Anchor Y as a percentage of container height.
    pub y_percent: f32,
    /// Width as a percentage of container width.
    pub width_percent: f32,
    /// Height as a percentage of container height.
    pub height_percent: f32,
}

/// Optional size limits.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeConstraints {
    /// Minimum width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_width: Option<f32>,
    /// Maximum width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_width: Option<f32>,
    /// Minimum height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_height: Option<f32>,
    /// Maximum height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_height: Option<f32>,
}

impl SizeConstraints {
    /// Clamp a size into the constraints. Minimums win over maximums.
    #[must_use]
    pub fn apply(&self, width: f32, height: f32) -> (f32, f32) {
        let mut w = width;
        let mut h = height;
        if let Some(max) = self.max_width {
            w = w.min(max);
        }
        if let Some(min) = self.min_width {
            w = w.max(min);
        }
        if let Some(max) = self.max_height {
            h = h.min(max);
        }
        if let Some(min) = self.min_height {
            h = h.max(min);
        }
        (w, h)
    }
}

/// Keep-out distance from the container edges.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Margin {
    /// Top margin.
    #[serde(default)]
    pub top: f32,
    /// Right margin.
    #[serde(default)]
    pub right: f32,
    /// Bottom margin.
    #[serde(default)]
    pub bottom: f32,
    /// Left margin.
    #[serde(default)]
    pub left: f32,
}

/// Responsive behaviour of an element.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsiveProps {
    /// Positioning strategy.
    #[serde(default)]
    pub mode: ResponsiveMode,
    /// Reference point for placement.
    #[serde(default)]
    pub anchor: Anchor,
    /// Cached relative placement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentages: Option<Percentages>,
    /// Size limits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<SizeConstraints>,
    /// Edge keep-out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<Margin>,
}

/// Last user-authored geometry, the reference for every automatic transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pristine {
    /// Authored X.
    #[serde(rename = "originalX")]
    pub x: f32,
    /// Authored Y.
    #[serde(rename = "originalY")]
    pub y: f32,
    /// Authored width.
    #[serde(rename = "originalWidth")]
    pub width: f32,
    /// Authored height.
    #[serde(rename = "originalHeight")]
    pub height: f32,
    /// Authored font size.
    #[serde(
        rename = "originalFontSize",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub font_size: Option<f32>,
    /// Width of the canvas the geometry was authored on.
    #[serde(
        rename = "originalCanvasWidth",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub canvas_width: Option<f32>,
    /// Height of the canvas the geometry was authored on.
    #[serde(
        rename = "originalCanvasHeight",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub canvas_height: Option<f32>,
}

impl Pristine {
    /// Capture pristine geometry from current geometry.
    #[must_use]
    pub const fn capture(bounds: &Bounds, font_size: Option<f32>) -> Self {
        Self {
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
            font_size,
            canvas_width: None,
            canvas_height: None,
        }
    }

    /// Authored geometry as bounds.
    #[must_use]
    pub const fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }

    /// Authoring canvas size, if recorded.
    #[must_use]
    pub fn canvas(&self) -> Option<(f32, f32)> {
        self.canvas_width.zip(self.canvas_height)
    }
}

const fn default_visible() -> bool {
    true
}

/// A positioned design element.
///
/// Records without `original*` fields deserialize with pristine geometry
/// captured from the current geometry; a missing role is inferred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ElementRecord")]
pub struct Element {
    /// Unique identifier.
    pub id: ElementId,
    /// Element content type.
    #[serde(rename = "type")]
    pub kind: ElementKind,
    /// Current position and size.
    #[serde(flatten)]
    pub bounds: Bounds,
    /// Current font size (text elements).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    /// Semantic role.
    pub role: Role,
    /// Responsive behaviour.
    #[serde(default)]
    pub responsive: ResponsiveProps,
    /// Scaling reference.
    #[serde(flatten)]
    pub pristine: Pristine,
    /// Whether the element is shown.
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Opaque visual style, forwarded untouched.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub style: Map<String, Value>,
    /// Opaque text content, forwarded untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Whether any format overrides this element.
    #[serde(default)]
    pub has_overrides: bool,
    /// Format keys that override this element.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub override_formats: Vec<String>,
    /// Z-index for layering.
    #[serde(default)]
    pub z_index: i32,
    /// Explicit flow order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_order: Option<u32>,
    /// Owning group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

/// Serialized element, pristine geometry optional.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ElementRecord {
    id: ElementId,
    #[serde(rename = "type")]
    kind: ElementKind,
    #[serde(flatten)]
    bounds: Bounds,
    #[serde(default)]
    font_size: Option<f32>,
    #[serde(default)]
    role: Option<Role>,
    #[serde(default)]
    responsive: ResponsiveProps,
    #[serde(flatten)]
    pristine: Option<Pristine>,
    #[serde(default = "default_visible")]
    visible: bool,
    #[serde(default)]
    style: Map<String, Value>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    has_overrides: bool,
    #[serde(default)]
    override_formats: Vec<String>,
    #[serde(default)]
    z_index: i32,
    #[serde(default)]
    layout_order: Option<u32>,
    #[serde(default)]
    group_id: Option<String>,
}

impl From<ElementRecord> for Element {
    fn from(record: ElementRecord) -> Self {
        let pristine = record
            .pristine
            .unwrap_or_else(|| Pristine::capture(&record.bounds, record.font_size));
        Self {
            id: record.id,
            kind: record.kind,
            bounds: record.bounds,
            font_size: record.font_size,
            role: record.role.unwrap_or_else(|| {
                Role::infer(record.kind, &record.bounds, record.font_size, None)
            }),
            responsive: record.responsive,
            pristine,
            visible: record.visible,
            style: record.style,
            content: record.content,
            has_overrides: record.has_overrides,
            override_formats: record.override_formats,
            z_index: record.z_index,
            layout_order: record.layout_order,
            group_id: record.group_id,
        }
    }
}

/// Parse a JSON element array authored on `canvas`.
///
/// Records without a `role` get one inferred against the canvas, which
/// enables the area-based roles (logo, background).
///
/// # Errors
///
/// Returns [`FormatError::Serialization`] for malformed records.
pub fn elements_from_json(
    json: &str,
    canvas: Option<&LayoutContext>,
) -> FormatResult<Vec<Element>> {
    let records: Vec<Value> = serde_json::from_str(json)?;
    records
        .into_iter()
        .map(|record| {
            let explicit_role = record.get("role").is_some_and(|role| !role.is_null());
            let mut element: Element = serde_json::from_value(record)?;
            if !explicit_role {
                element.infer_role(canvas);
            }
            Ok(element)
        })
        .collect()
}

impl Element {
    /// Create a new element; pristine geometry equals the initial geometry.
    #[must_use]
    pub fn new(kind: ElementKind, bounds: Bounds) -> Self {
        Self {
            id: ElementId::new(),
            kind,
            bounds,
            font_size: None,
            role: Role::infer(kind, &bounds, None, None),
            responsive: ResponsiveProps::default(),
            pristine: Pristine::capture(&bounds, None),
            visible: true,
            style: Map::new(),
            content: None,
            has_overrides: false,
            override_formats: Vec::new(),
            z_index: 0,
            layout_order: None,
            group_id: None,
        }
    }

    /// Create a text element with an inferred role.
    #[must_use]
    pub fn text(content: impl Into<String>, font_size: f32, bounds: Bounds) -> Self {
        let mut element = Self::new(ElementKind::Text, bounds).with_font_size(font_size);
        element.content = Some(content.into());
        element.role = Role::infer(ElementKind::Text, &bounds, Some(font_size), None);
        element
    }

    /// Set the identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<ElementId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the role explicitly.
    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Set current and pristine font size.
    #[must_use]
    pub fn with_font_size(mut self, font_size: f32) -> Self {
        self.font_size = Some(font_size);
        self.pristine.font_size = Some(font_size);
        self
    }

    /// Set the responsive mode.
    #[must_use]
    pub fn with_mode(mut self, mode: ResponsiveMode) -> Self {
        self.responsive.mode = mode;
        self
    }

    /// Set the anchor.
    #[must_use]
    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.responsive.anchor = anchor;
        self
    }

    /// Replace the responsive block.
    #[must_use]
    pub fn with_responsive(mut self, responsive: ResponsiveProps) -> Self {
        self.responsive = responsive;
        self
    }

    /// Set the z-index.
    #[must_use]
    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    /// Set the flow order.
    #[must_use]
    pub fn with_layout_order(mut self, order: u32) -> Self {
        self.layout_order = Some(order);
        self
    }

    /// Record the canvas the pristine geometry was authored on.
    #[must_use]
    pub fn authored_in(mut self, context: &LayoutContext) -> Self {
        self.pristine.canvas_width = Some(context.container_width);
        self.pristine.canvas_height = Some(context.container_height);
        self
    }

    /// Re-run role inference against a canvas.
    pub fn infer_role(&mut self, canvas: Option<&LayoutContext>) {
        self.role = Role::infer(self.kind, &self.bounds, self.font_size, canvas);
    }

    /// Apply an explicit user edit.
    ///
    /// This is the only path that refreshes pristine geometry. Cached
    /// percentages are dropped because they describe the old geometry.
    pub fn apply_user_edit(
        &mut self,
        bounds: Bounds,
        font_size: Option<f32>,
        context: &LayoutContext,
    ) {
        self.bounds = bounds;
        if font_size.is_some() {
            self.font_size = font_size;
        }
        self.pristine = Pristine {
            canvas_width: Some(context.container_width),
            canvas_height: Some(context.container_height),
            ..Pristine::capture(&bounds, self.font_size)
        };
        self.responsive.percentages = None;
    }

    /// Whether this is a text element.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.kind == ElementKind::Text
    }

    /// Check that current and pristine geometry are usable for transforms.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::InvalidGeometry`] for non-finite values or a
    /// non-positive size.
    pub fn check_geometry(&self) -> FormatResult<()> {
        let fail = |reason: &str| FormatError::InvalidGeometry {
            id: self.id.to_string(),
            reason: reason.to_string(),
        };
        let p = &self.pristine;
        let values = [
            self.bounds.x,
            self.bounds.y,
            self.bounds.width,
            self.bounds.height,
            p.x,
            p.y,
            p.width,
            p.height,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(fail("non-finite coordinate"));
        }
        if self.bounds.width <= 0.0
            || self.bounds.height <= 0.0
            || p.width <= 0.0
            || p.height <= 0.0
        {
            return Err(fail("non-positive size"));
        }
        if let Some((w, h)) = p.canvas() {
            if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
                return Err(fail("invalid authoring canvas"));
            }
        }
        Ok(())
    }
}
